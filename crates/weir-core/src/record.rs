//! Transaction records written to the segment log
//!
//! Every frame in a segment carries one `TransactionEventRecord`: the
//! payload of a `put`, the back-pointer of a `take`, or a bare
//! rollback/commit marker. Records are tagged with the transaction they
//! belong to and a caller-supplied monotonic write-order id used to compare
//! checkpoint recency during replay.

use crate::event::Event;
use serde::{Deserialize, Serialize};

/// Wire code for each record kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordType {
    Put,
    Take,
    Rollback,
    Commit,
}

impl RecordType {
    pub fn code(self) -> u16 {
        match self {
            RecordType::Put => 1,
            RecordType::Take => 2,
            RecordType::Rollback => 3,
            RecordType::Commit => 4,
        }
    }

    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            1 => Some(RecordType::Put),
            2 => Some(RecordType::Take),
            3 => Some(RecordType::Rollback),
            4 => Some(RecordType::Commit),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RecordType::Put => "PUT",
            RecordType::Take => "TAKE",
            RecordType::Rollback => "ROLLBACK",
            RecordType::Commit => "COMMIT",
        }
    }
}

/// Location of a `put` frame: segment id plus the byte offset of the
/// frame's op byte within that segment.
///
/// Offsets always fit in a signed 32-bit integer; the writer enforces the
/// 2^31 ceiling before every append.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventPointer {
    pub file_id: u32,
    pub offset: u32,
}

impl EventPointer {
    pub fn new(file_id: u32, offset: u32) -> Self {
        Self { file_id, offset }
    }
}

impl std::fmt::Display for EventPointer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.file_id, self.offset)
    }
}

/// Variant data of a transaction record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RecordBody {
    /// An event entering the channel.
    Put(Event),
    /// A reference to the `Put` frame being consumed.
    Take(EventPointer),
    Rollback,
    Commit,
}

impl RecordBody {
    pub fn record_type(&self) -> RecordType {
        match self {
            RecordBody::Put(_) => RecordType::Put,
            RecordBody::Take(_) => RecordType::Take,
            RecordBody::Rollback => RecordType::Rollback,
            RecordBody::Commit => RecordType::Commit,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        self.record_type().name()
    }
}

/// A transaction record as appended to (and replayed from) a segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionEventRecord {
    /// Transaction this record belongs to.
    pub transaction_id: u64,
    /// Monotonic write-order id supplied by the channel clock.
    pub write_order_id: u64,
    pub body: RecordBody,
}

impl TransactionEventRecord {
    pub fn put(transaction_id: u64, write_order_id: u64, event: Event) -> Self {
        Self {
            transaction_id,
            write_order_id,
            body: RecordBody::Put(event),
        }
    }

    pub fn take(transaction_id: u64, write_order_id: u64, pointer: EventPointer) -> Self {
        Self {
            transaction_id,
            write_order_id,
            body: RecordBody::Take(pointer),
        }
    }

    pub fn rollback(transaction_id: u64, write_order_id: u64) -> Self {
        Self {
            transaction_id,
            write_order_id,
            body: RecordBody::Rollback,
        }
    }

    pub fn commit(transaction_id: u64, write_order_id: u64) -> Self {
        Self {
            transaction_id,
            write_order_id,
            body: RecordBody::Commit,
        }
    }

    pub fn record_type(&self) -> RecordType {
        self.body.record_type()
    }
}

/// A record yielded by sequential replay, paired with the offset of its
/// frame within the segment.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub offset: u32,
    pub record: TransactionEventRecord,
}
