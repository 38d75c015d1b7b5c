//! Random reads of put frames by pointer
//!
//! A random reader lives as long as the channel may dereference pointers
//! into its segment, sharing a bounded pool of read handles across however
//! many transactions are taking events concurrently.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use tracing::info;

use weir_core::{Event, RecordBody, Result, WeirError};

use crate::format::LogFormat;
use crate::frame::OP_RECORD;
use crate::pool::HandlePool;

/// Read handles kept per segment. Bounded so that a channel with thousands
/// of in-flight transactions cannot exhaust file descriptors.
pub const READ_HANDLE_POOL_CAPACITY: usize = 50;

/// Pool-backed positional reader over one segment.
pub struct LogFileRandomReader {
    path: PathBuf,
    format: LogFormat,
    pool: HandlePool,
}

impl LogFileRandomReader {
    pub(crate) fn open(path: &Path, format: LogFormat) -> Result<Self> {
        Ok(Self {
            path: path.to_path_buf(),
            format,
            pool: HandlePool::open(path.to_path_buf(), READ_HANDLE_POOL_CAPACITY)?,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.pool.is_open()
    }

    /// Fetch the event stored by the put frame at `offset`.
    ///
    /// Fails with [`WeirError::Corruption`] when the byte at `offset` is not
    /// an op-record marker and with [`WeirError::UnexpectedRecordKind`] when
    /// the frame holds anything but a put. Handles are returned to the pool
    /// only after a successful read; a failed handle is dropped since its
    /// cursor state is no longer trusted.
    pub fn get(&self, offset: u32) -> Result<Event> {
        let mut handle = self.pool.checkout()?;
        match self.read_put(&mut handle, offset) {
            Ok(event) => {
                self.pool.checkin(handle);
                Ok(event)
            }
            Err(e) => {
                self.pool.discard(handle);
                Err(e)
            }
        }
    }

    fn read_put(&self, handle: &mut File, offset: u32) -> Result<Event> {
        handle.seek(SeekFrom::Start(offset as u64))?;
        let mut op = [0u8; 1];
        handle.read_exact(&mut op)?;
        if op[0] != OP_RECORD {
            return Err(WeirError::Corruption {
                op: op[0],
                offset: offset as u64,
            });
        }

        let record = self.format.decode_record(handle)?;
        match record.body {
            RecordBody::Put(event) => Ok(event),
            other => Err(WeirError::UnexpectedRecordKind {
                kind: other.kind_name(),
            }),
        }
    }

    /// Close the reader, blocking until in-flight reads have returned their
    /// handles. Subsequent `get` calls fail with [`WeirError::Closed`].
    pub fn close(&self) {
        if self.pool.is_open() {
            info!("closing random reader for {}", self.path.display());
        }
        self.pool.close();
    }
}

impl Drop for LogFileRandomReader {
    fn drop(&mut self) {
        self.close();
    }
}
