//! Version-tagged record codec
//!
//! The `[OP_RECORD][payload]` framing never changes between versions; what a
//! payload looks like does. Each segment's metadata sidecar names the version
//! it was written with, the factory maps that to a [`LogFormat`], and the
//! writer and readers go through it for every encode/decode.
//!
//! Version 1 payload, big-endian throughout:
//!
//! ```text
//! transaction_id : u64
//! write_order_id : u64
//! record_type    : u16   (PUT=1, TAKE=2, ROLLBACK=3, COMMIT=4)
//! body           : PUT      -> header_count:u32,
//!                              (key_len:u32, key, value_len:u32, value)*,
//!                              body_len:u32, body
//!                  TAKE     -> file_id:u32, offset:u32
//!                  ROLLBACK -> empty
//!                  COMMIT   -> empty
//! ```
//!
//! Records are self-delimiting: decoding consumes exactly the bytes encoding
//! produced, which is what lets the sequential reader advance frame by frame
//! without a length prefix.

use std::io::{self, Read};

use weir_core::{Event, EventPointer, RecordBody, RecordType, Result, TransactionEventRecord, WeirError};

/// Bytes of the fixed v1 record header (transaction id, write-order id,
/// record type).
const V1_HEADER_LEN: usize = 8 + 8 + 2;

/// A concrete on-disk format, selected by the factory from the sidecar's
/// version field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    V1,
}

impl LogFormat {
    pub fn from_version(version: u32) -> Result<Self> {
        match version {
            1 => Ok(LogFormat::V1),
            other => Err(WeirError::UnsupportedVersion(other)),
        }
    }

    pub fn version(self) -> u32 {
        match self {
            LogFormat::V1 => 1,
        }
    }

    /// Encoded payload length of `record`, excluding the op byte.
    pub fn encoded_len(self, record: &TransactionEventRecord) -> usize {
        match self {
            LogFormat::V1 => V1_HEADER_LEN + v1_body_len(&record.body),
        }
    }

    /// Append the payload encoding of `record` to `buf`.
    pub fn encode_record(self, record: &TransactionEventRecord, buf: &mut Vec<u8>) {
        match self {
            LogFormat::V1 => v1_encode(record, buf),
        }
    }

    /// Decode one record payload from `reader`, consuming exactly the bytes
    /// the matching encode wrote.
    pub fn decode_record<R: Read>(self, reader: &mut R) -> Result<TransactionEventRecord> {
        match self {
            LogFormat::V1 => v1_decode(reader),
        }
    }
}

fn v1_body_len(body: &RecordBody) -> usize {
    match body {
        RecordBody::Put(event) => {
            let headers: usize = event
                .headers
                .iter()
                .map(|(k, v)| 4 + k.len() + 4 + v.len())
                .sum();
            4 + headers + 4 + event.body.len()
        }
        RecordBody::Take(_) => 4 + 4,
        RecordBody::Rollback | RecordBody::Commit => 0,
    }
}

fn v1_encode(record: &TransactionEventRecord, buf: &mut Vec<u8>) {
    buf.extend_from_slice(&record.transaction_id.to_be_bytes());
    buf.extend_from_slice(&record.write_order_id.to_be_bytes());
    buf.extend_from_slice(&record.record_type().code().to_be_bytes());

    match &record.body {
        RecordBody::Put(event) => {
            buf.extend_from_slice(&(event.headers.len() as u32).to_be_bytes());
            for (key, value) in &event.headers {
                buf.extend_from_slice(&(key.len() as u32).to_be_bytes());
                buf.extend_from_slice(key.as_bytes());
                buf.extend_from_slice(&(value.len() as u32).to_be_bytes());
                buf.extend_from_slice(value.as_bytes());
            }
            buf.extend_from_slice(&(event.body.len() as u32).to_be_bytes());
            buf.extend_from_slice(&event.body);
        }
        RecordBody::Take(pointer) => {
            buf.extend_from_slice(&pointer.file_id.to_be_bytes());
            buf.extend_from_slice(&pointer.offset.to_be_bytes());
        }
        RecordBody::Rollback | RecordBody::Commit => {}
    }
}

fn v1_decode<R: Read>(reader: &mut R) -> Result<TransactionEventRecord> {
    let transaction_id = read_u64(reader)?;
    let write_order_id = read_u64(reader)?;
    let code = read_u16(reader)?;
    let record_type = RecordType::from_code(code).ok_or_else(|| {
        WeirError::Io(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("unknown record type code {code}"),
        ))
    })?;

    let body = match record_type {
        RecordType::Put => {
            let header_count = read_u32(reader)?;
            let mut event = Event::default();
            for _ in 0..header_count {
                let key = read_string(reader)?;
                let value = read_string(reader)?;
                event.headers.insert(key, value);
            }
            event.body = read_bytes(reader)?;
            RecordBody::Put(event)
        }
        RecordType::Take => {
            let file_id = read_u32(reader)?;
            let offset = read_u32(reader)?;
            RecordBody::Take(EventPointer::new(file_id, offset))
        }
        RecordType::Rollback => RecordBody::Rollback,
        RecordType::Commit => RecordBody::Commit,
    };

    Ok(TransactionEventRecord {
        transaction_id,
        write_order_id,
        body,
    })
}

fn read_u16<R: Read>(reader: &mut R) -> io::Result<u16> {
    let mut buf = [0u8; 2];
    reader.read_exact(&mut buf)?;
    Ok(u16::from_be_bytes(buf))
}

fn read_u32<R: Read>(reader: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

fn read_u64<R: Read>(reader: &mut R) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_be_bytes(buf))
}

fn read_bytes<R: Read>(reader: &mut R) -> io::Result<Vec<u8>> {
    let len = read_u32(reader)? as usize;
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

fn read_string<R: Read>(reader: &mut R) -> io::Result<String> {
    let bytes = read_bytes(reader)?;
    String::from_utf8(bytes)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("non-utf8 header: {e}")))
}
