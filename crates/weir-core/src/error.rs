use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WeirError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("log file is closed")]
    Closed,

    #[error("append would push position past 2^31 (position {position}, record {record_len} bytes)")]
    OffsetOverflow { position: u64, record_len: u64 },

    #[error("unexpected op byte {op:#04x} at offset {offset}")]
    Corruption { op: u8, offset: u64 },

    #[error("expected a put record, found {kind}")]
    UnexpectedRecordKind { kind: &'static str },

    #[error("unsupported log format version {0}")]
    UnsupportedVersion(u32),

    #[error("metadata error: {0}")]
    Metadata(String),
}

pub type Result<T> = std::result::Result<T, WeirError>;
