//! Weir Core: shared types for the weir event channel
//!
//! This crate defines the vocabulary the segment log and its tools speak:
//! - Events and event pointers
//! - Transaction records (put/take/rollback/commit)
//! - The error enum and `Result` alias used across the workspace
//! - Log configuration and size constants

pub mod config;
pub mod error;
pub mod event;
pub mod record;

pub use config::{LogConfig, DEFAULT_MAX_FILE_SIZE};
pub use error::{Result, WeirError};
pub use event::Event;
pub use record::{EventPointer, LogRecord, RecordBody, RecordType, TransactionEventRecord};
