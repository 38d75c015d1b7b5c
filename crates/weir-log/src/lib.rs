//! Segmented append-only log for the weir event channel
//!
//! A segment is a single append-only file holding `[op][payload]` frames
//! followed by a preallocated tail of sentinel bytes, with a JSON metadata
//! sidecar recording the last durable checkpoint. The pieces:
//!
//! - One writer per segment, serializing appends and fsyncing on commit
//! - Random readers dereferencing event pointers through a bounded pool of
//!   read handles
//! - Single-use sequential readers for checkpoint-aware replay
//! - A metadata writer persisting `(offset, write_order_id)` checkpoints
//!   with atomic-replace semantics
//! - A factory binding each file to its format version
//!
//! Writers are created through [`factory::new_writer`]; readers and the
//! metadata writer are bound to an existing segment through the other
//! factory functions.

pub mod factory;
pub mod format;
pub mod frame;
pub mod meta;
mod pool;
pub mod random;
pub mod sequential;
pub mod writer;

pub use format::LogFormat;
pub use meta::{LogFileMetadata, MetaDataWriter};
pub use random::LogFileRandomReader;
pub use sequential::LogFileSequentialReader;
pub use writer::LogFileWriter;
