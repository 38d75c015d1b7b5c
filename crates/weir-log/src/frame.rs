//! Frame constants and the preallocation fill buffer
//!
//! Segments preallocate in 1 MiB steps to avoid updating the inode on every
//! append and to fail on a full disk before a record write starts, not in
//! the middle of one. The full chunk is written even when the shortfall is
//! smaller.

use std::sync::OnceLock;

/// Op byte opening a record frame (`+127` as a signed byte).
pub const OP_RECORD: u8 = 0x7f;

/// Preallocation fill byte and logical end-of-stream marker (`-128` as a
/// signed byte).
pub const OP_EOF: u8 = 0x80;

/// Size of one preallocation step.
pub const FILL_CHUNK: usize = 1024 * 1024;

static FILL: OnceLock<Vec<u8>> = OnceLock::new();

/// The shared fill buffer: `FILL_CHUNK` bytes of `OP_EOF`. Initialized once
/// and never mutated, so writers can share it without a lock.
pub(crate) fn fill_chunk() -> &'static [u8] {
    FILL.get_or_init(|| vec![OP_EOF; FILL_CHUNK])
}
