//! Sequential replay of a segment
//!
//! Replay is how the channel recovers: on start it walks every segment from
//! offset 0 — or from the checkpoint the metadata sidecar remembers — and
//! re-applies each record. A sequential reader is single-use and
//! single-threaded; it is created for one replay pass and dropped at EOF.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use weir_core::{LogRecord, Result, DEFAULT_MAX_FILE_SIZE};

use crate::format::LogFormat;
use crate::frame::{OP_EOF, OP_RECORD};
use crate::meta::LogFileMetadata;

/// Cursor-based reader yielding records until EOF, the sentinel tail, or a
/// byte that is neither.
pub struct LogFileSequentialReader {
    path: PathBuf,
    file: File,
    format: LogFormat,
    log_file_id: u32,
    last_checkpoint_offset: u64,
    last_checkpoint_write_order_id: u64,
}

impl LogFileSequentialReader {
    pub(crate) fn open(path: &Path, format: LogFormat, meta: &LogFileMetadata) -> Result<Self> {
        Ok(Self {
            path: path.to_path_buf(),
            file: File::open(path)?,
            format,
            log_file_id: meta.log_file_id,
            last_checkpoint_offset: meta.last_checkpoint_offset,
            last_checkpoint_write_order_id: meta.last_checkpoint_write_order_id,
        })
    }

    pub fn log_file_id(&self) -> u32 {
        self.log_file_id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn last_checkpoint_offset(&self) -> u64 {
        self.last_checkpoint_offset
    }

    pub fn last_checkpoint_write_order_id(&self) -> u64 {
        self.last_checkpoint_write_order_id
    }

    /// Fast-forward past records already reflected in the checkpoint being
    /// recovered to.
    ///
    /// Seeks only when the sidecar's write-order id is at or before the
    /// requested one; a sidecar ahead of the requested checkpoint means the
    /// segment was checkpointed by a newer state than the one being
    /// restored, so the cursor stays at 0 and the caller replays everything.
    pub fn skip_to_last_checkpoint_position(
        &mut self,
        checkpoint_write_order_id: u64,
    ) -> Result<()> {
        if self.last_checkpoint_offset > 0
            && self.last_checkpoint_write_order_id <= checkpoint_write_order_id
        {
            info!(
                "fast-forwarding {} to checkpoint position {}",
                self.path.display(),
                self.last_checkpoint_offset
            );
            self.file
                .seek(SeekFrom::Start(self.last_checkpoint_offset))?;
        } else {
            warn!(
                "checkpoint for {} is at write-order id {} (position {}), beyond the requested \
                 checkpoint {}; replaying from the start",
                self.path.display(),
                self.last_checkpoint_write_order_id,
                self.last_checkpoint_offset,
                checkpoint_write_order_id
            );
        }
        Ok(())
    }

    /// Yield the next record, or `None` at end of stream.
    ///
    /// End of stream is any of: physical EOF, the preallocated sentinel
    /// tail, a byte that is no legal op (logged at error level — the caller
    /// decides whether a truncated middle is tolerable), or a record cut
    /// short by EOF.
    pub fn next(&mut self) -> Result<Option<LogRecord>> {
        let position = self.file.stream_position()?;
        if position > DEFAULT_MAX_FILE_SIZE {
            info!(
                position,
                "file position in {} exceeds the segment size ceiling",
                self.path.display()
            );
        }
        if position >= i32::MAX as u64 {
            error!(
                position,
                "offset in {} no longer fits a frame pointer; halting replay",
                self.path.display()
            );
            return Ok(None);
        }
        let offset = position as u32;

        let mut op = [0u8; 1];
        match self.file.read_exact(&mut op) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        match op[0] {
            OP_RECORD => {}
            OP_EOF => {
                info!("encountered EOF at {} in {}", offset, self.path.display());
                return Ok(None);
            }
            other => {
                error!(
                    "encountered non op-record {:#04x} at {} in {}",
                    other,
                    offset,
                    self.path.display()
                );
                return Ok(None);
            }
        }

        match self.format.decode_record(&mut self.file) {
            Ok(record) => Ok(Some(LogRecord { offset, record })),
            Err(weir_core::WeirError::Io(e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
                // Truncated tail: the segment ends mid-record.
                info!(
                    "record at {} in {} is cut short by EOF",
                    offset,
                    self.path.display()
                );
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub fn close(self) {}
}
