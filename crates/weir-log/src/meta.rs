//! Metadata sidecar
//!
//! Every segment `log-N` has a sibling `log-N.meta` recording the format
//! version, the segment id, and the last checkpoint: the offset up to which
//! the log had been flushed and the write-order id at that instant. Replay
//! uses the pair to fast-forward past records the recovered state already
//! reflects.
//!
//! Updates are atomic with respect to crashes: the new contents are written
//! to a temp file in the same directory, fsynced, and renamed over the
//! sidecar. Recovery reads either the old pair or the new one, never a tear.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use weir_core::{Result, WeirError};

/// Extension appended to the segment file name.
pub const METADATA_EXTENSION: &str = "meta";

/// Contents of a segment's sidecar file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFileMetadata {
    pub version: u32,
    pub log_file_id: u32,
    pub last_checkpoint_offset: u64,
    pub last_checkpoint_write_order_id: u64,
}

pub(crate) fn metadata_path(segment: &Path) -> PathBuf {
    let mut name = segment.as_os_str().to_os_string();
    name.push(".");
    name.push(METADATA_EXTENSION);
    PathBuf::from(name)
}

/// Load and parse a segment's sidecar.
pub fn read_metadata(segment: &Path) -> Result<LogFileMetadata> {
    let path = metadata_path(segment);
    let data = std::fs::read_to_string(&path)?;
    serde_json::from_str(&data)
        .map_err(|e| WeirError::Metadata(format!("failed to parse {}: {}", path.display(), e)))
}

pub(crate) fn write_metadata(segment: &Path, meta: &LogFileMetadata) -> Result<()> {
    let path = metadata_path(segment);
    let dir = path
        .parent()
        .ok_or_else(|| WeirError::Metadata(format!("{} has no parent directory", path.display())))?;
    let json = serde_json::to_string(meta)
        .map_err(|e| WeirError::Metadata(format!("failed to serialize metadata: {e}")))?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(json.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(&path).map_err(|e| WeirError::Io(e.error))?;
    Ok(())
}

/// Maintains a segment's checkpoint sidecar. Lives as long as the segment's
/// writer; checkpoint updates may run concurrently with appends since they
/// touch different files.
pub struct MetaDataWriter {
    segment_path: PathBuf,
    meta: LogFileMetadata,
}

impl MetaDataWriter {
    pub(crate) fn new(segment_path: PathBuf, meta: LogFileMetadata) -> Self {
        Self { segment_path, meta }
    }

    pub fn log_file_id(&self) -> u32 {
        self.meta.log_file_id
    }

    pub fn last_checkpoint_offset(&self) -> u64 {
        self.meta.last_checkpoint_offset
    }

    pub fn last_checkpoint_write_order_id(&self) -> u64 {
        self.meta.last_checkpoint_write_order_id
    }

    /// Durably record that everything below `position` was flushed as of
    /// `write_order_id`. The in-memory pair is updated only after the
    /// sidecar replacement succeeds.
    pub fn mark_checkpoint(&mut self, position: u64, write_order_id: u64) -> Result<()> {
        let candidate = LogFileMetadata {
            last_checkpoint_offset: position,
            last_checkpoint_write_order_id: write_order_id,
            ..self.meta.clone()
        };
        write_metadata(&self.segment_path, &candidate)?;
        self.meta = candidate;
        debug!(
            position,
            write_order_id,
            "marked checkpoint for {}",
            self.segment_path.display()
        );
        Ok(())
    }

    /// Re-stamp the stored offset with a newer write-order id: nothing new
    /// was appended, but time has advanced.
    pub fn refresh_checkpoint(&mut self, write_order_id: u64) -> Result<()> {
        self.mark_checkpoint(self.meta.last_checkpoint_offset, write_order_id)
    }
}
