//! Version dispatch
//!
//! Writers, readers, and the metadata writer are all constructed here. The
//! factory reads the segment's sidecar, maps its version field to a
//! [`LogFormat`], and hands back a component bound to that codec; unknown
//! versions fail with [`WeirError::UnsupportedVersion`] before any data is
//! touched.

use std::path::Path;

use weir_core::{LogConfig, Result};

use crate::format::LogFormat;
use crate::meta::{self, LogFileMetadata, MetaDataWriter};
use crate::random::LogFileRandomReader;
use crate::sequential::LogFileSequentialReader;
use crate::writer::LogFileWriter;

/// Create a fresh segment (data file plus sidecar) in the current format
/// and return its writer. Fails if the data file already exists.
pub fn new_writer(path: &Path, log_file_id: u32, config: &LogConfig) -> Result<LogFileWriter> {
    let format = LogFormat::V1;
    let writer = LogFileWriter::create(path, log_file_id, config, format)?;
    meta::write_metadata(
        path,
        &LogFileMetadata {
            version: format.version(),
            log_file_id,
            last_checkpoint_offset: 0,
            last_checkpoint_write_order_id: 0,
        },
    )?;
    Ok(writer)
}

/// Bind a metadata writer to an existing segment's sidecar.
pub fn metadata_writer(path: &Path) -> Result<MetaDataWriter> {
    let meta = meta::read_metadata(path)?;
    LogFormat::from_version(meta.version)?;
    Ok(MetaDataWriter::new(path.to_path_buf(), meta))
}

/// Open a pool-backed random reader over an existing segment.
pub fn random_reader(path: &Path) -> Result<LogFileRandomReader> {
    let meta = meta::read_metadata(path)?;
    let format = LogFormat::from_version(meta.version)?;
    LogFileRandomReader::open(path, format)
}

/// Open a single-use sequential reader over an existing segment, seeded
/// with the sidecar's checkpoint for fast-forward recovery.
pub fn sequential_reader(path: &Path) -> Result<LogFileSequentialReader> {
    let meta = meta::read_metadata(path)?;
    let format = LogFormat::from_version(meta.version)?;
    LogFileSequentialReader::open(path, format, &meta)
}
