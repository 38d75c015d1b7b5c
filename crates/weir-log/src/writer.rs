//! Segment writer
//!
//! Exactly one writer exists per segment: it is created when the segment is,
//! appends until the caller rolls to a new segment, and is never re-opened.
//! All operations serialize under one internal lock. Only `commit` forces
//! data to stable storage; `put`/`take`/`rollback` stay in the page cache so
//! a batch of operations amortizes a single fsync.

use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use weir_core::{
    EventPointer, LogConfig, Result, TransactionEventRecord, WeirError, DEFAULT_MAX_FILE_SIZE,
};

use crate::format::LogFormat;
use crate::frame::{self, FILL_CHUNK, OP_RECORD};

struct WriterState {
    /// `None` once closed; close is idempotent.
    file: Option<File>,
    /// Logical write position: the offset the next frame lands at. Bytes in
    /// `[position, file_size)` are preallocated sentinel fill.
    position: u64,
    /// Physical file length as grown by preallocation.
    file_size: u64,
}

/// Writer owning the write handle of one active segment.
pub struct LogFileWriter {
    path: PathBuf,
    log_file_id: u32,
    max_file_size: u64,
    format: LogFormat,
    state: Mutex<WriterState>,
}

impl LogFileWriter {
    /// Create a fresh segment. Fails if the file already exists; segments
    /// are never re-opened for writing.
    pub(crate) fn create(
        path: &Path,
        log_file_id: u32,
        config: &LogConfig,
        format: LogFormat,
    ) -> Result<Self> {
        let max_file_size = config.max_file_size.min(DEFAULT_MAX_FILE_SIZE);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;
        info!("opened segment {} for writing", path.display());

        Ok(Self {
            path: path.to_path_buf(),
            log_file_id,
            max_file_size,
            format,
            state: Mutex::new(WriterState {
                file: Some(file),
                position: 0,
                file_size: 0,
            }),
        })
    }

    pub fn log_file_id(&self) -> u32 {
        self.log_file_id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().file.is_some()
    }

    /// Current logical write position.
    pub fn position(&self) -> u64 {
        self.state.lock().position
    }

    /// Append an event record and return the pointer readers use to fetch
    /// it back. Not durable until the next `commit`.
    pub fn put(&self, record: &TransactionEventRecord) -> Result<EventPointer> {
        let mut state = self.state.lock();
        let offset = self.append(&mut state, record)?;
        Ok(EventPointer::new(self.log_file_id, offset))
    }

    /// Append a take record. The frame carries its own back-pointer to the
    /// put it consumes, so nothing is returned.
    pub fn take(&self, record: &TransactionEventRecord) -> Result<()> {
        let mut state = self.state.lock();
        self.append(&mut state, record)?;
        Ok(())
    }

    pub fn rollback(&self, record: &TransactionEventRecord) -> Result<()> {
        let mut state = self.state.lock();
        self.append(&mut state, record)?;
        Ok(())
    }

    /// Append a commit record, then flush data pages to stable storage.
    /// Covers every byte appended since the previous commit, not just the
    /// commit frame.
    pub fn commit(&self, record: &TransactionEventRecord) -> Result<()> {
        let mut state = self.state.lock();
        self.append(&mut state, record)?;
        let file = state.file.as_ref().ok_or(WeirError::Closed)?;
        file.sync_data()?;
        Ok(())
    }

    /// True when the segment is open and appending `record` would push the
    /// logical position past `max_file_size`. The writer never rolls on its
    /// own; the caller is expected to check this and open a new segment.
    pub fn is_roll_required(&self, record: &TransactionEventRecord) -> bool {
        let payload_len = self.format.encoded_len(record) as u64;
        let state = self.state.lock();
        state.file.is_some() && state.position + payload_len > self.max_file_size
    }

    fn append(&self, state: &mut WriterState, record: &TransactionEventRecord) -> Result<u32> {
        let payload_len = self.format.encoded_len(record) as u64;
        let record_len = 1 + payload_len;

        let position = state.position;
        let file = match state.file.as_mut() {
            Some(file) => file,
            None => return Err(WeirError::Closed),
        };
        if position + record_len >= i32::MAX as u64 {
            return Err(WeirError::OffsetOverflow {
                position,
                record_len,
            });
        }
        if position + record_len > state.file_size {
            debug!(position, file_size = state.file_size, "preallocating");
            file.seek(SeekFrom::Start(state.file_size))?;
            file.write_all(frame::fill_chunk())?;
            state.file_size += FILL_CHUNK as u64;
        }

        let mut buf = Vec::with_capacity(record_len as usize);
        buf.push(OP_RECORD);
        self.format.encode_record(record, &mut buf);
        debug_assert_eq!(buf.len() as u64, record_len);

        file.seek(SeekFrom::Start(position))?;
        file.write_all(&buf)?;

        state.position = position + record_len;
        if state.position > state.file_size {
            state.file_size = state.position;
        }
        Ok(position as u32)
    }

    /// Flush data and file metadata, then release the handle. Idempotent
    /// and best-effort: I/O failures here are logged, not surfaced, so that
    /// shutdown always makes progress.
    pub fn close(&self) {
        let mut state = self.state.lock();
        if let Some(file) = state.file.take() {
            info!("closing segment {}", self.path.display());
            if let Err(e) = file.sync_all() {
                warn!("unable to flush {} to disk: {}", self.path.display(), e);
            }
        }
    }
}

impl Drop for LogFileWriter {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::OP_EOF;
    use tempfile::TempDir;
    use weir_core::Event;

    fn new_writer(dir: &TempDir, config: LogConfig) -> LogFileWriter {
        let path = dir.path().join("log-7");
        LogFileWriter::create(&path, 7, &config, LogFormat::V1).unwrap()
    }

    fn put_record(payload: &[u8]) -> TransactionEventRecord {
        TransactionEventRecord::put(1, 10, Event::new(payload.to_vec()))
    }

    #[test]
    fn test_position_is_sum_of_frame_sizes() {
        let dir = TempDir::new().unwrap();
        let writer = new_writer(&dir, LogConfig::default());
        let format = LogFormat::V1;

        let records = [put_record(b"a"), put_record(b"bb"), put_record(b"ccc")];
        let mut expected = 0u64;
        for record in &records {
            let pointer = writer.put(record).unwrap();
            assert_eq!(pointer.file_id, 7);
            assert_eq!(pointer.offset as u64, expected);
            expected += 1 + format.encoded_len(record) as u64;
            assert_eq!(writer.position(), expected);
        }
    }

    #[test]
    fn test_preallocated_tail_is_sentinel() {
        let dir = TempDir::new().unwrap();
        let writer = new_writer(&dir, LogConfig::default());

        writer.put(&put_record(b"a")).unwrap();
        writer
            .commit(&TransactionEventRecord::commit(1, 11))
            .unwrap();
        let position = writer.position() as usize;
        writer.close();

        let contents = std::fs::read(dir.path().join("log-7")).unwrap();
        assert_eq!(contents.len(), FILL_CHUNK);
        assert!(contents[position..].iter().all(|&b| b == OP_EOF));
        assert_eq!(contents[0], OP_RECORD);
    }

    #[test]
    fn test_append_after_close_fails() {
        let dir = TempDir::new().unwrap();
        let writer = new_writer(&dir, LogConfig::default());
        writer.close();
        writer.close(); // idempotent

        assert!(!writer.is_open());
        assert!(matches!(
            writer.put(&put_record(b"a")),
            Err(WeirError::Closed)
        ));
        assert!(matches!(
            writer.commit(&TransactionEventRecord::commit(1, 12)),
            Err(WeirError::Closed)
        ));
    }

    #[test]
    fn test_roll_required_past_max_file_size() {
        let dir = TempDir::new().unwrap();
        let record = put_record(b"payload");
        let payload_len = LogFormat::V1.encoded_len(&record) as u64;

        // Room for exactly two frames before the cap.
        let max = 2 * (1 + payload_len);
        let writer = new_writer(&dir, LogConfig::new().with_max_file_size(max));

        assert!(!writer.is_roll_required(&record));
        writer.put(&record).unwrap();
        assert!(!writer.is_roll_required(&record));
        writer.put(&record).unwrap();
        assert!(writer.is_roll_required(&record));
    }

    #[test]
    fn test_roll_required_false_after_close() {
        let dir = TempDir::new().unwrap();
        let writer = new_writer(&dir, LogConfig::new().with_max_file_size(1));
        writer.close();
        assert!(!writer.is_roll_required(&put_record(b"a")));
    }

    #[test]
    fn test_max_file_size_clamped() {
        let dir = TempDir::new().unwrap();
        let writer = new_writer(
            &dir,
            LogConfig::new().with_max_file_size(DEFAULT_MAX_FILE_SIZE * 4),
        );
        assert_eq!(writer.max_file_size(), DEFAULT_MAX_FILE_SIZE);
    }

    #[test]
    fn test_create_refuses_existing_segment() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log-7");
        std::fs::write(&path, b"stale").unwrap();

        assert!(matches!(
            LogFileWriter::create(&path, 7, &LogConfig::default(), LogFormat::V1),
            Err(WeirError::Io(_))
        ));
    }

    #[test]
    fn test_offset_overflow_guard() {
        let dir = TempDir::new().unwrap();
        let writer = new_writer(&dir, LogConfig::default());

        // Force the logical position to the ceiling; the guard must trip
        // before any preallocation or write happens.
        writer.state.lock().position = i32::MAX as u64 - 4;
        let err = writer.put(&put_record(b"a")).unwrap_err();
        assert!(matches!(err, WeirError::OffsetOverflow { .. }));
    }
}
