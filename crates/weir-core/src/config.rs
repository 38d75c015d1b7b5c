use serde::{Deserialize, Serialize};

/// Hard ceiling on segment size, comfortably below 2^31 so that every frame
/// offset within a segment fits in a signed 32-bit integer with room for the
/// preallocation chunk that may extend the file past the roll point.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1_623_195_647;

/// Configuration for a segment log writer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Maximum logical size of a segment before the caller is expected to
    /// roll to a new one. Values above [`DEFAULT_MAX_FILE_SIZE`] are clamped
    /// at writer construction.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
        }
    }
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }
}

fn default_max_file_size() -> u64 {
    DEFAULT_MAX_FILE_SIZE
}
