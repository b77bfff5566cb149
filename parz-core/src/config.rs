use std::path::PathBuf;

use crate::codec::CodecKind;

/// Inputs at or below this size are compressed as a single chunk.
pub const DEFAULT_SMALL_FILE_THRESHOLD: u64 = 1 << 20;

/// Per-chunk result size kept in memory before spilling to a scratch file.
pub const DEFAULT_MEMORY_LIMIT: usize = 64 << 20;

/// Settings for one compress/decompress run. Resolved once at operation
/// start and handed down explicitly; nothing below reads process state.
#[derive(Clone, Debug)]
pub struct Config {
    /// Worker count and concurrency bound. `0` means one per logical CPU.
    pub workers: usize,
    pub codec: CodecKind,
    /// Codec level; `None` picks the codec default.
    pub level: Option<i32>,
    pub small_file_threshold: u64,
    pub memory_limit: usize,
    /// Where spilled chunk results go. `None` uses the system temp dir.
    pub scratch_dir: Option<PathBuf>,
    pub progress: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: 0,
            codec: CodecKind::Zstd,
            level: None,
            small_file_threshold: DEFAULT_SMALL_FILE_THRESHOLD,
            memory_limit: DEFAULT_MEMORY_LIMIT,
            scratch_dir: None,
            progress: false,
        }
    }
}

impl Config {
    pub fn resolved_workers(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
    }
}
