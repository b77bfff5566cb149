use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failure captured inside a single chunk worker. Never crosses a worker
/// boundary as a panic; it rides along in the `ChunkResult`.
#[derive(Error, Debug)]
pub enum ChunkError {
    #[error("range {start}+{length} lies outside the {size}-byte input")]
    OutOfRange { start: u64, length: u64, size: u64 },

    #[error("{codec} codec failed")]
    Codec {
        codec: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("scratch storage unavailable")]
    Scratch(#[source] io::Error),

    #[error("worker panicked: {0}")]
    Panicked(String),
}

#[derive(Error, Debug)]
pub enum ParzError {
    #[error("input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// The path is empty when the size came from a caller rather than a file.
    #[error("{} is empty", input_label(.0))]
    EmptyInput(PathBuf),

    #[error("corrupt container: {0}")]
    CorruptContainer(String),

    #[error("chunk {index} failed")]
    ChunkFailure {
        index: u32,
        #[source]
        source: ChunkError,
    },

    #[error("insufficient resources while processing chunk {index}")]
    InsufficientResources {
        index: u32,
        #[source]
        source: io::Error,
    },

    #[error("unknown operation {0:?} (expected compress or decompress)")]
    UnknownOperation(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ParzError {
    /// Lift a worker failure into the operation-level error for chunk `index`.
    pub fn from_chunk(index: u32, err: ChunkError) -> Self {
        match err {
            ChunkError::Scratch(source) => ParzError::InsufficientResources { index, source },
            ChunkError::Codec { source, .. } if source.kind() == io::ErrorKind::OutOfMemory => {
                ParzError::InsufficientResources { index, source }
            }
            other => ParzError::ChunkFailure { index, source: other },
        }
    }

    /// Index of the failing chunk, when the error came out of a worker.
    pub fn chunk_index(&self) -> Option<u32> {
        match self {
            ParzError::ChunkFailure { index, .. } | ParzError::InsufficientResources { index, .. } => {
                Some(*index)
            }
            _ => None,
        }
    }
}

fn input_label(path: &Path) -> String {
    if path.as_os_str().is_empty() {
        "input".to_string()
    } else {
        format!("input file {}", path.display())
    }
}

pub type Result<T> = std::result::Result<T, ParzError>;
