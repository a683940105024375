//! Loader error types

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by background load tasks
#[derive(Error, Debug)]
pub enum LoadError {
    /// WAV header or sample data could not be read
    #[error("Failed to decode WAV file {path}: {source}")]
    Wav {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },

    /// File has no channels
    #[error("File has no audio channels: {0}")]
    NoChannels(PathBuf),

    /// Integer sample width hound cannot widen to 32 bits
    #[error("Unsupported sample format in {path}: {bits}-bit {format}")]
    UnsupportedFormat {
        path: PathBuf,
        bits: u16,
        format: &'static str,
    },

    /// Scan root is missing or not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Directory traversal failed
    #[error("Failed to scan {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// Load task finished without producing a result
    #[error("Load task ended without a result")]
    Incomplete,
}

/// Result type for load operations
pub type LoadResult<T> = Result<T, LoadError>;
