//! Audio output error types

use thiserror::Error;

/// Errors opening or running the output stream
#[derive(Error, Debug)]
pub enum AudioError {
    /// Host has no default output device
    #[error("No default audio output device")]
    NoDefaultDevice,

    /// Named device not found
    #[error("Audio device not found: {0}")]
    DeviceNotFound(String),

    /// Failed to enumerate devices or configurations
    #[error("Failed to get device config: {0}")]
    ConfigError(String),

    /// Device offers no 32-bit float output
    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    /// Failed to build the output stream
    #[error("Failed to build audio stream: {0}")]
    StreamBuildError(String),

    /// Failed to start the output stream
    #[error("Failed to start audio stream: {0}")]
    StreamPlayError(String),

    /// Engine could not be created
    #[error("Failed to create audio engine: {0}")]
    Engine(#[from] crate::queue::QueueError),
}

/// Result type for audio operations
pub type AudioResult<T> = Result<T, AudioError>;
