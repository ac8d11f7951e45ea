//! Error types for decoding, playback and session lifecycle.

use thiserror::Error;

/// Errors surfaced by `open`, backend calls and the demo player.
///
/// `DecodeSession::read` and `DecodeSession::seek` never return these; they
/// degrade to short reads and unchanged positions instead.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// Failed to open the audio source.
    #[error("Failed to open audio source: {0}")]
    SourceError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Container or codec parameters could not be understood.
    #[error("Unsupported or invalid audio format: {0}")]
    InvalidFormat(String),

    /// The source has no decodable audio stream.
    #[error("No supported audio stream")]
    NoAudioStream,

    /// Native sample width outside what the format converter accepts.
    #[error("Unsupported sample width: {0} bits")]
    UnsupportedSampleWidth(u32),

    /// Backend reported a failure it cannot recover from.
    #[error("Backend error: {0}")]
    Backend(String),

    /// Repositioning request was refused by the backend.
    #[error("Seek failed: {0}")]
    SeekFailed(String),

    #[error("Session already open")]
    AlreadyOpen,

    #[error("Session not open")]
    NotOpen,

    /// Audio output device is missing or broke.
    #[error("Audio output error: {0}")]
    Output(String),

    #[error("Resampler error: {0}")]
    Resample(String),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

impl DecodeError {
    /// Returns `true` if a session that hit this error cannot decode any further.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DecodeError::SourceError(_)
                | DecodeError::IoError(_)
                | DecodeError::InvalidFormat(_)
                | DecodeError::NoAudioStream
                | DecodeError::UnsupportedSampleWidth(_)
                | DecodeError::Backend(_)
        )
    }

    /// Returns `true` if this error is about the file's format or codec.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            DecodeError::InvalidFormat(_)
                | DecodeError::NoAudioStream
                | DecodeError::UnsupportedSampleWidth(_)
        )
    }
}

/// Result type for decoder operations.
pub type Result<T> = std::result::Result<T, DecodeError>;
