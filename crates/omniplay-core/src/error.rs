//! Error types for Omniplay Core

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for media element operations
pub type Result<T> = std::result::Result<T, Error>;

/// Media element error types
#[derive(Error, Debug)]
pub enum Error {
    // Source resolution errors
    #[error("Media source not supported: {0}")]
    SourceNotSupported(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Backend not supported in this runtime: {0}")]
    Capability(String),

    #[error("Playback aborted")]
    PlaybackAborted,

    // Contract violations
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Index {index} out of range for {length} time ranges")]
    IndexSize { index: usize, length: usize },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an invalid-argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// Taxonomy kind, for the errors that can become a media error
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Error::SourceNotSupported(_) => Some(ErrorKind::SourceNotSupported),
            Error::Network(_) => Some(ErrorKind::NetworkError),
            Error::Capability(_) => Some(ErrorKind::CapabilityError),
            Error::PlaybackAborted => Some(ErrorKind::PlaybackAborted),
            _ => None,
        }
    }

    /// Returns true if this error should send resolution to the next candidate
    pub fn is_recoverable(&self) -> bool {
        self.kind().is_some_and(ErrorKind::triggers_fallback)
    }

    /// Returns the error code for logs
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::SourceNotSupported(_) => "SRC_NOT_SUPPORTED",
            Error::Network(_) => "NETWORK",
            Error::Capability(_) => "CAPABILITY",
            Error::PlaybackAborted => "ABORTED",
            Error::InvalidArgument(_) => "INVALID_ARGUMENT",
            Error::IndexSize { .. } => "INDEX_SIZE",
            Error::InvalidState(_) => "INVALID_STATE",
            Error::Config(_) => "INVALID_CONFIG",
            Error::Internal(_) => "INTERNAL",
        }
    }

    /// Convert into the host-visible media error, if this error has a taxonomy kind
    pub fn to_media_error(&self) -> Option<MediaError> {
        self.kind().map(|kind| MediaError::new(kind, self.to_string()))
    }
}

/// Error taxonomy shared by backends and the host surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    SourceNotSupported,
    NetworkError,
    CapabilityError,
    PlaybackAborted,
}

impl ErrorKind {
    /// Network and capability failures move resolution to the next candidate
    pub fn triggers_fallback(self) -> bool {
        matches!(self, ErrorKind::NetworkError | ErrorKind::CapabilityError)
    }

    /// HTML media error code (`MediaError.code`)
    pub fn media_error_code(self) -> u16 {
        match self {
            ErrorKind::PlaybackAborted => 1,
            ErrorKind::NetworkError => 2,
            ErrorKind::CapabilityError => 3,
            ErrorKind::SourceNotSupported => 4,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::SourceNotSupported => write!(f, "SourceNotSupported"),
            ErrorKind::NetworkError => write!(f, "NetworkError"),
            ErrorKind::CapabilityError => write!(f, "CapabilityError"),
            ErrorKind::PlaybackAborted => write!(f, "PlaybackAborted"),
        }
    }
}

/// Host-visible media error (`PlaybackState.error`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaError {
    pub kind: ErrorKind,
    pub message: String,
}

impl MediaError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn source_not_supported() -> Self {
        Self::new(ErrorKind::SourceNotSupported, "Media Source Not Supported")
    }

    /// HTML media error code
    pub fn code(&self) -> u16 {
        self.kind.media_error_code()
    }
}

impl std::fmt::Display for MediaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl From<MediaError> for Error {
    fn from(err: MediaError) -> Self {
        match err.kind {
            ErrorKind::SourceNotSupported => Error::SourceNotSupported(err.message),
            ErrorKind::NetworkError => Error::Network(err.message),
            ErrorKind::CapabilityError => Error::Capability(err.message),
            ErrorKind::PlaybackAborted => Error::PlaybackAborted,
        }
    }
}
