//! Error types for MeshSeq.

use thiserror::Error;

/// Main error type for MeshSeq operations.
#[derive(Error, Debug)]
pub enum MeshSeqError {
    /// The host cannot deliver frame-accurate clock notifications.
    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Loader error: {0}")]
    Loader(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MeshSeqError {
    /// True for the fatal missing-clock-capability condition.
    pub fn is_unsupported_platform(&self) -> bool {
        matches!(self, Self::UnsupportedPlatform(_))
    }
}

/// Result type alias for MeshSeq operations.
pub type Result<T> = std::result::Result<T, MeshSeqError>;
