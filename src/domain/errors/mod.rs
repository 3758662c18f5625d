// Domain errors - Error types for the domain and application layers

use std::fmt;

use crate::error::TranscodeError;

/// Domain-specific error types
#[derive(Debug, Clone)]
pub enum DomainError {
    /// Invalid arguments provided
    BadArgs(String),
    /// File not found
    FileNotFound(String),
    /// Output already exists and overwriting was not allowed
    OutputExists(String),
    /// Encode profile rejected by validation
    InvalidProfile(String),
    /// Configuration could not be loaded or parsed
    ConfigFail(String),
    /// File system operation failed
    FsFail(String),
    /// The transcode pipeline failed
    Transcode(TranscodeError),
    /// Internal error
    InternalError(String),
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainError::BadArgs(msg) => write!(f, "Bad arguments: {}", msg),
            DomainError::FileNotFound(msg) => write!(f, "File not found: {}", msg),
            DomainError::OutputExists(msg) => write!(f, "Output already exists: {}", msg),
            DomainError::InvalidProfile(msg) => write!(f, "Invalid profile: {}", msg),
            DomainError::ConfigFail(msg) => write!(f, "Configuration error: {}", msg),
            DomainError::FsFail(msg) => write!(f, "File system error: {}", msg),
            DomainError::Transcode(err) => write!(f, "Transcode failed: {}", err),
            DomainError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for DomainError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DomainError::Transcode(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TranscodeError> for DomainError {
    fn from(err: TranscodeError) -> Self {
        DomainError::Transcode(err)
    }
}
