use crate::path::BlobPath;
use std::io;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type BlobResult<T> = std::result::Result<T, BlobStoreError>;

/// Coarse classification of a [`BlobStoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed location, path segment, blob name or setting.
    Configuration,
    /// The backend does not offer this operation.
    Unsupported,
    /// Opening or reading bytes failed.
    Io,
}

#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum BlobStoreError {
    #[error("{message}")]
    Configuration {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("{operation} is not supported: {reason}")]
    Unsupported {
        operation: &'static str,
        reason: &'static str,
    },

    #[error("failed to access {location}: {source}")]
    Io {
        location: String,
        #[source]
        source: io::Error,
    },
}

impl BlobStoreError {
    pub fn configuration(message: impl Into<String>) -> Self {
        BlobStoreError::Configuration {
            message: message.into(),
            source: None,
        }
    }

    /// A path could not be turned into a valid backend location.
    pub fn malformed_location(path: &BlobPath, source: impl Into<BoxError>) -> Self {
        BlobStoreError::Configuration {
            message: format!("malformed location for path {path}"),
            source: Some(source.into()),
        }
    }

    pub fn invalid_setting(key: &str, value: &str, source: impl Into<BoxError>) -> Self {
        BlobStoreError::Configuration {
            message: format!("invalid value '{value}' for setting '{key}'"),
            source: Some(source.into()),
        }
    }

    pub fn unsupported(operation: &'static str, reason: &'static str) -> Self {
        BlobStoreError::Unsupported { operation, reason }
    }

    pub fn io(location: impl Into<String>, source: io::Error) -> Self {
        BlobStoreError::Io {
            location: location.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BlobStoreError::Configuration { .. } => ErrorKind::Configuration,
            BlobStoreError::Unsupported { .. } => ErrorKind::Unsupported,
            BlobStoreError::Io { .. } => ErrorKind::Io,
        }
    }

    /// True for I/O failures caused by a missing blob.
    pub fn is_not_found(&self) -> bool {
        matches!(self, BlobStoreError::Io { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}
