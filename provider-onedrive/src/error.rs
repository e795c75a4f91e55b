//! Error types for the OneDrive provider

use bridge_traits::error::BridgeError;
use bridge_traits::storage::ParseVisibilityError;
use thiserror::Error;

/// OneDrive provider errors
#[derive(Error, Debug)]
pub enum OneDriveError {
    /// Path contains a character the drive rejects; raised before any request
    #[error("Invalid character {character} in path {path}")]
    InvalidPath { path: String, character: char },

    #[error("File not found at path: {path}")]
    FileNotFound { path: String },

    /// Final upload chunk answered 409
    #[error("File name conflict: an item already exists at {path}")]
    NameConflict { path: String },

    /// Upload URL no longer valid; a new session must be created
    #[error("Upload session has expired, create a new upload session")]
    SessionExpired,

    #[error("Rate limit still in effect after {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("Upload failed after {attempts} attempts (last status {status})")]
    TransientServer { status: u16, attempts: u32 },

    #[error("Unknown visibility: {0}")]
    InvalidVisibility(String),

    #[error("Unexpected status {status} while {context}")]
    UnknownProtocol { status: u16, context: String },

    /// Remote item could not be turned into file attributes
    #[error("Failed to normalize item metadata: {0}")]
    Normalization(String),

    #[error("Operation cancelled")]
    Cancelled,

    /// Non-success answer from the drive API
    #[error("OneDrive API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse API response: {0}")]
    Parse(String),

    /// Byte source ended before its declared size
    #[error("Byte source ended early: expected {expected} bytes, got {actual}")]
    ShortRead { expected: u64, actual: u64 },

    /// Backend failure wrapped with the storage operation it interrupted
    #[error("Unable to {operation}: {message}")]
    Storage {
        operation: &'static str,
        message: String,
        #[source]
        source: Option<Box<OneDriveError>>,
    },

    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

/// Result type for OneDrive operations
pub type Result<T> = std::result::Result<T, OneDriveError>;

impl OneDriveError {
    /// Backend status code behind this error, if there is one
    pub fn status(&self) -> Option<u16> {
        match self {
            OneDriveError::Api { status, .. }
            | OneDriveError::TransientServer { status, .. }
            | OneDriveError::UnknownProtocol { status, .. } => Some(*status),
            OneDriveError::FileNotFound { .. } | OneDriveError::SessionExpired => Some(404),
            OneDriveError::NameConflict { .. } => Some(409),
            OneDriveError::RateLimited { .. } => Some(429),
            OneDriveError::Storage {
                source: Some(source),
                ..
            } => source.status(),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, OneDriveError::FileNotFound { .. })
            || matches!(self, OneDriveError::Api { status: 404, .. })
    }

    pub(crate) fn storage(operation: &'static str, message: impl Into<String>) -> Self {
        OneDriveError::Storage {
            operation,
            message: message.into(),
            source: None,
        }
    }

    /// Attach storage-operation context to backend failures.
    ///
    /// Typed errors callers match on pass through untouched; raw API,
    /// parse and bridge failures are wrapped with their cause preserved.
    pub(crate) fn in_operation(self, operation: &'static str) -> Self {
        match self {
            OneDriveError::Api { .. }
            | OneDriveError::Parse(_)
            | OneDriveError::Normalization(_)
            | OneDriveError::ShortRead { .. }
            | OneDriveError::Bridge(_) => OneDriveError::Storage {
                operation,
                message: self.to_string(),
                source: Some(Box::new(self)),
            },
            other => other,
        }
    }
}

impl From<ParseVisibilityError> for OneDriveError {
    fn from(error: ParseVisibilityError) -> Self {
        OneDriveError::InvalidVisibility(error.0)
    }
}

impl From<OneDriveError> for BridgeError {
    fn from(error: OneDriveError) -> Self {
        match error {
            OneDriveError::Bridge(e) => e,
            other => BridgeError::OperationFailed(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_display() {
        let error = OneDriveError::Api {
            status: 403,
            message: "accessDenied".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "OneDrive API error (status 403): accessDenied"
        );
    }

    #[test]
    fn test_storage_wrapper_keeps_cause() {
        let error = OneDriveError::Api {
            status: 500,
            message: "generalException".to_string(),
        }
        .in_operation("create directory");

        assert!(error.to_string().starts_with("Unable to create directory"));
        assert_eq!(error.status(), Some(500));
        assert!(error.source().is_some());
    }

    #[test]
    fn test_typed_errors_are_not_wrapped() {
        let error = OneDriveError::FileNotFound {
            path: "a.txt".to_string(),
        }
        .in_operation("delete");

        assert!(matches!(error, OneDriveError::FileNotFound { .. }));
        assert!(error.is_not_found());
    }

    #[test]
    fn test_not_found_detection() {
        let api = OneDriveError::Api {
            status: 404,
            message: "itemNotFound".to_string(),
        };
        assert!(api.is_not_found());
        assert!(!OneDriveError::SessionExpired.is_not_found());
    }

    #[test]
    fn test_invalid_visibility_from_parse_error() {
        let error: OneDriveError = "shared".parse::<bridge_traits::Visibility>().unwrap_err().into();
        assert!(matches!(error, OneDriveError::InvalidVisibility(ref v) if v == "shared"));
    }

    #[test]
    fn test_error_conversion() {
        let error = OneDriveError::Cancelled;
        let bridge_error: BridgeError = error.into();

        assert!(matches!(bridge_error, BridgeError::OperationFailed(_)));
    }
}
