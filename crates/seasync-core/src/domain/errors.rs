//! Domain error types
//!
//! Validation failures raised when constructing domain values.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid local path format or content
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Invalid remote path format
    #[error("Invalid remote path: {0}")]
    InvalidRemotePath(String),

    /// Invalid library identifier
    #[error("Invalid library id: {0}")]
    InvalidLibraryId(String),

    /// Invalid object identifier
    #[error("Invalid object id: {0}")]
    InvalidObjectId(String),

    /// Invalid library permission string
    #[error("Invalid permission: {0}")]
    InvalidPermission(String),

    /// Invalid server URL
    #[error("Invalid server URL: {0}")]
    InvalidServerUrl(String),

    /// Path is not within the configured sync root
    #[error("Path not within sync root: {0}")]
    PathNotInSyncRoot(String),
}
