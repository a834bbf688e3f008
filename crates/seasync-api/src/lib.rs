//! SeaSync API - Seafile server adapter
//!
//! Typed HTTP client for the Seafile web API plus the adapters that bind it
//! to the core's ports:
//!
//! - [`SeafileClient`] - endpoint-level client over a shared `reqwest::Client`
//! - [`SeafileProvider`] - `ILibraryProvider` implementation
//! - [`KeyringSecretStore`] - `ISecretStore` over the OS credential store
//! - [`ApiError`] - categorized protocol errors

pub mod client;
pub mod provider;
pub mod secrets;
pub mod types;

pub use client::SeafileClient;
pub use provider::SeafileProvider;
pub use secrets::KeyringSecretStore;

use thiserror::Error;

/// Categorized errors raised by the Seafile API surface
///
/// Non-2xx statuses map onto these; everything else is `Network` or
/// `InvalidResponse`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Login rejected (HTTP 400 on the auth-token endpoint)
    #[error("invalid username or password")]
    InvalidCredentials,

    /// Wrong password for an encrypted library (HTTP 400 on set-password)
    #[error("incorrect library password")]
    IncorrectPassword,

    /// HTTP 404
    #[error("not found on server")]
    NotFound,

    /// HTTP 403
    #[error("permission denied by server")]
    PermissionDenied,

    /// HTTP 443 on upload
    #[error("storage quota exceeded")]
    QuotaExceeded,

    /// Malformed body or unexpected content
    #[error("invalid response from server: {0}")]
    InvalidResponse(String),

    /// Any other non-success status
    #[error("server error (HTTP {0})")]
    ServerError(u16),

    /// Transport-level failure
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl ApiError {
    /// Maps a non-special status code to the generic categories
    pub(crate) fn from_status(status: reqwest::StatusCode) -> Self {
        match status.as_u16() {
            403 => ApiError::PermissionDenied,
            404 => ApiError::NotFound,
            443 => ApiError::QuotaExceeded,
            code => ApiError::ServerError(code),
        }
    }
}
