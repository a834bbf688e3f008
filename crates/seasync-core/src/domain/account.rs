//! Account entity
//!
//! A configured server account: base URL, username, and the opaque bearer
//! token issued at login. Serialized as JSON into the secret store; never
//! persisted in the state database.

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

/// A configured Seafile server account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    server_url: String,
    username: String,
    token: String,
}

impl Account {
    /// Create a new account
    ///
    /// The server URL is normalized by stripping a trailing slash so endpoint
    /// paths can be appended verbatim.
    ///
    /// # Errors
    /// Returns an error if the URL does not start with `http://` or
    /// `https://`, or if the username or token is empty.
    pub fn new(
        server_url: impl Into<String>,
        username: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let server_url = server_url.into();
        if !server_url.starts_with("http://") && !server_url.starts_with("https://") {
            return Err(DomainError::InvalidServerUrl(server_url));
        }

        let username = username.into();
        if username.is_empty() {
            return Err(DomainError::InvalidServerUrl(
                "username cannot be empty".to_string(),
            ));
        }

        let token = token.into();
        if token.is_empty() {
            return Err(DomainError::InvalidServerUrl(
                "token cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            server_url: server_url.trim_end_matches('/').to_string(),
            username,
            token,
        })
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Replace the token after the server re-issues one
    pub fn update_token(&mut self, token: impl Into<String>) {
        self.token = token.into();
    }
}
