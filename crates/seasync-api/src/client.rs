//! Seafile web API client
//!
//! Typed HTTP client for the Seafile REST endpoints the sync engine depends
//! on. One `reqwest::Client` instance is shared across all operations; within
//! a cycle, operations against a single library are serialized by the caller.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use seasync_api::SeafileClient;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let token = SeafileClient::login("https://seafile.example.com", "alice", "secret").await?;
//! let client = SeafileClient::new("https://seafile.example.com", token);
//! let libraries = client.list_libraries().await?;
//! println!("{} libraries", libraries.len());
//! # Ok(())
//! # }
//! ```

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use tracing::{debug, instrument, warn};

use seasync_core::domain::newtypes::{LibraryId, ObjectId, RemotePath};
use seasync_core::domain::RemoteEntry;

use crate::types::{unquote, AuthTokenResponse, DirEntry, LibraryInfo};
use crate::ApiError;

/// HTTP client for Seafile web API calls
///
/// Wraps `reqwest::Client` with the `Authorization: Token` header and
/// endpoint construction against the account's base URL.
pub struct SeafileClient {
    /// The underlying HTTP client, reused across requests
    client: Client,
    /// Server base URL without trailing slash
    base_url: String,
    /// Opaque bearer token issued at login
    token: String,
}

impl SeafileClient {
    /// Creates a new client for an authenticated account
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    /// Returns the server base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Creates an authenticated request builder for the given method and path
    ///
    /// Automatically prepends the base URL and adds the `Authorization: Token`
    /// header.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .request(method, &url)
            .header("Authorization", format!("Token {}", self.token))
    }

    /// Maps a response to `ApiError` when the status is not a success
    async fn check(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(ApiError::from_status(status))
        }
    }

    // ========================================================================
    // Authentication
    // ========================================================================

    /// Obtains an API token for the given credentials
    ///
    /// `POST /api2/auth-token/` with form fields `username` and `password`.
    /// An HTTP 400 means the server rejected the credentials.
    #[instrument(skip(password))]
    pub async fn login(
        server_url: &str,
        username: &str,
        password: &str,
    ) -> Result<String, ApiError> {
        let base = server_url.trim_end_matches('/');
        let url = format!("{base}/api2/auth-token/");

        let response = Client::new()
            .post(&url)
            .form(&[("username", username), ("password", password)])
            .send()
            .await?;

        if response.status() == StatusCode::BAD_REQUEST {
            return Err(ApiError::InvalidCredentials);
        }
        let response = Self::check(response).await?;

        let body: AuthTokenResponse = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("auth token body: {e}")))?;

        debug!("Obtained auth token");
        Ok(body.token)
    }

    /// Verifies the stored token against the server
    ///
    /// `GET /api2/auth/ping/` returns a body containing `pong` when the token
    /// is valid.
    pub async fn ping(&self) -> Result<(), ApiError> {
        let response = self.request(Method::GET, "/api2/auth/ping/").send().await?;
        let response = Self::check(response).await?;

        let body = response.text().await?;
        if body.contains("pong") {
            Ok(())
        } else {
            Err(ApiError::InvalidResponse(format!(
                "unexpected ping body: {body}"
            )))
        }
    }

    // ========================================================================
    // Libraries
    // ========================================================================

    /// Lists all libraries visible to the account
    ///
    /// The server returns a bare JSON array.
    #[instrument(skip(self))]
    pub async fn list_libraries(&self) -> Result<Vec<LibraryInfo>, ApiError> {
        let response = self.request(Method::GET, "/api2/repos/").send().await?;
        let response = Self::check(response).await?;

        let infos: Vec<LibraryInfo> = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("library list body: {e}")))?;

        debug!(count = infos.len(), "Listed libraries");
        Ok(infos)
    }

    /// Provides the password for an encrypted library
    ///
    /// HTTP 400 means the password is wrong.
    #[instrument(skip(self, password))]
    pub async fn set_library_password(
        &self,
        library: &LibraryId,
        password: &str,
    ) -> Result<(), ApiError> {
        let path = format!("/api2/repos/{}/", library.as_str());
        let response = self
            .request(Method::POST, &path)
            .form(&[("password", password)])
            .send()
            .await?;

        if response.status() == StatusCode::BAD_REQUEST {
            return Err(ApiError::IncorrectPassword);
        }
        Self::check(response).await.map(|_| ())
    }

    // ========================================================================
    // Directory listing
    // ========================================================================

    /// Lists the immediate children of a directory
    ///
    /// The `p` query parameter is percent-encoded by the query serializer;
    /// the leading `/` is preserved.
    pub async fn list_directory(
        &self,
        library: &LibraryId,
        path: &RemotePath,
    ) -> Result<Vec<DirEntry>, ApiError> {
        let endpoint = format!("/api2/repos/{}/dir/", library.as_str());
        let response = self
            .request(Method::GET, &endpoint)
            .query(&[("p", path.as_str())])
            .send()
            .await?;
        let response = Self::check(response).await?;

        let entries: Vec<DirEntry> = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("directory listing body: {e}")))?;

        Ok(entries)
    }

    /// Recursively lists every entry under the library root
    ///
    /// Depth-first, preserving the server-provided order within each
    /// directory: each child is emitted with its full path, then directory
    /// children are descended into before the next sibling.
    #[instrument(skip(self))]
    pub async fn list_recursive(&self, library: &LibraryId) -> Result<Vec<RemoteEntry>, ApiError> {
        let mut entries = Vec::new();
        self.walk_remote(library, &RemotePath::root(), &mut entries)
            .await?;
        debug!(count = entries.len(), "Recursive listing complete");
        Ok(entries)
    }

    fn walk_remote<'a>(
        &'a self,
        library: &'a LibraryId,
        dir: &'a RemotePath,
        out: &'a mut Vec<RemoteEntry>,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<(), ApiError>> + Send + 'a>>
    {
        Box::pin(async move {
            let children = self.list_directory(library, dir).await?;

            for child in children {
                let path = match dir.join(&child.name) {
                    Ok(p) => p,
                    Err(err) => {
                        warn!(name = %child.name, %err, "Skipping entry with invalid name");
                        continue;
                    }
                };
                let object_id = match ObjectId::new(child.id.clone()) {
                    Ok(o) => o,
                    Err(err) => {
                        warn!(path = %path, %err, "Skipping entry with invalid object id");
                        continue;
                    }
                };

                let is_dir = child.is_dir();
                out.push(RemoteEntry {
                    path: path.clone(),
                    object_id,
                    mtime: child.mtime,
                    size: if is_dir { 0 } else { child.size },
                    is_dir,
                });

                if is_dir {
                    self.walk_remote(library, &path, out).await?;
                }
            }

            Ok(())
        })
    }

    // ========================================================================
    // Transfers
    // ========================================================================

    /// Resolves the download URL for a file
    ///
    /// The body is a JSON-encoded string (with surrounding quotes).
    pub async fn download_link(
        &self,
        library: &LibraryId,
        path: &RemotePath,
    ) -> Result<String, ApiError> {
        let endpoint = format!("/api2/repos/{}/file/", library.as_str());
        let response = self
            .request(Method::GET, &endpoint)
            .query(&[("p", path.as_str()), ("reuse", "1")])
            .send()
            .await?;
        let response = Self::check(response).await?;

        let body = response.text().await?;
        let link = unquote(&body).to_string();
        if !link.starts_with("http://") && !link.starts_with("https://") {
            return Err(ApiError::InvalidResponse(format!(
                "download link is not a URL: {link}"
            )));
        }
        Ok(link)
    }

    /// Fetches a file's content from a previously resolved download link
    pub async fn download(&self, link: &str) -> Result<Vec<u8>, ApiError> {
        let response = self.client.get(link).send().await?;
        let response = Self::check(response).await?;
        let bytes = response.bytes().await?;
        debug!(bytes = bytes.len(), "Downloaded file content");
        Ok(bytes.to_vec())
    }

    /// Resolves the upload URL for a parent directory
    ///
    /// HTTP 404 means the parent does not exist yet on the server.
    pub async fn upload_link(
        &self,
        library: &LibraryId,
        parent: &RemotePath,
    ) -> Result<String, ApiError> {
        let endpoint = format!("/api2/repos/{}/upload-link/", library.as_str());
        let response = self
            .request(Method::GET, &endpoint)
            .query(&[("p", parent.as_str())])
            .send()
            .await?;
        let response = Self::check(response).await?;

        let body = response.text().await?;
        let link = unquote(&body).to_string();
        if !link.starts_with("http://") && !link.starts_with("https://") {
            return Err(ApiError::InvalidResponse(format!(
                "upload link is not a URL: {link}"
            )));
        }
        Ok(link)
    }

    /// Uploads a file through a previously resolved upload link
    ///
    /// Posts a multipart form with fields `parent_dir`, `replace=1`, and the
    /// file part. HTTP 443 means the account is over quota.
    #[instrument(skip(self, data), fields(bytes = data.len()))]
    pub async fn upload(
        &self,
        link: &str,
        parent: &RemotePath,
        file_name: &str,
        data: &[u8],
    ) -> Result<(), ApiError> {
        let part = reqwest::multipart::Part::bytes(data.to_vec()).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new()
            .text("parent_dir", parent.as_str().to_string())
            .text("replace", "1")
            .part("file", part);

        let response = self
            .client
            .post(link)
            .header("Authorization", format!("Token {}", self.token))
            .multipart(form)
            .send()
            .await?;

        Self::check(response).await.map(|_| ())
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Deletes a remote file
    pub async fn delete_file(
        &self,
        library: &LibraryId,
        path: &RemotePath,
    ) -> Result<(), ApiError> {
        let endpoint = format!("/api2/repos/{}/file/", library.as_str());
        let response = self
            .request(Method::DELETE, &endpoint)
            .query(&[("p", path.as_str())])
            .send()
            .await?;
        Self::check(response).await.map(|_| ())
    }

    /// Deletes a remote directory
    pub async fn delete_directory(
        &self,
        library: &LibraryId,
        path: &RemotePath,
    ) -> Result<(), ApiError> {
        let endpoint = format!("/api2/repos/{}/dir/", library.as_str());
        let response = self
            .request(Method::DELETE, &endpoint)
            .query(&[("p", path.as_str())])
            .send()
            .await?;
        Self::check(response).await.map(|_| ())
    }

    /// Creates a remote directory
    pub async fn make_directory(
        &self,
        library: &LibraryId,
        path: &RemotePath,
    ) -> Result<(), ApiError> {
        let endpoint = format!("/api2/repos/{}/dir/", library.as_str());
        let response = self
            .request(Method::POST, &endpoint)
            .query(&[("p", path.as_str())])
            .form(&[("operation", "mkdir")])
            .send()
            .await?;
        Self::check(response).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_strips_trailing_slash() {
        let client = SeafileClient::new("https://seafile.example.com/", "tok");
        assert_eq!(client.base_url(), "https://seafile.example.com");
    }

    #[test]
    fn test_request_builder_sets_token_header() {
        let client = SeafileClient::new("https://seafile.example.com", "secret-token");
        let request = client
            .request(Method::GET, "/api2/repos/")
            .build()
            .unwrap();
        assert_eq!(
            request.url().as_str(),
            "https://seafile.example.com/api2/repos/"
        );
        let auth = request
            .headers()
            .get("authorization")
            .unwrap()
            .to_str()
            .unwrap();
        assert_eq!(auth, "Token secret-token");
    }

    #[test]
    fn test_query_parameter_is_percent_encoded() {
        let client = SeafileClient::new("https://seafile.example.com", "tok");
        let path = RemotePath::new("/My Docs/ä.txt".to_string()).unwrap();
        let request = client
            .request(Method::GET, "/api2/repos/lib-1/dir/")
            .query(&[("p", path.as_str())])
            .build()
            .unwrap();
        let query = request.url().query().unwrap();
        assert!(query.starts_with("p=%2F"), "query was: {query}");
        assert!(!query.contains(' '));
    }

    #[test]
    fn test_mkdir_request_shape() {
        let client = SeafileClient::new("https://seafile.example.com", "tok");
        let request = client
            .request(Method::POST, "/api2/repos/lib-1/dir/")
            .query(&[("p", "/newdir")])
            .form(&[("operation", "mkdir")])
            .build()
            .unwrap();
        assert_eq!(request.method(), Method::POST);
        assert!(request.url().query().unwrap().contains("p=%2Fnewdir"));
    }
}
