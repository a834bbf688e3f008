//! SeafileProvider - ILibraryProvider implementation for the Seafile web API
//!
//! Wraps the [`SeafileClient`] and fulfils the `ILibraryProvider` port
//! contract. Link resolution is an implementation detail here: the engine
//! asks for a download or upload and the provider performs the two-step
//! link-then-transfer exchange.

use anyhow::{Context, Result};
use tracing::debug;

use seasync_core::domain::library::Library;
use seasync_core::domain::newtypes::{LibraryId, RemotePath};
use seasync_core::domain::RemoteEntry;
use seasync_core::ports::ILibraryProvider;

use crate::client::SeafileClient;
use crate::ApiError;

/// Library provider implementation that delegates to the Seafile web API
pub struct SeafileProvider {
    client: SeafileClient,
}

impl SeafileProvider {
    /// Creates a new provider wrapping the given [`SeafileClient`]
    pub fn new(client: SeafileClient) -> Self {
        Self { client }
    }

    /// Creates the ancestor chain of `parent` on the server, top-down
    ///
    /// Errors on individual mkdir calls are tolerated: an ancestor may
    /// already exist, and the retried upload-link request reports the real
    /// outcome.
    async fn ensure_remote_parents(&self, library: &LibraryId, parent: &RemotePath) {
        let mut ancestors = Vec::new();
        let mut current = Some(parent.clone());
        while let Some(p) = current {
            if p.as_str() == "/" {
                break;
            }
            current = p.parent();
            ancestors.push(p);
        }

        for dir in ancestors.iter().rev() {
            if let Err(err) = self.client.make_directory(library, dir).await {
                debug!(path = %dir, %err, "mkdir while ensuring parents");
            }
        }
    }
}

#[async_trait::async_trait]
impl ILibraryProvider for SeafileProvider {
    async fn list_libraries(&self) -> Result<Vec<Library>> {
        let infos = self
            .client
            .list_libraries()
            .await
            .context("Failed to list libraries")?;

        let mut libraries = Vec::with_capacity(infos.len());
        for info in infos {
            libraries.push(info.into_library()?);
        }
        Ok(libraries)
    }

    async fn set_library_password(&self, library: &LibraryId, password: &str) -> Result<()> {
        self.client
            .set_library_password(library, password)
            .await
            .map_err(Into::into)
    }

    async fn list_entries(&self, library: &LibraryId) -> Result<Vec<RemoteEntry>> {
        self.client
            .list_recursive(library)
            .await
            .context("Failed to list remote entries")
    }

    async fn download(&self, library: &LibraryId, path: &RemotePath) -> Result<Vec<u8>> {
        let link = self
            .client
            .download_link(library, path)
            .await
            .with_context(|| format!("Failed to resolve download link for {path}"))?;
        self.client
            .download(&link)
            .await
            .with_context(|| format!("Failed to download {path}"))
    }

    async fn upload(
        &self,
        library: &LibraryId,
        parent: &RemotePath,
        name: &str,
        data: &[u8],
    ) -> Result<()> {
        let link = match self.client.upload_link(library, parent).await {
            Ok(link) => link,
            Err(ApiError::NotFound) => {
                // Parent chain missing on the server; create it and retry once.
                debug!(parent = %parent, "Upload link parent missing, creating remote chain");
                self.ensure_remote_parents(library, parent).await;
                self.client
                    .upload_link(library, parent)
                    .await
                    .with_context(|| {
                        format!("Failed to resolve upload link for {parent} after mkdir")
                    })?
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("Failed to resolve upload link for {parent}"))
            }
        };

        self.client
            .upload(&link, parent, name, data)
            .await
            .with_context(|| format!("Failed to upload {parent}/{name}"))
    }

    async fn delete_file(&self, library: &LibraryId, path: &RemotePath) -> Result<()> {
        self.client
            .delete_file(library, path)
            .await
            .with_context(|| format!("Failed to delete remote file {path}"))
    }

    async fn delete_directory(&self, library: &LibraryId, path: &RemotePath) -> Result<()> {
        self.client
            .delete_directory(library, path)
            .await
            .with_context(|| format!("Failed to delete remote directory {path}"))
    }

    async fn make_directory(&self, library: &LibraryId, path: &RemotePath) -> Result<()> {
        self.client
            .make_directory(library, path)
            .await
            .with_context(|| format!("Failed to create remote directory {path}"))
    }
}
