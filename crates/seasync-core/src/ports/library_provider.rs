//! Remote library port (driven/secondary port)
//!
//! The set of server operations the engine depends on, at the level of the
//! Seafile web API surface. The adapter handles endpoint construction, status
//! code mapping, and recursive listing.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because errors at port boundaries are
//!   adapter-specific; the adapter attaches its own typed error as context so
//!   the engine can downcast where a category matters (quota, password).
//! - `list_entries` flattens the remote tree depth-first, preserving the
//!   server-provided order within each directory.

use crate::domain::library::Library;
use crate::domain::newtypes::{LibraryId, RemotePath};
use crate::domain::RemoteEntry;

/// Port trait for remote library operations
#[async_trait::async_trait]
pub trait ILibraryProvider: Send + Sync {
    /// Lists all libraries visible to the account
    async fn list_libraries(&self) -> anyhow::Result<Vec<Library>>;

    /// Provides the password for an encrypted library
    ///
    /// Must be called once per cycle before listing an encrypted library.
    async fn set_library_password(
        &self,
        library: &LibraryId,
        password: &str,
    ) -> anyhow::Result<()>;

    /// Recursively lists every entry under the library root
    ///
    /// Depth-first: each directory's children follow it immediately, in the
    /// order the server returned them.
    async fn list_entries(&self, library: &LibraryId) -> anyhow::Result<Vec<RemoteEntry>>;

    /// Downloads a file's content
    async fn download(&self, library: &LibraryId, path: &RemotePath) -> anyhow::Result<Vec<u8>>;

    /// Uploads a file into `parent`, replacing any existing file of that name
    ///
    /// Implementations create the remote parent chain when the server reports
    /// the parent as missing.
    async fn upload(
        &self,
        library: &LibraryId,
        parent: &RemotePath,
        name: &str,
        data: &[u8],
    ) -> anyhow::Result<()>;

    /// Deletes a remote file
    async fn delete_file(&self, library: &LibraryId, path: &RemotePath) -> anyhow::Result<()>;

    /// Deletes a remote directory
    async fn delete_directory(&self, library: &LibraryId, path: &RemotePath)
        -> anyhow::Result<()>;

    /// Creates a remote directory
    async fn make_directory(&self, library: &LibraryId, path: &RemotePath) -> anyhow::Result<()>;
}
