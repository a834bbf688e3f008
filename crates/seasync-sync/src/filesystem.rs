//! Local filesystem adapter (secondary/driven adapter)
//!
//! Implements [`ILocalFileSystem`] using `tokio::fs`.
//!
//! ## Design Decisions
//!
//! - **Atomic writes**: write-to-temp + rename avoids partial files on crash
//!   or power loss, and replaces existing targets in one step.
//! - **Best-effort deletes**: a missing path is not an error; the reconciler
//!   may race the user.
//! - **mtime stamping**: downloaded files carry the remote modification time
//!   so the next cycle sees both sides in agreement.

use std::io::ErrorKind;

use filetime::FileTime;
use tracing::{debug, instrument};

use seasync_core::domain::newtypes::SyncPath;
use seasync_core::ports::local_filesystem::{FileSystemState, ILocalFileSystem};

/// Adapter that bridges the [`ILocalFileSystem`] port to the real filesystem.
///
/// Zero-sized: all operations derive their context from the [`SyncPath`]
/// arguments.
#[derive(Debug, Clone, Default)]
pub struct LocalFileSystemAdapter;

impl LocalFileSystemAdapter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl ILocalFileSystem for LocalFileSystemAdapter {
    #[instrument(skip(self), fields(path = %path))]
    async fn read_file(&self, path: &SyncPath) -> anyhow::Result<Vec<u8>> {
        let data = tokio::fs::read(path.as_path()).await?;
        debug!(bytes = data.len(), "file read complete");
        Ok(data)
    }

    #[instrument(skip(self, data), fields(path = %path, bytes = data.len()))]
    async fn write_file(&self, path: &SyncPath, data: &[u8]) -> anyhow::Result<()> {
        let target = path.as_path();

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // A directory left over from a type flip would make the rename fail.
        if let Ok(meta) = tokio::fs::metadata(target).await {
            if meta.is_dir() {
                debug!("removing directory occupying target path");
                tokio::fs::remove_dir_all(target).await?;
            }
        }

        // Temp file in the same directory so the rename is atomic (same
        // filesystem).
        let tmp_path = {
            let mut p = target.as_os_str().to_owned();
            p.push(".part");
            std::path::PathBuf::from(p)
        };

        tokio::fs::write(&tmp_path, data).await?;
        tokio::fs::rename(&tmp_path, target).await?;

        debug!("write complete");
        Ok(())
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn delete_file(&self, path: &SyncPath) -> anyhow::Result<()> {
        let p = path.as_path();
        let metadata = match tokio::fs::metadata(p).await {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("path already gone");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        if metadata.is_dir() {
            tokio::fs::remove_dir_all(p).await?;
        } else {
            tokio::fs::remove_file(p).await?;
        }

        debug!("delete complete");
        Ok(())
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn get_state(&self, path: &SyncPath) -> anyhow::Result<FileSystemState> {
        let metadata = match tokio::fs::metadata(path.as_path()).await {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok(FileSystemState::not_found());
            }
            Err(e) => return Err(e.into()),
        };

        let modified = metadata
            .modified()
            .ok()
            .and_then(|st| st.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|dur| dur.as_secs() as i64);

        Ok(FileSystemState {
            exists: true,
            is_file: metadata.is_file(),
            size: metadata.len(),
            modified,
        })
    }

    #[instrument(skip(self), fields(path = %path))]
    async fn create_directory(&self, path: &SyncPath) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(path.as_path()).await?;
        debug!("directory created");
        Ok(())
    }

    #[instrument(skip(self), fields(path = %path, mtime))]
    async fn set_mtime(&self, path: &SyncPath, mtime: i64) -> anyhow::Result<()> {
        let p = path.as_path().to_path_buf();
        let ft = FileTime::from_unix_time(mtime, 0);
        tokio::task::spawn_blocking(move || filetime::set_file_mtime(&p, ft)).await??;
        Ok(())
    }
}

// ============================================================================
// Unit tests
// ============================================================================

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    /// Helper: create a [`SyncPath`] inside the given temp directory.
    fn sync_path(dir: &TempDir, name: &str) -> SyncPath {
        SyncPath::new(dir.path().join(name)).expect("temp dir paths are absolute")
    }

    #[tokio::test]
    async fn test_read_write_roundtrip() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFileSystemAdapter::new();
        let path = sync_path(&dir, "hello.txt");

        fs.write_file(&path, b"Hello, SeaSync!").await.unwrap();
        let read_back = fs.read_file(&path).await.unwrap();
        assert_eq!(read_back, b"Hello, SeaSync!");
    }

    #[tokio::test]
    async fn test_write_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFileSystemAdapter::new();
        let path = sync_path(&dir, "a/b/c/nested.txt");

        fs.write_file(&path, b"nested content").await.unwrap();
        assert_eq!(fs.read_file(&path).await.unwrap(), b"nested content");
    }

    #[tokio::test]
    async fn test_write_overwrites_existing() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFileSystemAdapter::new();
        let path = sync_path(&dir, "overwrite.txt");

        fs.write_file(&path, b"first").await.unwrap();
        fs.write_file(&path, b"second").await.unwrap();
        assert_eq!(fs.read_file(&path).await.unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_write_replaces_directory_target() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFileSystemAdapter::new();
        let path = sync_path(&dir, "flip");

        fs.create_directory(&path).await.unwrap();
        fs.write_file(&path, b"now a file").await.unwrap();

        let state = fs.get_state(&path).await.unwrap();
        assert!(state.is_regular_file());
    }

    #[tokio::test]
    async fn test_delete_file_and_directory() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFileSystemAdapter::new();

        let file = sync_path(&dir, "f.txt");
        fs.write_file(&file, b"bye").await.unwrap();
        fs.delete_file(&file).await.unwrap();
        assert!(!fs.get_state(&file).await.unwrap().exists);

        let sub = sync_path(&dir, "subdir");
        let inner = sync_path(&dir, "subdir/file.txt");
        fs.create_directory(&sub).await.unwrap();
        fs.write_file(&inner, b"data").await.unwrap();
        fs.delete_file(&sub).await.unwrap();
        assert!(!fs.get_state(&sub).await.unwrap().exists);
    }

    #[tokio::test]
    async fn test_delete_missing_is_ok() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFileSystemAdapter::new();
        let path = sync_path(&dir, "never-existed.txt");

        fs.delete_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_get_state_not_found() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFileSystemAdapter::new();
        let path = sync_path(&dir, "nonexistent.txt");

        let state = fs.get_state(&path).await.unwrap();
        assert!(!state.exists);
        assert_eq!(state.size, 0);
        assert!(state.modified.is_none());
    }

    #[tokio::test]
    async fn test_set_mtime() {
        let dir = TempDir::new().unwrap();
        let fs = LocalFileSystemAdapter::new();
        let path = sync_path(&dir, "stamped.txt");

        fs.write_file(&path, b"content").await.unwrap();
        fs.set_mtime(&path, 1_600_000_000).await.unwrap();

        let state = fs.get_state(&path).await.unwrap();
        assert_eq!(state.modified, Some(1_600_000_000));
    }
}
