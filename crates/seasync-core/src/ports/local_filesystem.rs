//! Local filesystem port (driven/secondary port)
//!
//! File I/O the executor depends on. Kept behind a trait so engine tests can
//! observe filesystem effects through a real temp directory or a fake.

use crate::domain::newtypes::SyncPath;

/// Snapshot of a path's state on the local filesystem
#[derive(Debug, Clone)]
pub struct FileSystemState {
    pub exists: bool,
    /// True for regular files; false for directories and other types
    pub is_file: bool,
    /// Size in bytes (0 for directories or non-existent paths)
    pub size: u64,
    /// Last modification, seconds since epoch, floored
    pub modified: Option<i64>,
}

impl FileSystemState {
    /// State representing a non-existent path
    #[must_use]
    pub fn not_found() -> Self {
        Self {
            exists: false,
            is_file: false,
            size: 0,
            modified: None,
        }
    }

    #[must_use]
    pub fn is_regular_file(&self) -> bool {
        self.exists && self.is_file
    }

    #[must_use]
    pub fn is_directory(&self) -> bool {
        self.exists && !self.is_file
    }
}

/// Port trait for local filesystem operations
///
/// ## Implementation Notes
///
/// - `write_file` replaces any existing target atomically (temp + rename)
///   and creates parent directories.
/// - `delete_file` is best-effort: a missing path is not an error.
/// - `get_state` returns [`FileSystemState::not_found`] for missing paths
///   rather than an error.
#[async_trait::async_trait]
pub trait ILocalFileSystem: Send + Sync {
    /// Reads the entire contents of a file
    async fn read_file(&self, path: &SyncPath) -> anyhow::Result<Vec<u8>>;

    /// Writes data to a file, replacing any existing target atomically
    async fn write_file(&self, path: &SyncPath, data: &[u8]) -> anyhow::Result<()>;

    /// Removes a file or directory tree; missing paths are ignored
    async fn delete_file(&self, path: &SyncPath) -> anyhow::Result<()>;

    /// Stats a path
    async fn get_state(&self, path: &SyncPath) -> anyhow::Result<FileSystemState>;

    /// Creates a directory with intermediates
    async fn create_directory(&self, path: &SyncPath) -> anyhow::Result<()>;

    /// Sets a file's modification time, seconds since epoch
    async fn set_mtime(&self, path: &SyncPath, mtime: i64) -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_state() {
        let state = FileSystemState::not_found();
        assert!(!state.exists);
        assert!(!state.is_regular_file());
        assert!(!state.is_directory());
    }

    #[test]
    fn test_directory_state() {
        let state = FileSystemState {
            exists: true,
            is_file: false,
            size: 0,
            modified: Some(100),
        };
        assert!(state.is_directory());
        assert!(!state.is_regular_file());
    }
}
