//! Tree entries and the persisted baseline
//!
//! `RemoteEntry` and `LocalEntry` are the per-cycle snapshots of the two
//! sides; `SyncedFile` rows form the baseline the deletion detector anchors
//! on, and `SyncState` is the per-library unit the state store persists.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::newtypes::{LibraryId, ObjectId, RemotePath};

/// A node in the remote tree, as flattened by the recursive listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    /// Full library-relative path, starts with `/`
    pub path: RemotePath,
    /// Content identifier; ignored for directories
    pub object_id: ObjectId,
    /// Seconds since epoch
    pub mtime: i64,
    /// Size in bytes, 0 for directories
    pub size: u64,
    pub is_dir: bool,
}

/// A node in the local tree produced by the scanner
///
/// Keyed externally by its `"/"`-prefixed path relative to the library root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalEntry {
    /// Seconds since epoch, floored
    pub mtime: i64,
    pub is_dir: bool,
}

/// Map of relative path to local entry; BTreeMap keeps iteration stable
pub type LocalTree = BTreeMap<String, LocalEntry>;

/// One baseline row: the last-synced identity of a `(library, path)` pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncedFile {
    pub path: RemotePath,
    pub object_id: ObjectId,
    pub mtime: i64,
    pub size: u64,
    pub is_dir: bool,
}

impl SyncedFile {
    /// Build a baseline row from an observed remote entry
    #[must_use]
    pub fn from_remote(entry: &RemoteEntry) -> Self {
        Self {
            path: entry.path.clone(),
            object_id: entry.object_id.clone(),
            mtime: entry.mtime,
            size: if entry.is_dir { 0 } else { entry.size },
            is_dir: entry.is_dir,
        }
    }
}

/// The persisted per-library sync state: timestamp plus the full baseline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncState {
    pub library_id: LibraryId,
    /// Seconds since epoch of the last successful cycle
    pub last_sync_time: i64,
    pub files: Vec<SyncedFile>,
}

impl SyncState {
    #[must_use]
    pub fn new(library_id: LibraryId, last_sync_time: i64, files: Vec<SyncedFile>) -> Self {
        Self {
            library_id,
            last_sync_time,
            files,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(path: &str, oid: &str, mtime: i64, size: u64, is_dir: bool) -> RemoteEntry {
        RemoteEntry {
            path: RemotePath::new(path.to_string()).unwrap(),
            object_id: ObjectId::new(oid.to_string()).unwrap(),
            mtime,
            size,
            is_dir,
        }
    }

    #[test]
    fn test_synced_file_from_remote_file() {
        let entry = remote("/docs/a.txt", "x", 100, 42, false);
        let row = SyncedFile::from_remote(&entry);
        assert_eq!(row.path.as_str(), "/docs/a.txt");
        assert_eq!(row.size, 42);
        assert!(!row.is_dir);
    }

    #[test]
    fn test_synced_file_from_remote_dir_has_zero_size() {
        let entry = remote("/docs", "d", 100, 4096, true);
        let row = SyncedFile::from_remote(&entry);
        assert_eq!(row.size, 0);
        assert!(row.is_dir);
    }

    #[test]
    fn test_local_tree_key_order_is_stable() {
        let mut tree = LocalTree::new();
        tree.insert("/b".to_string(), LocalEntry { mtime: 1, is_dir: false });
        tree.insert("/a".to_string(), LocalEntry { mtime: 2, is_dir: false });
        let keys: Vec<&str> = tree.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["/a", "/b"]);
    }
}
