//! Library entity
//!
//! A remote top-level container (repository). Fetched fresh from the server
//! each cycle; never persisted beyond a cycle.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::newtypes::{LibraryId, SyncPath};

/// Access permission on a library
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Permission {
    /// Read-only: the engine never emits outbound mutations
    #[serde(rename = "r")]
    ReadOnly,
    /// Read-write
    #[serde(rename = "rw")]
    ReadWrite,
}

impl Permission {
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        matches!(self, Permission::ReadOnly)
    }
}

impl FromStr for Permission {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "r" => Ok(Permission::ReadOnly),
            "rw" => Ok(Permission::ReadWrite),
            other => Err(DomainError::InvalidPermission(other.to_string())),
        }
    }
}

/// A remote library as reported by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Library {
    /// Server-assigned identifier
    pub id: LibraryId,
    /// Display name; also the folder name under the local sync root
    pub name: String,
    /// Whether the library is end-to-end encrypted
    pub encrypted: bool,
    /// Access permission
    pub permission: Permission,
    /// Total size in bytes
    pub size: u64,
    /// Last remote modification, seconds since epoch
    pub mtime: i64,
}

impl Library {
    /// The local folder this library is materialized into
    #[must_use]
    pub fn local_root(&self, sync_root: &SyncPath) -> SyncPath {
        // Library names come from the server; a validated SyncPath join keeps
        // separators out of the folder name.
        let sanitized = self.name.replace('/', "_");
        SyncPath::new(sync_root.as_path().join(sanitized))
            .unwrap_or_else(|_| sync_root.clone())
    }
}
