//! Planned synchronization actions
//!
//! The reconciler emits an ordered list of these; the executor runs them one
//! at a time. Ordering within a plan is: create directories (top-down), then
//! downloads, then uploads (parents first), then remote deletions (children
//! first), then local deletions (children first).

use super::newtypes::{RemotePath, SyncPath};

/// One planned transfer, deletion, or directory creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    /// Create a local directory (with intermediates)
    CreateDirectory { local: SyncPath },
    /// Fetch a remote file and replace the local target atomically
    Download { remote: RemotePath, local: SyncPath },
    /// Push a local file to the remote parent directory
    Upload { local: SyncPath, remote: RemotePath },
    /// Delete on the server; `is_dir` selects the endpoint
    DeleteRemote { remote: RemotePath, is_dir: bool },
    /// Best-effort local removal
    DeleteLocal { local: SyncPath },
    /// Reserved for strategies beyond last-modified-wins; never planned
    Conflict { remote: RemotePath },
}

impl SyncAction {
    /// Short verb used in logs and error records
    #[must_use]
    pub fn verb(&self) -> &'static str {
        match self {
            SyncAction::CreateDirectory { .. } => "mkdir",
            SyncAction::Download { .. } => "download",
            SyncAction::Upload { .. } => "upload",
            SyncAction::DeleteRemote { .. } => "delete-remote",
            SyncAction::DeleteLocal { .. } => "delete-local",
            SyncAction::Conflict { .. } => "conflict",
        }
    }

    /// The remote path this action concerns, when it has one
    #[must_use]
    pub fn remote_path(&self) -> Option<&RemotePath> {
        match self {
            SyncAction::Download { remote, .. }
            | SyncAction::Upload { remote, .. }
            | SyncAction::DeleteRemote { remote, .. }
            | SyncAction::Conflict { remote } => Some(remote),
            SyncAction::CreateDirectory { .. } | SyncAction::DeleteLocal { .. } => None,
        }
    }
}
