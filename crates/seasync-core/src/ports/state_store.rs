//! State store port (driven/secondary port)
//!
//! Durable baseline of `(library, path) -> last-seen identity` plus the
//! per-library last-sync timestamp. The baseline is what lets the reconciler
//! distinguish "never seen" from "deleted since last sync".

use crate::domain::newtypes::{LibraryId, RemotePath};
use crate::domain::{SyncState, SyncedFile};

/// Port trait for persistent sync state
///
/// ## Implementation Notes
///
/// - `save_state` must replace the timestamp and the full baseline row set
///   within one transactional boundary; a half-written baseline is worse
///   than none.
/// - `get_state` returns `None` iff there are zero baseline rows for the
///   library. A persisted timestamp without rows is treated as absent.
#[async_trait::async_trait]
pub trait IStateStore: Send + Sync {
    /// Returns the last persisted state, or `None` if the library has never
    /// completed a cycle
    async fn get_state(&self, library_id: &LibraryId) -> anyhow::Result<Option<SyncState>>;

    /// Atomically replaces the timestamp and baseline rows for the state's
    /// library
    async fn save_state(&self, state: &SyncState) -> anyhow::Result<()>;

    /// Point lookup of a single baseline row
    async fn get_file(
        &self,
        library_id: &LibraryId,
        path: &RemotePath,
    ) -> anyhow::Result<Option<SyncedFile>>;

    /// Wipes all state for every library (logout)
    async fn delete_all(&self) -> anyhow::Result<()>;
}
