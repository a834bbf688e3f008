//! Observable engine status
//!
//! The engine publishes value snapshots of this state; the UI layer (menu
//! bar, CLI, anything subscribed to the watch channel) adapts them to its own
//! reactive model. The core never depends on a UI framework.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::library::Library;

/// Coarse engine phase, reflected by the status icon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    Idle,
    Syncing,
    Error,
    Paused,
}

impl Default for SyncPhase {
    fn default() -> Self {
        SyncPhase::Idle
    }
}

/// One captured per-action or per-cycle error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncErrorRecord {
    /// Human-readable message; error kind names never leak into this
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub library_name: Option<String>,
    pub file_path: Option<String>,
}

impl SyncErrorRecord {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timestamp: Utc::now(),
            library_name: None,
            file_path: None,
        }
    }

    pub fn with_library(mut self, name: impl Into<String>) -> Self {
        self.library_name = Some(name.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.file_path = Some(path.into());
        self
    }
}

/// Value snapshot published after every observable change
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncStatus {
    pub phase: SyncPhase,
    /// True once an account exists in the secret store
    pub is_configured: bool,
    /// Seconds since epoch of the last completed cycle
    pub last_sync_time: Option<i64>,
    /// `library_index / library_count` within the running cycle, in [0, 1]
    pub progress: f64,
    /// Short description of what the engine is doing right now
    pub current_operation: String,
    /// Libraries as of the last listing
    pub libraries: Vec<Library>,
    /// Accumulated error records, newest last
    pub errors: Vec<SyncErrorRecord>,
}
