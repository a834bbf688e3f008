//! Sync orchestrator (C6)
//!
//! Iterates libraries, invoking listing + scan + reconcile + execute per
//! library, then persists the new baseline and publishes status. At most one
//! cycle is in flight at any time: overlapping trigger events are dropped,
//! not queued.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use seasync_core::domain::newtypes::SyncPath;
use seasync_core::domain::{
    Library, SyncErrorRecord, SyncPhase, SyncState, SyncStatus, SyncedFile,
};
use seasync_core::ports::{ILibraryProvider, ILocalFileSystem, ISecretStore, IStateStore};
use seasync_api::ApiError;

use crate::executor::ActionExecutor;
use crate::{reconciler, scanner};

// ============================================================================
// Status publication
// ============================================================================

/// Publishes [`SyncStatus`] snapshots through a watch channel
///
/// The engine mutates the snapshot in place; every mutation notifies all
/// subscribers with a fresh value.
#[derive(Clone)]
pub struct StatusPublisher {
    tx: Arc<watch::Sender<SyncStatus>>,
}

impl StatusPublisher {
    pub fn new(initial: SyncStatus) -> (Self, watch::Receiver<SyncStatus>) {
        let (tx, rx) = watch::channel(initial);
        (Self { tx: Arc::new(tx) }, rx)
    }

    /// Applies a mutation and notifies subscribers
    pub fn update(&self, f: impl FnOnce(&mut SyncStatus)) {
        self.tx.send_modify(f);
    }

    /// Returns a new subscription handle
    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.tx.subscribe()
    }

    /// Current snapshot
    pub fn snapshot(&self) -> SyncStatus {
        self.tx.borrow().clone()
    }
}

// ============================================================================
// Cycle report
// ============================================================================

/// Summary of a completed synchronization cycle
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub libraries_synced: u32,
    pub files_downloaded: u32,
    pub files_uploaded: u32,
    pub files_deleted: u32,
    /// Non-fatal errors captured during the cycle
    pub errors: Vec<String>,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
    /// True when the trigger was dropped because a cycle was in flight
    pub skipped: bool,
}

impl CycleReport {
    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }
}

/// Clears the single-flight flag on scope exit, so early returns and panics
/// both release it.
struct FlightGuard<'a>(&'a AtomicBool);

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// ============================================================================
// SyncEngine
// ============================================================================

/// Per-cycle orchestration over all libraries
///
/// ## Dependencies
///
/// - `provider`: remote listing, transfers, deletions
/// - `state_store`: baseline persistence
/// - `secret_store`: encrypted-library passwords
/// - `filesystem`: local I/O for the executor
pub struct SyncEngine {
    provider: Arc<dyn ILibraryProvider>,
    state_store: Arc<dyn IStateStore>,
    secret_store: Arc<dyn ISecretStore>,
    filesystem: Arc<dyn ILocalFileSystem>,
    executor: ActionExecutor,
    sync_root: SyncPath,
    status: StatusPublisher,
    /// Single-flight guard: overlapping triggers collapse to one cycle
    is_syncing: AtomicBool,
}

impl SyncEngine {
    pub fn new(
        provider: Arc<dyn ILibraryProvider>,
        state_store: Arc<dyn IStateStore>,
        secret_store: Arc<dyn ISecretStore>,
        filesystem: Arc<dyn ILocalFileSystem>,
        sync_root: SyncPath,
        status: StatusPublisher,
    ) -> Self {
        let executor = ActionExecutor::new(Arc::clone(&provider), Arc::clone(&filesystem));
        Self {
            provider,
            state_store,
            secret_store,
            filesystem,
            executor,
            sync_root,
            status,
            is_syncing: AtomicBool::new(false),
        }
    }

    /// Returns the status publisher (for the service facade)
    pub fn status(&self) -> &StatusPublisher {
        &self.status
    }

    /// Performs one full cycle over all libraries
    ///
    /// Re-entrant calls while a cycle is in flight return a skipped report
    /// without error: the rejection is silent by design.
    #[instrument(skip(self))]
    pub async fn sync_all(&self) -> Result<CycleReport> {
        if self.is_syncing.swap(true, Ordering::AcqRel) {
            debug!("cycle already in flight, dropping trigger");
            return Ok(CycleReport::skipped());
        }
        let _guard = FlightGuard(&self.is_syncing);

        let start = std::time::Instant::now();
        let mut report = CycleReport::default();

        self.status.update(|s| {
            s.phase = SyncPhase::Syncing;
            s.progress = 0.0;
            s.current_operation = "Fetching libraries".to_string();
        });

        let libraries = match self.provider.list_libraries().await {
            Ok(libs) => libs,
            Err(err) => {
                let message = format!("{err:#}");
                warn!(error = %message, "failed to list libraries, aborting cycle");
                self.status.update(|s| {
                    s.phase = SyncPhase::Error;
                    s.current_operation = String::new();
                    s.errors.push(SyncErrorRecord::new(message));
                });
                return Err(err).context("Cycle aborted: library listing failed");
            }
        };

        info!(count = libraries.len(), "starting cycle");
        self.status.update(|s| s.libraries = libraries.clone());

        let count = libraries.len();
        let mut fatal: Option<anyhow::Error> = None;

        for (index, library) in libraries.iter().enumerate() {
            self.status.update(|s| {
                s.progress = index as f64 / count as f64;
                s.current_operation = format!("Syncing {}", library.name);
            });

            match self.sync_library(library, &mut report).await {
                Ok(()) => report.libraries_synced += 1,
                Err(err) => {
                    // A baseline write failure is fatal to the whole cycle;
                    // the engine must not proceed over a half-written state.
                    fatal = Some(err);
                    break;
                }
            }
        }

        report.duration_ms = start.elapsed().as_millis() as u64;

        if let Some(err) = fatal {
            let message = format!("{err:#}");
            self.status.update(|s| {
                s.phase = SyncPhase::Error;
                s.current_operation = String::new();
                s.errors.push(SyncErrorRecord::new(message));
            });
            return Err(err);
        }

        let now = Utc::now().timestamp();
        self.status.update(|s| {
            s.phase = if report.errors.is_empty() {
                SyncPhase::Idle
            } else {
                SyncPhase::Error
            };
            s.progress = 1.0;
            s.current_operation = String::new();
            s.last_sync_time = Some(now);
        });

        info!(
            libraries = report.libraries_synced,
            downloaded = report.files_downloaded,
            uploaded = report.files_uploaded,
            deleted = report.files_deleted,
            errors = report.errors.len(),
            duration_ms = report.duration_ms,
            "cycle completed"
        );

        Ok(report)
    }

    /// Syncs one library
    ///
    /// Recoverable problems (missing password, listing failure) are recorded
    /// and the library is skipped; only a state-store write failure is
    /// returned as `Err`.
    #[instrument(skip(self, report), fields(library = %library.name))]
    async fn sync_library(&self, library: &Library, report: &mut CycleReport) -> Result<()> {
        // Step a: encrypted libraries need their password set server-side
        // before any listing works.
        if library.encrypted && !self.unlock_library(library, report).await {
            return Ok(());
        }

        // Step b: ensure the local root exists before scanning.
        let local_root = library.local_root(&self.sync_root);
        if let Err(err) = self.filesystem.create_directory(&local_root).await {
            self.record(report, library, format!("{err:#}"), None);
            return Ok(());
        }

        // Step c: remote tree.
        let remote = match self.provider.list_entries(&library.id).await {
            Ok(entries) => entries,
            Err(err) => {
                self.record(report, library, format!("{err:#}"), None);
                return Ok(());
            }
        };

        // Step d: local tree.
        let local = match scanner::scan(&local_root).await {
            Ok(tree) => tree,
            Err(err) => {
                self.record(report, library, format!("{err:#}"), None);
                return Ok(());
            }
        };

        // Step e: baseline. Read failures degrade to "never synced", which
        // is safe under last-modified-wins (worst case re-uploads).
        let baseline = match self.state_store.get_state(&library.id).await {
            Ok(state) => state.map(|s| s.files).unwrap_or_default(),
            Err(err) => {
                warn!(error = %format!("{err:#}"), "baseline read failed, treating as first sync");
                Vec::new()
            }
        };

        // Step f: plan.
        let writable = !library.permission.is_read_only();
        let actions = reconciler::plan(&remote, &local, &baseline, &local_root, writable);
        debug!(actions = actions.len(), writable, "plan ready");

        // Step g: execute.
        let exec = self
            .executor
            .execute(library, &local_root, &actions, &remote)
            .await;
        report.files_downloaded += exec.downloaded;
        report.files_uploaded += exec.uploaded;
        report.files_deleted += exec.deleted;
        for record in &exec.errors {
            report.errors.push(record.message.clone());
        }
        if exec.had_errors() {
            let errors = exec.errors.clone();
            self.status.update(|s| s.errors.extend(errors));
        }

        // Step h: persist the baseline from the cycle-start listing, minus
        // hidden paths and failed materializations.
        let files: Vec<SyncedFile> = remote
            .iter()
            .filter(|e| !e.path.is_hidden())
            .filter(|e| !exec.failed_materializations.contains(e.path.as_str()))
            .map(SyncedFile::from_remote)
            .collect();

        let state = SyncState::new(library.id.clone(), Utc::now().timestamp(), files);
        self.state_store
            .save_state(&state)
            .await
            .with_context(|| format!("Failed to persist baseline for '{}'", library.name))?;

        Ok(())
    }

    /// Sets the stored password on an encrypted library
    ///
    /// Returns false (and records the problem) when the password is missing
    /// or wrong; the library is skipped for this cycle.
    async fn unlock_library(&self, library: &Library, report: &mut CycleReport) -> bool {
        let password = match self.secret_store.load_library_password(&library.id) {
            Ok(Some(p)) => p,
            Ok(None) => {
                self.record(
                    report,
                    library,
                    format!("Library '{}' needs a password", library.name),
                    None,
                );
                return false;
            }
            Err(err) => {
                self.record(report, library, format!("{err:#}"), None);
                return false;
            }
        };

        match self
            .provider
            .set_library_password(&library.id, &password)
            .await
        {
            Ok(()) => true,
            Err(err) => {
                let message = if err.downcast_ref::<ApiError>().map_or(false, |e| {
                    matches!(e, ApiError::IncorrectPassword)
                }) {
                    format!("Stored password for '{}' is incorrect", library.name)
                } else {
                    format!("{err:#}")
                };
                self.record(report, library, message, None);
                false
            }
        }
    }

    fn record(
        &self,
        report: &mut CycleReport,
        library: &Library,
        message: String,
        path: Option<String>,
    ) {
        warn!(library = %library.name, error = %message, "library skipped");
        report.errors.push(message.clone());
        let mut record = SyncErrorRecord::new(message).with_library(library.name.clone());
        if let Some(p) = path {
            record = record.with_path(p);
        }
        self.status.update(|s| s.errors.push(record));
    }
}
