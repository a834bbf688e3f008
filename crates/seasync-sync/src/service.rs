//! Engine facade for UI layers
//!
//! [`SyncService`] bundles the engine, the trigger handle, and the stores
//! behind the small surface a menu bar or CLI needs: status subscription,
//! account setup, manual sync, and logout. The observable state itself is a
//! value snapshot carried by a watch channel; the UI adapts it to its own
//! reactive model.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use seasync_api::SeafileClient;
use seasync_core::domain::{Account, SyncPhase, SyncStatus};
use seasync_core::ports::{ISecretStore, IStateStore};

use crate::engine::{StatusPublisher, SyncEngine};
use crate::scheduler::SchedulerHandle;

/// Facade over the running engine
pub struct SyncService {
    engine: Arc<SyncEngine>,
    secret_store: Arc<dyn ISecretStore>,
    state_store: Arc<dyn IStateStore>,
    trigger: SchedulerHandle,
    shutdown: CancellationToken,
}

impl SyncService {
    pub fn new(
        engine: Arc<SyncEngine>,
        secret_store: Arc<dyn ISecretStore>,
        state_store: Arc<dyn IStateStore>,
        trigger: SchedulerHandle,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            engine,
            secret_store,
            state_store,
            trigger,
            shutdown,
        }
    }

    /// Logs in against the server and stores the account
    ///
    /// Standalone because it runs before any engine exists (first-run setup).
    pub async fn configure(
        secret_store: &dyn ISecretStore,
        server_url: &str,
        username: &str,
        password: &str,
    ) -> Result<Account> {
        let token = SeafileClient::login(server_url, username, password)
            .await
            .context("Login failed")?;
        let account = Account::new(server_url, username, token)?;
        secret_store
            .save_account(&account)
            .context("Failed to store account")?;
        info!(username, "Account configured");
        Ok(account)
    }

    /// Subscribes to status snapshots
    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.engine.status().subscribe()
    }

    /// Current status snapshot
    pub fn snapshot(&self) -> SyncStatus {
        self.engine.status().snapshot()
    }

    /// Requests an immediate sync cycle
    ///
    /// Collapses into the single-flight guard like any other trigger.
    pub fn trigger_manual_sync(&self) {
        self.trigger.request_sync();
    }

    /// Logs out: stops the triggers, wipes secrets and sync state
    ///
    /// An in-progress cycle runs to completion; its writes are idempotent.
    pub async fn logout(&self) -> Result<()> {
        info!("Logging out");
        self.shutdown.cancel();

        // Best-effort removal of per-library passwords for the libraries we
        // know about; the account entry is the one that matters.
        let snapshot = self.snapshot();
        for library in &snapshot.libraries {
            if let Err(err) = self.secret_store.delete_library_password(&library.id) {
                warn!(library = %library.name, error = %format!("{err:#}"), "password cleanup failed");
            }
        }

        self.secret_store
            .delete_account()
            .context("Failed to remove account from secret store")?;
        self.state_store
            .delete_all()
            .await
            .context("Failed to clear sync state")?;

        self.engine.status().update(|s: &mut SyncStatus| {
            s.phase = SyncPhase::Paused;
            s.is_configured = false;
            s.libraries.clear();
            s.current_operation = String::new();
        });

        Ok(())
    }
}

/// Builds the initial status snapshot for a configured account
pub fn initial_status(configured: bool) -> (StatusPublisher, watch::Receiver<SyncStatus>) {
    let status = SyncStatus {
        is_configured: configured,
        ..SyncStatus::default()
    };
    StatusPublisher::new(status)
}
