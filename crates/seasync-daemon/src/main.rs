//! SeaSync Daemon - Background synchronization service
//!
//! Wires the adapters to the engine and runs the trigger loop:
//! - Periodic cycles every `sync.interval` seconds
//! - Watcher-driven cycles after the debounce window
//! - Graceful shutdown on SIGTERM/SIGINT
//!
//! The daemon performs no UI work; it publishes status snapshots that
//! external surfaces subscribe to.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use seasync_api::{KeyringSecretStore, SeafileClient, SeafileProvider};
use seasync_core::config::Config;
use seasync_core::domain::newtypes::SyncPath;
use seasync_core::domain::Account;
use seasync_core::ports::ISecretStore;
use seasync_store::{DatabasePool, SqliteStateStore};
use seasync_sync::engine::SyncEngine;
use seasync_sync::filesystem::LocalFileSystemAdapter;
use seasync_sync::scheduler::SyncScheduler;
use seasync_sync::service::initial_status;
use seasync_sync::watcher::FileWatcher;

/// How often an unconfigured daemon re-checks the secret store
const AUTH_CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// Waits for an account to appear in the secret store
///
/// Entered when the daemon starts unconfigured; checks periodically until
/// `seasync login` has run or shutdown is requested.
async fn wait_for_account(
    secrets: &KeyringSecretStore,
    shutdown: &CancellationToken,
) -> Result<Option<Account>> {
    info!("No account configured. Run 'seasync login' to set one up.");

    loop {
        tokio::select! {
            _ = tokio::time::sleep(AUTH_CHECK_INTERVAL) => {
                match secrets.load_account() {
                    Ok(Some(account)) => {
                        info!(username = %account.username(), "Account found, starting sync");
                        return Ok(Some(account));
                    }
                    Ok(None) => {}
                    Err(e) => warn!(error = %format!("{e:#}"), "Secret store read failed"),
                }
            }
            _ = shutdown.cancelled() => {
                info!("Shutdown while waiting for account");
                return Ok(None);
            }
        }
    }
}

/// Builds the engine and runs the trigger/cycle loop until shutdown
async fn run(config: Config, account: Account, shutdown: CancellationToken) -> Result<()> {
    // State store.
    let pool = DatabasePool::new(&config.database.path)
        .await
        .context("Failed to open state database")?;
    let state_store = Arc::new(SqliteStateStore::new(pool.pool().clone()));

    // Remote client. A failed ping is logged, not fatal: the server may be
    // temporarily unreachable and the periodic trigger retries anyway.
    let client = SeafileClient::new(account.server_url(), account.token());
    if let Err(e) = client.ping().await {
        warn!(error = %format!("{e:#}"), "Server ping failed at startup");
    }
    let provider = Arc::new(SeafileProvider::new(client));

    // Sync root must exist before the watcher can subscribe to it.
    let sync_root = SyncPath::new(config.sync.root.clone())
        .map_err(|e| anyhow::anyhow!("Invalid sync root: {e}"))?;
    tokio::fs::create_dir_all(sync_root.as_path())
        .await
        .context("Failed to create sync root")?;

    let (status, _status_rx) = initial_status(true);
    let engine = Arc::new(SyncEngine::new(
        provider,
        state_store,
        Arc::new(KeyringSecretStore::new()),
        Arc::new(LocalFileSystemAdapter::new()),
        sync_root.clone(),
        status,
    ));

    // Watcher + scheduler.
    let (mut watcher, change_rx) = FileWatcher::new()?;
    watcher.watch(sync_root.as_path())?;

    let (mut scheduler, mut cycle_rx, _trigger) = SyncScheduler::new(
        change_rx,
        Duration::from_secs_f64(config.sync.debounce),
        Duration::from_secs(config.sync.interval),
        shutdown.child_token(),
    );
    tokio::spawn(async move { scheduler.run().await });

    info!(
        root = %sync_root,
        interval_secs = config.sync.interval,
        "Daemon running"
    );

    // Consume cycle requests until shutdown. The engine's single-flight
    // guard makes redundant requests harmless.
    loop {
        tokio::select! {
            request = cycle_rx.recv() => {
                if request.is_none() {
                    info!("Trigger channel closed");
                    break;
                }
                match engine.sync_all().await {
                    Ok(report) if report.skipped => {}
                    Ok(report) => {
                        info!(
                            libraries = report.libraries_synced,
                            downloaded = report.files_downloaded,
                            uploaded = report.files_uploaded,
                            deleted = report.files_deleted,
                            errors = report.errors.len(),
                            duration_ms = report.duration_ms,
                            "Cycle finished"
                        );
                    }
                    Err(e) => {
                        error!(error = %format!("{e:#}"), "Cycle failed");
                    }
                }
            }
            _ = shutdown.cancelled() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    // The watcher stops with the daemon; an in-flight cycle has already
    // completed because this loop awaits each one.
    drop(watcher);
    Ok(())
}

/// Waits for SIGTERM or SIGINT and triggers the cancellation token
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT (Ctrl+C)"),
        _ = terminate => info!("Received SIGTERM"),
    }

    token.cancel();
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .init();

    info!("SeaSync daemon starting (seasyncd)");

    let config_path = Config::default_path();
    let config = Config::load_or_default(&config_path);
    info!(config_path = %config_path.display(), "Loaded configuration");

    for issue in config.validate() {
        warn!(field = %issue.field, message = %issue.message, "Configuration problem");
    }

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal(signal_token).await;
    });

    let secrets = KeyringSecretStore::new();
    let account = match secrets.load_account() {
        Ok(Some(account)) => Some(account),
        Ok(None) => wait_for_account(&secrets, &shutdown).await?,
        Err(e) => {
            warn!(error = %format!("{e:#}"), "Secret store read failed");
            wait_for_account(&secrets, &shutdown).await?
        }
    };

    let result = match account {
        Some(account) => run(config, account, shutdown).await,
        None => Ok(()),
    };

    match &result {
        Ok(()) => info!("SeaSync daemon shut down gracefully"),
        Err(e) => error!(error = %e, "SeaSync daemon exiting with error"),
    }

    result
}
