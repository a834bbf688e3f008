//! Sync command - run one synchronization cycle
//!
//! Wires up the adapters (Seafile client, SQLite store, filesystem), runs a
//! single engine cycle, and displays the results. With `--dry-run` the
//! command plans each library and prints the actions instead of executing
//! them.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use crate::output::{OutputFormat, OutputFormatter};

#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Plan and print actions without transferring or deleting anything
    #[arg(long)]
    pub dry_run: bool,
}

impl SyncCommand {
    pub async fn execute(&self, format: OutputFormat) -> Result<()> {
        use seasync_api::{KeyringSecretStore, SeafileClient, SeafileProvider};
        use seasync_core::config::Config;
        use seasync_core::domain::newtypes::SyncPath;
        use seasync_core::ports::ISecretStore;
        use seasync_store::{DatabasePool, SqliteStateStore};
        use seasync_sync::engine::SyncEngine;
        use seasync_sync::filesystem::LocalFileSystemAdapter;
        use seasync_sync::service::initial_status;

        let formatter = crate::output::get_formatter(matches!(format, OutputFormat::Json));

        // Step 1: account.
        let secrets = KeyringSecretStore::new();
        let account = match secrets.load_account()? {
            Some(a) => a,
            None => {
                formatter.error("No account configured. Run 'seasync login' first.");
                return Ok(());
            }
        };

        // Step 2: configuration and state database.
        let config_path = Config::default_path();
        let config = Config::load_or_default(&config_path);
        info!(config_path = %config_path.display(), "Loaded configuration");

        let pool = DatabasePool::new(&config.database.path)
            .await
            .context("Failed to open state database")?;
        let state_store = Arc::new(SqliteStateStore::new(pool.pool().clone()));

        // Step 3: adapters.
        let client = SeafileClient::new(account.server_url(), account.token());
        let provider = Arc::new(SeafileProvider::new(client));

        let sync_root = SyncPath::new(config.sync.root.clone())
            .map_err(|e| anyhow::anyhow!("Invalid sync root: {e}"))?;

        if self.dry_run {
            return dry_run(
                formatter.as_ref(),
                format,
                provider.as_ref(),
                state_store.as_ref(),
                &secrets,
                &sync_root,
            )
            .await;
        }

        // Step 4: run one cycle.
        formatter.info("Starting synchronization...");

        let (status, _rx) = initial_status(true);
        let engine = SyncEngine::new(
            provider,
            state_store,
            Arc::new(secrets),
            Arc::new(LocalFileSystemAdapter::new()),
            sync_root,
            status,
        );

        let report = engine.sync_all().await?;

        // Step 5: display results.
        if matches!(format, OutputFormat::Json) {
            let json = serde_json::json!({
                "libraries_synced": report.libraries_synced,
                "files_downloaded": report.files_downloaded,
                "files_uploaded": report.files_uploaded,
                "files_deleted": report.files_deleted,
                "errors": report.errors,
                "duration_ms": report.duration_ms,
            });
            formatter.print_json(&json);
        } else {
            let duration_display = if report.duration_ms >= 1000 {
                format!("{:.1}s", report.duration_ms as f64 / 1000.0)
            } else {
                format!("{}ms", report.duration_ms)
            };

            let total =
                report.files_downloaded + report.files_uploaded + report.files_deleted;

            if total == 0 && report.errors.is_empty() {
                formatter.success("Already up to date");
            } else {
                formatter.success(&format!("Sync completed in {}", duration_display));
            }

            if report.files_downloaded > 0 {
                formatter.info(&format!("Downloaded: {}", report.files_downloaded));
            }
            if report.files_uploaded > 0 {
                formatter.info(&format!("Uploaded:   {}", report.files_uploaded));
            }
            if report.files_deleted > 0 {
                formatter.info(&format!("Deleted:    {}", report.files_deleted));
            }

            if !report.errors.is_empty() {
                formatter.error(&format!(
                    "{} error{} occurred:",
                    report.errors.len(),
                    if report.errors.len() == 1 { "" } else { "s" }
                ));
                for err in &report.errors {
                    formatter.info(&format!("  - {}", err));
                }
            }
        }

        Ok(())
    }
}

/// Plans every library and prints the actions without executing any
///
/// Follows the engine's per-library steps (unlock, list, scan, read
/// baseline, reconcile) but never runs the executor and writes no baseline.
async fn dry_run(
    formatter: &dyn OutputFormatter,
    format: OutputFormat,
    provider: &dyn seasync_core::ports::ILibraryProvider,
    state_store: &dyn seasync_core::ports::IStateStore,
    secrets: &dyn seasync_core::ports::ISecretStore,
    sync_root: &seasync_core::domain::newtypes::SyncPath,
) -> Result<()> {
    use seasync_sync::{reconciler, scanner};

    formatter.info("Dry run - planning only, nothing will be transferred or deleted");

    let libraries = provider
        .list_libraries()
        .await
        .context("Failed to list libraries")?;

    let mut total_actions = 0usize;
    let mut json_libraries = Vec::new();

    for library in &libraries {
        if library.encrypted {
            match secrets.load_library_password(&library.id)? {
                Some(password) => {
                    if let Err(e) = provider.set_library_password(&library.id, &password).await {
                        formatter.info(&format!("{}: skipped ({e:#})", library.name));
                        continue;
                    }
                }
                None => {
                    formatter.info(&format!("{}: skipped (needs a password)", library.name));
                    continue;
                }
            }
        }

        let local_root = library.local_root(sync_root);
        let remote = provider
            .list_entries(&library.id)
            .await
            .with_context(|| format!("Failed to list '{}'", library.name))?;
        let local = scanner::scan(&local_root).await?;
        let baseline = state_store
            .get_state(&library.id)
            .await?
            .map(|s| s.files)
            .unwrap_or_default();

        let writable = !library.permission.is_read_only();
        let actions = reconciler::plan(&remote, &local, &baseline, &local_root, writable);

        if matches!(format, OutputFormat::Json) {
            json_libraries.push(serde_json::json!({
                "library": library.name,
                "actions": actions
                    .iter()
                    .map(|a| serde_json::json!({
                        "verb": a.verb(),
                        "path": action_target(a),
                    }))
                    .collect::<Vec<_>>(),
            }));
        } else if actions.is_empty() {
            formatter.info(&format!("{}: up to date", library.name));
        } else {
            formatter.info(&format!("{}:", library.name));
            for action in &actions {
                formatter.info(&format!("  {:<13} {}", action.verb(), action_target(action)));
            }
        }

        total_actions += actions.len();
    }

    if matches!(format, OutputFormat::Json) {
        formatter.print_json(&serde_json::json!({
            "dry_run": true,
            "planned_actions": total_actions,
            "libraries": json_libraries,
        }));
    } else {
        formatter.success(&format!(
            "Dry run complete: {} action{} planned",
            total_actions,
            if total_actions == 1 { "" } else { "s" }
        ));
    }

    Ok(())
}

/// The path a planned action would touch, for display
fn action_target(action: &seasync_core::domain::SyncAction) -> String {
    use seasync_core::domain::SyncAction;

    match action {
        SyncAction::CreateDirectory { local } | SyncAction::DeleteLocal { local } => {
            local.to_string()
        }
        _ => action
            .remote_path()
            .map(|p| p.as_str().to_string())
            .unwrap_or_default(),
    }
}
