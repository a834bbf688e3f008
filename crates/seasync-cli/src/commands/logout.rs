//! Logout command - remove the account and wipe sync state
//!
//! Local files are left in place; only credentials and the baseline
//! database are cleared.

use anyhow::{Context, Result};
use clap::Args;

use seasync_api::KeyringSecretStore;
use seasync_core::config::Config;
use seasync_core::ports::{ISecretStore, IStateStore};
use seasync_store::{DatabasePool, SqliteStateStore};

use crate::output::OutputFormat;

#[derive(Debug, Args)]
pub struct LogoutCommand {}

impl LogoutCommand {
    pub async fn execute(&self, format: OutputFormat) -> Result<()> {
        let formatter = crate::output::get_formatter(matches!(format, OutputFormat::Json));

        let secrets = KeyringSecretStore::new();
        match secrets.load_account() {
            Ok(Some(_)) => {}
            Ok(None) => {
                formatter.info("No account configured.");
                return Ok(());
            }
            Err(e) => {
                formatter.error(&format!("{e:#}"));
                return Ok(());
            }
        }

        secrets
            .delete_account()
            .context("Failed to remove account")?;

        let config = Config::load_or_default(&Config::default_path());
        let pool = DatabasePool::new(&config.database.path)
            .await
            .context("Failed to open state database")?;
        let store = SqliteStateStore::new(pool.pool().clone());
        store
            .delete_all()
            .await
            .context("Failed to clear sync state")?;

        formatter.success("Logged out; credentials and sync state cleared.");
        formatter.info("Local files under the sync root were left untouched.");
        Ok(())
    }
}
