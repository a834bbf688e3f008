//! Login command - authenticate and store the account
//!
//! Obtains an API token from the server and persists the account in the
//! system keyring. The daemon picks the account up on its next check.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use clap::Args;

use seasync_api::KeyringSecretStore;
use seasync_sync::SyncService;

use crate::output::OutputFormat;

#[derive(Debug, Args)]
pub struct LoginCommand {
    /// Server base URL, e.g. https://seafile.example.com
    pub server: String,

    /// Account username (usually an email address)
    pub username: String,

    /// Password; read from stdin when omitted
    #[arg(long)]
    pub password: Option<String>,
}

impl LoginCommand {
    pub async fn execute(&self, format: OutputFormat) -> Result<()> {
        let formatter = crate::output::get_formatter(matches!(format, OutputFormat::Json));

        let password = match &self.password {
            Some(p) => p.clone(),
            None => {
                print!("Password: ");
                std::io::stdout().flush()?;
                let mut line = String::new();
                std::io::stdin()
                    .lock()
                    .read_line(&mut line)
                    .context("Failed to read password")?;
                line.trim_end_matches(['\r', '\n']).to_string()
            }
        };

        let secrets = KeyringSecretStore::new();
        match SyncService::configure(&secrets, &self.server, &self.username, &password).await {
            Ok(account) => {
                formatter.success(&format!(
                    "Logged in to {} as {}",
                    account.server_url(),
                    account.username()
                ));
                formatter.info("Run 'seasync sync' or start seasyncd to begin syncing.");
                Ok(())
            }
            Err(e) => {
                formatter.error(&format!("{e:#}"));
                std::process::exit(1);
            }
        }
    }
}
