//! Libraries command - list libraries visible to the account

use anyhow::Result;
use clap::Args;

use seasync_api::{KeyringSecretStore, SeafileClient};
use seasync_core::ports::ISecretStore;

use crate::output::OutputFormat;

#[derive(Debug, Args)]
pub struct LibrariesCommand {}

impl LibrariesCommand {
    pub async fn execute(&self, format: OutputFormat) -> Result<()> {
        let formatter = crate::output::get_formatter(matches!(format, OutputFormat::Json));

        let secrets = KeyringSecretStore::new();
        let account = match secrets.load_account()? {
            Some(a) => a,
            None => {
                formatter.error("No account configured. Run 'seasync login' first.");
                return Ok(());
            }
        };

        let client = SeafileClient::new(account.server_url(), account.token());
        let infos = match client.list_libraries().await {
            Ok(infos) => infos,
            Err(e) => {
                formatter.error(&format!("{e:#}"));
                return Ok(());
            }
        };

        if matches!(format, OutputFormat::Json) {
            let json = serde_json::json!(infos
                .iter()
                .map(|i| {
                    serde_json::json!({
                        "id": i.id,
                        "name": i.name,
                        "encrypted": i.encrypted,
                        "permission": i.permission,
                        "size": i.size,
                        "mtime": i.mtime,
                    })
                })
                .collect::<Vec<_>>());
            formatter.print_json(&json);
        } else if infos.is_empty() {
            formatter.info("No libraries.");
        } else {
            formatter.success(&format!("{} libraries", infos.len()));
            for info in &infos {
                let flags = match (info.encrypted, info.permission.as_str()) {
                    (true, "r") => " [encrypted, read-only]",
                    (true, _) => " [encrypted]",
                    (false, "r") => " [read-only]",
                    _ => "",
                };
                formatter.info(&format!("{}{}  ({})", info.name, flags, info.id));
            }
        }

        Ok(())
    }
}
