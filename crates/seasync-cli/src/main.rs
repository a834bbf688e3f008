//! SeaSync CLI - Command-line interface for SeaSync
//!
//! Provides commands for:
//! - Logging in to a Seafile server and storing the account
//! - Listing libraries
//! - Running a one-shot sync cycle
//! - Logging out (wipes credentials and sync state)

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{
    libraries::LibrariesCommand, login::LoginCommand, logout::LogoutCommand, sync::SyncCommand,
};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "seasync", version, about = "Seafile synchronization client")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Log in to a Seafile server and store the account
    Login(LoginCommand),
    /// Remove the stored account and all sync state
    Logout(LogoutCommand),
    /// List libraries visible to the account
    Libraries(LibrariesCommand),
    /// Run one synchronization cycle
    Sync(SyncCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };

    match cli.command {
        Commands::Login(cmd) => cmd.execute(format).await,
        Commands::Logout(cmd) => cmd.execute(format).await,
        Commands::Libraries(cmd) => cmd.execute(format).await,
        Commands::Sync(cmd) => cmd.execute(format).await,
    }
}
