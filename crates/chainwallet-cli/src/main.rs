//! chainwallet command line client.
//!
//! Recovers legacy wallets offline, converts their funds into an account
//! and builds vote transactions. Nothing is submitted: every transaction
//! is printed as hex for the caller to broadcast.
//!
//! Environment:
//!
//!   CHAINWALLET_PASSWORD   Mnemonic password (avoids `--password`)
//!   RUST_LOG               Log filter, overrides the config file

mod commands;
mod config;
mod output;

use std::path::PathBuf;

use chainwallet_types::config::RecoveryConfig;
use clap::{Parser, Subcommand};

use crate::config::CliConfig;

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

/// chainwallet: legacy fund recovery and voting.
#[derive(Parser)]
#[command(name = "chainwallet", version, about)]
struct Cli {
    /// Output in JSON format (no colors, machine-readable).
    #[arg(long, global = true)]
    json: bool,

    /// JSON config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the wallet id and account address.
    Recover(commands::wallet::RecoverArgs),
    /// Match block0 outputs against the wallet.
    Scan(commands::wallet::ScanArgs),
    /// Build the transactions moving matched funds into the account.
    Convert(commands::wallet::ConvertArgs),
    /// Build a vote-cast transaction.
    Vote(commands::vote::VoteArgs),
    /// Encrypt a payload with a password.
    Encrypt(commands::cipher::CipherArgs),
    /// Decrypt a payload with a password.
    Decrypt(commands::cipher::CipherArgs),
}

// ---------------------------------------------------------------------------
// Global options passed to every command handler
// ---------------------------------------------------------------------------

/// Shared options threaded into command handlers.
pub struct GlobalOpts {
    pub json: bool,
    pub recovery: RecoveryConfig,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() {
    let cli = Cli::parse();

    let config = match cli.config.as_deref().map(CliConfig::load).transpose() {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => {
            output::print_error(&e, cli.json);
            std::process::exit(1);
        }
    };

    init_tracing(config.log_filter.as_deref());

    let opts = GlobalOpts {
        json: cli.json,
        recovery: config.recovery.unwrap_or_default(),
    };

    if let Err(e) = dispatch(&opts, cli.command) {
        output::print_error(&e, cli.json);
        std::process::exit(1);
    }
}

fn dispatch(opts: &GlobalOpts, cmd: Commands) -> std::result::Result<(), String> {
    match cmd {
        Commands::Recover(args) => commands::wallet::recover(args, opts),
        Commands::Scan(args) => commands::wallet::scan(args, opts),
        Commands::Convert(args) => commands::wallet::convert(args, opts),
        Commands::Vote(args) => commands::vote::run(args, opts),
        Commands::Encrypt(args) => commands::cipher::encrypt(args, opts),
        Commands::Decrypt(args) => commands::cipher::decrypt(args, opts),
    }
}

/// Logs go to stderr so stdout stays parseable. `RUST_LOG` wins over the
/// config file's filter.
fn init_tracing(config_filter: Option<&str>) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(config_filter.unwrap_or("info")))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
