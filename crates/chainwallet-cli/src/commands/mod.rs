//! Command handlers and the argument groups they share.

pub mod cipher;
pub mod vote;
pub mod wallet;

use std::path::Path;

use chainwallet_types::config::RecoveryConfig;
use chainwallet_types::Discrimination;
use chainwallet_wallet::{RecoveryBuilder, Wallet};
use clap::{Args, ValueEnum};
use zeroize::Zeroizing;

use crate::output::parse_hex_array;

/// Environment variable read when `--password` is absent.
pub const PASSWORD_ENV: &str = "CHAINWALLET_PASSWORD";

// ---------------------------------------------------------------------------
// Key material
// ---------------------------------------------------------------------------

/// Where the wallet's keys come from.
#[derive(Args)]
pub struct KeyArgs {
    /// Recovery phrase (12 to 24 words).
    #[arg(long)]
    pub mnemonic: Option<String>,

    /// Mnemonic password (or set CHAINWALLET_PASSWORD).
    #[arg(long)]
    pub password: Option<String>,

    /// Account key as 128 hex characters.
    #[arg(long)]
    pub account_key: Option<String>,

    /// Free UTXO key as 128 hex characters (repeatable).
    #[arg(long = "utxo-key")]
    pub utxo_keys: Vec<String>,
}

impl KeyArgs {
    /// Recovers the wallet described by these arguments.
    pub fn load(&self, config: &RecoveryConfig) -> std::result::Result<Wallet, String> {
        if self.mnemonic.is_none() && self.account_key.is_none() {
            return Err("give --mnemonic or --account-key".into());
        }

        let mut builder = RecoveryBuilder::new(config.clone());
        if let Some(phrase) = &self.mnemonic {
            let password = resolve_password(self.password.as_deref());
            builder = builder
                .mnemonic(phrase, password.as_bytes())
                .map_err(|e| e.to_string())?;
        }
        if let Some(hex) = &self.account_key {
            let key = Zeroizing::new(parse_hex_array::<64>("account key", hex)?);
            builder = builder.account_key(&key).map_err(|e| e.to_string())?;
        }
        for hex in &self.utxo_keys {
            let key = Zeroizing::new(parse_hex_array::<64>("utxo key", hex)?);
            builder = builder.utxo_key(&key).map_err(|e| e.to_string())?;
        }
        builder.build().map_err(|e| e.to_string())
    }
}

/// `--password`, else `CHAINWALLET_PASSWORD`, else empty.
pub fn resolve_password(flag: Option<&str>) -> Zeroizing<String> {
    match flag {
        Some(p) => Zeroizing::new(p.to_string()),
        None => Zeroizing::new(std::env::var(PASSWORD_ENV).unwrap_or_default()),
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Network selector.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Network {
    Production,
    Test,
}

impl From<Network> for Discrimination {
    fn from(network: Network) -> Self {
        match network {
            Network::Production => Discrimination::Production,
            Network::Test => Discrimination::Test,
        }
    }
}

/// Reads a binary file.
pub fn read_file(what: &str, path: &Path) -> std::result::Result<Vec<u8>, String> {
    std::fs::read(path).map_err(|e| format!("failed to read {what} {}: {e}", path.display()))
}

/// Writes a file, replacing any previous content.
pub fn write_file(what: &str, path: &Path, bytes: &[u8]) -> std::result::Result<(), String> {
    std::fs::write(path, bytes)
        .map_err(|e| format!("failed to write {what} {}: {e}", path.display()))
}
