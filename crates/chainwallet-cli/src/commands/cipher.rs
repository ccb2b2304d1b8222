//! Symmetric payload cipher.
//!
//! Input is hex (`--hex`) or a file (`--in`). Output is hex on stdout,
//! or raw bytes written to `--out`.

use std::path::PathBuf;

use chainwallet_crypto::symmetric;
use clap::Args;
use zeroize::Zeroizing;

use super::{read_file, resolve_password, write_file};
use crate::output::{self, parse_hex};
use crate::GlobalOpts;

#[derive(Args)]
pub struct CipherArgs {
    /// Password (or set CHAINWALLET_PASSWORD).
    #[arg(long)]
    pub password: Option<String>,

    /// Input as hex.
    #[arg(long, conflicts_with = "input")]
    pub hex: Option<String>,

    /// Input file.
    #[arg(long = "in")]
    pub input: Option<PathBuf>,

    /// Output file for the raw result.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

impl CipherArgs {
    fn read_input(&self) -> std::result::Result<Vec<u8>, String> {
        match (&self.hex, &self.input) {
            (Some(hex), _) => parse_hex("input", hex),
            (None, Some(path)) => read_file("input", path),
            (None, None) => Err("give --hex or --in".into()),
        }
    }

    fn write_output(&self, bytes: &[u8], opts: &GlobalOpts) -> std::result::Result<(), String> {
        match &self.out {
            Some(path) => {
                write_file("output", path, bytes)?;
                output::print_success(
                    &format!("{} bytes written to {}", bytes.len(), path.display()),
                    opts.json,
                );
            }
            None => output::print_kv("data", &hex::encode(bytes), opts.json),
        }
        Ok(())
    }
}

pub fn encrypt(args: CipherArgs, opts: &GlobalOpts) -> std::result::Result<(), String> {
    let password = resolve_password(args.password.as_deref());
    let plaintext = Zeroizing::new(args.read_input()?);
    let blob = symmetric::encrypt(password.as_bytes(), &plaintext).map_err(|e| e.to_string())?;
    args.write_output(&blob, opts)
}

pub fn decrypt(args: CipherArgs, opts: &GlobalOpts) -> std::result::Result<(), String> {
    let password = resolve_password(args.password.as_deref());
    let blob = args.read_input()?;
    let plaintext =
        Zeroizing::new(symmetric::decrypt(password.as_bytes(), &blob).map_err(|e| e.to_string())?);
    args.write_output(&plaintext, opts)
}
