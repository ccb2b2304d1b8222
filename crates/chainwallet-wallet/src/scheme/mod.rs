//! Key-derivation schemes that can own snapshot outputs.
//!
//! Each scheme answers two questions: "is this address mine, and under
//! which path?" ([`DerivationScheme::lookup`]) and "sign for the key at
//! this path" ([`DerivationScheme::witness`]). The address format picks
//! the scheme:
//!
//! | address                        | scheme                  |
//! |--------------------------------|-------------------------|
//! | legacy with HD payload         | [`DaedalusScheme`]      |
//! | legacy without payload         | [`YoroiScheme`]         |
//! | native single                  | [`FreeKeysScheme`]      |

pub mod daedalus;
pub mod free_keys;
pub mod yoroi;

use std::fmt;

use chainwallet_chain::scanner::OutputAddress;
use chainwallet_chain::transaction::Witness;
use chainwallet_crypto::hdpayload::HdPath;
use chainwallet_crypto::xprv::HARDENED_OFFSET;
use chainwallet_types::{Result, WalletError};

pub use daedalus::DaedalusScheme;
pub use free_keys::FreeKeysScheme;
pub use yoroi::YoroiScheme;

// ---------------------------------------------------------------------------
// KeyPath
// ---------------------------------------------------------------------------

/// Location of the key controlling a matched output.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum KeyPath {
    /// Random-index path embedded in the address (raw, hardened indices).
    Daedalus(HdPath),
    /// `m/44'/1815'/account'/change/index`.
    Yoroi { account: u32, change: u32, index: u32 },
    /// Position of the key in the imported list.
    FreeKey { index: usize },
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Daedalus(path) => write!(
                f,
                "daedalus/{}/{}",
                display_index(path.account),
                display_index(path.index)
            ),
            Self::Yoroi {
                account,
                change,
                index,
            } => write!(f, "yoroi/m/44'/1815'/{account}'/{change}/{index}"),
            Self::FreeKey { index } => write!(f, "free/{index}"),
        }
    }
}

fn display_index(raw: u32) -> String {
    if raw >= HARDENED_OFFSET {
        format!("{}'", raw - HARDENED_OFFSET)
    } else {
        raw.to_string()
    }
}

// ---------------------------------------------------------------------------
// DerivationScheme
// ---------------------------------------------------------------------------

/// Closed set of recovery schemes.
pub enum DerivationScheme {
    /// Random-index legacy wallets.
    Daedalus(DaedalusScheme),
    /// Sequential BIP44 legacy wallets.
    Yoroi(YoroiScheme),
    /// Imported standalone UTXO keys.
    FreeKeys(FreeKeysScheme),
}

impl DerivationScheme {
    /// Short scheme name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Daedalus(_) => "daedalus",
            Self::Yoroi(_) => "yoroi",
            Self::FreeKeys(_) => "free_keys",
        }
    }

    /// Returns the path of `address` if this scheme owns it.
    ///
    /// Sequential schemes may grow their address window as a side effect.
    pub fn lookup(&mut self, address: &OutputAddress) -> Option<KeyPath> {
        match (self, address) {
            (Self::Daedalus(scheme), OutputAddress::Legacy(legacy))
                if legacy.hd_payload().is_some() =>
            {
                scheme.lookup(legacy)
            }
            (Self::Yoroi(scheme), OutputAddress::Legacy(legacy))
                if legacy.hd_payload().is_none() =>
            {
                scheme.lookup(legacy)
            }
            (Self::FreeKeys(scheme), OutputAddress::Native(native)) => scheme.lookup(native),
            _ => None,
        }
    }

    /// Number of addresses currently derivable without further
    /// discovery. Only sequential schemes report a non-zero window.
    pub fn window_size(&self) -> usize {
        match self {
            Self::Yoroi(scheme) => scheme.window_size(),
            Self::Daedalus(_) | Self::FreeKeys(_) => 0,
        }
    }

    /// Returns `true` if `path` belongs to this scheme.
    pub fn owns(&self, path: &KeyPath) -> bool {
        matches!(
            (self, path),
            (Self::Daedalus(_), KeyPath::Daedalus(_))
                | (Self::Yoroi(_), KeyPath::Yoroi { .. })
                | (Self::FreeKeys(_), KeyPath::FreeKey { .. })
        )
    }

    /// Signs `message` with the key at `path`.
    ///
    /// # Errors
    ///
    /// [`WalletError::InternalDerivationFailure`] if the path belongs to
    /// another scheme or cannot be derived.
    pub fn witness(&self, path: &KeyPath, message: &[u8]) -> Result<Witness> {
        match (self, path) {
            (Self::Daedalus(scheme), KeyPath::Daedalus(hd)) => scheme.witness(hd, message),
            (
                Self::Yoroi(scheme),
                KeyPath::Yoroi {
                    account,
                    change,
                    index,
                },
            ) => scheme.witness(*account, *change, *index, message),
            (Self::FreeKeys(scheme), KeyPath::FreeKey { index }) => scheme.witness(*index, message),
            (scheme, path) => Err(WalletError::InternalDerivationFailure {
                reason: format!("path {path} does not belong to the {} scheme", scheme.name()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_path_display() {
        let daedalus = KeyPath::Daedalus(HdPath::new(HARDENED_OFFSET, HARDENED_OFFSET + 7));
        assert_eq!(daedalus.to_string(), "daedalus/0'/7'");
        let yoroi = KeyPath::Yoroi {
            account: 0,
            change: 1,
            index: 3,
        };
        assert_eq!(yoroi.to_string(), "yoroi/m/44'/1815'/0'/1/3");
        assert_eq!(KeyPath::FreeKey { index: 2 }.to_string(), "free/2");
    }
}
