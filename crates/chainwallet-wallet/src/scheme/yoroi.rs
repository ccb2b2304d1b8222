//! Sequential BIP44 legacy wallets (`m/44'/1815'/account'/change/index`).
//!
//! Addresses hold no path, so ownership needs the address up front:
//! every `(account, change)` chain pre-generates a window of
//! `gap_limit` addresses into a hash map. A match at index `i` extends
//! its chain so that `gap_limit` unused addresses follow `i` again.

use std::collections::HashMap;

use chainwallet_chain::address::{LegacyAddress, LegacyAttributes};
use chainwallet_chain::transaction::Witness;
use chainwallet_crypto::keygen::yoroi_root_key;
use chainwallet_crypto::mnemonic::Entropy;
use chainwallet_crypto::xprv::{DerivationIndex, XPrv, HARDENED_OFFSET};
use chainwallet_types::config::RecoveryConfig;
use chainwallet_types::{Result, WalletError};

use super::KeyPath;

/// BIP44 purpose.
const PURPOSE: u32 = 44;

/// Registered coin type.
const COIN_TYPE: u32 = 1815;

/// External and internal (change) chains.
const CHANGE_CHAINS: [u32; 2] = [0, 1];

/// One `(account, change)` address chain.
struct Chain {
    account: u32,
    change: u32,
    key: XPrv,
    /// Addresses generated so far: indices `0..generated`.
    generated: u32,
}

/// Yoroi root expanded into its address chains.
pub struct YoroiScheme {
    chains: Vec<Chain>,
    addresses: HashMap<Vec<u8>, (usize, u32)>,
    gap_limit: u32,
}

impl YoroiScheme {
    /// Builds the scheme and generates the initial window of every chain.
    pub fn new(entropy: &Entropy, password: &[u8], config: &RecoveryConfig) -> Result<Self> {
        let root = yoroi_root_key(entropy, password)?;

        let mut chains = Vec::new();
        for account in 0..config.yoroi_account_count {
            let account_key = root.derive_path(&[
                DerivationIndex::hardened(PURPOSE),
                DerivationIndex::hardened(COIN_TYPE),
                DerivationIndex::hardened(account),
            ])?;
            for change in CHANGE_CHAINS {
                chains.push(Chain {
                    account,
                    change,
                    key: account_key.derive(DerivationIndex::soft(change))?,
                    generated: 0,
                });
            }
        }

        let mut scheme = Self {
            chains,
            addresses: HashMap::new(),
            gap_limit: config.address_gap_limit,
        };
        for chain in 0..scheme.chains.len() {
            scheme.extend(chain, config.address_gap_limit)?;
        }
        tracing::debug!(
            chains = scheme.chains.len(),
            addresses = scheme.addresses.len(),
            "yoroi window generated"
        );
        Ok(scheme)
    }

    /// Address at `m/44'/1815'/account'/change/index`.
    ///
    /// # Errors
    ///
    /// [`WalletError::InvalidInput`] if the account was not scanned or
    /// `change` is not 0 or 1.
    pub fn address(&self, account: u32, change: u32, index: u32) -> Result<LegacyAddress> {
        let chain = self.chain(account, change)?;
        address_at(&self.chains[chain].key, index)
    }

    /// Number of generated addresses across all chains.
    pub fn window_size(&self) -> usize {
        self.addresses.len()
    }

    pub(crate) fn lookup(&mut self, address: &LegacyAddress) -> Option<KeyPath> {
        let (chain, index) = *self.addresses.get(address.as_bytes())?;
        let wanted = index.saturating_add(1).saturating_add(self.gap_limit);
        if let Err(e) = self.extend(chain, wanted) {
            tracing::warn!(error = %e, "failed to extend yoroi address window");
        }

        let chain = &self.chains[chain];
        let path = KeyPath::Yoroi {
            account: chain.account,
            change: chain.change,
            index,
        };
        tracing::debug!(%path, "matched yoroi address");
        Some(path)
    }

    pub(crate) fn witness(
        &self,
        account: u32,
        change: u32,
        index: u32,
        message: &[u8],
    ) -> Result<Witness> {
        let chain = self
            .chain(account, change)
            .map_err(|e| WalletError::InternalDerivationFailure {
                reason: e.reason().to_string(),
            })?;
        let key = self.chains[chain].key.derive(DerivationIndex::soft(index))?;
        Ok(Witness::OldUtxo {
            xpub: key.public(),
            signature: key.sign(message),
        })
    }

    fn chain(&self, account: u32, change: u32) -> Result<usize> {
        self.chains
            .iter()
            .position(|c| c.account == account && c.change == change)
            .ok_or_else(|| WalletError::InvalidInput {
                reason: format!("no yoroi chain for account {account}, change {change}"),
            })
    }

    /// Generates addresses on `chain` until `upto` exist.
    fn extend(&mut self, chain: usize, upto: u32) -> Result<()> {
        let upto = upto.min(HARDENED_OFFSET);
        let state = &mut self.chains[chain];
        while state.generated < upto {
            let address = address_at(&state.key, state.generated)?;
            self.addresses
                .insert(address.as_bytes().to_vec(), (chain, state.generated));
            state.generated += 1;
        }
        Ok(())
    }
}

fn address_at(chain_key: &XPrv, index: u32) -> Result<LegacyAddress> {
    if index >= HARDENED_OFFSET {
        return Err(WalletError::InvalidInput {
            reason: format!("address index {index} is not a soft index"),
        });
    }
    let key = chain_key.derive(DerivationIndex::soft(index))?;
    LegacyAddress::new(&key.public(), LegacyAttributes::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainwallet_crypto::mnemonic::mnemonic_to_entropy;

    const PHRASE: &str = "legal winner thank year wave sausage worth useful legal winner thank yellow";

    fn config(gap: u32) -> RecoveryConfig {
        RecoveryConfig {
            address_gap_limit: gap,
            ..RecoveryConfig::default()
        }
    }

    #[test]
    fn initial_window_covers_both_chains() -> std::result::Result<(), WalletError> {
        let mut scheme = YoroiScheme::new(&mnemonic_to_entropy(PHRASE)?, b"", &config(5))?;
        assert_eq!(scheme.window_size(), 10);
        let change = scheme.address(0, 1, 4)?;
        assert_eq!(
            scheme.lookup(&change),
            Some(KeyPath::Yoroi {
                account: 0,
                change: 1,
                index: 4
            })
        );
        Ok(())
    }

    #[test]
    fn match_extends_window() -> std::result::Result<(), WalletError> {
        let mut scheme = YoroiScheme::new(&mnemonic_to_entropy(PHRASE)?, b"", &config(3))?;
        let beyond = scheme.address(0, 0, 5)?;
        assert_eq!(scheme.lookup(&beyond), None);

        let edge = scheme.address(0, 0, 2)?;
        assert!(scheme.lookup(&edge).is_some());
        assert_eq!(scheme.window_size(), 6 + 3);
        assert!(scheme.lookup(&beyond).is_some());
        Ok(())
    }

    #[test]
    fn password_changes_addresses() -> std::result::Result<(), WalletError> {
        let entropy = mnemonic_to_entropy(PHRASE)?;
        let plain = YoroiScheme::new(&entropy, b"", &config(1))?;
        let mut salted = YoroiScheme::new(&entropy, b"pw", &config(1))?;
        assert_eq!(salted.lookup(&plain.address(0, 0, 0)?), None);
        Ok(())
    }

    #[test]
    fn unknown_account_rejected() -> std::result::Result<(), WalletError> {
        let scheme = YoroiScheme::new(&mnemonic_to_entropy(PHRASE)?, b"", &config(1))?;
        assert!(matches!(
            scheme.address(3, 0, 0),
            Err(WalletError::InvalidInput { .. })
        ));
        Ok(())
    }
}
