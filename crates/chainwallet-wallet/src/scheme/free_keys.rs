//! Imported standalone UTXO keys, matched against native single addresses.

use std::collections::HashMap;

use chainwallet_chain::address::{Address, Kind};
use chainwallet_chain::transaction::Witness;
use chainwallet_crypto::signing::PublicKey;
use chainwallet_crypto::xprv::ExtendedSecretKey;
use chainwallet_types::{Result, WalletError};

use super::KeyPath;

/// Imported keys indexed by public key.
pub struct FreeKeysScheme {
    keys: Vec<ExtendedSecretKey>,
    by_public: HashMap<PublicKey, usize>,
}

impl FreeKeysScheme {
    /// Takes ownership of the imported keys. Duplicate keys keep their
    /// first position.
    pub fn new(keys: Vec<ExtendedSecretKey>) -> Self {
        let mut by_public = HashMap::with_capacity(keys.len());
        for (index, key) in keys.iter().enumerate() {
            by_public.entry(key.public_key()).or_insert(index);
        }
        Self { keys, by_public }
    }

    /// Number of imported keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns `true` when no key was imported.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub(crate) fn lookup(&self, address: &Address) -> Option<KeyPath> {
        match address.kind() {
            Kind::Single(key) => self
                .by_public
                .get(key)
                .map(|&index| KeyPath::FreeKey { index }),
            Kind::Account(_) => None,
        }
    }

    pub(crate) fn witness(&self, index: usize, message: &[u8]) -> Result<Witness> {
        let key = self
            .keys
            .get(index)
            .ok_or_else(|| WalletError::InternalDerivationFailure {
                reason: format!("no imported key at index {index}"),
            })?;
        Ok(Witness::Utxo(key.sign(message)))
    }
}
