//! Random-index legacy wallets.
//!
//! Daedalus addresses carry their own derivation path, encrypted under a
//! key derived from the root public key. Ownership is decided per
//! address: decrypt the payload, derive the key at that path, and check
//! that the address commits to it. No index enumeration is needed.

use chainwallet_chain::address::{LegacyAddress, LegacyAttributes};
use chainwallet_chain::transaction::Witness;
use chainwallet_crypto::hdpayload::{HdKey, HdPath};
use chainwallet_crypto::keygen::daedalus_root_key;
use chainwallet_crypto::mnemonic::Entropy;
use chainwallet_crypto::xprv::{DerivationIndex, DerivationScheme, XPrv, HARDENED_OFFSET};
use chainwallet_types::Result;

/// Daedalus root key plus its payload key.
pub struct DaedalusScheme {
    root: XPrv,
    hd_key: HdKey,
}

impl DaedalusScheme {
    /// Builds the scheme from mnemonic entropy.
    pub fn new(entropy: &Entropy) -> Result<Self> {
        let root = daedalus_root_key(entropy)?;
        let hd_key = HdKey::from_root(&root.public())?;
        Ok(Self { root, hd_key })
    }

    /// Address at the hardened path `account' / index'`.
    pub fn address(&self, account: u32, index: u32) -> Result<LegacyAddress> {
        let path = HdPath::new(account | HARDENED_OFFSET, index | HARDENED_OFFSET);
        let child = self.derive(&path)?;
        let payload = self.hd_key.encrypt_path(&path)?;
        LegacyAddress::new(
            &child.public(),
            LegacyAttributes {
                hd_payload: Some(payload),
                protocol_magic: None,
            },
        )
    }

    pub(crate) fn lookup(&self, address: &LegacyAddress) -> Option<super::KeyPath> {
        let payload = address.hd_payload()?;
        // A payload that fails to authenticate belongs to another wallet.
        let path = self.hd_key.decrypt_path(payload).ok()?;
        let child = self.derive(&path).ok()?;
        if address.is_derived_from(&child.public()) {
            tracing::debug!(path = %super::KeyPath::Daedalus(path), "matched daedalus address");
            Some(super::KeyPath::Daedalus(path))
        } else {
            tracing::warn!("payload decrypted but address root does not match");
            None
        }
    }

    pub(crate) fn witness(&self, path: &HdPath, message: &[u8]) -> Result<Witness> {
        let child = self.derive(path)?;
        Ok(Witness::OldUtxo {
            xpub: child.public(),
            signature: child.sign(message),
        })
    }

    fn derive(&self, path: &HdPath) -> Result<XPrv> {
        self.root.derive_path_with(
            DerivationScheme::V1,
            &[
                DerivationIndex::new(path.account),
                DerivationIndex::new(path.index),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheme::KeyPath;
    use chainwallet_crypto::mnemonic::mnemonic_to_entropy;
    use chainwallet_crypto::signing::verify;
    use chainwallet_types::WalletError;

    const PHRASE: &str = "legal winner thank year wave sausage worth useful legal winner thank yellow";
    const OTHER: &str = "abandon abandon abandon abandon abandon abandon \
                         abandon abandon abandon abandon abandon about";

    #[test]
    fn own_address_found() -> std::result::Result<(), WalletError> {
        let scheme = DaedalusScheme::new(&mnemonic_to_entropy(PHRASE)?)?;
        let address = scheme.address(0, 42)?;
        assert_eq!(
            scheme.lookup(&address),
            Some(KeyPath::Daedalus(HdPath::new(HARDENED_OFFSET, HARDENED_OFFSET + 42)))
        );
        Ok(())
    }

    #[test]
    fn addresses_use_v1_children() -> std::result::Result<(), WalletError> {
        let entropy = mnemonic_to_entropy(PHRASE)?;
        let scheme = DaedalusScheme::new(&entropy)?;
        let root = daedalus_root_key(&entropy)?;
        let path = [DerivationIndex::hardened(0), DerivationIndex::hardened(9)];

        let v1 = root.derive_path_with(DerivationScheme::V1, &path)?.public();
        let v2 = root.derive_path_with(DerivationScheme::V2, &path)?.public();
        let address = scheme.address(0, 9)?;
        assert!(address.is_derived_from(&v1));
        assert!(!address.is_derived_from(&v2));
        Ok(())
    }

    #[test]
    fn foreign_address_ignored() -> std::result::Result<(), WalletError> {
        let mine = DaedalusScheme::new(&mnemonic_to_entropy(PHRASE)?)?;
        let theirs = DaedalusScheme::new(&mnemonic_to_entropy(OTHER)?)?;
        assert_eq!(mine.lookup(&theirs.address(0, 1)?), None);
        Ok(())
    }

    #[test]
    fn witness_verifies_against_address_key() -> std::result::Result<(), WalletError> {
        let scheme = DaedalusScheme::new(&mnemonic_to_entropy(PHRASE)?)?;
        let path = HdPath::new(HARDENED_OFFSET, HARDENED_OFFSET + 3);
        match scheme.witness(&path, b"message")? {
            Witness::OldUtxo { xpub, signature } => {
                assert!(scheme.address(0, 3)?.is_derived_from(&xpub));
                verify(&xpub.public_key(), b"message", &signature)?;
            }
            other => panic!("unexpected witness {other:?}"),
        }
        Ok(())
    }
}
