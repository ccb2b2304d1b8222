//! Encrypted derivation paths embedded in Daedalus addresses.
//!
//! Daedalus picks random indices and stores the path inside the address
//! itself, encrypted so only the owner can read it:
//!
//! ```text
//! key     = PBKDF2-HMAC-SHA512(root_xpub, "address-hashing", 500 rounds) → 32 bytes
//! payload = ChaCha20-Poly1305(key, nonce = "serokellfore", CBOR [account, index])
//! ```
//!
//! Decryption doubles as the ownership test: a payload that does not
//! authenticate under our key belongs to someone else.

use chainwallet_types::{Result, WalletError};
use ciborium::Value;
use hmac::Hmac;
use sha2::Sha512;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::aead::{decrypt_chacha20, encrypt_chacha20, KEY_LEN, NONCE_LEN};
use crate::xprv::XPub;

/// PBKDF2 salt for the payload key.
const PAYLOAD_KEY_SALT: &[u8] = b"address-hashing";

/// PBKDF2 rounds for the payload key.
const PAYLOAD_KEY_ROUNDS: u32 = 500;

/// Fixed nonce used for every payload.
const PAYLOAD_NONCE: &[u8; NONCE_LEN] = b"serokellfore";

// ---------------------------------------------------------------------------
// HdPath
// ---------------------------------------------------------------------------

/// Two-level Daedalus derivation path. Both indices are raw (the
/// hardened bit is part of the value).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct HdPath {
    /// Account index.
    pub account: u32,
    /// Address index.
    pub index: u32,
}

impl HdPath {
    /// Creates a path.
    pub const fn new(account: u32, index: u32) -> Self {
        Self { account, index }
    }
}

// ---------------------------------------------------------------------------
// HdKey
// ---------------------------------------------------------------------------

/// Symmetric key protecting the payloads of one Daedalus wallet.
/// Zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct HdKey([u8; KEY_LEN]);

impl HdKey {
    /// Derives the payload key from the wallet's root public key.
    pub fn from_root(root: &XPub) -> Result<Self> {
        let mut key = [0u8; KEY_LEN];
        pbkdf2::pbkdf2::<Hmac<Sha512>>(
            root.as_bytes(),
            PAYLOAD_KEY_SALT,
            PAYLOAD_KEY_ROUNDS,
            &mut key,
        )
        .map_err(|e| WalletError::InternalDerivationFailure {
            reason: format!("payload key derivation failed: {e}"),
        })?;
        let hd_key = Self(key);
        key.zeroize();
        Ok(hd_key)
    }

    /// Encrypts a path into an address payload.
    pub fn encrypt_path(&self, path: &HdPath) -> Result<Vec<u8>> {
        let value = Value::Array(vec![
            Value::Integer(path.account.into()),
            Value::Integer(path.index.into()),
        ]);
        let mut plaintext = Vec::with_capacity(12);
        ciborium::into_writer(&value, &mut plaintext).map_err(|e| {
            WalletError::InternalDerivationFailure {
                reason: format!("path encoding failed: {e}"),
            }
        })?;
        encrypt_chacha20(&self.0, PAYLOAD_NONCE, &plaintext, &[])
    }

    /// Decrypts an address payload.
    ///
    /// # Errors
    ///
    /// [`WalletError::DecryptionFailed`] if the payload was not produced
    /// under this key or does not hold a two-element path.
    pub fn decrypt_path(&self, payload: &[u8]) -> Result<HdPath> {
        let plaintext = decrypt_chacha20(&self.0, PAYLOAD_NONCE, payload, &[])?;
        let value: Value =
            ciborium::from_reader(plaintext.as_slice()).map_err(|e| {
                WalletError::DecryptionFailed {
                    reason: format!("payload is not CBOR: {e}"),
                }
            })?;

        let items = match value {
            Value::Array(items) if items.len() == 2 => items,
            _ => {
                return Err(WalletError::DecryptionFailed {
                    reason: "payload must hold exactly two indices".into(),
                })
            }
        };

        let account = index_from_value(&items[0])?;
        let index = index_from_value(&items[1])?;
        Ok(HdPath { account, index })
    }
}

// HdKey does not implement Clone/Debug to prevent leakage.

fn index_from_value(value: &Value) -> Result<u32> {
    match value {
        Value::Integer(i) => u32::try_from(*i).map_err(|_| WalletError::DecryptionFailed {
            reason: "payload index out of range".into(),
        }),
        _ => Err(WalletError::DecryptionFailed {
            reason: "payload index must be an integer".into(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn key_for(fill: u8) -> std::result::Result<HdKey, WalletError> {
        HdKey::from_root(&XPub::from_bytes([fill; 64]))
    }

    #[test]
    fn path_roundtrip() -> std::result::Result<(), WalletError> {
        let key = key_for(1)?;
        let path = HdPath::new(0x8000_0000, 0x8000_1234);
        let payload = key.encrypt_path(&path)?;
        assert_eq!(key.decrypt_path(&payload)?, path);
        Ok(())
    }

    #[test]
    fn foreign_payload_rejected() -> std::result::Result<(), WalletError> {
        let payload = key_for(1)?.encrypt_path(&HdPath::new(1, 2))?;
        assert!(matches!(
            key_for(2)?.decrypt_path(&payload),
            Err(WalletError::DecryptionFailed { .. })
        ));
        Ok(())
    }

    #[test]
    fn payload_is_deterministic() -> std::result::Result<(), WalletError> {
        let key = key_for(3)?;
        let path = HdPath::new(5, 6);
        assert_eq!(key.encrypt_path(&path)?, key.encrypt_path(&path)?);
        Ok(())
    }
}
