//! Ed25519 signatures for account and UTXO witnesses.
//!
//! Two kinds of secret can sign for the account:
//!
//! - a plain Ed25519 [`Keypair`], derived from the mnemonic's account
//!   seed;
//! - an imported [`ExtendedSecretKey`], used as-is.
//!
//! [`AccountSecret`] unifies both so callers never branch on the kind.
//! Private keys are zeroized on drop.

use std::fmt;

use chainwallet_types::{AccountId, Result, WalletError};
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};

use crate::xprv::ExtendedSecretKey;

// ---------------------------------------------------------------------------
// PublicKey
// ---------------------------------------------------------------------------

/// Ed25519 public key (32 bytes).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct PublicKey([u8; 32]);

impl PublicKey {
    /// Fixed byte length of an Ed25519 public key.
    pub const LEN: usize = 32;

    /// Creates a [`PublicKey`] from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the underlying 32-byte array.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Account identifier for this key.
    pub fn to_account_id(&self) -> AccountId {
        AccountId::new(self.0)
    }
}

impl From<AccountId> for PublicKey {
    fn from(id: AccountId) -> Self {
        Self(*id.as_bytes())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Signature
// ---------------------------------------------------------------------------

/// Ed25519 signature (64 bytes).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Signature([u8; 64]);

impl Signature {
    /// Fixed byte length of an Ed25519 signature.
    pub const LEN: usize = 64;

    /// Creates a [`Signature`] from raw bytes.
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Returns the underlying 64-byte array.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Keypair
// ---------------------------------------------------------------------------

/// Ed25519 signing keypair.
///
/// Wraps an `ed25519-dalek` [`SigningKey`], which zeroizes itself on drop.
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Reconstructs a keypair deterministically from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Returns the public half of this keypair.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// Signs an arbitrary message (RFC 8032, deterministic).
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature(self.signing_key.sign(message).to_bytes())
    }
}

// Keypair intentionally does not implement Clone or Debug.

// ---------------------------------------------------------------------------
// AccountSecret
// ---------------------------------------------------------------------------

/// Secret key controlling the account.
pub enum AccountSecret {
    /// Derived from the mnemonic.
    Seed(Keypair),
    /// Imported 64-byte extended key.
    Extended(ExtendedSecretKey),
}

impl AccountSecret {
    /// Public key of the account.
    pub fn public_key(&self) -> PublicKey {
        match self {
            Self::Seed(keypair) => keypair.public_key(),
            Self::Extended(key) => key.public_key(),
        }
    }

    /// Signs `message` with the account key.
    pub fn sign(&self, message: &[u8]) -> Signature {
        match self {
            Self::Seed(keypair) => keypair.sign(message),
            Self::Extended(key) => key.sign(message),
        }
    }
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Verifies an Ed25519 signature against a public key and message.
///
/// Uses strict verification (rejects small-order keys and
/// non-canonical signatures).
pub fn verify(public_key: &PublicKey, message: &[u8], signature: &Signature) -> Result<()> {
    let vk = VerifyingKey::from_bytes(&public_key.0).map_err(|e| WalletError::InvalidInput {
        reason: format!("invalid public key: {e}"),
    })?;
    let sig = ed25519_dalek::Signature::from_bytes(&signature.0);
    vk.verify_strict(message, &sig)
        .map_err(|e| WalletError::InvalidInput {
            reason: format!("signature verification failed: {e}"),
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_keypair_is_deterministic() {
        let a = Keypair::from_seed(&[9u8; 32]);
        let b = Keypair::from_seed(&[9u8; 32]);
        assert_eq!(a.public_key(), b.public_key());
        assert_eq!(a.sign(b"vote"), b.sign(b"vote"));
    }

    #[test]
    fn account_secret_signs_for_its_key() -> std::result::Result<(), WalletError> {
        let secret = AccountSecret::Seed(Keypair::from_seed(&[1u8; 32]));
        let sig = secret.sign(b"payload");
        verify(&secret.public_key(), b"payload", &sig)?;
        Ok(())
    }

    #[test]
    fn verify_rejects_other_key() {
        let signer = Keypair::from_seed(&[1u8; 32]);
        let other = Keypair::from_seed(&[2u8; 32]);
        let sig = signer.sign(b"payload");
        assert!(verify(&other.public_key(), b"payload", &sig).is_err());
    }

    #[test]
    fn public_key_display_is_hex() {
        let pk = PublicKey::from_bytes([0xAB; 32]);
        assert_eq!(pk.to_string(), "ab".repeat(32));
    }
}
