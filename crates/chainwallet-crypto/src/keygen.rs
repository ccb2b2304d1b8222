//! Root-key generation from mnemonic entropy.
//!
//! Each recovery scheme turns the same entropy into a different root:
//!
//! | scheme   | root                                                                |
//! |----------|---------------------------------------------------------------------|
//! | Yoroi    | `PBKDF2-HMAC-SHA512(password, entropy, 4096) → 96 bytes`, normalized |
//! | Daedalus | `HMAC-SHA512(CBOR(BLAKE2b-256(CBOR(entropy))), "Root Seed Chain i")` |
//! | account  | `PBKDF2-HMAC-SHA512(password, entropy, 4096) → 32-byte Ed25519 seed` |
//!
//! The Daedalus root ignores any password; callers skip that scheme when
//! a password is given.

use chainwallet_types::{Result, WalletError};
use ciborium::Value;
use hmac::Hmac;
use sha2::Sha512;
use zeroize::{Zeroize, Zeroizing};

use crate::hash::blake2b_256;
use crate::mnemonic::Entropy;
use crate::signing::Keypair;
use crate::xprv::{hmac_sha512, XPrv, XPRV_SIZE};

/// PBKDF2 rounds for the Yoroi root and the account seed.
const PBKDF2_ROUNDS: u32 = 4096;

/// Upper bound on Daedalus root-seed attempts.
const DAEDALUS_MAX_ATTEMPTS: u32 = 1000;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Derives the Yoroi (BIP44) root key.
pub fn yoroi_root_key(entropy: &Entropy, password: &[u8]) -> Result<XPrv> {
    let mut out = [0u8; XPRV_SIZE];
    pbkdf2_sha512(password, entropy.as_bytes(), &mut out)?;
    let root = XPrv::normalize_bytes_force3rd(out);
    out.zeroize();
    Ok(root)
}

/// Derives the Daedalus root key.
///
/// # Process
///
/// 1. `seed = CBOR-bytes(BLAKE2b-256(CBOR-bytes(entropy)))`.
/// 2. For `i` in `1..=1000`: `I = HMAC-SHA512(seed, "Root Seed Chain {i}")`.
/// 3. Accept the first `I` whose left half hashes to a usable scalar.
///
/// # Errors
///
/// [`WalletError::InternalDerivationFailure`] if no attempt succeeds.
pub fn daedalus_root_key(entropy: &Entropy) -> Result<XPrv> {
    let inner = cbor_bytes(entropy.as_bytes())?;
    let digest = blake2b_256(&inner);
    let seed = cbor_bytes(&digest)?;

    for i in 1..=DAEDALUS_MAX_ATTEMPTS {
        let message = format!("Root Seed Chain {i}");
        let mut block = hmac_sha512(&seed, message.as_bytes())?;

        let mut secret = [0u8; 32];
        let mut chain_code = [0u8; 32];
        secret.copy_from_slice(&block[..32]);
        chain_code.copy_from_slice(&block[32..]);
        block.zeroize();

        let attempt = XPrv::from_nonextended_noforce(&secret, &chain_code);
        secret.zeroize();
        chain_code.zeroize();

        if let Ok(root) = attempt {
            return Ok(root);
        }
    }

    Err(WalletError::InternalDerivationFailure {
        reason: format!("no usable Daedalus root after {DAEDALUS_MAX_ATTEMPTS} attempts"),
    })
}

/// Derives the 32-byte account seed.
pub fn account_seed(entropy: &Entropy, password: &[u8]) -> Result<Zeroizing<[u8; 32]>> {
    let mut seed = Zeroizing::new([0u8; 32]);
    pbkdf2_sha512(password, entropy.as_bytes(), &mut seed[..])?;
    Ok(seed)
}

/// Derives the account keypair from the mnemonic's entropy.
pub fn account_keypair(entropy: &Entropy, password: &[u8]) -> Result<Keypair> {
    let seed = account_seed(entropy, password)?;
    Ok(Keypair::from_seed(&seed))
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn pbkdf2_sha512(password: &[u8], salt: &[u8], out: &mut [u8]) -> Result<()> {
    pbkdf2::pbkdf2::<Hmac<Sha512>>(password, salt, PBKDF2_ROUNDS, out).map_err(|e| {
        WalletError::InternalDerivationFailure {
            reason: format!("PBKDF2 failed: {e}"),
        }
    })
}

/// Encodes `data` as a single CBOR byte string.
fn cbor_bytes(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len() + 3);
    ciborium::into_writer(&Value::Bytes(data.to_vec()), &mut out).map_err(|e| {
        WalletError::InternalDerivationFailure {
            reason: format!("CBOR encoding failed: {e}"),
        }
    })?;
    Ok(out)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mnemonic::mnemonic_to_entropy;

    const PHRASE: &str = "abandon abandon abandon abandon abandon abandon \
                          abandon abandon abandon abandon abandon about";

    #[test]
    fn cbor_bytes_header() -> std::result::Result<(), WalletError> {
        let encoded = cbor_bytes(&[0u8; 16])?;
        assert_eq!(encoded[0], 0x50);
        assert_eq!(encoded.len(), 17);

        let encoded = cbor_bytes(&[0u8; 32])?;
        assert_eq!(&encoded[..2], &[0x58, 0x20]);
        Ok(())
    }

    #[test]
    fn yoroi_root_is_deterministic() -> std::result::Result<(), WalletError> {
        let entropy = mnemonic_to_entropy(PHRASE)?;
        let a = yoroi_root_key(&entropy, b"")?.public();
        let b = yoroi_root_key(&entropy, b"")?.public();
        assert_eq!(a, b);
        Ok(())
    }

    #[test]
    fn password_changes_yoroi_root() -> std::result::Result<(), WalletError> {
        let entropy = mnemonic_to_entropy(PHRASE)?;
        let plain = yoroi_root_key(&entropy, b"")?.public();
        let salted = yoroi_root_key(&entropy, b"secret")?.public();
        assert_ne!(plain, salted);
        Ok(())
    }

    #[test]
    fn daedalus_root_is_deterministic() -> std::result::Result<(), WalletError> {
        let entropy = mnemonic_to_entropy(PHRASE)?;
        let a = daedalus_root_key(&entropy)?.public();
        let b = daedalus_root_key(&entropy)?.public();
        assert_eq!(a, b);
        Ok(())
    }

    #[test]
    fn schemes_produce_distinct_roots() -> std::result::Result<(), WalletError> {
        let entropy = mnemonic_to_entropy(PHRASE)?;
        let yoroi = yoroi_root_key(&entropy, b"")?.public();
        let daedalus = daedalus_root_key(&entropy)?.public();
        assert_ne!(yoroi, daedalus);
        Ok(())
    }

    #[test]
    fn account_key_depends_on_password() -> std::result::Result<(), WalletError> {
        let entropy = mnemonic_to_entropy(PHRASE)?;
        let a = account_keypair(&entropy, b"")?.public_key();
        let b = account_keypair(&entropy, b"")?.public_key();
        let c = account_keypair(&entropy, b"other")?.public_key();
        assert_eq!(a, b);
        assert_ne!(a, c);
        Ok(())
    }
}
