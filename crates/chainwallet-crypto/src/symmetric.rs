//! Password-based cipher for wallet-transfer payloads.
//!
//! Blob layout:
//!
//! ```text
//! version (1) || salt (16) || nonce (12) || ciphertext || tag (16)
//! ```
//!
//! The key is `PBKDF2-HMAC-SHA512(password, salt, 12983 rounds)`
//! truncated to 32 bytes; the cipher is ChaCha20-Poly1305 without
//! associated data.

use chainwallet_types::{Result, WalletError};
use hmac::Hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha512;
use zeroize::Zeroizing;

use crate::aead::{decrypt_chacha20, encrypt_chacha20, KEY_LEN, NONCE_LEN, TAG_LEN};

/// Only supported blob version.
pub const VERSION: u8 = 1;

/// Salt length in bytes.
pub const SALT_LEN: usize = 16;

/// PBKDF2 rounds for the payload key.
const PBKDF2_ROUNDS: u32 = 12_983;

/// Smallest valid blob: header plus an empty ciphertext's tag.
pub const MIN_BLOB_LEN: usize = 1 + SALT_LEN + NONCE_LEN + TAG_LEN;

/// Encrypts `plaintext` under `password` with a fresh random salt and nonce.
pub fn encrypt(password: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    let mut salt = [0u8; SALT_LEN];
    let mut nonce = [0u8; NONCE_LEN];
    OsRng
        .try_fill_bytes(&mut salt)
        .and_then(|_| OsRng.try_fill_bytes(&mut nonce))
        .map_err(|e| WalletError::InternalDerivationFailure {
            reason: format!("failed to gather randomness: {e}"),
        })?;
    encrypt_with(password, &salt, &nonce, plaintext)
}

/// Encrypts with caller-chosen salt and nonce.
///
/// The nonce must never repeat for the same password and salt.
pub fn encrypt_with(
    password: &[u8],
    salt: &[u8; SALT_LEN],
    nonce: &[u8; NONCE_LEN],
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    let key = derive_key(password, salt)?;
    let ciphertext = encrypt_chacha20(&key, nonce, plaintext, &[])?;

    let mut blob = Vec::with_capacity(1 + SALT_LEN + NONCE_LEN + ciphertext.len());
    blob.push(VERSION);
    blob.extend_from_slice(salt);
    blob.extend_from_slice(nonce);
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

/// Decrypts a blob produced by [`encrypt`].
///
/// The returned buffer is owned by the caller.
///
/// # Errors
///
/// [`WalletError::DecryptionFailed`] if the blob is shorter than
/// [`MIN_BLOB_LEN`], carries an unknown version or fails to
/// authenticate. No partial plaintext is ever returned.
pub fn decrypt(password: &[u8], blob: &[u8]) -> Result<Vec<u8>> {
    if blob.len() < MIN_BLOB_LEN {
        return Err(WalletError::DecryptionFailed {
            reason: format!(
                "ciphertext too short: {} bytes, need at least {MIN_BLOB_LEN}",
                blob.len()
            ),
        });
    }

    let (version, rest) = blob.split_at(1);
    if version[0] != VERSION {
        return Err(WalletError::DecryptionFailed {
            reason: format!("unsupported version {}", version[0]),
        });
    }

    let (salt_bytes, rest) = rest.split_at(SALT_LEN);
    let (nonce_bytes, ciphertext) = rest.split_at(NONCE_LEN);

    let mut salt = [0u8; SALT_LEN];
    salt.copy_from_slice(salt_bytes);
    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(nonce_bytes);

    let key = derive_key(password, &salt)?;
    decrypt_chacha20(&key, &nonce, ciphertext, &[])
}

fn derive_key(password: &[u8], salt: &[u8; SALT_LEN]) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2::pbkdf2::<Hmac<Sha512>>(password, salt, PBKDF2_ROUNDS, &mut key[..]).map_err(|e| {
        WalletError::InternalDerivationFailure {
            reason: format!("PBKDF2 failed: {e}"),
        }
    })?;
    Ok(key)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const SALT: [u8; SALT_LEN] = [0x11; SALT_LEN];
    const NONCE: [u8; NONCE_LEN] = [0x22; NONCE_LEN];

    #[test]
    fn blob_layout() -> std::result::Result<(), WalletError> {
        let blob = encrypt_with(b"pw", &SALT, &NONCE, b"abc")?;
        assert_eq!(blob.len(), MIN_BLOB_LEN + 3);
        assert_eq!(blob[0], VERSION);
        assert_eq!(&blob[1..17], &SALT);
        assert_eq!(&blob[17..29], &NONCE);
        Ok(())
    }

    #[test]
    fn roundtrip_with_fixed_parameters() -> std::result::Result<(), WalletError> {
        let blob = encrypt_with(b"password", &SALT, &NONCE, b"transfer payload")?;
        assert_eq!(decrypt(b"password", &blob)?, b"transfer payload");
        Ok(())
    }

    #[test]
    fn roundtrip_with_random_parameters() -> std::result::Result<(), WalletError> {
        let a = encrypt(b"password", b"same")?;
        let b = encrypt(b"password", b"same")?;
        assert_ne!(a, b);
        assert_eq!(decrypt(b"password", &a)?, b"same");
        assert_eq!(decrypt(b"password", &b)?, b"same");
        Ok(())
    }

    #[test]
    fn empty_plaintext_roundtrip() -> std::result::Result<(), WalletError> {
        let blob = encrypt_with(b"pw", &SALT, &NONCE, b"")?;
        assert_eq!(blob.len(), MIN_BLOB_LEN);
        assert!(decrypt(b"pw", &blob)?.is_empty());
        Ok(())
    }

    #[test]
    fn wrong_password_fails() -> std::result::Result<(), WalletError> {
        let blob = encrypt_with(b"right", &SALT, &NONCE, b"secret")?;
        assert!(matches!(
            decrypt(b"wrong", &blob),
            Err(WalletError::DecryptionFailed { .. })
        ));
        Ok(())
    }

    #[test]
    fn short_blob_fails() {
        assert!(matches!(
            decrypt(b"pw", &[VERSION; MIN_BLOB_LEN - 1]),
            Err(WalletError::DecryptionFailed { .. })
        ));
    }

    #[test]
    fn unknown_version_fails() -> std::result::Result<(), WalletError> {
        let mut blob = encrypt_with(b"pw", &SALT, &NONCE, b"x")?;
        blob[0] = 2;
        assert!(matches!(
            decrypt(b"pw", &blob),
            Err(WalletError::DecryptionFailed { .. })
        ));
        Ok(())
    }
}
