//! ChaCha20-Poly1305 authenticated encryption (IETF, 96-bit nonce).
//!
//! Shared by the password-based payload cipher and the encrypted
//! derivation paths of Daedalus addresses. Ciphertexts carry the
//! 16-byte Poly1305 tag appended at the end.

use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use chainwallet_types::{Result, WalletError};

/// Byte length of a ChaCha20-Poly1305 key.
pub const KEY_LEN: usize = 32;

/// Byte length of a ChaCha20-Poly1305 nonce.
pub const NONCE_LEN: usize = 12;

/// Byte length of the Poly1305 authentication tag.
pub const TAG_LEN: usize = 16;

/// Encrypts `plaintext`, returning `ciphertext || tag`.
///
/// # Parameters
///
/// - `key`: 256-bit symmetric key.
/// - `nonce`: 96-bit nonce; must never repeat for the same key.
/// - `aad`: authenticated but not encrypted. Pass `&[]` if unused.
pub fn encrypt_chacha20(
    key: &[u8; KEY_LEN],
    nonce: &[u8; NONCE_LEN],
    plaintext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    let payload = Payload { msg: plaintext, aad };

    cipher
        .encrypt(Nonce::from_slice(nonce), payload)
        .map_err(|e| WalletError::InternalDerivationFailure {
            reason: format!("ChaCha20-Poly1305 encryption failed: {e}"),
        })
}

/// Decrypts `ciphertext || tag`.
///
/// # Errors
///
/// [`WalletError::DecryptionFailed`] if the tag does not authenticate.
/// No plaintext is returned on failure.
pub fn decrypt_chacha20(
    key: &[u8; KEY_LEN],
    nonce: &[u8; NONCE_LEN],
    ciphertext: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>> {
    if ciphertext.len() < TAG_LEN {
        return Err(WalletError::DecryptionFailed {
            reason: format!(
                "ciphertext too short: {} bytes, need at least {TAG_LEN}",
                ciphertext.len()
            ),
        });
    }

    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    let payload = Payload {
        msg: ciphertext,
        aad,
    };

    cipher
        .decrypt(Nonce::from_slice(nonce), payload)
        .map_err(|_| WalletError::DecryptionFailed {
            reason: "authentication tag mismatch".into(),
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; 32] = [0x42; 32];
    const NONCE: [u8; 12] = [0x24; 12];

    #[test]
    fn encrypt_decrypt_roundtrip() -> std::result::Result<(), WalletError> {
        let ct = encrypt_chacha20(&KEY, &NONCE, b"derivation path", b"")?;
        assert_eq!(ct.len(), b"derivation path".len() + TAG_LEN);
        let pt = decrypt_chacha20(&KEY, &NONCE, &ct, b"")?;
        assert_eq!(pt, b"derivation path");
        Ok(())
    }

    #[test]
    fn tampered_ciphertext_rejected() -> std::result::Result<(), WalletError> {
        let mut ct = encrypt_chacha20(&KEY, &NONCE, b"hello", b"")?;
        ct[0] ^= 0x01;
        assert!(matches!(
            decrypt_chacha20(&KEY, &NONCE, &ct, b""),
            Err(WalletError::DecryptionFailed { .. })
        ));
        Ok(())
    }

    #[test]
    fn wrong_aad_rejected() -> std::result::Result<(), WalletError> {
        let ct = encrypt_chacha20(&KEY, &NONCE, b"hello", b"one")?;
        assert!(decrypt_chacha20(&KEY, &NONCE, &ct, b"two").is_err());
        Ok(())
    }

    #[test]
    fn short_ciphertext_rejected() {
        assert!(matches!(
            decrypt_chacha20(&KEY, &NONCE, &[0u8; 15], b""),
            Err(WalletError::DecryptionFailed { .. })
        ));
    }
}
