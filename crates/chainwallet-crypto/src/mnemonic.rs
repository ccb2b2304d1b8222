//! BIP39 mnemonic parsing.
//!
//! Wallet recovery works from the mnemonic's *entropy*, not from the
//! BIP39 seed: both legacy schemes and the account key feed the raw
//! entropy into their own key-generation functions (see
//! [`crate::keygen`]). Parsing, word-list lookup and checksum
//! verification are delegated to the `bip39` crate.
//!
//! Accepted lengths are 12, 15, 18, 21 and 24 English words.

use chainwallet_types::{Result, WalletError};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Word counts accepted for recovery.
pub const VALID_WORD_COUNTS: [usize; 5] = [12, 15, 18, 21, 24];

// ---------------------------------------------------------------------------
// Entropy
// ---------------------------------------------------------------------------

/// Entropy recovered from a mnemonic (16 to 32 bytes).
///
/// Zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Entropy(Vec<u8>);

impl Entropy {
    /// Copies raw entropy of a length a mnemonic can encode.
    ///
    /// # Errors
    ///
    /// [`WalletError::InvalidInput`] unless the length is 16, 20, 24, 28
    /// or 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        if !(16..=32).contains(&bytes.len()) || bytes.len() % 4 != 0 {
            return Err(WalletError::InvalidInput {
                reason: format!("{} bytes is not a valid entropy length", bytes.len()),
            });
        }
        Ok(Self(bytes.to_vec()))
    }

    /// Returns the raw entropy bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Number of entropy bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false` for entropy produced by [`mnemonic_to_entropy`].
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// Entropy does not implement Clone/Debug to prevent leakage.

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parses a mnemonic phrase and returns its entropy.
///
/// Whitespace between words is normalized to single spaces before
/// parsing. The phrase must already be NFKD-normalized; English words
/// are ASCII so this only matters for pasted input.
///
/// # Errors
///
/// [`WalletError::InvalidMnemonic`] on a bad word count, an unknown
/// word or a checksum mismatch.
pub fn mnemonic_to_entropy(phrase: &str) -> Result<Entropy> {
    let words: Vec<&str> = phrase.split_whitespace().collect();
    if !VALID_WORD_COUNTS.contains(&words.len()) {
        return Err(WalletError::InvalidMnemonic {
            reason: format!(
                "expected 12, 15, 18, 21 or 24 words, got {}",
                words.len()
            ),
        });
    }

    let mut normalized = words.join(" ");
    let parsed = bip39::Mnemonic::parse_in_normalized(bip39::Language::English, &normalized);
    normalized.zeroize();

    let mnemonic = parsed.map_err(|e| WalletError::InvalidMnemonic {
        reason: e.to_string(),
    })?;

    Ok(Entropy(mnemonic.to_entropy()))
}

/// Checks a mnemonic without keeping its entropy.
pub fn validate_mnemonic(phrase: &str) -> Result<()> {
    mnemonic_to_entropy(phrase).map(|_| ())
}

/// Encodes entropy as an English mnemonic phrase.
///
/// # Errors
///
/// [`WalletError::InvalidInput`] if the entropy length is not one of
/// 16, 20, 24, 28 or 32 bytes.
pub fn entropy_to_mnemonic(entropy: &[u8]) -> Result<String> {
    let mnemonic = bip39::Mnemonic::from_entropy_in(bip39::Language::English, entropy)
        .map_err(|e| WalletError::InvalidInput {
            reason: format!("cannot encode entropy as mnemonic: {e}"),
        })?;
    Ok(mnemonic.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const TWELVE_WORDS: &str = "abandon abandon abandon abandon abandon abandon \
                                abandon abandon abandon abandon abandon about";

    #[test]
    fn twelve_words_zero_entropy() -> std::result::Result<(), WalletError> {
        let entropy = mnemonic_to_entropy(TWELVE_WORDS)?;
        assert_eq!(entropy.as_bytes(), &[0u8; 16]);
        Ok(())
    }

    #[test]
    fn extra_whitespace_is_tolerated() -> std::result::Result<(), WalletError> {
        let messy = format!("  {}\n", TWELVE_WORDS.replace(' ', "   "));
        let entropy = mnemonic_to_entropy(&messy)?;
        assert_eq!(entropy.len(), 16);
        Ok(())
    }

    #[test]
    fn bad_checksum_rejected() {
        let phrase = "abandon abandon abandon abandon abandon abandon \
                      abandon abandon abandon abandon abandon abandon";
        assert!(matches!(
            mnemonic_to_entropy(phrase),
            Err(WalletError::InvalidMnemonic { .. })
        ));
    }

    #[test]
    fn unknown_word_rejected() {
        let phrase = "abandon abandon abandon abandon abandon abandon \
                      abandon abandon abandon abandon abandon notaword";
        assert!(validate_mnemonic(phrase).is_err());
    }

    #[test]
    fn wrong_word_count_rejected() {
        let phrase = "abandon abandon abandon abandon abandon about";
        assert!(matches!(
            validate_mnemonic(phrase),
            Err(WalletError::InvalidMnemonic { .. })
        ));
    }

    #[test]
    fn fifteen_word_roundtrip() -> std::result::Result<(), WalletError> {
        let entropy = [0x5Au8; 20];
        let phrase = entropy_to_mnemonic(&entropy)?;
        assert_eq!(phrase.split_whitespace().count(), 15);
        let recovered = mnemonic_to_entropy(&phrase)?;
        assert_eq!(recovered.as_bytes(), &entropy);
        Ok(())
    }
}
