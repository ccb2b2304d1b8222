//! Daedalus paper wallets.
//!
//! A paper certificate prints 27 words. The first 18 encode
//! `iv ‖ (entropy XOR key)`, the last 9 are the passphrase, and
//! `key = PBKDF2-HMAC-SHA512(passphrase, iv, 10000)` truncated to the
//! entropy length.

use chainwallet_types::{Result, WalletError};
use hmac::Hmac;
use sha2::Sha512;
use zeroize::Zeroizing;

use crate::mnemonic::{mnemonic_to_entropy, Entropy};

/// Words on a Daedalus paper certificate.
pub const PAPER_WALLET_WORDS: usize = 27;

/// Leading words carrying the scrambled entropy.
pub const SCRAMBLED_WORDS: usize = 18;

/// Salt prepended to the scrambled entropy.
pub const IV_SIZE: usize = 8;

const PBKDF2_ROUNDS: u32 = 10_000;

/// Scrambles `input` under `password`, returning `iv ‖ shielded`.
///
/// # Errors
///
/// [`WalletError::InternalDerivationFailure`] if key stretching fails.
pub fn scramble(iv: &[u8; IV_SIZE], password: &[u8], input: &[u8]) -> Result<Vec<u8>> {
    let key = keystream(iv, password, input.len())?;
    let mut out = Vec::with_capacity(IV_SIZE + input.len());
    out.extend_from_slice(iv);
    out.extend(input.iter().zip(key.iter()).map(|(b, k)| b ^ k));
    Ok(out)
}

/// Reverses [`scramble`].
///
/// A wrong password yields different bytes, not an error: the format
/// carries no authentication.
///
/// # Errors
///
/// [`WalletError::InvalidInput`] if `input` holds nothing past the IV.
pub fn unscramble(password: &[u8], input: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    if input.len() <= IV_SIZE {
        return Err(WalletError::InvalidInput {
            reason: format!(
                "scrambled input must be longer than {IV_SIZE} bytes, got {}",
                input.len()
            ),
        });
    }
    let (iv, shielded) = input.split_at(IV_SIZE);
    let mut salt = [0u8; IV_SIZE];
    salt.copy_from_slice(iv);

    let key = keystream(&salt, password, shielded.len())?;
    Ok(Zeroizing::new(
        shielded.iter().zip(key.iter()).map(|(b, k)| b ^ k).collect(),
    ))
}

/// Recovers the wallet entropy from a 27-word paper certificate.
///
/// Returns `Ok(None)` for any other word count so callers can fall back
/// to plain mnemonic parsing.
///
/// # Errors
///
/// [`WalletError::InvalidMnemonic`] if the scrambled words do not parse.
pub fn daedalus_paperwallet(phrase: &str) -> Result<Option<Entropy>> {
    let words: Vec<&str> = phrase.split_whitespace().collect();
    if words.len() != PAPER_WALLET_WORDS {
        return Ok(None);
    }
    let (scrambled, passphrase) = words.split_at(SCRAMBLED_WORDS);

    let scrambled = mnemonic_to_entropy(&scrambled.join(" "))?;
    let passphrase = Zeroizing::new(passphrase.join(" "));
    let entropy = unscramble(passphrase.as_bytes(), scrambled.as_bytes())?;

    Entropy::from_slice(&entropy).map(Some)
}

fn keystream(iv: &[u8; IV_SIZE], password: &[u8], len: usize) -> Result<Zeroizing<Vec<u8>>> {
    let mut key = Zeroizing::new(vec![0u8; len]);
    pbkdf2::pbkdf2::<Hmac<Sha512>>(password, iv, PBKDF2_ROUNDS, &mut key[..]).map_err(|e| {
        WalletError::InternalDerivationFailure {
            reason: format!("PBKDF2 failed: {e}"),
        }
    })?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mnemonic::entropy_to_mnemonic;

    const PASSPHRASE: [&str; 9] = [
        "town", "lift", "more", "follow", "chronic", "lunch", "weird", "uniform", "earth",
    ];

    fn certificate(entropy: &[u8]) -> std::result::Result<String, WalletError> {
        let passphrase = PASSPHRASE.join(" ");
        let scrambled = scramble(&[3; IV_SIZE], passphrase.as_bytes(), entropy)?;
        Ok(format!("{} {passphrase}", entropy_to_mnemonic(&scrambled)?))
    }

    #[test]
    fn scramble_keeps_iv_and_hides_input() -> std::result::Result<(), WalletError> {
        let out = scramble(&[9; IV_SIZE], b"pw", &[0; 16])?;
        assert_eq!(out.len(), IV_SIZE + 16);
        assert_eq!(&out[..IV_SIZE], &[9; IV_SIZE]);
        assert_ne!(&out[IV_SIZE..], &[0; 16]);
        assert_eq!(unscramble(b"pw", &out)?.as_slice(), &[0; 16]);
        assert_ne!(unscramble(b"other", &out)?.as_slice(), &[0; 16]);
        Ok(())
    }

    #[test]
    fn certificate_yields_wallet_entropy() -> std::result::Result<(), WalletError> {
        let phrase = certificate(&[0x42; 16])?;
        assert_eq!(phrase.split_whitespace().count(), PAPER_WALLET_WORDS);

        let entropy = daedalus_paperwallet(&phrase)?;
        assert_eq!(entropy.as_ref().map(Entropy::as_bytes), Some(&[0x42u8; 16][..]));
        Ok(())
    }

    #[test]
    fn other_word_counts_are_not_certificates() -> std::result::Result<(), WalletError> {
        let twelve = entropy_to_mnemonic(&[0; 16])?;
        assert!(daedalus_paperwallet(&twelve)?.is_none());
        Ok(())
    }

    #[test]
    fn scrambled_words_must_parse() {
        let phrase = ["abandon"; PAPER_WALLET_WORDS].join(" ");
        assert!(matches!(
            daedalus_paperwallet(&phrase),
            Err(WalletError::InvalidMnemonic { .. })
        ));
    }

    #[test]
    fn input_shorter_than_iv_rejected() {
        assert!(matches!(
            unscramble(b"pw", &[0; IV_SIZE]),
            Err(WalletError::InvalidInput { .. })
        ));
    }
}
