//! Assembling a [`Wallet`] from recovery inputs.
//!
//! Two kinds of key material are accepted:
//!
//! - a mnemonic (plus optional password): enables the Daedalus scheme
//!   (empty password only), the Yoroi scheme and derives the account key.
//!   A 27-word Daedalus paper certificate is accepted in its place;
//! - imported 64-byte extended keys: one account key and any number of
//!   free UTXO keys.
//!
//! Both can be combined; an imported account key takes precedence over
//! the mnemonic-derived one.

use chainwallet_crypto::keygen::account_keypair;
use chainwallet_crypto::mnemonic::{mnemonic_to_entropy, Entropy};
use chainwallet_crypto::paperwallet::{daedalus_paperwallet, unscramble};
use chainwallet_crypto::signing::AccountSecret;
use chainwallet_crypto::xprv::{ExtendedSecretKey, EXTENDED_SECRET_KEY_SIZE};
use chainwallet_types::config::RecoveryConfig;
use chainwallet_types::{Result, WalletError};
use zeroize::Zeroizing;

use crate::account::Account;
use crate::scheme::{DaedalusScheme, DerivationScheme, FreeKeysScheme, YoroiScheme};
use crate::wallet::Wallet;

/// Collects key material, then derives every scheme in [`build`](Self::build).
pub struct RecoveryBuilder {
    config: RecoveryConfig,
    entropy: Option<Entropy>,
    password: Zeroizing<Vec<u8>>,
    account_key: Option<ExtendedSecretKey>,
    utxo_keys: Vec<ExtendedSecretKey>,
}

// RecoveryBuilder does not implement Clone/Debug to prevent leakage.

impl Default for RecoveryBuilder {
    fn default() -> Self {
        Self::new(RecoveryConfig::default())
    }
}

impl RecoveryBuilder {
    /// Starts an empty builder.
    pub fn new(config: RecoveryConfig) -> Self {
        Self {
            config,
            entropy: None,
            password: Zeroizing::new(Vec::new()),
            account_key: None,
            utxo_keys: Vec::new(),
        }
    }

    /// Uses a mnemonic and password.
    ///
    /// A 27-word phrase is read as a Daedalus paper certificate and
    /// unscrambled first.
    ///
    /// # Errors
    ///
    /// [`WalletError::InvalidMnemonic`] if the phrase does not parse.
    pub fn mnemonic(mut self, phrase: &str, password: &[u8]) -> Result<Self> {
        let entropy = match daedalus_paperwallet(phrase)? {
            Some(entropy) => {
                tracing::debug!("paper certificate unscrambled");
                entropy
            }
            None => mnemonic_to_entropy(phrase)?,
        };
        self.entropy = Some(entropy);
        self.password = Zeroizing::new(password.to_vec());
        Ok(self)
    }

    /// Uses scrambled paper-wallet bytes (`iv ‖ shielded entropy`) and
    /// the passphrase they were scrambled with.
    ///
    /// The passphrase only unscrambles; the wallet itself is recovered
    /// without a password, so the Daedalus scheme stays enabled.
    ///
    /// # Errors
    ///
    /// [`WalletError::InvalidInput`] if the input is too short or does
    /// not unscramble to a valid entropy length.
    pub fn paperwallet(mut self, passphrase: &[u8], input: &[u8]) -> Result<Self> {
        let entropy = unscramble(passphrase, input)?;
        self.entropy = Some(Entropy::from_slice(&entropy)?);
        self.password = Zeroizing::new(Vec::new());
        Ok(self)
    }

    /// Uses an imported account key.
    ///
    /// # Errors
    ///
    /// [`WalletError::InvalidInput`] if the scalar is not clamped.
    pub fn account_key(mut self, key: &[u8; EXTENDED_SECRET_KEY_SIZE]) -> Result<Self> {
        self.account_key = Some(ExtendedSecretKey::from_bytes(key)?);
        Ok(self)
    }

    /// Adds an imported UTXO key.
    ///
    /// # Errors
    ///
    /// [`WalletError::InvalidInput`] if the scalar is not clamped.
    pub fn utxo_key(mut self, key: &[u8; EXTENDED_SECRET_KEY_SIZE]) -> Result<Self> {
        self.utxo_keys.push(ExtendedSecretKey::from_bytes(key)?);
        Ok(self)
    }

    /// Derives all schemes and the account.
    ///
    /// # Process
    ///
    /// 1. Validate the configuration.
    /// 2. With a mnemonic: Daedalus (empty password only), Yoroi, account key.
    /// 3. With imported UTXO keys: free-key scheme.
    /// 4. An imported account key replaces the mnemonic-derived one.
    ///
    /// # Errors
    ///
    /// [`WalletError::ConfigError`] for an invalid configuration,
    /// [`WalletError::InvalidInput`] when no account key is available,
    /// or any derivation failure.
    pub fn build(self) -> Result<Wallet> {
        // 1. Configuration.
        self.config.validate()?;

        let mut schemes = Vec::new();
        let mut account = None;

        // 2. Mnemonic-derived material.
        if let Some(entropy) = &self.entropy {
            if self.password.is_empty() {
                schemes.push(DerivationScheme::Daedalus(DaedalusScheme::new(entropy)?));
            } else {
                tracing::debug!("password given, skipping the daedalus scheme");
            }
            schemes.push(DerivationScheme::Yoroi(YoroiScheme::new(
                entropy,
                &self.password,
                &self.config,
            )?));
            account = Some(AccountSecret::Seed(account_keypair(entropy, &self.password)?));
        }

        // 3. Free keys.
        let free_keys = self.utxo_keys.len();
        if free_keys > 0 {
            schemes.push(DerivationScheme::FreeKeys(FreeKeysScheme::new(self.utxo_keys)));
        }

        // 4. Imported account key.
        if let Some(key) = self.account_key {
            account = Some(AccountSecret::Extended(key));
        }

        let account = account.ok_or_else(|| WalletError::InvalidInput {
            reason: "no account key: give a mnemonic or an account key".into(),
        })?;
        let account = Account::new(account);

        tracing::info!(
            wallet = %account.id(),
            schemes = ?schemes.iter().map(DerivationScheme::name).collect::<Vec<_>>(),
            free_keys,
            "wallet recovered"
        );
        Ok(Wallet::from_parts(account, schemes, self.config))
    }
}
