//! Recovery configuration with sensible defaults.
//!
//! Every tunable of address discovery and conversion lives here. Each
//! value has a documented default and a validated range.

use serde::{Deserialize, Serialize};

use crate::{Result, WalletError};

/// Largest number of inputs a single transaction can encode (one byte).
pub const MAX_ENCODABLE_INPUTS: u8 = u8::MAX;

/// Upper bound for [`RecoveryConfig::yoroi_account_count`].
const MAX_YOROI_ACCOUNTS: u32 = 100;

/// Upper bound for [`RecoveryConfig::address_gap_limit`].
const MAX_GAP_LIMIT: u32 = 1000;

/// Tunables for wallet recovery and fund conversion.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    /// Number of hardened BIP44 accounts scanned for Yoroi-style wallets.
    pub yoroi_account_count: u32,

    /// Number of unused consecutive addresses generated past the highest
    /// used index on every sequential chain.
    pub address_gap_limit: u32,

    /// Cap on inputs per conversion transaction. The effective cap is the
    /// smaller of this and the snapshot's own limit.
    pub max_inputs_per_transaction: u8,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            yoroi_account_count: 1,
            address_gap_limit: 20,
            max_inputs_per_transaction: MAX_ENCODABLE_INPUTS,
        }
    }
}

impl RecoveryConfig {
    /// Validates all configuration values.
    ///
    /// Returns an error if any value is outside its acceptable range.
    pub fn validate(&self) -> Result<()> {
        if self.yoroi_account_count == 0 || self.yoroi_account_count > MAX_YOROI_ACCOUNTS {
            return Err(WalletError::ConfigError {
                reason: format!("yoroi_account_count must be 1..={MAX_YOROI_ACCOUNTS}"),
            });
        }

        if self.address_gap_limit == 0 || self.address_gap_limit > MAX_GAP_LIMIT {
            return Err(WalletError::ConfigError {
                reason: format!("address_gap_limit must be 1..={MAX_GAP_LIMIT}"),
            });
        }

        if self.max_inputs_per_transaction == 0 {
            return Err(WalletError::ConfigError {
                reason: "max_inputs_per_transaction must be greater than 0".into(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = RecoveryConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn default_values() {
        let config = RecoveryConfig::default();
        assert_eq!(config.yoroi_account_count, 1);
        assert_eq!(config.address_gap_limit, 20);
        assert_eq!(config.max_inputs_per_transaction, 255);
    }

    #[test]
    fn zero_accounts_rejected() {
        let config = RecoveryConfig {
            yoroi_account_count: 0,
            ..RecoveryConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn too_many_accounts_rejected() {
        let config = RecoveryConfig {
            yoroi_account_count: 101,
            ..RecoveryConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_gap_limit_rejected() {
        let config = RecoveryConfig {
            address_gap_limit: 0,
            ..RecoveryConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn huge_gap_limit_rejected() {
        let config = RecoveryConfig {
            address_gap_limit: 1001,
            ..RecoveryConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(WalletError::ConfigError { .. })
        ));
    }

    #[test]
    fn zero_max_inputs_rejected() {
        let config = RecoveryConfig {
            max_inputs_per_transaction: 0,
            ..RecoveryConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_fills_defaults() -> std::result::Result<(), serde_json::Error> {
        let config: RecoveryConfig = serde_json::from_str(r#"{ "address_gap_limit": 50 }"#)?;
        assert_eq!(config.address_gap_limit, 50);
        assert_eq!(config.yoroi_account_count, 1);
        assert_eq!(config.max_inputs_per_transaction, 255);
        Ok(())
    }
}
