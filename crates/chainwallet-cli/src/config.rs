//! Config file support.
//!
//! Example `chainwallet.json`:
//! ```json
//! {
//!   "recovery": {
//!     "yoroi_account_count": 2,
//!     "address_gap_limit": 50
//!   },
//!   "log_filter": "chainwallet_wallet=debug"
//! }
//! ```
//!
//! Every field is optional; missing recovery values take their defaults.

use std::path::Path;

use chainwallet_types::config::RecoveryConfig;
use serde::{Deserialize, Serialize};

/// JSON config file format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    pub recovery: Option<RecoveryConfig>,
    pub log_filter: Option<String>,
}

impl CliConfig {
    /// Loads and validates a config file.
    pub fn load(path: &Path) -> Result<Self, String> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read config file: {e}"))?;
        Self::parse(&text)
    }

    fn parse(text: &str) -> Result<Self, String> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| format!("invalid config JSON: {e}"))?;
        if let Some(recovery) = &config.recovery {
            recovery.validate().map_err(|e| e.to_string())?;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_default() -> Result<(), String> {
        let config = CliConfig::parse("{}")?;
        assert!(config.recovery.is_none());
        assert!(config.log_filter.is_none());
        Ok(())
    }

    #[test]
    fn partial_recovery_keeps_defaults() -> Result<(), String> {
        let config = CliConfig::parse(r#"{ "recovery": { "address_gap_limit": 50 } }"#)?;
        let recovery = config.recovery.unwrap_or_default();
        assert_eq!(recovery.address_gap_limit, 50);
        assert_eq!(
            recovery.yoroi_account_count,
            RecoveryConfig::default().yoroi_account_count
        );
        Ok(())
    }

    #[test]
    fn out_of_range_recovery_rejected() {
        let err = CliConfig::parse(r#"{ "recovery": { "address_gap_limit": 0 } }"#);
        assert!(err.is_err_and(|e| e.contains("address_gap_limit")));
    }

    #[test]
    fn malformed_json_rejected() {
        assert!(CliConfig::parse("{ recovery").is_err());
    }

    #[test]
    fn missing_file_reported() {
        let err = CliConfig::load(Path::new("/nonexistent/chainwallet.json"));
        assert!(err.is_err_and(|e| e.starts_with("failed to read config file")));
    }
}
