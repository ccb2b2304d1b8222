//! Network parameters read from the initial fragment of block0.

use chainwallet_types::config::MAX_ENCODABLE_INPUTS;
use chainwallet_types::{Block0Date, Discrimination, Result, Value, WalletError};
use serde::Serialize;

use crate::block::BlockId;
use crate::fragment::ConfigParam;

// ---------------------------------------------------------------------------
// LinearFee
// ---------------------------------------------------------------------------

/// Linear fee schedule.
///
/// `fee = constant + coefficient × (inputs + outputs) + certificate fee`
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct LinearFee {
    /// Flat part of every fee.
    pub constant: u64,
    /// Cost of each input and each output.
    pub coefficient: u64,
    /// Default certificate cost.
    pub certificate: u64,
    /// Cost of a vote-cast certificate, when the network sets one.
    pub per_vote_cast: Option<u64>,
}

impl LinearFee {
    /// Fee of a transaction with the given shape. Saturates instead of
    /// overflowing.
    pub fn calculate(&self, inputs: usize, outputs: usize, with_vote_cast: bool) -> Value {
        let count = (inputs as u64).saturating_add(outputs as u64);
        let mut fee = self
            .constant
            .saturating_add(self.coefficient.saturating_mul(count));
        if with_vote_cast {
            fee = fee.saturating_add(self.vote_cast_fee());
        }
        Value::new(fee)
    }

    /// Certificate fee charged for a vote cast: the per-vote fee when it
    /// is non-zero, otherwise the generic certificate fee.
    pub fn vote_cast_fee(&self) -> u64 {
        match self.per_vote_cast {
            Some(fee) if fee != 0 => fee,
            _ => self.certificate,
        }
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Immutable snapshot of the network parameters.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Settings {
    /// Network tag for addresses.
    pub discrimination: Discrimination,
    /// Hash of the block0 header; every witness commits to it.
    pub block0_hash: BlockId,
    /// Genesis time.
    pub block0_date: Block0Date,
    /// Fee schedule.
    pub fees: LinearFee,
    /// Most inputs one transaction may carry.
    pub max_inputs_per_transaction: u8,
}

impl Settings {
    /// Builds the settings from the parameters of the initial fragment.
    ///
    /// `header_date` is used when the parameters carry no date.
    ///
    /// # Errors
    ///
    /// [`WalletError::MalformedBlock`] if the discrimination or the
    /// linear fee is missing, or a parameter appears twice.
    pub fn from_params(
        block0_hash: BlockId,
        header_date: Block0Date,
        params: &[ConfigParam],
    ) -> Result<Self> {
        let mut discrimination = None;
        let mut block0_date = None;
        let mut fee = None;
        let mut per_vote_cast = None;
        let mut max_inputs = None;

        for param in params {
            let duplicate = match param {
                ConfigParam::Discrimination(d) => discrimination.replace(*d).is_some(),
                ConfigParam::Block0Date(d) => block0_date.replace(*d).is_some(),
                ConfigParam::LinearFee {
                    constant,
                    coefficient,
                    certificate,
                } => fee
                    .replace((*constant, *coefficient, *certificate))
                    .is_some(),
                ConfigParam::PerVoteCertificateFees { vote_cast, .. } => {
                    per_vote_cast.replace(*vote_cast).is_some()
                }
                ConfigParam::MaxInputsPerTransaction(n) => max_inputs.replace(*n).is_some(),
            };
            if duplicate {
                return Err(WalletError::MalformedBlock {
                    reason: format!("initial fragment: duplicate parameter {}", param.name()),
                });
            }
        }

        let discrimination = discrimination.ok_or_else(|| WalletError::MalformedBlock {
            reason: "initial fragment: missing discrimination".into(),
        })?;
        let (constant, coefficient, certificate) =
            fee.ok_or_else(|| WalletError::MalformedBlock {
                reason: "initial fragment: missing linear fee".into(),
            })?;

        Ok(Self {
            discrimination,
            block0_hash,
            block0_date: block0_date.unwrap_or(header_date),
            fees: LinearFee {
                constant,
                coefficient,
                certificate,
                per_vote_cast,
            },
            max_inputs_per_transaction: max_inputs.unwrap_or(MAX_ENCODABLE_INPUTS),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fee() -> LinearFee {
        LinearFee {
            constant: 155_381,
            coefficient: 43_946,
            certificate: 4,
            per_vote_cast: None,
        }
    }

    #[test]
    fn linear_fee_formula() {
        assert_eq!(fee().calculate(1, 1, false), Value::new(155_381 + 2 * 43_946));
        assert_eq!(fee().calculate(1, 0, true), Value::new(155_381 + 43_946 + 4));
    }

    #[test]
    fn per_vote_fee_overrides_certificate() {
        let mut fees = fee();
        fees.per_vote_cast = Some(0);
        assert_eq!(fees.vote_cast_fee(), 4);
        fees.per_vote_cast = Some(9);
        assert_eq!(fees.vote_cast_fee(), 9);
    }

    #[test]
    fn fee_saturates() {
        let fees = LinearFee {
            constant: u64::MAX,
            coefficient: u64::MAX,
            certificate: 0,
            per_vote_cast: None,
        };
        assert_eq!(fees.calculate(3, 3, false), Value::new(u64::MAX));
    }

    #[test]
    fn missing_fee_rejected() {
        let params = [ConfigParam::Discrimination(Discrimination::Test)];
        assert!(matches!(
            Settings::from_params(BlockId::new([0; 32]), Block0Date::from_secs(0), &params),
            Err(WalletError::MalformedBlock { .. })
        ));
    }

    #[test]
    fn defaults_applied() -> std::result::Result<(), WalletError> {
        let params = [
            ConfigParam::Discrimination(Discrimination::Production),
            ConfigParam::LinearFee {
                constant: 1,
                coefficient: 2,
                certificate: 3,
            },
        ];
        let settings =
            Settings::from_params(BlockId::new([0; 32]), Block0Date::from_secs(77), &params)?;
        assert_eq!(settings.block0_date, Block0Date::from_secs(77));
        assert_eq!(settings.max_inputs_per_transaction, 255);
        assert_eq!(settings.fees.per_vote_cast, None);
        Ok(())
    }
}
