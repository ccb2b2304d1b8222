//! Fragments: the unit of content inside a block.
//!
//! | tag | fragment             | body                                   |
//! |-----|----------------------|----------------------------------------|
//! | 0   | `Initial`            | `[[param_tag, value]...]`              |
//! | 1   | `OldUtxoDeclaration` | `[[legacy_address_bytes, value]...]`   |
//! | 2   | `Transaction`        | transaction                            |
//! | 11  | `VoteCast`           | transaction carrying a vote certificate |
//!
//! A fragment is encoded as `[tag, body]`; its id is the BLAKE2b-256 of
//! that encoding.

use chainwallet_crypto::hash::blake2b_256;
use chainwallet_types::{Block0Date, Discrimination, FragmentId, Result, Value, WalletError};
use ciborium::Value as Cbor;

use crate::address::LegacyAddress;
use crate::cbor;
use crate::transaction::{Transaction, MAX_OUTPUTS};

const TAG_INITIAL: u64 = 0;
const TAG_OLD_UTXO_DECLARATION: u64 = 1;
const TAG_TRANSACTION: u64 = 2;
const TAG_VOTE_CAST: u64 = 11;

const PARAM_DISCRIMINATION: u64 = 1;
const PARAM_BLOCK0_DATE: u64 = 2;
const PARAM_LINEAR_FEE: u64 = 3;
const PARAM_PER_VOTE_FEES: u64 = 4;
const PARAM_MAX_INPUTS: u64 = 5;

// ---------------------------------------------------------------------------
// ConfigParam
// ---------------------------------------------------------------------------

/// One entry of the initial fragment.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConfigParam {
    /// Network tag.
    Discrimination(Discrimination),
    /// Genesis time.
    Block0Date(Block0Date),
    /// Linear fee schedule.
    LinearFee {
        constant: u64,
        coefficient: u64,
        certificate: u64,
    },
    /// Certificate fees specific to voting.
    PerVoteCertificateFees { vote_plan: u64, vote_cast: u64 },
    /// Transaction input limit.
    MaxInputsPerTransaction(u8),
}

impl ConfigParam {
    /// Short name used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Discrimination(_) => "discrimination",
            Self::Block0Date(_) => "block0_date",
            Self::LinearFee { .. } => "linear_fee",
            Self::PerVoteCertificateFees { .. } => "per_vote_certificate_fees",
            Self::MaxInputsPerTransaction(_) => "max_inputs_per_transaction",
        }
    }

    fn to_cbor(self) -> Cbor {
        let (tag, value) = match self {
            Self::Discrimination(d) => (
                PARAM_DISCRIMINATION,
                cbor::uint(match d {
                    Discrimination::Production => 0,
                    Discrimination::Test => 1,
                }),
            ),
            Self::Block0Date(date) => (PARAM_BLOCK0_DATE, cbor::uint(date.as_secs())),
            Self::LinearFee {
                constant,
                coefficient,
                certificate,
            } => (
                PARAM_LINEAR_FEE,
                Cbor::Array(vec![
                    cbor::uint(constant),
                    cbor::uint(coefficient),
                    cbor::uint(certificate),
                ]),
            ),
            Self::PerVoteCertificateFees {
                vote_plan,
                vote_cast,
            } => (
                PARAM_PER_VOTE_FEES,
                Cbor::Array(vec![cbor::uint(vote_plan), cbor::uint(vote_cast)]),
            ),
            Self::MaxInputsPerTransaction(n) => (PARAM_MAX_INPUTS, cbor::uint(u64::from(n))),
        };
        Cbor::Array(vec![cbor::uint(tag), value])
    }

    /// Decodes one parameter; `None` for tags this crate does not know.
    fn from_cbor(value: Cbor) -> Result<Option<Self>> {
        let mut items = cbor::array_of(value, 2, "config param")?;
        let tag: u64 = cbor::int(&items[0], "config param tag")?;
        let body = items.swap_remove(1);

        let param = match tag {
            PARAM_DISCRIMINATION => match cbor::int::<u8>(&body, "discrimination")? {
                0 => Self::Discrimination(Discrimination::Production),
                1 => Self::Discrimination(Discrimination::Test),
                other => {
                    return Err(WalletError::MalformedBlock {
                        reason: format!("discrimination: unknown value {other}"),
                    })
                }
            },
            PARAM_BLOCK0_DATE => {
                Self::Block0Date(Block0Date::from_secs(cbor::int(&body, "block0 date")?))
            }
            PARAM_LINEAR_FEE => {
                let fee = cbor::array_of(body, 3, "linear fee")?;
                Self::LinearFee {
                    constant: cbor::int(&fee[0], "fee constant")?,
                    coefficient: cbor::int(&fee[1], "fee coefficient")?,
                    certificate: cbor::int(&fee[2], "fee certificate")?,
                }
            }
            PARAM_PER_VOTE_FEES => {
                let fees = cbor::array_of(body, 2, "per vote certificate fees")?;
                Self::PerVoteCertificateFees {
                    vote_plan: cbor::int(&fees[0], "vote plan fee")?,
                    vote_cast: cbor::int(&fees[1], "vote cast fee")?,
                }
            }
            PARAM_MAX_INPUTS => {
                let n: u8 = cbor::int(&body, "max inputs per transaction")?;
                if n == 0 {
                    return Err(WalletError::MalformedBlock {
                        reason: "max inputs per transaction must be at least 1".into(),
                    });
                }
                Self::MaxInputsPerTransaction(n)
            }
            other => {
                tracing::debug!(tag = other, "skipping unknown config parameter");
                return Ok(None);
            }
        };
        Ok(Some(param))
    }
}

// ---------------------------------------------------------------------------
// Fragment
// ---------------------------------------------------------------------------

/// Decoded fragment.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Fragment {
    /// Network parameters; first fragment of block0.
    Initial(Vec<ConfigParam>),
    /// Balances of legacy addresses carried over at genesis.
    OldUtxoDeclaration(Vec<(LegacyAddress, Value)>),
    /// Value transfer.
    Transaction(Transaction),
    /// Account-signed transaction with a vote-cast certificate.
    VoteCast(Transaction),
    /// Fragment kind this crate does not interpret.
    Unsupported(u64),
}

impl Fragment {
    /// Encodes the fragment as `[tag, body]`.
    ///
    /// # Errors
    ///
    /// [`WalletError::TransactionError`] for [`Fragment::Unsupported`],
    /// which has no body to encode, or for a `VoteCast` without its
    /// certificate.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let (tag, body) = match self {
            Self::Initial(params) => (
                TAG_INITIAL,
                Cbor::Array(params.iter().map(|p| p.to_cbor()).collect()),
            ),
            Self::OldUtxoDeclaration(entries) => {
                if entries.len() > MAX_OUTPUTS {
                    return Err(WalletError::TransactionError {
                        reason: format!("{} declarations exceed {MAX_OUTPUTS}", entries.len()),
                    });
                }
                (
                    TAG_OLD_UTXO_DECLARATION,
                    Cbor::Array(
                        entries
                            .iter()
                            .map(|(address, value)| {
                                Cbor::Array(vec![
                                    Cbor::Bytes(address.as_bytes().to_vec()),
                                    cbor::uint(value.as_u64()),
                                ])
                            })
                            .collect(),
                    ),
                )
            }
            Self::Transaction(tx) => (TAG_TRANSACTION, tx.to_cbor()),
            Self::VoteCast(tx) => {
                if tx.vote_cast().is_none() {
                    return Err(WalletError::TransactionError {
                        reason: "vote-cast fragment without certificate".into(),
                    });
                }
                (TAG_VOTE_CAST, tx.to_cbor())
            }
            Self::Unsupported(tag) => {
                return Err(WalletError::TransactionError {
                    reason: format!("cannot encode unsupported fragment tag {tag}"),
                })
            }
        };
        cbor::encode(&Cbor::Array(vec![cbor::uint(tag), body]))
    }

    /// Decodes a fragment.
    ///
    /// # Errors
    ///
    /// [`WalletError::MalformedBlock`] on any structural problem,
    /// including more than 256 outputs.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut items = cbor::array_of(cbor::decode(bytes, "fragment")?, 2, "fragment")?;
        let tag: u64 = cbor::int(&items[0], "fragment tag")?;
        let body = items.swap_remove(1);

        match tag {
            TAG_INITIAL => {
                let mut params = Vec::new();
                for entry in cbor::array(body, "initial fragment")? {
                    if let Some(param) = ConfigParam::from_cbor(entry)? {
                        params.push(param);
                    }
                }
                Ok(Self::Initial(params))
            }
            TAG_OLD_UTXO_DECLARATION => {
                let entries = cbor::array(body, "old utxo declaration")?;
                if entries.len() > MAX_OUTPUTS {
                    return Err(WalletError::MalformedBlock {
                        reason: format!(
                            "old utxo declaration: {} outputs exceed {MAX_OUTPUTS}",
                            entries.len()
                        ),
                    });
                }
                let decoded = entries
                    .into_iter()
                    .map(|entry| {
                        let mut pair = cbor::array_of(entry, 2, "old utxo entry")?;
                        let value = Value::new(cbor::int(&pair[1], "old utxo value")?);
                        let raw = cbor::bytes(pair.swap_remove(0), "old utxo address")?;
                        Ok((LegacyAddress::from_bytes(&raw)?, value))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(Self::OldUtxoDeclaration(decoded))
            }
            TAG_TRANSACTION => Ok(Self::Transaction(Transaction::from_cbor(body)?)),
            TAG_VOTE_CAST => {
                let tx = Transaction::from_cbor(body)?;
                if tx.vote_cast().is_none() {
                    return Err(WalletError::MalformedBlock {
                        reason: "vote-cast fragment without certificate".into(),
                    });
                }
                Ok(Self::VoteCast(tx))
            }
            other => {
                tracing::debug!(tag = other, "unsupported fragment tag");
                Ok(Self::Unsupported(other))
            }
        }
    }
}

/// Id of an encoded fragment.
pub fn fragment_id(bytes: &[u8]) -> FragmentId {
    FragmentId::new(blake2b_256(bytes))
}
