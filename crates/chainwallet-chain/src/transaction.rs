//! Transactions: inputs, outputs, witnesses and the vote-cast certificate.
//!
//! # Encoding
//!
//! ```text
//! transaction = [inputs, outputs, certificate / null, witnesses]
//! input       = [0, fragment_id, output_index, value]      ; utxo
//!             / [1, account_key, value]                    ; account
//! output      = [address (33 bytes), value]
//! certificate = [vote_plan, proposal_index, [1, choice]]  ; public vote cast
//! witness     = [0, xpub, signature]                       ; legacy utxo
//!             / [1, signature]                             ; utxo
//!             / [2, signature]                             ; account
//! ```
//!
//! The sign-data hash is `BLAKE2b-256(CBOR [inputs, outputs, certificate])`.
//! UTXO witnesses sign `block0_hash || sign_data_hash`; account witnesses
//! additionally append the big-endian spending counter.

use chainwallet_crypto::hash::blake2b_256;
use chainwallet_crypto::signing::{PublicKey, Signature};
use chainwallet_crypto::xprv::XPub;
use chainwallet_types::{
    FragmentId, PayloadType, Result, SpendingCounter, Value, VotePlanId, WalletError,
};
use ciborium::Value as Cbor;

use crate::address::Address;
use crate::block::BlockId;
use crate::cbor;
use crate::settings::Settings;

/// Most inputs a transaction can encode.
pub const MAX_INPUTS: usize = 255;

/// Most outputs a transaction can encode (output indices are one byte).
pub const MAX_OUTPUTS: usize = 256;

// ---------------------------------------------------------------------------
// Inputs and outputs
// ---------------------------------------------------------------------------

/// Reference to one output of a fragment.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct UtxoPointer {
    /// Fragment that created the output.
    pub fragment_id: FragmentId,
    /// Position of the output in that fragment.
    pub output_index: u8,
    /// Value held by the output.
    pub value: Value,
}

/// Transaction input.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Input {
    /// Spends an unspent output.
    Utxo(UtxoPointer),
    /// Debits an account.
    Account {
        /// Account key.
        account: PublicKey,
        /// Amount debited.
        value: Value,
    },
}

impl Input {
    /// Value contributed by this input.
    pub fn value(&self) -> Value {
        match self {
            Self::Utxo(pointer) => pointer.value,
            Self::Account { value, .. } => *value,
        }
    }

    fn to_cbor(&self) -> Cbor {
        match self {
            Self::Utxo(p) => Cbor::Array(vec![
                cbor::uint(0),
                Cbor::Bytes(p.fragment_id.as_bytes().to_vec()),
                cbor::uint(u64::from(p.output_index)),
                cbor::uint(p.value.as_u64()),
            ]),
            Self::Account { account, value } => Cbor::Array(vec![
                cbor::uint(1),
                Cbor::Bytes(account.as_bytes().to_vec()),
                cbor::uint(value.as_u64()),
            ]),
        }
    }

    fn from_cbor(value: Cbor) -> Result<Self> {
        let items = cbor::array(value, "input")?;
        let tag = items
            .first()
            .map(|t| cbor::int::<u8>(t, "input tag"))
            .transpose()?;
        let mut items = items.into_iter().skip(1);
        let mut next = |what: &str| {
            items.next().ok_or_else(|| WalletError::MalformedBlock {
                reason: format!("input: missing {what}"),
            })
        };
        match tag {
            Some(0) => {
                let fragment_id =
                    FragmentId::new(cbor::fixed_bytes(next("fragment id")?, "input fragment id")?);
                let output_index = cbor::int(&next("output index")?, "input output index")?;
                let value = Value::new(cbor::int(&next("value")?, "input value")?);
                Ok(Self::Utxo(UtxoPointer {
                    fragment_id,
                    output_index,
                    value,
                }))
            }
            Some(1) => {
                let account =
                    PublicKey::from_bytes(cbor::fixed_bytes(next("account")?, "input account")?);
                let value = Value::new(cbor::int(&next("value")?, "input value")?);
                Ok(Self::Account { account, value })
            }
            other => Err(WalletError::MalformedBlock {
                reason: format!("input: unknown tag {other:?}"),
            }),
        }
    }
}

/// Transaction output.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Output {
    /// Receiving address.
    pub address: Address,
    /// Amount paid.
    pub value: Value,
}

impl Output {
    pub(crate) fn to_cbor(&self) -> Cbor {
        Cbor::Array(vec![
            Cbor::Bytes(self.address.to_bytes().to_vec()),
            cbor::uint(self.value.as_u64()),
        ])
    }

    pub(crate) fn from_cbor(value: Cbor) -> Result<Self> {
        let mut items = cbor::array_of(value, 2, "output")?;
        let amount = Value::new(cbor::int(&items[1], "output value")?);
        let address = Address::from_bytes(&cbor::bytes(items.swap_remove(0), "output address")?)?;
        Ok(Self {
            address,
            value: amount,
        })
    }
}

// ---------------------------------------------------------------------------
// Vote cast
// ---------------------------------------------------------------------------

/// Vote payload. Only public votes exist.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VotePayload {
    /// Choice visible on chain.
    Public {
        /// Selected option.
        choice: u8,
    },
}

impl VotePayload {
    /// Payload type tag.
    pub fn payload_type(&self) -> PayloadType {
        match self {
            Self::Public { .. } => PayloadType::Public,
        }
    }
}

/// Certificate casting one vote on one proposal.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct VoteCast {
    /// Vote plan the proposal belongs to.
    pub vote_plan: VotePlanId,
    /// Proposal position inside the plan.
    pub proposal_index: u8,
    /// The vote.
    pub payload: VotePayload,
}

impl VoteCast {
    fn to_cbor(&self) -> Cbor {
        let payload = match self.payload {
            VotePayload::Public { choice } => Cbor::Array(vec![
                cbor::uint(PayloadType::Public as u64),
                cbor::uint(u64::from(choice)),
            ]),
        };
        Cbor::Array(vec![
            Cbor::Bytes(self.vote_plan.as_bytes().to_vec()),
            cbor::uint(u64::from(self.proposal_index)),
            payload,
        ])
    }

    fn from_cbor(value: Cbor) -> Result<Self> {
        let mut items = cbor::array_of(value, 3, "vote cast")?;
        let payload_items = cbor::array_of(items.swap_remove(2), 2, "vote payload")?;
        let proposal_index = cbor::int(&items[1], "proposal index")?;
        let vote_plan = VotePlanId::new(cbor::fixed_bytes(items.swap_remove(0), "vote plan")?);

        let raw_type: u8 = cbor::int(&payload_items[0], "payload type")?;
        let payload = match PayloadType::try_from(raw_type) {
            Ok(PayloadType::Public) => VotePayload::Public {
                choice: cbor::int(&payload_items[1], "vote choice")?,
            },
            Err(e) => {
                return Err(WalletError::MalformedBlock {
                    reason: e.reason().to_string(),
                })
            }
        };
        Ok(Self {
            vote_plan,
            proposal_index,
            payload,
        })
    }
}

// ---------------------------------------------------------------------------
// Witnesses
// ---------------------------------------------------------------------------

/// Proof that the owner of an input authorized the transaction.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Witness {
    /// Legacy output: the extended public key is revealed with the signature.
    OldUtxo {
        /// Key the legacy address was built from.
        xpub: XPub,
        /// Signature over the UTXO witness message.
        signature: Signature,
    },
    /// Native single-address output.
    Utxo(Signature),
    /// Account input.
    Account(Signature),
}

impl Witness {
    /// The signature carried by this witness.
    pub fn signature(&self) -> &Signature {
        match self {
            Self::OldUtxo { signature, .. } => signature,
            Self::Utxo(signature) | Self::Account(signature) => signature,
        }
    }

    fn to_cbor(&self) -> Cbor {
        match self {
            Self::OldUtxo { xpub, signature } => Cbor::Array(vec![
                cbor::uint(0),
                Cbor::Bytes(xpub.as_bytes().to_vec()),
                Cbor::Bytes(signature.as_bytes().to_vec()),
            ]),
            Self::Utxo(signature) => Cbor::Array(vec![
                cbor::uint(1),
                Cbor::Bytes(signature.as_bytes().to_vec()),
            ]),
            Self::Account(signature) => Cbor::Array(vec![
                cbor::uint(2),
                Cbor::Bytes(signature.as_bytes().to_vec()),
            ]),
        }
    }

    fn from_cbor(value: Cbor) -> Result<Self> {
        let mut items = cbor::array(value, "witness")?;
        let tag = match items.first() {
            Some(t) => cbor::int::<u8>(t, "witness tag")?,
            None => {
                return Err(WalletError::MalformedBlock {
                    reason: "witness: empty".into(),
                })
            }
        };
        match (tag, items.len()) {
            (0, 3) => {
                let signature = cbor::fixed_bytes(items.swap_remove(2), "witness signature")?;
                let xpub = cbor::fixed_bytes(items.swap_remove(1), "witness xpub")?;
                let (signature, xpub) = (Signature::from_bytes(signature), XPub::from_bytes(xpub));
                Ok(Self::OldUtxo { xpub, signature })
            }
            (1, 2) | (2, 2) => {
                let signature = cbor::fixed_bytes(items.swap_remove(1), "witness signature")?;
                let signature = Signature::from_bytes(signature);
                if tag == 1 {
                    Ok(Self::Utxo(signature))
                } else {
                    Ok(Self::Account(signature))
                }
            }
            (tag, len) => Err(WalletError::MalformedBlock {
                reason: format!("witness: unknown shape (tag {tag}, {len} items)"),
            }),
        }
    }
}

/// Message signed by UTXO witnesses.
pub fn utxo_witness_message(block0_hash: &BlockId, sign_data_hash: &[u8; 32]) -> Vec<u8> {
    let mut message = Vec::with_capacity(64);
    message.extend_from_slice(block0_hash.as_bytes());
    message.extend_from_slice(sign_data_hash);
    message
}

/// Message signed by account witnesses.
pub fn account_witness_message(
    block0_hash: &BlockId,
    sign_data_hash: &[u8; 32],
    counter: SpendingCounter,
) -> Vec<u8> {
    let mut message = utxo_witness_message(block0_hash, sign_data_hash);
    message.extend_from_slice(&counter.to_be_bytes());
    message
}

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// A sealed transaction.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Transaction {
    inputs: Vec<Input>,
    outputs: Vec<Output>,
    vote_cast: Option<VoteCast>,
    witnesses: Vec<Witness>,
}

impl Transaction {
    /// Inputs in signing order.
    pub fn inputs(&self) -> &[Input] {
        &self.inputs
    }

    /// Outputs in index order.
    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    /// Vote-cast certificate, if any.
    pub fn vote_cast(&self) -> Option<&VoteCast> {
        self.vote_cast.as_ref()
    }

    /// One witness per input, same order.
    pub fn witnesses(&self) -> &[Witness] {
        &self.witnesses
    }

    /// Hash every witness signs over.
    pub fn sign_data_hash(&self) -> Result<[u8; 32]> {
        sign_data_hash(&self.inputs, &self.outputs, self.vote_cast.as_ref())
    }

    /// Sum of the input values.
    pub fn total_input(&self) -> Result<Value> {
        Value::checked_sum(self.inputs.iter().map(Input::value))
    }

    /// Sum of the output values.
    pub fn total_output(&self) -> Result<Value> {
        Value::checked_sum(self.outputs.iter().map(|o| o.value))
    }

    pub(crate) fn to_cbor(&self) -> Cbor {
        let mut items = body_cbor(&self.inputs, &self.outputs, self.vote_cast.as_ref());
        items.push(Cbor::Array(self.witnesses.iter().map(Witness::to_cbor).collect()));
        Cbor::Array(items)
    }

    pub(crate) fn from_cbor(value: Cbor) -> Result<Self> {
        let mut items = cbor::array_of(value, 4, "transaction")?.into_iter();
        let mut next = || {
            items.next().ok_or_else(|| WalletError::MalformedBlock {
                reason: "transaction: truncated".into(),
            })
        };

        let inputs = cbor::array(next()?, "transaction inputs")?
            .into_iter()
            .map(Input::from_cbor)
            .collect::<Result<Vec<_>>>()?;
        let outputs = cbor::array(next()?, "transaction outputs")?
            .into_iter()
            .map(Output::from_cbor)
            .collect::<Result<Vec<_>>>()?;
        let vote_cast = match next()? {
            Cbor::Null => None,
            other => Some(VoteCast::from_cbor(other)?),
        };
        let witnesses = cbor::array(next()?, "transaction witnesses")?
            .into_iter()
            .map(Witness::from_cbor)
            .collect::<Result<Vec<_>>>()?;

        if inputs.len() > MAX_INPUTS || outputs.len() > MAX_OUTPUTS {
            return Err(WalletError::MalformedBlock {
                reason: format!(
                    "transaction: {} inputs / {} outputs exceeds the encodable maximum",
                    inputs.len(),
                    outputs.len()
                ),
            });
        }
        if witnesses.len() != inputs.len() {
            return Err(WalletError::MalformedBlock {
                reason: format!(
                    "transaction: {} witnesses for {} inputs",
                    witnesses.len(),
                    inputs.len()
                ),
            });
        }

        Ok(Self {
            inputs,
            outputs,
            vote_cast,
            witnesses,
        })
    }
}

fn body_cbor(inputs: &[Input], outputs: &[Output], vote_cast: Option<&VoteCast>) -> Vec<Cbor> {
    vec![
        Cbor::Array(inputs.iter().map(Input::to_cbor).collect()),
        Cbor::Array(outputs.iter().map(Output::to_cbor).collect()),
        vote_cast.map(VoteCast::to_cbor).unwrap_or(Cbor::Null),
    ]
}

fn sign_data_hash(
    inputs: &[Input],
    outputs: &[Output],
    vote_cast: Option<&VoteCast>,
) -> Result<[u8; 32]> {
    let body = cbor::encode(&Cbor::Array(body_cbor(inputs, outputs, vote_cast)))?;
    Ok(blake2b_256(&body))
}

// ---------------------------------------------------------------------------
// TransactionBuilder
// ---------------------------------------------------------------------------

/// Assembles a balanced transaction under the fee rules of `settings`.
///
/// Typical flow: add inputs and outputs, compute
/// [`sign_data_hash`](Self::sign_data_hash), sign one witness per input,
/// then [`seal`](Self::seal).
pub struct TransactionBuilder<'a> {
    settings: &'a Settings,
    inputs: Vec<Input>,
    outputs: Vec<Output>,
    vote_cast: Option<VoteCast>,
}

impl<'a> TransactionBuilder<'a> {
    /// Starts an empty transaction.
    pub fn new(settings: &'a Settings) -> Self {
        Self {
            settings,
            inputs: Vec::new(),
            outputs: Vec::new(),
            vote_cast: None,
        }
    }

    /// Appends an input.
    pub fn add_input(&mut self, input: Input) -> &mut Self {
        self.inputs.push(input);
        self
    }

    /// Appends an output.
    pub fn add_output(&mut self, output: Output) -> &mut Self {
        self.outputs.push(output);
        self
    }

    /// Attaches a vote-cast certificate.
    pub fn set_vote_cast(&mut self, vote_cast: VoteCast) -> &mut Self {
        self.vote_cast = Some(vote_cast);
        self
    }

    /// Inputs added so far.
    pub fn inputs(&self) -> &[Input] {
        &self.inputs
    }

    /// Fee for the current shape of the transaction.
    pub fn estimate_fee(&self) -> Value {
        self.settings.fees.calculate(
            self.inputs.len(),
            self.outputs.len(),
            self.vote_cast.is_some(),
        )
    }

    /// Hash the witnesses must sign over.
    pub fn sign_data_hash(&self) -> Result<[u8; 32]> {
        sign_data_hash(&self.inputs, &self.outputs, self.vote_cast.as_ref())
    }

    /// Checks balance and attaches the witnesses.
    ///
    /// # Errors
    ///
    /// [`WalletError::TransactionError`] if the input or output count is
    /// out of range, the witness count differs from the input count, or
    /// inputs do not equal outputs plus fee.
    pub fn seal(self, witnesses: Vec<Witness>) -> Result<Transaction> {
        let max_inputs = usize::from(self.settings.max_inputs_per_transaction).min(MAX_INPUTS);
        if self.inputs.is_empty() || self.inputs.len() > max_inputs {
            return Err(WalletError::TransactionError {
                reason: format!("input count {} outside 1..={max_inputs}", self.inputs.len()),
            });
        }
        if self.outputs.len() > MAX_OUTPUTS {
            return Err(WalletError::TransactionError {
                reason: format!("output count {} exceeds {MAX_OUTPUTS}", self.outputs.len()),
            });
        }
        if witnesses.len() != self.inputs.len() {
            return Err(WalletError::TransactionError {
                reason: format!(
                    "{} witnesses for {} inputs",
                    witnesses.len(),
                    self.inputs.len()
                ),
            });
        }

        let fee = self.estimate_fee();
        let total_in = Value::checked_sum(self.inputs.iter().map(Input::value))?;
        let total_out = Value::checked_sum(self.outputs.iter().map(|o| o.value))?;
        let required = total_out
            .checked_add(fee)
            .ok_or_else(|| WalletError::TransactionError {
                reason: "value overflow while adding the fee".into(),
            })?;
        if total_in != required {
            return Err(WalletError::TransactionError {
                reason: format!(
                    "unbalanced transaction: inputs {total_in}, outputs {total_out}, fee {fee}"
                ),
            });
        }

        Ok(Transaction {
            inputs: self.inputs,
            outputs: self.outputs,
            vote_cast: self.vote_cast,
            witnesses,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::LinearFee;
    use chainwallet_crypto::signing::{verify, Keypair};
    use chainwallet_types::{Block0Date, Discrimination};

    fn settings() -> Settings {
        Settings {
            discrimination: Discrimination::Test,
            block0_hash: BlockId::new([5; 32]),
            block0_date: Block0Date::from_secs(0),
            fees: LinearFee {
                constant: 10,
                coefficient: 2,
                certificate: 3,
                per_vote_cast: None,
            },
            max_inputs_per_transaction: 255,
        }
    }

    fn pointer(value: u64) -> UtxoPointer {
        UtxoPointer {
            fragment_id: FragmentId::new([1; 32]),
            output_index: 0,
            value: Value::new(value),
        }
    }

    #[test]
    fn balanced_transaction_seals() -> std::result::Result<(), WalletError> {
        let settings = settings();
        let key = Keypair::from_seed(&[3; 32]);
        let mut builder = TransactionBuilder::new(&settings);
        builder
            .add_input(Input::Utxo(pointer(100)))
            .add_output(Output {
                address: Address::account(Discrimination::Test, key.public_key()),
                value: Value::new(86),
            });
        assert_eq!(builder.estimate_fee(), Value::new(14));

        let hash = builder.sign_data_hash()?;
        let message = utxo_witness_message(&settings.block0_hash, &hash);
        let tx = builder.seal(vec![Witness::Utxo(key.sign(&message))])?;

        let decoded = Transaction::from_cbor(tx.to_cbor())?;
        assert_eq!(decoded, tx);
        assert_eq!(decoded.sign_data_hash()?, hash);
        verify(&key.public_key(), &message, decoded.witnesses()[0].signature())?;
        Ok(())
    }

    #[test]
    fn unbalanced_transaction_rejected() {
        let settings = settings();
        let mut builder = TransactionBuilder::new(&settings);
        builder.add_input(Input::Utxo(pointer(100))).add_output(Output {
            address: Address::single(Discrimination::Test, PublicKey::from_bytes([1; 32])),
            value: Value::new(100),
        });
        let witness = Witness::Utxo(Signature::from_bytes([0; 64]));
        assert!(matches!(
            builder.seal(vec![witness]),
            Err(WalletError::TransactionError { .. })
        ));
    }

    #[test]
    fn witness_count_must_match_inputs() {
        let settings = settings();
        let mut builder = TransactionBuilder::new(&settings);
        builder.add_input(Input::Utxo(pointer(14)));
        assert!(matches!(
            builder.seal(Vec::new()),
            Err(WalletError::TransactionError { .. })
        ));
    }

    #[test]
    fn vote_cast_changes_sign_data() -> std::result::Result<(), WalletError> {
        let settings = settings();
        let account = PublicKey::from_bytes([8; 32]);
        let mut plain = TransactionBuilder::new(&settings);
        plain.add_input(Input::Account {
            account,
            value: Value::new(15),
        });
        let mut voting = TransactionBuilder::new(&settings);
        voting
            .add_input(Input::Account {
                account,
                value: Value::new(15),
            })
            .set_vote_cast(VoteCast {
                vote_plan: VotePlanId::new([2; 32]),
                proposal_index: 1,
                payload: VotePayload::Public { choice: 0 },
            });
        assert_ne!(plain.sign_data_hash()?, voting.sign_data_hash()?);
        assert_eq!(voting.estimate_fee(), Value::new(15));
        Ok(())
    }

    #[test]
    fn account_message_appends_counter() {
        let block0 = BlockId::new([0; 32]);
        let message = account_witness_message(&block0, &[1; 32], SpendingCounter::new(0x0102_0304));
        assert_eq!(message.len(), 68);
        assert_eq!(&message[64..], &[1, 2, 3, 4]);
    }
}
