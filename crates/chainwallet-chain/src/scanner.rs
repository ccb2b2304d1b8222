//! Ledger snapshot scanner.
//!
//! Turns block0 bytes into [`Settings`] plus the ordered list of every
//! output the block creates. Pure parse; ownership is decided later by
//! the wallet.

use chainwallet_types::{Result, Value};

use crate::address::{Address, LegacyAddress};
use crate::block::Block;
use crate::fragment::Fragment;
use crate::settings::Settings;
use crate::transaction::UtxoPointer;

/// Address of a scanned output.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum OutputAddress {
    /// Declared by an old UTXO declaration.
    Legacy(LegacyAddress),
    /// Created by a transaction.
    Native(Address),
}

impl OutputAddress {
    /// Returns `true` for native account addresses, which never hold
    /// spendable UTXOs.
    pub fn is_account(&self) -> bool {
        matches!(self, Self::Native(address) if address.is_account())
    }
}

/// One output of block0.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OutputRecord {
    /// Where the output lives.
    pub pointer: UtxoPointer,
    /// Who it pays.
    pub address: OutputAddress,
}

/// Result of scanning block0.
#[derive(Clone, Debug)]
pub struct LedgerSnapshot {
    /// Network parameters.
    pub settings: Settings,
    /// Outputs in block order.
    pub outputs: Vec<OutputRecord>,
}

impl LedgerSnapshot {
    /// Sum of all output values, saturating.
    pub fn total_value(&self) -> Value {
        self.outputs
            .iter()
            .fold(Value::ZERO, |acc, o| acc.saturating_add(o.pointer.value))
    }
}

/// Parses block0.
///
/// # Errors
///
/// [`chainwallet_types::WalletError::MalformedBlock`] on any structural
/// problem; no partial snapshot is returned.
pub fn scan_block0(bytes: &[u8]) -> Result<LedgerSnapshot> {
    let block = Block::from_bytes(bytes)?;

    let params = match block.fragments().first() {
        Some((_, Fragment::Initial(params))) => params.as_slice(),
        _ => &[],
    };
    let settings = Settings::from_params(block.id(), block.header().date, params)?;

    let mut outputs = Vec::new();
    for (fragment_id, fragment) in block.fragments() {
        match fragment {
            Fragment::OldUtxoDeclaration(entries) => {
                for (index, (address, value)) in entries.iter().enumerate() {
                    outputs.push(OutputRecord {
                        pointer: pointer(*fragment_id, index, *value),
                        address: OutputAddress::Legacy(address.clone()),
                    });
                }
            }
            Fragment::Transaction(tx) => {
                for (index, output) in tx.outputs().iter().enumerate() {
                    outputs.push(OutputRecord {
                        pointer: pointer(*fragment_id, index, output.value),
                        address: OutputAddress::Native(output.address),
                    });
                }
            }
            Fragment::Unsupported(tag) => {
                tracing::warn!(fragment = %fragment_id, tag, "ignoring unsupported fragment");
            }
            Fragment::Initial(_) | Fragment::VoteCast(_) => {}
        }
    }

    tracing::info!(
        block0 = %settings.block0_hash,
        fragments = block.fragments().len(),
        outputs = outputs.len(),
        "scanned block0"
    );

    Ok(LedgerSnapshot { settings, outputs })
}

// Output counts are bounded by the fragment decoder, so the index always
// fits in one byte.
fn pointer(fragment_id: chainwallet_types::FragmentId, index: usize, value: Value) -> UtxoPointer {
    UtxoPointer {
        fragment_id,
        output_index: index as u8,
        value,
    }
}
