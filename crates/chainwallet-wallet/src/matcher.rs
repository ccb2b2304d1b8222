//! Matches snapshot outputs against the wallet's derivation schemes.
//!
//! Every lookup is a hash-map probe or a single payload decryption, so a
//! pass is linear in the number of outputs. Sequential schemes grow
//! their window when they match; outputs still unmatched are then
//! rescanned until the windows stop growing.

use std::collections::HashSet;

use chainwallet_chain::scanner::{LedgerSnapshot, OutputAddress};
use chainwallet_chain::transaction::UtxoPointer;
use chainwallet_types::Value;

use crate::scheme::{DerivationScheme, KeyPath};

/// An output the wallet can spend.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MatchedFund {
    /// The output.
    pub pointer: UtxoPointer,
    /// Its address.
    pub address: OutputAddress,
    /// Key controlling it.
    pub path: KeyPath,
}

impl MatchedFund {
    /// Value held by the output.
    pub fn value(&self) -> Value {
        self.pointer.value
    }
}

/// Finds the outputs of `snapshot` owned by `schemes`.
///
/// Outputs whose pointer is in `known` are skipped, as are account
/// outputs and native outputs of another network. Results keep block
/// order and each pointer appears at most once.
pub fn match_funds(
    schemes: &mut [DerivationScheme],
    snapshot: &LedgerSnapshot,
    known: &HashSet<UtxoPointer>,
) -> Vec<MatchedFund> {
    let discrimination = snapshot.settings.discrimination;
    let mut seen = HashSet::new();

    let mut pending: Vec<(usize, &OutputAddress, UtxoPointer)> = Vec::new();
    for (position, record) in snapshot.outputs.iter().enumerate() {
        if record.address.is_account() || known.contains(&record.pointer) {
            continue;
        }
        if let OutputAddress::Native(native) = &record.address {
            if native.discrimination() != discrimination {
                tracing::warn!(pointer = ?record.pointer, "skipping output of another network");
                continue;
            }
        }
        if seen.insert(record.pointer) {
            pending.push((position, &record.address, record.pointer));
        }
    }

    let mut matched: Vec<(usize, MatchedFund)> = Vec::new();
    let mut passes = 0usize;
    loop {
        passes += 1;
        let window = total_window(schemes);

        let mut unmatched = Vec::with_capacity(pending.len());
        for (position, address, pointer) in pending {
            match schemes.iter_mut().find_map(|s| s.lookup(address)) {
                Some(path) => matched.push((
                    position,
                    MatchedFund {
                        pointer,
                        address: address.clone(),
                        path,
                    },
                )),
                None => unmatched.push((position, address, pointer)),
            }
        }
        pending = unmatched;

        if pending.is_empty() || total_window(schemes) == window {
            break;
        }
    }

    matched.sort_by_key(|(position, _)| *position);
    tracing::debug!(
        passes,
        matched = matched.len(),
        unmatched = pending.len(),
        "fund matching finished"
    );
    matched.into_iter().map(|(_, fund)| fund).collect()
}

fn total_window(schemes: &[DerivationScheme]) -> usize {
    schemes.iter().map(DerivationScheme::window_size).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheme::FreeKeysScheme;
    use chainwallet_chain::address::Address;
    use chainwallet_chain::block::BlockId;
    use chainwallet_chain::scanner::OutputRecord;
    use chainwallet_chain::settings::{LinearFee, Settings};
    use chainwallet_crypto::xprv::ExtendedSecretKey;
    use chainwallet_types::{Block0Date, Discrimination, FragmentId, WalletError};

    fn snapshot(outputs: Vec<OutputRecord>) -> LedgerSnapshot {
        LedgerSnapshot {
            settings: Settings {
                discrimination: Discrimination::Test,
                block0_hash: BlockId::new([0; 32]),
                block0_date: Block0Date::from_secs(0),
                fees: LinearFee {
                    constant: 0,
                    coefficient: 0,
                    certificate: 0,
                    per_vote_cast: None,
                },
                max_inputs_per_transaction: 255,
            },
            outputs,
        }
    }

    fn record(index: u8, address: Address) -> OutputRecord {
        OutputRecord {
            pointer: UtxoPointer {
                fragment_id: FragmentId::new([1; 32]),
                output_index: index,
                value: Value::new(10),
            },
            address: OutputAddress::Native(address),
        }
    }

    #[test]
    fn skips_known_foreign_and_account_outputs() -> std::result::Result<(), WalletError> {
        let mut bytes = [9u8; 64];
        bytes[0] = 0x08;
        bytes[31] = 0x40;
        let key = ExtendedSecretKey::from_bytes(&bytes)?;
        let pk = key.public_key();
        let mut schemes = vec![DerivationScheme::FreeKeys(FreeKeysScheme::new(vec![key]))];

        let snapshot = snapshot(vec![
            record(0, Address::single(Discrimination::Test, pk)),
            record(1, Address::single(Discrimination::Production, pk)),
            record(2, Address::account(Discrimination::Test, pk)),
            record(3, Address::single(Discrimination::Test, pk)),
        ]);
        let known: HashSet<_> = [snapshot.outputs[3].pointer].into_iter().collect();

        let funds = match_funds(&mut schemes, &snapshot, &known);
        assert_eq!(funds.len(), 1);
        assert_eq!(funds[0].pointer.output_index, 0);
        assert_eq!(funds[0].path, KeyPath::FreeKey { index: 0 });
        Ok(())
    }
}
