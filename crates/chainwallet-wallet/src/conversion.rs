//! Consolidation of matched legacy funds into the account.
//!
//! # Grouping
//!
//! A group of `n` inputs pays `constant + coefficient × (n + 1)` for its
//! single output, so each input carries `value - coefficient` toward the
//! bar of `constant + coefficient`. A group is valid when its inputs carry
//! strictly more than the bar.
//!
//! 1. An input is dust when it does not clear the bar even in the best
//!    group it could join: itself plus the `max_inputs - 1` largest others.
//! 2. The rest are sorted by value, descending (ties by pointer), and
//!    spread over the fewest groups that respect `max_inputs`. Each input
//!    goes to the group carrying the least so far.
//! 3. If some group still misses the bar, the smallest input is left out
//!    and step 2 starts over.
//!
//! Each remaining group becomes one transaction paying
//! `total - fee` to the account address.

use chainwallet_chain::address::Address;
use chainwallet_chain::fragment::{fragment_id, Fragment};
use chainwallet_chain::settings::{LinearFee, Settings};
use chainwallet_chain::transaction::{
    utxo_witness_message, Input, Output, TransactionBuilder, Witness,
};
use chainwallet_types::{FragmentId, Result, Value};

use crate::matcher::MatchedFund;
use crate::scheme::KeyPath;

// ---------------------------------------------------------------------------
// Conversion
// ---------------------------------------------------------------------------

/// Signed consolidation transactions plus what had to be left behind.
#[derive(Clone, Debug, Default)]
pub struct Conversion {
    transactions: Vec<Vec<u8>>,
    fragment_ids: Vec<FragmentId>,
    moved_value: Value,
    fees: Value,
    ignored_value: Value,
    ignored_count: usize,
}

impl Conversion {
    /// Number of transactions.
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    /// Returns `true` when nothing could be converted.
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Encoded fragment of transaction `index`, borrowed from `self`.
    pub fn transaction(&self, index: usize) -> Option<&[u8]> {
        self.transactions.get(index).map(Vec::as_slice)
    }

    /// All encoded fragments in submission order.
    pub fn transactions(&self) -> impl Iterator<Item = &[u8]> {
        self.transactions.iter().map(Vec::as_slice)
    }

    /// Fragment ids, parallel to [`transactions`](Self::transactions).
    pub fn fragment_ids(&self) -> &[FragmentId] {
        &self.fragment_ids
    }

    /// Total value of the inputs consumed.
    pub fn moved_value(&self) -> Value {
        self.moved_value
    }

    /// Total fees paid.
    pub fn fees(&self) -> Value {
        self.fees
    }

    /// Value credited to the account (`moved - fees`).
    pub fn credited_value(&self) -> Value {
        self.moved_value.saturating_sub(self.fees)
    }

    /// Total value of dust inputs.
    pub fn ignored_value(&self) -> Value {
        self.ignored_value
    }

    /// Number of dust inputs.
    pub fn ignored_count(&self) -> usize {
        self.ignored_count
    }
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

/// Split of the matched funds into transaction groups and dust.
#[derive(Debug, Default)]
pub struct Plan {
    /// Input groups, one transaction each.
    pub groups: Vec<Vec<MatchedFund>>,
    /// Inputs that cannot be converted.
    pub ignored: Vec<MatchedFund>,
}

/// Groups `funds` under `fees`, at most `max_inputs` per group.
pub fn plan(funds: &[MatchedFund], fees: &LinearFee, max_inputs: usize) -> Plan {
    let max_inputs = max_inputs.max(1);
    let bar = fees.constant.saturating_add(fees.coefficient);
    let carry = |f: &MatchedFund| f.value().as_u64().saturating_sub(fees.coefficient);

    let mut sorted = funds.to_vec();
    sorted.sort_by(|a, b| {
        b.value()
            .cmp(&a.value())
            .then_with(|| a.pointer.cmp(&b.pointer))
    });

    let best = |n: usize| {
        sorted
            .iter()
            .take(n)
            .fold(0u64, |acc, f| acc.saturating_add(carry(f)))
    };
    let (best_full, best_partner) = (best(max_inputs), best(max_inputs - 1));

    let mut usable = Vec::with_capacity(sorted.len());
    let mut ignored = Vec::new();
    for (position, fund) in sorted.iter().enumerate() {
        let reach = if position < max_inputs {
            best_full
        } else {
            best_partner.saturating_add(carry(fund))
        };
        if carry(fund) > 0 && reach > bar {
            usable.push(fund.clone());
        } else {
            ignored.push(fund.clone());
        }
    }

    loop {
        if let Some(groups) = spread(&usable, max_inputs, bar, carry) {
            return Plan { groups, ignored };
        }
        match usable.pop() {
            Some(smallest) => ignored.push(smallest),
            None => return Plan { groups: Vec::new(), ignored },
        }
    }
}

/// Spreads `sorted` over the fewest groups of at most `max_inputs`,
/// always filling the group carrying the least. `None` if any group
/// ends up at or below `bar`.
fn spread(
    sorted: &[MatchedFund],
    max_inputs: usize,
    bar: u64,
    carry: impl Fn(&MatchedFund) -> u64,
) -> Option<Vec<Vec<MatchedFund>>> {
    let count = sorted.len().div_ceil(max_inputs);
    let mut groups: Vec<(u64, Vec<MatchedFund>)> = vec![(0, Vec::new()); count];

    for fund in sorted {
        let (carried, members) = groups
            .iter_mut()
            .filter(|(_, members)| members.len() < max_inputs)
            .min_by_key(|(carried, _)| *carried)?;
        *carried = carried.saturating_add(carry(fund));
        members.push(fund.clone());
    }

    if groups.iter().all(|(carried, _)| *carried > bar) {
        Some(groups.into_iter().map(|(_, members)| members).collect())
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Building
// ---------------------------------------------------------------------------

/// Builds one signed transaction per group of `plan`.
///
/// `sign` produces the witness for a key path and a message. Nothing is
/// returned unless every transaction builds.
pub fn build(
    settings: &Settings,
    plan: &Plan,
    destination: Address,
    mut sign: impl FnMut(&KeyPath, &[u8]) -> Result<Witness>,
) -> Result<Conversion> {
    let mut conversion = Conversion::default();

    for group in &plan.groups {
        let mut builder = TransactionBuilder::new(settings);
        for fund in group {
            builder.add_input(Input::Utxo(fund.pointer));
        }
        let total = Value::checked_sum(group.iter().map(MatchedFund::value))?;
        let fee = settings.fees.calculate(group.len(), 1, false);
        builder.add_output(Output {
            address: destination,
            value: total.saturating_sub(fee),
        });

        let message = utxo_witness_message(&settings.block0_hash, &builder.sign_data_hash()?);
        let witnesses = group
            .iter()
            .map(|fund| sign(&fund.path, &message))
            .collect::<Result<Vec<_>>>()?;
        let tx = builder.seal(witnesses)?;

        let bytes = Fragment::Transaction(tx).to_bytes()?;
        let id = fragment_id(&bytes);
        tracing::debug!(
            fragment = %id,
            inputs = group.len(),
            %total,
            %fee,
            "conversion transaction built"
        );

        conversion.fragment_ids.push(id);
        conversion.transactions.push(bytes);
        conversion.moved_value = conversion.moved_value.saturating_add(total);
        conversion.fees = conversion.fees.saturating_add(fee);
    }

    conversion.ignored_count = plan.ignored.len();
    conversion.ignored_value = plan
        .ignored
        .iter()
        .fold(Value::ZERO, |acc, f| acc.saturating_add(f.value()));
    Ok(conversion)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainwallet_chain::scanner::OutputAddress;
    use chainwallet_chain::transaction::UtxoPointer;
    use chainwallet_crypto::signing::PublicKey;
    use chainwallet_types::{Discrimination, FragmentId};

    fn fees() -> LinearFee {
        LinearFee {
            constant: 10,
            coefficient: 5,
            certificate: 0,
            per_vote_cast: None,
        }
    }

    fn fund(index: u8, value: u64) -> MatchedFund {
        MatchedFund {
            pointer: UtxoPointer {
                fragment_id: FragmentId::new([0; 32]),
                output_index: index,
                value: Value::new(value),
            },
            address: OutputAddress::Native(Address::single(
                Discrimination::Test,
                PublicKey::from_bytes([1; 32]),
            )),
            path: KeyPath::FreeKey { index: 0 },
        }
    }

    fn values(funds: &[MatchedFund]) -> Vec<u64> {
        funds.iter().map(|f| f.value().as_u64()).collect()
    }

    #[test]
    fn input_worth_coefficient_is_dust() {
        let plan = plan(&[fund(0, 5), fund(1, 100)], &fees(), 255);
        assert_eq!(plan.groups.len(), 1);
        assert_eq!(values(&plan.ignored), vec![5]);
    }

    fn funds(values: &[u64]) -> Vec<MatchedFund> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| fund(i as u8, *v))
            .collect()
    }

    fn grouped(plan: &Plan) -> Vec<Vec<u64>> {
        plan.groups.iter().map(|g| values(g)).collect()
    }

    #[test]
    fn groups_are_balanced_and_bounded() {
        let plan = plan(&funds(&[40, 90, 60, 70, 80]), &fees(), 2);
        assert_eq!(grouped(&plan), vec![vec![90], vec![80, 40], vec![70, 60]]);
        assert!(plan.ignored.is_empty());
    }

    #[test]
    fn small_inputs_pair_with_large_ones() {
        // Pairing by size would leave [18, 7] carrying 15, exactly the bar.
        let plan = plan(&funds(&[100, 30, 18, 7]), &fees(), 2);
        assert_eq!(grouped(&plan), vec![vec![100, 7], vec![30, 18]]);
        assert!(plan.ignored.is_empty());
    }

    #[test]
    fn input_without_room_is_left_out() {
        // Both 7s can clear the bar next to 100, but only one fits there.
        let plan = plan(&funds(&[100, 7, 7]), &fees(), 2);
        assert_eq!(grouped(&plan), vec![vec![100, 7]]);
        assert_eq!(values(&plan.ignored), vec![7]);
    }

    #[test]
    fn input_too_small_for_any_group_is_dust() {
        // With one input per group, 18 has to carry the bar of 15 alone.
        let plan = plan(&funds(&[18, 30]), &fees(), 1);
        assert_eq!(grouped(&plan), vec![vec![30]]);
        assert_eq!(values(&plan.ignored), vec![18]);
    }

    #[test]
    fn group_that_cannot_pay_its_fee_is_dust() {
        // One input of 20 needs more than 10 + 5 × 2 = 20.
        let plan = plan(&[fund(0, 20)], &fees(), 255);
        assert!(plan.groups.is_empty());
        assert_eq!(plan.ignored.len(), 1);

        let plan = super::plan(&[fund(0, 21)], &fees(), 255);
        assert_eq!(plan.groups.len(), 1);
    }

    #[test]
    fn every_fund_lands_exactly_once() {
        let funds: Vec<_> = (0..10u8).map(|i| fund(i, u64::from(i) * 7)).collect();
        let plan = plan(&funds, &fees(), 3);
        let grouped: usize = plan.groups.iter().map(Vec::len).sum();
        assert_eq!(grouped + plan.ignored.len(), funds.len());
    }
}
