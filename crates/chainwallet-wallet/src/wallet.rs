//! The recovered wallet: key material, matched funds and account state.
//!
//! A [`Wallet`] is a plain owned value. Dropping it zeroizes every key
//! it holds. All mutating operations either complete or leave the wallet
//! untouched.

use std::collections::HashSet;

use chainwallet_chain::address::Address;
use chainwallet_chain::scanner::scan_block0;
use chainwallet_chain::settings::Settings;
use chainwallet_chain::transaction::{UtxoPointer, Witness};
use chainwallet_types::config::RecoveryConfig;
use chainwallet_types::{
    AccountId, Discrimination, FragmentId, Result, SpendingCounter, Value, WalletError,
};

use crate::account::{Account, AccountState};
use crate::conversion::{self, Conversion};
use crate::matcher::{match_funds, MatchedFund};
use crate::recovery::RecoveryBuilder;
use crate::scheme::{DerivationScheme, KeyPath};
use crate::vote::{build_vote, Proposal};

/// Recovered wallet.
///
/// # Invariants
///
/// - `funds` holds every matched output not yet converted, in block order.
/// - `seen` holds every pointer ever matched, converted or not, so a
///   snapshot scanned twice never double counts.
/// - The spending counter only moves forward, through a vote or
///   [`set_state`](Wallet::set_state).
pub struct Wallet {
    account: Account,
    schemes: Vec<DerivationScheme>,
    config: RecoveryConfig,
    funds: Vec<MatchedFund>,
    seen: HashSet<UtxoPointer>,
}

impl Wallet {
    // -- Construction -----------------------------------------------------

    /// Recovers a wallet from a mnemonic with default configuration.
    ///
    /// # Errors
    ///
    /// [`WalletError::InvalidMnemonic`] if the phrase does not parse.
    pub fn recover(mnemonic: &str, password: &[u8]) -> Result<Self> {
        Self::recover_with_config(mnemonic, password, RecoveryConfig::default())
    }

    /// Recovers a wallet from a mnemonic.
    pub fn recover_with_config(
        mnemonic: &str,
        password: &[u8],
        config: RecoveryConfig,
    ) -> Result<Self> {
        RecoveryBuilder::new(config)
            .mnemonic(mnemonic, password)?
            .build()
    }

    /// Imports an account key and free UTXO keys.
    ///
    /// # Errors
    ///
    /// [`WalletError::InvalidInput`] if any key is not a clamped
    /// extended secret key.
    pub fn import_keys(account_key: &[u8; 64], utxo_keys: &[[u8; 64]]) -> Result<Self> {
        let mut builder = RecoveryBuilder::default().account_key(account_key)?;
        for key in utxo_keys {
            builder = builder.utxo_key(key)?;
        }
        builder.build()
    }

    pub(crate) fn from_parts(
        account: Account,
        schemes: Vec<DerivationScheme>,
        config: RecoveryConfig,
    ) -> Self {
        Self {
            account,
            schemes,
            config,
            funds: Vec::new(),
            seen: HashSet::new(),
        }
    }

    // -- Accessors --------------------------------------------------------

    /// Wallet id: the account public key.
    pub fn id(&self) -> AccountId {
        self.account.id()
    }

    /// Account address on `discrimination`.
    pub fn account_address(&self, discrimination: Discrimination) -> Address {
        self.account.address(discrimination)
    }

    /// Matched funds not yet converted.
    pub fn matched_funds(&self) -> &[MatchedFund] {
        &self.funds
    }

    /// Unconverted funds plus the account value. Never fails; zero before
    /// any retrieval.
    pub fn total_value(&self) -> Value {
        self.funds
            .iter()
            .fold(self.account.value(), |acc, f| acc.saturating_add(f.value()))
    }

    /// Account value including pending transactions.
    pub fn account_value(&self) -> Value {
        self.account.value()
    }

    /// Counter the next vote will use.
    pub fn spending_counter(&self) -> SpendingCounter {
        self.account.counter()
    }

    /// Fragment ids of transactions built but not confirmed, oldest first.
    pub fn pending_transactions(&self) -> Vec<FragmentId> {
        self.account.pending()
    }

    // -- State ------------------------------------------------------------

    /// Overwrites the account state with network-observed values.
    /// Pending transactions are forgotten.
    pub fn set_state(&mut self, value: Value, counter: SpendingCounter) {
        tracing::info!(%value, %counter, "account state set");
        self.account.set_state(value, counter);
    }

    /// Marks a built transaction as confirmed. Returns `false` if `id`
    /// is not pending.
    pub fn confirm_transaction(&mut self, id: &FragmentId) -> bool {
        let confirmed = self.account.confirm(id);
        if confirmed {
            tracing::info!(fragment = %id, "transaction confirmed");
        } else {
            tracing::warn!(fragment = %id, "confirmation for unknown transaction");
        }
        confirmed
    }

    // -- Operations -------------------------------------------------------

    /// Scans block0 and adds every output this wallet owns.
    ///
    /// Returns the snapshot's settings for later conversion and voting.
    ///
    /// # Errors
    ///
    /// [`WalletError::MalformedBlock`] if block0 does not decode; the
    /// wallet is unchanged.
    pub fn retrieve_funds(&mut self, block0: &[u8]) -> Result<Settings> {
        let snapshot = scan_block0(block0)?;
        let matched = match_funds(&mut self.schemes, &snapshot, &self.seen);

        let matched_value = matched
            .iter()
            .fold(Value::ZERO, |acc, f| acc.saturating_add(f.value()));
        for fund in &matched {
            self.seen.insert(fund.pointer);
        }
        tracing::info!(
            outputs = snapshot.outputs.len(),
            matched = matched.len(),
            %matched_value,
            "retrieved funds"
        );

        self.funds.extend(matched);
        Ok(snapshot.settings)
    }

    /// Converts every matched fund into the account.
    ///
    /// Converted funds leave the matched set and the credit is recorded
    /// as pending, one state per transaction. Dust stays matched.
    ///
    /// # Errors
    ///
    /// [`WalletError::TransactionError`] or a derivation error if a
    /// transaction cannot be built; nothing changes in that case.
    pub fn convert(&mut self, settings: &Settings) -> Result<Conversion> {
        let max_inputs = usize::from(
            settings
                .max_inputs_per_transaction
                .min(self.config.max_inputs_per_transaction),
        );
        let plan = conversion::plan(&self.funds, &settings.fees, max_inputs);
        let destination = self.account.address(settings.discrimination);

        let schemes = &self.schemes;
        let conversion = conversion::build(settings, &plan, destination, |path, message| {
            sign_with(schemes, path, message)
        })?;

        // Commit: drop converted funds, record one pending credit per
        // transaction.
        let converted: HashSet<UtxoPointer> = plan
            .groups
            .iter()
            .flatten()
            .map(|f| f.pointer)
            .collect();
        self.funds.retain(|f| !converted.contains(&f.pointer));

        let mut state = self.account.state();
        for (group, id) in plan.groups.iter().zip(conversion.fragment_ids()) {
            let total = group
                .iter()
                .fold(Value::ZERO, |acc, f| acc.saturating_add(f.value()));
            let credit = total.saturating_sub(settings.fees.calculate(group.len(), 1, false));
            state.value = state.value.saturating_add(credit);
            self.account.push_pending(*id, state);
        }

        if conversion.ignored_count() > 0 {
            tracing::warn!(
                count = conversion.ignored_count(),
                value = %conversion.ignored_value(),
                "dust left unconverted"
            );
        }
        tracing::info!(
            transactions = conversion.len(),
            moved = %conversion.moved_value(),
            fees = %conversion.fees(),
            "conversion built"
        );
        Ok(conversion)
    }

    /// Builds a vote for `choice` on `proposal`.
    ///
    /// The returned bytes are a vote-cast fragment owned by the caller.
    /// The fee is debited and the counter advanced by one, both pending.
    /// The account balance is not checked; the network has the final say.
    ///
    /// # Errors
    ///
    /// [`WalletError::InvalidChoice`] if `choice >= num_choices`;
    /// [`WalletError::TransactionError`] if the counter is exhausted.
    pub fn vote(
        &mut self,
        settings: &Settings,
        proposal: &Proposal,
        choice: u8,
    ) -> Result<Vec<u8>> {
        let current = self.account.state();
        let next_counter = current.counter.increment()?;

        let vote = build_vote(settings, &self.account, proposal, choice)?;
        self.account.push_pending(
            vote.fragment_id,
            AccountState {
                value: current.value.saturating_sub(vote.fee),
                counter: next_counter,
            },
        );

        tracing::info!(
            fragment = %vote.fragment_id,
            vote_plan = %proposal.vote_plan(),
            proposal = proposal.index(),
            counter = %current.counter,
            "vote built"
        );
        Ok(vote.bytes)
    }
}

fn sign_with(schemes: &[DerivationScheme], path: &KeyPath, message: &[u8]) -> Result<Witness> {
    schemes
        .iter()
        .find(|s| s.owns(path))
        .ok_or_else(|| WalletError::InternalDerivationFailure {
            reason: format!("no scheme for key path {path}"),
        })?
        .witness(path, message)
}
