//! The wallet's account: its key and its value/counter history.

use chainwallet_chain::address::Address;
use chainwallet_crypto::signing::{AccountSecret, PublicKey, Signature};
use chainwallet_types::{AccountId, Discrimination, FragmentId, SpendingCounter, Value};

use crate::states::StateChain;

/// Value and spending counter of the account at one point in time.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct AccountState {
    /// Balance.
    pub value: Value,
    /// Counter the next account-signed transaction must use.
    pub counter: SpendingCounter,
}

/// Account key plus its state chain. The head state is keyed by `None`;
/// every later state by the fragment that produced it.
pub struct Account {
    secret: AccountSecret,
    states: StateChain<Option<FragmentId>, AccountState>,
}

impl Account {
    /// Starts with zero value and counter.
    pub fn new(secret: AccountSecret) -> Self {
        Self {
            secret,
            states: StateChain::new(None, AccountState::default()),
        }
    }

    /// Account public key.
    pub fn public_key(&self) -> PublicKey {
        self.secret.public_key()
    }

    /// Wallet id (the account public key).
    pub fn id(&self) -> AccountId {
        self.public_key().to_account_id()
    }

    /// Account address on `discrimination`.
    pub fn address(&self, discrimination: Discrimination) -> Address {
        Address::account(discrimination, self.public_key())
    }

    /// Latest state, including pending transactions.
    pub fn state(&self) -> AccountState {
        *self.states.last_state()
    }

    /// Latest value.
    pub fn value(&self) -> Value {
        self.state().value
    }

    /// Latest spending counter.
    pub fn counter(&self) -> SpendingCounter {
        self.state().counter
    }

    /// Overwrites the state with network-observed values, dropping every
    /// pending state.
    pub fn set_state(&mut self, value: Value, counter: SpendingCounter) {
        self.states.reset(None, AccountState { value, counter });
    }

    /// Records the state a built transaction leads to.
    pub fn push_pending(&mut self, fragment_id: FragmentId, state: AccountState) {
        self.states.push(Some(fragment_id), state);
    }

    /// Marks a built transaction as confirmed.
    pub fn confirm(&mut self, fragment_id: &FragmentId) -> bool {
        self.states.confirm(&Some(*fragment_id))
    }

    /// Fragment ids still pending, oldest first.
    pub fn pending(&self) -> Vec<FragmentId> {
        self.states.pending().filter_map(|k| *k).collect()
    }

    /// Signs with the account key.
    pub fn sign(&self, message: &[u8]) -> Signature {
        self.secret.sign(message)
    }
}
