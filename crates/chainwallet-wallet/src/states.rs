//! Ordered chain of states, each confirmed or still pending.
//!
//! The first entry is always confirmed and is the last state the network
//! is known to hold. Later entries are optimistic states produced by
//! transactions the wallet built but has not seen confirmed. Confirming
//! an entry collapses every leading confirmed entry into the head.

use std::collections::VecDeque;

/// Whether the network has acknowledged a state.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Status {
    /// Known to the network.
    Confirmed,
    /// Built locally, awaiting confirmation.
    Pending,
}

#[derive(Clone, Debug)]
struct Entry<K, S> {
    key: K,
    state: S,
    status: Status,
}

/// Chain of states keyed by the transaction that produced them.
#[derive(Clone, Debug)]
pub struct StateChain<K, S> {
    entries: VecDeque<Entry<K, S>>,
}

impl<K: PartialEq, S> StateChain<K, S> {
    /// Starts a chain from a confirmed state.
    pub fn new(key: K, state: S) -> Self {
        let mut entries = VecDeque::new();
        entries.push_back(Entry {
            key,
            state,
            status: Status::Confirmed,
        });
        Self { entries }
    }

    /// Most recent state, pending or not.
    pub fn last_state(&self) -> &S {
        // The chain is never empty: `new` and `reset` always leave a head.
        &self.entries[self.entries.len() - 1].state
    }

    /// Last state known to the network.
    pub fn confirmed_state(&self) -> &S {
        &self.entries[0].state
    }

    /// Appends a pending state.
    pub fn push(&mut self, key: K, state: S) {
        self.entries.push_back(Entry {
            key,
            state,
            status: Status::Pending,
        });
    }

    /// Marks the state produced by `key` as confirmed.
    ///
    /// Returns `false` if no pending state has that key.
    pub fn confirm(&mut self, key: &K) -> bool {
        let found = self
            .entries
            .iter_mut()
            .skip(1)
            .find(|e| e.status == Status::Pending && &e.key == key);
        match found {
            Some(entry) => entry.status = Status::Confirmed,
            None => return false,
        }

        while self.entries.len() > 1 && self.entries[1].status == Status::Confirmed {
            self.entries.pop_front();
        }
        true
    }

    /// Status of the state produced by `key`, if still tracked.
    pub fn status(&self, key: &K) -> Option<Status> {
        self.entries.iter().find(|e| &e.key == key).map(|e| e.status)
    }

    /// Keys of pending states, oldest first.
    pub fn pending(&self) -> impl Iterator<Item = &K> {
        self.entries
            .iter()
            .filter(|e| e.status == Status::Pending)
            .map(|e| &e.key)
    }

    /// Replaces the whole chain with one confirmed state.
    pub fn reset(&mut self, key: K, state: S) {
        self.entries.clear();
        self.entries.push_back(Entry {
            key,
            state,
            status: Status::Confirmed,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_confirm_in_order() {
        let mut chain = StateChain::new(0u32, "a");
        chain.push(1, "b");
        chain.push(2, "c");
        assert_eq!(*chain.last_state(), "c");
        assert_eq!(*chain.confirmed_state(), "a");

        assert!(chain.confirm(&1));
        assert_eq!(*chain.confirmed_state(), "b");
        assert_eq!(chain.pending().copied().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn out_of_order_confirmation_waits_for_predecessor() {
        let mut chain = StateChain::new(0u32, 10);
        chain.push(1, 20);
        chain.push(2, 30);

        assert!(chain.confirm(&2));
        assert_eq!(*chain.confirmed_state(), 10);
        assert_eq!(chain.status(&2), Some(Status::Confirmed));

        assert!(chain.confirm(&1));
        assert_eq!(*chain.confirmed_state(), 30);
        assert_eq!(chain.pending().count(), 0);
        assert_eq!(chain.status(&1), None);
    }

    #[test]
    fn unknown_key_not_confirmed() {
        let mut chain = StateChain::new(0u32, ());
        chain.push(1, ());
        assert!(!chain.confirm(&7));
        assert!(!chain.confirm(&0));
    }

    #[test]
    fn reset_drops_pending() {
        let mut chain = StateChain::new(0u32, 1);
        chain.push(1, 2);
        chain.reset(9, 5);
        assert_eq!(*chain.last_state(), 5);
        assert_eq!(chain.pending().count(), 0);
    }
}
