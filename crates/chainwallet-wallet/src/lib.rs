//! Wallet recovery, accounting and transaction building for chainwallet.
//!
//! Handles the full lifecycle of a recovered legacy wallet:
//!
//! - **Recover** key material from a mnemonic or imported extended keys
//! - **Retrieve** spendable outputs from a block0 snapshot
//! - **Convert** legacy UTXOs into the account, classifying dust
//! - **Vote** on governance proposals with the account key
//! - **Track** the account's value and spending counter, pending and
//!   confirmed
//!
//! [`Wallet`] is the entry point; the modules below are its building
//! blocks and are public so tooling can reuse them.

pub mod account;
pub mod conversion;
pub mod matcher;
pub mod recovery;
pub mod scheme;
pub mod states;
pub mod vote;
pub mod wallet;

pub use conversion::Conversion;
pub use recovery::RecoveryBuilder;
pub use vote::Proposal;
pub use wallet::Wallet;
