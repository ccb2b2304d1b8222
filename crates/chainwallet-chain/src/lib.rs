//! Ledger model for chainwallet.
//!
//! Everything the wallet needs to read a genesis snapshot and to write
//! transactions the network accepts:
//!
//! - [`address`]: native (single/account) and legacy bootstrap addresses
//! - [`fragment`]: fragment enum and its CBOR framing
//! - [`transaction`]: inputs, outputs, witnesses, vote-cast certificate, builder
//! - [`settings`]: fee formula and network parameters from the initial fragment
//! - [`block`]: block0 decoding with structural validation
//! - [`scanner`]: turns block0 into [`settings::Settings`] and output records
//!
//! All encodings are CBOR via `ciborium`; all hashing goes through
//! `chainwallet-crypto`.

pub mod address;
pub mod block;
mod cbor;
pub mod fragment;
pub mod scanner;
pub mod settings;
pub mod transaction;
