//! Cryptographic primitives for the chainwallet workspace.
//!
//! This crate is the **sole** location for all cryptographic operations.
//! No other crate in the workspace may hash, derive or sign directly.
//!
//! # Modules
//!
//! - [`hash`]: BLAKE2b, SHA3-256 and CRC32 helpers
//! - [`mnemonic`]: BIP39 phrase parsing into entropy
//! - [`xprv`]: BIP32-Ed25519 extended keys and child derivation
//! - [`keygen`]: root keys for the Daedalus and Yoroi schemes, account seed
//! - [`hdpayload`]: encrypted derivation paths embedded in Daedalus addresses
//! - [`paperwallet`]: unscrambling of Daedalus paper certificates
//! - [`signing`]: Ed25519 account keys, signatures and verification
//! - [`aead`]: ChaCha20-Poly1305 authenticated encryption
//! - [`symmetric`]: password-based payload cipher

pub mod aead;
pub mod hash;
pub mod hdpayload;
pub mod keygen;
pub mod mnemonic;
pub mod paperwallet;
pub mod signing;
pub mod symmetric;
pub mod xprv;
