//! Core shared types for the chainwallet recovery and voting workspace.
//!
//! This crate defines all fundamental types used across the workspace:
//! ledger values, spending counters, identifiers and the central
//! [`WalletError`]. No other crate should define shared types.

pub mod config;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Value
// ---------------------------------------------------------------------------

/// Amount of ledger currency in its smallest unit.
///
/// All arithmetic that can overflow is exposed in checked form; callers
/// decide whether overflow is an error or saturates.
#[derive(
    Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Value(u64);

impl Value {
    /// The zero value.
    pub const ZERO: Value = Value(0);

    /// Creates a new `Value`.
    pub const fn new(amount: u64) -> Self {
        Self(amount)
    }

    /// Returns the raw amount.
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Adds two values, returning `None` on overflow.
    pub fn checked_add(self, other: Value) -> Option<Value> {
        self.0.checked_add(other.0).map(Value)
    }

    /// Subtracts `other`, returning `None` if the result would be negative.
    pub fn checked_sub(self, other: Value) -> Option<Value> {
        self.0.checked_sub(other.0).map(Value)
    }

    /// Adds two values, clamping at `u64::MAX`.
    pub fn saturating_add(self, other: Value) -> Value {
        Value(self.0.saturating_add(other.0))
    }

    /// Subtracts `other`, clamping at zero.
    pub fn saturating_sub(self, other: Value) -> Value {
        Value(self.0.saturating_sub(other.0))
    }

    /// Sums an iterator of values.
    ///
    /// # Errors
    ///
    /// Returns [`WalletError::TransactionError`] if the sum overflows.
    pub fn checked_sum<I>(values: I) -> Result<Value>
    where
        I: IntoIterator<Item = Value>,
    {
        values.into_iter().try_fold(Value::ZERO, |acc, v| {
            acc.checked_add(v).ok_or_else(|| WalletError::TransactionError {
                reason: "value overflow while summing".into(),
            })
        })
    }
}

impl From<u64> for Value {
    fn from(amount: u64) -> Self {
        Self(amount)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Discrimination
// ---------------------------------------------------------------------------

/// Network tag embedded in addresses, separating test and production
/// networks.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Discrimination {
    /// Production network.
    Production,
    /// Test network.
    Test,
}

impl fmt::Display for Discrimination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Production => write!(f, "production"),
            Self::Test => write!(f, "test"),
        }
    }
}

// ---------------------------------------------------------------------------
// SpendingCounter
// ---------------------------------------------------------------------------

/// Per-account sequence number. Every account-signed transaction
/// consumes the current value; the network rejects reused counters.
#[derive(
    Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SpendingCounter(u32);

impl SpendingCounter {
    /// Creates a new counter.
    pub const fn new(counter: u32) -> Self {
        Self(counter)
    }

    /// Returns the raw counter.
    pub const fn as_u32(&self) -> u32 {
        self.0
    }

    /// Big-endian encoding used in account witnesses.
    pub fn to_be_bytes(&self) -> [u8; 4] {
        self.0.to_be_bytes()
    }

    /// Returns the next counter.
    ///
    /// # Errors
    ///
    /// Returns [`WalletError::TransactionError`] once the counter space
    /// is exhausted.
    pub fn increment(self) -> Result<Self> {
        self.0
            .checked_add(1)
            .map(Self)
            .ok_or_else(|| WalletError::TransactionError {
                reason: "spending counter exhausted".into(),
            })
    }
}

impl From<u32> for SpendingCounter {
    fn from(counter: u32) -> Self {
        Self(counter)
    }
}

impl fmt::Display for SpendingCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// FragmentId
// ---------------------------------------------------------------------------

/// BLAKE2b-256 digest of an encoded fragment. Identifies transactions
/// and UTXO declarations.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct FragmentId([u8; 32]);

impl FragmentId {
    /// The fixed byte length of a fragment ID.
    pub const LEN: usize = 32;

    /// Creates a new `FragmentId` from raw bytes.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl From<[u8; 32]> for FragmentId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for FragmentId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for FragmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for FragmentId {
    type Err = WalletError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        decode_hex_32(s, "fragment id").map(Self)
    }
}

// ---------------------------------------------------------------------------
// AccountId
// ---------------------------------------------------------------------------

/// 32-byte account public key. Doubles as the wallet id.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct AccountId([u8; 32]);

impl AccountId {
    /// The fixed byte length of an account ID.
    pub const LEN: usize = 32;

    /// Creates a new `AccountId` from raw bytes.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl From<[u8; 32]> for AccountId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for AccountId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for AccountId {
    type Err = WalletError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        decode_hex_32(s, "account id").map(Self)
    }
}

// ---------------------------------------------------------------------------
// VotePlanId
// ---------------------------------------------------------------------------

/// Fixed-size identifier of an on-chain vote plan.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct VotePlanId([u8; 32]);

impl VotePlanId {
    /// The fixed byte length of a vote plan ID.
    pub const LEN: usize = 32;

    /// Creates a new `VotePlanId` from raw bytes.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl From<[u8; 32]> for VotePlanId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for VotePlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for VotePlanId {
    type Err = WalletError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        decode_hex_32(s, "vote plan id").map(Self)
    }
}

fn decode_hex_32(s: &str, what: &str) -> Result<[u8; 32]> {
    let bytes = hex::decode(s).map_err(|_| WalletError::InvalidInput {
        reason: format!("invalid hex encoding for {what}"),
    })?;
    if bytes.len() != 32 {
        return Err(WalletError::InvalidInput {
            reason: format!("expected 32 bytes for {what}, got {}", bytes.len()),
        });
    }
    let mut arr = [0u8; 32];
    arr.copy_from_slice(&bytes);
    Ok(arr)
}

// ---------------------------------------------------------------------------
// Block0Date
// ---------------------------------------------------------------------------

/// Genesis date, in seconds since the UNIX epoch.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Block0Date(u64);

impl Block0Date {
    /// Creates a date from seconds since the epoch.
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    /// Returns seconds since the epoch.
    pub const fn as_secs(&self) -> u64 {
        self.0
    }

    /// Returns the date as a UTC datetime, if representable.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        let secs = i64::try_from(self.0).ok()?;
        DateTime::<Utc>::from_timestamp(secs, 0)
    }
}

impl fmt::Display for Block0Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.to_rfc3339()),
            None => write!(f, "{}s", self.0),
        }
    }
}

// ---------------------------------------------------------------------------
// PayloadType
// ---------------------------------------------------------------------------

/// How a vote choice is carried in a vote-cast certificate.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PayloadType {
    /// Choice is visible on chain.
    Public = 1,
}

impl TryFrom<u8> for PayloadType {
    type Error = WalletError;

    fn try_from(raw: u8) -> std::result::Result<Self, Self::Error> {
        match raw {
            1 => Ok(Self::Public),
            other => Err(WalletError::InvalidInput {
                reason: format!("unknown payload type {other}"),
            }),
        }
    }
}

impl fmt::Display for PayloadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public => write!(f, "public"),
        }
    }
}

// ---------------------------------------------------------------------------
// ErrorKind
// ---------------------------------------------------------------------------

/// Machine-readable classification of a [`WalletError`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ErrorKind {
    InvalidMnemonic,
    MalformedBlock,
    InvalidChoice,
    InvalidNumChoices,
    DecryptionFailed,
    NullHandle,
    InternalDerivationFailure,
    InvalidInput,
    TransactionError,
    ConfigError,
}

impl ErrorKind {
    /// Short, stable code for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidMnemonic => "invalid mnemonic",
            Self::MalformedBlock => "malformed block",
            Self::InvalidChoice => "invalid choice",
            Self::InvalidNumChoices => "invalid number of choices",
            Self::DecryptionFailed => "decryption failed",
            Self::NullHandle => "null handle",
            Self::InternalDerivationFailure => "internal derivation failure",
            Self::InvalidInput => "invalid input",
            Self::TransactionError => "transaction error",
            Self::ConfigError => "invalid configuration",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// WalletError
// ---------------------------------------------------------------------------

/// Central error type for the chainwallet workspace.
///
/// All crates convert their internal errors into variants of this enum.
/// Every variant is recoverable by the caller.
#[derive(Debug, Error)]
pub enum WalletError {
    /// Mnemonic has a bad word count, unknown word or failing checksum.
    #[error("invalid mnemonic: {reason}")]
    InvalidMnemonic {
        /// Human-readable description of the failure.
        reason: String,
    },

    /// Ledger snapshot is structurally invalid.
    #[error("malformed block: {reason}")]
    MalformedBlock {
        /// Human-readable description of the failure.
        reason: String,
    },

    /// Vote choice is outside the proposal's range.
    #[error("invalid choice: {reason}")]
    InvalidChoice {
        /// Human-readable description of the failure.
        reason: String,
    },

    /// Proposal declares a number of choices the payload cannot carry.
    #[error("invalid number of choices: {reason}")]
    InvalidNumChoices {
        /// Human-readable description of the failure.
        reason: String,
    },

    /// Authenticated decryption failed or the ciphertext is malformed.
    #[error("decryption failed: {reason}")]
    DecryptionFailed {
        /// Human-readable description of the failure.
        reason: String,
    },

    /// A required handle was absent. Only raised by boundary adapters;
    /// owned Rust values cannot be null.
    #[error("null handle: {reason}")]
    NullHandle {
        /// Name of the missing handle.
        reason: String,
    },

    /// Key derivation produced unusable key material.
    #[error("internal derivation failure: {reason}")]
    InternalDerivationFailure {
        /// Human-readable description of the failure.
        reason: String,
    },

    /// Caller-supplied data is malformed (key bytes, hex, addresses).
    #[error("invalid input: {reason}")]
    InvalidInput {
        /// Human-readable description of the failure.
        reason: String,
    },

    /// Transaction construction or encoding failed.
    #[error("transaction error: {reason}")]
    TransactionError {
        /// Human-readable description of the failure.
        reason: String,
    },

    /// Configuration value is out of range.
    #[error("configuration error: {reason}")]
    ConfigError {
        /// Human-readable description of the failure.
        reason: String,
    },
}

impl WalletError {
    /// Returns the machine-readable kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidMnemonic { .. } => ErrorKind::InvalidMnemonic,
            Self::MalformedBlock { .. } => ErrorKind::MalformedBlock,
            Self::InvalidChoice { .. } => ErrorKind::InvalidChoice,
            Self::InvalidNumChoices { .. } => ErrorKind::InvalidNumChoices,
            Self::DecryptionFailed { .. } => ErrorKind::DecryptionFailed,
            Self::NullHandle { .. } => ErrorKind::NullHandle,
            Self::InternalDerivationFailure { .. } => ErrorKind::InternalDerivationFailure,
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::TransactionError { .. } => ErrorKind::TransactionError,
            Self::ConfigError { .. } => ErrorKind::ConfigError,
        }
    }

    /// Returns the free-text detail carried by this error.
    pub fn reason(&self) -> &str {
        match self {
            Self::InvalidMnemonic { reason }
            | Self::MalformedBlock { reason }
            | Self::InvalidChoice { reason }
            | Self::InvalidNumChoices { reason }
            | Self::DecryptionFailed { reason }
            | Self::NullHandle { reason }
            | Self::InternalDerivationFailure { reason }
            | Self::InvalidInput { reason }
            | Self::TransactionError { reason }
            | Self::ConfigError { reason } => reason,
        }
    }

    /// Builds a [`WalletError::NullHandle`] naming the missing handle.
    pub fn null_handle(what: &str) -> Self {
        Self::NullHandle {
            reason: format!("{what} is not available"),
        }
    }
}

/// Convenience result type for the chainwallet workspace.
pub type Result<T> = std::result::Result<T, WalletError>;

/// Short code for an optional error; `None` means success.
pub fn error_to_string(error: Option<&WalletError>) -> String {
    match error {
        None => "success".to_string(),
        Some(e) => e.kind().as_str().to_string(),
    }
}

/// Detail string for an optional error; `None` means success.
pub fn error_details(error: Option<&WalletError>) -> String {
    match error {
        None => "success".to_string(),
        Some(e) if e.reason().is_empty() => "no more details".to_string(),
        Some(e) => e.reason().to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
