//! Ledger addresses.
//!
//! Two families coexist in a genesis snapshot:
//!
//! - **Native** [`Address`]: one header byte followed by a 32-byte
//!   Ed25519 key. The header carries the discrimination (`0x80` for
//!   test) OR-ed with the kind (`0x03` single, `0x05` account). Text
//!   form is bech32 with hrp `ca` (production) or `ta` (test).
//! - **Legacy** [`LegacyAddress`]: the bootstrap-era format
//!   `CBOR [Tag 24 (bytes inner), crc32(inner)]` with
//!   `inner = CBOR [root, attributes, type]`. Text form is base58.
//!
//! A legacy address commits to its extended public key through the
//! 28-byte root `BLAKE2b-224(SHA3-256(CBOR [type, [0, xpub], attributes]))`,
//! so ownership is tested by recomputing the root.

use std::fmt;
use std::str::FromStr;

use bech32::{FromBase32, ToBase32, Variant};
use chainwallet_crypto::hash::{address_root_hash, crc32};
use chainwallet_crypto::signing::PublicKey;
use chainwallet_crypto::xprv::XPub;
use chainwallet_types::{Discrimination, Result, WalletError};
use ciborium::Value;

use crate::cbor;

/// Bech32 prefix of production addresses.
pub const PRODUCTION_HRP: &str = "ca";

/// Bech32 prefix of test addresses.
pub const TEST_HRP: &str = "ta";

const TEST_FLAG: u8 = 0x80;
const KIND_SINGLE: u8 = 0x03;
const KIND_ACCOUNT: u8 = 0x05;

// ---------------------------------------------------------------------------
// Native addresses
// ---------------------------------------------------------------------------

/// What a native address pays to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Kind {
    /// UTXO output spendable by the key's owner.
    Single(PublicKey),
    /// Credit to the account identified by the key.
    Account(PublicKey),
}

/// Native address: discrimination plus kind.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Address {
    discrimination: Discrimination,
    kind: Kind,
}

impl Address {
    /// Encoded length in bytes.
    pub const LEN: usize = 33;

    /// Single (UTXO) address for `key`.
    pub fn single(discrimination: Discrimination, key: PublicKey) -> Self {
        Self {
            discrimination,
            kind: Kind::Single(key),
        }
    }

    /// Account address for `key`.
    pub fn account(discrimination: Discrimination, key: PublicKey) -> Self {
        Self {
            discrimination,
            kind: Kind::Account(key),
        }
    }

    /// Network tag.
    pub fn discrimination(&self) -> Discrimination {
        self.discrimination
    }

    /// Address kind.
    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    /// Returns `true` for account addresses.
    pub fn is_account(&self) -> bool {
        matches!(self.kind, Kind::Account(_))
    }

    /// Binary form: header byte followed by the public key.
    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let (kind, key) = match &self.kind {
            Kind::Single(pk) => (KIND_SINGLE, pk),
            Kind::Account(pk) => (KIND_ACCOUNT, pk),
        };
        let flag = match self.discrimination {
            Discrimination::Production => 0,
            Discrimination::Test => TEST_FLAG,
        };
        let mut out = [0u8; Self::LEN];
        out[0] = flag | kind;
        out[1..].copy_from_slice(key.as_bytes());
        out
    }

    /// Parses the binary form.
    ///
    /// # Errors
    ///
    /// [`WalletError::MalformedBlock`] on a wrong length or unknown kind.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::parse(bytes).map_err(|reason| WalletError::MalformedBlock { reason })
    }

    fn parse(bytes: &[u8]) -> std::result::Result<Self, String> {
        if bytes.len() != Self::LEN {
            return Err(format!(
                "address must be {} bytes, got {}",
                Self::LEN,
                bytes.len()
            ));
        }
        let header = bytes[0];
        let discrimination = if header & TEST_FLAG != 0 {
            Discrimination::Test
        } else {
            Discrimination::Production
        };
        let mut key = [0u8; 32];
        key.copy_from_slice(&bytes[1..]);
        let key = PublicKey::from_bytes(key);
        let kind = match header & !TEST_FLAG {
            KIND_SINGLE => Kind::Single(key),
            KIND_ACCOUNT => Kind::Account(key),
            other => return Err(format!("unknown address kind 0x{other:02x}")),
        };
        Ok(Self {
            discrimination,
            kind,
        })
    }

    /// Bech32 text form.
    pub fn to_bech32(&self) -> Result<String> {
        let hrp = match self.discrimination {
            Discrimination::Production => PRODUCTION_HRP,
            Discrimination::Test => TEST_HRP,
        };
        bech32::encode(hrp, self.to_bytes().to_base32(), Variant::Bech32).map_err(|e| {
            WalletError::InvalidInput {
                reason: format!("bech32 encoding failed: {e}"),
            }
        })
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self.to_bech32().map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

impl FromStr for Address {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self> {
        let (hrp, data, variant) = bech32::decode(s).map_err(|e| WalletError::InvalidInput {
            reason: format!("invalid bech32 address: {e}"),
        })?;
        if variant != Variant::Bech32 {
            return Err(WalletError::InvalidInput {
                reason: "address must use the bech32 variant".into(),
            });
        }
        let bytes = Vec::<u8>::from_base32(&data).map_err(|e| WalletError::InvalidInput {
            reason: format!("invalid bech32 payload: {e}"),
        })?;
        let address = Self::parse(&bytes).map_err(|reason| WalletError::InvalidInput { reason })?;

        let expected = match address.discrimination {
            Discrimination::Production => PRODUCTION_HRP,
            Discrimination::Test => TEST_HRP,
        };
        if hrp != expected {
            return Err(WalletError::InvalidInput {
                reason: format!("prefix '{hrp}' does not match discrimination '{expected}'"),
            });
        }
        Ok(address)
    }
}

// ---------------------------------------------------------------------------
// Legacy addresses
// ---------------------------------------------------------------------------

/// Address type of a public-key legacy address.
pub const LEGACY_TYPE_PUBKEY: u64 = 0;

const ATTR_HD_PAYLOAD: u64 = 1;
const ATTR_PROTOCOL_MAGIC: u64 = 2;

/// Decoded legacy attributes. Unknown attribute keys are kept in the
/// raw encoding but not exposed.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct LegacyAttributes {
    /// Encrypted derivation path (Daedalus addresses only).
    pub hd_payload: Option<Vec<u8>>,
    /// Network magic (test networks only).
    pub protocol_magic: Option<u32>,
}

impl LegacyAttributes {
    fn to_value(&self) -> Result<Value> {
        let mut entries = Vec::new();
        if let Some(payload) = &self.hd_payload {
            let inner = cbor::encode(&Value::Bytes(payload.clone()))?;
            entries.push((cbor::uint(ATTR_HD_PAYLOAD), Value::Bytes(inner)));
        }
        if let Some(magic) = self.protocol_magic {
            let inner = cbor::encode(&cbor::uint(u64::from(magic)))?;
            entries.push((cbor::uint(ATTR_PROTOCOL_MAGIC), Value::Bytes(inner)));
        }
        Ok(Value::Map(entries))
    }

    fn from_value(value: Value) -> Result<Self> {
        let entries = match value {
            Value::Map(entries) => entries,
            _ => {
                return Err(WalletError::MalformedBlock {
                    reason: "legacy attributes: expected CBOR map".into(),
                })
            }
        };

        let mut attributes = Self::default();
        for (key, value) in entries {
            match cbor::int::<u64>(&key, "legacy attribute key")? {
                ATTR_HD_PAYLOAD => {
                    let wrapped = cbor::bytes(value, "hd payload")?;
                    let inner = cbor::decode(&wrapped, "hd payload")?;
                    attributes.hd_payload = Some(cbor::bytes(inner, "hd payload")?);
                }
                ATTR_PROTOCOL_MAGIC => {
                    let wrapped = cbor::bytes(value, "protocol magic")?;
                    let inner = cbor::decode(&wrapped, "protocol magic")?;
                    attributes.protocol_magic = Some(cbor::int(&inner, "protocol magic")?);
                }
                _ => {}
            }
        }
        Ok(attributes)
    }
}

/// Bootstrap-era address, kept together with its exact encoding.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct LegacyAddress {
    bytes: Vec<u8>,
    root: [u8; 28],
    addr_type: u64,
    attributes: LegacyAttributes,
    attributes_cbor: Vec<u8>,
}

impl LegacyAddress {
    /// Builds the public-key address of `xpub` with `attributes`.
    pub fn new(xpub: &XPub, attributes: LegacyAttributes) -> Result<Self> {
        let attributes_cbor = cbor::encode(&attributes.to_value()?)?;
        let root = spending_root(LEGACY_TYPE_PUBKEY, xpub, &attributes_cbor)?;

        let attr_value = cbor::decode(&attributes_cbor, "legacy attributes")?;
        let inner = cbor::encode(&Value::Array(vec![
            Value::Bytes(root.to_vec()),
            attr_value,
            cbor::uint(LEGACY_TYPE_PUBKEY),
        ]))?;
        let bytes = cbor::encode(&Value::Array(vec![
            Value::Tag(24, Box::new(Value::Bytes(inner.clone()))),
            cbor::uint(u64::from(crc32(&inner))),
        ]))?;

        Ok(Self {
            bytes,
            root,
            addr_type: LEGACY_TYPE_PUBKEY,
            attributes,
            attributes_cbor,
        })
    }

    /// Parses the binary form, checking the CRC.
    ///
    /// # Errors
    ///
    /// [`WalletError::MalformedBlock`] on any structural problem.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let outer = cbor::decode(bytes, "legacy address")?;
        let mut outer = cbor::array_of(outer, 2, "legacy address")?;
        let checksum: u32 = cbor::int(&outer[1], "legacy address crc")?;
        let inner = match outer.swap_remove(0) {
            Value::Tag(24, boxed) => cbor::bytes(*boxed, "legacy address payload")?,
            _ => {
                return Err(WalletError::MalformedBlock {
                    reason: "legacy address: expected tag 24".into(),
                })
            }
        };
        if crc32(&inner) != checksum {
            return Err(WalletError::MalformedBlock {
                reason: "legacy address: crc mismatch".into(),
            });
        }

        let fields = cbor::decode(&inner, "legacy address payload")?;
        let mut fields = cbor::array_of(fields, 3, "legacy address payload")?;
        let addr_type: u64 = cbor::int(&fields[2], "legacy address type")?;
        let attr_value = fields.swap_remove(1);
        let root = cbor::fixed_bytes::<28>(fields.swap_remove(0), "legacy address root")?;
        let attributes_cbor = cbor::encode(&attr_value)?;
        let attributes = LegacyAttributes::from_value(attr_value)?;

        Ok(Self {
            bytes: bytes.to_vec(),
            root,
            addr_type,
            attributes,
            attributes_cbor,
        })
    }

    /// Exact binary form.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The 28-byte root.
    pub fn root(&self) -> &[u8; 28] {
        &self.root
    }

    /// Decoded attributes.
    pub fn attributes(&self) -> &LegacyAttributes {
        &self.attributes
    }

    /// Encrypted derivation path, if any.
    pub fn hd_payload(&self) -> Option<&[u8]> {
        self.attributes.hd_payload.as_deref()
    }

    /// Returns `true` if this address was built from `xpub`.
    pub fn is_derived_from(&self, xpub: &XPub) -> bool {
        spending_root(self.addr_type, xpub, &self.attributes_cbor)
            .map(|root| root == self.root)
            .unwrap_or(false)
    }
}

impl fmt::Display for LegacyAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(&self.bytes).into_string())
    }
}

impl FromStr for LegacyAddress {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| WalletError::InvalidInput {
                reason: format!("invalid base58 address: {e}"),
            })?;
        Self::from_bytes(&bytes).map_err(|e| WalletError::InvalidInput {
            reason: e.reason().to_string(),
        })
    }
}

/// `BLAKE2b-224(SHA3-256(CBOR [type, [0, xpub], attributes]))`, with the
/// attributes spliced in from their original encoding.
fn spending_root(addr_type: u64, xpub: &XPub, attributes_cbor: &[u8]) -> Result<[u8; 28]> {
    let mut preimage = vec![0x83];
    preimage.extend_from_slice(&cbor::encode(&cbor::uint(addr_type))?);
    preimage.extend_from_slice(&cbor::encode(&Value::Array(vec![
        cbor::uint(0),
        Value::Bytes(xpub.as_bytes().to_vec()),
    ]))?);
    preimage.extend_from_slice(attributes_cbor);
    Ok(address_root_hash(&preimage))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
