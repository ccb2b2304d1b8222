//! Block0 codec.
//!
//! ```text
//! block  = [header, [fragment_bytes...]]
//! header = [version = 0, chain_length = 0, date_secs, parent = 32 zero bytes, content_hash]
//! ```
//!
//! `content_hash` is BLAKE2b-256 over the concatenated fragment ids and
//! the block id is BLAKE2b-256 of the encoded header. Decoding enforces
//! every structural rule of a genesis block; anything else is
//! [`WalletError::MalformedBlock`].

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chainwallet_crypto::hash::{blake2b_256, blake2b_256_concat};
use chainwallet_types::{Block0Date, FragmentId, Result, WalletError};
use ciborium::Value as Cbor;
use serde::{Serialize, Serializer};

use crate::cbor;
use crate::fragment::{fragment_id, Fragment};

/// Header version of a genesis block.
pub const GENESIS_VERSION: u64 = 0;

// ---------------------------------------------------------------------------
// BlockId
// ---------------------------------------------------------------------------

/// BLAKE2b-256 of an encoded block header.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct BlockId([u8; 32]);

impl BlockId {
    /// Fixed byte length.
    pub const LEN: usize = 32;

    /// Wraps raw bytes.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for BlockId {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|e| WalletError::InvalidInput {
            reason: format!("invalid block id hex: {e}"),
        })?;
        let arr: [u8; 32] = bytes.try_into().map_err(|_| WalletError::InvalidInput {
            reason: "block id must be 32 bytes".into(),
        })?;
        Ok(Self(arr))
    }
}

impl Serialize for BlockId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// Genesis block header.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Header {
    /// Genesis time.
    pub date: Block0Date,
    /// Hash of the concatenated fragment ids.
    pub content_hash: [u8; 32],
}

impl Header {
    fn to_cbor(self) -> Cbor {
        Cbor::Array(vec![
            cbor::uint(GENESIS_VERSION),
            cbor::uint(0),
            cbor::uint(self.date.as_secs()),
            Cbor::Bytes(vec![0u8; 32]),
            Cbor::Bytes(self.content_hash.to_vec()),
        ])
    }

    fn from_cbor(value: Cbor) -> Result<Self> {
        let mut items = cbor::array_of(value, 5, "block header")?;

        let version: u64 = cbor::int(&items[0], "header version")?;
        if version != GENESIS_VERSION {
            return Err(WalletError::MalformedBlock {
                reason: format!("header version {version} is not a genesis header"),
            });
        }
        let chain_length: u64 = cbor::int(&items[1], "header chain length")?;
        if chain_length != 0 {
            return Err(WalletError::MalformedBlock {
                reason: format!("chain length {chain_length} is not a genesis header"),
            });
        }
        let date = Block0Date::from_secs(cbor::int(&items[2], "header date")?);

        let content_hash = cbor::fixed_bytes::<32>(items.swap_remove(4), "header content hash")?;
        let parent = cbor::fixed_bytes::<32>(items.swap_remove(3), "header parent")?;
        if parent != [0u8; 32] {
            return Err(WalletError::MalformedBlock {
                reason: "genesis header must have a zero parent".into(),
            });
        }

        Ok(Self { date, content_hash })
    }

    /// Block id of this header.
    pub fn id(&self) -> Result<BlockId> {
        Ok(BlockId(blake2b_256(&cbor::encode(&self.to_cbor())?)))
    }
}

// ---------------------------------------------------------------------------
// Block
// ---------------------------------------------------------------------------

/// Decoded block0.
#[derive(Clone, Debug)]
pub struct Block {
    id: BlockId,
    header: Header,
    fragments: Vec<(FragmentId, Fragment)>,
}

impl Block {
    /// Decodes and validates a genesis block.
    ///
    /// # Errors
    ///
    /// [`WalletError::MalformedBlock`] on truncated input, trailing bytes,
    /// a non-genesis header, a content hash mismatch, a duplicate
    /// fragment, or a missing or incomplete initial fragment.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut items = cbor::array_of(cbor::decode(bytes, "block")?, 2, "block")?;
        let raw_fragments = cbor::array(items.swap_remove(1), "block fragments")?;
        let header = Header::from_cbor(items.swap_remove(0))?;

        let mut seen = HashSet::with_capacity(raw_fragments.len());
        let mut ids = Vec::with_capacity(raw_fragments.len());
        let mut fragments = Vec::with_capacity(raw_fragments.len());

        for raw in raw_fragments {
            let raw = cbor::bytes(raw, "fragment")?;
            let id = fragment_id(&raw);
            if !seen.insert(id) {
                return Err(WalletError::MalformedBlock {
                    reason: format!("duplicate fragment {id}"),
                });
            }
            ids.push(id);
            fragments.push((id, Fragment::from_bytes(&raw)?));
        }

        let parts: Vec<&[u8]> = ids.iter().map(|id| id.as_ref()).collect();
        if blake2b_256_concat(&parts) != header.content_hash {
            return Err(WalletError::MalformedBlock {
                reason: "content hash does not match fragments".into(),
            });
        }

        match fragments.first() {
            Some((_, Fragment::Initial(_))) => {}
            _ => {
                return Err(WalletError::MalformedBlock {
                    reason: "first fragment must be the initial fragment".into(),
                })
            }
        }
        if fragments
            .iter()
            .skip(1)
            .any(|(_, f)| matches!(f, Fragment::Initial(_)))
        {
            return Err(WalletError::MalformedBlock {
                reason: "initial fragment appears more than once".into(),
            });
        }

        Ok(Self {
            id: header.id()?,
            header,
            fragments,
        })
    }

    /// Block id (the block0 hash).
    pub fn id(&self) -> BlockId {
        self.id
    }

    /// Decoded header.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Fragments with their ids, in block order.
    pub fn fragments(&self) -> &[(FragmentId, Fragment)] {
        &self.fragments
    }
}

// ---------------------------------------------------------------------------
// Block0Builder
// ---------------------------------------------------------------------------

/// Assembles an encoded genesis block.
///
/// Used to produce snapshots for tests and tooling; the wallet itself
/// only decodes.
#[derive(Debug, Default)]
pub struct Block0Builder {
    date: Block0Date,
    fragments: Vec<Vec<u8>>,
}

impl Block0Builder {
    /// Starts a block dated `date`.
    pub fn new(date: Block0Date) -> Self {
        Self {
            date,
            fragments: Vec::new(),
        }
    }

    /// Appends a fragment.
    pub fn push(&mut self, fragment: &Fragment) -> Result<&mut Self> {
        self.fragments.push(fragment.to_bytes()?);
        Ok(self)
    }

    /// Appends already-encoded fragment bytes verbatim.
    pub fn push_raw(&mut self, bytes: Vec<u8>) -> &mut Self {
        self.fragments.push(bytes);
        self
    }

    /// Encodes the block.
    pub fn build(&self) -> Result<Vec<u8>> {
        let ids: Vec<FragmentId> = self.fragments.iter().map(|f| fragment_id(f)).collect();
        let parts: Vec<&[u8]> = ids.iter().map(|id| id.as_ref()).collect();
        let header = Header {
            date: self.date,
            content_hash: blake2b_256_concat(&parts),
        };
        cbor::encode(&Cbor::Array(vec![
            header.to_cbor(),
            Cbor::Array(self.fragments.iter().cloned().map(Cbor::Bytes).collect()),
        ]))
    }
}
