//! CBOR helpers shared by the codecs of this crate.
//!
//! Decoding helpers consume a [`Value`] and return
//! [`WalletError::MalformedBlock`] naming the offending field, so every
//! structural problem in a snapshot surfaces with context.

use chainwallet_types::{Result, WalletError};
use ciborium::Value;

// ---------------------------------------------------------------------------
// Encode
// ---------------------------------------------------------------------------

/// Serializes a value to CBOR bytes.
pub(crate) fn encode(value: &Value) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    ciborium::into_writer(value, &mut out).map_err(|e| WalletError::TransactionError {
        reason: format!("CBOR serialization failed: {e}"),
    })?;
    Ok(out)
}

/// Unsigned integer value.
pub(crate) fn uint(n: u64) -> Value {
    Value::Integer(n.into())
}

// ---------------------------------------------------------------------------
// Decode
// ---------------------------------------------------------------------------

/// Deserializes exactly one CBOR item; trailing bytes are rejected.
pub(crate) fn decode(bytes: &[u8], what: &str) -> Result<Value> {
    let mut reader = bytes;
    let value: Value = ciborium::from_reader(&mut reader).map_err(|e| malformed(what, &e))?;
    if !reader.is_empty() {
        return Err(WalletError::MalformedBlock {
            reason: format!("{what}: {} trailing bytes", reader.len()),
        });
    }
    Ok(value)
}

/// Unwraps an array.
pub(crate) fn array(value: Value, what: &str) -> Result<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items),
        _ => Err(WalletError::MalformedBlock {
            reason: format!("{what}: expected CBOR array"),
        }),
    }
}

/// Unwraps an array of exactly `len` items.
pub(crate) fn array_of(value: Value, len: usize, what: &str) -> Result<Vec<Value>> {
    let items = array(value, what)?;
    if items.len() != len {
        return Err(WalletError::MalformedBlock {
            reason: format!("{what}: expected {len} items, got {}", items.len()),
        });
    }
    Ok(items)
}

/// Unwraps a byte string.
pub(crate) fn bytes(value: Value, what: &str) -> Result<Vec<u8>> {
    match value {
        Value::Bytes(b) => Ok(b),
        _ => Err(WalletError::MalformedBlock {
            reason: format!("{what}: expected CBOR byte string"),
        }),
    }
}

/// Unwraps a byte string of exactly `N` bytes.
pub(crate) fn fixed_bytes<const N: usize>(value: Value, what: &str) -> Result<[u8; N]> {
    let b = bytes(value, what)?;
    if b.len() != N {
        return Err(WalletError::MalformedBlock {
            reason: format!("{what}: expected {N} bytes, got {}", b.len()),
        });
    }
    let mut arr = [0u8; N];
    arr.copy_from_slice(&b);
    Ok(arr)
}

/// Unwraps an unsigned integer that fits in `T`.
pub(crate) fn int<T: TryFrom<ciborium::value::Integer>>(value: &Value, what: &str) -> Result<T> {
    match value {
        Value::Integer(i) => T::try_from(*i).map_err(|_| WalletError::MalformedBlock {
            reason: format!("{what}: integer out of range"),
        }),
        _ => Err(WalletError::MalformedBlock {
            reason: format!("{what}: expected CBOR integer"),
        }),
    }
}

fn malformed(what: &str, e: &dyn std::fmt::Display) -> WalletError {
    WalletError::MalformedBlock {
        reason: format!("{what}: CBOR deserialization failed: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_bytes_rejected() -> std::result::Result<(), WalletError> {
        let mut encoded = encode(&uint(7))?;
        encoded.push(0x00);
        assert!(matches!(
            decode(&encoded, "item"),
            Err(WalletError::MalformedBlock { .. })
        ));
        Ok(())
    }

    #[test]
    fn fixed_bytes_checks_length() {
        let v = Value::Bytes(vec![1, 2, 3]);
        assert!(fixed_bytes::<4>(v, "id").is_err());
    }

    #[test]
    fn int_rejects_overflow() {
        assert!(int::<u8>(&uint(256), "index").is_err());
        assert!(matches!(int::<u8>(&uint(255), "index"), Ok(255)));
    }
}
