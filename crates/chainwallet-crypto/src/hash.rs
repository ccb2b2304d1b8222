//! Hash functions used for identifiers, address roots and checksums.
//!
//! - BLAKE2b-256 identifies fragments and blocks.
//! - BLAKE2b-224 over SHA3-256 forms legacy address roots.
//! - CRC32 protects the legacy address envelope.

use blake2::digest::consts::{U28, U32};
use blake2::{Blake2b, Digest};
use sha3::Sha3_256;

type Blake2b224 = Blake2b<U28>;
type Blake2b256 = Blake2b<U32>;

/// Computes the BLAKE2b-256 hash of arbitrary data.
pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    let result = Blake2b256::digest(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&result);
    out
}

/// Computes the BLAKE2b-256 hash over several byte slices, in order.
pub fn blake2b_256_concat(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    for part in parts {
        hasher.update(part);
    }
    let result = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&result);
    out
}

/// Computes the BLAKE2b-224 hash of arbitrary data.
pub fn blake2b_224(data: &[u8]) -> [u8; 28] {
    let result = Blake2b224::digest(data);
    let mut out = [0u8; 28];
    out.copy_from_slice(&result);
    out
}

/// Computes the SHA3-256 hash of arbitrary data.
pub fn sha3_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha3_256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&result);
    out
}

/// Legacy address root: `BLAKE2b-224(SHA3-256(data))`.
pub fn address_root_hash(data: &[u8]) -> [u8; 28] {
    blake2b_224(&sha3_256(data))
}

/// IEEE CRC32 checksum.
pub fn crc32(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blake2b_256_empty_vector() {
        assert_eq!(
            hex::encode(blake2b_256(b"")),
            "0e5751c026e543b2e8ab2eb06099daa1d1e5df47778f7787faab45cdf12fe3a8"
        );
    }

    #[test]
    fn sha3_256_empty_vector() {
        assert_eq!(
            hex::encode(sha3_256(b"")),
            "a7ffc6f8bf1ed76651c14756a061d662f580ff4de43b49fa82d80a4b80f8434a"
        );
    }

    #[test]
    fn crc32_check_value() {
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn concat_matches_single_buffer() {
        let joined = blake2b_256(b"hello world");
        let parts = blake2b_256_concat(&[b"hello", b" ", b"world"]);
        assert_eq!(joined, parts);
    }

    #[test]
    fn root_hash_is_deterministic() {
        assert_eq!(address_root_hash(b"abc"), address_root_hash(b"abc"));
        assert_ne!(address_root_hash(b"abc"), address_root_hash(b"abd"));
    }
}
