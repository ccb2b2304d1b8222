//! BIP32-Ed25519 extended keys and child derivation.
//!
//! An extended private key is 96 bytes:
//!
//! ```text
//! kL (32, clamped scalar) || kR (32, nonce prefix) || chain code (32)
//! ```
//!
//! Child derivation follows the V2 scheme (Khovratovich & Law):
//!
//! ```text
//! hardened: Z = HMAC-SHA512(cc, 0x00 || kL || kR || index_le)
//!           I = HMAC-SHA512(cc, 0x01 || kL || kR || index_le)
//! soft:     Z = HMAC-SHA512(cc, 0x02 || A || index_le)
//!           I = HMAC-SHA512(cc, 0x03 || A || index_le)
//!
//! kL' = 8 * Z[0..28] + kL     kR' = Z[32..64] + kR (mod 2^256)
//! cc' = I[32..64]
//! ```
//!
//! Unlike SLIP-0010, soft (non-hardened) derivation is supported, which
//! the sequential address chains rely on.
//!
//! Random-index wallets were created with the earlier V1 scheme, kept
//! bit-for-bit with its quirks: the index is big endian, `8 * Z[0..32]`
//! is formed byte by byte without carries and added to kL modulo
//! 2^255 - 19, and kR' is a byte-wise sum without carries.
//!
//! Signing uses the extended scalar directly (no seed hashing) through
//! the `ed25519-dalek` hazmat API, so signatures verify as plain
//! Ed25519 against [`XPub::public_key`].

use chainwallet_types::{Result, WalletError};
use curve25519_dalek::Scalar;
use ed25519_dalek::hazmat::{raw_sign, ExpandedSecretKey};
use ed25519_dalek::VerifyingKey;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha512};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::signing::{PublicKey, Signature};

/// HMAC-SHA512 type alias used by child derivation.
type HmacSha512 = Hmac<Sha512>;

/// Hardened indices have the top bit set.
pub const HARDENED_OFFSET: u32 = 0x8000_0000;

/// Size of an extended private key (scalar, nonce prefix, chain code).
pub const XPRV_SIZE: usize = 96;

/// Size of an extended public key (point, chain code).
pub const XPUB_SIZE: usize = 64;

/// Size of an extended secret key without chain code.
pub const EXTENDED_SECRET_KEY_SIZE: usize = 64;

// ---------------------------------------------------------------------------
// DerivationIndex
// ---------------------------------------------------------------------------

/// Child index, hardened when the top bit is set.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct DerivationIndex(u32);

impl DerivationIndex {
    /// Wraps a raw index (hardened bit included).
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Hardened index `n'`.
    pub const fn hardened(n: u32) -> Self {
        Self(n | HARDENED_OFFSET)
    }

    /// Soft index `n`. The top bit is cleared.
    pub const fn soft(n: u32) -> Self {
        Self(n & !HARDENED_OFFSET)
    }

    /// Returns `true` for hardened indices.
    pub const fn is_hardened(&self) -> bool {
        self.0 & HARDENED_OFFSET != 0
    }

    /// Raw index including the hardened bit.
    pub const fn raw(&self) -> u32 {
        self.0
    }
}

/// Child-derivation algorithm.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum DerivationScheme {
    /// Legacy random-index wallets.
    V1,
    /// Everything else.
    #[default]
    V2,
}

// ---------------------------------------------------------------------------
// XPub
// ---------------------------------------------------------------------------

/// Extended public key: 32-byte Ed25519 point plus 32-byte chain code.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct XPub([u8; XPUB_SIZE]);

impl XPub {
    /// Creates an [`XPub`] from raw bytes.
    pub fn from_bytes(bytes: [u8; XPUB_SIZE]) -> Self {
        Self(bytes)
    }

    /// Returns the underlying 64 bytes.
    pub fn as_bytes(&self) -> &[u8; XPUB_SIZE] {
        &self.0
    }

    /// The Ed25519 public key half.
    pub fn public_key(&self) -> PublicKey {
        let mut pk = [0u8; 32];
        pk.copy_from_slice(&self.0[..32]);
        PublicKey::from_bytes(pk)
    }

    /// The chain code half.
    pub fn chain_code(&self) -> &[u8] {
        &self.0[32..]
    }
}

// ---------------------------------------------------------------------------
// XPrv
// ---------------------------------------------------------------------------

/// Extended private key (96 bytes). Zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct XPrv([u8; XPRV_SIZE]);

// XPrv does not implement Clone/Debug to prevent leakage. Use
// `derive` to obtain independent children.

impl XPrv {
    /// Builds an extended key from raw bytes, forcing the scalar into
    /// shape: low three bits cleared, top bit cleared, bit 254 set and
    /// the third-highest bit cleared.
    pub fn normalize_bytes_force3rd(mut bytes: [u8; XPRV_SIZE]) -> Self {
        bytes[0] &= 0b1111_1000;
        bytes[31] &= 0b0001_1111;
        bytes[31] |= 0b0100_0000;
        let xprv = Self(bytes);
        bytes.zeroize();
        xprv
    }

    /// Builds an extended key from a 32-byte secret and chain code by
    /// hashing the secret with SHA-512.
    ///
    /// Fails if the hashed scalar has its third-highest bit set; the
    /// caller is expected to retry with fresh material.
    pub fn from_nonextended_noforce(secret: &[u8; 32], chain_code: &[u8; 32]) -> Result<Self> {
        let digest = Sha512::digest(secret);
        let mut extended = [0u8; 64];
        extended.copy_from_slice(&digest);

        if extended[31] & 0b0010_0000 != 0 {
            extended.zeroize();
            return Err(WalletError::InternalDerivationFailure {
                reason: "hashed secret has the third-highest bit set".into(),
            });
        }

        extended[0] &= 0b1111_1000;
        extended[31] &= 0b0111_1111;
        extended[31] |= 0b0100_0000;

        let mut bytes = [0u8; XPRV_SIZE];
        bytes[..64].copy_from_slice(&extended);
        bytes[64..].copy_from_slice(chain_code);
        extended.zeroize();

        let xprv = Self(bytes);
        bytes.zeroize();
        Ok(xprv)
    }

    /// Returns the extended public key.
    pub fn public(&self) -> XPub {
        let mut out = [0u8; XPUB_SIZE];
        out[..32].copy_from_slice(self.verifying_key().as_bytes());
        out[32..].copy_from_slice(self.chain_code());
        XPub(out)
    }

    /// Chain code bytes.
    pub fn chain_code(&self) -> &[u8] {
        &self.0[64..]
    }

    /// Derives the child key at `index` with the V2 scheme.
    pub fn derive(&self, index: DerivationIndex) -> Result<XPrv> {
        self.derive_with(DerivationScheme::V2, index)
    }

    /// Derives the child key at `index` with `scheme`.
    pub fn derive_with(&self, scheme: DerivationScheme, index: DerivationIndex) -> Result<XPrv> {
        let chain_code = self.chain_code();
        let serialized = match scheme {
            DerivationScheme::V1 => index.raw().to_be_bytes(),
            DerivationScheme::V2 => index.raw().to_le_bytes(),
        };

        let (mut z, i) = if index.is_hardened() {
            let mut data = [0u8; 1 + 64 + 4];
            data[1..65].copy_from_slice(&self.0[..64]);
            data[65..].copy_from_slice(&serialized);

            data[0] = 0x00;
            let z = hmac_sha512(chain_code, &data)?;
            data[0] = 0x01;
            let i = hmac_sha512(chain_code, &data)?;
            data.zeroize();
            (z, i)
        } else {
            let public = self.verifying_key();
            let mut data = [0u8; 1 + 32 + 4];
            data[1..33].copy_from_slice(public.as_bytes());
            data[33..].copy_from_slice(&serialized);

            data[0] = 0x02;
            let z = hmac_sha512(chain_code, &data)?;
            data[0] = 0x03;
            let i = hmac_sha512(chain_code, &data)?;
            (z, i)
        };

        let mut out = [0u8; XPRV_SIZE];
        match scheme {
            DerivationScheme::V1 => {
                out[..32].copy_from_slice(&add_mul8_v1(&self.0[..32], &z[..32]));
                out[32..64].copy_from_slice(&add_bytes_v1(&self.0[32..64], &z[32..]));
            }
            DerivationScheme::V2 => {
                out[..32].copy_from_slice(&add_28_mul8(&self.0[..32], &z[..28]));
                out[32..64].copy_from_slice(&add_256bits(&self.0[32..64], &z[32..]));
            }
        }
        out[64..].copy_from_slice(&i[32..]);
        z.zeroize();

        let child = XPrv(out);
        out.zeroize();
        Ok(child)
    }

    /// Derives along a path of indices with the V2 scheme.
    pub fn derive_path(&self, path: &[DerivationIndex]) -> Result<XPrv> {
        self.derive_path_with(DerivationScheme::V2, path)
    }

    /// Derives along a path of indices with `scheme`.
    pub fn derive_path_with(
        &self,
        scheme: DerivationScheme,
        path: &[DerivationIndex],
    ) -> Result<XPrv> {
        let mut iter = path.iter();
        let mut current = match iter.next() {
            Some(first) => self.derive_with(scheme, *first)?,
            None => {
                return Err(WalletError::InternalDerivationFailure {
                    reason: "empty derivation path".into(),
                })
            }
        };
        for index in iter {
            current = current.derive_with(scheme, *index)?;
        }
        Ok(current)
    }

    /// Signs `message` with the extended scalar.
    pub fn sign(&self, message: &[u8]) -> Signature {
        sign_extended(&self.0[..64], message)
    }

    fn verifying_key(&self) -> VerifyingKey {
        verifying_key_of(&self.0[..64])
    }
}

// ---------------------------------------------------------------------------
// ExtendedSecretKey
// ---------------------------------------------------------------------------

/// Standalone 64-byte extended Ed25519 secret (scalar || nonce prefix),
/// as used by imported account and UTXO keys. Zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ExtendedSecretKey([u8; EXTENDED_SECRET_KEY_SIZE]);

// ExtendedSecretKey does not implement Clone/Debug to prevent leakage.

impl ExtendedSecretKey {
    /// Wraps 64 bytes after checking the scalar shape: low three bits
    /// clear and the top two bits equal to `01`.
    ///
    /// # Errors
    ///
    /// [`WalletError::InvalidInput`] when the scalar is not clamped.
    pub fn from_bytes(bytes: &[u8; EXTENDED_SECRET_KEY_SIZE]) -> Result<Self> {
        if bytes[0] & 0b0000_0111 != 0 || bytes[31] & 0b1100_0000 != 0b0100_0000 {
            return Err(WalletError::InvalidInput {
                reason: "extended secret key scalar is not clamped".into(),
            });
        }
        Ok(Self(*bytes))
    }

    /// Returns the Ed25519 public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey::from_bytes(verifying_key_of(&self.0).to_bytes())
    }

    /// Signs `message` with the extended scalar.
    pub fn sign(&self, message: &[u8]) -> Signature {
        sign_extended(&self.0, message)
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Builds the dalek expanded key from `kL || kR`.
fn expanded_secret(extended: &[u8]) -> ExpandedSecretKey {
    let mut scalar_bytes = [0u8; 32];
    scalar_bytes.copy_from_slice(&extended[..32]);
    let mut hash_prefix = [0u8; 32];
    hash_prefix.copy_from_slice(&extended[32..64]);

    let esk = ExpandedSecretKey {
        scalar: Scalar::from_bytes_mod_order(scalar_bytes),
        hash_prefix,
    };
    scalar_bytes.zeroize();
    hash_prefix.zeroize();
    esk
}

fn verifying_key_of(extended: &[u8]) -> VerifyingKey {
    let esk = expanded_secret(extended);
    VerifyingKey::from(&esk)
}

fn sign_extended(extended: &[u8], message: &[u8]) -> Signature {
    let esk = expanded_secret(extended);
    let vk = VerifyingKey::from(&esk);
    let sig = raw_sign::<Sha512>(&esk, message, &vk);
    Signature::from_bytes(sig.to_bytes())
}

/// `x + 8 * y` where `y` is 28 bytes, little endian.
fn add_28_mul8(x: &[u8], y: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    let mut carry: u16 = 0;
    for i in 0..28 {
        let r = u16::from(x[i]) + (u16::from(y[i]) << 3) + carry;
        out[i] = (r & 0xff) as u8;
        carry = r >> 8;
    }
    for i in 28..32 {
        let r = u16::from(x[i]) + carry;
        out[i] = (r & 0xff) as u8;
        carry = r >> 8;
    }
    out
}

/// `x + y mod 2^256`, little endian.
fn add_256bits(x: &[u8], y: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    let mut carry: u16 = 0;
    for i in 0..32 {
        let r = u16::from(x[i]) + u16::from(y[i]) + carry;
        out[i] = (r & 0xff) as u8;
        carry = r >> 8;
    }
    out
}

/// V1 `kL + 8 * zL`: each byte of `zL` shifted left by three on its own,
/// then both read as field elements and added modulo 2^255 - 19.
fn add_mul8_v1(x: &[u8], y: &[u8]) -> [u8; 32] {
    let mut y8 = [0u8; 32];
    for (out, b) in y8.iter_mut().zip(y) {
        *out = b << 3;
    }
    let sum = fe_add(&fe_limbs(x), &fe_limbs(&y8));
    y8.zeroize();
    sum
}

/// V1 `kR + zR`: byte-wise, carries dropped.
fn add_bytes_v1(x: &[u8], y: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    for ((o, a), b) in out.iter_mut().zip(x).zip(y) {
        *o = a.wrapping_add(*b);
    }
    out
}

/// 2^255 - 19 as little-endian 64-bit limbs.
const FIELD_PRIME: [u64; 4] = [
    0xffff_ffff_ffff_ffed,
    0xffff_ffff_ffff_ffff,
    0xffff_ffff_ffff_ffff,
    0x7fff_ffff_ffff_ffff,
];

/// Reads 32 little-endian bytes as limbs, ignoring bit 255.
fn fe_limbs(bytes: &[u8]) -> [u64; 4] {
    let mut limbs = [0u64; 4];
    for (limb, chunk) in limbs.iter_mut().zip(bytes.chunks_exact(8)) {
        let mut word = [0u8; 8];
        word.copy_from_slice(chunk);
        *limb = u64::from_le_bytes(word);
    }
    limbs[3] &= FIELD_PRIME[3];
    limbs
}

/// `x + y mod 2^255 - 19` for `x, y < 2^255`, canonical bytes out.
fn fe_add(x: &[u64; 4], y: &[u64; 4]) -> [u8; 32] {
    let mut sum = [0u64; 4];
    let mut carry = 0u128;
    for i in 0..4 {
        let r = u128::from(x[i]) + u128::from(y[i]) + carry;
        sum[i] = r as u64;
        carry = r >> 64;
    }

    // sum < 2^256 < 3p, so at most two subtractions.
    while !limbs_lt(&sum, &FIELD_PRIME) {
        let mut borrow = 0u64;
        for i in 0..4 {
            let (d, b1) = sum[i].overflowing_sub(FIELD_PRIME[i]);
            let (d, b2) = d.overflowing_sub(borrow);
            sum[i] = d;
            borrow = u64::from(b1 || b2);
        }
    }

    let mut out = [0u8; 32];
    for (chunk, limb) in out.chunks_exact_mut(8).zip(sum) {
        chunk.copy_from_slice(&limb.to_le_bytes());
    }
    out
}

fn limbs_lt(a: &[u64; 4], b: &[u64; 4]) -> bool {
    for i in (0..4).rev() {
        if a[i] != b[i] {
            return a[i] < b[i];
        }
    }
    false
}

/// Computes HMAC-SHA512 and returns the 64-byte output.
pub(crate) fn hmac_sha512(key: &[u8], data: &[u8]) -> Result<[u8; 64]> {
    let mut mac = HmacSha512::new_from_slice(key).map_err(|e| {
        WalletError::InternalDerivationFailure {
            reason: format!("HMAC-SHA512 key init failed: {e}"),
        }
    })?;
    mac.update(data);
    let result = mac.finalize().into_bytes();

    let mut output = [0u8; 64];
    output.copy_from_slice(&result);
    Ok(output)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signing::verify;

    fn test_root() -> XPrv {
        let mut bytes = [0u8; XPRV_SIZE];
        for (i, b) in bytes.iter_mut().enumerate() {
            *b = i as u8;
        }
        XPrv::normalize_bytes_force3rd(bytes)
    }

    #[test]
    fn normalization_clamps_scalar() {
        let root = XPrv::normalize_bytes_force3rd([0xFF; XPRV_SIZE]);
        assert_eq!(root.0[0] & 0b111, 0);
        assert_eq!(root.0[31] & 0b1110_0000, 0b0100_0000);
    }

    #[test]
    fn derivation_is_deterministic() -> std::result::Result<(), WalletError> {
        let root = test_root();
        let a = root.derive(DerivationIndex::hardened(44))?.public();
        let b = root.derive(DerivationIndex::hardened(44))?.public();
        assert_eq!(a, b);
        Ok(())
    }

    #[test]
    fn hardened_and_soft_children_differ() -> std::result::Result<(), WalletError> {
        let root = test_root();
        let hard = root.derive(DerivationIndex::hardened(0))?.public();
        let soft = root.derive(DerivationIndex::soft(0))?.public();
        assert_ne!(hard, soft);
        Ok(())
    }

    #[test]
    fn derived_keys_keep_scalar_shape() -> std::result::Result<(), WalletError> {
        let child = test_root().derive_path(&[
            DerivationIndex::hardened(44),
            DerivationIndex::hardened(1815),
            DerivationIndex::hardened(0),
            DerivationIndex::soft(0),
            DerivationIndex::soft(7),
        ])?;
        assert_eq!(child.0[0] & 0b111, 0);
        Ok(())
    }

    #[test]
    fn v1_children_differ_from_v2_and_sign() -> std::result::Result<(), WalletError> {
        let root = test_root();
        for index in [DerivationIndex::hardened(3), DerivationIndex::soft(3)] {
            let v1 = root.derive_with(DerivationScheme::V1, index)?;
            let v2 = root.derive_with(DerivationScheme::V2, index)?;
            assert_ne!(v1.public(), v2.public());

            let sig = v1.sign(b"legacy");
            verify(&v1.public().public_key(), b"legacy", &sig)?;
        }
        Ok(())
    }

    #[test]
    fn field_addition_wraps_at_prime() {
        let mut p_minus_one = [0xffu8; 32];
        p_minus_one[0] = 0xec;
        p_minus_one[31] = 0x7f;
        let mut two = [0u8; 32];
        two[0] = 2;

        let mut one = [0u8; 32];
        one[0] = 1;
        assert_eq!(fe_add(&fe_limbs(&p_minus_one), &fe_limbs(&two)), one);

        // Bit 255 is ignored on input.
        let mut high = two;
        high[31] = 0x80;
        assert_eq!(fe_add(&fe_limbs(&high), &fe_limbs(&[0u8; 32])), two);
    }

    #[test]
    fn v1_byte_arithmetic_drops_carries() {
        assert_eq!(add_bytes_v1(&[0xff; 32], &[0x01; 32]), [0u8; 32]);

        // 0x21 << 3 keeps only its low byte, 0x08.
        let mut y = [0u8; 32];
        y[0] = 0x21;
        let mut expected = [0u8; 32];
        expected[0] = 0x08;
        assert_eq!(add_mul8_v1(&[0u8; 32], &y), expected);
    }

    #[test]
    fn xprv_signature_verifies() -> std::result::Result<(), WalletError> {
        let child = test_root().derive(DerivationIndex::soft(3))?;
        let sig = child.sign(b"conversion");
        verify(&child.public().public_key(), b"conversion", &sig)?;
        assert!(verify(&child.public().public_key(), b"tampered", &sig).is_err());
        Ok(())
    }

    #[test]
    fn empty_path_rejected() {
        assert!(test_root().derive_path(&[]).is_err());
    }

    #[test]
    fn extended_secret_key_shape_checked() {
        let mut bytes = [0u8; 64];
        bytes[31] = 0b0100_0000;
        assert!(ExtendedSecretKey::from_bytes(&bytes).is_ok());

        bytes[0] = 1;
        assert!(ExtendedSecretKey::from_bytes(&bytes).is_err());

        bytes[0] = 0;
        bytes[31] = 0b1100_0000;
        assert!(ExtendedSecretKey::from_bytes(&bytes).is_err());
    }

    #[test]
    fn extended_secret_key_signs() -> std::result::Result<(), WalletError> {
        let mut bytes = [7u8; 64];
        bytes[0] &= 0b1111_1000;
        bytes[31] = (bytes[31] & 0b0011_1111) | 0b0100_0000;
        let key = ExtendedSecretKey::from_bytes(&bytes)?;
        let sig = key.sign(b"utxo witness");
        verify(&key.public_key(), b"utxo witness", &sig)?;
        Ok(())
    }

    #[test]
    fn from_nonextended_either_succeeds_or_reports() {
        let mut successes = 0;
        for i in 0u8..16 {
            match XPrv::from_nonextended_noforce(&[i; 32], &[0u8; 32]) {
                Ok(xprv) => {
                    assert_eq!(xprv.0[31] & 0b1110_0000, 0b0100_0000);
                    successes += 1;
                }
                Err(e) => assert!(matches!(e, WalletError::InternalDerivationFailure { .. })),
            }
        }
        assert!(successes > 0);
    }
}
