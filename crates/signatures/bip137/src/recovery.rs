//! Public key recovery from compact recoverable signatures.
//!
//! A compact signature is `flag || r || s` where the flag byte selects one
//! of (up to) four points `R` with `x(R) ≡ r (mod n)`:
//!
//! | flag    | key encoding | recovery id |
//! |---------|--------------|-------------|
//! | 27..=30 | uncompressed | flag - 27   |
//! | 31..=34 | compressed   | flag - 31   |
//!
//! Bit 0 of the recovery id is the parity of `y(R)`, bit 1 tells whether
//! `x(R) = r + n`. The public key is then `Q = r⁻¹·(s·R − e·G)`.
//!
//! Recovered keys are always returned compressed: the flag's compression
//! bit only describes how the signer presented its key.

use num_bigint::BigUint;
use num_traits::Zero;

use crate::{
    error::{Error, InputShapeError, RecoveryError},
    hashing::CryptoHash,
    public_key::CompressedPublicKey,
    secp256k1::{Candidate, Secp256k1},
};

/// `flag || r || s`
pub const SIGNATURE_LEN: usize = 65;

/// Index of the point `R` among the candidates sharing `r`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecoveryId(u8);

impl RecoveryId {
    pub const ALL: [Self; 4] = [Self(0), Self(1), Self(2), Self(3)];

    #[inline]
    pub const fn new(is_y_odd: bool, is_x_reduced: bool) -> Self {
        let mut id = 0;
        if is_y_odd {
            id |= 1;
        }
        if is_x_reduced {
            id |= 2;
        }
        Self(id)
    }

    #[inline]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        if byte <= 3 { Some(Self(byte)) } else { None }
    }

    #[inline]
    pub const fn to_byte(self) -> u8 {
        self.0
    }

    /// `y(R)` is odd
    #[inline]
    pub const fn is_y_odd(self) -> bool {
        self.0 & 1 != 0
    }

    /// `x(R) = r + n`, i.e. `x(R)` was reduced modulo the group order
    #[inline]
    pub const fn is_x_reduced(self) -> bool {
        self.0 & 2 != 0
    }
}

/// Header byte of a compact signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecoveryFlag(u8);

impl RecoveryFlag {
    const UNCOMPRESSED: u8 = 27;
    const COMPRESSED: u8 = 31;

    #[inline]
    pub const fn new(byte: u8) -> Result<Self, RecoveryError> {
        match byte {
            Self::UNCOMPRESSED..=34 => Ok(Self(byte)),
            _ => Err(RecoveryError::InvalidFlag(byte)),
        }
    }

    #[inline]
    pub const fn from_parts(recovery_id: RecoveryId, compressed: bool) -> Self {
        Self(
            recovery_id.to_byte()
                + if compressed {
                    Self::COMPRESSED
                } else {
                    Self::UNCOMPRESSED
                },
        )
    }

    #[inline]
    pub const fn to_byte(self) -> u8 {
        self.0
    }

    #[inline]
    pub const fn is_compressed(self) -> bool {
        self.0 >= Self::COMPRESSED
    }

    #[inline]
    pub const fn recovery_id(self) -> RecoveryId {
        RecoveryId(
            self.0
                - if self.is_compressed() {
                    Self::COMPRESSED
                } else {
                    Self::UNCOMPRESSED
                },
        )
    }
}

/// Compact signature with a valid flag byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecoverableSignature {
    flag: RecoveryFlag,
    r: [u8; 32],
    s: [u8; 32],
}

impl RecoverableSignature {
    #[inline]
    pub const fn new(flag: RecoveryFlag, r: [u8; 32], s: [u8; 32]) -> Self {
        Self { flag, r, s }
    }

    pub fn from_bytes(bytes: &[u8; SIGNATURE_LEN]) -> Result<Self, RecoveryError> {
        let flag = RecoveryFlag::new(bytes[0])?;
        let (mut r, mut s) = ([0u8; 32], [0u8; 32]);
        r.copy_from_slice(&bytes[1..33]);
        s.copy_from_slice(&bytes[33..]);
        Ok(Self { flag, r, s })
    }

    /// Checks the length before looking at any byte
    pub fn from_slice(bytes: &[u8]) -> Result<Self, Error> {
        let bytes: &[u8; SIGNATURE_LEN] = bytes
            .try_into()
            .map_err(|_| InputShapeError::SignatureLength(bytes.len()))?;
        Ok(Self::from_bytes(bytes)?)
    }

    pub fn to_bytes(&self) -> [u8; SIGNATURE_LEN] {
        let mut bytes = [0u8; SIGNATURE_LEN];
        bytes[0] = self.flag.to_byte();
        bytes[1..33].copy_from_slice(&self.r);
        bytes[33..].copy_from_slice(&self.s);
        bytes
    }

    #[inline]
    pub const fn flag(&self) -> RecoveryFlag {
        self.flag
    }

    #[inline]
    pub const fn r(&self) -> &[u8; 32] {
        &self.r
    }

    #[inline]
    pub const fn s(&self) -> &[u8; 32] {
        &self.s
    }

    /// Recovers the key selected by the flag byte
    #[inline]
    pub fn recover(&self, digest: &CryptoHash) -> Result<CompressedPublicKey, RecoveryError> {
        recover_with_id(digest, &self.r, &self.s, self.flag.recovery_id())
    }

    /// Recovers the key for every recovery id, ignoring the flag byte
    pub fn candidates(
        &self,
        digest: &CryptoHash,
    ) -> [(RecoveryId, Result<CompressedPublicKey, RecoveryError>); 4] {
        RecoveryId::ALL.map(|id| (id, recover_with_id(digest, &self.r, &self.s, id)))
    }
}

impl TryFrom<&[u8]> for RecoverableSignature {
    type Error = Error;

    #[inline]
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        Self::from_slice(bytes)
    }
}

/// Recovers the public key that produced `signature` over `digest`
#[inline]
pub fn recover(
    digest: &CryptoHash,
    signature: &RecoverableSignature,
) -> Result<CompressedPublicKey, RecoveryError> {
    signature.recover(digest)
}

/// Parses a scalar in `[1, n)`
fn scalar(bytes: &[u8; 32]) -> Result<BigUint, RecoveryError> {
    let value = BigUint::from_bytes_be(bytes);
    if value.is_zero() || value >= *Secp256k1::get().order() {
        return Err(RecoveryError::InvalidScalar);
    }
    Ok(value)
}

fn recover_with_id(
    digest: &CryptoHash,
    r: &[u8; 32],
    s: &[u8; 32],
    recovery_id: RecoveryId,
) -> Result<CompressedPublicKey, RecoveryError> {
    let curve = Secp256k1::get();
    let (r, s) = (scalar(r)?, scalar(s)?);

    let x_coord = if recovery_id.is_x_reduced() {
        &r + curve.order()
    } else {
        r.clone()
    };
    let point_r = match curve.lift_x(&x_coord, recovery_id.is_y_odd()) {
        Candidate::Found(point) => point,
        candidate @ (Candidate::NoSquareRoot | Candidate::OutOfField) => {
            tracing::trace!(
                recovery_id = recovery_id.to_byte(),
                ?candidate,
                "no curve point"
            );
            return Err(RecoveryError::NoCurvePoint);
        }
    };

    let e = curve.scalar_from_hash(digest);
    let r_inv = curve.scalar_inv(&r);
    // Q = r⁻¹·(s·R − e·G) = (s·r⁻¹)·R + (−e·r⁻¹)·G
    let public_key = curve
        .mul_add(
            &curve.scalar_mul(&s, &r_inv),
            &point_r,
            &curve.scalar_neg(&curve.scalar_mul(&e, &r_inv)),
            curve.generator(),
        )
        .filter(|q| curve.verify_prehash(q, &e, &r, &s))
        .ok_or(RecoveryError::SignatureMismatch)?;

    Ok(CompressedPublicKey(public_key.to_compressed()))
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;
    use rstest::rstest;

    use super::*;
    use crate::secp256k1::to_be_bytes32;

    /// Signature from the UniSat wallet over the `alice.near` message
    const SIGNATURE: [u8; SIGNATURE_LEN] = hex!(
        "1fa1a36fb02bc2602d6d2eeeaf38d3d484be19f18b873e57812beed9cf3adcad3e45cc603850e80fb528f99e3808aecd7022d8d6d73d79eb9db1894cdb308d6035"
    );
    const DIGEST: CryptoHash =
        hex!("9760de189c9c4732ca49733402a2d73f2f5b60b64cad4b3e7201dcd5cb7ce35b");
    const PUBLIC_KEY: [u8; 33] =
        hex!("02a34566eb12250c82912bc46ddd0593dfb4c252594542eee9de9fad45515f42ed");

    const S: [u8; 32] = hex!("3b2f1c0e6d4a5b8c9e7f60a1b2c3d4e5f60718293a4b5c6d7e8f90a1b2c3d4e5");

    fn synthetic(flag: u8, r: u32) -> RecoverableSignature {
        RecoverableSignature::new(
            RecoveryFlag::new(flag).unwrap(),
            to_be_bytes32(&BigUint::from(r)),
            S,
        )
    }

    #[rstest]
    #[case(27, 0, false)]
    #[case(28, 1, false)]
    #[case(29, 2, false)]
    #[case(30, 3, false)]
    #[case(31, 0, true)]
    #[case(32, 1, true)]
    #[case(33, 2, true)]
    #[case(34, 3, true)]
    fn flag(#[case] byte: u8, #[case] id: u8, #[case] compressed: bool) {
        let flag = RecoveryFlag::new(byte).unwrap();
        assert_eq!(flag.recovery_id().to_byte(), id);
        assert_eq!(flag.is_compressed(), compressed);
        assert_eq!(
            RecoveryFlag::from_parts(RecoveryId::from_byte(id).unwrap(), compressed),
            flag
        );
    }

    #[rstest]
    fn invalid_flag(#[values(0, 26, 35, 255)] byte: u8) {
        let mut bytes = SIGNATURE;
        bytes[0] = byte;
        assert_eq!(
            RecoverableSignature::from_bytes(&bytes),
            Err(RecoveryError::InvalidFlag(byte))
        );
        assert_eq!(
            RecoverableSignature::from_slice(&bytes),
            Err(RecoveryError::InvalidFlag(byte).into())
        );
    }

    #[rstest]
    fn invalid_length(#[values(0, 1, 64, 66, 130)] len: usize) {
        assert_eq!(
            RecoverableSignature::from_slice(&vec![31; len]),
            Err(InputShapeError::SignatureLength(len).into())
        );
    }

    #[test]
    fn recovery_id_bits() {
        for id in RecoveryId::ALL {
            assert_eq!(RecoveryId::new(id.is_y_odd(), id.is_x_reduced()), id);
        }
        assert!(RecoveryId::new(true, false).is_y_odd());
        assert!(RecoveryId::new(false, true).is_x_reduced());
        assert_eq!(RecoveryId::from_byte(4), None);
    }

    #[test]
    fn bytes_roundtrip() {
        let signature = RecoverableSignature::from_bytes(&SIGNATURE).unwrap();
        assert_eq!(signature.flag().to_byte(), 31);
        assert_eq!(signature.to_bytes(), SIGNATURE);
    }

    #[test]
    fn recover_reference_signature() {
        let signature = RecoverableSignature::from_bytes(&SIGNATURE).unwrap();
        assert_eq!(
            recover(&DIGEST, &signature),
            Ok(CompressedPublicKey(PUBLIC_KEY))
        );
    }

    #[test]
    fn reference_signature_candidates() {
        let signature = RecoverableSignature::from_bytes(&SIGNATURE).unwrap();
        let [(_, id0), (_, id1), (_, id2), (_, id3)] = signature.candidates(&DIGEST);

        assert_eq!(id0, Ok(CompressedPublicKey(PUBLIC_KEY)));
        assert_eq!(
            id1,
            Ok(CompressedPublicKey(hex!(
                "03cb73a1a50205892ae8692bbb78252e928386717c0e9284003903bbb7fa60020b"
            )))
        );
        // r + n is not a field element
        assert_eq!(id2, Err(RecoveryError::NoCurvePoint));
        assert_eq!(id3, Err(RecoveryError::NoCurvePoint));
    }

    #[test]
    fn compression_bit_does_not_change_key() {
        let mut bytes = SIGNATURE;
        bytes[0] = 27;
        let uncompressed = RecoverableSignature::from_bytes(&bytes).unwrap();
        assert_eq!(
            uncompressed.recover(&DIGEST),
            Ok(CompressedPublicKey(PUBLIC_KEY))
        );
    }

    #[rstest]
    #[case(hex!("0000000000000000000000000000000000000000000000000000000000000000"), S)]
    #[case(S, hex!("0000000000000000000000000000000000000000000000000000000000000000"))]
    #[case(hex!("fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141"), S)]
    #[case(S, hex!("fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141"))]
    #[case(hex!("ffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff"), S)]
    fn invalid_scalar(#[case] r: [u8; 32], #[case] s: [u8; 32]) {
        let signature = RecoverableSignature::new(RecoveryFlag::new(31).unwrap(), r, s);
        for (_, result) in signature.candidates(&DIGEST) {
            assert_eq!(result, Err(RecoveryError::InvalidScalar));
        }
    }

    #[rstest]
    // both `r` and `r + n` lift
    #[case(2, [true, true, true, true])]
    // only `r` lifts
    #[case(1, [true, true, false, false])]
    // only `r + n` lifts
    #[case(7, [false, false, true, true])]
    // neither lifts
    #[case(5, [false, false, false, false])]
    fn synthetic_candidates(#[case] r: u32, #[case] lifts: [bool; 4]) {
        let signature = synthetic(31, r);
        for ((id, result), lifts) in signature.candidates(&DIGEST).into_iter().zip(lifts) {
            match result {
                Ok(public_key) => {
                    assert!(lifts, "{id:?}");
                    assert!(matches!(public_key.0[0], 0x02 | 0x03));
                }
                Err(err) => {
                    assert!(!lifts, "{id:?}");
                    assert_eq!(err, RecoveryError::NoCurvePoint);
                }
            }
        }
    }

    #[test]
    fn synthetic_keys_are_distinct() {
        let signature = synthetic(31, 2);
        let keys: Vec<_> = signature
            .candidates(&DIGEST)
            .into_iter()
            .map(|(_, result)| result.unwrap())
            .collect();
        for (i, a) in keys.iter().enumerate() {
            for b in &keys[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
