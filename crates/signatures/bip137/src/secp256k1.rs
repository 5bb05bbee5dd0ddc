//! secp256k1 arithmetic over arbitrary-precision integers
//!
//! The curve is `y² = x³ + 7` over the prime field `F_p` with
//! `p = 2²⁵⁶ - 2³² - 977`. Field elements and scalars are kept reduced,
//! points are added in Jacobian coordinates `(X, Y, Z) ~ (X/Z², Y/Z³)` so
//! that only a single field inversion is needed per scalar multiplication.
//!
//! Nothing here is constant-time: it only ever processes public data.

use std::sync::LazyLock;

use hex_literal::hex;
use num_bigint::BigUint;
use num_traits::{One, Zero};

/// SEC1 size of a compressed point
pub const COMPRESSED_LEN: usize = 33;

static SECP256K1: LazyLock<Secp256k1> = LazyLock::new(Secp256k1::new);

/// Point on the curve in affine coordinates, never the point at infinity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AffinePoint {
    pub x: BigUint,
    pub y: BigUint,
}

impl AffinePoint {
    pub fn is_on_curve(&self) -> bool {
        let curve = Secp256k1::get();
        self.x < curve.p && self.y < curve.p && curve.square(&self.y) == curve.rhs(&self.x)
    }

    /// SEC1 compressed encoding: parity tag followed by big-endian `x`
    pub fn to_compressed(&self) -> [u8; COMPRESSED_LEN] {
        let mut out = [0u8; COMPRESSED_LEN];
        out[0] = if is_odd(&self.y) { 0x03 } else { 0x02 };
        out[1..].copy_from_slice(&to_be_bytes32(&self.x));
        out
    }

    pub fn from_compressed(bytes: &[u8; COMPRESSED_LEN]) -> Option<Self> {
        let y_is_odd = match bytes[0] {
            0x02 => false,
            0x03 => true,
            _ => return None,
        };
        match Secp256k1::get().lift_x(&BigUint::from_bytes_be(&bytes[1..]), y_is_odd) {
            Candidate::Found(point) => Some(point),
            Candidate::NoSquareRoot | Candidate::OutOfField => None,
        }
    }
}

/// Outcome of lifting an x-coordinate onto the curve
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidate {
    Found(AffinePoint),
    /// `x³ + 7` is not a quadratic residue modulo `p`
    NoSquareRoot,
    /// `x` is not a field element, i.e. `x >= p`
    OutOfField,
}

/// `Z == 0` is the point at infinity
#[derive(Debug, Clone)]
struct JacobianPoint {
    x: BigUint,
    y: BigUint,
    z: BigUint,
}

impl JacobianPoint {
    fn infinity() -> Self {
        Self {
            x: BigUint::one(),
            y: BigUint::one(),
            z: BigUint::zero(),
        }
    }

    fn is_infinity(&self) -> bool {
        self.z.is_zero()
    }
}

impl From<&AffinePoint> for JacobianPoint {
    fn from(point: &AffinePoint) -> Self {
        Self {
            x: point.x.clone(),
            y: point.y.clone(),
            z: BigUint::one(),
        }
    }
}

pub struct Secp256k1 {
    /// Field prime
    p: BigUint,
    /// Group order
    n: BigUint,
    /// Generator
    g: AffinePoint,
    /// `(p + 1) / 4`, square root exponent as `p ≡ 3 (mod 4)`
    sqrt_exp: BigUint,
    /// `p - 2`, inversion exponent in `F_p`
    p_inv_exp: BigUint,
    /// `n - 2`, inversion exponent in `F_n`
    n_inv_exp: BigUint,
}

impl Secp256k1 {
    fn new() -> Self {
        let p = BigUint::from_bytes_be(&hex!(
            "fffffffffffffffffffffffffffffffffffffffffffffffffffffffefffffc2f"
        ));
        let n = BigUint::from_bytes_be(&hex!(
            "fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141"
        ));
        let g = AffinePoint {
            x: BigUint::from_bytes_be(&hex!(
                "79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798"
            )),
            y: BigUint::from_bytes_be(&hex!(
                "483ada7726a3c4655da4fbfc0e1108a8fd17b448a68554199c47d08ffb10d4b8"
            )),
        };
        Self {
            sqrt_exp: (&p + 1u32) >> 2,
            p_inv_exp: &p - 2u32,
            n_inv_exp: &n - 2u32,
            p,
            n,
            g,
        }
    }

    #[inline]
    pub fn get() -> &'static Self {
        &SECP256K1
    }

    #[inline]
    pub const fn field_prime(&self) -> &BigUint {
        &self.p
    }

    #[inline]
    pub const fn order(&self) -> &BigUint {
        &self.n
    }

    #[inline]
    pub const fn generator(&self) -> &AffinePoint {
        &self.g
    }

    // F_p

    fn add(&self, a: &BigUint, b: &BigUint) -> BigUint {
        (a + b) % &self.p
    }

    fn sub(&self, a: &BigUint, b: &BigUint) -> BigUint {
        (a + &self.p - b) % &self.p
    }

    fn mul(&self, a: &BigUint, b: &BigUint) -> BigUint {
        (a * b) % &self.p
    }

    fn square(&self, a: &BigUint) -> BigUint {
        self.mul(a, a)
    }

    fn small_mul(&self, a: &BigUint, k: u32) -> BigUint {
        (a * k) % &self.p
    }

    fn inv(&self, a: &BigUint) -> BigUint {
        a.modpow(&self.p_inv_exp, &self.p)
    }

    /// `x³ + 7`
    fn rhs(&self, x: &BigUint) -> BigUint {
        self.add(&self.mul(&self.square(x), x), &BigUint::from(7u32))
    }

    /// Square root in `F_p`, if `a` is a quadratic residue
    pub fn sqrt(&self, a: &BigUint) -> Option<BigUint> {
        let root = a.modpow(&self.sqrt_exp, &self.p);
        (self.square(&root) == a % &self.p).then_some(root)
    }

    /// Finds the curve point with the given `x` and `y` parity
    pub fn lift_x(&self, x: &BigUint, y_is_odd: bool) -> Candidate {
        if *x >= self.p {
            return Candidate::OutOfField;
        }
        let Some(y) = self.sqrt(&self.rhs(x)) else {
            return Candidate::NoSquareRoot;
        };
        let y = if is_odd(&y) == y_is_odd {
            y
        } else {
            self.sub(&BigUint::zero(), &y)
        };
        Candidate::Found(AffinePoint { x: x.clone(), y })
    }

    // F_n

    pub fn scalar_mul(&self, a: &BigUint, b: &BigUint) -> BigUint {
        (a * b) % &self.n
    }

    pub fn scalar_neg(&self, a: &BigUint) -> BigUint {
        (&self.n - a % &self.n) % &self.n
    }

    /// Inverse of a non-zero scalar
    pub fn scalar_inv(&self, a: &BigUint) -> BigUint {
        a.modpow(&self.n_inv_exp, &self.n)
    }

    /// Interprets a 32-byte hash as a scalar, as ECDSA does for 256-bit
    /// curves
    pub fn scalar_from_hash(&self, hash: &[u8; 32]) -> BigUint {
        BigUint::from_bytes_be(hash) % &self.n
    }

    // group law

    fn double(&self, point: &JacobianPoint) -> JacobianPoint {
        if point.is_infinity() || point.y.is_zero() {
            return JacobianPoint::infinity();
        }
        let yy = self.square(&point.y);
        let s = self.small_mul(&self.mul(&point.x, &yy), 4);
        let m = self.small_mul(&self.square(&point.x), 3);
        let x3 = self.sub(&self.square(&m), &self.small_mul(&s, 2));
        let y3 = self.sub(
            &self.mul(&m, &self.sub(&s, &x3)),
            &self.small_mul(&self.square(&yy), 8),
        );
        let z3 = self.small_mul(&self.mul(&point.y, &point.z), 2);
        JacobianPoint {
            x: x3,
            y: y3,
            z: z3,
        }
    }

    fn add_points(&self, a: &JacobianPoint, b: &JacobianPoint) -> JacobianPoint {
        if a.is_infinity() {
            return b.clone();
        }
        if b.is_infinity() {
            return a.clone();
        }
        let z1z1 = self.square(&a.z);
        let z2z2 = self.square(&b.z);
        let u1 = self.mul(&a.x, &z2z2);
        let u2 = self.mul(&b.x, &z1z1);
        let s1 = self.mul(&a.y, &self.mul(&b.z, &z2z2));
        let s2 = self.mul(&b.y, &self.mul(&a.z, &z1z1));

        if u1 == u2 {
            return if s1 == s2 {
                self.double(a)
            } else {
                JacobianPoint::infinity()
            };
        }

        let h = self.sub(&u2, &u1);
        let r = self.sub(&s2, &s1);
        let hh = self.square(&h);
        let hhh = self.mul(&h, &hh);
        let v = self.mul(&u1, &hh);

        let x3 = self.sub(
            &self.sub(&self.square(&r), &hhh),
            &self.small_mul(&v, 2),
        );
        let y3 = self.sub(&self.mul(&r, &self.sub(&v, &x3)), &self.mul(&s1, &hhh));
        let z3 = self.mul(&self.mul(&a.z, &b.z), &h);
        JacobianPoint {
            x: x3,
            y: y3,
            z: z3,
        }
    }

    fn to_affine(&self, point: &JacobianPoint) -> Option<AffinePoint> {
        if point.is_infinity() {
            return None;
        }
        let z_inv = self.inv(&point.z);
        let z_inv2 = self.square(&z_inv);
        Some(AffinePoint {
            x: self.mul(&point.x, &z_inv2),
            y: self.mul(&point.y, &self.mul(&z_inv2, &z_inv)),
        })
    }

    /// `a·P + b·Q` with Shamir's trick, `None` for the point at infinity.
    ///
    /// Scalars are taken modulo the group order.
    pub fn mul_add(
        &self,
        a: &BigUint,
        p: &AffinePoint,
        b: &BigUint,
        q: &AffinePoint,
    ) -> Option<AffinePoint> {
        let (a, b) = (a % &self.n, b % &self.n);
        let p = JacobianPoint::from(p);
        let q = JacobianPoint::from(q);
        let pq = self.add_points(&p, &q);

        let mut acc = JacobianPoint::infinity();
        for (a, b) in to_be_bytes32(&a).into_iter().zip(to_be_bytes32(&b)) {
            for bit in (0..8).rev() {
                acc = self.double(&acc);
                match ((a >> bit) & 1 == 1, (b >> bit) & 1 == 1) {
                    (true, true) => acc = self.add_points(&acc, &pq),
                    (true, false) => acc = self.add_points(&acc, &p),
                    (false, true) => acc = self.add_points(&acc, &q),
                    (false, false) => {}
                }
            }
        }
        self.to_affine(&acc)
    }

    /// `k·P`, `None` for the point at infinity
    #[inline]
    pub fn mul_point(&self, k: &BigUint, point: &AffinePoint) -> Option<AffinePoint> {
        self.mul_add(k, point, &BigUint::zero(), point)
    }

    /// `k·G`, `None` for the point at infinity
    #[inline]
    pub fn mul_generator(&self, k: &BigUint) -> Option<AffinePoint> {
        self.mul_point(k, &self.g)
    }

    /// ECDSA verification equation: `x(e·s⁻¹·G + r·s⁻¹·Q) ≡ r (mod n)`.
    ///
    /// `r` and `s` must already be checked to lie in `[1, n)`.
    pub fn verify_prehash(
        &self,
        public_key: &AffinePoint,
        e: &BigUint,
        r: &BigUint,
        s: &BigUint,
    ) -> bool {
        let s_inv = self.scalar_inv(s);
        let u1 = self.scalar_mul(e, &s_inv);
        let u2 = self.scalar_mul(r, &s_inv);
        self.mul_add(&u1, &self.g, &u2, public_key)
            .is_some_and(|point| point.x % &self.n == *r)
    }
}

fn is_odd(value: &BigUint) -> bool {
    value.iter_u64_digits().next().is_some_and(|d| d & 1 == 1)
}

/// Low 256 bits of `value`, big-endian and left-padded
pub(crate) fn to_be_bytes32(value: &BigUint) -> [u8; 32] {
    let bytes = value.to_bytes_be();
    let low = &bytes[bytes.len().saturating_sub(32)..];
    let mut out = [0u8; 32];
    out[32 - low.len()..].copy_from_slice(low);
    out
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn generator_is_on_curve() {
        let curve = Secp256k1::get();
        assert!(curve.generator().is_on_curve());
        assert_eq!(
            curve.generator().to_compressed(),
            hex!("0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798")
        );
    }

    #[test]
    fn group_order() {
        let curve = Secp256k1::get();
        assert_eq!(curve.mul_generator(curve.order()), None);
        assert_eq!(
            curve.mul_generator(&(curve.order() - 1u32)),
            Some(AffinePoint {
                x: curve.generator().x.clone(),
                y: curve.field_prime() - &curve.generator().y,
            })
        );
    }

    #[test]
    fn scalars_wrap_around_order() {
        let curve = Secp256k1::get();
        assert_eq!(
            curve.mul_generator(&(curve.order() + 1u32)).as_ref(),
            Some(curve.generator())
        );

        let k = BigUint::one() << 300u32;
        assert_eq!(
            curve.mul_generator(&k),
            curve.mul_generator(&(&k % curve.order()))
        );
        assert_eq!(
            curve.mul_add(&k, curve.generator(), &k, curve.generator()),
            curve.mul_generator(&((&k << 1u32) % curve.order()))
        );
    }

    #[test]
    fn be_bytes_keep_low_bits() {
        assert_eq!(to_be_bytes32(&BigUint::from(0x0102u32))[30..], [1, 2]);
        let wide = (BigUint::one() << 256u32) + 5u32;
        let mut expected = [0u8; 32];
        expected[31] = 5;
        assert_eq!(to_be_bytes32(&wide), expected);
    }

    #[rstest]
    #[case(0u32, 7u32)]
    #[case(1u32, 8u32)]
    #[case(2u32, 15u32)]
    fn curve_rhs(#[case] x: u32, #[case] expected: u32) {
        let curve = Secp256k1::get();
        assert_eq!(curve.rhs(&BigUint::from(x)), BigUint::from(expected));
        assert_eq!(
            curve.rhs(&(curve.field_prime() - 1u32)),
            BigUint::from(6u32)
        );
    }

    #[rstest]
    // 2G
    #[case(2u32, hex!("02c6047f9441ed7d6d3045406e95c07cd85c778e4b8cef3ca7abac09b95c709ee5"))]
    // 3G
    #[case(3u32, hex!("02f9308a019258c31049344f85f89d5229b531c845836f99b08601f113bce036f9"))]
    fn small_multiples(#[case] k: u32, #[case] expected: [u8; COMPRESSED_LEN]) {
        let curve = Secp256k1::get();
        let point = curve.mul_generator(&BigUint::from(k)).unwrap();
        assert!(point.is_on_curve());
        assert_eq!(point.to_compressed(), expected);
    }

    #[test]
    fn mul_add_is_linear() {
        let curve = Secp256k1::get();
        let g = curve.generator();
        let (a, b) = (BigUint::from(1234567u32), BigUint::from(7654321u32));

        let q = curve.mul_generator(&BigUint::from(42u32)).unwrap();
        // a·G + b·(42·G) == (a + 42·b)·G
        assert_eq!(
            curve.mul_add(&a, g, &b, &q),
            curve.mul_generator(&(&a + &b * 42u32))
        );
        // P + (-P) == O
        let minus_one = curve.order() - 1u32;
        assert_eq!(curve.mul_add(&BigUint::one(), &q, &minus_one, &q), None);
        // P + P goes through doubling
        assert_eq!(
            curve.mul_add(&BigUint::one(), &q, &BigUint::one(), &q),
            curve.mul_generator(&BigUint::from(84u32))
        );
    }

    #[rstest]
    #[case(1u32, true)]
    #[case(2u32, true)]
    #[case(5u32, false)]
    #[case(7u32, false)]
    fn lift_x(#[case] x: u32, #[case] on_curve: bool) {
        let curve = Secp256k1::get();
        let x = BigUint::from(x);
        for y_is_odd in [false, true] {
            match curve.lift_x(&x, y_is_odd) {
                Candidate::Found(point) => {
                    assert!(on_curve);
                    assert!(point.is_on_curve());
                    assert_eq!(is_odd(&point.y), y_is_odd);
                    assert_eq!(AffinePoint::from_compressed(&point.to_compressed()), Some(point));
                }
                Candidate::NoSquareRoot => assert!(!on_curve),
                Candidate::OutOfField => unreachable!(),
            }
        }
    }

    #[test]
    fn lift_x_out_of_field() {
        let curve = Secp256k1::get();
        assert_eq!(
            curve.lift_x(curve.field_prime(), false),
            Candidate::OutOfField
        );
    }

    #[test]
    fn scalar_arithmetic() {
        let curve = Secp256k1::get();
        let a = BigUint::from(0xdead_beef_u64);
        assert!(curve.scalar_mul(&a, &curve.scalar_inv(&a)).is_one());
        assert!(
            ((&a + curve.scalar_neg(&a)) % curve.order()).is_zero()
        );
        assert!(curve.scalar_neg(&BigUint::zero()).is_zero());
        assert_eq!(
            curve.scalar_from_hash(&[0xff; 32]),
            BigUint::from_bytes_be(&[0xff; 32]) - curve.order()
        );
    }

    #[test]
    fn compressed_rejects_bad_tag() {
        let mut bytes = Secp256k1::get().generator().to_compressed();
        bytes[0] = 0x04;
        assert_eq!(AffinePoint::from_compressed(&bytes), None);
    }
}
