//! Baby Jubjub: the twisted Edwards curve embedded in the BN254 scalar field,
//! with EdDSA (MiMC challenge hash) and ECDH on top.
//!
//! Curve (EIP-2494 twisted Edwards form): `a*x^2 + y^2 = 1 + d*x^2*y^2` with
//! `a = 168700`, `d = 168696`. All coordinates are `Fr` elements, so the
//! in-circuit gadgets operate on the same arithmetic natively.
//!
//! Private-key scalars are kept reduced modulo the prime subgroup order and
//! serialized as 32 big-endian bytes. The 16/16 byte split of that encoding
//! (`s0 = bytes[0..16]`, `s1 = bytes[16..32]`, `scalar = s0*2^128 + s1`) is a
//! contract with the circuits: the key-ownership gadget multiplies the two
//! halves separately and shifts the high half by `2^128`.

use halo2curves_axiom::bn256::Fr;
use halo2curves_axiom::ff::{Field, PrimeField};
use num_bigint::BigUint;
use once_cell::sync::Lazy;
use rand::RngCore;

use crate::error::{Error, Result};
use crate::mimc::mimc_hash;
use crate::{fr_from_bytes, fr_to_bytes};

/// Twisted Edwards coefficient `a`.
pub static PARAM_A: Lazy<Fr> = Lazy::new(|| Fr::from(168700));

/// Twisted Edwards coefficient `d`.
pub static PARAM_D: Lazy<Fr> = Lazy::new(|| Fr::from(168696));

/// Generator of the prime-order subgroup.
pub static GENERATOR: Lazy<AffinePoint> = Lazy::new(|| AffinePoint {
    x: fr_from_decimal(
        "5299619240641551281634865583518297030282874472190772894086521144482721001553",
    ),
    y: fr_from_decimal(
        "16950150798460657717958625567821834550301663161624707787222815936182638968203",
    ),
});

/// Order of the prime subgroup (the EdDSA scalar modulus).
pub static SUBGROUP_ORDER: Lazy<BigUint> = Lazy::new(|| {
    "2736030358979909402780800718157159386076813972158567259200215660948447373041"
        .parse()
        .expect("subgroup order constant parses")
});

fn fr_from_decimal(s: &str) -> Fr {
    Fr::from_str_vartime(s).expect("curve constant parses")
}

/// A point on Baby Jubjub in affine coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AffinePoint {
    pub x: Fr,
    pub y: Fr,
}

impl AffinePoint {
    /// The neutral element `(0, 1)`.
    pub fn identity() -> Self {
        Self {
            x: Fr::zero(),
            y: Fr::one(),
        }
    }

    /// Check the curve equation `a*x^2 + y^2 == 1 + d*x^2*y^2`.
    pub fn is_on_curve(&self) -> bool {
        let x2 = self.x.square();
        let y2 = self.y.square();
        *PARAM_A * x2 + y2 == Fr::one() + *PARAM_D * x2 * y2
    }

    /// Complete twisted Edwards addition.
    ///
    /// The denominators `1 ± d*x1*x2*y1*y2` are nonzero for any pair of
    /// curve points because `d` is a non-square; the unified law has no
    /// exceptional cases.
    pub fn add(&self, other: &AffinePoint) -> AffinePoint {
        let x1x2 = self.x * other.x;
        let y1y2 = self.y * other.y;
        let dxy = *PARAM_D * x1x2 * y1y2;
        let x_num = self.x * other.y + self.y * other.x;
        let y_num = y1y2 - *PARAM_A * x1x2;
        let x_den = (Fr::one() + dxy)
            .invert()
            .expect("complete addition law: denominator nonzero");
        let y_den = (Fr::one() - dxy)
            .invert()
            .expect("complete addition law: denominator nonzero");
        AffinePoint {
            x: x_num * x_den,
            y: y_num * y_den,
        }
    }

    /// Point doubling via the unified addition law.
    pub fn double(&self) -> AffinePoint {
        self.add(self)
    }

    /// Multiply by a scalar given as big-endian bytes (double-and-add).
    pub fn mul_scalar_be(&self, scalar_be: &[u8]) -> AffinePoint {
        let mut acc = AffinePoint::identity();
        for byte in scalar_be {
            for i in (0..8).rev() {
                acc = acc.double();
                if (byte >> i) & 1 == 1 {
                    acc = acc.add(self);
                }
            }
        }
        acc
    }

    /// Compressed 32-byte encoding: big-endian `y` with the sign of `x`
    /// (parity of its canonical integer) folded into the top bit.
    pub fn to_bytes(&self) -> [u8; 32] {
        let mut bytes = fr_to_bytes(&self.y);
        if self.x.to_repr().as_ref()[0] & 1 == 1 {
            bytes[0] |= 0x80;
        }
        bytes
    }

    /// Decompress a point; rejects encodings that do not name a curve point.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<AffinePoint> {
        let x_odd = bytes[0] & 0x80 != 0;
        let mut y_bytes = *bytes;
        y_bytes[0] &= 0x7F;
        let y = fr_from_bytes(&y_bytes)?;

        // x^2 = (1 - y^2) / (a - d*y^2)
        let y2 = y.square();
        let num = Fr::one() - y2;
        let den = *PARAM_A - *PARAM_D * y2;
        let den_inv = Option::<Fr>::from(den.invert())
            .ok_or(Error::CryptoFailure("point decompression failed"))?;
        let x2 = num * den_inv;
        let mut x = Option::<Fr>::from(x2.sqrt())
            .ok_or(Error::CryptoFailure("encoding is not a curve point"))?;
        if (x.to_repr().as_ref()[0] & 1 == 1) != x_odd {
            x = -x;
        }

        let point = AffinePoint { x, y };
        if !point.is_on_curve() {
            return Err(Error::CryptoFailure("encoding is not a curve point"));
        }
        Ok(point)
    }
}

/// An EdDSA public key (a subgroup point).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PublicKey(pub AffinePoint);

impl PublicKey {
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    pub fn from_bytes(bytes: &[u8; 32]) -> Result<PublicKey> {
        AffinePoint::from_bytes(bytes).map(PublicKey)
    }
}

/// An EdDSA signing key.
///
/// Holds the 32-byte big-endian scalar, already reduced modulo the subgroup
/// order and nonzero.
#[derive(Clone)]
pub struct SigningKey {
    scalar: [u8; 32],
}

impl SigningKey {
    /// Sample a fresh key.
    pub fn generate<R: RngCore>(rng: &mut R) -> SigningKey {
        loop {
            let mut wide = [0u8; 64];
            rng.fill_bytes(&mut wide);
            let scalar = BigUint::from_bytes_be(&wide) % &*SUBGROUP_ORDER;
            if scalar != BigUint::from(0u8) {
                return SigningKey {
                    scalar: biguint_to_be32(&scalar),
                };
            }
        }
    }

    /// Restore a key from its 32-byte big-endian scalar.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<SigningKey> {
        let scalar = BigUint::from_bytes_be(bytes);
        if scalar == BigUint::from(0u8) || scalar >= *SUBGROUP_ORDER {
            return Err(Error::CryptoFailure("scalar out of range"));
        }
        Ok(SigningKey { scalar: *bytes })
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.scalar
    }

    /// The 16/16 split of the scalar encoding: `(s0, s1)` with
    /// `scalar = s0*2^128 + s1`. Both the nullifier derivation and the
    /// in-circuit key-ownership proof consume the halves in this order.
    pub fn scalar_halves(&self) -> ([u8; 16], [u8; 16]) {
        let mut s0 = [0u8; 16];
        let mut s1 = [0u8; 16];
        s0.copy_from_slice(&self.scalar[..16]);
        s1.copy_from_slice(&self.scalar[16..]);
        (s0, s1)
    }

    pub fn public(&self) -> PublicKey {
        PublicKey(GENERATOR.mul_scalar_be(&self.scalar))
    }

    /// Produce an EdDSA signature over a single field element.
    ///
    /// The nonce is deterministic (keyed BLAKE2s over the scalar and the
    /// message), the challenge is `MiMC(R.x, R.y, A.x, A.y, msg)` reduced
    /// modulo the subgroup order.
    pub fn sign(&self, message: Fr) -> Signature {
        let public = self.public();

        let nonce_hash = blake2s_simd::Params::new()
            .hash_length(32)
            .key(b"zkav.eddsa.nonce")
            .to_state()
            .update(&self.scalar)
            .update(&fr_to_bytes(&message))
            .finalize();
        let r = BigUint::from_bytes_be(nonce_hash.as_bytes()) % &*SUBGROUP_ORDER;
        let r_point = GENERATOR.mul_scalar_be(&biguint_to_be32(&r));

        let challenge = challenge_scalar(&r_point, &public.0, message);
        let sk = BigUint::from_bytes_be(&self.scalar);
        let s = (r + challenge * sk) % &*SUBGROUP_ORDER;

        Signature {
            r: r_point,
            s: biguint_to_be32(&s),
        }
    }

    /// ECDH: hash the x-coordinate of `scalar * other` into a 32-byte shared
    /// secret. Rejects off-curve peers.
    pub fn ecdh(&self, other: &PublicKey) -> Result<[u8; 32]> {
        if !other.0.is_on_curve() {
            return Err(Error::CryptoFailure("peer public key not on curve"));
        }
        let shared = other.0.mul_scalar_be(&self.scalar);
        let digest = blake2s_simd::Params::new()
            .hash_length(32)
            .to_state()
            .update(&fr_to_bytes(&shared.x))
            .finalize();
        let mut out = [0u8; 32];
        out.copy_from_slice(digest.as_bytes());
        Ok(out)
    }
}

/// An EdDSA signature `(R, S)` with `S` as a 32-byte big-endian scalar.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Signature {
    pub r: AffinePoint,
    pub s: [u8; 32],
}

impl Signature {
    /// The 16/16 split of `S` used by the in-circuit verifier.
    pub fn s_halves(&self) -> ([u8; 16], [u8; 16]) {
        let mut hi = [0u8; 16];
        let mut lo = [0u8; 16];
        hi.copy_from_slice(&self.s[..16]);
        lo.copy_from_slice(&self.s[16..]);
        (hi, lo)
    }
}

/// Verify an EdDSA signature: `S*G == R + H(R, A, msg)*A`.
pub fn verify(public: &PublicKey, message: Fr, sig: &Signature) -> Result<()> {
    if !public.0.is_on_curve() {
        return Err(Error::CryptoFailure("public key not on curve"));
    }
    if !sig.r.is_on_curve() {
        return Err(Error::CryptoFailure("signature R not on curve"));
    }
    if BigUint::from_bytes_be(&sig.s) >= *SUBGROUP_ORDER {
        return Err(Error::CryptoFailure("signature S out of range"));
    }

    let challenge = challenge_scalar(&sig.r, &public.0, message);
    let lhs = GENERATOR.mul_scalar_be(&sig.s);
    let rhs = sig.r.add(&public.0.mul_scalar_be(&biguint_to_be32(&challenge)));
    if lhs == rhs {
        Ok(())
    } else {
        Err(Error::CryptoFailure("signature verification failed"))
    }
}

fn challenge_scalar(r: &AffinePoint, a: &AffinePoint, message: Fr) -> BigUint {
    let h = mimc_hash(&[r.x, r.y, a.x, a.y, message]);
    BigUint::from_bytes_be(&fr_to_bytes(&h)) % &*SUBGROUP_ORDER
}

fn biguint_to_be32(value: &BigUint) -> [u8; 32] {
    let bytes = value.to_bytes_be();
    let mut out = [0u8; 32];
    out[32 - bytes.len()..].copy_from_slice(&bytes);
    out
}
