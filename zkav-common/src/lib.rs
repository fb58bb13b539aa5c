//! Shared foundation of the zkav shielded ledger: the scalar-field adapter,
//! the MiMC field hash, the Baby Jubjub curve with EdDSA, the note model,
//! note encryption, the commitment accumulator, and the wire formats.
//!
//! Everything that must agree byte-for-byte between the prover, the verifier,
//! and the circuits lives here. In particular the canonical field encoding
//! (32-byte big-endian) and the byte-chunking rule of [`bytes_to_elements`]
//! are shared with `zkav-circuit`; changing either voids all commitments.

pub mod address;
pub mod encrypt;
pub mod error;
pub mod jubjub;
pub mod merkle;
pub mod mimc;
pub mod note;
pub mod tx;

pub use error::{Error, Result};

use halo2curves_axiom::bn256::Fr;
use halo2curves_axiom::ff::PrimeField;

/// Canonical 32-byte big-endian encoding of a field element.
pub fn fr_to_bytes(fr: &Fr) -> [u8; 32] {
    let repr = fr.to_repr();
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(repr.as_ref());
    bytes.reverse();
    bytes
}

/// Parse a canonical 32-byte big-endian field element.
///
/// Fails on non-canonical encodings (values >= the field modulus), which is
/// the right behavior for wire inputs: a commitment or nullifier that does
/// not round-trip is malformed, not silently reduced.
pub fn fr_from_bytes(bytes: &[u8; 32]) -> Result<Fr> {
    let mut le = *bytes;
    le.reverse();
    Fr::from_repr(le)
        .into_option()
        .ok_or_else(|| Error::MalformedInput("non-canonical field element".into()))
}

/// Reduce an arbitrary byte string of at most 32 bytes to a field element.
///
/// Inputs shorter than 32 bytes behave as if left-padded with zeros; 32-byte
/// inputs that exceed the modulus wrap around. Use [`fr_from_bytes`] when the
/// input must already be canonical.
pub fn reduce_canonical(bytes: &[u8]) -> Fr {
    debug_assert!(bytes.len() <= 32);
    let mut acc = Fr::zero();
    let base = Fr::from(256);
    for byte in bytes {
        acc = acc * base + Fr::from(*byte as u64);
    }
    acc
}

/// Map an arbitrary byte string onto hash inputs: split into 32-byte chunks
/// from the left, reduce each chunk to canonical field form.
///
/// This rule is mirrored by the in-circuit hash and must never diverge.
pub fn bytes_to_elements(bytes: &[u8]) -> Vec<Fr> {
    if bytes.is_empty() {
        return vec![Fr::zero()];
    }
    bytes.chunks(32).map(reduce_canonical).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use halo2curves_axiom::ff::Field;

    #[test]
    fn fr_bytes_round_trip() {
        let value = Fr::from(0xDEAD_BEEFu64);
        let bytes = fr_to_bytes(&value);
        assert_eq!(fr_from_bytes(&bytes).unwrap(), value);
    }

    #[test]
    fn fr_from_bytes_rejects_non_canonical() {
        assert!(fr_from_bytes(&[0xFF; 32]).is_err());
    }

    #[test]
    fn reduce_canonical_left_pads_short_inputs() {
        let short = [0x01u8, 0x02];
        let mut padded = [0u8; 32];
        padded[30] = 0x01;
        padded[31] = 0x02;
        assert_eq!(reduce_canonical(&short), reduce_canonical(&padded));
        assert_eq!(reduce_canonical(&short), Fr::from(0x0102u64));
    }

    #[test]
    fn bytes_to_elements_chunks_long_inputs() {
        let long = [0xAB; 48];
        let elems = bytes_to_elements(&long);
        assert_eq!(elems.len(), 2);
        assert_eq!(elems[0], reduce_canonical(&long[..32]));
        assert_eq!(elems[1], reduce_canonical(&long[32..]));
    }

    #[test]
    fn reduce_canonical_is_deterministic_under_wraparound() {
        let a = reduce_canonical(&[0xFF; 32]);
        let b = reduce_canonical(&[0xFF; 32]);
        assert_eq!(a, b);
        assert_ne!(a, Fr::ZERO);
    }
}
