//! Native MiMC over the BN254 scalar field.
//!
//! MiMC-x^5 with 110 rounds in Miyaguchi–Preneel mode. The round-constant
//! table is derived once from a fixed domain string via the BLAKE3 XOF and is
//! re-exported for the in-circuit gadget, so the native hash and the gadget
//! are the same function by construction.

use halo2curves_axiom::bn256::Fr;
use halo2curves_axiom::ff::{Field, FromUniformBytes};
use once_cell::sync::Lazy;

use crate::bytes_to_elements;

/// Number of rounds of the MiMC permutation.
pub const MIMC_ROUNDS: usize = 110;

const CONSTANTS_DOMAIN: &[u8] = b"zkav.mimc.bn254.x5.v1";

/// Round constants, identical for the native hash and the circuit gadget.
pub static ROUND_CONSTANTS: Lazy<[Fr; MIMC_ROUNDS]> = Lazy::new(|| {
    let mut hasher = blake3::Hasher::new();
    hasher.update(CONSTANTS_DOMAIN);
    let mut reader = hasher.finalize_xof();
    let mut constants = [Fr::zero(); MIMC_ROUNDS];
    for constant in constants.iter_mut() {
        let mut wide = [0u8; 64];
        reader.fill(&mut wide);
        *constant = Fr::from_uniform_bytes(&wide);
    }
    constants
});

/// The MiMC block cipher: encrypt `message` under `key`.
///
/// Each round computes `m <- (m + k + c_i)^5`; the final output adds the key
/// back in.
pub fn mimc_encrypt(key: Fr, message: Fr) -> Fr {
    let mut m = message;
    for constant in ROUND_CONSTANTS.iter() {
        let t = m + key + constant;
        m = t.square().square() * t;
    }
    m + key
}

/// Hash a sequence of field elements with MiMC in Miyaguchi–Preneel mode.
///
/// `h_0 = 0; h_{i+1} = E_{h_i}(x_i) + h_i + x_i`.
pub fn mimc_hash(inputs: &[Fr]) -> Fr {
    let mut h = Fr::zero();
    for &x in inputs {
        h = mimc_encrypt(h, x) + h + x;
    }
    h
}

/// Hash byte-string inputs: each input is mapped to one or more field
/// elements by the canonical chunking rule, then absorbed in order.
pub fn mimc_hash_bytes(inputs: &[&[u8]]) -> Fr {
    let mut elements = Vec::new();
    for input in inputs {
        elements.extend(bytes_to_elements(input));
    }
    mimc_hash(&elements)
}
