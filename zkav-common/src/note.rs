//! The note model: secret notes, commitments, nullifiers, and the shared
//! plaintext a sender ships to a receiver.

use halo2curves_axiom::bn256::Fr;
use halo2curves_axiom::ff::PrimeField;

use crate::error::{Error, Result};
use crate::jubjub::PublicKey;
use crate::mimc::mimc_hash;
use crate::reduce_canonical;

/// Current note format version.
pub const NOTE_VERSION: u8 = 1;

/// A secret note: the private pre-image of an on-ledger commitment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Note {
    pub version: u8,
    pub owner: PublicKey,
    pub balance: u128,
    pub salt: [u8; 32],
}

impl Note {
    pub fn new(owner: PublicKey, balance: u128, salt: [u8; 32]) -> Note {
        Note {
            version: NOTE_VERSION,
            owner,
            balance,
            salt,
        }
    }

    /// The hiding, binding commitment published on the ledger:
    /// `C = H(version, pub.x, pub.y, balance, salt)`.
    pub fn commitment(&self) -> Fr {
        mimc_hash(&[
            Fr::from(self.version as u64),
            self.owner.0.x,
            self.owner.0.y,
            Fr::from_u128(self.balance),
            reduce_canonical(&self.salt),
        ])
    }

    /// The spend tag for this note under the owner's key halves:
    /// `nk = H(s0, s1); nf = H(nk, C)`.
    ///
    /// Deterministic and independent of any other note spent alongside, so a
    /// repeated spend of the same note reproduces the same tag.
    pub fn nullifier(&self, s0: &[u8; 16], s1: &[u8; 16]) -> Fr {
        let nk = mimc_hash(&[reduce_canonical(s0), reduce_canonical(s1)]);
        mimc_hash(&[nk, self.commitment()])
    }

    /// Strip the owner key, leaving the plaintext shipped to the receiver.
    pub fn to_shared(&self) -> SharedNote {
        SharedNote {
            version: self.version,
            balance: self.balance,
            salt: self.salt,
            memo: Vec::new(),
        }
    }
}

/// Note plaintext without the owner key. The receiver rebinds it to its own
/// public key to reconstruct the full [`Note`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SharedNote {
    pub version: u8,
    pub balance: u128,
    pub salt: [u8; 32],
    pub memo: Vec<u8>,
}

impl SharedNote {
    /// Rebind the plaintext to a public key.
    pub fn to_note(&self, owner: PublicKey) -> Note {
        Note {
            version: self.version,
            owner,
            balance: self.balance,
            salt: self.salt,
        }
    }

    /// Canonical encoding:
    /// `version (1) ‖ balance (16, BE) ‖ salt (32) ‖ memo-len (2, BE) ‖ memo`.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + 16 + 32 + 2 + self.memo.len());
        out.push(self.version);
        out.extend_from_slice(&self.balance.to_be_bytes());
        out.extend_from_slice(&self.salt);
        out.extend_from_slice(&(self.memo.len() as u16).to_be_bytes());
        out.extend_from_slice(&self.memo);
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<SharedNote> {
        if bytes.len() < 1 + 16 + 32 + 2 {
            return Err(Error::MalformedInput("shared note too short".into()));
        }
        let version = bytes[0];
        let mut balance_bytes = [0u8; 16];
        balance_bytes.copy_from_slice(&bytes[1..17]);
        let mut salt = [0u8; 32];
        salt.copy_from_slice(&bytes[17..49]);
        let memo_len = u16::from_be_bytes([bytes[49], bytes[50]]) as usize;
        let memo = bytes[51..].to_vec();
        if memo.len() != memo_len {
            return Err(Error::MalformedInput("shared note memo length mismatch".into()));
        }
        Ok(SharedNote {
            version,
            balance: u128::from_be_bytes(balance_bytes),
            salt,
            memo,
        })
    }
}
