//! Transaction envelopes and their canonical wire layout, plus vote papers.

use halo2curves_axiom::bn256::Fr;
use halo2curves_axiom::ff::Field;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::{fr_from_bytes, fr_to_bytes};

/// A shielded transfer: the proof, its public inputs, and the encrypted
/// notes published for receiver discovery.
///
/// The circuit binds only the public inputs; the ciphertexts are
/// informational and a lying sender is caught by the receiver-side
/// commitment re-check during discovery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ZkTransfer {
    pub proof: Vec<u8>,
    pub merkle_root: Fr,
    pub nullifier: Fr,
    pub new_note_commitment: Fr,
    /// All-zero iff the spent note had no change.
    pub change_note_commitment: Fr,
    pub enc_new_note: Vec<u8>,
    pub enc_change_note: Vec<u8>,
}

impl ZkTransfer {
    /// Canonical byte layout:
    /// `proof (len-prefixed) ‖ root (32) ‖ nullifier (32) ‖ new_commitment
    /// (32) ‖ change_commitment (32) ‖ enc_new (len-prefixed) ‖ enc_change
    /// (len-prefixed)`, all length prefixes u32 big-endian.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.proof.len() + 4 * 32 + 64);
        put_prefixed(&mut out, &self.proof);
        out.extend_from_slice(&fr_to_bytes(&self.merkle_root));
        out.extend_from_slice(&fr_to_bytes(&self.nullifier));
        out.extend_from_slice(&fr_to_bytes(&self.new_note_commitment));
        out.extend_from_slice(&fr_to_bytes(&self.change_note_commitment));
        put_prefixed(&mut out, &self.enc_new_note);
        put_prefixed(&mut out, &self.enc_change_note);
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<ZkTransfer> {
        let mut cursor = Cursor { bytes, pos: 0 };
        let proof = cursor.take_prefixed()?;
        let merkle_root = cursor.take_fr()?;
        let nullifier = cursor.take_fr()?;
        let new_note_commitment = cursor.take_fr()?;
        let change_note_commitment = cursor.take_fr()?;
        let enc_new_note = cursor.take_prefixed()?;
        let enc_change_note = cursor.take_prefixed()?;
        if cursor.pos != bytes.len() {
            return Err(Error::MalformedInput("trailing bytes after transfer".into()));
        }
        Ok(ZkTransfer {
            proof,
            merkle_root,
            nullifier,
            new_note_commitment,
            change_note_commitment,
            enc_new_note,
            enc_change_note,
        })
    }

    /// Whether the transfer spends the whole note (no change output).
    pub fn has_change(&self) -> bool {
        !bool::from(self.change_note_commitment.is_zero())
    }
}

fn put_prefixed(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    out.extend_from_slice(bytes);
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Cursor<'_> {
    fn take(&mut self, n: usize) -> Result<&[u8]> {
        if self.pos + n > self.bytes.len() {
            return Err(Error::MalformedInput("truncated transfer encoding".into()));
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn take_prefixed(&mut self) -> Result<Vec<u8>> {
        let len_bytes = self.take(4)?;
        let len = u32::from_be_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]]);
        Ok(self.take(len as usize)?.to_vec())
    }

    fn take_fr(&mut self) -> Result<Fr> {
        let slice = self.take(32)?;
        let mut arr = [0u8; 32];
        arr.copy_from_slice(slice);
        fr_from_bytes(&arr)
    }
}

/// JSON-facing form of a transfer for carrying proofs between processes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransferBundle {
    pub proof: Vec<u8>,
    pub merkle_root: [u8; 32],
    pub nullifier: [u8; 32],
    pub new_note_commitment: [u8; 32],
    pub change_note_commitment: [u8; 32],
    pub enc_new_note: Vec<u8>,
    pub enc_change_note: Vec<u8>,
}

impl From<&ZkTransfer> for TransferBundle {
    fn from(tx: &ZkTransfer) -> Self {
        TransferBundle {
            proof: tx.proof.clone(),
            merkle_root: fr_to_bytes(&tx.merkle_root),
            nullifier: fr_to_bytes(&tx.nullifier),
            new_note_commitment: fr_to_bytes(&tx.new_note_commitment),
            change_note_commitment: fr_to_bytes(&tx.change_note_commitment),
            enc_new_note: tx.enc_new_note.clone(),
            enc_change_note: tx.enc_change_note.clone(),
        }
    }
}

impl TryFrom<&TransferBundle> for ZkTransfer {
    type Error = Error;

    fn try_from(bundle: &TransferBundle) -> Result<ZkTransfer> {
        Ok(ZkTransfer {
            proof: bundle.proof.clone(),
            merkle_root: fr_from_bytes(&bundle.merkle_root)?,
            nullifier: fr_from_bytes(&bundle.nullifier)?,
            new_note_commitment: fr_from_bytes(&bundle.new_note_commitment)?,
            change_note_commitment: fr_from_bytes(&bundle.change_note_commitment)?,
            enc_new_note: bundle.enc_new_note.clone(),
            enc_change_note: bundle.enc_change_note.clone(),
        })
    }
}

/// A recorded ballot: the per-citizen paper id and the latest choice.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotePaper {
    pub paper_id: [u8; 32],
    pub choice: Vec<u8>,
}
