//! Wallet-side state: the shared notes a key controls, transfer
//! construction, and the discovery protocol that scans accepted transfers
//! for incoming notes.

pub mod citizen;

use halo2curves_axiom::bn256::Fr;
use rand::RngCore;
use tracing::{debug, warn};

use zkav_circuit::{
    TransferCircuitInput, TransferPublicInputs, TransferWitness, MERKLE_DEPTH,
};
use zkav_common::address::{decode_address, encode_address};
use zkav_common::encrypt::{encrypt_for, try_decrypt};
use zkav_common::jubjub::{PublicKey, SigningKey};
use zkav_common::merkle::MerklePath;
use zkav_common::note::{Note, SharedNote, NOTE_VERSION};
use zkav_common::tx::ZkTransfer;
use zkav_common::{reduce_canonical, Error, Result};
use zkav_prover::{prove_transfer, CircuitArtifacts};

/// A key plus the shared notes it can spend.
pub struct Wallet {
    key: SigningKey,
    address: String,
    notes: Vec<SharedNote>,
}

impl Wallet {
    pub fn generate<R: RngCore>(rng: &mut R) -> Wallet {
        Wallet::from_key(SigningKey::generate(rng))
    }

    pub fn from_key(key: SigningKey) -> Wallet {
        let address = encode_address(&key.public());
        Wallet {
            key,
            address,
            notes: Vec::new(),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn public(&self) -> PublicKey {
        self.key.public()
    }

    pub fn signing_key(&self) -> &SigningKey {
        &self.key
    }

    // --- note tracking -------------------------------------------------------

    pub fn add_note(&mut self, note: SharedNote) {
        self.notes.push(note);
    }

    /// Drop the note with this salt, if tracked.
    pub fn remove_note(&mut self, salt: &[u8; 32]) {
        self.notes.retain(|n| &n.salt != salt);
    }

    pub fn notes(&self) -> &[SharedNote] {
        &self.notes
    }

    /// Sum of all tracked note balances.
    pub fn balance(&self) -> u128 {
        self.notes.iter().map(|n| n.balance).sum()
    }

    /// First tracked note that covers `amount + fee`.
    pub fn spendable_note(&self, amount: u128, fee: u128) -> Option<&SharedNote> {
        let need = amount.checked_add(fee)?;
        self.notes.iter().find(|n| n.balance >= need)
    }

    /// The full note behind a tracked shared note, bound to our key.
    pub fn note_of(&self, shared: &SharedNote) -> Note {
        shared.to_note(self.public())
    }

    // --- transfer construction ----------------------------------------------

    /// Build, prove, and package a transfer spending `using` (steps 1-5 of
    /// the prover pipeline: the membership path comes from the verifier, the
    /// rest is assembled here).
    ///
    /// Returns the wire transaction together with the change note to track
    /// once the transfer is accepted (None when the spend is exact).
    pub fn transfer<R: RngCore>(
        &self,
        artifacts: &CircuitArtifacts,
        to_address: &str,
        amount: u128,
        fee: u128,
        using: &SharedNote,
        membership: &MerklePath,
        rng: &mut R,
    ) -> Result<(ZkTransfer, Option<SharedNote>)> {
        let to_pub = decode_address(to_address)?;
        let spent_note = self.note_of(using);
        let need = amount
            .checked_add(fee)
            .ok_or_else(|| Error::MalformedInput("amount + fee overflows".into()))?;
        if need > spent_note.balance {
            return Err(Error::CircuitUnsatisfied("insufficient balance".into()));
        }
        if membership.path.len() != MERKLE_DEPTH + 1 {
            return Err(Error::MalformedInput(format!(
                "membership path has {} entries, expected {}",
                membership.path.len(),
                MERKLE_DEPTH + 1
            )));
        }

        let mut salt1 = [0u8; 32];
        rng.fill_bytes(&mut salt1);

        let new_note = Note::new(to_pub, amount, salt1);
        let change = spent_note.balance - need;
        let change_note = Note::new(self.public(), change, spent_note.salt);

        let (s0, s1) = self.key.scalar_halves();
        let nullifier = spent_note.nullifier(&s0, &s1);
        let new_commitment = new_note.commitment();
        let change_commitment = if change == 0 {
            Fr::zero()
        } else {
            change_note.commitment()
        };

        let enc_new_note = encrypt_for(rng, &to_pub, &new_note.to_shared(), None)?;
        let enc_change_note = if change == 0 {
            Vec::new()
        } else {
            encrypt_for(rng, &self.public(), &change_note.to_shared(), None)?
        };

        let input = TransferCircuitInput {
            witness: TransferWitness {
                s0,
                s1,
                version: spent_note.version,
                from_pub: self.public().0,
                balance: spent_note.balance,
                salt0: reduce_canonical(&spent_note.salt),
                spent_commitment: spent_note.commitment(),
                leaf_index: membership.leaf_index,
                merkle_path: membership.path.clone(),
                amount,
                fee,
                to_pub: to_pub.0,
                salt1: reduce_canonical(&salt1),
            },
            public: TransferPublicInputs {
                merkle_root: membership.root,
                nullifier,
                new_note_commitment: new_commitment,
                change_note_commitment: change_commitment,
            },
        };

        let proof = prove_transfer(artifacts, input)?;
        debug!(
            to = to_address,
            amount,
            fee,
            "transfer proof created"
        );

        let tx = ZkTransfer {
            proof,
            merkle_root: membership.root,
            nullifier,
            new_note_commitment: new_commitment,
            change_note_commitment: change_commitment,
            enc_new_note,
            enc_change_note,
        };
        let change_shared = (change > 0).then(|| change_note.to_shared());
        Ok((tx, change_shared))
    }

    // --- discovery -----------------------------------------------------------

    /// Scan one accepted transfer for notes addressed to this wallet.
    ///
    /// For each ciphertext that decrypts under our key the plaintext is
    /// rebound to our public key and the recomputed commitment must equal
    /// the one the transaction declared; a mismatch means the sender lied
    /// about the plaintext and the note is dropped. Notes whose prospective
    /// nullifier is already spent (per `is_spent`) are skipped as well.
    ///
    /// Returns the discovered notes; they are not auto-tracked so callers
    /// decide when to [`Wallet::add_note`].
    pub fn scan_transfer<F>(&self, tx: &ZkTransfer, is_spent: F) -> Vec<SharedNote>
    where
        F: Fn(&Fr) -> bool,
    {
        let mut found = Vec::new();
        let candidates = [
            (tx.new_note_commitment, &tx.enc_new_note),
            (tx.change_note_commitment, &tx.enc_change_note),
        ];
        for (declared_commitment, ciphertext) in candidates {
            if ciphertext.is_empty() {
                continue;
            }
            // AEAD failures are expected noise: most notes are not ours.
            let Some(shared) = try_decrypt(&self.key, ciphertext, None) else {
                continue;
            };
            if shared.version != NOTE_VERSION {
                warn!(version = shared.version, "discovered note with unknown version");
                continue;
            }
            let note = shared.to_note(self.public());
            if note.commitment() != declared_commitment {
                warn!("discovered note does not match its declared commitment");
                continue;
            }
            let (s0, s1) = self.key.scalar_halves();
            if is_spent(&note.nullifier(&s0, &s1)) {
                debug!("discovered note is already spent");
                continue;
            }
            found.push(shared);
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn shared(balance: u128, salt_byte: u8) -> SharedNote {
        SharedNote {
            version: NOTE_VERSION,
            balance,
            salt: [salt_byte; 32],
            memo: Vec::new(),
        }
    }

    #[test]
    fn balance_sums_tracked_notes() {
        let mut wallet = Wallet::generate(&mut StdRng::seed_from_u64(40));
        wallet.add_note(shared(10, 1));
        wallet.add_note(shared(32, 2));
        assert_eq!(wallet.balance(), 42);
        wallet.remove_note(&[1u8; 32]);
        assert_eq!(wallet.balance(), 32);
    }

    #[test]
    fn spendable_note_requires_covering_balance() {
        let mut wallet = Wallet::generate(&mut StdRng::seed_from_u64(41));
        wallet.add_note(shared(10, 1));
        wallet.add_note(shared(50, 2));
        assert_eq!(wallet.spendable_note(30, 5).unwrap().balance, 50);
        assert!(wallet.spendable_note(60, 0).is_none());
    }

    #[test]
    fn scan_ignores_foreign_and_lying_ciphertexts() {
        let mut rng = StdRng::seed_from_u64(42);
        let sender = Wallet::generate(&mut rng);
        let receiver = Wallet::generate(&mut rng);

        let honest = Note::new(receiver.public(), 25, [9u8; 32]);
        let enc_honest =
            encrypt_for(&mut rng, &receiver.public(), &honest.to_shared(), None).unwrap();

        // a ciphertext whose plaintext does not match the declared commitment
        let lie = Note::new(receiver.public(), 999, [8u8; 32]);
        let enc_lie = encrypt_for(&mut rng, &receiver.public(), &lie.to_shared(), None).unwrap();

        let tx = ZkTransfer {
            proof: Vec::new(),
            merkle_root: Fr::zero(),
            nullifier: Fr::zero(),
            new_note_commitment: honest.commitment(),
            change_note_commitment: honest.commitment(),
            enc_new_note: enc_honest,
            enc_change_note: enc_lie,
        };

        let found = receiver.scan_transfer(&tx, |_| false);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].balance, 25);

        // the sender cannot discover notes addressed to the receiver
        assert!(sender.scan_transfer(&tx, |_| false).is_empty());

        // and an already-spent note is skipped
        assert!(receiver.scan_transfer(&tx, |_| true).is_empty());
    }
}
