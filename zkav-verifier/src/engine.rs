// zkav-verifier/src/engine.rs
//
// The authoritative ledger: the commitment accumulator, the nullifier set,
// the citizens' tree, and the vote-paper registry, owned by one explicit
// `Ledger` value per process.
//
// Concurrency follows the optimistic pattern: the double-spend pre-check and
// a root snapshot happen under a read lock, SNARK verification runs
// lock-free, and the commit re-checks nullifier uniqueness and root
// currency under the write lock. A transaction that loses the commit race
// is rejected whole; state is never partially applied.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use halo2_proofs_axiom::{plonk::VerifyingKey, poly::kzg::commitment::ParamsKZG};
use halo2curves_axiom::bn256::{Bn256, Fr, G1Affine};
use halo2curves_axiom::ff::Field;
use rand::RngCore;
use tracing::{debug, info, warn};

use zkav_circuit::{
    transfer_instances, vote_instances, TransferPublicInputs, VotePublicInputs, MERKLE_DEPTH,
};
use zkav_common::encrypt::encrypt_for;
use zkav_common::jubjub::PublicKey;
use zkav_common::merkle::{CommitmentTree, MerklePath};
use zkav_common::note::Note;
use zkav_common::tx::{VotePaper, ZkTransfer};
use zkav_common::{fr_to_bytes, reduce_canonical, Error, Result};

/// Verifier-side artifacts for one circuit: the KZG params and the
/// verifying key, read-only after setup.
pub struct VerifierArtifacts {
    pub params: ParamsKZG<Bn256>,
    pub vk: VerifyingKey<G1Affine>,
}

struct LedgerState {
    commitments: CommitmentTree,
    nullifiers: HashSet<[u8; 32]>,
    transfers: Vec<ZkTransfer>,
    citizens: CommitmentTree,
    vote_papers: HashMap<[u8; 32], Vec<u8>>,
    vote_audit: CommitmentTree,
}

/// The shielded-state verifier engine.
pub struct Ledger {
    transfer: VerifierArtifacts,
    vote: VerifierArtifacts,
    state: RwLock<LedgerState>,
}

impl Ledger {
    pub fn new(transfer: VerifierArtifacts, vote: VerifierArtifacts) -> Ledger {
        Ledger {
            transfer,
            vote,
            state: RwLock::new(LedgerState {
                commitments: CommitmentTree::new(MERKLE_DEPTH),
                nullifiers: HashSet::new(),
                transfers: Vec::new(),
                citizens: CommitmentTree::new(MERKLE_DEPTH),
                vote_papers: HashMap::new(),
                vote_audit: CommitmentTree::new(MERKLE_DEPTH),
            }),
        }
    }

    // --- minting -------------------------------------------------------------

    /// Seed the ledger with a fresh note for `owner`. The only proof-less
    /// append; everything else goes through [`Ledger::verify_transfer`].
    pub fn mint<R: RngCore>(
        &self,
        rng: &mut R,
        owner: &PublicKey,
        amount: u128,
    ) -> Result<Fr> {
        let mut salt = [0u8; 32];
        rng.fill_bytes(&mut salt);
        let note = Note::new(*owner, amount, salt);
        let commitment = note.commitment();
        let enc_note = encrypt_for(rng, owner, &note.to_shared(), None)?;

        let mut state = self.write_state();
        state.commitments.push(commitment)?;
        let merkle_root = state.commitments.root();
        state.transfers.push(ZkTransfer {
            proof: Vec::new(),
            merkle_root,
            nullifier: Fr::zero(),
            new_note_commitment: commitment,
            change_note_commitment: Fr::zero(),
            enc_new_note: enc_note,
            enc_change_note: Vec::new(),
        });
        info!(amount, "minted note");
        Ok(commitment)
    }

    // --- transfers -----------------------------------------------------------

    /// Verify and apply a shielded transfer.
    ///
    /// The submitted Merkle root is ignored: the proof must verify against
    /// the engine's authoritative root at the time of verification, so a
    /// prover cannot bring its own tree.
    pub fn verify_transfer(&self, tx: &ZkTransfer) -> Result<()> {
        // 1. double-spend pre-check + root snapshot
        let nullifier_bytes = fr_to_bytes(&tx.nullifier);
        let root_snapshot = {
            let state = self.read_state();
            if state.nullifiers.contains(&nullifier_bytes) {
                return Err(Error::DoubleSpend);
            }
            state.commitments.root()
        };

        // 2. malformed-envelope checks
        if tx.proof.is_empty() {
            return Err(Error::MalformedInput("empty proof".into()));
        }
        if bool::from(tx.new_note_commitment.is_zero()) {
            return Err(Error::MalformedInput("zero new-note commitment".into()));
        }

        // 3. root override
        if tx.merkle_root != root_snapshot {
            debug!("overriding submitted merkle root with authoritative root");
        }
        let public = TransferPublicInputs {
            merkle_root: root_snapshot,
            nullifier: tx.nullifier,
            new_note_commitment: tx.new_note_commitment,
            change_note_commitment: tx.change_note_commitment,
        };

        // 4. SNARK verification, outside the lock
        if !crate::verify(
            &self.transfer.params,
            &self.transfer.vk,
            &tx.proof,
            &transfer_instances(&public),
        ) {
            return Err(Error::ProofRejected);
        }

        // 5. atomic commit, re-checked under the write lock
        let mut state = self.write_state();
        if state.nullifiers.contains(&nullifier_bytes) {
            return Err(Error::DoubleSpend);
        }
        if state.commitments.root() != root_snapshot {
            warn!("ledger advanced during verification; rejecting stale proof");
            return Err(Error::StaleRoot);
        }
        // capacity check up front so a full tree cannot leave the
        // nullifier recorded without its commitments
        let needed = if tx.has_change() { 2 } else { 1 };
        if state.commitments.num_leaves() + needed > 1u64 << MERKLE_DEPTH {
            return Err(Error::Internal("commitment tree is full".into()));
        }
        state.nullifiers.insert(nullifier_bytes);
        state.commitments.push(tx.new_note_commitment)?;
        if tx.has_change() {
            state.commitments.push(tx.change_note_commitment)?;
        }
        state.transfers.push(tx.clone());
        info!(
            commitments = state.commitments.num_leaves(),
            nullifiers = state.nullifiers.len(),
            "transfer accepted"
        );
        Ok(())
    }

    /// Whether a nullifier is already recorded.
    pub fn is_spent(&self, nullifier: &Fr) -> bool {
        self.read_state()
            .nullifiers
            .contains(&fr_to_bytes(nullifier))
    }

    /// Authoritative commitment-tree root.
    pub fn note_root(&self) -> Fr {
        self.read_state().commitments.root()
    }

    pub fn num_commitments(&self) -> u64 {
        self.read_state().commitments.num_leaves()
    }

    pub fn num_nullifiers(&self) -> usize {
        self.read_state().nullifiers.len()
    }

    /// Membership proof for a commitment, or `MalformedInput` if it was
    /// never accepted. Proofs stay valid against this root forever; the
    /// root-override rule is what forces submitters to stay current.
    pub fn membership_proof(&self, commitment: &Fr) -> Result<MerklePath> {
        let state = self.read_state();
        let index = state.commitments.find(commitment).ok_or_else(|| {
            Error::MalformedInput("commitment not found in the tree".into())
        })?;
        state.commitments.prove(index)
    }

    /// Accepted transfers (mints included) from `from_index` onward, for
    /// wallet discovery.
    pub fn transfers_since(&self, from_index: usize) -> Vec<ZkTransfer> {
        let state = self.read_state();
        state.transfers[from_index.min(state.transfers.len())..].to_vec()
    }

    // --- citizens & votes ----------------------------------------------------

    /// Enroll a citizen by the hash of their DID public key.
    pub fn enroll_citizen(&self, did_leaf: Fr) -> Result<u64> {
        let mut state = self.write_state();
        let index = state.citizens.push(did_leaf)?;
        info!(index, "citizen enrolled");
        Ok(index)
    }

    pub fn citizen_root(&self) -> Fr {
        self.read_state().citizens.root()
    }

    /// Membership proof for an enrolled DID leaf.
    pub fn citizen_membership(&self, did_leaf: &Fr) -> Result<MerklePath> {
        let state = self.read_state();
        let index = state.citizens.find(did_leaf).ok_or_else(|| {
            Error::MalformedInput("DID key is not enrolled".into())
        })?;
        state.citizens.prove(index)
    }

    /// Verify and record a ballot. A repeated paper id overwrites the
    /// previous choice (re-voting), which is safe because the paper id is
    /// bound in-circuit to the citizen's DID private key.
    pub fn verify_vote(&self, proof: &[u8], paper_id: Fr, choice: &[u8]) -> Result<()> {
        if proof.is_empty() {
            return Err(Error::MalformedInput("empty proof".into()));
        }
        if choice.is_empty() || choice.len() > 32 {
            return Err(Error::MalformedInput(
                "choice must be between 1 and 32 bytes".into(),
            ));
        }

        let root_snapshot = self.read_state().citizens.root();
        let public = VotePublicInputs {
            citizen_merkle_root: root_snapshot,
            vote_paper_id: paper_id,
            choice: reduce_canonical(choice),
        };
        if !crate::verify(
            &self.vote.params,
            &self.vote.vk,
            proof,
            &vote_instances(&public),
        ) {
            return Err(Error::ProofRejected);
        }

        let mut state = self.write_state();
        if state.citizens.root() != root_snapshot {
            warn!("citizen registry advanced during verification; rejecting stale ballot");
            return Err(Error::StaleRoot);
        }
        let paper_bytes = fr_to_bytes(&paper_id);
        state.vote_audit.push(paper_id)?;
        let revote = state
            .vote_papers
            .insert(paper_bytes, choice.to_vec())
            .is_some();
        info!(revote, "vote accepted");
        Ok(())
    }

    pub fn vote_paper_count(&self) -> usize {
        self.read_state().vote_papers.len()
    }

    /// Number of papers whose latest choice equals `choice`.
    pub fn count_choice(&self, choice: &[u8]) -> usize {
        self.read_state()
            .vote_papers
            .values()
            .filter(|c| c.as_slice() == choice)
            .count()
    }

    /// Latest recorded ballot for a paper id.
    pub fn vote_paper(&self, paper_id: &Fr) -> Option<VotePaper> {
        let paper_bytes = fr_to_bytes(paper_id);
        self.read_state()
            .vote_papers
            .get(&paper_bytes)
            .map(|choice| VotePaper {
                paper_id: paper_bytes,
                choice: choice.clone(),
            })
    }

    /// Root of the public audit tree of accepted paper ids.
    pub fn vote_audit_root(&self) -> Fr {
        self.read_state().vote_audit.root()
    }

    // --- lock plumbing -------------------------------------------------------

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, LedgerState> {
        self.state.read().expect("ledger lock poisoned")
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, LedgerState> {
        self.state.write().expect("ledger lock poisoned")
    }
}
