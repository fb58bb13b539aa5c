//! Citizens and their ballots.
//!
//! A citizen holds a long-term DID keypair. The hash of the DID public key
//! is what enters the citizens' Merkle tree; the vote paper id is derived
//! from the DID *private* scalar, so holding the paper id (or even the DID
//! public key) without the key is useless for voting.

use halo2curves_axiom::bn256::Fr;
use rand::RngCore;

use zkav_circuit::{VoteCircuitInput, VotePublicInputs, VoteWitness, MERKLE_DEPTH};
use zkav_common::jubjub::{PublicKey, SigningKey};
use zkav_common::merkle::MerklePath;
use zkav_common::mimc::mimc_hash;
use zkav_common::{reduce_canonical, Error, Result};
use zkav_prover::{prove_vote, CircuitArtifacts};

/// A ballot ready for submission: the proof plus its public inputs.
#[derive(Clone, Debug)]
pub struct Ballot {
    pub proof: Vec<u8>,
    pub paper_id: Fr,
    pub choice: Vec<u8>,
}

/// An enrolled (or enrollable) citizen identity.
pub struct Citizen {
    pub name: String,
    did_key: SigningKey,
}

impl Citizen {
    pub fn new<R: RngCore>(name: impl Into<String>, rng: &mut R) -> Citizen {
        Citizen {
            name: name.into(),
            did_key: SigningKey::generate(rng),
        }
    }

    pub fn did_public(&self) -> PublicKey {
        self.did_key.public()
    }

    /// The leaf the registry pushes into the citizens' tree:
    /// `H(did_pub.x, did_pub.y)`.
    pub fn did_leaf(&self) -> Fr {
        let point = self.did_public().0;
        mimc_hash(&[point.x, point.y])
    }

    /// Deterministic per-citizen voting token:
    /// `paper_id = H(s0, s1, did_pub.x, did_pub.y)`.
    pub fn paper_id(&self) -> Fr {
        let (s0, s1) = self.did_key.scalar_halves();
        let point = self.did_public().0;
        mimc_hash(&[
            reduce_canonical(&s0),
            reduce_canonical(&s1),
            point.x,
            point.y,
        ])
    }

    /// Assemble the vote-circuit input for a choice, given the membership
    /// path the registry served for our DID leaf.
    pub fn vote_input(&self, choice: &[u8], membership: &MerklePath) -> Result<VoteCircuitInput> {
        if choice.is_empty() || choice.len() > 32 {
            return Err(Error::MalformedInput(
                "choice must be between 1 and 32 bytes".into(),
            ));
        }
        if membership.path.len() != MERKLE_DEPTH + 1 {
            return Err(Error::MalformedInput(format!(
                "membership path has {} entries, expected {}",
                membership.path.len(),
                MERKLE_DEPTH + 1
            )));
        }
        let choice_fr = reduce_canonical(choice);
        let (s0, s1) = self.did_key.scalar_halves();
        Ok(VoteCircuitInput {
            witness: VoteWitness {
                s0,
                s1,
                did_pub: self.did_public().0,
                leaf_index: membership.leaf_index,
                merkle_path: membership.path.clone(),
                choice_sig: self.did_key.sign(choice_fr),
            },
            public: VotePublicInputs {
                citizen_merkle_root: membership.root,
                vote_paper_id: self.paper_id(),
                choice: choice_fr,
            },
        })
    }

    /// Prove a ballot for `choice`.
    pub fn vote(
        &self,
        artifacts: &CircuitArtifacts,
        choice: &[u8],
        membership: &MerklePath,
    ) -> Result<Ballot> {
        let input = self.vote_input(choice, membership)?;
        let proof = prove_vote(artifacts, input)?;
        Ok(Ballot {
            proof,
            paper_id: self.paper_id(),
            choice: choice.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use zkav_common::merkle::CommitmentTree;
    use zkav_prover::check_vote_witness;

    #[test]
    fn paper_id_is_deterministic_and_distinct() {
        let mut rng = StdRng::seed_from_u64(50);
        let a = Citizen::new("a", &mut rng);
        let b = Citizen::new("b", &mut rng);
        assert_eq!(a.paper_id(), a.paper_id());
        assert_ne!(a.paper_id(), b.paper_id());
    }

    #[test]
    fn vote_input_satisfies_the_circuit_natively() {
        let mut rng = StdRng::seed_from_u64(51);
        let citizen = Citizen::new("c", &mut rng);
        let mut tree = CommitmentTree::new(MERKLE_DEPTH);
        let index = tree.push(citizen.did_leaf()).unwrap();
        let membership = tree.prove(index).unwrap();

        let input = citizen.vote_input(b"1", &membership).unwrap();
        assert!(check_vote_witness(&input).is_ok());
    }

    #[test]
    fn vote_input_rejects_oversized_choice() {
        let mut rng = StdRng::seed_from_u64(52);
        let citizen = Citizen::new("c", &mut rng);
        let mut tree = CommitmentTree::new(MERKLE_DEPTH);
        let index = tree.push(citizen.did_leaf()).unwrap();
        let membership = tree.prove(index).unwrap();
        assert!(citizen.vote_input(&[0u8; 40], &membership).is_err());
    }
}
