// zkav-prover/src/lib.rs
//
// SNARK invocation for the transfer and vote circuits: per-circuit KZG
// setup, an in-process witness satisfaction check that surfaces the actual
// cause of an unprovable spend, and proof creation over the Blake2b
// transcript.

pub mod artifacts;

use halo2_proofs_axiom::{
    plonk::{self, create_proof, keygen_pk, keygen_vk},
    poly::kzg::{
        commitment::{KZGCommitmentScheme, ParamsKZG},
        multiopen::ProverGWC,
    },
    transcript::{Blake2bWrite, Challenge255, TranscriptWriterBuffer},
};
use halo2curves_axiom::bn256::{Bn256, Fr, G1Affine};
use halo2curves_axiom::ff::PrimeField;
use num_bigint::BigUint;
use rand::{rngs::OsRng, RngCore};

use zkav_circuit::{
    transfer_instances, vote_instances, TransferCircuit, TransferCircuitInput, VoteCircuit,
    VoteCircuitInput, DEFAULT_K,
};
use zkav_common::jubjub::{self, AffinePoint, PublicKey, GENERATOR, SUBGROUP_ORDER};
use zkav_common::merkle::verify_path;
use zkav_common::mimc::mimc_hash;
use zkav_common::{reduce_canonical, Error, Result};

/// KZG params plus the key pair for one circuit.
pub struct CircuitArtifacts {
    pub params: ParamsKZG<Bn256>,
    pub vk: plonk::VerifyingKey<G1Affine>,
    pub pk: plonk::ProvingKey<G1Affine>,
}

/// Generate params and keys for the transfer circuit at the default size.
pub fn setup_transfer() -> CircuitArtifacts {
    setup_transfer_with_k(DEFAULT_K as u32)
}

pub fn setup_transfer_with_k(k: u32) -> CircuitArtifacts {
    let mut rng = OsRng;
    let params = ParamsKZG::<Bn256>::setup(k, &mut rng);
    let empty_circuit = TransferCircuit::default();
    let vk = keygen_vk(&params, &empty_circuit).expect("transfer vk");
    let pk = keygen_pk(&params, vk.clone(), &empty_circuit).expect("transfer pk");
    CircuitArtifacts { params, vk, pk }
}

/// Generate params and keys for the vote circuit at the default size.
pub fn setup_vote() -> CircuitArtifacts {
    setup_vote_with_k(DEFAULT_K as u32)
}

pub fn setup_vote_with_k(k: u32) -> CircuitArtifacts {
    let mut rng = OsRng;
    let params = ParamsKZG::<Bn256>::setup(k, &mut rng);
    let empty_circuit = VoteCircuit::default();
    let vk = keygen_vk(&params, &empty_circuit).expect("vote vk");
    let pk = keygen_pk(&params, vk.clone(), &empty_circuit).expect("vote pk");
    CircuitArtifacts { params, vk, pk }
}

/// Prove a transfer after checking the witness actually satisfies the
/// circuit; an unsatisfiable witness fails fast with the underlying cause
/// instead of producing a proof the verifier will reject.
pub fn prove_transfer(
    artifacts: &CircuitArtifacts,
    input: TransferCircuitInput,
) -> Result<Vec<u8>> {
    prove_transfer_with_rng(artifacts, input, &mut OsRng)
}

pub fn prove_transfer_with_rng<R: RngCore>(
    artifacts: &CircuitArtifacts,
    input: TransferCircuitInput,
    rng: &mut R,
) -> Result<Vec<u8>> {
    check_transfer_witness(&input)?;
    create_transfer_proof(artifacts, input, rng)
}

/// Prove a ballot after checking witness satisfaction.
pub fn prove_vote(artifacts: &CircuitArtifacts, input: VoteCircuitInput) -> Result<Vec<u8>> {
    prove_vote_with_rng(artifacts, input, &mut OsRng)
}

pub fn prove_vote_with_rng<R: RngCore>(
    artifacts: &CircuitArtifacts,
    input: VoteCircuitInput,
    rng: &mut R,
) -> Result<Vec<u8>> {
    check_vote_witness(&input)?;
    create_vote_proof(artifacts, input, rng)
}

/// Test-only: prove without the witness satisfaction check. An unsatisfiable
/// witness yields a proof the verifier rejects, which is exactly what the
/// negative scenarios exercise.
#[cfg(feature = "force-prove")]
pub fn prove_transfer_unchecked(
    artifacts: &CircuitArtifacts,
    input: TransferCircuitInput,
) -> Result<Vec<u8>> {
    create_transfer_proof(artifacts, input, &mut OsRng)
}

/// Test-only counterpart of [`prove_transfer_unchecked`] for ballots.
#[cfg(feature = "force-prove")]
pub fn prove_vote_unchecked(
    artifacts: &CircuitArtifacts,
    input: VoteCircuitInput,
) -> Result<Vec<u8>> {
    create_vote_proof(artifacts, input, &mut OsRng)
}

fn create_transfer_proof<R: RngCore>(
    artifacts: &CircuitArtifacts,
    input: TransferCircuitInput,
    rng: &mut R,
) -> Result<Vec<u8>> {
    let instance_columns = transfer_instances(&input.public);
    let circuit = TransferCircuit::new_prover(input);
    create_proof_bytes(artifacts, circuit, instance_columns, rng)
}

fn create_vote_proof<R: RngCore>(
    artifacts: &CircuitArtifacts,
    input: VoteCircuitInput,
    rng: &mut R,
) -> Result<Vec<u8>> {
    let instance_columns = vote_instances(&input.public);
    let circuit = VoteCircuit::new_prover(input);
    create_proof_bytes(artifacts, circuit, instance_columns, rng)
}

fn create_proof_bytes<C, R>(
    artifacts: &CircuitArtifacts,
    circuit: C,
    instance_columns: Vec<Vec<Fr>>,
    rng: &mut R,
) -> Result<Vec<u8>>
where
    C: plonk::Circuit<Fr>,
    R: RngCore,
{
    let instance_refs: Vec<&[Fr]> = instance_columns.iter().map(|col| col.as_slice()).collect();

    let mut transcript = Blake2bWrite::<_, G1Affine, Challenge255<_>>::init(vec![]);
    create_proof::<KZGCommitmentScheme<Bn256>, ProverGWC<'_, Bn256>, _, _, _, _>(
        &artifacts.params,
        &artifacts.pk,
        &[circuit],
        &[instance_refs.as_slice()],
        rng,
        &mut transcript,
    )
    .map_err(|e| Error::Internal(format!("proof generation failed: {e:?}")))?;
    Ok(transcript.finalize())
}

// === Witness satisfaction ======================================================================

/// Native re-evaluation of every transfer-circuit assertion. Mirrors the
/// in-circuit order so the first reported cause matches what the SNARK
/// solver would hit.
pub fn check_transfer_witness(input: &TransferCircuitInput) -> Result<()> {
    let w = &input.witness;
    let p = &input.public;

    let derived = derive_public_key(&w.s0, &w.s1);
    if derived != w.from_pub {
        return Err(Error::CircuitUnsatisfied(
            "spending key does not derive the note owner key".into(),
        ));
    }
    if !w.to_pub.is_on_curve() {
        return Err(Error::CircuitUnsatisfied("recipient key not on curve".into()));
    }

    let spent = witness_commitment(w.version, &w.from_pub, w.balance, w.salt0);
    if spent != w.spent_commitment {
        return Err(Error::CircuitUnsatisfied(
            "witness does not reproduce the spent commitment".into(),
        ));
    }

    if w.merkle_path.first() != Some(&w.spent_commitment) {
        return Err(Error::CircuitUnsatisfied(
            "merkle path does not start at the spent commitment".into(),
        ));
    }
    if !verify_path(
        p.merkle_root,
        w.merkle_path.len() - 1,
        w.leaf_index,
        &w.merkle_path,
    ) {
        return Err(Error::CircuitUnsatisfied(
            "note is not in the tree under the declared root".into(),
        ));
    }

    let nk = mimc_hash(&[reduce_canonical(&w.s0), reduce_canonical(&w.s1)]);
    if mimc_hash(&[nk, w.spent_commitment]) != p.nullifier {
        return Err(Error::CircuitUnsatisfied("nullifier mismatch".into()));
    }

    let need = w
        .amount
        .checked_add(w.fee)
        .ok_or_else(|| Error::CircuitUnsatisfied("amount + fee overflows".into()))?;
    if need > w.balance {
        return Err(Error::CircuitUnsatisfied("insufficient balance".into()));
    }

    if witness_commitment(w.version, &w.to_pub, w.amount, w.salt1) != p.new_note_commitment {
        return Err(Error::CircuitUnsatisfied("new note commitment mismatch".into()));
    }

    let change = w.balance - need;
    let expected_change = if change == 0 {
        Fr::zero()
    } else {
        witness_commitment(w.version, &w.from_pub, change, w.salt0)
    };
    if expected_change != p.change_note_commitment {
        return Err(Error::CircuitUnsatisfied(
            "change note commitment mismatch".into(),
        ));
    }

    Ok(())
}

/// Native re-evaluation of every vote-circuit assertion.
pub fn check_vote_witness(input: &VoteCircuitInput) -> Result<()> {
    let w = &input.witness;
    let p = &input.public;

    let leaf = mimc_hash(&[w.did_pub.x, w.did_pub.y]);
    if w.merkle_path.first() != Some(&leaf) {
        return Err(Error::CircuitUnsatisfied(
            "merkle path does not start at the DID key hash".into(),
        ));
    }
    if !verify_path(
        p.citizen_merkle_root,
        w.merkle_path.len() - 1,
        w.leaf_index,
        &w.merkle_path,
    ) {
        return Err(Error::CircuitUnsatisfied(
            "DID key is not enrolled under the declared root".into(),
        ));
    }

    if derive_public_key(&w.s0, &w.s1) != w.did_pub {
        return Err(Error::CircuitUnsatisfied(
            "scalar halves do not derive the DID key".into(),
        ));
    }

    let paper_id = mimc_hash(&[
        reduce_canonical(&w.s0),
        reduce_canonical(&w.s1),
        w.did_pub.x,
        w.did_pub.y,
    ]);
    if paper_id != p.vote_paper_id {
        return Err(Error::CircuitUnsatisfied("vote paper id mismatch".into()));
    }

    if BigUint::from_bytes_be(&w.choice_sig.s) >= *SUBGROUP_ORDER {
        return Err(Error::CircuitUnsatisfied("signature scalar out of range".into()));
    }
    jubjub::verify(&PublicKey(w.did_pub), p.choice, &w.choice_sig)
        .map_err(|_| Error::CircuitUnsatisfied("choice signature does not verify".into()))?;

    Ok(())
}

fn derive_public_key(s0: &[u8; 16], s1: &[u8; 16]) -> AffinePoint {
    let mut scalar = [0u8; 32];
    scalar[..16].copy_from_slice(s0);
    scalar[16..].copy_from_slice(s1);
    GENERATOR.mul_scalar_be(&scalar)
}

fn witness_commitment(version: u8, owner: &AffinePoint, balance: u128, salt: Fr) -> Fr {
    mimc_hash(&[
        Fr::from(version as u64),
        owner.x,
        owner.y,
        Fr::from_u128(balance),
        salt,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use zkav_circuit::{
        TransferPublicInputs, TransferWitness, MERKLE_DEPTH,
    };
    use zkav_common::jubjub::SigningKey;
    use zkav_common::merkle::CommitmentTree;
    use zkav_common::note::Note;

    fn consistent_input() -> TransferCircuitInput {
        let mut rng = StdRng::seed_from_u64(77);
        let alice = SigningKey::generate(&mut rng);
        let bob = SigningKey::generate(&mut rng);
        let note = Note::new(alice.public(), 50, [1u8; 32]);

        let mut tree = CommitmentTree::new(MERKLE_DEPTH);
        let leaf_index = tree.push(note.commitment()).unwrap();
        let proof = tree.prove(leaf_index).unwrap();

        let (s0, s1) = alice.scalar_halves();
        let new_note = Note::new(bob.public(), 20, [2u8; 32]);
        let change_note = Note::new(alice.public(), 30, note.salt);

        TransferCircuitInput {
            witness: TransferWitness {
                s0,
                s1,
                version: note.version,
                from_pub: alice.public().0,
                balance: 50,
                salt0: reduce_canonical(&note.salt),
                spent_commitment: note.commitment(),
                leaf_index,
                merkle_path: proof.path,
                amount: 20,
                fee: 0,
                to_pub: bob.public().0,
                salt1: reduce_canonical(&new_note.salt),
            },
            public: TransferPublicInputs {
                merkle_root: tree.root(),
                nullifier: note.nullifier(&s0, &s1),
                new_note_commitment: new_note.commitment(),
                change_note_commitment: change_note.commitment(),
            },
        }
    }

    #[test]
    fn consistent_witness_passes() {
        assert!(check_transfer_witness(&consistent_input()).is_ok());
    }

    #[test]
    fn unknown_note_is_reported() {
        let mut input = consistent_input();
        input.public.merkle_root += Fr::one();
        let err = check_transfer_witness(&input).unwrap_err();
        assert!(matches!(err, Error::CircuitUnsatisfied(_)));
        assert!(err.to_string().contains("not in the tree"));
    }

    #[test]
    fn wrong_key_is_reported() {
        let mut input = consistent_input();
        let stranger = SigningKey::generate(&mut StdRng::seed_from_u64(78));
        let (s0, s1) = stranger.scalar_halves();
        input.witness.s0 = s0;
        input.witness.s1 = s1;
        let err = check_transfer_witness(&input).unwrap_err();
        assert!(err.to_string().contains("spending key"));
    }

    #[test]
    fn insufficient_balance_is_reported() {
        let mut input = consistent_input();
        input.witness.amount = 60;
        let err = check_transfer_witness(&input).unwrap_err();
        assert!(err.to_string().contains("insufficient balance"));
    }
}
