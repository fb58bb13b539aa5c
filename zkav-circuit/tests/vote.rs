use halo2_proofs_axiom::dev::MockProver;
use halo2curves_axiom::bn256::Fr;
use rand::rngs::StdRng;
use rand::SeedableRng;

use zkav_circuit::{
    vote_instances, VoteCircuit, VoteCircuitInput, VotePublicInputs, VoteWitness, DEFAULT_K,
    MERKLE_DEPTH,
};
use zkav_common::jubjub::SigningKey;
use zkav_common::merkle::CommitmentTree;
use zkav_common::mimc::mimc_hash;
use zkav_common::reduce_canonical;

fn did_leaf(key: &SigningKey) -> Fr {
    let point = key.public().0;
    mimc_hash(&[point.x, point.y])
}

fn paper_id(key: &SigningKey) -> Fr {
    let (s0, s1) = key.scalar_halves();
    let point = key.public().0;
    mimc_hash(&[
        reduce_canonical(&s0),
        reduce_canonical(&s1),
        point.x,
        point.y,
    ])
}

struct Fixture {
    input: VoteCircuitInput,
    citizen: SigningKey,
}

impl Fixture {
    /// Three enrolled citizens; the second casts a ballot for choice 1.
    fn new() -> Fixture {
        let mut rng = StdRng::seed_from_u64(0xC171);
        let citizens: Vec<SigningKey> =
            (0..3).map(|_| SigningKey::generate(&mut rng)).collect();

        let mut tree = CommitmentTree::new(MERKLE_DEPTH);
        for citizen in &citizens {
            tree.push(did_leaf(citizen)).unwrap();
        }

        let voter = citizens[1].clone();
        let leaf_index = 1;
        let proof = tree.prove(leaf_index).unwrap();

        let choice = Fr::from(1);
        let (s0, s1) = voter.scalar_halves();
        let input = VoteCircuitInput {
            witness: VoteWitness {
                s0,
                s1,
                did_pub: voter.public().0,
                leaf_index,
                merkle_path: proof.path,
                choice_sig: voter.sign(choice),
            },
            public: VotePublicInputs {
                citizen_merkle_root: tree.root(),
                vote_paper_id: paper_id(&voter),
                choice,
            },
        };
        Fixture {
            input,
            citizen: voter,
        }
    }
}

fn run_mock_prover(input: VoteCircuitInput) -> MockProver<Fr> {
    let instances = vote_instances(&input.public);
    let circuit = VoteCircuit::new(Some(input));
    MockProver::run(DEFAULT_K as u32, &circuit, instances).expect("mock prover runs")
}

#[test]
fn valid_vote_satisfies_circuit() {
    run_mock_prover(Fixture::new().input).assert_satisfied();
}

#[test]
fn non_citizen_fails_membership() {
    let fixture = Fixture::new();
    let outsider = SigningKey::generate(&mut StdRng::seed_from_u64(0x0FF));
    let (s0, s1) = outsider.scalar_halves();

    let mut input = fixture.input;
    input.witness.s0 = s0;
    input.witness.s1 = s1;
    input.witness.did_pub = outsider.public().0;
    input.witness.choice_sig = outsider.sign(input.public.choice);
    input.public.vote_paper_id = {
        let point = outsider.public().0;
        mimc_hash(&[
            reduce_canonical(&s0),
            reduce_canonical(&s1),
            point.x,
            point.y,
        ])
    };
    assert!(run_mock_prover(input).verify().is_err());
}

#[test]
fn impersonation_with_victim_paper_id_fails() {
    // A hacker pastes the victim's paper id (and DID key) but can only sign
    // and derive with their own scalar: the key-ownership assertion breaks.
    let fixture = Fixture::new();
    let hacker = SigningKey::generate(&mut StdRng::seed_from_u64(0x4AC));
    let (h0, h1) = hacker.scalar_halves();

    let mut input = fixture.input;
    input.witness.s0 = h0;
    input.witness.s1 = h1;
    input.witness.choice_sig = hacker.sign(input.public.choice);
    assert!(run_mock_prover(input).verify().is_err());
}

#[test]
fn forged_paper_id_fails() {
    let mut input = Fixture::new().input;
    input.public.vote_paper_id += Fr::one();
    assert!(run_mock_prover(input).verify().is_err());
}

#[test]
fn swapped_choice_fails_signature_check() {
    // The submitting service flips the ballot after signing: the EdDSA
    // assertion over the public choice rejects it.
    let mut input = Fixture::new().input;
    input.public.choice = Fr::from(2);
    assert!(run_mock_prover(input).verify().is_err());
}

#[test]
fn tampered_signature_fails() {
    let fixture = Fixture::new();
    let mut input = fixture.input;
    let other_sig = fixture.citizen.sign(Fr::from(99));
    input.witness.choice_sig = other_sig;
    assert!(run_mock_prover(input).verify().is_err());
}
