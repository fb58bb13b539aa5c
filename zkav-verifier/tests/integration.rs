//! End-to-end scenarios over real KZG setup, proving, and verification.
//!
//! Artifacts are generated once per circuit and shared across tests; each
//! test builds its own ledger.

use std::sync::OnceLock;

use halo2curves_axiom::bn256::Fr;
use rand::rngs::StdRng;
use rand::SeedableRng;

use zkav_circuit::{TransferCircuitInput, TransferPublicInputs, TransferWitness, MERKLE_DEPTH};
use zkav_common::jubjub::SigningKey;
use zkav_common::merkle::CommitmentTree;
use zkav_common::note::Note;
use zkav_common::reduce_canonical;
use zkav_common::tx::ZkTransfer;
use zkav_common::Error;
use zkav_prover::{
    prove_transfer_unchecked, prove_vote_unchecked, setup_transfer, setup_vote,
    CircuitArtifacts,
};
use zkav_verifier::{Ledger, VerifierArtifacts};
use zkav_wallet::citizen::Citizen;
use zkav_wallet::Wallet;

static TRANSFER_ARTIFACTS: OnceLock<CircuitArtifacts> = OnceLock::new();
static VOTE_ARTIFACTS: OnceLock<CircuitArtifacts> = OnceLock::new();

fn transfer_artifacts() -> &'static CircuitArtifacts {
    TRANSFER_ARTIFACTS.get_or_init(setup_transfer)
}

fn vote_artifacts() -> &'static CircuitArtifacts {
    VOTE_ARTIFACTS.get_or_init(setup_vote)
}

fn new_ledger() -> Ledger {
    let t = transfer_artifacts();
    let v = vote_artifacts();
    Ledger::new(
        VerifierArtifacts {
            params: t.params.clone(),
            vk: t.vk.clone(),
        },
        VerifierArtifacts {
            params: v.params.clone(),
            vk: v.vk.clone(),
        },
    )
}

/// Pull accepted transfers past `cursor` and track every discovered note.
fn sync_wallet(wallet: &mut Wallet, ledger: &Ledger, cursor: &mut usize) {
    let txs = ledger.transfers_since(*cursor);
    *cursor += txs.len();
    for tx in &txs {
        for note in wallet.scan_transfer(tx, |nf| ledger.is_spent(nf)) {
            wallet.add_note(note);
        }
    }
}

#[test]
fn happy_transfer_updates_both_balances() {
    let ledger = new_ledger();
    let mut rng = StdRng::seed_from_u64(1);
    let mut alice = Wallet::generate(&mut rng);
    let mut bob = Wallet::generate(&mut rng);
    let (mut alice_cursor, mut bob_cursor) = (0usize, 0usize);

    ledger.mint(&mut rng, &alice.public(), 100).unwrap();
    sync_wallet(&mut alice, &ledger, &mut alice_cursor);
    assert_eq!(alice.balance(), 100);

    let root_before = ledger.note_root();
    let using = alice.spendable_note(10, 0).unwrap().clone();
    let membership = ledger
        .membership_proof(&alice.note_of(&using).commitment())
        .unwrap();
    let (tx, _change) = alice
        .transfer(transfer_artifacts(), bob.address(), 10, 0, &using, &membership, &mut rng)
        .unwrap();

    ledger.verify_transfer(&tx).unwrap();
    assert_eq!(ledger.num_nullifiers(), 1);
    assert_eq!(ledger.num_commitments(), 3); // mint + new + change
    assert_ne!(ledger.note_root(), root_before);

    // sender drops the spent note and discovers the change note
    alice.remove_note(&using.salt);
    sync_wallet(&mut alice, &ledger, &mut alice_cursor);
    sync_wallet(&mut bob, &ledger, &mut bob_cursor);
    assert_eq!(alice.balance(), 90);
    assert_eq!(bob.balance(), 10);
}

#[test]
fn replayed_transfer_is_a_double_spend() {
    let ledger = new_ledger();
    let mut rng = StdRng::seed_from_u64(2);
    let mut alice = Wallet::generate(&mut rng);
    let bob = Wallet::generate(&mut rng);
    let mut cursor = 0usize;

    ledger.mint(&mut rng, &alice.public(), 100).unwrap();
    sync_wallet(&mut alice, &ledger, &mut cursor);

    let using = alice.spendable_note(10, 0).unwrap().clone();
    let membership = ledger
        .membership_proof(&alice.note_of(&using).commitment())
        .unwrap();
    let (tx, _) = alice
        .transfer(transfer_artifacts(), bob.address(), 10, 0, &using, &membership, &mut rng)
        .unwrap();

    ledger.verify_transfer(&tx).unwrap();
    assert!(matches!(
        ledger.verify_transfer(&tx),
        Err(Error::DoubleSpend)
    ));
}

#[test]
fn proof_against_fabricated_tree_is_rejected() {
    let ledger = new_ledger();
    let mut rng = StdRng::seed_from_u64(3);
    let mut alice = Wallet::generate(&mut rng);
    let mut faker = Wallet::generate(&mut rng);

    // something legitimate on the ledger, so roots are not trivially equal
    let mut cursor = 0usize;
    ledger.mint(&mut rng, &alice.public(), 100).unwrap();
    sync_wallet(&mut alice, &ledger, &mut cursor);

    // the faker builds a private tree holding a rich note and proves
    // against it; the proof itself is sound, just not against our root
    let fake_note = Note::new(faker.public(), 1_000_000, [7u8; 32]);
    let mut fake_tree = CommitmentTree::new(MERKLE_DEPTH);
    let index = fake_tree.push(fake_note.commitment()).unwrap();
    let fake_membership = fake_tree.prove(index).unwrap();

    faker.add_note(fake_note.to_shared());
    let using = faker.notes()[0].clone();
    let (tx, _) = faker
        .transfer(
            transfer_artifacts(),
            alice.address(),
            10,
            0,
            &using,
            &fake_membership,
            &mut rng,
        )
        .unwrap();

    assert!(matches!(
        ledger.verify_transfer(&tx),
        Err(Error::ProofRejected)
    ));
}

#[test]
fn nonexistent_note_fails_at_prover_or_verifier() {
    let ledger = new_ledger();
    let mut rng = StdRng::seed_from_u64(4);
    let mut alice = Wallet::generate(&mut rng);
    let bob = Wallet::generate(&mut rng);
    let mut cursor = 0usize;

    ledger.mint(&mut rng, &alice.public(), 100).unwrap();
    sync_wallet(&mut alice, &ledger, &mut cursor);

    // a note that was never committed, spent with the path of a real note
    let phantom = Note::new(alice.public(), 1_000_000, [9u8; 32]);
    let real = alice.notes()[0].clone();
    let membership = ledger
        .membership_proof(&alice.note_of(&real).commitment())
        .unwrap();

    let err = alice
        .transfer(
            transfer_artifacts(),
            bob.address(),
            10,
            0,
            &phantom.to_shared(),
            &membership,
            &mut rng,
        )
        .unwrap_err();
    assert!(matches!(err, Error::CircuitUnsatisfied(_)));

    // force the proof with a forged path head: the witness check is
    // bypassed, and the verifier rejects whatever comes out
    let (s0, s1) = alice.signing_key().scalar_halves();
    let new_note = Note::new(bob.public(), 10, [1u8; 32]);
    let change_note = Note::new(alice.public(), 999_990, phantom.salt);
    let mut forged_path = membership.path.clone();
    forged_path[0] = phantom.commitment();
    let input = TransferCircuitInput {
        witness: TransferWitness {
            s0,
            s1,
            version: phantom.version,
            from_pub: alice.public().0,
            balance: phantom.balance,
            salt0: reduce_canonical(&phantom.salt),
            spent_commitment: phantom.commitment(),
            leaf_index: membership.leaf_index,
            merkle_path: forged_path,
            amount: 10,
            fee: 0,
            to_pub: bob.public().0,
            salt1: reduce_canonical(&new_note.salt),
        },
        public: TransferPublicInputs {
            merkle_root: ledger.note_root(),
            nullifier: phantom.nullifier(&s0, &s1),
            new_note_commitment: new_note.commitment(),
            change_note_commitment: change_note.commitment(),
        },
    };
    match prove_transfer_unchecked(transfer_artifacts(), input) {
        Ok(proof) => {
            let tx = ZkTransfer {
                proof,
                merkle_root: ledger.note_root(),
                nullifier: phantom.nullifier(&s0, &s1),
                new_note_commitment: new_note.commitment(),
                change_note_commitment: change_note.commitment(),
                enc_new_note: vec![0u8; 48],
                enc_change_note: Vec::new(),
            };
            assert!(matches!(
                ledger.verify_transfer(&tx),
                Err(Error::ProofRejected)
            ));
        }
        // the SNARK solver may also fail outright on the unsatisfiable witness
        Err(_) => {}
    }
}

#[test]
fn tampered_ciphertext_denies_receiver_but_not_the_spend() {
    let ledger = new_ledger();
    let mut rng = StdRng::seed_from_u64(5);
    let mut alice = Wallet::generate(&mut rng);
    let mut bob = Wallet::generate(&mut rng);
    let (mut alice_cursor, mut bob_cursor) = (0usize, 0usize);

    ledger.mint(&mut rng, &alice.public(), 100).unwrap();
    sync_wallet(&mut alice, &ledger, &mut alice_cursor);

    let using = alice.spendable_note(10, 0).unwrap().clone();
    let membership = ledger
        .membership_proof(&alice.note_of(&using).commitment())
        .unwrap();
    let (mut tx, _) = alice
        .transfer(transfer_artifacts(), bob.address(), 10, 0, &using, &membership, &mut rng)
        .unwrap();

    // flip one ciphertext byte in transit; the circuit does not bind it
    let last = tx.enc_new_note.len() - 1;
    tx.enc_new_note[last] ^= 0x01;
    ledger.verify_transfer(&tx).unwrap();

    // the spend happened, but the receiver cannot discover the note
    alice.remove_note(&using.salt);
    sync_wallet(&mut alice, &ledger, &mut alice_cursor);
    sync_wallet(&mut bob, &ledger, &mut bob_cursor);
    assert_eq!(alice.balance(), 90);
    assert_eq!(bob.balance(), 0);
}

#[test]
fn vote_revote_and_tally() {
    let ledger = new_ledger();
    let mut rng = StdRng::seed_from_u64(6);
    let citizen = Citizen::new("alice", &mut rng);
    ledger.enroll_citizen(citizen.did_leaf()).unwrap();
    let membership = ledger.citizen_membership(&citizen.did_leaf()).unwrap();

    let first = citizen.vote(vote_artifacts(), b"1", &membership).unwrap();
    ledger
        .verify_vote(&first.proof, first.paper_id, &first.choice)
        .unwrap();
    assert_eq!(ledger.count_choice(b"1"), 1);

    let second = citizen.vote(vote_artifacts(), b"2", &membership).unwrap();
    ledger
        .verify_vote(&second.proof, second.paper_id, &second.choice)
        .unwrap();

    // re-voting overwrote the first choice; one paper, latest choice wins
    assert_eq!(ledger.vote_paper_count(), 1);
    assert_eq!(ledger.count_choice(b"1"), 0);
    assert_eq!(ledger.count_choice(b"2"), 1);
    assert_eq!(
        ledger.vote_paper(&citizen.paper_id()).unwrap().choice,
        b"2".to_vec()
    );
}

#[test]
fn vote_impersonation_fails_at_key_ownership() {
    let ledger = new_ledger();
    let mut rng = StdRng::seed_from_u64(7);
    let victim = Citizen::new("victim", &mut rng);
    ledger.enroll_citizen(victim.did_leaf()).unwrap();
    let membership = ledger.citizen_membership(&victim.did_leaf()).unwrap();

    // the hacker has the victim's public data (paper id, DID key, path) but
    // substitutes their own scalar and signature
    let hacker = SigningKey::generate(&mut rng);
    let (h0, h1) = hacker.scalar_halves();
    let mut input = victim.vote_input(b"1", &membership).unwrap();
    input.witness.s0 = h0;
    input.witness.s1 = h1;
    input.witness.choice_sig = hacker.sign(input.public.choice);

    let err = zkav_prover::prove_vote(vote_artifacts(), input.clone()).unwrap_err();
    assert!(matches!(err, Error::CircuitUnsatisfied(_)));

    // even a forced proof cannot pass the verifier
    match prove_vote_unchecked(vote_artifacts(), input) {
        Ok(proof) => {
            let paper_id = victim.paper_id();
            assert!(matches!(
                ledger.verify_vote(&proof, paper_id, b"1"),
                Err(Error::ProofRejected)
            ));
        }
        Err(_) => {}
    }
}

#[test]
fn malformed_submissions_are_rejected_before_verification() {
    let ledger = new_ledger();
    let mut rng = StdRng::seed_from_u64(8);

    let empty_proof = ZkTransfer {
        proof: Vec::new(),
        merkle_root: Fr::zero(),
        nullifier: Fr::from(1),
        new_note_commitment: Fr::from(2),
        change_note_commitment: Fr::zero(),
        enc_new_note: Vec::new(),
        enc_change_note: Vec::new(),
    };
    assert!(matches!(
        ledger.verify_transfer(&empty_proof),
        Err(Error::MalformedInput(_))
    ));

    let zero_commitment = ZkTransfer {
        proof: vec![1, 2, 3],
        merkle_root: Fr::zero(),
        nullifier: Fr::from(1),
        new_note_commitment: Fr::zero(),
        change_note_commitment: Fr::zero(),
        enc_new_note: Vec::new(),
        enc_change_note: Vec::new(),
    };
    assert!(matches!(
        ledger.verify_transfer(&zero_commitment),
        Err(Error::MalformedInput(_))
    ));

    // garbage proof bytes fail in the transcript, surfacing as rejection
    let citizen = Citizen::new("c", &mut rng);
    ledger.enroll_citizen(citizen.did_leaf()).unwrap();
    assert!(matches!(
        ledger.verify_vote(&[0xFF; 64], citizen.paper_id(), b"1"),
        Err(Error::ProofRejected)
    ));
    assert!(matches!(
        ledger.verify_vote(&[], citizen.paper_id(), b"1"),
        Err(Error::MalformedInput(_))
    ));
}

#[test]
fn wire_round_trip_survives_verification() {
    let ledger = new_ledger();
    let mut rng = StdRng::seed_from_u64(9);
    let mut alice = Wallet::generate(&mut rng);
    let bob = Wallet::generate(&mut rng);
    let mut cursor = 0usize;

    ledger.mint(&mut rng, &alice.public(), 100).unwrap();
    sync_wallet(&mut alice, &ledger, &mut cursor);

    let using = alice.spendable_note(25, 5).unwrap().clone();
    let membership = ledger
        .membership_proof(&alice.note_of(&using).commitment())
        .unwrap();
    let (tx, _) = alice
        .transfer(transfer_artifacts(), bob.address(), 25, 5, &using, &membership, &mut rng)
        .unwrap();

    // ship over the wire and back before verification
    let decoded = ZkTransfer::decode(&tx.encode()).unwrap();
    assert_eq!(decoded, tx);
    ledger.verify_transfer(&decoded).unwrap();
    assert_eq!(ledger.num_commitments(), 3);
}
