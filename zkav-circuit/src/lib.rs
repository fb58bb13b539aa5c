// zkav-circuit/src/lib.rs
//
// The two shielded-state circuits: Transfer (spend + create + change) and
// Vote (eligible single-identity ballot). Both are built on halo2-base's
// single-phase gate/range chips; public inputs sit one value per instance
// column.

pub mod gadgets;

use halo2_base::{
    gates::{
        circuit::builder::BaseCircuitBuilder,
        circuit::{BaseCircuitParams, BaseConfig, CircuitBuilderStage},
        GateInstructions, RangeInstructions,
    },
    AssignedValue,
    QuantumCell::Constant,
};
use halo2_proofs_axiom::{
    circuit::{Layouter, SimpleFloorPlanner},
    plonk::{Circuit, ConstraintSystem, Error},
};
use halo2curves_axiom::bn256::Fr;

use zkav_common::jubjub::{AffinePoint, Signature, GENERATOR};
use zkav_common::reduce_canonical;

use crate::gadgets::balance::{assign_value, constrain_spend_covered};
use crate::gadgets::eddsa::constrain_eddsa;
use crate::gadgets::edwards::{self, constrain_on_curve, derive_public_key, load_point};
use crate::gadgets::merkle::constrain_membership;
use crate::gadgets::mimc::mimc_hash;

/// Depth of the commitment and citizen Merkle trees the circuits are
/// compiled for. Trees hold at most `2^MERKLE_DEPTH` leaves.
pub const MERKLE_DEPTH: usize = 16;

/// Default circuit size (rows = 2^k).
pub const DEFAULT_K: usize = 17;

const DEFAULT_LOOKUP_BITS: usize = 16;
const DEFAULT_ADVICE_PER_PHASE: usize = 4;
const DEFAULT_FIXED_COLUMNS: usize = 1;
const DEFAULT_LOOKUP_ADVICE_PER_PHASE: usize = 1;

/// Instance-column count of the transfer circuit.
pub const TRANSFER_INSTANCE_COLUMNS: usize = 4;

/// Instance-column count of the vote circuit.
pub const VOTE_INSTANCE_COLUMNS: usize = 3;

fn base_params(num_instance_columns: usize) -> BaseCircuitParams {
    BaseCircuitParams {
        k: DEFAULT_K,
        num_advice_per_phase: vec![DEFAULT_ADVICE_PER_PHASE],
        num_fixed: DEFAULT_FIXED_COLUMNS,
        num_lookup_advice_per_phase: vec![DEFAULT_LOOKUP_ADVICE_PER_PHASE],
        lookup_bits: Some(DEFAULT_LOOKUP_BITS),
        num_instance_columns,
    }
}

fn expose_public(builder: &mut BaseCircuitBuilder<Fr>, values: &[AssignedValue<Fr>]) {
    for (column, value) in values.iter().enumerate() {
        builder.assigned_instances[column].push(*value);
    }
}

// === Transfer circuit ==========================================================================

/// Private witness of a transfer.
#[derive(Clone, Debug)]
pub struct TransferWitness {
    /// High half of the spending scalar (`scalar = s0*2^128 + s1`).
    pub s0: [u8; 16],
    /// Low half of the spending scalar.
    pub s1: [u8; 16],
    pub version: u8,
    pub from_pub: AffinePoint,
    pub balance: u128,
    pub salt0: Fr,
    pub spent_commitment: Fr,
    pub leaf_index: u64,
    /// `MERKLE_DEPTH + 1` entries; `[0]` is the spent commitment itself.
    pub merkle_path: Vec<Fr>,
    pub amount: u128,
    pub fee: u128,
    pub to_pub: AffinePoint,
    pub salt1: Fr,
}

/// Public inputs of a transfer, in instance-column order.
#[derive(Clone, Copy, Debug)]
pub struct TransferPublicInputs {
    pub merkle_root: Fr,
    pub nullifier: Fr,
    pub new_note_commitment: Fr,
    pub change_note_commitment: Fr,
}

#[derive(Clone, Debug)]
pub struct TransferCircuitInput {
    pub witness: TransferWitness,
    pub public: TransferPublicInputs,
}

/// Instance columns for the verifier, one value per column.
pub fn transfer_instances(public: &TransferPublicInputs) -> Vec<Vec<Fr>> {
    vec![
        vec![public.merkle_root],
        vec![public.nullifier],
        vec![public.new_note_commitment],
        vec![public.change_note_commitment],
    ]
}

#[derive(Clone, Debug)]
pub struct TransferCircuit {
    pub input: Option<TransferCircuitInput>,
    params: BaseCircuitParams,
    stage: CircuitBuilderStage,
}

impl Default for TransferCircuit {
    fn default() -> Self {
        Self {
            input: None,
            params: base_params(TRANSFER_INSTANCE_COLUMNS),
            stage: CircuitBuilderStage::Keygen,
        }
    }
}

impl TransferCircuit {
    /// Circuit for MockProver testing (or keygen when `input` is `None`).
    pub fn new(input: Option<TransferCircuitInput>) -> Self {
        let stage = if input.is_some() {
            CircuitBuilderStage::Mock
        } else {
            CircuitBuilderStage::Keygen
        };
        Self {
            input,
            params: base_params(TRANSFER_INSTANCE_COLUMNS),
            stage,
        }
    }

    /// Circuit for production proof generation.
    pub fn new_prover(input: TransferCircuitInput) -> Self {
        Self {
            input: Some(input),
            params: base_params(TRANSFER_INSTANCE_COLUMNS),
            stage: CircuitBuilderStage::Mock,
        }
    }
}

impl Circuit<Fr> for TransferCircuit {
    type Config = BaseConfig<Fr>;
    type FloorPlanner = SimpleFloorPlanner;
    type Params = BaseCircuitParams;

    fn params(&self) -> Self::Params {
        self.params.clone()
    }

    fn without_witnesses(&self) -> Self {
        Self {
            input: None,
            params: self.params.clone(),
            stage: CircuitBuilderStage::Keygen,
        }
    }

    fn configure_with_params(
        meta: &mut ConstraintSystem<Fr>,
        params: Self::Params,
    ) -> Self::Config {
        BaseConfig::configure(meta, params)
    }

    fn configure(_: &mut ConstraintSystem<Fr>) -> Self::Config {
        unreachable!("TransferCircuit must be configured with explicit parameters")
    }

    fn synthesize(&self, config: Self::Config, layouter: impl Layouter<Fr>) -> Result<(), Error> {
        let keygen_input = transfer_keygen_input();
        let input = self.input.as_ref().unwrap_or(&keygen_input);

        let mut builder = BaseCircuitBuilder::<Fr>::from_stage(self.stage)
            .use_params(self.params.clone())
            .use_instance_columns(self.params.num_instance_columns);
        if let Some(bits) = self.params.lookup_bits {
            builder = builder.use_lookup_bits(bits);
        }

        build_transfer_constraints(&mut builder, input);
        <BaseCircuitBuilder<Fr> as Circuit<Fr>>::synthesize(&builder, config, layouter)
    }
}

fn build_transfer_constraints(builder: &mut BaseCircuitBuilder<Fr>, input: &TransferCircuitInput) {
    let range = builder.range_chip();
    let gate = range.gate();
    let w = &input.witness;
    let p = &input.public;

    let ctx = builder.main(0);

    // witness assignment
    let s0 = ctx.load_witness(reduce_canonical(&w.s0));
    let s1 = ctx.load_witness(reduce_canonical(&w.s1));
    range.range_check(ctx, s0, 128);
    range.range_check(ctx, s1, 128);
    let version = ctx.load_witness(Fr::from(w.version as u64));
    let from_pub = load_point(ctx, &w.from_pub);
    let to_pub = load_point(ctx, &w.to_pub);
    let balance = assign_value(ctx, &range, w.balance);
    let amount = assign_value(ctx, &range, w.amount);
    let fee = assign_value(ctx, &range, w.fee);
    let salt0 = ctx.load_witness(w.salt0);
    let salt1 = ctx.load_witness(w.salt1);
    let spent_commitment = ctx.load_witness(w.spent_commitment);
    let leaf_index = ctx.load_witness(Fr::from(w.leaf_index));
    let path: Vec<_> = w.merkle_path.iter().map(|v| ctx.load_witness(*v)).collect();

    let merkle_root = ctx.load_witness(p.merkle_root);
    let nullifier = ctx.load_witness(p.nullifier);
    let new_commitment = ctx.load_witness(p.new_note_commitment);
    let change_commitment = ctx.load_witness(p.change_note_commitment);

    // 1. key ownership: (s0*2^128 + s1)*G == from_pub; to_pub on curve
    let computed_pub = derive_public_key(ctx, gate, s0, s1);
    constrain_on_curve(ctx, gate, &computed_pub);
    edwards::constrain_equal(ctx, &computed_pub, &from_pub);
    constrain_on_curve(ctx, gate, &to_pub);

    // 2. spent commitment pre-image
    let computed_spent = mimc_hash(
        ctx,
        gate,
        &[version, from_pub.x, from_pub.y, balance, salt0],
    );
    ctx.constrain_equal(&computed_spent, &spent_commitment);

    // 3. membership of the spent commitment under the public root
    ctx.constrain_equal(&path[0], &spent_commitment);
    constrain_membership(ctx, gate, leaf_index, &path, merkle_root);

    // 4. nullifier correctness: nf = H(H(s0, s1), C)
    let nk = mimc_hash(ctx, gate, &[s0, s1]);
    let computed_nullifier = mimc_hash(ctx, gate, &[nk, spent_commitment]);
    ctx.constrain_equal(&computed_nullifier, &nullifier);

    // 5. balance covers amount + fee; change is the remainder
    let change = constrain_spend_covered(ctx, gate, &range, amount, fee, balance);

    // 6. new note commitment
    let computed_new = mimc_hash(ctx, gate, &[version, to_pub.x, to_pub.y, amount, salt1]);
    ctx.constrain_equal(&computed_new, &new_commitment);

    // 7. change note commitment: zero when change is zero, else a
    //    re-issuance to the sender under the same salt
    let change_hash = mimc_hash(
        ctx,
        gate,
        &[version, from_pub.x, from_pub.y, change, salt0],
    );
    let no_change = gate.is_zero(ctx, change);
    let expected_change = gate.select(ctx, Constant(Fr::zero()), change_hash, no_change);
    ctx.constrain_equal(&expected_change, &change_commitment);

    expose_public(
        builder,
        &[merkle_root, nullifier, new_commitment, change_commitment],
    );
}

/// Structurally-representative input used during keygen. Points must be on
/// the curve so the witness-generation pass never divides by zero; the
/// constraint values themselves are irrelevant at keygen time.
fn transfer_keygen_input() -> TransferCircuitInput {
    let g = *GENERATOR;
    TransferCircuitInput {
        witness: TransferWitness {
            s0: [0u8; 16],
            s1: {
                let mut s1 = [0u8; 16];
                s1[15] = 1;
                s1
            },
            version: 1,
            from_pub: g,
            balance: 1,
            salt0: Fr::zero(),
            spent_commitment: Fr::zero(),
            leaf_index: 0,
            merkle_path: vec![Fr::zero(); MERKLE_DEPTH + 1],
            amount: 1,
            fee: 0,
            to_pub: g,
            salt1: Fr::zero(),
        },
        public: TransferPublicInputs {
            merkle_root: Fr::zero(),
            nullifier: Fr::zero(),
            new_note_commitment: Fr::zero(),
            change_note_commitment: Fr::zero(),
        },
    }
}

// === Vote circuit ==============================================================================

/// Private witness of a ballot.
#[derive(Clone, Debug)]
pub struct VoteWitness {
    /// High half of the DID scalar.
    pub s0: [u8; 16],
    /// Low half of the DID scalar.
    pub s1: [u8; 16],
    pub did_pub: AffinePoint,
    pub leaf_index: u64,
    /// `MERKLE_DEPTH + 1` entries; `[0]` is `H(did_pub.x, did_pub.y)`.
    pub merkle_path: Vec<Fr>,
    /// EdDSA signature over the choice under the DID key.
    pub choice_sig: Signature,
}

/// Public inputs of a ballot, in instance-column order.
#[derive(Clone, Copy, Debug)]
pub struct VotePublicInputs {
    pub citizen_merkle_root: Fr,
    pub vote_paper_id: Fr,
    pub choice: Fr,
}

#[derive(Clone, Debug)]
pub struct VoteCircuitInput {
    pub witness: VoteWitness,
    pub public: VotePublicInputs,
}

/// Instance columns for the verifier, one value per column.
pub fn vote_instances(public: &VotePublicInputs) -> Vec<Vec<Fr>> {
    vec![
        vec![public.citizen_merkle_root],
        vec![public.vote_paper_id],
        vec![public.choice],
    ]
}

#[derive(Clone, Debug)]
pub struct VoteCircuit {
    pub input: Option<VoteCircuitInput>,
    params: BaseCircuitParams,
    stage: CircuitBuilderStage,
}

impl Default for VoteCircuit {
    fn default() -> Self {
        Self {
            input: None,
            params: base_params(VOTE_INSTANCE_COLUMNS),
            stage: CircuitBuilderStage::Keygen,
        }
    }
}

impl VoteCircuit {
    /// Circuit for MockProver testing (or keygen when `input` is `None`).
    pub fn new(input: Option<VoteCircuitInput>) -> Self {
        let stage = if input.is_some() {
            CircuitBuilderStage::Mock
        } else {
            CircuitBuilderStage::Keygen
        };
        Self {
            input,
            params: base_params(VOTE_INSTANCE_COLUMNS),
            stage,
        }
    }

    /// Circuit for production proof generation.
    pub fn new_prover(input: VoteCircuitInput) -> Self {
        Self {
            input: Some(input),
            params: base_params(VOTE_INSTANCE_COLUMNS),
            stage: CircuitBuilderStage::Mock,
        }
    }
}

impl Circuit<Fr> for VoteCircuit {
    type Config = BaseConfig<Fr>;
    type FloorPlanner = SimpleFloorPlanner;
    type Params = BaseCircuitParams;

    fn params(&self) -> Self::Params {
        self.params.clone()
    }

    fn without_witnesses(&self) -> Self {
        Self {
            input: None,
            params: self.params.clone(),
            stage: CircuitBuilderStage::Keygen,
        }
    }

    fn configure_with_params(
        meta: &mut ConstraintSystem<Fr>,
        params: Self::Params,
    ) -> Self::Config {
        BaseConfig::configure(meta, params)
    }

    fn configure(_: &mut ConstraintSystem<Fr>) -> Self::Config {
        unreachable!("VoteCircuit must be configured with explicit parameters")
    }

    fn synthesize(&self, config: Self::Config, layouter: impl Layouter<Fr>) -> Result<(), Error> {
        let keygen_input = vote_keygen_input();
        let input = self.input.as_ref().unwrap_or(&keygen_input);

        let mut builder = BaseCircuitBuilder::<Fr>::from_stage(self.stage)
            .use_params(self.params.clone())
            .use_instance_columns(self.params.num_instance_columns);
        if let Some(bits) = self.params.lookup_bits {
            builder = builder.use_lookup_bits(bits);
        }

        build_vote_constraints(&mut builder, input);
        <BaseCircuitBuilder<Fr> as Circuit<Fr>>::synthesize(&builder, config, layouter)
    }
}

fn build_vote_constraints(builder: &mut BaseCircuitBuilder<Fr>, input: &VoteCircuitInput) {
    let range = builder.range_chip();
    let gate = range.gate();
    let w = &input.witness;
    let p = &input.public;

    let ctx = builder.main(0);

    let s0 = ctx.load_witness(reduce_canonical(&w.s0));
    let s1 = ctx.load_witness(reduce_canonical(&w.s1));
    range.range_check(ctx, s0, 128);
    range.range_check(ctx, s1, 128);
    let did_pub = load_point(ctx, &w.did_pub);
    let leaf_index = ctx.load_witness(Fr::from(w.leaf_index));
    let path: Vec<_> = w.merkle_path.iter().map(|v| ctx.load_witness(*v)).collect();
    let sig_r = load_point(ctx, &w.choice_sig.r);
    let (s_hi_bytes, s_lo_bytes) = w.choice_sig.s_halves();
    let s_hi = ctx.load_witness(reduce_canonical(&s_hi_bytes));
    let s_lo = ctx.load_witness(reduce_canonical(&s_lo_bytes));

    let citizen_root = ctx.load_witness(p.citizen_merkle_root);
    let vote_paper_id = ctx.load_witness(p.vote_paper_id);
    let choice = ctx.load_witness(p.choice);

    // 1. the proven leaf is this DID key's hash
    let did_leaf = mimc_hash(ctx, gate, &[did_pub.x, did_pub.y]);
    ctx.constrain_equal(&path[0], &did_leaf);

    // 2. citizen membership
    constrain_membership(ctx, gate, leaf_index, &path, citizen_root);

    // 3. key ownership of the DID key
    let computed_pub = derive_public_key(ctx, gate, s0, s1);
    constrain_on_curve(ctx, gate, &computed_pub);
    edwards::constrain_equal(ctx, &computed_pub, &did_pub);

    // 4. the paper id is bound to this DID scalar
    let computed_paper_id = mimc_hash(ctx, gate, &[s0, s1, did_pub.x, did_pub.y]);
    ctx.constrain_equal(&computed_paper_id, &vote_paper_id);

    // 5. choice authenticity: the submitter cannot swap the ballot
    constrain_eddsa(ctx, gate, &range, &did_pub, choice, &sig_r, s_hi, s_lo);

    expose_public(builder, &[citizen_root, vote_paper_id, choice]);
}

/// Structurally-representative keygen input; on-curve points keep the
/// witness pass away from zero denominators.
fn vote_keygen_input() -> VoteCircuitInput {
    let g = *GENERATOR;
    VoteCircuitInput {
        witness: VoteWitness {
            s0: [0u8; 16],
            s1: {
                let mut s1 = [0u8; 16];
                s1[15] = 1;
                s1
            },
            did_pub: g,
            leaf_index: 0,
            merkle_path: vec![Fr::zero(); MERKLE_DEPTH + 1],
            choice_sig: Signature {
                r: g,
                s: [0u8; 32],
            },
        },
        public: VotePublicInputs {
            citizen_merkle_root: Fr::zero(),
            vote_paper_id: Fr::zero(),
            choice: Fr::zero(),
        },
    }
}
