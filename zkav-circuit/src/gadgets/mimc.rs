// zkav-circuit/src/gadgets/mimc.rs

use halo2_base::{
    gates::flex_gate::{GateChip, GateInstructions},
    AssignedValue, Context,
    QuantumCell::Constant,
};
use halo2curves_axiom::bn256::Fr;

use zkav_common::mimc::ROUND_CONSTANTS;

/// In-circuit MiMC block cipher. Mirrors `zkav_common::mimc::mimc_encrypt`
/// round for round; both read the same constant table.
pub fn mimc_encrypt(
    ctx: &mut Context<Fr>,
    gate: &GateChip<Fr>,
    key: AssignedValue<Fr>,
    message: AssignedValue<Fr>,
) -> AssignedValue<Fr> {
    let mut m = message;
    for constant in ROUND_CONSTANTS.iter() {
        let t = gate.add(ctx, m, key);
        let t = gate.add(ctx, t, Constant(*constant));
        let t2 = gate.mul(ctx, t, t);
        let t4 = gate.mul(ctx, t2, t2);
        m = gate.mul(ctx, t4, t);
    }
    gate.add(ctx, m, key)
}

/// In-circuit MiMC hash (Miyaguchi–Preneel), matching
/// `zkav_common::mimc::mimc_hash`.
pub fn mimc_hash(
    ctx: &mut Context<Fr>,
    gate: &GateChip<Fr>,
    inputs: &[AssignedValue<Fr>],
) -> AssignedValue<Fr> {
    let mut h = ctx.load_constant(Fr::zero());
    for &x in inputs {
        let e = mimc_encrypt(ctx, gate, h, x);
        let t = gate.add(ctx, e, h);
        h = gate.add(ctx, t, x);
    }
    h
}
