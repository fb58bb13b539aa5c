// zkav-circuit/src/gadgets/merkle.rs

use halo2_base::{
    gates::flex_gate::{GateChip, GateInstructions},
    AssignedValue, Context,
};
use halo2curves_axiom::bn256::Fr;

use crate::gadgets::mimc::mimc_hash;

/// Verify a Merkle membership path against `root`.
///
/// `path[0]` is the raw leaf; `path[i]` the sibling at level `i - 1`. The
/// leaf index is private: its bits drive the left/right ordering at each
/// level. A zero sibling marks an unused level of the fixed-depth path (the
/// tree holds fewer than `2^depth` leaves there) and the running hash passes
/// through unchanged, the same rule the native accumulator applies when an
/// unpaired node propagates upward.
pub fn constrain_membership(
    ctx: &mut Context<Fr>,
    gate: &GateChip<Fr>,
    leaf_index: AssignedValue<Fr>,
    path: &[AssignedValue<Fr>],
    root: AssignedValue<Fr>,
) {
    let depth = path.len() - 1;
    let index_bits = gate.num_to_bits(ctx, leaf_index, depth);

    let mut sum = mimc_hash(ctx, gate, &path[..1]);
    for level in 0..depth {
        let sibling = path[level + 1];
        let node_is_right = index_bits[level];
        let left = gate.select(ctx, sibling, sum, node_is_right);
        let right = gate.select(ctx, sum, sibling, node_is_right);
        let parent = mimc_hash(ctx, gate, &[left, right]);
        let unused = gate.is_zero(ctx, sibling);
        sum = gate.select(ctx, sum, parent, unused);
    }
    ctx.constrain_equal(&sum, &root);
}
