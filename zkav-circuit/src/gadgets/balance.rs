// zkav-circuit/src/gadgets/balance.rs

use halo2_base::{
    gates::{
        flex_gate::{GateChip, GateInstructions},
        range::{RangeChip, RangeInstructions},
    },
    AssignedValue, Context,
};
use halo2curves_axiom::bn256::Fr;
use halo2curves_axiom::ff::PrimeField;

/// Number of bits a note balance, amount, or fee may occupy.
pub const VALUE_BITS: usize = 128;

/// Comparison width: `amount + fee` of two 128-bit values needs one extra
/// bit, plus one of headroom.
const COMPARE_BITS: usize = VALUE_BITS + 2;

/// Assign a 128-bit value and range-check it, so later field arithmetic on
/// it cannot wrap.
pub fn assign_value(
    ctx: &mut Context<Fr>,
    range: &RangeChip<Fr>,
    value: u128,
) -> AssignedValue<Fr> {
    let cell = ctx.load_witness(Fr::from_u128(value));
    range.range_check(ctx, cell, VALUE_BITS);
    cell
}

/// Enforce `amount + fee <= balance` and return the change
/// `balance - amount - fee`.
///
/// All three inputs must already be range-checked to [`VALUE_BITS`].
pub fn constrain_spend_covered(
    ctx: &mut Context<Fr>,
    gate: &GateChip<Fr>,
    range: &RangeChip<Fr>,
    amount: AssignedValue<Fr>,
    fee: AssignedValue<Fr>,
    balance: AssignedValue<Fr>,
) -> AssignedValue<Fr> {
    let need = gate.add(ctx, amount, fee);
    let overspent = range.is_less_than(ctx, balance, need, COMPARE_BITS);
    gate.assert_is_const(ctx, &overspent, &Fr::zero());
    gate.sub(ctx, balance, need)
}
