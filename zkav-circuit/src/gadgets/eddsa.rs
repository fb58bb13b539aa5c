// zkav-circuit/src/gadgets/eddsa.rs
//
// In-circuit EdDSA over Baby Jubjub with the MiMC challenge hash:
// check `S*G == R + H(R.x, R.y, A.x, A.y, msg) * A`.
//
// Scalars are handled as 128-bit halves: `S` arrives pre-split from the
// signature encoding, and the challenge (a full-width field element) is
// split in-circuit with a hint plus a recomposition constraint. Both halves
// then drive narrow double-and-add ladders, the same shape as the
// key-ownership gadget.

use halo2_base::{
    gates::{
        flex_gate::{GateChip, GateInstructions},
        range::{RangeChip, RangeInstructions},
    },
    AssignedValue, Context,
    QuantumCell::Constant,
};
use halo2curves_axiom::bn256::Fr;
use halo2curves_axiom::ff::PrimeField;
use num_bigint::BigUint;
use once_cell::sync::Lazy;

use zkav_common::{fr_to_bytes, reduce_canonical};

use crate::gadgets::edwards::{
    self, add, constrain_on_curve, generator, scalar_mul_bits, shift_left, AssignedPoint,
};
use crate::gadgets::mimc::mimc_hash;

static TWO_POW_128: Lazy<Fr> =
    Lazy::new(|| Fr::from_u128(1u128 << 127) * Fr::from(2));

/// Verify an EdDSA signature in-circuit.
///
/// `public` must already be constrained on-curve by the caller (the vote
/// circuit's key-ownership step does this); `sig_r` is constrained here.
/// `s_hi`/`s_lo` are the 16/16 split of the signature scalar.
pub fn constrain_eddsa(
    ctx: &mut Context<Fr>,
    gate: &GateChip<Fr>,
    range: &RangeChip<Fr>,
    public: &AssignedPoint,
    message: AssignedValue<Fr>,
    sig_r: &AssignedPoint,
    s_hi: AssignedValue<Fr>,
    s_lo: AssignedValue<Fr>,
) {
    constrain_on_curve(ctx, gate, sig_r);
    range.range_check(ctx, s_hi, 128);
    range.range_check(ctx, s_lo, 128);

    let challenge = mimc_hash(
        ctx,
        gate,
        &[sig_r.x, sig_r.y, public.x, public.y, message],
    );

    // S*G via the split ladders.
    let g = generator(ctx);
    let lhs = mul_by_halves(ctx, gate, &g, s_hi, s_lo);

    // H*A: split the challenge with a hinted decomposition, then reuse the
    // same ladder shape. The recomposition constraint pins the hint to the
    // hash output.
    let (c_hi, c_lo) = split_scalar(ctx, gate, range, challenge);
    let ha = mul_by_halves(ctx, gate, public, c_hi, c_lo);
    let rhs = add(ctx, gate, sig_r, &ha);

    edwards::constrain_equal(ctx, &lhs, &rhs);
}

/// `(hi*2^128 + lo) * base` with both halves already range-checked.
fn mul_by_halves(
    ctx: &mut Context<Fr>,
    gate: &GateChip<Fr>,
    base: &AssignedPoint,
    hi: AssignedValue<Fr>,
    lo: AssignedValue<Fr>,
) -> AssignedPoint {
    let bits_hi = gate.num_to_bits(ctx, hi, 128);
    let bits_lo = gate.num_to_bits(ctx, lo, 128);
    let p_hi = scalar_mul_bits(ctx, gate, base, &bits_hi);
    let p_hi_shifted = shift_left(ctx, gate, &p_hi, 128);
    let p_lo = scalar_mul_bits(ctx, gate, base, &bits_lo);
    add(ctx, gate, &p_hi_shifted, &p_lo)
}

/// Split a field element into hinted 128-bit halves and constrain
/// `value == hi*2^128 + lo`.
fn split_scalar(
    ctx: &mut Context<Fr>,
    gate: &GateChip<Fr>,
    range: &RangeChip<Fr>,
    value: AssignedValue<Fr>,
) -> (AssignedValue<Fr>, AssignedValue<Fr>) {
    let as_int = BigUint::from_bytes_be(&fr_to_bytes(value.value()));
    let hi_int = &as_int >> 128u32;
    let lo_int = &as_int & ((BigUint::from(1u8) << 128u32) - 1u8);

    let hi = ctx.load_witness(reduce_canonical(&hi_int.to_bytes_be()));
    let lo = ctx.load_witness(reduce_canonical(&lo_int.to_bytes_be()));
    range.range_check(ctx, hi, 128);
    range.range_check(ctx, lo, 128);

    let recomposed = gate.mul_add(ctx, hi, Constant(*TWO_POW_128), lo);
    ctx.constrain_equal(&recomposed, &value);
    (hi, lo)
}
