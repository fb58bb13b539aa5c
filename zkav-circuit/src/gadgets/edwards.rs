// zkav-circuit/src/gadgets/edwards.rs
//
// Twisted Edwards arithmetic over the native field. Baby Jubjub lives in the
// BN254 scalar field, so points are plain pairs of advice cells and the
// complete addition law needs no non-native arithmetic. The unified formulas
// have nonzero denominators for all curve points, which is what makes
// `div_unsafe` sound here.

use halo2_base::{
    gates::flex_gate::{GateChip, GateInstructions},
    AssignedValue, Context,
    QuantumCell::Constant,
};
use halo2curves_axiom::bn256::Fr;

use zkav_common::jubjub::{AffinePoint, GENERATOR, PARAM_A, PARAM_D};

/// A curve point held in advice cells.
#[derive(Clone, Copy, Debug)]
pub struct AssignedPoint {
    pub x: AssignedValue<Fr>,
    pub y: AssignedValue<Fr>,
}

/// Load a witness point (no on-curve constraint; callers add one when the
/// point is attacker-controlled).
pub fn load_point(ctx: &mut Context<Fr>, point: &AffinePoint) -> AssignedPoint {
    AssignedPoint {
        x: ctx.load_witness(point.x),
        y: ctx.load_witness(point.y),
    }
}

/// The neutral element `(0, 1)` as constants.
pub fn identity(ctx: &mut Context<Fr>) -> AssignedPoint {
    AssignedPoint {
        x: ctx.load_constant(Fr::zero()),
        y: ctx.load_constant(Fr::one()),
    }
}

/// The subgroup generator as constants.
pub fn generator(ctx: &mut Context<Fr>) -> AssignedPoint {
    AssignedPoint {
        x: ctx.load_constant(GENERATOR.x),
        y: ctx.load_constant(GENERATOR.y),
    }
}

/// Constrain `a*x^2 + y^2 == 1 + d*x^2*y^2`.
pub fn constrain_on_curve(ctx: &mut Context<Fr>, gate: &GateChip<Fr>, p: &AssignedPoint) {
    let x2 = gate.mul(ctx, p.x, p.x);
    let y2 = gate.mul(ctx, p.y, p.y);
    let lhs = {
        let ax2 = gate.mul(ctx, x2, Constant(*PARAM_A));
        gate.add(ctx, ax2, y2)
    };
    let rhs = {
        let x2y2 = gate.mul(ctx, x2, y2);
        gate.mul_add(ctx, x2y2, Constant(*PARAM_D), Constant(Fr::one()))
    };
    ctx.constrain_equal(&lhs, &rhs);
}

/// Unified twisted Edwards addition:
/// `x3 = (x1*y2 + y1*x2) / (1 + d*x1*x2*y1*y2)`,
/// `y3 = (y1*y2 - a*x1*x2) / (1 - d*x1*x2*y1*y2)`.
pub fn add(
    ctx: &mut Context<Fr>,
    gate: &GateChip<Fr>,
    p: &AssignedPoint,
    q: &AssignedPoint,
) -> AssignedPoint {
    let x1y2 = gate.mul(ctx, p.x, q.y);
    let y1x2 = gate.mul(ctx, p.y, q.x);
    let x_num = gate.add(ctx, x1y2, y1x2);

    let x1x2 = gate.mul(ctx, p.x, q.x);
    let y1y2 = gate.mul(ctx, p.y, q.y);
    let ax1x2 = gate.mul(ctx, x1x2, Constant(*PARAM_A));
    let y_num = gate.sub(ctx, y1y2, ax1x2);

    let x1x2y1y2 = gate.mul(ctx, x1x2, y1y2);
    let dxy = gate.mul(ctx, x1x2y1y2, Constant(*PARAM_D));
    let x_den = gate.add(ctx, Constant(Fr::one()), dxy);
    let y_den = gate.sub(ctx, Constant(Fr::one()), dxy);

    AssignedPoint {
        x: gate.div_unsafe(ctx, x_num, x_den),
        y: gate.div_unsafe(ctx, y_num, y_den),
    }
}

/// Point doubling via the unified law.
pub fn double(ctx: &mut Context<Fr>, gate: &GateChip<Fr>, p: &AssignedPoint) -> AssignedPoint {
    add(ctx, gate, p, p)
}

/// `cond ? p : q`, coordinate-wise.
pub fn select(
    ctx: &mut Context<Fr>,
    gate: &GateChip<Fr>,
    cond: AssignedValue<Fr>,
    p: &AssignedPoint,
    q: &AssignedPoint,
) -> AssignedPoint {
    AssignedPoint {
        x: gate.select(ctx, p.x, q.x, cond),
        y: gate.select(ctx, p.y, q.y, cond),
    }
}

/// Double-and-add scalar multiplication over little-endian bit cells.
pub fn scalar_mul_bits(
    ctx: &mut Context<Fr>,
    gate: &GateChip<Fr>,
    base: &AssignedPoint,
    bits: &[AssignedValue<Fr>],
) -> AssignedPoint {
    let mut acc = identity(ctx);
    let mut run = *base;
    for (i, &bit) in bits.iter().enumerate() {
        let sum = add(ctx, gate, &acc, &run);
        acc = select(ctx, gate, bit, &sum, &acc);
        if i + 1 < bits.len() {
            run = double(ctx, gate, &run);
        }
    }
    acc
}

/// Multiply by the constant `2^n` (n doublings).
pub fn shift_left(
    ctx: &mut Context<Fr>,
    gate: &GateChip<Fr>,
    p: &AssignedPoint,
    n: usize,
) -> AssignedPoint {
    let mut acc = *p;
    for _ in 0..n {
        acc = double(ctx, gate, &acc);
    }
    acc
}

/// Recompute the public key from the 128-bit scalar halves:
/// `(s0*2^128 + s1) * G`.
///
/// Callers must range-check `s0` and `s1` to 128 bits beforehand. This is the
/// key-ownership proof: producing a satisfying assignment requires knowing
/// the private scalar behind the claimed public key.
pub fn derive_public_key(
    ctx: &mut Context<Fr>,
    gate: &GateChip<Fr>,
    s0: AssignedValue<Fr>,
    s1: AssignedValue<Fr>,
) -> AssignedPoint {
    let g = generator(ctx);
    let bits_hi = gate.num_to_bits(ctx, s0, 128);
    let bits_lo = gate.num_to_bits(ctx, s1, 128);
    let p_hi = scalar_mul_bits(ctx, gate, &g, &bits_hi);
    let p_hi_shifted = shift_left(ctx, gate, &p_hi, 128);
    let p_lo = scalar_mul_bits(ctx, gate, &g, &bits_lo);
    add(ctx, gate, &p_hi_shifted, &p_lo)
}

/// Constrain two points to be equal.
pub fn constrain_equal(ctx: &mut Context<Fr>, p: &AssignedPoint, q: &AssignedPoint) {
    ctx.constrain_equal(&p.x, &q.x);
    ctx.constrain_equal(&p.y, &q.y);
}
