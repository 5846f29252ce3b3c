//! Vectorized exp, log, sin and cos (Cephes-style polynomial approximations)
//!
//! Written once over [`FloatVecOps`] using only correctly rounded IEEE
//! operations (no fused multiply-add, no hardware rounding modes), so every
//! instruction set produces bit-identical results for the same input.

use super::vec::FloatVecOps;

// ── Shared helpers ──────────────────────────────────────────────────────────

/// 1.5 * 2^23: adding then subtracting it rounds to nearest-even.
const ROUND_MAGIC: f32 = 12_582_912.0;

const SIGN_MASK: u32 = 0x8000_0000;
const QUIET_NAN: u32 = 0x7FC0_0000;

/// Round to nearest-even; exact for |x| < 2^22.
#[inline(always)]
fn round<I: FloatVecOps>(x: I::Reg) -> I::Reg {
    let magic = I::splat(ROUND_MAGIC);
    I::sub(I::add(x, magic), magic)
}

/// Floor; exact for |x| < 2^22.
#[inline(always)]
fn floor<I: FloatVecOps>(x: I::Reg) -> I::Reg {
    let r = round::<I>(x);
    I::sub(r, I::and(I::lt(x, r), I::splat(1.0)))
}

#[inline(always)]
fn horner<I: FloatVecOps>(x: I::Reg, coeffs: &[f32]) -> I::Reg {
    let mut y = I::splat(coeffs[0]);
    for &c in &coeffs[1..] {
        y = I::add(I::mul(y, x), I::splat(c));
    }
    y
}

// ── exp ─────────────────────────────────────────────────────────────────────

/// ln(f32::MAX); larger inputs overflow to `+inf`.
const EXP_HI: f32 = 88.722_84;
const EXP_LO: f32 = -88.376_26;
const LOG2EF: f32 = 1.442_695;
const EXP_C1: f32 = 0.693_359_4;
const EXP_C2: f32 = -2.121_944_4e-4;
const EXP_P: [f32; 6] = [
    1.987_569_1e-4,
    1.398_199_9e-3,
    8.333_452e-3,
    4.166_579_6e-2,
    1.666_666_5e-1,
    5.000_000_1e-1,
];

/// `e^x`. Inputs above ln(f32::MAX) give `+inf`, inputs at or below -88.376
/// give 0; NaN passes through.
#[inline(always)]
pub fn exp<I: FloatVecOps>(x: I::Reg) -> I::Reg {
    let nan = I::is_nan(x);
    let overflow = I::lt(I::splat(EXP_HI), x);
    let input = x;
    let x = I::max(I::min(x, I::splat(EXP_HI)), I::splat(EXP_LO));

    // exp(x) = exp(g + n * ln 2)
    let n = floor::<I>(I::add(I::mul(x, I::splat(LOG2EF)), I::splat(0.5)));
    let n = I::max(n, I::splat(-127.0));
    let g = I::sub(x, I::mul(n, I::splat(EXP_C1)));
    let g = I::sub(g, I::mul(n, I::splat(EXP_C2)));

    let z = I::mul(g, g);
    let y = I::add(I::mul(horner::<I>(g, &EXP_P), z), g);
    let y = I::add(y, I::splat(1.0));

    // 2^128 is not representable: scale by 2^127 and double the result.
    let top = I::and(I::lt(I::splat(127.0), n), I::splat(1.0));
    let y = I::mul(y, I::pow2i(I::sub(n, top)));
    let y = I::mul(y, I::add(top, I::splat(1.0)));

    let y = I::select(overflow, I::splat(f32::INFINITY), y);
    I::select(nan, input, y)
}

// ── log ─────────────────────────────────────────────────────────────────────

const SQRTHF: f32 = std::f32::consts::FRAC_1_SQRT_2;
const LOG_P: [f32; 9] = [
    7.037_683_6e-2,
    -1.151_461e-1,
    1.167_699_9e-1,
    -1.242_014_1e-1,
    1.424_932_3e-1,
    -1.666_805_8e-1,
    2.000_071_4e-1,
    -2.499_999_4e-1,
    3.333_333_1e-1,
];
const LOG_Q1: f32 = -2.121_944_4e-4;
const LOG_Q2: f32 = 0.693_359_4;
const SUBNORMAL_SCALE: f32 = 8_388_608.0;

/// Natural logarithm. Negative inputs give NaN, zero gives `-inf`, `+inf`
/// gives `+inf`.
#[inline(always)]
pub fn log<I: FloatVecOps>(x: I::Reg) -> I::Reg {
    let zero = I::splat(0.0);
    let inf = I::splat(f32::INFINITY);
    let is_nan = I::is_nan(x);
    let is_negative = I::lt(x, zero);
    let is_zero = I::eq(x, zero);
    let is_inf = I::eq(x, inf);
    let input = x;

    // Subnormals are scaled into the normal range by 2^23 first.
    let subnormal = I::lt(x, I::splat(f32::MIN_POSITIVE));
    let x = I::select(subnormal, I::mul(x, I::splat(SUBNORMAL_SCALE)), x);
    let x = I::max(x, I::splat(f32::MIN_POSITIVE));
    let (x, e) = I::frexp(x);
    let e = I::sub(e, I::and(subnormal, I::splat(23.0)));

    // Keep the mantissa in [sqrt(1/2), sqrt(2)).
    let small = I::lt(x, I::splat(SQRTHF));
    let tmp = I::and(small, x);
    let x = I::sub(x, I::splat(1.0));
    let e = I::sub(e, I::and(small, I::splat(1.0)));
    let x = I::add(x, tmp);

    let z = I::mul(x, x);
    let y = I::mul(I::mul(horner::<I>(x, &LOG_P), x), z);
    let y = I::add(y, I::mul(e, I::splat(LOG_Q1)));
    let y = I::sub(y, I::mul(z, I::splat(0.5)));
    let y = I::add(x, y);
    let y = I::add(y, I::mul(e, I::splat(LOG_Q2)));

    let y = I::select(is_zero, I::splat(f32::NEG_INFINITY), y);
    let y = I::select(is_inf, inf, y);
    let y = I::select(is_negative, I::splat_bits(QUIET_NAN), y);
    I::select(is_nan, input, y)
}

// ── sin / cos ───────────────────────────────────────────────────────────────

/// 4 / pi
const FOPI: f32 = 1.273_239_5;
const DP1: f32 = -0.785_156_25;
const DP2: f32 = -2.418_756_5e-4;
const DP3: f32 = -3.774_895e-8;
const SIN_P: [f32; 3] = [-1.951_529_6e-4, 8.332_161e-3, -1.666_665_5e-1];
const COS_P: [f32; 3] = [2.443_315_7e-5, -1.388_731_6e-3, 4.166_664_6e-2];

/// Magnitudes above this are clamped before range reduction. Accuracy is
/// only meaningful for |x| <= 8192.
const SINCOS_LIMIT: f32 = 1_048_576.0;

/// Splits `|x|` into `(r, j)` with `|x| = j * pi/4 + r` and `j` even.
#[inline(always)]
fn reduce<I: FloatVecOps>(abs_x: I::Reg) -> (I::Reg, I::Reg) {
    let j = floor::<I>(I::mul(abs_x, I::splat(FOPI)));
    let half = floor::<I>(I::mul(j, I::splat(0.5)));
    let j = I::add(j, I::sub(j, I::add(half, half)));

    let r = I::add(abs_x, I::mul(j, I::splat(DP1)));
    let r = I::add(r, I::mul(j, I::splat(DP2)));
    let r = I::add(r, I::mul(j, I::splat(DP3)));
    (r, j)
}

/// `j mod 8` for non-negative integral `j`.
#[inline(always)]
fn octant<I: FloatVecOps>(j: I::Reg) -> I::Reg {
    let q = floor::<I>(I::mul(j, I::splat(0.125)));
    I::sub(j, I::mul(q, I::splat(8.0)))
}

#[inline(always)]
fn sin_poly<I: FloatVecOps>(r: I::Reg, z: I::Reg) -> I::Reg {
    let y = I::mul(I::mul(horner::<I>(z, &SIN_P), z), r);
    I::add(y, r)
}

#[inline(always)]
fn cos_poly<I: FloatVecOps>(z: I::Reg) -> I::Reg {
    let y = I::mul(I::mul(horner::<I>(z, &COS_P), z), z);
    let y = I::sub(y, I::mul(z, I::splat(0.5)));
    I::add(y, I::splat(1.0))
}

/// Evaluates the quadrant polynomial for octant `m8` (0, 2, 4 or 6) of the
/// reduced argument `r`; octants 4 and 6 are negated.
#[inline(always)]
fn eval_octant<I: FloatVecOps>(r: I::Reg, m8: I::Reg) -> I::Reg {
    let sign_mask = I::splat_bits(SIGN_MASK);
    let negate = I::lt(I::splat(3.0), m8);
    let m4 = I::sub(m8, I::and(negate, I::splat(4.0)));
    let use_cos = I::eq(m4, I::splat(2.0));

    let z = I::mul(r, r);
    let y = I::select(use_cos, cos_poly::<I>(z), sin_poly::<I>(r, z));
    I::xor(y, I::and(negate, sign_mask))
}

#[inline(always)]
fn non_finite<I: FloatVecOps>(x: I::Reg, abs_x: I::Reg) -> I::Reg {
    I::or(I::is_nan(x), I::eq(abs_x, I::splat(f32::INFINITY)))
}

/// Sine. Infinite and NaN inputs give NaN.
#[inline(always)]
pub fn sin<I: FloatVecOps>(x: I::Reg) -> I::Reg {
    let sign_mask = I::splat_bits(SIGN_MASK);
    let sign = I::and(x, sign_mask);
    let abs_x = I::andnot(sign_mask, x);
    let invalid = non_finite::<I>(x, abs_x);

    let (r, j) = reduce::<I>(I::min(abs_x, I::splat(SINCOS_LIMIT)));
    let y = I::xor(eval_octant::<I>(r, octant::<I>(j)), sign);
    I::select(invalid, I::splat_bits(QUIET_NAN), y)
}

/// Cosine. Infinite and NaN inputs give NaN.
#[inline(always)]
pub fn cos<I: FloatVecOps>(x: I::Reg) -> I::Reg {
    let sign_mask = I::splat_bits(SIGN_MASK);
    let abs_x = I::andnot(sign_mask, x);
    let invalid = non_finite::<I>(x, abs_x);

    // cos(x) = sin(x + pi/2), i.e. two octants further along.
    let (r, j) = reduce::<I>(I::min(abs_x, I::splat(SINCOS_LIMIT)));
    let y = eval_octant::<I>(r, octant::<I>(I::add(j, I::splat(2.0))));
    I::select(invalid, I::splat_bits(QUIET_NAN), y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::Generic;

    #[test]
    fn floor_and_round() {
        assert_eq!(round::<Generic>(2.5), 2.0);
        assert_eq!(round::<Generic>(3.5), 4.0);
        assert_eq!(floor::<Generic>(-0.5), -1.0);
        assert_eq!(floor::<Generic>(1.999), 1.0);
        assert_eq!(floor::<Generic>(7.0), 7.0);
    }

    #[test]
    fn exp_special_values() {
        assert_eq!(exp::<Generic>(0.0), 1.0);
        assert!(exp::<Generic>(f32::NAN).is_nan());
        assert_eq!(exp::<Generic>(f32::NEG_INFINITY), 0.0);
        assert!(exp::<Generic>(-100.0) < 1e-37);
        assert_eq!(exp::<Generic>(100.0), f32::INFINITY);
        assert_eq!(exp::<Generic>(f32::INFINITY), f32::INFINITY);
    }

    #[test]
    fn exp_near_overflow() {
        for x in [88.0f32, 88.376_27, 88.5, 88.7, 88.722_83] {
            let want = x.exp();
            let got = exp::<Generic>(x);
            assert!(got.is_finite(), "exp({x}) = {got}");
            assert!(((got - want) / want).abs() < 4e-6, "exp({x}) = {got} want {want}");
        }
    }

    #[test]
    fn log_special_values() {
        assert_eq!(log::<Generic>(1.0), 0.0);
        assert_eq!(log::<Generic>(0.0), f32::NEG_INFINITY);
        assert_eq!(log::<Generic>(f32::INFINITY), f32::INFINITY);
        assert!(log::<Generic>(-1.0).is_nan());
        assert!(log::<Generic>(f32::NAN).is_nan());
    }

    #[test]
    fn log_of_subnormals() {
        for x in [1e-40f32, f32::from_bits(1), f32::MIN_POSITIVE / 2.0] {
            let want = x.ln();
            let got = log::<Generic>(x);
            assert!((got - want).abs() < 4e-6 * want.abs(), "log({x:e}) = {got} want {want}");
        }
    }

    #[test]
    fn sin_cos_quadrants() {
        use std::f32::consts::PI;
        for k in -8..=8 {
            let x = k as f32 * PI / 4.0;
            assert!((sin::<Generic>(x) - x.sin()).abs() < 2e-6, "sin({x})");
            assert!((cos::<Generic>(x) - x.cos()).abs() < 2e-6, "cos({x})");
        }
        assert!(sin::<Generic>(f32::INFINITY).is_nan());
        assert!(cos::<Generic>(f32::NAN).is_nan());
    }
}
