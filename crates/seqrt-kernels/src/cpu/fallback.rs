//! Portable scalar implementation, one element per register
//!
//! Always compiled. It is the reference every vectorized instruction set is
//! checked against and the target when no SIMD extension is available.

use super::vec::{CpuIsa, Element, FloatVecOps, VecOps, load_lanes, store_lanes};

/// Scalar fallback tag.
#[derive(Debug, Clone, Copy, Default)]
pub struct Generic;

impl CpuIsa for Generic {
    const NAME: &'static str = "generic";
}

macro_rules! impl_generic {
    ($($t:ty),*) => {
        $(
            impl VecOps<$t> for Generic {
                type Reg = $t;
                const WIDTH: usize = 1;

                #[inline(always)]
                fn splat(value: $t) -> $t {
                    value
                }

                #[inline(always)]
                fn load(src: &[$t]) -> $t {
                    load_lanes::<$t, 1, _>(src, |lanes| lanes[0])
                }

                #[inline(always)]
                fn store(reg: $t, dst: &mut [$t]) {
                    store_lanes::<$t, 1>(dst, |lanes| lanes[0] = reg)
                }

                #[inline(always)]
                fn add(a: $t, b: $t) -> $t {
                    a.lane_add(b)
                }

                #[inline(always)]
                fn sub(a: $t, b: $t) -> $t {
                    a.lane_sub(b)
                }

                #[inline(always)]
                fn mul(a: $t, b: $t) -> $t {
                    a.lane_mul(b)
                }

                #[inline(always)]
                fn max(a: $t, b: $t) -> $t {
                    a.lane_max(b)
                }

                #[inline(always)]
                fn min(a: $t, b: $t) -> $t {
                    a.lane_min(b)
                }
            }
        )*
    };
}

impl_generic!(f32, i32, i16, i8);

#[inline(always)]
fn mask(cond: bool) -> f32 {
    f32::from_bits(if cond { u32::MAX } else { 0 })
}

#[inline(always)]
fn bitwise(a: f32, b: f32, op: impl FnOnce(u32, u32) -> u32) -> f32 {
    f32::from_bits(op(a.to_bits(), b.to_bits()))
}

impl FloatVecOps for Generic {
    #[inline(always)]
    fn div(a: f32, b: f32) -> f32 {
        a / b
    }

    #[inline(always)]
    fn splat_bits(bits: u32) -> f32 {
        f32::from_bits(bits)
    }

    #[inline(always)]
    fn lt(a: f32, b: f32) -> f32 {
        mask(a < b)
    }

    #[inline(always)]
    fn le(a: f32, b: f32) -> f32 {
        mask(a <= b)
    }

    #[inline(always)]
    fn eq(a: f32, b: f32) -> f32 {
        mask(a == b)
    }

    #[inline(always)]
    fn is_nan(a: f32) -> f32 {
        mask(a.is_nan())
    }

    #[inline(always)]
    fn and(a: f32, b: f32) -> f32 {
        bitwise(a, b, |a, b| a & b)
    }

    #[inline(always)]
    fn or(a: f32, b: f32) -> f32 {
        bitwise(a, b, |a, b| a | b)
    }

    #[inline(always)]
    fn xor(a: f32, b: f32) -> f32 {
        bitwise(a, b, |a, b| a ^ b)
    }

    #[inline(always)]
    fn andnot(mask: f32, b: f32) -> f32 {
        bitwise(mask, b, |m, b| !m & b)
    }

    #[inline(always)]
    fn pow2i(n: f32) -> f32 {
        // Truncating conversion, then the biased exponent moved into place.
        let biased = (n as i32).wrapping_add(127);
        f32::from_bits((biased as u32) << 23)
    }

    #[inline(always)]
    fn frexp(x: f32) -> (f32, f32) {
        let bits = x.to_bits();
        let e = ((bits >> 23) as i32 - 126) as f32;
        let m = f32::from_bits((bits & 0x807F_FFFF) | 0x3F00_0000);
        (m, e)
    }
}
