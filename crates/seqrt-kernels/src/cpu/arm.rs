//! AArch64 NEON implementation (128-bit)

#![allow(unused_unsafe)]

use super::vec::{CpuIsa, FloatVecOps, VecOps, load_lanes, store_lanes};
use std::arch::aarch64::*;

/// NEON tag: 4 × f32/i32, 8 × i16, 16 × i8.
#[derive(Debug, Clone, Copy, Default)]
pub struct Neon;

impl CpuIsa for Neon {
    const NAME: &'static str = "neon";
}

impl VecOps<f32> for Neon {
    type Reg = float32x4_t;
    const WIDTH: usize = 4;

    #[inline(always)]
    fn splat(value: f32) -> float32x4_t {
        unsafe { vdupq_n_f32(value) }
    }

    #[inline(always)]
    fn load(src: &[f32]) -> float32x4_t {
        load_lanes::<f32, 4, _>(src, |lanes| unsafe { vld1q_f32(lanes.as_ptr()) })
    }

    #[inline(always)]
    fn store(reg: float32x4_t, dst: &mut [f32]) {
        store_lanes::<f32, 4>(dst, |lanes| unsafe { vst1q_f32(lanes.as_mut_ptr(), reg) })
    }

    #[inline(always)]
    fn add(a: float32x4_t, b: float32x4_t) -> float32x4_t {
        unsafe { vaddq_f32(a, b) }
    }

    #[inline(always)]
    fn sub(a: float32x4_t, b: float32x4_t) -> float32x4_t {
        unsafe { vsubq_f32(a, b) }
    }

    #[inline(always)]
    fn mul(a: float32x4_t, b: float32x4_t) -> float32x4_t {
        unsafe { vmulq_f32(a, b) }
    }

    // vmaxq_f32 propagates NaN, so select explicitly to keep the x86 ordering.
    #[inline(always)]
    fn max(a: float32x4_t, b: float32x4_t) -> float32x4_t {
        unsafe { vbslq_f32(vcgtq_f32(a, b), a, b) }
    }

    #[inline(always)]
    fn min(a: float32x4_t, b: float32x4_t) -> float32x4_t {
        unsafe { vbslq_f32(vcltq_f32(a, b), a, b) }
    }
}

#[inline(always)]
fn bits(a: float32x4_t) -> uint32x4_t {
    unsafe { vreinterpretq_u32_f32(a) }
}

#[inline(always)]
fn float(a: uint32x4_t) -> float32x4_t {
    unsafe { vreinterpretq_f32_u32(a) }
}

impl FloatVecOps for Neon {
    #[inline(always)]
    fn div(a: float32x4_t, b: float32x4_t) -> float32x4_t {
        unsafe { vdivq_f32(a, b) }
    }

    #[inline(always)]
    fn splat_bits(value: u32) -> float32x4_t {
        float(unsafe { vdupq_n_u32(value) })
    }

    #[inline(always)]
    fn lt(a: float32x4_t, b: float32x4_t) -> float32x4_t {
        float(unsafe { vcltq_f32(a, b) })
    }

    #[inline(always)]
    fn le(a: float32x4_t, b: float32x4_t) -> float32x4_t {
        float(unsafe { vcleq_f32(a, b) })
    }

    #[inline(always)]
    fn eq(a: float32x4_t, b: float32x4_t) -> float32x4_t {
        float(unsafe { vceqq_f32(a, b) })
    }

    #[inline(always)]
    fn is_nan(a: float32x4_t) -> float32x4_t {
        float(unsafe { vmvnq_u32(vceqq_f32(a, a)) })
    }

    #[inline(always)]
    fn and(a: float32x4_t, b: float32x4_t) -> float32x4_t {
        float(unsafe { vandq_u32(bits(a), bits(b)) })
    }

    #[inline(always)]
    fn or(a: float32x4_t, b: float32x4_t) -> float32x4_t {
        float(unsafe { vorrq_u32(bits(a), bits(b)) })
    }

    #[inline(always)]
    fn xor(a: float32x4_t, b: float32x4_t) -> float32x4_t {
        float(unsafe { veorq_u32(bits(a), bits(b)) })
    }

    #[inline(always)]
    fn andnot(mask: float32x4_t, b: float32x4_t) -> float32x4_t {
        float(unsafe { vbicq_u32(bits(b), bits(mask)) })
    }

    #[inline(always)]
    fn select(mask: float32x4_t, a: float32x4_t, b: float32x4_t) -> float32x4_t {
        unsafe { vbslq_f32(bits(mask), a, b) }
    }

    #[inline(always)]
    fn pow2i(n: float32x4_t) -> float32x4_t {
        unsafe {
            let biased = vaddq_s32(vcvtq_s32_f32(n), vdupq_n_s32(127));
            vreinterpretq_f32_s32(vshlq_n_s32::<23>(biased))
        }
    }

    #[inline(always)]
    fn frexp(x: float32x4_t) -> (float32x4_t, float32x4_t) {
        unsafe {
            let raw = bits(x);
            let e = vsubq_s32(vreinterpretq_s32_u32(vshrq_n_u32::<23>(raw)), vdupq_n_s32(126));
            let m = vorrq_u32(vandq_u32(raw, vdupq_n_u32(0x807F_FFFF)), vdupq_n_u32(0x3F00_0000));
            (float(m), vcvtq_f32_s32(e))
        }
    }
}

macro_rules! impl_neon_integer {
    (
        $t:ty, $reg:ty, $width:literal,
        $dup:ident, $ld:ident, $st:ident, $add:ident, $sub:ident, $mul:ident, $max:ident, $min:ident
    ) => {
        impl VecOps<$t> for Neon {
            type Reg = $reg;
            const WIDTH: usize = $width;

            #[inline(always)]
            fn splat(value: $t) -> $reg {
                unsafe { $dup(value) }
            }

            #[inline(always)]
            fn load(src: &[$t]) -> $reg {
                load_lanes::<$t, $width, _>(src, |lanes| unsafe { $ld(lanes.as_ptr()) })
            }

            #[inline(always)]
            fn store(reg: $reg, dst: &mut [$t]) {
                store_lanes::<$t, $width>(dst, |lanes| unsafe { $st(lanes.as_mut_ptr(), reg) })
            }

            #[inline(always)]
            fn add(a: $reg, b: $reg) -> $reg {
                unsafe { $add(a, b) }
            }

            #[inline(always)]
            fn sub(a: $reg, b: $reg) -> $reg {
                unsafe { $sub(a, b) }
            }

            #[inline(always)]
            fn mul(a: $reg, b: $reg) -> $reg {
                unsafe { $mul(a, b) }
            }

            #[inline(always)]
            fn max(a: $reg, b: $reg) -> $reg {
                unsafe { $max(a, b) }
            }

            #[inline(always)]
            fn min(a: $reg, b: $reg) -> $reg {
                unsafe { $min(a, b) }
            }
        }
    };
}

impl_neon_integer!(
    i32, int32x4_t, 4,
    vdupq_n_s32, vld1q_s32, vst1q_s32, vaddq_s32, vsubq_s32, vmulq_s32, vmaxq_s32, vminq_s32
);
impl_neon_integer!(
    i16, int16x8_t, 8,
    vdupq_n_s16, vld1q_s16, vst1q_s16, vaddq_s16, vsubq_s16, vmulq_s16, vmaxq_s16, vminq_s16
);
impl_neon_integer!(
    i8, int8x16_t, 16,
    vdupq_n_s8, vld1q_s8, vst1q_s8, vaddq_s8, vsubq_s8, vmulq_s8, vmaxq_s8, vminq_s8
);
