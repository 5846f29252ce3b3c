//! x86_64 SSE2 and AVX2 implementations
//!
//! SSE2 is part of the x86_64 baseline and always available there. AVX2 is
//! only compiled when the build enables the `avx2` target feature (for
//! example `-C target-cpu=native`); selection happens at build time only.

#![allow(unused_unsafe)]

use super::vec::{CpuIsa, FloatVecOps, VecOps, load_lanes, store_lanes};
use std::arch::x86_64::*;

// ── SSE2 (128-bit) ──────────────────────────────────────────────────────────

/// SSE2 tag: 4 × f32/i32, 8 × i16, 16 × i8.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sse2;

impl CpuIsa for Sse2 {
    const NAME: &'static str = "sse2";
}

#[inline(always)]
fn select_si128(mask: __m128i, a: __m128i, b: __m128i) -> __m128i {
    unsafe { _mm_or_si128(_mm_and_si128(mask, a), _mm_andnot_si128(mask, b)) }
}

impl VecOps<f32> for Sse2 {
    type Reg = __m128;
    const WIDTH: usize = 4;

    #[inline(always)]
    fn splat(value: f32) -> __m128 {
        unsafe { _mm_set1_ps(value) }
    }

    #[inline(always)]
    fn load(src: &[f32]) -> __m128 {
        load_lanes::<f32, 4, _>(src, |lanes| unsafe { _mm_loadu_ps(lanes.as_ptr()) })
    }

    #[inline(always)]
    fn store(reg: __m128, dst: &mut [f32]) {
        store_lanes::<f32, 4>(dst, |lanes| unsafe { _mm_storeu_ps(lanes.as_mut_ptr(), reg) })
    }

    #[inline(always)]
    fn add(a: __m128, b: __m128) -> __m128 {
        unsafe { _mm_add_ps(a, b) }
    }

    #[inline(always)]
    fn sub(a: __m128, b: __m128) -> __m128 {
        unsafe { _mm_sub_ps(a, b) }
    }

    #[inline(always)]
    fn mul(a: __m128, b: __m128) -> __m128 {
        unsafe { _mm_mul_ps(a, b) }
    }

    #[inline(always)]
    fn max(a: __m128, b: __m128) -> __m128 {
        unsafe { _mm_max_ps(a, b) }
    }

    #[inline(always)]
    fn min(a: __m128, b: __m128) -> __m128 {
        unsafe { _mm_min_ps(a, b) }
    }
}

impl FloatVecOps for Sse2 {
    #[inline(always)]
    fn div(a: __m128, b: __m128) -> __m128 {
        unsafe { _mm_div_ps(a, b) }
    }

    #[inline(always)]
    fn splat_bits(bits: u32) -> __m128 {
        unsafe { _mm_castsi128_ps(_mm_set1_epi32(bits as i32)) }
    }

    #[inline(always)]
    fn lt(a: __m128, b: __m128) -> __m128 {
        unsafe { _mm_cmplt_ps(a, b) }
    }

    #[inline(always)]
    fn le(a: __m128, b: __m128) -> __m128 {
        unsafe { _mm_cmple_ps(a, b) }
    }

    #[inline(always)]
    fn eq(a: __m128, b: __m128) -> __m128 {
        unsafe { _mm_cmpeq_ps(a, b) }
    }

    #[inline(always)]
    fn is_nan(a: __m128) -> __m128 {
        unsafe { _mm_cmpunord_ps(a, a) }
    }

    #[inline(always)]
    fn and(a: __m128, b: __m128) -> __m128 {
        unsafe { _mm_and_ps(a, b) }
    }

    #[inline(always)]
    fn or(a: __m128, b: __m128) -> __m128 {
        unsafe { _mm_or_ps(a, b) }
    }

    #[inline(always)]
    fn xor(a: __m128, b: __m128) -> __m128 {
        unsafe { _mm_xor_ps(a, b) }
    }

    #[inline(always)]
    fn andnot(mask: __m128, b: __m128) -> __m128 {
        unsafe { _mm_andnot_ps(mask, b) }
    }

    #[inline(always)]
    fn pow2i(n: __m128) -> __m128 {
        unsafe {
            let biased = _mm_add_epi32(_mm_cvttps_epi32(n), _mm_set1_epi32(127));
            _mm_castsi128_ps(_mm_slli_epi32::<23>(biased))
        }
    }

    #[inline(always)]
    fn frexp(x: __m128) -> (__m128, __m128) {
        unsafe {
            let bits = _mm_castps_si128(x);
            let e = _mm_sub_epi32(_mm_srli_epi32::<23>(bits), _mm_set1_epi32(126));
            let m = _mm_or_si128(
                _mm_and_si128(bits, _mm_set1_epi32(0x807F_FFFFu32 as i32)),
                _mm_set1_epi32(0x3F00_0000),
            );
            (_mm_castsi128_ps(m), _mm_cvtepi32_ps(e))
        }
    }
}

impl VecOps<i32> for Sse2 {
    type Reg = __m128i;
    const WIDTH: usize = 4;

    #[inline(always)]
    fn splat(value: i32) -> __m128i {
        unsafe { _mm_set1_epi32(value) }
    }

    #[inline(always)]
    fn load(src: &[i32]) -> __m128i {
        load_lanes::<i32, 4, _>(src, |lanes| unsafe {
            _mm_loadu_si128(lanes.as_ptr() as *const __m128i)
        })
    }

    #[inline(always)]
    fn store(reg: __m128i, dst: &mut [i32]) {
        store_lanes::<i32, 4>(dst, |lanes| unsafe {
            _mm_storeu_si128(lanes.as_mut_ptr() as *mut __m128i, reg)
        })
    }

    #[inline(always)]
    fn add(a: __m128i, b: __m128i) -> __m128i {
        unsafe { _mm_add_epi32(a, b) }
    }

    #[inline(always)]
    fn sub(a: __m128i, b: __m128i) -> __m128i {
        unsafe { _mm_sub_epi32(a, b) }
    }

    /// SSE2 has no 32-bit low multiply; build it from two 32x32->64 products.
    #[inline(always)]
    fn mul(a: __m128i, b: __m128i) -> __m128i {
        unsafe {
            let even = _mm_mul_epu32(a, b);
            let odd = _mm_mul_epu32(_mm_srli_si128::<4>(a), _mm_srli_si128::<4>(b));
            _mm_unpacklo_epi32(
                _mm_shuffle_epi32::<0b00_00_10_00>(even),
                _mm_shuffle_epi32::<0b00_00_10_00>(odd),
            )
        }
    }

    #[inline(always)]
    fn max(a: __m128i, b: __m128i) -> __m128i {
        unsafe { select_si128(_mm_cmpgt_epi32(a, b), a, b) }
    }

    #[inline(always)]
    fn min(a: __m128i, b: __m128i) -> __m128i {
        unsafe { select_si128(_mm_cmplt_epi32(a, b), a, b) }
    }
}

impl VecOps<i16> for Sse2 {
    type Reg = __m128i;
    const WIDTH: usize = 8;

    #[inline(always)]
    fn splat(value: i16) -> __m128i {
        unsafe { _mm_set1_epi16(value) }
    }

    #[inline(always)]
    fn load(src: &[i16]) -> __m128i {
        load_lanes::<i16, 8, _>(src, |lanes| unsafe {
            _mm_loadu_si128(lanes.as_ptr() as *const __m128i)
        })
    }

    #[inline(always)]
    fn store(reg: __m128i, dst: &mut [i16]) {
        store_lanes::<i16, 8>(dst, |lanes| unsafe {
            _mm_storeu_si128(lanes.as_mut_ptr() as *mut __m128i, reg)
        })
    }

    #[inline(always)]
    fn add(a: __m128i, b: __m128i) -> __m128i {
        unsafe { _mm_add_epi16(a, b) }
    }

    #[inline(always)]
    fn sub(a: __m128i, b: __m128i) -> __m128i {
        unsafe { _mm_sub_epi16(a, b) }
    }

    #[inline(always)]
    fn mul(a: __m128i, b: __m128i) -> __m128i {
        unsafe { _mm_mullo_epi16(a, b) }
    }

    #[inline(always)]
    fn max(a: __m128i, b: __m128i) -> __m128i {
        unsafe { _mm_max_epi16(a, b) }
    }

    #[inline(always)]
    fn min(a: __m128i, b: __m128i) -> __m128i {
        unsafe { _mm_min_epi16(a, b) }
    }
}

impl VecOps<i8> for Sse2 {
    type Reg = __m128i;
    const WIDTH: usize = 16;

    #[inline(always)]
    fn splat(value: i8) -> __m128i {
        unsafe { _mm_set1_epi8(value) }
    }

    #[inline(always)]
    fn load(src: &[i8]) -> __m128i {
        load_lanes::<i8, 16, _>(src, |lanes| unsafe {
            _mm_loadu_si128(lanes.as_ptr() as *const __m128i)
        })
    }

    #[inline(always)]
    fn store(reg: __m128i, dst: &mut [i8]) {
        store_lanes::<i8, 16>(dst, |lanes| unsafe {
            _mm_storeu_si128(lanes.as_mut_ptr() as *mut __m128i, reg)
        })
    }

    #[inline(always)]
    fn add(a: __m128i, b: __m128i) -> __m128i {
        unsafe { _mm_add_epi8(a, b) }
    }

    #[inline(always)]
    fn sub(a: __m128i, b: __m128i) -> __m128i {
        unsafe { _mm_sub_epi8(a, b) }
    }

    /// Multiplies even and odd bytes as 16-bit lanes and keeps the low byte
    /// of each product.
    #[inline(always)]
    fn mul(a: __m128i, b: __m128i) -> __m128i {
        unsafe {
            let even = _mm_mullo_epi16(a, b);
            let odd = _mm_mullo_epi16(_mm_srli_epi16::<8>(a), _mm_srli_epi16::<8>(b));
            _mm_or_si128(
                _mm_slli_epi16::<8>(odd),
                _mm_and_si128(even, _mm_set1_epi16(0x00FF)),
            )
        }
    }

    #[inline(always)]
    fn max(a: __m128i, b: __m128i) -> __m128i {
        unsafe { select_si128(_mm_cmpgt_epi8(a, b), a, b) }
    }

    #[inline(always)]
    fn min(a: __m128i, b: __m128i) -> __m128i {
        unsafe { select_si128(_mm_cmplt_epi8(a, b), a, b) }
    }
}

// ── AVX2 (256-bit) ──────────────────────────────────────────────────────────

#[cfg(target_feature = "avx2")]
pub use avx2::Avx2;

#[cfg(target_feature = "avx2")]
mod avx2 {
    use super::*;

    /// AVX2 tag: 8 × f32/i32, 16 × i16, 32 × i8.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct Avx2;

    impl CpuIsa for Avx2 {
        const NAME: &'static str = "avx2";
    }

    impl VecOps<f32> for Avx2 {
        type Reg = __m256;
        const WIDTH: usize = 8;

        #[inline(always)]
        fn splat(value: f32) -> __m256 {
            unsafe { _mm256_set1_ps(value) }
        }

        #[inline(always)]
        fn load(src: &[f32]) -> __m256 {
            load_lanes::<f32, 8, _>(src, |lanes| unsafe { _mm256_loadu_ps(lanes.as_ptr()) })
        }

        #[inline(always)]
        fn store(reg: __m256, dst: &mut [f32]) {
            store_lanes::<f32, 8>(dst, |lanes| unsafe {
                _mm256_storeu_ps(lanes.as_mut_ptr(), reg)
            })
        }

        #[inline(always)]
        fn add(a: __m256, b: __m256) -> __m256 {
            unsafe { _mm256_add_ps(a, b) }
        }

        #[inline(always)]
        fn sub(a: __m256, b: __m256) -> __m256 {
            unsafe { _mm256_sub_ps(a, b) }
        }

        #[inline(always)]
        fn mul(a: __m256, b: __m256) -> __m256 {
            unsafe { _mm256_mul_ps(a, b) }
        }

        #[inline(always)]
        fn max(a: __m256, b: __m256) -> __m256 {
            unsafe { _mm256_max_ps(a, b) }
        }

        #[inline(always)]
        fn min(a: __m256, b: __m256) -> __m256 {
            unsafe { _mm256_min_ps(a, b) }
        }
    }

    impl FloatVecOps for Avx2 {
        #[inline(always)]
        fn div(a: __m256, b: __m256) -> __m256 {
            unsafe { _mm256_div_ps(a, b) }
        }

        #[inline(always)]
        fn splat_bits(bits: u32) -> __m256 {
            unsafe { _mm256_castsi256_ps(_mm256_set1_epi32(bits as i32)) }
        }

        #[inline(always)]
        fn lt(a: __m256, b: __m256) -> __m256 {
            unsafe { _mm256_cmp_ps::<{ _CMP_LT_OQ }>(a, b) }
        }

        #[inline(always)]
        fn le(a: __m256, b: __m256) -> __m256 {
            unsafe { _mm256_cmp_ps::<{ _CMP_LE_OQ }>(a, b) }
        }

        #[inline(always)]
        fn eq(a: __m256, b: __m256) -> __m256 {
            unsafe { _mm256_cmp_ps::<{ _CMP_EQ_OQ }>(a, b) }
        }

        #[inline(always)]
        fn is_nan(a: __m256) -> __m256 {
            unsafe { _mm256_cmp_ps::<{ _CMP_UNORD_Q }>(a, a) }
        }

        #[inline(always)]
        fn and(a: __m256, b: __m256) -> __m256 {
            unsafe { _mm256_and_ps(a, b) }
        }

        #[inline(always)]
        fn or(a: __m256, b: __m256) -> __m256 {
            unsafe { _mm256_or_ps(a, b) }
        }

        #[inline(always)]
        fn xor(a: __m256, b: __m256) -> __m256 {
            unsafe { _mm256_xor_ps(a, b) }
        }

        #[inline(always)]
        fn andnot(mask: __m256, b: __m256) -> __m256 {
            unsafe { _mm256_andnot_ps(mask, b) }
        }

        #[inline(always)]
        fn pow2i(n: __m256) -> __m256 {
            unsafe {
                let biased = _mm256_add_epi32(_mm256_cvttps_epi32(n), _mm256_set1_epi32(127));
                _mm256_castsi256_ps(_mm256_slli_epi32::<23>(biased))
            }
        }

        #[inline(always)]
        fn frexp(x: __m256) -> (__m256, __m256) {
            unsafe {
                let bits = _mm256_castps_si256(x);
                let e = _mm256_sub_epi32(_mm256_srli_epi32::<23>(bits), _mm256_set1_epi32(126));
                let m = _mm256_or_si256(
                    _mm256_and_si256(bits, _mm256_set1_epi32(0x807F_FFFFu32 as i32)),
                    _mm256_set1_epi32(0x3F00_0000),
                );
                (_mm256_castsi256_ps(m), _mm256_cvtepi32_ps(e))
            }
        }
    }

    macro_rules! impl_avx2_integer {
        ($t:ty, $width:literal, $set1:ident, $add:ident, $sub:ident, $max:ident, $min:ident) => {
            impl VecOps<$t> for Avx2 {
                type Reg = __m256i;
                const WIDTH: usize = $width;

                #[inline(always)]
                fn splat(value: $t) -> __m256i {
                    unsafe { $set1(value) }
                }

                #[inline(always)]
                fn load(src: &[$t]) -> __m256i {
                    load_lanes::<$t, $width, _>(src, |lanes| unsafe {
                        _mm256_loadu_si256(lanes.as_ptr() as *const __m256i)
                    })
                }

                #[inline(always)]
                fn store(reg: __m256i, dst: &mut [$t]) {
                    store_lanes::<$t, $width>(dst, |lanes| unsafe {
                        _mm256_storeu_si256(lanes.as_mut_ptr() as *mut __m256i, reg)
                    })
                }

                #[inline(always)]
                fn add(a: __m256i, b: __m256i) -> __m256i {
                    unsafe { $add(a, b) }
                }

                #[inline(always)]
                fn sub(a: __m256i, b: __m256i) -> __m256i {
                    unsafe { $sub(a, b) }
                }

                #[inline(always)]
                fn mul(a: __m256i, b: __m256i) -> __m256i {
                    unsafe { <$t as Avx2Mul>::mul(a, b) }
                }

                #[inline(always)]
                fn max(a: __m256i, b: __m256i) -> __m256i {
                    unsafe { $max(a, b) }
                }

                #[inline(always)]
                fn min(a: __m256i, b: __m256i) -> __m256i {
                    unsafe { $min(a, b) }
                }
            }
        };
    }

    /// Low-half lane multiply per integer width.
    trait Avx2Mul {
        fn mul(a: __m256i, b: __m256i) -> __m256i;
    }

    impl Avx2Mul for i32 {
        #[inline(always)]
        fn mul(a: __m256i, b: __m256i) -> __m256i {
            unsafe { _mm256_mullo_epi32(a, b) }
        }
    }

    impl Avx2Mul for i16 {
        #[inline(always)]
        fn mul(a: __m256i, b: __m256i) -> __m256i {
            unsafe { _mm256_mullo_epi16(a, b) }
        }
    }

    impl Avx2Mul for i8 {
        #[inline(always)]
        fn mul(a: __m256i, b: __m256i) -> __m256i {
            unsafe {
                let even = _mm256_mullo_epi16(a, b);
                let odd =
                    _mm256_mullo_epi16(_mm256_srli_epi16::<8>(a), _mm256_srli_epi16::<8>(b));
                _mm256_or_si256(
                    _mm256_slli_epi16::<8>(odd),
                    _mm256_and_si256(even, _mm256_set1_epi16(0x00FF)),
                )
            }
        }
    }

    impl_avx2_integer!(i32, 8, _mm256_set1_epi32, _mm256_add_epi32, _mm256_sub_epi32, _mm256_max_epi32, _mm256_min_epi32);
    impl_avx2_integer!(i16, 16, _mm256_set1_epi16, _mm256_add_epi16, _mm256_sub_epi16, _mm256_max_epi16, _mm256_min_epi16);
    impl_avx2_integer!(i8, 32, _mm256_set1_epi8, _mm256_add_epi8, _mm256_sub_epi8, _mm256_max_epi8, _mm256_min_epi8);
}
