//! Per-(element type, instruction set) vector primitives
//!
//! Every instruction set is a zero-sized tag type implementing [`VecOps`] for
//! each element type it supports. Kernels are written once, generically over
//! these traits, and monomorphized per tag.

use std::fmt::Debug;

/// Marker for a compile-time instruction-set tag.
pub trait CpuIsa: Copy + Send + Sync + 'static {
    const NAME: &'static str;
}

/// Scalar element usable in vector kernels.
///
/// Integer arithmetic wraps, matching what packed integer instructions do.
pub trait Element: Copy + Default + PartialOrd + Debug + Send + Sync + 'static {
    fn lane_add(self, other: Self) -> Self;
    fn lane_sub(self, other: Self) -> Self;
    fn lane_mul(self, other: Self) -> Self;

    #[inline(always)]
    fn lane_max(self, other: Self) -> Self {
        if self > other { self } else { other }
    }

    #[inline(always)]
    fn lane_min(self, other: Self) -> Self {
        if self < other { self } else { other }
    }
}

impl Element for f32 {
    #[inline(always)]
    fn lane_add(self, other: Self) -> Self {
        self + other
    }

    #[inline(always)]
    fn lane_sub(self, other: Self) -> Self {
        self - other
    }

    #[inline(always)]
    fn lane_mul(self, other: Self) -> Self {
        self * other
    }
}

macro_rules! impl_integer_element {
    ($($t:ty),*) => {
        $(
            impl Element for $t {
                #[inline(always)]
                fn lane_add(self, other: Self) -> Self {
                    self.wrapping_add(other)
                }

                #[inline(always)]
                fn lane_sub(self, other: Self) -> Self {
                    self.wrapping_sub(other)
                }

                #[inline(always)]
                fn lane_mul(self, other: Self) -> Self {
                    self.wrapping_mul(other)
                }
            }
        )*
    };
}

impl_integer_element!(i32, i16, i8);

/// Vector primitives for element type `T`.
///
/// `max(a, b)` is `a > b ? a : b` lane-wise and `min(a, b)` is `a < b ? a : b`,
/// so NaN and signed-zero handling is identical on every instruction set.
pub trait VecOps<T: Element>: CpuIsa {
    type Reg: Copy;

    /// Number of `T` lanes in [`Self::Reg`].
    const WIDTH: usize;

    fn splat(value: T) -> Self::Reg;

    /// Loads `src.len()` elements, which must not exceed `WIDTH`. Lanes past
    /// the end of `src` are zero.
    fn load(src: &[T]) -> Self::Reg;

    /// Stores the first `dst.len()` lanes, which must not exceed `WIDTH`.
    fn store(reg: Self::Reg, dst: &mut [T]);

    fn add(a: Self::Reg, b: Self::Reg) -> Self::Reg;
    fn sub(a: Self::Reg, b: Self::Reg) -> Self::Reg;
    fn mul(a: Self::Reg, b: Self::Reg) -> Self::Reg;
    fn max(a: Self::Reg, b: Self::Reg) -> Self::Reg;
    fn min(a: Self::Reg, b: Self::Reg) -> Self::Reg;
}

/// Extra `f32` primitives the transcendental approximations are built from.
///
/// Comparisons return lane masks (all bits set or all clear) in the same
/// register type, and the bitwise operations act on the raw lane bits.
pub trait FloatVecOps: VecOps<f32> {
    fn div(a: Self::Reg, b: Self::Reg) -> Self::Reg;

    /// Broadcasts a raw bit pattern.
    fn splat_bits(bits: u32) -> Self::Reg;

    fn lt(a: Self::Reg, b: Self::Reg) -> Self::Reg;
    fn le(a: Self::Reg, b: Self::Reg) -> Self::Reg;
    fn eq(a: Self::Reg, b: Self::Reg) -> Self::Reg;
    fn is_nan(a: Self::Reg) -> Self::Reg;

    fn and(a: Self::Reg, b: Self::Reg) -> Self::Reg;
    fn or(a: Self::Reg, b: Self::Reg) -> Self::Reg;
    fn xor(a: Self::Reg, b: Self::Reg) -> Self::Reg;

    /// `!mask & b`
    fn andnot(mask: Self::Reg, b: Self::Reg) -> Self::Reg;

    /// `2^n` for lanes holding an integral `n` in `[-127, 128]`.
    fn pow2i(n: Self::Reg) -> Self::Reg;

    /// Splits a positive normal `x` into `(m, e)` with `m` in `[0.5, 1)` and
    /// `x = m * 2^e`.
    fn frexp(x: Self::Reg) -> (Self::Reg, Self::Reg);

    #[inline(always)]
    fn select(mask: Self::Reg, a: Self::Reg, b: Self::Reg) -> Self::Reg {
        Self::or(Self::and(mask, a), Self::andnot(mask, b))
    }

    #[inline(always)]
    fn rcp(a: Self::Reg) -> Self::Reg {
        Self::div(Self::splat(1.0), a)
    }
}

/// Runs `load` on `src` as a full `[T; N]` lane array, zero-padding short
/// slices through a stack buffer.
#[inline(always)]
pub(crate) fn load_lanes<T: Element, const N: usize, R>(
    src: &[T],
    load: impl FnOnce(&[T; N]) -> R,
) -> R {
    match <&[T; N]>::try_from(src) {
        Ok(lanes) => load(lanes),
        Err(_) => {
            let mut buf = [T::default(); N];
            buf[..src.len()].copy_from_slice(src);
            load(&buf)
        }
    }
}

/// Runs `store` into `dst` as a full `[T; N]` lane array, going through a
/// stack buffer when `dst` is short.
#[inline(always)]
pub(crate) fn store_lanes<T: Element, const N: usize>(
    dst: &mut [T],
    store: impl FnOnce(&mut [T; N]),
) {
    if dst.len() == N {
        if let Ok(lanes) = <&mut [T; N]>::try_from(dst) {
            store(lanes);
        }
        return;
    }
    let mut buf = [T::default(); N];
    store(&mut buf);
    let count = dst.len();
    dst.copy_from_slice(&buf[..count]);
}
