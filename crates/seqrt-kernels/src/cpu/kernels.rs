//! Elementwise array kernels
//!
//! Every kernel walks its inputs in register-sized chunks and finishes with
//! one partial chunk through the masked [`VecOps::load`]/[`VecOps::store`],
//! so no instruction set ever touches memory outside the given slices.

use super::math;
use super::vec::{Element, FloatVecOps, VecOps};

/// Calls `func(offset, count)` over `0..size` in steps of `width`, with a
/// final shorter step for the remainder.
#[inline(always)]
pub fn vectorized_iter(size: usize, width: usize, mut func: impl FnMut(usize, usize)) {
    debug_assert!(width > 0);
    let remaining = size % width;
    let size = size - remaining;

    let mut i = 0;
    while i < size {
        func(i, width);
        i += width;
    }

    if remaining != 0 {
        func(size, remaining);
    }
}

#[inline(always)]
fn vectorized_unary_transform<I, T, F>(x: &[T], y: &mut [T], func: F)
where
    I: VecOps<T>,
    T: Element,
    F: Fn(I::Reg) -> I::Reg,
{
    debug_assert_eq!(x.len(), y.len());
    let size = x.len().min(y.len());
    vectorized_iter(size, I::WIDTH, |i, width| {
        let v = I::load(&x[i..i + width]);
        I::store(func(v), &mut y[i..i + width]);
    });
}

#[inline(always)]
fn vectorized_binary_transform<I, T, F>(a: &[T], b: &[T], c: &mut [T], func: F)
where
    I: VecOps<T>,
    T: Element,
    F: Fn(I::Reg, I::Reg) -> I::Reg,
{
    debug_assert!(a.len() == b.len() && b.len() == c.len());
    let size = a.len().min(b.len()).min(c.len());
    vectorized_iter(size, I::WIDTH, |i, width| {
        let va = I::load(&a[i..i + width]);
        let vb = I::load(&b[i..i + width]);
        I::store(func(va, vb), &mut c[i..i + width]);
    });
}

// ── Float unary ─────────────────────────────────────────────────────────────

/// `y[i] = 1 / x[i]`
pub fn rcp<I: FloatVecOps>(x: &[f32], y: &mut [f32]) {
    vectorized_unary_transform::<I, f32, _>(x, y, I::rcp);
}

/// `y[i] = e^x[i]`
pub fn exp<I: FloatVecOps>(x: &[f32], y: &mut [f32]) {
    vectorized_unary_transform::<I, f32, _>(x, y, math::exp::<I>);
}

/// `y[i] = ln x[i]`
pub fn log<I: FloatVecOps>(x: &[f32], y: &mut [f32]) {
    vectorized_unary_transform::<I, f32, _>(x, y, math::log::<I>);
}

/// `y[i] = sin x[i]`
pub fn sin<I: FloatVecOps>(x: &[f32], y: &mut [f32]) {
    vectorized_unary_transform::<I, f32, _>(x, y, math::sin::<I>);
}

/// `y[i] = cos x[i]`
pub fn cos<I: FloatVecOps>(x: &[f32], y: &mut [f32]) {
    vectorized_unary_transform::<I, f32, _>(x, y, math::cos::<I>);
}

// ── Binary ──────────────────────────────────────────────────────────────────

/// `c[i] = a[i] + b[i]`
pub fn add<I: VecOps<T>, T: Element>(a: &[T], b: &[T], c: &mut [T]) {
    vectorized_binary_transform::<I, T, _>(a, b, c, I::add);
}

/// `c[i] = a[i] - b[i]`
pub fn sub<I: VecOps<T>, T: Element>(a: &[T], b: &[T], c: &mut [T]) {
    vectorized_binary_transform::<I, T, _>(a, b, c, I::sub);
}

/// `c[i] = a[i] * b[i]`
pub fn mul<I: VecOps<T>, T: Element>(a: &[T], b: &[T], c: &mut [T]) {
    vectorized_binary_transform::<I, T, _>(a, b, c, I::mul);
}

/// `c[i] = a[i] > b[i] ? a[i] : b[i]`
pub fn max<I: VecOps<T>, T: Element>(a: &[T], b: &[T], c: &mut [T]) {
    vectorized_binary_transform::<I, T, _>(a, b, c, I::max);
}

/// `c[i] = a[i] < b[i] ? a[i] : b[i]`
pub fn min<I: VecOps<T>, T: Element>(a: &[T], b: &[T], c: &mut [T]) {
    vectorized_binary_transform::<I, T, _>(a, b, c, I::min);
}

// ── Scalar broadcast ────────────────────────────────────────────────────────

/// `y[i] = x[i] + a`
pub fn add_scalar<I: VecOps<T>, T: Element>(a: T, x: &[T], y: &mut [T]) {
    let va = I::splat(a);
    vectorized_unary_transform::<I, T, _>(x, y, |v| I::add(v, va));
}

/// `y[i] = x[i] * a`
pub fn mul_scalar<I: VecOps<T>, T: Element>(a: T, x: &[T], y: &mut [T]) {
    let va = I::splat(a);
    vectorized_unary_transform::<I, T, _>(x, y, |v| I::mul(v, va));
}

/// `y[i] = max(x[i], a)`
pub fn max_scalar<I: VecOps<T>, T: Element>(a: T, x: &[T], y: &mut [T]) {
    let va = I::splat(a);
    vectorized_unary_transform::<I, T, _>(x, y, |v| I::max(v, va));
}

/// `y[i] = min(x[i], a)`
pub fn min_scalar<I: VecOps<T>, T: Element>(a: T, x: &[T], y: &mut [T]) {
    let va = I::splat(a);
    vectorized_unary_transform::<I, T, _>(x, y, |v| I::min(v, va));
}
