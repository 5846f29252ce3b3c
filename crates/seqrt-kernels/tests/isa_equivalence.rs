//! Instruction-set equivalence tests for `seqrt-kernels`.
//!
//! 1. **Bit equality** – every kernel on the build's `TargetIsa` matches the
//!    scalar `Generic` implementation bit for bit, for every element type.
//! 2. **Remainder lengths** – sizes 0, 1, W-1, W, W+1, 2W and 2W+R exercise the
//!    partial-register path, with guard elements around every output.
//! 3. **Special values** – NaN, infinities, zeros and subnormals.

use proptest::prelude::*;
use seqrt_kernels::cpu::{Element, Generic, TargetIsa, VecOps, kernels};

const GUARD: usize = 16;

/// Exact comparison that treats all NaNs as equal.
trait Exact: Element {
    fn exact(self, other: Self) -> bool;
    fn sentinel() -> Self;
}

impl Exact for f32 {
    fn exact(self, other: Self) -> bool {
        self.to_bits() == other.to_bits() || (self.is_nan() && other.is_nan())
    }

    fn sentinel() -> Self {
        -12345.5
    }
}

macro_rules! impl_exact_int {
    ($($t:ty),*) => {
        $(
            impl Exact for $t {
                fn exact(self, other: Self) -> bool {
                    self == other
                }

                fn sentinel() -> Self {
                    0x5A
                }
            }
        )*
    };
}

impl_exact_int!(i32, i16, i8);

type Unary<T> = fn(&[T], &mut [T]);
type Binary<T> = fn(&[T], &[T], &mut [T]);
type Broadcast<T> = fn(T, &[T], &mut [T]);

/// Runs `f` on an output slice of length `n` embedded between guard
/// elements, checks the guards, and returns the output.
fn guarded<T: Exact>(n: usize, f: impl FnOnce(&mut [T])) -> Vec<T> {
    let mut buf = vec![T::sentinel(); n + 2 * GUARD];
    f(&mut buf[GUARD..GUARD + n]);
    for (i, v) in buf[..GUARD].iter().chain(&buf[GUARD + n..]).enumerate() {
        assert!(v.exact(T::sentinel()), "guard element {i} overwritten (n = {n})");
    }
    buf[GUARD..GUARD + n].to_vec()
}

fn assert_exact<T: Exact>(name: &str, got: &[T], want: &[T]) {
    assert_eq!(got.len(), want.len());
    for (i, (g, w)) in got.iter().zip(want).enumerate() {
        assert!(g.exact(*w), "{name}[{i}]: {g:?} != {w:?}");
    }
}

fn check_unary<T: Exact>(name: &str, target: Unary<T>, reference: Unary<T>, x: &[T]) {
    let got = guarded(x.len(), |y| target(x, y));
    let want = guarded(x.len(), |y| reference(x, y));
    assert_exact(name, &got, &want);
}

fn check_binary<T: Exact>(name: &str, target: Binary<T>, reference: Binary<T>, a: &[T], b: &[T]) {
    let got = guarded(a.len(), |c| target(a, b, c));
    let want = guarded(a.len(), |c| reference(a, b, c));
    assert_exact(name, &got, &want);
}

fn check_broadcast<T: Exact>(
    name: &str,
    target: Broadcast<T>,
    reference: Broadcast<T>,
    s: T,
    x: &[T],
) {
    let got = guarded(x.len(), |y| target(s, x, y));
    let want = guarded(x.len(), |y| reference(s, x, y));
    assert_exact(name, &got, &want);
}

fn check_arithmetic<T: Exact>(a: &[T], b: &[T], s: T)
where
    TargetIsa: VecOps<T>,
    Generic: VecOps<T>,
{
    let binary: [(&str, Binary<T>, Binary<T>); 5] = [
        ("add", kernels::add::<TargetIsa, T>, kernels::add::<Generic, T>),
        ("sub", kernels::sub::<TargetIsa, T>, kernels::sub::<Generic, T>),
        ("mul", kernels::mul::<TargetIsa, T>, kernels::mul::<Generic, T>),
        ("max", kernels::max::<TargetIsa, T>, kernels::max::<Generic, T>),
        ("min", kernels::min::<TargetIsa, T>, kernels::min::<Generic, T>),
    ];
    for (name, target, reference) in binary {
        check_binary(name, target, reference, a, b);
    }

    let broadcast: [(&str, Broadcast<T>, Broadcast<T>); 4] = [
        ("add_scalar", kernels::add_scalar::<TargetIsa, T>, kernels::add_scalar::<Generic, T>),
        ("mul_scalar", kernels::mul_scalar::<TargetIsa, T>, kernels::mul_scalar::<Generic, T>),
        ("max_scalar", kernels::max_scalar::<TargetIsa, T>, kernels::max_scalar::<Generic, T>),
        ("min_scalar", kernels::min_scalar::<TargetIsa, T>, kernels::min_scalar::<Generic, T>),
    ];
    for (name, target, reference) in broadcast {
        check_broadcast(name, target, reference, s, a);
    }
}

fn check_float_unary(x: &[f32]) {
    let unary: [(&str, Unary<f32>, Unary<f32>); 5] = [
        ("rcp", kernels::rcp::<TargetIsa>, kernels::rcp::<Generic>),
        ("exp", kernels::exp::<TargetIsa>, kernels::exp::<Generic>),
        ("log", kernels::log::<TargetIsa>, kernels::log::<Generic>),
        ("sin", kernels::sin::<TargetIsa>, kernels::sin::<Generic>),
        ("cos", kernels::cos::<TargetIsa>, kernels::cos::<Generic>),
    ];
    for (name, target, reference) in unary {
        check_unary(name, target, reference, x);
    }
}

/// 0, 1, W-1, W, W+1, 2W and 2W+R for a register width W.
fn boundary_sizes(width: usize) -> Vec<usize> {
    let mut sizes = vec![0, 1, width.saturating_sub(1), width, width + 1, 2 * width];
    sizes.push(2 * width + width / 2 + 1);
    sizes.dedup();
    sizes
}

fn ramp<T: Copy>(n: usize, values: &[T]) -> Vec<T> {
    (0..n).map(|i| values[(i * 7 + 3) % values.len()]).collect()
}

// ---------------------------------------------------------------------------
// Deterministic boundary sizes
// ---------------------------------------------------------------------------

#[test]
fn float_kernels_at_boundary_sizes() {
    let values = [
        0.5, -1.25, 3.0, 88.0, -90.0, 1e-3, 7.75, -0.0, 0.0, 1e30, -2.5e-7, 1234.5, 1.0, -1.0,
    ];
    for n in boundary_sizes(<TargetIsa as VecOps<f32>>::WIDTH) {
        let a = ramp(n, &values);
        let b: Vec<f32> = a.iter().rev().copied().collect();
        check_arithmetic(&a, &b, 2.5);
        check_float_unary(&a);
    }
}

#[test]
fn integer_kernels_at_boundary_sizes() {
    for n in boundary_sizes(<TargetIsa as VecOps<i32>>::WIDTH) {
        let a = ramp(n, &[i32::MAX, i32::MIN, -1, 0, 1, 46341, -77, 1 << 30]);
        let b: Vec<i32> = a.iter().rev().copied().collect();
        check_arithmetic(&a, &b, -3);
    }
    for n in boundary_sizes(<TargetIsa as VecOps<i16>>::WIDTH) {
        let a = ramp(n, &[i16::MAX, i16::MIN, -1, 0, 1, 181, -300, 1 << 14]);
        let b: Vec<i16> = a.iter().rev().copied().collect();
        check_arithmetic(&a, &b, 7);
    }
    for n in boundary_sizes(<TargetIsa as VecOps<i8>>::WIDTH) {
        let a = ramp(n, &[i8::MAX, i8::MIN, -1, 0, 1, 12, -100, 64]);
        let b: Vec<i8> = a.iter().rev().copied().collect();
        check_arithmetic(&a, &b, -2);
    }
}

#[test]
fn special_float_values_match_generic() {
    let x = [
        f32::NAN,
        f32::INFINITY,
        f32::NEG_INFINITY,
        0.0,
        -0.0,
        f32::MIN_POSITIVE,
        f32::MIN_POSITIVE / 8.0,
        f32::MAX,
        f32::MIN,
        -1.0,
        88.72,
        -88.72,
        8192.0,
        -8192.0,
        1e7,
    ];
    let y: Vec<f32> = x.iter().rev().copied().collect();
    check_float_unary(&x);
    check_arithmetic(&x, &y, f32::NAN);
}

// ---------------------------------------------------------------------------
// Properties: arbitrary inputs
// ---------------------------------------------------------------------------

fn pair<T: Arbitrary + Clone + std::fmt::Debug>() -> impl Strategy<Value = (Vec<T>, Vec<T>, T)> {
    (0usize..100).prop_flat_map(|n| {
        (
            prop::collection::vec(any::<T>(), n),
            prop::collection::vec(any::<T>(), n),
            any::<T>(),
        )
    })
}

proptest! {
    #[test]
    fn prop_f32_kernels_match_generic((a, b, s) in pair::<f32>()) {
        check_arithmetic(&a, &b, s);
        check_float_unary(&a);
    }

    #[test]
    fn prop_i32_kernels_match_generic((a, b, s) in pair::<i32>()) {
        check_arithmetic(&a, &b, s);
    }

    #[test]
    fn prop_i16_kernels_match_generic((a, b, s) in pair::<i16>()) {
        check_arithmetic(&a, &b, s);
    }

    #[test]
    fn prop_i8_kernels_match_generic((a, b, s) in pair::<i8>()) {
        check_arithmetic(&a, &b, s);
    }
}
