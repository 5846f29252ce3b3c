//! Elementwise compute kernels for seqrt
//!
//! The functions at the crate root run on [`cpu::TargetIsa`], the instruction
//! set selected for this build. The same kernels are available for any
//! compiled instruction set through [`cpu::kernels`], e.g.
//! `cpu::kernels::add::<cpu::Generic, f32>`.
//!
//! Supported element types are `f32`, `i32`, `i16` and `i8` for the
//! arithmetic kernels, and `f32` for `rcp`, `exp`, `log`, `sin` and `cos`.

pub mod cpu;

use cpu::{CpuIsa, Element, TargetIsa, VecOps, kernels};

/// Name of the instruction set the root-level kernels use.
pub fn target_isa_name() -> &'static str {
    TargetIsa::NAME
}

/// `y[i] = 1 / x[i]`
pub fn rcp(x: &[f32], y: &mut [f32]) {
    kernels::rcp::<TargetIsa>(x, y)
}

/// `y[i] = e^x[i]`
pub fn exp(x: &[f32], y: &mut [f32]) {
    kernels::exp::<TargetIsa>(x, y)
}

/// `y[i] = ln x[i]`
pub fn log(x: &[f32], y: &mut [f32]) {
    kernels::log::<TargetIsa>(x, y)
}

/// `y[i] = sin x[i]`
pub fn sin(x: &[f32], y: &mut [f32]) {
    kernels::sin::<TargetIsa>(x, y)
}

/// `y[i] = cos x[i]`
pub fn cos(x: &[f32], y: &mut [f32]) {
    kernels::cos::<TargetIsa>(x, y)
}

pub fn add<T: Element>(a: &[T], b: &[T], c: &mut [T])
where
    TargetIsa: VecOps<T>,
{
    kernels::add::<TargetIsa, T>(a, b, c)
}

pub fn sub<T: Element>(a: &[T], b: &[T], c: &mut [T])
where
    TargetIsa: VecOps<T>,
{
    kernels::sub::<TargetIsa, T>(a, b, c)
}

pub fn mul<T: Element>(a: &[T], b: &[T], c: &mut [T])
where
    TargetIsa: VecOps<T>,
{
    kernels::mul::<TargetIsa, T>(a, b, c)
}

pub fn max<T: Element>(a: &[T], b: &[T], c: &mut [T])
where
    TargetIsa: VecOps<T>,
{
    kernels::max::<TargetIsa, T>(a, b, c)
}

pub fn min<T: Element>(a: &[T], b: &[T], c: &mut [T])
where
    TargetIsa: VecOps<T>,
{
    kernels::min::<TargetIsa, T>(a, b, c)
}

pub fn add_scalar<T: Element>(a: T, x: &[T], y: &mut [T])
where
    TargetIsa: VecOps<T>,
{
    kernels::add_scalar::<TargetIsa, T>(a, x, y)
}

pub fn mul_scalar<T: Element>(a: T, x: &[T], y: &mut [T])
where
    TargetIsa: VecOps<T>,
{
    kernels::mul_scalar::<TargetIsa, T>(a, x, y)
}

pub fn max_scalar<T: Element>(a: T, x: &[T], y: &mut [T])
where
    TargetIsa: VecOps<T>,
{
    kernels::max_scalar::<TargetIsa, T>(a, x, y)
}

pub fn min_scalar<T: Element>(a: T, x: &[T], y: &mut [T])
where
    TargetIsa: VecOps<T>,
{
    kernels::min_scalar::<TargetIsa, T>(a, x, y)
}
