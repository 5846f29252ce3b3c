//! CPU kernel implementations
//!
//! The instruction set is chosen when the crate is compiled, never at run
//! time: [`TargetIsa`] is AVX2 when the build enables it, SSE2 on other
//! x86_64 builds, NEON on aarch64 and the scalar [`Generic`] fallback
//! everywhere else (or always, with the `force-generic` feature).

pub mod fallback;
pub mod kernels;
pub mod math;
pub mod vec;

#[cfg(target_arch = "x86_64")]
pub mod x86;

#[cfg(target_arch = "aarch64")]
pub mod arm;

pub use fallback::Generic;
pub use vec::{CpuIsa, Element, FloatVecOps, VecOps};

#[cfg(target_arch = "x86_64")]
pub use x86::Sse2;

#[cfg(all(target_arch = "x86_64", target_feature = "avx2"))]
pub use x86::Avx2;

#[cfg(target_arch = "aarch64")]
pub use arm::Neon;

#[cfg(feature = "force-generic")]
pub type TargetIsa = Generic;

#[cfg(all(not(feature = "force-generic"), target_arch = "x86_64", target_feature = "avx2"))]
pub type TargetIsa = Avx2;

#[cfg(all(
    not(feature = "force-generic"),
    target_arch = "x86_64",
    not(target_feature = "avx2")
))]
pub type TargetIsa = Sse2;

#[cfg(all(not(feature = "force-generic"), target_arch = "aarch64"))]
pub type TargetIsa = Neon;

#[cfg(all(
    not(feature = "force-generic"),
    not(any(target_arch = "x86_64", target_arch = "aarch64"))
))]
pub type TargetIsa = Generic;
