//! Common types, errors, and configuration for the seqrt runtime
//!
//! This crate provides the vocabulary shared by the kernel and model crates:
//! device and precision enums, the error taxonomy, and the layered runtime
//! configuration.

pub mod config;
pub mod error;
pub mod types;

pub use config::*;
pub use error::*;
pub use types::*;
