//! seqrt: execution core for sequence-model inference
//!
//! Re-exports the workspace crates:
//!
//! * [`common`]: device and precision enums, errors, configuration
//! * [`kernels`]: vectorized elementwise kernels
//! * [`models`]: container loading, weight conversion and graphs

pub use seqrt_common as common;
pub use seqrt_kernels as kernels;
pub use seqrt_models as models;

pub use seqrt_common::{ComputeType, DataType, Device, Result, SeqrtConfig, SeqrtError};
pub use seqrt_models::{Decoder, Encoder, Model, ModelLoader};

use std::sync::Arc;

/// Loads the model named by `config.model.path` with `config.load`.
pub fn load_model(config: &SeqrtConfig) -> Result<Arc<Model>> {
    let path = config
        .model
        .path
        .as_deref()
        .ok_or_else(|| SeqrtError::Config("no model path configured".to_string()))?;
    ModelLoader::from_config(&config.load).load(path)
}
