//! Decoder-only language model

use super::ModelSpec;
use crate::graph::{Decoder, Encoder, StackDecoder};
use crate::model::Model;
use seqrt_common::{ModelError, Result};

/// Decoder-only layout: `decoder/layer_{i}/ffn/{weight,bias}` and
/// `decoder/projection/{weight,bias}`. Uses the default registration hooks.
#[derive(Debug, Clone, Copy, Default)]
pub struct LanguageModelSpec;

impl LanguageModelSpec {
    pub const NAME: &'static str = "TransformerDecoderSpec";
    pub const CURRENT_REVISION: u32 = 1;
}

impl ModelSpec for LanguageModelSpec {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn current_spec_revision(&self) -> u32 {
        Self::CURRENT_REVISION
    }

    fn make_encoder<'m>(&self, _model: &'m Model) -> Result<Box<dyn Encoder + 'm>> {
        Err(ModelError::GraphUnavailable { spec: Self::NAME, graph: "encoder" }.into())
    }

    fn make_decoder<'m>(&self, model: &'m Model) -> Result<Box<dyn Decoder + 'm>> {
        Ok(Box::new(StackDecoder::new(model, "decoder")?))
    }
}
