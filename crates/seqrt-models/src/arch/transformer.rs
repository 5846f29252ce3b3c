//! Encoder-decoder Transformer
//!
//! Variable layout history:
//!
//! * revision 1: names are prefixed with `transformer/` and weights are called
//!   `kernel` (`kernel_scale` for their scales);
//! * revision 2: each layer stores its weight and bias as one `[2, H]`
//!   `ffn/affine` tensor;
//! * revision 3: `{encoder,decoder}/layer_{i}/ffn/{weight,bias}` and
//!   `decoder/projection/{weight,bias}`.
//!
//! Older revisions are rewritten to revision 3 while the variables are
//! registered.

use super::ModelSpec;
use crate::graph::{Decoder, Encoder, StackDecoder, StackEncoder};
use crate::model::{Model, PendingModel};
use crate::storage::Variable;
use seqrt_common::{Result, SeqrtError};
use tracing::debug;

const LEGACY_PREFIX: &str = "transformer/";
const PACKED_AFFINE: &str = "ffn/affine";
const PROJECTION_WEIGHT: &str = "decoder/projection/weight";
const EMBEDDINGS_WEIGHT: &str = "decoder/embeddings/weight";

#[derive(Debug, Clone, Copy, Default)]
pub struct TransformerSpec;

impl TransformerSpec {
    pub const NAME: &'static str = "TransformerSpec";
    pub const CURRENT_REVISION: u32 = 3;
}

/// Revision 1 name to revision 2 name.
fn rename_legacy(name: &str) -> String {
    let name = name.strip_prefix(LEGACY_PREFIX).unwrap_or(name);
    let (scope, last) = match name.rsplit_once('/') {
        Some((scope, last)) => (Some(scope), last),
        None => (None, name),
    };
    let last = match last {
        "kernel" => "weight",
        "kernel_scale" => "weight_scale",
        other => other,
    };
    match scope {
        Some(scope) => format!("{scope}/{last}"),
        None => last.to_string(),
    }
}

/// Splits a packed `[2, H]` affine tensor into its weight and bias rows.
fn split_affine(name: &str, affine: &Variable) -> Result<(Variable, Variable)> {
    if !affine.dtype().is_float() || affine.rank() != 2 || affine.shape()[0] != 2 {
        return Err(SeqrtError::format(format!(
            "'{name}' must be a float [2, H] tensor, got {} {:?}",
            affine.dtype(),
            affine.shape()
        )));
    }
    let mut rows = affine.split_rows()?.into_iter();
    match (rows.next(), rows.next()) {
        (Some(weight), Some(bias)) => Ok((weight, bias)),
        _ => Err(SeqrtError::format(format!("'{name}' could not be split"))),
    }
}

impl ModelSpec for TransformerSpec {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn current_spec_revision(&self) -> u32 {
        Self::CURRENT_REVISION
    }

    fn register_variable(&self, model: &mut PendingModel, name: String, variable: Variable) -> Result<()> {
        let revision = model.spec_revision();
        let name = if revision < 2 { rename_legacy(&name) } else { name };

        if revision <= 2
            && let Some(scope) = name.strip_suffix(PACKED_AFFINE)
        {
            let (weight, bias) = split_affine(&name, &variable)?;
            debug!(%name, "splitting packed affine");
            model.registry.insert(format!("{scope}ffn/weight"), weight);
            model.registry.insert(format!("{scope}ffn/bias"), bias);
            return Ok(());
        }

        debug!(%name, shape = ?variable.shape(), dtype = %variable.dtype(), "registering variable");
        model.registry.insert(name, variable);
        Ok(())
    }

    fn register_variable_alias(&self, model: &mut PendingModel, alias: String, target: String) -> Result<()> {
        let (alias, target) = if model.spec_revision() < 2 {
            (rename_legacy(&alias), rename_legacy(&target))
        } else {
            (alias, target)
        };
        debug!(%alias, %target, "registering alias");
        model.registry.register_alias(alias, target);
        Ok(())
    }

    fn finalize(&self, model: &mut PendingModel) -> Result<()> {
        // The output projection is shared with the embeddings when it was not
        // saved on its own.
        if !model.registry.contains(PROJECTION_WEIGHT) && model.registry.contains(EMBEDDINGS_WEIGHT) {
            debug!(alias = PROJECTION_WEIGHT, target = EMBEDDINGS_WEIGHT, "sharing output projection");
            model.registry.register_alias(PROJECTION_WEIGHT, EMBEDDINGS_WEIGHT);
        }
        model.convert_variables()
    }

    fn make_encoder<'m>(&self, model: &'m Model) -> Result<Box<dyn Encoder + 'm>> {
        Ok(Box::new(StackEncoder::new(model, "encoder")?))
    }

    fn make_decoder<'m>(&self, model: &'m Model) -> Result<Box<dyn Decoder + 'm>> {
        Ok(Box::new(StackDecoder::new(model, "decoder")?))
    }
}
