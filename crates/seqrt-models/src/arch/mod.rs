//! Model architectures
//!
//! An architecture decides how the variables of a container are registered
//! (renaming or splitting legacy layouts), what is fixed up once every
//! variable is known, and which graphs it can build.

mod language_model;
mod transformer;

pub use language_model::LanguageModelSpec;
pub use transformer::TransformerSpec;

use crate::graph::{Decoder, Encoder};
use crate::model::{Model, PendingModel};
use crate::storage::Variable;
use seqrt_common::Result;
use std::fmt;
use tracing::debug;

/// Per-architecture loading hooks and graph construction.
pub trait ModelSpec: Send + Sync + fmt::Debug {
    /// Name stamped in the container header.
    fn name(&self) -> &'static str;

    /// Newest variable layout revision this architecture reads.
    fn current_spec_revision(&self) -> u32;

    /// Called for every variable record, in container order.
    fn register_variable(&self, model: &mut PendingModel, name: String, variable: Variable) -> Result<()> {
        debug!(%name, shape = ?variable.shape(), dtype = %variable.dtype(), "registering variable");
        model.registry.insert(name, variable);
        Ok(())
    }

    /// Called for every alias record, after all variables.
    fn register_variable_alias(&self, model: &mut PendingModel, alias: String, target: String) -> Result<()> {
        debug!(%alias, %target, "registering alias");
        model.registry.register_alias(alias, target);
        Ok(())
    }

    /// Called once after registration. Implementations that override it must
    /// still run [`PendingModel::convert_variables`].
    fn finalize(&self, model: &mut PendingModel) -> Result<()> {
        model.convert_variables()
    }

    fn make_encoder<'m>(&self, model: &'m Model) -> Result<Box<dyn Encoder + 'm>>;

    fn make_decoder<'m>(&self, model: &'m Model) -> Result<Box<dyn Decoder + 'm>>;
}

/// Every architecture this build can load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Architecture {
    Transformer,
    LanguageModel,
}

impl Architecture {
    pub const ALL: [Architecture; 2] = [Self::Transformer, Self::LanguageModel];

    pub fn from_spec_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|arch| arch.name() == name)
    }

    fn spec(self) -> &'static dyn ModelSpec {
        match self {
            Self::Transformer => &TransformerSpec,
            Self::LanguageModel => &LanguageModelSpec,
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl ModelSpec for Architecture {
    fn name(&self) -> &'static str {
        self.spec().name()
    }

    fn current_spec_revision(&self) -> u32 {
        self.spec().current_spec_revision()
    }

    fn register_variable(&self, model: &mut PendingModel, name: String, variable: Variable) -> Result<()> {
        self.spec().register_variable(model, name, variable)
    }

    fn register_variable_alias(&self, model: &mut PendingModel, alias: String, target: String) -> Result<()> {
        self.spec().register_variable_alias(model, alias, target)
    }

    fn finalize(&self, model: &mut PendingModel) -> Result<()> {
        self.spec().finalize(model)
    }

    fn make_encoder<'m>(&self, model: &'m Model) -> Result<Box<dyn Encoder + 'm>> {
        self.spec().make_encoder(model)
    }

    fn make_decoder<'m>(&self, model: &'m Model) -> Result<Box<dyn Decoder + 'm>> {
        self.spec().make_decoder(model)
    }
}
