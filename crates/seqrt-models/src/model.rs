//! Loaded models: the pending state built by the loader and the published,
//! immutable [`Model`]

use crate::arch::{Architecture, ModelSpec};
use crate::device::{ComputeTypeFallback, DeviceContext, ScopedDeviceSetter, StorageFallback};
use crate::graph::{Decoder, Encoder};
use crate::registry::{AttributeValue, ModelRegistry};
use crate::storage::Variable;
use crate::vocab::{Vocabularies, Vocabulary, VocabularyMap};
use seqrt_common::{ComputeType, Device, Result};

/// A model under construction.
///
/// Only the loader creates one, and it becomes a [`Model`] once every hook,
/// finalization and conversion has succeeded.
#[derive(Debug)]
pub struct PendingModel {
    pub(crate) registry: ModelRegistry,
    pub(crate) context: DeviceContext,
    pub(crate) storage_fallbacks: Vec<StorageFallback>,
    architecture: Architecture,
    binary_version: u32,
    spec_revision: u32,
}

impl PendingModel {
    pub(crate) fn new(
        architecture: Architecture,
        binary_version: u32,
        spec_revision: u32,
        context: DeviceContext,
    ) -> Self {
        Self {
            registry: ModelRegistry::new(),
            context,
            storage_fallbacks: Vec::new(),
            architecture,
            binary_version,
            spec_revision,
        }
    }

    pub fn architecture(&self) -> Architecture {
        self.architecture
    }

    pub fn binary_version(&self) -> u32 {
        self.binary_version
    }

    /// Revision the container was saved with.
    pub fn spec_revision(&self) -> u32 {
        self.spec_revision
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn context(&self) -> &DeviceContext {
        &self.context
    }

    pub fn storage_fallbacks(&self) -> &[StorageFallback] {
        &self.storage_fallbacks
    }

    /// Rebinds to `(device, index)`, keeping the requested compute type.
    pub fn set_device(&mut self, device: Device, index: usize) -> Result<()> {
        if device == self.context.device() && index == self.context.device_index() {
            return Ok(());
        }
        self.context = DeviceContext::resolve(device, index, self.context.requested_compute_type())?;
        for variable in self.registry.variables_mut() {
            variable.set_device(device);
        }
        Ok(())
    }

    /// Requests a different compute type on the current device.
    pub fn set_compute_type(&mut self, compute_type: ComputeType) -> Result<()> {
        if compute_type == self.context.requested_compute_type() {
            return Ok(());
        }
        self.context =
            DeviceContext::resolve(self.context.device(), self.context.device_index(), compute_type)?;
        Ok(())
    }

    pub(crate) fn publish(self, vocabularies: Vocabularies) -> Model {
        Model {
            registry: self.registry,
            context: self.context,
            storage_fallbacks: self.storage_fallbacks,
            vocabularies,
            architecture: self.architecture,
            binary_version: self.binary_version,
            spec_revision: self.spec_revision,
        }
    }
}

/// An immutable loaded model, shared through `Arc<Model>`.
///
/// Graphs created from it borrow the weights, so any number of them can run
/// concurrently without copying.
#[derive(Debug)]
pub struct Model {
    registry: ModelRegistry,
    context: DeviceContext,
    storage_fallbacks: Vec<StorageFallback>,
    vocabularies: Vocabularies,
    architecture: Architecture,
    binary_version: u32,
    spec_revision: u32,
}

impl Model {
    pub fn architecture(&self) -> Architecture {
        self.architecture
    }

    pub fn spec_name(&self) -> &'static str {
        self.architecture.name()
    }

    /// Revision the container was saved with (before migration).
    pub fn spec_revision(&self) -> u32 {
        self.spec_revision
    }

    pub fn current_spec_revision(&self) -> u32 {
        self.architecture.current_spec_revision()
    }

    pub fn binary_version(&self) -> u32 {
        self.binary_version
    }

    pub fn device(&self) -> Device {
        self.context.device()
    }

    pub fn device_index(&self) -> usize {
        self.context.device_index()
    }

    /// Effective compute type.
    pub fn compute_type(&self) -> ComputeType {
        self.context.compute_type()
    }

    pub fn requested_compute_type(&self) -> ComputeType {
        self.context.requested_compute_type()
    }

    /// Set when the requested compute type could not be realized.
    pub fn compute_type_fallback(&self) -> Option<ComputeTypeFallback> {
        self.context.fallback()
    }

    /// Saved variables converted to float32 under the `Default` compute type
    /// because the device cannot store their saved type.
    pub fn storage_fallbacks(&self) -> &[StorageFallback] {
        &self.storage_fallbacks
    }

    /// Activates this model's device on the calling thread until the guard is
    /// dropped.
    pub fn get_scoped_device_setter(&self) -> ScopedDeviceSetter {
        ScopedDeviceSetter::new(self.device(), self.device_index())
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn get_variable_if_exists(&self, name: &str) -> Option<&Variable> {
        self.registry.get_variable_if_exists(name)
    }

    pub fn get_variable(&self, name: &str) -> Result<&Variable> {
        self.registry.get_variable(name)
    }

    pub fn get_attribute_with_default<T: AttributeValue>(&self, name: &str, default: T) -> Result<T> {
        self.registry.get_attribute_with_default(name, default)
    }

    pub fn get_flag_with_default(&self, name: &str, default: bool) -> Result<bool> {
        self.registry.get_flag_with_default(name, default)
    }

    pub fn source_vocabulary(&self) -> &Vocabulary {
        &self.vocabularies.source
    }

    pub fn target_vocabulary(&self) -> &Vocabulary {
        &self.vocabularies.target
    }

    pub fn vocabulary_map(&self) -> Option<&VocabularyMap> {
        self.vocabularies.map.as_ref()
    }

    /// New encoder graph borrowing this model.
    pub fn make_encoder(&self) -> Result<Box<dyn Encoder + '_>> {
        self.architecture.make_encoder(self)
    }

    /// New decoder graph borrowing this model.
    pub fn make_decoder(&self) -> Result<Box<dyn Decoder + '_>> {
        self.architecture.make_decoder(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageData;

    fn pending() -> PendingModel {
        let mut pending =
            PendingModel::new(Architecture::Transformer, 4, 3, DeviceContext::default());
        pending.registry.insert("w/weight", Variable::from_f32(vec![1], vec![1.0]).unwrap());
        pending
    }

    #[test]
    fn model_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Model>();
    }

    #[test]
    fn set_compute_type_is_idempotent() {
        let mut pending = pending();
        pending.set_compute_type(ComputeType::Int8).unwrap();
        let context = *pending.context();
        pending.set_compute_type(ComputeType::Int8).unwrap();
        assert_eq!(*pending.context(), context);
        assert_eq!(pending.context().compute_type(), ComputeType::Int8);
    }

    #[test]
    fn set_device_keeps_context_on_failure() {
        let mut pending = pending();
        pending.set_device(Device::Cpu, 0).unwrap();
        assert!(pending.set_device(Device::Cuda, 0).is_err());
        assert_eq!(pending.context().device(), Device::Cpu);
        assert_eq!(pending.registry().get_variable("w/weight").unwrap().device(), Device::Cpu);
    }

    #[test]
    fn published_model_exposes_registry() {
        let mut pending = pending();
        pending.registry.insert("flag", Variable::scalar(StorageData::I8(vec![1])).unwrap());
        let model = pending.publish(Vocabularies::default());
        assert!(model.get_flag_with_default("flag", false).unwrap());
        assert_eq!(model.spec_name(), "TransformerSpec");
        assert_eq!(model.current_spec_revision(), 3);
        assert!(model.source_vocabulary().is_empty());
        assert!(model.vocabulary_map().is_none());
    }
}
