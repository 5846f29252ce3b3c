//! Model loading

use crate::arch::{Architecture, ModelSpec};
use crate::device::DeviceContext;
use crate::format::{self, CURRENT_BINARY_VERSION};
use crate::model::{Model, PendingModel};
use crate::vocab::Vocabularies;
use memmap2::Mmap;
use seqrt_common::{ComputeType, Device, LoadConfig, ModelError, Result, RevisionKind, SeqrtError};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Container file name inside a model directory.
pub const MODEL_FILE: &str = "model.bin";

/// True when `path` is a model directory.
pub fn contains_model(path: impl AsRef<Path>) -> bool {
    path.as_ref().join(MODEL_FILE).is_file()
}

/// Loads a container into an immutable, shareable [`Model`].
#[derive(Debug, Clone, Copy)]
pub struct ModelLoader {
    device: Device,
    device_index: usize,
    compute_type: ComputeType,
}

impl ModelLoader {
    pub fn new(device: Device) -> Self {
        Self { device, device_index: 0, compute_type: ComputeType::Default }
    }

    pub fn from_config(config: &LoadConfig) -> Self {
        Self { device: config.device, device_index: config.device_index, compute_type: config.compute_type }
    }

    pub fn device_index(mut self, index: usize) -> Self {
        self.device_index = index;
        self
    }

    pub fn compute_type(mut self, compute_type: ComputeType) -> Self {
        self.compute_type = compute_type;
        self
    }

    /// Loads the container at `path`, or `path/model.bin` when `path` is a
    /// directory.
    ///
    /// Either the whole model is published or an error is returned; nothing
    /// of a failed load is kept.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Arc<Model>> {
        let path = path.as_ref();
        info!(
            path = %path.display(),
            device = %self.device,
            device_index = self.device_index,
            compute_type = %self.compute_type,
            "loading model"
        );

        let (model_file, model_dir) = locate(path);

        let file = File::open(&model_file)?;
        // SAFETY: the mapping is read-only and dropped before this function
        // returns; every variable is copied out of it while it is alive.
        let mmap = unsafe { Mmap::map(&file)? };
        let container = format::parse_container(&mmap)?;
        let header = &container.header;

        let architecture = Architecture::from_spec_name(&header.spec_name)
            .ok_or_else(|| SeqrtError::format(format!("unknown model spec '{}'", header.spec_name)))?;
        let max_revision = architecture.current_spec_revision().min(CURRENT_BINARY_VERSION);
        if header.spec_revision > max_revision {
            return Err(ModelError::UnsupportedRevision {
                kind: RevisionKind::Spec,
                found: header.spec_revision,
                max: max_revision,
            }
            .into());
        }
        debug!(
            binary_version = header.binary_version,
            spec = %architecture,
            spec_revision = header.spec_revision,
            variables = container.variables.len(),
            aliases = container.aliases.len(),
            "read container header"
        );

        let mut pending = PendingModel::new(
            architecture,
            header.binary_version,
            header.spec_revision,
            DeviceContext::default(),
        );
        // Compute type first: one the device cannot realize is reported
        // before the device's availability.
        pending.set_compute_type(self.compute_type)?;
        pending.set_device(self.device, self.device_index)?;
        let device = pending.context().device();
        for raw in &container.variables {
            let mut variable = raw.to_variable()?;
            variable.set_device(device);
            architecture.register_variable(&mut pending, raw.name.clone(), variable)?;
        }
        for (alias, target) in &container.aliases {
            architecture.register_variable_alias(&mut pending, alias.clone(), target.clone())?;
        }
        architecture.finalize(&mut pending)?;
        drop(container);
        drop(mmap);

        let vocabularies = Vocabularies::load(&model_dir)?;
        let model = pending.publish(vocabularies);
        info!(
            spec = model.spec_name(),
            variables = model.registry().len(),
            compute_type = %model.compute_type(),
            "model loaded"
        );
        Ok(Arc::new(model))
    }
}

/// Container file and the directory its vocabularies are read from.
fn locate(path: &Path) -> (PathBuf, PathBuf) {
    if path.is_dir() {
        return (path.join(MODEL_FILE), path.to_path_buf());
    }
    let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    (path.to_path_buf(), dir)
}

impl Model {
    /// Loads `path` on `(device, device_index)` with `compute_type`.
    pub fn load(
        path: impl AsRef<Path>,
        device: Device,
        device_index: usize,
        compute_type: ComputeType,
    ) -> Result<Arc<Model>> {
        ModelLoader::new(device).device_index(device_index).compute_type(compute_type).load(path)
    }

    /// [`Model::load`] with the device and compute type given as strings,
    /// e.g. `Model::load_from_tokens(path, "cpu", 0, "int8")`.
    pub fn load_from_tokens(
        path: impl AsRef<Path>,
        device: &str,
        device_index: usize,
        compute_type: &str,
    ) -> Result<Arc<Model>> {
        Self::load(path, device.parse()?, device_index, compute_type.parse()?)
    }
}
