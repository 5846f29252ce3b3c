//! Configuration types and utilities
//!
//! Configuration is layered: built-in defaults, then an optional TOML or JSON
//! file, then `SEQRT_*` environment variables.

use crate::{ComputeType, Device, Result, SeqrtError};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

#[cfg(test)]
mod tests;

pub const ENV_MODEL_PATH: &str = "SEQRT_MODEL_PATH";
pub const ENV_DEVICE: &str = "SEQRT_DEVICE";
pub const ENV_DEVICE_INDEX: &str = "SEQRT_DEVICE_INDEX";
pub const ENV_COMPUTE_TYPE: &str = "SEQRT_COMPUTE_TYPE";

/// Main runtime configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeqrtConfig {
    pub model: ModelConfig,
    pub load: LoadConfig,
}

/// Where the model lives
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub path: Option<PathBuf>,
}

/// Device and precision a model is loaded with
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    pub device: Device,
    pub device_index: usize,
    pub compute_type: ComputeType,
}

impl SeqrtConfig {
    /// Defaults, overridden by `path` (if any), overridden by the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML or JSON file, chosen by extension (TOML when unknown).
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let config: Self = if is_json {
            serde_json::from_str(&content)
                .map_err(|e| SeqrtError::Config(format!("{}: {e}", path.display())))?
        } else {
            toml::from_str(&content)
                .map_err(|e| SeqrtError::Config(format!("{}: {e}", path.display())))?
        };
        tracing::debug!(path = %path.display(), "loaded configuration file");
        Ok(config)
    }

    /// Defaults overridden by the environment only.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(path) = env::var(ENV_MODEL_PATH) {
            self.model.path = Some(PathBuf::from(path));
        }
        if let Ok(device) = env::var(ENV_DEVICE) {
            self.load.device = device.parse()?;
        }
        if let Ok(index) = env::var(ENV_DEVICE_INDEX) {
            self.load.device_index = index.trim().parse().map_err(|_| {
                SeqrtError::Config(format!("{ENV_DEVICE_INDEX} must be an integer, got '{index}'"))
            })?;
        }
        if let Ok(compute_type) = env::var(ENV_COMPUTE_TYPE) {
            self.load.compute_type = compute_type.parse()?;
        }
        Ok(())
    }

    /// Overlay every non-default field of `other` onto `self`.
    pub fn merge_with(&mut self, other: Self) {
        let defaults = LoadConfig::default();
        if other.model.path.is_some() {
            self.model.path = other.model.path;
        }
        if other.load.device != defaults.device {
            self.load.device = other.load.device;
        }
        if other.load.device_index != defaults.device_index {
            self.load.device_index = other.load.device_index;
        }
        if other.load.compute_type != defaults.compute_type {
            self.load.compute_type = other.load.compute_type;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.load.device == Device::Cpu && self.load.device_index != 0 {
            return Err(SeqrtError::Config(format!(
                "cpu device index must be 0, got {}",
                self.load.device_index
            )));
        }
        if let Some(path) = &self.model.path
            && path.as_os_str().is_empty()
        {
            return Err(SeqrtError::Config("model path is empty".to_string()));
        }
        Ok(())
    }
}
