//! Error types for the seqrt runtime

use crate::{ComputeType, DataType, Device};
use thiserror::Error;

/// Which version field of a model container was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevisionKind {
    /// Layout version of the container itself.
    Binary,
    /// Variable layout revision of the model architecture.
    Spec,
}

impl std::fmt::Display for RevisionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Binary => f.write_str("binary version"),
            Self::Spec => f.write_str("spec revision"),
        }
    }
}

/// Errors raised while reading or querying a model.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid model format: {reason}")]
    Format { reason: String },

    #[error("unsupported {kind} {found} (maximum supported: {max})")]
    UnsupportedRevision { kind: RevisionKind, found: u32, max: u32 },

    #[error("variable '{name}' not found")]
    MissingVariable { name: String },

    #[error("attribute '{name}' has type {found}, expected {expected}")]
    AttributeType { name: String, expected: &'static str, found: String },

    #[error("model '{spec}' does not provide a {graph} graph")]
    GraphUnavailable { spec: &'static str, graph: &'static str },
}

/// Errors raised while binding a model to a device.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("compute type {requested} is not supported on {device}")]
    UnsupportedComputeType { requested: ComputeType, device: Device },

    #[error("{dtype} storage is not supported on {device}")]
    UnsupportedStorage { dtype: DataType, device: Device },

    #[error("device {device}:{index} is unavailable: {reason}")]
    DeviceUnavailable { device: Device, index: usize, reason: String },
}

/// Top-level error type.
#[derive(Debug, Error)]
pub enum SeqrtError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SeqrtError {
    pub fn format(reason: impl Into<String>) -> Self {
        Self::Model(ModelError::Format { reason: reason.into() })
    }

    pub fn missing_variable(name: impl Into<String>) -> Self {
        Self::Model(ModelError::MissingVariable { name: name.into() })
    }

    /// True for [`DeviceError::UnsupportedComputeType`] and
    /// [`DeviceError::UnsupportedStorage`].
    pub fn is_unsupported_compute_type(&self) -> bool {
        matches!(
            self,
            Self::Device(
                DeviceError::UnsupportedComputeType { .. } | DeviceError::UnsupportedStorage { .. }
            )
        )
    }
}

/// Result type used across the workspace.
pub type Result<T> = std::result::Result<T, SeqrtError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revision_error_message() {
        let err = SeqrtError::from(ModelError::UnsupportedRevision {
            kind: RevisionKind::Spec,
            found: 5,
            max: 4,
        });
        insta::assert_snapshot!(err, @"unsupported spec revision 5 (maximum supported: 4)");
    }

    #[test]
    fn missing_variable_message() {
        let err = SeqrtError::missing_variable("encoder/layer_0/ffn/weight");
        insta::assert_snapshot!(err, @"variable 'encoder/layer_0/ffn/weight' not found");
    }

    #[test]
    fn compute_type_message() {
        let err = SeqrtError::from(DeviceError::UnsupportedComputeType {
            requested: ComputeType::Int16,
            device: Device::Cuda,
        });
        insta::assert_snapshot!(err, @"compute type int16 is not supported on cuda");
        assert!(err.is_unsupported_compute_type());
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "model.bin");
        let err: SeqrtError = io.into();
        assert!(matches!(err, SeqrtError::Io(_)));
    }
}
