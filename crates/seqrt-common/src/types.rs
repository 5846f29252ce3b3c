//! Device, precision and storage type enums

use crate::{Result, SeqrtError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Device kind a model is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    #[default]
    Cpu,
    Cuda,
}

impl Device {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Cuda => "cuda",
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Device {
    type Err = SeqrtError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            "cuda" => Ok(Self::Cuda),
            other => Err(SeqrtError::InvalidArgument(format!("unknown device '{other}'"))),
        }
    }
}

/// Numeric precision requested for variable storage and arithmetic.
///
/// `Default` keeps whatever type each weight was saved with when the device
/// can realize it; `Auto` picks the fastest type the device supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComputeType {
    #[default]
    Default,
    Auto,
    #[serde(alias = "float")]
    Float32,
    Float16,
    Int8,
    Int16,
}

impl ComputeType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Auto => "auto",
            Self::Float32 => "float32",
            Self::Float16 => "float16",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
        }
    }

    /// Storage type of quantizable weights under this compute type.
    ///
    /// Returns `None` for `Default` and `Auto`, which depend on the saved
    /// type and the device.
    pub const fn weight_dtype(self) -> Option<DataType> {
        match self {
            Self::Float32 => Some(DataType::Float32),
            Self::Float16 => Some(DataType::Float16),
            Self::Int8 => Some(DataType::Int8),
            Self::Int16 => Some(DataType::Int16),
            Self::Default | Self::Auto => None,
        }
    }
}

impl fmt::Display for ComputeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComputeType {
    type Err = SeqrtError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(Self::Default),
            "auto" => Ok(Self::Auto),
            "float" | "float32" => Ok(Self::Float32),
            "float16" => Ok(Self::Float16),
            "int8" => Ok(Self::Int8),
            "int16" => Ok(Self::Int16),
            other => Err(SeqrtError::InvalidArgument(format!("unknown compute type '{other}'"))),
        }
    }
}

/// Element type of a stored variable.
///
/// Discriminants are the on-disk dtype ids of the model container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum DataType {
    Float32 = 0,
    Int8 = 1,
    Int16 = 2,
    Int32 = 3,
    Float16 = 4,
}

impl DataType {
    pub const fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(Self::Float32),
            1 => Some(Self::Int8),
            2 => Some(Self::Int16),
            3 => Some(Self::Int32),
            4 => Some(Self::Float16),
            _ => None,
        }
    }

    pub const fn id(self) -> u8 {
        self as u8
    }

    pub const fn size_in_bytes(self) -> usize {
        match self {
            Self::Float32 | Self::Int32 => 4,
            Self::Float16 | Self::Int16 => 2,
            Self::Int8 => 1,
        }
    }

    pub const fn is_float(self) -> bool {
        matches!(self, Self::Float32 | Self::Float16)
    }

    pub const fn is_integer(self) -> bool {
        !self.is_float()
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Float32 => "float32",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Float16 => "float16",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
