//! Typed variable storage

use bytemuck::Pod;
use half::f16;
use seqrt_common::{DataType, Device, Result, SeqrtError};

/// Owned element buffer of a [`Variable`].
#[derive(Debug, Clone, PartialEq)]
pub enum StorageData {
    F32(Vec<f32>),
    F16(Vec<f16>),
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
}

fn decode<T: Pod, U>(bytes: &[u8], from_le: impl Fn(T) -> U) -> Vec<U> {
    bytemuck::pod_collect_to_vec::<u8, T>(bytes).into_iter().map(from_le).collect()
}

impl StorageData {
    pub fn dtype(&self) -> DataType {
        match self {
            Self::F32(_) => DataType::Float32,
            Self::F16(_) => DataType::Float16,
            Self::I8(_) => DataType::Int8,
            Self::I16(_) => DataType::Int16,
            Self::I32(_) => DataType::Int32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::F32(v) => v.len(),
            Self::F16(v) => v.len(),
            Self::I8(v) => v.len(),
            Self::I16(v) => v.len(),
            Self::I32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decodes little-endian bytes. `bytes.len()` must be a multiple of the
    /// element size.
    pub fn from_le_bytes(dtype: DataType, bytes: &[u8]) -> Result<Self> {
        if bytes.len() % dtype.size_in_bytes() != 0 {
            return Err(SeqrtError::format(format!(
                "{} bytes is not a whole number of {dtype} elements",
                bytes.len()
            )));
        }
        Ok(match dtype {
            DataType::Float32 => Self::F32(decode(bytes, |b: u32| f32::from_bits(u32::from_le(b)))),
            DataType::Float16 => Self::F16(decode(bytes, |b: u16| f16::from_bits(u16::from_le(b)))),
            DataType::Int8 => Self::I8(bytemuck::cast_slice::<u8, i8>(bytes).to_vec()),
            DataType::Int16 => Self::I16(decode(bytes, i16::from_le)),
            DataType::Int32 => Self::I32(decode(bytes, i32::from_le)),
        })
    }

    pub fn to_le_bytes(&self) -> Vec<u8> {
        match self {
            Self::F32(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            Self::F16(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            Self::I8(v) => bytemuck::cast_slice::<i8, u8>(v).to_vec(),
            Self::I16(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
            Self::I32(v) => v.iter().flat_map(|x| x.to_le_bytes()).collect(),
        }
    }

    fn slice(&self, start: usize, len: usize) -> Self {
        let range = start..start + len;
        match self {
            Self::F32(v) => Self::F32(v[range].to_vec()),
            Self::F16(v) => Self::F16(v[range].to_vec()),
            Self::I8(v) => Self::I8(v[range].to_vec()),
            Self::I16(v) => Self::I16(v[range].to_vec()),
            Self::I32(v) => Self::I32(v[range].to_vec()),
        }
    }

    /// Plain numeric cast of every element to `f32`, without any scale.
    pub fn to_f32_vec(&self) -> Vec<f32> {
        match self {
            Self::F32(v) => v.clone(),
            Self::F16(v) => v.iter().map(|x| x.to_f32()).collect(),
            Self::I8(v) => v.iter().map(|&x| f32::from(x)).collect(),
            Self::I16(v) => v.iter().map(|&x| f32::from(x)).collect(),
            Self::I32(v) => v.iter().map(|&x| x as f32).collect(),
        }
    }
}

/// A named tensor held by the model registry.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    shape: Vec<usize>,
    data: StorageData,
    device: Device,
}

impl Variable {
    /// Creates a CPU variable, checking that `shape` matches the element count.
    pub fn new(shape: Vec<usize>, data: StorageData) -> Result<Self> {
        let numel: usize = shape.iter().product();
        if numel != data.len() {
            return Err(SeqrtError::format(format!(
                "shape {shape:?} holds {numel} elements but {} were given",
                data.len()
            )));
        }
        Ok(Self { shape, data, device: Device::Cpu })
    }

    /// Rank-0 variable holding one value.
    pub fn scalar(data: StorageData) -> Result<Self> {
        Self::new(Vec::new(), data)
    }

    pub fn from_f32(shape: Vec<usize>, values: Vec<f32>) -> Result<Self> {
        Self::new(shape, StorageData::F32(values))
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn numel(&self) -> usize {
        self.data.len()
    }

    /// Leading dimension, or 1 for scalars and vectors.
    pub fn rows(&self) -> usize {
        if self.shape.len() >= 2 { self.shape[0] } else { 1 }
    }

    pub fn dtype(&self) -> DataType {
        self.data.dtype()
    }

    pub fn device(&self) -> Device {
        self.device
    }

    pub fn data(&self) -> &StorageData {
        &self.data
    }

    pub fn as_f32(&self) -> Option<&[f32]> {
        match &self.data {
            StorageData::F32(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f16(&self) -> Option<&[f16]> {
        match &self.data {
            StorageData::F16(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i8(&self) -> Option<&[i8]> {
        match &self.data {
            StorageData::I8(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i16(&self) -> Option<&[i16]> {
        match &self.data {
            StorageData::I16(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<&[i32]> {
        match &self.data {
            StorageData::I32(v) => Some(v),
            _ => None,
        }
    }

    pub(crate) fn with_data(&self, data: StorageData) -> Result<Self> {
        let mut variable = Self::new(self.shape.clone(), data)?;
        variable.device = self.device;
        Ok(variable)
    }

    pub(crate) fn set_device(&mut self, device: Device) {
        self.device = device;
    }

    /// Splits along the leading dimension into one variable per row.
    pub(crate) fn split_rows(&self) -> Result<Vec<Variable>> {
        if self.rank() < 2 {
            return Err(SeqrtError::format(format!(
                "cannot split a rank {} variable into rows",
                self.rank()
            )));
        }
        let rows = self.shape[0];
        let row_shape = self.shape[1..].to_vec();
        let cols: usize = row_shape.iter().product();
        (0..rows)
            .map(|row| {
                let mut part = Self::new(row_shape.clone(), self.data.slice(row * cols, cols))?;
                part.device = self.device;
                Ok(part)
            })
            .collect()
    }
}
