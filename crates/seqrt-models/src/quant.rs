//! Weight quantization and dequantization
//!
//! * int8: symmetric per-row, `scale[r] = 127 / max|row r|`
//! * int16: one global scale of [`INT16_SCALE`]
//! * float16: IEEE half precision
//!
//! Dequantization is always `q / scale`.

use crate::registry::ModelRegistry;
use crate::storage::{StorageData, Variable};
use half::f16;
use seqrt_common::{DataType, Result, SeqrtError};

/// Global scale of int16 weights.
pub const INT16_SCALE: f32 = 1000.0;

const INT8_MAX: f32 = 127.0;
const INT16_MAX: f32 = 32767.0;

/// True for variables that follow the requested compute type.
pub fn is_quantizable(name: &str) -> bool {
    name.ends_with("weight")
}

pub fn scale_name(weight_name: &str) -> String {
    format!("{weight_name}_scale")
}

/// Scales needed to turn a stored weight back into `f32`.
#[derive(Debug, Clone, PartialEq)]
pub enum Scales {
    /// Float storage, or integer storage read without scaling.
    None,
    Global(f32),
    PerRow(Vec<f32>),
}

impl Scales {
    fn for_row(&self, row: usize) -> f32 {
        match self {
            Self::None => 1.0,
            Self::Global(scale) => *scale,
            Self::PerRow(scales) => scales[row],
        }
    }

    fn into_variable(self, device_variable: &Variable) -> Result<Option<Variable>> {
        let mut variable = match self {
            Self::None => return Ok(None),
            Self::Global(scale) => Variable::from_f32(Vec::new(), vec![scale])?,
            Self::PerRow(scales) => Variable::from_f32(vec![scales.len()], scales)?,
        };
        variable.set_device(device_variable.device());
        Ok(Some(variable))
    }
}

/// Scale lookup for the weight `name`.
///
/// Returns the scales together with a flag telling whether they were saved in
/// the model (`true`) or are the int16 default (`false`). An int8 weight
/// without a saved scale is a format error.
pub fn get_scale(registry: &ModelRegistry, name: &str, weight: &Variable) -> Result<(Scales, bool)> {
    let dtype = weight.dtype();
    if !matches!(dtype, DataType::Int8 | DataType::Int16) {
        return Ok((Scales::None, false));
    }

    // Aliased weights share the scale of their target.
    let scale_name = scale_name(registry.resolve(name));
    let Some(saved) = registry.get_variable_if_exists(&scale_name) else {
        return match dtype {
            DataType::Int16 => Ok((Scales::Global(INT16_SCALE), false)),
            _ => Err(SeqrtError::format(format!("int8 weight '{name}' has no '{scale_name}'"))),
        };
    };

    let values = saved
        .as_f32()
        .ok_or_else(|| SeqrtError::format(format!("'{scale_name}' must be float32, got {}", saved.dtype())))?;
    let scales = match values.len() {
        1 => Scales::Global(values[0]),
        n if n == weight.rows() && dtype == DataType::Int8 => Scales::PerRow(values.to_vec()),
        n => {
            return Err(SeqrtError::format(format!(
                "'{scale_name}' has {n} values for a weight with {} rows",
                weight.rows()
            )));
        }
    };
    Ok((scales, true))
}

/// Decodes `weight` to `f32`, dividing integer values by their scale.
pub fn dequantize(weight: &Variable, scales: &Scales) -> Vec<f32> {
    let mut out = vec![0.0; weight.numel()];
    dequantize_into(weight, scales, &mut out);
    out
}

/// [`dequantize`] into a caller-provided buffer of `weight.numel()` elements.
pub fn dequantize_into(weight: &Variable, scales: &Scales, out: &mut [f32]) {
    let rows = weight.rows().max(1);
    let cols = weight.numel() / rows;
    match weight.data() {
        StorageData::F32(values) => out.copy_from_slice(values),
        StorageData::F16(values) => {
            for (o, v) in out.iter_mut().zip(values) {
                *o = v.to_f32();
            }
        }
        StorageData::I8(values) => dequantize_rows(values, cols, scales, out),
        StorageData::I16(values) => dequantize_rows(values, cols, scales, out),
        StorageData::I32(values) => {
            for (o, &v) in out.iter_mut().zip(values) {
                *o = v as f32 / scales.for_row(0);
            }
        }
    }
}

fn dequantize_rows<Q: Copy + Into<f32>>(values: &[Q], cols: usize, scales: &Scales, out: &mut [f32]) {
    if cols == 0 {
        return;
    }
    for (row, (q, o)) in values.chunks(cols).zip(out.chunks_mut(cols)).enumerate() {
        let scale = scales.for_row(row);
        for (o, &q) in o.iter_mut().zip(q) {
            *o = q.into() / scale;
        }
    }
}

/// Symmetric per-row int8 quantization of a `rows x cols` matrix.
pub fn quantize_int8(values: &[f32], rows: usize) -> (Vec<i8>, Vec<f32>) {
    let rows = rows.max(1);
    let cols = values.len() / rows;
    let mut quantized = Vec::with_capacity(values.len());
    let mut scales = Vec::with_capacity(rows);
    for row in values.chunks(cols.max(1)).take(rows) {
        let amax = row.iter().fold(0.0f32, |m, v| m.max(v.abs()));
        let scale = if amax == 0.0 { 1.0 } else { INT8_MAX / amax };
        quantized.extend(row.iter().map(|v| (v * scale).round().clamp(-INT8_MAX, INT8_MAX) as i8));
        scales.push(scale);
    }
    scales.resize(rows, 1.0);
    (quantized, scales)
}

/// int16 quantization with the global [`INT16_SCALE`].
pub fn quantize_int16(values: &[f32]) -> Vec<i16> {
    values
        .iter()
        .map(|v| (v * INT16_SCALE).round().clamp(-INT16_MAX, INT16_MAX) as i16)
        .collect()
}

/// Re-encodes `values` (the dequantized content of `like`) as `dtype`.
///
/// Returns the new variable and, for integer types, its scale variable.
pub fn quantize(like: &Variable, values: &[f32], dtype: DataType) -> Result<(Variable, Option<Variable>)> {
    let (data, scales) = match dtype {
        DataType::Float32 => (StorageData::F32(values.to_vec()), Scales::None),
        DataType::Float16 => (
            StorageData::F16(values.iter().map(|&v| f16::from_f32(v)).collect()),
            Scales::None,
        ),
        DataType::Int8 => {
            let (q, scales) = quantize_int8(values, like.rows());
            (StorageData::I8(q), Scales::PerRow(scales))
        }
        DataType::Int16 => (StorageData::I16(quantize_int16(values)), Scales::Global(INT16_SCALE)),
        DataType::Int32 => {
            return Err(SeqrtError::InvalidArgument("weights cannot be converted to int32".into()));
        }
    };
    let variable = like.with_data(data)?;
    let scale = scales.into_variable(like)?;
    Ok((variable, scale))
}
