//! Shared fixtures for the model integration tests.
//!
//! Fixture models are written with [`ContainerBuilder`] into temporary
//! directories, and graph results are checked against a plain scalar
//! rendition of the layer math.

#![allow(dead_code)]

use seqrt_models::{ContainerBuilder, MODEL_FILE, StorageData, Variable, write_container};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const HIDDEN: usize = 4;

pub const ENCODER_LAYERS: [([f32; HIDDEN], [f32; HIDDEN]); 2] = [
    ([1.0, -1.0, 0.5, 2.0], [0.0, 0.5, -0.25, 0.1]),
    ([0.5, 0.75, -0.5, 1.5], [0.2, 0.0, 0.0, -0.3]),
];

pub const DECODER_LAYERS: [([f32; HIDDEN], [f32; HIDDEN]); 1] = [([1.0, 0.5, -2.0, 0.25], [0.1, 0.1, 0.1, 0.1])];

pub const EMBEDDINGS: [f32; HIDDEN] = [2.0, 1.0, 0.5, -1.0];
pub const PROJECTION_BIAS: [f32; HIDDEN] = [0.0, -0.5, 0.25, 0.0];

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().with_max_level(tracing::Level::DEBUG).try_init();
}

pub fn vector(values: &[f32]) -> Variable {
    Variable::from_f32(vec![values.len()], values.to_vec()).unwrap()
}

pub fn int8_flag(value: i8) -> Variable {
    Variable::scalar(StorageData::I8(vec![value])).unwrap()
}

/// Revision 3 transformer: two encoder layers, one decoder layer and an
/// output projection shared with the embeddings.
pub fn transformer() -> ContainerBuilder {
    let mut builder = ContainerBuilder::new("TransformerSpec", 3);
    for (prefix, layers) in [("encoder", &ENCODER_LAYERS[..]), ("decoder", &DECODER_LAYERS[..])] {
        for (index, (weight, bias)) in layers.iter().enumerate() {
            builder = builder
                .variable(format!("{prefix}/layer_{index}/ffn/weight"), vector(weight))
                .variable(format!("{prefix}/layer_{index}/ffn/bias"), vector(bias));
        }
    }
    builder
        .variable("decoder/embeddings/weight", vector(&EMBEDDINGS))
        .variable("decoder/projection/bias", vector(&PROJECTION_BIAS))
}

/// Decoder-only model with the transformer's decoder weights.
pub fn language_model() -> ContainerBuilder {
    let (weight, bias) = &DECODER_LAYERS[0];
    ContainerBuilder::new("TransformerDecoderSpec", 1)
        .variable("decoder/layer_0/ffn/weight", vector(weight))
        .variable("decoder/layer_0/ffn/bias", vector(bias))
        .variable("decoder/projection/weight", vector(&EMBEDDINGS))
        .variable("decoder/projection/bias", vector(&PROJECTION_BIAS))
}

/// Writes `builder` as `model.bin` into a fresh temporary directory.
pub fn model_dir(builder: &ContainerBuilder) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_container(&dir.path().join(MODEL_FILE), builder).unwrap();
    dir
}

pub fn model_file(dir: &Path) -> PathBuf {
    dir.join(MODEL_FILE)
}

/// Scalar rendition of one layer stack.
pub fn reference_layers(layers: &[([f32; HIDDEN], [f32; HIDDEN])], with_residual: bool, x: &mut [f32]) {
    for (weight, bias) in layers {
        for i in 0..x.len() {
            let h = (x[i] * weight[i] + bias[i]).max(0.0);
            x[i] = if with_residual { x[i] + h } else { h };
        }
    }
}

pub fn reference_encode(input: &[f32], with_residual: bool) -> Vec<f32> {
    let mut x = input.to_vec();
    reference_layers(&ENCODER_LAYERS, with_residual, &mut x);
    x
}

/// Runs the reference decoder over `inputs`, returning every step's output.
pub fn reference_decode(inputs: &[[f32; HIDDEN]]) -> Vec<Vec<f32>> {
    let mut state = vec![0.0f32; HIDDEN];
    inputs
        .iter()
        .map(|input| {
            let mut x: Vec<f32> = input.iter().zip(&state).map(|(a, b)| a + b).collect();
            reference_layers(&DECODER_LAYERS, true, &mut x);
            state = (0..HIDDEN).map(|i| x[i] * EMBEDDINGS[i] + PROJECTION_BIAS[i]).collect();
            state.clone()
        })
        .collect()
}

#[track_caller]
pub fn assert_close(actual: &[f32], expected: &[f32], tolerance: f32) {
    assert_eq!(actual.len(), expected.len(), "length mismatch");
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!((a - e).abs() <= tolerance, "index {i}: {a} vs {e} (tolerance {tolerance})");
    }
}
