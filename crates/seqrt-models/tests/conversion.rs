//! Compute type resolution and weight conversion at load time.

mod helpers;

use half::f16;
use helpers::*;
use seqrt_common::{ComputeType, DataType, Device, ModelError, SeqrtError};
use seqrt_models::{ContainerBuilder, Model, StorageData, Variable};

fn load(builder: &ContainerBuilder, compute_type: ComputeType) -> seqrt_common::Result<std::sync::Arc<Model>> {
    let dir = model_dir(builder);
    Model::load(dir.path(), Device::Cpu, 0, compute_type)
}

#[test]
fn int8_quantizes_weights_only() {
    init_tracing();
    let model = load(&transformer(), ComputeType::Int8).unwrap();

    let weight = model.get_variable("encoder/layer_0/ffn/weight").unwrap();
    assert_eq!(weight.dtype(), DataType::Int8);
    // max |w| = 2 -> scale 63.5
    assert_eq!(weight.as_i8().unwrap(), &[64, -64, 32, 127]);
    let scale = model.get_variable("encoder/layer_0/ffn/weight_scale").unwrap();
    assert_eq!(scale.shape(), &[1]);
    assert_eq!(scale.as_f32().unwrap(), &[63.5]);

    let bias = model.get_variable("encoder/layer_0/ffn/bias").unwrap();
    assert_eq!(bias.dtype(), DataType::Float32);
}

#[test]
fn auto_selects_int8_on_cpu() {
    let model = load(&transformer(), ComputeType::Auto).unwrap();
    assert_eq!(model.requested_compute_type(), ComputeType::Auto);
    assert_eq!(model.compute_type(), ComputeType::Int8);
    assert_eq!(model.get_variable("decoder/embeddings/weight").unwrap().dtype(), DataType::Int8);
}

#[test]
fn int16_uses_global_scale() {
    let model = load(&transformer(), ComputeType::Int16).unwrap();
    let weight = model.get_variable("encoder/layer_0/ffn/weight").unwrap();
    assert_eq!(weight.as_i16().unwrap(), &[1000, -1000, 500, 2000]);
    let scale = model.get_variable("encoder/layer_0/ffn/weight_scale").unwrap();
    assert_eq!(scale.rank(), 0);
    assert_eq!(scale.as_f32().unwrap(), &[1000.0]);
}

#[test]
fn float16_falls_back_to_float32_on_cpu() {
    init_tracing();
    let model = load(&transformer(), ComputeType::Float16).unwrap();

    assert_eq!(model.compute_type(), ComputeType::Float32);
    let fallback = model.compute_type_fallback().unwrap();
    assert_eq!(fallback.requested, ComputeType::Float16);
    assert_eq!(fallback.effective, ComputeType::Float32);
    assert_eq!(fallback.device, Device::Cpu);
    for (_, variable) in model.registry().variables() {
        assert_ne!(variable.dtype(), DataType::Float16);
    }
}

#[test]
fn saved_float16_becomes_float32() {
    let halves = |values: &[f32]| {
        Variable::new(vec![values.len()], StorageData::F16(values.iter().map(|&v| f16::from_f32(v)).collect()))
            .unwrap()
    };
    let builder = ContainerBuilder::new("TransformerSpec", 3)
        .variable("encoder/layer_0/ffn/weight", halves(&[1.0, -0.5, 0.25, 2.0]))
        .variable("encoder/layer_0/ffn/bias", halves(&[0.0, 0.5, 1.5, -1.0]));
    let model = load(&builder, ComputeType::Default).unwrap();

    // The compute type itself was honored; each float16 variable is recorded.
    assert!(model.compute_type_fallback().is_none());
    let mut converted: Vec<&str> = model.storage_fallbacks().iter().map(|f| f.name.as_str()).collect();
    converted.sort_unstable();
    assert_eq!(converted, ["encoder/layer_0/ffn/bias", "encoder/layer_0/ffn/weight"]);
    assert!(model.storage_fallbacks().iter().all(|f| f.saved == DataType::Float16 && f.device == Device::Cpu));

    let weight = model.get_variable("encoder/layer_0/ffn/weight").unwrap();
    assert_eq!(weight.as_f32().unwrap(), &[1.0, -0.5, 0.25, 2.0]);
    let bias = model.get_variable("encoder/layer_0/ffn/bias").unwrap();
    assert_eq!(bias.as_f32().unwrap(), &[0.0, 0.5, 1.5, -1.0]);
}

#[test]
fn float32_models_record_no_storage_fallback() {
    let model = load(&transformer(), ComputeType::Default).unwrap();
    assert!(model.storage_fallbacks().is_empty());
}

#[test]
fn saved_int8_is_dequantized_for_float32() {
    let builder = ContainerBuilder::new("TransformerSpec", 3)
        .variable(
            "encoder/layer_0/ffn/weight",
            Variable::new(vec![2, 2], StorageData::I8(vec![127, -64, 0, 127])).unwrap(),
        )
        .variable("encoder/layer_0/ffn/weight_scale", Variable::from_f32(vec![2], vec![127.0, 63.5]).unwrap());
    let model = load(&builder, ComputeType::Float32).unwrap();

    let weight = model.get_variable("encoder/layer_0/ffn/weight").unwrap();
    assert_eq!(weight.dtype(), DataType::Float32);
    assert_close(weight.as_f32().unwrap(), &[1.0, -64.0 / 127.0, 0.0, 2.0], 1e-6);
    assert!(!model.registry().contains("encoder/layer_0/ffn/weight_scale"));
}

#[test]
fn default_keeps_saved_integer_weights() {
    let builder = ContainerBuilder::new("TransformerSpec", 3)
        .variable("encoder/layer_0/ffn/weight", Variable::new(vec![2], StorageData::I16(vec![1500, -20])).unwrap());
    let model = load(&builder, ComputeType::Default).unwrap();

    let weight = model.get_variable("encoder/layer_0/ffn/weight").unwrap();
    assert_eq!(weight.as_i16().unwrap(), &[1500, -20]);
    assert_eq!(model.get_attribute_with_default("encoder/layer_0/ffn/weight_scale", 0.0f32).unwrap(), 1000.0);
}

#[test]
fn int8_weight_without_scale_fails_the_load() {
    let builder = transformer()
        .variable("decoder/extra/weight", Variable::new(vec![2], StorageData::I8(vec![1, -1])).unwrap());
    let err = load(&builder, ComputeType::Float32).unwrap_err();
    assert!(matches!(err, SeqrtError::Model(ModelError::Format { .. })));
}

#[test]
fn requantizing_keeps_values_within_a_step() {
    let model = load(&transformer(), ComputeType::Int8).unwrap();
    let reloaded = model.get_variable("decoder/embeddings/weight").unwrap();
    let scale = model.get_attribute_with_default("decoder/embeddings/weight_scale", 0.0f32).unwrap();
    let restored: Vec<f32> = reloaded.as_i8().unwrap().iter().map(|&q| f32::from(q) / scale).collect();
    assert_close(&restored, &EMBEDDINGS, 0.5 / scale + 1e-6);
}
