//! Configuration tests

use super::*;
use serial_test::serial;
use std::io::Write;
use tempfile::NamedTempFile;

const ENV_VARS: [&str; 4] = [ENV_MODEL_PATH, ENV_DEVICE, ENV_DEVICE_INDEX, ENV_COMPUTE_TYPE];

fn clear_env() {
    for var in ENV_VARS {
        unsafe {
            env::remove_var(var);
        }
    }
}

#[test]
fn test_default_config() {
    let config = SeqrtConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.load.device, Device::Cpu);
    assert_eq!(config.load.device_index, 0);
    assert_eq!(config.load.compute_type, ComputeType::Default);
    assert!(config.model.path.is_none());
}

#[test]
#[serial]
fn test_toml_config_loading() {
    clear_env();

    let toml_content = r#"
[model]
path = "/models/ende"

[load]
device = "cuda"
device_index = 1
compute_type = "float16"
"#;

    let mut temp_file = NamedTempFile::with_suffix(".toml").unwrap();
    temp_file.write_all(toml_content.as_bytes()).unwrap();

    let config = SeqrtConfig::from_file(temp_file.path()).unwrap();
    assert_eq!(config.model.path.as_deref(), Some(Path::new("/models/ende")));
    assert_eq!(config.load.device, Device::Cuda);
    assert_eq!(config.load.device_index, 1);
    assert_eq!(config.load.compute_type, ComputeType::Float16);
}

#[test]
#[serial]
fn test_json_config_loading() {
    clear_env();

    let json_content = r#"{ "load": { "compute_type": "float" } }"#;
    let mut temp_file = NamedTempFile::with_suffix(".json").unwrap();
    temp_file.write_all(json_content.as_bytes()).unwrap();

    let config = SeqrtConfig::from_file(temp_file.path()).unwrap();
    assert_eq!(config.load.compute_type, ComputeType::Float32);
    assert_eq!(config.load.device, Device::Cpu);
}

#[test]
fn test_malformed_file_is_config_error() {
    let mut temp_file = NamedTempFile::with_suffix(".toml").unwrap();
    temp_file.write_all(b"[load\ndevice = ").unwrap();

    let err = SeqrtConfig::from_file(temp_file.path()).unwrap_err();
    assert!(matches!(err, SeqrtError::Config(_)), "unexpected error: {err}");
}

#[test]
#[serial]
fn test_env_overrides() {
    clear_env();
    unsafe {
        env::set_var(ENV_DEVICE, "cuda");
        env::set_var(ENV_DEVICE_INDEX, "2");
        env::set_var(ENV_COMPUTE_TYPE, "int8");
    }

    let config = SeqrtConfig::from_env().unwrap();
    assert_eq!(config.load.device, Device::Cuda);
    assert_eq!(config.load.device_index, 2);
    assert_eq!(config.load.compute_type, ComputeType::Int8);

    clear_env();
}

#[test]
#[serial]
fn test_invalid_env_value() {
    clear_env();
    unsafe {
        env::set_var(ENV_DEVICE_INDEX, "first");
    }

    let err = SeqrtConfig::from_env().unwrap_err();
    assert!(matches!(err, SeqrtError::Config(_)));

    clear_env();
}

#[test]
#[serial]
fn test_config_loader_precedence() {
    clear_env();

    let mut temp_file = NamedTempFile::with_suffix(".toml").unwrap();
    temp_file
        .write_all(b"[load]\ncompute_type = \"int16\"\n\n[model]\npath = \"/from/file\"\n")
        .unwrap();
    unsafe {
        env::set_var(ENV_COMPUTE_TYPE, "float32");
    }

    let config = SeqrtConfig::load(Some(temp_file.path())).unwrap();
    assert_eq!(config.load.compute_type, ComputeType::Float32); // env wins
    assert_eq!(config.model.path.as_deref(), Some(Path::new("/from/file"))); // file kept

    clear_env();
}

#[test]
fn test_config_merging() {
    let mut base = SeqrtConfig::default();
    base.load.compute_type = ComputeType::Int8;

    let mut overlay = SeqrtConfig::default();
    overlay.model.path = Some(PathBuf::from("/models/lm"));

    base.merge_with(overlay);
    assert_eq!(base.load.compute_type, ComputeType::Int8); // preserved
    assert_eq!(base.model.path.as_deref(), Some(Path::new("/models/lm"))); // new value
}

#[test]
fn test_config_validation() {
    let mut config = SeqrtConfig::default();
    config.load.device_index = 3;
    assert!(config.validate().is_err());

    config.load.device = Device::Cuda;
    assert!(config.validate().is_ok());

    config.model.path = Some(PathBuf::new());
    assert!(config.validate().is_err());
}
