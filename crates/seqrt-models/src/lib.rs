//! Model loading, weight conversion and execution graphs for seqrt
//!
//! A model directory holds a `model.bin` container and optional vocabulary
//! files. [`ModelLoader`] reads the container, lets the model's
//! [`Architecture`] register and migrate its variables, converts the weights
//! to the requested [`ComputeType`](seqrt_common::ComputeType) and publishes
//! an immutable [`Model`] behind an `Arc`. Graphs created from the model
//! borrow its weights and can run on several threads at once.

pub mod arch;
pub mod convert;
pub mod device;
pub mod format;
pub mod graph;
pub mod loader;
pub mod model;
pub mod quant;
pub mod registry;
pub mod storage;
pub mod vocab;

pub use arch::{Architecture, LanguageModelSpec, ModelSpec, TransformerSpec};
pub use device::{ComputeTypeFallback, DeviceContext, ScopedDeviceSetter, StorageFallback, current_device};
pub use format::{CURRENT_BINARY_VERSION, ContainerBuilder, write_container};
pub use graph::{Decoder, Encoder};
pub use loader::{MODEL_FILE, ModelLoader, contains_model};
pub use model::{Model, PendingModel};
pub use registry::{AttributeValue, ModelRegistry};
pub use storage::{StorageData, Variable};
pub use vocab::{Vocabulary, VocabularyMap};
