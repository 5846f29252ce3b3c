//! Device binding: compute type resolution and the thread's active device

use seqrt_common::{ComputeType, DataType, Device, DeviceError, Result};
use std::cell::Cell;
use std::marker::PhantomData;
use tracing::{trace, warn};

const CPU_DTYPES: &[DataType] = &[DataType::Float32, DataType::Int8, DataType::Int16];
const CUDA_DTYPES: &[DataType] = &[DataType::Float32, DataType::Float16, DataType::Int8];

/// Weight storage types a device can compute with.
pub fn supported_dtypes(device: Device) -> &'static [DataType] {
    match device {
        Device::Cpu => CPU_DTYPES,
        Device::Cuda => CUDA_DTYPES,
    }
}

pub fn supports_dtype(device: Device, dtype: DataType) -> bool {
    supported_dtypes(device).contains(&dtype)
}

/// A requested compute type that was replaced by a realizable one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComputeTypeFallback {
    pub requested: ComputeType,
    pub effective: ComputeType,
    pub device: Device,
}

/// A saved variable converted to float32 because the device cannot store
/// its saved type under the `Default` compute type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageFallback {
    pub name: String,
    pub saved: DataType,
    pub converted: DataType,
    pub device: Device,
}

/// Maps a requested compute type to the one used on `device`.
///
/// `Default` is kept as is (it is resolved per weight at conversion time).
pub fn resolve_compute_type(
    device: Device,
    requested: ComputeType,
) -> Result<(ComputeType, Option<ComputeTypeFallback>)> {
    let effective = match (requested, device) {
        (ComputeType::Default, _) => ComputeType::Default,
        (ComputeType::Auto, Device::Cpu) => ComputeType::Int8,
        (ComputeType::Auto, Device::Cuda) => ComputeType::Float16,
        (ComputeType::Float16, Device::Cpu) => ComputeType::Float32,
        (requested, device) => {
            let realizable = requested.weight_dtype().is_some_and(|dtype| supports_dtype(device, dtype));
            if !realizable {
                return Err(DeviceError::UnsupportedComputeType { requested, device }.into());
            }
            requested
        }
    };

    let fallback = (requested == ComputeType::Float16 && effective != requested).then(|| {
        warn!(%requested, %effective, %device, "compute type not supported on device, falling back");
        ComputeTypeFallback { requested, effective, device }
    });
    Ok((effective, fallback))
}

/// Fails unless `(device, index)` can be bound in this build.
pub fn check_device_available(device: Device, index: usize) -> Result<()> {
    match device {
        Device::Cpu if index == 0 => Ok(()),
        Device::Cpu => Err(DeviceError::DeviceUnavailable {
            device,
            index,
            reason: "the cpu device only has index 0".to_string(),
        }
        .into()),
        Device::Cuda => Err(DeviceError::DeviceUnavailable {
            device,
            index,
            reason: "no CUDA runtime is linked into this build".to_string(),
        }
        .into()),
    }
}

/// Device, index and compute type a model is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceContext {
    device: Device,
    device_index: usize,
    compute_type: ComputeType,
    requested_compute_type: ComputeType,
    fallback: Option<ComputeTypeFallback>,
}

impl DeviceContext {
    /// Resolves the compute type, then checks that the device is available.
    pub fn resolve(device: Device, device_index: usize, requested: ComputeType) -> Result<Self> {
        let (compute_type, fallback) = resolve_compute_type(device, requested)?;
        check_device_available(device, device_index)?;
        Ok(Self { device, device_index, compute_type, requested_compute_type: requested, fallback })
    }

    /// Resolves the compute type without the availability check, so tests
    /// can bind devices this build does not link.
    #[cfg(test)]
    pub(crate) fn unchecked(device: Device, device_index: usize, requested: ComputeType) -> Result<Self> {
        let (compute_type, fallback) = resolve_compute_type(device, requested)?;
        Ok(Self { device, device_index, compute_type, requested_compute_type: requested, fallback })
    }

    pub fn device(&self) -> Device {
        self.device
    }

    pub fn device_index(&self) -> usize {
        self.device_index
    }

    /// Effective compute type.
    pub fn compute_type(&self) -> ComputeType {
        self.compute_type
    }

    pub fn requested_compute_type(&self) -> ComputeType {
        self.requested_compute_type
    }

    pub fn fallback(&self) -> Option<ComputeTypeFallback> {
        self.fallback
    }
}

impl Default for DeviceContext {
    fn default() -> Self {
        Self {
            device: Device::Cpu,
            device_index: 0,
            compute_type: ComputeType::Default,
            requested_compute_type: ComputeType::Default,
            fallback: None,
        }
    }
}

thread_local! {
    static ACTIVE_DEVICE: Cell<Option<(Device, usize)>> = const { Cell::new(None) };
}

/// The calling thread's active device; `(Cpu, 0)` when none was set.
pub fn current_device() -> (Device, usize) {
    ACTIVE_DEVICE.with(Cell::get).unwrap_or((Device::Cpu, 0))
}

/// Makes a device the calling thread's active device until dropped.
///
/// Guards nest: dropping one restores whatever was active before it.
#[must_use = "the previous device is restored when the guard is dropped"]
#[derive(Debug)]
pub struct ScopedDeviceSetter {
    previous: Option<(Device, usize)>,
    // Thread-local state: the guard must be dropped on the thread that made it.
    _not_send: PhantomData<*const ()>,
}

impl ScopedDeviceSetter {
    pub fn new(device: Device, index: usize) -> Self {
        let previous = ACTIVE_DEVICE.with(|active| active.replace(Some((device, index))));
        trace!(%device, index, "activated device");
        Self { previous, _not_send: PhantomData }
    }
}

impl Drop for ScopedDeviceSetter {
    fn drop(&mut self) {
        ACTIVE_DEVICE.with(|active| active.set(self.previous));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_table() {
        assert!(supports_dtype(Device::Cpu, DataType::Int16));
        assert!(!supports_dtype(Device::Cpu, DataType::Float16));
        assert!(supports_dtype(Device::Cuda, DataType::Float16));
        assert!(!supports_dtype(Device::Cuda, DataType::Int16));
    }

    #[test]
    fn compute_type_resolution() {
        let resolve = |device, requested| resolve_compute_type(device, requested).map(|(c, _)| c);
        assert_eq!(resolve(Device::Cpu, ComputeType::Auto).unwrap(), ComputeType::Int8);
        assert_eq!(resolve(Device::Cuda, ComputeType::Auto).unwrap(), ComputeType::Float16);
        assert_eq!(resolve(Device::Cpu, ComputeType::Default).unwrap(), ComputeType::Default);
        assert_eq!(resolve(Device::Cpu, ComputeType::Int16).unwrap(), ComputeType::Int16);

        let (effective, fallback) = resolve_compute_type(Device::Cpu, ComputeType::Float16).unwrap();
        assert_eq!(effective, ComputeType::Float32);
        assert_eq!(fallback.map(|f| f.requested), Some(ComputeType::Float16));

        let err = resolve_compute_type(Device::Cuda, ComputeType::Int16).unwrap_err();
        assert!(err.is_unsupported_compute_type());
    }

    #[test]
    fn compute_type_is_checked_before_availability() {
        let err = DeviceContext::resolve(Device::Cuda, 0, ComputeType::Int16).unwrap_err();
        assert!(err.is_unsupported_compute_type());

        let err = DeviceContext::resolve(Device::Cuda, 0, ComputeType::Float32).unwrap_err();
        assert!(matches!(err, seqrt_common::SeqrtError::Device(DeviceError::DeviceUnavailable { .. })));
    }

    #[test]
    fn scoped_setter_restores_previous_device() {
        assert_eq!(current_device(), (Device::Cpu, 0));
        {
            let _outer = ScopedDeviceSetter::new(Device::Cuda, 1);
            assert_eq!(current_device(), (Device::Cuda, 1));
            {
                let _inner = ScopedDeviceSetter::new(Device::Cuda, 2);
                assert_eq!(current_device(), (Device::Cuda, 2));
            }
            assert_eq!(current_device(), (Device::Cuda, 1));
        }
        assert_eq!(current_device(), (Device::Cpu, 0));
    }

    #[test]
    fn scoped_setter_restores_on_unwind() {
        let result = std::panic::catch_unwind(|| {
            let _guard = ScopedDeviceSetter::new(Device::Cuda, 3);
            panic!("graph failed");
        });
        assert!(result.is_err());
        assert_eq!(current_device(), (Device::Cpu, 0));
    }
}
