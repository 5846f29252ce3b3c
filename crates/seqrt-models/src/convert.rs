//! Conversion of loaded variables to the bound device and compute type

use crate::device::{DeviceContext, StorageFallback, supports_dtype};
use crate::model::PendingModel;
use crate::quant::{self, Scales};
use crate::registry::{ConversionPlan, ModelRegistry};
use crate::storage::{StorageData, Variable};
use seqrt_common::{DataType, DeviceError, Result};
use tracing::{debug, warn};

/// Storage type a weight saved as `saved` must end up with.
pub fn target_weight_dtype(context: &DeviceContext, saved: DataType) -> DataType {
    let device = context.device();
    match context.compute_type().weight_dtype() {
        Some(dtype) => dtype,
        None if supports_dtype(device, saved) => saved,
        // Saved type not realizable under the default compute type.
        None => DataType::Float32,
    }
}

/// A complete conversion plan and the storage fallbacks it implies.
#[derive(Debug, Default)]
pub(crate) struct Conversions {
    pub(crate) plan: ConversionPlan,
    pub(crate) fallbacks: Vec<StorageFallback>,
}

impl Conversions {
    fn fall_back(&mut self, context: &DeviceContext, name: &str, saved: DataType) {
        debug!(name, %saved, "saved type not supported on device, converting to float32");
        self.fallbacks.push(StorageFallback {
            name: name.to_string(),
            saved,
            converted: DataType::Float32,
            device: context.device(),
        });
    }
}

/// Builds the conversion plan for every variable of `registry`.
///
/// Nothing is modified; the caller applies the plan once it is complete.
pub(crate) fn plan_conversions(registry: &ModelRegistry, context: &DeviceContext) -> Result<Conversions> {
    let mut conversions = Conversions::default();
    for name in registry.names() {
        let variable = registry.get_variable(name)?;
        if quant::is_quantizable(name) {
            plan_weight(registry, context, name, variable, &mut conversions)?;
        } else if variable.dtype() == DataType::Float16 && !supports_dtype(context.device(), DataType::Float16) {
            conversions.fall_back(context, name, DataType::Float16);
            let values = variable.data().to_f32_vec();
            conversions.plan.add(name, variable.with_data(StorageData::F32(values))?);
        }
    }
    Ok(conversions)
}

fn plan_weight(
    registry: &ModelRegistry,
    context: &DeviceContext,
    name: &str,
    weight: &Variable,
    conversions: &mut Conversions,
) -> Result<()> {
    let device = context.device();
    let saved = weight.dtype();
    let target = target_weight_dtype(context, saved);
    if !supports_dtype(device, target) {
        return Err(DeviceError::UnsupportedStorage { dtype: target, device }.into());
    }
    if context.compute_type().weight_dtype().is_none() && target != saved {
        conversions.fall_back(context, name, saved);
    }
    let plan = &mut conversions.plan;

    let (scales, scale_saved) = quant::get_scale(registry, name, weight)?;
    let scale_name = quant::scale_name(name);

    if target == saved {
        if let Scales::Global(scale) = scales
            && !scale_saved
        {
            debug!(name, scale, "installing default int16 scale");
            plan.add(scale_name, Variable::from_f32(Vec::new(), vec![scale])?);
        }
        return Ok(());
    }

    debug!(name, from = %saved, to = %target, "converting weight");
    let values = quant::dequantize(weight, &scales);
    let (converted, new_scale) = quant::quantize(weight, &values, target)?;
    plan.add(name, converted);
    match new_scale {
        Some(scale) => plan.add(scale_name, scale),
        None if scale_saved => plan.remove(scale_name),
        None => {}
    }
    Ok(())
}

impl PendingModel {
    /// Converts every variable to the bound device and compute type, then
    /// places all of them on the bound device.
    ///
    /// The registry is only modified after the whole plan was built.
    pub fn convert_variables(&mut self) -> Result<()> {
        let Conversions { plan, fallbacks } = plan_conversions(&self.registry, &self.context)?;
        if !plan.is_empty() {
            debug!(
                added = plan.to_add.len(),
                removed = plan.to_remove.len(),
                compute_type = %self.context.compute_type(),
                "applying variable conversions"
            );
            self.registry.apply(plan);
        }
        if !fallbacks.is_empty() {
            warn!(
                count = fallbacks.len(),
                device = %self.context.device(),
                "saved storage types not supported on device, converted to float32"
            );
            self.storage_fallbacks.extend(fallbacks);
        }

        let device = self.context.device();
        for variable in self.registry.variables_mut() {
            variable.set_device(device);
        }
        Ok(())
    }
}
