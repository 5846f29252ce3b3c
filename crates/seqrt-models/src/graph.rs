//! Execution graphs built over a loaded [`Model`]
//!
//! A graph borrows the model's weights and owns everything it writes: the
//! activation buffers, the dequantization scratch and the decoder state. Any
//! number of graphs can therefore run over one model at the same time.
//!
//! Every layer is elementwise over the hidden size `H`:
//!
//! ```text
//! h = max(x * w + b, 0)
//! x = x + h          (when `with_residual` is set, the default)
//! x = h              (otherwise)
//! ```

use crate::model::Model;
use crate::quant::{self, Scales};
use crate::storage::Variable;
use seqrt_common::{Result, SeqrtError};
use tracing::debug;

/// Flag controlling the residual connection of every layer.
pub const WITH_RESIDUAL_FLAG: &str = "with_residual";

/// A stateless graph mapping one input vector to one output vector.
pub trait Encoder: Send {
    fn hidden_size(&self) -> usize;

    fn encode(&mut self, input: &[f32]) -> Result<Vec<f32>>;
}

/// A stateful graph advanced one step at a time.
pub trait Decoder: Send {
    fn hidden_size(&self) -> usize;

    /// Clears the state carried between steps.
    fn reset(&mut self);

    fn step(&mut self, input: &[f32]) -> Result<Vec<f32>>;
}

/// A borrowed weight, read as `f32`.
///
/// Float32 storage is used in place; any other storage is decoded into a
/// caller-owned scratch buffer on every access.
#[derive(Debug)]
struct WeightView<'m> {
    variable: &'m Variable,
    scales: Scales,
}

impl<'m> WeightView<'m> {
    fn new(model: &'m Model, name: &str) -> Result<Self> {
        let variable = model.get_variable(name)?;
        let (scales, _) = quant::get_scale(model.registry(), name, variable)?;
        Ok(Self { variable, scales })
    }

    fn len(&self) -> usize {
        self.variable.numel()
    }

    fn values<'a>(&'a self, scratch: &'a mut Vec<f32>) -> &'a [f32] {
        if let Some(values) = self.variable.as_f32() {
            return values;
        }
        scratch.resize(self.variable.numel(), 0.0);
        quant::dequantize_into(self.variable, &self.scales, scratch);
        scratch
    }
}

#[derive(Debug)]
struct Affine<'m> {
    weight: WeightView<'m>,
    bias: WeightView<'m>,
}

impl<'m> Affine<'m> {
    fn new(model: &'m Model, prefix: &str) -> Result<Self> {
        Ok(Self {
            weight: WeightView::new(model, &format!("{prefix}/weight"))?,
            bias: WeightView::new(model, &format!("{prefix}/bias"))?,
        })
    }

    fn check_size(&self, prefix: &str, hidden_size: usize) -> Result<()> {
        if self.weight.len() != hidden_size || self.bias.len() != hidden_size {
            return Err(SeqrtError::format(format!(
                "'{prefix}' has {} weights and {} biases, expected {hidden_size}",
                self.weight.len(),
                self.bias.len()
            )));
        }
        Ok(())
    }

    /// `out = x * w + b`, using `tmp` as an intermediate.
    fn apply(&self, x: &[f32], scratch: &mut Scratch, tmp: &mut [f32], out: &mut [f32]) {
        let w = self.weight.values(&mut scratch.weight);
        seqrt_kernels::mul(x, w, tmp);
        let b = self.bias.values(&mut scratch.bias);
        seqrt_kernels::add(tmp, b, out);
    }
}

/// Dequantization buffers owned by one graph.
#[derive(Debug, Default)]
struct Scratch {
    weight: Vec<f32>,
    bias: Vec<f32>,
}

/// The `{prefix}/layer_{i}/ffn` layers of a model.
#[derive(Debug)]
struct LayerStack<'m> {
    layers: Vec<Affine<'m>>,
    with_residual: bool,
    scratch: Scratch,
    hidden: Vec<f32>,
    tmp: Vec<f32>,
}

impl<'m> LayerStack<'m> {
    fn new(model: &'m Model, prefix: &str) -> Result<Self> {
        let mut layers = Vec::new();
        while model.registry().contains(&layer_weight_name(prefix, layers.len())) {
            let layer_prefix = format!("{prefix}/layer_{}/ffn", layers.len());
            layers.push(Affine::new(model, &layer_prefix)?);
        }
        let with_residual = model.get_flag_with_default(WITH_RESIDUAL_FLAG, true)?;
        debug!(prefix, layers = layers.len(), with_residual, "built layer stack");
        Ok(Self {
            layers,
            with_residual,
            scratch: Scratch::default(),
            hidden: Vec::new(),
            tmp: Vec::new(),
        })
    }

    fn first_layer_size(&self) -> Option<usize> {
        self.layers.first().map(|layer| layer.weight.len())
    }

    fn check_size(&mut self, prefix: &str, hidden_size: usize) -> Result<()> {
        for (index, layer) in self.layers.iter().enumerate() {
            layer.check_size(&format!("{prefix}/layer_{index}/ffn"), hidden_size)?;
        }
        self.hidden = vec![0.0; hidden_size];
        self.tmp = vec![0.0; hidden_size];
        Ok(())
    }

    fn forward(&mut self, x: &mut [f32]) {
        for layer in &self.layers {
            layer.apply(x, &mut self.scratch, &mut self.tmp, &mut self.hidden);
            seqrt_kernels::max_scalar(0.0, &self.hidden, &mut self.tmp);
            if self.with_residual {
                seqrt_kernels::add(x, &self.tmp, &mut self.hidden);
                x.copy_from_slice(&self.hidden);
            } else {
                x.copy_from_slice(&self.tmp);
            }
        }
    }
}

fn layer_weight_name(prefix: &str, index: usize) -> String {
    format!("{prefix}/layer_{index}/ffn/weight")
}

fn check_input(input: &[f32], hidden_size: usize) -> Result<()> {
    if input.len() != hidden_size {
        return Err(SeqrtError::InvalidArgument(format!(
            "input has {} values, the model hidden size is {hidden_size}",
            input.len()
        )));
    }
    Ok(())
}

/// Encoder over the `{prefix}/layer_{i}` layers.
#[derive(Debug)]
pub struct StackEncoder<'m> {
    model: &'m Model,
    stack: LayerStack<'m>,
    hidden_size: usize,
}

impl<'m> StackEncoder<'m> {
    pub fn new(model: &'m Model, prefix: &str) -> Result<Self> {
        let mut stack = LayerStack::new(model, prefix)?;
        let hidden_size = stack
            .first_layer_size()
            .ok_or_else(|| SeqrtError::missing_variable(layer_weight_name(prefix, 0)))?;
        stack.check_size(prefix, hidden_size)?;
        Ok(Self { model, stack, hidden_size })
    }
}

impl Encoder for StackEncoder<'_> {
    fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    fn encode(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        check_input(input, self.hidden_size)?;
        let _device = self.model.get_scoped_device_setter();
        let mut x = input.to_vec();
        self.stack.forward(&mut x);
        Ok(x)
    }
}

/// Decoder over the `{prefix}/layer_{i}` layers followed by
/// `{prefix}/projection`.
#[derive(Debug)]
pub struct StackDecoder<'m> {
    model: &'m Model,
    stack: LayerStack<'m>,
    projection: Affine<'m>,
    scratch: Scratch,
    hidden_size: usize,
    state: Vec<f32>,
    x: Vec<f32>,
    tmp: Vec<f32>,
}

impl<'m> StackDecoder<'m> {
    pub fn new(model: &'m Model, prefix: &str) -> Result<Self> {
        let mut stack = LayerStack::new(model, prefix)?;
        let projection_prefix = format!("{prefix}/projection");
        let projection = Affine::new(model, &projection_prefix)?;
        let hidden_size = stack.first_layer_size().unwrap_or(projection.weight.len());
        stack.check_size(prefix, hidden_size)?;
        projection.check_size(&projection_prefix, hidden_size)?;
        Ok(Self {
            model,
            stack,
            projection,
            scratch: Scratch::default(),
            hidden_size,
            state: vec![0.0; hidden_size],
            x: vec![0.0; hidden_size],
            tmp: vec![0.0; hidden_size],
        })
    }

    /// State carried into the next step.
    pub fn state(&self) -> &[f32] {
        &self.state
    }
}

impl Decoder for StackDecoder<'_> {
    fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    fn reset(&mut self) {
        self.state.fill(0.0);
    }

    fn step(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        check_input(input, self.hidden_size)?;
        let _device = self.model.get_scoped_device_setter();
        seqrt_kernels::add(input, &self.state, &mut self.x);
        self.stack.forward(&mut self.x);
        self.projection.apply(&self.x, &mut self.scratch, &mut self.tmp, &mut self.state);
        Ok(self.state.clone())
    }
}
