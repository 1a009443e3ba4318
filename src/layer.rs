//! Provides the generics and interfaces for the specific [Layers][layers].
//!
//! A Layer is a node of the [Network][network] graph. It consumes tensors on
//! named input ports and produces tensors on named output ports. On the
//! backward pass it receives the gradients of its outputs and produces the
//! gradients of its inputs.
//!
//! The [Layer](./struct.Layer.html) struct is the part every layer has in
//! common: the configuration and the mapping between port names and
//! positions. The operation itself is implemented by a worker behind the
//! [ILayer](./trait.ILayer.html) trait.
//!
//! [network]: ../network/index.html
//! [layers]: ../layers/index.html
use std::fmt;

use crate::error::{Error, Result};
use crate::layers::*;
use crate::solver::UpdateConfig;
use crate::tensor::{Ports, Tensor};
use crate::util::LayerOps;
use crate::weight::{LearnableWeights, WeightConfig};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
/// The phase a network is executed in.
pub enum Phase {
    /// Training: forward, backward and weight update.
    Train,
    /// Evaluation: forward only.
    Test,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Phase::Train => write!(f, "TRAIN"),
            Phase::Test => write!(f, "TEST"),
        }
    }
}

#[derive(Debug)]
/// The generic Layer
pub struct Layer<B: LayerOps> {
    /// Identifies the Network
    ///
    /// The name is mainly used for logging purposes.
    pub name: String,
    /// The configuration of the Layer
    pub config: Box<LayerConfig>,
    /// The [implementation][1] of the Layer.
    /// [1]: ../layers/index.html
    ///
    /// This is the part that does most of the work ([forward][2]/[backward][3]).
    /// [2]: ./trait.ILayer.html#method.forward
    /// [3]: ./trait.ILayer.html#method.backward
    pub worker: Box<dyn ILayer<B>>,
}

impl<B: LayerOps> Layer<B> {
    /// Creates a new Layer from a [LayerConfig][1].
    /// [1]: ./struct.LayerConfig.html
    ///
    /// Fails with a [Configuration][2] error when the parameters are malformed.
    /// [2]: ../error/enum.Error.html#variant.Configuration
    pub fn from_config(config: &LayerConfig) -> Result<Layer<B>> {
        config.validate()?;
        let worker = Self::worker_from_config(config)?;
        Self::from_worker(config.clone(), worker)
    }

    /// Creates a Layer around an existing worker.
    ///
    /// Checks the number of declared ports against the ones the worker expects.
    pub fn from_worker(config: LayerConfig, worker: Box<dyn ILayer<B>>) -> Result<Layer<B>> {
        if let Some(n) = worker.exact_num_input_blobs() {
            if config.inputs.len() != n {
                return Err(Error::config(
                    &config.name,
                    format!("expects {} input(s), {} declared", n, config.inputs.len()),
                ));
            }
        }
        if let Some(n) = worker.exact_num_output_blobs() {
            if config.outputs.len() != n {
                return Err(Error::config(
                    &config.name,
                    format!("expects {} output(s), {} declared", n, config.outputs.len()),
                ));
            }
        }

        Ok(Layer {
            name: config.name.clone(),
            config: Box::new(config),
            worker,
        })
    }

    /// Helper for [from_config] to match a [LayerType][2] to its [implementation][3].
    /// [1]: #method.from_config
    /// [2]: ./enum.LayerType.html
    /// [3]: ../layers/index.html
    fn worker_from_config(config: &LayerConfig) -> Result<Box<dyn ILayer<B>>> {
        let worker: Box<dyn ILayer<B>> = match config.layer_type {
            LayerType::Data(ref cfg) => Box::new(Data::from_config(cfg)),
            LayerType::Linear => Box::new(Linear),
            LayerType::Sigmoid => Box::new(Sigmoid::default()),
            LayerType::ReLU => Box::new(ReLU::default()),
            LayerType::TanH => Box::new(TanH::default()),
            LayerType::Pooling(ref cfg) => Box::new(Pooling::from_config(cfg)),
            LayerType::Dropout(ref cfg) => Box::new(Dropout::from_config(cfg)),
            LayerType::SoftmaxLoss => Box::new(SoftmaxLoss::new(config.loss_weight.first().copied())),
            LayerType::Accuracy => Box::new(Accuracy::default()),
            LayerType::Lrn(ref cfg) => Box::new(Lrn::from_config(cfg)),
            LayerType::Concat(ref cfg) => Box::new(Concat::from_config(cfg)),
            LayerType::FullyConnected(ref cfg) => Box::new(FullyConnected::from_config(cfg, &config.params)),
            LayerType::Convolution(ref cfg) => Box::new(Convolution::from_config(cfg, &config.params)),
        };
        Ok(worker)
    }

    /// The phase the layer is restricted to, if any.
    pub fn phase(&self) -> Option<Phase> {
        self.config.phase
    }

    /// Whether the layer executes in `phase`.
    pub fn is_included(&self, phase: Phase) -> bool {
        self.config.phase.map_or(true, |p| p == phase)
    }

    /// Compute the outputs from the inputs the predecessors produced.
    ///
    /// `inputs` may contain more ports than the layer declares; only the declared ones are used.
    pub fn forward(&mut self, backend: &B, inputs: &Ports, phase: Phase) -> Result<Ports> {
        let mut input_data = Vec::with_capacity(self.config.inputs.len());
        for port in &self.config.inputs {
            match inputs.get(port) {
                Some(tensor) => input_data.push(tensor.clone()),
                None => {
                    return Err(Error::MissingInput {
                        layer: self.name.clone(),
                        port: port.clone(),
                    })
                }
            }
        }

        let output_data = self
            .worker
            .forward(backend, &input_data, phase)
            .map_err(|e| e.in_layer(&self.name))?;
        if output_data.len() != self.config.outputs.len() {
            return Err(Error::config(
                &self.name,
                format!("produced {} output(s) for {} port(s)", output_data.len(), self.config.outputs.len()),
            ));
        }

        Ok(self.config.outputs.iter().cloned().zip(output_data).collect())
    }

    /// Compute the input gradients from the summed gradients of the outputs.
    ///
    /// Input ports without a defined gradient are left out of the result.
    pub fn backward(&mut self, backend: &B, output_gradients: &Ports, phase: Phase) -> Result<Ports> {
        let mut gradients = Vec::new();
        if self.worker.requires_output_gradients() {
            for port in &self.config.outputs {
                match output_gradients.get(port) {
                    Some(tensor) => gradients.push(tensor.clone()),
                    None => {
                        return Err(Error::MissingGradient {
                            layer: self.name.clone(),
                            port: port.clone(),
                        })
                    }
                }
            }
        }

        let input_gradients = self
            .worker
            .backward(backend, &gradients, phase)
            .map_err(|e| e.in_layer(&self.name))?;

        Ok(self
            .config
            .inputs
            .iter()
            .zip(input_gradients)
            .filter_map(|(port, gradient)| gradient.map(|g| (port.clone(), g)))
            .collect())
    }

    /// Apply the weight update of learnable layers.
    pub fn update_weights(&mut self, backend: &B, config: &UpdateConfig) -> Result<()> {
        self.worker
            .update_weights(backend, config)
            .map_err(|e| e.in_layer(&self.name))
    }

    /// Whether the layer owns learnable weights.
    pub fn is_learnable(&self) -> bool {
        self.worker.learnable_weights().is_some()
    }

    /// Whether a backward pass left gradients for the next weight update.
    pub fn has_gradients(&self) -> bool {
        self.worker
            .learnable_weights()
            .map_or(false, |weights| weights.weight_gradient().is_some())
    }
}

/// A Layer in a [Network][1] that can handle forward and backward of a computation step.
/// [1]: ../network/index.html
pub trait ILayer<B: LayerOps>: fmt::Debug {
    /// Return the exact number of input blobs expected.
    ///
    /// Returns `None` when the layer accepts any number.
    fn exact_num_input_blobs(&self) -> Option<usize> {
        None
    }

    /// Return the exact number of output blobs produced.
    fn exact_num_output_blobs(&self) -> Option<usize> {
        None
    }

    /// Compute the outputs, one per declared output port, in port order.
    fn forward(&mut self, backend: &B, inputs: &[Tensor], phase: Phase) -> Result<Vec<Tensor>>;

    /// Compute the gradients of the inputs, in port order.
    ///
    /// `output_gradients` holds one gradient per output port, or nothing when
    /// the layer does not [require them](#method.requires_output_gradients).
    /// A `None` entry means the input has no defined gradient.
    fn backward(&mut self, backend: &B, output_gradients: &[Tensor], phase: Phase) -> Result<Vec<Option<Tensor>>>;

    /// Update the learnable weights from the gradients of the last backward pass.
    ///
    /// Does nothing for layers without weights.
    fn update_weights(&mut self, backend: &B, config: &UpdateConfig) -> Result<()> {
        match self.learnable_weights_mut() {
            Some(weights) => weights.update(backend, config),
            None => Ok(()),
        }
    }

    /// The learnable weights of the layer, if it has any.
    fn learnable_weights(&self) -> Option<&LearnableWeights> {
        None
    }

    /// Mutable access to the learnable weights of the layer.
    fn learnable_weights_mut(&mut self) -> Option<&mut LearnableWeights> {
        None
    }

    /// Whether the backward pass needs the gradients of the outputs.
    ///
    /// Layers that start the backward pass (losses) or do not take part in it
    /// (data, accuracy) return `false`.
    fn requires_output_gradients(&self) -> bool {
        true
    }

    /// Whether this layer computes a loss.
    fn is_loss(&self) -> bool {
        false
    }

    /// The loss computed by the last forward pass.
    fn loss(&self) -> Option<f32> {
        None
    }

    /// Whether this layer measures accuracy.
    fn is_accuracy(&self) -> bool {
        false
    }

    /// The accuracy measured by the last forward pass.
    fn accuracy(&self) -> Option<f32> {
        None
    }

    /// Whether this layer injects minibatches into the network.
    fn is_data(&self) -> bool {
        false
    }
}

/// A Layer that maps one input to one output.
pub trait ComputeOutput<B: LayerOps> {
    /// Compute the output for the given input.
    fn compute_output(&mut self, backend: &B, input: &Tensor, phase: Phase) -> Result<Tensor>;
}

/// A Layer that maps one output gradient to one input gradient.
pub trait ComputeInputGradient<B: LayerOps> {
    /// Compute the gradient of the input for the given gradient of the output.
    fn compute_input_gradient(&mut self, backend: &B, output_gradient: &Tensor, phase: Phase) -> Result<Tensor>;
}

/// The single tensor of a one-input or one-output layer.
pub(crate) fn single<'a>(tensors: &'a [Tensor], what: &'static str) -> Result<&'a Tensor> {
    tensors.first().ok_or(Error::Uninitialized(what))
}

/// Implement [ILayer][1] for layers built from [ComputeOutput][2] and [ComputeInputGradient][3].
/// [1]: ./layer/trait.ILayer.html
/// [2]: ./layer/trait.ComputeOutput.html
/// [3]: ./layer/trait.ComputeInputGradient.html
macro_rules! impl_ilayer_simple {
    ($t:ty) => {
        impl<B: $crate::util::LayerOps> $crate::layer::ILayer<B> for $t {
            fn exact_num_output_blobs(&self) -> Option<usize> {
                Some(1)
            }
            fn exact_num_input_blobs(&self) -> Option<usize> {
                Some(1)
            }

            fn forward(
                &mut self,
                backend: &B,
                inputs: &[$crate::tensor::Tensor],
                phase: $crate::layer::Phase,
            ) -> $crate::error::Result<Vec<$crate::tensor::Tensor>> {
                let input = $crate::layer::single(inputs, "input")?;
                Ok(vec![self.compute_output(backend, input, phase)?])
            }

            fn backward(
                &mut self,
                backend: &B,
                output_gradients: &[$crate::tensor::Tensor],
                phase: $crate::layer::Phase,
            ) -> $crate::error::Result<Vec<Option<$crate::tensor::Tensor>>> {
                let gradient = $crate::layer::single(output_gradients, "output gradient")?;
                Ok(vec![Some(self.compute_input_gradient(backend, gradient, phase)?)])
            }
        }
    };
}

#[derive(Debug, Clone)]
/// Layer Configuration Struct
pub struct LayerConfig {
    /// The name of the Layer
    pub name: String,

    /// The type of the Layer
    pub layer_type: LayerType,

    /// The name for each input port
    pub inputs: Vec<String>,

    /// The name for each output port
    pub outputs: Vec<String>,

    /// The phase the layer is restricted to.
    ///
    /// Default: None (executes in every phase)
    pub phase: Option<Phase>,

    /// Specifies training parameters (multipliers on global learning constants,
    /// and the name and other settings used for weight sharing).
    pub params: Vec<WeightConfig>,

    /// Scaling of the loss gradient. At most one entry.
    ///
    /// Default: empty (unscaled)
    pub loss_weight: Vec<f32>,
}

#[derive(Debug, Clone)]
/// The Layer Types
pub enum LayerType {
    /// Data Layer
    Data(DataConfig),
    /// Identity Layer
    Linear,
    /// Sigmoid Layer
    Sigmoid,
    /// ReLU Layer
    ReLU,
    /// TanH Layer
    TanH,
    /// Pooling Layer
    Pooling(PoolingConfig),
    /// Dropout Layer
    Dropout(DropoutConfig),
    /// Softmax with Loss Layer
    SoftmaxLoss,
    /// Accuracy Layer
    Accuracy,
    /// Local Response Normalization Layer
    Lrn(LrnConfig),
    /// Concat Layer
    Concat(ConcatConfig),
    /// Fully connected Layer
    FullyConnected(FullyConnectedConfig),
    /// Convolution Layer
    Convolution(ConvolutionConfig),
}

impl LayerConfig {
    /// Creates a new LayerConfig
    pub fn new<L: Into<LayerType>>(name: &str, layer_type: L) -> LayerConfig {
        LayerConfig {
            name: name.to_owned(),
            layer_type: layer_type.into(),

            inputs: Vec::new(),
            outputs: Vec::new(),
            phase: None,
            params: Vec::new(),
            loss_weight: Vec::new(),
        }
    }

    /// Add an input port by name.
    pub fn add_input(mut self, input_name: &str) -> LayerConfig {
        self.inputs.push(input_name.to_owned());
        self
    }

    /// Add an output port by name.
    pub fn add_output(mut self, output_name: &str) -> LayerConfig {
        self.outputs.push(output_name.to_owned());
        self
    }

    /// Restrict the layer to a phase.
    pub fn with_phase(mut self, phase: Phase) -> LayerConfig {
        self.phase = Some(phase);
        self
    }

    /// Set the training parameters of the weight blobs.
    pub fn with_params(mut self, params: Vec<WeightConfig>) -> LayerConfig {
        self.params = params;
        self
    }

    /// Add a loss weight.
    pub fn with_loss_weight(mut self, loss_weight: f32) -> LayerConfig {
        self.loss_weight.push(loss_weight);
        self
    }

    /// Check the parameters of the layer.
    pub fn validate(&self) -> Result<()> {
        if self.loss_weight.len() > 1 {
            return Err(Error::config(
                &self.name,
                format!("at most one loss weight is supported, {} given", self.loss_weight.len()),
            ));
        }
        let check = |ok: bool, message: &str| if ok { Ok(()) } else { Err(Error::config(&self.name, message)) };
        match self.layer_type {
            LayerType::Pooling(ref cfg) => {
                check(cfg.kernel_size > 0, "kernel_size must be positive")?;
                check(cfg.stride > 0, "stride must be positive")?;
                check(cfg.pad < cfg.kernel_size, "pad must be smaller than kernel_size")
            }
            LayerType::Dropout(ref cfg) => check(
                (0f32..1f32).contains(&cfg.dropout_ratio),
                "dropout_ratio must be in [0, 1)",
            ),
            LayerType::Lrn(ref cfg) => check(cfg.local_size % 2 == 1, "local_size must be odd"),
            LayerType::FullyConnected(ref cfg) => check(cfg.num_output > 0, "num_output must be positive"),
            LayerType::Convolution(ref cfg) => {
                check(cfg.num_output > 0, "num_output must be positive")?;
                check(cfg.kernel_size > 0, "kernel_size must be positive")?;
                check(cfg.stride > 0, "stride must be positive")?;
                check(cfg.group > 0, "group must be positive")?;
                check(cfg.num_output % cfg.group == 0, "num_output must be divisible by group")
            }
            LayerType::Concat(_) => check(!self.inputs.is_empty(), "needs at least one input"),
            LayerType::Data(ref cfg) => check(!cfg.sample_shape.is_empty(), "sample_shape must not be empty"),
            _ => Ok(()),
        }
    }
}
