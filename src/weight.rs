//! Provides configuration of weights and their initialization.
//!
//! Learnable layers ([FullyConnected][fc], [Convolution][conv]) own a
//! [LearnableWeights](./struct.LearnableWeights.html): a weight and a bias
//! tensor, their gradients and the momentum history of each.
//!
//! [fc]: ../layers/common/fully_connected/index.html
//! [conv]: ../layers/common/convolution/index.html
use rand::distributions::{Distribution, Uniform};
use rand_distr::Normal;

use crate::error::{Error, Result};
use crate::solver::UpdateConfig;
use crate::solvers::Momentum;
use crate::tensor::{self, Tensor};
use crate::util::SolverOps;

#[derive(Debug, Clone, Default)]
/// Specifies training configuration for a weight blob.
pub struct WeightConfig {
    /// The multiplier on the global learning rate for this parameter.
    ///
    /// Default: 1.0f32
    pub lr_mult: Option<f32>,

    /// The multiplier on the global weight decay for this parameter.
    ///
    /// Default: 1.0f32 for weights, 0.0f32 for biases
    pub decay_mult: Option<f32>,

    /// The filler that initializes the weights in the weight blob.
    ///
    /// Default: Glorot for weights, Constant 0 for biases
    pub filler: Option<FillerType>,
}

impl WeightConfig {
    /// The multiplier on the global learning rate for this weight blob.
    pub fn lr_mult(&self) -> f32 {
        self.lr_mult.unwrap_or(1.0f32)
    }

    /// The multiplier on the global weight decay for this weight blob.
    pub fn decay_mult(&self) -> f32 {
        self.decay_mult.unwrap_or(1.0f32)
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
/// Enum for specifing the type of Filler.
pub enum FillerType {
    /// Fills the weight blob with a constant `value` (all values are the same).
    Constant {
        /// The value that will be used to fill the blob.
        value: f32,
    },
    /// Fills the weight blobs based on the paper:
    ///
    /// `[Bengio and Glorot 2010]: Understanding the difficulty of training deep feedforward neural networks.`
    ///
    /// Also known as Xavier filler.
    Glorot,
    /// Fills the weight blob with samples of a normal distribution.
    Gaussian {
        /// Mean of the distribution.
        mean: f32,
        /// Standard deviation of the distribution.
        std: f32,
    },
}

impl FillerType {
    /// Create a tensor of `shape` filled as specified by this FillerType.
    ///
    /// `fan_in` and `fan_out` are the number of input nodes for each output
    /// and of output nodes for each input; only [Glorot](#variant.Glorot) uses them.
    pub fn fill(&self, shape: &[usize], fan_in: usize, fan_out: usize) -> Result<Tensor> {
        let len = tensor::size(shape);
        let data = match *self {
            FillerType::Constant { value } => vec![value; len],
            FillerType::Glorot => {
                let init_range = (6.0f32 / (fan_in as f32 + fan_out as f32)).sqrt();
                let between = Uniform::new_inclusive(-init_range, init_range);
                let mut rng = rand::thread_rng();
                (0..len).map(|_| between.sample(&mut rng)).collect()
            }
            FillerType::Gaussian { mean, std } => {
                let normal = Normal::new(mean, std).map_err(|e| Error::config("gaussian filler", e.to_string()))?;
                let mut rng = rand::thread_rng();
                (0..len).map(|_| normal.sample(&mut rng)).collect()
            }
        };
        tensor::from_shape_vec(shape, data)
    }
}

/// Shapes and fan sizes a learnable layer initializes its weights with.
#[derive(Debug, Clone)]
pub struct WeightShapes {
    /// Shape of the weight tensor.
    pub weight: Vec<usize>,
    /// Shape of the bias tensor.
    pub bias: Vec<usize>,
    /// Inputs contributing to one output.
    pub fan_in: usize,
    /// Outputs one input contributes to.
    pub fan_out: usize,
}

#[derive(Debug, Clone)]
/// The learnable state of a layer.
pub struct LearnableWeights {
    weight: Option<Tensor>,
    bias: Option<Tensor>,
    weight_gradient: Option<Tensor>,
    bias_gradient: Option<Tensor>,

    weight_config: WeightConfig,
    bias_config: WeightConfig,

    weight_history: Momentum,
    bias_history: Momentum,
}

impl LearnableWeights {
    /// Create uninitialized weights from the per-blob configurations
    /// (`params[0]` for the weight, `params[1]` for the bias).
    pub fn new(params: &[WeightConfig]) -> LearnableWeights {
        let weight_config = params.get(0).cloned().unwrap_or_default();
        let mut bias_config = params.get(1).cloned().unwrap_or_default();
        bias_config.decay_mult = Some(bias_config.decay_mult.unwrap_or(0f32));

        LearnableWeights {
            weight: None,
            bias: None,
            weight_gradient: None,
            bias_gradient: None,

            weight_config,
            bias_config,

            weight_history: Momentum::new(),
            bias_history: Momentum::new(),
        }
    }

    /// Whether weight and bias are present.
    pub fn is_initialized(&self) -> bool {
        self.weight.is_some() && self.bias.is_some()
    }

    /// Replace weight and bias.
    pub fn set(&mut self, weight: Tensor, bias: Tensor) {
        self.weight = Some(weight);
        self.bias = Some(bias);
    }

    /// Fill weight and bias from their fillers unless already initialized.
    pub fn initialize(&mut self, shapes: &WeightShapes) -> Result<()> {
        if self.is_initialized() {
            return Ok(());
        }
        let weight_filler = self.weight_config.filler.unwrap_or(FillerType::Glorot);
        let bias_filler = self.bias_config.filler.unwrap_or(FillerType::Constant { value: 0f32 });
        debug!(
            "initializing weights {} and bias {}",
            tensor::shape_string(&shapes.weight),
            tensor::shape_string(&shapes.bias)
        );
        let weight = weight_filler.fill(&shapes.weight, shapes.fan_in, shapes.fan_out)?;
        let bias = bias_filler.fill(&shapes.bias, shapes.fan_in, shapes.fan_out)?;
        self.set(weight, bias);
        Ok(())
    }

    /// The weight tensor.
    pub fn weight(&self) -> Result<&Tensor> {
        self.weight.as_ref().ok_or(Error::Uninitialized("weight"))
    }

    /// The bias tensor.
    pub fn bias(&self) -> Result<&Tensor> {
        self.bias.as_ref().ok_or(Error::Uninitialized("bias"))
    }

    /// Store the gradients of the last backward pass.
    pub fn set_gradients(&mut self, weight_gradient: Tensor, bias_gradient: Tensor) {
        self.weight_gradient = Some(weight_gradient);
        self.bias_gradient = Some(bias_gradient);
    }

    /// Gradient of the weight, present between backward and update.
    pub fn weight_gradient(&self) -> Option<&Tensor> {
        self.weight_gradient.as_ref()
    }

    /// Gradient of the bias, present between backward and update.
    pub fn bias_gradient(&self) -> Option<&Tensor> {
        self.bias_gradient.as_ref()
    }

    /// Accumulated update of the weight.
    pub fn weight_delta(&self) -> Option<&Tensor> {
        self.weight_history.history()
    }

    /// Accumulated update of the bias.
    pub fn bias_delta(&self) -> Option<&Tensor> {
        self.bias_history.history()
    }

    /// Training configuration of the weight blob.
    pub fn weight_config(&self) -> &WeightConfig {
        &self.weight_config
    }

    /// Training configuration of the bias blob.
    pub fn bias_config(&self) -> &WeightConfig {
        &self.bias_config
    }

    /// Apply one momentum SGD step and drop the gradients.
    ///
    /// Weights, histories and gradients are left untouched when either
    /// update fails.
    pub fn update<B: SolverOps>(&mut self, backend: &B, config: &UpdateConfig) -> Result<()> {
        let weight_gradient = self.weight_gradient.as_ref().ok_or(Error::Uninitialized("weight gradient"))?;
        let bias_gradient = self.bias_gradient.as_ref().ok_or(Error::Uninitialized("bias gradient"))?;

        let mut weight_history = self.weight_history.clone();
        let updated =
            weight_history.compute_update(backend, config, &self.weight_config, self.weight()?, weight_gradient)?;
        let mut bias_history = self.bias_history.clone();
        let updated_bias =
            bias_history.compute_update(backend, config, &self.bias_config, self.bias()?, bias_gradient)?;

        self.weight_history = weight_history;
        self.bias_history = bias_history;
        self.weight_gradient = None;
        self.bias_gradient = None;
        self.set(updated, updated_bias);
        Ok(())
    }
}
