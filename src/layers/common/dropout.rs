//! Randomly zeroes values of the input while training.
//!
//! Every forward pass in the TRAIN phase draws a fresh mask in which each
//! value is kept with probability `1 - dropout_ratio`. Kept values are scaled
//! by `1 / (1 - dropout_ratio)` so the expected output equals the input.
//! In any other phase the input passes unchanged.
//!
//! The backward pass applies the mask of the matching forward pass.
use crate::error::Result;
use crate::layer::*;
use crate::tensor::Tensor;
use crate::util::LayerOps;

#[derive(Debug, Clone)]
/// Dropout Layer
pub struct Dropout {
    keep_ratio: f32,
    scale: f32,

    mask: Option<Tensor>,
}

impl Dropout {
    /// Create a Dropout layer from a DropoutConfig.
    pub fn from_config(config: &DropoutConfig) -> Dropout {
        let keep_ratio = 1f32 - config.dropout_ratio;
        Dropout {
            keep_ratio,
            scale: 1f32 / keep_ratio,
            mask: None,
        }
    }

    /// The mask drawn by the last forward pass, if it was a TRAIN pass.
    pub fn mask(&self) -> Option<&Tensor> {
        self.mask.as_ref()
    }
}

impl<B: LayerOps> ComputeOutput<B> for Dropout {
    fn compute_output(&mut self, backend: &B, input: &Tensor, phase: Phase) -> Result<Tensor> {
        if phase != Phase::Train {
            self.mask = None;
            return Ok(input.clone());
        }
        let mask = backend.bernoulli(input.shape(), self.keep_ratio)?;
        let output = backend.scale(self.scale, &backend.mul(input, &mask)?);
        self.mask = Some(mask);
        Ok(output)
    }
}

impl<B: LayerOps> ComputeInputGradient<B> for Dropout {
    fn compute_input_gradient(&mut self, backend: &B, output_gradient: &Tensor, _phase: Phase) -> Result<Tensor> {
        match self.mask {
            Some(ref mask) => Ok(backend.scale(self.scale, &backend.mul(output_gradient, mask)?)),
            None => Ok(output_gradient.clone()),
        }
    }
}

impl_ilayer_simple!(Dropout);

#[derive(Debug, Copy, Clone)]
/// Specifies configuration parameters for a Dropout Layer.
pub struct DropoutConfig {
    /// The probability of zeroing a value. Must be in `[0, 1)`.
    ///
    /// Default: 0.5
    pub dropout_ratio: f32,
}

impl Default for DropoutConfig {
    fn default() -> DropoutConfig {
        DropoutConfig { dropout_ratio: 0.5f32 }
    }
}

impl From<DropoutConfig> for LayerType {
    fn from(config: DropoutConfig) -> LayerType {
        LayerType::Dropout(config)
    }
}
