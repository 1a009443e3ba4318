//! Applies cross-channel Local Response Normalization.
//!
//! Every value is divided by a term depending on the squared values of its
//! `local_size` neighbouring channels at the same position:
//!
//! `y = x * (1 + alpha / local_size * sum(x_j^2)) ^ (-beta)`
//!
//! The layer expects `[width, height, channels, batch]` input.
use crate::backend::LrnInfo;
use crate::error::{Error, Result};
use crate::layer::*;
use crate::tensor::Tensor;
use crate::util::LayerOps;

#[derive(Debug, Clone)]
/// Local Response Normalization Layer
pub struct Lrn {
    info: LrnInfo,

    // input, output and scale of the last forward pass
    cache: Option<(Tensor, Tensor, Tensor)>,
}

impl Lrn {
    /// Create a LRN layer from a LrnConfig.
    pub fn from_config(config: &LrnConfig) -> Lrn {
        Lrn {
            info: LrnInfo {
                local_size: config.local_size,
                alpha: config.alpha,
                beta: config.beta,
            },
            cache: None,
        }
    }
}

impl<B: LayerOps> ComputeOutput<B> for Lrn {
    fn compute_output(&mut self, backend: &B, input: &Tensor, _phase: Phase) -> Result<Tensor> {
        let (output, scale) = backend.lrn(input, &self.info)?;
        self.cache = Some((input.clone(), output.clone(), scale));
        Ok(output)
    }
}

impl<B: LayerOps> ComputeInputGradient<B> for Lrn {
    fn compute_input_gradient(&mut self, backend: &B, output_gradient: &Tensor, _phase: Phase) -> Result<Tensor> {
        let (input, output, scale) = self.cache.as_ref().ok_or(Error::Uninitialized("lrn cache"))?;
        backend.lrn_grad(input, output, scale, output_gradient, &self.info)
    }
}

impl_ilayer_simple!(Lrn);

#[derive(Debug, Copy, Clone)]
/// Specifies configuration parameters for a LRN Layer.
pub struct LrnConfig {
    /// The number of channels to sum over. Must be odd.
    ///
    /// Default: 5
    pub local_size: usize,
    /// The scaling parameter
    ///
    /// Default: 1.0
    pub alpha: f32,
    /// The exponent
    ///
    /// Default: 0.75
    pub beta: f32,
}

impl Default for LrnConfig {
    fn default() -> LrnConfig {
        LrnConfig {
            local_size: 5,
            alpha: 1f32,
            beta: 0.75f32,
        }
    }
}

impl From<LrnConfig> for LayerType {
    fn from(config: LrnConfig) -> LayerType {
        LayerType::Lrn(config)
    }
}
