//! Applies pooling to the input.
//!
//! This layers looks at adjectant values of the input and then computes a
//! simple pooling operation over them (e.g. taking their maximum or average value).
//! *See [PoolingMode][pooling_mode]*
//!
//! [pooling_mode]: ../../../backend/enum.PoolingMode.html
//!
//! ## Input Data
//!
//! The layer expects the input to be in 4D `[width, height, channels, batch]`
//! format. Output extents are rounded down:
//! `(extent + 2 * pad - kernel_size) / stride + 1`.
use crate::backend::{PoolingInfo, PoolingMode};
use crate::error::{Error, Result};
use crate::layer::*;
use crate::tensor::Tensor;
use crate::util::LayerOps;

#[derive(Debug, Clone)]
/// [Pooling](./index.html) Layer
pub struct Pooling {
    info: PoolingInfo,

    // input and output of the last forward pass
    cache: Option<(Tensor, Tensor)>,
}

impl Pooling {
    /// Create a Pooling layer from a PoolingConfig.
    pub fn from_config(config: &PoolingConfig) -> Pooling {
        Pooling {
            info: PoolingInfo {
                height: config.kernel_size,
                width: config.kernel_size,
                stride_vertical: config.stride,
                stride_horizontal: config.stride,
                pad_height: config.pad,
                pad_width: config.pad,
                mode: config.mode,
            },
            cache: None,
        }
    }
}

impl<B: LayerOps> ComputeOutput<B> for Pooling {
    fn compute_output(&mut self, backend: &B, input: &Tensor, _phase: Phase) -> Result<Tensor> {
        let output = backend.pooling(input, &self.info)?;
        self.cache = Some((input.clone(), output.clone()));
        Ok(output)
    }
}

impl<B: LayerOps> ComputeInputGradient<B> for Pooling {
    fn compute_input_gradient(&mut self, backend: &B, output_gradient: &Tensor, _phase: Phase) -> Result<Tensor> {
        let (input, output) = self.cache.as_ref().ok_or(Error::Uninitialized("pooling cache"))?;
        backend.pooling_grad(output_gradient, output, input, &self.info)
    }
}

impl_ilayer_simple!(Pooling);

#[derive(Debug, Copy, Clone)]
/// Specifies configuration parameters for a Pooling Layer.
pub struct PoolingConfig {
    /// The PoolingMode to use
    pub mode: PoolingMode,
    /// The size of the (square) window
    pub kernel_size: usize,
    /// The stride size
    ///
    /// Default: 1
    pub stride: usize,
    /// The padding size
    ///
    /// Default: 0
    pub pad: usize,
}

impl PoolingConfig {
    /// Create a PoolingConfig with default stride and padding.
    pub fn new(mode: PoolingMode, kernel_size: usize) -> PoolingConfig {
        PoolingConfig {
            mode,
            kernel_size,
            stride: 1,
            pad: 0,
        }
    }
}

impl From<PoolingConfig> for LayerType {
    fn from(config: PoolingConfig) -> LayerType {
        LayerType::Pooling(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Native;
    use crate::tensor::from_shape_vec;

    #[test]
    fn backward_reuses_forward_windows() {
        let backend = Native::new();
        let mut config = PoolingConfig::new(PoolingMode::Max, 2);
        config.stride = 2;
        let mut layer = Pooling::from_config(&config);
        assert!(layer.compute_input_gradient(&backend, &from_shape_vec(&[1, 1, 1, 1], vec![1.]).unwrap(), Phase::Train).is_err());

        let x = from_shape_vec(&[2, 2, 1, 1], vec![1., 4., 3., 2.]).unwrap();
        let y = layer.compute_output(&backend, &x, Phase::Train).unwrap();
        assert_eq!(y.shape(), &[1, 1, 1, 1]);
        assert_eq!(y[[0, 0, 0, 0]], 4.);
        let dx = layer
            .compute_input_gradient(&backend, &from_shape_vec(&[1, 1, 1, 1], vec![2.]).unwrap(), Phase::Train)
            .unwrap();
        assert_eq!(dx, from_shape_vec(&[2, 2, 1, 1], vec![0., 2., 0., 0.]).unwrap());
    }
}
