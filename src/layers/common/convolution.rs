//! Convolves the input tensor.
//!
//! Does this convolution with a set of learnable filters, each producing one
//! feature map in the output tensor.
//!
//! With `group > 1` the input channels and the filters are split into `group`
//! equal parts. Every part of the input is convolved with its own part of the
//! filters only, and the results are concatenated in group order. The
//! gradients are assembled the same way.
//!
//! ## Input Data
//!
//! The layer expects `[width, height, channels, batch]` input. Filters are
//! `[kernel_size, kernel_size, channels / group, num_output]`, the bias is
//! `[num_output]`.
use crate::backend::ConvInfo;
use crate::error::{Error, Result};
use crate::layer::*;
use crate::tensor::Tensor;
use crate::util::LayerOps;
use crate::weight::{LearnableWeights, WeightConfig, WeightShapes};

const DATA_AXIS: usize = 2;
const FILTER_AXIS: usize = 3;
const BIAS_AXIS: usize = 0;

#[derive(Debug, Clone)]
/// Convolution Layer
pub struct Convolution {
    num_output: usize,
    kernel_size: usize,
    group: usize,
    info: ConvInfo,

    weights: LearnableWeights,

    // input and filter of every group, kept from forward until backward
    groups: Vec<(Tensor, Tensor)>,
}

impl Convolution {
    /// Create a Convolution layer from a ConvolutionConfig.
    pub fn from_config(config: &ConvolutionConfig, params: &[WeightConfig]) -> Convolution {
        Convolution {
            num_output: config.num_output,
            kernel_size: config.kernel_size,
            group: config.group,
            info: ConvInfo {
                pad_height: config.pad,
                pad_width: config.pad,
                stride_vertical: config.stride,
                stride_horizontal: config.stride,
            },

            weights: LearnableWeights::new(params),
            groups: Vec::new(),
        }
    }

    fn weight_shapes(&self, channels: usize) -> WeightShapes {
        let channels_per_group = channels / self.group;
        let kernel_area = self.kernel_size * self.kernel_size;
        WeightShapes {
            weight: vec![self.kernel_size, self.kernel_size, channels_per_group, self.num_output],
            bias: vec![self.num_output],
            fan_in: channels_per_group * kernel_area,
            fan_out: self.num_output / self.group * kernel_area,
        }
    }

    /// The cached per-group inputs of the last forward pass.
    pub fn group_inputs(&self) -> impl Iterator<Item = &Tensor> {
        self.groups.iter().map(|(data, _)| data)
    }
}

impl<B: LayerOps> ComputeOutput<B> for Convolution {
    fn compute_output(&mut self, backend: &B, input: &Tensor, _phase: Phase) -> Result<Tensor> {
        if input.ndim() != 4 || input.shape()[DATA_AXIS] % self.group != 0 {
            return Err(Error::shape("convolution", input.shape(), &[0, 0, self.group, 0]));
        }
        let channels = input.shape()[DATA_AXIS];
        self.weights.initialize(&self.weight_shapes(channels))?;
        let filter = self.weights.weight()?.clone();
        let bias = self.weights.bias()?.clone();

        let data_slice = channels / self.group;
        let filter_slice = self.num_output / self.group;
        self.groups.clear();
        let mut results = Vec::with_capacity(self.group);
        for g in 0..self.group {
            let data = backend.slice(input, DATA_AXIS, g * data_slice, data_slice)?;
            let group_filter = backend.slice(&filter, FILTER_AXIS, g * filter_slice, filter_slice)?;
            let group_bias = backend.slice(&bias, BIAS_AXIS, g * filter_slice, filter_slice)?;
            results.push(backend.convolution(&data, &group_filter, &group_bias, &self.info)?);
            self.groups.push((data, group_filter));
        }
        backend.concat(&results, DATA_AXIS)
    }
}

impl<B: LayerOps> ComputeInputGradient<B> for Convolution {
    fn compute_input_gradient(&mut self, backend: &B, output_gradient: &Tensor, _phase: Phase) -> Result<Tensor> {
        if self.groups.is_empty() {
            return Err(Error::Uninitialized("convolution group cache"));
        }
        let groups = std::mem::take(&mut self.groups);
        if output_gradient.ndim() != 4 || output_gradient.shape()[DATA_AXIS] % groups.len() != 0 {
            return Err(Error::shape("convolution", output_gradient.shape(), &[0, 0, self.num_output, 0]));
        }
        let slice = output_gradient.shape()[DATA_AXIS] / groups.len();

        let mut weight_gradients = Vec::with_capacity(groups.len());
        let mut bias_gradients = Vec::with_capacity(groups.len());
        let mut input_gradients = Vec::with_capacity(groups.len());
        for (g, (data, filter)) in groups.iter().enumerate() {
            let gradient = backend.slice(output_gradient, DATA_AXIS, g * slice, slice)?;
            weight_gradients.push(backend.convolution_grad_filter(&gradient, data, filter, &self.info)?);
            bias_gradients.push(backend.convolution_grad_bias(&gradient)?);
            input_gradients.push(backend.convolution_grad_data(&gradient, data, filter, &self.info)?);
        }

        self.weights.set_gradients(
            backend.concat(&weight_gradients, FILTER_AXIS)?,
            backend.concat(&bias_gradients, BIAS_AXIS)?,
        );
        backend.concat(&input_gradients, DATA_AXIS)
    }
}

impl<B: LayerOps> ILayer<B> for Convolution {
    fn exact_num_output_blobs(&self) -> Option<usize> {
        Some(1)
    }
    fn exact_num_input_blobs(&self) -> Option<usize> {
        Some(1)
    }

    fn forward(&mut self, backend: &B, inputs: &[Tensor], phase: Phase) -> Result<Vec<Tensor>> {
        Ok(vec![self.compute_output(backend, single(inputs, "input")?, phase)?])
    }

    fn backward(&mut self, backend: &B, output_gradients: &[Tensor], phase: Phase) -> Result<Vec<Option<Tensor>>> {
        let gradient = single(output_gradients, "output gradient")?;
        Ok(vec![Some(self.compute_input_gradient(backend, gradient, phase)?)])
    }

    fn learnable_weights(&self) -> Option<&LearnableWeights> {
        Some(&self.weights)
    }

    fn learnable_weights_mut(&mut self) -> Option<&mut LearnableWeights> {
        Some(&mut self.weights)
    }
}

#[derive(Debug, Clone)]
#[allow(missing_copy_implementations)]
/// Specifies configuration parameters for a Convolution Layer.
pub struct ConvolutionConfig {
    /// The number of output feature maps
    pub num_output: usize,
    /// The size of the (square) kernel
    pub kernel_size: usize,
    /// The stride size
    ///
    /// Default: 1
    pub stride: usize,
    /// The padding size
    ///
    /// Default: 0
    pub pad: usize,
    /// The number of groups input channels and filters are split into.
    ///
    /// Default: 1
    pub group: usize,
}

impl ConvolutionConfig {
    /// Create a ConvolutionConfig with default stride, padding and group.
    pub fn new(num_output: usize, kernel_size: usize) -> ConvolutionConfig {
        ConvolutionConfig {
            num_output,
            kernel_size,
            stride: 1,
            pad: 0,
            group: 1,
        }
    }
}

impl From<ConvolutionConfig> for LayerType {
    fn from(config: ConvolutionConfig) -> LayerType {
        LayerType::Convolution(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Native;
    use crate::tensor::from_shape_vec;

    #[test]
    fn correct_shapes() {
        let cfg = ConvolutionConfig {
            num_output: 64,
            kernel_size: 11,
            stride: 4,
            pad: 2,
            group: 2,
        };
        let layer = Convolution::from_config(&cfg, &[]);
        let shapes = layer.weight_shapes(4);
        assert_eq!(shapes.weight, vec![11, 11, 2, 64]);
        assert_eq!(shapes.bias, vec![64]);
        assert_eq!(shapes.fan_in, 2 * 121);
    }

    #[test]
    fn group_cache_is_cleared_after_backward() {
        let backend = Native::new();
        let mut cfg = ConvolutionConfig::new(2, 1);
        cfg.group = 2;
        let mut layer = Convolution::from_config(&cfg, &[]);
        let x = from_shape_vec(&[2, 2, 2, 1], vec![1.; 8]).unwrap();
        let y = layer.compute_output(&backend, &x, Phase::Train).unwrap();
        assert_eq!(y.shape(), &[2, 2, 2, 1]);
        assert_eq!(layer.group_inputs().count(), 2);

        let dx = layer.compute_input_gradient(&backend, &y, Phase::Train).unwrap();
        assert_eq!(dx.shape(), x.shape());
        assert_eq!(layer.group_inputs().count(), 0);
        assert!(layer.compute_input_gradient(&backend, &y, Phase::Train).is_err());
    }

    #[test]
    fn rejects_channels_not_divisible_by_group() {
        let backend = Native::new();
        let mut cfg = ConvolutionConfig::new(2, 1);
        cfg.group = 2;
        let mut layer = Convolution::from_config(&cfg, &[]);
        let x = from_shape_vec(&[1, 1, 3, 1], vec![1.; 3]).unwrap();
        assert!(layer.compute_output(&backend, &x, Phase::Train).is_err());
    }
}
