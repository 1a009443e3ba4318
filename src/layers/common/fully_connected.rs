//! Applies an affine transformation to the input data `y = W * x + b`
//!
//! The variables are:
//!
//! - `y`: output value, `[num_output, batch]`
//! - `W`: weight (a trainable weight in a neural network), `[num_output, features]`
//! - `x`: input value
//! - `b`: bias, `[num_output, 1]`
//!
//! ## Input
//!
//! The **last dimension is treated as batch size** (`N`). All other
//! dimensions are flattened into `features`, so the layer can directly follow
//! a convolution or pooling layer. The gradient of the input is reshaped back
//! to the shape of the input.
//!
//! The weights are initialized on the first forward pass, when the number of
//! features is known.
use crate::backend::Transpose;
use crate::error::{Error, Result};
use crate::layer::*;
use crate::tensor::{self, Tensor};
use crate::util::LayerOps;
use crate::weight::{LearnableWeights, WeightConfig, WeightShapes};

#[derive(Debug, Clone)]
/// Fully connected Layer
pub struct FullyConnected {
    num_output: usize,

    weights: LearnableWeights,

    // flattened input and original input shape of the last forward pass
    input: Option<(Tensor, Vec<usize>)>,
}

impl FullyConnected {
    /// Create a FullyConnected layer from a FullyConnectedConfig.
    pub fn from_config(config: &FullyConnectedConfig, params: &[WeightConfig]) -> FullyConnected {
        FullyConnected {
            num_output: config.num_output,
            weights: LearnableWeights::new(params),
            input: None,
        }
    }

    fn weight_shapes(&self, features: usize) -> WeightShapes {
        WeightShapes {
            weight: vec![self.num_output, features],
            bias: vec![self.num_output, 1],
            fan_in: features,
            fan_out: self.num_output,
        }
    }
}

impl<B: LayerOps> ComputeOutput<B> for FullyConnected {
    fn compute_output(&mut self, backend: &B, input: &Tensor, _phase: Phase) -> Result<Tensor> {
        if input.ndim() < 2 {
            return Err(Error::shape("fully_connected", input.shape(), &[0, 0]));
        }
        let batch = tensor::batch_size(input.shape());
        let features = input.len() / batch.max(1);
        let flat = backend.reshape(input, &[features, batch])?;

        self.weights.initialize(&self.weight_shapes(features))?;
        let product = backend.gemm(self.weights.weight()?, Transpose::NoTrans, &flat, Transpose::NoTrans)?;
        let output = backend.add(&product, self.weights.bias()?)?;

        self.input = Some((flat, input.shape().to_vec()));
        Ok(output)
    }
}

impl<B: LayerOps> ComputeInputGradient<B> for FullyConnected {
    fn compute_input_gradient(&mut self, backend: &B, output_gradient: &Tensor, _phase: Phase) -> Result<Tensor> {
        let (flat, shape) = self.input.as_ref().ok_or(Error::Uninitialized("fully connected input"))?;
        // gradient w.r.t. weights
        let weight_gradient = backend.gemm(output_gradient, Transpose::NoTrans, flat, Transpose::Trans)?;
        // gradient w.r.t. bias
        let bias_gradient = backend.sum_axis(output_gradient, 1)?;
        // gradient w.r.t. input
        let input_gradient = backend.gemm(self.weights.weight()?, Transpose::Trans, output_gradient, Transpose::NoTrans)?;
        let input_gradient = backend.reshape(&input_gradient, shape)?;

        self.weights.set_gradients(weight_gradient, bias_gradient);
        Ok(input_gradient)
    }
}

impl<B: LayerOps> ILayer<B> for FullyConnected {
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
/// Specifies configuration parameters for a FullyConnected Layer.
pub struct FullyConnectedConfig {
    /// The number of output values
    pub num_output: usize,
}

impl From<FullyConnectedConfig> for LayerType {
    fn from(config: FullyConnectedConfig) -> LayerType {
        LayerType::FullyConnected(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Native;
    use crate::tensor::from_shape_vec;

    #[test]
    fn flattens_and_restores_shape() {
        let backend = Native::new();
        let mut layer = FullyConnected::from_config(&FullyConnectedConfig { num_output: 2 }, &[]);
        layer.weights.set(
            from_shape_vec(&[2, 4], vec![1., 0., 0., 0., 0., 1., 1., 1.]).unwrap(),
            from_shape_vec(&[2, 1], vec![0.5, -0.5]).unwrap(),
        );
        // two samples of [2, 2, 1]
        let x = from_shape_vec(&[2, 2, 1, 2], vec![1., 2., 3., 4., 5., 6., 7., 8.]).unwrap();
        let y = layer.compute_output(&backend, &x, Phase::Train).unwrap();
        assert_eq!(y.shape(), &[2, 2]);
        // features of sample 0 are 1, 3, 5, 7
        assert_eq!(y[[0, 0]], 1.5);
        assert_eq!(y[[1, 0]], 14.5);

        let g = from_shape_vec(&[2, 2], vec![1., 0., 0., 1.]).unwrap();
        let dx = layer.compute_input_gradient(&backend, &g, Phase::Train).unwrap();
        assert_eq!(dx.shape(), x.shape());
        assert_eq!(layer.weights.bias_gradient().unwrap(), &from_shape_vec(&[2, 1], vec![1., 1.]).unwrap());
        assert_eq!(layer.weights.weight_gradient().unwrap().shape(), &[2, 4]);
    }

    #[test]
    fn initializes_from_fillers() {
        let backend = Native::new();
        let mut layer = FullyConnected::from_config(&FullyConnectedConfig { num_output: 3 }, &[]);
        let x = from_shape_vec(&[5, 4], vec![0.1; 20]).unwrap();
        layer.compute_output(&backend, &x, Phase::Test).unwrap();
        assert_eq!(layer.weights.weight().unwrap().shape(), &[3, 5]);
        assert!(layer.weights.bias().unwrap().iter().all(|&b| b == 0.));
    }
}
