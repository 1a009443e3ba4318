//! Applies the nonlinear Log-Sigmoid function.
//!
//! Non-linearity activation function: y = (1 + e^(-x))^(-1)
//!
//! A classic choice in neural networks.
//! But you might consider using ReLu as an alternative.
//!
//! ReLu, compared to Sigmoid
//!
//! * reduces the likelyhood of vanishing gradients
//! * increases the likelyhood of a more beneficial sparse representation
//! * can be computed faster
//! * is therefore the most popular activation function in DNNs as of this
//! writing (2015).
use crate::error::{Error, Result};
use crate::layer::*;
use crate::tensor::Tensor;
use crate::util::LayerOps;

#[derive(Debug, Clone, Default)]
/// Sigmoid Activation Layer
pub struct Sigmoid {
    // output of the last forward pass
    output: Option<Tensor>,
}

impl<B: LayerOps> ComputeOutput<B> for Sigmoid {
    fn compute_output(&mut self, backend: &B, input: &Tensor, _phase: Phase) -> Result<Tensor> {
        let output = backend.sigmoid(input);
        self.output = Some(output.clone());
        Ok(output)
    }
}

impl<B: LayerOps> ComputeInputGradient<B> for Sigmoid {
    fn compute_input_gradient(&mut self, backend: &B, output_gradient: &Tensor, _phase: Phase) -> Result<Tensor> {
        let output = self.output.as_ref().ok_or(Error::Uninitialized("sigmoid output"))?;
        backend.sigmoid_grad(output, output_gradient)
    }
}

impl_ilayer_simple!(Sigmoid);
