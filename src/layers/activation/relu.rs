//! Applies the nonlinear Rectified Linear Unit.
//!
//! Non-linearity activation function: y = max(0, x)
//!
//! This is generally the preferred choice over Sigmod or TanH.
//! The max function used in ReLU is usually faster to compute than the exponentiation
//! needed in a Sigmoid layer.
use crate::error::{Error, Result};
use crate::layer::*;
use crate::tensor::Tensor;
use crate::util::LayerOps;

#[derive(Debug, Clone, Default)]
/// ReLU Activation Layer
pub struct ReLU {
    input: Option<Tensor>,
}

impl<B: LayerOps> ComputeOutput<B> for ReLU {
    fn compute_output(&mut self, backend: &B, input: &Tensor, _phase: Phase) -> Result<Tensor> {
        self.input = Some(input.clone());
        Ok(backend.relu(input))
    }
}

impl<B: LayerOps> ComputeInputGradient<B> for ReLU {
    fn compute_input_gradient(&mut self, backend: &B, output_gradient: &Tensor, _phase: Phase) -> Result<Tensor> {
        let input = self.input.as_ref().ok_or(Error::Uninitialized("relu input"))?;
        backend.relu_grad(input, output_gradient)
    }
}

impl_ilayer_simple!(ReLU);
