//! Applies the nonlinear TanH function.
//!
//! Non-linearity activation function: y = sinh(x) / cosh(x)
//!
//! You might consider using ReLU as an alternative.
//!
//! ReLU, compared to TanH:
//!
//! * reduces the likelyhood of vanishing gradients
//! * increases the likelyhood of a more beneficial sparse representation
//! * can be computed faster
//! * is therefore the most popular activation function in DNNs as of this writing (2016).
use crate::error::{Error, Result};
use crate::layer::*;
use crate::tensor::Tensor;
use crate::util::LayerOps;

#[derive(Debug, Clone, Default)]
/// TanH Activation Layer
pub struct TanH {
    output: Option<Tensor>,
}

impl<B: LayerOps> ComputeOutput<B> for TanH {
    fn compute_output(&mut self, backend: &B, input: &Tensor, _phase: Phase) -> Result<Tensor> {
        let output = backend.tanh(input);
        self.output = Some(output.clone());
        Ok(output)
    }
}

impl<B: LayerOps> ComputeInputGradient<B> for TanH {
    fn compute_input_gradient(&mut self, backend: &B, output_gradient: &Tensor, _phase: Phase) -> Result<Tensor> {
        let output = self.output.as_ref().ok_or(Error::Uninitialized("tanh output"))?;
        backend.tanh_grad(output, output_gradient)
    }
}

impl_ilayer_simple!(TanH);
