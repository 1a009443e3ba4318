//! Passes the input through unchanged.
//!
//! Identity activation function: y = x
//!
//! Useful as a named junction in a network, e.g. to expose an intermediate
//! result under a port of its own.
use crate::error::Result;
use crate::layer::*;
use crate::tensor::Tensor;
use crate::util::LayerOps;

#[derive(Debug, Clone, Copy, Default)]
/// Linear (identity) Activation Layer
pub struct Linear;

impl<B: LayerOps> ComputeOutput<B> for Linear {
    fn compute_output(&mut self, _backend: &B, input: &Tensor, _phase: Phase) -> Result<Tensor> {
        Ok(input.clone())
    }
}

impl<B: LayerOps> ComputeInputGradient<B> for Linear {
    fn compute_input_gradient(&mut self, _backend: &B, output_gradient: &Tensor, _phase: Phase) -> Result<Tensor> {
        Ok(output_gradient.clone())
    }
}

impl_ilayer_simple!(Linear);
