//! Computes the softmax of the predictions and their cross-entropy loss.
//!
//! Takes two inputs, the predictions and the one-hot labels (both
//! `[classes, batch]` or any shape with the batch as last axis), and produces
//! the softmax probabilities.
//!
//! The softmax is computed per instance over all non-batch axes. Inputs of
//! lower rank are viewed as 4D for it and the output keeps the input shape.
//!
//! The loss is `-sum(label * ln(softmax)) / batch_size`. A probability of
//! exactly `0` for a labelled class makes the loss infinite (or NaN); the
//! value is reported as computed.
//!
//! The gradient of the predictions is `(softmax - label)`, scaled by the loss
//! weight when one is configured. The labels receive no gradient.
use crate::error::{Error, Result};
use crate::layer::*;
use crate::tensor::{self, Tensor};
use crate::util::LayerOps;

#[derive(Debug, Clone)]
/// Softmax with Loss Layer
pub struct SoftmaxLoss {
    loss_weight: Option<f32>,

    output: Option<Tensor>,
    label: Option<Tensor>,
    loss: Option<f32>,
}

impl SoftmaxLoss {
    /// Create a SoftmaxLoss layer scaling its gradient by `loss_weight`.
    pub fn new(loss_weight: Option<f32>) -> SoftmaxLoss {
        SoftmaxLoss {
            loss_weight,
            output: None,
            label: None,
            loss: None,
        }
    }

    /// `shape[..-1] + 1s + [batch]`, padded to rank 4.
    fn instance_shape(shape: &[usize]) -> Option<Vec<usize>> {
        let (batch, rest) = shape.split_last()?;
        if rest.len() > 3 {
            return None;
        }
        let mut padded = rest.to_vec();
        padded.resize(3, 1);
        padded.push(*batch);
        Some(padded)
    }
}

impl<B: LayerOps> ILayer<B> for SoftmaxLoss {
    fn exact_num_output_blobs(&self) -> Option<usize> {
        Some(1)
    }
    fn exact_num_input_blobs(&self) -> Option<usize> {
        Some(2)
    }

    fn forward(&mut self, backend: &B, inputs: &[Tensor], _phase: Phase) -> Result<Vec<Tensor>> {
        let (prediction, label) = match inputs {
            [prediction, label] => (prediction, label),
            _ => return Err(Error::Uninitialized("prediction and label")),
        };
        if prediction.shape() != label.shape() {
            return Err(Error::shape("softmax_loss", prediction.shape(), label.shape()));
        }
        let shape = prediction.shape().to_vec();
        let instance_shape =
            Self::instance_shape(&shape).ok_or_else(|| Error::shape("softmax_loss", &shape, &[0, 0, 0, 0]))?;

        let output = backend.softmax(&backend.reshape(prediction, &instance_shape)?)?;
        let output = backend.reshape(&output, &shape)?;

        let log_likelihood = backend.sum(&backend.mul(&backend.ln(&output), label)?);
        self.loss = Some(-log_likelihood / tensor::batch_size(&shape) as f32);
        self.output = Some(output.clone());
        self.label = Some(label.clone());

        Ok(vec![output])
    }

    fn backward(&mut self, backend: &B, _output_gradients: &[Tensor], _phase: Phase) -> Result<Vec<Option<Tensor>>> {
        let output = self.output.as_ref().ok_or(Error::Uninitialized("softmax output"))?;
        let label = self.label.as_ref().ok_or(Error::Uninitialized("softmax label"))?;
        let mut gradient = backend.sub(output, label)?;
        if let Some(weight) = self.loss_weight {
            gradient = backend.scale(weight, &gradient);
        }
        Ok(vec![Some(gradient), None])
    }

    fn requires_output_gradients(&self) -> bool {
        false
    }

    fn is_loss(&self) -> bool {
        true
    }

    fn loss(&self) -> Option<f32> {
        self.loss
    }
}
