//! Measures the share of correctly classified instances.
//!
//! Takes the predictions and the one-hot labels, both with the classes on the
//! first and the batch on the last axis. An instance counts as correct when
//! the arg-max of its prediction equals the arg-max of its label.
//!
//! The layer only observes: it produces no outputs and no gradients.
use crate::error::{Error, Result};
use crate::layer::*;
use crate::tensor::{self, Tensor};
use crate::util::LayerOps;

#[derive(Debug, Clone, Default)]
/// Accuracy Layer
pub struct Accuracy {
    accuracy: Option<f32>,
    batch_size: usize,
}

impl Accuracy {
    /// Number of instances measured by the last forward pass.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn classes<B: LayerOps>(backend: &B, t: &Tensor) -> Result<Vec<usize>> {
        let batch = tensor::batch_size(t.shape());
        let flat = backend.reshape(t, &[t.len() / batch.max(1), batch])?;
        backend.argmax(&flat, 0)
    }
}

impl<B: LayerOps> ILayer<B> for Accuracy {
    fn exact_num_output_blobs(&self) -> Option<usize> {
        Some(0)
    }
    fn exact_num_input_blobs(&self) -> Option<usize> {
        Some(2)
    }

    fn forward(&mut self, backend: &B, inputs: &[Tensor], _phase: Phase) -> Result<Vec<Tensor>> {
        let (prediction, label) = match inputs {
            [prediction, label] => (prediction, label),
            _ => return Err(Error::Uninitialized("prediction and label")),
        };
        let predicted = Self::classes(backend, prediction)?;
        let expected = Self::classes(backend, label)?;
        if predicted.len() != expected.len() {
            return Err(Error::shape("accuracy", prediction.shape(), label.shape()));
        }

        let correct = predicted.iter().zip(&expected).filter(|(p, e)| p == e).count();
        self.batch_size = predicted.len();
        self.accuracy = Some(correct as f32 / self.batch_size as f32);
        Ok(Vec::new())
    }

    fn backward(&mut self, _backend: &B, _output_gradients: &[Tensor], _phase: Phase) -> Result<Vec<Option<Tensor>>> {
        Ok(vec![None, None])
    }

    fn requires_output_gradients(&self) -> bool {
        false
    }

    fn is_accuracy(&self) -> bool {
        true
    }

    fn accuracy(&self) -> Option<f32> {
        self.accuracy
    }
}
