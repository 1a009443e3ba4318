//! Provides the minibatch source consumed by the [Data layer][data].
//!
//! Loading and decoding datasets is not part of this crate. Anything that can
//! hand out minibatches one after another and start over on request
//! implements [DataProvider](./trait.DataProvider.html).
//! [InMemoryProvider](./struct.InMemoryProvider.html) serves samples that
//! are already in memory.
//!
//! [data]: ../layers/utility/data/index.html
use std::fmt;

use ndarray::{Array2, Axis, Slice};

use crate::error::{Error, Result};
use crate::layer::Phase;
use crate::tensor::Tensor;

/// A restartable stream of minibatches.
pub trait DataProvider: fmt::Debug {
    /// Start over from the first minibatch of the dataset for `phase`.
    fn reset(&mut self, phase: Phase) -> Result<()>;

    /// The next minibatch, or `None` once the dataset is exhausted.
    fn next_minibatch(&mut self) -> Result<Option<Minibatch>>;
}

#[derive(Debug, Clone)]
/// Samples and one-hot labels of one minibatch.
pub struct Minibatch {
    /// Samples, `[batch, ...]`
    pub samples: Tensor,
    /// One-hot labels, `[batch, classes]`
    pub labels: Tensor,
}

impl Minibatch {
    /// Create a minibatch, checking that samples and labels agree on the batch size.
    pub fn new(samples: Tensor, labels: Tensor) -> Result<Minibatch> {
        if labels.ndim() != 2 || samples.ndim() == 0 || samples.shape()[0] != labels.shape()[0] {
            return Err(Error::shape("minibatch", samples.shape(), labels.shape()));
        }
        Ok(Minibatch { samples, labels })
    }

    /// Create a minibatch with one-hot labels from class indices.
    pub fn from_labels(samples: Tensor, labels: &[usize], num_classes: usize) -> Result<Minibatch> {
        let mut one_hot = Array2::<f32>::zeros((labels.len(), num_classes));
        for (row, &class) in labels.iter().enumerate() {
            if class >= num_classes {
                return Err(Error::config(
                    "minibatch",
                    format!("label {} out of range for {} classes", class, num_classes),
                ));
            }
            one_hot[[row, class]] = 1f32;
        }
        Minibatch::new(samples, one_hot.into_dyn().into_shared())
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.labels.shape()[0]
    }

    /// Whether the minibatch holds no samples.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
/// Serves sequential minibatches from samples held in memory.
///
/// The last minibatch of a pass is smaller when the number of samples is not
/// a multiple of the batch size.
pub struct InMemoryProvider {
    samples: Tensor,
    labels: Vec<usize>,
    num_classes: usize,
    batch_size: usize,

    cursor: usize,
}

impl InMemoryProvider {
    /// Create a provider over `samples` (`[num_samples, ...]`) and their class indices.
    pub fn new(samples: Tensor, labels: Vec<usize>, num_classes: usize, batch_size: usize) -> Result<InMemoryProvider> {
        if batch_size == 0 {
            return Err(Error::config("in-memory provider", "batch_size must be positive"));
        }
        if samples.ndim() == 0 || samples.shape()[0] != labels.len() {
            return Err(Error::shape("in-memory provider", samples.shape(), &[labels.len()]));
        }
        Ok(InMemoryProvider {
            samples,
            labels,
            num_classes,
            batch_size,
            cursor: 0,
        })
    }
}

impl DataProvider for InMemoryProvider {
    fn reset(&mut self, phase: Phase) -> Result<()> {
        debug!("resetting in-memory provider for {}", phase);
        self.cursor = 0;
        Ok(())
    }

    fn next_minibatch(&mut self) -> Result<Option<Minibatch>> {
        if self.cursor >= self.labels.len() {
            return Ok(None);
        }
        let end = (self.cursor + self.batch_size).min(self.labels.len());
        let samples = self
            .samples
            .slice_axis(Axis(0), Slice::from(self.cursor..end))
            .to_owned()
            .into_shared();
        let batch = Minibatch::from_labels(samples, &self.labels[self.cursor..end], self.num_classes)?;
        self.cursor = end;
        Ok(Some(batch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::from_shape_vec;

    #[test]
    fn one_hot_labels() {
        let samples = from_shape_vec(&[2, 3], vec![0.; 6]).unwrap();
        let batch = Minibatch::from_labels(samples.clone(), &[2, 0], 3).unwrap();
        assert_eq!(batch.labels, from_shape_vec(&[2, 3], vec![0., 0., 1., 1., 0., 0.]).unwrap());
        assert_eq!(batch.len(), 2);
        assert!(Minibatch::from_labels(samples, &[3, 0], 3).is_err());
    }

    #[test]
    fn yields_trailing_partial_batch() {
        let samples = from_shape_vec(&[5, 2], (0..10).map(|v| v as f32).collect()).unwrap();
        let mut provider = InMemoryProvider::new(samples, vec![0, 1, 0, 1, 0], 2, 2).unwrap();
        provider.reset(Phase::Train).unwrap();
        let sizes: Vec<usize> = std::iter::from_fn(|| provider.next_minibatch().unwrap())
            .map(|b| b.len())
            .collect();
        assert_eq!(sizes, vec![2, 2, 1]);

        provider.reset(Phase::Train).unwrap();
        let first = provider.next_minibatch().unwrap().unwrap();
        assert_eq!(first.samples[[1, 1]], 3.);
    }

    #[test]
    fn rejects_mismatched_labels() {
        let samples = from_shape_vec(&[3, 2], vec![0.; 6]).unwrap();
        assert!(InMemoryProvider::new(samples.clone(), vec![0, 1], 2, 1).is_err());
        assert!(InMemoryProvider::new(samples, vec![0, 1, 1], 2, 0).is_err());
    }
}
