//! Feeds minibatches from a [DataProvider][provider] into the network.
//!
//! The layer has no inputs and two outputs: the samples, reshaped to
//! `sample_shape + [batch]`, and the one-hot labels as `[classes, batch]`.
//!
//! The provider is reset the first time the layer runs. When it runs out of
//! minibatches it is reset and read again, so a network can train for any
//! number of iterations. Empty minibatches are skipped, but a provider that
//! yields nothing else for `MAX_EMPTY_MINIBATCHES` reads in a row counts as
//! an empty dataset.
//!
//! [provider]: ../../../data/trait.DataProvider.html
use crate::data::DataProvider;
use crate::error::{Error, Result};
use crate::layer::*;
use crate::tensor::{self, Tensor};
use crate::util::{ArcLock, LayerOps};

/// Consecutive empty minibatches after which the dataset is considered empty.
pub const MAX_EMPTY_MINIBATCHES: usize = 1024;

#[derive(Debug, Clone)]
/// Data Layer
pub struct Data {
    sample_shape: Vec<usize>,
    provider: ArcLock<dyn DataProvider>,

    started: bool,
}

impl Data {
    /// Create a Data layer from a DataConfig.
    pub fn from_config(config: &DataConfig) -> Data {
        Data {
            sample_shape: config.sample_shape.clone(),
            provider: config.provider.clone(),
            started: false,
        }
    }
}

impl<B: LayerOps> ILayer<B> for Data {
    fn exact_num_output_blobs(&self) -> Option<usize> {
        Some(2)
    }
    fn exact_num_input_blobs(&self) -> Option<usize> {
        Some(0)
    }

    fn forward(&mut self, backend: &B, _inputs: &[Tensor], phase: Phase) -> Result<Vec<Tensor>> {
        let mut provider = self
            .provider
            .write()
            .map_err(|_| Error::Data("data provider lock poisoned".into()))?;
        if !self.started {
            provider.reset(phase)?;
            self.started = true;
        }

        let mut restarted = false;
        let mut empty = 0;
        let batch = loop {
            match provider.next_minibatch()? {
                Some(batch) if batch.is_empty() => {
                    empty += 1;
                    if empty >= MAX_EMPTY_MINIBATCHES {
                        return Err(Error::EmptyDataset);
                    }
                }
                Some(batch) => break batch,
                None if restarted => return Err(Error::EmptyDataset),
                None => {
                    info!("Have scanned the whole dataset, starting from the beginning again");
                    provider.reset(phase)?;
                    restarted = true;
                }
            }
        };

        let batch_size = batch.len();
        let features = batch.samples.len() / batch_size;
        if features != tensor::size(&self.sample_shape) {
            return Err(Error::shape("data", batch.samples.shape(), &self.sample_shape));
        }
        let samples = backend.reshape(&batch.samples, &[batch_size, features])?;
        let samples = backend.transpose(&samples)?;
        let mut shape = self.sample_shape.clone();
        shape.push(batch_size);
        let samples = backend.reshape(&samples, &shape)?;
        let labels = backend.transpose(&batch.labels)?;

        Ok(vec![samples, labels])
    }

    fn backward(&mut self, _backend: &B, _output_gradients: &[Tensor], _phase: Phase) -> Result<Vec<Option<Tensor>>> {
        Ok(Vec::new())
    }

    fn requires_output_gradients(&self) -> bool {
        false
    }

    fn is_data(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone)]
/// Specifies configuration parameters for a Data Layer.
pub struct DataConfig {
    /// The shape of a single sample, e.g. `[width, height, channels]`.
    pub sample_shape: Vec<usize>,
    /// The source of the minibatches.
    pub provider: ArcLock<dyn DataProvider>,
}

impl From<DataConfig> for LayerType {
    fn from(config: DataConfig) -> LayerType {
        LayerType::Data(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Native;
    use crate::data::{InMemoryProvider, Minibatch};
    use crate::tensor::from_shape_vec;
    use std::sync::{Arc, RwLock};

    fn layer(num_samples: usize, batch_size: usize) -> Data {
        let samples = from_shape_vec(&[num_samples, 2, 1], (0..num_samples * 2).map(|v| v as f32).collect()).unwrap();
        let labels = (0..num_samples).map(|i| i % 3).collect();
        let provider = InMemoryProvider::new(samples, labels, 3, batch_size).unwrap();
        Data::from_config(&DataConfig {
            sample_shape: vec![2, 1],
            provider: Arc::new(RwLock::new(provider)),
        })
    }

    #[test]
    fn batch_moves_to_last_axis() {
        let backend = Native::new();
        let mut data = layer(4, 2);
        let out = ILayer::<Native>::forward(&mut data, &backend, &[], Phase::Train).unwrap();
        assert_eq!(out[0].shape(), &[2, 1, 2]);
        // second sample, first feature
        assert_eq!(out[0][[0, 0, 1]], 2.);
        assert_eq!(out[1].shape(), &[3, 2]);
        assert_eq!(out[1][[1, 1]], 1.);
    }

    #[test]
    fn restarts_on_exhaustion() {
        let backend = Native::new();
        let mut data = layer(3, 2);
        let sizes: Vec<usize> = (0..4)
            .map(|_| ILayer::<Native>::forward(&mut data, &backend, &[], Phase::Train).unwrap()[1].shape()[1])
            .collect();
        assert_eq!(sizes, vec![2, 1, 2, 1]);
    }

    #[derive(Debug)]
    struct Empty;

    impl DataProvider for Empty {
        fn reset(&mut self, _phase: Phase) -> Result<()> {
            Ok(())
        }
        fn next_minibatch(&mut self) -> Result<Option<Minibatch>> {
            Ok(None)
        }
    }

    #[test]
    fn empty_dataset_is_an_error() {
        let backend = Native::new();
        let mut data = Data::from_config(&DataConfig {
            sample_shape: vec![1],
            provider: Arc::new(RwLock::new(Empty)),
        });
        assert!(matches!(
            ILayer::<Native>::forward(&mut data, &backend, &[], Phase::Test),
            Err(Error::EmptyDataset)
        ));
    }

    #[derive(Debug, Default)]
    struct AlwaysEmpty {
        reads: usize,
    }

    impl DataProvider for AlwaysEmpty {
        fn reset(&mut self, _phase: Phase) -> Result<()> {
            Ok(())
        }
        fn next_minibatch(&mut self) -> Result<Option<Minibatch>> {
            self.reads += 1;
            let samples = from_shape_vec(&[0, 1], Vec::new())?;
            Minibatch::from_labels(samples, &[], 1).map(Some)
        }
    }

    #[test]
    fn endless_empty_minibatches_are_an_error() {
        let backend = Native::new();
        let provider = Arc::new(RwLock::new(AlwaysEmpty::default()));
        let mut data = Data::from_config(&DataConfig {
            sample_shape: vec![1],
            provider: provider.clone(),
        });
        assert!(matches!(
            ILayer::<Native>::forward(&mut data, &backend, &[], Phase::Train),
            Err(Error::EmptyDataset)
        ));
        assert_eq!(provider.read().unwrap().reads, MAX_EMPTY_MINIBATCHES);
    }
}
