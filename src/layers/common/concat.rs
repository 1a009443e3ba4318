//! Concatenates several inputs along one axis.
//!
//! The axis is given with [Caffe][caffe] numbering, where `0` is the
//! outermost (batch) axis. Since tensors here keep the batch as the last
//! axis, `concat_dim` selects axis `rank - 1 - concat_dim`. The default of
//! `1` concatenates channels.
//!
//! The backward pass splits the gradient into the extents of the inputs, in
//! input order.
//!
//! [caffe]: http://caffe.berkeleyvision.org/tutorial/layers.html
use crate::error::{Error, Result};
use crate::layer::*;
use crate::tensor::Tensor;
use crate::util::LayerOps;

#[derive(Debug, Clone)]
/// Concat Layer
pub struct Concat {
    concat_dim: usize,

    // axis and per-input extents of the last forward pass
    axis: usize,
    extents: Vec<usize>,
}

impl Concat {
    /// Create a Concat layer from a ConcatConfig.
    pub fn from_config(config: &ConcatConfig) -> Concat {
        Concat {
            concat_dim: config.concat_dim,
            axis: 0,
            extents: Vec::new(),
        }
    }
}

impl<B: LayerOps> ILayer<B> for Concat {
    fn exact_num_output_blobs(&self) -> Option<usize> {
        Some(1)
    }

    fn forward(&mut self, backend: &B, inputs: &[Tensor], _phase: Phase) -> Result<Vec<Tensor>> {
        let rank = single(inputs, "input")?.ndim();
        if self.concat_dim >= rank {
            return Err(Error::shape("concat", inputs[0].shape(), &[self.concat_dim]));
        }
        self.axis = rank - 1 - self.concat_dim;
        let axis = self.axis;
        self.extents = inputs.iter().map(|input| input.shape().get(axis).copied().unwrap_or(0)).collect();

        Ok(vec![backend.concat(inputs, self.axis)?])
    }

    fn backward(&mut self, backend: &B, output_gradients: &[Tensor], _phase: Phase) -> Result<Vec<Option<Tensor>>> {
        let gradient = single(output_gradients, "output gradient")?;
        if self.extents.is_empty() {
            return Err(Error::Uninitialized("concat extents"));
        }
        let mut offset = 0;
        let mut input_gradients = Vec::with_capacity(self.extents.len());
        for &extent in &self.extents {
            input_gradients.push(Some(backend.slice(gradient, self.axis, offset, extent)?));
            offset += extent;
        }
        Ok(input_gradients)
    }
}

#[derive(Debug, Copy, Clone)]
/// Specifies configuration parameters for a Concat Layer.
pub struct ConcatConfig {
    /// The axis to concatenate along, counted from the outermost axis.
    ///
    /// Default: 1
    pub concat_dim: usize,
}

impl Default for ConcatConfig {
    fn default() -> ConcatConfig {
        ConcatConfig { concat_dim: 1 }
    }
}

impl From<ConcatConfig> for LayerType {
    fn from(config: ConcatConfig) -> LayerType {
        LayerType::Concat(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Native;
    use crate::tensor::from_shape_vec;

    #[test]
    fn splits_gradient_into_input_extents() {
        let backend = Native::new();
        let mut layer = Concat::from_config(&ConcatConfig::default());
        let a = from_shape_vec(&[1, 1, 1, 2], vec![1., 2.]).unwrap();
        let b = from_shape_vec(&[1, 1, 2, 2], vec![3., 4., 5., 6.]).unwrap();
        let y = ILayer::<Native>::forward(&mut layer, &backend, &[a.clone(), b.clone()], Phase::Train).unwrap();
        assert_eq!(y[0].shape(), &[1, 1, 3, 2]);

        let grads = ILayer::<Native>::backward(&mut layer, &backend, &y, Phase::Train).unwrap();
        assert_eq!(grads.len(), 2);
        assert_eq!(grads[0].as_ref().unwrap(), &a);
        assert_eq!(grads[1].as_ref().unwrap(), &b);
    }

    #[test]
    fn repeated_forward_resets_extents() {
        let backend = Native::new();
        let mut layer = Concat::from_config(&ConcatConfig { concat_dim: 0 });
        let a = from_shape_vec(&[2, 1], vec![1., 2.]).unwrap();
        for _ in 0..2 {
            ILayer::<Native>::forward(&mut layer, &backend, &[a.clone(), a.clone()], Phase::Test).unwrap();
        }
        assert_eq!(layer.extents, vec![1, 1]);
        assert_eq!(layer.axis, 1);
    }
}
