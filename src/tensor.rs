//! Provides the tensor type flowing between layers.
//!
//! Tensors are reference-counted n-dimensional arrays, so handing the same
//! activation to several consumers is a pointer copy. All layers agree on a
//! batch-last layout:
//!
//! - images: `[width, height, channels, batch]`
//! - convolution filters: `[kernel_w, kernel_h, channels, num_output]`
//! - fully-connected weights: `[num_output, features]`
//! - labels and class scores: `[classes, batch]`
use std::collections::HashMap;

use ndarray::{ArcArray, IxDyn};

/// N-dimensional `f32` array shared between layers.
pub type Tensor = ArcArray<f32, IxDyn>;

/// Tensors keyed by port name.
pub type Ports = HashMap<String, Tensor>;

/// Number of elements of a tensor with the given shape.
pub fn size(shape: &[usize]) -> usize {
    shape.iter().product()
}

/// Extent of the batch axis (the last one).
pub fn batch_size(shape: &[usize]) -> usize {
    shape.last().copied().unwrap_or(1)
}

/// Render a shape as `"2 3 2 (3)"`: the extents followed by the rank.
pub fn shape_string(shape: &[usize]) -> String {
    let mut string = String::new();
    for dim in shape {
        string.push_str(&dim.to_string());
        string.push(' ');
    }
    string.push('(');
    string.push_str(&shape.len().to_string());
    string.push(')');

    string
}

/// Create a tensor from a shape and row-major data.
pub fn from_shape_vec(shape: &[usize], data: Vec<f32>) -> crate::Result<Tensor> {
    Ok(ndarray::ArrayD::from_shape_vec(IxDyn(shape), data)?.into_shared())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_of_shape() {
        let t = from_shape_vec(&[2, 3, 2], vec![0f32; 12]).unwrap();
        assert_eq!(12, size(t.shape()));
        assert_eq!(2, batch_size(t.shape()));
    }

    #[test]
    fn rejects_mismatched_data() {
        assert!(from_shape_vec(&[2, 3], vec![0f32; 5]).is_err());
    }

    #[test]
    fn shape_string() {
        assert_eq!("2 3 2 (3)", super::shape_string(&[2, 3, 2]));
        assert_eq!("(0)", super::shape_string(&[]));
    }
}
