//! Provides the tensor operations layers are built from.
//!
//! Layers never touch tensor memory directly. Every computation goes through
//! a backend implementing the operation traits below, so the same network can
//! run on any device a backend exists for. The traits are grouped by concern,
//! the way the operations are usually provided by separate libraries (BLAS,
//! a neural network kernel library, ...). [LayerOps][layer_ops] bundles all of
//! them.
//!
//! All operations check the shapes of their operands and fail with
//! [Error::ShapeMismatch][shape] instead of producing garbage.
//!
//! The crate ships a host backend, [Native][native], behind the default
//! `native` feature.
//!
//! [layer_ops]: ../util/trait.LayerOps.html
//! [shape]: ../error/enum.Error.html#variant.ShapeMismatch
//! [native]: ./native/struct.Native.html
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::tensor::Tensor;

#[cfg(feature = "native")]
pub mod native;

#[cfg(feature = "native")]
pub use self::native::Native;

/// Common behaviour of every backend.
pub trait IBackend: fmt::Debug {
    /// Block until every operation issued so far has completed.
    ///
    /// Backends that dispatch asynchronously must make results readable
    /// after this returns. Synchronous backends keep the default.
    fn synchronize(&self) -> Result<()> {
        Ok(())
    }
}

/// Elementwise arithmetic.
pub trait Elementwise {
    /// A tensor of zeros.
    fn zeros(&self, shape: &[usize]) -> Tensor;
    /// `a + b`. `b` may be broadcast to the shape of `a`.
    fn add(&self, a: &Tensor, b: &Tensor) -> Result<Tensor>;
    /// `a - b`. `b` may be broadcast to the shape of `a`.
    fn sub(&self, a: &Tensor, b: &Tensor) -> Result<Tensor>;
    /// `a * b`. `b` may be broadcast to the shape of `a`.
    fn mul(&self, a: &Tensor, b: &Tensor) -> Result<Tensor>;
    /// `alpha * x`
    fn scale(&self, alpha: f32, x: &Tensor) -> Tensor;
    /// `a * x + b * y`
    fn axpby(&self, a: f32, x: &Tensor, b: f32, y: &Tensor) -> Result<Tensor>;
    /// Natural logarithm.
    fn ln(&self, x: &Tensor) -> Tensor;
}

/// Nonlinear activation functions and their derivatives.
pub trait Activation {
    /// `1 / (1 + e^-x)`
    fn sigmoid(&self, x: &Tensor) -> Tensor;
    /// Gradient of the sigmoid given its output `y` and the output gradient.
    fn sigmoid_grad(&self, y: &Tensor, dy: &Tensor) -> Result<Tensor>;
    /// `max(x, 0)`
    fn relu(&self, x: &Tensor) -> Tensor;
    /// Gradient of the ReLU given its input `x` and the output gradient.
    fn relu_grad(&self, x: &Tensor, dy: &Tensor) -> Result<Tensor>;
    /// `tanh(x)`
    fn tanh(&self, x: &Tensor) -> Tensor;
    /// Gradient of tanh given its output `y` and the output gradient.
    fn tanh_grad(&self, y: &Tensor, dy: &Tensor) -> Result<Tensor>;
}

/// Whether a matrix operand is used as is or transposed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Transpose {
    /// Use the matrix as stored.
    NoTrans,
    /// Use the transpose of the matrix.
    Trans,
}

/// Matrix operations on 2-D tensors.
pub trait Blas {
    /// `op(a) · op(b)`
    fn gemm(&self, a: &Tensor, trans_a: Transpose, b: &Tensor, trans_b: Transpose) -> Result<Tensor>;
    /// The transpose of a matrix.
    fn transpose(&self, a: &Tensor) -> Result<Tensor>;
}

/// Shape manipulation and reductions.
pub trait Shaping {
    /// The same elements in row-major order under a new shape.
    fn reshape(&self, x: &Tensor, shape: &[usize]) -> Result<Tensor>;
    /// `length` entries of `x` along `axis`, starting at `offset`.
    fn slice(&self, x: &Tensor, axis: usize, offset: usize, length: usize) -> Result<Tensor>;
    /// Join tensors along `axis`.
    fn concat(&self, xs: &[Tensor], axis: usize) -> Result<Tensor>;
    /// Sum along `axis`, keeping it with extent 1.
    fn sum_axis(&self, x: &Tensor, axis: usize) -> Result<Tensor>;
    /// Sum of all elements.
    fn sum(&self, x: &Tensor) -> f32;
    /// Index of the largest entry of every lane along `axis`.
    ///
    /// Lanes are visited in row-major order of the remaining axes.
    fn argmax(&self, x: &Tensor, axis: usize) -> Result<Vec<usize>>;
}

/// Padding and stride of a 2-D convolution.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ConvInfo {
    /// Zero padding above and below.
    pub pad_height: usize,
    /// Zero padding left and right.
    pub pad_width: usize,
    /// Step between vertical filter positions.
    pub stride_vertical: usize,
    /// Step between horizontal filter positions.
    pub stride_horizontal: usize,
}

/// 2-D convolution on `[width, height, channels, batch]` tensors.
pub trait Convolution {
    /// Cross-correlate `x` with `filter` (`[kernel_w, kernel_h, channels, num_output]`)
    /// and add `bias` (`[num_output]`).
    fn convolution(&self, x: &Tensor, filter: &Tensor, bias: &Tensor, info: &ConvInfo) -> Result<Tensor>;
    /// Gradient with respect to the input.
    fn convolution_grad_data(&self, dy: &Tensor, x: &Tensor, filter: &Tensor, info: &ConvInfo) -> Result<Tensor>;
    /// Gradient with respect to the filter.
    fn convolution_grad_filter(&self, dy: &Tensor, x: &Tensor, filter: &Tensor, info: &ConvInfo) -> Result<Tensor>;
    /// Gradient with respect to the bias.
    fn convolution_grad_bias(&self, dy: &Tensor) -> Result<Tensor>;
}

/// The different modes of pooling that can be calculated.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PoolingMode {
    /// The maximum value inside the pooling window will be used as result.
    Max,
    /// The average of all values inside the pooling window will be used as result.
    Average,
}

impl FromStr for PoolingMode {
    type Err = Error;

    /// Parse the Caffe names `MAX` and `AVE`.
    fn from_str(s: &str) -> Result<PoolingMode> {
        match s {
            "MAX" => Ok(PoolingMode::Max),
            "AVE" => Ok(PoolingMode::Average),
            other => Err(Error::config("pooling", format!("unknown pooling method `{}`", other))),
        }
    }
}

/// Window geometry of a 2-D pooling.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PoolingInfo {
    /// Window height.
    pub height: usize,
    /// Window width.
    pub width: usize,
    /// Step between vertical window positions.
    pub stride_vertical: usize,
    /// Step between horizontal window positions.
    pub stride_horizontal: usize,
    /// Padding above and below.
    pub pad_height: usize,
    /// Padding left and right.
    pub pad_width: usize,
    /// How a window is reduced.
    pub mode: PoolingMode,
}

/// 2-D pooling on `[width, height, channels, batch]` tensors.
pub trait Pooling {
    /// Reduce every window of `x`.
    fn pooling(&self, x: &Tensor, info: &PoolingInfo) -> Result<Tensor>;
    /// Route `dy` back through the windows, given the pooling input `x` and output `y`.
    fn pooling_grad(&self, dy: &Tensor, y: &Tensor, x: &Tensor, info: &PoolingInfo) -> Result<Tensor>;
}

/// Parameters of a cross-channel local response normalization.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LrnInfo {
    /// Number of channels summed over.
    pub local_size: usize,
    /// Scaling parameter.
    pub alpha: f32,
    /// Exponent.
    pub beta: f32,
}

/// Local response normalization across the channel axis (axis 2).
pub trait Lrn {
    /// Returns the normalized output and the per-element scale
    /// `1 + alpha / local_size * sum(x²)` needed by the gradient.
    fn lrn(&self, x: &Tensor, info: &LrnInfo) -> Result<(Tensor, Tensor)>;
    /// Gradient given the input, output and scale of the forward call.
    fn lrn_grad(&self, x: &Tensor, y: &Tensor, scale: &Tensor, dy: &Tensor, info: &LrnInfo) -> Result<Tensor>;
}

/// Softmax over instances.
pub trait Softmax {
    /// Softmax of every instance of a 4-D tensor, over all axes but the last.
    fn softmax(&self, x: &Tensor) -> Result<Tensor>;
}

/// Random tensors.
pub trait Random {
    /// A tensor whose elements are `1` with probability `p` and `0` otherwise.
    fn bernoulli(&self, shape: &[usize], p: f32) -> Result<Tensor>;
}
