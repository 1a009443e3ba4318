//! Provides the host backend.
//!
//! Every operation is a straightforward loop or ndarray expression over
//! `f32` tensors in host memory. Nothing is dispatched asynchronously, so
//! [synchronize][sync] is a no-op.
//!
//! [sync]: ../trait.IBackend.html#method.synchronize
use std::cell::RefCell;

use ndarray::{concatenate, ArrayD, ArrayView2, ArrayView4, Axis, Ix2, Ix4, IxDyn, Slice, Zip};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Bernoulli, Distribution};

use super::*;
use crate::error::{Error, Result};
use crate::tensor::{self, Tensor};

mod conv;
mod lrn;
mod pool;

/// Backend computing on the host with ndarray.
#[derive(Debug)]
pub struct Native {
    rng: RefCell<StdRng>,
}

impl Native {
    /// Create a backend with an entropy-seeded random source.
    pub fn new() -> Native {
        Native {
            rng: RefCell::new(StdRng::from_entropy()),
        }
    }

    /// Create a backend whose random masks are reproducible.
    pub fn with_seed(seed: u64) -> Native {
        Native {
            rng: RefCell::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for Native {
    fn default() -> Native {
        Native::new()
    }
}

impl IBackend for Native {}

/// Combine `a` with `b` broadcast to the shape of `a`.
fn zip_broadcast<F>(operation: &'static str, a: &Tensor, b: &Tensor, f: F) -> Result<Tensor>
where
    F: Fn(f32, f32) -> f32,
{
    let b_view = b
        .broadcast(a.raw_dim())
        .ok_or_else(|| Error::shape(operation, a.shape(), b.shape()))?;
    Ok(Zip::from(a).and(&b_view).map_collect(|&x, &y| f(x, y)).into_shared())
}

/// Combine two tensors of identical shape.
fn zip_exact<F>(operation: &'static str, a: &Tensor, b: &Tensor, f: F) -> Result<Tensor>
where
    F: Fn(f32, f32) -> f32,
{
    if a.shape() != b.shape() {
        return Err(Error::shape(operation, a.shape(), b.shape()));
    }
    Ok(Zip::from(a).and(b).map_collect(|&x, &y| f(x, y)).into_shared())
}

fn matrix<'a>(operation: &'static str, t: &'a Tensor) -> Result<ArrayView2<'a, f32>> {
    t.view()
        .into_dimensionality::<Ix2>()
        .map_err(|_| Error::shape(operation, t.shape(), &[0, 0]))
}

pub(crate) fn image<'a>(operation: &'static str, t: &'a Tensor) -> Result<ArrayView4<'a, f32>> {
    t.view()
        .into_dimensionality::<Ix4>()
        .map_err(|_| Error::shape(operation, t.shape(), &[0, 0, 0, 0]))
}

fn check_axis(operation: &'static str, x: &Tensor, axis: usize) -> Result<()> {
    if axis >= x.ndim() {
        return Err(Error::shape(operation, x.shape(), &[axis]));
    }
    Ok(())
}

impl Elementwise for Native {
    fn zeros(&self, shape: &[usize]) -> Tensor {
        ArrayD::zeros(IxDyn(shape)).into_shared()
    }

    fn add(&self, a: &Tensor, b: &Tensor) -> Result<Tensor> {
        zip_broadcast("add", a, b, |x, y| x + y)
    }

    fn sub(&self, a: &Tensor, b: &Tensor) -> Result<Tensor> {
        zip_broadcast("sub", a, b, |x, y| x - y)
    }

    fn mul(&self, a: &Tensor, b: &Tensor) -> Result<Tensor> {
        zip_broadcast("mul", a, b, |x, y| x * y)
    }

    fn scale(&self, alpha: f32, x: &Tensor) -> Tensor {
        x.mapv(|v| alpha * v).into_shared()
    }

    fn axpby(&self, a: f32, x: &Tensor, b: f32, y: &Tensor) -> Result<Tensor> {
        zip_exact("axpby", x, y, |x, y| a * x + b * y)
    }

    fn ln(&self, x: &Tensor) -> Tensor {
        x.mapv(f32::ln).into_shared()
    }
}

impl Activation for Native {
    fn sigmoid(&self, x: &Tensor) -> Tensor {
        x.mapv(|v| 1f32 / (1f32 + (-v).exp())).into_shared()
    }

    fn sigmoid_grad(&self, y: &Tensor, dy: &Tensor) -> Result<Tensor> {
        zip_exact("sigmoid_grad", y, dy, |s, g| g * s * (1f32 - s))
    }

    fn relu(&self, x: &Tensor) -> Tensor {
        x.mapv(|v| v.max(0f32)).into_shared()
    }

    fn relu_grad(&self, x: &Tensor, dy: &Tensor) -> Result<Tensor> {
        zip_exact("relu_grad", x, dy, |v, g| if v > 0f32 { g } else { 0f32 })
    }

    fn tanh(&self, x: &Tensor) -> Tensor {
        x.mapv(f32::tanh).into_shared()
    }

    fn tanh_grad(&self, y: &Tensor, dy: &Tensor) -> Result<Tensor> {
        zip_exact("tanh_grad", y, dy, |t, g| g * (1f32 - t * t))
    }
}

impl Blas for Native {
    fn gemm(&self, a: &Tensor, trans_a: Transpose, b: &Tensor, trans_b: Transpose) -> Result<Tensor> {
        let mut lhs = matrix("gemm", a)?;
        let mut rhs = matrix("gemm", b)?;
        if trans_a == Transpose::Trans {
            lhs = lhs.reversed_axes();
        }
        if trans_b == Transpose::Trans {
            rhs = rhs.reversed_axes();
        }
        if lhs.ncols() != rhs.nrows() {
            return Err(Error::shape("gemm", lhs.shape(), rhs.shape()));
        }
        Ok(lhs.dot(&rhs).into_dyn().into_shared())
    }

    fn transpose(&self, a: &Tensor) -> Result<Tensor> {
        let m = matrix("transpose", a)?;
        Ok(m.t().as_standard_layout().into_owned().into_dyn().into_shared())
    }
}

impl Shaping for Native {
    fn reshape(&self, x: &Tensor, shape: &[usize]) -> Result<Tensor> {
        if tensor::size(shape) != x.len() {
            return Err(Error::shape("reshape", x.shape(), shape));
        }
        tensor::from_shape_vec(shape, x.iter().cloned().collect())
    }

    fn slice(&self, x: &Tensor, axis: usize, offset: usize, length: usize) -> Result<Tensor> {
        check_axis("slice", x, axis)?;
        if offset + length > x.shape()[axis] {
            return Err(Error::shape("slice", x.shape(), &[offset, length]));
        }
        let part = x.slice_axis(Axis(axis), Slice::from(offset..offset + length));
        Ok(part.to_owned().into_shared())
    }

    fn concat(&self, xs: &[Tensor], axis: usize) -> Result<Tensor> {
        let first = xs.first().ok_or_else(|| Error::shape("concat", &[], &[]))?;
        check_axis("concat", first, axis)?;
        for x in xs.iter().skip(1) {
            let compatible = x.ndim() == first.ndim()
                && x
                    .shape()
                    .iter()
                    .zip(first.shape())
                    .enumerate()
                    .all(|(i, (a, b))| i == axis || a == b);
            if !compatible {
                return Err(Error::shape("concat", first.shape(), x.shape()));
            }
        }
        let views: Vec<_> = xs.iter().map(|x| x.view()).collect();
        Ok(concatenate(Axis(axis), &views)?.into_shared())
    }

    fn sum_axis(&self, x: &Tensor, axis: usize) -> Result<Tensor> {
        check_axis("sum_axis", x, axis)?;
        Ok(x.sum_axis(Axis(axis)).insert_axis(Axis(axis)).into_shared())
    }

    fn sum(&self, x: &Tensor) -> f32 {
        x.sum()
    }

    fn argmax(&self, x: &Tensor, axis: usize) -> Result<Vec<usize>> {
        check_axis("argmax", x, axis)?;
        Ok(x
            .lanes(Axis(axis))
            .into_iter()
            .map(|lane| {
                let mut best = 0;
                for (i, v) in lane.iter().enumerate() {
                    if *v > lane[best] {
                        best = i;
                    }
                }
                best
            })
            .collect())
    }
}

impl Softmax for Native {
    fn softmax(&self, x: &Tensor) -> Result<Tensor> {
        if x.ndim() != 4 {
            return Err(Error::shape("softmax", x.shape(), &[0, 0, 0, 0]));
        }
        let mut out = ArrayD::zeros(x.raw_dim());
        for (mut o, instance) in out.axis_iter_mut(Axis(3)).zip(x.axis_iter(Axis(3))) {
            let max = instance.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
            let exp = instance.mapv(|v| (v - max).exp());
            let total = exp.sum();
            o.assign(&(exp / total));
        }
        Ok(out.into_shared())
    }
}

impl Random for Native {
    fn bernoulli(&self, shape: &[usize], p: f32) -> Result<Tensor> {
        let dist = Bernoulli::new(f64::from(p)).map_err(|e| Error::config("bernoulli", e.to_string()))?;
        let mut rng = self.rng.borrow_mut();
        let mask = ArrayD::from_shape_fn(IxDyn(shape), |_| if dist.sample(&mut *rng) { 1f32 } else { 0f32 });
        Ok(mask.into_shared())
    }
}

/// Input position a window offset lands on, if it is not in the padding.
pub(crate) fn source(out: usize, offset: usize, stride: usize, pad: usize, extent: usize) -> Option<usize> {
    let pos = (out * stride + offset).checked_sub(pad)?;
    if pos < extent {
        Some(pos)
    } else {
        None
    }
}

/// Number of window positions along an axis, rounding down.
pub(crate) fn output_extent(extent: usize, kernel: usize, stride: usize, pad: usize) -> Option<usize> {
    if stride == 0 || extent + 2 * pad < kernel {
        return None;
    }
    Some((extent + 2 * pad - kernel) / stride + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::arr2;

    fn t(shape: &[usize], data: Vec<f32>) -> Tensor {
        tensor::from_shape_vec(shape, data).unwrap()
    }

    #[test]
    fn add_broadcasts_the_second_operand() {
        let backend = Native::new();
        let a = t(&[2, 3], vec![0., 1., 2., 3., 4., 5.]);
        let b = t(&[2, 1], vec![10., 20.]);
        let sum = backend.add(&a, &b).unwrap();
        assert_eq!(sum, t(&[2, 3], vec![10., 11., 12., 23., 24., 25.]));
        assert!(matches!(
            backend.add(&b, &a),
            Err(Error::ShapeMismatch { operation: "add", .. })
        ));
    }

    #[test]
    fn axpby_requires_equal_shapes() {
        let backend = Native::new();
        let x = t(&[2], vec![1., 2.]);
        let y = t(&[2], vec![3., 4.]);
        assert_eq!(backend.axpby(2., &x, -1., &y).unwrap(), t(&[2], vec![-1., 0.]));
        assert!(backend.axpby(1., &x, 1., &t(&[3], vec![0.; 3])).is_err());
    }

    #[test]
    fn gemm_respects_transposition() {
        let backend = Native::new();
        let a = arr2(&[[1f32, 2.], [3., 4.], [5., 6.]]).into_dyn().into_shared();
        let b = arr2(&[[1f32, 0., 1.], [0., 1., 1.]]).into_dyn().into_shared();
        let ab = backend.gemm(&a, Transpose::NoTrans, &b, Transpose::NoTrans).unwrap();
        assert_eq!(ab.shape(), &[3, 3]);
        assert_eq!(ab[[2, 2]], 11.);
        let atbt = backend.gemm(&a, Transpose::Trans, &b, Transpose::Trans).unwrap();
        assert_eq!(atbt.shape(), &[2, 2]);
        assert_eq!(atbt[[0, 0]], 6.);
        assert!(backend.gemm(&a, Transpose::NoTrans, &a, Transpose::NoTrans).is_err());
    }

    #[test]
    fn reshape_after_transpose_is_row_major() {
        let backend = Native::new();
        let a = t(&[2, 3], vec![0., 1., 2., 3., 4., 5.]);
        let at = backend.transpose(&a).unwrap();
        let flat = backend.reshape(&at, &[6]).unwrap();
        assert_eq!(flat, t(&[6], vec![0., 3., 1., 4., 2., 5.]));
        assert!(backend.reshape(&a, &[4]).is_err());
    }

    #[test]
    fn slice_and_concat_are_inverse() {
        let backend = Native::new();
        let a = t(&[2, 5], (0..10).map(|v| v as f32).collect());
        let left = backend.slice(&a, 1, 0, 2).unwrap();
        let right = backend.slice(&a, 1, 2, 3).unwrap();
        assert_eq!(right[[1, 0]], 7.);
        assert_eq!(backend.concat(&[left, right], 1).unwrap(), a);
        assert!(backend.slice(&a, 1, 4, 2).is_err());
        assert!(backend.concat(&[a.clone(), t(&[3, 5], vec![0.; 15])], 1).is_err());
    }

    #[test]
    fn argmax_over_lanes() {
        let backend = Native::new();
        let scores = t(&[3, 2], vec![0.1, 0.9, 0.7, 0.05, 0.2, 0.05]);
        assert_eq!(backend.argmax(&scores, 0).unwrap(), vec![1, 0]);
        assert_eq!(backend.argmax(&scores, 1).unwrap(), vec![1, 0, 0]);
    }

    #[test]
    fn sum_axis_keeps_dims() {
        let backend = Native::new();
        let a = t(&[2, 3], vec![1., 2., 3., 4., 5., 6.]);
        let rows = backend.sum_axis(&a, 1).unwrap();
        assert_eq!(rows, t(&[2, 1], vec![6., 15.]));
        assert_eq!(backend.sum(&a), 21.);
    }

    #[test]
    fn softmax_per_instance() {
        let backend = Native::new();
        let x = t(&[3, 1, 1, 2], vec![1., 1000., 2., 1000., 3., 1000.]);
        let y = backend.softmax(&x).unwrap();
        let first: f32 = (0..3).map(|c| y[[c, 0, 0, 0]]).sum();
        assert_abs_diff_eq!(first, 1., epsilon = 1e-6);
        assert_abs_diff_eq!(y[[0, 0, 0, 1]], 1. / 3., epsilon = 1e-6);
        assert!(y[[2, 0, 0, 0]] > y[[1, 0, 0, 0]]);
        assert!(backend.softmax(&t(&[3, 2], vec![0.; 6])).is_err());
    }

    #[test]
    fn seeded_bernoulli_is_reproducible() {
        let a = Native::with_seed(7).bernoulli(&[4, 4], 0.5).unwrap();
        let b = Native::with_seed(7).bernoulli(&[4, 4], 0.5).unwrap();
        assert_eq!(a, b);
        assert!(a.iter().all(|&v| v == 0. || v == 1.));
        let ones = Native::new().bernoulli(&[3], 1.).unwrap();
        assert_eq!(ones, t(&[3], vec![1.; 3]));
    }

    #[test]
    fn window_arithmetic() {
        assert_eq!(output_extent(5, 3, 2, 1), Some(3));
        assert_eq!(output_extent(4, 3, 2, 0), Some(1));
        assert_eq!(output_extent(2, 3, 1, 0), None);
        assert_eq!(source(0, 0, 1, 1, 4), None);
        assert_eq!(source(0, 1, 1, 1, 4), Some(0));
        assert_eq!(source(3, 2, 1, 1, 4), None);
    }
}
