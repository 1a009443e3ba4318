use ndarray::{Array1, Array4, Axis};

use super::{image, output_extent, source, Native};
use crate::backend::{ConvInfo, Convolution};
use crate::error::{Error, Result};
use crate::tensor::Tensor;

/// Output extents `[width, height, num_output, batch]` after checking every operand.
fn output_shape(x: &Tensor, filter: &Tensor, info: &ConvInfo) -> Result<[usize; 4]> {
    let xv = image("convolution", x)?;
    let fv = image("convolution", filter)?;
    let (w, h, c, n) = xv.dim();
    let (kw, kh, fc, k) = fv.dim();
    if fc != c {
        return Err(Error::shape("convolution", x.shape(), filter.shape()));
    }
    let ow = output_extent(w, kw, info.stride_horizontal, info.pad_width);
    let oh = output_extent(h, kh, info.stride_vertical, info.pad_height);
    match (ow, oh) {
        (Some(ow), Some(oh)) => Ok([ow, oh, k, n]),
        _ => Err(Error::shape("convolution", x.shape(), filter.shape())),
    }
}

impl Convolution for Native {
    fn convolution(&self, x: &Tensor, filter: &Tensor, bias: &Tensor, info: &ConvInfo) -> Result<Tensor> {
        let [ow, oh, k, n] = output_shape(x, filter, info)?;
        if bias.shape() != [k] {
            return Err(Error::shape("convolution", bias.shape(), &[k]));
        }
        let xv = image("convolution", x)?;
        let fv = image("convolution", filter)?;
        let (w, h, c, _) = xv.dim();
        let (kw, kh, _, _) = fv.dim();

        let mut y = Array4::<f32>::zeros((ow, oh, k, n));
        for ((ox, oy, ko, ni), out) in y.indexed_iter_mut() {
            let mut acc = bias[[ko]];
            for ky in 0..kh {
                let iy = match source(oy, ky, info.stride_vertical, info.pad_height, h) {
                    Some(iy) => iy,
                    None => continue,
                };
                for kx in 0..kw {
                    let ix = match source(ox, kx, info.stride_horizontal, info.pad_width, w) {
                        Some(ix) => ix,
                        None => continue,
                    };
                    for ci in 0..c {
                        acc += xv[[ix, iy, ci, ni]] * fv[[kx, ky, ci, ko]];
                    }
                }
            }
            *out = acc;
        }
        Ok(y.into_dyn().into_shared())
    }

    fn convolution_grad_data(&self, dy: &Tensor, x: &Tensor, filter: &Tensor, info: &ConvInfo) -> Result<Tensor> {
        let expected = output_shape(x, filter, info)?;
        if dy.shape() != expected {
            return Err(Error::shape("convolution_grad_data", dy.shape(), &expected));
        }
        let xv = image("convolution_grad_data", x)?;
        let fv = image("convolution_grad_data", filter)?;
        let gv = image("convolution_grad_data", dy)?;
        let (w, h, c, _) = xv.dim();
        let (kw, kh, _, _) = fv.dim();

        let mut dx = Array4::<f32>::zeros(xv.raw_dim());
        for ((ox, oy, ko, ni), &g) in gv.indexed_iter() {
            for ky in 0..kh {
                let iy = match source(oy, ky, info.stride_vertical, info.pad_height, h) {
                    Some(iy) => iy,
                    None => continue,
                };
                for kx in 0..kw {
                    let ix = match source(ox, kx, info.stride_horizontal, info.pad_width, w) {
                        Some(ix) => ix,
                        None => continue,
                    };
                    for ci in 0..c {
                        dx[[ix, iy, ci, ni]] += g * fv[[kx, ky, ci, ko]];
                    }
                }
            }
        }
        Ok(dx.into_dyn().into_shared())
    }

    fn convolution_grad_filter(&self, dy: &Tensor, x: &Tensor, filter: &Tensor, info: &ConvInfo) -> Result<Tensor> {
        let expected = output_shape(x, filter, info)?;
        if dy.shape() != expected {
            return Err(Error::shape("convolution_grad_filter", dy.shape(), &expected));
        }
        let xv = image("convolution_grad_filter", x)?;
        let fv = image("convolution_grad_filter", filter)?;
        let gv = image("convolution_grad_filter", dy)?;
        let (w, h, c, _) = xv.dim();
        let (kw, kh, _, _) = fv.dim();

        let mut df = Array4::<f32>::zeros(fv.raw_dim());
        for ((ox, oy, ko, ni), &g) in gv.indexed_iter() {
            for ky in 0..kh {
                let iy = match source(oy, ky, info.stride_vertical, info.pad_height, h) {
                    Some(iy) => iy,
                    None => continue,
                };
                for kx in 0..kw {
                    let ix = match source(ox, kx, info.stride_horizontal, info.pad_width, w) {
                        Some(ix) => ix,
                        None => continue,
                    };
                    for ci in 0..c {
                        df[[kx, ky, ci, ko]] += g * xv[[ix, iy, ci, ni]];
                    }
                }
            }
        }
        Ok(df.into_dyn().into_shared())
    }

    fn convolution_grad_bias(&self, dy: &Tensor) -> Result<Tensor> {
        let gv = image("convolution_grad_bias", dy)?;
        let db: Array1<f32> = gv.sum_axis(Axis(3)).sum_axis(Axis(1)).sum_axis(Axis(0));
        Ok(db.into_dyn().into_shared())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::from_shape_vec;

    fn info(pad: usize, stride: usize) -> ConvInfo {
        ConvInfo {
            pad_height: pad,
            pad_width: pad,
            stride_vertical: stride,
            stride_horizontal: stride,
        }
    }

    fn ones(shape: &[usize]) -> Tensor {
        from_shape_vec(shape, vec![1f32; shape.iter().product()]).unwrap()
    }

    #[test]
    fn sums_each_window_plus_bias() {
        let backend = Native::new();
        let x = ones(&[3, 3, 2, 1]);
        let filter = ones(&[2, 2, 2, 1]);
        let bias = from_shape_vec(&[1], vec![1.]).unwrap();
        let y = backend.convolution(&x, &filter, &bias, &info(0, 1)).unwrap();
        assert_eq!(y.shape(), &[2, 2, 1, 1]);
        assert!(y.iter().all(|&v| v == 9.));
    }

    #[test]
    fn padding_and_stride() {
        let backend = Native::new();
        let x = ones(&[4, 4, 1, 2]);
        let filter = ones(&[3, 3, 1, 3]);
        let bias = from_shape_vec(&[3], vec![0.; 3]).unwrap();
        let y = backend.convolution(&x, &filter, &bias, &info(1, 2)).unwrap();
        assert_eq!(y.shape(), &[2, 2, 3, 2]);
        // the top left window overlaps the padding
        assert_eq!(y[[0, 0, 0, 0]], 4.);
        assert_eq!(y[[1, 1, 2, 1]], 9.);
    }

    #[test]
    fn gradients_have_operand_shapes() {
        let backend = Native::new();
        let x = ones(&[3, 3, 1, 1]);
        let filter = ones(&[2, 2, 1, 1]);
        let dy = ones(&[2, 2, 1, 1]);
        let dx = backend.convolution_grad_data(&dy, &x, &filter, &info(0, 1)).unwrap();
        assert_eq!(dx.shape(), x.shape());
        // the centre pixel contributes to all four windows
        assert_eq!(dx[[1, 1, 0, 0]], 4.);
        assert_eq!(dx[[0, 0, 0, 0]], 1.);
        let df = backend.convolution_grad_filter(&dy, &x, &filter, &info(0, 1)).unwrap();
        assert_eq!(df.shape(), filter.shape());
        assert!(df.iter().all(|&v| v == 4.));
        let db = backend.convolution_grad_bias(&dy).unwrap();
        assert_eq!(db, from_shape_vec(&[1], vec![4.]).unwrap());
    }

    #[test]
    fn rejects_channel_mismatch() {
        let backend = Native::new();
        let x = ones(&[3, 3, 2, 1]);
        let filter = ones(&[2, 2, 3, 1]);
        let bias = ones(&[1]);
        assert!(matches!(
            backend.convolution(&x, &filter, &bias, &info(0, 1)),
            Err(Error::ShapeMismatch { .. })
        ));
        let dy = ones(&[3, 3, 1, 1]);
        let filter = ones(&[2, 2, 2, 1]);
        assert!(backend.convolution_grad_data(&dy, &x, &filter, &info(0, 1)).is_err());
    }
}
