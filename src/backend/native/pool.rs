use ndarray::Array4;

use super::{image, output_extent, source, Native};
use crate::backend::{Pooling, PoolingInfo, PoolingMode};
use crate::error::{Error, Result};
use crate::tensor::Tensor;

fn output_shape(x: &Tensor, info: &PoolingInfo) -> Result<[usize; 4]> {
    let (w, h, c, n) = image("pooling", x)?.dim();
    let ow = output_extent(w, info.width, info.stride_horizontal, info.pad_width);
    let oh = output_extent(h, info.height, info.stride_vertical, info.pad_height);
    match (ow, oh) {
        (Some(ow), Some(oh)) => Ok([ow, oh, c, n]),
        _ => Err(Error::shape("pooling", x.shape(), &[info.width, info.height])),
    }
}

/// In-bounds input positions `(x, y)` covered by the window at `(ox, oy)`.
fn window(ox: usize, oy: usize, w: usize, h: usize, info: &PoolingInfo) -> Vec<(usize, usize)> {
    let mut positions = Vec::with_capacity(info.width * info.height);
    for ky in 0..info.height {
        if let Some(iy) = source(oy, ky, info.stride_vertical, info.pad_height, h) {
            for kx in 0..info.width {
                if let Some(ix) = source(ox, kx, info.stride_horizontal, info.pad_width, w) {
                    positions.push((ix, iy));
                }
            }
        }
    }
    positions
}

impl Pooling for Native {
    fn pooling(&self, x: &Tensor, info: &PoolingInfo) -> Result<Tensor> {
        let [ow, oh, c, n] = output_shape(x, info)?;
        let xv = image("pooling", x)?;
        let (w, h, _, _) = xv.dim();
        let area = (info.width * info.height) as f32;

        let mut y = Array4::<f32>::zeros((ow, oh, c, n));
        for ((ox, oy, ci, ni), out) in y.indexed_iter_mut() {
            let values = window(ox, oy, w, h, info).into_iter().map(|(ix, iy)| xv[[ix, iy, ci, ni]]);
            *out = match info.mode {
                PoolingMode::Max => values.fold(f32::NEG_INFINITY, f32::max),
                PoolingMode::Average => values.sum::<f32>() / area,
            };
        }
        Ok(y.into_dyn().into_shared())
    }

    fn pooling_grad(&self, dy: &Tensor, y: &Tensor, x: &Tensor, info: &PoolingInfo) -> Result<Tensor> {
        let expected = output_shape(x, info)?;
        if y.shape() != expected {
            return Err(Error::shape("pooling_grad", y.shape(), &expected));
        }
        if dy.shape() != y.shape() {
            return Err(Error::shape("pooling_grad", dy.shape(), y.shape()));
        }
        let xv = image("pooling_grad", x)?;
        let yv = image("pooling_grad", y)?;
        let gv = image("pooling_grad", dy)?;
        let (w, h, _, _) = xv.dim();
        let area = (info.width * info.height) as f32;

        let mut dx = Array4::<f32>::zeros(xv.raw_dim());
        for ((ox, oy, ci, ni), &g) in gv.indexed_iter() {
            let positions = window(ox, oy, w, h, info);
            match info.mode {
                PoolingMode::Max => {
                    let max = yv[[ox, oy, ci, ni]];
                    if let Some(&(ix, iy)) = positions.iter().find(|&&(ix, iy)| xv[[ix, iy, ci, ni]] == max) {
                        dx[[ix, iy, ci, ni]] += g;
                    }
                }
                PoolingMode::Average => {
                    for (ix, iy) in positions {
                        dx[[ix, iy, ci, ni]] += g / area;
                    }
                }
            }
        }
        Ok(dx.into_dyn().into_shared())
    }
}
