use ndarray::{Array4, Zip};

use super::{image, Native};
use crate::backend::{Lrn, LrnInfo};
use crate::error::{Error, Result};
use crate::tensor::Tensor;

/// Channels `[first, last]` summed for channel `c`.
fn channel_window(c: usize, channels: usize, info: &LrnInfo) -> (usize, usize) {
    let pre_pad = (info.local_size - 1) / 2;
    let first = c.saturating_sub(pre_pad);
    let last = (c + info.local_size - 1 - pre_pad).min(channels - 1);
    (first, last)
}

fn check(info: &LrnInfo, x: &Tensor) -> Result<()> {
    if info.local_size == 0 {
        return Err(Error::config("lrn", "local_size must be positive"));
    }
    image("lrn", x).map(|_| ())
}

impl Lrn for Native {
    fn lrn(&self, x: &Tensor, info: &LrnInfo) -> Result<(Tensor, Tensor)> {
        check(info, x)?;
        let xv = image("lrn", x)?;
        let (_, _, channels, _) = xv.dim();
        let alpha_over_size = info.alpha / info.local_size as f32;

        let mut scale = Array4::<f32>::zeros(xv.raw_dim());
        for ((ix, iy, c, n), s) in scale.indexed_iter_mut() {
            let (first, last) = channel_window(c, channels, info);
            let squares: f32 = (first..=last).map(|cc| xv[[ix, iy, cc, n]].powi(2)).sum();
            *s = 1f32 + alpha_over_size * squares;
        }
        let y = Zip::from(&xv)
            .and(&scale)
            .map_collect(|&v, &s| v * s.powf(-info.beta));
        Ok((y.into_dyn().into_shared(), scale.into_dyn().into_shared()))
    }

    fn lrn_grad(&self, x: &Tensor, y: &Tensor, scale: &Tensor, dy: &Tensor, info: &LrnInfo) -> Result<Tensor> {
        check(info, x)?;
        for other in [y, scale, dy] {
            if other.shape() != x.shape() {
                return Err(Error::shape("lrn_grad", other.shape(), x.shape()));
            }
        }
        let xv = image("lrn_grad", x)?;
        let yv = image("lrn_grad", y)?;
        let sv = image("lrn_grad", scale)?;
        let gv = image("lrn_grad", dy)?;
        let (_, _, channels, _) = xv.dim();
        let factor = 2f32 * info.alpha * info.beta / info.local_size as f32;

        // ratio[c] = dy[c] * y[c] / scale[c]
        let ratio = Zip::from(&gv).and(&yv).and(&sv).map_collect(|&g, &o, &s| g * o / s);

        let mut dx = Array4::<f32>::zeros(xv.raw_dim());
        for ((ix, iy, c, n), d) in dx.indexed_iter_mut() {
            // channels whose window contains c
            let mut accum = 0f32;
            for cc in 0..channels {
                let (first, last) = channel_window(cc, channels, info);
                if first <= c && c <= last {
                    accum += ratio[[ix, iy, cc, n]];
                }
            }
            let pos = [ix, iy, c, n];
            *d = gv[pos] * sv[pos].powf(-info.beta) - factor * xv[pos] * accum;
        }
        Ok(dx.into_dyn().into_shared())
    }
}
