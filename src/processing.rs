use std::ops::Range;

use candle_core::{DType, IndexOp, Tensor};

use crate::utils::TensorExt;

/// Region of a single-channel output that contributes to the loss.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LossCrop {
  pub rows: Range<usize>,
  pub cols: Range<usize>,
}

impl Default for LossCrop {
  fn default() -> Self {
    Self {
      rows: 55..80,
      cols: 17..25,
    }
  }
}

/// Brings a collection of differently sized images to one normalized shape.
///
/// Images are tensors whose first two dims are (height, width), optionally followed by a
/// channel dim.
pub struct ImageProcessing {
  images: Vec<Tensor>,
  loss_crop: LossCrop,
}

impl ImageProcessing {
  pub fn new(images: Vec<Tensor>) -> Self {
    Self {
      images,
      loss_crop: LossCrop::default(),
    }
  }

  pub fn with_loss_crop(mut self, loss_crop: LossCrop) -> Self {
    self.loss_crop = loss_crop;
    self
  }

  pub fn images(&self) -> &[Tensor] {
    &self.images
  }

  pub fn smallest_image_size(&self) -> Result<(usize, usize), candle_core::Error> {
    let mut smallest: Option<(usize, usize)> = None;

    for image in &self.images {
      let (height, length) = (image.dim(0)?, image.dim(1)?);

      smallest = Some(match smallest {
        Some((h, l)) => (h.min(height), l.min(length)),
        None => (height, length),
      });
    }

    smallest.ok_or_else(|| {
      candle_core::Error::Msg("cannot find the smallest size of an empty image list".to_owned())
        .bt()
    })
  }

  /// Bicubic resampling (a = -0.75, clamped borders) to `(height - 1, length - 1)`.
  pub fn resize(
    &self,
    image: &Tensor,
    height: usize,
    length: usize,
  ) -> Result<Tensor, candle_core::Error> {
    if height <= 1 || length <= 1 {
      return Err(
        candle_core::Error::Msg(format!("cannot resize an image to {height}x{length}")).bt(),
      );
    }

    match image.rank() {
      2 => resize_plane(image, height - 1, length - 1),
      3 => {
        let planes = (0..image.dim(2)?)
          .map(|c| resize_plane(&image.narrow(2, c, 1)?.squeeze(2)?, height - 1, length - 1))
          .collect::<Result<Vec<_>, _>>()?;

        Tensor::stack(&planes, 2)
      }
      rank => Err(candle_core::Error::Msg(format!("cannot resize an image of rank {rank}")).bt()),
    }
  }

  /// Zero mean, unit variance over the whole image.
  pub fn normalize_image(&self, image: &Tensor) -> Result<Tensor, candle_core::Error> {
    let (mean, std) = image.mean_std()?;

    if std == 0. || !std.is_finite() {
      return Err(
        candle_core::Error::Msg(format!("cannot normalize an image with std {std}")).bt(),
      );
    }

    (image.to_dtype(DType::F32)? - f64::from(mean))? / f64::from(std)
  }

  /// Restricts the first channel of the first batch item to the loss region.
  pub fn loss_crop(&self, tensor: &Tensor) -> Result<Tensor, candle_core::Error> {
    let LossCrop { rows, cols } = &self.loss_crop;

    tensor
      .i((0, 0))?
      .narrow(1, cols.start, cols.len())?
      .narrow(0, rows.start, rows.len())?
      .to_dtype(DType::F32)?
      .contiguous()
  }

  /// Resizes and normalizes every image into a `(N, C, height - 1, length - 1)` batch.
  pub fn batch(&self, height: usize, length: usize) -> Result<Tensor, candle_core::Error> {
    let items = self
      .images
      .iter()
      .map(|image| {
        let x = self.normalize_image(&self.resize(image, height, length)?)?;

        if x.rank() == 2 {
          x.unsqueeze(0)
        } else {
          x.permute((2, 0, 1))
        }
      })
      .collect::<Result<Vec<_>, _>>()?;

    tracing::debug!("Batched {} images", items.len());

    Tensor::stack(&items, 0)
  }
}

/// Cubic kernel coefficient of the 4-tap bicubic interpolation.
const CUBIC_A: f32 = -0.75;

/// Weights of the taps at `-1, 0, 1, 2` around a sample at fractional offset `x`.
fn cubic_weights(x: f32) -> [f32; 4] {
  let a = CUBIC_A;
  let w0 = ((a * (x + 1.) - 5. * a) * (x + 1.) + 8. * a) * (x + 1.) - 4. * a;
  let w1 = ((a + 2.) * x - (a + 3.)) * x * x + 1.;
  let w2 = ((a + 2.) * (1. - x) - (a + 3.)) * (1. - x) * (1. - x) + 1.;

  [w0, w1, w2, 1. - w0 - w1 - w2]
}

/// Source taps and weights for every destination index along one axis.
///
/// Pixel centers are aligned (`(dst + 0.5) * scale - 0.5`) and out-of-range taps are
/// clamped to the border. The kernel is never widened, so downscaling does not antialias.
fn cubic_taps(src: usize, dst: usize) -> Vec<([usize; 4], [f32; 4])> {
  let scale = src as f32 / dst as f32;
  let last = src as isize - 1;

  (0..dst)
    .map(|d| {
      let fx = (d as f32 + 0.5) * scale - 0.5;
      let sx = fx.floor();
      let idx = [-1, 0, 1, 2].map(|k| (sx as isize + k).clamp(0, last) as usize);

      (idx, cubic_weights(fx - sx))
    })
    .collect()
}

fn resize_plane(plane: &Tensor, height: usize, length: usize) -> Result<Tensor, candle_core::Error> {
  let (h, w) = plane.dims2()?;
  if h == 0 || w == 0 {
    return Err(candle_core::Error::Msg(format!("cannot resize an empty {h}x{w} image")).bt());
  }

  let src = plane.to_dtype(DType::F32)?.flatten_all()?.to_vec1::<f32>()?;

  let cols = cubic_taps(w, length);
  let mut horizontal = Vec::with_capacity(h * length);
  for row in src.chunks_exact(w) {
    horizontal.extend(
      cols
        .iter()
        .map(|(idx, wt)| (0..4).map(|k| row[idx[k]] * wt[k]).sum::<f32>()),
    );
  }

  let rows = cubic_taps(h, height);
  let mut dst = Vec::with_capacity(height * length);
  for (idx, wt) in &rows {
    dst.extend(
      (0..length).map(|x| (0..4).map(|k| horizontal[idx[k] * length + x] * wt[k]).sum::<f32>()),
    );
  }

  Tensor::from_vec(dst, (height, length), plane.device())
}
