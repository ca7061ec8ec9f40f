use std::path::Path;

use candle_core::{DType, Device, Tensor};

pub trait TensorExt {
  fn center_crop(&self, height: usize, width: usize) -> Result<Self, candle_core::Error>
  where
    Self: Sized;

  fn mean_std(&self) -> Result<(f32, f32), candle_core::Error>;
}

/// Leading margin of a center crop, `(source - target) / 2` rounded half to even.
///
/// Callers ensure `target <= source`.
fn crop_offset(source: usize, target: usize) -> usize {
  let diff = source.saturating_sub(target);
  let half = diff / 2;

  if diff % 2 == 1 && half % 2 == 1 {
    half + 1
  } else {
    half
  }
}

impl TensorExt for Tensor {
  /// Crops the two trailing (spatial) dims around the center.
  fn center_crop(&self, height: usize, width: usize) -> Result<Self, candle_core::Error> {
    let rank = self.rank();
    if rank < 2 {
      return Err(
        candle_core::Error::Msg(format!("cannot center_crop a tensor of rank {rank}")).bt(),
      );
    }

    let (h_dim, w_dim) = (rank - 2, rank - 1);
    let (h, w) = (self.dim(h_dim)?, self.dim(w_dim)?);

    if height > h || width > w {
      return Err(
        candle_core::Error::Msg(format!(
          "center_crop target {height}x{width} is larger than the source {h}x{w}"
        ))
        .bt(),
      );
    }

    if height == h && width == w {
      return Ok(self.clone());
    }

    self
      .narrow(h_dim, crop_offset(h, height), height)?
      .narrow(w_dim, crop_offset(w, width), width)
  }

  /// Mean and population standard deviation over every element.
  fn mean_std(&self) -> Result<(f32, f32), candle_core::Error> {
    let x = self.to_dtype(DType::F32)?;
    let mean = x.mean_all()?;
    let var = x.broadcast_sub(&mean)?.sqr()?.mean_all()?;

    Ok((mean.to_scalar::<f32>()?, var.sqrt()?.to_scalar::<f32>()?))
  }
}

/// Decodes an image file into a (height, width) f32 luminance tensor.
pub fn load_image(path: impl AsRef<Path>, device: &Device) -> Result<Tensor, &'static str> {
  let image = image::open(path).map_err(|_| "Failed to open input image")?;
  let (width, height) = (image.width() as usize, image.height() as usize);

  tracing::debug!("Loaded {width}x{height} image");

  Tensor::from_vec(image.to_luma32f().into_raw(), (height, width), device)
    .map_err(|_| "Failed to convert the image to a tensor")
}
