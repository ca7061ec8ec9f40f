use candle_core::{Module, ModuleT, Tensor};
use candle_nn::{conv_transpose2d, ConvTranspose2d, ConvTranspose2dConfig, VarBuilder};

use super::Block;
use crate::utils::TensorExt;

/// Expanding path: upsample, fuse the matching encoder feature, refine with a [`Block`].
pub struct Decoder {
  num_channels: Vec<usize>,
  upconv_modules: Vec<ConvTranspose2d>,
  decoder_blocks: Vec<Block>,
}

impl Decoder {
  pub fn new(num_channels: &[usize], vb: VarBuilder) -> Result<Self, candle_core::Error> {
    if num_channels.len() < 2 {
      return Err(
        candle_core::Error::Msg("decoder needs at least two channel counts".to_owned()).bt(),
      );
    }

    let conf = ConvTranspose2dConfig {
      stride: 2,
      ..Default::default()
    };

    let mut upconv_modules = Vec::with_capacity(num_channels.len() - 1);
    let mut decoder_blocks = Vec::with_capacity(num_channels.len() - 1);

    for (i, pair) in num_channels.windows(2).enumerate() {
      upconv_modules.push(conv_transpose2d(
        pair[0],
        pair[1],
        2,
        conf,
        vb.pp("upconv_modules").pp(i),
      )?);

      decoder_blocks.push(Block::new(
        pair[0],
        pair[1],
        vb.pp("decoder_blocks").pp(i),
      )?);
    }

    Ok(Self {
      num_channels: num_channels.to_vec(),
      upconv_modules,
      decoder_blocks,
    })
  }

  /// `encoder_features` are the skip connections, deepest first.
  pub fn forward_t(
    &self,
    x: &Tensor,
    encoder_features: &[Tensor],
    train: bool,
  ) -> Result<Tensor, candle_core::Error> {
    if encoder_features.len() < self.decoder_blocks.len() {
      return Err(
        candle_core::Error::Msg(format!(
          "decoder has {} steps but got {} encoder features",
          self.decoder_blocks.len(),
          encoder_features.len()
        ))
        .bt(),
      );
    }

    let mut x = x.clone();

    for (i, (upconv, block)) in self
      .upconv_modules
      .iter()
      .zip(&self.decoder_blocks)
      .enumerate()
    {
      x = upconv.forward(&x)?;
      let features = self.crop(&encoder_features[i], &x)?;
      x = Tensor::cat(&[&x, &features], 1)?;
      x = block.forward_t(&x, train)?;
      tracing::debug!("Decoder stage {i}: {:?}", x.dims());
    }

    Ok(x)
  }

  /// Center-crops `encoder_features` to the spatial size of `x`.
  pub fn crop(&self, encoder_features: &Tensor, x: &Tensor) -> Result<Tensor, candle_core::Error> {
    let (_, _, h, w) = x.dims4()?;
    encoder_features.center_crop(h, w)
  }

  pub fn shape(&self) -> usize {
    self.num_channels.iter().copied().max().unwrap_or_default()
  }
}

#[cfg(test)]
mod tests {
  use candle_core::{DType, Device};
  use candle_nn::VarMap;

  use super::*;

  fn decoder(num_channels: &[usize]) -> Result<Decoder, candle_core::Error> {
    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
    Decoder::new(num_channels, vb)
  }

  #[test]
  fn crop_matches_upsampled_size() -> Result<(), candle_core::Error> {
    let decoder = decoder(&[8, 4])?;

    for ((fh, fw), (h, w)) in [((41, 41), (40, 40)), ((17, 30), (12, 30)), ((9, 9), (9, 9))] {
      let features = Tensor::zeros((1, 4, fh, fw), DType::F32, &Device::Cpu)?;
      let x = Tensor::zeros((1, 4, h, w), DType::F32, &Device::Cpu)?;

      assert_eq!(decoder.crop(&features, &x)?.dims(), &[1, 4, h, w]);
    }
    Ok(())
  }

  #[test]
  fn crop_refuses_to_pad() -> Result<(), candle_core::Error> {
    let decoder = decoder(&[8, 4])?;
    let features = Tensor::zeros((1, 4, 10, 10), DType::F32, &Device::Cpu)?;
    let x = Tensor::zeros((1, 4, 12, 12), DType::F32, &Device::Cpu)?;

    assert!(decoder.crop(&features, &x).is_err());
    Ok(())
  }

  #[test]
  fn decoder_upsamples_and_fuses() -> Result<(), candle_core::Error> {
    let decoder = decoder(&[16, 8, 4])?;

    let x = Tensor::randn(0f32, 1., (1, 16, 5, 6), &Device::Cpu)?;
    let skips = [
      Tensor::randn(0f32, 1., (1, 8, 10, 13), &Device::Cpu)?,
      Tensor::randn(0f32, 1., (1, 4, 20, 27), &Device::Cpu)?,
    ];

    assert_eq!(decoder.forward_t(&x, &skips, false)?.dims(), &[1, 4, 20, 24]);
    assert_eq!(decoder.shape(), 16);
    Ok(())
  }

  #[test]
  fn decoder_needs_enough_skips() -> Result<(), candle_core::Error> {
    let decoder = decoder(&[16, 8, 4])?;

    let x = Tensor::randn(0f32, 1., (1, 16, 5, 6), &Device::Cpu)?;
    let skips = [Tensor::randn(0f32, 1., (1, 8, 10, 13), &Device::Cpu)?];

    assert!(decoder.forward_t(&x, &skips, false).is_err());
    Ok(())
  }
}
