use candle_core::{Module, ModuleT, Tensor};
use candle_nn::{conv2d, Conv2d, Conv2dConfig, VarBuilder};

use super::UNetConfig;
use crate::model::unet::{Decoder, Encoder};

pub struct UNet {
  encoder: Encoder,
  decoder: Decoder,
  head: Conv2d,
}

impl UNet {
  pub fn new(config: &UNetConfig, vb: VarBuilder) -> Result<Self, candle_core::Error> {
    config.validate()?;

    let encoder = Encoder::new(&config.encoder_channels, vb.pp("encoder"))?;
    let decoder = Decoder::new(&config.decoder_channels, vb.pp("decoder"))?;
    let head = conv2d(
      config.out_channels(),
      config.groups,
      1,
      Conv2dConfig::default(),
      vb.pp("head"),
    )?;

    Ok(Self {
      encoder,
      decoder,
      head,
    })
  }

  /// Runs encoder and decoder, stopping before the head.
  pub fn decode_t(&self, x: &Tensor, train: bool) -> Result<Tensor, candle_core::Error> {
    let mut features = self.encoder.forward_t(x, train)?;
    features.reverse();

    let Some((deepest, skips)) = features.split_first() else {
      return Err(candle_core::Error::Msg("encoder produced no features".to_owned()).bt());
    };

    self.decoder.forward_t(deepest, skips, train)
  }

  pub fn encoder(&self) -> &Encoder {
    &self.encoder
  }

  pub fn decoder(&self) -> &Decoder {
    &self.decoder
  }

  pub fn head(&self) -> &Conv2d {
    &self.head
  }
}

impl ModuleT for UNet {
  fn forward_t(&self, x: &Tensor, train: bool) -> Result<Tensor, candle_core::Error> {
    let out = self.decode_t(x, train)?;
    self.head.forward(&out)
  }
}
