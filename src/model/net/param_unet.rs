use candle_core::{Module, ModuleT, Tensor};
use candle_nn::{Init, VarBuilder};

use super::{ParamUnetConfig, UNet};

const SCALE_INIT: Init = Init::Randn {
  mean: 0.,
  stdev: 1.,
};

/// A [`UNet`] whose decoder output is scaled along the width axis by a learned vector
/// before the head.
pub struct ParamUnet {
  unet: UNet,
  // Registered and trained with the rest of the weights but not applied in `forward_t`.
  m1: Tensor,
  m2: Tensor,
}

impl ParamUnet {
  pub fn new(config: &ParamUnetConfig, vb: VarBuilder) -> Result<Self, candle_core::Error> {
    let unet = UNet::new(&config.unet, vb.clone())?;
    let m1 = vb.get_with_hints(config.m1_len, "m1", SCALE_INIT)?;
    let m2 = vb.get_with_hints(config.m2_len, "m2", SCALE_INIT)?;

    Ok(Self { unet, m1, m2 })
  }

  /// Decoder output after the `m2` scaling, before the head.
  pub fn decode_t(&self, x: &Tensor, train: bool) -> Result<Tensor, candle_core::Error> {
    self.unet.decode_t(x, train)?.broadcast_mul(&self.m2)
  }

  pub fn unet(&self) -> &UNet {
    &self.unet
  }

  pub fn m1(&self) -> &Tensor {
    &self.m1
  }

  pub fn m2(&self) -> &Tensor {
    &self.m2
  }
}

impl ModuleT for ParamUnet {
  fn forward_t(&self, x: &Tensor, train: bool) -> Result<Tensor, candle_core::Error> {
    let out = self.decode_t(x, train)?;
    self.unet.head().forward(&out)
  }
}
