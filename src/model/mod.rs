mod net;
pub mod unet;

use candle_core::{ModuleT, Tensor};

pub use net::*;

pub enum Unet {
  Plain(UNet),
  Param(ParamUnet),
}

impl ModuleT for Unet {
  fn forward_t(&self, x: &Tensor, train: bool) -> Result<Tensor, candle_core::Error> {
    match self {
      Unet::Plain(m) => m.forward_t(x, train),
      Unet::Param(m) => m.forward_t(x, train),
    }
  }
}
