use candle_core::{Module, ModuleT, Tensor};
use candle_nn::{conv2d, Conv2d, Conv2dConfig, Dropout, VarBuilder};

pub const DROPOUT: f32 = 0.5;

/// conv3x3 -> dropout -> relu -> conv3x3, spatial size preserved.
pub struct Block {
  input_layer: Conv2d,
  dropout: Dropout,
  output_layer: Conv2d,
}

impl Block {
  pub fn new(
    input_channels: usize,
    output_channels: usize,
    vb: VarBuilder,
  ) -> Result<Self, candle_core::Error> {
    let conf = Conv2dConfig {
      padding: 1,
      stride: 1,
      ..Default::default()
    };

    let input_layer = conv2d(
      input_channels,
      output_channels,
      3,
      conf,
      vb.pp("input_layer"),
    )?;

    let output_layer = conv2d(
      output_channels,
      output_channels,
      3,
      conf,
      vb.pp("output_layer"),
    )?;

    Ok(Self {
      input_layer,
      dropout: Dropout::new(DROPOUT),
      output_layer,
    })
  }
}

impl ModuleT for Block {
  fn forward_t(&self, x: &Tensor, train: bool) -> Result<Tensor, candle_core::Error> {
    let mut x = self.input_layer.forward(x)?;
    x = self.dropout.forward_t(&x, train)?;
    x = x.relu()?;
    self.output_layer.forward(&x)
  }
}

#[cfg(test)]
mod tests {
  use candle_core::{DType, Device};
  use candle_nn::VarMap;

  use super::*;

  #[test]
  fn block_keeps_spatial_size() -> Result<(), candle_core::Error> {
    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
    let block = Block::new(3, 5, vb)?;

    let x = Tensor::randn(0f32, 1., (2, 3, 9, 13), &Device::Cpu)?;

    assert_eq!(block.forward_t(&x, false)?.dims(), &[2, 5, 9, 13]);
    assert_eq!(block.forward_t(&x, true)?.dims(), &[2, 5, 9, 13]);
    Ok(())
  }

  #[test]
  fn block_is_deterministic_at_inference() -> Result<(), candle_core::Error> {
    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
    let block = Block::new(1, 4, vb)?;

    let x = Tensor::randn(0f32, 1., (1, 1, 8, 8), &Device::Cpu)?;
    let diff = (block.forward_t(&x, false)? - block.forward_t(&x, false)?)?
      .abs()?
      .max_all()?
      .to_scalar::<f32>()?;

    assert_eq!(diff, 0.);
    Ok(())
  }

  #[test]
  fn block_rejects_wrong_channel_count() -> Result<(), candle_core::Error> {
    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
    let block = Block::new(2, 4, vb)?;

    let x = Tensor::randn(0f32, 1., (1, 3, 8, 8), &Device::Cpu)?;

    assert!(block.forward_t(&x, false).is_err());
    Ok(())
  }
}
