use candle_core::{ModuleT, Tensor};
use candle_nn::VarBuilder;
use smallvec::SmallVec;

use super::Block;

pub type Features = SmallVec<[Tensor; 4]>;

/// Contracting path: one [`Block`] per channel step, 2x2 max-pooling in between.
pub struct Encoder {
  num_channels: Vec<usize>,
  encoder_blocks: Vec<Block>,
}

impl Encoder {
  pub fn new(num_channels: &[usize], vb: VarBuilder) -> Result<Self, candle_core::Error> {
    if num_channels.len() < 2 {
      return Err(
        candle_core::Error::Msg("encoder needs at least two channel counts".to_owned()).bt(),
      );
    }

    let vb = vb.pp("encoder_blocks");
    let encoder_blocks = num_channels
      .windows(2)
      .enumerate()
      .map(|(i, pair)| Block::new(pair[0], pair[1], vb.pp(i)))
      .collect::<Result<Vec<_>, _>>()?;

    Ok(Self {
      num_channels: num_channels.to_vec(),
      encoder_blocks,
    })
  }

  /// Feature maps of every stage taken before pooling, shallowest first.
  pub fn forward_t(&self, x: &Tensor, train: bool) -> Result<Features, candle_core::Error> {
    let mut output = Features::with_capacity(self.encoder_blocks.len());
    let mut x = x.clone();

    for (i, block) in self.encoder_blocks.iter().enumerate() {
      if i > 0 {
        x = x.max_pool2d(2)?;
      }

      x = block.forward_t(&x, train)?;
      tracing::debug!("Encoder stage {i}: {:?}", x.dims());
      output.push(x.clone());
    }

    Ok(output)
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

  #[test]
  fn encoder_features_shrink_and_deepen() -> Result<(), candle_core::Error> {
    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
    let encoder = Encoder::new(&[1, 4, 8, 16], vb)?;

    let x = Tensor::randn(0f32, 1., (2, 1, 20, 27), &Device::Cpu)?;
    let features = encoder.forward_t(&x, false)?;

    let dims: Vec<_> = features.iter().map(|f| f.dims().to_vec()).collect();
    assert_eq!(
      dims,
      vec![vec![2, 4, 20, 27], vec![2, 8, 10, 13], vec![2, 16, 5, 6]]
    );
    assert_eq!(encoder.shape(), 16);
    Ok(())
  }

  #[test]
  fn encoder_needs_two_channel_counts() {
    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);

    assert!(Encoder::new(&[1], vb).is_err());
  }
}
