/// Channel layout of a [`super::UNet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UNetConfig {
  pub encoder_channels: Vec<usize>,
  pub decoder_channels: Vec<usize>,
  pub groups: usize,
}

impl Default for UNetConfig {
  fn default() -> Self {
    Self {
      encoder_channels: vec![1, 64, 128],
      decoder_channels: vec![128, 64],
      groups: 1,
    }
  }
}

impl UNetConfig {
  pub fn validate(&self) -> Result<(), candle_core::Error> {
    let fail = |msg: String| Err(candle_core::Error::Msg(msg).bt());

    if self.encoder_channels.len() < 2 || self.decoder_channels.len() < 2 {
      return fail("encoder and decoder need at least two channel counts each".to_owned());
    }

    if self
      .encoder_channels
      .iter()
      .chain(&self.decoder_channels)
      .any(|&c| c == 0)
      || self.groups == 0
    {
      return fail("channel counts and groups must be positive".to_owned());
    }

    let deepest = self.encoder_channels.iter().copied().max().unwrap_or_default();
    if self.decoder_channels[0] != deepest {
      return fail(format!(
        "decoder starts with {} channels but the encoder reaches {deepest}",
        self.decoder_channels[0]
      ));
    }

    Ok(())
  }

  pub fn out_channels(&self) -> usize {
    self.decoder_channels.last().copied().unwrap_or_default()
  }

  /// Number of learned scalars the network registers.
  pub fn num_parameters(&self) -> usize {
    let block = |i: usize, o: usize| (i * o * 9 + o) + (o * o * 9 + o);
    let upconv = |i: usize, o: usize| i * o * 4 + o;

    let encoder: usize = self
      .encoder_channels
      .windows(2)
      .map(|p| block(p[0], p[1]))
      .sum();

    let decoder: usize = self
      .decoder_channels
      .windows(2)
      .map(|p| upconv(p[0], p[1]) + block(p[0], p[1]))
      .sum();

    let head = self.out_channels() * self.groups + self.groups;

    encoder + decoder + head
  }
}

/// [`UNetConfig`] plus the lengths of the two scaling vectors of a [`super::ParamUnet`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamUnetConfig {
  pub unet: UNetConfig,
  pub m1_len: usize,
  pub m2_len: usize,
}

impl Default for ParamUnetConfig {
  fn default() -> Self {
    Self {
      unet: UNetConfig::default(),
      m1_len: 41,
      m2_len: 40,
    }
  }
}

impl ParamUnetConfig {
  pub fn num_parameters(&self) -> usize {
    self.unet.num_parameters() + self.m1_len + self.m2_len
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_config_is_valid() {
    assert!(UNetConfig::default().validate().is_ok());
  }

  #[test]
  fn mismatched_decoder_is_rejected() {
    let config = UNetConfig {
      encoder_channels: vec![1, 64, 128],
      decoder_channels: vec![64, 32],
      groups: 1,
    };
    assert!(config.validate().is_err());

    let config = UNetConfig {
      decoder_channels: vec![128],
      ..Default::default()
    };
    assert!(config.validate().is_err());

    let config = UNetConfig {
      groups: 0,
      ..Default::default()
    };
    assert!(config.validate().is_err());
  }

  #[test]
  fn default_parameter_count() {
    // encoder: (1*64*9+64 + 64*64*9+64) + (64*128*9+128 + 128*128*9+128)
    // decoder: 128*64*4+64 + 128*64*9+64 + 64*64*9+64
    // head: 64+1
    assert_eq!(UNetConfig::default().num_parameters(), 37_568 + 221_440 + 143_552 + 65);
    assert_eq!(
      ParamUnetConfig::default().num_parameters(),
      UNetConfig::default().num_parameters() + 81
    );
  }
}
