use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use beamline_unet::{ParamUnetConfig, UNetConfig};

use crate::cli::Cli;

pub fn setup_tracing(verbose: bool) {
  let subscriber = FmtSubscriber::builder()
    .with_max_level(if verbose { Level::DEBUG } else { Level::INFO })
    .with_target(false)
    .finish();

  tracing::subscriber::set_global_default(subscriber).expect("Setting default subscriber failed");
}

pub fn setup_args(args: &Cli) -> Result<ParamUnetConfig, &'static str> {
  if !args.input_path.is_empty() && (args.height.is_some() || args.width.is_some()) {
    tracing::warn!("Input images are given! Ignoring `--height` and `--width`...");
  }

  let unet = UNetConfig {
    encoder_channels: args.encoder_channels.clone(),
    decoder_channels: args.decoder_channels.clone(),
    groups: args.groups,
  };

  if unet.validate().is_err() {
    return Err("Inconsistent encoder/decoder channels or groups");
  }

  if unet.encoder_channels[0] != 1 && !args.input_path.is_empty() {
    return Err("Input images are single channel, the encoder must start with 1 channel");
  }

  Ok(ParamUnetConfig {
    unet,
    ..Default::default()
  })
}

const RANDOM_INPUT_SIZE: usize = 132;

/// Size of the random input used when no images are given.
///
/// The parameterized variant scales the decoder output along the width by `m2`, so its
/// default width is one more than `m2` (the skip crop brings it back down).
pub fn random_input_size(args: &Cli, config: &ParamUnetConfig) -> (usize, usize) {
  let default_width = if args.param {
    config.m2_len + 1
  } else {
    RANDOM_INPUT_SIZE
  };

  let width = args.width.unwrap_or(default_width);
  if args.param && width != default_width && width != config.m2_len {
    tracing::warn!(
      "ParamUnet needs a decoder output {} wide, width {width} will fail",
      config.m2_len
    );
  }

  (args.height.unwrap_or(RANDOM_INPUT_SIZE), width)
}

#[cfg(test)]
mod tests {
  use clap::Parser;

  use super::*;

  #[test]
  fn param_random_input_fits_m2() -> Result<(), &'static str> {
    let args = Cli::parse_from(["beamline-unet", "--param"]);
    let config = setup_args(&args)?;

    assert_eq!(random_input_size(&args, &config), (132, 41));
    Ok(())
  }

  #[test]
  fn plain_random_input_is_square() -> Result<(), &'static str> {
    let args = Cli::parse_from(["beamline-unet"]);
    let config = setup_args(&args)?;
    assert_eq!(random_input_size(&args, &config), (132, 132));

    let args = Cli::parse_from(["beamline-unet", "--height", "64", "--width", "48"]);
    assert_eq!(random_input_size(&args, &config), (64, 48));
    Ok(())
  }

  #[test]
  fn input_flag_is_repeatable() {
    let args = Cli::parse_from(["beamline-unet", "--input", "a.png", "-i", "b.tiff"]);
    assert_eq!(args.input_path.len(), 2);
  }
}
