mod cli;
mod setup;

use candle_core::{DType, Device, ModuleT, Tensor};
use candle_nn::{VarBuilder, VarMap};
use clap::Parser;

use beamline_unet::{utils::load_image, ImageProcessing, ParamUnet, UNet, Unet};

use crate::{
  cli::Cli,
  setup::{random_input_size, setup_args, setup_tracing},
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
  let args = Cli::parse();

  setup_tracing(args.verbose);

  let config = setup_args(&args)?;

  let device = if args.use_cpu {
    Device::Cpu
  } else {
    Device::cuda_if_available(0)?
  };

  let varmap = VarMap::new();
  let vb = if let Some(weights) = &args.weights {
    // SAFETY: the weights file is not modified while mapped.
    unsafe { VarBuilder::from_mmaped_safetensors(&[weights], DType::F32, &device)? }
  } else {
    VarBuilder::from_varmap(&varmap, DType::F32, &device)
  };

  let (model, num_parameters) = if args.param {
    (
      Unet::Param(ParamUnet::new(&config, vb)?),
      config.num_parameters(),
    )
  } else {
    (
      Unet::Plain(UNet::new(&config.unet, vb)?),
      config.unet.num_parameters(),
    )
  };

  tracing::info!(
    "Built {} with {num_parameters} parameters",
    if args.param { "ParamUnet" } else { "UNet" }
  );

  let x = if args.input_path.is_empty() {
    let (height, width) = random_input_size(&args, &config);

    Tensor::randn(
      0f32,
      1.,
      (1, config.unet.encoder_channels[0], height, width),
      &device,
    )?
  } else {
    let images = args
      .input_path
      .iter()
      .map(|path| load_image(path, &device))
      .collect::<Result<Vec<_>, _>>()?;

    let processing = ImageProcessing::new(images);
    let (height, length) = processing.smallest_image_size()?;
    tracing::info!("Smallest image is {height}x{length}");

    processing.batch(height, length)?
  };

  tracing::info!("Input shape: {:?}", x.dims());

  let y = model.forward_t(&x, args.train)?;

  let mean = y.mean_all()?.to_scalar::<f32>()?;
  let min = y.flatten_all()?.min(0)?.to_scalar::<f32>()?;
  let max = y.flatten_all()?.max(0)?.to_scalar::<f32>()?;

  tracing::info!("Output shape: {:?}", y.dims());
  tracing::info!("Output mean {mean:.4}, min {min:.4}, max {max:.4}");

  Ok(())
}
