use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(version)]
#[command(about = "U-Net for beamline simulation images", long_about = None)]
pub struct Cli {
  #[arg(short, long = "input", help = "Input image paths, a random input is used if omitted")]
  #[arg(value_name = "INPUT")]
  pub input_path: Vec<PathBuf>,

  #[arg(long, help = "Encoder channel counts")]
  #[arg(value_name = "CHANNELS", value_delimiter = ',', default_values_t = [1, 64, 128])]
  pub encoder_channels: Vec<usize>,

  #[arg(long, help = "Decoder channel counts")]
  #[arg(value_name = "CHANNELS", value_delimiter = ',', default_values_t = [128, 64])]
  pub decoder_channels: Vec<usize>,

  #[arg(short, long, help = "Number of output channels")]
  #[arg(value_name = "GROUPS", default_value = "1")]
  pub groups: usize,

  #[arg(short, long, help = "Use the parameterized variant")]
  pub param: bool,

  #[arg(short, long, help = "Load weights from a safetensors file")]
  #[arg(value_name = "WEIGHTS")]
  pub weights: Option<PathBuf>,

  #[arg(long, help = "Height of the random input [default: 132]")]
  #[arg(value_name = "HEIGHT")]
  pub height: Option<usize>,

  #[arg(long, help = "Width of the random input [default: 132, or m2 length + 1 with --param]")]
  #[arg(value_name = "WIDTH")]
  pub width: Option<usize>,

  #[arg(short, long, help = "Run the forward pass with dropout enabled")]
  pub train: bool,

  #[arg(short = 'C', long, help = "Use CPU instead of GPU")]
  pub use_cpu: bool,

  #[arg(short, long, help = "Log per-stage shapes")]
  pub verbose: bool,
}
