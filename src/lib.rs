//! U-Net models for beamline simulation images, built on candle, plus the image
//! preprocessing that prepares their training data.

pub mod model;
pub mod processing;
pub mod utils;

pub use model::{ParamUnet, ParamUnetConfig, UNet, UNetConfig, Unet};
pub use processing::{ImageProcessing, LossCrop};
