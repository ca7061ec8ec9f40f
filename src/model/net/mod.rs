mod config;
mod param_unet;
mod unet;

pub use config::*;
pub use param_unet::*;
pub use unet::*;
