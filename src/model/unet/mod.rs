mod block;
mod decoder;
mod encoder;

pub use block::*;
pub use decoder::*;
pub use encoder::*;
