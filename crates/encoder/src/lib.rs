//! Still Image Encoder - lossless encoding for Snapfloat captures
//!
//! Provides abstraction over still image backends:
//! - PNG via the `image` crate (the only output format)

mod error;
mod png_encoder;
mod traits;

pub use error::*;
pub use png_encoder::*;
pub use traits::*;
