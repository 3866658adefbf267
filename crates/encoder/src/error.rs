//! Encoder error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EncoderError {
    #[error("Encoding failed: {0}")]
    EncodingFailed(String),

    #[error("Unsupported resolution: {width}x{height}")]
    UnsupportedResolution { width: u32, height: u32 },

    #[error("Frame conversion failed: {0}")]
    Frame(#[from] capture::CaptureError),
}

pub type EncoderResult<T> = Result<T, EncoderError>;
