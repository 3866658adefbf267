//! Still image encoder trait abstraction

use bytes::Bytes;
use capture::RawFrame;
use image::RgbaImage;

use crate::EncoderResult;

/// Compression effort for lossless output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Fast,
    Default,
    Best,
}

impl Default for Compression {
    fn default() -> Self {
        Self::Default
    }
}

/// Encoder configuration
#[derive(Debug, Clone, Default)]
pub struct EncoderConfig {
    pub compression: Compression,
}

/// Encoded image output
#[derive(Debug, Clone)]
pub struct EncodedImage {
    /// Complete file contents
    pub data: Bytes,
    pub width: u32,
    pub height: u32,
    /// MIME type of `data`
    pub mime_type: &'static str,
    /// Encoding took this many microseconds
    pub encode_time_us: u64,
}

/// Still image encoder trait
pub trait FrameEncoder: Send + Sync {
    /// Encode a cropped bitmap
    fn encode_image(&self, image: &RgbaImage) -> EncoderResult<EncodedImage>;

    /// Crop a raw frame to its logical size and encode it
    fn encode_frame(&self, frame: &RawFrame) -> EncoderResult<EncodedImage> {
        let image = frame.to_rgba_image()?;
        self.encode_image(&image)
    }

    /// Get current configuration
    fn config(&self) -> &EncoderConfig;

    /// Get encoder statistics
    fn stats(&self) -> EncoderStats;
}

/// Encoder statistics
#[derive(Debug, Clone, Default)]
pub struct EncoderStats {
    /// Total images encoded
    pub images_encoded: u64,
    /// Total bytes output
    pub bytes_output: u64,
    /// Average encoding time in microseconds
    pub avg_encode_time_us: u64,
}
