//! PNG encoder implementation

use bytes::Bytes;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder as _, RgbaImage};
use parking_lot::Mutex;
use std::time::Instant;
use tracing::debug;

use crate::{
    Compression, EncodedImage, EncoderConfig, EncoderError, EncoderResult, EncoderStats,
    FrameEncoder,
};

pub const PNG_MIME_TYPE: &str = "image/png";

/// Lossless PNG encoder
pub struct PngFrameEncoder {
    config: EncoderConfig,
    stats: Mutex<EncoderStats>,
}

impl PngFrameEncoder {
    pub fn new(config: EncoderConfig) -> Self {
        Self {
            config,
            stats: Mutex::new(EncoderStats::default()),
        }
    }

    fn compression_type(&self) -> CompressionType {
        match self.config.compression {
            Compression::Fast => CompressionType::Fast,
            Compression::Default => CompressionType::Default,
            Compression::Best => CompressionType::Best,
        }
    }

    fn record(&self, bytes: usize, elapsed_us: u64) {
        let mut stats = self.stats.lock();
        let total_time = stats.avg_encode_time_us * stats.images_encoded + elapsed_us;
        stats.images_encoded += 1;
        stats.bytes_output += bytes as u64;
        stats.avg_encode_time_us = total_time / stats.images_encoded;
    }
}

impl Default for PngFrameEncoder {
    fn default() -> Self {
        Self::new(EncoderConfig::default())
    }
}

impl FrameEncoder for PngFrameEncoder {
    fn encode_image(&self, image: &RgbaImage) -> EncoderResult<EncodedImage> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(EncoderError::UnsupportedResolution { width, height });
        }

        let start = Instant::now();
        let mut out = Vec::with_capacity((width * height) as usize);
        PngEncoder::new_with_quality(&mut out, self.compression_type(), FilterType::Adaptive)
            .write_image(image.as_raw(), width, height, ExtendedColorType::Rgba8)
            .map_err(|e| EncoderError::EncodingFailed(e.to_string()))?;

        let encode_time_us = start.elapsed().as_micros() as u64;
        self.record(out.len(), encode_time_us);
        debug!(
            "Encoded {}x{} PNG: {} bytes in {}us",
            width,
            height,
            out.len(),
            encode_time_us
        );

        Ok(EncodedImage {
            data: Bytes::from(out),
            width,
            height,
            mime_type: PNG_MIME_TYPE,
            encode_time_us,
        })
    }

    fn config(&self) -> &EncoderConfig {
        &self.config
    }

    fn stats(&self) -> EncoderStats {
        self.stats.lock().clone()
    }
}
