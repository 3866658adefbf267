//! Captured frame data structures

use bytes::Bytes;
use image::RgbaImage;
use std::time::Instant;

use crate::{CaptureError, CaptureResult};

/// Pixel format of the surface buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// RGBA 8-bit per channel
    Rgba8,
    /// BGRA 8-bit per channel
    Bgra8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            PixelFormat::Rgba8 | PixelFormat::Bgra8 => 4,
        }
    }
}

/// One frame as delivered by the mirror.
///
/// `row_stride` may exceed `width * pixel_stride`: rows are padded to the
/// buffer alignment of the producer.
#[derive(Debug, Clone)]
pub struct RawFrame {
    /// Raw pixel data, `row_stride * height` bytes
    pub data: Bytes,
    /// Logical width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Bytes between two horizontally adjacent pixels
    pub pixel_stride: u32,
    /// Bytes per row, including padding
    pub row_stride: u32,
    pub format: PixelFormat,
    pub timestamp: Instant,
    /// Sequence number assigned by the producer
    pub sequence: u64,
}

impl RawFrame {
    /// Padding at the end of every row, in bytes
    pub fn row_padding(&self) -> u32 {
        self.row_stride
            .saturating_sub(self.pixel_stride * self.width)
    }

    /// Width of the buffer when padding is read as pixels
    pub fn padded_width(&self) -> u32 {
        self.width + self.row_padding() / self.pixel_stride.max(1)
    }

    /// Copy the buffer into a bitmap of padded width, then crop it to the
    /// logical `width x height`.
    pub fn to_rgba_image(&self) -> CaptureResult<RgbaImage> {
        if self.pixel_stride != self.format.bytes_per_pixel() {
            return Err(CaptureError::UnsupportedFormat(format!(
                "pixel stride {} for {:?}",
                self.pixel_stride, self.format
            )));
        }

        let padded_width = self.padded_width();
        let expected = padded_width as usize * self.pixel_stride as usize * self.height as usize;
        if self.data.len() < expected {
            return Err(CaptureError::BufferTooSmall {
                expected,
                actual: self.data.len(),
            });
        }

        let bitmap = RgbaImage::from_raw(padded_width, self.height, self.data[..expected].to_vec())
            .ok_or(CaptureError::BufferTooSmall {
                expected,
                actual: self.data.len(),
            })?;

        let mut cropped = if padded_width == self.width {
            bitmap
        } else {
            image::imageops::crop_imm(&bitmap, 0, 0, self.width, self.height).to_image()
        };

        if self.format == PixelFormat::Bgra8 {
            for pixel in cropped.pixels_mut() {
                pixel.0.swap(0, 2);
            }
        }

        Ok(cropped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Frame whose padding bytes are all 0xFF and pixels encode (x, y)
    fn padded_frame(width: u32, height: u32, padding_px: u32, format: PixelFormat) -> RawFrame {
        let row_stride = (width + padding_px) * 4;
        let mut data = vec![0xFFu8; (row_stride * height) as usize];
        for y in 0..height {
            for x in 0..width {
                let offset = (y * row_stride + x * 4) as usize;
                data[offset] = x as u8;
                data[offset + 1] = y as u8;
                data[offset + 2] = 7;
                data[offset + 3] = 255;
            }
        }

        RawFrame {
            data: Bytes::from(data),
            width,
            height,
            pixel_stride: 4,
            row_stride,
            format,
            timestamp: Instant::now(),
            sequence: 0,
        }
    }

    #[test]
    fn test_crop_strips_row_padding() {
        let frame = padded_frame(10, 4, 6, PixelFormat::Rgba8);
        assert_eq!(frame.row_padding(), 24);
        assert_eq!(frame.padded_width(), 16);

        let image = frame.to_rgba_image().unwrap();
        assert_eq!(image.dimensions(), (10, 4));

        // Every pixel keeps its own coordinates: no row shear
        for (x, y, pixel) in image.enumerate_pixels() {
            assert_eq!(pixel.0, [x as u8, y as u8, 7, 255]);
        }
    }

    #[test]
    fn test_unpadded_frame_passes_through() {
        let frame = padded_frame(8, 3, 0, PixelFormat::Rgba8);
        let image = frame.to_rgba_image().unwrap();
        assert_eq!(image.dimensions(), (8, 3));
        assert_eq!(image.get_pixel(7, 2).0, [7, 2, 7, 255]);
    }

    #[test]
    fn test_bgra_is_swizzled() {
        let frame = padded_frame(4, 2, 2, PixelFormat::Bgra8);
        let image = frame.to_rgba_image().unwrap();
        assert_eq!(image.get_pixel(3, 1).0, [7, 1, 3, 255]);
    }

    #[test]
    fn test_short_buffer_rejected() {
        let mut frame = padded_frame(4, 4, 0, PixelFormat::Rgba8);
        frame.data = frame.data.slice(..10);
        assert!(matches!(
            frame.to_rgba_image(),
            Err(CaptureError::BufferTooSmall { .. })
        ));
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_huge_frame_size_does_not_wrap() {
        // 70000 * 4 * 70000 overflows u32
        let frame = RawFrame {
            data: Bytes::from(vec![0u8; 64]),
            width: 70_000,
            height: 70_000,
            pixel_stride: 4,
            row_stride: 280_000,
            format: PixelFormat::Rgba8,
            timestamp: Instant::now(),
            sequence: 0,
        };

        match frame.to_rgba_image() {
            Err(CaptureError::BufferTooSmall { expected, actual }) => {
                assert_eq!(expected, 19_600_000_000);
                assert_eq!(actual, 64);
            }
            other => panic!("expected BufferTooSmall, got {:?}", other.map(|i| i.dimensions())),
        }
    }
}
