//! JPEG encoding for crop output.
//!
//! The sink writes the final cropped buffer as JPEG. Encoding goes straight
//! into the host writer so the full compressed file never has to sit in
//! memory next to the pixel buffer.

use std::io::{Cursor, Write};

use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;
use image::ImageEncoder;
use thiserror::Error;

use crate::decode::DecodedImage;

/// Errors that can occur during JPEG encoding.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Pixel data length doesn't match expected dimensions
    #[error("Invalid pixel data: expected {expected} bytes (width * height * 3), got {actual}")]
    InvalidPixelData { expected: usize, actual: usize },

    /// Width or height is zero
    #[error("Invalid dimensions: width ({width}) and height ({height}) must be non-zero")]
    InvalidDimensions { width: u32, height: u32 },

    /// JPEG encoding or the underlying write failed
    #[error("JPEG encoding failed: {0}")]
    EncodingFailed(String),
}

/// Encode `image` as JPEG into `writer`.
///
/// `quality` is clamped to 1..=100.
pub fn write_jpeg<W: Write>(
    image: &DecodedImage,
    quality: u8,
    writer: &mut W,
) -> Result<(), EncodeError> {
    let (width, height) = (image.width, image.height);
    if width == 0 || height == 0 {
        return Err(EncodeError::InvalidDimensions { width, height });
    }

    let expected = DecodedImage::buffer_len(width, height)
        .ok_or(EncodeError::InvalidDimensions { width, height })?;
    if image.pixels.len() != expected {
        return Err(EncodeError::InvalidPixelData {
            expected,
            actual: image.pixels.len(),
        });
    }

    JpegEncoder::new_with_quality(&mut *writer, quality.clamp(1, 100))
        .write_image(&image.pixels, width, height, ExtendedColorType::Rgb8)
        .map_err(|e| EncodeError::EncodingFailed(e.to_string()))?;

    writer
        .flush()
        .map_err(|e| EncodeError::EncodingFailed(e.to_string()))
}

/// Encode RGB pixel data to JPEG bytes.
///
/// # Arguments
///
/// * `pixels` - RGB pixel data (3 bytes per pixel, row-major order)
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
/// * `quality` - JPEG quality (1-100, where 100 is highest quality)
pub fn encode_jpeg(
    pixels: &[u8],
    width: u32,
    height: u32,
    quality: u8,
) -> Result<Vec<u8>, EncodeError> {
    // Validate before copying so bad input never allocates
    if width == 0 || height == 0 {
        return Err(EncodeError::InvalidDimensions { width, height });
    }
    let expected = DecodedImage::buffer_len(width, height)
        .ok_or(EncodeError::InvalidDimensions { width, height })?;
    if pixels.len() != expected {
        return Err(EncodeError::InvalidPixelData {
            expected,
            actual: pixels.len(),
        });
    }

    let image = DecodedImage::new(width, height, pixels.to_vec());
    let mut buffer = Cursor::new(Vec::new());
    write_jpeg(&image, quality, &mut buffer)?;
    Ok(buffer.into_inner())
}
