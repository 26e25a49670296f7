//! Image resizing for output sizing.
//!
//! Provides resize operations using the `image` crate's algorithms.
//! All functions return new `DecodedImage` instances without modifying the input.

use super::{DecodeError, DecodedImage, FilterType};

/// Resize an image to exact dimensions.
///
/// # Arguments
///
/// * `image` - The source image to resize
/// * `width` - Target width in pixels
/// * `height` - Target height in pixels
/// * `filter` - Interpolation filter to use
///
/// # Errors
///
/// Returns `DecodeError::InvalidFormat` for a zero target dimension and
/// `DecodeError::CorruptedFile` if the source buffer does not match its size.
pub fn resize(
    image: &DecodedImage,
    width: u32,
    height: u32,
    filter: FilterType,
) -> Result<DecodedImage, DecodeError> {
    if width == 0 || height == 0 {
        return Err(DecodeError::InvalidFormat);
    }

    // Fast path: if dimensions match, just clone
    if image.width == width && image.height == height {
        return Ok(image.clone());
    }

    let rgb_image = image
        .to_rgb_image()
        .ok_or_else(|| DecodeError::CorruptedFile("Failed to create RgbImage".to_string()))?;

    let resized = image::imageops::resize(&rgb_image, width, height, filter.to_image_filter());

    Ok(DecodedImage::from_rgb_image(resized))
}

/// Dimensions of a `width` x `height` image shrunk into the max box.
///
/// With both limits the tighter one wins; the derived side is rounded with a
/// 0.5 bias. A single limit only constrains its own axis. Dimensions that
/// already fit are returned unchanged.
pub fn fit_within(
    width: u32,
    height: u32,
    max_width: Option<u32>,
    max_height: Option<u32>,
) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (width, height);
    }

    let max_width = max_width.filter(|&m| m > 0);
    let max_height = max_height.filter(|&m| m > 0);
    let ratio = width as f64 / height as f64;

    match (max_width, max_height) {
        (Some(mw), Some(mh)) if width > mw || height > mh => {
            if mw as f64 / mh as f64 > ratio {
                (round_half_up(mh as f64 * ratio), mh)
            } else {
                (mw, round_half_up(mw as f64 / ratio))
            }
        }
        (Some(mw), None) if width > mw => (mw, round_half_up(mw as f64 / ratio)),
        (None, Some(mh)) if height > mh => (round_half_up(mh as f64 * ratio), mh),
        _ => (width, height),
    }
}

#[inline]
fn round_half_up(v: f64) -> u32 {
    ((v + 0.5) as u32).max(1)
}
