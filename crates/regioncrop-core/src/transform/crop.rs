//! Pixel-exact rectangle copies.
//!
//! Unlike the interactive crop region, these operate on integer pixel
//! rectangles and never clamp: a rectangle outside the image is an error,
//! because silently shrinking it would change what the user selected.

use crate::decode::{DecodeError, DecodedImage};
use crate::geometry::IntRect;

/// Copy the pixels inside `rect` into a new image.
///
/// # Errors
///
/// Returns `DecodeError::RegionOutsideImage` when `rect` is empty or not
/// fully inside the image, and `DecodeError::OutOfMemory` when the output
/// buffer cannot be allocated.
pub fn crop_pixels(image: &DecodedImage, rect: &IntRect) -> Result<DecodedImage, DecodeError> {
    if !rect.fits_within(image.width, image.height) {
        return Err(DecodeError::RegionOutsideImage {
            rect: *rect,
            width: image.width,
            height: image.height,
        });
    }

    // Fast path: full crop returns a clone
    if rect.width() as u32 == image.width && rect.height() as u32 == image.height {
        return Ok(image.clone());
    }

    let mut output = DecodedImage::try_blank(rect.width() as u32, rect.height() as u32)?;
    copy_region(image, rect, &mut output, 0, 0);
    Ok(output)
}

/// Copy `src_rect` of `src` into `dst` with its top-left corner at `(dst_x, dst_y)`.
///
/// Rows and columns falling outside either image are skipped.
pub fn copy_region(
    src: &DecodedImage,
    src_rect: &IntRect,
    dst: &mut DecodedImage,
    dst_x: i32,
    dst_y: i32,
) {
    let src_w = src.width as i32;
    let src_h = src.height as i32;
    let dst_w = dst.width as i32;
    let dst_h = dst.height as i32;

    // Column span valid in both images
    let mut x0 = src_rect.left.max(0);
    let mut x1 = src_rect.right.min(src_w);
    x0 = x0.max(src_rect.left - dst_x);
    x1 = x1.min(src_rect.left - dst_x + dst_w);
    if x1 <= x0 {
        return;
    }
    let row_bytes = ((x1 - x0) * 3) as usize;

    // Copy pixel data row by row for efficiency
    for src_y in src_rect.top.max(0)..src_rect.bottom.min(src_h) {
        let y = dst_y + (src_y - src_rect.top);
        if y < 0 || y >= dst_h {
            continue;
        }
        let x = dst_x + (x0 - src_rect.left);
        let src_start = ((src_y * src_w + x0) * 3) as usize;
        let dst_start = ((y * dst_w + x) * 3) as usize;
        dst.pixels[dst_start..dst_start + row_bytes]
            .copy_from_slice(&src.pixels[src_start..src_start + row_bytes]);
    }
}


// ============================================================================
// Property-Based Tests
// ============================================================================
