//! Sizing the cropped pixels into the requested output.
//!
//! # Policies
//!
//! - **Fill** (fixed size, no scaling): the crop is centered in a buffer of
//!   the exact target size; whatever does not fit is cut off evenly on both
//!   sides, uncovered pixels stay black
//! - **Fit** (fixed size, scaling): the crop is resized to exactly the
//!   target. Without `scale_up`, a crop smaller than the target on either
//!   axis is centered unscaled instead, with the same rule as fill
//! - **Max box** (no fixed size): downscale only, preserving aspect
//!
//! Partial-path buffers are still in source orientation, so target sizes are
//! swapped for quarter rotations before they are applied. Centering rounds
//! toward the upright top-left corner, so both paths cut the same pixels.

use tracing::debug;

use crate::config::OutputSpec;
use crate::decode::{fit_within, resize, DecodedImage};
use crate::error::CropError;
use crate::geometry::IntRect;
use crate::transform::{copy_region, Rotation};

/// Apply the output policy of `spec` to a cropped buffer whose pixels are
/// `orientation` away from upright.
pub fn finish(
    image: DecodedImage,
    spec: &OutputSpec,
    orientation: Rotation,
) -> Result<DecodedImage, CropError> {
    if let Some((w, h)) = spec.fixed_size() {
        let (tw, th) = orientation.rotated_size(w, h);
        if !spec.scale {
            return center_into(&image, tw, th, orientation);
        }
        if !spec.scale_up && (image.width < tw || image.height < th) {
            return center_into(&image, tw, th, orientation);
        }
        debug!(from_w = image.width, from_h = image.height, tw, th, "fit to output size");
        return Ok(resize(&image, tw, th, spec.filter)?);
    }

    if let Some((w, h)) = max_box_size(spec, image.width, image.height, orientation) {
        debug!(from_w = image.width, from_h = image.height, w, h, "downscale to max box");
        return Ok(resize(&image, w, h, spec.filter)?);
    }

    Ok(image)
}

/// Size of the buffer [`finish`] allocates for a `width` x `height` crop,
/// or `None` when the crop passes through unchanged.
pub fn planned_size(
    spec: &OutputSpec,
    width: u32,
    height: u32,
    orientation: Rotation,
) -> Option<(u32, u32)> {
    match spec.fixed_size() {
        Some((w, h)) => Some(orientation.rotated_size(w, h)),
        None => max_box_size(spec, width, height, orientation),
    }
}

fn max_box_size(
    spec: &OutputSpec,
    width: u32,
    height: u32,
    orientation: Rotation,
) -> Option<(u32, u32)> {
    if !spec.has_max_box() {
        return None;
    }
    let (max_w, max_h) = if orientation.swaps_dimensions() {
        (spec.max_height, spec.max_width)
    } else {
        (spec.max_width, spec.max_height)
    };
    let size = fit_within(width, height, max_w, max_h);
    (size != (width, height)).then_some(size)
}

/// Center `image` in a black `width` x `height` buffer without scaling.
///
/// `orientation` is the rotation still needed to show `image` upright. Odd
/// leftovers go to the same upright side whatever the orientation.
pub fn center_into(
    image: &DecodedImage,
    width: u32,
    height: u32,
    orientation: Rotation,
) -> Result<DecodedImage, CropError> {
    let mut out = DecodedImage::try_blank(width, height)?;
    let (flip_x, flip_y) = reversed_axes(orientation);

    let off_x = leading(image.width.saturating_sub(width), flip_x);
    let off_y = leading(image.height.saturating_sub(height), flip_y);
    let copy_w = width.min(image.width);
    let copy_h = height.min(image.height);
    let dst_x = leading(width - copy_w, flip_x);
    let dst_y = leading(height - copy_h, flip_y);

    let src_rect = IntRect::new(
        off_x as i32,
        off_y as i32,
        (off_x + copy_w) as i32,
        (off_y + copy_h) as i32,
    );
    copy_region(image, &src_rect, &mut out, dst_x as i32, dst_y as i32);
    Ok(out)
}

/// Which buffer axes run backwards once the buffer is turned upright.
fn reversed_axes(orientation: Rotation) -> (bool, bool) {
    match orientation {
        Rotation::Deg0 => (false, false),
        Rotation::Deg90 => (false, true),
        Rotation::Deg180 => (true, true),
        Rotation::Deg270 => (true, false),
    }
}

/// Share of `delta` before the content: the smaller half upright.
fn leading(delta: u32, reversed: bool) -> u32 {
    if reversed {
        delta - delta / 2
    } else {
        delta / 2
    }
}
