//! Quarter-turn rotation between source-encoded and rotation-corrected space.
//!
//! Source images carry a stored rotation (typically from the EXIF orientation
//! tag) that says how the raw buffer must be turned, clockwise, to display
//! upright. The crop rectangle is edited in the rotation-corrected frame, while
//! a region decoder addresses the raw frame, so rectangles are mapped between
//! the two here.
//!
//! # Algorithm
//!
//! Mapping into source space rotates the rectangle's corners by `-rotation`
//! about the origin and takes the bounding box. The rotated box lands in a
//! negative quadrant, so it is shifted back by the source width (when the
//! left edge is negative) and the source height (when the top is negative):
//!
//! ```text
//!  90:  (x, y) -> (y, -x)  -> (y, H - x)
//! 180:  (x, y) -> (-x, -y) -> (W - x, H - y)
//! 270:  (x, y) -> (-y, x)  -> (W - y, x)
//! ```
//!
//! Quarter-turn matrices use exact 0/±1 entries, so integer rectangles map to
//! integer rectangles and round-trip exactly.

use serde::{Deserialize, Serialize};

use crate::decode::{DecodedImage, Orientation};
use crate::error::CropError;
use crate::geometry::{Affine, IntRect, Rect};

/// Clockwise rotation needed to display a raw buffer upright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Parse a rotation in degrees. Any multiple of 90 is accepted and
    /// normalized into `0..360`.
    pub fn from_degrees(degrees: i32) -> Result<Self, CropError> {
        if degrees % 90 != 0 {
            return Err(CropError::InvalidRotation(degrees));
        }
        Ok(match degrees.rem_euclid(360) {
            90 => Rotation::Deg90,
            180 => Rotation::Deg180,
            270 => Rotation::Deg270,
            _ => Rotation::Deg0,
        })
    }

    /// Rotation for an EXIF orientation tag value. Tags 3, 6 and 8 are the
    /// pure rotations; everything else (including the mirrored variants) is 0.
    pub fn from_exif(tag: u32) -> Self {
        Orientation::from(tag).rotation()
    }

    pub fn degrees(self) -> i32 {
        self.quarter_turns() * 90
    }

    pub fn quarter_turns(self) -> i32 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 1,
            Rotation::Deg180 => 2,
            Rotation::Deg270 => 3,
        }
    }

    pub fn is_identity(self) -> bool {
        self == Rotation::Deg0
    }

    /// Returns true if this rotation swaps width and height.
    #[inline]
    pub fn swaps_dimensions(self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }

    /// Size of a `width` x `height` buffer after this rotation.
    pub fn rotated_size(self, width: u32, height: u32) -> (u32, u32) {
        if self.swaps_dimensions() {
            (height, width)
        } else {
            (width, height)
        }
    }
}

impl TryFrom<i32> for Rotation {
    type Error = CropError;

    fn try_from(degrees: i32) -> Result<Self, Self::Error> {
        Rotation::from_degrees(degrees)
    }
}

impl From<Rotation> for i32 {
    fn from(rotation: Rotation) -> Self {
        rotation.degrees()
    }
}

/// Matrix mapping raw source coordinates onto rotation-corrected coordinates.
///
/// The raw bounds are rotated about the origin and translated back into the
/// positive quadrant, so `(0, 0, w, h)` maps onto the display bounds.
pub fn display_matrix(rotation: Rotation, source_width: u32, source_height: u32) -> Affine {
    let turn = Affine::quarter_turns(rotation.quarter_turns());
    let bounds = turn.map_rect(&Rect::from_size(
        source_width as f64,
        source_height as f64,
    ));
    turn.then(&Affine::translation(-bounds.left, -bounds.top))
}

/// Map a rectangle from rotation-corrected space into source-encoded space.
///
/// `source_width`/`source_height` are the dimensions reported by the decoder
/// for the raw, unrotated image.
pub fn to_source_space(
    rect: &IntRect,
    rotation: Rotation,
    source_width: u32,
    source_height: u32,
) -> IntRect {
    if rotation.is_identity() {
        return *rect;
    }
    let inverse = Affine::quarter_turns(-rotation.quarter_turns());
    let mapped = inverse.map_rect(&rect.to_rect());
    let dx = if mapped.left < 0.0 {
        source_width as f64
    } else {
        0.0
    };
    let dy = if mapped.top < 0.0 {
        source_height as f64
    } else {
        0.0
    };
    truncate(&mapped.offset(dx, dy))
}

/// Map a rectangle from source-encoded space into rotation-corrected space.
///
/// Inverse of [`to_source_space`] for the same rotation and source size.
pub fn to_display_space(
    rect: &IntRect,
    rotation: Rotation,
    source_width: u32,
    source_height: u32,
) -> IntRect {
    if rotation.is_identity() {
        return *rect;
    }
    let (display_width, display_height) = rotation.rotated_size(source_width, source_height);
    let forward = Affine::quarter_turns(rotation.quarter_turns());
    let mapped = forward.map_rect(&rect.to_rect());
    let dx = if mapped.left < 0.0 {
        display_width as f64
    } else {
        0.0
    };
    let dy = if mapped.top < 0.0 {
        display_height as f64
    } else {
        0.0
    };
    truncate(&mapped.offset(dx, dy))
}

/// Rotate pixel data clockwise by the given rotation.
pub fn rotate_image(image: DecodedImage, rotation: Rotation) -> DecodedImage {
    if rotation.is_identity() {
        return image;
    }
    let Some(rgb) = image.to_rgb_image() else {
        return image;
    };
    let rotated = match rotation {
        Rotation::Deg90 => image::imageops::rotate90(&rgb),
        Rotation::Deg180 => image::imageops::rotate180(&rgb),
        Rotation::Deg270 => image::imageops::rotate270(&rgb),
        Rotation::Deg0 => rgb,
    };
    DecodedImage::from_rgb_image(rotated)
}

fn truncate(r: &Rect) -> IntRect {
    IntRect::new(r.left as i32, r.top as i32, r.right as i32, r.bottom as i32)
}


// ============================================================================
// Property-Based Tests
// ============================================================================
