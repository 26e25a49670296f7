//! Pixel and rectangle transforms: rotation compensation and cropping.
//!
//! # Coordinate Frames
//!
//! - **Source-encoded space**: the raw buffer as stored by the encoder
//! - **Image space**: the rotation-corrected buffer as the user sees it
//!
//! Crop rectangles are edited in image space; region decoders address
//! source-encoded space. [`to_source_space`] and [`to_display_space`] convert
//! between the two for the four quarter-turn rotations.

mod crop;
mod rotation;

pub use crop::{copy_region, crop_pixels};
pub use rotation::{display_matrix, rotate_image, to_display_space, to_source_space, Rotation};
