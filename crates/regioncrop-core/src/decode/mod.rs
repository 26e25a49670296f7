//! Image decoding for the crop pipeline.
//!
//! This module provides functionality for:
//! - Decoding whole images without applying EXIF orientation
//! - Reading the EXIF rotation beside the raw buffer
//! - Decoding sub-regions through the [`RegionDecoder`](crate::host::RegionDecoder) seam
//! - Resizing for output sizing
//!
//! # Raw buffers
//!
//! Decoded buffers always stay in source-encoded orientation. The display
//! rotation travels next to them in [`Image`], and the crop pipeline folds
//! it into its transform instead of rotating pixels up front.
//!
//! # Examples
//!
//! ```ignore
//! use regioncrop_core::decode::decode_image;
//!
//! let bytes = std::fs::read("photo.jpg").unwrap();
//! let image = decode_image(&bytes, None).unwrap();
//! println!("{:?} shown as {:?}", image.source_size(), image.display_size());
//! ```

mod full;
mod region;
mod resize;
mod types;

pub use full::{
    decode_full, decode_image, read_dimensions, read_orientation, read_rotation, read_stream,
};
pub use region::ImageRegionDecoder;
pub use resize::{fit_within, resize};
pub use types::{DecodeError, DecodedImage, FilterType, Image, Orientation};

#[cfg(test)]
pub(crate) use full::test_support;
