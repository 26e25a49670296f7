//! Region decoding on top of the `image` crate.
//!
//! The `image` crate has no tiled decode, so [`ImageRegionDecoder`] answers
//! dimension queries from the header alone and decodes the whole frame only
//! when a region is requested, dropping everything outside the region before
//! returning. Hosts with a real tiled decoder plug in their own
//! [`RegionDecoder`].

use std::io::Read;

use tracing::debug;

use super::full::{decode_full, read_dimensions, read_stream};
use super::{DecodeError, DecodedImage};
use crate::geometry::IntRect;
use crate::host::{RegionDecoder, RegionReader};
use crate::transform::crop_pixels;

/// Reference [`RegionDecoder`] for every format the `image` crate decodes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageRegionDecoder;

impl RegionDecoder for ImageRegionDecoder {
    fn open(&self, stream: Box<dyn Read + Send>) -> Result<Box<dyn RegionReader>, DecodeError> {
        let bytes = read_stream(stream)?;
        let (width, height) = read_dimensions(&bytes)?;
        Ok(Box::new(EncodedRegionReader {
            bytes,
            width,
            height,
        }))
    }
}

/// Encoded bytes plus the header dimensions.
struct EncodedRegionReader {
    bytes: Vec<u8>,
    width: u32,
    height: u32,
}

impl RegionReader for EncodedRegionReader {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn decode_region(&mut self, rect: &IntRect) -> Result<DecodedImage, DecodeError> {
        if !rect.fits_within(self.width, self.height) {
            return Err(DecodeError::RegionOutsideImage {
                rect: *rect,
                width: self.width,
                height: self.height,
            });
        }
        debug!(%rect, width = self.width, height = self.height, "decoding region");
        let full = decode_full(&self.bytes)?;
        crop_pixels(&full, rect)
    }
}
