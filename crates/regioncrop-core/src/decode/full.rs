//! Whole-image decoding and EXIF rotation lookup.
//!
//! Decoding never applies the EXIF orientation: the raw buffer is kept in
//! source-encoded orientation and the rotation travels beside it in
//! [`Image`], so the pipeline can address the encoded pixels directly.

use std::io::{Cursor, Read};

use exif::{In, Reader, Tag};
use image::ImageReader;

use super::{DecodeError, DecodedImage, Image, Orientation};
use crate::transform::Rotation;

/// Decode an image (any enabled format) from bytes without applying EXIF orientation.
///
/// # Errors
///
/// Returns `DecodeError::CorruptedFile` if the bytes are not a decodable image.
pub fn decode_full(bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
    let cursor = Cursor::new(bytes);
    let reader = ImageReader::new(cursor)
        .with_guessed_format()
        .map_err(|e| DecodeError::CorruptedFile(e.to_string()))?;

    if reader.format().is_none() {
        return Err(DecodeError::InvalidFormat);
    }

    let img = reader
        .decode()
        .map_err(|e| DecodeError::CorruptedFile(e.to_string()))?;

    Ok(DecodedImage::from_rgb_image(img.into_rgb8()))
}

/// Decode bytes into an [`Image`], using `rotation` when given and the EXIF
/// orientation otherwise.
pub fn decode_image(bytes: &[u8], rotation: Option<Rotation>) -> Result<Image, DecodeError> {
    let rotation = rotation.unwrap_or_else(|| read_rotation(bytes));
    Ok(Image::new(decode_full(bytes)?, rotation))
}

/// Read only the header to get the encoded width and height.
pub fn read_dimensions(bytes: &[u8]) -> Result<(u32, u32), DecodeError> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| DecodeError::CorruptedFile(e.to_string()))?
        .into_dimensions()
        .map_err(|e| DecodeError::CorruptedFile(e.to_string()))
}

/// Drain a host stream into memory.
pub fn read_stream(mut stream: impl Read) -> Result<Vec<u8>, DecodeError> {
    let mut bytes = Vec::new();
    stream.read_to_end(&mut bytes)?;
    Ok(bytes)
}

/// Extract EXIF orientation from image bytes.
///
/// Returns `Orientation::Normal` if no EXIF data is found or orientation
/// cannot be determined.
pub fn read_orientation(bytes: &[u8]) -> Orientation {
    let exif_reader = Reader::new();
    let mut cursor = Cursor::new(bytes);

    match exif_reader.read_from_container(&mut cursor) {
        Ok(exif) => exif
            .get_field(Tag::Orientation, In::PRIMARY)
            .and_then(|field| field.value.get_uint(0))
            .map(Orientation::from)
            .unwrap_or_default(),
        Err(_) => Orientation::Normal,
    }
}

/// Display rotation stored in the EXIF orientation tag (0 when absent).
pub fn read_rotation(bytes: &[u8]) -> Rotation {
    read_orientation(bytes).rotation()
}
