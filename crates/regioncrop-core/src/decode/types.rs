//! Core types for image decoding.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::IntRect;
use crate::transform::Rotation;

/// Error types for image decoding operations.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The file format is not recognized or supported.
    #[error("Invalid or unsupported image format")]
    InvalidFormat,

    /// The image file is corrupted or incomplete.
    #[error("Corrupted or incomplete image file: {0}")]
    CorruptedFile(String),

    /// A pixel buffer could not be allocated.
    #[error("Out of memory allocating {bytes} bytes")]
    OutOfMemory { bytes: usize },

    /// I/O error during stream reading.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The requested region is not inside the encoded image.
    #[error("Region {rect} is outside of the image ({width}x{height})")]
    RegionOutsideImage { rect: IntRect, width: u32, height: u32 },
}

/// Filter type for image resizing operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    /// Nearest neighbor interpolation (fastest, lowest quality).
    Nearest,
    /// Bilinear interpolation (fast, acceptable quality).
    #[default]
    Bilinear,
    /// Lanczos3 interpolation (slower, highest quality).
    Lanczos3,
}

impl FilterType {
    /// Convert to the image crate's FilterType.
    pub fn to_image_filter(self) -> image::imageops::FilterType {
        match self {
            FilterType::Nearest => image::imageops::FilterType::Nearest,
            FilterType::Bilinear => image::imageops::FilterType::Triangle,
            FilterType::Lanczos3 => image::imageops::FilterType::Lanczos3,
        }
    }
}

/// EXIF orientation values (1-8).
/// See: https://exiftool.org/TagNames/EXIF.html
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Orientation {
    /// Normal (no transformation needed).
    #[default]
    Normal = 1,
    /// Horizontal flip.
    FlipHorizontal = 2,
    /// Rotate 180 degrees.
    Rotate180 = 3,
    /// Vertical flip.
    FlipVertical = 4,
    /// Transpose (flip horizontal + rotate 270 CW).
    Transpose = 5,
    /// Rotate 90 degrees clockwise.
    Rotate90CW = 6,
    /// Transverse (flip horizontal + rotate 90 CW).
    Transverse = 7,
    /// Rotate 270 degrees clockwise (90 CCW).
    Rotate270CW = 8,
}

impl Orientation {
    /// Display rotation for this orientation.
    ///
    /// Only the pure rotations are recognized; mirrored orientations display
    /// unrotated since the crop view cannot express a flip.
    pub fn rotation(self) -> Rotation {
        match self {
            Orientation::Rotate90CW => Rotation::Deg90,
            Orientation::Rotate180 => Rotation::Deg180,
            Orientation::Rotate270CW => Rotation::Deg270,
            _ => Rotation::Deg0,
        }
    }
}

impl From<u32> for Orientation {
    fn from(value: u32) -> Self {
        match value {
            1 => Orientation::Normal,
            2 => Orientation::FlipHorizontal,
            3 => Orientation::Rotate180,
            4 => Orientation::FlipVertical,
            5 => Orientation::Transpose,
            6 => Orientation::Rotate90CW,
            7 => Orientation::Transverse,
            8 => Orientation::Rotate270CW,
            _ => Orientation::Normal,
        }
    }
}

/// A decoded image with RGB pixel data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// RGB pixel data in row-major order (3 bytes per pixel).
    /// Length should be width * height * 3.
    pub pixels: Vec<u8>,
}

impl DecodedImage {
    /// Create a new DecodedImage with the given dimensions and pixel data.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(
            Some(pixels.len()),
            Self::buffer_len(width, height),
            "Pixel buffer size mismatch"
        );
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Allocate a zero-filled (black) image without aborting on allocation failure.
    pub fn try_blank(width: u32, height: u32) -> Result<Self, DecodeError> {
        let bytes = Self::buffer_len(width, height)
            .ok_or(DecodeError::OutOfMemory { bytes: usize::MAX })?;
        let mut pixels = Vec::new();
        pixels
            .try_reserve_exact(bytes)
            .map_err(|_| DecodeError::OutOfMemory { bytes })?;
        pixels.resize(bytes, 0);
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Check that a buffer of the given size could be allocated right now,
    /// without keeping it. Returns its length in bytes.
    pub fn ensure_allocatable(width: u32, height: u32) -> Result<usize, DecodeError> {
        let bytes = Self::buffer_len(width, height)
            .ok_or(DecodeError::OutOfMemory { bytes: usize::MAX })?;
        Vec::<u8>::new()
            .try_reserve_exact(bytes)
            .map_err(|_| DecodeError::OutOfMemory { bytes })?;
        Ok(bytes)
    }

    /// Number of bytes an RGB buffer of the given size occupies, or `None`
    /// when that does not fit in `usize`.
    pub fn buffer_len(width: u32, height: u32) -> Option<usize> {
        (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(3))
    }

    /// Create a DecodedImage from an image::RgbImage.
    pub fn from_rgb_image(img: image::RgbImage) -> Self {
        let (width, height) = img.dimensions();
        let pixels = img.into_raw();
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Convert to an image::RgbImage for further processing.
    pub fn to_rgb_image(&self) -> Option<image::RgbImage> {
        image::RgbImage::from_raw(self.width, self.height, self.pixels.clone())
    }

    /// RGB value at `(x, y)`. Coordinates must be inside the image.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let idx = ((y as usize) * (self.width as usize) + x as usize) * 3;
        [self.pixels[idx], self.pixels[idx + 1], self.pixels[idx + 2]]
    }

    /// Get the total number of pixels.
    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Get the size of the pixel buffer in bytes.
    pub fn byte_size(&self) -> usize {
        self.pixels.len()
    }

    /// Check if this is an empty/invalid image.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.pixels.is_empty()
    }
}

/// A source image: the raw decoded buffer plus the rotation needed to display it.
///
/// Width and height of the buffer are in source-encoded space; the
/// rotation-corrected size is [`Image::display_size`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub buffer: DecodedImage,
    pub rotation: Rotation,
}

impl Image {
    pub fn new(buffer: DecodedImage, rotation: Rotation) -> Self {
        Self { buffer, rotation }
    }

    /// Size of the raw buffer as stored.
    pub fn source_size(&self) -> (u32, u32) {
        (self.buffer.width, self.buffer.height)
    }

    /// Size after rotation correction (width/height swap for 90 and 270).
    pub fn display_size(&self) -> (u32, u32) {
        self.rotation
            .rotated_size(self.buffer.width, self.buffer.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_type_conversion() {
        assert!(matches!(
            FilterType::Nearest.to_image_filter(),
            image::imageops::FilterType::Nearest
        ));
        assert!(matches!(
            FilterType::Bilinear.to_image_filter(),
            image::imageops::FilterType::Triangle
        ));
        assert!(matches!(
            FilterType::Lanczos3.to_image_filter(),
            image::imageops::FilterType::Lanczos3
        ));
    }

    #[test]
    fn test_orientation_from_u32() {
        assert_eq!(Orientation::from(1), Orientation::Normal);
        assert_eq!(Orientation::from(6), Orientation::Rotate90CW);
        assert_eq!(Orientation::from(99), Orientation::Normal); // Invalid defaults to Normal
    }

    #[test]
    fn test_orientation_rotation() {
        assert_eq!(Orientation::Normal.rotation(), Rotation::Deg0);
        assert_eq!(Orientation::Rotate90CW.rotation(), Rotation::Deg90);
        assert_eq!(Orientation::Rotate180.rotation(), Rotation::Deg180);
        assert_eq!(Orientation::Rotate270CW.rotation(), Rotation::Deg270);
        // Mirrored variants are not representable as a pure rotation
        assert_eq!(Orientation::Transpose.rotation(), Rotation::Deg0);
        assert_eq!(Orientation::FlipHorizontal.rotation(), Rotation::Deg0);
    }

    #[test]
    fn test_decoded_image_creation() {
        let pixels = vec![0u8; 100 * 50 * 3];
        let img = DecodedImage::new(100, 50, pixels);

        assert_eq!(img.width, 100);
        assert_eq!(img.height, 50);
        assert_eq!(img.pixel_count(), 5000);
        assert_eq!(img.byte_size(), 15000);
        assert!(!img.is_empty());
    }

    #[test]
    fn test_decoded_image_empty() {
        let img = DecodedImage::new(0, 0, vec![]);
        assert!(img.is_empty());
    }

    #[test]
    fn test_try_blank_is_black() {
        let img = DecodedImage::try_blank(4, 3).unwrap();
        assert_eq!(img.byte_size(), 36);
        assert!(img.pixels.iter().all(|&v| v == 0));
    }

    #[test]
    fn test_buffer_len_overflow() {
        assert_eq!(DecodedImage::buffer_len(4, 3), Some(36));
        assert_eq!(DecodedImage::buffer_len(u32::MAX, u32::MAX), None);
        if usize::BITS == 32 {
            assert_eq!(DecodedImage::buffer_len(65_536, 65_536), None);
        }
    }

    #[test]
    fn test_try_blank_too_large_is_out_of_memory() {
        assert!(matches!(
            DecodedImage::try_blank(u32::MAX, u32::MAX),
            Err(DecodeError::OutOfMemory { bytes: usize::MAX })
        ));
        // Fits in usize but not in any allocation
        let (w, h) = (i32::MAX as u32, i32::MAX as u32);
        assert!(matches!(
            DecodedImage::try_blank(w, h),
            Err(DecodeError::OutOfMemory { .. })
        ));
        assert!(DecodedImage::ensure_allocatable(w, h).is_err());
    }

    #[test]
    fn test_pixel_lookup() {
        let img = DecodedImage::new(2, 1, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(img.pixel(1, 0), [4, 5, 6]);
    }

    #[test]
    fn test_image_display_size() {
        let raw = DecodedImage::try_blank(300, 200).unwrap();
        let img = Image::new(raw.clone(), Rotation::Deg90);
        assert_eq!(img.source_size(), (300, 200));
        assert_eq!(img.display_size(), (200, 300));

        let img = Image::new(raw, Rotation::Deg180);
        assert_eq!(img.display_size(), (300, 200));
    }

    #[test]
    fn test_decode_error_display() {
        let err = DecodeError::InvalidFormat;
        assert_eq!(err.to_string(), "Invalid or unsupported image format");

        let err = DecodeError::RegionOutsideImage {
            rect: IntRect::new(0, 0, 20, 20),
            width: 10,
            height: 10,
        };
        assert_eq!(
            err.to_string(),
            "Region (0, 0 - 20, 20) is outside of the image (10x10)"
        );
    }
}
