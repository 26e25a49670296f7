//! WASM-compatible wrapper types for crop results.
//!
//! Pixel buffers stay in WASM memory until JavaScript asks for them; getters
//! that return `Vec<u8>` copy into a `Uint8Array`.

use regioncrop_core::decode::DecodedImage;
use regioncrop_core::pipeline::CropOutput;
use wasm_bindgen::prelude::*;

/// An RGB image for JavaScript.
#[wasm_bindgen]
pub struct JsDecodedImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

#[wasm_bindgen]
impl JsDecodedImage {
    /// Create a new JsDecodedImage from dimensions and RGB pixel data
    /// (3 bytes per pixel, row-major order).
    #[wasm_bindgen(constructor)]
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> JsDecodedImage {
        JsDecodedImage {
            width,
            height,
            pixels,
        }
    }

    #[wasm_bindgen(getter)]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[wasm_bindgen(getter)]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of bytes in the pixel buffer (width * height * 3).
    #[wasm_bindgen(getter)]
    pub fn byte_length(&self) -> usize {
        self.pixels.len()
    }

    /// Returns RGB pixel data as Uint8Array. This copies the buffer.
    pub fn pixels(&self) -> Vec<u8> {
        self.pixels.clone()
    }
}

impl JsDecodedImage {
    pub(crate) fn from_decoded(img: DecodedImage) -> Self {
        Self {
            width: img.width,
            height: img.height,
            pixels: img.pixels,
        }
    }

    pub(crate) fn as_pixels(&self) -> &[u8] {
        &self.pixels
    }
}

/// The outcome of a successful commit.
///
/// `rotation` is the clockwise rotation still needed to show `image`
/// upright. It is non-zero only when the crop came from the partial-region
/// path; hosts either record it (EXIF) or call `oriented()`.
#[wasm_bindgen]
pub struct JsCropResult {
    image: JsDecodedImage,
    rotation: i32,
    circular: bool,
    crop: [i32; 4],
}

#[wasm_bindgen]
impl JsCropResult {
    /// Cropped pixels as produced by the pipeline.
    pub fn image(&self) -> JsDecodedImage {
        JsDecodedImage::new(self.image.width, self.image.height, self.image.pixels())
    }

    /// Cropped pixels rotated upright.
    pub fn oriented(&self) -> Result<JsDecodedImage, JsValue> {
        let rotation = regioncrop_core::Rotation::from_degrees(self.rotation)
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(self.oriented_with(rotation))
    }

    #[wasm_bindgen(getter)]
    pub fn rotation(&self) -> i32 {
        self.rotation
    }

    /// Whether the host asked for a circular crop. The mask is not applied.
    #[wasm_bindgen(getter)]
    pub fn circular(&self) -> bool {
        self.circular
    }

    /// Committed rectangle in image space as `[left, top, right, bottom]`.
    #[wasm_bindgen(getter)]
    pub fn crop(&self) -> Vec<i32> {
        self.crop.to_vec()
    }
}

impl JsCropResult {
    pub(crate) fn from_output(output: CropOutput) -> Self {
        let crop = output.crop;
        Self {
            image: JsDecodedImage::from_decoded(output.image),
            rotation: output.rotation.degrees(),
            circular: output.circular,
            crop: [crop.left, crop.top, crop.right, crop.bottom],
        }
    }

    pub(crate) fn decoded(&self) -> &JsDecodedImage {
        &self.image
    }

    fn oriented_with(&self, rotation: regioncrop_core::Rotation) -> JsDecodedImage {
        let decoded = DecodedImage::new(self.image.width, self.image.height, self.image.pixels());
        JsDecodedImage::from_decoded(regioncrop_core::transform::rotate_image(decoded, rotation))
    }
}
