//! JPEG encoding bindings for crop results.
//!
//! ```typescript
//! const result = session.commit();
//! const jpeg = encode_result(result, 90);
//! await writable.write(new Blob([jpeg], { type: 'image/jpeg' }));
//! ```

use crate::types::{JsCropResult, JsDecodedImage};
use regioncrop_core::encode;
use wasm_bindgen::prelude::*;

/// Encode RGB pixel data (3 bytes per pixel, row-major) to JPEG bytes.
///
/// `quality` is clamped to 1-100.
#[wasm_bindgen]
pub fn encode_jpeg(pixels: &[u8], width: u32, height: u32, quality: u8) -> Result<Vec<u8>, JsValue> {
    encode::encode_jpeg(pixels, width, height, quality).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Encode the pixels of a crop result as they are. A non-zero
/// `result.rotation` has to be recorded by the caller.
#[wasm_bindgen]
pub fn encode_result(result: &JsCropResult, quality: u8) -> Result<Vec<u8>, JsValue> {
    encode_image(result.decoded(), quality).map_err(|e| JsValue::from_str(&e.to_string()))
}

pub(crate) fn encode_image(image: &JsDecodedImage, quality: u8) -> Result<Vec<u8>, encode::EncodeError> {
    encode::encode_jpeg(image.as_pixels(), image.width(), image.height(), quality)
}
