//! Regioncrop WASM - WebAssembly bindings for the crop session
//!
//! This crate exposes a `regioncrop-core` crop session to JavaScript/TypeScript
//! hosts: the host draws the image, forwards pointer events and commits.
//!
//! # Module Structure
//!
//! - `session` - `JsCropSession`, the interactive crop session
//! - `types` - WASM-compatible wrappers for images and crop results
//! - `encode` - JPEG encoding of crop results
//!
//! # Usage
//!
//! ```typescript
//! import init, { JsCropSession, encode_result } from '@regioncrop/wasm';
//!
//! await init();
//!
//! const bytes = new Uint8Array(await file.arrayBuffer());
//! const session = new JsCropSession(bytes, { aspect_x: 16, aspect_y: 9 }, 800, 600);
//! // ...forward pointer events, then:
//! const result = session.commit();
//! const jpeg = encode_result(result, 90);
//! ```

use wasm_bindgen::prelude::*;

mod encode;
mod session;
mod types;

pub use encode::{encode_jpeg, encode_result};
pub use session::JsCropSession;
pub use types::{JsCropResult, JsDecodedImage};

/// Initialize the WASM module (called automatically on load)
#[wasm_bindgen(start)]
pub fn init() {}

/// Get the version of the WASM module
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
