//! Crop session bindings.
//!
//! JavaScript hands over the encoded image bytes and forwards pointer events
//! in canvas coordinates. Jobs run inline (no threads in the browser), so a
//! commit returns its result directly. The partial-region path is always
//! used, so the in-memory image is dropped before the crop is decoded.
//!
//! ```typescript
//! const session = new JsCropSession(bytes, { aspect_x: 1, aspect_y: 1 }, canvas.width, canvas.height);
//! canvas.onpointerdown = (e) => session.pointer_down(e.offsetX, e.offsetY) && redraw();
//! canvas.onpointermove = (e) => session.pointer_move(e.offsetX, e.offsetY) && redraw();
//! canvas.onpointerup = () => session.pointer_up() && redraw();
//! requestAnimationFrame(function frame() { if (session.tick()) redraw(); requestAnimationFrame(frame); });
//!
//! const result = session.commit();
//! ```

use std::fmt;
use std::sync::Arc;

use regioncrop_core::decode::ImageRegionDecoder;
use regioncrop_core::host::BytesSource;
use regioncrop_core::{
    CommitStatus, CropError, CropSession, InlineDispatcher, SessionConfig, SessionEvent, SessionState,
};
use wasm_bindgen::prelude::*;

use crate::types::JsCropResult;

#[wasm_bindgen]
pub struct JsCropSession {
    inner: CropSession,
}

#[wasm_bindgen]
impl JsCropSession {
    /// Open a session on encoded image bytes.
    ///
    /// `config` is a partial `SessionConfig` object; missing fields take
    /// their defaults. `undefined` or `null` means all defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(
        bytes: Vec<u8>,
        config: JsValue,
        viewport_width: f64,
        viewport_height: f64,
    ) -> Result<JsCropSession, JsValue> {
        let config: SessionConfig = if config.is_undefined() || config.is_null() {
            SessionConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config)?
        };
        Self::open(bytes, config, viewport_width, viewport_height).map_err(to_js_error)
    }

    pub fn pointer_down(&mut self, x: f64, y: f64) -> bool {
        self.inner.on_pointer_down(x, y)
    }

    pub fn pointer_move(&mut self, x: f64, y: f64) -> bool {
        self.inner.on_pointer_move(x, y)
    }

    pub fn pointer_up(&mut self) -> bool {
        self.pointer_up_at(js_sys::Date::now())
    }

    pub fn pointer_up_at(&mut self, now_ms: f64) -> bool {
        self.inner.on_pointer_up(now_ms)
    }

    /// Advance the zoom animation. Returns true when a redraw is needed.
    pub fn tick(&mut self) -> bool {
        self.tick_at(js_sys::Date::now())
    }

    pub fn tick_at(&mut self, now_ms: f64) -> bool {
        self.inner.tick(now_ms)
    }

    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.inner.set_viewport(width, height);
    }

    /// Focused crop rectangle in image pixels as `[left, top, right, bottom]`.
    pub fn crop_rect(&self) -> Option<Vec<i32>> {
        self.inner
            .crop_rect()
            .map(|r| vec![r.left, r.top, r.right, r.bottom])
    }

    /// Focused crop rectangle on the canvas as `[left, top, right, bottom]`.
    pub fn draw_rect(&self) -> Option<Vec<f64>> {
        self.inner
            .draw_rect()
            .map(|r| vec![r.left, r.top, r.right, r.bottom])
    }

    /// Image-to-canvas matrix as `[a, b, c, d, e, f]` for `setTransform`.
    pub fn view_matrix(&self) -> Vec<f64> {
        let m = self.inner.view().matrix();
        vec![m.xx, m.yx, m.xy, m.yy, m.x0, m.y0]
    }

    #[wasm_bindgen(getter)]
    pub fn display_width(&self) -> u32 {
        self.inner.display_size().0
    }

    #[wasm_bindgen(getter)]
    pub fn display_height(&self) -> u32 {
        self.inner.display_size().1
    }

    #[wasm_bindgen(getter)]
    pub fn rotation(&self) -> i32 {
        self.inner.rotation().degrees()
    }

    #[wasm_bindgen(getter)]
    pub fn state(&self) -> String {
        state_name(self.inner.state()).to_string()
    }

    /// Crop the focused region.
    pub fn commit(&mut self) -> Result<JsCropResult, JsValue> {
        self.commit_now().map_err(to_js_error)
    }

    pub fn cancel(&mut self) {
        self.inner.cancel();
    }
}

impl JsCropSession {
    /// Rust-side constructor: partial-region decoding over the given bytes,
    /// jobs run inline.
    pub fn open(
        bytes: Vec<u8>,
        config: SessionConfig,
        viewport_width: f64,
        viewport_height: f64,
    ) -> Result<Self, CropError> {
        let inner = CropSession::builder(config)
            .source(Arc::new(BytesSource::new(bytes)))
            .region_decoder(Arc::new(ImageRegionDecoder))
            .dispatcher(Box::new(InlineDispatcher))
            .viewport(viewport_width, viewport_height)
            .build()?;
        Ok(Self { inner })
    }

    fn commit_now(&mut self) -> Result<JsCropResult, CommitError> {
        match self.inner.commit() {
            CommitStatus::Dispatched => {}
            status => return Err(CommitError::NotDispatched(status)),
        }

        for event in self.inner.pump() {
            match event {
                SessionEvent::Completed { .. } => {}
                SessionEvent::Failed(error) => return Err(CommitError::Crop(error)),
            }
        }
        self.inner
            .take_output()
            .map(JsCropResult::from_output)
            .ok_or(CommitError::NoOutput)
    }
}

/// Why `commit` returned no result.
#[derive(Debug)]
enum CommitError {
    /// The session refused the commit.
    NotDispatched(CommitStatus),
    Crop(CropError),
    /// The job ran but left nothing behind.
    NoOutput,
}

impl fmt::Display for CommitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitError::NotDispatched(CommitStatus::AlreadyInFlight) => {
                f.write_str("A crop is already in progress")
            }
            CommitError::NotDispatched(CommitStatus::NothingToCommit) => {
                f.write_str("Nothing to crop")
            }
            CommitError::NotDispatched(_) => f.write_str("The crop session is closed"),
            CommitError::Crop(error) => fmt::Display::fmt(error, f),
            CommitError::NoOutput => f.write_str("The crop produced no output"),
        }
    }
}

fn state_name(state: SessionState) -> &'static str {
    match state {
        SessionState::Editing => "editing",
        SessionState::Committing => "committing",
        SessionState::Finished => "finished",
        SessionState::Failed => "failed",
        SessionState::Cancelled => "cancelled",
    }
}

fn to_js_error(error: impl fmt::Display) -> JsValue {
    let message = error.to_string();
    web_sys::console::error_1(&JsValue::from_str(&message));
    JsValue::from_str(&message)
}
