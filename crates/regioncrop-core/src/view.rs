//! Image-space to screen-space mapping with zoom and pan.
//!
//! The view is the composition of two matrices:
//!
//! - a **base** matrix that fits the rotation-corrected image into the
//!   viewport (never enlarging more than 3x) and centers it
//! - a **supplementary** matrix that accumulates user zoom and pan
//!
//! The supplementary scale is what callers see as "the zoom": 1.0 means the
//! fitted view. It is kept within `[1.0, max_zoom]`.
//!
//! Every mutation bumps [`ViewTransform::generation`] so geometry cached in
//! screen space can tell when it is stale.

use crate::geometry::{Affine, Point, Rect};

/// Largest enlargement the base fit applies to small images.
const MAX_BASE_SCALE: f64 = 3.0;

/// Max zoom is this many times the zoom that shows the image at 1:1.
const MAX_ZOOM_FACTOR: f64 = 4.0;

/// A zoom in progress, advanced by [`ViewTransform::tick`].
#[derive(Debug, Clone, Copy, PartialEq)]
struct ZoomAnimation {
    from: f64,
    to: f64,
    cx: f64,
    cy: f64,
    start_ms: f64,
    duration_ms: f64,
}

#[derive(Debug, Clone)]
pub struct ViewTransform {
    image_width: f64,
    image_height: f64,
    viewport_width: f64,
    viewport_height: f64,
    base: Affine,
    supp: Affine,
    max_zoom: f64,
    generation: u64,
    animation: Option<ZoomAnimation>,
}

impl ViewTransform {
    /// View of a `image_width` x `image_height` (rotation-corrected) image in
    /// a viewport of the given size, fitted and centered, zoom 1.0.
    pub fn new(image_width: u32, image_height: u32, viewport_width: f64, viewport_height: f64) -> Self {
        let mut view = Self {
            image_width: image_width as f64,
            image_height: image_height as f64,
            viewport_width,
            viewport_height,
            base: Affine::IDENTITY,
            supp: Affine::IDENTITY,
            max_zoom: 1.0,
            generation: 0,
            animation: None,
        };
        view.rebuild_base();
        view
    }

    /// Composite image-to-screen matrix.
    pub fn matrix(&self) -> Affine {
        self.base.then(&self.supp)
    }

    pub fn forward(&self, p: Point) -> Point {
        self.matrix().map_point(p)
    }

    pub fn inverse(&self, p: Point) -> Point {
        match self.matrix().invert() {
            Some(inv) => inv.map_point(p),
            None => p,
        }
    }

    /// Convert a screen-space displacement into image space.
    pub fn inverse_vector(&self, v: Point) -> Point {
        match self.matrix().invert() {
            Some(inv) => inv.map_vector(v),
            None => v,
        }
    }

    pub fn map_rect(&self, r: &Rect) -> Rect {
        self.matrix().map_rect(r)
    }

    /// Current supplementary (user) zoom.
    pub fn scale(&self) -> f64 {
        self.supp.scale_factor()
    }

    pub fn max_zoom(&self) -> f64 {
        self.max_zoom
    }

    pub fn viewport(&self) -> (f64, f64) {
        (self.viewport_width, self.viewport_height)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Where the image currently lands on screen.
    pub fn image_bounds_on_screen(&self) -> Rect {
        self.map_rect(&Rect::from_size(self.image_width, self.image_height))
    }

    /// Zoom to `scale` about the screen point `(cx, cy)`, then re-center.
    /// Cancels a running animation.
    pub fn zoom_to(&mut self, scale: f64, cx: f64, cy: f64) {
        self.animation = None;
        self.apply_zoom(scale, cx, cy);
    }

    /// Start an animated zoom that [`tick`](Self::tick) advances from `now_ms`
    /// over `duration_ms`. Replaces any running animation.
    pub fn zoom_to_animated(&mut self, scale: f64, cx: f64, cy: f64, duration_ms: f64, now_ms: f64) {
        if duration_ms <= 0.0 {
            self.zoom_to(scale, cx, cy);
            return;
        }
        self.animation = Some(ZoomAnimation {
            from: self.scale(),
            to: self.clamp_zoom(scale),
            cx,
            cy,
            start_ms: now_ms,
            duration_ms,
        });
    }

    /// Advance a running animation. Returns true when the view changed.
    pub fn tick(&mut self, now_ms: f64) -> bool {
        let Some(anim) = self.animation else {
            return false;
        };
        let t = ((now_ms - anim.start_ms) / anim.duration_ms).clamp(0.0, 1.0);
        self.apply_zoom(anim.from + (anim.to - anim.from) * t, anim.cx, anim.cy);
        if t >= 1.0 {
            self.animation = None;
        }
        true
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    pub fn cancel_animation(&mut self) {
        self.animation = None;
    }

    /// Translate the view by a screen-space delta.
    ///
    /// Running animations keep going: they scale about a fixed screen point,
    /// which composes with the pan.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        if dx == 0.0 && dy == 0.0 {
            return;
        }
        self.supp.post_translate(dx, dy);
        self.generation += 1;
    }

    /// Center the image on each requested axis where it is smaller than the
    /// viewport; where it is larger, close any gap at either edge.
    pub fn center(&mut self, horizontal: bool, vertical: bool) {
        let r = self.image_bounds_on_screen();
        let dx = if horizontal {
            center_delta(r.left, r.right, self.viewport_width)
        } else {
            0.0
        };
        let dy = if vertical {
            center_delta(r.top, r.bottom, self.viewport_height)
        } else {
            0.0
        };
        self.pan_by(dx, dy);
    }

    /// Resize the viewport, keeping the user's zoom and pan.
    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.viewport_width = width;
        self.viewport_height = height;
        self.rebuild_base();
        let scale = self.scale();
        if scale > self.max_zoom {
            self.apply_zoom(self.max_zoom, width / 2.0, height / 2.0);
        }
        self.center(true, true);
    }

    fn apply_zoom(&mut self, scale: f64, cx: f64, cy: f64) {
        let current = self.scale();
        let target = self.clamp_zoom(scale);
        if current > 0.0 && target != current {
            self.supp.post_scale(target / current, cx, cy);
            self.generation += 1;
        }
        self.center(true, true);
    }

    fn clamp_zoom(&self, scale: f64) -> f64 {
        if scale.is_finite() {
            scale.clamp(1.0, self.max_zoom)
        } else {
            1.0
        }
    }

    fn rebuild_base(&mut self) {
        let (iw, ih) = (self.image_width, self.image_height);
        let (vw, vh) = (self.viewport_width, self.viewport_height);
        self.generation += 1;

        if iw <= 0.0 || ih <= 0.0 || vw <= 0.0 || vh <= 0.0 {
            self.base = Affine::IDENTITY;
            self.max_zoom = 1.0;
            return;
        }

        let scale = (vw / iw).min(vh / ih).min(MAX_BASE_SCALE);
        self.base = Affine::scaling(scale, scale)
            .then(&Affine::translation((vw - iw * scale) / 2.0, (vh - ih * scale) / 2.0));
        self.max_zoom = ((iw / vw).max(ih / vh) * MAX_ZOOM_FACTOR).max(1.0);
    }
}

fn center_delta(lead: f64, trail: f64, extent: f64) -> f64 {
    let size = trail - lead;
    if size < extent {
        (extent - size) / 2.0 - lead
    } else if lead > 0.0 {
        -lead
    } else if trail < extent {
        extent - trail
    } else {
        0.0
    }
}
