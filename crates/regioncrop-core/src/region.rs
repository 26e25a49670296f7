//! Crop regions: one rectangle in image space plus its editing state.
//!
//! A region is edited through screen-space pointer input, so hit-testing runs
//! against the region's screen rectangle while every mutation happens in
//! image space. Mutations always leave the rectangle inside the image and,
//! when an aspect ratio is locked, at that ratio.
//!
//! # Resizing with a locked aspect ratio
//!
//! Only the dragged edges move. The orthogonal extent follows from the ratio
//! and is anchored at the opposite edge:
//!
//! ```text
//! Left / Right drag   -> bottom follows, top stays
//! Top / Bottom drag   -> right follows, left stays
//! Corner drag         -> the axis with the larger relative change wins,
//!                        the opposite corner stays
//! ```

use std::cell::Cell;

use crate::geometry::{IntRect, Point, Rect};
use crate::view::ViewTransform;

/// Which part of a region a pointer grabbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Edge {
    #[default]
    None,
    Left,
    Top,
    Right,
    Bottom,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Move,
}

impl Edge {
    fn from_sides(left: bool, top: bool, right: bool, bottom: bool) -> Self {
        match (left, top, right, bottom) {
            (true, true, _, _) => Edge::TopLeft,
            (_, true, true, _) => Edge::TopRight,
            (true, _, _, true) => Edge::BottomLeft,
            (_, _, true, true) => Edge::BottomRight,
            (true, _, _, _) => Edge::Left,
            (_, true, _, _) => Edge::Top,
            (_, _, true, _) => Edge::Right,
            (_, _, _, true) => Edge::Bottom,
            _ => Edge::None,
        }
    }

    pub fn left(self) -> bool {
        matches!(self, Edge::Left | Edge::TopLeft | Edge::BottomLeft)
    }

    pub fn right(self) -> bool {
        matches!(self, Edge::Right | Edge::TopRight | Edge::BottomRight)
    }

    pub fn top(self) -> bool {
        matches!(self, Edge::Top | Edge::TopLeft | Edge::TopRight)
    }

    pub fn bottom(self) -> bool {
        matches!(self, Edge::Bottom | Edge::BottomLeft | Edge::BottomRight)
    }

    /// True for edges and corners (anything that resizes).
    pub fn is_grow(self) -> bool {
        !matches!(self, Edge::None | Edge::Move)
    }
}

/// What the current drag does to the region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModifyMode {
    #[default]
    None,
    Move,
    Grow,
}

/// Locked width:height ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AspectRatio {
    pub x: u32,
    pub y: u32,
}

impl AspectRatio {
    /// `None` unless both components are non-zero.
    pub fn new(x: u32, y: u32) -> Option<Self> {
        (x != 0 && y != 0).then_some(Self { x, y })
    }

    /// Width divided by height.
    pub fn ratio(self) -> f64 {
        self.x as f64 / self.y as f64
    }
}

#[derive(Debug, Clone)]
pub struct CropRegion {
    rect: Rect,
    bounds: Rect,
    aspect: Option<AspectRatio>,
    min_size: f64,
    focused: bool,
    mode: ModifyMode,
    /// Screen rectangle keyed by the view generation it was computed for.
    draw_cache: Cell<Option<(u64, Rect)>>,
}

impl CropRegion {
    /// The initial region for a `width` x `height` image: 4/5 of the shorter
    /// side, shrunk on the longer axis of the aspect ratio, centered.
    pub fn default_for(width: u32, height: u32, aspect: Option<AspectRatio>, min_size: f64) -> Self {
        let side = (width.min(height) * 4 / 5) as f64;
        let (mut crop_w, mut crop_h) = (side, side);

        if let Some(a) = aspect {
            if a.x > a.y {
                crop_h = crop_w * a.y as f64 / a.x as f64;
            } else {
                crop_w = crop_h * a.x as f64 / a.y as f64;
            }
        }

        let left = (width as f64 - crop_w) / 2.0;
        let top = (height as f64 - crop_h) / 2.0;
        Self::with_rect(
            Rect::new(left, top, left + crop_w, top + crop_h),
            width,
            height,
            aspect,
            min_size,
        )
    }

    /// A region from a detector's proposal: clipped to the image and brought
    /// to the locked ratio. Falls back to the default region when the
    /// proposal misses the image.
    pub fn from_candidate(
        candidate: Rect,
        width: u32,
        height: u32,
        aspect: Option<AspectRatio>,
        min_size: f64,
    ) -> Self {
        let bounds = Rect::from_size(width as f64, height as f64);
        let clipped = Rect::new(
            candidate.left.max(bounds.left),
            candidate.top.max(bounds.top),
            candidate.right.min(bounds.right),
            candidate.bottom.min(bounds.bottom),
        );
        if clipped.is_empty() || !clipped.left.is_finite() || !clipped.bottom.is_finite() {
            return Self::default_for(width, height, aspect, min_size);
        }
        let mut region = Self::with_rect(clipped, width, height, aspect, min_size);
        region.normalize();
        region
    }

    fn with_rect(
        rect: Rect,
        width: u32,
        height: u32,
        aspect: Option<AspectRatio>,
        min_size: f64,
    ) -> Self {
        Self {
            rect,
            bounds: Rect::from_size(width as f64, height as f64),
            aspect,
            min_size,
            focused: false,
            mode: ModifyMode::None,
            draw_cache: Cell::new(None),
        }
    }

    /// Rectangle in image space.
    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Image bounds the region is confined to.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn aspect(&self) -> Option<AspectRatio> {
        self.aspect
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    pub fn mode(&self) -> ModifyMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: ModifyMode) {
        self.mode = mode;
    }

    /// Replace the rectangle, clipped to the image. The aspect ratio is not
    /// enforced until [`normalize`](Self::normalize).
    pub fn set_rect(&mut self, rect: Rect) {
        let b = self.bounds;
        self.update(Rect::new(
            rect.left.clamp(b.left, b.right),
            rect.top.clamp(b.top, b.bottom),
            rect.right.clamp(b.left, b.right),
            rect.bottom.clamp(b.top, b.bottom),
        ));
    }

    /// The committed crop: every edge rounded to the nearest pixel.
    pub fn crop_rect(&self) -> IntRect {
        self.rect.round()
    }

    /// Rectangle on screen under `view`, recomputed when the view changed.
    pub fn draw_rect(&self, view: &ViewTransform) -> Rect {
        let generation = view.generation();
        if let Some((cached_gen, rect)) = self.draw_cache.get() {
            if cached_gen == generation {
                return rect;
            }
        }
        let rect = view.map_rect(&self.rect);
        self.draw_cache.set(Some((generation, rect)));
        rect
    }

    /// Which part of the region the screen point `p` grabs.
    ///
    /// An edge is near when the point is within `tolerance` of its line and
    /// within the tolerance-expanded span of the other axis. Corners win over
    /// edges, edges over the interior. When both opposing edges are near (a
    /// tiny region) the closer one wins.
    pub fn hit(&self, p: Point, view: &ViewTransform, tolerance: f64) -> Edge {
        let r = self.draw_rect(view);

        let within_v = p.y >= r.top - tolerance && p.y < r.bottom + tolerance;
        let within_h = p.x >= r.left - tolerance && p.x < r.right + tolerance;

        let d_left = (p.x - r.left).abs();
        let d_right = (p.x - r.right).abs();
        let d_top = (p.y - r.top).abs();
        let d_bottom = (p.y - r.bottom).abs();

        let mut left = within_v && d_left < tolerance;
        let mut right = within_v && d_right < tolerance;
        let mut top = within_h && d_top < tolerance;
        let mut bottom = within_h && d_bottom < tolerance;

        if left && right {
            left = d_left <= d_right;
            right = !left;
        }
        if top && bottom {
            top = d_top <= d_bottom;
            bottom = !top;
        }

        match Edge::from_sides(left, top, right, bottom) {
            Edge::None if r.contains(p) => Edge::Move,
            edge => edge,
        }
    }

    /// Apply a screen-space pointer delta for the grabbed `edge`.
    pub fn handle_motion(&mut self, edge: Edge, dx: f64, dy: f64, view: &ViewTransform) {
        let d = view.inverse_vector(Point::new(dx, dy));
        match edge {
            Edge::None => {}
            Edge::Move => self.move_by(d.x, d.y),
            _ => self.grow(edge, d.x, d.y),
        }
    }

    /// Translate by an image-space delta, stopping at the image boundary.
    pub fn move_by(&mut self, dx: f64, dy: f64) {
        let r = self.rect;
        let b = self.bounds;
        let dx = dx.min(b.right - r.right).max(b.left - r.left);
        let dy = dy.min(b.bottom - r.bottom).max(b.top - r.top);
        self.update(r.offset(dx, dy));
    }

    /// Move the dragged edge(s) by an image-space delta.
    pub fn grow(&mut self, edge: Edge, dx: f64, dy: f64) {
        if !edge.is_grow() {
            return;
        }
        let next = match self.aspect {
            None => self.grow_free(edge, dx, dy),
            Some(aspect) => self.grow_locked(edge, dx, dy, aspect.ratio()),
        };
        self.update(next);
    }

    fn grow_free(&self, edge: Edge, dx: f64, dy: f64) -> Rect {
        let r = self.rect;
        let b = self.bounds;
        let min_w = self.min_size.min(b.width());
        let min_h = self.min_size.min(b.height());

        let mut next = r;
        if edge.left() {
            next.left = (r.left + dx).min(r.right - min_w).max(b.left);
        }
        if edge.right() {
            next.right = (r.right + dx).max(r.left + min_w).min(b.right);
        }
        if edge.top() {
            next.top = (r.top + dy).min(r.bottom - min_h).max(b.top);
        }
        if edge.bottom() {
            next.bottom = (r.bottom + dy).max(r.top + min_h).min(b.bottom);
        }
        next
    }

    fn grow_locked(&self, edge: Edge, dx: f64, dy: f64, ratio: f64) -> Rect {
        let r = self.rect;
        let b = self.bounds;
        let (w, h) = (r.width(), r.height());

        let from_x = if edge.left() {
            Some(w - dx)
        } else if edge.right() {
            Some(w + dx)
        } else {
            None
        };
        let from_y = if edge.top() {
            Some(h - dy)
        } else if edge.bottom() {
            Some(h + dy)
        } else {
            None
        };

        // Everything below is expressed as the new width
        let wanted = match (from_x, from_y) {
            (Some(nw), None) => nw,
            (None, Some(nh)) => nh * ratio,
            (Some(nw), Some(nh)) => {
                if ((nw - w) / w).abs() >= ((nh - h) / h).abs() {
                    nw
                } else {
                    nh * ratio
                }
            }
            (None, None) => return r,
        };

        let keep_left = !edge.left();
        let keep_top = !edge.top();

        let room_x = if keep_left { b.right - r.left } else { r.right - b.left };
        let room_y = if keep_top { b.bottom - r.top } else { r.bottom - b.top };
        let max_w = room_x.min(room_y * ratio);
        let min_w = self.min_size.max(self.min_size * ratio);

        let new_w = wanted.max(min_w).min(max_w);
        let new_h = new_w / ratio;

        let (left, right) = if keep_left {
            (r.left, (r.left + new_w).min(b.right))
        } else {
            ((r.right - new_w).max(b.left), r.right)
        };
        let (top, bottom) = if keep_top {
            (r.top, (r.top + new_h).min(b.bottom))
        } else {
            ((r.bottom - new_h).max(b.top), r.bottom)
        };
        Rect::new(left, top, right, bottom)
    }

    /// Settle the rectangle after a drag: clip to the image and, when locked,
    /// re-derive the height from the width with the top-left corner fixed,
    /// shrinking both axes if the result would leave the image.
    pub fn normalize(&mut self) {
        let b = self.bounds;
        let r = self.rect;
        let left = r.left.clamp(b.left, b.right);
        let top = r.top.clamp(b.top, b.bottom);
        let right = r.right.clamp(left, b.right);
        let bottom = r.bottom.clamp(top, b.bottom);

        let next = match self.aspect {
            Some(aspect) if right > left => {
                let ratio = aspect.ratio();
                let mut w = right - left;
                let mut h = w / ratio;
                let fit = ((b.right - left) / w).min((b.bottom - top) / h).min(1.0);
                w *= fit;
                h *= fit;
                Rect::new(left, top, left + w, top + h)
            }
            _ => Rect::new(left, top, right, bottom),
        };
        self.update(next);
    }

    fn update(&mut self, rect: Rect) {
        if rect != self.rect {
            self.rect = rect;
            self.draw_cache.set(None);
        }
    }
}

/// The regions of one session, hit-tested in insertion order.
#[derive(Debug, Clone, Default)]
pub struct RegionSet {
    regions: Vec<CropRegion>,
}

impl RegionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a region and return its index.
    pub fn push(&mut self, region: CropRegion) -> usize {
        self.regions.push(region);
        self.regions.len() - 1
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&CropRegion> {
        self.regions.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut CropRegion> {
        self.regions.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CropRegion> {
        self.regions.iter()
    }

    /// The focused region, or the first one when none is focused.
    pub fn focused(&self) -> Option<&CropRegion> {
        self.regions
            .iter()
            .find(|r| r.is_focused())
            .or_else(|| self.regions.first())
    }

    /// First region (in insertion order) the point grabs.
    pub fn hit(&self, p: Point, view: &ViewTransform, tolerance: f64) -> Option<(usize, Edge)> {
        self.regions
            .iter()
            .enumerate()
            .map(|(i, r)| (i, r.hit(p, view, tolerance)))
            .find(|(_, edge)| *edge != Edge::None)
    }
}
