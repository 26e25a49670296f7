//! Points, rectangles and 2D affine matrices shared by the view, the crop
//! regions and the pipeline.
//!
//! # Coordinate System
//!
//! - Origin is the top-left corner, x grows right, y grows down
//! - Floating point rectangles are half-open: `left <= x < right`
//! - Matrices follow the usual 2x3 affine layout:
//!
//! ```text
//! x' = xx * x + xy * y + x0
//! y' = yx * x + yy * y + y0
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// A point (or a vector) in some 2D coordinate frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Floating point rectangle given by its edges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Rectangle anchored at the origin with the given size.
    pub fn from_size(width: f64, height: f64) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.left + self.right) / 2.0,
            (self.top + self.bottom) / 2.0,
        )
    }

    /// True when the rectangle has no area.
    pub fn is_empty(&self) -> bool {
        self.right <= self.left || self.bottom <= self.top
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.left && p.x < self.right && p.y >= self.top && p.y < self.bottom
    }

    pub fn offset(&self, dx: f64, dy: f64) -> Self {
        Self::new(
            self.left + dx,
            self.top + dy,
            self.right + dx,
            self.bottom + dy,
        )
    }

    /// Round every edge to the nearest integer.
    pub fn round(&self) -> IntRect {
        IntRect::new(
            self.left.round() as i32,
            self.top.round() as i32,
            self.right.round() as i32,
            self.bottom.round() as i32,
        )
    }

    /// Smallest rectangle containing all the given points.
    pub fn bounding(points: &[Point]) -> Self {
        let mut r = Self::new(f64::MAX, f64::MAX, f64::MIN, f64::MIN);
        for p in points {
            r.left = r.left.min(p.x);
            r.top = r.top.min(p.y);
            r.right = r.right.max(p.x);
            r.bottom = r.bottom.max(p.y);
        }
        r
    }

    pub fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.left, self.top),
            Point::new(self.right, self.top),
            Point::new(self.right, self.bottom),
            Point::new(self.left, self.bottom),
        ]
    }
}

/// Integer pixel rectangle given by its edges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl IntRect {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, width as i32, height as i32)
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    pub fn is_empty(&self) -> bool {
        self.right <= self.left || self.bottom <= self.top
    }

    /// True when the rectangle is non-empty and lies inside `0..width` x `0..height`.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        !self.is_empty()
            && self.left >= 0
            && self.top >= 0
            && i64::from(self.right) <= i64::from(width)
            && i64::from(self.bottom) <= i64::from(height)
    }

    pub fn to_rect(self) -> Rect {
        Rect::new(
            self.left as f64,
            self.top as f64,
            self.right as f64,
            self.bottom as f64,
        )
    }
}

impl fmt::Display for IntRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {} - {}, {})",
            self.left, self.top, self.right, self.bottom
        )
    }
}

/// 2D affine transformation matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine {
    pub xx: f64,
    pub yx: f64,
    pub xy: f64,
    pub yy: f64,
    pub x0: f64,
    pub y0: f64,
}

impl Default for Affine {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Affine {
    pub const IDENTITY: Affine = Affine::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);

    pub const fn new(xx: f64, yx: f64, xy: f64, yy: f64, x0: f64, y0: f64) -> Self {
        Self {
            xx,
            yx,
            xy,
            yy,
            x0,
            y0,
        }
    }

    pub fn translation(dx: f64, dy: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, dx, dy)
    }

    pub fn scaling(sx: f64, sy: f64) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    /// Clockwise rotation about the origin by `turns` quarter turns.
    ///
    /// Entries are exactly 0 or +-1 so integer coordinates stay integers.
    pub fn quarter_turns(turns: i32) -> Self {
        match turns.rem_euclid(4) {
            1 => Self::new(0.0, 1.0, -1.0, 0.0, 0.0, 0.0),
            2 => Self::new(-1.0, 0.0, 0.0, -1.0, 0.0, 0.0),
            3 => Self::new(0.0, -1.0, 1.0, 0.0, 0.0, 0.0),
            _ => Self::IDENTITY,
        }
    }

    /// Map `src` onto `dst`, scaling each axis independently.
    pub fn rect_to_rect(src: &Rect, dst: &Rect) -> Option<Self> {
        if src.is_empty() || dst.is_empty() {
            return None;
        }
        let sx = dst.width() / src.width();
        let sy = dst.height() / src.height();
        Some(Self::new(
            sx,
            0.0,
            0.0,
            sy,
            dst.left - src.left * sx,
            dst.top - src.top * sy,
        ))
    }

    /// Matrix that applies `self` first and then `next`.
    pub fn then(&self, next: &Affine) -> Affine {
        Affine::new(
            next.xx * self.xx + next.xy * self.yx,
            next.yx * self.xx + next.yy * self.yx,
            next.xx * self.xy + next.xy * self.yy,
            next.yx * self.xy + next.yy * self.yy,
            next.xx * self.x0 + next.xy * self.y0 + next.x0,
            next.yx * self.x0 + next.yy * self.y0 + next.y0,
        )
    }

    /// Append a translation.
    pub fn post_translate(&mut self, dx: f64, dy: f64) {
        *self = self.then(&Affine::translation(dx, dy));
    }

    /// Append a uniform scale about the point `(cx, cy)`.
    pub fn post_scale(&mut self, s: f64, cx: f64, cy: f64) {
        let about = Affine::translation(-cx, -cy)
            .then(&Affine::scaling(s, s))
            .then(&Affine::translation(cx, cy));
        *self = self.then(&about);
    }

    pub fn determinant(&self) -> f64 {
        self.xx * self.yy - self.xy * self.yx
    }

    /// Inverse matrix, `None` when the matrix is singular.
    pub fn invert(&self) -> Option<Affine> {
        let det = self.determinant();
        if det.abs() < f64::EPSILON {
            return None;
        }
        let xx = self.yy / det;
        let yx = -self.yx / det;
        let xy = -self.xy / det;
        let yy = self.xx / det;
        Some(Affine::new(
            xx,
            yx,
            xy,
            yy,
            -(xx * self.x0 + xy * self.y0),
            -(yx * self.x0 + yy * self.y0),
        ))
    }

    pub fn map_point(&self, p: Point) -> Point {
        Point::new(
            self.xx * p.x + self.xy * p.y + self.x0,
            self.yx * p.x + self.yy * p.y + self.y0,
        )
    }

    /// Map a displacement, ignoring the translation part.
    pub fn map_vector(&self, v: Point) -> Point {
        Point::new(self.xx * v.x + self.xy * v.y, self.yx * v.x + self.yy * v.y)
    }

    /// Bounding box of the four mapped corners.
    pub fn map_rect(&self, r: &Rect) -> Rect {
        let corners = r.corners().map(|p| self.map_point(p));
        Rect::bounding(&corners)
    }

    /// Length of the mapped unit x vector.
    pub fn scale_factor(&self) -> f64 {
        (self.xx * self.xx + self.yx * self.yx).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_rect_basics() {
        let r = Rect::new(10.0, 20.0, 110.0, 70.0);
        assert_eq!(r.width(), 100.0);
        assert_eq!(r.height(), 50.0);
        assert_eq!(r.center(), Point::new(60.0, 45.0));
        assert!(r.contains(Point::new(10.0, 20.0)));
        assert!(!r.contains(Point::new(110.0, 20.0)));
        assert!(!r.is_empty());
    }

    #[test]
    fn test_rect_bounding() {
        let r = Rect::bounding(&[
            Point::new(3.0, -1.0),
            Point::new(-2.0, 4.0),
            Point::new(0.0, 0.0),
        ]);
        assert_eq!(r, Rect::new(-2.0, -1.0, 3.0, 4.0));
    }

    #[test]
    fn test_int_rect_fits_within() {
        assert!(IntRect::new(0, 0, 10, 10).fits_within(10, 10));
        assert!(!IntRect::new(0, 0, 11, 10).fits_within(10, 10));
        assert!(!IntRect::new(-1, 0, 5, 5).fits_within(10, 10));
        assert!(!IntRect::new(5, 5, 5, 6).fits_within(10, 10));
    }

    #[test]
    fn test_int_rect_display() {
        assert_eq!(IntRect::new(1, 2, 3, 4).to_string(), "(1, 2 - 3, 4)");
    }

    #[test]
    fn test_quarter_turns_are_exact() {
        let m = Affine::quarter_turns(1);
        // Clockwise in y-down coordinates: +x axis maps onto +y axis
        assert_eq!(m.map_point(Point::new(1.0, 0.0)), Point::new(0.0, 1.0));
        assert_eq!(m.map_point(Point::new(0.0, 1.0)), Point::new(-1.0, 0.0));
        assert_eq!(Affine::quarter_turns(4), Affine::IDENTITY);
        assert_eq!(Affine::quarter_turns(-1), Affine::quarter_turns(3));
    }

    #[test]
    fn test_then_applies_in_order() {
        let m = Affine::translation(10.0, 0.0).then(&Affine::scaling(2.0, 2.0));
        // translate first, then scale
        assert_eq!(m.map_point(Point::new(1.0, 1.0)), Point::new(22.0, 2.0));
    }

    #[test]
    fn test_post_scale_keeps_center_fixed() {
        let mut m = Affine::IDENTITY;
        m.post_scale(3.0, 50.0, 40.0);
        let p = m.map_point(Point::new(50.0, 40.0));
        assert!(approx(p.x, 50.0) && approx(p.y, 40.0));
        assert!(approx(m.scale_factor(), 3.0));
    }

    #[test]
    fn test_invert_round_trip() {
        let m = Affine::new(2.0, 0.5, -1.0, 3.0, 7.0, -4.0);
        let inv = m.invert().unwrap();
        let p = Point::new(12.5, -3.25);
        let back = inv.map_point(m.map_point(p));
        assert!(approx(back.x, p.x) && approx(back.y, p.y));
    }

    #[test]
    fn test_invert_singular() {
        assert!(Affine::scaling(0.0, 1.0).invert().is_none());
    }

    #[test]
    fn test_rect_to_rect() {
        let src = Rect::new(100.0, 50.0, 300.0, 150.0);
        let dst = Rect::from_size(100.0, 100.0);
        let m = Affine::rect_to_rect(&src, &dst).unwrap();
        assert_eq!(m.map_rect(&src), dst);
        assert!(Affine::rect_to_rect(&Rect::default(), &dst).is_none());
    }

    #[test]
    fn test_map_vector_ignores_translation() {
        let m = Affine::translation(5.0, 5.0).then(&Affine::scaling(2.0, 2.0));
        assert_eq!(m.map_vector(Point::new(1.0, 1.0)), Point::new(2.0, 2.0));
    }
}
