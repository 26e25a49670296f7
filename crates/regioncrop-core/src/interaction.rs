//! Pointer handling for crop regions.
//!
//! The controller turns a down/move/up sequence into region edits and keeps
//! the view following the region: the region is panned into sight while it
//! is dragged, and on release the view zooms so the region fills about 60%
//! of the viewport.

use tracing::debug;

use crate::geometry::Point;
use crate::region::{CropRegion, Edge, ModifyMode, RegionSet};
use crate::view::ViewTransform;

/// Share of the viewport the released region is zoomed to fill.
const FILL_FRACTION: f64 = 0.6;

/// Relative zoom difference below which release does not re-zoom.
const REZOOM_THRESHOLD: f64 = 0.1;

/// Duration of the zoom animation after release.
pub const ZOOM_ANIMATION_MS: f64 = 300.0;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    Dragging {
        region: usize,
        edge: Edge,
        last: Point,
    },
}

#[derive(Debug, Clone, Default)]
pub struct InteractionController {
    state: InteractionState,
}

impl InteractionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> InteractionState {
        self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, InteractionState::Dragging { .. })
    }

    /// Start a drag if `p` grabs a region. Returns true when a drag started.
    pub fn pointer_down(
        &mut self,
        p: Point,
        regions: &mut RegionSet,
        view: &mut ViewTransform,
        tolerance: f64,
    ) -> bool {
        let Some((index, edge)) = regions.hit(p, view, tolerance) else {
            return false;
        };
        let Some(region) = regions.get_mut(index) else {
            return false;
        };

        view.cancel_animation();
        region.set_mode(if edge == Edge::Move {
            ModifyMode::Move
        } else {
            ModifyMode::Grow
        });
        debug!(region = index, ?edge, x = p.x, y = p.y, "drag started");
        self.state = InteractionState::Dragging {
            region: index,
            edge,
            last: p,
        };
        true
    }

    /// Continue a drag. Returns true when anything changed on screen.
    pub fn pointer_move(&mut self, p: Point, regions: &mut RegionSet, view: &mut ViewTransform) -> bool {
        let InteractionState::Dragging { region, edge, last } = self.state else {
            return false;
        };
        let Some(target) = regions.get_mut(region) else {
            self.state = InteractionState::Idle;
            return false;
        };

        target.handle_motion(edge, p.x - last.x, p.y - last.y, view);
        self.state = InteractionState::Dragging {
            region,
            edge,
            last: p,
        };
        ensure_visible(target, view);

        if (view.scale() - 1.0).abs() < f64::EPSILON {
            view.center(true, true);
        }
        true
    }

    /// Finish a drag: settle the region, zoom toward it and re-center.
    pub fn pointer_up(&mut self, regions: &mut RegionSet, view: &mut ViewTransform, now_ms: f64) -> bool {
        let InteractionState::Dragging { region, .. } = std::mem::take(&mut self.state) else {
            return false;
        };
        if let Some(target) = regions.get_mut(region) {
            target.set_mode(ModifyMode::None);
            target.normalize();
            center_on_region(target, view, now_ms);
            debug!(region, rect = %target.crop_rect(), "drag finished");
        }
        view.center(true, true);
        true
    }

    /// Drop any drag in progress without settling it.
    pub fn reset(&mut self, regions: &mut RegionSet) {
        if let InteractionState::Dragging { region, .. } = std::mem::take(&mut self.state) {
            if let Some(target) = regions.get_mut(region) {
                target.set_mode(ModifyMode::None);
            }
        }
    }
}

/// Pan just enough to bring the region's screen rectangle into the viewport.
/// When it overflows both sides of an axis the leading edge wins.
pub fn ensure_visible(region: &CropRegion, view: &mut ViewTransform) {
    let r = region.draw_rect(view);
    let (vw, vh) = view.viewport();

    let dx = pan_delta(r.left, r.right, vw);
    let dy = pan_delta(r.top, r.bottom, vh);
    view.pan_by(dx, dy);
}

fn pan_delta(lead: f64, trail: f64, extent: f64) -> f64 {
    let into_lead = (0.0 - lead).max(0.0);
    if into_lead != 0.0 {
        into_lead
    } else {
        (extent - trail).min(0.0)
    }
}

/// Zoom so the region fills [`FILL_FRACTION`] of the viewport (never below
/// 1.0), animated, when the change is worth it; then pan it into sight.
pub fn center_on_region(region: &CropRegion, view: &mut ViewTransform, now_ms: f64) {
    let draw = region.draw_rect(view);
    let (vw, vh) = view.viewport();

    if draw.width() > 0.0 && draw.height() > 0.0 {
        let current = view.scale();
        let zoom = (vw / draw.width() * FILL_FRACTION)
            .min(vh / draw.height() * FILL_FRACTION)
            * current;
        let zoom = zoom.max(1.0);

        if ((zoom - current).abs() / zoom) > REZOOM_THRESHOLD {
            let c = view.forward(region.rect().center());
            view.zoom_to_animated(zoom, c.x, c.y, ZOOM_ANIMATION_MS, now_ms);
        }
    }

    ensure_visible(region, view);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::AspectRatio;

    fn setup(width: u32, height: u32, viewport: (f64, f64)) -> (RegionSet, ViewTransform) {
        let mut regions = RegionSet::new();
        let mut region = CropRegion::default_for(width, height, AspectRatio::new(1, 1), 25.0);
        region.set_focused(true);
        regions.push(region);
        (regions, ViewTransform::new(width, height, viewport.0, viewport.1))
    }

    fn rect_of(regions: &RegionSet) -> crate::geometry::IntRect {
        regions.get(0).unwrap().crop_rect()
    }

    #[test]
    fn test_down_outside_does_nothing() {
        let (mut regions, mut view) = setup(1000, 500, (1000.0, 500.0));
        let mut ctl = InteractionController::new();

        assert!(!ctl.pointer_down(Point::new(50.0, 250.0), &mut regions, &mut view, 20.0));
        assert_eq!(ctl.state(), InteractionState::Idle);
        assert!(!ctl.pointer_move(Point::new(60.0, 250.0), &mut regions, &mut view));
    }

    #[test]
    fn test_drag_right_edge_scenario() {
        let (mut regions, mut view) = setup(1000, 500, (1000.0, 500.0));
        let mut ctl = InteractionController::new();

        assert!(ctl.pointer_down(Point::new(700.0, 250.0), &mut regions, &mut view, 20.0));
        assert_eq!(regions.get(0).unwrap().mode(), ModifyMode::Grow);
        assert!(matches!(
            ctl.state(),
            InteractionState::Dragging {
                edge: Edge::Right,
                ..
            }
        ));

        ctl.pointer_move(Point::new(750.0, 250.0), &mut regions, &mut view);
        let rect = rect_of(&regions);
        assert_eq!((rect.width(), rect.height()), (450, 450));
        assert_eq!((rect.left, rect.top), (300, 50));
    }

    #[test]
    fn test_move_mode_and_release() {
        let (mut regions, mut view) = setup(1000, 500, (1000.0, 500.0));
        let mut ctl = InteractionController::new();

        ctl.pointer_down(Point::new(500.0, 250.0), &mut regions, &mut view, 20.0);
        assert_eq!(regions.get(0).unwrap().mode(), ModifyMode::Move);

        ctl.pointer_move(Point::new(400.0, 250.0), &mut regions, &mut view);
        assert_eq!(rect_of(&regions).left, 200);

        assert!(ctl.pointer_up(&mut regions, &mut view, 0.0));
        assert_eq!(ctl.state(), InteractionState::Idle);
        assert_eq!(regions.get(0).unwrap().mode(), ModifyMode::None);
        assert!(!ctl.pointer_up(&mut regions, &mut view, 0.0));
    }

    #[test]
    fn test_release_schedules_zoom_for_small_region() {
        let (mut regions, mut view) = setup(1000, 1000, (500.0, 500.0));
        let mut ctl = InteractionController::new();

        // Shrink the region to a quarter of its size through the corner
        ctl.pointer_down(Point::new(450.0, 450.0), &mut regions, &mut view, 20.0);
        ctl.pointer_move(Point::new(150.0, 150.0), &mut regions, &mut view);
        ctl.pointer_up(&mut regions, &mut view, 1000.0);

        assert!(view.is_animating());
        view.tick(1000.0 + ZOOM_ANIMATION_MS);
        assert!((view.scale() - 3.0).abs() < 1e-6);
        assert!(!view.is_animating());

        // Zooming about the region center can push it off screen; a final
        // visibility pass brings it back
        let region = regions.get(0).unwrap();
        ensure_visible(region, &mut view);
        let r = region.draw_rect(&view);
        assert!(r.left >= -1e-6 && r.top >= -1e-6);
        assert!(r.right <= 500.0 + 1e-6 && r.bottom <= 500.0 + 1e-6);
    }

    #[test]
    fn test_release_skips_small_zoom_change() {
        // Region already fills about 60% of the view: 600/1000
        let mut regions = RegionSet::new();
        regions.push(CropRegion::from_candidate(
            crate::geometry::Rect::new(200.0, 200.0, 800.0, 800.0),
            1000,
            1000,
            None,
            25.0,
        ));
        let mut view = ViewTransform::new(1000, 1000, 1000.0, 1000.0);
        let mut ctl = InteractionController::new();

        ctl.pointer_down(Point::new(500.0, 500.0), &mut regions, &mut view, 20.0);
        ctl.pointer_move(Point::new(501.0, 500.0), &mut regions, &mut view);
        ctl.pointer_up(&mut regions, &mut view, 0.0);

        assert!(!view.is_animating());
    }

    #[test]
    fn test_pointer_down_cancels_animation() {
        let (mut regions, mut view) = setup(1000, 500, (1000.0, 500.0));
        view.zoom_to_animated(2.0, 500.0, 250.0, 300.0, 0.0);

        let mut ctl = InteractionController::new();
        ctl.pointer_down(Point::new(500.0, 250.0), &mut regions, &mut view, 20.0);
        assert!(!view.is_animating());
    }

    #[test]
    fn test_ensure_visible_pans_exact_overflow() {
        let (regions, mut view) = setup(1000, 1000, (500.0, 500.0));
        view.zoom_to(2.0, 0.0, 0.0);

        // Region (100..900) lands on (100..900) on screen, past the right and
        // bottom edges of a 500 px viewport
        let region = regions.get(0).unwrap();
        let before = region.draw_rect(&view);
        assert!((before.right - 900.0).abs() < 1e-6);

        ensure_visible(region, &mut view);
        let after = region.draw_rect(&view);
        assert!((after.right - 500.0).abs() < 1e-6);
        assert!((after.bottom - 500.0).abs() < 1e-6);
        assert!((after.width() - before.width()).abs() < 1e-6);
    }

    #[test]
    fn test_pan_delta_rules() {
        // Fits: no pan
        assert_eq!(pan_delta(10.0, 90.0, 100.0), 0.0);
        // Off the leading edge
        assert_eq!(pan_delta(-15.0, 50.0, 100.0), 15.0);
        // Off the trailing edge
        assert_eq!(pan_delta(40.0, 130.0, 100.0), -30.0);
        // Both: leading edge wins
        assert_eq!(pan_delta(-10.0, 130.0, 100.0), 10.0);
    }

    #[test]
    fn test_reset_clears_drag() {
        let (mut regions, mut view) = setup(1000, 500, (1000.0, 500.0));
        let mut ctl = InteractionController::new();
        ctl.pointer_down(Point::new(700.0, 250.0), &mut regions, &mut view, 20.0);
        ctl.reset(&mut regions);
        assert!(!ctl.is_dragging());
        assert_eq!(regions.get(0).unwrap().mode(), ModifyMode::None);
    }
}
