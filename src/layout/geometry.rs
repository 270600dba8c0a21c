//! Rectangle helpers shared by collision, snapping and the drag controller.
//!
//! All coordinates are canvas points with the origin at the container's top-left corner.

use egui::emath::easing;
use egui::{Pos2, Rect, Vec2, pos2};

/// Half-open overlap test: `a.max.x <= b.min.x` (and friends) means "no overlap",
/// so rectangles that only share an edge do not collide.
pub fn overlaps(a: Rect, b: Rect) -> bool {
    !(a.max.x <= b.min.x || b.max.x <= a.min.x || a.max.y <= b.min.y || b.max.y <= a.min.y)
}

pub fn distance(a: Pos2, b: Pos2) -> f32 {
    a.distance(b)
}

/// Ease-out cubic on `t` in `[0, 1]`; values outside are clamped.
pub fn ease_out_cubic(t: f32) -> f32 {
    easing::cubic_out(t.clamp(0.0, 1.0))
}

/// Position at progress `t` of an ease-out-cubic move from `from` to `to`.
pub fn interpolate(from: Pos2, to: Pos2, t: f32) -> Pos2 {
    from.lerp(to, ease_out_cubic(t))
}

/// The canvas rectangle for a container of the given size.
pub fn container_rect(size: Vec2) -> Rect {
    Rect::from_min_size(Pos2::ZERO, size.max(Vec2::ZERO))
}

/// Move `rect` (keeping its size) so it lies inside `bounds`.
///
/// A rectangle larger than `bounds` is pinned to the top-left corner.
pub fn clamp_into(rect: Rect, bounds: Rect) -> Rect {
    let size = rect.size();
    let max_x = (bounds.max.x - size.x).max(bounds.min.x);
    let max_y = (bounds.max.y - size.y).max(bounds.min.y);
    let min = pos2(
        rect.min.x.clamp(bounds.min.x, max_x),
        rect.min.y.clamp(bounds.min.y, max_y),
    );
    Rect::from_min_size(min, size)
}

pub fn contains_rect(bounds: Rect, rect: Rect) -> bool {
    rect.min.x >= bounds.min.x
        && rect.min.y >= bounds.min.y
        && rect.max.x <= bounds.max.x
        && rect.max.y <= bounds.max.y
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::vec2;

    fn rect(x: f32, y: f32, w: f32, h: f32) -> Rect {
        Rect::from_min_size(pos2(x, y), vec2(w, h))
    }

    #[test]
    fn touching_edges_do_not_overlap() {
        let a = rect(0.0, 0.0, 100.0, 100.0);
        assert!(!overlaps(a, rect(100.0, 0.0, 50.0, 50.0)));
        assert!(!overlaps(a, rect(0.0, 100.0, 50.0, 50.0)));
        assert!(overlaps(a, rect(99.0, 99.0, 50.0, 50.0)));
    }

    #[test]
    fn zero_size_rect_never_overlaps_itself() {
        let point = rect(10.0, 10.0, 0.0, 0.0);
        assert!(!overlaps(point, point));
        let line = rect(10.0, 10.0, 30.0, 0.0);
        assert!(!overlaps(line, line));
    }

    #[test]
    fn easing_hits_endpoints() {
        assert_eq!(ease_out_cubic(0.0), 0.0);
        assert_eq!(ease_out_cubic(1.0), 1.0);
        assert_eq!(ease_out_cubic(2.0), 1.0);
        // Ease-out front-loads the motion.
        assert!(ease_out_cubic(0.5) > 0.5);
    }

    #[test]
    fn clamp_pins_oversized_rect_to_origin() {
        let bounds = container_rect(vec2(100.0, 100.0));
        let clamped = clamp_into(rect(50.0, 50.0, 300.0, 20.0), bounds);
        assert_eq!(clamped.min, pos2(0.0, 50.0));
        assert_eq!(clamped.size(), vec2(300.0, 20.0));
    }
}
