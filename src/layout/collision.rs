use egui::{Pos2, Rect, Vec2, pos2, vec2};
use itertools::Itertools as _;

use super::geometry::{clamp_into, contains_rect, distance, overlaps};

/// Which side of an occupant a widget docks against.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DockSide {
    Left,
    Right,
    Top,
    Bottom,
}

impl DockSide {
    /// Evaluation order; earlier sides win distance ties.
    pub const ALL: [Self; 4] = [Self::Left, Self::Right, Self::Top, Self::Bottom];

    fn adjacent_pos(self, size: Vec2, occupant: Rect, gap: f32) -> Pos2 {
        match self {
            Self::Left => pos2(occupant.min.x - gap - size.x, occupant.min.y),
            Self::Right => pos2(occupant.max.x + gap, occupant.min.y),
            Self::Top => pos2(occupant.min.x, occupant.min.y - gap - size.y),
            Self::Bottom => pos2(occupant.min.x, occupant.max.y + gap),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DockCandidate {
    /// Index into the occupant slice.
    pub occupant: usize,
    pub side: DockSide,
    pub pos: Pos2,
    /// Distance from the candidate's own position.
    pub distance: f32,
}

/// Every valid adjacency slot around `occupants` for a widget shaped like `candidate`.
///
/// Slots outside `bounds`, or overlapping any occupant other than the one they dock to,
/// are skipped.
pub fn dock_candidates(
    candidate: Rect,
    occupants: &[Rect],
    bounds: Rect,
    gap: f32,
) -> impl Iterator<Item = DockCandidate> + '_ {
    let size = candidate.size();
    occupants
        .iter()
        .enumerate()
        .cartesian_product(DockSide::ALL)
        .filter_map(move |((index, occupant), side)| {
            let pos = side.adjacent_pos(size, *occupant, gap);
            let slot = Rect::from_min_size(pos, size);
            if !contains_rect(bounds, slot) {
                return None;
            }
            let blocked = occupants
                .iter()
                .enumerate()
                .any(|(other, rect)| other != index && overlaps(slot, *rect));
            (!blocked).then(|| DockCandidate {
                occupant: index,
                side,
                pos,
                distance: distance(candidate.min, pos),
            })
        })
}

/// The closest dock slot within `tolerance`, if any.
pub fn nearest_dock(
    candidate: Rect,
    occupants: &[Rect],
    bounds: Rect,
    gap: f32,
    tolerance: f32,
) -> Option<DockCandidate> {
    dock_candidates(candidate, occupants, bounds, gap)
        .filter(|slot| slot.distance <= tolerance)
        .min_by(|a, b| a.distance.total_cmp(&b.distance))
}

/// Where `candidate` should settle: the nearest dock slot within `tolerance`,
/// or its own position when nothing is close enough.
pub fn find_dock_position(
    candidate: Rect,
    occupants: &[Rect],
    bounds: Rect,
    gap: f32,
    tolerance: f32,
) -> Pos2 {
    nearest_dock(candidate, occupants, bounds, gap, tolerance)
        .map_or(candidate.min, |slot| slot.pos)
}

/// Indices of the occupants that `candidate` overlaps.
pub fn collisions(candidate: Rect, occupants: &[Rect]) -> Vec<usize> {
    occupants
        .iter()
        .positions(|rect| overlaps(candidate, *rect))
        .collect()
}

/// Collision response: move `pushed` out of `mover` along the axis with the smaller
/// overlap, away from the mover's center, then clamp into `bounds`.
///
/// Only resolves this one pair. A pushed widget may end up overlapping a third one.
pub fn push_out(mover: Rect, pushed: Rect, bounds: Rect) -> Rect {
    if !overlaps(mover, pushed) {
        return pushed;
    }

    let overlap = mover.intersect(pushed);
    let delta = if overlap.width() < overlap.height() {
        if pushed.center().x >= mover.center().x {
            vec2(mover.max.x - pushed.min.x, 0.0)
        } else {
            vec2(mover.min.x - pushed.max.x, 0.0)
        }
    } else if pushed.center().y >= mover.center().y {
        vec2(0.0, mover.max.y - pushed.min.y)
    } else {
        vec2(0.0, mover.min.y - pushed.max.y)
    };

    clamp_into(pushed.translate(delta), bounds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::geometry::container_rect;

    fn rect(x: f32, y: f32, w: f32, h: f32) -> Rect {
        Rect::from_min_size(pos2(x, y), vec2(w, h))
    }

    #[test]
    fn docks_left_of_occupant_when_close() {
        let bounds = container_rect(vec2(800.0, 600.0));
        let occupant = rect(210.0, 0.0, 200.0, 150.0);
        let candidate = rect(6.0, 3.0, 200.0, 150.0);
        let pos = find_dock_position(candidate, &[occupant], bounds, 10.0, 10.0);
        assert_eq!(pos, pos2(0.0, 0.0));
    }

    #[test]
    fn leaves_candidate_alone_when_nothing_is_near() {
        let bounds = container_rect(vec2(800.0, 600.0));
        let occupant = rect(210.0, 0.0, 200.0, 150.0);
        let candidate = rect(205.0, 0.0, 200.0, 150.0);
        let pos = find_dock_position(candidate, &[occupant], bounds, 10.0, 10.0);
        assert_eq!(pos, candidate.min);
    }

    #[test]
    fn skips_slots_outside_bounds_or_blocked() {
        let bounds = container_rect(vec2(420.0, 400.0));
        // Left of `a` is out of bounds, right of `a` is blocked by `b`.
        let a = rect(0.0, 0.0, 200.0, 150.0);
        let b = rect(215.0, 0.0, 200.0, 150.0);
        let candidate = rect(212.0, 2.0, 200.0, 150.0);
        let slots: Vec<_> = dock_candidates(candidate, &[a, b], bounds, 10.0).collect();
        assert!(
            slots
                .iter()
                .all(|s| !(s.occupant == 0 && matches!(s.side, DockSide::Left | DockSide::Right)))
        );
        assert!(
            slots
                .iter()
                .all(|s| contains_rect(bounds, Rect::from_min_size(s.pos, candidate.size())))
        );
    }

    #[test]
    fn tie_prefers_first_occupant_then_first_side() {
        let bounds = container_rect(vec2(1000.0, 1000.0));
        let a = rect(300.0, 300.0, 100.0, 100.0);
        // Candidate sits exactly between "left of a" and "top of a".
        let candidate = rect(195.0, 195.0, 100.0, 100.0);
        let slot = nearest_dock(candidate, &[a], bounds, 5.0, 200.0).unwrap();
        assert_eq!(slot.side, DockSide::Left);
        assert_eq!(slot.occupant, 0);
    }

    #[test]
    fn push_uses_axis_of_smaller_overlap() {
        let bounds = container_rect(vec2(800.0, 600.0));
        let mover = rect(0.0, 0.0, 100.0, 100.0);
        let pushed = rect(90.0, 10.0, 100.0, 100.0);
        assert_eq!(push_out(mover, pushed, bounds).min, pos2(100.0, 10.0));

        let pushed = rect(10.0, 80.0, 100.0, 100.0);
        assert_eq!(push_out(mover, pushed, bounds).min, pos2(10.0, 100.0));
    }

    #[test]
    fn push_is_clamped_to_bounds() {
        let bounds = container_rect(vec2(200.0, 200.0));
        let mover = rect(50.0, 0.0, 100.0, 100.0);
        let pushed = rect(140.0, 0.0, 60.0, 150.0);
        let out = push_out(mover, pushed, bounds);
        assert!(contains_rect(bounds, out));
    }

    #[test]
    fn collisions_lists_overlapping_indices() {
        let candidate = rect(0.0, 0.0, 100.0, 100.0);
        let occupants = [
            rect(100.0, 0.0, 10.0, 10.0),
            rect(50.0, 50.0, 10.0, 10.0),
            rect(-5.0, -5.0, 10.0, 10.0),
        ];
        assert_eq!(collisions(candidate, &occupants), vec![1, 2]);
    }
}
