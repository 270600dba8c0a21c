use egui::{Rect, vec2};
use itertools::Itertools as _;

/// Result of [`find_guides`]: per axis, the guide line to draw and the corrected
/// `min` coordinate for the candidate.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SnapGuides {
    pub x_guide: Option<f32>,
    pub snap_x: Option<f32>,
    pub y_guide: Option<f32>,
    pub snap_y: Option<f32>,
}

impl SnapGuides {
    pub fn is_empty(&self) -> bool {
        self.snap_x.is_none() && self.snap_y.is_none()
    }

    /// Move `rect` to the snapped coordinates. The result may leave the container;
    /// callers re-clamp.
    pub fn apply(&self, rect: Rect) -> Rect {
        let dx = self.snap_x.map_or(0.0, |x| x - rect.min.x);
        let dy = self.snap_y.map_or(0.0, |y| y - rect.min.y);
        rect.translate(vec2(dx, dy))
    }
}

#[derive(Clone, Copy, Debug)]
struct Span {
    start: f32,
    end: f32,
}

impl Span {
    fn x(rect: Rect) -> Self {
        Self {
            start: rect.min.x,
            end: rect.max.x,
        }
    }

    fn y(rect: Rect) -> Self {
        Self {
            start: rect.min.y,
            end: rect.max.y,
        }
    }

    fn center(self) -> f32 {
        0.5 * (self.start + self.end)
    }

    fn len(self) -> f32 {
        self.end - self.start
    }
}

/// Edge pairing, named candidate-edge-to-occupant-edge.
#[derive(Clone, Copy, Debug)]
enum Align {
    StartToStart,
    EndToStart,
    StartToEnd,
    EndToEnd,
    CenterToCenter,
}

impl Align {
    const ALL: [Self; 5] = [
        Self::StartToStart,
        Self::EndToStart,
        Self::StartToEnd,
        Self::EndToEnd,
        Self::CenterToCenter,
    ];

    fn evaluate(self, candidate: Span, occupant: Span) -> AxisMatch {
        let len = candidate.len();
        let (edge, guide, snap) = match self {
            Self::StartToStart => (candidate.start, occupant.start, occupant.start),
            Self::EndToStart => (candidate.end, occupant.start, occupant.start - len),
            Self::StartToEnd => (candidate.start, occupant.end, occupant.end),
            Self::EndToEnd => (candidate.end, occupant.end, occupant.end - len),
            Self::CenterToCenter => (
                candidate.center(),
                occupant.center(),
                occupant.center() - 0.5 * len,
            ),
        };
        AxisMatch {
            distance: (edge - guide).abs(),
            guide,
            snap,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct AxisMatch {
    distance: f32,
    guide: f32,
    snap: f32,
}

fn best_match(candidate: Span, occupants: &[Span], tolerance: f32) -> Option<AxisMatch> {
    occupants
        .iter()
        .cartesian_product(Align::ALL)
        .map(|(occupant, align)| align.evaluate(candidate, *occupant))
        .filter(|m| m.distance <= tolerance)
        .min_by(|a, b| a.distance.total_cmp(&b.distance))
}

/// Find the closest edge or center alignment of `candidate` with any occupant,
/// independently per axis, within `tolerance`.
///
/// Ties go to the first occupant and the first rule in left-left, right-left,
/// left-right, right-right, center order.
pub fn find_guides(candidate: Rect, occupants: &[Rect], tolerance: f32) -> SnapGuides {
    let xs: Vec<Span> = occupants.iter().copied().map(Span::x).collect();
    let ys: Vec<Span> = occupants.iter().copied().map(Span::y).collect();

    let x = best_match(Span::x(candidate), &xs, tolerance);
    let y = best_match(Span::y(candidate), &ys, tolerance);

    SnapGuides {
        x_guide: x.map(|m| m.guide),
        snap_x: x.map(|m| m.snap),
        y_guide: y.map(|m| m.guide),
        snap_y: y.map(|m| m.snap),
    }
}
