use egui::{CursorIcon, Pos2, Rect, Vec2, pos2};

use super::geometry::interpolate;
use super::types::{SizeConstraints, WidgetId};

/// Which edge or corner of a widget is being dragged in a resize gesture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResizeEdge {
    Left,
    Right,
    Top,
    Bottom,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl ResizeEdge {
    pub fn cursor(self) -> CursorIcon {
        match self {
            Self::Left | Self::Right => CursorIcon::ResizeHorizontal,
            Self::Top | Self::Bottom => CursorIcon::ResizeVertical,
            Self::TopLeft | Self::BottomRight => CursorIcon::ResizeNwSe,
            Self::TopRight | Self::BottomLeft => CursorIcon::ResizeNeSw,
        }
    }

    fn moves_left(self) -> bool {
        matches!(self, Self::Left | Self::TopLeft | Self::BottomLeft)
    }

    fn moves_right(self) -> bool {
        matches!(self, Self::Right | Self::TopRight | Self::BottomRight)
    }

    fn moves_top(self) -> bool {
        matches!(self, Self::Top | Self::TopLeft | Self::TopRight)
    }

    fn moves_bottom(self) -> bool {
        matches!(self, Self::Bottom | Self::BottomLeft | Self::BottomRight)
    }
}

/// Resize `start` by the pointer `delta` on `edge`.
///
/// Size is truncated to `max`, then to the container edge, then floored at `min`
/// (the minimum wins). The edge opposite to the dragged one stays fixed.
pub(crate) fn resized_rect(
    start: Rect,
    edge: ResizeEdge,
    delta: Vec2,
    constraints: &SizeConstraints,
    bounds: Rect,
) -> Rect {
    let min = constraints.min_or_zero();
    let max = constraints.max.unwrap_or(Vec2::splat(f32::INFINITY));

    let mut width = start.width();
    let mut height = start.height();

    if edge.moves_right() {
        width = (start.width() + delta.x)
            .min(max.x)
            .min(bounds.max.x - start.min.x);
    } else if edge.moves_left() {
        width = (start.width() - delta.x)
            .min(max.x)
            .min(start.max.x - bounds.min.x);
    }
    if edge.moves_bottom() {
        height = (start.height() + delta.y)
            .min(max.y)
            .min(bounds.max.y - start.min.y);
    } else if edge.moves_top() {
        height = (start.height() - delta.y)
            .min(max.y)
            .min(start.max.y - bounds.min.y);
    }

    width = width.max(min.x);
    height = height.max(min.y);

    let x = if edge.moves_left() {
        start.max.x - width
    } else {
        start.min.x
    };
    let y = if edge.moves_top() {
        start.max.y - height
    } else {
        start.min.y
    };

    Rect::from_min_size(pos2(x, y), Vec2::new(width, height))
}

#[derive(Clone, Debug)]
pub(super) struct DragSession {
    pub(super) id: u64,
    pub(super) widget: WidgetId,
    pub(super) pointer_origin: Pos2,
    pub(super) latest_pointer: Pos2,
    pub(super) start_rect: Rect,
    pub(super) proposed: Rect,
}

impl DragSession {
    pub(super) fn delta(&self) -> Vec2 {
        self.latest_pointer - self.pointer_origin
    }
}

#[derive(Clone, Debug)]
pub(super) struct ResizeSession {
    pub(super) id: u64,
    pub(super) widget: WidgetId,
    pub(super) edge: ResizeEdge,
    pub(super) constraints: SizeConstraints,
    pub(super) pointer_origin: Pos2,
    pub(super) latest_pointer: Pos2,
    pub(super) start_rect: Rect,
    pub(super) proposed: Rect,
}

impl ResizeSession {
    pub(super) fn delta(&self) -> Vec2 {
        self.latest_pointer - self.pointer_origin
    }
}

#[derive(Clone, Debug)]
pub(super) struct SettleAnimation {
    pub(super) id: u64,
    pub(super) widget: WidgetId,
    pub(super) from: Pos2,
    pub(super) to: Pos2,
    pub(super) size: Vec2,
    pub(super) duration: f64,
    /// Set by the first animation frame.
    pub(super) started_at: Option<f64>,
}

impl SettleAnimation {
    /// Rect at time `now`, and whether the animation is over.
    pub(super) fn sample(&mut self, now: f64) -> (Rect, bool) {
        let started_at = *self.started_at.get_or_insert(now);
        let t = if self.duration > 0.0 {
            ((now - started_at) / self.duration).clamp(0.0, 1.0)
        } else {
            1.0
        };
        let done = t >= 1.0;
        let pos = if done {
            self.to
        } else {
            interpolate(self.from, self.to, t as f32)
        };
        (Rect::from_min_size(pos, self.size), done)
    }

    pub(super) fn final_rect(&self) -> Rect {
        Rect::from_min_size(self.to, self.size)
    }
}

/// The controller's state machine.
#[derive(Clone, Debug, Default)]
pub(super) enum Gesture {
    #[default]
    Idle,
    Dragging(DragSession),
    Resizing(ResizeSession),
    Settling(SettleAnimation),
}

/// Public view of [`Gesture`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GesturePhase {
    Idle,
    Dragging,
    Resizing,
    Settling,
}

impl Gesture {
    pub(super) fn phase(&self) -> GesturePhase {
        match self {
            Self::Idle => GesturePhase::Idle,
            Self::Dragging(_) => GesturePhase::Dragging,
            Self::Resizing(_) => GesturePhase::Resizing,
            Self::Settling(_) => GesturePhase::Settling,
        }
    }

    pub(super) fn widget(&self) -> Option<&WidgetId> {
        match self {
            Self::Idle => None,
            Self::Dragging(s) => Some(&s.widget),
            Self::Resizing(s) => Some(&s.widget),
            Self::Settling(s) => Some(&s.widget),
        }
    }

    pub(super) fn session_id(&self) -> Option<u64> {
        match self {
            Self::Idle => None,
            Self::Dragging(s) => Some(s.id),
            Self::Resizing(s) => Some(s.id),
            Self::Settling(s) => Some(s.id),
        }
    }
}
