use egui::{Vec2, vec2};
use serde::{Deserialize, Serialize};

/// Options for the layout engine ([`super::DragController`], [`super::LayoutStore`] and
/// [`super::AutoSaver`]).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutOptions {
    /// Align dragged widgets with the edges and centers of other widgets.
    pub snapping: bool,

    /// Maximum distance (in points) between two edges for snapping to kick in.
    pub snap_tolerance: f32,

    /// At gesture end, glide the widget next to a nearby widget.
    pub docking: bool,

    /// Maximum distance (in points) between the drop position and a dock slot.
    pub dock_tolerance: f32,

    /// Space left between a docked widget and its neighbour.
    pub dock_gap: f32,

    /// While dragging, push overlapped widgets out of the way (one pass, no cascading).
    pub push_on_collision: bool,

    /// Duration of the dock settle animation, in seconds.
    pub settle_duration: f64,

    /// Quiet period (seconds) after the last layout change before it is persisted.
    pub autosave_delay: f64,

    /// Size used when a descriptor does not carry one.
    pub default_widget_size: Vec2,

    /// Canvas size until the host reports the real one.
    pub default_container_size: Vec2,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            snapping: true,
            snap_tolerance: 10.0,
            docking: true,
            dock_tolerance: 20.0,
            dock_gap: 10.0,
            push_on_collision: true,
            settle_duration: 0.25,
            autosave_delay: 2.0,
            default_widget_size: vec2(400.0, 300.0),
            default_container_size: vec2(1280.0, 800.0),
        }
    }
}

impl LayoutOptions {
    pub(crate) fn effective_snap_tolerance(&self) -> Option<f32> {
        (self.snapping && self.snap_tolerance > 0.0).then_some(self.snap_tolerance)
    }

    pub(crate) fn effective_dock_tolerance(&self) -> Option<f32> {
        (self.docking && self.dock_tolerance > 0.0).then_some(self.dock_tolerance)
    }
}
