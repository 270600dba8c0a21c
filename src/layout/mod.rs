//! Free-form widget canvas: geometry, the layout store, and the pointer gesture controller.

mod autosave;
mod capture;
mod collision;
mod controller;
mod geometry;
mod integrity;
mod options;
mod persistence;
mod scheduler;
mod session;
mod snap;
mod store;
mod types;
mod widget_factory;

#[cfg(test)]
mod controller_tests;

pub use autosave::{AutoSaveStatus, AutoSaver};
pub use capture::{CaptureState, InputCapture};
pub use collision::{
    DockCandidate, DockSide, collisions, dock_candidates, find_dock_position, nearest_dock,
    push_out,
};
pub use controller::{DragController, WidgetGeometry, WindowEvent};
pub use geometry::{
    clamp_into, container_rect, contains_rect, distance, ease_out_cubic, interpolate, overlaps,
};
pub use integrity::{layout_integrity_issues, overlapping_pairs};
pub use options::LayoutOptions;
pub use persistence::{
    LAYOUT_SNAPSHOT_VERSION, LayoutPersistence, LayoutSnapshot, MemoryLayoutPersistence,
    PersistenceError, WidgetRecord,
};
#[cfg(feature = "persistence")]
pub use persistence::RonFilePersistence;
pub use scheduler::{FrameScheduler, FrameToken, ManualFrameScheduler, RepaintScheduler};
pub use session::{GesturePhase, ResizeEdge};
pub use snap::{SnapGuides, find_guides};
pub use store::{LayoutError, LayoutStore};
pub use types::{
    Layout, LayoutItem, LayoutOp, SizeConstraints, Widget, WidgetDescriptor, WidgetId,
    WidgetPatch,
};
pub use widget_factory::{KnownKindsFactory, SimpleWidgetFactory, WidgetFactory};

pub(crate) use integrity::debug_check;
