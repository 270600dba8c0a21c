//! Widget layout engine and cross-window state sync for a dockable analysis dashboard.
//!
//! - [`layout`]: free-form widget canvas with snapping, docking, collision pushing and
//!   debounced persistence.
//! - [`sync`]: keeps state slices consistent between the main window and popped-out widget
//!   windows.
//! - [`Dashboard`]: the two wired together for one window.
#![forbid(unsafe_code)]

pub mod dashboard;
pub mod layout;
pub mod sync;

pub use dashboard::{Dashboard, MountOutcome};
pub use layout::{
    DragController, LayoutOptions, LayoutPersistence, LayoutSnapshot, LayoutStore, WidgetDescriptor,
    WidgetFactory, WidgetId,
};
pub use sync::{SyncManager, SyncOptions, WindowMessage, WindowRole, WindowSync};

#[cfg(feature = "persistence")]
pub use layout::RonFilePersistence;
