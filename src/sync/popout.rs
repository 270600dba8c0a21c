//! Moving widgets between the canvas and their own windows.

use std::rc::Rc;

use super::message::{Envelope, WindowMessage, wire_timestamp};
use super::registry::{OpenerLink, PopoutRegistry};
use super::transport::{PeerWindow, TransportError};
use crate::layout::{LayoutError, LayoutStore, WidgetId};

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PopoutError {
    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error("widget {0} is already popped out")]
    AlreadyPoppedOut(WidgetId),

    #[error("window for {widget_id} could not be opened: {reason}")]
    SpawnFailed { widget_id: WidgetId, reason: String },
}

/// What the host needs to open a window for one widget.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PopoutRequest {
    pub widget_id: WidgetId,
    pub title: String,
    pub kind: String,
}

/// Opens popout windows. The returned handle only observes the new window.
pub trait PopoutSpawner {
    fn spawn(&mut self, request: &PopoutRequest) -> Result<Rc<dyn PeerWindow>, PopoutError>;
}

/// Open `id` in its own window and take it off the canvas.
///
/// Its layout item is kept so [`return_widget`] puts it back where it was.
pub fn pop_out_widget<Content>(
    store: &mut LayoutStore<Content>,
    registry: &mut PopoutRegistry,
    spawner: &mut dyn PopoutSpawner,
    id: &WidgetId,
) -> Result<(), PopoutError> {
    let widget = store
        .widget(id)
        .ok_or_else(|| LayoutError::UnknownWidget(id.clone()))?;
    if widget.popped_out && registry.is_live(id) {
        return Err(PopoutError::AlreadyPoppedOut(id.clone()));
    }

    let request = PopoutRequest {
        widget_id: id.clone(),
        title: widget.title.clone(),
        kind: widget.kind.clone(),
    };
    let window = spawner.spawn(&request)?;
    registry.register(id.clone(), window);
    store.set_popped_out(id, true);
    log::debug!("popped out {id}");
    Ok(())
}

/// Put `id` back on the canvas. Returns `false` if it was not popped out.
pub fn return_widget<Content>(
    store: &mut LayoutStore<Content>,
    registry: &mut PopoutRegistry,
    id: &WidgetId,
) -> bool {
    registry.unregister(id);
    let was_popped_out = store.widget(id).is_some_and(|w| w.popped_out);
    if was_popped_out {
        store.set_popped_out(id, false);
        log::debug!("returned {id} to the canvas");
    }
    was_popped_out
}

/// Main side: react to a popout announcing it is closing.
pub fn handle_popout_closing<Content>(
    store: &mut LayoutStore<Content>,
    registry: &mut PopoutRegistry,
    envelope: &Envelope,
) -> Option<WidgetId> {
    let WindowMessage::PopoutClosing { widget_id, .. } = &envelope.message else {
        return None;
    };
    return_widget(store, registry, widget_id).then(|| widget_id.clone())
}

/// Main side: return every widget whose window was closed without saying goodbye.
pub fn reconcile_closed_popouts<Content>(
    store: &mut LayoutStore<Content>,
    registry: &mut PopoutRegistry,
) -> Vec<WidgetId> {
    registry
        .prune()
        .into_iter()
        .filter(|id| return_widget(store, registry, id))
        .collect()
}

/// Popout side: tell the opener this window is going away.
pub fn announce_closing(
    opener: &OpenerLink,
    widget_id: &WidgetId,
    now: f64,
) -> Result<(), TransportError> {
    opener.post(&WindowMessage::PopoutClosing {
        widget_id: widget_id.clone(),
        timestamp: wire_timestamp(now),
    })
}
