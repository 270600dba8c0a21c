use std::collections::BTreeMap;
use std::rc::Rc;

use super::message::WindowMessage;
use super::transport::{PeerWindow, TransportError};
use crate::layout::WidgetId;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    /// Windows found closed during this broadcast and dropped from the registry.
    pub pruned: Vec<WidgetId>,
    pub failed: usize,
}

/// Where outgoing sync messages go: every popout (main window) or the opener (popout).
pub trait SyncPeers {
    fn broadcast(&mut self, message: &WindowMessage) -> BroadcastReport;
}

/// Main-window side: live handles to popped-out widgets, keyed by widget id.
///
/// Closed windows are pruned lazily, on the next broadcast or [`Self::prune`].
#[derive(Debug, Default)]
pub struct PopoutRegistry {
    windows: BTreeMap<WidgetId, Rc<dyn PeerWindow>>,
}

impl PopoutRegistry {
    /// Returns the handle previously registered for `widget_id`, if any.
    pub fn register(
        &mut self,
        widget_id: WidgetId,
        window: Rc<dyn PeerWindow>,
    ) -> Option<Rc<dyn PeerWindow>> {
        log::debug!("registry: register popout {widget_id}");
        self.windows.insert(widget_id, window)
    }

    pub fn unregister(&mut self, widget_id: &WidgetId) -> Option<Rc<dyn PeerWindow>> {
        let removed = self.windows.remove(widget_id);
        if removed.is_some() {
            log::debug!("registry: unregister popout {widget_id}");
        }
        removed
    }

    pub fn get(&self, widget_id: &WidgetId) -> Option<&Rc<dyn PeerWindow>> {
        self.windows.get(widget_id)
    }

    /// Registered and not (yet known to be) closed.
    pub fn is_live(&self, widget_id: &WidgetId) -> bool {
        self.windows
            .get(widget_id)
            .is_some_and(|window| !window.is_closed())
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn widget_ids(&self) -> impl Iterator<Item = &WidgetId> {
        self.windows.keys()
    }

    /// Drop every closed handle; returns their widget ids.
    pub fn prune(&mut self) -> Vec<WidgetId> {
        let mut pruned = Vec::new();
        self.windows.retain(|widget_id, window| {
            if window.is_closed() {
                pruned.push(widget_id.clone());
                false
            } else {
                true
            }
        });
        if !pruned.is_empty() {
            log::debug!("registry: pruned closed popouts {pruned:?}");
        }
        pruned
    }
}

impl SyncPeers for PopoutRegistry {
    fn broadcast(&mut self, message: &WindowMessage) -> BroadcastReport {
        let mut report = BroadcastReport {
            pruned: self.prune(),
            ..Default::default()
        };
        for (widget_id, window) in &self.windows {
            match window.post(message) {
                Ok(()) => report.delivered += 1,
                Err(err) => {
                    log::debug!("registry: post to {widget_id} failed: {err}");
                    report.failed += 1;
                }
            }
        }
        report
    }
}

/// Popout side: the single window that opened this one, if it is still around.
#[derive(Clone, Debug, Default)]
pub struct OpenerLink {
    opener: Option<Rc<dyn PeerWindow>>,
}

impl OpenerLink {
    pub fn new(opener: Option<Rc<dyn PeerWindow>>) -> Self {
        Self { opener }
    }

    pub fn opener(&self) -> Option<&Rc<dyn PeerWindow>> {
        self.opener.as_ref()
    }

    pub fn is_available(&self) -> bool {
        self.opener.as_ref().is_some_and(|opener| !opener.is_closed())
    }

    pub fn origin(&self) -> Option<String> {
        self.opener.as_ref().map(|opener| opener.origin())
    }

    pub fn post(&self, message: &WindowMessage) -> Result<(), TransportError> {
        let opener = self.opener.as_ref().ok_or(TransportError::NoPeer)?;
        opener.post(message)
    }
}

impl SyncPeers for OpenerLink {
    fn broadcast(&mut self, message: &WindowMessage) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        match self.post(message) {
            Ok(()) => report.delivered = 1,
            Err(TransportError::NoPeer) => {}
            Err(err) => {
                log::debug!("opener: post failed: {err}");
                report.failed = 1;
            }
        }
        report
    }
}
