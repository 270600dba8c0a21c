use super::channel::{BroadcastHub, StorageView, WidgetStateChannel};
use super::handshake::{HandshakeError, HandshakeStatus, StoreInitializer};
use super::manager::{ApplyReport, InitialDataResponder, SendOutcome, SyncError, SyncManager};
use super::message::{Envelope, WindowMessage, WindowRole};
use super::options::SyncOptions;
use super::registry::{OpenerLink, PopoutRegistry};
use super::state::{ActionDescriptor, StateStore};
use crate::layout::WidgetId;

#[derive(Debug)]
enum Link {
    Main {
        registry: PopoutRegistry,
        responder: InitialDataResponder,
    },
    Popout {
        opener: OpenerLink,
        initializer: StoreInitializer,
    },
}

/// Result of routing one inbound message.
#[derive(Clone, Debug, PartialEq)]
pub enum Inbound {
    Applied(ApplyReport),
    /// Main: an initial data request was answered.
    Responded(WidgetId),
    /// Popout: the handshake finished (successfully or not).
    Initialized(Result<(), HandshakeError>),
    /// Main: a popout is closing; the caller returns the widget to its canvas.
    PopoutClosing(WidgetId),
    Rejected(SyncError),
}

/// Everything one window needs to take part in sync, wired for its role.
#[derive(Debug)]
pub struct WindowSync {
    manager: SyncManager,
    link: Link,
}

impl WindowSync {
    /// The primary window, at `origin`.
    pub fn main(options: SyncOptions, origin: impl Into<String>) -> Self {
        Self {
            manager: SyncManager::new(WindowRole::Main, options),
            link: Link::Main {
                registry: PopoutRegistry::default(),
                responder: InitialDataResponder::new(origin),
            },
        }
    }

    /// A popout showing `widget_id`. State syncs are accepted from the opener's origin as
    /// captured here, whether or not the handshake succeeds. Without an opener nothing is
    /// accepted.
    pub fn popout(options: SyncOptions, widget_id: WidgetId, opener: OpenerLink) -> Self {
        let initializer = StoreInitializer::new(widget_id, options.handshake_timeout);
        let mut manager = SyncManager::new(WindowRole::Popout, options);
        if let Some(origin) = opener.origin() {
            manager.set_expected_origin(origin);
        }
        Self {
            manager,
            link: Link::Popout {
                opener,
                initializer,
            },
        }
    }

    pub fn role(&self) -> WindowRole {
        self.manager.role()
    }

    pub fn manager(&self) -> &SyncManager {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut SyncManager {
        &mut self.manager
    }

    pub fn registry(&self) -> Option<&PopoutRegistry> {
        match &self.link {
            Link::Main { registry, .. } => Some(registry),
            Link::Popout { .. } => None,
        }
    }

    pub fn registry_mut(&mut self) -> Option<&mut PopoutRegistry> {
        match &mut self.link {
            Link::Main { registry, .. } => Some(registry),
            Link::Popout { .. } => None,
        }
    }

    pub fn opener(&self) -> Option<&OpenerLink> {
        match &self.link {
            Link::Main { .. } => None,
            Link::Popout { opener, .. } => Some(opener),
        }
    }

    pub fn handshake(&self) -> Option<&HandshakeStatus> {
        match &self.link {
            Link::Main { .. } => None,
            Link::Popout { initializer, .. } => Some(initializer.status()),
        }
    }

    /// Popout: request the initial state. No-op on the main window.
    pub fn start(&mut self, now: f64) {
        if let Link::Popout {
            opener,
            initializer,
        } = &mut self.link
        {
            initializer.begin(opener, now);
        }
    }

    /// Drive the handshake timeout.
    pub fn poll(&mut self, now: f64) {
        if let Link::Popout { initializer, .. } = &mut self.link {
            initializer.poll(now);
        }
    }

    /// Call after `action` was applied to the local store.
    pub fn action_dispatched(
        &mut self,
        action: &ActionDescriptor,
        state: &dyn StateStore,
        now: f64,
    ) -> SendOutcome {
        match &mut self.link {
            Link::Main { registry, .. } => {
                self.manager.send_sync_message(action, state, now, registry)
            }
            Link::Popout { opener, .. } => {
                self.manager.send_sync_message(action, state, now, opener)
            }
        }
    }

    /// Shared UI state of `widget_id`, keyed with this window's storage prefix.
    pub fn widget_channel(
        &self,
        widget_id: WidgetId,
        hub: Option<&BroadcastHub>,
        storage: StorageView,
    ) -> WidgetStateChannel {
        WidgetStateChannel::new(widget_id, &self.manager.options().storage_prefix, hub, storage)
    }

    pub fn handle(
        &mut self,
        envelope: &Envelope,
        state: &mut dyn StateStore,
        now: f64,
    ) -> Inbound {
        match (&mut self.link, &envelope.message) {
            (_, WindowMessage::StateSync { .. }) => {
                match self.manager.handle_incoming(envelope, state) {
                    Ok(report) => Inbound::Applied(report),
                    Err(err) => Inbound::Rejected(err),
                }
            }
            (Link::Main { responder, .. }, WindowMessage::InitialDataRequest { widget_id, .. }) => {
                match responder.respond(&self.manager, state, envelope, now) {
                    Ok(()) => Inbound::Responded(widget_id.clone()),
                    Err(err) => {
                        log::warn!("handshake: could not answer {widget_id}: {err}");
                        Inbound::Rejected(err)
                    }
                }
            }
            (Link::Main { registry, .. }, WindowMessage::PopoutClosing { widget_id, .. }) => {
                registry.unregister(widget_id);
                Inbound::PopoutClosing(widget_id.clone())
            }
            (Link::Popout { initializer, .. }, WindowMessage::InitialDataResponse { .. }) => {
                let result = initializer.handle_response(envelope, &mut self.manager, state);
                Inbound::Initialized(result)
            }
            (_, message) => {
                log::debug!(
                    "sync: {} is not handled by a {} window",
                    message.kind(),
                    self.manager.role()
                );
                Inbound::Rejected(SyncError::Unexpected(message.kind()))
            }
        }
    }
}
