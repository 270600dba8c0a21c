//! Per-widget UI state shared between the windows of one origin.
//!
//! The fast path is a broadcast channel named after the widget. When no broadcast hub is
//! available, the channel falls back to change notifications of the shared key-value
//! storage. Either way the latest state is also written to storage so a reload can recover it.
//!
//! Windows open one channel per shown widget with [`super::WindowSync::widget_channel`].

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::{Rc, Weak};

use serde_json::Value;

use crate::layout::WidgetId;

/// `"{prefix}{widget_id}"`.
pub fn storage_key(prefix: &str, widget_id: &WidgetId) -> String {
    format!("{prefix}{widget_id}")
}

pub trait KeyValueStorage {
    fn get_item(&self, key: &str) -> Option<String>;

    fn set_item(&mut self, key: &str, value: String);

    fn remove_item(&mut self, key: &str);
}

/// A storage change seen by the *other* views of a [`SharedStorage`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
    pub new_value: Option<String>,
}

type EventQueue = Rc<RefCell<VecDeque<StorageEvent>>>;

#[derive(Debug, Default)]
struct SharedItems {
    items: BTreeMap<String, String>,
    listeners: Vec<Weak<RefCell<VecDeque<StorageEvent>>>>,
}

/// Key-value storage shared by every window of one origin.
#[derive(Clone, Debug, Default)]
pub struct SharedStorage {
    shared: Rc<RefCell<SharedItems>>,
}

impl SharedStorage {
    /// One window's view. Writes through a view notify every other view.
    pub fn view(&self) -> StorageView {
        let events: EventQueue = Rc::default();
        self.shared
            .borrow_mut()
            .listeners
            .push(Rc::downgrade(&events));
        StorageView {
            shared: Rc::clone(&self.shared),
            events,
        }
    }
}

#[derive(Debug)]
pub struct StorageView {
    shared: Rc<RefCell<SharedItems>>,
    events: EventQueue,
}

impl StorageView {
    pub fn take_events(&self) -> Vec<StorageEvent> {
        self.events.borrow_mut().drain(..).collect()
    }

    fn notify_others(&self, event: &StorageEvent) {
        let mut shared = self.shared.borrow_mut();
        shared.listeners.retain(|listener| listener.strong_count() > 0);
        for listener in &shared.listeners {
            let Some(queue) = listener.upgrade() else {
                continue;
            };
            if !Rc::ptr_eq(&queue, &self.events) {
                queue.borrow_mut().push_back(event.clone());
            }
        }
    }
}

impl KeyValueStorage for StorageView {
    fn get_item(&self, key: &str) -> Option<String> {
        self.shared.borrow().items.get(key).cloned()
    }

    fn set_item(&mut self, key: &str, value: String) {
        self.shared
            .borrow_mut()
            .items
            .insert(key.to_owned(), value.clone());
        self.notify_others(&StorageEvent {
            key: key.to_owned(),
            new_value: Some(value),
        });
    }

    fn remove_item(&mut self, key: &str) {
        let removed = self.shared.borrow_mut().items.remove(key);
        if removed.is_some() {
            self.notify_others(&StorageEvent {
                key: key.to_owned(),
                new_value: None,
            });
        }
    }
}

#[derive(Debug, Default)]
struct Channels {
    ports: BTreeMap<String, Vec<Weak<RefCell<VecDeque<Value>>>>>,
}

/// Named broadcast channels between same-origin windows.
#[derive(Clone, Debug, Default)]
pub struct BroadcastHub {
    channels: Rc<RefCell<Channels>>,
}

impl BroadcastHub {
    pub fn open(&self, name: impl Into<String>) -> BroadcastPort {
        let name = name.into();
        let inbox: Rc<RefCell<VecDeque<Value>>> = Rc::default();
        self.channels
            .borrow_mut()
            .ports
            .entry(name.clone())
            .or_default()
            .push(Rc::downgrade(&inbox));
        BroadcastPort {
            name,
            channels: Rc::clone(&self.channels),
            inbox,
        }
    }
}

/// One end of a broadcast channel. Posts reach every other port with the same name.
#[derive(Debug)]
pub struct BroadcastPort {
    name: String,
    channels: Rc<RefCell<Channels>>,
    inbox: Rc<RefCell<VecDeque<Value>>>,
}

impl BroadcastPort {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns how many other ports received the message.
    pub fn post(&self, message: &Value) -> usize {
        let mut channels = self.channels.borrow_mut();
        let Some(ports) = channels.ports.get_mut(&self.name) else {
            return 0;
        };
        ports.retain(|port| port.strong_count() > 0);
        let mut delivered = 0;
        for port in ports.iter().filter_map(Weak::upgrade) {
            if !Rc::ptr_eq(&port, &self.inbox) {
                port.borrow_mut().push_back(message.clone());
                delivered += 1;
            }
        }
        delivered
    }

    pub fn take_messages(&self) -> Vec<Value> {
        self.inbox.borrow_mut().drain(..).collect()
    }
}

/// UI state of one widget, kept in step across the windows that show it.
#[derive(Debug)]
pub struct WidgetStateChannel {
    widget_id: WidgetId,
    key: String,
    port: Option<BroadcastPort>,
    storage: StorageView,
}

impl WidgetStateChannel {
    /// `hub` is `None` where broadcast channels are unsupported.
    pub fn new(
        widget_id: WidgetId,
        prefix: &str,
        hub: Option<&BroadcastHub>,
        storage: StorageView,
    ) -> Self {
        let key = storage_key(prefix, &widget_id);
        let port = hub.map(|hub| hub.open(key.clone()));
        if port.is_none() {
            log::debug!("channel {key}: no broadcast support, using storage events");
        }
        Self {
            widget_id,
            key,
            port,
            storage,
        }
    }

    pub fn widget_id(&self) -> &WidgetId {
        &self.widget_id
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn uses_broadcast(&self) -> bool {
        self.port.is_some()
    }

    pub fn publish(&mut self, state: &Value) {
        self.storage.set_item(&self.key, state.to_string());
        if let Some(port) = &self.port {
            port.post(state);
        }
    }

    /// Last published state, e.g. after a reload.
    pub fn restore(&self) -> Option<Value> {
        let raw = self.storage.get_item(&self.key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                log::warn!("channel {}: ignoring unreadable stored state: {err}", self.key);
                None
            }
        }
    }

    /// States published by other windows since the last poll, oldest first.
    pub fn poll(&mut self) -> Vec<Value> {
        let events = self.storage.take_events();
        if let Some(port) = &self.port {
            return port.take_messages();
        }
        events
            .into_iter()
            .filter(|event| event.key == self.key)
            .filter_map(|event| event.new_value)
            .filter_map(|raw| serde_json::from_str(&raw).ok())
            .collect()
    }

    pub fn clear(&mut self) {
        self.storage.remove_item(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn storage_key_concatenates_prefix_and_id() {
        assert_eq!(
            storage_key("dashboard-widget-", &WidgetId::new("chart-1")),
            "dashboard-widget-chart-1"
        );
    }

    #[test]
    fn broadcast_reaches_other_windows_only() {
        let hub = BroadcastHub::default();
        let storage = SharedStorage::default();
        let mut main = WidgetStateChannel::new("a".into(), "p-", Some(&hub), storage.view());
        let mut popout = WidgetStateChannel::new("a".into(), "p-", Some(&hub), storage.view());
        let mut other = WidgetStateChannel::new("b".into(), "p-", Some(&hub), storage.view());

        main.publish(&json!({ "zoom": 2 }));
        assert!(main.poll().is_empty());
        assert!(other.poll().is_empty());
        assert_eq!(popout.poll(), vec![json!({ "zoom": 2 })]);
        assert_eq!(popout.restore(), Some(json!({ "zoom": 2 })));
    }

    #[test]
    fn falls_back_to_storage_events() {
        let storage = SharedStorage::default();
        let mut main = WidgetStateChannel::new("a".into(), "p-", None, storage.view());
        let mut popout = WidgetStateChannel::new("a".into(), "p-", None, storage.view());
        assert!(!main.uses_broadcast());

        main.publish(&json!({ "zoom": 3 }));
        main.publish(&json!({ "zoom": 4 }));
        assert!(main.poll().is_empty());
        assert_eq!(popout.poll(), vec![json!({ "zoom": 3 }), json!({ "zoom": 4 })]);

        popout.clear();
        assert!(main.restore().is_none());
        assert!(main.poll().is_empty(), "removal carries no state");
    }
}
