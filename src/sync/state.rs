use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::message::WindowRole;

const SYNC_FROM_REMOTE: &str = "syncFromRemote";

/// A state-store action as it travels between windows: `{"type": "slice/name", "payload": ..}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActionDescriptor {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub payload: Value,

    /// Set on actions synthesized from a peer's message. Such actions are never sent back.
    #[serde(default, rename = "remoteSource", skip_serializing_if = "Option::is_none")]
    pub remote_source: Option<WindowRole>,
}

impl ActionDescriptor {
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
            remote_source: None,
        }
    }

    /// The replace-slice action dispatched for validated remote data.
    pub fn sync_from_remote(slice: &str, state: Value, source: WindowRole) -> Self {
        Self {
            kind: format!("{slice}/{SYNC_FROM_REMOTE}"),
            payload: state,
            remote_source: Some(source),
        }
    }

    /// Slice name: the part of the type before the first `/`.
    pub fn slice(&self) -> Option<&str> {
        self.kind
            .split_once('/')
            .map(|(slice, _)| slice)
            .filter(|slice| !slice.is_empty())
    }

    pub fn is_sync_from_remote(&self) -> bool {
        self.kind
            .split_once('/')
            .is_some_and(|(_, name)| name == SYNC_FROM_REMOTE)
    }
}

/// The host's application state, as far as sync is concerned: named JSON slices and a
/// dispatch entry point.
pub trait StateStore {
    fn dispatch(&mut self, action: ActionDescriptor);

    fn slice(&self, name: &str) -> Option<Value>;
}

/// A minimal reducer over JSON slices.
///
/// `{slice}/syncFromRemote` replaces the slice; any other action with an object payload is
/// shallow-merged into its slice. Hosts with real reducers implement [`StateStore`] themselves.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct JsonStateStore {
    slices: BTreeMap<String, Value>,
    dispatched: usize,
}

impl JsonStateStore {
    pub fn from_slices(slices: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self {
            slices: slices.into_iter().collect(),
            dispatched: 0,
        }
    }

    pub fn slices(&self) -> &BTreeMap<String, Value> {
        &self.slices
    }

    pub fn set_slice(&mut self, name: impl Into<String>, value: Value) {
        self.slices.insert(name.into(), value);
    }

    /// Number of actions dispatched so far.
    pub fn dispatch_count(&self) -> usize {
        self.dispatched
    }
}

impl StateStore for JsonStateStore {
    fn dispatch(&mut self, action: ActionDescriptor) {
        self.dispatched += 1;
        let Some(slice) = action.slice().map(str::to_owned) else {
            log::trace!("ignoring action without slice: {}", action.kind);
            return;
        };

        if action.is_sync_from_remote() {
            self.slices.insert(slice, action.payload);
            return;
        }

        let Value::Object(patch) = action.payload else {
            return;
        };
        let entry = self
            .slices
            .entry(slice)
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(fields) = entry {
            fields.extend(patch);
        } else {
            *entry = Value::Object(patch);
        }
    }

    fn slice(&self, name: &str) -> Option<Value> {
        self.slices.get(name).cloned()
    }
}
