//! Wire contracts between the main window and its popouts.
//!
//! Every message is a JSON object discriminated by `type`, e.g.
//! `{"type":"REDUX_STATE_SYNC","action":{..},"timestamp":..,"sourceWindow":"main"}`.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::state::ActionDescriptor;
use super::transport::PeerWindow;
use crate::layout::WidgetId;

/// Which side of the window pair a sync participant is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowRole {
    Main,
    Popout,
}

impl fmt::Display for WindowRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Main => "main",
            Self::Popout => "popout",
        })
    }
}

/// Snapshot the main window hands a freshly opened popout.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialData {
    pub initial_state: BTreeMap<String, Value>,
    pub widget_id: WidgetId,
    pub parent_origin: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum WindowMessage {
    /// An eligible action, plus the latest value of the slice it touched.
    #[serde(rename = "REDUX_STATE_SYNC")]
    StateSync {
        action: ActionDescriptor,
        /// Milliseconds.
        timestamp: f64,
        source_window: WindowRole,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        slice_updates: Option<BTreeMap<String, Value>>,
    },

    /// Popout → opener: "send me the current state".
    #[serde(rename = "POPOUT_INITIAL_DATA_REQUEST")]
    InitialDataRequest { widget_id: WidgetId, timestamp: f64 },

    /// Opener → requesting popout only.
    #[serde(rename = "POPOUT_INITIAL_DATA_RESPONSE")]
    InitialDataResponse {
        widget_id: WidgetId,
        data: InitialData,
        timestamp: f64,
    },

    /// Popout → opener: the popout is going away (closed or swapped back).
    #[serde(rename = "POPOUT_CLOSING")]
    PopoutClosing { widget_id: WidgetId, timestamp: f64 },
}

impl WindowMessage {
    /// The wire `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StateSync { .. } => "REDUX_STATE_SYNC",
            Self::InitialDataRequest { .. } => "POPOUT_INITIAL_DATA_REQUEST",
            Self::InitialDataResponse { .. } => "POPOUT_INITIAL_DATA_RESPONSE",
            Self::PopoutClosing { .. } => "POPOUT_CLOSING",
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Host time (seconds) to the wire timestamp (milliseconds).
pub fn wire_timestamp(now: f64) -> f64 {
    (now * 1000.0).round()
}

/// A received message with what the transport knows about its sender.
#[derive(Clone, Debug)]
pub struct Envelope {
    /// Origin of the sending window, as reported by the transport (never by the payload).
    pub origin: String,
    pub message: WindowMessage,
    /// Handle for replying to the sender only.
    pub source: Option<Rc<dyn PeerWindow>>,
}

impl Envelope {
    pub fn new(origin: impl Into<String>, message: WindowMessage) -> Self {
        Self {
            origin: origin.into(),
            message,
            source: None,
        }
    }

    pub fn with_source(mut self, source: Rc<dyn PeerWindow>) -> Self {
        self.source = Some(source);
        self
    }
}
