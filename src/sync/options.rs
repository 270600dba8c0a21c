use serde::{Deserialize, Serialize};

/// Deny rule for action types.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionFilter {
    /// The whole type, e.g. `fileManager/markStateSaved`.
    Exact(String),
    /// Type suffix, e.g. `/pending` for the in-flight phase of async operations.
    Suffix(String),
    /// Every action of a slice (window-local UI state).
    Slice(String),
}

impl ActionFilter {
    pub fn matches(&self, kind: &str) -> bool {
        match self {
            Self::Exact(exact) => kind == exact,
            Self::Suffix(suffix) => kind.ends_with(suffix.as_str()),
            Self::Slice(slice) => kind
                .split_once('/')
                .is_some_and(|(prefix, _)| prefix == slice),
        }
    }
}

/// A field that stays local to each window even though its slice is synchronized.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldPath {
    pub slice: String,
    pub field: String,
}

impl FieldPath {
    pub fn new(slice: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            slice: slice.into(),
            field: field.into(),
        }
    }
}

/// Options for [`super::SyncManager`] and the popout handshake.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncOptions {
    /// Slices mirrored between windows. Everything else stays local.
    pub allowed_slices: Vec<String>,

    /// Actions that are never mirrored even when their slice is allowed.
    pub denied_actions: Vec<ActionFilter>,

    /// Removed from outgoing snapshots (e.g. the active loading operations of this window).
    pub stripped_fields: Vec<FieldPath>,

    /// Minimum time between two outgoing sync messages, in seconds. Extra sends are dropped.
    pub throttle_interval: f64,

    /// How long a popout waits for its initial state, in seconds.
    pub handshake_timeout: f64,

    /// Prefix of the per-widget local storage keys.
    pub storage_prefix: String,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            allowed_slices: ["fileManager", "plots", "dda", "loading"]
                .map(str::to_owned)
                .to_vec(),
            denied_actions: vec![
                ActionFilter::Suffix("/pending".to_owned()),
                ActionFilter::Exact("fileManager/setPersistenceStatus".to_owned()),
                ActionFilter::Exact("fileManager/markStateSaved".to_owned()),
                ActionFilter::Slice("ui".to_owned()),
            ],
            stripped_fields: vec![FieldPath::new("loading", "operations")],
            throttle_interval: 0.016,
            handshake_timeout: 5.0,
            storage_prefix: "dashboard-widget-".to_owned(),
        }
    }
}

impl SyncOptions {
    pub fn is_slice_allowed(&self, slice: &str) -> bool {
        self.allowed_slices.iter().any(|s| s == slice)
    }

    pub fn is_action_denied(&self, kind: &str) -> bool {
        self.denied_actions.iter().any(|filter| filter.matches(kind))
    }
}
