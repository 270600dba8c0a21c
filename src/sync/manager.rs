use std::collections::BTreeMap;

use serde_json::Value;

use super::message::{Envelope, InitialData, WindowMessage, WindowRole, wire_timestamp};
use super::options::SyncOptions;
use super::registry::SyncPeers;
use super::state::{ActionDescriptor, StateStore};
use super::throttle::Throttle;
use super::transport::TransportError;
use super::validate::{SliceValidators, ValidationError};

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    #[error("message claims to come from this {0} window")]
    Echo(WindowRole),

    #[error("origin {found:?} does not match expected parent origin {expected:?}")]
    OriginMismatch {
        expected: Option<String>,
        found: String,
    },

    #[error("unexpected {0} message")]
    Unexpected(&'static str),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendOutcome {
    Sent { delivered: usize },
    /// Another message went out less than one throttle interval ago.
    Throttled,
    /// Local-only action, or one that came from the peer.
    NotEligible,
}

/// What happened to the slices of one incoming message.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub applied: Vec<String>,
    pub rejected: Vec<(String, ValidationError)>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub sent: u64,
    pub throttled: u64,
    pub rejected_messages: u64,
    pub applied_slices: u64,
    pub rejected_slices: u64,
}

/// Per-window sync policy: which actions leave this window, and which incoming slices are
/// allowed into its state store.
#[derive(Clone, Debug)]
pub struct SyncManager {
    role: WindowRole,
    options: SyncOptions,
    validators: SliceValidators,
    throttle: Throttle,
    /// Popout only: the opener's origin, captured at spawn or during the handshake.
    expected_origin: Option<String>,
    stats: SyncStats,
}

impl SyncManager {
    pub fn new(role: WindowRole, options: SyncOptions) -> Self {
        Self {
            role,
            throttle: Throttle::new(options.throttle_interval),
            options,
            validators: SliceValidators::default(),
            expected_origin: None,
            stats: SyncStats::default(),
        }
    }

    pub fn with_validators(mut self, validators: SliceValidators) -> Self {
        self.validators = validators;
        self
    }

    pub fn with_expected_origin(mut self, origin: impl Into<String>) -> Self {
        self.expected_origin = Some(origin.into());
        self
    }

    pub fn role(&self) -> WindowRole {
        self.role
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    pub fn expected_origin(&self) -> Option<&str> {
        self.expected_origin.as_deref()
    }

    pub fn set_expected_origin(&mut self, origin: impl Into<String>) {
        self.expected_origin = Some(origin.into());
    }

    pub fn stats(&self) -> SyncStats {
        self.stats
    }

    pub fn should_sync_action(&self, action: &ActionDescriptor) -> bool {
        if action.remote_source.is_some() || action.is_sync_from_remote() {
            return false;
        }
        let Some(slice) = action.slice() else {
            return false;
        };
        self.options.is_slice_allowed(slice) && !self.options.is_action_denied(&action.kind)
    }

    /// Mirror `action` (already applied locally) to the peers, with the current value of its
    /// slice.
    pub fn send_sync_message(
        &mut self,
        action: &ActionDescriptor,
        state: &dyn StateStore,
        now: f64,
        peers: &mut dyn SyncPeers,
    ) -> SendOutcome {
        if !self.should_sync_action(action) {
            return SendOutcome::NotEligible;
        }
        if !self.throttle.try_acquire(now) {
            log::trace!("sync: throttled {}", action.kind);
            self.stats.throttled += 1;
            return SendOutcome::Throttled;
        }

        let slice_updates = action.slice().and_then(|slice| {
            let value = state.slice(slice)?;
            Some(BTreeMap::from([(
                slice.to_owned(),
                self.strip_local_fields(slice, value),
            )]))
        });
        let message = WindowMessage::StateSync {
            action: action.clone(),
            timestamp: wire_timestamp(now),
            source_window: self.role,
            slice_updates,
        };

        let report = peers.broadcast(&message);
        self.stats.sent += 1;
        log::debug!(
            "sync: sent {} to {} peer(s), pruned {}",
            action.kind,
            report.delivered,
            report.pruned.len()
        );
        SendOutcome::Sent {
            delivered: report.delivered,
        }
    }

    /// Apply an incoming state sync. Other message kinds are rejected with
    /// [`SyncError::Unexpected`].
    pub fn handle_incoming(
        &mut self,
        envelope: &Envelope,
        state: &mut dyn StateStore,
    ) -> Result<ApplyReport, SyncError> {
        let WindowMessage::StateSync {
            action,
            source_window,
            slice_updates,
            ..
        } = &envelope.message
        else {
            return Err(SyncError::Unexpected(envelope.message.kind()));
        };

        if let Err(err) = self.check_sender(*source_window, &envelope.origin) {
            log::warn!("sync: rejected {}: {err}", action.kind);
            self.stats.rejected_messages += 1;
            return Err(err);
        }

        Ok(match slice_updates {
            Some(slices) => self.apply_slices(slices, *source_window, state),
            None => ApplyReport::default(),
        })
    }

    /// Echo check for every role, plus the parent-origin check on popouts.
    pub fn check_sender(&self, source_window: WindowRole, origin: &str) -> Result<(), SyncError> {
        if source_window == self.role {
            return Err(SyncError::Echo(self.role));
        }
        self.check_origin(origin)
    }

    /// Popouts only accept messages from their parent's origin. Without a known parent origin
    /// nothing is accepted.
    pub fn check_origin(&self, origin: &str) -> Result<(), SyncError> {
        if self.role == WindowRole::Main {
            return Ok(());
        }
        match &self.expected_origin {
            Some(expected) if expected == origin => Ok(()),
            expected => Err(SyncError::OriginMismatch {
                expected: expected.clone(),
                found: origin.to_owned(),
            }),
        }
    }

    pub fn validate_slice(&self, slice: &str, value: &Value) -> Result<(), ValidationError> {
        if !self.options.is_slice_allowed(slice) {
            return Err(ValidationError::NotAllowed(slice.to_owned()));
        }
        self.validators.validate(slice, value)
    }

    /// Dispatch `{slice}/syncFromRemote` for every slice that passes validation. Rejected
    /// slices leave the local state untouched.
    pub fn apply_slices(
        &mut self,
        slices: &BTreeMap<String, Value>,
        source: WindowRole,
        state: &mut dyn StateStore,
    ) -> ApplyReport {
        let mut report = ApplyReport::default();
        for (slice, value) in slices {
            if let Err(err) = self.validate_slice(slice, value) {
                log::warn!("sync: dropping slice {slice}: {err}");
                self.stats.rejected_slices += 1;
                report.rejected.push((slice.clone(), err));
                continue;
            }
            let value = self.keep_local_fields(slice, value.clone(), &*state);
            state.dispatch(ActionDescriptor::sync_from_remote(slice, value, source));
            self.stats.applied_slices += 1;
            report.applied.push(slice.clone());
        }
        report
    }

    /// Allow-listed slices of `state`, without window-local fields.
    pub fn snapshot_slices(&self, state: &dyn StateStore) -> BTreeMap<String, Value> {
        self.options
            .allowed_slices
            .iter()
            .filter_map(|slice| {
                let value = state.slice(slice)?;
                Some((slice.clone(), self.strip_local_fields(slice, value)))
            })
            .collect()
    }

    /// Carry this window's own values of stripped fields over into an incoming slice, which
    /// never contains them.
    fn keep_local_fields(&self, slice: &str, mut value: Value, state: &dyn StateStore) -> Value {
        let Some(Value::Object(local)) = state.slice(slice) else {
            return value;
        };
        if let Value::Object(fields) = &mut value {
            for path in self.options.stripped_fields.iter().filter(|p| p.slice == slice) {
                if let Some(local_value) = local.get(&path.field) {
                    fields.insert(path.field.clone(), local_value.clone());
                }
            }
        }
        value
    }

    fn strip_local_fields(&self, slice: &str, mut value: Value) -> Value {
        if let Value::Object(fields) = &mut value {
            for path in self.options.stripped_fields.iter().filter(|p| p.slice == slice) {
                fields.remove(&path.field);
            }
        }
        value
    }
}

/// Main-window side of the handshake: answers a popout's initial data request.
#[derive(Clone, Debug)]
pub struct InitialDataResponder {
    parent_origin: String,
}

impl InitialDataResponder {
    /// `parent_origin` is this (main) window's origin, which the popout adopts.
    pub fn new(parent_origin: impl Into<String>) -> Self {
        Self {
            parent_origin: parent_origin.into(),
        }
    }

    /// Reply to the requesting window only, with the allow-listed, stripped state.
    pub fn respond(
        &self,
        manager: &SyncManager,
        state: &dyn StateStore,
        request: &Envelope,
        now: f64,
    ) -> Result<(), SyncError> {
        let WindowMessage::InitialDataRequest { widget_id, .. } = &request.message else {
            return Err(SyncError::Unexpected(request.message.kind()));
        };
        let source = request.source.as_ref().ok_or(TransportError::NoPeer)?;

        let response = WindowMessage::InitialDataResponse {
            widget_id: widget_id.clone(),
            data: InitialData {
                initial_state: manager.snapshot_slices(state),
                widget_id: widget_id.clone(),
                parent_origin: self.parent_origin.clone(),
            },
            timestamp: wire_timestamp(now),
        };
        source.post(&response)?;
        log::debug!("handshake: answered initial data request from {widget_id}");
        Ok(())
    }
}
