//! Popout side of the initial state handshake.

use super::manager::SyncManager;
use super::message::{Envelope, InitialData, WindowMessage, WindowRole, wire_timestamp};
use super::registry::OpenerLink;
use super::state::StateStore;
use super::transport::TransportError;
use super::validate::ValidationError;
use crate::layout::WidgetId;

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum HandshakeError {
    #[error("this window has no opener")]
    NoOpener,

    #[error("no initial data after {0}s")]
    Timeout(f64),

    #[error("response is for widget {found}, expected {expected}")]
    WidgetMismatch { expected: WidgetId, found: WidgetId },

    #[error("response from {found:?}, expected {expected:?}")]
    OriginMismatch { expected: String, found: String },

    #[error("invalid initial slice {slice}: {source}")]
    InvalidSlice {
        slice: String,
        source: ValidationError,
    },

    #[error("failed to reach the opener: {0}")]
    Post(#[from] TransportError),

    #[error("no handshake in progress")]
    NotPending,

    #[error("unexpected {0} message")]
    Unexpected(&'static str),
}

#[derive(Clone, Debug, PartialEq)]
pub enum HandshakeStatus {
    Idle,
    /// Waiting for the response until `deadline` (host time, seconds).
    Pending { deadline: f64 },
    Succeeded,
    /// The popout runs with default state.
    Failed(HandshakeError),
}

/// One-shot request/response exchange a popout uses to get its initial state.
///
/// The timeout is a hard cancellation: a response arriving after it is ignored, and nothing
/// is retried.
#[derive(Clone, Debug)]
pub struct StoreInitializer {
    widget_id: WidgetId,
    timeout: f64,
    opener_origin: Option<String>,
    status: HandshakeStatus,
}

impl StoreInitializer {
    pub fn new(widget_id: WidgetId, timeout: f64) -> Self {
        Self {
            widget_id,
            timeout,
            opener_origin: None,
            status: HandshakeStatus::Idle,
        }
    }

    pub fn widget_id(&self) -> &WidgetId {
        &self.widget_id
    }

    pub fn status(&self) -> &HandshakeStatus {
        &self.status
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.status, HandshakeStatus::Pending { .. })
    }

    /// `None` while undecided.
    pub fn succeeded(&self) -> Option<bool> {
        match self.status {
            HandshakeStatus::Idle | HandshakeStatus::Pending { .. } => None,
            HandshakeStatus::Succeeded => Some(true),
            HandshakeStatus::Failed(_) => Some(false),
        }
    }

    /// Send the request. Without an opener this fails right away.
    pub fn begin(&mut self, opener: &OpenerLink, now: f64) -> &HandshakeStatus {
        if !opener.is_available() {
            return self.fail(HandshakeError::NoOpener);
        }
        let request = WindowMessage::InitialDataRequest {
            widget_id: self.widget_id.clone(),
            timestamp: wire_timestamp(now),
        };
        if let Err(err) = opener.post(&request) {
            return self.fail(err.into());
        }

        self.opener_origin = opener.origin();
        self.status = HandshakeStatus::Pending {
            deadline: now + self.timeout,
        };
        log::debug!("handshake: requested initial data for {}", self.widget_id);
        &self.status
    }

    pub fn poll(&mut self, now: f64) -> &HandshakeStatus {
        if let HandshakeStatus::Pending { deadline } = self.status
            && now >= deadline
        {
            return self.fail(HandshakeError::Timeout(self.timeout));
        }
        &self.status
    }

    /// Check the response completely, then apply every slice and adopt the parent origin.
    ///
    /// Nothing is applied unless the whole response is valid.
    pub fn handle_response(
        &mut self,
        envelope: &Envelope,
        manager: &mut SyncManager,
        state: &mut dyn StateStore,
    ) -> Result<(), HandshakeError> {
        if !self.is_pending() {
            return Err(HandshakeError::NotPending);
        }
        let WindowMessage::InitialDataResponse {
            widget_id, data, ..
        } = &envelope.message
        else {
            return Err(HandshakeError::Unexpected(envelope.message.kind()));
        };

        if let Err(err) = self.check_response(envelope, widget_id, data, manager) {
            self.fail(err.clone());
            return Err(err);
        }

        manager.set_expected_origin(data.parent_origin.clone());
        manager.apply_slices(&data.initial_state, WindowRole::Main, state);
        self.status = HandshakeStatus::Succeeded;
        log::debug!(
            "handshake: {} initialized with {} slice(s)",
            self.widget_id,
            data.initial_state.len()
        );
        Ok(())
    }

    fn check_response(
        &self,
        envelope: &Envelope,
        widget_id: &WidgetId,
        data: &InitialData,
        manager: &SyncManager,
    ) -> Result<(), HandshakeError> {
        for found in [widget_id, &data.widget_id] {
            if found != &self.widget_id {
                return Err(HandshakeError::WidgetMismatch {
                    expected: self.widget_id.clone(),
                    found: found.clone(),
                });
            }
        }

        // The transport-reported origin must be the opener's, and must match what the
        // response claims.
        let expected = self
            .opener_origin
            .as_deref()
            .unwrap_or(data.parent_origin.as_str());
        for found in [envelope.origin.as_str(), data.parent_origin.as_str()] {
            if found != expected {
                return Err(HandshakeError::OriginMismatch {
                    expected: expected.to_owned(),
                    found: found.to_owned(),
                });
            }
        }

        for (slice, value) in &data.initial_state {
            manager
                .validate_slice(slice, value)
                .map_err(|source| HandshakeError::InvalidSlice {
                    slice: slice.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    fn fail(&mut self, err: HandshakeError) -> &HandshakeStatus {
        log::warn!("handshake for {} failed: {err}", self.widget_id);
        self.status = HandshakeStatus::Failed(err);
        &self.status
    }
}
