//! Session errors and stop reasons

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ev::EvControllerError;
use crate::messages::{MessageKind, ResponseCode};
use crate::security::PkiError;
use crate::session::ResumeState;
use crate::transport::TransportError;

/// Fatal session errors
///
/// None of these are recovered; each one ends the session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("expected {expected}, received {received}")]
    UnexpectedMessage {
        expected: MessageKind,
        received: MessageKind,
    },

    #[error("session id mismatch: expected {expected}, received {received}")]
    SessionIdMismatch { expected: String, received: String },

    #[error("{kind} rejected with {code:?}")]
    Rejected { kind: MessageKind, code: ResponseCode },

    #[error("{field} is already assigned")]
    AlreadyAssigned { field: &'static str },

    #[error("incompatible station: {0}")]
    Incompatible(String),

    #[error("{context}: {source}")]
    Crypto {
        context: String,
        #[source]
        source: PkiError,
    },

    #[error("{kind} still ongoing after {elapsed:?}")]
    OngoingTimeout { kind: MessageKind, elapsed: Duration },

    #[error("no {kind} within {timeout:?}")]
    ResponseTimeout { kind: MessageKind, timeout: Duration },

    #[error("missing resource {}", path.display())]
    MissingResource { path: PathBuf },

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("EV controller error: {0}")]
    EvController(#[from] EvControllerError),

    #[error("session cancelled")]
    Cancelled,
}

/// Coarse failure category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureClass {
    ProtocolMismatch,
    Incompatible,
    Crypto,
    OngoingTimeout,
    ResponseTimeout,
    MissingResource,
    Transport,
    Collaborator,
    Cancelled,
}

impl SessionError {
    /// Wrap a crypto failure, surfacing missing files as `MissingResource`
    pub fn crypto(context: impl Into<String>, source: PkiError) -> Self {
        match source {
            PkiError::NotFound { path } => SessionError::MissingResource { path },
            source => SessionError::Crypto {
                context: context.into(),
                source,
            },
        }
    }

    pub fn class(&self) -> FailureClass {
        match self {
            SessionError::UnexpectedMessage { .. }
            | SessionError::SessionIdMismatch { .. }
            | SessionError::Rejected { .. }
            | SessionError::AlreadyAssigned { .. } => FailureClass::ProtocolMismatch,
            SessionError::Incompatible(_) => FailureClass::Incompatible,
            SessionError::Crypto { .. } => FailureClass::Crypto,
            SessionError::OngoingTimeout { .. } => FailureClass::OngoingTimeout,
            SessionError::ResponseTimeout { .. } => FailureClass::ResponseTimeout,
            SessionError::MissingResource { .. } => FailureClass::MissingResource,
            SessionError::Transport(_) => FailureClass::Transport,
            SessionError::EvController(_) => FailureClass::Collaborator,
            SessionError::Cancelled => FailureClass::Cancelled,
        }
    }
}

/// Why a session ended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopReason {
    pub successful: bool,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<FailureClass>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer: Option<String>,
    /// Present when the session was paused and may be resumed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume: Option<ResumeState>,
}

impl StopReason {
    pub fn success(reason: impl Into<String>, peer: Option<String>) -> Self {
        Self {
            successful: true,
            reason: reason.into(),
            class: None,
            peer,
            resume: None,
        }
    }

    pub fn failure(error: &SessionError, peer: Option<String>) -> Self {
        Self {
            successful: false,
            reason: error.to_string(),
            class: Some(error.class()),
            peer,
            resume: None,
        }
    }

    pub fn with_resume(mut self, resume: ResumeState) -> Self {
        self.resume = Some(resume);
        self
    }
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let outcome = if self.successful { "ok" } else { "failed" };
        write!(f, "{} ({})", self.reason, outcome)?;
        if let Some(peer) = &self.peer {
            write!(f, " with {}", peer)?;
        }
        Ok(())
    }
}
