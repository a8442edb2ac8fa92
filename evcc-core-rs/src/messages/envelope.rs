//! V2G message envelope
//!
//! A message is a header (session id, optional detached signature) plus one
//! [`Body`]. Envelopes serialize to JSON; the transport decides how the
//! bytes are framed.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::body::{Body, MessageKind};
use super::types::SessionId;
use crate::security::Signature;

/// Errors decoding or encoding an envelope
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("empty message")]
    Empty,
}

/// Message header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Header {
    #[serde(rename = "SessionID")]
    pub session_id: SessionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<Signature>,
}

/// A complete V2G message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct V2gMessage {
    pub header: Header,
    pub body: Body,
}

impl V2gMessage {
    /// Create an unsigned message
    pub fn new(session_id: SessionId, body: impl Into<Body>) -> Self {
        Self {
            header: Header {
                session_id,
                signature: None,
            },
            body: body.into(),
        }
    }

    /// Attach a detached signature to the header
    pub fn with_signature(mut self, signature: Signature) -> Self {
        self.header.signature = Some(signature);
        self
    }

    pub fn kind(&self) -> MessageKind {
        self.body.kind()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, EnvelopeError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        if bytes.is_empty() {
            return Err(EnvelopeError::Empty);
        }
        Ok(serde_json::from_slice(bytes)?)
    }
}
