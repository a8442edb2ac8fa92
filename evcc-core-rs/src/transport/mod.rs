//! Message transports between EVCC and SECC
//!
//! The session only needs a half-duplex message pipe. [`ChannelTransport`]
//! is an in-memory pair for tests and simulation; [`TcpTransport`] frames
//! envelopes with a V2GTP header over TCP.

pub mod channel;
pub mod tcp;

use async_trait::async_trait;
use thiserror::Error;

use crate::messages::{EnvelopeError, V2gMessage};

pub use channel::ChannelTransport;
pub use tcp::{TcpTransport, DEFAULT_PORT};

/// Transport errors
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection closed")]
    Closed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid message: {0}")]
    Envelope(#[from] EnvelopeError),

    #[error("invalid V2GTP header: {0}")]
    InvalidHeader(String),

    #[error("message too large: {0} bytes")]
    TooLarge(usize),
}

/// A connected message pipe to one SECC
#[async_trait]
pub trait Transport: Send {
    async fn send(&mut self, msg: &V2gMessage) -> Result<(), TransportError>;

    /// Wait for the next message
    async fn receive(&mut self) -> Result<V2gMessage, TransportError>;

    /// Identity of the peer, used in stop reasons
    fn peer(&self) -> String;

    fn is_tls(&self) -> bool;
}
