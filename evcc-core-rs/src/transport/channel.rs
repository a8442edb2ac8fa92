//! In-memory transport over tokio channels

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::trace;

use super::{Transport, TransportError};
use crate::messages::V2gMessage;

const CHANNEL_CAPACITY: usize = 16;

/// One end of an in-memory message pipe
pub struct ChannelTransport {
    tx: mpsc::Sender<V2gMessage>,
    rx: mpsc::Receiver<V2gMessage>,
    peer: String,
    tls: bool,
}

impl ChannelTransport {
    /// Create a connected pair: `(evcc_end, secc_end)`
    pub fn pair(tls: bool) -> (Self, Self) {
        let (evcc_tx, secc_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (secc_tx, evcc_rx) = mpsc::channel(CHANNEL_CAPACITY);

        let evcc = Self {
            tx: evcc_tx,
            rx: evcc_rx,
            peer: "secc".to_string(),
            tls,
        };
        let secc = Self {
            tx: secc_tx,
            rx: secc_rx,
            peer: "evcc".to_string(),
            tls,
        };
        (evcc, secc)
    }

    pub fn with_peer(mut self, peer: impl Into<String>) -> Self {
        self.peer = peer.into();
        self
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn send(&mut self, msg: &V2gMessage) -> Result<(), TransportError> {
        trace!("Channel send {}", msg.kind());
        self.tx
            .send(msg.clone())
            .await
            .map_err(|_| TransportError::Closed)
    }

    async fn receive(&mut self) -> Result<V2gMessage, TransportError> {
        self.rx.recv().await.ok_or(TransportError::Closed)
    }

    fn peer(&self) -> String {
        self.peer.clone()
    }

    fn is_tls(&self) -> bool {
        self.tls
    }
}
