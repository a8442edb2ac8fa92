//! Async run loop of one EVCC session

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::state::{Collaborators, Outcome, Step};
use super::SessionContext;
use crate::config::{ConfigError, EvccConfig};
use crate::error::{SessionError, StopReason};
use crate::ev::EvController;
use crate::messages::{MessageKind, V2gMessage};
use crate::security::CryptoProvider;
use crate::transport::Transport;

/// Drives one session over a connected transport
///
/// The exchange is half-duplex: one request is outstanding at a time and the
/// driver waits for its answer up to the step's timeout before handing it to
/// the current state.
pub struct SessionDriver<T, E> {
    transport: T,
    ev: E,
    crypto: Arc<dyn CryptoProvider>,
    config: EvccConfig,
    evcc_id: Vec<u8>,
    shutdown: Option<watch::Receiver<bool>>,
    context: Option<SessionContext>,
}

impl<T: Transport, E: EvController> SessionDriver<T, E> {
    pub fn new(config: EvccConfig, transport: T, ev: E, crypto: Arc<dyn CryptoProvider>) -> Result<Self, ConfigError> {
        let evcc_id = config.evcc_id_bytes()?;
        Ok(Self {
            transport,
            ev,
            crypto,
            config,
            evcc_id,
            shutdown: None,
            context: None,
        })
    }

    /// Stop waiting and end the session once `shutdown` turns true
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn ev(&self) -> &E {
        &self.ev
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Context of the last run
    pub fn context(&self) -> Option<&SessionContext> {
        self.context.as_ref()
    }

    /// Run the session to its end
    ///
    /// Every failure is also recorded as the context's `stop_reason`.
    pub async fn run(&mut self) -> Result<StopReason, SessionError> {
        let mut ctx = SessionContext::new(self.evcc_id.clone(), self.transport.is_tls(), self.config.timeouts)
            .with_peer(self.transport.peer())
            .with_resume(self.config.resume);

        info!(
            "Starting session with {} (tls: {}, resume: {})",
            self.transport.peer(),
            ctx.is_tls,
            ctx.resume.is_some()
        );

        let result = self.drive(&mut ctx).await;
        match &result {
            Ok(reason) => info!("Session ended: {}", reason),
            Err(e) => {
                error!("Session failed: {}", e);
                ctx.stop_reason = Some(StopReason::failure(e, ctx.peer.clone()));
            }
        }

        self.context = Some(ctx);
        result
    }

    async fn drive(&mut self, ctx: &mut SessionContext) -> Result<StopReason, SessionError> {
        let mut step = Step::session_setup(ctx);

        loop {
            self.transport.send(&step.message).await?;
            ctx.request_sent(step.repeat);
            debug!(
                "Sent {}{}, waiting up to {:?}",
                step.message.kind(),
                if step.repeat { " (repeat)" } else { "" },
                step.timeout
            );

            let msg = self.receive(step.state.expects(), step.timeout).await?;

            let mut co = Collaborators {
                ev: &mut self.ev,
                crypto: self.crypto.as_ref(),
            };
            match step.state.process(ctx, &mut co, msg) {
                Outcome::Continue(next) => {
                    if next.state != step.state {
                        info!("{} -> {}", step.state, next.state);
                    }
                    step = next;
                }
                Outcome::Terminated(reason) => return Ok(reason),
                Outcome::Failed(e) => return Err(e),
            }
        }
    }

    async fn receive(&mut self, kind: MessageKind, timeout: Duration) -> Result<V2gMessage, SessionError> {
        let shutdown = self.shutdown.clone();
        let cancelled = async move {
            match shutdown {
                Some(mut rx) => {
                    // A dropped sender never cancels
                    let closed = rx.wait_for(|stop| *stop).await.is_err();
                    if closed {
                        std::future::pending::<()>().await;
                    }
                }
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            received = tokio::time::timeout(timeout, self.transport.receive()) => match received {
                Ok(msg) => Ok(msg?),
                Err(_) => {
                    warn!("No {} within {:?}", kind, timeout);
                    Err(SessionError::ResponseTimeout { kind, timeout })
                }
            },
            _ = cancelled => {
                warn!("Session cancelled while waiting for {}", kind);
                Err(SessionError::Cancelled)
            }
        }
    }
}
