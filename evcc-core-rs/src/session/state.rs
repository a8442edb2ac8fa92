//! EVCC protocol states
//!
//! Each state waits for exactly one response. [`State::process`] consumes it
//! and yields the next request with its successor, or ends the session.

use std::time::Duration;

use tracing::debug;

use super::states;
use super::SessionContext;
use crate::error::{SessionError, StopReason};
use crate::ev::EvController;
use crate::messages::{Body, MessageKind, SessionSetupReq, V2gMessage};
use crate::security::{CryptoProvider, Signature};

/// Collaborators a state may call into
pub struct Collaborators<'a> {
    pub ev: &'a mut dyn EvController,
    pub crypto: &'a dyn CryptoProvider,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    SessionSetup,
    ServiceDiscovery,
    ServiceDetail,
    PaymentServiceSelection,
    CertificateInstallation,
    PaymentDetails,
    Authorization,
    ChargeParameterDiscovery,
    PowerDelivery,
    ChargingStatus,
    CurrentDemand,
    MeteringReceipt,
    SessionStop,
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Next request to send, the state that will handle its answer, and how
/// long to wait for it
#[derive(Debug, Clone)]
pub struct Step {
    pub state: State,
    pub message: V2gMessage,
    pub timeout: Duration,
    /// Reissue of the same logical request after an `Ongoing` answer
    pub repeat: bool,
}

#[derive(Debug)]
pub enum Outcome {
    Continue(Step),
    Terminated(StopReason),
    Failed(SessionError),
}

impl Step {
    /// Request under the current session id with its configured timeout
    pub fn new(ctx: &SessionContext, state: State, body: impl Into<Body>) -> Self {
        let message = V2gMessage::new(ctx.session_id(), body);
        let timeout = ctx.timeouts.for_request(message.kind());
        Self {
            state,
            message,
            timeout,
            repeat: false,
        }
    }

    /// First request of every session
    pub fn session_setup(ctx: &SessionContext) -> Self {
        Self::new(
            ctx,
            State::SessionSetup,
            SessionSetupReq {
                evcc_id: ctx.evcc_id.clone(),
            },
        )
    }

    pub fn signed(mut self, signature: Signature) -> Self {
        self.message = self.message.with_signature(signature);
        self
    }

    /// Mark as a repeat bounded by `timeout`
    pub fn repeat(mut self, timeout: Duration) -> Self {
        self.repeat = true;
        self.timeout = timeout;
        self
    }

    pub fn into_outcome(self) -> Outcome {
        Outcome::Continue(self)
    }
}

impl State {
    /// Response kind this state waits for
    pub fn expects(&self) -> MessageKind {
        match self {
            State::SessionSetup => MessageKind::SessionSetupRes,
            State::ServiceDiscovery => MessageKind::ServiceDiscoveryRes,
            State::ServiceDetail => MessageKind::ServiceDetailRes,
            State::PaymentServiceSelection => MessageKind::PaymentServiceSelectionRes,
            State::CertificateInstallation => MessageKind::CertificateInstallationRes,
            State::PaymentDetails => MessageKind::PaymentDetailsRes,
            State::Authorization => MessageKind::AuthorizationRes,
            State::ChargeParameterDiscovery => MessageKind::ChargeParameterDiscoveryRes,
            State::PowerDelivery => MessageKind::PowerDeliveryRes,
            State::ChargingStatus => MessageKind::ChargingStatusRes,
            State::CurrentDemand => MessageKind::CurrentDemandRes,
            State::MeteringReceipt => MessageKind::MeteringReceiptRes,
            State::SessionStop => MessageKind::SessionStopRes,
        }
    }

    /// Handle one inbound message
    pub fn process(self, ctx: &mut SessionContext, co: &mut Collaborators<'_>, msg: V2gMessage) -> Outcome {
        debug!("{} processing {}", self, msg.kind());

        let result = match self {
            State::SessionSetup => states::setup::session_setup(ctx, msg),
            State::ServiceDiscovery => states::setup::service_discovery(ctx, co, msg),
            State::ServiceDetail => states::setup::service_detail(ctx, msg),
            State::PaymentServiceSelection => states::setup::payment_service_selection(ctx, co, msg),
            State::CertificateInstallation => states::contract::certificate_installation(ctx, co, msg),
            State::PaymentDetails => states::contract::payment_details(ctx, co, msg),
            State::Authorization => states::authorization::authorization(ctx, co, msg),
            State::ChargeParameterDiscovery => states::authorization::charge_parameter_discovery(ctx, co, msg),
            State::PowerDelivery => states::charging::power_delivery(ctx, co, msg),
            State::ChargingStatus => states::charging::charging_status(ctx, co, msg),
            State::CurrentDemand => states::charging::current_demand(ctx, co, msg),
            State::MeteringReceipt => states::charging::metering_receipt(ctx, co, msg),
            State::SessionStop => states::charging::session_stop(ctx, msg),
        };

        result.unwrap_or_else(Outcome::Failed)
    }
}
