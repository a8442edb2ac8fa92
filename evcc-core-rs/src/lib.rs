//! EVCC Core Library
//!
//! Vehicle-side ISO 15118-2 session state machine for EK3 charging modules.
//! Drives the request/response exchange from SessionSetup to SessionStop,
//! with Plug & Charge contract handling over an abstract transport.

pub mod config;
pub mod error;
pub mod ev;
pub mod messages;
pub mod security;
pub mod session;
pub mod transport;

pub use config::{EvccConfig, SimulatorConfig, Timeouts};
pub use error::{FailureClass, SessionError, StopReason};
pub use ev::{EvController, SimEvController};
pub use security::{CryptoProvider, FilePki};
pub use session::{ResumeState, SessionContext, SessionDriver, State};
pub use transport::{ChannelTransport, TcpTransport, Transport};
