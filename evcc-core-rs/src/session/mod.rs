//! EVCC session: context, protocol states and the async driver
//!
//! - `context`: the mutable session record
//! - `validate`: common checks on every inbound response
//! - `ongoing`: the budget for repeated `Ongoing` answers
//! - `state`: the closed set of states and their outcomes
//! - `states`: per-state transition logic
//! - `driver`: runs states against a [`Transport`](crate::transport::Transport)

pub mod context;
pub mod validate;
pub mod ongoing;
pub mod state;
pub mod states;
pub mod driver;

pub use context::{ResumeState, SessionContext};
pub use validate::validate;
pub use state::{Collaborators, Outcome, State, Step};
pub use driver::SessionDriver;
