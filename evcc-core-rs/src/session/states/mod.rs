//! Per-state transition logic
//!
//! - `setup`: SessionSetup through PaymentServiceSelection
//! - `contract`: Plug & Charge certificate installation and payment details
//! - `authorization`: Authorization and ChargeParameterDiscovery, with
//!   their ongoing repeats
//! - `charging`: PowerDelivery, the AC/DC loops, MeteringReceipt and
//!   SessionStop

pub mod setup;
pub mod contract;
pub mod authorization;
pub mod charging;

#[cfg(test)]
pub(crate) mod testing;
