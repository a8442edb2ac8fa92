//! EV-side collaborator
//!
//! The session asks the EV for its energy needs, lets it choose among the
//! offered schedules and hands it installed contract credentials. A simulator
//! ([`SimEvController`]) stands in for real vehicle hardware.

pub mod sim;

use thiserror::Error;

use crate::messages::{
    AcEvChargeParameter, CertificateChain, ChargeProgress, ChargingProfile, CurrentDemandReq,
    DcEvChargeParameter, EnergyTransferMode, SaScheduleTuple,
};
use crate::security::PrivateKey;

pub use sim::SimEvController;

#[derive(Debug, Error)]
pub enum EvControllerError {
    #[error("no acceptable schedule offered")]
    NoSchedule,

    #[error("can't store contract credentials: {0}")]
    Storage(String),

    #[error("{0} is not supported by this EV")]
    Unsupported(String),
}

/// Charge parameters for a ChargeParameterDiscoveryReq
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeParams {
    pub energy_mode: EnergyTransferMode,
    pub ac_parameters: Option<AcEvChargeParameter>,
    pub dc_parameters: Option<DcEvChargeParameter>,
}

/// The EV's answer to the offered schedules
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleSelection {
    pub charge_progress: ChargeProgress,
    pub schedule_id: u8,
    pub charging_profile: Option<ChargingProfile>,
}

pub trait EvController: Send {
    fn energy_transfer_mode(&self) -> EnergyTransferMode;

    /// Whether a contract certificate has to be installed before PnC
    fn is_cert_install_needed(&self) -> bool;

    fn charge_params(&self) -> ChargeParams;

    fn process_schedules(&mut self, schedules: &[SaScheduleTuple]) -> Result<ScheduleSelection, EvControllerError>;

    /// Called once per ChargingStatus/CurrentDemand loop
    fn continue_charging(&mut self) -> bool;

    /// Pause instead of terminate once the EV stops charging on its own
    fn wants_pause(&self) -> bool {
        false
    }

    /// Keep the installed contract chain (leaf first) and its private key
    fn store_contract_cert_and_key(&mut self, chain: &CertificateChain, key: &PrivateKey) -> Result<(), EvControllerError>;

    /// Present DC demand
    fn current_demand_params(&mut self) -> Result<CurrentDemandReq, EvControllerError>;
}
