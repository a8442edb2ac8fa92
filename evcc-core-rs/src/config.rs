//! Configuration for the EVCC
//!
//! Combines the session identity, per-request timeouts, PKI location and the
//! settings of the built-in EV simulator.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::messages::{EnergyTransferMode, MessageKind};
use crate::session::ResumeState;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("can't read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid EVCC id {0:?}: expected hex bytes")]
    InvalidEvccId(String),
}

/// Complete EVCC configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvccConfig {
    /// EVCC id as hex, usually the MAC address of the PLC modem
    pub evcc_id: String,

    pub timeouts: Timeouts,

    /// Root of the certificate/key layout read by `FilePki`
    pub pki_dir: PathBuf,

    /// Resume state of a previously paused session
    pub resume: Option<ResumeState>,

    pub simulator: SimulatorConfig,
}

/// Response timeouts, serialized in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Wait for SessionSetupRes
    #[serde(with = "millis")]
    pub communication_setup: Duration,
    #[serde(with = "millis")]
    pub service_discovery: Duration,
    #[serde(with = "millis")]
    pub service_detail: Duration,
    #[serde(with = "millis")]
    pub payment_service_selection: Duration,
    #[serde(with = "millis")]
    pub certificate_installation: Duration,
    #[serde(with = "millis")]
    pub payment_details: Duration,
    #[serde(with = "millis")]
    pub authorization: Duration,
    #[serde(with = "millis")]
    pub charge_parameter_discovery: Duration,
    #[serde(with = "millis")]
    pub power_delivery: Duration,
    #[serde(with = "millis")]
    pub charging_status: Duration,
    #[serde(with = "millis")]
    pub current_demand: Duration,
    #[serde(with = "millis")]
    pub metering_receipt: Duration,
    #[serde(with = "millis")]
    pub session_stop: Duration,
    /// Cumulative bound on EVSEProcessing=Ongoing repeats
    #[serde(with = "millis")]
    pub ongoing: Duration,
}

/// Settings of the simulated EV
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub energy_mode: EnergyTransferMode,

    /// Request a contract certificate installation when Plug & Charge is used
    pub cert_install_needed: bool,

    /// Number of ChargingStatus/CurrentDemand loops before stopping
    pub charge_loops: u32,

    /// End the session with Pause instead of Terminate
    pub pause_when_done: bool,

    /// Battery state of charge reported in DC, percent
    pub soc: i8,

    pub max_voltage: i16,
    pub max_current: i16,
    pub min_current: i16,
    /// Requested energy, Wh
    pub energy_request: i16,
}

impl Default for EvccConfig {
    fn default() -> Self {
        Self {
            evcc_id: "0A1B2C3D4E5F".to_string(),
            timeouts: Timeouts::default(),
            pki_dir: PathBuf::from("pki"),
            resume: None,
            simulator: SimulatorConfig::default(),
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            communication_setup: Duration::from_secs(20),
            service_discovery: Duration::from_secs(2),
            service_detail: Duration::from_secs(5),
            payment_service_selection: Duration::from_secs(2),
            certificate_installation: Duration::from_secs(5),
            payment_details: Duration::from_secs(5),
            authorization: Duration::from_secs(2),
            charge_parameter_discovery: Duration::from_secs(2),
            power_delivery: Duration::from_secs(5),
            charging_status: Duration::from_secs(2),
            current_demand: Duration::from_millis(250),
            metering_receipt: Duration::from_secs(2),
            session_stop: Duration::from_secs(2),
            ongoing: Duration::from_secs(60),
        }
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            energy_mode: EnergyTransferMode::AcThreePhaseCore,
            cert_install_needed: false,
            charge_loops: 10,
            pause_when_done: false,
            soc: 40,
            max_voltage: 400,
            max_current: 32,
            min_current: 6,
            energy_request: 20_000,
        }
    }
}

impl Timeouts {
    /// Deadline for the response to request `kind`
    pub fn for_request(&self, kind: MessageKind) -> Duration {
        match kind {
            MessageKind::SessionSetupReq => self.communication_setup,
            MessageKind::ServiceDiscoveryReq => self.service_discovery,
            MessageKind::ServiceDetailReq => self.service_detail,
            MessageKind::PaymentServiceSelectionReq => self.payment_service_selection,
            MessageKind::CertificateInstallationReq => self.certificate_installation,
            MessageKind::PaymentDetailsReq => self.payment_details,
            MessageKind::AuthorizationReq => self.authorization,
            MessageKind::ChargeParameterDiscoveryReq => self.charge_parameter_discovery,
            MessageKind::PowerDeliveryReq => self.power_delivery,
            MessageKind::ChargingStatusReq => self.charging_status,
            MessageKind::CurrentDemandReq => self.current_demand,
            MessageKind::MeteringReceiptReq => self.metering_receipt,
            MessageKind::SessionStopReq => self.session_stop,
            // Responses are never sent by the EVCC
            _ => self.communication_setup,
        }
    }
}

impl EvccConfig {
    /// Load a JSON config file; missing fields keep their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text)?;
        config.evcc_id_bytes()?;
        Ok(config)
    }

    /// Decoded EVCC id
    pub fn evcc_id_bytes(&self) -> Result<Vec<u8>, ConfigError> {
        if self.evcc_id.is_empty() {
            return Err(ConfigError::InvalidEvccId(self.evcc_id.clone()));
        }
        hex::decode(&self.evcc_id).map_err(|_| ConfigError::InvalidEvccId(self.evcc_id.clone()))
    }

    /// Set EVCC id
    pub fn with_evcc_id(mut self, evcc_id: impl Into<String>) -> Self {
        self.evcc_id = evcc_id.into();
        self
    }

    /// Set PKI directory
    pub fn with_pki_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.pki_dir = dir.into();
        self
    }

    /// Set timeouts
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Resume a paused session
    pub fn with_resume(mut self, resume: ResumeState) -> Self {
        self.resume = Some(resume);
        self
    }

    /// Set simulated energy mode
    pub fn with_energy_mode(mut self, mode: EnergyTransferMode) -> Self {
        self.simulator.energy_mode = mode;
        self
    }

    /// Set number of simulated charging loops
    pub fn with_charge_loops(mut self, loops: u32) -> Self {
        self.simulator.charge_loops = loops;
        self
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
