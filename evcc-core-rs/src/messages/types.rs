//! ISO 15118-2 data types
//!
//! The subset of the ISO 15118-2 message schema that the EVCC states read or
//! write. Field names follow the schema, enum values serialize to the schema's
//! literal spellings.

use serde::{Deserialize, Serialize};

/// Service identifier as assigned by the SECC
pub type ServiceId = u16;

/// Well-known ServiceID of the mandatory charge service
pub const CHARGE_SERVICE_ID: ServiceId = 1;

/// Well-known ServiceID of the certificate installation/update service
pub const CERTIFICATE_SERVICE_ID: ServiceId = 2;

// ============================================================================
// Enumerations
// ============================================================================

/// ISO 15118-2 ResponseCode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseCode {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "OK_NewSessionEstablished")]
    OkNewSessionEstablished,
    #[serde(rename = "OK_OldSessionJoined")]
    OkOldSessionJoined,
    #[serde(rename = "OK_CertificateExpiresSoon")]
    OkCertificateExpiresSoon,
    #[serde(rename = "FAILED")]
    Failed,
    #[serde(rename = "FAILED_SequenceError")]
    FailedSequenceError,
    #[serde(rename = "FAILED_ServiceIDInvalid")]
    FailedServiceIdInvalid,
    #[serde(rename = "FAILED_UnknownSession")]
    FailedUnknownSession,
    #[serde(rename = "FAILED_ServiceSelectionInvalid")]
    FailedServiceSelectionInvalid,
    #[serde(rename = "FAILED_PaymentSelectionInvalid")]
    FailedPaymentSelectionInvalid,
    #[serde(rename = "FAILED_CertificateExpired")]
    FailedCertificateExpired,
    #[serde(rename = "FAILED_SignatureError")]
    FailedSignatureError,
    #[serde(rename = "FAILED_NoCertificateAvailable")]
    FailedNoCertificateAvailable,
    #[serde(rename = "FAILED_CertChainError")]
    FailedCertChainError,
    #[serde(rename = "FAILED_ChallengeInvalid")]
    FailedChallengeInvalid,
    #[serde(rename = "FAILED_ContractCanceled")]
    FailedContractCanceled,
    #[serde(rename = "FAILED_WrongChargeParameter")]
    FailedWrongChargeParameter,
    #[serde(rename = "FAILED_PowerDeliveryNotApplied")]
    FailedPowerDeliveryNotApplied,
    #[serde(rename = "FAILED_TariffSelectionInvalid")]
    FailedTariffSelectionInvalid,
    #[serde(rename = "FAILED_ChargingProfileInvalid")]
    FailedChargingProfileInvalid,
    #[serde(rename = "FAILED_MeteringSignatureNotValid")]
    FailedMeteringSignatureNotValid,
    #[serde(rename = "FAILED_NoChargeServiceSelected")]
    FailedNoChargeServiceSelected,
    #[serde(rename = "FAILED_WrongEnergyTransferMode")]
    FailedWrongEnergyTransferMode,
    #[serde(rename = "FAILED_ContactorError")]
    FailedContactorError,
    #[serde(rename = "FAILED_CertificateNotAllowedAtThisEVSE")]
    FailedCertificateNotAllowedAtThisEvse,
    #[serde(rename = "FAILED_CertificateRevoked")]
    FailedCertificateRevoked,
}

impl ResponseCode {
    /// Whether the SECC reported a failure
    pub fn is_failure(&self) -> bool {
        !matches!(
            self,
            ResponseCode::Ok
                | ResponseCode::OkNewSessionEstablished
                | ResponseCode::OkOldSessionJoined
                | ResponseCode::OkCertificateExpiresSoon
        )
    }
}

/// Authorization option (PaymentOption in ISO 15118-2)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthOption {
    /// Plug & Charge, contract certificate based
    #[serde(rename = "Contract")]
    PlugAndCharge,
    /// External identification means (RFID, app, ...)
    #[serde(rename = "ExternalPayment")]
    ExternalIdentification,
}

impl std::fmt::Display for AuthOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthOption::PlugAndCharge => write!(f, "Contract"),
            AuthOption::ExternalIdentification => write!(f, "ExternalPayment"),
        }
    }
}

impl std::str::FromStr for AuthOption {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Contract" | "pnc" => Ok(AuthOption::PlugAndCharge),
            "ExternalPayment" | "eim" => Ok(AuthOption::ExternalIdentification),
            _ => Err(format!("unknown authorization option: {}", s)),
        }
    }
}

/// Energy transfer mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnergyTransferMode {
    #[serde(rename = "AC_single_phase_core")]
    AcSinglePhaseCore,
    #[serde(rename = "AC_three_phase_core")]
    AcThreePhaseCore,
    #[serde(rename = "DC_core")]
    DcCore,
    #[serde(rename = "DC_extended")]
    DcExtended,
    #[serde(rename = "DC_combo_core")]
    DcComboCore,
    #[serde(rename = "DC_unique")]
    DcUnique,
}

impl EnergyTransferMode {
    pub const ALL: [EnergyTransferMode; 6] = [
        EnergyTransferMode::AcSinglePhaseCore,
        EnergyTransferMode::AcThreePhaseCore,
        EnergyTransferMode::DcCore,
        EnergyTransferMode::DcExtended,
        EnergyTransferMode::DcComboCore,
        EnergyTransferMode::DcUnique,
    ];

    /// Wire name as used in the schema
    pub fn as_str(&self) -> &'static str {
        match self {
            EnergyTransferMode::AcSinglePhaseCore => "AC_single_phase_core",
            EnergyTransferMode::AcThreePhaseCore => "AC_three_phase_core",
            EnergyTransferMode::DcCore => "DC_core",
            EnergyTransferMode::DcExtended => "DC_extended",
            EnergyTransferMode::DcComboCore => "DC_combo_core",
            EnergyTransferMode::DcUnique => "DC_unique",
        }
    }

    pub fn is_ac(&self) -> bool {
        self.as_str().starts_with("AC")
    }
}

impl std::fmt::Display for EnergyTransferMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for EnergyTransferMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown energy transfer mode: {}", s))
    }
}

/// SECC processing status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvseProcessing {
    Finished,
    Ongoing,
    #[serde(rename = "Ongoing_WaitingForCustomerInteraction")]
    OngoingWaitingForCustomerInteraction,
}

impl EvseProcessing {
    pub fn is_finished(&self) -> bool {
        matches!(self, EvseProcessing::Finished)
    }
}

/// Notification the SECC attaches to its status blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EvseNotification {
    #[default]
    None,
    StopCharging,
    ReNegotiation,
}

/// Charge progress directive of a PowerDeliveryReq
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChargeProgress {
    Start,
    Stop,
    Renegotiate,
}

/// How a session ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChargingSession {
    Terminate,
    Pause,
}

/// Service category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceCategory {
    #[serde(rename = "EVCharging")]
    EvCharging,
    Internet,
    ContractCertificate,
    OtherCustom,
}

/// SI unit symbol of a physical value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitSymbol {
    #[serde(rename = "h")]
    Hours,
    #[serde(rename = "m")]
    Minutes,
    #[serde(rename = "s")]
    Seconds,
    A,
    V,
    W,
    Wh,
}

/// DC EV error code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DcEvErrorCode {
    #[default]
    #[serde(rename = "NO_ERROR")]
    NoError,
    #[serde(rename = "FAILED_RESSTemperatureInhibit")]
    FailedRessTemperatureInhibit,
    #[serde(rename = "FAILED_EVShiftPosition")]
    FailedEvShiftPosition,
    #[serde(rename = "FAILED_ChargerConnectorLockFault")]
    FailedChargerConnectorLockFault,
    #[serde(rename = "FAILED_EVRESSMalfunction")]
    FailedEvRessMalfunction,
    #[serde(rename = "FAILED_ChargingCurrentdifferential")]
    FailedChargingCurrentDifferential,
    #[serde(rename = "FAILED_ChargingVoltageOutOfRange")]
    FailedChargingVoltageOutOfRange,
    #[serde(rename = "FAILED_ChargingSystemIncompatibility")]
    FailedChargingSystemIncompatibility,
    #[serde(rename = "NoData")]
    NoData,
}

/// DC EVSE status code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DcEvseStatusCode {
    #[serde(rename = "EVSE_NotReady")]
    NotReady,
    #[default]
    #[serde(rename = "EVSE_Ready")]
    Ready,
    #[serde(rename = "EVSE_Shutdown")]
    Shutdown,
    #[serde(rename = "EVSE_UtilityInterruptEvent")]
    UtilityInterruptEvent,
    #[serde(rename = "EVSE_IsolationMonitoringActive")]
    IsolationMonitoringActive,
    #[serde(rename = "EVSE_EmergencyShutdown")]
    EmergencyShutdown,
    #[serde(rename = "EVSE_Malfunction")]
    Malfunction,
}

/// Isolation level reported by a DC EVSE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IsolationLevel {
    Invalid,
    Valid,
    Warning,
    Fault,
    #[serde(rename = "No_IMD")]
    NoImd,
}

// ============================================================================
// Complex Types
// ============================================================================

/// Session identifier assigned by the SECC (8 bytes on the wire)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Vec<u8>);

impl SessionId {
    /// The all-zero id the EVCC uses before a session is assigned
    pub fn unassigned() -> Self {
        Self(vec![0; 8])
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&hex::encode_upper(&self.0))
    }
}

impl From<&[u8]> for SessionId {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

/// Physical value: `value * 10^multiplier` in `unit`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PhysicalValue {
    pub value: i16,
    pub multiplier: i8,
    pub unit: UnitSymbol,
}

impl PhysicalValue {
    pub fn new(value: i16, multiplier: i8, unit: UnitSymbol) -> Self {
        Self { value, multiplier, unit }
    }

    /// Scaled value as a float
    pub fn as_f64(&self) -> f64 {
        self.value as f64 * 10f64.powi(self.multiplier as i32)
    }
}

/// ChargeService entry of a ServiceDiscoveryRes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChargeService {
    #[serde(rename = "ServiceID")]
    pub service_id: ServiceId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    pub service_category: ServiceCategory,
    pub free_service: bool,
    pub supported_energy_transfer_mode: Vec<EnergyTransferMode>,
}

/// Value-added service offered in ServiceList
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Service {
    #[serde(rename = "ServiceID")]
    pub service_id: ServiceId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    pub service_category: ServiceCategory,
    pub free_service: bool,
}

/// Entry of the SelectedServiceList
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SelectedService {
    #[serde(rename = "ServiceID")]
    pub service_id: ServiceId,
    #[serde(rename = "ParameterSetID", skip_serializing_if = "Option::is_none")]
    pub parameter_set_id: Option<i16>,
}

impl SelectedService {
    pub fn new(service_id: ServiceId) -> Self {
        Self { service_id, parameter_set_id: None }
    }
}

/// Single service parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Parameter {
    pub name: String,
    pub value: String,
}

/// Parameter set of a ServiceDetailRes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ParameterSet {
    #[serde(rename = "ParameterSetID")]
    pub parameter_set_id: i16,
    pub parameters: Vec<Parameter>,
}

/// AC EV charge parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AcEvChargeParameter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub departure_time: Option<u32>,
    #[serde(rename = "EAmount")]
    pub e_amount: PhysicalValue,
    #[serde(rename = "EVMaxVoltage")]
    pub ev_max_voltage: PhysicalValue,
    #[serde(rename = "EVMaxCurrent")]
    pub ev_max_current: PhysicalValue,
    #[serde(rename = "EVMinCurrent")]
    pub ev_min_current: PhysicalValue,
}

/// DC EV status block
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DcEvStatus {
    #[serde(rename = "EVReady")]
    pub ev_ready: bool,
    #[serde(rename = "EVErrorCode")]
    pub ev_error_code: DcEvErrorCode,
    #[serde(rename = "EVRESSSOC")]
    pub ev_ress_soc: i8,
}

/// DC EV charge parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DcEvChargeParameter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub departure_time: Option<u32>,
    #[serde(rename = "DC_EVStatus")]
    pub dc_ev_status: DcEvStatus,
    #[serde(rename = "EVMaximumCurrentLimit")]
    pub ev_maximum_current_limit: PhysicalValue,
    #[serde(rename = "EVMaximumPowerLimit", skip_serializing_if = "Option::is_none")]
    pub ev_maximum_power_limit: Option<PhysicalValue>,
    #[serde(rename = "EVMaximumVoltageLimit")]
    pub ev_maximum_voltage_limit: PhysicalValue,
    #[serde(rename = "EVEnergyCapacity", skip_serializing_if = "Option::is_none")]
    pub ev_energy_capacity: Option<PhysicalValue>,
    #[serde(rename = "EVEnergyRequest", skip_serializing_if = "Option::is_none")]
    pub ev_energy_request: Option<PhysicalValue>,
    #[serde(rename = "FullSOC", skip_serializing_if = "Option::is_none")]
    pub full_soc: Option<i8>,
    #[serde(rename = "BulkSOC", skip_serializing_if = "Option::is_none")]
    pub bulk_soc: Option<i8>,
}

/// PMaxSchedule entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PMaxScheduleEntry {
    pub start: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(rename = "PMax")]
    pub p_max: PhysicalValue,
}

/// Schedule proposed by the SECC
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SaScheduleTuple {
    #[serde(rename = "SAScheduleTupleID")]
    pub sa_schedule_tuple_id: u8,
    #[serde(rename = "PMaxSchedule")]
    pub p_max_schedule: Vec<PMaxScheduleEntry>,
}

/// Profile entry of the EV's charging profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProfileEntry {
    #[serde(rename = "ChargingProfileEntryStart")]
    pub start: u32,
    #[serde(rename = "ChargingProfileEntryMaxPower")]
    pub max_power: PhysicalValue,
    #[serde(
        rename = "ChargingProfileEntryMaxNumberOfPhasesInUse",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_number_of_phases_in_use: Option<u8>,
}

/// Charging profile the EV commits to in PowerDeliveryReq
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChargingProfile {
    pub profile_entries: Vec<ProfileEntry>,
}

/// Meter information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MeterInfo {
    #[serde(rename = "MeterID")]
    pub meter_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meter_reading: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sig_meter_reading: Option<Vec<u8>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meter_status: Option<i16>,
    #[serde(rename = "TMeter", skip_serializing_if = "Option::is_none")]
    pub t_meter: Option<i64>,
}

/// AC EVSE status block
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AcEvseStatus {
    pub notification_max_delay: u16,
    #[serde(rename = "EVSENotification")]
    pub evse_notification: EvseNotification,
    #[serde(rename = "RCD")]
    pub rcd: bool,
}

/// DC EVSE status block
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DcEvseStatus {
    pub notification_max_delay: u16,
    #[serde(rename = "EVSENotification")]
    pub evse_notification: EvseNotification,
    #[serde(rename = "EVSEIsolationStatus", skip_serializing_if = "Option::is_none")]
    pub evse_isolation_status: Option<IsolationLevel>,
    #[serde(rename = "EVSEStatusCode")]
    pub evse_status_code: DcEvseStatusCode,
}

/// Certificate chain: leaf plus intermediate (sub-CA) certificates, DER
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CertificateChain {
    #[serde(rename = "Id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub certificate: Vec<u8>,
    #[serde(default)]
    pub sub_certificates: Vec<Vec<u8>>,
}

/// Contract private key, encrypted for the EV (IV || ciphertext)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EncryptedPrivateKey {
    #[serde(rename = "Id")]
    pub id: String,
    pub value: Vec<u8>,
}

/// Ephemeral ECDH public key of the SECC/CPS (uncompressed SEC1 point)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DhPublicKey {
    #[serde(rename = "Id")]
    pub id: String,
    pub value: Vec<u8>,
}

/// E-mobility account identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Emaid {
    #[serde(rename = "Id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub value: String,
}

/// Issuer name and serial of a trusted root (X509IssuerSerial)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RootCertificateId {
    #[serde(rename = "X509IssuerName")]
    pub issuer_name: String,
    #[serde(rename = "X509SerialNumber")]
    pub serial_number: Vec<u8>,
}
