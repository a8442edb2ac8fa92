//! ISO 15118-2 message bodies
//!
//! One struct per request/response the EVCC exchanges between
//! SessionSetup and SessionStop, plus the [`Body`] union carried by every
//! envelope.

use serde::{Deserialize, Serialize};

use super::types::*;

// ============================================================================
// Requests (EVCC -> SECC)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SessionSetupReq {
    #[serde(rename = "EVCCID")]
    pub evcc_id: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceDiscoveryReq {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_category: Option<ServiceCategory>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceDetailReq {
    #[serde(rename = "ServiceID")]
    pub service_id: ServiceId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PaymentServiceSelectionReq {
    #[serde(rename = "SelectedPaymentOption")]
    pub selected_auth_option: AuthOption,
    #[serde(rename = "SelectedServiceList")]
    pub selected_services: Vec<SelectedService>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CertificateInstallationReq {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "OEMProvisioningCert")]
    pub oem_provisioning_cert: Vec<u8>,
    #[serde(rename = "ListOfRootCertificateIDs")]
    pub list_of_root_cert_ids: Vec<RootCertificateId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PaymentDetailsReq {
    #[serde(rename = "eMAID")]
    pub emaid: String,
    #[serde(rename = "ContractSignatureCertChain")]
    pub cert_chain: CertificateChain,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AuthorizationReq {
    #[serde(rename = "Id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "GenChallenge", skip_serializing_if = "Option::is_none")]
    pub gen_challenge: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChargeParameterDiscoveryReq {
    #[serde(rename = "MaxEntriesSAScheduleTuple", skip_serializing_if = "Option::is_none")]
    pub max_entries_sa_schedule_tuple: Option<u16>,
    pub requested_energy_transfer_mode: EnergyTransferMode,
    #[serde(rename = "AC_EVChargeParameter", skip_serializing_if = "Option::is_none")]
    pub ac_ev_charge_parameter: Option<AcEvChargeParameter>,
    #[serde(rename = "DC_EVChargeParameter", skip_serializing_if = "Option::is_none")]
    pub dc_ev_charge_parameter: Option<DcEvChargeParameter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PowerDeliveryReq {
    pub charge_progress: ChargeProgress,
    #[serde(rename = "SAScheduleTupleID")]
    pub sa_schedule_tuple_id: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charging_profile: Option<ChargingProfile>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChargingStatusReq {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CurrentDemandReq {
    #[serde(rename = "DC_EVStatus")]
    pub dc_ev_status: DcEvStatus,
    #[serde(rename = "EVTargetCurrent")]
    pub ev_target_current: PhysicalValue,
    #[serde(rename = "EVMaximumVoltageLimit", skip_serializing_if = "Option::is_none")]
    pub ev_maximum_voltage_limit: Option<PhysicalValue>,
    #[serde(rename = "EVMaximumCurrentLimit", skip_serializing_if = "Option::is_none")]
    pub ev_maximum_current_limit: Option<PhysicalValue>,
    #[serde(rename = "EVMaximumPowerLimit", skip_serializing_if = "Option::is_none")]
    pub ev_maximum_power_limit: Option<PhysicalValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bulk_charging_complete: Option<bool>,
    pub charging_complete: bool,
    #[serde(rename = "RemainingTimeToFullSoC", skip_serializing_if = "Option::is_none")]
    pub remaining_time_to_full_soc: Option<PhysicalValue>,
    #[serde(rename = "RemainingTimeToBulkSoC", skip_serializing_if = "Option::is_none")]
    pub remaining_time_to_bulk_soc: Option<PhysicalValue>,
    #[serde(rename = "EVTargetVoltage")]
    pub ev_target_voltage: PhysicalValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MeteringReceiptReq {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "SessionID")]
    pub session_id: SessionId,
    #[serde(rename = "SAScheduleTupleID", skip_serializing_if = "Option::is_none")]
    pub sa_schedule_tuple_id: Option<u8>,
    pub meter_info: MeterInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SessionStopReq {
    pub charging_session: ChargingSession,
}

// ============================================================================
// Responses (SECC -> EVCC)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SessionSetupRes {
    pub response_code: ResponseCode,
    #[serde(rename = "EVSEID")]
    pub evse_id: String,
    #[serde(rename = "EVSETimeStamp", skip_serializing_if = "Option::is_none")]
    pub evse_timestamp: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceDiscoveryRes {
    pub response_code: ResponseCode,
    #[serde(rename = "PaymentOptionList", default)]
    pub auth_options: Vec<AuthOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charge_service: Option<ChargeService>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_list: Option<Vec<Service>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceDetailRes {
    pub response_code: ResponseCode,
    #[serde(rename = "ServiceID")]
    pub service_id: ServiceId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_parameter_list: Option<Vec<ParameterSet>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PaymentServiceSelectionRes {
    pub response_code: ResponseCode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CertificateInstallationRes {
    pub response_code: ResponseCode,
    #[serde(rename = "SAProvisioningCertificateChain")]
    pub sa_provisioning_cert_chain: CertificateChain,
    #[serde(rename = "ContractSignatureCertChain")]
    pub contract_cert_chain: CertificateChain,
    #[serde(rename = "ContractSignatureEncryptedPrivateKey")]
    pub encrypted_private_key: EncryptedPrivateKey,
    #[serde(rename = "DHpublickey")]
    pub dh_public_key: DhPublicKey,
    #[serde(rename = "eMAID")]
    pub emaid: Emaid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PaymentDetailsRes {
    pub response_code: ResponseCode,
    pub gen_challenge: Vec<u8>,
    #[serde(rename = "EVSETimeStamp")]
    pub evse_timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AuthorizationRes {
    pub response_code: ResponseCode,
    #[serde(rename = "EVSEProcessing")]
    pub evse_processing: EvseProcessing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChargeParameterDiscoveryRes {
    pub response_code: ResponseCode,
    #[serde(rename = "EVSEProcessing")]
    pub evse_processing: EvseProcessing,
    #[serde(rename = "SAScheduleList", default, skip_serializing_if = "Option::is_none")]
    pub sa_schedule_list: Option<Vec<SaScheduleTuple>>,
    #[serde(rename = "AC_EVSEStatus", default, skip_serializing_if = "Option::is_none")]
    pub ac_evse_status: Option<AcEvseStatus>,
    #[serde(rename = "DC_EVSEStatus", default, skip_serializing_if = "Option::is_none")]
    pub dc_evse_status: Option<DcEvseStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PowerDeliveryRes {
    pub response_code: ResponseCode,
    #[serde(rename = "AC_EVSEStatus", default, skip_serializing_if = "Option::is_none")]
    pub ac_evse_status: Option<AcEvseStatus>,
    #[serde(rename = "DC_EVSEStatus", default, skip_serializing_if = "Option::is_none")]
    pub dc_evse_status: Option<DcEvseStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChargingStatusRes {
    pub response_code: ResponseCode,
    #[serde(rename = "EVSEID")]
    pub evse_id: String,
    #[serde(rename = "SAScheduleTupleID")]
    pub sa_schedule_tuple_id: u8,
    #[serde(rename = "EVSEMaxCurrent", default, skip_serializing_if = "Option::is_none")]
    pub evse_max_current: Option<PhysicalValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meter_info: Option<MeterInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_required: Option<bool>,
    #[serde(rename = "AC_EVSEStatus")]
    pub ac_evse_status: AcEvseStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CurrentDemandRes {
    pub response_code: ResponseCode,
    #[serde(rename = "DC_EVSEStatus")]
    pub dc_evse_status: DcEvseStatus,
    #[serde(rename = "EVSEPresentVoltage")]
    pub evse_present_voltage: PhysicalValue,
    #[serde(rename = "EVSEPresentCurrent")]
    pub evse_present_current: PhysicalValue,
    #[serde(rename = "EVSECurrentLimitAchieved")]
    pub evse_current_limit_achieved: bool,
    #[serde(rename = "EVSEVoltageLimitAchieved")]
    pub evse_voltage_limit_achieved: bool,
    #[serde(rename = "EVSEPowerLimitAchieved")]
    pub evse_power_limit_achieved: bool,
    #[serde(rename = "EVSEMaximumVoltageLimit", default, skip_serializing_if = "Option::is_none")]
    pub evse_maximum_voltage_limit: Option<PhysicalValue>,
    #[serde(rename = "EVSEMaximumCurrentLimit", default, skip_serializing_if = "Option::is_none")]
    pub evse_maximum_current_limit: Option<PhysicalValue>,
    #[serde(rename = "EVSEMaximumPowerLimit", default, skip_serializing_if = "Option::is_none")]
    pub evse_maximum_power_limit: Option<PhysicalValue>,
    #[serde(rename = "EVSEID")]
    pub evse_id: String,
    #[serde(rename = "SAScheduleTupleID")]
    pub sa_schedule_tuple_id: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meter_info: Option<MeterInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_required: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MeteringReceiptRes {
    pub response_code: ResponseCode,
    #[serde(rename = "AC_EVSEStatus", default, skip_serializing_if = "Option::is_none")]
    pub ac_evse_status: Option<AcEvseStatus>,
    #[serde(rename = "DC_EVSEStatus", default, skip_serializing_if = "Option::is_none")]
    pub dc_evse_status: Option<DcEvseStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SessionStopRes {
    pub response_code: ResponseCode,
}

// ============================================================================
// Body union
// ============================================================================

macro_rules! message_bodies {
    (
        requests { $($req:ident),* $(,)? }
        responses { $($res:ident),* $(,)? }
    ) => {
        /// Discriminator of a [`Body`]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum MessageKind {
            $($req,)*
            $($res,)*
        }

        impl std::fmt::Display for MessageKind {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{:?}", self)
            }
        }

        /// Body of a V2G message
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        pub enum Body {
            $($req($req),)*
            $($res($res),)*
        }

        impl Body {
            pub fn kind(&self) -> MessageKind {
                match self {
                    $(Body::$req(_) => MessageKind::$req,)*
                    $(Body::$res(_) => MessageKind::$res,)*
                }
            }

            /// Response code, if this is a response body
            pub fn response_code(&self) -> Option<ResponseCode> {
                match self {
                    $(Body::$res(res) => Some(res.response_code),)*
                    _ => None,
                }
            }
        }

        $(
            impl From<$req> for Body {
                fn from(req: $req) -> Self {
                    Body::$req(req)
                }
            }
        )*

        $(
            impl From<$res> for Body {
                fn from(res: $res) -> Self {
                    Body::$res(res)
                }
            }

            impl ResponseBody for $res {
                const KIND: MessageKind = MessageKind::$res;

                fn from_body(body: Body) -> Option<Self> {
                    match body {
                        Body::$res(res) => Some(res),
                        _ => None,
                    }
                }

                fn response_code(&self) -> ResponseCode {
                    self.response_code
                }
            }
        )*
    };
}

/// A response body the EVCC can wait for
pub trait ResponseBody: Sized + Into<Body> {
    const KIND: MessageKind;

    fn from_body(body: Body) -> Option<Self>;

    fn response_code(&self) -> ResponseCode;
}

message_bodies! {
    requests {
        SessionSetupReq,
        ServiceDiscoveryReq,
        ServiceDetailReq,
        PaymentServiceSelectionReq,
        CertificateInstallationReq,
        PaymentDetailsReq,
        AuthorizationReq,
        ChargeParameterDiscoveryReq,
        PowerDeliveryReq,
        ChargingStatusReq,
        CurrentDemandReq,
        MeteringReceiptReq,
        SessionStopReq,
    }
    responses {
        SessionSetupRes,
        ServiceDiscoveryRes,
        ServiceDetailRes,
        PaymentServiceSelectionRes,
        CertificateInstallationRes,
        PaymentDetailsRes,
        AuthorizationRes,
        ChargeParameterDiscoveryRes,
        PowerDeliveryRes,
        ChargingStatusRes,
        CurrentDemandRes,
        MeteringReceiptRes,
        SessionStopRes,
    }
}
