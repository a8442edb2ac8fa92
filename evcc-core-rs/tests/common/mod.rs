//! Scripted SECC and an in-memory PKI for session tests

#![allow(dead_code)]

use std::time::Duration;

use evcc_core::messages::*;
use evcc_core::security::{
    create_signature, decrypt_private_key, verify_signature, CertPath, CryptoProvider, KeyPath,
    PkiError, PrivateKey, Signature, SignedElement,
};
use evcc_core::transport::{ChannelTransport, Transport};
use p256::ecdsa::VerifyingKey;
use p256::SecretKey;
use rand::rngs::OsRng;

pub const SESSION_ID: [u8; 8] = [0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0x01, 0x02, 0x03];
pub const EVSE_ID: &str = "DE*EK3*E0001";
pub const EMAID: &str = "DEEKSC0000001";
pub const SCHEDULE_ID: u8 = 1;

pub fn random_key() -> PrivateKey {
    PrivateKey::new(SecretKey::random(&mut OsRng))
}

pub fn verifying_key(sec1: &[u8]) -> VerifyingKey {
    VerifyingKey::from_sec1_bytes(sec1).unwrap()
}

// ============================================================================
// In-memory PKI
// ============================================================================

/// Crypto provider whose "certificates" are bare SEC1 public keys
///
/// Chains are not checked: a signature verifies when it was made with the
/// key whose public half is the leaf.
pub struct TestPki {
    pub oem_cert: Vec<u8>,
    pub oem_key: Option<PrivateKey>,
    pub contract_key: Option<PrivateKey>,
}

impl TestPki {
    pub fn new(oem: &PrivateKey) -> Self {
        Self {
            oem_cert: oem.public_key_sec1(),
            oem_key: Some(oem.clone()),
            contract_key: None,
        }
    }

    pub fn with_contract(mut self, key: &PrivateKey) -> Self {
        self.contract_key = Some(key.clone());
        self
    }

    /// OEM certificate on storage, its private key unreadable
    pub fn without_oem_key(mut self) -> Self {
        self.oem_key = None;
        self
    }

    fn key(&self, key: KeyPath) -> Result<&PrivateKey, PkiError> {
        let found = match key {
            KeyPath::OemLeaf => self.oem_key.as_ref(),
            KeyPath::ContractLeaf => self.contract_key.as_ref(),
        };
        found.ok_or_else(|| PkiError::PrivateKeyRead {
            path: key.file_name().into(),
            reason: "unreadable".into(),
        })
    }
}

impl CryptoProvider for TestPki {
    fn load_certificate(&self, cert: CertPath) -> Result<Vec<u8>, PkiError> {
        match cert {
            CertPath::OemLeaf => Ok(self.oem_cert.clone()),
            CertPath::ContractLeaf => self
                .contract_key
                .as_ref()
                .map(PrivateKey::public_key_sec1)
                .ok_or_else(|| PkiError::NotFound {
                    path: cert.file_name().into(),
                }),
            other => Err(PkiError::NotFound {
                path: other.file_name().into(),
            }),
        }
    }

    fn load_cert_chain(&self, leaf: CertPath, _sub_cas: &[CertPath]) -> Result<CertificateChain, PkiError> {
        Ok(CertificateChain {
            id: None,
            certificate: self.load_certificate(leaf)?,
            sub_certificates: vec![],
        })
    }

    fn root_certificate_ids(&self) -> Result<Vec<RootCertificateId>, PkiError> {
        Ok(vec![RootCertificateId {
            issuer_name: "CN=V2G Root CA".into(),
            serial_number: vec![0x01],
        }])
    }

    fn common_name(&self, _cert: &[u8]) -> Result<String, PkiError> {
        Ok(EMAID.to_string())
    }

    fn sign(&self, elements: &[SignedElement], key: KeyPath) -> Result<Signature, PkiError> {
        create_signature(elements, self.key(key)?)
    }

    fn verify(
        &self,
        signature: &Signature,
        elements: &[SignedElement],
        leaf_cert: &[u8],
        _sub_cas: &[Vec<u8>],
        _root: CertPath,
    ) -> Result<(), PkiError> {
        let key = VerifyingKey::from_sec1_bytes(leaf_cert)
            .map_err(|e| PkiError::InvalidCertificate(e.to_string()))?;
        verify_signature(signature, elements, &key)
    }

    fn decrypt_private_key(
        &self,
        encrypted: &[u8],
        own_key: KeyPath,
        peer_public: &[u8],
    ) -> Result<PrivateKey, PkiError> {
        decrypt_private_key(encrypted, self.key(own_key)?, peer_public)
    }
}

// ============================================================================
// Scripted SECC
// ============================================================================

/// SECC end of a channel pair that answers one request at a time
pub struct Secc {
    transport: ChannelTransport,
    session_id: SessionId,
    /// Every request received, in order
    pub received: Vec<V2gMessage>,
}

impl Secc {
    pub fn new(transport: ChannelTransport) -> Self {
        Self {
            transport,
            session_id: SessionId(SESSION_ID.to_vec()),
            received: Vec::new(),
        }
    }

    /// Wait for the next request and check its kind
    pub async fn expect(&mut self, kind: MessageKind) -> V2gMessage {
        let msg = tokio::time::timeout(Duration::from_secs(120), self.transport.receive())
            .await
            .unwrap_or_else(|_| panic!("no {} received", kind))
            .unwrap();
        assert_eq!(msg.kind(), kind, "unexpected request");
        self.received.push(msg.clone());
        msg
    }

    pub async fn reply(&mut self, body: impl Into<Body>) {
        let msg = V2gMessage::new(self.session_id.clone(), body);
        self.transport.send(&msg).await.unwrap();
    }

    pub async fn reply_signed(&mut self, body: impl Into<Body>, signature: Signature) {
        let msg = V2gMessage::new(self.session_id.clone(), body).with_signature(signature);
        self.transport.send(&msg).await.unwrap();
    }

    /// SessionSetup through PaymentServiceSelection without extra services
    pub async fn negotiate(&mut self, auth_options: Vec<AuthOption>, modes: Vec<EnergyTransferMode>) {
        self.expect(MessageKind::SessionSetupReq).await;
        self.reply(setup_res()).await;
        self.expect(MessageKind::ServiceDiscoveryReq).await;
        self.reply(discovery_res(auth_options, modes, false)).await;
        self.expect(MessageKind::PaymentServiceSelectionReq).await;
        self.reply(PaymentServiceSelectionRes { response_code: ResponseCode::Ok }).await;
    }

    /// Authorization through PowerDelivery(Start)
    pub async fn authorize_and_start(&mut self) {
        self.expect(MessageKind::AuthorizationReq).await;
        self.reply(authorization_res(EvseProcessing::Finished)).await;
        self.expect(MessageKind::ChargeParameterDiscoveryReq).await;
        self.reply(discovery_finished()).await;
        self.expect(MessageKind::PowerDeliveryReq).await;
        self.reply(power_delivery_res()).await;
    }

    /// PowerDelivery(Stop) and SessionStop
    pub async fn stop(&mut self) -> SessionStopReq {
        let msg = self.expect(MessageKind::PowerDeliveryReq).await;
        match msg.body {
            Body::PowerDeliveryReq(req) => assert_eq!(req.charge_progress, ChargeProgress::Stop),
            other => panic!("Expected PowerDeliveryReq, got {:?}", other),
        }
        self.reply(power_delivery_res()).await;

        let msg = self.expect(MessageKind::SessionStopReq).await;
        self.reply(SessionStopRes { response_code: ResponseCode::Ok }).await;
        match msg.body {
            Body::SessionStopReq(req) => req,
            other => panic!("Expected SessionStopReq, got {:?}", other),
        }
    }

    /// Drop the connection
    pub fn hang_up(self) -> Vec<V2gMessage> {
        self.received
    }
}

// ============================================================================
// Responses
// ============================================================================

pub fn setup_res() -> SessionSetupRes {
    SessionSetupRes {
        response_code: ResponseCode::OkNewSessionEstablished,
        evse_id: EVSE_ID.into(),
        evse_timestamp: Some(1_700_000_000),
    }
}

pub fn discovery_res(
    auth_options: Vec<AuthOption>,
    modes: Vec<EnergyTransferMode>,
    with_cert_service: bool,
) -> ServiceDiscoveryRes {
    ServiceDiscoveryRes {
        response_code: ResponseCode::Ok,
        auth_options,
        charge_service: Some(ChargeService {
            service_id: CHARGE_SERVICE_ID,
            service_name: Some("AC_DC_Charging".into()),
            service_category: ServiceCategory::EvCharging,
            free_service: false,
            supported_energy_transfer_mode: modes,
        }),
        service_list: with_cert_service.then(|| {
            vec![Service {
                service_id: CERTIFICATE_SERVICE_ID,
                service_name: Some("Certificate".into()),
                service_category: ServiceCategory::ContractCertificate,
                free_service: true,
            }]
        }),
    }
}

pub fn authorization_res(processing: EvseProcessing) -> AuthorizationRes {
    AuthorizationRes {
        response_code: ResponseCode::Ok,
        evse_processing: processing,
    }
}

pub fn discovery_finished() -> ChargeParameterDiscoveryRes {
    ChargeParameterDiscoveryRes {
        response_code: ResponseCode::Ok,
        evse_processing: EvseProcessing::Finished,
        sa_schedule_list: Some(vec![SaScheduleTuple {
            sa_schedule_tuple_id: SCHEDULE_ID,
            p_max_schedule: vec![PMaxScheduleEntry {
                start: 0,
                duration: Some(86_400),
                p_max: PhysicalValue::new(22, 3, UnitSymbol::W),
            }],
        }]),
        ac_evse_status: None,
        dc_evse_status: None,
    }
}

pub fn power_delivery_res() -> PowerDeliveryRes {
    PowerDeliveryRes {
        response_code: ResponseCode::Ok,
        ac_evse_status: None,
        dc_evse_status: None,
    }
}

pub fn charging_status_res(notification: EvseNotification) -> ChargingStatusRes {
    ChargingStatusRes {
        response_code: ResponseCode::Ok,
        evse_id: EVSE_ID.into(),
        sa_schedule_tuple_id: SCHEDULE_ID,
        evse_max_current: Some(PhysicalValue::new(32, 0, UnitSymbol::A)),
        meter_info: None,
        receipt_required: Some(false),
        ac_evse_status: AcEvseStatus {
            notification_max_delay: 0,
            evse_notification: notification,
            rcd: false,
        },
    }
}

pub fn current_demand_res(notification: EvseNotification) -> CurrentDemandRes {
    CurrentDemandRes {
        response_code: ResponseCode::Ok,
        dc_evse_status: DcEvseStatus {
            notification_max_delay: 0,
            evse_notification: notification,
            evse_isolation_status: Some(IsolationLevel::Valid),
            evse_status_code: DcEvseStatusCode::Ready,
        },
        evse_present_voltage: PhysicalValue::new(400, 0, UnitSymbol::V),
        evse_present_current: PhysicalValue::new(100, 0, UnitSymbol::A),
        evse_current_limit_achieved: false,
        evse_voltage_limit_achieved: false,
        evse_power_limit_achieved: false,
        evse_maximum_voltage_limit: Some(PhysicalValue::new(500, 0, UnitSymbol::V)),
        evse_maximum_current_limit: Some(PhysicalValue::new(200, 0, UnitSymbol::A)),
        evse_maximum_power_limit: None,
        evse_id: EVSE_ID.into(),
        sa_schedule_tuple_id: SCHEDULE_ID,
        meter_info: None,
        receipt_required: None,
    }
}

/// Installation response carrying `contract` encrypted for the EV's OEM key
/// and signed by `provisioning`
pub fn installation_res(
    contract: &PrivateKey,
    oem_public: &[u8],
    provisioning: &PrivateKey,
) -> (CertificateInstallationRes, Signature) {
    let ephemeral = random_key();
    let encrypted = evcc_core::security::encrypt_private_key(contract, &ephemeral, oem_public, [0x5A; 16]).unwrap();

    let res = CertificateInstallationRes {
        response_code: ResponseCode::Ok,
        sa_provisioning_cert_chain: CertificateChain {
            id: None,
            certificate: provisioning.public_key_sec1(),
            sub_certificates: vec![],
        },
        contract_cert_chain: CertificateChain {
            id: Some("id1".into()),
            certificate: contract.public_key_sec1(),
            sub_certificates: vec![],
        },
        encrypted_private_key: EncryptedPrivateKey {
            id: "id2".into(),
            value: encrypted,
        },
        dh_public_key: DhPublicKey {
            id: "id3".into(),
            value: ephemeral.public_key_sec1(),
        },
        emaid: Emaid {
            id: Some("id4".into()),
            value: EMAID.into(),
        },
    };

    let elements = vec![
        SignedElement::new("id1", &res.contract_cert_chain).unwrap(),
        SignedElement::new("id2", &res.encrypted_private_key).unwrap(),
        SignedElement::new("id3", &res.dh_public_key).unwrap(),
        SignedElement::new("id4", &res.emaid).unwrap(),
    ];
    let signature = create_signature(&elements, provisioning).unwrap();
    (res, signature)
}
