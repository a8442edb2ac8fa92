//! Session setup and service negotiation

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::error::SessionError;
use crate::messages::{
    AuthOption, AuthorizationReq, PaymentDetailsReq, PaymentServiceSelectionReq,
    PaymentServiceSelectionRes, SelectedService, ServiceCategory, ServiceDetailReq,
    ServiceDetailRes, ServiceDiscoveryReq, ServiceDiscoveryRes, SessionSetupRes,
    V2gMessage, CertificateInstallationReq,
};
use crate::security::{CertPath, KeyPath, SignedElement, CONTRACT_SUB_CAS};
use crate::session::state::{Collaborators, Outcome, State, Step};
use crate::session::{validate, SessionContext};

/// Element id of the signed CertificateInstallationReq
const CERT_INSTALL_REQ_ID: &str = "id1";

pub fn session_setup(ctx: &mut SessionContext, msg: V2gMessage) -> Result<Outcome, SessionError> {
    let (header, res) = validate::<SessionSetupRes>(ctx, msg)?;

    ctx.assign_session_id(header.session_id)?;
    ctx.assign_evse_id(res.evse_id)?;
    if let Some(clock) = res.evse_timestamp.and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0)) {
        debug!("EVSE clock {}", clock.to_rfc3339());
    }
    info!(
        "Session {} established with EVSE {}",
        ctx.session_id(),
        ctx.evse_id().unwrap_or_default()
    );

    Ok(Step::new(ctx, State::ServiceDiscovery, ServiceDiscoveryReq::default()).into_outcome())
}

pub fn service_discovery(
    ctx: &mut SessionContext,
    co: &mut Collaborators<'_>,
    msg: V2gMessage,
) -> Result<Outcome, SessionError> {
    let (_, res) = validate::<ServiceDiscoveryRes>(ctx, msg)?;

    let ServiceDiscoveryRes {
        auth_options,
        charge_service,
        service_list,
        ..
    } = res;

    let charge_service =
        charge_service.ok_or_else(|| SessionError::Incompatible("no charge service offered".into()))?;

    let resume = ctx.resume.take().unwrap_or_default();
    let auth_option = choose_auth_option(resume.auth_option, &auth_options, ctx.is_tls);
    let energy_mode = resume
        .energy_mode
        .unwrap_or_else(|| co.ev.energy_transfer_mode());

    if !charge_service.supported_energy_transfer_mode.contains(&energy_mode) {
        warn!(
            "EVSE offers {:?}, EV requires {}",
            charge_service.supported_energy_transfer_mode, energy_mode
        );
        return Err(SessionError::Incompatible(format!(
            "energy transfer mode {} not offered",
            energy_mode
        )));
    }

    ctx.selected_auth_option = Some(auth_option);
    ctx.selected_energy_mode = Some(energy_mode);
    ctx.select_service(SelectedService::new(charge_service.service_id));

    let certificate_service = service_list
        .unwrap_or_default()
        .into_iter()
        .find(|s| s.service_category == ServiceCategory::ContractCertificate);

    if let Some(service) = certificate_service {
        if ctx.is_tls && auth_option == AuthOption::PlugAndCharge && co.ev.is_cert_install_needed() {
            ctx.service_details_to_request.push(service.service_id);
            ctx.select_service(SelectedService::new(service.service_id));
        }
    }

    info!("Selected {} with {}", auth_option, energy_mode);
    Ok(next_service_detail_or_selection(ctx))
}

pub fn service_detail(ctx: &mut SessionContext, msg: V2gMessage) -> Result<Outcome, SessionError> {
    let (_, res) = validate::<ServiceDetailRes>(ctx, msg)?;
    info!("Received details of service {}", res.service_id);

    Ok(next_service_detail_or_selection(ctx))
}

pub fn payment_service_selection(
    ctx: &mut SessionContext,
    co: &mut Collaborators<'_>,
    msg: V2gMessage,
) -> Result<Outcome, SessionError> {
    validate::<PaymentServiceSelectionRes>(ctx, msg)?;

    if ctx.selected_auth_option != Some(AuthOption::PlugAndCharge) {
        return Ok(Step::new(ctx, State::Authorization, AuthorizationReq::default()).into_outcome());
    }

    if co.ev.is_cert_install_needed() {
        let req = CertificateInstallationReq {
            id: CERT_INSTALL_REQ_ID.to_string(),
            oem_provisioning_cert: co
                .crypto
                .load_certificate(CertPath::OemLeaf)
                .map_err(|e| SessionError::crypto("loading OEM provisioning certificate", e))?,
            list_of_root_cert_ids: co
                .crypto
                .root_certificate_ids()
                .map_err(|e| SessionError::crypto("loading V2G root certificate ids", e))?,
        };

        let element = SignedElement::new(CERT_INSTALL_REQ_ID, &req)
            .map_err(|e| SessionError::crypto("encoding CertificateInstallationReq", e))?;
        let signature = co
            .crypto
            .sign(&[element], KeyPath::OemLeaf)
            .map_err(|e| SessionError::crypto("signing CertificateInstallationReq", e))?;

        info!("Requesting contract certificate installation");
        return Ok(Step::new(ctx, State::CertificateInstallation, req)
            .signed(signature)
            .into_outcome());
    }

    let req = stored_payment_details(co)?;
    Ok(Step::new(ctx, State::PaymentDetails, req).into_outcome())
}

/// PaymentDetailsReq from the contract chain already on storage
fn stored_payment_details(co: &Collaborators<'_>) -> Result<PaymentDetailsReq, SessionError> {
    let cert_chain = co
        .crypto
        .load_cert_chain(CertPath::ContractLeaf, &CONTRACT_SUB_CAS)
        .map_err(|e| SessionError::crypto("loading contract certificate chain", e))?;
    let emaid = co
        .crypto
        .common_name(&cert_chain.certificate)
        .map_err(|e| SessionError::crypto("reading EMAID from contract certificate", e))?;

    Ok(PaymentDetailsReq { emaid, cert_chain })
}

/// Pop the next pending service detail, or move on to payment selection
fn next_service_detail_or_selection(ctx: &mut SessionContext) -> Outcome {
    match ctx.service_details_to_request.pop() {
        Some(service_id) => {
            Step::new(ctx, State::ServiceDetail, ServiceDetailReq { service_id }).into_outcome()
        }
        None => {
            let req = PaymentServiceSelectionReq {
                // Always set by ServiceDiscovery before this point
                selected_auth_option: ctx
                    .selected_auth_option
                    .unwrap_or(AuthOption::ExternalIdentification),
                selected_services: ctx.selected_services().to_vec(),
            };
            Step::new(ctx, State::PaymentServiceSelection, req).into_outcome()
        }
    }
}

/// Plug & Charge is only ever chosen over TLS and when offered
pub fn choose_auth_option(resumed: Option<AuthOption>, offered: &[AuthOption], is_tls: bool) -> AuthOption {
    let pnc_possible = is_tls && offered.contains(&AuthOption::PlugAndCharge);
    match resumed {
        Some(AuthOption::PlugAndCharge) | None if pnc_possible => AuthOption::PlugAndCharge,
        _ => AuthOption::ExternalIdentification,
    }
}
