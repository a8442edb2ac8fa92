//! Plug & Charge contract handling: certificate installation and payment details

use tracing::info;

use crate::error::SessionError;
use crate::messages::{
    AuthorizationReq, CertificateChain, CertificateInstallationRes, PaymentDetailsReq,
    PaymentDetailsRes, V2gMessage,
};
use crate::security::{CertPath, KeyPath, PkiError, SignedElement};
use crate::session::state::{Collaborators, Outcome, State, Step};
use crate::session::{validate, SessionContext};

/// Element id of the signed AuthorizationReq
const AUTHORIZATION_REQ_ID: &str = "id1";

fn element_id(id: Option<&str>, name: &str) -> Result<String, SessionError> {
    id.map(str::to_string).ok_or_else(|| {
        SessionError::crypto(
            "verifying CertificateInstallationRes",
            PkiError::SignatureInvalid(format!("{} carries no Id", name)),
        )
    })
}

/// The four elements the SECC must have signed, in schema order
fn signed_elements(res: &CertificateInstallationRes) -> Result<Vec<SignedElement>, SessionError> {
    let encode = |e: PkiError| SessionError::crypto("encoding CertificateInstallationRes", e);

    Ok(vec![
        SignedElement::new(
            element_id(res.contract_cert_chain.id.as_deref(), "ContractSignatureCertChain")?,
            &res.contract_cert_chain,
        )
        .map_err(encode)?,
        SignedElement::new(res.encrypted_private_key.id.clone(), &res.encrypted_private_key).map_err(encode)?,
        SignedElement::new(res.dh_public_key.id.clone(), &res.dh_public_key).map_err(encode)?,
        SignedElement::new(element_id(res.emaid.id.as_deref(), "eMAID")?, &res.emaid).map_err(encode)?,
    ])
}

pub fn certificate_installation(
    ctx: &mut SessionContext,
    co: &mut Collaborators<'_>,
    msg: V2gMessage,
) -> Result<Outcome, SessionError> {
    let (header, res) = validate::<CertificateInstallationRes>(ctx, msg)?;

    let signature = header.signature.ok_or_else(|| {
        SessionError::crypto(
            "verifying CertificateInstallationRes",
            PkiError::SignatureInvalid("header carries no signature".into()),
        )
    })?;

    let elements = signed_elements(&res)?;
    co.crypto
        .verify(
            &signature,
            &elements,
            &res.sa_provisioning_cert_chain.certificate,
            &res.sa_provisioning_cert_chain.sub_certificates,
            CertPath::V2gRoot,
        )
        .map_err(|e| SessionError::crypto("verifying CertificateInstallationRes", e))?;

    let contract_key = co
        .crypto
        .decrypt_private_key(&res.encrypted_private_key.value, KeyPath::OemLeaf, &res.dh_public_key.value)
        .map_err(|e| SessionError::crypto("decrypting contract private key", e))?;

    co.ev
        .store_contract_cert_and_key(&res.contract_cert_chain, &contract_key)?;
    info!("Installed contract certificate for {}", res.emaid.value);

    let cert_chain = CertificateChain {
        id: None,
        certificate: res.contract_cert_chain.certificate,
        sub_certificates: res.contract_cert_chain.sub_certificates,
    };
    let emaid = co
        .crypto
        .common_name(&cert_chain.certificate)
        .map_err(|e| SessionError::crypto("reading EMAID from contract certificate", e))?;

    let req = PaymentDetailsReq { emaid, cert_chain };
    Ok(Step::new(ctx, State::PaymentDetails, req).into_outcome())
}

pub fn payment_details(
    ctx: &mut SessionContext,
    co: &mut Collaborators<'_>,
    msg: V2gMessage,
) -> Result<Outcome, SessionError> {
    let (_, res) = validate::<PaymentDetailsRes>(ctx, msg)?;

    let req = AuthorizationReq {
        id: Some(AUTHORIZATION_REQ_ID.to_string()),
        gen_challenge: Some(res.gen_challenge),
    };

    let element = SignedElement::new(AUTHORIZATION_REQ_ID, &req)
        .map_err(|e| SessionError::crypto("encoding AuthorizationReq", e))?;
    let signature = co
        .crypto
        .sign(&[element], KeyPath::ContractLeaf)
        .map_err(|e| SessionError::crypto("signing AuthorizationReq", e))?;

    Ok(Step::new(ctx, State::Authorization, req)
        .signed(signature)
        .into_outcome())
}
