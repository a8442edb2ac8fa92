//! Detached message signatures
//!
//! Mirrors the XML-DSig profile of ISO 15118-2: every signed element gets a
//! `Reference` holding its id and SHA-256 digest, and the ECDSA-SHA256
//! signature covers the canonical encoding of the `SignedInfo` that lists
//! those references.

use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature as EcdsaSignature, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{canonicalize, PkiError, PrivateKey, SignedElement};

pub const CANONICALIZATION_METHOD: &str = "http://www.w3.org/TR/canonical-exi/";
pub const SIGNATURE_METHOD: &str = "http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha256";
pub const DIGEST_METHOD: &str = "http://www.w3.org/2001/04/xmlenc#sha256";

/// Digest reference to one signed element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Reference {
    #[serde(rename = "URI")]
    pub uri: String,
    pub digest_method: String,
    pub digest_value: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SignedInfo {
    pub canonicalization_method: String,
    pub signature_method: String,
    #[serde(rename = "Reference")]
    pub references: Vec<Reference>,
}

/// Detached signature carried in the message header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Signature {
    pub signed_info: SignedInfo,
    /// Raw `r || s`, 64 bytes
    pub signature_value: Vec<u8>,
}

impl Signature {
    /// Element ids covered by this signature, without the `#` prefix
    pub fn referenced_ids(&self) -> Vec<&str> {
        self.signed_info
            .references
            .iter()
            .map(|r| r.uri.trim_start_matches('#'))
            .collect()
    }
}

fn reference_for(element: &SignedElement) -> Reference {
    Reference {
        uri: format!("#{}", element.id),
        digest_method: DIGEST_METHOD.to_string(),
        digest_value: Sha256::digest(&element.bytes).to_vec(),
    }
}

/// Sign `elements` with `key`
pub fn create_signature(elements: &[SignedElement], key: &PrivateKey) -> Result<Signature, PkiError> {
    let signed_info = SignedInfo {
        canonicalization_method: CANONICALIZATION_METHOD.to_string(),
        signature_method: SIGNATURE_METHOD.to_string(),
        references: elements.iter().map(reference_for).collect(),
    };

    let signature: EcdsaSignature = key.signing_key().sign(&canonicalize(&signed_info)?);

    Ok(Signature {
        signed_info,
        signature_value: signature.to_bytes().to_vec(),
    })
}

/// Verify that `signature` covers exactly `elements` and was produced by `key`
pub fn verify_signature(
    signature: &Signature,
    elements: &[SignedElement],
    key: &VerifyingKey,
) -> Result<(), PkiError> {
    let signed_info = &signature.signed_info;

    if signed_info.signature_method != SIGNATURE_METHOD {
        return Err(PkiError::SignatureInvalid(format!(
            "unsupported signature method {}",
            signed_info.signature_method
        )));
    }

    if signed_info.references.len() != elements.len() {
        return Err(PkiError::SignatureInvalid(format!(
            "expected {} signed elements, signature references {}",
            elements.len(),
            signed_info.references.len()
        )));
    }

    for element in elements {
        let expected = reference_for(element);
        let reference = signed_info
            .references
            .iter()
            .find(|r| r.uri == expected.uri)
            .ok_or_else(|| {
                PkiError::SignatureInvalid(format!("element {} is not signed", element.id))
            })?;

        if reference.digest_method != DIGEST_METHOD || reference.digest_value != expected.digest_value {
            return Err(PkiError::SignatureInvalid(format!(
                "digest mismatch for element {}",
                element.id
            )));
        }
    }

    let value = EcdsaSignature::from_slice(&signature.signature_value)
        .map_err(|_| PkiError::SignatureInvalid("malformed signature value".into()))?;

    key.verify(&canonicalize(signed_info)?, &value)
        .map_err(|_| PkiError::SignatureInvalid("ECDSA verification failed".into()))
}
