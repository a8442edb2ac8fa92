//! Security layer used by the Plug & Charge transitions
//!
//! - `signature`: detached ECDSA-SHA256 signatures over named elements
//! - `ecdh`: decryption of the contract private key delivered by the SECC
//! - `pki`: X.509 helpers and the file-backed [`FilePki`] provider
//!
//! The session states only talk to the [`CryptoProvider`] trait.

pub mod signature;
pub mod ecdh;
pub mod pki;

use std::path::PathBuf;

use p256::ecdsa::{SigningKey, VerifyingKey};
use p256::pkcs8::{DecodePrivateKey, EncodePrivateKey, LineEnding};
use p256::SecretKey;
use serde::Serialize;
use thiserror::Error;

use crate::messages::{CertificateChain, RootCertificateId};

pub use signature::{create_signature, verify_signature, Reference, Signature, SignedInfo};
pub use ecdh::{decrypt_private_key, encrypt_private_key};
pub use pki::FilePki;

/// Errors raised by certificate/key handling
#[derive(Debug, Error)]
pub enum PkiError {
    #[error("file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("can't read private key {}: {reason}", path.display())]
    PrivateKeyRead { path: PathBuf, reason: String },

    #[error("invalid certificate: {0}")]
    InvalidCertificate(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("signature verification failed: {0}")]
    SignatureInvalid(String),

    #[error("decryption failed: {0}")]
    Decryption(String),

    #[error("canonical encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Named certificate locations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertPath {
    V2gRoot,
    OemLeaf,
    ContractLeaf,
    MoSubCa1,
    MoSubCa2,
}

impl CertPath {
    pub fn file_name(&self) -> &'static str {
        match self {
            CertPath::V2gRoot => "v2gRootCACert.der",
            CertPath::OemLeaf => "oemLeafCert.der",
            CertPath::ContractLeaf => "contractLeafCert.der",
            CertPath::MoSubCa1 => "moSubCA1Cert.der",
            CertPath::MoSubCa2 => "moSubCA2Cert.der",
        }
    }
}

/// Named private key locations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPath {
    /// OEM provisioning key, also the EV's ECDH key for certificate installation
    OemLeaf,
    ContractLeaf,
}

impl KeyPath {
    pub fn file_name(&self) -> &'static str {
        match self {
            KeyPath::OemLeaf => "oemLeaf.key",
            KeyPath::ContractLeaf => "contractLeaf.key",
        }
    }
}

/// Contract chain order: leaf first, then sub-CA 2 (issuer of the leaf), then sub-CA 1
pub const CONTRACT_SUB_CAS: [CertPath; 2] = [CertPath::MoSubCa2, CertPath::MoSubCa1];

/// An element covered by a detached signature: its id and canonical bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedElement {
    pub id: String,
    pub bytes: Vec<u8>,
}

impl SignedElement {
    /// Canonicalize `element` under `id`
    pub fn new(id: impl Into<String>, element: &impl Serialize) -> Result<Self, PkiError> {
        Ok(Self {
            id: id.into(),
            bytes: canonicalize(element)?,
        })
    }
}

/// Canonical encoding of a message element
///
/// Struct fields serialize in declaration order, so the encoding of a given
/// value is stable on both ends.
pub fn canonicalize(element: &impl Serialize) -> Result<Vec<u8>, PkiError> {
    Ok(serde_json::to_vec(element)?)
}

/// P-256 private key
#[derive(Clone)]
pub struct PrivateKey(SecretKey);

impl PrivateKey {
    pub fn new(secret: SecretKey) -> Self {
        Self(secret)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PkiError> {
        SecretKey::from_slice(bytes)
            .map(Self)
            .map_err(|_| PkiError::InvalidKey("not a valid P-256 scalar".into()))
    }

    /// Parse a PKCS#8 or SEC1 PEM document
    pub fn from_pem(pem: &str) -> Result<Self, PkiError> {
        SecretKey::from_pkcs8_pem(pem)
            .or_else(|_| SecretKey::from_sec1_pem(pem))
            .map(Self)
            .map_err(|e| PkiError::InvalidKey(e.to_string()))
    }

    /// PKCS#8 PEM encoding
    pub fn to_pem(&self) -> Result<String, PkiError> {
        self.0
            .to_pkcs8_pem(LineEnding::LF)
            .map(|pem| pem.as_str().to_owned())
            .map_err(|e| PkiError::InvalidKey(e.to_string()))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.to_bytes().to_vec()
    }

    pub fn secret(&self) -> &SecretKey {
        &self.0
    }

    pub fn signing_key(&self) -> SigningKey {
        SigningKey::from(&self.0)
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        *self.signing_key().verifying_key()
    }

    /// Uncompressed SEC1 encoding of the public key
    pub fn public_key_sec1(&self) -> Vec<u8> {
        use p256::elliptic_curve::sec1::ToEncodedPoint;
        self.0.public_key().to_encoded_point(false).as_bytes().to_vec()
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PrivateKey(..)")
    }
}

/// Certificate and key operations the session depends on
pub trait CryptoProvider: Send + Sync {
    /// Load a DER certificate by name
    fn load_certificate(&self, cert: CertPath) -> Result<Vec<u8>, PkiError>;

    /// Load a leaf certificate together with its sub-CAs
    fn load_cert_chain(&self, leaf: CertPath, sub_cas: &[CertPath]) -> Result<CertificateChain, PkiError>;

    /// Issuer/serial of the trusted V2G roots
    fn root_certificate_ids(&self) -> Result<Vec<RootCertificateId>, PkiError>;

    /// Subject common name of a DER certificate
    fn common_name(&self, cert: &[u8]) -> Result<String, PkiError>;

    /// Sign `elements` with the named private key
    fn sign(&self, elements: &[SignedElement], key: KeyPath) -> Result<Signature, PkiError>;

    /// Verify `signature` over exactly `elements`, issued by `leaf_cert`
    /// whose chain (`sub_cas`) anchors at the `root` certificate
    fn verify(
        &self,
        signature: &Signature,
        elements: &[SignedElement],
        leaf_cert: &[u8],
        sub_cas: &[Vec<u8>],
        root: CertPath,
    ) -> Result<(), PkiError>;

    /// Decrypt an encrypted private key with ECDH between the named own key
    /// and the peer's ephemeral public key
    fn decrypt_private_key(
        &self,
        encrypted: &[u8],
        own_key: KeyPath,
        peer_public: &[u8],
    ) -> Result<PrivateKey, PkiError>;
}
