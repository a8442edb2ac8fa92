//! X.509 helpers and the file-backed crypto provider
//!
//! Layout under the PKI directory:
//!
//! ```text
//! certs/v2gRootCACert.der
//! certs/oemLeafCert.der
//! certs/contractLeafCert.der
//! certs/moSubCA1Cert.der
//! certs/moSubCA2Cert.der
//! private_keys/oemLeaf.key       (PEM)
//! private_keys/contractLeaf.key  (PEM)
//! ```

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use p256::ecdsa::signature::Verifier;
use p256::ecdsa::{Signature as EcdsaSignature, VerifyingKey};
use tracing::{debug, warn};
use x509_cert::der::asn1::ObjectIdentifier;
use x509_cert::der::{Decode, Encode};
use x509_cert::Certificate;

use super::{
    create_signature, decrypt_private_key, verify_signature, CertPath, CryptoProvider, KeyPath,
    PkiError, PrivateKey, Signature, SignedElement, CONTRACT_SUB_CAS,
};
use crate::messages::{CertificateChain, RootCertificateId};

const ECDSA_WITH_SHA256: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.2");
const COMMON_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.3");

// ============================================================================
// Certificate helpers
// ============================================================================

pub fn parse_certificate(der: &[u8]) -> Result<Certificate, PkiError> {
    Certificate::from_der(der).map_err(|e| PkiError::InvalidCertificate(e.to_string()))
}

/// Subject common name
pub fn common_name(der: &[u8]) -> Result<String, PkiError> {
    let cert = parse_certificate(der)?;
    cert.tbs_certificate
        .subject
        .0
        .iter()
        .flat_map(|rdn| rdn.0.iter())
        .find(|atv| atv.oid == COMMON_NAME)
        .ok_or_else(|| PkiError::InvalidCertificate("subject has no common name".into()))
        .and_then(|atv| {
            std::str::from_utf8(atv.value.value())
                .map(str::to_string)
                .map_err(|_| PkiError::InvalidCertificate("common name is not UTF-8".into()))
        })
}

/// Issuer name and serial number
pub fn issuer_serial(der: &[u8]) -> Result<RootCertificateId, PkiError> {
    let cert = parse_certificate(der)?;
    Ok(RootCertificateId {
        issuer_name: cert.tbs_certificate.issuer.to_string(),
        serial_number: cert.tbs_certificate.serial_number.as_bytes().to_vec(),
    })
}

/// Subject public key as an ECDSA verifying key
pub fn public_key(cert: &Certificate) -> Result<VerifyingKey, PkiError> {
    let spki = &cert.tbs_certificate.subject_public_key_info;
    VerifyingKey::from_sec1_bytes(spki.subject_public_key.raw_bytes())
        .map_err(|_| PkiError::InvalidCertificate("subject key is not a P-256 point".into()))
}

/// Check that `cert` carries a valid ECDSA-SHA256 signature by `issuer`
pub fn verify_issued_by(cert: &Certificate, issuer: &Certificate) -> Result<(), PkiError> {
    if cert.signature_algorithm.oid != ECDSA_WITH_SHA256 {
        return Err(PkiError::InvalidCertificate(format!(
            "unsupported signature algorithm {}",
            cert.signature_algorithm.oid
        )));
    }
    if cert.tbs_certificate.issuer != issuer.tbs_certificate.subject {
        return Err(PkiError::InvalidCertificate(format!(
            "{} is not issued by {}",
            cert.tbs_certificate.subject, issuer.tbs_certificate.subject
        )));
    }

    let tbs = cert
        .tbs_certificate
        .to_der()
        .map_err(|e| PkiError::InvalidCertificate(e.to_string()))?;
    let signature = EcdsaSignature::from_der(cert.signature.raw_bytes())
        .map_err(|_| PkiError::InvalidCertificate("malformed certificate signature".into()))?;

    public_key(issuer)?
        .verify(&tbs, &signature)
        .map_err(|_| PkiError::InvalidCertificate(format!(
            "bad signature on {}",
            cert.tbs_certificate.subject
        )))
}

/// Walk `leaf -> sub_cas... -> root`; sub-CAs are ordered issuer-of-previous first
pub fn verify_chain(leaf: &[u8], sub_cas: &[Vec<u8>], root: &[u8]) -> Result<VerifyingKey, PkiError> {
    let leaf = parse_certificate(leaf)?;
    let root = parse_certificate(root)?;

    let mut current = leaf.clone();
    for der in sub_cas {
        let issuer = parse_certificate(der)?;
        verify_issued_by(&current, &issuer)?;
        current = issuer;
    }
    verify_issued_by(&current, &root)?;

    public_key(&leaf)
}

// ============================================================================
// FilePki
// ============================================================================

/// Crypto provider reading certificates and keys from a PKI directory
#[derive(Debug, Clone)]
pub struct FilePki {
    dir: PathBuf,
}

impl FilePki {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn cert_path(&self, cert: CertPath) -> PathBuf {
        self.dir.join("certs").join(cert.file_name())
    }

    pub fn key_path(&self, key: KeyPath) -> PathBuf {
        self.dir.join("private_keys").join(key.file_name())
    }

    fn read(path: &Path) -> Result<Vec<u8>, PkiError> {
        fs::read(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => PkiError::NotFound {
                path: path.to_path_buf(),
            },
            _ => PkiError::Io {
                path: path.to_path_buf(),
                source: e,
            },
        })
    }

    fn write(path: &Path, bytes: &[u8]) -> Result<(), PkiError> {
        let io_err = |source| PkiError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(path, bytes).map_err(io_err)
    }

    /// Load a PEM private key
    ///
    /// Every failure, including a missing file, is reported as
    /// [`PkiError::PrivateKeyRead`] carrying the underlying reason.
    pub fn load_private_key(&self, key: KeyPath) -> Result<PrivateKey, PkiError> {
        let path = self.key_path(key);
        let to_read_err = |e: PkiError| PkiError::PrivateKeyRead {
            path: path.clone(),
            reason: e.to_string(),
        };

        let bytes = Self::read(&path).map_err(to_read_err)?;
        let pem = String::from_utf8(bytes).map_err(|_| PkiError::PrivateKeyRead {
            path: path.clone(),
            reason: "not a PEM document".into(),
        })?;
        PrivateKey::from_pem(&pem).map_err(to_read_err)
    }

    /// Persist a freshly installed contract chain and its private key
    ///
    /// Sub-certificates land in [`CONTRACT_SUB_CAS`] order, so a later
    /// session can load the same chain without reinstalling.
    pub fn store_contract(&self, chain: &CertificateChain, key: &PrivateKey) -> Result<(), PkiError> {
        if chain.sub_certificates.len() > CONTRACT_SUB_CAS.len() {
            warn!(
                "Ignoring {} extra contract sub-CAs",
                chain.sub_certificates.len() - CONTRACT_SUB_CAS.len()
            );
        }
        Self::write(&self.cert_path(CertPath::ContractLeaf), &chain.certificate)?;
        for (path, der) in CONTRACT_SUB_CAS.iter().zip(&chain.sub_certificates) {
            Self::write(&self.cert_path(*path), der)?;
        }
        Self::write(&self.key_path(KeyPath::ContractLeaf), key.to_pem()?.as_bytes())?;
        debug!("Stored contract certificate under {}", self.dir.display());
        Ok(())
    }

    /// Write a private key in PEM form
    pub fn store_private_key(&self, key_path: KeyPath, key: &PrivateKey) -> Result<(), PkiError> {
        Self::write(&self.key_path(key_path), key.to_pem()?.as_bytes())
    }

    /// Write a DER certificate
    pub fn store_certificate(&self, cert_path: CertPath, der: &[u8]) -> Result<(), PkiError> {
        Self::write(&self.cert_path(cert_path), der)
    }
}

impl CryptoProvider for FilePki {
    fn load_certificate(&self, cert: CertPath) -> Result<Vec<u8>, PkiError> {
        Self::read(&self.cert_path(cert))
    }

    fn load_cert_chain(&self, leaf: CertPath, sub_cas: &[CertPath]) -> Result<CertificateChain, PkiError> {
        let certificate = self.load_certificate(leaf)?;
        let sub_certificates = sub_cas
            .iter()
            .map(|c| self.load_certificate(*c))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CertificateChain {
            id: None,
            certificate,
            sub_certificates,
        })
    }

    fn root_certificate_ids(&self) -> Result<Vec<RootCertificateId>, PkiError> {
        let root = self.load_certificate(CertPath::V2gRoot)?;
        Ok(vec![issuer_serial(&root)?])
    }

    fn common_name(&self, cert: &[u8]) -> Result<String, PkiError> {
        common_name(cert)
    }

    fn sign(&self, elements: &[SignedElement], key: KeyPath) -> Result<Signature, PkiError> {
        let key = self.load_private_key(key)?;
        create_signature(elements, &key)
    }

    fn verify(
        &self,
        signature: &Signature,
        elements: &[SignedElement],
        leaf_cert: &[u8],
        sub_cas: &[Vec<u8>],
        root: CertPath,
    ) -> Result<(), PkiError> {
        let root = self.load_certificate(root)?;
        let key = verify_chain(leaf_cert, sub_cas, &root).inspect_err(|e| {
            warn!("Certificate chain rejected: {}", e);
        })?;
        verify_signature(signature, elements, &key)
    }

    fn decrypt_private_key(
        &self,
        encrypted: &[u8],
        own_key: KeyPath,
        peer_public: &[u8],
    ) -> Result<PrivateKey, PkiError> {
        let own = self.load_private_key(own_key)?;
        decrypt_private_key(encrypted, &own, peer_public)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::AuthorizationReq;
    use p256::SecretKey;
    use rand::rngs::OsRng;
    use rcgen::{
        BasicConstraints, Certificate as GeneratedCert, CertificateParams, DistinguishedName, DnType,
        IsCa, KeyPair, PKCS_ECDSA_P256_SHA256,
    };
    use tempfile::TempDir;

    const EMAID: &str = "DEEKSC0000001";

    fn random_key() -> PrivateKey {
        PrivateKey::new(SecretKey::random(&mut OsRng))
    }

    /// A generated certificate with its P-256 key
    struct Issued {
        cert: GeneratedCert,
        key: KeyPair,
    }

    impl Issued {
        fn der(&self) -> Vec<u8> {
            self.cert.der().to_vec()
        }

        fn private_key(&self) -> PrivateKey {
            PrivateKey::from_pem(&self.key.serialize_pem()).unwrap()
        }
    }

    fn params(common_name: &str, ca: bool) -> CertificateParams {
        let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
        params.distinguished_name = DistinguishedName::new();
        params.distinguished_name.push(DnType::CommonName, common_name);
        if ca {
            params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        }
        params
    }

    fn self_signed_root(common_name: &str) -> Issued {
        let key = KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256).unwrap();
        let cert = params(common_name, true).self_signed(&key).unwrap();
        Issued { cert, key }
    }

    fn issue(common_name: &str, ca: bool, issuer: &Issued) -> Issued {
        let key = KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256).unwrap();
        let cert = params(common_name, ca)
            .signed_by(&key, &issuer.cert, &issuer.key)
            .unwrap();
        Issued { cert, key }
    }

    /// V2G root -> provisioning sub-CA -> leaf carrying the EMAID
    fn chain() -> (Issued, Issued, Issued) {
        let root = self_signed_root("V2G Root");
        let sub = issue("Prov Sub", true, &root);
        let leaf = issue(EMAID, false, &sub);
        (root, sub, leaf)
    }

    #[test]
    fn test_missing_certificate_is_not_found() {
        let dir = TempDir::new().unwrap();
        let pki = FilePki::new(dir.path());

        match pki.load_certificate(CertPath::ContractLeaf) {
            Err(PkiError::NotFound { path }) => {
                assert!(path.ends_with("certs/contractLeafCert.der"));
            }
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_key_is_read_failure() {
        let dir = TempDir::new().unwrap();
        let pki = FilePki::new(dir.path());

        match pki.load_private_key(KeyPath::OemLeaf) {
            Err(PkiError::PrivateKeyRead { reason, .. }) => {
                assert!(reason.contains("not found"));
            }
            other => panic!("Expected PrivateKeyRead, got {:?}", other),
        }
    }

    #[test]
    fn test_garbage_certificate_rejected() {
        let dir = TempDir::new().unwrap();
        let pki = FilePki::new(dir.path());
        pki.store_certificate(CertPath::ContractLeaf, b"not der").unwrap();

        let der = pki.load_certificate(CertPath::ContractLeaf).unwrap();
        assert!(matches!(pki.common_name(&der), Err(PkiError::InvalidCertificate(_))));
        assert!(matches!(issuer_serial(&der), Err(PkiError::InvalidCertificate(_))));
    }

    #[test]
    fn test_sign_with_stored_key() {
        let dir = TempDir::new().unwrap();
        let pki = FilePki::new(dir.path());
        let key = random_key();
        pki.store_private_key(KeyPath::ContractLeaf, &key).unwrap();

        let element = SignedElement::new(
            "id1",
            &AuthorizationReq {
                id: Some("id1".into()),
                gen_challenge: Some(vec![9; 16]),
            },
        )
        .unwrap();
        let signature = pki.sign(&[element.clone()], KeyPath::ContractLeaf).unwrap();

        verify_signature(&signature, &[element], &key.verifying_key()).unwrap();
    }

    #[test]
    fn test_store_contract_writes_chain_and_key() {
        let dir = TempDir::new().unwrap();
        let pki = FilePki::new(dir.path());
        let key = random_key();
        let chain = CertificateChain {
            id: Some("id1".into()),
            certificate: vec![1, 2, 3],
            sub_certificates: vec![vec![4], vec![5]],
        };

        pki.store_contract(&chain, &key).unwrap();

        let loaded = pki.load_cert_chain(CertPath::ContractLeaf, &CONTRACT_SUB_CAS).unwrap();
        assert_eq!(loaded.certificate, vec![1, 2, 3]);
        assert_eq!(loaded.sub_certificates, vec![vec![4], vec![5]]);
        assert_eq!(pki.load_certificate(CertPath::MoSubCa2).unwrap(), vec![4]);
        let loaded = pki.load_private_key(KeyPath::ContractLeaf).unwrap();
        assert_eq!(loaded.to_bytes(), key.to_bytes());
    }

    #[test]
    fn test_cert_chain_requires_every_sub_ca() {
        let dir = TempDir::new().unwrap();
        let pki = FilePki::new(dir.path());
        pki.store_certificate(CertPath::ContractLeaf, &[1]).unwrap();
        pki.store_certificate(CertPath::MoSubCa2, &[2]).unwrap();

        let result = pki.load_cert_chain(CertPath::ContractLeaf, &crate::security::CONTRACT_SUB_CAS);
        assert!(matches!(result, Err(PkiError::NotFound { .. })));

        pki.store_certificate(CertPath::MoSubCa1, &[3]).unwrap();
        let chain = pki
            .load_cert_chain(CertPath::ContractLeaf, &crate::security::CONTRACT_SUB_CAS)
            .unwrap();
        assert_eq!(chain.certificate, vec![1]);
        assert_eq!(chain.sub_certificates, vec![vec![2], vec![3]]);
    }

    // ========================================================================
    // X.509 chains
    // ========================================================================

    #[test]
    fn test_chain_anchored_at_root() {
        let (root, sub, leaf) = chain();

        let key = verify_chain(&leaf.der(), &[sub.der()], &root.der()).unwrap();
        assert_eq!(key, leaf.private_key().verifying_key());
    }

    #[test]
    fn test_foreign_root_rejected() {
        let (_, sub, leaf) = chain();
        // Same subject name, different key
        let foreign = self_signed_root("V2G Root");

        match verify_chain(&leaf.der(), &[sub.der()], &foreign.der()) {
            Err(PkiError::InvalidCertificate(reason)) => assert!(reason.contains("bad signature")),
            other => panic!("Expected InvalidCertificate, got {:?}", other),
        }
    }

    #[test]
    fn test_chain_without_sub_ca_rejected() {
        let (root, _, leaf) = chain();

        match verify_chain(&leaf.der(), &[], &root.der()) {
            Err(PkiError::InvalidCertificate(reason)) => assert!(reason.contains("is not issued by")),
            other => panic!("Expected InvalidCertificate, got {:?}", other),
        }
    }

    #[test]
    fn test_certificate_names() {
        let (root, _, leaf) = chain();

        assert_eq!(common_name(&leaf.der()).unwrap(), EMAID);
        let id = issuer_serial(&root.der()).unwrap();
        assert!(id.issuer_name.contains("V2G Root"));
        assert!(!id.serial_number.is_empty());
    }

    fn signed_request(challenge: u8) -> SignedElement {
        let req = AuthorizationReq {
            id: Some("id1".into()),
            gen_challenge: Some(vec![challenge; 16]),
        };
        SignedElement::new("id1", &req).unwrap()
    }

    #[test]
    fn test_file_pki_verifies_signed_elements() {
        let dir = TempDir::new().unwrap();
        let pki = FilePki::new(dir.path());
        let (root, sub, leaf) = chain();
        pki.store_certificate(CertPath::V2gRoot, &root.der()).unwrap();

        let signature = create_signature(&[signed_request(5)], &leaf.private_key()).unwrap();
        pki.verify(&signature, &[signed_request(5)], &leaf.der(), &[sub.der()], CertPath::V2gRoot)
            .unwrap();

        let result = pki.verify(&signature, &[signed_request(6)], &leaf.der(), &[sub.der()], CertPath::V2gRoot);
        assert!(matches!(result, Err(PkiError::SignatureInvalid(_))));

        // Chain no longer anchors at the trusted root
        pki.store_certificate(CertPath::V2gRoot, &self_signed_root("V2G Root").der())
            .unwrap();
        let result = pki.verify(&signature, &[signed_request(5)], &leaf.der(), &[sub.der()], CertPath::V2gRoot);
        assert!(matches!(result, Err(PkiError::InvalidCertificate(_))));
    }
}
