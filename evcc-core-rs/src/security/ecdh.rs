//! Contract private key transport
//!
//! The SECC encrypts the contract private key for the EV: an ECDH agreement
//! between an ephemeral station key and the EV's OEM provisioning key feeds
//! a ConcatKDF (SHA-256), whose first 16 bytes key AES-128-CBC. The IV is
//! prepended to the ciphertext and the 32-byte scalar needs no padding.

use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use p256::ecdh::diffie_hellman;
use p256::PublicKey;
use sha2::{Digest, Sha256};

use super::{PkiError, PrivateKey};

type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;
type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;

pub const IV_LEN: usize = 16;
pub const KEY_LEN: usize = 16;
const SCALAR_LEN: usize = 32;

/// AlgorithmID || PartyUInfo || PartyVInfo
const KDF_OTHER_INFO: [u8; 3] = [0x01, 0x55, 0x56];

/// ConcatKDF over the ECDH shared secret `z`, one SHA-256 round
pub fn derive_session_key(z: &[u8]) -> [u8; KEY_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(1u32.to_be_bytes());
    hasher.update(z);
    hasher.update(KDF_OTHER_INFO);
    let digest = hasher.finalize();

    let mut key = [0u8; KEY_LEN];
    key.copy_from_slice(&digest[..KEY_LEN]);
    key
}

fn agree(own: &PrivateKey, peer_public: &[u8]) -> Result<[u8; KEY_LEN], PkiError> {
    let peer = PublicKey::from_sec1_bytes(peer_public)
        .map_err(|_| PkiError::InvalidKey("DH public key is not a P-256 point".into()))?;
    let shared = diffie_hellman(own.secret().to_nonzero_scalar(), peer.as_affine());
    Ok(derive_session_key(shared.raw_secret_bytes()))
}

/// Decrypt `IV || ciphertext` with the key agreed between `own` and `peer_public`
pub fn decrypt_private_key(
    encrypted: &[u8],
    own: &PrivateKey,
    peer_public: &[u8],
) -> Result<PrivateKey, PkiError> {
    if encrypted.len() != IV_LEN + SCALAR_LEN {
        return Err(PkiError::Decryption(format!(
            "expected {} bytes of IV and ciphertext, got {}",
            IV_LEN + SCALAR_LEN,
            encrypted.len()
        )));
    }

    let key = agree(own, peer_public)?;
    let (iv, ciphertext) = encrypted.split_at(IV_LEN);

    let mut buf = ciphertext.to_vec();
    let plain = Aes128CbcDec::new_from_slices(&key, iv)
        .map_err(|e| PkiError::Decryption(e.to_string()))?
        .decrypt_padded_mut::<NoPadding>(&mut buf)
        .map_err(|_| PkiError::Decryption("ciphertext is not block aligned".into()))?;

    PrivateKey::from_bytes(plain)
}

/// Station side of the key transport, used to provision test fixtures
pub fn encrypt_private_key(
    key: &PrivateKey,
    ephemeral: &PrivateKey,
    ev_public: &[u8],
    iv: [u8; IV_LEN],
) -> Result<Vec<u8>, PkiError> {
    let session_key = agree(ephemeral, ev_public)?;

    let mut buf = key.to_bytes();
    let len = buf.len();
    let ciphertext = Aes128CbcEnc::new_from_slices(&session_key, &iv)
        .map_err(|e| PkiError::Decryption(e.to_string()))?
        .encrypt_padded_mut::<NoPadding>(&mut buf, len)
        .map_err(|_| PkiError::Decryption("plaintext is not block aligned".into()))?;

    let mut out = Vec::with_capacity(IV_LEN + len);
    out.extend_from_slice(&iv);
    out.extend_from_slice(ciphertext);
    Ok(out)
}
