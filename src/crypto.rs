//! AES-256-GCM field encryption for data at rest.
//!
//! Sealed values are text of the form `ivhex:taghex:ciphertexthex` with a
//! fresh 12-byte nonce per call.

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use thiserror::Error;

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("encryption key must be {} hex characters", KEY_LEN * 2)]
    InvalidKey,

    #[error("sealed value is not in iv:tag:ciphertext form")]
    InvalidFormat,

    #[error("encryption failed")]
    Encrypt,

    #[error("decryption failed")]
    Decrypt,
}

#[derive(Clone)]
pub struct FieldCipher {
    cipher: Aes256Gcm,
}

impl FieldCipher {
    /// Key is 64 hex characters; surrounding whitespace is ignored
    pub fn from_hex(key: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(key.trim()).map_err(|_| CryptoError::InvalidKey)?;
        if bytes.len() != KEY_LEN {
            return Err(CryptoError::InvalidKey);
        }
        let cipher = Aes256Gcm::new_from_slice(&bytes).map_err(|_| CryptoError::InvalidKey)?;
        Ok(Self { cipher })
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let sealed = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| CryptoError::Encrypt)?;

        // aes-gcm appends the tag to the ciphertext
        let (ciphertext, tag) = sealed.split_at(sealed.len() - TAG_LEN);
        Ok(format!(
            "{}:{}:{}",
            hex::encode(nonce.as_slice()),
            hex::encode(tag),
            hex::encode(ciphertext)
        ))
    }

    pub fn decrypt(&self, sealed: &str) -> Result<String, CryptoError> {
        let mut parts = sealed.split(':');
        let (Some(iv), Some(tag), Some(ciphertext), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(CryptoError::InvalidFormat);
        };

        let iv = hex::decode(iv).map_err(|_| CryptoError::InvalidFormat)?;
        let tag = hex::decode(tag).map_err(|_| CryptoError::InvalidFormat)?;
        let mut payload = hex::decode(ciphertext).map_err(|_| CryptoError::InvalidFormat)?;
        if iv.len() != NONCE_LEN || tag.len() != TAG_LEN {
            return Err(CryptoError::InvalidFormat);
        }

        payload.extend_from_slice(&tag);
        let plain = self
            .cipher
            .decrypt(Nonce::from_slice(&iv), payload.as_ref())
            .map_err(|_| CryptoError::Decrypt)?;
        String::from_utf8(plain).map_err(|_| CryptoError::Decrypt)
    }
}

impl std::fmt::Debug for FieldCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FieldCipher(..)")
    }
}
