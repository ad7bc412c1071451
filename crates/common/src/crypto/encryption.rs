//! AES-256-GCM encryption primitives
//!
//! Low-level building blocks for the credential vault:
//!
//! - [`EncryptionService`]: AES-256-GCM encryption/decryption
//! - [`EncryptedData`]: serializable envelope
//! - Password-based key derivation using Argon2
//!
//! A fresh nonce is generated per encrypt call, so equal plaintexts
//! produce different envelopes across calls.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use argon2::password_hash::SaltString;
use argon2::Argon2;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::{CommonError, CommonResult};

const ALGORITHM: &str = "AES-256-GCM";

/// Serializable encrypted envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedData {
    pub nonce: Vec<u8>,
    pub ciphertext: Vec<u8>,
    pub salt: Option<String>,
    pub algorithm: String,
}

/// AES-GCM encryption service with optional password-based key derivation.
pub struct EncryptionService {
    key: Vec<u8>,
    cipher: Aes256Gcm,
    password_salt: Option<String>,
}

impl std::fmt::Debug for EncryptionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionService")
            .field("key", &"[REDACTED]")
            .field("password_salt", &self.password_salt.is_some())
            .finish()
    }
}

impl EncryptionService {
    /// Create a service from a raw 32-byte key.
    pub fn new(key: Vec<u8>) -> CommonResult<Self> {
        if key.len() != 32 {
            return Err(CommonError::Crypto("encryption key must be exactly 32 bytes".to_string()));
        }

        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| CommonError::Crypto(format!("failed to create cipher: {e}")))?;

        Ok(Self { key, cipher, password_salt: None })
    }

    /// Derive a key from a passphrase using Argon2 with a fresh salt.
    pub fn from_password(password: &str) -> CommonResult<Self> {
        Self::from_password_with_salt(password, None)
    }

    /// Derive a key from a passphrase and an existing salt.
    pub fn from_password_with_salt(password: &str, salt: Option<&str>) -> CommonResult<Self> {
        let salt = match salt {
            Some(existing) => SaltString::from_b64(existing)
                .map_err(|e| CommonError::Crypto(format!("invalid password salt: {e}")))?,
            None => SaltString::generate(OsRng),
        };

        let mut key = vec![0u8; 32];
        Argon2::default()
            .hash_password_into(password.as_bytes(), salt.as_str().as_bytes(), &mut key)
            .map_err(|e| CommonError::Crypto(format!("key derivation failed: {e}")))?;

        let mut service = Self::new(key)?;
        service.password_salt = Some(salt.to_string());
        Ok(service)
    }

    /// Generate a random 32-byte symmetric key.
    pub fn generate_key() -> Vec<u8> {
        let mut key = vec![0u8; 32];
        OsRng.fill_bytes(&mut key);
        key
    }

    /// Encrypt bytes into an [`EncryptedData`] envelope.
    pub fn encrypt(&self, data: &[u8]) -> CommonResult<EncryptedData> {
        let nonce_bytes = Self::generate_nonce();
        let ciphertext = self
            .cipher
            .encrypt(&Nonce::from(nonce_bytes), data)
            .map_err(|e| CommonError::Crypto(format!("encryption failed: {e}")))?;

        Ok(EncryptedData {
            nonce: nonce_bytes.to_vec(),
            ciphertext,
            salt: self.password_salt.clone(),
            algorithm: ALGORITHM.to_string(),
        })
    }

    /// Decrypt an [`EncryptedData`] envelope back into raw bytes.
    pub fn decrypt(&self, encrypted: &EncryptedData) -> CommonResult<Vec<u8>> {
        if encrypted.algorithm != ALGORITHM {
            return Err(CommonError::Crypto(format!(
                "unsupported algorithm: {}",
                encrypted.algorithm
            )));
        }

        let nonce_array: [u8; 12] = encrypted.nonce.as_slice().try_into().map_err(|_| {
            CommonError::Crypto("nonce must be exactly 12 bytes for AES-256-GCM".to_string())
        })?;

        self.cipher
            .decrypt(&Nonce::from(nonce_array), encrypted.ciphertext.as_ref())
            .map_err(|e| CommonError::Crypto(format!("decryption failed: {e}")))
    }

    /// Encrypt bytes and encode the envelope as a base64 string.
    pub fn encrypt_to_string(&self, data: &[u8]) -> CommonResult<String> {
        let encrypted = self.encrypt(data)?;
        let serialized = serde_json::to_vec(&encrypted)?;
        Ok(BASE64.encode(serialized))
    }

    /// Decode a base64 string and decrypt the contained envelope.
    pub fn decrypt_from_string(&self, encrypted_str: &str) -> CommonResult<Vec<u8>> {
        let decoded = BASE64
            .decode(encrypted_str)
            .map_err(|e| CommonError::Format(format!("base64 decode failed: {e}")))?;
        let encrypted: EncryptedData = serde_json::from_slice(&decoded)
            .map_err(|e| CommonError::Format(format!("not an encrypted envelope: {e}")))?;
        self.decrypt(&encrypted)
    }

    /// Replace the current key, e.g. on operator-driven rotation.
    pub fn rotate_key(&mut self, new_key: Vec<u8>) -> CommonResult<()> {
        if new_key.len() != 32 {
            return Err(CommonError::Crypto(
                "new encryption key must be exactly 32 bytes".to_string(),
            ));
        }

        let cipher = Aes256Gcm::new_from_slice(&new_key)
            .map_err(|e| CommonError::Crypto(format!("failed to create cipher: {e}")))?;

        self.key = new_key;
        self.cipher = cipher;
        self.password_salt = None;
        Ok(())
    }

    /// Re-encrypt an envelope under a different service's key.
    pub fn reencrypt(
        &self,
        encrypted: &EncryptedData,
        new_service: &EncryptionService,
    ) -> CommonResult<EncryptedData> {
        let decrypted = self.decrypt(encrypted)?;
        new_service.encrypt(&decrypted)
    }

    fn generate_nonce() -> [u8; 12] {
        let mut nonce = [0u8; 12];
        OsRng.fill_bytes(&mut nonce);
        nonce
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_key_has_correct_length() {
        assert_eq!(EncryptionService::generate_key().len(), 32);
    }

    #[test]
    fn new_service_rejects_invalid_key_size() {
        assert!(EncryptionService::new(vec![0; 16]).is_err());
    }

    #[test]
    fn encrypt_and_decrypt_round_trip() {
        let service = EncryptionService::new(EncryptionService::generate_key()).unwrap();

        let plaintext = b"sensitive token";
        let encrypted = service.encrypt(plaintext).unwrap();
        let decrypted = service.decrypt(&encrypted).unwrap();

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn encrypt_to_and_from_string_round_trip() {
        let service = EncryptionService::new(EncryptionService::generate_key()).unwrap();

        let plaintext = b"secure payload";
        let encoded = service.encrypt_to_string(plaintext).unwrap();
        let decoded = service.decrypt_from_string(&encoded).unwrap();

        assert_eq!(decoded, plaintext);
    }

    #[test]
    fn password_derivation_round_trips_with_same_salt() {
        let first = EncryptionService::from_password("correct horse").unwrap();
        let salt = first.password_salt.clone().unwrap();
        let encrypted = first.encrypt(b"payload").unwrap();

        let second =
            EncryptionService::from_password_with_salt("correct horse", Some(&salt)).unwrap();
        assert_eq!(second.decrypt(&encrypted).unwrap(), b"payload");
    }

    #[test]
    fn reencrypt_moves_payload_between_keys() {
        let old = EncryptionService::new(EncryptionService::generate_key()).unwrap();
        let new = EncryptionService::new(EncryptionService::generate_key()).unwrap();

        let encrypted = old.encrypt(b"rotate me").unwrap();
        let reencrypted = old.reencrypt(&encrypted, &new).unwrap();

        assert_eq!(new.decrypt(&reencrypted).unwrap(), b"rotate me");
        assert!(old.decrypt(&reencrypted).is_err());
    }
}
