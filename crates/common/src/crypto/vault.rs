//! Credential vault with legacy-format migration
//!
//! Historically the external API token was stored as 40 hexadecimal
//! characters of plaintext. Current storage is an AES-256-GCM envelope.
//! [`CredentialVault::decrypt`] accepts both: a legacy-shaped value is
//! returned unchanged with `legacy: true` so the caller re-encrypts and
//! persists it. The vault itself is side-effect-free.

use crate::error::{CommonError, CommonResult};

use super::encryption::EncryptionService;

const LEGACY_TOKEN_LEN: usize = 40;

/// Outcome of decrypting a stored credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptedCredential {
    /// The plaintext API token
    pub api_token: String,
    /// True when the stored value was legacy plaintext and should be
    /// re-encrypted and persisted by the caller
    pub legacy: bool,
}

/// Vault for the user's external-API credential.
pub struct CredentialVault {
    service: EncryptionService,
}

impl CredentialVault {
    /// Build a vault from a raw 32-byte key.
    pub fn new(key: Vec<u8>) -> CommonResult<Self> {
        Ok(Self { service: EncryptionService::new(key)? })
    }

    /// Build a vault from an operator passphrase.
    pub fn from_password(password: &str) -> CommonResult<Self> {
        Ok(Self { service: EncryptionService::from_password(password)? })
    }

    /// Encrypt a plaintext token into a storable envelope string.
    ///
    /// A fresh nonce per call means equal tokens never produce equal
    /// envelopes.
    pub fn encrypt(&self, plaintext: &str) -> CommonResult<String> {
        if plaintext.is_empty() {
            return Err(CommonError::InvalidInput("credential must not be empty".to_string()));
        }
        self.service.encrypt_to_string(plaintext.as_bytes())
    }

    /// Decrypt a stored credential, accepting both storage formats.
    pub fn decrypt(&self, stored: &str) -> CommonResult<DecryptedCredential> {
        if stored.is_empty() {
            return Err(CommonError::InvalidInput("stored credential is empty".to_string()));
        }

        if is_legacy_token(stored) {
            return Ok(DecryptedCredential { api_token: stored.to_string(), legacy: true });
        }

        let plaintext = self.service.decrypt_from_string(stored)?;
        let api_token = String::from_utf8(plaintext)
            .map_err(|_| CommonError::Format("decrypted credential is not UTF-8".to_string()))?;

        Ok(DecryptedCredential { api_token, legacy: false })
    }
}

/// Whether a stored value has the legacy plaintext shape: exactly 40
/// hexadecimal characters.
pub fn is_legacy_token(value: &str) -> bool {
    value.len() == LEGACY_TOKEN_LEN && value.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEGACY: &str = "0123456789abcdef0123456789abcdef01234567";

    fn vault() -> CredentialVault {
        CredentialVault::new(EncryptionService::generate_key()).unwrap()
    }

    #[test]
    fn round_trip_restores_plaintext() {
        let vault = vault();
        let envelope = vault.encrypt("my-secret-api-token").unwrap();
        let decrypted = vault.decrypt(&envelope).unwrap();

        assert_eq!(decrypted.api_token, "my-secret-api-token");
        assert!(!decrypted.legacy);
    }

    #[test]
    fn equal_plaintexts_decrypt_equally_across_calls() {
        // Envelopes differ per call (fresh nonce), so compare the
        // decrypted values, never the envelopes themselves.
        let vault = vault();
        let first = vault.encrypt("token").unwrap();
        let second = vault.encrypt("token").unwrap();

        assert_eq!(vault.decrypt(&first).unwrap().api_token, "token");
        assert_eq!(vault.decrypt(&second).unwrap().api_token, "token");
    }

    #[test]
    fn legacy_token_passes_through_unchanged() {
        let decrypted = vault().decrypt(LEGACY).unwrap();
        assert_eq!(decrypted.api_token, LEGACY);
        assert!(decrypted.legacy);
    }

    #[test]
    fn legacy_detection_requires_exact_shape() {
        assert!(is_legacy_token(LEGACY));
        assert!(is_legacy_token(&LEGACY.to_uppercase()));
        assert!(!is_legacy_token(&LEGACY[..39]));
        assert!(!is_legacy_token(&format!("{LEGACY}0")));
        assert!(!is_legacy_token("g123456789abcdef0123456789abcdef01234567"));
    }

    #[test]
    fn malformed_non_legacy_input_is_a_format_error() {
        let err = vault().decrypt("definitely-not-an-envelope").unwrap_err();
        assert!(matches!(err, CommonError::Format(_)));
    }

    #[test]
    fn empty_inputs_are_rejected() {
        let vault = vault();
        assert!(vault.encrypt("").is_err());
        assert!(vault.decrypt("").is_err());
    }
}
