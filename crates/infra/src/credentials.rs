//! Credential storage bridging the vault and the user repository.
//!
//! The vault itself is side-effect-free; this store owns the persistence
//! half of the legacy migration: when a stored credential turns out to be
//! legacy plaintext, the decrypted token is re-encrypted and written back
//! before it is handed to the caller.

use std::sync::Arc;

use my500_common::crypto::CredentialVault;
use my500_core::UserRepository;
use my500_domain::{My500Error, Result, User};
use tracing::info;

use crate::errors::InfraError;

pub struct CredentialStore {
    vault: CredentialVault,
    users: Arc<dyn UserRepository>,
}

impl CredentialStore {
    pub fn new(vault: CredentialVault, users: Arc<dyn UserRepository>) -> Self {
        Self { vault, users }
    }

    /// Build the store from an operator passphrase.
    pub fn from_password(password: &str, users: Arc<dyn UserRepository>) -> Result<Self> {
        let vault = CredentialVault::from_password(password)
            .map_err(|err| My500Error::from(InfraError::from(err)))?;
        Ok(Self { vault, users })
    }

    /// Encrypt and persist a new API token for the user.
    pub async fn store_token(&self, user: &User, plaintext: &str) -> Result<()> {
        let envelope =
            self.vault.encrypt(plaintext).map_err(|err| My500Error::from(InfraError::from(err)))?;
        self.users.set_encrypted_api_token(user.id, &envelope).await
    }

    /// Decrypt the user's stored API token.
    ///
    /// Legacy plaintext values are migrated in the same call: the token is
    /// re-encrypted into an envelope and persisted before being returned.
    /// Decryption failures surface as credential errors; the stored value
    /// is unusable either way.
    pub async fn resolve_token(&self, user: &User) -> Result<String> {
        let stored = user.encrypted_api_token.as_deref().ok_or_else(|| {
            My500Error::Credential(format!("user {} has no stored api token", user.id))
        })?;

        let decrypted = self.vault.decrypt(stored).map_err(|err| match err {
            my500_common::CommonError::Crypto(msg) => {
                My500Error::Credential(format!("stored credential is undecryptable: {msg}"))
            }
            other => My500Error::from(InfraError::from(other)),
        })?;

        if decrypted.legacy {
            let envelope = self
                .vault
                .encrypt(&decrypted.api_token)
                .map_err(|err| My500Error::from(InfraError::from(err)))?;
            self.users.set_encrypted_api_token(user.id, &envelope).await?;
            info!(user_id = %user.id, "migrated legacy plaintext credential to envelope");
        }

        Ok(decrypted.api_token)
    }
}
