//! Credential encryption
//!
//! [`encryption`] holds the AES-256-GCM primitives; [`vault`] layers the
//! credential-format rules (legacy plaintext detection, envelope encoding)
//! on top of them.

pub mod encryption;
pub mod vault;

pub use encryption::{EncryptedData, EncryptionService};
pub use vault::{CredentialVault, DecryptedCredential};
