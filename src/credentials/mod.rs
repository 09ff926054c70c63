//! Credential vault: opaque storage for resolved connection credentials.
//!
//! The connection core never keeps secrets on a `Connection`; it stores the
//! credential map here and keeps only the returned [`CredentialRef`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │       ConnectionOrchestrator             │
//! │  - store(secrets) → CredentialRef        │
//! └─────────────────────────────────────────┘
//!          ↓                    ↑
//! ┌─────────────────────────────────────────┐
//! │       CredentialVault (trait)            │
//! │  - MemoryVault (DashMap)                 │
//! │  - SqliteVault (AES-256-GCM at rest)     │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use authlink::credentials::{CredentialVault, SecretMap, SqliteVault};
//!
//! # fn main() -> anyhow::Result<()> {
//! let encryption_key = std::env::var("AUTHLINK_ENCRYPTION_KEY")?;
//! let vault = SqliteVault::new("credentials.db", &encryption_key)?;
//!
//! let mut secrets = SecretMap::new();
//! secrets.insert("api_key".to_string(), "sk_live_123".to_string());
//! let credential_ref = vault.store(&secrets)?;
//!
//! let resolved = vault.resolve(&credential_ref)?;
//! assert_eq!(resolved, Some(secrets));
//! # Ok(())
//! # }
//! ```

use anyhow::Result;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

mod encryption;
mod storage;

pub use encryption::{Cipher, Sealed};
pub use storage::SqliteVault;

/// Field name → value map. Values may be secret.
pub type SecretMap = HashMap<String, String>;

/// Opaque handle to a stored credential map.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialRef(String);

impl CredentialRef {
    /// Generates a fresh, unguessable reference.
    pub fn generate() -> Self {
        Self(format!("cred_{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for CredentialRef {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for CredentialRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Secure storage for credential maps.
///
/// Implementations must be safe for concurrent use; `store` is atomic and
/// durable once it returns.
pub trait CredentialVault: Send + Sync {
    /// Stores a credential map and returns its reference.
    fn store(&self, secrets: &SecretMap) -> Result<CredentialRef>;

    /// Returns the credential map, or `None` if the reference is unknown.
    fn resolve(&self, credential_ref: &CredentialRef) -> Result<Option<SecretMap>>;

    /// Removes a stored credential map. Returns false if it did not exist.
    fn discard(&self, credential_ref: &CredentialRef) -> Result<bool>;
}

/// In-process vault. Contents are lost on restart.
#[derive(Default)]
pub struct MemoryVault {
    entries: DashMap<CredentialRef, SecretMap>,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CredentialVault for MemoryVault {
    fn store(&self, secrets: &SecretMap) -> Result<CredentialRef> {
        let credential_ref = CredentialRef::generate();
        self.entries.insert(credential_ref.clone(), secrets.clone());
        Ok(credential_ref)
    }

    fn resolve(&self, credential_ref: &CredentialRef) -> Result<Option<SecretMap>> {
        Ok(self.entries.get(credential_ref).map(|e| e.value().clone()))
    }

    fn discard(&self, credential_ref: &CredentialRef) -> Result<bool> {
        Ok(self.entries.remove(credential_ref).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secrets() -> SecretMap {
        SecretMap::from([
            ("api_key".to_string(), "sk_test".to_string()),
            ("shop".to_string(), "demo.myshopify.com".to_string()),
        ])
    }

    #[test]
    fn test_memory_vault_store_and_resolve() {
        let vault = MemoryVault::new();
        let credential_ref = vault.store(&secrets()).unwrap();

        assert!(credential_ref.as_str().starts_with("cred_"));
        assert_eq!(vault.resolve(&credential_ref).unwrap(), Some(secrets()));
        assert_eq!(vault.len(), 1);
    }

    #[test]
    fn test_memory_vault_refs_are_unique() {
        let vault = MemoryVault::new();
        let a = vault.store(&secrets()).unwrap();
        let b = vault.store(&secrets()).unwrap();
        assert_ne!(a, b);
        assert_eq!(vault.len(), 2);
    }

    #[test]
    fn test_memory_vault_discard() {
        let vault = MemoryVault::new();
        let credential_ref = vault.store(&secrets()).unwrap();

        assert!(vault.discard(&credential_ref).unwrap());
        assert!(!vault.discard(&credential_ref).unwrap());
        assert_eq!(vault.resolve(&credential_ref).unwrap(), None);
        assert!(vault.is_empty());
    }

    #[test]
    fn test_credential_ref_serializes_as_string() {
        let credential_ref = CredentialRef::from("cred_abc".to_string());
        assert_eq!(serde_json::to_string(&credential_ref).unwrap(), "\"cred_abc\"");
    }
}
