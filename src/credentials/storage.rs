//! Encrypted credential vault backed by SQLite.

use super::{encryption::Cipher, encryption::Sealed, CredentialRef, CredentialVault, SecretMap};
use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection as Db, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Credential vault persisting sealed credential maps in SQLite.
///
/// # Schema
/// ```sql
/// CREATE TABLE credentials (
///     credential_ref TEXT PRIMARY KEY,
///     payload TEXT NOT NULL,        -- Encrypted JSON of the credential map
///     payload_nonce TEXT NOT NULL,  -- Nonce for payload
///     created_at TEXT NOT NULL      -- ISO 8601 timestamp
/// );
/// ```
///
/// The whole map is sealed as one payload, so field names are not visible at
/// rest either. The SQLite handle is serialized behind a mutex.
pub struct SqliteVault {
    db: Mutex<Db>,
    cipher: Cipher,
}

impl SqliteVault {
    /// Creates or opens a vault.
    ///
    /// # Arguments
    /// * `db_path` - Path to SQLite database file (`:memory:` for tests)
    /// * `encryption_key` - Base64-encoded 32-byte master key
    pub fn new<P: AsRef<Path>>(db_path: P, encryption_key: &str) -> Result<Self> {
        let cipher = Cipher::from_base64(encryption_key).context("Invalid encryption key")?;

        let db = Db::open(db_path).context("Failed to open credential database")?;
        db.execute(
            r#"
            CREATE TABLE IF NOT EXISTS credentials (
                credential_ref TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                payload_nonce TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
            [],
        )
        .context("Failed to create credentials table")?;

        Ok(Self {
            db: Mutex::new(db),
            cipher,
        })
    }

    fn db(&self) -> MutexGuard<'_, Db> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of stored credential maps.
    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .db()
            .query_row("SELECT COUNT(*) FROM credentials", [], |row| row.get(0))
            .context("Failed to count credentials")?;
        Ok(count as usize)
    }
}

impl CredentialVault for SqliteVault {
    fn store(&self, secrets: &SecretMap) -> Result<CredentialRef> {
        let payload = serde_json::to_vec(secrets).context("Failed to encode credentials")?;
        let sealed = self
            .cipher
            .seal(&payload)
            .context("Failed to encrypt credentials")?;

        let credential_ref = CredentialRef::generate();
        self.db()
            .execute(
                r#"
                INSERT INTO credentials (credential_ref, payload, payload_nonce, created_at)
                VALUES (?1, ?2, ?3, ?4)
                "#,
                params![
                    credential_ref.as_str(),
                    sealed.ciphertext,
                    sealed.nonce,
                    Utc::now().to_rfc3339(),
                ],
            )
            .context("Failed to store credentials")?;

        Ok(credential_ref)
    }

    fn resolve(&self, credential_ref: &CredentialRef) -> Result<Option<SecretMap>> {
        let sealed = self
            .db()
            .query_row(
                "SELECT payload, payload_nonce FROM credentials WHERE credential_ref = ?1",
                params![credential_ref.as_str()],
                |row| {
                    Ok(Sealed {
                        ciphertext: row.get(0)?,
                        nonce: row.get(1)?,
                    })
                },
            )
            .optional()
            .context("Failed to read credentials")?;

        let Some(sealed) = sealed else {
            return Ok(None);
        };

        let payload = self
            .cipher
            .open(&sealed)
            .context("Failed to decrypt credentials")?;
        let secrets = serde_json::from_slice(&payload).context("Stored credentials are corrupt")?;
        Ok(Some(secrets))
    }

    fn discard(&self, credential_ref: &CredentialRef) -> Result<bool> {
        let rows_affected = self
            .db()
            .execute(
                "DELETE FROM credentials WHERE credential_ref = ?1",
                params![credential_ref.as_str()],
            )
            .context("Failed to delete credentials")?;

        Ok(rows_affected > 0)
    }
}
