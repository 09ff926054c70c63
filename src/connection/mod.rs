//! Connection lifecycle.
//!
//! ```text
//!                ┌──────────── interactive ────────────┐
//!                │                                      ↓
//!  INITIATED ────┤                                   PENDING ──→ ACTIVE
//!      │         └── direct (vault + probe) ──→ ACTIVE     │
//!      │                                                   ├──→ FAILED
//!      └──→ FAILED / EXPIRED                               └──→ EXPIRED
//! ```
//!
//! `ACTIVE`, `FAILED` and `EXPIRED` are terminal. Each transition is a
//! compare-and-set on the connection's status under its own lock, so only
//! the first transition out of a non-terminal state wins.

mod authorize;
mod orchestrator;
mod state_manager;
mod store;

#[cfg(test)]
mod tests;

pub use orchestrator::{run_expiry_sweep, ConnectionOrchestrator, OrchestratorSettings};
pub use state_manager::{StateEntry, StateManager};
pub use store::ConnectionStore;

use crate::credentials::{CredentialRef, SecretMap};
use crate::error::FailureReason;
use crate::integration::Integration;
use crate::scheme::{AuthScheme, FieldSpec};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Connection status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionStatus {
    Initiated,
    Pending,
    Active,
    Failed,
    Expired,
}

impl ConnectionStatus {
    /// No further automatic transition happens from a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ConnectionStatus::Active | ConnectionStatus::Failed | ConnectionStatus::Expired
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Initiated => "INITIATED",
            ConnectionStatus::Pending => "PENDING",
            ConnectionStatus::Active => "ACTIVE",
            ConnectionStatus::Failed => "FAILED",
            ConnectionStatus::Expired => "EXPIRED",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The request that created a connection.
///
/// The scheme is copied from the integration at creation time. Secret values
/// are never kept here; only field names and non-secret values are.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConnectionRequest {
    /// System-generated ID (creq_{uuid v7})
    pub id: String,
    pub integration_id: String,
    /// End user on whose behalf the connection is made
    pub entity_id: String,
    pub application: String,
    pub scheme: AuthScheme,
    /// Names of every supplied parameter, sorted
    pub supplied_fields: Vec<String>,
    /// Values of supplied non-secret fields
    pub public_params: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
}

impl ConnectionRequest {
    pub(crate) fn new(
        integration: &Integration,
        entity_id: &str,
        fields: &[FieldSpec],
        params: &SecretMap,
        now: DateTime<Utc>,
    ) -> Self {
        let mut supplied_fields: Vec<String> = params.keys().cloned().collect();
        supplied_fields.sort();

        let public_params = fields
            .iter()
            .filter(|f| !f.secret)
            .filter_map(|f| params.get(&f.name).map(|v| (f.name.clone(), v.clone())))
            .collect();

        Self {
            id: format!("creq_{}", Uuid::now_v7().simple()),
            integration_id: integration.id.clone(),
            entity_id: entity_id.to_string(),
            application: integration.application.clone(),
            scheme: integration.scheme,
            supplied_fields,
            public_params,
            created_at: now,
        }
    }
}

/// A live or in-progress credential binding for one entity.
///
/// Invariants maintained by the transition methods:
/// - `credential_ref` is set iff `status == ACTIVE`
/// - `redirect_url` is set iff the scheme is interactive and `status == PENDING`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    /// System-generated ID (conn_{uuid v7})
    pub id: String,
    pub connection_request_id: String,
    pub integration_id: String,
    pub entity_id: String,
    pub application: String,
    pub scheme: AuthScheme,
    pub status: ConnectionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential_ref: Option<CredentialRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    /// Interactive connections not completed by then become EXPIRED
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization_deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<FailureReason>,
}

impl Connection {
    pub(crate) fn initiated(request: &ConnectionRequest, now: DateTime<Utc>) -> Self {
        Self {
            id: format!("conn_{}", Uuid::now_v7().simple()),
            connection_request_id: request.id.clone(),
            integration_id: request.integration_id.clone(),
            entity_id: request.entity_id.clone(),
            application: request.application.clone(),
            scheme: request.scheme,
            status: ConnectionStatus::Initiated,
            credential_ref: None,
            redirect_url: None,
            authorization_deadline: None,
            created_at: now,
            updated_at: now,
            activated_at: None,
            last_error: None,
        }
    }

    pub(crate) fn await_authorization(&mut self, redirect_url: String, deadline: DateTime<Utc>) {
        self.status = ConnectionStatus::Pending;
        self.redirect_url = Some(redirect_url);
        self.authorization_deadline = Some(deadline);
        self.updated_at = Utc::now();
    }

    pub(crate) fn activate(&mut self, credential_ref: CredentialRef) {
        let now = Utc::now();
        self.status = ConnectionStatus::Active;
        self.credential_ref = Some(credential_ref);
        self.redirect_url = None;
        self.activated_at = Some(now);
        self.updated_at = now;
    }

    pub(crate) fn fail(&mut self, reason: FailureReason) {
        self.status = ConnectionStatus::Failed;
        self.credential_ref = None;
        self.redirect_url = None;
        self.last_error = Some(reason);
        self.updated_at = Utc::now();
    }

    pub(crate) fn expire(&mut self) {
        self.status = ConnectionStatus::Expired;
        self.credential_ref = None;
        self.redirect_url = None;
        self.last_error = Some(FailureReason::Expired);
        self.updated_at = Utc::now();
    }

    /// Whether an interactive connection is past its authorization deadline.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.status.is_terminal() && self.authorization_deadline.is_some_and(|d| now > d)
    }
}

/// What the external callback receiver reports for an interactive connection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ProviderCredential {
    /// Provider granted access; `credentials` holds the issued tokens.
    Granted { credentials: SecretMap },
    /// Provider (or end user) refused.
    Denied {
        error: String,
        #[serde(default)]
        description: Option<String>,
    },
}

impl ProviderCredential {
    /// OAuth 2.0 grant carrying only an access token.
    pub fn access_token(token: &str) -> Self {
        Self::Granted {
            credentials: SecretMap::from([("access_token".to_string(), token.to_string())]),
        }
    }
}
