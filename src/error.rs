//! Error taxonomy for integration and connection operations.
//!
//! Validation errors (`UnknownScheme`, `IncompleteSchemeConfig`,
//! `MissingRequiredParameter`) are caller input defects and are never retried.
//! Terminal activation problems are recorded on the connection as a
//! [`FailureReason`] and surface through `ConnectionFailed`.

use crate::connection::ConnectionStatus;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Why a connection ended up in `FAILED` or `EXPIRED`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    /// Liveness probe rejected the supplied credentials.
    ProbeFailed { reason: String },
    /// Provider reported an error instead of granting access.
    AuthorizationDenied {
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    /// Authorization link was not completed within the window.
    Expired,
    /// Credential vault rejected the write.
    Vault { reason: String },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProbeFailed { reason } => write!(f, "liveness probe failed: {reason}"),
            Self::AuthorizationDenied { error, description } => match description {
                Some(description) => write!(f, "authorization denied: {error} - {description}"),
                None => write!(f, "authorization denied: {error}"),
            },
            Self::Expired => write!(f, "authorization window expired"),
            Self::Vault { reason } => write!(f, "credential vault error: {reason}"),
        }
    }
}

/// Errors returned by registry, integration and connection operations.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectError {
    /// Scheme (or application) is not registered.
    UnknownScheme { application: String, scheme: String },
    /// No integration with this id.
    IntegrationNotFound { id: String },
    /// Interactive scheme configuration lacks required keys.
    IncompleteSchemeConfig { scheme: String, missing: Vec<String> },
    /// A required credential field was not supplied.
    MissingRequiredParameter { field: String },
    /// No connection with this id.
    ConnectionNotFound { id: String },
    /// Connection already left its non-terminal states.
    AlreadyTerminal { id: String, status: ConnectionStatus },
    /// Connection is in a non-terminal state the operation does not accept.
    InvalidState { id: String, status: ConnectionStatus },
    /// Wait elapsed while the connection was still initiated or pending.
    ConnectionTimeout { id: String, waited: Duration },
    /// Connection reached `FAILED` or `EXPIRED`.
    ConnectionFailed { id: String, reason: FailureReason },
    /// Caller cancelled the wait.
    WaitCancelled { id: String },
    /// Credential vault failure.
    Vault { reason: String },
}

impl ConnectError {
    /// Stable machine-readable name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownScheme { .. } => "unknown_scheme",
            Self::IntegrationNotFound { .. } => "integration_not_found",
            Self::IncompleteSchemeConfig { .. } => "incomplete_scheme_config",
            Self::MissingRequiredParameter { .. } => "missing_required_parameter",
            Self::ConnectionNotFound { .. } => "connection_not_found",
            Self::AlreadyTerminal { .. } => "already_terminal",
            Self::InvalidState { .. } => "invalid_state",
            Self::ConnectionTimeout { .. } => "connection_timeout",
            Self::ConnectionFailed { .. } => "connection_failed",
            Self::WaitCancelled { .. } => "wait_cancelled",
            Self::Vault { .. } => "vault",
        }
    }

    pub(crate) fn vault(err: anyhow::Error) -> Self {
        Self::Vault {
            reason: format!("{err:#}"),
        }
    }
}

impl fmt::Display for ConnectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownScheme {
                application,
                scheme,
            } => write!(
                f,
                "scheme '{scheme}' is not registered for application '{application}'"
            ),
            Self::IntegrationNotFound { id } => write!(f, "integration not found: {id}"),
            Self::IncompleteSchemeConfig { scheme, missing } => write!(
                f,
                "incomplete {scheme} configuration, missing: {}",
                missing.join(", ")
            ),
            Self::MissingRequiredParameter { field } => {
                write!(f, "missing required parameter: {field}")
            }
            Self::ConnectionNotFound { id } => write!(f, "connection not found: {id}"),
            Self::AlreadyTerminal { id, status } => {
                write!(f, "connection {id} is already {status}")
            }
            Self::InvalidState { id, status } => {
                write!(f, "connection {id} cannot transition from {status}")
            }
            Self::ConnectionTimeout { id, waited } => write!(
                f,
                "connection {id} did not become active within {:.1}s",
                waited.as_secs_f64()
            ),
            Self::ConnectionFailed { id, reason } => {
                write!(f, "connection {id} failed: {reason}")
            }
            Self::WaitCancelled { id } => write!(f, "wait for connection {id} was cancelled"),
            Self::Vault { reason } => write!(f, "credential vault error: {reason}"),
        }
    }
}

impl std::error::Error for ConnectError {}
