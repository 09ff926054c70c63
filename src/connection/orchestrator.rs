use super::authorize::{provider_fields, redirect_url};
use super::{
    Connection, ConnectionRequest, ConnectionStatus, ConnectionStore, ProviderCredential,
    StateManager,
};
use crate::credentials::{CredentialRef, CredentialVault, SecretMap};
use crate::error::{ConnectError, FailureReason};
use crate::integration::{Integration, IntegrationStore};
use crate::probe::{LivenessProbe, ProbeOutcome, ProbeRequest};
use crate::resolver::ParameterResolver;
use crate::scheme::{AuthScheme, FieldSpec};
use chrono::{Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Tunables for the orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Public base URL the provider redirects back to
    pub callback_base_url: String,
    /// How long an interactive connection may stay pending
    pub authorization_window: Duration,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            callback_base_url: "http://localhost:3000".to_string(),
            authorization_window: Duration::seconds(600),
        }
    }
}

/// Drives connections through their lifecycle.
///
/// All status changes go through [`ConnectionStore::transition`], so
/// concurrent completions of the same connection are serialized and only
/// the first one out of a non-terminal status takes effect.
pub struct ConnectionOrchestrator {
    integrations: Arc<IntegrationStore>,
    resolver: Arc<ParameterResolver>,
    connections: Arc<ConnectionStore>,
    vault: Arc<dyn CredentialVault>,
    probe: Arc<dyn LivenessProbe>,
    states: StateManager,
    /// Supplied params of pending interactive connections, merged into the
    /// stored credential on completion
    pending_params: DashMap<String, SecretMap>,
    settings: OrchestratorSettings,
}

fn is_blank(params: &SecretMap, name: &str) -> bool {
    params.get(name).map_or(true, |v| v.trim().is_empty())
}

impl ConnectionOrchestrator {
    pub fn new(
        integrations: Arc<IntegrationStore>,
        resolver: Arc<ParameterResolver>,
        connections: Arc<ConnectionStore>,
        vault: Arc<dyn CredentialVault>,
        probe: Arc<dyn LivenessProbe>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            integrations,
            resolver,
            connections,
            vault,
            probe,
            states: StateManager::new(settings.authorization_window),
            pending_params: DashMap::new(),
            settings,
        }
    }

    pub fn connections(&self) -> &Arc<ConnectionStore> {
        &self.connections
    }

    pub fn states(&self) -> &StateManager {
        &self.states
    }

    /// Start a new connection for `entity_id` under an integration.
    ///
    /// Every call creates a fresh request/connection pair, even when the
    /// entity already has an active connection for the same integration.
    ///
    /// # Arguments
    /// * `integration_id` - Integration to connect through
    /// * `entity_id` - End user the connection belongs to
    /// * `params` - User-supplied credential fields
    ///
    /// # Returns
    /// The connection as `PENDING` (interactive schemes), `ACTIVE`, or
    /// `FAILED` when the probe rejects the credentials or the vault fails.
    pub async fn initiate(
        &self,
        integration_id: &str,
        entity_id: &str,
        params: SecretMap,
    ) -> Result<Connection, ConnectError> {
        let integration = self.integrations.get(integration_id)?;
        let fields = self
            .resolver
            .resolve(&integration.application, integration.scheme)?;

        if let Some(missing) = fields.iter().find(|f| is_blank(&params, &f.name)) {
            return Err(ConnectError::MissingRequiredParameter {
                field: missing.name.clone(),
            });
        }

        let now = Utc::now();
        let request = ConnectionRequest::new(&integration, entity_id, &fields, &params, now);
        let connection = Connection::initiated(&request, now);
        let connection_id = connection.id.clone();

        info!(
            connection_id = %connection_id,
            integration_id = %integration.id,
            entity_id = %entity_id,
            application = %integration.application,
            scheme = %integration.scheme,
            "Connection initiated"
        );

        self.connections.insert(request, connection);

        if integration.scheme.interactive() {
            self.await_authorization(&integration, &connection_id, params)
        } else {
            self.activate_direct(&integration, &connection_id, &fields, params)
                .await
        }
    }

    fn await_authorization(
        &self,
        integration: &Integration,
        connection_id: &str,
        params: SecretMap,
    ) -> Result<Connection, ConnectError> {
        let state = self.states.create_state(connection_id);
        let url = redirect_url(
            integration,
            self.resolver.registry().application(&integration.application),
            &self.settings.callback_base_url,
            &state,
        );
        let deadline = Utc::now() + self.settings.authorization_window;

        self.pending_params.insert(connection_id.to_string(), params);
        let connection = self.connections.transition(
            connection_id,
            &[ConnectionStatus::Initiated],
            |c| c.await_authorization(url, deadline),
        )?;

        info!(
            connection_id = %connection_id,
            deadline = %deadline,
            "Awaiting interactive authorization"
        );
        Ok(connection)
    }

    async fn activate_direct(
        &self,
        integration: &Integration,
        connection_id: &str,
        fields: &[FieldSpec],
        params: SecretMap,
    ) -> Result<Connection, ConnectError> {
        let registry = self.resolver.registry();

        if integration.scheme != AuthScheme::NoAuth {
            if let Some(url) = registry.probe_target(&integration.application, integration.scheme)
            {
                let request = ProbeRequest {
                    application: &integration.application,
                    scheme: integration.scheme,
                    url,
                    fields,
                    credentials: &params,
                };
                if let ProbeOutcome::Rejected(reason) = self.probe.probe(&request).await {
                    warn!(
                        connection_id = %connection_id,
                        reason = %reason,
                        "Liveness probe rejected credentials"
                    );
                    return self.connections.transition(
                        connection_id,
                        &[ConnectionStatus::Initiated],
                        |c| c.fail(FailureReason::ProbeFailed { reason }),
                    );
                }
            }
        }

        // The vault may do blocking I/O
        let vault = Arc::clone(&self.vault);
        let stored = tokio::task::spawn_blocking(move || vault.store(&params))
            .await
            .unwrap_or_else(|e| Err(anyhow::anyhow!("vault task failed: {e}")));

        let credential_ref = match stored {
            Ok(credential_ref) => credential_ref,
            Err(e) => {
                error!(
                    connection_id = %connection_id,
                    error = %e,
                    "Failed to store credentials"
                );
                let reason = format!("{e:#}");
                return self.connections.transition(
                    connection_id,
                    &[ConnectionStatus::Initiated],
                    |c| c.fail(FailureReason::Vault { reason }),
                );
            }
        };

        let connection =
            self.commit_activation(connection_id, ConnectionStatus::Initiated, credential_ref)?;
        info!(connection_id = %connection_id, "Connection active");
        Ok(connection)
    }

    /// Moves `from` → ACTIVE, dropping the stored credential if another
    /// transition got there first.
    fn commit_activation(
        &self,
        connection_id: &str,
        from: ConnectionStatus,
        credential_ref: CredentialRef,
    ) -> Result<Connection, ConnectError> {
        let stored = credential_ref.clone();
        let result = self
            .connections
            .transition(connection_id, &[from], |c| c.activate(credential_ref));

        if result.is_err() {
            if let Err(e) = self.vault.discard(&stored) {
                warn!(
                    connection_id = %connection_id,
                    error = %e,
                    "Failed to discard orphaned credential"
                );
            }
        }
        result
    }

    /// Apply the provider's answer to a pending interactive connection.
    ///
    /// Only the first completion takes effect; later calls report
    /// `AlreadyTerminal` and leave the connection unchanged.
    pub fn complete_interactive_auth(
        &self,
        connection_id: &str,
        credential: ProviderCredential,
    ) -> Result<Connection, ConnectError> {
        let snapshot = self.connections.get(connection_id)?;

        if snapshot.status.is_terminal() {
            return Err(ConnectError::AlreadyTerminal {
                id: snapshot.id,
                status: snapshot.status,
            });
        }
        if snapshot.status != ConnectionStatus::Pending {
            return Err(ConnectError::InvalidState {
                id: snapshot.id,
                status: snapshot.status,
            });
        }

        if snapshot.is_overdue(Utc::now()) {
            self.connections.transition(
                connection_id,
                &[ConnectionStatus::Pending],
                Connection::expire,
            )?;
            self.pending_params.remove(connection_id);
            info!(connection_id = %connection_id, "Completion arrived after deadline");
            return Err(ConnectError::ConnectionFailed {
                id: connection_id.to_string(),
                reason: FailureReason::Expired,
            });
        }

        match credential {
            ProviderCredential::Denied { error, description } => {
                let connection = self.connections.transition(
                    connection_id,
                    &[ConnectionStatus::Pending],
                    |c| c.fail(FailureReason::AuthorizationDenied { error, description }),
                )?;
                self.pending_params.remove(connection_id);
                info!(connection_id = %connection_id, "Authorization denied");
                Ok(connection)
            }
            ProviderCredential::Granted { credentials } => {
                if let Some(missing) = provider_fields(snapshot.scheme)
                    .iter()
                    .find(|name| is_blank(&credentials, name))
                {
                    return Err(ConnectError::MissingRequiredParameter {
                        field: missing.to_string(),
                    });
                }

                let mut merged = self
                    .pending_params
                    .get(connection_id)
                    .map(|p| p.value().clone())
                    .unwrap_or_default();
                merged.extend(credentials);

                let credential_ref = self.vault.store(&merged).map_err(ConnectError::vault)?;
                let connection = self.commit_activation(
                    connection_id,
                    ConnectionStatus::Pending,
                    credential_ref,
                )?;
                self.pending_params.remove(connection_id);
                info!(connection_id = %connection_id, "Interactive authorization completed");
                Ok(connection)
            }
        }
    }

    /// Complete the connection an authorization `state` token was issued for.
    pub fn complete_by_state(
        &self,
        state: &str,
        credential: ProviderCredential,
    ) -> Result<Connection, ConnectError> {
        let entry = self.states.resolve(state).ok_or_else(|| {
            debug!(state = %state, "Unknown authorization state");
            ConnectError::ConnectionNotFound {
                id: state.to_string(),
            }
        })?;
        self.complete_interactive_auth(&entry.connection_id, credential)
    }

    pub fn get_connection(&self, connection_id: &str) -> Result<Connection, ConnectError> {
        self.connections.get(connection_id)
    }

    pub fn list_connections(&self, entity_id: &str) -> Vec<Connection> {
        self.connections.list_by_entity(entity_id)
    }

    /// Expire every interactive connection past its authorization deadline.
    ///
    /// Returns how many connections were moved to `EXPIRED`.
    pub fn expire_stale(&self) -> usize {
        let now = Utc::now();
        let mut expired = 0;

        for id in self.connections.overdue(now) {
            let result = self.connections.transition(
                &id,
                &[ConnectionStatus::Initiated, ConnectionStatus::Pending],
                Connection::expire,
            );
            if result.is_ok() {
                self.pending_params.remove(&id);
                info!(connection_id = %id, "Connection expired");
                expired += 1;
            }
        }

        self.states.cleanup_expired();
        expired
    }
}

/// Background task that periodically expires stale interactive connections
pub async fn run_expiry_sweep(orchestrator: Arc<ConnectionOrchestrator>, interval_seconds: u64) {
    let mut interval =
        tokio::time::interval(tokio::time::Duration::from_secs(interval_seconds.max(1)));

    loop {
        interval.tick().await;
        let expired = orchestrator.expire_stale();
        debug!(
            expired,
            states = orchestrator.states().count(),
            "Expiry sweep complete"
        );
    }
}
