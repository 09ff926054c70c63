//! Facade wiring registry, stores, orchestrator and watcher together.

use crate::config::AuthlinkConfig;
use crate::connection::{
    Connection, ConnectionOrchestrator, ConnectionStore, OrchestratorSettings, ProviderCredential,
};
use crate::credentials::{CredentialVault, MemoryVault, SecretMap, SqliteVault};
use crate::error::ConnectError;
use crate::integration::{Integration, IntegrationStore, PlatformApps, SchemeConfig};
use crate::probe::{HttpProbe, LivenessProbe, NoProbe};
use crate::resolver::ParameterResolver;
use crate::scheme::{ApplicationSpec, AuthScheme, FieldSpec, SchemeRegistry};
use crate::watcher::{ActivationWatcher, DEFAULT_POLL_INTERVAL};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Assembles a [`Platform`] from its collaborators.
pub struct PlatformBuilder {
    registry: SchemeRegistry,
    platform_apps: PlatformApps,
    vault: Arc<dyn CredentialVault>,
    probe: Arc<dyn LivenessProbe>,
    settings: OrchestratorSettings,
    poll_interval: Duration,
}

impl Default for PlatformBuilder {
    fn default() -> Self {
        Self {
            registry: SchemeRegistry::builtin(),
            platform_apps: PlatformApps::none(),
            vault: Arc::new(MemoryVault::new()),
            probe: Arc::new(NoProbe),
            settings: OrchestratorSettings::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl PlatformBuilder {
    pub fn registry(mut self, registry: SchemeRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn platform_apps(mut self, platform_apps: PlatformApps) -> Self {
        self.platform_apps = platform_apps;
        self
    }

    pub fn vault(mut self, vault: Arc<dyn CredentialVault>) -> Self {
        self.vault = vault;
        self
    }

    pub fn probe(mut self, probe: Arc<dyn LivenessProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn settings(mut self, settings: OrchestratorSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn build(self) -> Platform {
        let registry = Arc::new(self.registry);
        let resolver = Arc::new(ParameterResolver::new(Arc::clone(&registry)));
        let integrations = Arc::new(IntegrationStore::new(
            Arc::clone(&registry),
            self.platform_apps,
        ));
        let connections = Arc::new(ConnectionStore::new());
        let orchestrator = Arc::new(ConnectionOrchestrator::new(
            Arc::clone(&integrations),
            Arc::clone(&resolver),
            Arc::clone(&connections),
            Arc::clone(&self.vault),
            self.probe,
            self.settings,
        ));
        let watcher = ActivationWatcher::new(connections, self.poll_interval);

        Platform {
            registry,
            resolver,
            integrations,
            orchestrator,
            watcher,
            vault: self.vault,
        }
    }
}

/// Connection platform: the entry point for callers.
#[derive(Clone)]
pub struct Platform {
    registry: Arc<SchemeRegistry>,
    resolver: Arc<ParameterResolver>,
    integrations: Arc<IntegrationStore>,
    orchestrator: Arc<ConnectionOrchestrator>,
    watcher: ActivationWatcher,
    vault: Arc<dyn CredentialVault>,
}

impl Platform {
    pub fn builder() -> PlatformBuilder {
        PlatformBuilder::default()
    }

    /// Build from loaded configuration.
    ///
    /// # Arguments
    /// * `config` - Loaded configuration
    /// * `encryption_key` - Base64 vault key; without it credentials are
    ///   kept in memory only
    pub fn from_config(config: &AuthlinkConfig, encryption_key: Option<&str>) -> Result<Self> {
        let authorization_window = config
            .authorization
            .window()
            .context("Invalid authorization window")?;

        let registry = SchemeRegistry::with_applications(config.applications.clone());
        info!(applications = registry.count(), "Scheme registry initialized");

        let vault: Arc<dyn CredentialVault> = match encryption_key {
            Some(key) => {
                let vault = SqliteVault::new(&config.vault.path, key)
                    .context("Failed to initialize credential vault")?;
                info!(path = %config.vault.path, "Credential vault initialized");
                Arc::new(vault)
            }
            None => {
                warn!("AUTHLINK_ENCRYPTION_KEY not set, credentials are kept in memory only");
                Arc::new(MemoryVault::new())
            }
        };

        let probe: Arc<dyn LivenessProbe> = if config.probe.enabled {
            Arc::new(
                HttpProbe::new(Duration::from_secs(config.probe.timeout_seconds))
                    .context("Failed to build probe HTTP client")?,
            )
        } else {
            Arc::new(NoProbe)
        };

        Ok(Self::builder()
            .registry(registry)
            .platform_apps(PlatformApps::new(config.platform_apps.clone()))
            .vault(vault)
            .probe(probe)
            .settings(OrchestratorSettings {
                callback_base_url: config.server.callback_base_url.clone(),
                authorization_window,
            })
            .poll_interval(Duration::from_millis(config.watcher.poll_interval_ms))
            .build())
    }

    pub fn create_integration(
        &self,
        application: &str,
        scheme: AuthScheme,
        scheme_config: SchemeConfig,
    ) -> Result<Integration, ConnectError> {
        self.integrations.create(application, scheme, scheme_config)
    }

    pub fn get_integration(&self, id: &str) -> Result<Integration, ConnectError> {
        self.integrations.get(id)
    }

    pub fn list_integrations(&self) -> Vec<Integration> {
        self.integrations.list()
    }

    /// Fields a caller must supply to connect with this pair, in order.
    pub fn get_auth_scheme_fields(
        &self,
        application: &str,
        scheme: AuthScheme,
    ) -> Result<Vec<FieldSpec>, ConnectError> {
        self.resolver.resolve(application, scheme)
    }

    pub fn applications(&self) -> Vec<&ApplicationSpec> {
        self.registry.applications()
    }

    pub async fn initiate_connection(
        &self,
        integration_id: &str,
        entity_id: &str,
        params: SecretMap,
    ) -> Result<Connection, ConnectError> {
        self.orchestrator
            .initiate(integration_id, entity_id, params)
            .await
    }

    pub fn complete_interactive_auth(
        &self,
        connection_id: &str,
        credential: ProviderCredential,
    ) -> Result<Connection, ConnectError> {
        self.orchestrator
            .complete_interactive_auth(connection_id, credential)
    }

    pub fn complete_by_state(
        &self,
        state: &str,
        credential: ProviderCredential,
    ) -> Result<Connection, ConnectError> {
        self.orchestrator.complete_by_state(state, credential)
    }

    pub async fn wait_until_active(
        &self,
        connection_id: &str,
        timeout: Duration,
    ) -> Result<Connection, ConnectError> {
        self.watcher.wait_until_active(connection_id, timeout).await
    }

    pub async fn wait_until_active_with_cancel(
        &self,
        connection_id: &str,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<Connection, ConnectError> {
        self.watcher
            .wait_until_active_with_cancel(connection_id, timeout, cancel)
            .await
    }

    pub fn get_connection(&self, connection_id: &str) -> Result<Connection, ConnectError> {
        self.orchestrator.get_connection(connection_id)
    }

    pub fn list_connections(&self, entity_id: &str) -> Vec<Connection> {
        self.orchestrator.list_connections(entity_id)
    }

    pub fn orchestrator(&self) -> &Arc<ConnectionOrchestrator> {
        &self.orchestrator
    }

    pub fn vault(&self) -> &Arc<dyn CredentialVault> {
        &self.vault
    }
}
