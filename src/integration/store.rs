use super::{Integration, PlatformApps, SchemeConfig};
use crate::error::ConnectError;
use crate::scheme::{AuthScheme, SchemeRegistry};
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Holds integration configurations.
pub struct IntegrationStore {
    integrations: DashMap<String, Integration>,
    registry: Arc<SchemeRegistry>,
    platform_apps: PlatformApps,
}

impl IntegrationStore {
    pub fn new(registry: Arc<SchemeRegistry>, platform_apps: PlatformApps) -> Self {
        Self {
            integrations: DashMap::new(),
            registry,
            platform_apps,
        }
    }

    /// Creates an integration after validating the scheme configuration.
    ///
    /// Interactive schemes need their credential keys (e.g. `client_id` and
    /// `client_secret`) and a resolvable authorization URL. When the supplied
    /// config carries none of the credential keys, the platform's shared app
    /// is used if one exists. Partially supplied credentials are rejected.
    pub fn create(
        &self,
        application: &str,
        scheme: AuthScheme,
        scheme_config: SchemeConfig,
    ) -> Result<Integration, ConnectError> {
        let spec = self.registry.supports(application, scheme)?;

        let (scheme_config, uses_platform_app) = if scheme.interactive() {
            let (mut config, shared) = self.complete_credentials(application, scheme, scheme_config)?;

            if !config.contains("authorization_url") {
                let endpoints = spec.endpoints(scheme).ok_or_else(|| {
                    ConnectError::IncompleteSchemeConfig {
                        scheme: scheme.to_string(),
                        missing: vec!["authorization_url".to_string()],
                    }
                })?;
                config.insert("authorization_url", endpoints.authorization_url.clone());
            }
            (config, shared)
        } else {
            (scheme_config, false)
        };

        let integration = Integration {
            id: format!("int_{}", Uuid::now_v7().simple()),
            application: spec.name.clone(),
            scheme,
            scheme_config,
            uses_platform_app,
            created_at: Utc::now(),
        };

        self.integrations
            .insert(integration.id.clone(), integration.clone());

        info!(
            integration_id = %integration.id,
            application = %integration.application,
            scheme = %scheme,
            uses_platform_app,
            "Integration created"
        );

        Ok(integration)
    }

    fn complete_credentials(
        &self,
        application: &str,
        scheme: AuthScheme,
        config: SchemeConfig,
    ) -> Result<(SchemeConfig, bool), ConnectError> {
        let required = scheme.config_fields();
        let missing: Vec<String> = required
            .iter()
            .filter(|key| !config.contains(key))
            .map(|key| key.to_string())
            .collect();

        if missing.is_empty() {
            return Ok((config, false));
        }

        if missing.len() == required.len() {
            if let Some(shared) = self.platform_apps.lookup(application, required) {
                debug!(application = %application, scheme = %scheme, "Using platform OAuth app");
                let mut merged = config;
                for key in required {
                    if let Some(value) = shared.get(key) {
                        merged.insert(*key, value);
                    }
                }
                return Ok((merged, true));
            }
        }

        Err(ConnectError::IncompleteSchemeConfig {
            scheme: scheme.to_string(),
            missing,
        })
    }

    pub fn get(&self, id: &str) -> Result<Integration, ConnectError> {
        self.integrations
            .get(id)
            .map(|i| i.clone())
            .ok_or_else(|| ConnectError::IntegrationNotFound { id: id.to_string() })
    }

    /// All integrations, oldest first.
    pub fn list(&self) -> Vec<Integration> {
        let mut all: Vec<Integration> = self.integrations.iter().map(|i| i.clone()).collect();
        all.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        all
    }

    pub fn count(&self) -> usize {
        self.integrations.len()
    }
}
