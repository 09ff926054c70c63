//! Process-wide, read-only scheme registry.
//!
//! Built once at startup from the built-in catalog plus configured
//! applications, then shared by reference (`Arc<SchemeRegistry>`).

use super::{builtin_applications, AuthScheme, FieldSpec};
use crate::error::ConnectError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Provider authorization endpoints for interactive schemes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OAuthEndpoints {
    /// Authorization page the end user is redirected to
    pub authorization_url: String,

    /// Token endpoint (used by the callback receiver, not by the core)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_url: Option<String>,

    /// Default scopes requested when the integration does not set its own
    #[serde(default)]
    pub scopes: Vec<String>,
}

/// Registry entry for one application.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApplicationSpec {
    /// Application key (lowercase, e.g. "github")
    pub name: String,

    /// Schemes the application accepts
    pub schemes: Vec<AuthScheme>,

    /// Authorization endpoints per interactive scheme
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub oauth: BTreeMap<AuthScheme, OAuthEndpoints>,

    /// Application-specific field lists replacing the scheme defaults
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub field_overrides: BTreeMap<AuthScheme, Vec<FieldSpec>>,

    /// Liveness probe URL per scheme
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub probes: BTreeMap<AuthScheme, String>,
}

impl ApplicationSpec {
    pub fn new(name: &str, schemes: &[AuthScheme]) -> Self {
        Self {
            name: name.to_string(),
            schemes: schemes.to_vec(),
            oauth: BTreeMap::new(),
            field_overrides: BTreeMap::new(),
            probes: BTreeMap::new(),
        }
    }

    pub fn with_oauth(
        mut self,
        scheme: AuthScheme,
        authorization_url: &str,
        token_url: &str,
        scopes: &[&str],
    ) -> Self {
        self.oauth.insert(
            scheme,
            OAuthEndpoints {
                authorization_url: authorization_url.to_string(),
                token_url: Some(token_url.to_string()),
                scopes: scopes.iter().map(|s| s.to_string()).collect(),
            },
        );
        self
    }

    pub fn with_fields(mut self, scheme: AuthScheme, fields: Vec<FieldSpec>) -> Self {
        self.field_overrides.insert(scheme, fields);
        self
    }

    pub fn with_probe(mut self, scheme: AuthScheme, url: &str) -> Self {
        self.probes.insert(scheme, url.to_string());
        self
    }

    pub fn supports(&self, scheme: AuthScheme) -> bool {
        self.schemes.contains(&scheme)
    }

    /// Endpoints declared for `scheme`, if any.
    pub fn endpoints(&self, scheme: AuthScheme) -> Option<&OAuthEndpoints> {
        self.oauth.get(&scheme)
    }
}

/// Catalog of applications and the schemes each accepts.
#[derive(Debug, Default)]
pub struct SchemeRegistry {
    applications: HashMap<String, ApplicationSpec>,
}

impl SchemeRegistry {
    /// Registry containing exactly the given applications.
    pub fn new(specs: impl IntoIterator<Item = ApplicationSpec>) -> Self {
        let applications = specs
            .into_iter()
            .map(|spec| (spec.name.to_lowercase(), spec))
            .collect();
        Self { applications }
    }

    /// Registry with the built-in application catalog.
    pub fn builtin() -> Self {
        Self::new(builtin_applications())
    }

    /// Built-in catalog extended with configured applications.
    ///
    /// A configured entry replaces the built-in entry of the same name.
    pub fn with_applications(extra: impl IntoIterator<Item = ApplicationSpec>) -> Self {
        let mut registry = Self::builtin();
        for spec in extra {
            let key = spec.name.to_lowercase();
            if registry.applications.contains_key(&key) {
                debug!(application = %key, "Configured application replaces built-in entry");
            }
            registry.applications.insert(key, spec);
        }
        registry
    }

    /// Looks up an application entry.
    pub fn application(&self, application: &str) -> Option<&ApplicationSpec> {
        self.applications.get(&application.to_lowercase())
    }

    /// Returns the application entry if it accepts `scheme`.
    pub fn supports(
        &self,
        application: &str,
        scheme: AuthScheme,
    ) -> Result<&ApplicationSpec, ConnectError> {
        self.application(application)
            .filter(|spec| spec.supports(scheme))
            .ok_or_else(|| ConnectError::UnknownScheme {
                application: application.to_string(),
                scheme: scheme.to_string(),
            })
    }

    /// Scheme default fields for a registered (application, scheme) pair.
    ///
    /// Application overrides are applied by the parameter resolver, not here.
    pub fn required_fields(
        &self,
        application: &str,
        scheme: AuthScheme,
    ) -> Result<Vec<FieldSpec>, ConnectError> {
        self.supports(application, scheme)?;
        Ok(scheme.default_fields())
    }

    pub fn is_interactive(&self, scheme: AuthScheme) -> bool {
        scheme.interactive()
    }

    /// Probe URL for the pair, if the application declares one.
    pub fn probe_target(&self, application: &str, scheme: AuthScheme) -> Option<&str> {
        self.application(application)?
            .probes
            .get(&scheme)
            .map(String::as_str)
    }

    /// All application entries, sorted by name.
    pub fn applications(&self) -> Vec<&ApplicationSpec> {
        let mut specs: Vec<_> = self.applications.values().collect();
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        specs
    }

    pub fn count(&self) -> usize {
        self.applications.len()
    }
}
