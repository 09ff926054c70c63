//! Integrations: reusable bindings of one application to one scheme.

mod store;


pub use store::IntegrationStore;

use crate::scheme::AuthScheme;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

const REDACTED: &str = "********";

/// Scheme-level configuration (e.g. OAuth client id/secret, scopes).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemeConfig(BTreeMap<String, String>);

impl SchemeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.0.insert(key.to_string(), value.to_string());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Value for `key`, ignoring blank values.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Copy with every secret-looking value masked, for API responses.
    pub fn redacted(&self) -> Self {
        Self(
            self.0
                .iter()
                .map(|(k, v)| {
                    let value = if k.contains("secret") {
                        REDACTED.to_string()
                    } else {
                        v.clone()
                    };
                    (k.clone(), value)
                })
                .collect(),
        )
    }

    /// Space-separated list under `key`; commas are accepted as separators too.
    pub fn list(&self, key: &str) -> Option<Vec<String>> {
        let raw = self.get(key)?;
        Some(
            raw.split(|c: char| c == ',' || c.is_whitespace())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }
}

impl<const N: usize> From<[(&str, &str); N]> for SchemeConfig {
    fn from(pairs: [(&str, &str); N]) -> Self {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

/// A reusable application + scheme configuration.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Integration {
    /// System-generated ID (int_{uuid v7})
    pub id: String,
    /// Application key (e.g. "github")
    pub application: String,
    pub scheme: AuthScheme,
    pub scheme_config: SchemeConfig,
    /// Credentials came from the platform's shared OAuth app
    pub uses_platform_app: bool,
    pub created_at: DateTime<Utc>,
}

impl Integration {
    /// Copy safe to hand out through APIs.
    pub fn redacted(&self) -> Self {
        Self {
            scheme_config: self.scheme_config.redacted(),
            ..self.clone()
        }
    }
}

/// Platform-owned OAuth app credentials, shared by integrations that do not
/// bring their own.
///
/// Looked up in configuration first, then in
/// `AUTHLINK_PLATFORM_<APPLICATION>_<KEY>` environment variables.
#[derive(Clone, Debug, Default)]
pub struct PlatformApps {
    apps: HashMap<String, SchemeConfig>,
    read_env: bool,
}

impl PlatformApps {
    /// Configured apps plus environment lookups.
    pub fn new(apps: HashMap<String, HashMap<String, String>>) -> Self {
        let apps = apps
            .into_iter()
            .map(|(application, values)| {
                (
                    application.to_lowercase(),
                    SchemeConfig(values.into_iter().collect()),
                )
            })
            .collect();
        Self {
            apps,
            read_env: true,
        }
    }

    /// No shared apps at all (tests, or platforms that never share).
    pub fn none() -> Self {
        Self::default()
    }

    /// Shared credentials for the application, if every key is available.
    pub fn lookup(&self, application: &str, keys: &[&str]) -> Option<SchemeConfig> {
        let application = application.to_lowercase();
        let configured = self.apps.get(&application);

        let mut config = SchemeConfig::new();
        for key in keys {
            let value = configured
                .and_then(|c| c.get(key).map(str::to_string))
                .or_else(|| self.from_env(&application, key))?;
            config.insert(*key, value);
        }
        Some(config)
    }

    fn from_env(&self, application: &str, key: &str) -> Option<String> {
        if !self.read_env {
            return None;
        }
        let name = format!(
            "AUTHLINK_PLATFORM_{}_{}",
            application.to_uppercase().replace('-', "_"),
            key.to_uppercase()
        );
        std::env::var(name).ok().filter(|v| !v.trim().is_empty())
    }
}
