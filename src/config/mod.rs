use crate::scheme::ApplicationSpec;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;

/// Environment variable naming the config file
pub const CONFIG_PATH_ENV: &str = "AUTHLINK_CONFIG";

/// Environment variable holding the base64 vault master key
pub const ENCRYPTION_KEY_ENV: &str = "AUTHLINK_ENCRYPTION_KEY";

/// Longest accepted authorization window (7 days)
pub const MAX_WINDOW_SECONDS: u64 = 7 * 24 * 60 * 60;

/// Complete Authlink configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthlinkConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub watcher: WatcherConfig,
    #[serde(default)]
    pub authorization: AuthorizationConfig,
    #[serde(default)]
    pub vault: VaultConfig,
    #[serde(default)]
    pub probe: ProbeConfig,
    /// Shared OAuth app credentials keyed by application
    #[serde(default)]
    pub platform_apps: HashMap<String, HashMap<String, String>>,
    /// Extra registry entries; an entry replaces a built-in one of the same name
    #[serde(default)]
    pub applications: Vec<ApplicationSpec>,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Public base URL providers redirect back to
    #[serde(default = "default_callback_base_url")]
    pub callback_base_url: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_callback_base_url() -> String {
    "http://localhost:3000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            callback_base_url: default_callback_base_url(),
        }
    }
}

/// Activation watcher configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WatcherConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Upper bound accepted for a single wait request
    #[serde(default = "default_max_wait_seconds")]
    pub max_wait_seconds: u64,
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_max_wait_seconds() -> u64 {
    300
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            max_wait_seconds: default_max_wait_seconds(),
        }
    }
}

/// Interactive authorization configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizationConfig {
    /// How long an authorization link stays valid
    #[serde(default = "default_window_seconds")]
    pub window_seconds: u64,
    /// How often overdue connections are expired
    #[serde(default = "default_sweep_interval_seconds")]
    pub sweep_interval_seconds: u64,
}

fn default_window_seconds() -> u64 {
    600
}

fn default_sweep_interval_seconds() -> u64 {
    60
}

impl AuthorizationConfig {
    /// Authorization window as a duration.
    ///
    /// Zero and anything above [`MAX_WINDOW_SECONDS`] are rejected.
    pub fn window(&self) -> Result<chrono::Duration> {
        if self.window_seconds == 0 || self.window_seconds > MAX_WINDOW_SECONDS {
            bail!(
                "authorization.window_seconds must be between 1 and {MAX_WINDOW_SECONDS}, got {}",
                self.window_seconds
            );
        }
        let seconds = i64::try_from(self.window_seconds)
            .context("authorization.window_seconds out of range")?;
        chrono::Duration::try_seconds(seconds)
            .with_context(|| format!("authorization.window_seconds out of range: {seconds}"))
    }
}

impl Default for AuthorizationConfig {
    fn default() -> Self {
        Self {
            window_seconds: default_window_seconds(),
            sweep_interval_seconds: default_sweep_interval_seconds(),
        }
    }
}

/// Credential vault configuration
#[derive(Debug, Clone, Deserialize)]
pub struct VaultConfig {
    #[serde(default = "default_vault_path")]
    pub path: String,
}

fn default_vault_path() -> String {
    "authlink-credentials.db".to_string()
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            path: default_vault_path(),
        }
    }
}

/// Liveness probe configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ProbeConfig {
    #[serde(default = "default_probe_enabled")]
    pub enabled: bool,
    #[serde(default = "default_probe_timeout")]
    pub timeout_seconds: u64,
}

fn default_probe_enabled() -> bool {
    true
}

fn default_probe_timeout() -> u64 {
    10
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            enabled: default_probe_enabled(),
            timeout_seconds: default_probe_timeout(),
        }
    }
}

impl AuthlinkConfig {
    /// Load from `AUTHLINK_CONFIG` (defaults when unset), then apply
    /// environment overrides.
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => load_config(&path)?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply `AUTHLINK_*` overrides. Unparseable values are ignored.
    pub fn apply_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = var("AUTHLINK_BIND_ADDR") {
            self.server.bind_addr = v;
        }
        if let Some(v) = var("AUTHLINK_CALLBACK_BASE_URL") {
            self.server.callback_base_url = v;
        }
        if let Some(v) = var("AUTHLINK_POLL_INTERVAL_MS") {
            if let Ok(n) = v.parse::<u64>() {
                self.watcher.poll_interval_ms = n;
            }
        }
        if let Some(v) = var("AUTHLINK_AUTH_WINDOW_SECONDS") {
            if let Ok(n) = v.parse::<u64>() {
                self.authorization.window_seconds = n;
            }
        }
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> Result<AuthlinkConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {path}"))?;
    let config: AuthlinkConfig =
        toml::from_str(&contents).with_context(|| format!("Failed to parse config file {path}"))?;
    Ok(config)
}
