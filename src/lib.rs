// HTTP API
pub mod api;

// Configuration loading
pub mod config;

// Connection lifecycle state machine
pub mod connection;

// Credential vault
pub mod credentials;

pub mod error;

// Integration configurations
pub mod integration;

pub mod platform;

// Liveness probes for non-interactive schemes
pub mod probe;

// Required-field resolution
pub mod resolver;

// Auth schemes and the application registry
pub mod scheme;

// Waiting for activation
pub mod watcher;

pub use connection::{Connection, ConnectionStatus, ProviderCredential};
pub use error::{ConnectError, FailureReason};
pub use integration::{Integration, SchemeConfig};
pub use platform::Platform;
pub use scheme::{AuthScheme, FieldSpec, Placement};
