//! Authentication schemes and the per-application scheme catalog.
//!
//! An [`AuthScheme`] describes how credentials are shaped: which fields a user
//! supplies, whether they are secret, where they are attached to provider
//! requests, and whether an external authorization redirect is needed before
//! the credentials exist at all.

mod catalog;
mod registry;


pub use catalog::builtin_applications;
pub use registry::{ApplicationSpec, OAuthEndpoints, SchemeRegistry};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Supported authentication schemes.
///
/// Serialized by name (`OAUTH2`, `API_KEY`, ...) so schemes can key maps in
/// TOML and JSON documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AuthScheme {
    OAuth2,
    OAuth1,
    ApiKey,
    Basic,
    Bearer,
    BasicWithJwt,
    NoAuth,
}

impl AuthScheme {
    pub const ALL: [AuthScheme; 7] = [
        AuthScheme::OAuth2,
        AuthScheme::OAuth1,
        AuthScheme::ApiKey,
        AuthScheme::Basic,
        AuthScheme::Bearer,
        AuthScheme::BasicWithJwt,
        AuthScheme::NoAuth,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AuthScheme::OAuth2 => "OAUTH2",
            AuthScheme::OAuth1 => "OAUTH1",
            AuthScheme::ApiKey => "API_KEY",
            AuthScheme::Basic => "BASIC",
            AuthScheme::Bearer => "BEARER_TOKEN",
            AuthScheme::BasicWithJwt => "BASIC_WITH_JWT",
            AuthScheme::NoAuth => "NO_AUTH",
        }
    }

    /// Whether activation requires an external authorization redirect/callback.
    pub fn interactive(&self) -> bool {
        matches!(self, AuthScheme::OAuth2 | AuthScheme::OAuth1)
    }

    /// Fields an end user supplies when no application override exists.
    pub fn default_fields(&self) -> Vec<FieldSpec> {
        match self {
            AuthScheme::ApiKey => vec![FieldSpec::secret("api_key", Placement::Header)
                .described("API key issued by the provider")],
            AuthScheme::Bearer => vec![FieldSpec::secret("token", Placement::Header)
                .described("Bearer token sent in the Authorization header")],
            AuthScheme::Basic => vec![
                FieldSpec::public("username", Placement::Header),
                FieldSpec::secret("password", Placement::Header),
            ],
            AuthScheme::BasicWithJwt => vec![
                FieldSpec::public("username", Placement::Body),
                FieldSpec::secret("password", Placement::Body),
            ],
            AuthScheme::OAuth2 | AuthScheme::OAuth1 | AuthScheme::NoAuth => Vec::new(),
        }
    }

    /// Integration-level configuration keys the scheme cannot work without.
    pub fn config_fields(&self) -> &'static [&'static str] {
        match self {
            AuthScheme::OAuth2 => &["client_id", "client_secret"],
            AuthScheme::OAuth1 => &["consumer_key", "consumer_secret"],
            _ => &[],
        }
    }
}

impl fmt::Display for AuthScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognized scheme name.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseSchemeError(pub String);

impl fmt::Display for ParseSchemeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown auth scheme '{}'", self.0)
    }
}

impl std::error::Error for ParseSchemeError {}

impl Serialize for AuthScheme {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AuthScheme {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(de::Error::custom)
    }
}

impl FromStr for AuthScheme {
    type Err = ParseSchemeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        match normalized.as_str() {
            "OAUTH2" => Ok(AuthScheme::OAuth2),
            "OAUTH1" => Ok(AuthScheme::OAuth1),
            "API_KEY" | "APIKEY" => Ok(AuthScheme::ApiKey),
            "BASIC" => Ok(AuthScheme::Basic),
            "BEARER_TOKEN" | "BEARER" => Ok(AuthScheme::Bearer),
            "BASIC_WITH_JWT" => Ok(AuthScheme::BasicWithJwt),
            "NO_AUTH" | "NOAUTH" => Ok(AuthScheme::NoAuth),
            _ => Err(ParseSchemeError(s.to_string())),
        }
    }
}

/// Where a credential field is attached on provider requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    Header,
    Query,
    Body,
}

/// A credential field the end user must supply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(default)]
    pub secret: bool,
    pub placement: Placement,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FieldSpec {
    pub fn secret(name: &str, placement: Placement) -> Self {
        Self {
            name: name.to_string(),
            secret: true,
            placement,
            description: None,
        }
    }

    pub fn public(name: &str, placement: Placement) -> Self {
        Self {
            name: name.to_string(),
            secret: false,
            placement,
            description: None,
        }
    }

    pub fn described(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }
}
