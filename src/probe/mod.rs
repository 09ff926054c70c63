//! Liveness probes: optional checks that supplied credentials actually work
//! before a non-interactive connection is declared ACTIVE.
//!
//! The orchestrator only interprets the outcome. A probe runs only when the
//! registry declares a probe URL for the (application, scheme) pair.

use crate::credentials::SecretMap;
use crate::scheme::{AuthScheme, FieldSpec, Placement};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Everything a probe needs to exercise one set of credentials.
#[derive(Debug, Clone, Copy)]
pub struct ProbeRequest<'a> {
    pub application: &'a str,
    pub scheme: AuthScheme,
    pub url: &'a str,
    pub fields: &'a [FieldSpec],
    pub credentials: &'a SecretMap,
}

/// Result of a liveness probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Alive,
    Rejected(String),
}

#[async_trait]
pub trait LivenessProbe: Send + Sync {
    async fn probe(&self, request: &ProbeRequest<'_>) -> ProbeOutcome;
}

/// Accepts every credential without a network call.
pub struct NoProbe;

#[async_trait]
impl LivenessProbe for NoProbe {
    async fn probe(&self, _request: &ProbeRequest<'_>) -> ProbeOutcome {
        ProbeOutcome::Alive
    }
}

/// Probes by issuing an authenticated GET against the probe URL.
///
/// Credentials are attached by scheme: Bearer as a bearer token, Basic and
/// BasicWithJWT as basic auth, and remaining fields according to their
/// placement (header or query; body fields are not sent on a GET).
pub struct HttpProbe {
    http_client: Client,
}

impl HttpProbe {
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        let http_client = Client::builder()
            .user_agent("authlink-probe/1.0")
            .timeout(timeout)
            .build()?;
        Ok(Self { http_client })
    }

    fn build(&self, request: &ProbeRequest<'_>) -> reqwest::RequestBuilder {
        let credentials = request.credentials;
        let value = |name: &str| credentials.get(name).map(String::as_str).unwrap_or_default();

        let mut builder = self.http_client.get(request.url);
        let mut consumed: Vec<&str> = Vec::new();

        match request.scheme {
            AuthScheme::Bearer => {
                builder = builder.bearer_auth(value("token"));
                consumed.push("token");
            }
            AuthScheme::Basic | AuthScheme::BasicWithJwt => {
                builder = builder.basic_auth(value("username"), Some(value("password")));
                consumed.extend(["username", "password"]);
            }
            _ => {}
        }

        let mut query: Vec<(&str, &str)> = Vec::new();
        for field in request.fields {
            if consumed.contains(&field.name.as_str()) {
                continue;
            }
            let Some(v) = credentials.get(&field.name) else {
                continue;
            };
            match field.placement {
                Placement::Header => builder = builder.header(field.name.as_str(), v.as_str()),
                Placement::Query => query.push((field.name.as_str(), v.as_str())),
                Placement::Body => {}
            }
        }
        if !query.is_empty() {
            builder = builder.query(&query);
        }
        builder
    }
}

#[async_trait]
impl LivenessProbe for HttpProbe {
    async fn probe(&self, request: &ProbeRequest<'_>) -> ProbeOutcome {
        debug!(
            application = %request.application,
            scheme = %request.scheme,
            url = %request.url,
            "Probing credentials"
        );

        match self.build(request).send().await {
            Ok(response) if response.status().is_success() => ProbeOutcome::Alive,
            Ok(response) => ProbeOutcome::Rejected(format!(
                "probe returned {}",
                response.status()
            )),
            Err(e) => ProbeOutcome::Rejected(format!("probe request failed: {e}")),
        }
    }
}
