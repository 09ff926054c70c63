use super::*;
use crate::credentials::{CredentialVault, MemoryVault};
use crate::error::ConnectError;
use crate::integration::{IntegrationStore, PlatformApps, SchemeConfig};
use crate::probe::{LivenessProbe, NoProbe, ProbeOutcome, ProbeRequest};
use crate::resolver::ParameterResolver;
use crate::scheme::SchemeRegistry;
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct ScriptedProbe {
    outcome: ProbeOutcome,
    calls: AtomicUsize,
}

impl ScriptedProbe {
    fn new(outcome: ProbeOutcome) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl LivenessProbe for ScriptedProbe {
    async fn probe(&self, _request: &ProbeRequest<'_>) -> ProbeOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }
}

struct BrokenVault;

impl CredentialVault for BrokenVault {
    fn store(&self, _secrets: &SecretMap) -> Result<CredentialRef> {
        bail!("disk full")
    }

    fn resolve(&self, _credential_ref: &CredentialRef) -> Result<Option<SecretMap>> {
        Ok(None)
    }

    fn discard(&self, _credential_ref: &CredentialRef) -> Result<bool> {
        Ok(false)
    }
}

/// Memory vault whose writes hold the calling thread.
struct SlowVault {
    inner: MemoryVault,
    delay: std::time::Duration,
}

impl CredentialVault for SlowVault {
    fn store(&self, secrets: &SecretMap) -> Result<CredentialRef> {
        std::thread::sleep(self.delay);
        self.inner.store(secrets)
    }

    fn resolve(&self, credential_ref: &CredentialRef) -> Result<Option<SecretMap>> {
        self.inner.resolve(credential_ref)
    }

    fn discard(&self, credential_ref: &CredentialRef) -> Result<bool> {
        self.inner.discard(credential_ref)
    }
}

struct Harness {
    orchestrator: ConnectionOrchestrator,
    integrations: Arc<IntegrationStore>,
    vault: Arc<MemoryVault>,
}

fn build(
    vault: Arc<dyn CredentialVault>,
    probe: Arc<dyn LivenessProbe>,
    window: chrono::Duration,
) -> (ConnectionOrchestrator, Arc<IntegrationStore>) {
    let registry = Arc::new(SchemeRegistry::builtin());
    let integrations = Arc::new(IntegrationStore::new(
        Arc::clone(&registry),
        PlatformApps::none(),
    ));
    let orchestrator = ConnectionOrchestrator::new(
        Arc::clone(&integrations),
        Arc::new(ParameterResolver::new(registry)),
        Arc::new(ConnectionStore::new()),
        vault,
        probe,
        OrchestratorSettings {
            callback_base_url: "http://localhost:3000".to_string(),
            authorization_window: window,
        },
    );
    (orchestrator, integrations)
}

fn harness_with(probe: Arc<dyn LivenessProbe>, window: chrono::Duration) -> Harness {
    let vault = Arc::new(MemoryVault::new());
    let (orchestrator, integrations) = build(vault.clone(), probe, window);
    Harness {
        orchestrator,
        integrations,
        vault,
    }
}

fn harness() -> Harness {
    harness_with(Arc::new(NoProbe), chrono::Duration::seconds(600))
}

fn params(pairs: &[(&str, &str)]) -> SecretMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn oauth_config(scheme: AuthScheme) -> SchemeConfig {
    let mut config = SchemeConfig::new();
    for key in scheme.config_fields() {
        config.insert(*key, format!("{key}-value"));
    }
    config
}

impl Harness {
    fn integration(&self, application: &str, scheme: AuthScheme) -> String {
        self.integrations
            .create(application, scheme, oauth_config(scheme))
            .expect("integration should be created")
            .id
    }

    async fn pending_github(&self) -> Connection {
        let integration_id = self.integration("github", AuthScheme::OAuth2);
        self.orchestrator
            .initiate(&integration_id, "user_1", SecretMap::new())
            .await
            .expect("initiate should succeed")
    }
}

#[tokio::test]
async fn test_omitting_any_required_field_names_it() {
    let h = harness();
    let registry = SchemeRegistry::builtin();
    let resolver = ParameterResolver::new(Arc::new(SchemeRegistry::builtin()));

    for spec in registry.applications() {
        for scheme in &spec.schemes {
            let integration_id = h.integration(&spec.name, *scheme);
            let fields = resolver.resolve(&spec.name, *scheme).unwrap();

            for omitted in &fields {
                let supplied: SecretMap = fields
                    .iter()
                    .filter(|f| f.name != omitted.name)
                    .map(|f| (f.name.clone(), "value".to_string()))
                    .collect();

                let err = h
                    .orchestrator
                    .initiate(&integration_id, "user_1", supplied)
                    .await
                    .unwrap_err();
                assert_eq!(
                    err,
                    ConnectError::MissingRequiredParameter {
                        field: omitted.name.clone()
                    },
                    "{} {}",
                    spec.name,
                    scheme
                );
            }
        }
    }

    assert_eq!(h.orchestrator.connections().count(), 0);
}

#[tokio::test]
async fn test_blank_value_counts_as_missing() {
    let h = harness();
    let integration_id = h.integration("shopify", AuthScheme::ApiKey);

    let err = h
        .orchestrator
        .initiate(
            &integration_id,
            "user_1",
            params(&[("api_key", "sk_test"), ("shop", "   ")]),
        )
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ConnectError::MissingRequiredParameter {
            field: "shop".to_string()
        }
    );
}

#[tokio::test]
async fn test_unknown_integration() {
    let h = harness();
    let err = h
        .orchestrator
        .initiate("int_missing", "user_1", SecretMap::new())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ConnectError::IntegrationNotFound {
            id: "int_missing".to_string()
        }
    );
}

#[tokio::test]
async fn test_no_auth_activates_with_empty_params() {
    let h = harness();
    let integration_id = h.integration("hackernews", AuthScheme::NoAuth);

    let connection = h
        .orchestrator
        .initiate(&integration_id, "user_1", SecretMap::new())
        .await
        .unwrap();

    assert_eq!(connection.status, ConnectionStatus::Active);
    assert!(connection.credential_ref.is_some());
    assert!(connection.activated_at.is_some());
    assert!(connection.redirect_url.is_none());
}

#[tokio::test]
async fn test_shopify_api_key_activates() {
    let h = harness();
    let integration_id = h.integration("shopify", AuthScheme::ApiKey);

    let connection = h
        .orchestrator
        .initiate(
            &integration_id,
            "user_1",
            params(&[("api_key", "sk_test"), ("shop", "demo.myshopify.com")]),
        )
        .await
        .unwrap();

    assert_eq!(connection.status, ConnectionStatus::Active);
    assert!(connection.id.starts_with("conn_"));
    let credential_ref = connection.credential_ref.clone().expect("credential ref");
    let stored = h.vault.resolve(&credential_ref).unwrap().unwrap();
    assert_eq!(stored.get("api_key").map(String::as_str), Some("sk_test"));
    assert_eq!(
        stored.get("shop").map(String::as_str),
        Some("demo.myshopify.com")
    );

    let err = h
        .orchestrator
        .initiate(&integration_id, "user_1", params(&[("api_key", "sk_test")]))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ConnectError::MissingRequiredParameter {
            field: "shop".to_string()
        }
    );
}

#[tokio::test]
async fn test_request_keeps_no_secret_values() {
    let h = harness();
    let integration_id = h.integration("shopify", AuthScheme::ApiKey);

    let connection = h
        .orchestrator
        .initiate(
            &integration_id,
            "user_1",
            params(&[("api_key", "sk_test"), ("shop", "demo.myshopify.com")]),
        )
        .await
        .unwrap();

    let request = h
        .orchestrator
        .connections()
        .request(&connection.connection_request_id)
        .expect("request should be stored");

    assert!(request.id.starts_with("creq_"));
    assert_eq!(request.scheme, AuthScheme::ApiKey);
    assert_eq!(request.supplied_fields, vec!["api_key", "shop"]);
    assert_eq!(
        request.public_params.get("shop").map(String::as_str),
        Some("demo.myshopify.com")
    );
    assert!(!request.public_params.contains_key("api_key"));
    assert!(!serde_json::to_string(&request).unwrap().contains("sk_test"));
}

#[tokio::test]
async fn test_non_interactive_schemes_activate_synchronously() {
    let h = harness();
    let cases: [(&str, AuthScheme, &[(&str, &str)]); 4] = [
        ("linear", AuthScheme::ApiKey, &[("api_key", "lin_1")]),
        ("github", AuthScheme::Bearer, &[("token", "ghp_1")]),
        (
            "jira",
            AuthScheme::Basic,
            &[("username", "a@b.c"), ("password", "pw"), ("subdomain", "acme")],
        ),
        (
            "metabase",
            AuthScheme::BasicWithJwt,
            &[("username", "admin"), ("password", "pw")],
        ),
    ];

    for (application, scheme, supplied) in cases {
        let integration_id = h.integration(application, scheme);
        let connection = h
            .orchestrator
            .initiate(&integration_id, "user_1", params(supplied))
            .await
            .unwrap();
        assert_eq!(connection.status, ConnectionStatus::Active, "{application}");
        assert!(connection.credential_ref.is_some());
    }
    assert_eq!(h.vault.len(), 4);
}

#[tokio::test]
async fn test_github_oauth2_pending_with_redirect() {
    let h = harness();
    let connection = h.pending_github().await;

    assert_eq!(connection.status, ConnectionStatus::Pending);
    assert!(connection.credential_ref.is_none());
    assert!(connection.authorization_deadline.is_some());
    let url = connection.redirect_url.expect("redirect url");
    assert!(url.contains("client_id=client_id-value"));
    assert!(url.contains("state="));
    assert_eq!(h.vault.len(), 0);
}

#[tokio::test]
async fn test_github_redirect_carries_client_id() {
    let h = harness();
    let integration = h
        .integrations
        .create(
            "github",
            AuthScheme::OAuth2,
            SchemeConfig::from([("client_id", "id1"), ("client_secret", "sec1")]),
        )
        .unwrap();

    let connection = h
        .orchestrator
        .initiate(&integration.id, "user_1", SecretMap::new())
        .await
        .unwrap();

    assert_eq!(connection.status, ConnectionStatus::Pending);
    let url = connection.redirect_url.unwrap();
    assert!(!url.is_empty());
    assert!(url.contains("client_id=id1"));
}

#[tokio::test]
async fn test_redirect_endpoint_follows_scheme() {
    let h = harness();
    let cases = [
        (
            AuthScheme::OAuth1,
            "https://api.twitter.com/oauth/authorize?",
            "oauth_consumer_key=consumer_key-value",
        ),
        (
            AuthScheme::OAuth2,
            "https://twitter.com/i/oauth2/authorize?",
            "response_type=code",
        ),
    ];

    for (scheme, endpoint, marker) in cases {
        let integration_id = h.integration("twitter", scheme);
        let stored = h.integrations.get(&integration_id).unwrap();
        assert_eq!(
            stored.scheme_config.get("authorization_url"),
            Some(endpoint.trim_end_matches('?'))
        );

        let connection = h
            .orchestrator
            .initiate(&integration_id, "user_1", SecretMap::new())
            .await
            .unwrap();

        let url = connection.redirect_url.unwrap();
        assert!(url.starts_with(endpoint), "{scheme}: {url}");
        assert!(url.contains(marker), "{scheme}: {url}");
    }
}

#[tokio::test]
async fn test_complete_activates_exactly_once() {
    let h = harness();
    let pending = h.pending_github().await;

    let active = h
        .orchestrator
        .complete_interactive_auth(&pending.id, ProviderCredential::access_token("gho_1"))
        .unwrap();
    assert_eq!(active.status, ConnectionStatus::Active);
    assert!(active.redirect_url.is_none());
    assert!(active.activated_at.is_some());
    let credential_ref = active.credential_ref.clone().unwrap();

    let err = h
        .orchestrator
        .complete_interactive_auth(&pending.id, ProviderCredential::access_token("gho_2"))
        .unwrap_err();
    assert_eq!(
        err,
        ConnectError::AlreadyTerminal {
            id: pending.id.clone(),
            status: ConnectionStatus::Active
        }
    );

    let after = h.orchestrator.get_connection(&pending.id).unwrap();
    assert_eq!(after, active);
    let stored = h.vault.resolve(&credential_ref).unwrap().unwrap();
    assert_eq!(stored.get("access_token").map(String::as_str), Some("gho_1"));
    assert_eq!(h.vault.len(), 1);
}

#[tokio::test]
async fn test_denied_authorization_fails_connection() {
    let h = harness();
    let pending = h.pending_github().await;

    let failed = h
        .orchestrator
        .complete_interactive_auth(
            &pending.id,
            ProviderCredential::Denied {
                error: "access_denied".to_string(),
                description: Some("user cancelled".to_string()),
            },
        )
        .unwrap();

    assert_eq!(failed.status, ConnectionStatus::Failed);
    assert!(failed.credential_ref.is_none());
    assert!(failed.redirect_url.is_none());
    assert_eq!(
        failed.last_error,
        Some(FailureReason::AuthorizationDenied {
            error: "access_denied".to_string(),
            description: Some("user cancelled".to_string()),
        })
    );
}

#[tokio::test]
async fn test_grant_missing_provider_token_is_rejected() {
    let h = harness();
    let integration_id = h.integration("trello", AuthScheme::OAuth1);
    let pending = h
        .orchestrator
        .initiate(&integration_id, "user_1", SecretMap::new())
        .await
        .unwrap();

    let err = h
        .orchestrator
        .complete_interactive_auth(
            &pending.id,
            ProviderCredential::Granted {
                credentials: params(&[("oauth_token", "tok")]),
            },
        )
        .unwrap_err();

    assert_eq!(
        err,
        ConnectError::MissingRequiredParameter {
            field: "oauth_token_secret".to_string()
        }
    );
    let after = h.orchestrator.get_connection(&pending.id).unwrap();
    assert_eq!(after.status, ConnectionStatus::Pending);
    assert!(after.redirect_url.is_some());
}

#[tokio::test]
async fn test_supplied_params_merge_into_granted_credential() {
    let h = harness();
    let integration_id = h.integration("jira", AuthScheme::OAuth2);
    let pending = h
        .orchestrator
        .initiate(&integration_id, "user_1", params(&[("subdomain", "acme")]))
        .await
        .unwrap();

    let active = h
        .orchestrator
        .complete_interactive_auth(&pending.id, ProviderCredential::access_token("at"))
        .unwrap();

    let stored = h
        .vault
        .resolve(active.credential_ref.as_ref().unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(stored.get("subdomain").map(String::as_str), Some("acme"));
    assert_eq!(stored.get("access_token").map(String::as_str), Some("at"));
}

#[tokio::test]
async fn test_complete_by_state() {
    let h = harness();
    let pending = h.pending_github().await;

    let url = pending.redirect_url.clone().unwrap();
    let state = url
        .split('&')
        .find_map(|pair| pair.strip_prefix("state="))
        .expect("state in redirect");

    let active = h
        .orchestrator
        .complete_by_state(state, ProviderCredential::access_token("gho_1"))
        .unwrap();
    assert_eq!(active.id, pending.id);
    assert_eq!(active.status, ConnectionStatus::Active);

    let err = h
        .orchestrator
        .complete_by_state(state, ProviderCredential::access_token("gho_1"))
        .unwrap_err();
    assert_eq!(err.kind(), "already_terminal");

    let err = h
        .orchestrator
        .complete_by_state("bogus", ProviderCredential::access_token("x"))
        .unwrap_err();
    assert_eq!(err.kind(), "connection_not_found");
}

#[tokio::test]
async fn test_complete_rejects_non_interactive_connection() {
    let h = harness();
    let integration_id = h.integration("hackernews", AuthScheme::NoAuth);
    let active = h
        .orchestrator
        .initiate(&integration_id, "user_1", SecretMap::new())
        .await
        .unwrap();

    let err = h
        .orchestrator
        .complete_interactive_auth(&active.id, ProviderCredential::access_token("x"))
        .unwrap_err();
    assert_eq!(err.kind(), "already_terminal");
}

#[tokio::test]
async fn test_reinitiate_creates_new_pair() {
    let h = harness();
    let integration_id = h.integration("github", AuthScheme::Bearer);

    let first = h
        .orchestrator
        .initiate(&integration_id, "user_1", params(&[("token", "a")]))
        .await
        .unwrap();
    let second = h
        .orchestrator
        .initiate(&integration_id, "user_1", params(&[("token", "b")]))
        .await
        .unwrap();

    assert_ne!(first.id, second.id);
    assert_ne!(first.connection_request_id, second.connection_request_id);
    assert_ne!(first.credential_ref, second.credential_ref);
    assert_eq!(h.orchestrator.get_connection(&first.id).unwrap(), first);

    let listed = h.orchestrator.list_connections("user_1");
    assert_eq!(listed.len(), 2);
    assert!(h.orchestrator.list_connections("someone_else").is_empty());
}

#[tokio::test]
async fn test_probe_rejection_fails_connection() {
    let probe = ScriptedProbe::new(ProbeOutcome::Rejected("probe returned 401".to_string()));
    let h = harness_with(probe.clone(), chrono::Duration::seconds(600));
    let integration_id = h.integration("github", AuthScheme::Bearer);

    let connection = h
        .orchestrator
        .initiate(&integration_id, "user_1", params(&[("token", "bad")]))
        .await
        .unwrap();

    assert_eq!(connection.status, ConnectionStatus::Failed);
    assert!(connection.credential_ref.is_none());
    assert_eq!(
        connection.last_error,
        Some(FailureReason::ProbeFailed {
            reason: "probe returned 401".to_string()
        })
    );
    assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
    assert!(h.vault.is_empty());
}

#[tokio::test]
async fn test_probe_only_runs_with_target() {
    let probe = ScriptedProbe::new(ProbeOutcome::Rejected("unused".to_string()));
    let h = harness_with(probe.clone(), chrono::Duration::seconds(600));
    let integration_id = h.integration("linear", AuthScheme::ApiKey);

    let connection = h
        .orchestrator
        .initiate(&integration_id, "user_1", params(&[("api_key", "lin")]))
        .await
        .unwrap();

    assert_eq!(connection.status, ConnectionStatus::Active);
    assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_vault_failure_fails_direct_activation() {
    let (orchestrator, integrations) = build(
        Arc::new(BrokenVault),
        Arc::new(NoProbe),
        chrono::Duration::seconds(600),
    );
    let integration = integrations
        .create("linear", AuthScheme::ApiKey, SchemeConfig::new())
        .unwrap();

    let connection = orchestrator
        .initiate(&integration.id, "user_1", params(&[("api_key", "lin")]))
        .await
        .unwrap();

    assert_eq!(connection.status, ConnectionStatus::Failed);
    assert!(matches!(
        connection.last_error,
        Some(FailureReason::Vault { ref reason }) if reason.contains("disk full")
    ));
}

#[tokio::test]
async fn test_vault_failure_keeps_interactive_connection_pending() {
    let (orchestrator, integrations) = build(
        Arc::new(BrokenVault),
        Arc::new(NoProbe),
        chrono::Duration::seconds(600),
    );
    let integration = integrations
        .create("github", AuthScheme::OAuth2, oauth_config(AuthScheme::OAuth2))
        .unwrap();
    let pending = orchestrator
        .initiate(&integration.id, "user_1", SecretMap::new())
        .await
        .unwrap();

    let err = orchestrator
        .complete_interactive_auth(&pending.id, ProviderCredential::access_token("at"))
        .unwrap_err();

    assert_eq!(err.kind(), "vault");
    assert_eq!(
        orchestrator.get_connection(&pending.id).unwrap().status,
        ConnectionStatus::Pending
    );
}

#[tokio::test(flavor = "current_thread")]
async fn test_vault_write_does_not_stall_runtime() {
    let vault = Arc::new(SlowVault {
        inner: MemoryVault::new(),
        delay: std::time::Duration::from_millis(300),
    });
    let (orchestrator, integrations) =
        build(vault, Arc::new(NoProbe), chrono::Duration::seconds(600));
    let integration = integrations
        .create("linear", AuthScheme::ApiKey, SchemeConfig::new())
        .unwrap();

    let ticks = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&ticks);
    let ticker = tokio::spawn(async move {
        loop {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            counter.fetch_add(1, Ordering::SeqCst);
        }
    });

    let connection = orchestrator
        .initiate(&integration.id, "user_1", params(&[("api_key", "lin")]))
        .await
        .unwrap();
    ticker.abort();

    assert_eq!(connection.status, ConnectionStatus::Active);
    // The ticker kept running on the single runtime thread during the write
    assert!(ticks.load(Ordering::SeqCst) >= 5);
}

#[tokio::test]
async fn test_expire_stale_moves_overdue_to_expired() {
    let h = harness_with(Arc::new(NoProbe), chrono::Duration::milliseconds(200));
    let pending = h.pending_github().await;
    let integration_id = h.integration("linear", AuthScheme::ApiKey);
    let active = h
        .orchestrator
        .initiate(&integration_id, "user_1", params(&[("api_key", "lin")]))
        .await
        .unwrap();

    assert_eq!(h.orchestrator.expire_stale(), 0);
    tokio::time::sleep(std::time::Duration::from_millis(300)).await;

    assert_eq!(h.orchestrator.expire_stale(), 1);
    let expired = h.orchestrator.get_connection(&pending.id).unwrap();
    assert_eq!(expired.status, ConnectionStatus::Expired);
    assert_eq!(expired.last_error, Some(FailureReason::Expired));
    assert!(expired.redirect_url.is_none());

    assert_eq!(
        h.orchestrator.get_connection(&active.id).unwrap().status,
        ConnectionStatus::Active
    );
    assert_eq!(h.orchestrator.expire_stale(), 0);
}

#[tokio::test]
async fn test_late_completion_expires_connection() {
    let h = harness_with(Arc::new(NoProbe), chrono::Duration::milliseconds(200));
    let pending = h.pending_github().await;
    tokio::time::sleep(std::time::Duration::from_millis(300)).await;

    let err = h
        .orchestrator
        .complete_interactive_auth(&pending.id, ProviderCredential::access_token("late"))
        .unwrap_err();

    assert_eq!(
        err,
        ConnectError::ConnectionFailed {
            id: pending.id.clone(),
            reason: FailureReason::Expired
        }
    );
    assert_eq!(
        h.orchestrator.get_connection(&pending.id).unwrap().status,
        ConnectionStatus::Expired
    );
    assert!(h.vault.is_empty());
}

#[tokio::test]
async fn test_concurrent_completions_activate_once() {
    let h = harness();
    let pending = h.pending_github().await;
    let orchestrator = &h.orchestrator;
    let id = pending.id.as_str();

    let results: Vec<Result<Connection, ConnectError>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                scope.spawn(move || {
                    orchestrator.complete_interactive_auth(
                        id,
                        ProviderCredential::access_token(&format!("token-{i}")),
                    )
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    });

    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);
    for result in results.iter().filter_map(|r| r.as_ref().err()) {
        assert_eq!(result.kind(), "already_terminal");
    }

    let active = h.orchestrator.get_connection(id).unwrap();
    assert_eq!(active.status, ConnectionStatus::Active);
    // Losing completions drop the credential they stored.
    assert_eq!(h.vault.len(), 1);
}

#[test]
fn test_list_by_entity_orders_by_creation_time() {
    let store = ConnectionStore::new();
    let integration = Integration {
        id: "int_test".to_string(),
        application: "linear".to_string(),
        scheme: AuthScheme::ApiKey,
        scheme_config: SchemeConfig::new(),
        uses_platform_app: false,
        created_at: Utc::now(),
    };
    let fields = AuthScheme::ApiKey.default_fields();
    let earlier = Utc::now() - chrono::Duration::seconds(5);
    let later = Utc::now();

    // Ids deliberately sort against creation time
    for (id, created_at) in [("conn_b", earlier), ("conn_a", later), ("conn_c", later)] {
        let request =
            ConnectionRequest::new(&integration, "user_1", &fields, &SecretMap::new(), created_at);
        let mut connection = Connection::initiated(&request, created_at);
        connection.id = id.to_string();
        store.insert(request, connection);
    }

    let ids: Vec<_> = store
        .list_by_entity("user_1")
        .into_iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(ids, ["conn_b", "conn_a", "conn_c"]);
}

#[test]
fn test_status_terminality() {
    assert!(!ConnectionStatus::Initiated.is_terminal());
    assert!(!ConnectionStatus::Pending.is_terminal());
    assert!(ConnectionStatus::Active.is_terminal());
    assert!(ConnectionStatus::Failed.is_terminal());
    assert!(ConnectionStatus::Expired.is_terminal());
    assert_eq!(
        serde_json::to_string(&ConnectionStatus::Pending).unwrap(),
        "\"PENDING\""
    );
}

#[test]
fn test_provider_credential_wire_format() {
    let granted: ProviderCredential = serde_json::from_str(
        r#"{"outcome":"granted","credentials":{"access_token":"at"}}"#,
    )
    .unwrap();
    assert_eq!(granted, ProviderCredential::access_token("at"));

    let denied: ProviderCredential =
        serde_json::from_str(r#"{"outcome":"denied","error":"access_denied"}"#).unwrap();
    assert_eq!(
        denied,
        ProviderCredential::Denied {
            error: "access_denied".to_string(),
            description: None
        }
    );
}
