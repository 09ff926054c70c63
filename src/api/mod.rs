//! HTTP API over the connection platform.

use crate::connection::{Connection, ProviderCredential};
use crate::credentials::SecretMap;
use crate::error::ConnectError;
use crate::integration::{Integration, SchemeConfig};
use crate::platform::Platform;
use crate::scheme::{ApplicationSpec, AuthScheme, FieldSpec};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Wait applied when the request does not name one
const DEFAULT_WAIT_SECONDS: u64 = 30;

/// Shared application state for the API
#[derive(Clone)]
pub struct ApiState {
    pub platform: Platform,
    /// Upper bound for a single wait request
    pub max_wait: Duration,
}

/// Error response
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    kind: &'static str,
}

/// Maps platform errors onto HTTP statuses
pub struct AppError(ConnectError);

impl From<ConnectError> for AppError {
    fn from(err: ConnectError) -> Self {
        Self(err)
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            ConnectError::IntegrationNotFound { .. } | ConnectError::ConnectionNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            ConnectError::UnknownScheme { .. }
            | ConnectError::IncompleteSchemeConfig { .. }
            | ConnectError::MissingRequiredParameter { .. } => StatusCode::BAD_REQUEST,
            ConnectError::AlreadyTerminal { .. }
            | ConnectError::InvalidState { .. }
            | ConnectError::ConnectionFailed { .. } => StatusCode::CONFLICT,
            ConnectError::ConnectionTimeout { .. } => StatusCode::REQUEST_TIMEOUT,
            ConnectError::WaitCancelled { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ConnectError::Vault { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(error = %self.0, "Request failed");
        }

        let body = Json(ErrorResponse {
            error: self.0.to_string(),
            kind: self.0.kind(),
        });

        (status, body).into_response()
    }
}

#[derive(Serialize)]
pub struct ListApplicationsResponse {
    pub applications: Vec<ApplicationSpec>,
}

#[derive(Serialize)]
pub struct SchemeFieldsResponse {
    pub application: String,
    pub scheme: AuthScheme,
    pub interactive: bool,
    pub fields: Vec<FieldSpec>,
}

/// Request body for POST /api/integrations
#[derive(Deserialize)]
pub struct CreateIntegrationRequest {
    pub application: String,
    pub scheme: String,
    #[serde(default)]
    pub scheme_config: SchemeConfig,
}

#[derive(Serialize)]
pub struct ListIntegrationsResponse {
    pub integrations: Vec<Integration>,
}

/// Request body for POST /api/connections
#[derive(Deserialize)]
pub struct InitiateConnectionRequest {
    pub integration_id: String,
    pub entity_id: String,
    #[serde(default)]
    pub params: SecretMap,
}

#[derive(Deserialize)]
pub struct ListConnectionsQuery {
    pub entity_id: String,
}

#[derive(Serialize)]
pub struct ListConnectionsResponse {
    pub connections: Vec<Connection>,
}

#[derive(Deserialize)]
pub struct WaitQuery {
    pub timeout_seconds: Option<u64>,
}

/// Request body for POST /api/connections/callback
#[derive(Deserialize)]
pub struct CallbackRequest {
    pub state: String,
    #[serde(flatten)]
    pub credential: ProviderCredential,
}

fn parse_scheme(application: &str, scheme: &str) -> Result<AuthScheme, AppError> {
    scheme.parse().map_err(|_| {
        AppError(ConnectError::UnknownScheme {
            application: application.to_string(),
            scheme: scheme.to_string(),
        })
    })
}

/// Create API router
pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/applications", get(list_applications))
        .route(
            "/api/applications/:application/schemes/:scheme/fields",
            get(scheme_fields),
        )
        .route(
            "/api/integrations",
            post(create_integration).get(list_integrations),
        )
        .route("/api/integrations/:id", get(get_integration))
        .route(
            "/api/connections",
            post(initiate_connection).get(list_connections),
        )
        .route("/api/connections/callback", post(callback))
        .route("/api/connections/:id", get(get_connection))
        .route("/api/connections/:id/wait", get(wait_connection))
        .route("/api/connections/:id/complete", post(complete_connection))
        .with_state(Arc::new(state))
}

/// GET /api/applications
async fn list_applications(State(state): State<Arc<ApiState>>) -> Json<ListApplicationsResponse> {
    let applications = state
        .platform
        .applications()
        .into_iter()
        .cloned()
        .collect();
    Json(ListApplicationsResponse { applications })
}

/// GET /api/applications/:application/schemes/:scheme/fields
async fn scheme_fields(
    State(state): State<Arc<ApiState>>,
    Path((application, scheme)): Path<(String, String)>,
) -> Result<Json<SchemeFieldsResponse>, AppError> {
    let scheme = parse_scheme(&application, &scheme)?;
    let fields = state.platform.get_auth_scheme_fields(&application, scheme)?;

    Ok(Json(SchemeFieldsResponse {
        application,
        scheme,
        interactive: scheme.interactive(),
        fields,
    }))
}

/// POST /api/integrations
///
/// Secret config values are masked in the response.
async fn create_integration(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<CreateIntegrationRequest>,
) -> Result<(StatusCode, Json<Integration>), AppError> {
    let scheme = parse_scheme(&body.application, &body.scheme)?;
    debug!(application = %body.application, scheme = %scheme, "Creating integration");

    let integration = state
        .platform
        .create_integration(&body.application, scheme, body.scheme_config)?;

    Ok((StatusCode::CREATED, Json(integration.redacted())))
}

/// GET /api/integrations
async fn list_integrations(State(state): State<Arc<ApiState>>) -> Json<ListIntegrationsResponse> {
    let integrations = state
        .platform
        .list_integrations()
        .iter()
        .map(Integration::redacted)
        .collect();
    Json(ListIntegrationsResponse { integrations })
}

/// GET /api/integrations/:id
async fn get_integration(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> Result<Json<Integration>, AppError> {
    let integration = state.platform.get_integration(&id)?;
    Ok(Json(integration.redacted()))
}

/// POST /api/connections
async fn initiate_connection(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<InitiateConnectionRequest>,
) -> Result<(StatusCode, Json<Connection>), AppError> {
    debug!(
        integration_id = %body.integration_id,
        entity_id = %body.entity_id,
        "Initiating connection"
    );

    let connection = state
        .platform
        .initiate_connection(&body.integration_id, &body.entity_id, body.params)
        .await?;

    Ok((StatusCode::CREATED, Json(connection)))
}

/// GET /api/connections?entity_id=…
async fn list_connections(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<ListConnectionsQuery>,
) -> Json<ListConnectionsResponse> {
    Json(ListConnectionsResponse {
        connections: state.platform.list_connections(&query.entity_id),
    })
}

/// GET /api/connections/:id
async fn get_connection(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> Result<Json<Connection>, AppError> {
    Ok(Json(state.platform.get_connection(&id)?))
}

/// GET /api/connections/:id/wait?timeout_seconds=N
///
/// The timeout is capped at the configured maximum.
async fn wait_connection(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
    Query(query): Query<WaitQuery>,
) -> Result<Json<Connection>, AppError> {
    let requested = Duration::from_secs(query.timeout_seconds.unwrap_or(DEFAULT_WAIT_SECONDS));
    let timeout = requested.min(state.max_wait);
    debug!(connection_id = %id, timeout_ms = timeout.as_millis() as u64, "Waiting for activation");

    let connection = state.platform.wait_until_active(&id, timeout).await?;
    Ok(Json(connection))
}

/// POST /api/connections/:id/complete
async fn complete_connection(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
    Json(credential): Json<ProviderCredential>,
) -> Result<Json<Connection>, AppError> {
    let platform = state.platform.clone();
    let connection =
        run_blocking(move || platform.complete_interactive_auth(&id, credential)).await?;
    Ok(Json(connection))
}

/// POST /api/connections/callback
///
/// Used by the callback receiver once it has exchanged the provider's
/// response for credentials; `state` identifies the connection.
async fn callback(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<CallbackRequest>,
) -> Result<Json<Connection>, AppError> {
    let platform = state.platform.clone();
    let connection =
        run_blocking(move || platform.complete_by_state(&body.state, body.credential)).await?;
    Ok(Json(connection))
}

/// Completion writes to the vault, which may block.
async fn run_blocking<F>(f: F) -> Result<Connection, ConnectError>
where
    F: FnOnce() -> Result<Connection, ConnectError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .unwrap_or_else(|e| {
            Err(ConnectError::Vault {
                reason: format!("completion task failed: {e}"),
            })
        })
}
