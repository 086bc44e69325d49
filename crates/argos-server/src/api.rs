//! Registry REST API
//!
//! Wire operations over the local registry. State changes are observable
//! immediately to subsequent queries; there is no caching layer.

use argos_core::{ComponentId, ComponentRecord, ComponentStatus, TimeProvider};
use argos_registry::{LocalRegistry, QueryFilter, Registration, Registry, RegistryError};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Stable error codes carried in error bodies, mirrored by the client
pub const ERROR_CODE_INVALID_COMPONENT: &str = "invalid_component";
pub const ERROR_CODE_UNKNOWN_COMPONENT: &str = "unknown_component";
pub const ERROR_CODE_STALE_EPOCH: &str = "stale_epoch";
pub const ERROR_CODE_INTERNAL: &str = "internal";

/// Shared state for the API handlers
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<LocalRegistry>,
    pub time: Arc<dyn TimeProvider>,
    pub started_at_ms: u64,
}

impl AppState {
    /// Create state over a registry, stamping the start time
    pub fn new(registry: Arc<LocalRegistry>, time: Arc<dyn TimeProvider>) -> Self {
        let started_at_ms = time.now_ms();
        Self {
            registry,
            time,
            started_at_ms,
        }
    }

    fn uptime_seconds(&self) -> u64 {
        self.time.now_ms().saturating_sub(self.started_at_ms) / 1000
    }
}

/// Create the API router with all routes
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/components", get(list_components))
        .route("/v1/components/register", post(register))
        .route("/v1/components/heartbeat", post(heartbeat))
        .route("/v1/components/unregister", post(unregister))
        .route("/v1/components/:id", get(get_component))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub epoch: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HeartbeatRequest {
    pub id: String,
    pub epoch: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HeartbeatResponse {
    pub status: ComponentStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UnregisterRequest {
    pub id: String,
    pub epoch: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UnregisterResponse {
    pub ok: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct ComponentsQuery {
    pub capability: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}

/// JSON error body with a stable code
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    /// The component id the error refers to, when there is one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// For stale_epoch errors: the epoch the registry holds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stored_epoch: Option<u64>,
}

// =============================================================================
// Handlers
// =============================================================================

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
    })
}

async fn register(
    State(state): State<AppState>,
    Json(registration): Json<Registration>,
) -> Result<Json<RegisterResponse>, ApiError> {
    let epoch = state.registry.register(registration).await?;
    Ok(Json(RegisterResponse {
        epoch: epoch.value(),
    }))
}

async fn heartbeat(
    State(state): State<AppState>,
    Json(request): Json<HeartbeatRequest>,
) -> Result<Json<HeartbeatResponse>, ApiError> {
    let id = parse_id(&request.id)?;
    let status = state.registry.heartbeat(&id, request.epoch.into()).await?;
    Ok(Json(HeartbeatResponse { status }))
}

async fn unregister(
    State(state): State<AppState>,
    Json(request): Json<UnregisterRequest>,
) -> Result<Json<UnregisterResponse>, ApiError> {
    let id = parse_id(&request.id)?;
    state.registry.unregister(&id, request.epoch.into()).await?;
    Ok(Json(UnregisterResponse { ok: true }))
}

async fn list_components(
    State(state): State<AppState>,
    Query(params): Query<ComponentsQuery>,
) -> Result<Json<Vec<ComponentRecord>>, ApiError> {
    let status = match params.status.as_deref() {
        None => None,
        Some(raw) => Some(ComponentStatus::parse(raw).ok_or_else(|| {
            ApiError::bad_request(format!("unknown status filter '{}'", raw))
        })?),
    };

    let filter = QueryFilter {
        capability: params.capability,
        status,
    };
    let records = state.registry.query(&filter).await?;
    Ok(Json(records))
}

async fn get_component(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ComponentRecord>, ApiError> {
    let id = parse_id(&id)?;
    match state.registry.get(&id).await? {
        Some(record) => Ok(Json(record)),
        None => Err(ApiError::from(RegistryError::unknown_component(&id))),
    }
}

fn parse_id(raw: &str) -> Result<ComponentId, ApiError> {
    ComponentId::new(raw).map_err(|e| ApiError::bad_request(e.to_string()))
}

// =============================================================================
// Error mapping
// =============================================================================

/// API error type that converts registry errors to HTTP responses
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorBody {
                error: ERROR_CODE_INVALID_COMPONENT.into(),
                message: message.into(),
                id: None,
                stored_epoch: None,
            },
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        let (status, code, id, stored_epoch) = match &err {
            RegistryError::InvalidComponent { id, .. } => (
                StatusCode::BAD_REQUEST,
                ERROR_CODE_INVALID_COMPONENT,
                Some(id.clone()),
                None,
            ),
            RegistryError::UnknownComponent { id } => (
                StatusCode::NOT_FOUND,
                ERROR_CODE_UNKNOWN_COMPONENT,
                Some(id.clone()),
                None,
            ),
            RegistryError::StaleEpoch { id, stored, .. } => (
                StatusCode::CONFLICT,
                ERROR_CODE_STALE_EPOCH,
                Some(id.clone()),
                Some(stored.value()),
            ),
            RegistryError::Unreachable { .. } | RegistryError::Internal { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ERROR_CODE_INTERNAL,
                None,
                None,
            ),
        };

        Self {
            status,
            body: ErrorBody {
                error: code.into(),
                message: err.to_string(),
                id,
                stored_epoch,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
