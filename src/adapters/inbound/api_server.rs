//! Monitoring API Server
//!
//! HTTP API for managing backend connections and reading the monitoring
//! charts. Registry mutations are written back to the connections file.

use crate::application::{ConnectionRegistry, TelemetryReport, TelemetryService};
use crate::domain::entities::{ConnectionConfig, ConnectionSummary};
use crate::domain::errors::RegistryError;
use crate::domain::ports::ConnectionConfigRepository;
use crate::domain::value_objects::ConnectionOptions;
use crate::infrastructure::ShutdownController;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Largest window the monitoring endpoint accepts (ten years).
const MAX_WINDOW_HOURS: u64 = 24 * 365 * 10;

/// Request body for adding a connection.
#[derive(Debug, Clone, Deserialize)]
pub struct AddConnectionRequest {
    pub name: String,
    pub uri: String,
    #[serde(default)]
    pub options: serde_json::Value,
}

/// Request body for updating a connection. A missing name keeps the
/// current one.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateConnectionRequest {
    #[serde(default)]
    pub name: Option<String>,
    pub uri: String,
}

/// Query string of the monitoring endpoint. Without `connection` the
/// first registered connection in list order is reported.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MonitoringQuery {
    pub connection: Option<String>,
    pub hours: Option<u64>,
}

/// List of connections response.
#[derive(Debug, Serialize)]
pub struct ConnectionsListResponse {
    pub connections: Vec<ConnectionSummary>,
    pub total: usize,
}

/// Health response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub connections: usize,
}

/// Error body returned by every failing handler.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        let status = match &err {
            RegistryError::DuplicateName(_) => StatusCode::CONFLICT,
            RegistryError::NotFound(_) => StatusCode::NOT_FOUND,
            RegistryError::InvalidUri(_) | RegistryError::InvalidOptions(_) => {
                StatusCode::BAD_REQUEST
            }
            RegistryError::Connection(_) => StatusCode::BAD_GATEWAY,
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}

/// API Server state.
#[derive(Clone)]
pub struct ApiState {
    pub registry: Arc<ConnectionRegistry>,
    pub telemetry: Arc<TelemetryService>,
    /// Where the connection list is saved after every change
    pub connections_file: Arc<dyn ConnectionConfigRepository>,
    /// Window used when a monitoring request names no hours
    pub default_window_hours: u64,
}

impl ApiState {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        telemetry: Arc<TelemetryService>,
        connections_file: Arc<dyn ConnectionConfigRepository>,
        default_window_hours: u64,
    ) -> Self {
        Self {
            registry,
            telemetry,
            connections_file,
            default_window_hours,
        }
    }

    /// Save the current registry contents. Failures are logged only; the
    /// registry change has already happened.
    async fn persist(&self) {
        let configs: Vec<ConnectionConfig> = self
            .registry
            .list()
            .into_iter()
            .map(ConnectionConfig::from)
            .collect();
        if let Err(e) = self.connections_file.save(&configs).await {
            tracing::error!("failed to save connections file: {}", e);
        }
    }
}

/// Build the API router over `state`.
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/v1/monitoring", get(monitoring_handler))
        .route(
            "/api/v1/connections",
            get(list_connections_handler).post(add_connection_handler),
        )
        .route(
            "/api/v1/connections/:name",
            put(update_connection_handler).delete(remove_connection_handler),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// HTTP API server.
pub struct ApiServer {
    listen_addr: String,
    state: ApiState,
}

impl ApiServer {
    pub fn new(listen_addr: String, state: ApiState) -> Self {
        Self { listen_addr, state }
    }

    pub fn state(&self) -> ApiState {
        self.state.clone()
    }

    /// Serve until `shutdown` fires, then drain in-flight requests.
    #[cfg_attr(coverage_nightly, coverage(off))]
    pub async fn run(&self, shutdown: ShutdownController) -> anyhow::Result<()> {
        let app = router(self.state.clone());

        let listener = TcpListener::bind(&self.listen_addr).await?;
        tracing::info!("monitoring API listening on {}", self.listen_addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.wait().await })
            .await?;
        tracing::info!("monitoring API stopped");
        Ok(())
    }
}

// Handler functions

async fn health_handler(State(state): State<ApiState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        connections: state.registry.len(),
    })
}

async fn monitoring_handler(
    State(state): State<ApiState>,
    Query(query): Query<MonitoringQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let hours = query
        .hours
        .unwrap_or(state.default_window_hours)
        .min(MAX_WINDOW_HOURS);
    let since = Utc::now() - chrono::Duration::hours(hours as i64);

    // without a filter, report on the first connection in list order
    let connection = match query.connection {
        Some(name) => name,
        None => match state.registry.list().into_iter().next() {
            Some(first) => first.name,
            None => {
                return Ok(Json(TelemetryReport::from_events(
                    &[],
                    state.telemetry.display_limit(),
                )))
            }
        },
    };

    let report = state
        .telemetry
        .report(since, &connection)
        .await
        .map_err(|e| {
            tracing::error!("monitoring query failed: {}", e);
            ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;
    Ok(Json(report))
}

async fn list_connections_handler(State(state): State<ApiState>) -> impl IntoResponse {
    let connections = state.registry.list();
    let total = connections.len();
    Json(ConnectionsListResponse { connections, total })
}

async fn add_connection_handler(
    State(state): State<ApiState>,
    Json(req): Json<AddConnectionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "connection name must not be empty",
        ));
    }
    let options = ConnectionOptions::from_json(req.options)?;
    state.registry.add(&req.name, &req.uri, options).await?;
    state.persist().await;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "name": req.name,
            "added": true
        })),
    ))
}

async fn update_connection_handler(
    State(state): State<ApiState>,
    Path(name): Path<String>,
    Json(req): Json<UpdateConnectionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let new_name = match req.name {
        Some(n) if !n.trim().is_empty() => n,
        Some(_) => {
            return Err(ApiError::new(
                StatusCode::BAD_REQUEST,
                "connection name must not be empty",
            ))
        }
        None => name.clone(),
    };
    state.registry.update(&name, &new_name, &req.uri).await?;
    state.persist().await;

    Ok(Json(serde_json::json!({
        "name": new_name,
        "updated": true
    })))
}

async fn remove_connection_handler(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let existed = state.registry.contains(&name);
    state.registry.remove(&name).await?;
    if existed {
        state.persist().await;
    }

    Ok(Json(serde_json::json!({
        "name": name,
        "removed": existed
    })))
}
