//! HTTP API for deployments, inventory, health checks and Prometheus metrics

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use fleet_lib::{
    health::{components, ComponentStatus, HealthRegistry},
    runtime::WorkloadRuntime,
    DeployError, DeploymentRequest, DeploymentState, InstanceSummary, Orchestrator,
    RedirectionRule, ReplicaDescriptor, FLEET_LABEL,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub runtime: Arc<dyn WorkloadRuntime>,
    pub health_registry: HealthRegistry,
}

impl AppState {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        runtime: Arc<dyn WorkloadRuntime>,
        health_registry: HealthRegistry,
    ) -> Self {
        Self {
            orchestrator,
            runtime,
            health_registry,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeployResponse {
    pub message: String,
    pub state: DeploymentState,
    pub replicas: Vec<ReplicaDescriptor>,
    pub rules: Vec<RedirectionRule>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FleetResponse {
    pub name: String,
    pub instances: Vec<InstanceSummary>,
}

fn error_response(status: StatusCode, body: ErrorResponse) -> Response {
    (status, Json(body)).into_response()
}

/// Deploy a fleet and, for two or more replicas, balance traffic across it
async fn deploy(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DeploymentRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(body) => body,
        Err(rejection) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: format!("Invalid JSON: {}", rejection.body_text()),
                    phase: None,
                    index: None,
                },
            );
        }
    };

    info!(fleet = %request.name, replicas = request.replicas, "Received deployment");

    match state.orchestrator.deploy_request(request).await {
        Ok(outcome) => {
            state.health_registry.set_healthy(components::RUNTIME).await;
            if !outcome.rules.is_empty() {
                state
                    .health_registry
                    .set_healthy(components::PACKET_FILTER)
                    .await;
            }

            let body = DeployResponse {
                message: format!("Containers started, {}!", outcome.name),
                state: outcome.state,
                replicas: outcome.replicas,
                rules: outcome.rules,
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => {
            let status = match &e {
                DeployError::Validation(_) => StatusCode::BAD_REQUEST,
                DeployError::Provisioning(p) => {
                    state
                        .health_registry
                        .set_degraded(components::RUNTIME, p.to_string())
                        .await;
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                DeployError::Installation(i) => {
                    state
                        .health_registry
                        .set_degraded(components::PACKET_FILTER, i.to_string())
                        .await;
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                DeployError::Planning(_) => StatusCode::INTERNAL_SERVER_ERROR,
            };

            error_response(
                status,
                ErrorResponse {
                    error: e.to_string(),
                    phase: Some(e.phase().to_string()),
                    index: e.index(),
                },
            )
        }
    }
}

/// List running instances of a fleet by its owning label
async fn fleet(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> Response {
    match state.runtime.list_by_label(FLEET_LABEL, &name).await {
        Ok(instances) => (StatusCode::OK, Json(FleetResponse { name, instances })).into_response(),
        Err(e) => {
            error!(fleet = %name, error = %e, "Inventory lookup failed");
            error_response(
                StatusCode::BAD_GATEWAY,
                ErrorResponse {
                    error: format!("{:#}", e),
                    phase: None,
                    index: None,
                },
            )
        }
    }
}

/// Health check response - returns 200 if healthy or degraded, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/deploy", post(deploy))
        .route("/fleets/:name", get(fleet))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
