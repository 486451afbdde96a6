//! HTTP API handlers.

pub mod agents;
pub mod auth;
pub mod calls;
pub mod invites;
pub mod roles;
pub mod tenants;
pub mod voice;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::{extract::State, http::header, http::StatusCode, response::IntoResponse, Json};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use tracing::warn;

use crate::config::Config;
use crate::schemas::{HealthStatus, MessageResponse, SuccessResponse};
use crate::services::{Mailer, Services};
use crate::store::Store;

/// Application state shared with handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn Store>,
    pub services: Services,
    /// Whether the server finished starting and accepts traffic.
    pub ready: Arc<AtomicBool>,
    /// Prometheus exporter, when installed.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create new app state.
    pub fn new(config: Arc<Config>, store: Arc<dyn Store>, mailer: Arc<dyn Mailer>) -> Self {
        let services = Services::new(config.clone(), store.clone(), mailer);
        Self {
            config,
            store,
            services,
            ready: Arc::new(AtomicBool::new(false)),
            metrics: None,
        }
    }

    /// Attach a Prometheus handle for `GET /metrics`.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Set ready state.
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Check if ready.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

/// Readiness check response.
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    /// Whether service is ready.
    pub ready: bool,
}

/// Welcome message.
#[utoipa::path(
    get,
    path = "/",
    tag = "health",
    responses((status = 200, description = "Service banner", body = SuccessResponse<MessageResponse>))
)]
pub async fn root() -> SuccessResponse<MessageResponse> {
    SuccessResponse::ok(
        MessageResponse::new("Welcome to the voice agent API"),
        "Service is running",
    )
}

/// Health check handler - always returns 200.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses((status = 200, description = "Process is alive", body = SuccessResponse<HealthStatus>))
)]
pub async fn health() -> SuccessResponse<HealthStatus> {
    SuccessResponse::ok(
        HealthStatus {
            status: "ok".to_string(),
        },
        "Service is healthy",
    )
}

/// Readiness check handler - returns 200 if started and the store answers, 503 otherwise.
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let store_ok = match state.store.ping().await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "Readiness probe: store unavailable");
            false
        }
    };
    let is_ready = state.is_ready() && store_ok;

    let status = if is_ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(ReadyResponse { ready: is_ready }))
}

/// Prometheus scrape endpoint.
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics exporter not installed").into_response(),
    }
}
