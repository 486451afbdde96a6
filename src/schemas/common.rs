//! Response envelopes shared by every endpoint.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

/// Envelope around every successful payload.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SuccessResponse<T> {
    pub data: T,
    pub message: String,
    pub status_code: u16,
}

impl<T> SuccessResponse<T> {
    /// `200 OK` envelope.
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self::with_status(data, message, StatusCode::OK)
    }

    /// `201 Created` envelope.
    pub fn created(data: T, message: impl Into<String>) -> Self {
        Self::with_status(data, message, StatusCode::CREATED)
    }

    /// Envelope with an explicit status.
    pub fn with_status(data: T, message: impl Into<String>, status: StatusCode) -> Self {
        Self {
            data,
            message: message.into(),
            status_code: status.as_u16(),
        }
    }
}

impl<T: Serialize> IntoResponse for SuccessResponse<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::OK);
        (status, Json(self)).into_response()
    }
}

/// Envelope of every failed request.
#[derive(Debug, Clone, Serialize, serde::Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub message: String,
    pub status_code: u16,
    /// Machine readable error code.
    pub error: Option<String>,
}

/// Payload that only carries a message.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Health check payload.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HealthStatus {
    /// Status: "ok".
    pub status: String,
}
