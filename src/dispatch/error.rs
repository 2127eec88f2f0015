//! Dispatch error types and the generic error path.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::routing::{RegistryError, RouteInfo};
use crate::validation::ValidationIssue;

pub const INTERNAL_ERROR_MESSAGE: &str = "Internal Server Error";

/// Error returned by a route handler.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// An expected failure with a status and a client-facing message.
    #[error("{status}: {message}")]
    Status { status: StatusCode, message: String },

    /// An unexpected failure. Never shown to the client.
    #[error("internal error: {0}")]
    Internal(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl HandlerError {
    pub fn status(status: StatusCode, message: impl Into<String>) -> Self {
        HandlerError::Status {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::status(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::status(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::status(StatusCode::CONFLICT, message)
    }

    pub fn internal<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        HandlerError::Internal(Box::new(error))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            HandlerError::Status { status, .. } => *status,
            HandlerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        match self {
            HandlerError::Status { status, message } if !status.is_server_error() => {
                (status, Json(json!({ "error": message }))).into_response()
            }
            HandlerError::Status { status, .. } => opaque(status),
            HandlerError::Internal(_) => opaque(StatusCode::INTERNAL_SERVER_ERROR),
        }
    }
}

/// Failures of the dispatch core itself, as opposed to the handler.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("strict mode: route conflicts detected: {0}")]
    StrictConflicts(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("response for {route} violates its schema: {}", join_issues(.issues))]
    ResponseContract {
        route: String,
        issues: Vec<ValidationIssue>,
    },

    #[error("failed to read request body: {0}")]
    BodyRead(String),

    #[error("failed to serialize response: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DispatchError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DispatchError::BodyRead(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn opaque(status: StatusCode) -> Response {
    (status, Json(json!({ "error": INTERNAL_ERROR_MESSAGE }))).into_response()
}

/// Turns failures into client responses.
///
/// Everything that is not a validation rejection ends up here. Implementors
/// must not leak internal details for 5xx statuses.
pub trait ErrorResponder: Send + Sync + 'static {
    fn handler_error(&self, route: &RouteInfo, error: HandlerError) -> Response;

    fn dispatch_error(&self, route: &RouteInfo, error: &DispatchError) -> Response;
}

/// JSON `{"error": ...}` bodies; 5xx bodies are always opaque.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultErrorResponder;

impl ErrorResponder for DefaultErrorResponder {
    fn handler_error(&self, _route: &RouteInfo, error: HandlerError) -> Response {
        error.into_response()
    }

    fn dispatch_error(&self, _route: &RouteInfo, error: &DispatchError) -> Response {
        match error {
            DispatchError::BodyRead(_) => (
                error.status_code(),
                Json(json!({ "error": "Failed to read request body" })),
            )
                .into_response(),
            _ => opaque(error.status_code()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::Location;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_client_error_keeps_message() {
        let response = HandlerError::not_found("user 7 not found").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"], "user 7 not found");
    }

    #[tokio::test]
    async fn test_server_errors_are_opaque() {
        let io = std::io::Error::other("database password rejected");
        let response = HandlerError::internal(io).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["error"], INTERNAL_ERROR_MESSAGE);

        let response =
            HandlerError::status(StatusCode::BAD_GATEWAY, "upstream at 10.0.0.3 down").into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(body_json(response).await["error"], INTERNAL_ERROR_MESSAGE);
    }

    #[test]
    fn test_response_contract_message() {
        let error = DispatchError::ResponseContract {
            route: "GET /users/:id".into(),
            issues: vec![
                ValidationIssue::new(Location::Response, "id", "required"),
                ValidationIssue::new(Location::Response, "email", "expected string, received number"),
            ],
        };
        assert_eq!(
            error.to_string(),
            "response for GET /users/:id violates its schema: response.id: required; response.email: expected string, received number"
        );
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
