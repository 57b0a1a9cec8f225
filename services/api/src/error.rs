//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service, and its single
//! translation into HTTP responses.

use crate::config::ConfigError;
use crate::web::envelope::ApiResponse;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use scripture_core::ports::PortError;
use tracing::error;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a failure while applying the schema migrations.
    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents an error from the cache client.
    #[error("Cache Error: {0}")]
    Cache(#[from] redis::RedisError),

    /// Represents an error from the gRPC server.
    #[error("gRPC Transport Error: {0}")]
    Transport(#[from] tonic::transport::Error),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_input(message: impl Into<String>) -> Self {
        ApiError::Port(PortError::BadInput(message.into()))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Port(PortError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Port(PortError::BadInput(_)) => StatusCode::BAD_REQUEST,
            ApiError::Port(PortError::Conflict(_)) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message shown to clients. Internal failures are reduced to a generic line.
    fn public_message(&self) -> String {
        match self {
            ApiError::Port(PortError::NotFound(m))
            | ApiError::Port(PortError::BadInput(m))
            | ApiError::Port(PortError::Conflict(m)) => m.clone(),
            _ => "An internal error occurred".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        let body: ApiResponse<()> = ApiResponse::failure(self.public_message());
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_errors_map_to_their_status() {
        let cases = [
            (PortError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (PortError::BadInput("x".into()), StatusCode::BAD_REQUEST),
            (PortError::Conflict("x".into()), StatusCode::CONFLICT),
            (PortError::Unexpected("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (port, status) in cases {
            assert_eq!(ApiError::from(port).status_code(), status);
        }
    }

    #[test]
    fn internal_details_are_not_exposed() {
        let err = ApiError::from(PortError::Unexpected(
            "connection refused at 10.0.0.3:5432".to_string(),
        ));
        assert_eq!(err.public_message(), "An internal error occurred");

        let err = ApiError::from(PortError::NotFound("Chapter 115 not found".to_string()));
        assert_eq!(err.public_message(), "Chapter 115 not found");
    }
}
