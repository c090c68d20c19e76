use axum::{
    extract::rejection::{BytesRejection, PathRejection},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::service::{ConfigError, StoreOp};

/// Uniform error envelope: `{code, message}`
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
}

/// Response type for health check endpoint
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Response type for unhealthy status
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct UnhealthyResponse {
    pub status: String,
    pub error: String,
}

/// Custom error type for API endpoints
///
/// Maps every failure, whether raised by the router or by the
/// configuration service, to an HTTP status and an [`ErrorResponse`] body
/// whose `code` matches that status.
#[derive(Debug)]
pub enum ApiError {
    /// Route exists but does not accept this method
    MethodNotAllowed(Method),
    /// Mutating route called without a JSON body
    MissingPayload,
    /// Request body is not valid JSON for this route
    JsonError(serde_json::Error),
    /// Request body could not be read, e.g. it exceeds the body limit
    BodyRejected(BytesRejection),
    /// Path parameters could not be decoded
    PathRejected(PathRejection),
    /// No route matches the request path
    RouteNotFound(String),
    /// Failure reported by the configuration service
    Config(ConfigError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MethodNotAllowed(_)
            | ApiError::MissingPayload
            | ApiError::JsonError(_)
            | ApiError::PathRejected(_) => StatusCode::BAD_REQUEST,
            ApiError::BodyRejected(rejection) => rejection.status(),
            ApiError::RouteNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Config(err) => match err {
                ConfigError::InvalidIdentifier(_) => StatusCode::BAD_REQUEST,
                ConfigError::NotFound { .. } => StatusCode::NOT_FOUND,
                ConfigError::Conflict(_) => StatusCode::CONFLICT,
                ConfigError::StoreUnavailable { op: StoreOp::Query, .. } => StatusCode::NOT_FOUND,
                ConfigError::StoreUnavailable { .. } => StatusCode::CONFLICT,
            },
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::MethodNotAllowed(method) => {
                format!("Endpoint does not support {} action", method)
            }
            ApiError::MissingPayload => "No data sent".to_string(),
            ApiError::JsonError(err) => format!("JSON parse error: {}", err),
            ApiError::BodyRejected(rejection) => rejection.body_text(),
            ApiError::PathRejected(rejection) => rejection.body_text(),
            ApiError::RouteNotFound(path) => format!("Route not found: {}", path),
            ApiError::Config(err) => err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.message();

        if let ApiError::Config(ConfigError::StoreUnavailable { source, .. }) = &self {
            tracing::error!("Store failure: {:?}", source);
        }

        let body = Json(ErrorResponse {
            code: status.as_u16(),
            message,
        });

        (status, body).into_response()
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::Config(err)
    }
}

impl From<BytesRejection> for ApiError {
    fn from(rejection: BytesRejection) -> Self {
        ApiError::BodyRejected(rejection)
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::PathRejected(rejection)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::JsonError(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;

    async fn body_of(err: ApiError) -> (StatusCode, ErrorResponse) {
        let response = err.into_response();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_code_matches_status() {
        let (status, body) = body_of(ApiError::MissingPayload).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.code, 400);
        assert_eq!(body.message, "No data sent");
    }

    #[tokio::test]
    async fn test_method_not_allowed_is_client_error() {
        let (status, body) = body_of(ApiError::MethodNotAllowed(Method::PUT)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.message.contains("PUT"));
    }

    #[test]
    fn test_config_error_statuses() {
        let not_found = ApiError::from(ConfigError::NotFound {
            config_type: "net".to_string(),
            name: "eth0".to_string(),
        });
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let conflict = ApiError::from(ConfigError::Conflict("Name already in use.".to_string()));
        assert_eq!(conflict.status(), StatusCode::CONFLICT);

        let invalid = ApiError::from(ConfigError::InvalidIdentifier("zz".to_string()));
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_store_failure_status_depends_on_operation() {
        let failure = |op| {
            ApiError::from(ConfigError::StoreUnavailable {
                op,
                source: StoreError::Backend(anyhow::anyhow!("connection refused")),
            })
        };
        assert_eq!(failure(StoreOp::Query).status(), StatusCode::NOT_FOUND);
        assert_eq!(failure(StoreOp::Lookup).status(), StatusCode::CONFLICT);
        assert_eq!(failure(StoreOp::Write).status(), StatusCode::CONFLICT);
    }
}
