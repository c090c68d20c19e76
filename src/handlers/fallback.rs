use crate::error::ApiError;
use axum::http::{Method, Uri};

/// Answers methods a route does not support
pub async fn method_not_allowed(method: Method) -> ApiError {
    tracing::info!("Rejected unsupported method: {}", method);
    ApiError::MethodNotAllowed(method)
}

/// Answers paths no route matches
pub async fn route_not_found(uri: Uri) -> ApiError {
    ApiError::RouteNotFound(uri.path().to_string())
}
