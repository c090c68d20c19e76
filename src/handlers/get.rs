use crate::error::{ApiError, ErrorResponse};
use crate::models::{ConfigDetail, Envelope};
use crate::routes;
use crate::state::AppState;
use axum::extract::rejection::PathRejection;
use axum::{extract::Path, extract::State, Json};

/// GET /configs/{config_type}/{name} handler - Retrieve a live document
#[utoipa::path(
    get,
    path = routes::CONFIG_ITEM,
    params(
        ("config_type" = String, Path, description = "Configuration type"),
        ("name" = String, Path, description = "Document name")
    ),
    responses(
        (status = 200, description = "Document found", body = Envelope<ConfigDetail>),
        (status = 400, description = "Malformed value reference", body = ErrorResponse),
        (status = 404, description = "Configuration not found", body = ErrorResponse),
        (status = 409, description = "Store error", body = ErrorResponse)
    ),
    tag = "configs"
)]
pub async fn get_handler(
    State(state): State<AppState>,
    path: Result<Path<(String, String)>, PathRejection>,
) -> Result<Json<Envelope<ConfigDetail>>, ApiError> {
    let Path((config_type, name)) = path?;
    let doc = state.service.get(&config_type, &name, false).await?;
    tracing::info!("Retrieved config {}/{}", config_type, name);
    Ok(Json(Envelope::ok(doc)))
}

/// GET /configs/discarded/{config_type}/{name} handler - Retrieve a discarded document
#[utoipa::path(
    get,
    path = routes::DISCARDED_ITEM,
    params(
        ("config_type" = String, Path, description = "Configuration type"),
        ("name" = String, Path, description = "Discarded document name")
    ),
    responses(
        (status = 200, description = "Document found", body = Envelope<ConfigDetail>),
        (status = 400, description = "Malformed value reference", body = ErrorResponse),
        (status = 404, description = "Configuration not found", body = ErrorResponse),
        (status = 409, description = "Store error", body = ErrorResponse)
    ),
    tag = "configs"
)]
pub async fn get_discarded_handler(
    State(state): State<AppState>,
    path: Result<Path<(String, String)>, PathRejection>,
) -> Result<Json<Envelope<ConfigDetail>>, ApiError> {
    let Path((config_type, name)) = path?;
    let doc = state.service.get(&config_type, &name, true).await?;
    tracing::info!("Retrieved discarded config {}/{}", config_type, name);
    Ok(Json(Envelope::ok(doc)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{send, test_app};
    use axum::http::StatusCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_get_endpoint_success() {
        let app = test_app();

        let (status, _) = send(&app, "POST", "/configs/net/eth0", Some(r#"{"mtu":1500}"#)).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&app, "GET", "/configs/net/eth0", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["code"], 200);
        assert_eq!(body["message"], "ok");
        let doc: ConfigDetail = serde_json::from_value(body["result"].clone()).unwrap();
        assert_eq!(doc.name, "eth0");
        assert_eq!(doc.config_type, "net");
        assert_eq!(doc.value, json!({"mtu": 1500}));
        assert!(!doc.discarded);
        assert_eq!(doc.modified.len(), 1);
        assert!(body["result"].get("id").is_none());
    }

    #[tokio::test]
    async fn test_get_endpoint_not_found() {
        let app = test_app();

        let (status, body) = send(&app, "GET", "/configs/net/eth9", None).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        let error_response: ErrorResponse = serde_json::from_value(body).unwrap();
        assert_eq!(error_response.code, 404);
        assert!(error_response.message.contains("Configuration not found"));
    }

    #[tokio::test]
    async fn test_get_endpoint_complex_json() {
        let app = test_app();
        let test_data = json!({
            "string": "hello",
            "number": 123,
            "float": 45.67,
            "boolean": true,
            "null": null,
            "array": [1, 2, 3],
            "nested": {
                "key": "value"
            },
            "unicode": "こんにちは 🚀",
            "large": "x".repeat(8192)
        });

        send(&app, "POST", "/configs/app/complex", Some(&test_data.to_string())).await;
        let (status, body) = send(&app, "GET", "/configs/app/complex", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"]["value"], test_data);
    }

    #[tokio::test]
    async fn test_get_discarded_endpoint() {
        let app = test_app();
        send(&app, "POST", "/configs/net/eth0", Some(r#"{"mtu":1500}"#)).await;
        let (_, discarded) = send(&app, "DELETE", "/configs/net/eth0", None).await;
        let new_name = discarded["result"].as_str().unwrap();

        let (status, body) = send(&app, "GET", &format!("/configs/discarded/net/{}", new_name), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"]["discarded"], true);
        assert_eq!(body["result"]["value"], json!({"mtu": 1500}));

        // Live documents are not served from the discarded path
        send(&app, "POST", "/configs/net/eth1", Some("1")).await;
        let (status, _) = send(&app, "GET", "/configs/discarded/net/eth1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_get_endpoint_undecodable_name() {
        let app = test_app();

        let (status, body) = send(&app, "GET", "/configs/net/%FF", None).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let error_response: ErrorResponse = serde_json::from_value(body).unwrap();
        assert_eq!(error_response.code, 400);
        assert!(error_response.message.contains("UTF-8"));
    }
}
