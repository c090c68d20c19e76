use crate::error::{ApiError, ErrorResponse};
use crate::models::{ConfigSummary, Envelope, ListFilter};
use crate::routes;
use crate::state::AppState;
use axum::extract::rejection::{BytesRejection, PathRejection};
use axum::{body::Bytes, extract::Path, extract::State, Json};

/// GET /configs/{config_type} handler - List live documents of a type
///
/// An optional JSON body narrows the listing, e.g. `{"name": "eth0"}`.
#[utoipa::path(
    get,
    path = routes::CONFIGS_BY_TYPE,
    params(
        ("config_type" = String, Path, description = "Configuration type")
    ),
    request_body(content = ListFilter, description = "Optional filter"),
    responses(
        (status = 200, description = "Document summaries", body = Envelope<Vec<ConfigSummary>>),
        (status = 400, description = "Invalid filter", body = ErrorResponse),
        (status = 404, description = "Store query failed", body = ErrorResponse)
    ),
    tag = "configs"
)]
pub async fn list_handler(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<Envelope<Vec<ConfigSummary>>>, ApiError> {
    let Path(config_type) = path?;
    let body = body?;
    list(&state, &config_type, false, &body).await
}

/// GET /configs/discarded/{config_type} handler - List discarded documents of a type
#[utoipa::path(
    get,
    path = routes::DISCARDED_BY_TYPE,
    params(
        ("config_type" = String, Path, description = "Configuration type")
    ),
    request_body(content = ListFilter, description = "Optional filter"),
    responses(
        (status = 200, description = "Discarded document summaries", body = Envelope<Vec<ConfigSummary>>),
        (status = 400, description = "Invalid filter", body = ErrorResponse),
        (status = 404, description = "Store query failed", body = ErrorResponse)
    ),
    tag = "configs"
)]
pub async fn list_discarded_handler(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<Envelope<Vec<ConfigSummary>>>, ApiError> {
    let Path(config_type) = path?;
    let body = body?;
    list(&state, &config_type, true, &body).await
}

async fn list(
    state: &AppState,
    config_type: &str,
    discarded: bool,
    body: &[u8],
) -> Result<Json<Envelope<Vec<ConfigSummary>>>, ApiError> {
    let filter = parse_filter(body)?;
    let summaries = state.service.list(config_type, discarded, filter).await?;

    tracing::info!(
        "Listed {} {} configs of type {}",
        summaries.len(),
        if discarded { "discarded" } else { "live" },
        config_type
    );
    Ok(Json(Envelope::ok(summaries)))
}

fn parse_filter(body: &[u8]) -> Result<ListFilter, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ListFilter::default());
    }
    let filter: Option<ListFilter> = serde_json::from_slice(body)?;
    Ok(filter.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{send, test_app};
    use axum::http::StatusCode;

    #[test]
    fn test_parse_filter() {
        assert_eq!(parse_filter(b"").unwrap(), ListFilter::default());
        assert_eq!(parse_filter(b"  \n").unwrap(), ListFilter::default());
        assert_eq!(parse_filter(b"null").unwrap(), ListFilter::default());
        assert_eq!(
            parse_filter(br#"{"name":"eth0"}"#).unwrap().name.as_deref(),
            Some("eth0")
        );
        assert!(matches!(
            parse_filter(br#"{"colour":"red"}"#),
            Err(ApiError::JsonError(_))
        ));
    }

    #[tokio::test]
    async fn test_list_endpoint_empty() {
        let app = test_app();

        let (status, body) = send(&app, "GET", "/configs/net", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["code"], 200);
        assert_eq!(body["message"], "ok");
        assert_eq!(body["result"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_list_endpoint_with_data() {
        let app = test_app();
        send(&app, "POST", "/configs/net/eth0", Some(r#"{"mtu":1500}"#)).await;
        send(&app, "POST", "/configs/net/eth1", Some(r#"{"mtu":9000}"#)).await;
        send(&app, "POST", "/configs/display/main", Some(r#"{"width":1920}"#)).await;

        let (status, body) = send(&app, "GET", "/configs/net", None).await;
        assert_eq!(status, StatusCode::OK);

        let summaries: Vec<ConfigSummary> = serde_json::from_value(body["result"].clone()).unwrap();
        let mut names: Vec<&str> = summaries.iter().map(|s| s.name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["eth0", "eth1"]);
        assert!(summaries.iter().all(|s| s.config_type == "net" && !s.discarded));

        // Summaries never carry the value or the internal id
        let first = &body["result"][0];
        assert!(first.get("value").is_none());
        assert!(first.get("id").is_none());
    }

    #[tokio::test]
    async fn test_list_endpoint_with_filter() {
        let app = test_app();
        send(&app, "POST", "/configs/net/eth0", Some("1")).await;
        send(&app, "POST", "/configs/net/eth1", Some("2")).await;

        let (status, body) = send(&app, "GET", "/configs/net", Some(r#"{"name":"eth1"}"#)).await;

        assert_eq!(status, StatusCode::OK);
        let result = body["result"].as_array().unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0]["name"], "eth1");
    }

    #[tokio::test]
    async fn test_list_endpoint_invalid_filter() {
        let app = test_app();

        let (status, body) = send(&app, "GET", "/configs/net", Some("{invalid json}")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], 400);
        assert!(body["message"].as_str().unwrap().contains("JSON parse error"));
    }

    #[tokio::test]
    async fn test_list_discarded_endpoint() {
        let app = test_app();
        send(&app, "POST", "/configs/net/eth0", Some("1")).await;
        send(&app, "POST", "/configs/net/eth1", Some("2")).await;
        let (_, discarded) = send(&app, "DELETE", "/configs/net/eth0", None).await;

        let (status, body) = send(&app, "GET", "/configs/discarded/net", None).await;

        assert_eq!(status, StatusCode::OK);
        let result = body["result"].as_array().unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0]["name"], discarded["result"]);
        assert_eq!(result[0]["discarded"], true);

        let (_, live) = send(&app, "GET", "/configs/net", None).await;
        assert_eq!(live["result"].as_array().unwrap().len(), 1);
        assert_eq!(live["result"][0]["name"], "eth1");
    }
}
