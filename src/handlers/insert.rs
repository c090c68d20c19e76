use crate::error::{ApiError, ErrorResponse};
use crate::models::Envelope;
use crate::routes;
use crate::state::AppState;
use axum::extract::rejection::{BytesRejection, PathRejection};
use axum::{body::Bytes, extract::Path, extract::State, Json};
use serde_json::Value as JsonValue;

/// POST /configs/{config_type}/{name} handler - Store a JSON document
///
/// A live document already holding the name is discarded first; its new
/// name is returned (empty when the name was free).
#[utoipa::path(
    post,
    path = routes::CONFIG_ITEM,
    params(
        ("config_type" = String, Path, description = "Configuration type"),
        ("name" = String, Path, description = "Document name")
    ),
    request_body = serde_json::Value,
    responses(
        (status = 200, description = "Document stored; result is the discarded predecessor name", body = Envelope<String>),
        (status = 400, description = "Missing or invalid JSON", body = ErrorResponse),
        (status = 409, description = "Store error", body = ErrorResponse)
    ),
    tag = "configs"
)]
pub async fn insert_handler(
    State(state): State<AppState>,
    path: Result<Path<(String, String)>, PathRejection>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<Envelope<String>>, ApiError> {
    let Path((config_type, name)) = path?;
    let body = body?;
    let value = parse_payload(&body)?;
    let predecessor = state.service.insert(&config_type, &name, value).await?;
    Ok(Json(Envelope::ok(predecessor)))
}

fn parse_payload(body: &[u8]) -> Result<JsonValue, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ApiError::MissingPayload);
    }
    match serde_json::from_slice(body)? {
        JsonValue::Null => Err(ApiError::MissingPayload),
        value => Ok(value),
    }
}
