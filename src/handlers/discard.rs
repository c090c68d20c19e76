use crate::error::{ApiError, ErrorResponse};
use crate::models::Envelope;
use crate::routes;
use crate::state::AppState;
use axum::extract::rejection::PathRejection;
use axum::{extract::Path, extract::State, Json};

/// DELETE /configs/{config_type}/{name} handler - Discard a document
///
/// The document is kept but renamed with a UUID suffix; the new name is returned.
#[utoipa::path(
    delete,
    path = routes::CONFIG_ITEM,
    params(
        ("config_type" = String, Path, description = "Configuration type"),
        ("name" = String, Path, description = "Document name")
    ),
    responses(
        (status = 200, description = "Document discarded; result is its new name", body = Envelope<String>),
        (status = 404, description = "Configuration not found", body = ErrorResponse),
        (status = 409, description = "Store error", body = ErrorResponse)
    ),
    tag = "configs"
)]
pub async fn discard_handler(
    State(state): State<AppState>,
    path: Result<Path<(String, String)>, PathRejection>,
) -> Result<Json<Envelope<String>>, ApiError> {
    let Path((config_type, name)) = path?;
    let new_name = state.service.discard(&config_type, &name).await?;
    Ok(Json(Envelope::ok(new_name)))
}

/// POST /configs/discarded/{config_type}/{name} handler - Restore a discarded document
///
/// The document keeps its discarded name; the result is the number restored.
#[utoipa::path(
    post,
    path = routes::DISCARDED_ITEM,
    params(
        ("config_type" = String, Path, description = "Configuration type"),
        ("name" = String, Path, description = "Discarded document name")
    ),
    responses(
        (status = 200, description = "Number of documents restored", body = Envelope<u64>),
        (status = 404, description = "Configuration not found", body = ErrorResponse),
        (status = 409, description = "Name in use or store error", body = ErrorResponse)
    ),
    tag = "configs"
)]
pub async fn restore_handler(
    State(state): State<AppState>,
    path: Result<Path<(String, String)>, PathRejection>,
) -> Result<Json<Envelope<u64>>, ApiError> {
    let Path((config_type, name)) = path?;
    let restored = state.service.restore(&config_type, &name).await?;
    Ok(Json(Envelope::ok(restored)))
}
