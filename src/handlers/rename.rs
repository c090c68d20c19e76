use crate::error::{ApiError, ErrorResponse};
use crate::models::Envelope;
use crate::routes;
use crate::state::AppState;
use axum::extract::rejection::PathRejection;
use axum::{extract::Path, extract::State, Json};

/// POST /configs/rename/{config_type}/{old_name}/{new_name} handler - Rename a live document
#[utoipa::path(
    post,
    path = routes::RENAME,
    params(
        ("config_type" = String, Path, description = "Configuration type"),
        ("old_name" = String, Path, description = "Current document name"),
        ("new_name" = String, Path, description = "New document name")
    ),
    responses(
        (status = 200, description = "Number of documents renamed", body = Envelope<u64>),
        (status = 404, description = "Configuration not found", body = ErrorResponse),
        (status = 409, description = "Name already in use", body = ErrorResponse)
    ),
    tag = "configs"
)]
pub async fn rename_handler(
    State(state): State<AppState>,
    path: Result<Path<(String, String, String)>, PathRejection>,
) -> Result<Json<Envelope<u64>>, ApiError> {
    let Path((config_type, old_name, new_name)) = path?;
    let renamed = state
        .service
        .rename(&config_type, &old_name, &new_name)
        .await?;
    Ok(Json(Envelope::ok(renamed)))
}
