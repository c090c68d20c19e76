use crate::error::{ApiError, ErrorResponse};
use crate::models::{Envelope, StatsResponse};
use crate::routes;
use crate::state::AppState;
use axum::{extract::State, Json};

/// GET /configs handler - Distinct configuration types
#[utoipa::path(
    get,
    path = routes::CONFIGS,
    responses(
        (status = 200, description = "Known config types", body = Envelope<Vec<String>>),
        (status = 404, description = "Store query failed", body = ErrorResponse)
    ),
    tag = "configs"
)]
pub async fn config_types_handler(
    State(state): State<AppState>,
) -> Result<Json<Envelope<Vec<String>>>, ApiError> {
    let types = state.service.config_types().await?;
    tracing::info!("Listed {} config types", types.len());
    Ok(Json(Envelope::ok(types)))
}

/// GET /stats handler - Store size and document count
#[utoipa::path(
    get,
    path = routes::STATS,
    responses(
        (status = 200, description = "Store statistics", body = Envelope<StatsResponse>),
        (status = 404, description = "Store query failed", body = ErrorResponse)
    ),
    tag = "configs"
)]
pub async fn stats_handler(
    State(state): State<AppState>,
) -> Result<Json<Envelope<StatsResponse>>, ApiError> {
    let stats = state.service.stats().await?;
    Ok(Json(Envelope::ok(stats)))
}
