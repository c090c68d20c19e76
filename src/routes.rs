// Route path constants - single source of truth for all API paths

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api_doc::ApiDoc;
use crate::handlers;
use crate::state::AppState;

pub const ROOT: &str = "/";
pub const HEALTH: &str = "/health";
pub const STATS: &str = "/stats";
pub const CONFIGS: &str = "/configs";
pub const CONFIGS_BY_TYPE: &str = "/configs/{config_type}";
pub const DISCARDED_BY_TYPE: &str = "/configs/discarded/{config_type}";
pub const CONFIG_ITEM: &str = "/configs/{config_type}/{name}";
pub const DISCARDED_ITEM: &str = "/configs/discarded/{config_type}/{name}";
pub const RENAME: &str = "/configs/rename/{config_type}/{old_name}/{new_name}";

pub const SWAGGER_UI: &str = "/swagger-ui";
pub const OPENAPI_JSON: &str = "/api-docs/openapi.json";

/// Build the application router
///
/// Every route only answers its documented methods; anything else is
/// rejected by [`handlers::method_not_allowed`]. Request bodies are capped
/// at `MAX_BODY_BYTES` instead of axum's 2 MiB default.
pub fn router(state: AppState) -> Router {
    let reject = handlers::method_not_allowed;
    let body_limit = match state.config.max_body_bytes {
        0 => DefaultBodyLimit::disable(),
        limit => DefaultBodyLimit::max(limit),
    };

    Router::new()
        .route(ROOT, get(handlers::config_types_handler).fallback(reject))
        .route(CONFIGS, get(handlers::config_types_handler).fallback(reject))
        .route(HEALTH, get(handlers::health_handler).fallback(reject))
        .route(STATS, get(handlers::stats_handler).fallback(reject))
        .route(CONFIGS_BY_TYPE, get(handlers::list_handler).fallback(reject))
        .route(DISCARDED_BY_TYPE, get(handlers::list_discarded_handler).fallback(reject))
        .route(
            CONFIG_ITEM,
            get(handlers::get_handler)
                .post(handlers::insert_handler)
                .delete(handlers::discard_handler)
                .fallback(reject),
        )
        .route(
            DISCARDED_ITEM,
            get(handlers::get_discarded_handler)
                .post(handlers::restore_handler)
                .fallback(reject),
        )
        .route(RENAME, post(handlers::rename_handler).fallback(reject))
        .merge(SwaggerUi::new(SWAGGER_UI).url(OPENAPI_JSON, ApiDoc::openapi()))
        .fallback(handlers::route_not_found)
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

