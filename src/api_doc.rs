use utoipa::OpenApi;

use crate::error::{ErrorResponse, HealthResponse, UnhealthyResponse};
use crate::handlers;
use crate::models::{ConfigDetail, ConfigSummary, ListFilter, StatsResponse};

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "spanner-config-store API",
        version = "1.0.0",
        description = "Named JSON configuration documents with soft-delete, restore and rename"
    ),
    paths(
        handlers::health::health_handler,
        handlers::configs::config_types_handler,
        handlers::configs::stats_handler,
        handlers::list::list_handler,
        handlers::list::list_discarded_handler,
        handlers::get::get_handler,
        handlers::get::get_discarded_handler,
        handlers::insert::insert_handler,
        handlers::discard::discard_handler,
        handlers::discard::restore_handler,
        handlers::rename::rename_handler
    ),
    components(
        schemas(
            ConfigSummary,
            ConfigDetail,
            StatsResponse,
            ListFilter,
            ErrorResponse,
            HealthResponse,
            UnhealthyResponse
        )
    ),
    tags(
        (name = "health", description = "Health check operations"),
        (name = "configs", description = "Configuration document operations")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_every_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&str> = doc.paths.paths.keys().map(String::as_str).collect();

        for path in [
            crate::routes::HEALTH,
            crate::routes::CONFIGS,
            crate::routes::STATS,
            crate::routes::CONFIGS_BY_TYPE,
            crate::routes::DISCARDED_BY_TYPE,
            crate::routes::CONFIG_ITEM,
            crate::routes::DISCARDED_ITEM,
            crate::routes::RENAME,
        ] {
            assert!(paths.contains(&path), "missing {}", path);
        }
    }
}
