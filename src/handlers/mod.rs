pub mod health;
pub mod configs;
pub mod list;
pub mod get;
pub mod insert;
pub mod discard;
pub mod rename;
pub mod fallback;

pub use health::health_handler;
pub use configs::{config_types_handler, stats_handler};
pub use list::{list_discarded_handler, list_handler};
pub use get::{get_discarded_handler, get_handler};
pub use insert::insert_handler;
pub use discard::{discard_handler, restore_handler};
pub use rename::rename_handler;
pub use fallback::{method_not_allowed, route_not_found};

#[cfg(test)]
pub(crate) mod test_support {
    use crate::config::Config;
    use crate::memory::InMemoryStore;
    use crate::service::ConfigService;
    use crate::state::AppState;
    use axum::{body::Body, http::Request, http::StatusCode, Router};
    use serde_json::Value as JsonValue;
    use std::sync::Arc;
    use tower::ServiceExt;

    /// Full application router over a fresh in-memory store
    pub fn test_app() -> Router {
        test_app_with_config(Config::in_memory())
    }

    pub fn test_app_with_config(config: Config) -> Router {
        let store = InMemoryStore::new();
        let service = ConfigService::new(
            Arc::new(store.clone()),
            Arc::new(store),
            config.blob_threshold_bytes,
        );

        crate::routes::router(AppState {
            service,
            config: Arc::new(config),
        })
    }

    /// Send one request and decode the JSON response body
    pub async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<&str>,
    ) -> (StatusCode, JsonValue) {
        let mut builder = Request::builder().method(method).uri(uri);
        if body.is_some() {
            builder = builder.header("content-type", "application/json");
        }
        let request = builder
            .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            JsonValue::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }
}
