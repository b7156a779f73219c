//! The HTTP adapter (spec §6): a RESTful, JSON-over-HTTP surface in front of
//! an [`Orchestrator`]. This is the one place the core touches tokio —
//! handlers hand off to `spawn_blocking` and otherwise stay thin.

#![warn(missing_docs)]

mod dto;
mod error;
mod handlers;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;
use vkv_engine::Orchestrator;

pub use error::ApiError;

/// Build the router. The caller owns bringing up the tokio runtime and
/// calling `axum::serve`.
pub fn router(orchestrator: Arc<Orchestrator>) -> Router {
    Router::new()
        .route("/v1/datasets", post(handlers::create_dataset).get(handlers::list_datasets))
        .route(
            "/v1/datasets/:dataset",
            get(handlers::get_dataset).post(handlers::load_entries_rows),
        )
        .route("/v1/versions", post(handlers::create_version).get(handlers::list_versions))
        .route("/v1/versions/:id", get(handlers::get_version))
        .route("/v1/versions/:id/save", post(handlers::save_version))
        .route("/v1/versions/:id/publish", post(handlers::publish_version))
        .route("/v1/versions/:id/discard", post(handlers::discard_version))
        .route(
            "/v1/datasets/:dataset/tables/:table",
            post(handlers::load_entries_table),
        )
        .route(
            "/v1/datasets/:dataset/tables/:table/entries/:key",
            get(handlers::get_entry),
        )
        .route(
            "/v1/datasets/:dataset/tables/:table/entries",
            get(handlers::get_entries),
        )
        .route("/healthcheck", get(handlers::healthcheck))
        .fallback(handlers::not_found)
        .with_state(orchestrator)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::time::Duration;
    use tower::ServiceExt;
    use vkv_storage::{InMemoryKvStore, InMemoryMetadataStore, InMemoryQueue};

    fn app() -> Router {
        let orchestrator = Arc::new(Orchestrator::new(
            Arc::new(InMemoryMetadataStore::new()),
            Arc::new(InMemoryKvStore::new()),
            Arc::new(InMemoryQueue::new(Duration::from_secs(60))),
            Duration::from_secs(10),
        ));
        router(orchestrator)
    }

    #[tokio::test]
    async fn healthcheck_reports_ok() {
        let response = app()
            .oneshot(Request::builder().uri("/healthcheck").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let response = app()
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn create_dataset_returns_201_with_location() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/datasets")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"name":"recs","tables":["items"]}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            response.headers().get("location").unwrap(),
            "/v1/datasets/recs"
        );
    }

    #[tokio::test]
    async fn duplicate_dataset_is_409() {
        let state = app();
        let make_request = || {
            Request::builder()
                .method("POST")
                .uri("/v1/datasets")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"name":"recs","tables":["items"]}"#))
                .unwrap()
        };
        let first = state.clone().oneshot(make_request()).await.unwrap();
        assert_eq!(first.status(), StatusCode::CREATED);
        let second = state.oneshot(make_request()).await.unwrap();
        assert_eq!(second.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn duplicate_table_names_are_400() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/datasets")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"name":"recs","tables":["items","items"]}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
