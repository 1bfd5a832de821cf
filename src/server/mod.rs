mod api;
mod error;
mod state;
mod types;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use utoipa::OpenApi;

pub use self::state::*;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::upload_handler,
        api::search_handler,
        api::delete_handler,
        api::stats_handler,
        api::health_handler,
    ),
    components(schemas(
        types::ImageForm,
        types::MessageResponse,
        types::UploadResponse,
        types::SearchResult,
        types::SearchResponse,
        types::StatsResponse,
    ))
)]
pub struct ApiDoc;

/// 构建API服务器
pub fn create_app(state: Arc<AppState>) -> Router {
    let uploads = ServeDir::new(state.db.storage().root());
    let limit = state.max_file_size;

    Router::new()
        .route("/api/v1/images/upload", post(api::upload_handler))
        .route("/api/v1/images/search", post(api::search_handler))
        .route("/api/v1/images/{id}", delete(api::delete_handler))
        .route("/api/v1/system/stats", get(api::stats_handler))
        .route("/api/v1/system/health", get(api::health_handler))
        .route("/metrics", get(api::metrics_handler))
        .route("/api-docs/openapi.json", get(|| async { axum::Json(ApiDoc::openapi()) }))
        .nest_service("/uploads", uploads)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(limit))
        .with_state(state)
}
