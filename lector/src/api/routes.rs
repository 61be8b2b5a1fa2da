use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use super::openapi;
use super::AppState;
use crate::api::handlers;

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Leave headroom over the image cap for multipart framing.
    let body_cap = state.config.ocr.max_image_bytes + 64 * 1024;

    Router::new()
        .route("/", get(handlers::health))
        .route("/health", get(handlers::health))
        .route("/recognize", post(handlers::recognize))
        .route("/openapi.json", get(openapi::openapi_json))
        .layer(DefaultBodyLimit::max(body_cap))
        .layer(RequestBodyLimitLayer::new(body_cap))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
