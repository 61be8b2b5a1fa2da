use axum::Json;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Lector",
        description = "Self-hostable OCR recognition service with configurable engine lifecycle"
    ),
    paths(crate::api::handlers::health, crate::api::handlers::recognize),
    components(schemas(
        crate::api::handlers::HealthData,
        crate::models::RecognitionResult
    )),
    tags(
        (name = "health", description = "Service status and capabilities"),
        (name = "recognition", description = "Image text recognition")
    )
)]
pub struct ApiDoc;

/// `GET /openapi.json`
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
