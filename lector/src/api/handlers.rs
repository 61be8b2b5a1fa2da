use axum::extract::{Multipart, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::api::state::AppState;
use crate::error::{LectorError, Result};
use crate::lang::CanonicalLanguage;
use crate::models::RecognitionResult;

/// Payload for `GET /` and `GET /health`.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthData {
    pub status: String,
    pub service: String,
    pub version: String,
    pub supported_languages: Vec<&'static str>,
    pub engine_policy: String,
    pub max_concurrency: usize,
    /// Gate permits currently free; 0 means recognitions are queueing.
    pub available_slots: usize,
    pub engines_cached: usize,
    pub engines_built: u64,
    pub engines_disposed: u64,
}

/// `GET /health`
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service status and capabilities", body = HealthData),
    )
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthData> {
    Json(HealthData {
        status: "ok".to_string(),
        service: "Lector".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        supported_languages: CanonicalLanguage::supported_codes(),
        engine_policy: state.registry.policy().to_string(),
        max_concurrency: state.gate.capacity(),
        available_slots: state.gate.available(),
        engines_cached: state.registry.cached_count().await,
        engines_built: state.registry.engines_built(),
        engines_disposed: state.registry.engines_disposed(),
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecognizeParams {
    pub language: Option<String>,
}

/// `POST /recognize`
///
/// Accepts a multipart form with an `image` field (`file` is accepted as
/// an alias) and an optional `language` text field; `language` may also be
/// passed as a query parameter, with the form field taking precedence.
/// Every pipeline outcome, success or fault, responds 200 with a
/// `RecognitionResult`; only transport-level rejections (missing field,
/// oversized payload) produce an error status.
#[utoipa::path(
    post,
    path = "/recognize",
    tag = "recognition",
    request_body(content_type = "multipart/form-data", content = String, description = "Image upload with optional language field"),
    params(
        ("language" = Option<String>, Query, description = "Language hint; defaults to the configured default language"),
    ),
    responses(
        (status = 200, description = "Recognition outcome", body = RecognitionResult),
        (status = 400, description = "Missing image field or payload too large"),
    )
)]
pub async fn recognize(
    State(state): State<AppState>,
    Query(params): Query<RecognizeParams>,
    mut multipart: Multipart,
) -> Result<Json<RecognitionResult>> {
    let mut image_bytes: Option<Vec<u8>> = None;
    let mut language_field: Option<String> = None;

    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "image" | "file" => {
                let bytes = field.bytes().await.map_err(|e| {
                    LectorError::Validation(format!("failed to read image field: {e}"))
                })?;
                if bytes.len() > state.config.ocr.max_image_bytes {
                    return Err(LectorError::Validation(format!(
                        "image too large: {} bytes (max {} bytes)",
                        bytes.len(),
                        state.config.ocr.max_image_bytes
                    )));
                }
                image_bytes = Some(bytes.to_vec());
            }
            "language" => {
                language_field = Some(field.text().await.map_err(|e| {
                    LectorError::Validation(format!("invalid language field: {e}"))
                })?);
            }
            _ => {}
        }
    }

    let bytes = image_bytes
        .ok_or_else(|| LectorError::Validation("missing required 'image' field".to_string()))?;

    let language = language_field
        .or(params.language)
        .unwrap_or_else(|| state.config.ocr.default_language.clone());

    let result = state
        .pipeline
        .process(bytes, &language, CancellationToken::new())
        .await;

    Ok(Json(result))
}
