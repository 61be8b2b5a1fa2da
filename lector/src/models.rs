//! Wire types for the recognition endpoint.
//!
//! `RecognitionResult` field names are a compatibility surface: clients of
//! the original service expect exactly `success`, `text`, `confidence`,
//! `processingTime`, `detectedLanguage` and `error`.

use serde::Serialize;

/// One recognized line as produced by the inference engine, in reading
/// order. `confidence` is `None` when the engine returned a partially
/// shaped record; such lines still contribute text but are excluded from
/// the confidence mean.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionLine {
    pub text: String,
    pub confidence: Option<f32>,
}

impl RecognitionLine {
    pub fn new(text: impl Into<String>, confidence: impl Into<Option<f32>>) -> Self {
        Self {
            text: text.into(),
            confidence: confidence.into(),
        }
    }
}

/// Response payload for `POST /recognize`. Exactly one of
/// `text`/`confidence` or `error` is meaningful; `success` tells which.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecognitionResult {
    pub success: bool,
    pub text: String,
    /// Averaged line confidence scaled to 0-100, one decimal.
    pub confidence: f32,
    /// Total wall-clock milliseconds, including any blocking on the
    /// concurrency gate.
    pub processing_time: u64,
    /// Echo of the caller-supplied language code. The service performs no
    /// language detection; the field name is kept for compatibility.
    pub detected_language: String,
    pub error: String,
}

impl RecognitionResult {
    pub fn success(
        text: String,
        confidence: f32,
        processing_time: u64,
        language_code: &str,
    ) -> Self {
        Self {
            success: true,
            text,
            confidence,
            processing_time,
            detected_language: language_code.to_string(),
            error: String::new(),
        }
    }

    pub fn failure(error: String, processing_time: u64) -> Self {
        Self {
            success: false,
            text: String::new(),
            confidence: 0.0,
            processing_time,
            detected_language: String::new(),
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_field_names_are_stable() {
        let result = RecognitionResult::success("hello".to_string(), 92.5, 120, "eng");
        let value = serde_json::to_value(&result).unwrap();
        let obj = value.as_object().unwrap();

        for key in [
            "success",
            "text",
            "confidence",
            "processingTime",
            "detectedLanguage",
            "error",
        ] {
            assert!(obj.contains_key(key), "missing wire field {key}");
        }
        assert_eq!(obj.len(), 6);
        assert_eq!(value["detectedLanguage"], "eng");
        assert_eq!(value["processingTime"], 120);
    }

    #[test]
    fn test_failure_defaults() {
        let result = RecognitionResult::failure("boom".to_string(), 5);
        assert!(!result.success);
        assert_eq!(result.text, "");
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.detected_language, "");
        assert_eq!(result.error, "boom");
    }

    #[test]
    fn test_success_echoes_language_code_verbatim() {
        let result = RecognitionResult::success(String::new(), 0.0, 1, "chi_sim");
        assert_eq!(result.detected_language, "chi_sim");
    }
}
