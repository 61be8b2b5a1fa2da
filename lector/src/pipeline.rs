//! One-request orchestration: decode, gate, engine, recognize, aggregate.
//!
//! Every fault is folded into a `RecognitionResult { success: false }`
//! here; the transport layer never sees a pipeline error. The permit and
//! the engine handle are released on every exit path, engine first.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::aggregate::aggregate;
use crate::config::OcrConfig;
use crate::engine::EngineRegistry;
use crate::error::{LectorError, Result};
use crate::gate::ConcurrencyGate;
use crate::imaging::decode_image;
use crate::lang::LanguageResolver;
use crate::models::RecognitionResult;

#[derive(Clone)]
pub struct RecognitionPipeline {
    registry: Arc<EngineRegistry>,
    gate: ConcurrencyGate,
    resolver: Arc<LanguageResolver>,
    config: OcrConfig,
}

impl RecognitionPipeline {
    pub fn new(
        registry: Arc<EngineRegistry>,
        gate: ConcurrencyGate,
        resolver: Arc<LanguageResolver>,
        config: OcrConfig,
    ) -> Self {
        Self {
            registry,
            gate,
            resolver,
            config,
        }
    }

    /// Run one recognition end to end. Infallible: faults become failure
    /// payloads. `processingTime` covers the full wall-clock span,
    /// including time spent blocked on the concurrency gate.
    pub async fn process(
        &self,
        image_bytes: Vec<u8>,
        language_code: &str,
        cancel: CancellationToken,
    ) -> RecognitionResult {
        let started = Instant::now();
        let outcome = self.process_inner(image_bytes, language_code, &cancel).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok((text, confidence)) => {
                info!(
                    language = language_code,
                    confidence,
                    text_length = text.len(),
                    elapsed_ms,
                    "Recognition completed"
                );
                RecognitionResult::success(text, confidence, elapsed_ms, language_code)
            }
            Err(e) => {
                warn!(language = language_code, error = %e, elapsed_ms, "Recognition failed");
                RecognitionResult::failure(e.to_string(), elapsed_ms)
            }
        }
    }

    async fn process_inner(
        &self,
        image_bytes: Vec<u8>,
        language_code: &str,
        cancel: &CancellationToken,
    ) -> Result<(String, f32)> {
        // Decode before taking a permit: a malformed payload must not
        // consume a recognition slot. CPU-bound, so off the dispatch task.
        let raster = {
            let config = self.config.clone();
            tokio::task::spawn_blocking(move || decode_image(&image_bytes, &config))
                .await
                .map_err(|e| LectorError::Decode(format!("decode task panicked: {e}")))??
        };

        let lang = self.resolver.resolve(language_code);

        let permit = self.gate.acquire(cancel).await?;

        // The permit drops (releases) if engine acquisition fails here.
        let mut handle = self.registry.acquire(lang).await?;

        let timeout = Duration::from_secs(self.config.timeout_secs);
        let outcome = match tokio::time::timeout(timeout, handle.recognize(&raster)).await {
            Ok(result) => result,
            Err(_) => Err(LectorError::Recognition(format!(
                "recognition timed out after {} seconds",
                self.config.timeout_secs
            ))),
        };

        // Engine before permit, success or not.
        self.registry.release(handle);
        drop(permit);

        let lines = outcome?;
        Ok(aggregate(&lines))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnginePolicy;
    use crate::engine::testing::MockFactory;
    use crate::engine::EngineFactory;
    use crate::lang::CanonicalLanguage;
    use crate::models::RecognitionLine;
    use image::{DynamicImage, ImageFormat};
    use std::collections::HashMap;

    fn test_png() -> Vec<u8> {
        let img = DynamicImage::new_rgb8(64, 64);
        let mut output = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut output), ImageFormat::Png)
            .unwrap();
        output
    }

    fn test_config(policy: EnginePolicy) -> OcrConfig {
        OcrConfig {
            policy,
            max_concurrency: 1,
            default_language: "en".to_string(),
            lang_aliases: HashMap::new(),
            data_dir: None,
            timeout_secs: 5,
            max_image_dimension: 4096,
            min_image_dimension: 16,
            max_image_bytes: 10 * 1024 * 1024,
        }
    }

    fn build_pipeline(
        policy: EnginePolicy,
        factory: Arc<dyn EngineFactory>,
    ) -> (RecognitionPipeline, Arc<EngineRegistry>, ConcurrencyGate) {
        let config = test_config(policy);
        let registry = Arc::new(EngineRegistry::new(policy, factory));
        let gate = ConcurrencyGate::new(config.max_concurrency);
        let resolver = Arc::new(LanguageResolver::new(
            CanonicalLanguage::En,
            &config.lang_aliases,
        ));
        let pipeline =
            RecognitionPipeline::new(Arc::clone(&registry), gate.clone(), resolver, config);
        (pipeline, registry, gate)
    }

    fn three_lines() -> Vec<RecognitionLine> {
        vec![
            RecognitionLine::new("alpha", 0.9),
            RecognitionLine::new("beta", 0.8),
            RecognitionLine::new("gamma", 0.7),
        ]
    }

    #[tokio::test]
    async fn test_end_to_end_success() {
        let (pipeline, _, _) = build_pipeline(
            EnginePolicy::Cached,
            Arc::new(MockFactory::returning(three_lines())),
        );

        let result = pipeline
            .process(test_png(), "vie", CancellationToken::new())
            .await;

        assert!(result.success, "unexpected failure: {}", result.error);
        assert_eq!(result.text, "alpha\nbeta\ngamma");
        assert_eq!(result.confidence, 80.0);
        // Echo of the caller's code, alias untouched.
        assert_eq!(result.detected_language, "vie");
        assert!(result.error.is_empty());
    }

    #[tokio::test]
    async fn test_no_text_found_is_success_with_empty_text() {
        let (pipeline, _, _) = build_pipeline(
            EnginePolicy::Cached,
            Arc::new(MockFactory::returning(Vec::new())),
        );

        let result = pipeline
            .process(test_png(), "en", CancellationToken::new())
            .await;

        assert!(result.success);
        assert_eq!(result.text, "");
        assert_eq!(result.confidence, 0.0);
        assert!(result.error.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_payload_takes_no_permit_and_builds_no_engine() {
        let (pipeline, registry, gate) = build_pipeline(
            EnginePolicy::Cached,
            Arc::new(MockFactory::returning(three_lines())),
        );

        let result = pipeline
            .process(vec![1, 2, 3], "en", CancellationToken::new())
            .await;

        assert!(!result.success);
        assert!(!result.error.is_empty());
        assert_eq!(result.text, "");
        assert_eq!(result.confidence, 0.0);
        assert_eq!(registry.engines_built(), 0);
        assert_eq!(gate.available(), gate.capacity());
    }

    #[tokio::test]
    async fn test_recognition_fault_releases_permit_and_engine() {
        let (pipeline, registry, gate) = build_pipeline(
            EnginePolicy::Ephemeral,
            Arc::new(MockFactory::failing_recognize()),
        );

        let result = pipeline
            .process(test_png(), "en", CancellationToken::new())
            .await;
        assert!(!result.success);
        assert!(result.error.contains("scripted recognition fault"));
        assert_eq!(gate.available(), gate.capacity());
        assert_eq!(registry.engines_disposed(), 1);

        // A follow-up request completes rather than blocking on a leaked
        // permit.
        let again = pipeline
            .process(test_png(), "en", CancellationToken::new())
            .await;
        assert!(!again.success);
        assert_eq!(gate.available(), gate.capacity());
    }

    #[tokio::test]
    async fn test_engine_unavailable_releases_permit() {
        let (pipeline, registry, gate) =
            build_pipeline(EnginePolicy::Cached, Arc::new(MockFactory::failing_build()));

        let result = pipeline
            .process(test_png(), "japan", CancellationToken::new())
            .await;

        assert!(!result.success);
        assert!(result.error.contains("Engine unavailable"));
        assert_eq!(registry.engines_built(), 0);
        assert_eq!(gate.available(), gate.capacity());
    }

    #[tokio::test]
    async fn test_cancelled_wait_yields_failure_without_acquisition() {
        let (pipeline, registry, gate) = build_pipeline(
            EnginePolicy::Cached,
            Arc::new(MockFactory::returning(three_lines())),
        );

        // Occupy the single slot so the pipeline has to wait.
        let held = gate.acquire(&CancellationToken::new()).await.unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = pipeline.process(test_png(), "en", cancel).await;

        assert!(!result.success);
        assert!(result.error.contains("Cancelled"));
        assert_eq!(registry.engines_built(), 0);
        drop(held);
        assert_eq!(gate.available(), gate.capacity());
    }

    #[tokio::test]
    async fn test_cached_policy_reuses_engine_across_requests() {
        let (pipeline, registry, _) = build_pipeline(
            EnginePolicy::Cached,
            Arc::new(MockFactory::returning(three_lines())),
        );

        for _ in 0..3 {
            let result = pipeline
                .process(test_png(), "en", CancellationToken::new())
                .await;
            assert!(result.success);
        }
        assert_eq!(registry.engines_built(), 1);
        assert_eq!(registry.engines_disposed(), 0);
    }

    #[tokio::test]
    async fn test_ephemeral_policy_builds_and_disposes_per_request() {
        let (pipeline, registry, _) = build_pipeline(
            EnginePolicy::Ephemeral,
            Arc::new(MockFactory::returning(three_lines())),
        );

        for expected in 1..=2u64 {
            let result = pipeline
                .process(test_png(), "en", CancellationToken::new())
                .await;
            assert!(result.success);
            assert_eq!(registry.engines_built(), expected);
            assert_eq!(registry.engines_disposed(), expected);
        }
    }

    #[tokio::test]
    async fn test_concurrent_requests_serialize_under_capacity_one() {
        let delay = Duration::from_millis(40);
        let (pipeline, _, _) = build_pipeline(
            EnginePolicy::Cached,
            Arc::new(MockFactory::returning(three_lines()).with_delay(delay)),
        );

        let started = Instant::now();
        let (a, b) = tokio::join!(
            pipeline.process(test_png(), "en", CancellationToken::new()),
            pipeline.process(test_png(), "en", CancellationToken::new()),
        );
        let elapsed = started.elapsed();

        assert!(a.success && b.success);
        // Two recognitions through a single slot cannot overlap.
        assert!(
            elapsed >= delay * 2,
            "expected serialized execution, finished in {elapsed:?}"
        );
    }

    #[tokio::test]
    async fn test_processing_time_is_stamped() {
        let delay = Duration::from_millis(25);
        let (pipeline, _, _) = build_pipeline(
            EnginePolicy::Cached,
            Arc::new(MockFactory::returning(three_lines()).with_delay(delay)),
        );

        let result = pipeline
            .process(test_png(), "en", CancellationToken::new())
            .await;
        assert!(result.success);
        assert!(result.processing_time >= 25);
    }
}
