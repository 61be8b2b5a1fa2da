use std::sync::Arc;

use crate::config::Config;
use crate::engine::EngineRegistry;
use crate::gate::ConcurrencyGate;
use crate::lang::{CanonicalLanguage, LanguageResolver};
use crate::pipeline::RecognitionPipeline;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Arc<EngineRegistry>,
    pub gate: ConcurrencyGate,
    pub pipeline: RecognitionPipeline,
}

impl AppState {
    pub fn new(config: Config, registry: Arc<EngineRegistry>, gate: ConcurrencyGate) -> Self {
        let config = Arc::new(config);

        let default_language = CanonicalLanguage::from_code(&config.ocr.default_language)
            .unwrap_or_else(|| {
                tracing::warn!(
                    code = %config.ocr.default_language,
                    "Unknown default language, using 'en'"
                );
                CanonicalLanguage::En
            });
        let resolver = Arc::new(LanguageResolver::new(
            default_language,
            &config.ocr.lang_aliases,
        ));

        let pipeline = RecognitionPipeline::new(
            Arc::clone(&registry),
            gate.clone(),
            resolver,
            config.ocr.clone(),
        );

        Self {
            config,
            registry,
            gate,
            pipeline,
        }
    }
}
