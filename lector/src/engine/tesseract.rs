use leptess::LepTess;
use tracing::debug;

use crate::error::{LectorError, Result};
use crate::imaging::RasterImage;
use crate::lang::CanonicalLanguage;
use crate::models::RecognitionLine;

use super::{Engine, EngineFactory};

/// Canonical identifiers are the public surface; Tesseract keys its
/// traineddata packs differently.
fn traineddata_name(lang: CanonicalLanguage) -> &'static str {
    match lang {
        CanonicalLanguage::En => "eng",
        CanonicalLanguage::Vi => "vie",
        CanonicalLanguage::Ch => "chi_sim",
        CanonicalLanguage::ChineseCht => "chi_tra",
        CanonicalLanguage::Japan => "jpn",
        CanonicalLanguage::Korean => "kor",
        CanonicalLanguage::French => "fra",
        CanonicalLanguage::German => "deu",
        CanonicalLanguage::Es => "spa",
        CanonicalLanguage::Ru => "rus",
    }
}

/// Builds Tesseract engines, one per canonical language.
pub struct TesseractFactory {
    data_dir: Option<String>,
}

impl TesseractFactory {
    pub fn new(data_dir: Option<String>) -> Self {
        Self { data_dir }
    }
}

impl EngineFactory for TesseractFactory {
    fn build(&self, lang: CanonicalLanguage) -> Result<Box<dyn Engine>> {
        let traineddata = traineddata_name(lang);
        let lt = LepTess::new(self.data_dir.as_deref(), traineddata).map_err(|e| {
            LectorError::EngineUnavailable(format!(
                "failed to initialize tesseract for '{lang}' ({traineddata}): {e}"
            ))
        })?;

        debug!(language = %lang, traineddata, "Tesseract engine initialized");

        Ok(Box::new(TesseractEngine { lt, lang }))
    }
}

struct TesseractEngine {
    lt: LepTess,
    lang: CanonicalLanguage,
}

impl Engine for TesseractEngine {
    fn recognize(&mut self, image: &RasterImage) -> Result<Vec<RecognitionLine>> {
        self.lt
            .set_image_from_mem(&image.data)
            .map_err(|e| LectorError::Recognition(format!("failed to set image: {e}")))?;

        let text = self
            .lt
            .get_utf8_text()
            .map_err(|e| LectorError::Recognition(format!("failed to extract text: {e}")))?;

        // MeanTextConf reports 0-100 over the whole page; a negative value
        // means no confidence is available.
        let conf = self.lt.mean_text_conf();
        let confidence = if conf >= 0 {
            Some(conf as f32 / 100.0)
        } else {
            None
        };

        let lines: Vec<RecognitionLine> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| RecognitionLine::new(line, confidence))
            .collect();

        debug!(
            language = %self.lang,
            line_count = lines.len(),
            width = image.width,
            height = image.height,
            "Recognition completed"
        );

        Ok(lines)
    }
}
