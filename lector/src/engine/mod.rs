//! Inference engine abstraction.
//!
//! The recognition capability is opaque to the rest of the service: an
//! [`EngineFactory`] builds one [`Engine`] bound to a single canonical
//! language, and the engine turns a raster into recognized lines. The
//! registry decides how long a built engine lives; the traits keep the
//! Tesseract backend swappable and give tests a scripted stand-in.

mod registry;
mod tesseract;

pub use registry::{EngineHandle, EngineRegistry};
pub use tesseract::TesseractFactory;

use crate::error::Result;
use crate::imaging::RasterImage;
use crate::lang::CanonicalLanguage;
use crate::models::RecognitionLine;

/// A live engine instance bound to exactly one language. Not safe for
/// concurrent use; callers serialize access (see the registry).
pub trait Engine: Send {
    /// Run recognition over a decoded raster, returning lines in reading
    /// order. Blocking; callers run this off the async dispatch task.
    fn recognize(&mut self, image: &RasterImage) -> Result<Vec<RecognitionLine>>;
}

/// Builds engine instances on demand. Construction is blocking (model
/// assets load from disk) and may fail for languages without assets.
pub trait EngineFactory: Send + Sync {
    fn build(&self, lang: CanonicalLanguage) -> Result<Box<dyn Engine>>;
}
