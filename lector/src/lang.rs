//! Language code resolution.
//!
//! Callers send free-form language hints (`"eng"`, `"chi_sim"`, `"ja"`, ...)
//! which are mapped to the canonical identifier an engine is keyed by. The
//! table is fixed at startup; unknown codes fall back to the configured
//! default rather than failing, so resolution is total.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

/// Canonical identifier for an inference engine's language pack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalLanguage {
    En,
    Vi,
    Ch,
    ChineseCht,
    Japan,
    Korean,
    French,
    German,
    Es,
    Ru,
}

impl CanonicalLanguage {
    pub const ALL: [CanonicalLanguage; 10] = [
        CanonicalLanguage::En,
        CanonicalLanguage::Vi,
        CanonicalLanguage::Ch,
        CanonicalLanguage::ChineseCht,
        CanonicalLanguage::Japan,
        CanonicalLanguage::Korean,
        CanonicalLanguage::French,
        CanonicalLanguage::German,
        CanonicalLanguage::Es,
        CanonicalLanguage::Ru,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            CanonicalLanguage::En => "en",
            CanonicalLanguage::Vi => "vi",
            CanonicalLanguage::Ch => "ch",
            CanonicalLanguage::ChineseCht => "chinese_cht",
            CanonicalLanguage::Japan => "japan",
            CanonicalLanguage::Korean => "korean",
            CanonicalLanguage::French => "french",
            CanonicalLanguage::German => "german",
            CanonicalLanguage::Es => "es",
            CanonicalLanguage::Ru => "ru",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|l| l.code() == code)
    }

    /// Canonical codes of every supported language, for the health payload.
    pub fn supported_codes() -> Vec<&'static str> {
        Self::ALL.iter().map(|l| l.code()).collect()
    }
}

impl fmt::Display for CanonicalLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Alias groups shared with the upstream engine ecosystem. The first entry
/// of each pair is the caller-facing alias, the second the canonical code.
const BUILTIN_ALIASES: &[(&str, CanonicalLanguage)] = &[
    ("eng", CanonicalLanguage::En),
    ("vie", CanonicalLanguage::Vi),
    ("chi_sim", CanonicalLanguage::Ch),
    ("chi_tra", CanonicalLanguage::ChineseCht),
    ("ja", CanonicalLanguage::Japan),
    ("jpn", CanonicalLanguage::Japan),
    ("ko", CanonicalLanguage::Korean),
    ("kor", CanonicalLanguage::Korean),
    ("fr", CanonicalLanguage::French),
    ("fra", CanonicalLanguage::French),
    ("de", CanonicalLanguage::German),
    ("deu", CanonicalLanguage::German),
    ("spa", CanonicalLanguage::Es),
    ("rus", CanonicalLanguage::Ru),
];

/// Maps caller-supplied language hints to canonical identifiers.
///
/// Pure lookup table, no state beyond what is built at construction.
pub struct LanguageResolver {
    aliases: HashMap<String, CanonicalLanguage>,
    default: CanonicalLanguage,
}

impl LanguageResolver {
    /// Build the resolver from the builtin table plus configured extras.
    ///
    /// Extras map an alias string to a canonical code; pairs naming an
    /// unknown canonical code are skipped with a warning.
    pub fn new(default: CanonicalLanguage, extra_aliases: &HashMap<String, String>) -> Self {
        let mut aliases = HashMap::new();

        // Identity mappings so canonical codes resolve to themselves.
        for lang in CanonicalLanguage::ALL {
            aliases.insert(lang.code().to_string(), lang);
        }
        for (alias, lang) in BUILTIN_ALIASES {
            aliases.insert((*alias).to_string(), *lang);
        }

        for (alias, code) in extra_aliases {
            match CanonicalLanguage::from_code(code) {
                Some(lang) => {
                    aliases.insert(alias.trim().to_lowercase(), lang);
                }
                None => {
                    tracing::warn!(alias = %alias, code = %code, "Ignoring alias for unknown canonical language");
                }
            }
        }

        Self { aliases, default }
    }

    /// Resolve a caller-supplied code. Total: unknown codes map to the
    /// configured default.
    pub fn resolve(&self, code: &str) -> CanonicalLanguage {
        self.aliases
            .get(code.trim().to_lowercase().as_str())
            .copied()
            .unwrap_or(self.default)
    }
}
