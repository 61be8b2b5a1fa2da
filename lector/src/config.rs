use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::str::FromStr;

fn parse_env_or<T: FromStr>(var: &str, default: T) -> T
where
    T::Err: fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

/// Parse `OCR_LANG_ALIASES` env var.
/// Format: comma-separated `alias:canonical` pairs, e.g. `pt:es,cn:ch`
fn parse_lang_aliases() -> HashMap<String, String> {
    match env::var("OCR_LANG_ALIASES") {
        Ok(val) if !val.is_empty() => val
            .split(',')
            .filter_map(|pair| {
                let mut parts = pair.splitn(2, ':');
                let alias = parts.next()?.trim();
                let canonical = parts.next()?.trim();
                if alias.is_empty() || canonical.is_empty() {
                    tracing::warn!("Invalid alias pair '{}' in OCR_LANG_ALIASES, skipping", pair);
                    None
                } else {
                    Some((alias.to_string(), canonical.to_string()))
                }
            })
            .collect(),
        _ => HashMap::new(),
    }
}

/// Engine lifecycle policy. `Cached` keeps one engine per language alive
/// for the process lifetime; `Ephemeral` builds a fresh engine per request
/// and drops it on release, trading latency for a bounded memory ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EnginePolicy {
    Cached,
    Ephemeral,
}

impl FromStr for EnginePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cached" => Ok(EnginePolicy::Cached),
            "ephemeral" => Ok(EnginePolicy::Ephemeral),
            other => Err(format!("unknown engine policy '{other}' (expected 'cached' or 'ephemeral')")),
        }
    }
}

impl fmt::Display for EnginePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnginePolicy::Cached => f.write_str("cached"),
            EnginePolicy::Ephemeral => f.write_str("ephemeral"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub ocr: OcrConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OcrConfig {
    pub policy: EnginePolicy,
    /// Concurrency gate capacity; recognition requests beyond this block.
    pub max_concurrency: usize,
    pub default_language: String,
    /// Extra alias -> canonical code pairs merged over the builtin table.
    pub lang_aliases: HashMap<String, String>,
    /// Directory holding traineddata files; engine default when unset.
    pub data_dir: Option<String>,
    pub timeout_secs: u64,
    pub max_image_dimension: u32,
    pub min_image_dimension: u32,
    pub max_image_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: env::var("LECTOR_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or("LECTOR_PORT", 8080),
            },
            ocr: OcrConfig {
                policy: parse_env_or("OCR_ENGINE_POLICY", EnginePolicy::Cached),
                max_concurrency: parse_env_or("OCR_MAX_CONCURRENCY", 1),
                default_language: env::var("OCR_DEFAULT_LANGUAGE")
                    .unwrap_or_else(|_| "en".to_string()),
                lang_aliases: parse_lang_aliases(),
                data_dir: env::var("OCR_DATA_DIR").ok(),
                timeout_secs: parse_env_or("OCR_TIMEOUT", 60),
                max_image_dimension: parse_env_or("OCR_MAX_DIMENSION", 4096),
                min_image_dimension: parse_env_or("OCR_MIN_DIMENSION", 16),
                max_image_bytes: parse_env_or("OCR_MAX_IMAGE_BYTES", 10 * 1024 * 1024),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}
