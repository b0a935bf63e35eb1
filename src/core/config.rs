use crate::core::errors::ConfigError;
use std::env;
use std::str::FromStr;
use tracing::Level;

/// Detection configuration
#[derive(Debug, Clone)]
pub struct DetectionConfig {
    /// Candidates below this confidence are discarded during decoding
    pub confidence_threshold: f32,
    /// Suppression threshold for overlapping boxes
    pub iou_threshold: f32,
    pub model_path: String,
}

/// OCR configuration
#[derive(Debug, Clone)]
pub struct OcrConfig {
    /// Maximum recognition tasks in flight at once
    pub max_concurrency: usize,
}

/// Translation backend configuration
#[derive(Debug, Clone)]
pub struct TranslationConfig {
    pub endpoint: String,
    pub token: Option<String>,
    pub source_lang: String,
    pub target_lang: String,
    pub timeout_secs: u64,
}

/// Overlay rendering configuration
#[derive(Debug, Clone)]
pub struct RenderingConfig {
    pub debug_outlines: bool,
    pub min_font_size: f32,
    pub max_font_size: f32,
    pub line_height_factor: f32,
    /// Total horizontal padding subtracted from the box width when wrapping
    pub horizontal_padding: f32,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub log_level: Level,
}

/// Main configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub detection: DetectionConfig,
    pub ocr: OcrConfig,
    pub translation: TranslationConfig,
    pub rendering: RenderingConfig,
    pub logging: LoggingConfig,
}

pub const DEFAULT_TRANSLATION_ENDPOINT: &str = "http://127.0.0.1:1188/translate";

impl Default for Config {
    fn default() -> Self {
        Self {
            detection: DetectionConfig {
                confidence_threshold: 0.45,
                iou_threshold: 0.45,
                model_path: "models/detector.onnx".to_string(),
            },
            ocr: OcrConfig {
                max_concurrency: num_cpus::get().max(1),
            },
            translation: TranslationConfig {
                endpoint: DEFAULT_TRANSLATION_ENDPOINT.to_string(),
                token: None,
                source_lang: "EN".to_string(),
                target_lang: "ZH".to_string(),
                timeout_secs: 30,
            },
            rendering: RenderingConfig {
                debug_outlines: false,
                min_font_size: 12.0,
                max_font_size: 48.0,
                line_height_factor: 1.2,
                horizontal_padding: 8.0,
            },
            logging: LoggingConfig {
                log_level: Level::INFO,
            },
        }
    }
}

impl Config {
    /// Load from `.env` and the process environment, then validate
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unset or unparsable values keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let log_level = lookup("LOG_LEVEL")
            .and_then(|s| match s.to_lowercase().as_str() {
                "trace" => Some(Level::TRACE),
                "debug" => Some(Level::DEBUG),
                "info" => Some(Level::INFO),
                "warn" | "warning" => Some(Level::WARN),
                "error" => Some(Level::ERROR),
                _ => None,
            })
            .unwrap_or(defaults.logging.log_level);

        let config = Self {
            detection: DetectionConfig {
                confidence_threshold: parse_or(
                    &lookup,
                    "CONFIDENCE_THRESHOLD",
                    defaults.detection.confidence_threshold,
                ),
                iou_threshold: parse_or(&lookup, "IOU_THRESHOLD", defaults.detection.iou_threshold),
                model_path: lookup("DETECTOR_MODEL_PATH").unwrap_or(defaults.detection.model_path),
            },
            ocr: OcrConfig {
                max_concurrency: parse_or(
                    &lookup,
                    "OCR_MAX_CONCURRENCY",
                    defaults.ocr.max_concurrency,
                ),
            },
            translation: TranslationConfig {
                endpoint: lookup("TRANSLATION_ENDPOINT")
                    .map(|s| s.trim().to_string())
                    .unwrap_or(defaults.translation.endpoint),
                token: lookup("TRANSLATION_TOKEN")
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty()),
                source_lang: lookup("SOURCE_LANG")
                    .map(|s| s.trim().to_uppercase())
                    .unwrap_or(defaults.translation.source_lang),
                target_lang: lookup("TARGET_LANG")
                    .map(|s| s.trim().to_uppercase())
                    .unwrap_or(defaults.translation.target_lang),
                timeout_secs: parse_or(
                    &lookup,
                    "TRANSLATION_TIMEOUT_SECONDS",
                    defaults.translation.timeout_secs,
                ),
            },
            rendering: RenderingConfig {
                debug_outlines: parse_or(&lookup, "DEBUG_OUTLINES", defaults.rendering.debug_outlines),
                min_font_size: parse_or(&lookup, "MIN_FONT_SIZE", defaults.rendering.min_font_size),
                max_font_size: parse_or(&lookup, "MAX_FONT_SIZE", defaults.rendering.max_font_size),
                line_height_factor: parse_or(
                    &lookup,
                    "LINE_HEIGHT_FACTOR",
                    defaults.rendering.line_height_factor,
                ),
                horizontal_padding: parse_or(
                    &lookup,
                    "HORIZONTAL_PADDING",
                    defaults.rendering.horizontal_padding,
                ),
            },
            logging: LoggingConfig { log_level },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.detection.confidence_threshold) {
            return Err(ConfigError::InvalidConfidenceThreshold(
                self.detection.confidence_threshold,
            ));
        }

        if !(0.0..=1.0).contains(&self.detection.iou_threshold) {
            return Err(ConfigError::InvalidIoUThreshold(self.detection.iou_threshold));
        }

        if self.ocr.max_concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency(self.ocr.max_concurrency));
        }

        if self.translation.endpoint.is_empty() {
            return Err(ConfigError::InvalidTranslationConfig(
                "endpoint must not be empty".to_string(),
            ));
        }
        if self.translation.source_lang.is_empty() || self.translation.target_lang.is_empty() {
            return Err(ConfigError::InvalidTranslationConfig(
                "source and target languages must be set".to_string(),
            ));
        }
        if self.translation.timeout_secs == 0 {
            return Err(ConfigError::InvalidTranslationConfig(
                "timeout_secs must be > 0".to_string(),
            ));
        }

        let rendering = &self.rendering;
        if !(rendering.min_font_size > 0.0 && rendering.min_font_size <= rendering.max_font_size) {
            return Err(ConfigError::InvalidRenderingConfig(format!(
                "font size range must satisfy 0 < min <= max, got [{}, {}]",
                rendering.min_font_size, rendering.max_font_size
            )));
        }
        if rendering.line_height_factor <= 0.0 {
            return Err(ConfigError::InvalidRenderingConfig(format!(
                "line_height_factor must be > 0, got {}",
                rendering.line_height_factor
            )));
        }
        if rendering.horizontal_padding < 0.0 {
            return Err(ConfigError::InvalidRenderingConfig(format!(
                "horizontal_padding must be >= 0, got {}",
                rendering.horizontal_padding
            )));
        }

        Ok(())
    }

    pub fn confidence_threshold(&self) -> f32 {
        self.detection.confidence_threshold
    }

    pub fn iou_threshold(&self) -> f32 {
        self.detection.iou_threshold
    }

    pub fn log_level(&self) -> Level {
        self.logging.log_level
    }

    /// Install the tracing subscriber at the configured `LOG_LEVEL`.
    /// Returns `false` if a subscriber was already installed.
    pub fn init_tracing(&self) -> bool {
        crate::utils::telemetry::init_tracing(self.log_level())
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}
