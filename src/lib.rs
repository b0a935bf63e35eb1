// Library exports for the detection → translated overlay workflow

// Core modules
pub mod core;
pub mod orchestration;
pub mod services;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types and functions
pub use crate::core::{
    cancel::CancellationToken,
    config::Config,
    errors::{
        ConfigError, InferenceError, PipelineError, PreconditionError, RecognitionError,
        RenderError, TranslationError,
    },
    types::{
        format_duration, AnnotatedRegion, BBox, Color, Detection, DominantColors, RunReport,
        Stage, StageTimings,
    },
};

pub use orchestration::{Pipeline, RunState};

pub use services::{
    decode_detections, layout_text, sample_dominant_colors, suppress, DetectionModel,
    GlyphRenderer, HttpTranslator, LetterboxTransform, OcrEngine, RasterSurface, Surface,
    TextMetrics, Translator,
};

pub use utils::{init_tracing, DetectionTensor, Tensor};
