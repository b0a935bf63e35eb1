pub mod cancel;
pub mod config;
pub mod errors;
pub mod types;

// Re-export commonly used items for convenience
pub use cancel::CancellationToken;
pub use config::Config;
pub use errors::{
    ConfigError, InferenceError, PipelineError, PreconditionError, RecognitionError, RenderError,
    TranslationError,
};
pub use types::{
    AnnotatedRegion, BBox, Color, Detection, DominantColors, RunReport, Stage, StageTimings,
};
