// Error types for the overlay workflow
//
// Only precondition, inference and render failures abort a run. Recognition
// and translation failures are recovered inside their stage.

use crate::core::types::Stage;
use thiserror::Error;

/// Malformed input that makes a run impossible
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PreconditionError {
    #[error("Detection tensor must have shape [batch, channels, candidates], got {0:?}")]
    TensorRank(Vec<usize>),

    #[error("Detection tensor needs at least {required} channels, got {actual}")]
    TooFewChannels { required: usize, actual: usize },

    #[error("Detection tensor has an empty batch dimension")]
    EmptyBatch,

    #[error("Tensor data length {actual} does not match shape {shape:?} (expected {expected})")]
    DataLength {
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid axis order {order:?} for a rank {rank} tensor")]
    InvalidPermutation { order: Vec<usize>, rank: usize },

    #[error("Invalid image dimensions: {width}x{height}")]
    InvalidImageSize { width: u32, height: u32 },

    #[error("Invalid model input size: {width}x{height}")]
    InvalidModelInput { width: u32, height: u32 },
}

/// Inference collaborator errors
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Inference backend failed: {0}")]
    Backend(String),

    #[error("Inference task failed: {0}")]
    TaskFailed(String),

    #[error("Model output is malformed: {0}")]
    MalformedOutput(#[from] PreconditionError),
}

/// Per-region OCR errors (recovered as empty text)
#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error("OCR engine failed: {0}")]
    Engine(String),

    #[error("Region {width}x{height} is too small to recognize")]
    RegionTooSmall { width: u32, height: u32 },
}

/// Translation backend errors (recovered by falling back to the source text)
#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("Translation request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Translation backend returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Expected {expected} translations, got {actual}")]
    CountMismatch { expected: usize, actual: usize },
}

/// Surface errors
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Surface unavailable for a {width}x{height} frame")]
    SurfaceUnavailable { width: u32, height: u32 },

    #[error("No frame in progress (call begin_frame first)")]
    NoActiveFrame,

    #[error("Rendering backend failed: {0}")]
    Backend(String),
}

/// Configuration errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Confidence threshold must be in [0.0, 1.0], got {0}")]
    InvalidConfidenceThreshold(f32),

    #[error("IoU threshold must be in [0.0, 1.0], got {0}")]
    InvalidIoUThreshold(f32),

    #[error("OCR concurrency must be > 0, got {0}")]
    InvalidConcurrency(usize),

    #[error("Invalid translation config: {0}")]
    InvalidTranslationConfig(String),

    #[error("Invalid rendering config: {0}")]
    InvalidRenderingConfig(String),
}

/// Failure of a whole run, tagged with the stage it originated in
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Precondition violated during {stage}: {source}")]
    Precondition {
        stage: Stage,
        #[source]
        source: PreconditionError,
    },

    #[error("Inference failed: {source}")]
    Inference {
        #[source]
        source: InferenceError,
    },

    #[error("Rendering failed: {source}")]
    Render {
        #[source]
        source: RenderError,
    },

    #[error("Run cancelled before {stage} completed")]
    Cancelled { stage: Stage },

    #[error("Task join failed during {stage}: {detail}")]
    TaskJoinFailed { stage: Stage, detail: String },

    #[error("Configuration invalid: {0}")]
    Config(#[from] ConfigError),
}

impl PipelineError {
    /// Stage the failure originated in
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Precondition { stage, .. } => *stage,
            PipelineError::Inference { .. } => Stage::Inferring,
            PipelineError::Render { .. } => Stage::Rendering,
            PipelineError::Cancelled { stage } => *stage,
            PipelineError::TaskJoinFailed { stage, .. } => *stage,
            PipelineError::Config(_) => Stage::Idle,
        }
    }
}

pub type PreconditionResult<T> = Result<T, PreconditionError>;
pub type InferenceResult<T> = Result<T, InferenceError>;
pub type RecognitionResult<T> = Result<T, RecognitionError>;
pub type TranslationResult<T> = Result<T, TranslationError>;
pub type RenderResult<T> = Result<T, RenderError>;
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type PipelineResult<T> = Result<T, PipelineError>;

// Stage context helpers, one per fatal error family
pub trait StageContext<T> {
    fn in_stage(self, stage: Stage) -> PipelineResult<T>;
}

impl<T> StageContext<T> for PreconditionResult<T> {
    fn in_stage(self, stage: Stage) -> PipelineResult<T> {
        self.map_err(|source| PipelineError::Precondition { stage, source })
    }
}

impl<T> StageContext<T> for InferenceResult<T> {
    fn in_stage(self, _stage: Stage) -> PipelineResult<T> {
        self.map_err(|source| PipelineError::Inference { source })
    }
}

impl<T> StageContext<T> for RenderResult<T> {
    fn in_stage(self, _stage: Stage) -> PipelineResult<T> {
        self.map_err(|source| PipelineError::Render { source })
    }
}

impl<T> StageContext<T> for Result<T, tokio::task::JoinError> {
    fn in_stage(self, stage: Stage) -> PipelineResult<T> {
        self.map_err(|e| PipelineError::TaskJoinFailed {
            stage,
            detail: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_of_errors() {
        let err = PipelineError::Precondition {
            stage: Stage::Decoding,
            source: PreconditionError::EmptyBatch,
        };
        assert_eq!(err.stage(), Stage::Decoding);

        let err = PipelineError::Render {
            source: RenderError::NoActiveFrame,
        };
        assert_eq!(err.stage(), Stage::Rendering);

        let err = PipelineError::Inference {
            source: InferenceError::Backend("boom".to_string()),
        };
        assert_eq!(err.stage(), Stage::Inferring);
    }

    #[test]
    fn test_stage_context_wraps_precondition() {
        let result: PreconditionResult<()> = Err(PreconditionError::TensorRank(vec![2, 3]));
        let err = result.in_stage(Stage::Decoding).unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Precondition {
                stage: Stage::Decoding,
                source: PreconditionError::TensorRank(_)
            }
        ));
        assert!(err.to_string().contains("decoding"));
    }
}
