// Pipeline: detection → suppression → OCR → translation → overlay rendering

use parking_lot::Mutex;
use rayon::prelude::*;
use std::sync::Arc;
use std::time::Instant;
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::{debug, info, instrument, warn};

use crate::core::cancel::CancellationToken;
use crate::core::config::Config;
use crate::core::errors::{PipelineError, PipelineResult, StageContext};
use crate::core::types::{AnnotatedRegion, RunReport, Stage, StageTimings};
use crate::services::detection::{decode_detections, letterbox, suppress, DetectionModel};
use crate::services::ocr::{recognize_regions, OcrEngine};
use crate::services::rendering::{
    layout_text, render_frame, sample_dominant_colors, LayoutParams, RegionPlan, Surface,
    TextLayout,
};
use crate::services::translation::{translate_with_fallback, Translator};
use image::RgbaImage;

/// Where a run currently is, or where it stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Active(Stage),
    Failed { stage: Stage, detail: String },
}

impl Default for RunState {
    fn default() -> Self {
        RunState::Active(Stage::Idle)
    }
}

/// Forward-only stage bookkeeping for a single run
struct StageTracker {
    state: RunState,
    entered: Vec<Stage>,
}

impl StageTracker {
    fn new() -> Self {
        Self {
            state: RunState::default(),
            entered: Vec::new(),
        }
    }

    fn current(&self) -> Stage {
        match &self.state {
            RunState::Active(stage) => *stage,
            RunState::Failed { stage, .. } => *stage,
        }
    }

    /// Move to `stage`, refusing if the run was cancelled
    fn enter(&mut self, stage: Stage, cancel: &CancellationToken) -> PipelineResult<()> {
        debug_assert!(stage > self.current(), "stages only move forward");
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled { stage });
        }
        debug!("→ {}", stage);
        self.state = RunState::Active(stage);
        self.entered.push(stage);
        Ok(())
    }

    /// Mark the run complete. The frame is already presented, so a late
    /// cancellation no longer applies.
    fn finish(&mut self) {
        debug!("→ {}", Stage::Done);
        self.state = RunState::Active(Stage::Done);
        self.entered.push(Stage::Done);
    }

    fn fail(&mut self, error: &PipelineError) {
        self.state = RunState::Failed {
            stage: error.stage(),
            detail: error.to_string(),
        };
    }
}

/// Single-image workflow over pluggable detector, OCR and translation backends
pub struct Pipeline {
    config: Arc<Config>,
    detector: Arc<dyn DetectionModel>,
    ocr: Arc<dyn OcrEngine>,
    translator: Arc<dyn Translator>,
    last_state: Mutex<RunState>,
}

impl Pipeline {
    #[instrument(skip_all)]
    pub fn new(
        config: Arc<Config>,
        detector: Arc<dyn DetectionModel>,
        ocr: Arc<dyn OcrEngine>,
        translator: Arc<dyn Translator>,
    ) -> PipelineResult<Self> {
        config.validate()?;

        let (model_h, model_w) = detector.input_size();
        info!(
            "✓ Pipeline ready (model input {}x{}, confidence {:.2}, IoU {:.2}, OCR concurrency {})",
            model_w,
            model_h,
            config.confidence_threshold(),
            config.iou_threshold(),
            config.ocr.max_concurrency
        );

        Ok(Self {
            config,
            detector,
            ocr,
            translator,
            last_state: Mutex::new(RunState::default()),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// State the most recent run ended in
    pub fn last_state(&self) -> RunState {
        self.last_state.lock().clone()
    }

    /// Run every stage on `image` and present the composited frame on `surface`.
    ///
    /// On failure or cancellation nothing is presented, so the surface keeps
    /// showing its previous frame.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub async fn run<S>(
        &self,
        image: Arc<RgbaImage>,
        surface: &mut S,
        cancel: &CancellationToken,
    ) -> PipelineResult<RunReport>
    where
        S: Surface + Sync,
    {
        let start_time = Instant::now();
        let mut tracker = StageTracker::new();

        let result = self.run_stages(image, surface, cancel, &mut tracker).await;
        match &result {
            Ok(report) => {
                info!(
                    "✓ Run complete in {:.2}ms: {} regions ({})",
                    start_time.elapsed().as_secs_f64() * 1000.0,
                    report.regions.len(),
                    report.timings.to_string().replace('\n', ", ")
                );
            }
            Err(e) => {
                tracker.fail(e);
                warn!("Run stopped during {}: {}", e.stage(), e);
            }
        }

        *self.last_state.lock() = tracker.state;
        result
    }

    async fn run_stages<S>(
        &self,
        image: Arc<RgbaImage>,
        surface: &mut S,
        cancel: &CancellationToken,
        tracker: &mut StageTracker,
    ) -> PipelineResult<RunReport>
    where
        S: Surface + Sync,
    {
        let mut timings = StageTimings::default();

        // Preprocessing
        tracker.enter(Stage::Preprocessing, cancel)?;
        let (model_h, model_w) = self.detector.input_size();
        let input = {
            let image = Arc::clone(&image);
            tokio::task::spawn_blocking(move || letterbox(&image, model_h, model_w))
                .await
                .in_stage(Stage::Preprocessing)?
                .in_stage(Stage::Preprocessing)?
        };
        let transform = input.transform;

        // Inference
        tracker.enter(Stage::Inferring, cancel)?;
        let inference_start = Instant::now();
        let tensor = tokio::select! {
            output = self.detector.infer(input) => output.in_stage(Stage::Inferring)?,
            _ = cancel.cancelled() => return Err(PipelineError::Cancelled { stage: Stage::Inferring }),
        };
        timings.inference = inference_start.elapsed();
        debug!("Inference output shape {:?}", tensor.dims());

        // Decoding
        tracker.enter(Stage::Decoding, cancel)?;
        let candidates =
            decode_detections(&tensor, &transform, self.config.confidence_threshold())
                .in_stage(Stage::Decoding)?;

        // Suppression
        tracker.enter(Stage::Suppressing, cancel)?;
        let detections = suppress(candidates, self.config.iou_threshold());

        // OCR
        tracker.enter(Stage::Extracting, cancel)?;
        let texts = if detections.is_empty() {
            Vec::new()
        } else {
            let ocr_start = Instant::now();
            let texts = recognize_regions(
                Arc::clone(&self.ocr),
                Arc::clone(&image),
                &detections,
                self.config.ocr.max_concurrency,
                cancel,
            )
            .await
            .ok_or(PipelineError::Cancelled {
                stage: Stage::Extracting,
            })?;
            timings.ocr = ocr_start.elapsed();
            texts
        };

        // Translation
        tracker.enter(Stage::Translating, cancel)?;
        let translations = if texts.iter().all(String::is_empty) {
            vec![None; texts.len()]
        } else {
            let translation_start = Instant::now();
            let translations = translate_with_fallback(&self.translator, &texts, cancel)
                .await
                .ok_or(PipelineError::Cancelled {
                    stage: Stage::Translating,
                })?;
            timings.translation = translation_start.elapsed();
            translations
        };

        // Per-region colors and layout, then draw
        tracker.enter(Stage::Rendering, cancel)?;
        let params = LayoutParams::from(&self.config.rendering);
        let plans: Vec<RegionPlan> = run_blocking(|| {
            let metrics: &S = &*surface;
            let source: &RgbaImage = &image;
            detections
                .par_iter()
                .zip(texts.into_par_iter())
                .zip(translations.into_par_iter())
                .map(|((detection, original_text), translated_text)| {
                    let dominant_colors = sample_dominant_colors(source, &detection.bbox);
                    let layout = match translated_text.as_deref() {
                        Some(text) => layout_text(text, &detection.bbox, &params, metrics),
                        None => TextLayout::default(),
                    };
                    RegionPlan {
                        region: AnnotatedRegion {
                            detection: *detection,
                            original_text,
                            translated_text,
                            dominant_colors,
                        },
                        layout,
                    }
                })
                .collect()
        });

        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled {
                stage: Stage::Rendering,
            });
        }
        render_frame(surface, &image, &plans, self.config.rendering.debug_outlines)
            .in_stage(Stage::Rendering)?;

        tracker.finish();
        Ok(RunReport {
            regions: plans.into_iter().map(|plan| plan.region).collect(),
            timings,
            stages: tracker.entered.clone(),
        })
    }
}

/// Run CPU-bound work without stalling other tasks on a multi-threaded
/// runtime. The current-thread runtime has no other workers to hand off to.
fn run_blocking<R>(work: impl FnOnce() -> R) -> R {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(work)
        }
        _ => work(),
    }
}
