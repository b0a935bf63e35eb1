// Fakes for the pipeline collaborators

use crate::core::errors::{
    InferenceError, InferenceResult, RecognitionError, RecognitionResult, RenderError,
    RenderResult, TranslationError, TranslationResult,
};
use crate::core::cancel::CancellationToken;
use crate::core::types::{BBox, Color};
use crate::services::detection::{DetectionModel, LetterboxedInput};
use crate::services::ocr::OcrEngine;
use crate::services::rendering::{Surface, TextMetrics};
use crate::services::translation::Translator;
use crate::utils::tensor::{DetectionTensor, Tensor};
use async_trait::async_trait;
use image::RgbaImage;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

enum DetectorOutput {
    Boxes(Vec<(BBox, f32)>),
    Raw(Tensor),
    Fail,
}

/// Detector that reports fixed boxes (given in image space) through a real tensor
pub struct FakeDetector {
    input_size: (u32, u32),
    output: DetectorOutput,
    calls: AtomicUsize,
}

impl FakeDetector {
    pub fn with_boxes(boxes: Vec<(BBox, f32)>) -> Self {
        Self::new(DetectorOutput::Boxes(boxes))
    }

    pub fn with_tensor(tensor: Tensor) -> Self {
        Self::new(DetectorOutput::Raw(tensor))
    }

    pub fn failing() -> Self {
        Self::new(DetectorOutput::Fail)
    }

    fn new(output: DetectorOutput) -> Self {
        Self {
            input_size: (640, 640),
            output,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DetectionModel for FakeDetector {
    fn input_size(&self) -> (u32, u32) {
        self.input_size
    }

    async fn infer(&self, input: LetterboxedInput) -> InferenceResult<DetectionTensor> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        match &self.output {
            DetectorOutput::Boxes(boxes) => {
                let n = boxes.len();
                let mut data = vec![0.0; 5 * n];
                for (i, (bbox, conf)) in boxes.iter().enumerate() {
                    let (cx, cy, w, h) = input.transform.to_model_space(bbox);
                    data[i] = cx;
                    data[i + n] = cy;
                    data[i + 2 * n] = w;
                    data[i + 3 * n] = h;
                    data[i + 4 * n] = *conf;
                }
                Ok(Tensor::from_shape_vec(&[1, 5, n], data)?)
            }
            DetectorOutput::Raw(tensor) => Ok(tensor.clone()),
            DetectorOutput::Fail => Err(InferenceError::Backend("model crashed".to_string())),
        }
    }
}

enum OcrBehavior {
    Text(String),
    Fail,
    Panic,
}

/// OCR keyed by the width of the cropped region. Unknown widths read as empty text.
pub struct ScriptedOcr {
    behaviors: HashMap<u32, OcrBehavior>,
    delays: HashMap<u32, Duration>,
    calls: AtomicUsize,
}

impl ScriptedOcr {
    pub fn by_width() -> Self {
        Self {
            behaviors: HashMap::new(),
            delays: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_text(mut self, width: u32, text: &str) -> Self {
        self.behaviors.insert(width, OcrBehavior::Text(text.to_string()));
        self
    }

    pub fn with_failure(mut self, width: u32) -> Self {
        self.behaviors.insert(width, OcrBehavior::Fail);
        self
    }

    pub fn with_panic(mut self, width: u32) -> Self {
        self.behaviors.insert(width, OcrBehavior::Panic);
        self
    }

    pub fn with_delay(mut self, width: u32, delay: Duration) -> Self {
        self.delays.insert(width, delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OcrEngine for ScriptedOcr {
    async fn recognize(&self, region: RgbaImage) -> RecognitionResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let width = region.width();
        if let Some(delay) = self.delays.get(&width) {
            tokio::time::sleep(*delay).await;
        }

        match self.behaviors.get(&width) {
            Some(OcrBehavior::Text(text)) => Ok(text.clone()),
            Some(OcrBehavior::Fail) => Err(RecognitionError::Engine("unreadable".to_string())),
            Some(OcrBehavior::Panic) => panic!("ocr engine panicked"),
            None => Ok(String::new()),
        }
    }
}

enum TranslatorMode {
    Uppercase,
    Failing,
    Truncating,
}

/// Translator that uppercases, fails, or drops the last result
pub struct FakeTranslator {
    mode: TranslatorMode,
    delay: Option<Duration>,
    batches: Mutex<Vec<Vec<String>>>,
}

impl FakeTranslator {
    fn new(mode: TranslatorMode) -> Self {
        Self {
            mode,
            delay: None,
            batches: Mutex::new(Vec::new()),
        }
    }

    pub fn uppercase() -> Self {
        Self::new(TranslatorMode::Uppercase)
    }

    pub fn failing() -> Self {
        Self::new(TranslatorMode::Failing)
    }

    pub fn truncating() -> Self {
        Self::new(TranslatorMode::Truncating)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every batch received, in order
    pub fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().clone()
    }
}

#[async_trait]
impl Translator for FakeTranslator {
    async fn translate_batch(&self, texts: &[String]) -> TranslationResult<Vec<String>> {
        self.batches.lock().push(texts.to_vec());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.mode {
            TranslatorMode::Uppercase => Ok(texts.iter().map(|t| t.to_uppercase()).collect()),
            TranslatorMode::Failing => Err(TranslationError::HttpStatus {
                status: 502,
                body: "bad gateway".to_string(),
            }),
            TranslatorMode::Truncating => {
                Ok(texts.iter().skip(1).map(|t| t.to_uppercase()).collect())
            }
        }
    }
}

/// Every character advances `factor * font_size`
pub struct FixedAdvanceMetrics {
    factor: f32,
}

impl FixedAdvanceMetrics {
    pub fn new(factor: f32) -> Self {
        Self { factor }
    }
}

impl TextMetrics for FixedAdvanceMetrics {
    fn measure_text(&self, text: &str, font_size: f32) -> f32 {
        text.chars().count() as f32 * font_size * self.factor
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall {
    BeginFrame(u32, u32),
    /// Size of the drawn image
    DrawImage(u32, u32),
    StrokeRect(BBox, Color, f32),
    FillRect(BBox, Color),
    DrawText {
        text: String,
        x: f32,
        y: f32,
        font_size: f32,
        color: Color,
    },
    Present,
}

/// Surface that records draw calls
pub struct RecordingSurface {
    metrics: FixedAdvanceMetrics,
    calls: Vec<DrawCall>,
    fail_text: bool,
    cancel_on_present: Option<CancellationToken>,
}

impl RecordingSurface {
    pub fn new(advance_factor: f32) -> Self {
        Self {
            metrics: FixedAdvanceMetrics::new(advance_factor),
            calls: Vec::new(),
            fail_text: false,
            cancel_on_present: None,
        }
    }

    /// Cancel `token` right after the frame is presented
    pub fn cancelling_on_present(mut self, token: CancellationToken) -> Self {
        self.cancel_on_present = Some(token);
        self
    }

    /// `draw_text` returns a backend error
    pub fn failing_text(mut self) -> Self {
        self.fail_text = true;
        self
    }

    pub fn calls(&self) -> Vec<DrawCall> {
        self.calls.clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                DrawCall::DrawText { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }
}

impl TextMetrics for RecordingSurface {
    fn measure_text(&self, text: &str, font_size: f32) -> f32 {
        self.metrics.measure_text(text, font_size)
    }
}

impl Surface for RecordingSurface {
    fn begin_frame(&mut self, width: u32, height: u32) -> RenderResult<()> {
        self.calls.push(DrawCall::BeginFrame(width, height));
        Ok(())
    }

    fn draw_image(&mut self, image: &RgbaImage) -> RenderResult<()> {
        self.calls.push(DrawCall::DrawImage(image.width(), image.height()));
        Ok(())
    }

    fn stroke_rect(&mut self, bbox: &BBox, color: Color, line_width: f32) -> RenderResult<()> {
        self.calls.push(DrawCall::StrokeRect(*bbox, color, line_width));
        Ok(())
    }

    fn fill_rect(&mut self, bbox: &BBox, color: Color) -> RenderResult<()> {
        self.calls.push(DrawCall::FillRect(*bbox, color));
        Ok(())
    }

    fn draw_text(
        &mut self,
        text: &str,
        x: f32,
        y: f32,
        font_size: f32,
        color: Color,
    ) -> RenderResult<()> {
        if self.fail_text {
            return Err(RenderError::Backend("glyph cache exhausted".to_string()));
        }
        self.calls.push(DrawCall::DrawText {
            text: text.to_string(),
            x,
            y,
            font_size,
            color,
        });
        Ok(())
    }

    fn present(&mut self) -> RenderResult<()> {
        self.calls.push(DrawCall::Present);
        if let Some(token) = &self.cancel_on_present {
            token.cancel();
        }
        Ok(())
    }
}
