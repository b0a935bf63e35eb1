pub mod detection;
pub mod ocr;
pub mod rendering;
pub mod translation;

// Re-export commonly used services
pub use detection::{
    decode_detections, letterbox, suppress, DetectionModel, LetterboxTransform, LetterboxedInput,
};
#[cfg(feature = "onnx")]
pub use detection::OnnxDetector;
pub use ocr::{recognize_regions, OcrEngine};
pub use rendering::{
    layout_text, render_frame, sample_dominant_colors, GlyphRenderer, RasterSurface, Surface,
    TextMetrics,
};
pub use translation::{translate_with_fallback, HttpTranslator, Translator};
