// Shared data model for the detection → overlay workflow

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Axis-aligned box in image pixel coordinates (top-left corner + size)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BBox {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// Saturates at `i32::MAX`
    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.width)
    }

    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height)
    }

    pub fn area(&self) -> i64 {
        self.width.max(0) as i64 * self.height.max(0) as i64
    }

    /// Intersection over union. Zero when the rectangles do not overlap.
    pub fn iou(&self, other: &BBox) -> f32 {
        // Edges in i64
        let x1 = self.x.max(other.x) as i64;
        let y1 = self.y.max(other.y) as i64;
        let x2 = (self.x as i64 + self.width as i64).min(other.x as i64 + other.width as i64);
        let y2 = (self.y as i64 + self.height as i64).min(other.y as i64 + other.height as i64);

        if x2 <= x1 || y2 <= y1 {
            return 0.0;
        }

        let intersection = (x2 - x1) as f64 * (y2 - y1) as f64;
        let union = self.area() as f64 + other.area() as f64 - intersection;

        if union > 0.0 {
            (intersection / union) as f32
        } else {
            0.0
        }
    }

    /// Clip to a `width x height` pixel buffer.
    /// Returns `(x, y, w, h)` or `None` when nothing of the box lies inside.
    pub fn clip_to(&self, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        let x1 = self.x.clamp(0, width as i32);
        let y1 = self.y.clamp(0, height as i32);
        let x2 = self.right().clamp(0, width as i32);
        let y2 = self.bottom().clamp(0, height as i32);

        if x2 <= x1 || y2 <= y1 {
            return None;
        }

        Some((x1 as u32, y1 as u32, (x2 - x1) as u32, (y2 - y1) as u32))
    }
}

/// A decoded detection in original image space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: u32,
    /// Confidence in [0, 1]
    pub probability: f32,
    pub bbox: BBox,
}

/// RGBA color. Sampled colors are opaque; alpha is only used for overlays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Same color with alpha given as a fraction in [0, 1]
    pub fn with_alpha(self, alpha: f32) -> Self {
        Self {
            a: (alpha.clamp(0.0, 1.0) * 255.0).round() as u8,
            ..self
        }
    }

    /// Perceived brightness (ITU-R BT.601 luma) in [0, 255]
    pub fn brightness(&self) -> f32 {
        (self.r as f32 * 299.0 + self.g as f32 * 587.0 + self.b as f32 * 114.0) / 1000.0
    }

    pub fn to_rgba(self) -> image::Rgba<u8> {
        image::Rgba([self.r, self.g, self.b, self.a])
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "rgb({},{},{})", self.r, self.g, self.b)
        } else {
            write!(f, "rgba({},{},{},{:.2})", self.r, self.g, self.b, self.a as f32 / 255.0)
        }
    }
}

/// Background/foreground pair sampled from a region
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DominantColors {
    /// Overlay fill
    pub primary: Option<Color>,
    /// Text color
    pub secondary: Option<Color>,
}

/// Fully annotated region, built once after the color stage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotatedRegion {
    pub detection: Detection,
    pub original_text: String,
    pub translated_text: Option<String>,
    pub dominant_colors: DominantColors,
}

/// Pipeline stages in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Stage {
    Idle,
    Preprocessing,
    Inferring,
    Decoding,
    Suppressing,
    Extracting,
    Translating,
    Rendering,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::Preprocessing => "preprocessing",
            Stage::Inferring => "inferring",
            Stage::Decoding => "decoding",
            Stage::Suppressing => "suppressing",
            Stage::Extracting => "extracting",
            Stage::Translating => "translating",
            Stage::Rendering => "rendering",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Wall-clock durations reported for display only
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageTimings {
    pub inference: Duration,
    /// Whole OCR batch
    pub ocr: Duration,
    /// Whole translation batch
    pub translation: Duration,
}

impl fmt::Display for StageTimings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Model: {}\nOCR: {}\nTranslation: {}",
            format_duration(self.inference),
            format_duration(self.ocr),
            format_duration(self.translation)
        )
    }
}

/// Human readable duration: `"<n> ms"`, `"<s.ss> S"` or `"<m.mm> H"`
pub fn format_duration(duration: Duration) -> String {
    let ms = duration.as_millis();
    if ms < 1000 {
        format!("{} ms", ms)
    } else if ms < 60_000 {
        format!("{:.2} S", ms as f64 / 1000.0)
    } else {
        format!("{:.2} H", ms as f64 / 60_000.0)
    }
}

/// Result of a successful pipeline run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub regions: Vec<AnnotatedRegion>,
    pub timings: StageTimings,
    /// Stages entered, in order
    pub stages: Vec<Stage>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iou_symmetry_and_identity() {
        let a = BBox::new(0, 0, 100, 100);
        let b = BBox::new(50, 50, 100, 100);

        assert_eq!(a.iou(&b), b.iou(&a));
        assert!((a.iou(&a) - 1.0).abs() < f32::EPSILON);
        // 2500 / (10000 + 10000 - 2500)
        assert!((a.iou(&b) - 2500.0 / 17500.0).abs() < 1e-6);
    }

    #[test]
    fn test_iou_disjoint_and_touching() {
        let a = BBox::new(0, 0, 10, 10);
        let far = BBox::new(100, 100, 10, 10);
        let touching = BBox::new(10, 0, 10, 10);

        assert_eq!(a.iou(&far), 0.0);
        assert_eq!(a.iou(&touching), 0.0);
    }

    #[test]
    fn test_iou_degenerate_boxes() {
        let empty = BBox::new(5, 5, 0, 0);
        assert_eq!(empty.iou(&empty), 0.0);
    }

    #[test]
    fn test_extreme_boxes_do_not_overflow() {
        let huge = BBox::new(i32::MAX - 10, i32::MAX - 10, i32::MAX, i32::MAX);
        let negative = BBox::new(i32::MIN, i32::MIN, i32::MAX, i32::MAX);

        assert_eq!(huge.right(), i32::MAX);
        assert!((huge.iou(&huge) - 1.0).abs() < 1e-6);
        assert_eq!(huge.iou(&negative), 0.0);
        assert!(negative.iou(&BBox::new(-10, -10, 5, 5)) > 0.0);
        assert_eq!(huge.clip_to(100, 100), None);
    }

    #[test]
    fn test_clip_to_bounds() {
        let bbox = BBox::new(-10, 5, 50, 200);
        assert_eq!(bbox.clip_to(30, 100), Some((0, 5, 30, 95)));

        let outside = BBox::new(40, 40, 10, 10);
        assert_eq!(outside.clip_to(30, 30), None);
    }

    #[test]
    fn test_brightness_and_display() {
        assert_eq!(Color::WHITE.brightness(), 255.0);
        assert_eq!(Color::BLACK.brightness(), 0.0);
        assert_eq!(Color::rgb(192, 192, 192).to_string(), "rgb(192,192,192)");
        assert_eq!(Color::rgb(255, 56, 56).with_alpha(0.2).a, 51);
    }

    #[test]
    fn test_format_duration_units() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250 ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50 S");
        assert_eq!(format_duration(Duration::from_secs(90)), "1.50 H");
    }

    #[test]
    fn test_timings_display() {
        let timings = StageTimings {
            inference: Duration::from_millis(12),
            ocr: Duration::from_millis(2500),
            translation: Duration::ZERO,
        };
        assert_eq!(timings.to_string(), "Model: 12 ms\nOCR: 2.50 S\nTranslation: 0 ms");
    }

    #[test]
    fn test_stage_order() {
        assert!(Stage::Idle < Stage::Preprocessing);
        assert!(Stage::Translating < Stage::Rendering);
        assert!(Stage::Rendering < Stage::Done);
    }
}
