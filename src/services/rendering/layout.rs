// Fit translated text into a detection box

use super::TextMetrics;
use crate::core::config::RenderingConfig;
use crate::core::types::BBox;

/// Detect if text contains CJK (Chinese, Japanese, Korean) characters
pub fn is_cjk_text(text: &str) -> bool {
    text.chars().any(|c| {
        matches!(c,
            '\u{4E00}'..='\u{9FFF}' |  // CJK Unified Ideographs
            '\u{3040}'..='\u{309F}' |  // Hiragana
            '\u{30A0}'..='\u{30FF}' |  // Katakana
            '\u{AC00}'..='\u{D7AF}'    // Hangul
        )
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutParams {
    pub min_font_size: f32,
    pub max_font_size: f32,
    pub line_height_factor: f32,
    pub horizontal_padding: f32,
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self {
            min_font_size: 12.0,
            max_font_size: 48.0,
            line_height_factor: 1.2,
            horizontal_padding: 8.0,
        }
    }
}

impl From<&RenderingConfig> for LayoutParams {
    fn from(config: &RenderingConfig) -> Self {
        Self {
            min_font_size: config.min_font_size,
            max_font_size: config.max_font_size,
            line_height_factor: config.line_height_factor,
            horizontal_padding: config.horizontal_padding,
        }
    }
}

/// Wrapped lines plus the vertical placement of the block
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextLayout {
    pub font_size: f32,
    pub line_height: f32,
    pub lines: Vec<String>,
    /// Top of the first line
    pub origin_y: f32,
}

impl TextLayout {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn block_height(&self) -> f32 {
        self.lines.len() as f32 * self.line_height
    }

    /// Top of line `index`
    pub fn line_y(&self, index: usize) -> f32 {
        self.origin_y + index as f32 * self.line_height
    }
}

/// CJK text splits per character, everything else on whitespace
pub fn split_segments(text: &str, cjk: bool) -> Vec<String> {
    if cjk {
        text.chars().map(String::from).collect()
    } else {
        text.split_whitespace().map(str::to_string).collect()
    }
}

/// `sqrt(area / chars)` clamped to the configured range, then capped at half the box height
pub fn initial_font_size(bbox: &BBox, char_count: usize, params: &LayoutParams) -> f32 {
    let area = bbox.area() as f32;
    let size = (area / char_count.max(1) as f32).sqrt();
    size.clamp(params.min_font_size, params.max_font_size)
        .min(bbox.height as f32 / 2.0)
}

/// Greedy line wrapping within `bbox.width - horizontal_padding`, block centered vertically.
///
/// A single segment wider than the limit stays on its own line.
pub fn layout_text<M: TextMetrics + ?Sized>(
    text: &str,
    bbox: &BBox,
    params: &LayoutParams,
    metrics: &M,
) -> TextLayout {
    let text = text.trim();
    if text.is_empty() || bbox.width <= 0 || bbox.height <= 0 {
        return TextLayout::default();
    }

    let cjk = is_cjk_text(text);
    let font_size = initial_font_size(bbox, text.chars().count(), params);
    let line_height = font_size * params.line_height_factor;
    let max_width = bbox.width as f32 - params.horizontal_padding;

    let mut lines = Vec::new();
    let mut line = String::new();
    for segment in split_segments(text, cjk) {
        if line.is_empty() {
            if cjk && segment.trim().is_empty() {
                continue;
            }
            line = segment;
            continue;
        }

        let candidate = if cjk {
            format!("{}{}", line, segment)
        } else {
            format!("{} {}", line, segment)
        };

        if metrics.measure_text(&candidate, font_size) > max_width {
            lines.push(std::mem::take(&mut line));
            if !(cjk && segment.trim().is_empty()) {
                line = segment;
            }
        } else {
            line = candidate;
        }
    }
    if !line.is_empty() {
        lines.push(line);
    }

    let block_height = lines.len() as f32 * line_height;
    TextLayout {
        font_size,
        line_height,
        origin_y: bbox.y as f32 + (bbox.height as f32 - block_height) / 2.0,
        lines,
    }
}
