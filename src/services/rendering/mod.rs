// Overlay rendering: surface abstraction, debug outlines, translated text boxes

pub mod color;
pub mod layout;
pub mod raster;

use crate::core::errors::RenderResult;
use crate::core::types::{AnnotatedRegion, BBox, Color};
use image::RgbaImage;
use tracing::{debug, trace};

pub use color::{ensure_contrast, sample_dominant_colors, QUANTIZATION_TABLE};
pub use layout::{is_cjk_text, layout_text, LayoutParams, TextLayout};
pub use raster::{GlyphRenderer, RasterSurface};

/// Detection outline palette
pub const PALETTE: [Color; 20] = [
    Color::rgb(0xFF, 0x38, 0x38),
    Color::rgb(0xFF, 0x9D, 0x97),
    Color::rgb(0xFF, 0x70, 0x1F),
    Color::rgb(0xFF, 0xB2, 0x1D),
    Color::rgb(0xCF, 0xD2, 0x31),
    Color::rgb(0x48, 0xF9, 0x0A),
    Color::rgb(0x92, 0xCC, 0x17),
    Color::rgb(0x3D, 0xDB, 0x86),
    Color::rgb(0x1A, 0x93, 0x34),
    Color::rgb(0x00, 0xD4, 0xBB),
    Color::rgb(0x2C, 0x99, 0xA8),
    Color::rgb(0x00, 0xC2, 0xFF),
    Color::rgb(0x34, 0x45, 0x93),
    Color::rgb(0x64, 0x73, 0xFF),
    Color::rgb(0x00, 0x18, 0xEC),
    Color::rgb(0x84, 0x38, 0xFF),
    Color::rgb(0x52, 0x00, 0x85),
    Color::rgb(0xCB, 0x38, 0xFF),
    Color::rgb(0xFF, 0x95, 0xC8),
    Color::rgb(0xFF, 0x37, 0xC7),
];

/// Alpha of the debug outline fill
pub const OUTLINE_FILL_ALPHA: f32 = 0.2;

/// Overlay fill when no color was sampled
pub const DEFAULT_FILL: Color = Color::BLACK;
/// Text color when no secondary color was sampled
pub const DEFAULT_TEXT: Color = Color::WHITE;

pub fn label_color(label: u32) -> Color {
    PALETTE[label as usize % PALETTE.len()]
}

/// Outline stroke width for a canvas of the given size
pub fn outline_width(canvas_width: u32, canvas_height: u32) -> f32 {
    (canvas_width.min(canvas_height) as f32 / 200.0).max(2.5)
}

/// Horizontal text measurement at a given font size
pub trait TextMetrics {
    fn measure_text(&self, text: &str, font_size: f32) -> f32;
}

/// 2D drawing target. A frame is only visible after `present`.
pub trait Surface: TextMetrics {
    /// Start a cleared `width x height` frame
    fn begin_frame(&mut self, width: u32, height: u32) -> RenderResult<()>;

    fn draw_image(&mut self, image: &RgbaImage) -> RenderResult<()>;

    fn stroke_rect(&mut self, bbox: &BBox, color: Color, line_width: f32) -> RenderResult<()>;

    fn fill_rect(&mut self, bbox: &BBox, color: Color) -> RenderResult<()>;

    /// Draw one line of text with its top-left corner at `(x, y)`
    fn draw_text(
        &mut self,
        text: &str,
        x: f32,
        y: f32,
        font_size: f32,
        color: Color,
    ) -> RenderResult<()>;

    fn present(&mut self) -> RenderResult<()>;
}

/// A region ready to draw
#[derive(Debug, Clone, PartialEq)]
pub struct RegionPlan {
    pub region: AnnotatedRegion,
    pub layout: TextLayout,
}

/// Debug outline, filled overlay and centered text for one region
pub fn draw_region<S: Surface + ?Sized>(
    surface: &mut S,
    plan: &RegionPlan,
    canvas_size: (u32, u32),
    debug_outlines: bool,
) -> RenderResult<()> {
    let region = &plan.region;
    let bbox = &region.detection.bbox;

    if debug_outlines {
        let color = label_color(region.detection.label);
        surface.stroke_rect(bbox, color, outline_width(canvas_size.0, canvas_size.1))?;
        surface.fill_rect(bbox, color.with_alpha(OUTLINE_FILL_ALPHA))?;
    }

    let has_text = region
        .translated_text
        .as_deref()
        .is_some_and(|t| !t.trim().is_empty());
    if !has_text || plan.layout.is_empty() {
        return Ok(());
    }

    let colors = region.dominant_colors;
    surface.fill_rect(bbox, colors.primary.unwrap_or(DEFAULT_FILL))?;

    let text_color = colors.secondary.unwrap_or(DEFAULT_TEXT);
    let layout = &plan.layout;
    for (i, line) in layout.lines.iter().enumerate() {
        let width = surface.measure_text(line, layout.font_size);
        let x = bbox.x as f32 + (bbox.width as f32 - width) / 2.0;
        surface.draw_text(line, x, layout.line_y(i), layout.font_size, text_color)?;
    }

    trace!(
        "Drew {} lines at {:.1}px in [{}, {}, {}, {}]",
        layout.lines.len(),
        layout.font_size,
        bbox.x,
        bbox.y,
        bbox.width,
        bbox.height
    );
    Ok(())
}

/// Clear, draw the source image, then every region in order, and present
pub fn render_frame<S: Surface + ?Sized>(
    surface: &mut S,
    image: &RgbaImage,
    plans: &[RegionPlan],
    debug_outlines: bool,
) -> RenderResult<()> {
    let canvas_size = image.dimensions();
    surface.begin_frame(canvas_size.0, canvas_size.1)?;
    surface.draw_image(image)?;

    for plan in plans {
        draw_region(surface, plan, canvas_size, debug_outlines)?;
    }

    surface.present()?;
    debug!("Rendered frame with {} regions", plans.len());
    Ok(())
}
