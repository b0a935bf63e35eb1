// Double-buffered RgbaImage surface with cosmic-text glyph rendering

use super::{Surface, TextMetrics};
use crate::core::errors::{RenderError, RenderResult};
use crate::core::types::{BBox, Color};
use cosmic_text::{
    Attrs, Buffer, Color as CosmicColor, Family, FontSystem, Metrics, Shaping, SwashCache, Wrap,
};
use image::{Rgba, RgbaImage};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

/// Shapes and rasterizes single lines of text
pub struct GlyphRenderer {
    font_system: Mutex<FontSystem>,
    swash_cache: Mutex<SwashCache>,
}

impl GlyphRenderer {
    /// Use the fonts installed on this machine
    pub fn with_system_fonts() -> Self {
        let renderer = Self::from_font_system(FontSystem::new());
        info!(
            "✓ Glyph renderer ready ({} system font faces)",
            renderer.font_count()
        );
        renderer
    }

    /// Use only the given font files (TTF, OTF or TTC bytes)
    pub fn from_font_data(fonts: Vec<Vec<u8>>) -> Self {
        use cosmic_text::fontdb;

        let mut db = fontdb::Database::new();
        let count = fonts.len();
        for font_data in fonts {
            db.load_font_data(font_data);
        }
        debug!("✓ Loaded {} font files", count);

        Self::from_font_system(FontSystem::new_with_locale_and_db("en-US".to_string(), db))
    }

    fn from_font_system(font_system: FontSystem) -> Self {
        Self {
            font_system: Mutex::new(font_system),
            swash_cache: Mutex::new(SwashCache::new()),
        }
    }

    /// Number of font faces available for shaping
    pub fn font_count(&self) -> usize {
        self.font_system.lock().db().len()
    }

    fn shape_line(&self, font_system: &mut FontSystem, text: &str, font_size: f32) -> Buffer {
        let metrics = Metrics::new(font_size, font_size * 1.2);
        let mut buffer = Buffer::new(font_system, metrics);
        buffer.set_size(font_system, None, None);
        buffer.set_wrap(font_system, Wrap::None);

        let attrs = Attrs::new().family(Family::SansSerif);
        buffer.set_text(font_system, text, &attrs, Shaping::Advanced);
        buffer.shape_until_scroll(font_system, false);
        buffer
    }

    /// Logical advance width of `text` on one line
    pub fn measure(&self, text: &str, font_size: f32) -> f32 {
        if text.is_empty() || font_size <= 0.0 {
            return 0.0;
        }

        let mut font_system = self.font_system.lock();
        let buffer = self.shape_line(&mut font_system, text, font_size);
        buffer
            .layout_runs()
            .map(|run| run.line_w)
            .fold(0.0f32, f32::max)
    }

    /// Alpha-blend `text` into `img` with its top-left corner at `(x, y)`
    pub fn draw(
        &self,
        img: &mut RgbaImage,
        text: &str,
        x: f32,
        y: f32,
        font_size: f32,
        color: Color,
    ) {
        if text.is_empty() || font_size <= 0.0 {
            return;
        }

        let buffer = {
            let mut font_system = self.font_system.lock();
            self.shape_line(&mut font_system, text, font_size)
        };

        let cosmic_color = CosmicColor::rgba(color.r, color.g, color.b, color.a);
        let (origin_x, origin_y) = (x.round() as i32, y.round() as i32);

        let mut font_system = self.font_system.lock();
        let mut swash_cache = self.swash_cache.lock();
        buffer.draw(
            &mut font_system,
            &mut swash_cache,
            cosmic_color,
            |px_x, px_y, w, h, pixel_color| {
                let paint = Color {
                    r: pixel_color.r(),
                    g: pixel_color.g(),
                    b: pixel_color.b(),
                    a: pixel_color.a(),
                };
                blend_rect(
                    img,
                    (origin_x + px_x) as i64,
                    (origin_y + px_y) as i64,
                    (origin_x + px_x) as i64 + w as i64,
                    (origin_y + px_y) as i64 + h as i64,
                    paint,
                );
            },
        );
    }
}

/// Source-over blend of `color` into the half-open rectangle `[x0, x1) x [y0, y1)`
fn blend_rect(img: &mut RgbaImage, x0: i64, y0: i64, x1: i64, y1: i64, color: Color) {
    if color.a == 0 {
        return;
    }

    let x0 = x0.clamp(0, img.width() as i64) as u32;
    let y0 = y0.clamp(0, img.height() as i64) as u32;
    let x1 = x1.clamp(0, img.width() as i64) as u32;
    let y1 = y1.clamp(0, img.height() as i64) as u32;

    let alpha = color.a as f32 / 255.0;
    let inv_alpha = 1.0 - alpha;
    for y in y0..y1 {
        for x in x0..x1 {
            let existing = *img.get_pixel(x, y);
            let blended = Rgba([
                (color.r as f32 * alpha + existing[0] as f32 * inv_alpha).round() as u8,
                (color.g as f32 * alpha + existing[1] as f32 * inv_alpha).round() as u8,
                (color.b as f32 * alpha + existing[2] as f32 * inv_alpha).round() as u8,
                existing[3].max(color.a),
            ]);
            img.put_pixel(x, y, blended);
        }
    }
}

/// In-memory canvas. Drawing goes to a back buffer that replaces the visible
/// frame only on `present`, so an abandoned frame never shows.
pub struct RasterSurface {
    renderer: Arc<GlyphRenderer>,
    front: Option<RgbaImage>,
    back: Option<RgbaImage>,
}

impl RasterSurface {
    pub fn new(renderer: Arc<GlyphRenderer>) -> Self {
        Self {
            renderer,
            front: None,
            back: None,
        }
    }

    /// Last presented frame
    pub fn frame(&self) -> Option<&RgbaImage> {
        self.front.as_ref()
    }

    pub fn into_frame(self) -> Option<RgbaImage> {
        self.front
    }

    fn back_mut(&mut self) -> RenderResult<&mut RgbaImage> {
        self.back.as_mut().ok_or(RenderError::NoActiveFrame)
    }
}

impl TextMetrics for RasterSurface {
    fn measure_text(&self, text: &str, font_size: f32) -> f32 {
        self.renderer.measure(text, font_size)
    }
}

impl Surface for RasterSurface {
    fn begin_frame(&mut self, width: u32, height: u32) -> RenderResult<()> {
        if width == 0 || height == 0 {
            return Err(RenderError::SurfaceUnavailable { width, height });
        }
        self.back = Some(RgbaImage::new(width, height));
        Ok(())
    }

    fn draw_image(&mut self, image: &RgbaImage) -> RenderResult<()> {
        let back = self.back_mut()?;
        image::imageops::replace(back, image, 0, 0);
        Ok(())
    }

    fn stroke_rect(&mut self, bbox: &BBox, color: Color, line_width: f32) -> RenderResult<()> {
        let back = self.back_mut()?;

        // Stroke centered on the box edge
        let half = (line_width / 2.0).max(0.5);
        let outer_x0 = (bbox.x as f32 - half).round() as i64;
        let outer_y0 = (bbox.y as f32 - half).round() as i64;
        let outer_x1 = (bbox.right() as f32 + half).round() as i64;
        let outer_y1 = (bbox.bottom() as f32 + half).round() as i64;
        let inner_x0 = (bbox.x as f32 + half).round() as i64;
        let inner_y0 = (bbox.y as f32 + half).round() as i64;
        let inner_x1 = ((bbox.right() as f32 - half).round() as i64).max(inner_x0);
        let inner_y1 = ((bbox.bottom() as f32 - half).round() as i64).max(inner_y0);

        blend_rect(back, outer_x0, outer_y0, outer_x1, inner_y0, color);
        blend_rect(back, outer_x0, inner_y1, outer_x1, outer_y1, color);
        blend_rect(back, outer_x0, inner_y0, inner_x0, inner_y1, color);
        blend_rect(back, inner_x1, inner_y0, outer_x1, inner_y1, color);
        Ok(())
    }

    fn fill_rect(&mut self, bbox: &BBox, color: Color) -> RenderResult<()> {
        let back = self.back_mut()?;
        blend_rect(
            back,
            bbox.x as i64,
            bbox.y as i64,
            bbox.right() as i64,
            bbox.bottom() as i64,
            color,
        );
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
        let renderer = Arc::clone(&self.renderer);
        let back = self.back_mut()?;
        renderer.draw(back, text, x, y, font_size, color);
        Ok(())
    }

    fn present(&mut self) -> RenderResult<()> {
        let frame = self.back.take().ok_or(RenderError::NoActiveFrame)?;
        self.front = Some(frame);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface() -> RasterSurface {
        RasterSurface::new(Arc::new(GlyphRenderer::from_font_data(Vec::new())))
    }

    #[test]
    fn test_drawing_requires_frame() {
        let mut surface = surface();
        assert!(matches!(
            surface.fill_rect(&BBox::new(0, 0, 1, 1), Color::BLACK),
            Err(RenderError::NoActiveFrame)
        ));
        assert!(matches!(surface.present(), Err(RenderError::NoActiveFrame)));
        assert!(matches!(
            surface.begin_frame(0, 10),
            Err(RenderError::SurfaceUnavailable { .. })
        ));
    }

    #[test]
    fn test_frame_visible_only_after_present() {
        let mut surface = surface();
        let source = RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 255]));

        surface.begin_frame(4, 4).unwrap();
        surface.draw_image(&source).unwrap();
        assert!(surface.frame().is_none());

        surface.present().unwrap();
        assert_eq!(surface.frame(), Some(&source));

        // An abandoned second frame leaves the first one in place
        surface.begin_frame(4, 4).unwrap();
        surface.fill_rect(&BBox::new(0, 0, 4, 4), Color::WHITE).unwrap();
        assert_eq!(surface.frame(), Some(&source));
    }

    #[test]
    fn test_fill_rect_blends_and_clips() {
        let mut surface = surface();
        surface.begin_frame(4, 4).unwrap();
        surface
            .draw_image(&RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255])))
            .unwrap();
        surface
            .fill_rect(&BBox::new(2, 2, 10, 10), Color::WHITE.with_alpha(0.2))
            .unwrap();
        surface.fill_rect(&BBox::new(-5, -5, 6, 6), Color::WHITE).unwrap();
        surface.present().unwrap();

        let frame = surface.frame().unwrap();
        assert_eq!(frame.get_pixel(0, 0), &Rgba([255, 255, 255, 255]));
        assert_eq!(frame.get_pixel(3, 3), &Rgba([51, 51, 51, 255]));
        assert_eq!(frame.get_pixel(1, 2), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_stroke_rect_leaves_interior() {
        let mut surface = surface();
        surface.begin_frame(20, 20).unwrap();
        surface
            .draw_image(&RgbaImage::from_pixel(20, 20, Rgba([0, 0, 0, 255])))
            .unwrap();
        surface
            .stroke_rect(&BBox::new(5, 5, 10, 10), Color::rgb(255, 0, 0), 2.0)
            .unwrap();
        surface.present().unwrap();

        let frame = surface.frame().unwrap();
        assert_eq!(frame.get_pixel(5, 5), &Rgba([255, 0, 0, 255]));
        assert_eq!(frame.get_pixel(4, 10), &Rgba([255, 0, 0, 255]));
        assert_eq!(frame.get_pixel(10, 10), &Rgba([0, 0, 0, 255]));
        assert_eq!(frame.get_pixel(0, 0), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_measure_empty_text() {
        let renderer = GlyphRenderer::from_font_data(Vec::new());
        assert_eq!(renderer.font_count(), 0);
        assert_eq!(renderer.measure("", 16.0), 0.0);
    }

    fn system_renderer() -> Option<Arc<GlyphRenderer>> {
        let renderer = GlyphRenderer::with_system_fonts();
        if renderer.font_count() == 0 {
            eprintln!("no system fonts installed, skipping glyph test");
            return None;
        }
        Some(Arc::new(renderer))
    }

    #[test]
    fn test_measure_with_system_fonts() {
        let Some(renderer) = system_renderer() else {
            return;
        };

        let short = renderer.measure("abc", 24.0);
        let long = renderer.measure("abcabcabc", 24.0);
        assert!(short > 0.0);
        assert!(long > short);
        assert!(renderer.measure("abc", 48.0) > short);
    }

    #[test]
    fn test_draw_text_marks_pixels_inside_box() {
        let Some(renderer) = system_renderer() else {
            return;
        };
        let white = Rgba([255, 255, 255, 255]);
        let mut surface = RasterSurface::new(renderer);

        surface.begin_frame(200, 80).unwrap();
        surface.draw_image(&RgbaImage::from_pixel(200, 80, white)).unwrap();
        surface.draw_text("Hello", 20.0, 20.0, 32.0, Color::BLACK).unwrap();
        surface.present().unwrap();

        let frame = surface.frame().unwrap();
        let inside = (20..180)
            .flat_map(|x| (20..70).map(move |y| (x, y)))
            .filter(|&(x, y)| frame.get_pixel(x, y) != &white)
            .count();
        assert!(inside > 0);

        // Nothing above or left of the text origin
        for x in 0..200 {
            assert_eq!(frame.get_pixel(x, 0), &white);
        }
        for y in 0..80 {
            assert_eq!(frame.get_pixel(0, y), &white);
        }
    }
}
