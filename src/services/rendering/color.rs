// Dominant color sampling for overlay fill and text

use crate::core::types::{BBox, Color, DominantColors};
use image::RgbaImage;
use std::collections::HashMap;
use tracing::trace;

/// Minimum luma difference between fill and text before the text color is forced
pub const MIN_CONTRAST: f32 = 50.0;

const fn quantize(v: usize) -> u8 {
    let q = (v + 7) / 16 * 16;
    if q > 255 {
        255
    } else {
        q as u8
    }
}

const fn build_quantization_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut v = 0;
    while v < 256 {
        table[v] = quantize(v);
        v += 1;
    }
    table
}

/// Channel value → nearest multiple of 16 (ties round down, capped at 255)
pub const QUANTIZATION_TABLE: [u8; 256] = build_quantization_table();

/// Rank the quantized colors inside `bbox` and pick fill (primary) and text
/// (secondary) colors. Both are `None` when the box covers no pixels.
pub fn sample_dominant_colors(image: &RgbaImage, bbox: &BBox) -> DominantColors {
    let Some((x0, y0, w, h)) = bbox.clip_to(image.width(), image.height()) else {
        return DominantColors::default();
    };

    // (color, count) in first-seen order
    let mut buckets: Vec<([u8; 3], usize)> = Vec::new();
    let mut index: HashMap<[u8; 3], usize> = HashMap::new();

    for y in y0..y0 + h {
        for x in x0..x0 + w {
            let p = image.get_pixel(x, y);
            let key = [
                QUANTIZATION_TABLE[p[0] as usize],
                QUANTIZATION_TABLE[p[1] as usize],
                QUANTIZATION_TABLE[p[2] as usize],
            ];
            match index.get(&key) {
                Some(&i) => buckets[i].1 += 1,
                None => {
                    index.insert(key, buckets.len());
                    buckets.push((key, 1));
                }
            }
        }
    }

    // Stable: equal counts keep first-seen order
    buckets.sort_by(|a, b| b.1.cmp(&a.1));

    let mut ranked = buckets.iter().map(|([r, g, b], _)| Color::rgb(*r, *g, *b));
    let primary = ranked.next();
    let secondary = ranked.next();

    let secondary = match (primary, secondary) {
        (Some(p), Some(s)) => Some(ensure_contrast(p, s)),
        _ => secondary,
    };

    trace!(
        "Sampled {} color buckets in {}x{} region: primary={:?} secondary={:?}",
        buckets.len(),
        w,
        h,
        primary,
        secondary
    );

    DominantColors { primary, secondary }
}

/// Replace `secondary` with black or white when it is too close to `primary`
pub fn ensure_contrast(primary: Color, secondary: Color) -> Color {
    let yp = primary.brightness();
    if (yp - secondary.brightness()).abs() < MIN_CONTRAST {
        if yp > 128.0 {
            Color::BLACK
        } else {
            Color::WHITE
        }
    } else {
        secondary
    }
}
