use crate::core::types::BBox;
use anyhow::{Context, Result};
use image::imageops::FilterType;
use image::{Rgba, RgbaImage};
use std::sync::Arc;

/// Gray used for letterbox padding
pub const PAD_FILL: Rgba<u8> = Rgba([114, 114, 114, 255]);

/// Copy the part of `bbox` that lies inside `img`.
///
/// Returns `None` when the box is empty or entirely outside the image.
pub fn crop_region(img: &RgbaImage, bbox: &BBox) -> Option<RgbaImage> {
    let (x, y, w, h) = bbox.clip_to(img.width(), img.height())?;
    Some(image::imageops::crop_imm(img, x, y, w, h).to_image())
}

/// Asynchronously crop a region using spawn_blocking to avoid blocking the async runtime.
///
/// The source image is shared, so many regions can be cut from it concurrently.
pub async fn crop_region_async(img: Arc<RgbaImage>, bbox: BBox) -> Result<Option<RgbaImage>> {
    tokio::task::spawn_blocking(move || crop_region(&img, &bbox))
        .await
        .context("Failed to spawn blocking task for region cropping")
}

/// Center `img` on a square canvas of side `max(w, h)` filled with `fill`.
///
/// Returns the canvas and the `(left, top)` offset of the original image.
pub fn pad_to_square(img: &RgbaImage, fill: Rgba<u8>) -> (RgbaImage, u32, u32) {
    let (w, h) = img.dimensions();
    let side = w.max(h);
    let left = (side - w) / 2;
    let top = (side - h) / 2;

    let mut canvas = RgbaImage::from_pixel(side, side, fill);
    image::imageops::replace(&mut canvas, img, left as i64, top as i64);
    (canvas, left, top)
}

/// Resize to exactly `width x height`
pub fn resize_exact(img: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    if img.dimensions() == (width, height) {
        return img.clone();
    }
    image::imageops::resize(img, width, height, FilterType::Triangle)
}
