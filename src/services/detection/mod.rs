// Detection decoding: letterbox preprocessing, raw tensor → boxes, suppression

pub mod nms;
#[cfg(feature = "onnx")]
pub mod onnx;

use crate::core::errors::{InferenceResult, PreconditionError, PreconditionResult};
use crate::core::types::{BBox, Detection};
use crate::utils::image_ops::{pad_to_square, resize_exact, PAD_FILL};
use crate::utils::tensor::DetectionTensor;
use async_trait::async_trait;
use image::RgbaImage;
use ndarray::Array4;
use tracing::{debug, trace};

pub use nms::suppress;
#[cfg(feature = "onnx")]
pub use onnx::OnnxDetector;

/// Channels every candidate must carry: cx, cy, w, h, confidence
pub const REQUIRED_CHANNELS: usize = 5;

/// Black-box detector: letterboxed input tensor → raw `[batch, channels, N]` output
#[async_trait]
pub trait DetectionModel: Send + Sync {
    /// Model input as `(height, width)`
    fn input_size(&self) -> (u32, u32);

    async fn infer(&self, input: LetterboxedInput) -> InferenceResult<DetectionTensor>;
}

/// Maps original image pixels to the square-padded, scaled model input.
///
/// Padding is in original pixels, scales are model pixels per padded pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LetterboxTransform {
    pub scale_h: f32,
    pub scale_w: f32,
    pub pad_left: u32,
    pub pad_top: u32,
    pub pad_right: u32,
    pub pad_bottom: u32,
}

impl LetterboxTransform {
    pub fn compute(
        image_width: u32,
        image_height: u32,
        model_height: u32,
        model_width: u32,
    ) -> PreconditionResult<Self> {
        if image_width == 0 || image_height == 0 {
            return Err(PreconditionError::InvalidImageSize {
                width: image_width,
                height: image_height,
            });
        }
        if model_width == 0 || model_height == 0 {
            return Err(PreconditionError::InvalidModelInput {
                width: model_width,
                height: model_height,
            });
        }

        let side = image_width.max(image_height);
        let pad_w = side - image_width;
        let pad_h = side - image_height;

        Ok(Self {
            scale_h: model_height as f32 / side as f32,
            scale_w: model_width as f32 / side as f32,
            pad_left: pad_w / 2,
            pad_top: pad_h / 2,
            pad_right: pad_w - pad_w / 2,
            pad_bottom: pad_h - pad_h / 2,
        })
    }

    /// `[top, left, bottom, right]`
    pub fn padding(&self) -> [u32; 4] {
        [self.pad_top, self.pad_left, self.pad_bottom, self.pad_right]
    }

    /// `[scale_h, scale_w]`
    pub fn scales(&self) -> [f32; 2] {
        [self.scale_h, self.scale_w]
    }

    /// Inverse of decoding: image box → `(cx, cy, w, h)` in model space
    pub fn to_model_space(&self, bbox: &BBox) -> (f32, f32, f32, f32) {
        let cx = bbox.x as f32 + bbox.width as f32 / 2.0 + self.pad_left as f32;
        let cy = bbox.y as f32 + bbox.height as f32 / 2.0 + self.pad_top as f32;
        (
            cx * self.scale_w,
            cy * self.scale_h,
            bbox.width as f32 * self.scale_w,
            bbox.height as f32 * self.scale_h,
        )
    }

    /// Model-space candidate → integer box in original image pixels
    pub fn to_image_space(&self, cx: f32, cy: f32, w: f32, h: f32) -> BBox {
        let x = cx / self.scale_w - self.pad_left as f32;
        let y = cy / self.scale_h - self.pad_top as f32;
        let w = w / self.scale_w;
        let h = h / self.scale_h;

        BBox::new(
            (x - w / 2.0).round() as i32,
            (y - h / 2.0).round() as i32,
            w.round().max(0.0) as i32,
            h.round().max(0.0) as i32,
        )
    }
}

/// Normalized NCHW model input plus the transform that produced it
#[derive(Debug, Clone)]
pub struct LetterboxedInput {
    /// `[1, 3, H, W]`, RGB in [0, 1]
    pub tensor: Array4<f32>,
    pub transform: LetterboxTransform,
}

/// Square-pad (centered), resize to the model input and normalize
pub fn letterbox(
    img: &RgbaImage,
    model_height: u32,
    model_width: u32,
) -> PreconditionResult<LetterboxedInput> {
    let transform =
        LetterboxTransform::compute(img.width(), img.height(), model_height, model_width)?;

    let (square, _, _) = pad_to_square(img, PAD_FILL);
    let resized = resize_exact(&square, model_width, model_height);

    let (h, w) = (model_height as usize, model_width as usize);
    let mut tensor = Array4::<f32>::zeros((1, 3, h, w));
    for (x, y, pixel) in resized.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        tensor[[0, 0, y, x]] = pixel[0] as f32 / 255.0;
        tensor[[0, 1, y, x]] = pixel[1] as f32 / 255.0;
        tensor[[0, 2, y, x]] = pixel[2] as f32 / 255.0;
    }

    debug!(
        "Letterboxed {}x{} → [1, 3, {}, {}] (pad {:?})",
        img.width(),
        img.height(),
        h,
        w,
        transform.padding()
    );
    Ok(LetterboxedInput { tensor, transform })
}

/// Decode the first batch entry of a `[batch, channels, N]` tensor.
///
/// Candidate `i` reads cx, cy, w, h, conf at offsets `i, i+N, .., i+4N`.
/// Candidates with `conf < confidence_threshold` are dropped.
pub fn decode_detections(
    tensor: &DetectionTensor,
    transform: &LetterboxTransform,
    confidence_threshold: f32,
) -> PreconditionResult<Vec<Detection>> {
    let dims = tensor.dims();
    if dims.len() != 3 {
        return Err(PreconditionError::TensorRank(dims.to_vec()));
    }

    let (batch, channels, candidates) = (dims[0], dims[1], dims[2]);
    if batch == 0 {
        return Err(PreconditionError::EmptyBatch);
    }
    if channels < REQUIRED_CHANNELS {
        return Err(PreconditionError::TooFewChannels {
            required: REQUIRED_CHANNELS,
            actual: channels,
        });
    }

    let data = tensor.data();
    let expected = batch * channels * candidates;
    if data.len() != expected {
        return Err(PreconditionError::DataLength {
            shape: dims.to_vec(),
            expected,
            actual: data.len(),
        });
    }

    let n = candidates;
    let mut detections = Vec::new();
    for i in 0..n {
        let confidence = data[i + 4 * n];
        // NaN never passes
        if !(confidence >= confidence_threshold) {
            continue;
        }

        let bbox = transform.to_image_space(data[i], data[i + n], data[i + 2 * n], data[i + 3 * n]);
        trace!(
            "Candidate {}: bbox=[{}, {}, {}, {}], conf={:.3}",
            i,
            bbox.x,
            bbox.y,
            bbox.width,
            bbox.height,
            confidence
        );

        detections.push(Detection {
            label: 0,
            probability: confidence.clamp(0.0, 1.0),
            bbox,
        });
    }

    debug!(
        "Decoded {}/{} candidates above confidence threshold {:.2}",
        detections.len(),
        n,
        confidence_threshold
    );
    Ok(detections)
}
