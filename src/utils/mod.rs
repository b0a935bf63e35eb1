pub mod image_ops;
pub mod telemetry;
pub mod tensor;

// Re-export commonly used items
pub use image_ops::{crop_region, crop_region_async, pad_to_square, resize_exact, PAD_FILL};
pub use telemetry::init_tracing;
pub use tensor::{DetectionTensor, Tensor};
