// OCR fan-out: one recognition task per detected region

use crate::core::cancel::CancellationToken;
use crate::core::errors::{RecognitionError, RecognitionResult};
use crate::core::types::Detection;
use crate::utils::image_ops::crop_region_async;
use async_trait::async_trait;
use futures::future::join_all;
use image::RgbaImage;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, instrument, trace, warn};

/// Text recognizer for a single cropped region
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, region: RgbaImage) -> RecognitionResult<String>;
}

/// Recognize every region concurrently, at most `max_concurrency` at a time.
///
/// The result is indexed like `detections`. A region whose crop is empty or
/// whose recognition fails yields an empty string. Returns `None` when the run
/// was cancelled; in-flight tasks are aborted.
#[instrument(skip(engine, image, detections, cancel), fields(regions = detections.len()))]
pub async fn recognize_regions(
    engine: Arc<dyn OcrEngine>,
    image: Arc<RgbaImage>,
    detections: &[Detection],
    max_concurrency: usize,
    cancel: &CancellationToken,
) -> Option<Vec<String>> {
    if detections.is_empty() {
        return Some(Vec::new());
    }

    let semaphore = Arc::new(Semaphore::new(max_concurrency.max(1)));
    let mut handles = Vec::with_capacity(detections.len());

    for (index, detection) in detections.iter().enumerate() {
        let engine = Arc::clone(&engine);
        let image = Arc::clone(&image);
        let semaphore = Arc::clone(&semaphore);
        let bbox = detection.bbox;

        handles.push(tokio::spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|e| RecognitionError::Engine(e.to_string()))?;

            let region = crop_region_async(image, bbox)
                .await
                .map_err(|e| RecognitionError::Engine(format!("{:#}", e)))?
                .ok_or(RecognitionError::RegionTooSmall {
                    width: bbox.width.max(0) as u32,
                    height: bbox.height.max(0) as u32,
                })?;

            let text = engine.recognize(region).await?;
            trace!("OCR region {}: {:?}", index, text);
            Ok::<_, RecognitionError>(text)
        }));
    }

    let abort_handles: Vec<_> = handles.iter().map(|h| h.abort_handle()).collect();

    let results = tokio::select! {
        results = join_all(handles) => results,
        _ = cancel.cancelled() => {
            for handle in &abort_handles {
                handle.abort();
            }
            debug!("OCR cancelled, aborted {} tasks", abort_handles.len());
            return None;
        }
    };

    let mut failures = 0;
    let texts = results
        .into_iter()
        .enumerate()
        .map(|(index, joined)| match joined {
            Ok(Ok(text)) => text.trim().to_string(),
            Ok(Err(e)) => {
                failures += 1;
                warn!("OCR failed for region {}: {}", index, e);
                String::new()
            }
            Err(e) => {
                failures += 1;
                warn!("OCR task for region {} did not complete: {}", index, e);
                String::new()
            }
        })
        .collect::<Vec<_>>();

    debug!(
        "OCR finished: {} regions, {} failed",
        texts.len(),
        failures
    );
    Some(texts)
}
