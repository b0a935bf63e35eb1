use crate::core::types::Detection;
use tracing::{debug, trace};

/// Greedy non-maximum suppression.
///
/// Boxes are visited in descending probability (ties keep input order); each
/// box still standing is kept and suppresses every later box whose IoU with it
/// exceeds `iou_threshold`.
pub fn suppress(detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    if detections.is_empty() {
        debug!("NMS: No detections to filter");
        return vec![];
    }

    trace!(
        "NMS: Processing {} detections with IoU threshold={}",
        detections.len(),
        iou_threshold
    );

    let mut sorted = detections;
    // sort_by is stable
    sorted.sort_by(|a, b| b.probability.total_cmp(&a.probability));

    let mut keep = Vec::new();
    let mut suppressed = vec![false; sorted.len()];
    let mut suppressed_count = 0;

    for i in 0..sorted.len() {
        if suppressed[i] {
            continue;
        }

        keep.push(sorted[i]);

        for j in (i + 1)..sorted.len() {
            if !suppressed[j] {
                let iou = sorted[i].bbox.iou(&sorted[j].bbox);
                if iou > iou_threshold {
                    suppressed[j] = true;
                    suppressed_count += 1;
                    trace!(
                        "NMS: Suppressed detection {} (IoU={:.3} with detection {})",
                        j,
                        iou,
                        i
                    );
                }
            }
        }
    }

    debug!(
        "NMS: Kept {}/{} detections (suppressed {})",
        keep.len(),
        sorted.len(),
        suppressed_count
    );
    keep
}
