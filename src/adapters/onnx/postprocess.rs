use ndarray::{s, ArrayView2};

use crate::domain::model::{RawInstance, YoloParams};

/// Decodes a YOLOv8-style head, shaped `[4 + num_classes, num_candidates]`
/// with `cx, cy, w, h` in model-input pixels.
///
/// Boxes are scaled by `(sx, sy)` back to the original image and clipped to
/// `width x height`. Candidates whose best class score is not above
/// `conf_threshold` are dropped.
pub fn decode_candidates(
    view: ArrayView2<f32>,
    conf_threshold: f32,
    (sx, sy): (f32, f32),
    (width, height): (u32, u32),
) -> Vec<RawInstance> {
    let (rows, num_candidates) = view.dim();
    if rows <= 4 {
        return Vec::new();
    }
    let (w_max, h_max) = (width as f32, height as f32);

    let mut out = Vec::new();
    for i in 0..num_candidates {
        let scores = view.slice(s![4.., i]);
        let Some((class_id, &score)) = scores
            .indexed_iter()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
        else {
            continue;
        };
        if !(score > conf_threshold) {
            continue;
        }

        let cx = view[[0, i]];
        let cy = view[[1, i]];
        let w = view[[2, i]];
        let h = view[[3, i]];

        out.push(RawInstance {
            xyxy: [
                ((cx - w / 2.0) * sx).clamp(0.0, w_max),
                ((cy - h / 2.0) * sy).clamp(0.0, h_max),
                ((cx + w / 2.0) * sx).clamp(0.0, w_max),
                ((cy + h / 2.0) * sy).clamp(0.0, h_max),
            ],
            confidence: score,
            class_id,
        });
    }
    out
}

pub fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let ix = (a[2].min(b[2]) - a[0].max(b[0])).max(0.0);
    let iy = (a[3].min(b[3]) - a[1].max(b[1])).max(0.0);
    let inter = ix * iy;
    let area = |r: &[f32; 4]| (r[2] - r[0]).max(0.0) * (r[3] - r[1]).max(0.0);
    let union = area(a) + area(b) - inter;
    if union <= 0.0 { 0.0 } else { inter / union }
}

/// Class-aware NMS. Output is sorted by confidence, highest first, and capped
/// at `params.max_detections`.
pub fn non_max_suppression(mut candidates: Vec<RawInstance>, params: &YoloParams) -> Vec<RawInstance> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<RawInstance> = Vec::new();
    for cand in candidates {
        if keep.len() >= params.max_detections {
            break;
        }
        let overlaps = keep
            .iter()
            .any(|k| k.class_id == cand.class_id && iou(&k.xyxy, &cand.xyxy) > params.iou_threshold);
        if !overlaps {
            keep.push(cand);
        }
    }
    keep
}
