use serde::Serialize;
use std::collections::BTreeMap;

/// One recognized object, in the shape returned by `POST /detect`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    /// `[x1, y1, x2, y2]` in original image pixels.
    #[serde(rename = "box")]
    pub bbox: [i32; 4],
    pub label: String,
    pub score: f64,
}

impl Detection {
    pub fn from_raw(xyxy: [f32; 4], confidence: f32, label: String) -> Self {
        Self {
            bbox: truncate_box(xyxy),
            label,
            score: round_score(confidence),
        }
    }
}

/// Label -> occurrence count. Sorted keys keep the JSON stable.
pub type Summary = BTreeMap<String, usize>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionResponse {
    pub detections: Vec<Detection>,
    pub summary: Summary,
    /// Base64 JPEG of the annotated image, `null` when not requested.
    pub annotated_image: Option<String>,
}

impl DetectionResponse {
    pub fn new(detections: Vec<Detection>, annotated_image: Option<String>) -> Self {
        let summary = summarize_detections(&detections);
        Self {
            detections,
            summary,
            annotated_image,
        }
    }
}

pub fn summarize_detections(detections: &[Detection]) -> Summary {
    let mut counts = Summary::new();
    for det in detections {
        *counts.entry(det.label.clone()).or_insert(0) += 1;
    }
    counts
}

/// Truncates toward zero, never rounds.
pub fn truncate_box(xyxy: [f32; 4]) -> [i32; 4] {
    xyxy.map(|v| v.trunc() as i32)
}

/// Two decimals, exact halves to even.
pub fn round_score(confidence: f32) -> f64 {
    (f64::from(confidence) * 100.0).round_ties_even() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(label: &str) -> Detection {
        Detection {
            bbox: [0, 0, 1, 1],
            label: label.into(),
            score: 0.5,
        }
    }

    #[test]
    fn summary_counts_each_label() {
        let dets = vec![det("person"), det("car"), det("person")];
        let summary = summarize_detections(&dets);

        assert_eq!(summary.len(), 2);
        assert_eq!(summary["person"], 2);
        assert_eq!(summary["car"], 1);
    }

    #[test]
    fn summary_of_nothing_is_empty() {
        assert!(summarize_detections(&[]).is_empty());
    }

    #[test]
    fn scores_round_to_two_decimals() {
        assert_eq!(round_score(0.9234), 0.92);
        assert_eq!(round_score(0.9999), 1.0);
        assert_eq!(round_score(0.25), 0.25);
        assert_eq!(round_score(0.125), 0.12);
        assert_eq!(round_score(0.375), 0.38);
        assert_eq!(round_score(0.625), 0.62);
        assert_eq!(round_score(0.875), 0.88);
        assert_eq!(round_score(0.0), 0.0);
    }

    #[test]
    fn boxes_are_truncated_not_rounded() {
        assert_eq!(truncate_box([100.7, 99.2, 200.9, 199.1]), [100, 99, 200, 199]);
        assert_eq!(truncate_box([-0.6, 0.4, 3.999, 7.0]), [0, 0, 3, 7]);
    }

    #[test]
    fn response_serializes_box_key_and_null_image() {
        let resp = DetectionResponse::new(
            vec![Detection::from_raw([100.0, 100.0, 200.0, 200.0], 0.92, "person".into())],
            None,
        );
        let json = serde_json::to_value(&resp).unwrap();

        assert_eq!(json["detections"][0]["box"], serde_json::json!([100, 100, 200, 200]));
        assert_eq!(json["detections"][0]["label"], "person");
        assert_eq!(json["detections"][0]["score"], 0.92);
        assert_eq!(json["summary"], serde_json::json!({ "person": 1 }));
        assert!(json.get("annotated_image").unwrap().is_null());
    }
}
