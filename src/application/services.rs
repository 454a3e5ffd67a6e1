use image::RgbImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::{
    application::{
        imaging::{encode_jpeg, to_base64, to_display_order, JPEG_QUALITY},
        ports::DetectorPort,
    },
    domain::{
        detection::{Detection, DetectionResponse},
        errors::{DomainError, DomainResult},
        model::RawDetections,
    },
};

/// File name of the "last result" snapshot under the output directory.
pub const SNAPSHOT_FILE: &str = "last_annotated.jpg";

/// Which forms of the annotated image a request wants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnnotationOptions {
    /// Inline base64 JPEG in `annotated_image`.
    pub embed: bool,
    /// Overwrite `<output_dir>/last_annotated.jpg`.
    pub persist: bool,
}

impl AnnotationOptions {
    fn wants_render(&self) -> bool {
        self.embed || self.persist
    }
}

/// Turns raw detector output into the stable response contract.
#[derive(Clone)]
pub struct DetectionService {
    detector: Arc<dyn DetectorPort>,
    output_dir: PathBuf,
}

impl DetectionService {
    /// Creates `output_dir` if it does not exist yet.
    pub fn new(detector: Arc<dyn DetectorPort>, output_dir: impl Into<PathBuf>) -> DomainResult<Self> {
        let output_dir = output_dir.into();
        std::fs::create_dir_all(&output_dir).map_err(|e| {
            DomainError::OperationFailed(format!("cannot create {}: {e}", output_dir.display()))
        })?;
        Ok(Self { detector, output_dir })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.output_dir.join(SNAPSHOT_FILE)
    }

    /// Blocking. The threshold goes to the detector untouched; no filtering
    /// or reordering happens here.
    pub fn detect(
        &self,
        image: &RgbImage,
        confidence_threshold: f32,
        options: AnnotationOptions,
    ) -> DomainResult<DetectionResponse> {
        let raw = self.detector.infer(image, confidence_threshold)?;
        let detections = self.normalize(&raw)?;
        debug!(count = detections.len(), threshold = confidence_threshold, "detections normalized");

        let annotated_image = if options.wants_render() {
            self.annotate(image, &raw, options)?
        } else {
            None
        };

        Ok(DetectionResponse::new(detections, annotated_image))
    }

    fn normalize(&self, raw: &RawDetections) -> DomainResult<Vec<Detection>> {
        let names = self.detector.class_names();
        raw.instances
            .iter()
            .map(|inst| {
                let label = names
                    .get(inst.class_id)
                    .filter(|l| !l.is_empty())
                    .ok_or_else(|| {
                        DomainError::Inference(format!("no label for class index {}", inst.class_id))
                    })?;
                Ok(Detection::from_raw(inst.xyxy, inst.confidence, label.to_string()))
            })
            .collect()
    }

    fn annotate(
        &self,
        image: &RgbImage,
        raw: &RawDetections,
        options: AnnotationOptions,
    ) -> DomainResult<Option<String>> {
        let frame = self.detector.render(image, raw)?;
        let rgb = to_display_order(frame);
        let jpeg = encode_jpeg(&rgb, JPEG_QUALITY)?;

        if options.persist {
            // No lock: concurrent requests overwrite each other, last write wins.
            let path = self.snapshot_path();
            std::fs::write(&path, &jpeg).map_err(|e| {
                DomainError::OperationFailed(format!("cannot write {}: {e}", path.display()))
            })?;
            debug!(path = %path.display(), bytes = jpeg.len(), "annotated snapshot written");
        }

        Ok(options.embed.then(|| to_base64(&jpeg)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::{instance, red_image, MockDetector};
    use base64::{prelude::BASE64_STANDARD, Engine};
    use image::Rgb;
    use std::sync::atomic::Ordering;

    fn service(detector: MockDetector) -> (DetectionService, Arc<MockDetector>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let detector = Arc::new(detector);
        let svc = DetectionService::new(detector.clone(), dir.path().join("output")).unwrap();
        (svc, detector, dir)
    }

    #[test]
    fn creates_output_dir() {
        let (svc, _, _dir) = service(MockDetector::empty());
        assert!(svc.output_dir().is_dir());
    }

    #[test]
    fn no_instances_yields_empty_response() {
        let (svc, _, _dir) = service(MockDetector::empty());
        let resp = svc.detect(&red_image(), 0.25, AnnotationOptions::default()).unwrap();

        assert!(resp.detections.is_empty());
        assert!(resp.summary.is_empty());
        assert_eq!(resp.annotated_image, None);
    }

    #[test]
    fn maps_boxes_labels_and_scores_in_order() {
        let (svc, _, _dir) = service(MockDetector::new(vec![
            instance([100.7, 99.2, 200.9, 199.1], 0.9234, 0),
            instance([300.0, 150.0, 450.0, 250.0], 0.88, 1),
            instance([500.0, 300.0, 600.0, 400.0], 0.9999, 0),
        ]));
        let resp = svc.detect(&red_image(), 0.25, AnnotationOptions::default()).unwrap();

        let labels: Vec<_> = resp.detections.iter().map(|d| d.label.as_str()).collect();
        assert_eq!(labels, ["person", "car", "person"]);
        assert_eq!(resp.detections[0].bbox, [100, 99, 200, 199]);
        assert_eq!(resp.detections[0].score, 0.92);
        assert_eq!(resp.detections[2].score, 1.0);
        assert_eq!(resp.summary.len(), 2);
        assert_eq!(resp.summary["person"], 2);
        assert_eq!(resp.summary["car"], 1);
    }

    #[test]
    fn threshold_reaches_detector_unmodified() {
        let (svc, det, _dir) = service(MockDetector::empty());
        svc.detect(&red_image(), 0.75, AnnotationOptions::default()).unwrap();
        assert_eq!(det.last_threshold(), Some(0.75));
    }

    #[test]
    fn repeated_runs_are_byte_identical() {
        let (svc, _, _dir) = service(MockDetector::new(vec![
            instance([1.5, 2.5, 3.5, 4.5], 0.5, 2),
            instance([10.0, 20.0, 30.0, 40.0], 0.61, 1),
            instance([5.0, 5.0, 9.0, 9.0], 0.7, 2),
        ]));
        let a = svc.detect(&red_image(), 0.3, AnnotationOptions::default()).unwrap();
        let b = svc.detect(&red_image(), 0.3, AnnotationOptions::default()).unwrap();

        assert_eq!(
            serde_json::to_vec(&a.detections).unwrap(),
            serde_json::to_vec(&b.detections).unwrap()
        );
        assert_eq!(
            serde_json::to_vec(&a.summary).unwrap(),
            serde_json::to_vec(&b.summary).unwrap()
        );
    }

    #[test]
    fn unknown_class_index_is_an_inference_error() {
        let (svc, _, _dir) = service(MockDetector::new(vec![instance([0.0; 4], 0.9, 42)]));
        let err = svc.detect(&red_image(), 0.25, AnnotationOptions::default()).unwrap_err();
        assert!(matches!(err, DomainError::Inference(_)));
    }

    #[test]
    fn detector_errors_propagate() {
        let (svc, _, _dir) = service(MockDetector::empty().failing("out of memory"));
        let err = svc.detect(&red_image(), 0.25, AnnotationOptions::default()).unwrap_err();
        assert!(matches!(err, DomainError::Inference(msg) if msg == "out of memory"));
    }

    #[test]
    fn skips_rendering_when_nothing_requested() {
        let (svc, det, _dir) = service(MockDetector::empty());
        svc.detect(&red_image(), 0.25, AnnotationOptions::default()).unwrap();

        assert_eq!(det.render_calls.load(Ordering::SeqCst), 0);
        assert!(!svc.snapshot_path().exists());
    }

    #[test]
    fn embeds_base64_jpeg_in_display_order() {
        let (svc, _, _dir) = service(MockDetector::empty().rendering_bgr());
        let opts = AnnotationOptions { embed: true, persist: false };
        let resp = svc.detect(&red_image(), 0.25, opts).unwrap();

        let jpeg = BASE64_STANDARD.decode(resp.annotated_image.unwrap()).unwrap();
        let decoded = image::load_from_memory(&jpeg).unwrap().to_rgb8();
        let Rgb([r, _, b]) = *decoded.get_pixel(10, 10);
        // Red input rendered as BGR must come back blue-dominant after the swap.
        assert!(b > 200 && r < 60, "got r={r} b={b}");
        assert!(!svc.snapshot_path().exists());
    }

    #[test]
    fn persists_and_overwrites_snapshot() {
        let (svc, _, _dir) = service(MockDetector::empty());
        let opts = AnnotationOptions { embed: false, persist: true };

        let resp = svc.detect(&red_image(), 0.25, opts).unwrap();
        assert_eq!(resp.annotated_image, None);
        assert!(svc.snapshot_path().is_file());

        let bigger = image::RgbImage::from_pixel(128, 96, Rgb([0, 255, 0]));
        svc.detect(&bigger, 0.25, opts).unwrap();
        let saved = image::open(svc.snapshot_path()).unwrap();
        assert_eq!((saved.width(), saved.height()), (128, 96));
    }

    #[test]
    fn both_annotation_forms_at_once() {
        let (svc, det, _dir) = service(MockDetector::empty());
        let opts = AnnotationOptions { embed: true, persist: true };
        let resp = svc.detect(&red_image(), 0.25, opts).unwrap();

        assert!(resp.annotated_image.is_some());
        assert!(svc.snapshot_path().is_file());
        assert_eq!(det.render_calls.load(Ordering::SeqCst), 1);
    }
}
