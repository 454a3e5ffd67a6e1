//! In-memory detector used by the unit tests of every layer.

use image::{Rgb, RgbImage};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::application::ports::{ChannelOrder, DetectorPort, RenderedFrame};
use crate::domain::{
    errors::{DomainError, DomainResult},
    model::{ClassNames, RawDetections, RawInstance},
};

pub struct MockDetector {
    names: ClassNames,
    raw: RawDetections,
    render_order: ChannelOrder,
    fail_with: Option<String>,
    delay: Option<Duration>,
    pub thresholds: Mutex<Vec<f32>>,
    pub render_calls: AtomicUsize,
    running: AtomicUsize,
    pub max_running: AtomicUsize,
}

impl MockDetector {
    pub fn new(instances: Vec<RawInstance>) -> Self {
        Self {
            names: ClassNames::new(vec!["person".into(), "car".into(), "dog".into()]),
            raw: RawDetections { instances },
            render_order: ChannelOrder::Rgb,
            fail_with: None,
            delay: None,
            thresholds: Mutex::new(Vec::new()),
            render_calls: AtomicUsize::new(0),
            running: AtomicUsize::new(0),
            max_running: AtomicUsize::new(0),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn rendering_bgr(mut self) -> Self {
        self.render_order = ChannelOrder::Bgr;
        self
    }

    pub fn failing(mut self, msg: &str) -> Self {
        self.fail_with = Some(msg.to_string());
        self
    }

    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn last_threshold(&self) -> Option<f32> {
        self.thresholds.lock().unwrap().last().copied()
    }
}

pub fn instance(xyxy: [f32; 4], confidence: f32, class_id: usize) -> RawInstance {
    RawInstance { xyxy, confidence, class_id }
}

/// A solid red test picture.
pub fn red_image() -> RgbImage {
    RgbImage::from_pixel(64, 48, Rgb([255, 0, 0]))
}

pub fn red_jpeg() -> Vec<u8> {
    crate::application::imaging::encode_jpeg(&red_image(), 90).unwrap()
}

impl DetectorPort for MockDetector {
    fn infer(&self, _image: &RgbImage, conf_threshold: f32) -> DomainResult<RawDetections> {
        self.thresholds.lock().unwrap().push(conf_threshold);

        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_running.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        self.running.fetch_sub(1, Ordering::SeqCst);

        match &self.fail_with {
            Some(msg) => Err(DomainError::Inference(msg.clone())),
            None => Ok(self.raw.clone()),
        }
    }

    fn class_names(&self) -> &ClassNames {
        &self.names
    }

    fn render(&self, image: &RgbImage, _raw: &RawDetections) -> DomainResult<RenderedFrame> {
        self.render_calls.fetch_add(1, Ordering::SeqCst);
        Ok(RenderedFrame {
            pixels: image.clone(),
            order: self.render_order,
        })
    }
}
