use anyhow::{anyhow, Result};
use image::{imageops::FilterType, RgbImage};
use ndarray::{Array4, ArrayViewD, Axis, Ix2, IxDyn};
use ort::execution_providers::CUDAExecutionProvider;
use ort::session::Session;
use ort::value::Value;
use std::fs;
use std::sync::Mutex;
use tracing::{debug, info};

use crate::adapters::onnx::postprocess::{decode_candidates, non_max_suppression};
use crate::adapters::render::annotator::Annotator;
use crate::application::ports::{ChannelOrder, DetectorPort, RenderedFrame};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::model::{ClassNames, ModelId, RawDetections, YoloParams};

/// YOLOv8 / YOLO11 detector running on ONNX Runtime.
///
/// `Session::run` needs `&mut`, so the session sits behind a mutex and
/// inference calls are serialized.
pub struct OnnxYoloEngine {
    session: Mutex<Session>,
    params: YoloParams,
    names: ClassNames,
    annotator: Annotator,
}

impl OnnxYoloEngine {
    pub fn load(
        model: &ModelId,
        params: YoloParams,
        names: ClassNames,
        annotator: Annotator,
        intra_threads: usize,
    ) -> Result<Self> {
        let mut builder = Session::builder()?.with_intra_threads(intra_threads)?;

        // CUDA is optional: registered when available, otherwise we stay on CPU.
        let cuda = CUDAExecutionProvider::default().build();
        if let Ok(builder_with_cuda) = builder.clone().with_execution_providers([cuda]) {
            builder = builder_with_cuda;
        }

        let model_bytes = fs::read(&model.onnx_path)?;
        let session = builder.commit_from_memory(&model_bytes)?;
        info!(
            model = %model.name,
            classes = names.len(),
            input_size = params.input_size,
            "ONNX model loaded"
        );

        Ok(Self {
            session: Mutex::new(session),
            params,
            names,
            annotator,
        })
    }

    fn run(&self, rgb: &RgbImage, conf_threshold: f32) -> Result<RawDetections> {
        let imgsz = self.params.input_size as usize;
        let resized = image::imageops::resize(rgb, imgsz as u32, imgsz as u32, FilterType::Triangle);

        let mut input = Array4::<f32>::zeros((1, 3, imgsz, imgsz));
        for (x, y, pixel) in resized.enumerate_pixels() {
            input[[0, 0, y as usize, x as usize]] = pixel[0] as f32 / 255.0;
            input[[0, 1, y as usize, x as usize]] = pixel[1] as f32 / 255.0;
            input[[0, 2, y as usize, x as usize]] = pixel[2] as f32 / 255.0;
        }

        let input_shape = vec![1, 3, imgsz as i64, imgsz as i64];
        let input_tensor = Value::from_array((input_shape, input.into_raw_vec_and_offset().0))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow!("ONNX session lock poisoned"))?;
        let outputs = session.run(ort::inputs![input_tensor])?;
        let (shape_out, data_out) = outputs[0].try_extract_tensor::<f32>()?;

        let dims: Vec<usize> = shape_out.iter().map(|&x| x as usize).collect();
        if dims.len() != 3 {
            return Err(anyhow!("unexpected output shape {dims:?}, expected [1, 4 + classes, N]"));
        }
        let array_view = ArrayViewD::from_shape(IxDyn(&dims), data_out)?;
        let view = array_view.index_axis(Axis(0), 0).into_dimensionality::<Ix2>()?;

        let sx = rgb.width() as f32 / imgsz as f32;
        let sy = rgb.height() as f32 / imgsz as f32;
        let candidates = decode_candidates(view, conf_threshold, (sx, sy), rgb.dimensions());
        let kept = non_max_suppression(candidates, &self.params);
        debug!(kept = kept.len(), "inference done");

        Ok(RawDetections { instances: kept })
    }
}

impl DetectorPort for OnnxYoloEngine {
    fn infer(&self, image: &RgbImage, conf_threshold: f32) -> DomainResult<RawDetections> {
        self.run(image, conf_threshold)
            .map_err(|e| DomainError::Inference(format!("{e:#}")))
    }

    fn class_names(&self) -> &ClassNames {
        &self.names
    }

    fn render(&self, image: &RgbImage, raw: &RawDetections) -> DomainResult<RenderedFrame> {
        Ok(RenderedFrame {
            pixels: self.annotator.draw(image, raw, &self.names),
            order: ChannelOrder::Rgb,
        })
    }
}
