use clap::Parser;
use std::path::PathBuf;

use crate::application::dto::RequestDefaults;
use crate::domain::model::YoloParams;

/// Object detection API: YOLO ONNX model behind `POST /detect`.
///
/// Every option can also come from the environment variable shown.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Bind address
    #[arg(long, env = "API_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Bind port
    #[arg(long, env = "API_PORT", default_value_t = 8000)]
    pub port: u16,

    /// ONNX model file (YOLOv8 / YOLO11 export)
    #[arg(long, env = "MODEL_PATH", default_value = "models/yolov8n.onnx", value_name = "FILE")]
    pub model_path: String,

    /// Class names, one per line. Defaults to the 80 COCO classes
    #[arg(long, env = "LABELS_PATH", value_name = "FILE")]
    pub labels_path: Option<PathBuf>,

    /// Where `last_annotated.jpg` is written
    #[arg(long, env = "OUTPUT_DIR", default_value = "output", value_name = "DIR")]
    pub output_dir: PathBuf,

    /// Threshold used when a request omits `confidence_threshold`
    #[arg(long, env = "CONFIDENCE_THRESHOLD_DEFAULT", default_value_t = 0.25, value_name = "THRESHOLD")]
    pub confidence_threshold_default: f32,

    /// Whether requests that omit `save_annotated` overwrite the snapshot
    #[arg(long, env = "SAVE_ANNOTATED_DEFAULT", default_value_t = true, action = clap::ArgAction::Set)]
    pub save_annotated_default: bool,

    /// NMS IoU threshold (0.0 - 1.0)
    #[arg(long, env = "IOU_THRESHOLD", default_value_t = 0.45, value_name = "THRESHOLD")]
    pub iou_threshold: f32,

    /// Square model input size in pixels
    #[arg(long, env = "INPUT_SIZE", default_value_t = 640)]
    pub input_size: u32,

    /// Upper bound on detections per image
    #[arg(long, env = "MAX_DETECTIONS", default_value_t = 300)]
    pub max_detections: usize,

    /// Concurrent inference jobs
    #[arg(long, env = "WORKERS", default_value_t = 2)]
    pub workers: usize,

    /// ONNX Runtime intra-op threads
    #[arg(long, env = "INTRA_THREADS", default_value_t = 4)]
    pub intra_threads: usize,

    /// TTF/OTF font for annotation labels; boxes only when unset
    #[arg(long, env = "FONT_PATH", value_name = "FILE")]
    pub font_path: Option<PathBuf>,

    /// Directory with the browser page
    #[arg(long, env = "STATIC_DIR", default_value = "static", value_name = "DIR")]
    pub static_dir: PathBuf,

    /// Maximum request body size in bytes
    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value_t = 20 * 1024 * 1024)]
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn yolo_params(&self) -> YoloParams {
        YoloParams {
            input_size: self.input_size,
            iou_threshold: self.iou_threshold,
            max_detections: self.max_detections,
        }
    }

    pub fn request_defaults(&self) -> RequestDefaults {
        RequestDefaults {
            confidence_threshold: self.confidence_threshold_default,
            save_annotated: self.save_annotated_default,
            return_annotated: false,
        }
    }
}
