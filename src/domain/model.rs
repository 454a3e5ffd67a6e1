#[derive(Debug, Clone)]
pub struct ModelId {
    pub name: String,       // logical name, e.g. "yolov8n"
    pub onnx_path: String,  // filesystem path
}

impl ModelId {
    /// Derives the logical name from the file stem of `onnx_path`.
    pub fn from_path(onnx_path: &str) -> Self {
        let name = std::path::Path::new(onnx_path)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "yolo".to_string());
        Self {
            name,
            onnx_path: onnx_path.to_string(),
        }
    }
}

/// Engine-side parameters. The confidence threshold is not here: it travels
/// with each request.
#[derive(Debug, Clone)]
pub struct YoloParams {
    pub input_size: u32,        // 640 typical
    pub iou_threshold: f32,     // 0..1
    pub max_detections: usize,  // e.g. 300
}

impl Default for YoloParams {
    fn default() -> Self {
        Self {
            input_size: 640,
            iou_threshold: 0.45,
            max_detections: 300,
        }
    }
}

/// One instance as the detector reports it, before normalization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawInstance {
    pub xyxy: [f32; 4],
    pub confidence: f32,
    pub class_id: usize,
}

/// The detector's result bundle for a single image.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawDetections {
    pub instances: Vec<RawInstance>,
}

/// Class index -> display name table.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassNames(Vec<String>);

const COCO_CLASSES: [&str; 80] = [
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat", "dog",
    "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack", "umbrella",
    "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball", "kite",
    "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket", "bottle",
    "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich",
    "orange", "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch",
    "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse", "remote",
    "keyboard", "cell phone", "microwave", "oven", "toaster", "sink", "refrigerator", "book",
    "clock", "vase", "scissors", "teddy bear", "hair drier", "toothbrush",
];

impl ClassNames {
    pub fn new(names: Vec<String>) -> Self {
        Self(names)
    }

    /// The 80 COCO classes used by the stock YOLO checkpoints.
    pub fn coco() -> Self {
        Self(COCO_CLASSES.iter().map(|s| s.to_string()).collect())
    }

    /// One name per line; blank lines are skipped.
    pub fn from_lines(text: &str) -> Self {
        Self::new(
            text.lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn get(&self, class_id: usize) -> Option<&str> {
        self.0.get(class_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
