use async_trait::async_trait;
use image::RgbImage;

use crate::domain::{
    errors::DomainResult,
    model::{ClassNames, ModelId, RawDetections},
};

/// Byte order of the three channels in a rendered bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOrder {
    Rgb,
    Bgr,
}

/// An annotated bitmap as handed back by a detector.
#[derive(Debug, Clone)]
pub struct RenderedFrame {
    pub pixels: RgbImage,
    pub order: ChannelOrder,
}

/// A pretrained detector. Calls are blocking and may be slow; callers run
/// them on the inference pool, never on the async executor.
pub trait DetectorPort: Send + Sync {
    /// Runs the model on one image. Instances scoring below `conf_threshold`
    /// must already be excluded from the result.
    fn infer(&self, image: &RgbImage, conf_threshold: f32) -> DomainResult<RawDetections>;

    fn class_names(&self) -> &ClassNames;

    /// Draws `raw` on top of `image`.
    fn render(&self, image: &RgbImage, raw: &RawDetections) -> DomainResult<RenderedFrame>;
}

#[async_trait]
pub trait ModelCatalogPort: Send + Sync {
    async fn validate_model(&self, model: &ModelId) -> DomainResult<()>;
}
