use async_trait::async_trait;
use std::path::Path;

use crate::application::ports::ModelCatalogPort;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::model::ModelId;

pub struct OnnxModelCatalog;

impl OnnxModelCatalog {
    pub fn new() -> Self { Self }
}

#[async_trait]
impl ModelCatalogPort for OnnxModelCatalog {
    async fn validate_model(&self, model: &ModelId) -> DomainResult<()> {
        if model.onnx_path.trim().is_empty() {
            return Err(DomainError::InvalidInput("onnx_path empty".into()));
        }
        let path = Path::new(&model.onnx_path);
        if path.extension().map_or(true, |ext| !ext.eq_ignore_ascii_case("onnx")) {
            return Err(DomainError::InvalidInput(format!("not an .onnx file: {}", model.onnx_path)));
        }
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Err(DomainError::NotFound(format!("model file not found: {}", model.onnx_path)));
        }
        Ok(())
    }
}
