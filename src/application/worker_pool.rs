use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, warn};

use crate::{
    application::{
        imaging::decode_upload,
        services::{AnnotationOptions, DetectionService},
    },
    domain::{
        detection::DetectionResponse,
        errors::{DomainError, DomainResult},
    },
};

/// Runs decode + detection on tokio's blocking threads, at most `workers`
/// jobs at a time. Extra requests wait for a permit; there is no timeout.
#[derive(Clone)]
pub struct InferencePool {
    service: Arc<DetectionService>,
    permits: Arc<Semaphore>,
    workers: usize,
}

impl InferencePool {
    pub fn new(service: Arc<DetectionService>, workers: usize) -> Self {
        let workers = if workers == 0 {
            warn!("inference pool needs at least one worker, using 1");
            1
        } else {
            workers
        };
        Self {
            service,
            permits: Arc::new(Semaphore::new(workers)),
            workers,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Once a job has its permit it runs to completion, even if the caller
    /// stops waiting for it.
    pub async fn submit(
        &self,
        image_bytes: Vec<u8>,
        confidence_threshold: f32,
        options: AnnotationOptions,
    ) -> DomainResult<DetectionResponse> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| DomainError::OperationFailed("inference pool closed".into()))?;

        let service = self.service.clone();
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let image = decode_upload(&image_bytes)?;
            service.detect(&image, confidence_threshold, options)
        })
        .await
        .map_err(|e| {
            error!("inference worker failed: {e}");
            DomainError::OperationFailed(format!("inference worker failed: {e}"))
        })?
    }
}
