use crate::application::{dto::RequestDefaults, worker_pool::InferencePool};

/// Shared state for the axum handlers. Holds the use cases, not the adapters.
#[derive(Clone)]
pub struct HttpState {
    /// Bounded pool that runs decode + detection off the async executor.
    pub pool: InferencePool,
    /// Fallbacks for optional `/detect` form fields.
    pub defaults: RequestDefaults,
    /// Request body cap; larger uploads get `413`.
    pub max_upload_bytes: usize,
}
