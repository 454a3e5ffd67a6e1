mod domain;
mod application;
mod adapters;
mod config;

use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tower_http::services::ServeDir;

use crate::adapters::{
    http::{router, state::HttpState},
    onnx::{model_catalog::OnnxModelCatalog, yolo_engine::OnnxYoloEngine},
    render::annotator::Annotator,
};
use crate::application::{
    ports::{DetectorPort, ModelCatalogPort},
    services::DetectionService,
    worker_pool::InferencePool,
};
use crate::config::Config;
use crate::domain::model::{ClassNames, ModelId};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Logging (RUST_LOG=info unless set)
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    let cfg = Config::parse();
    anyhow::ensure!(
        (0.0..=1.0).contains(&cfg.confidence_threshold_default),
        "CONFIDENCE_THRESHOLD_DEFAULT must be within [0, 1], got {}",
        cfg.confidence_threshold_default
    );

    // 2. Adapters
    let model = ModelId::from_path(&cfg.model_path);
    OnnxModelCatalog::new().validate_model(&model).await?;

    let names = match &cfg.labels_path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading labels {}", path.display()))?;
            ClassNames::from_lines(&text)
        }
        None => ClassNames::coco(),
    };
    anyhow::ensure!(!names.is_empty(), "class name table is empty");

    let annotator = match &cfg.font_path {
        Some(path) => Annotator::with_font_file(path)?,
        None => {
            tracing::warn!("no FONT_PATH set, annotated images will carry boxes without label text");
            Annotator::new()
        }
    };

    tracing::info!(model = %model.onnx_path, "loading detector");
    let engine = OnnxYoloEngine::load(&model, cfg.yolo_params(), names, annotator, cfg.intra_threads)?;
    let detector: Arc<dyn DetectorPort> = Arc::new(engine);

    // 3. Use cases
    let service = Arc::new(DetectionService::new(detector, &cfg.output_dir)?);
    let output_dir = service.output_dir().display().to_string();
    let pool = InferencePool::new(service, cfg.workers);
    tracing::info!(
        workers = pool.workers(),
        output_dir = %output_dir,
        "inference pool ready"
    );

    // 4. HTTP
    let state = HttpState {
        pool,
        defaults: cfg.request_defaults(),
        max_upload_bytes: cfg.max_upload_bytes,
    };
    let app = router(state)
        .fallback_service(ServeDir::new(&cfg.static_dir));

    // 5. Serve
    let addr = cfg.bind_addr();
    tracing::info!("detection API listening on http://{}", addr);
    tracing::info!("static files served from {}", cfg.static_dir.display());

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;

    Ok(())
}
