use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};
use tracing::info;

use crate::adapters::http::{error::ApiError, state::HttpState};
use crate::application::dto::{DetectForm, HealthResponse};
use crate::domain::detection::DetectionResponse;

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

/// `POST /detect`: multipart `image` plus optional `confidence_threshold`,
/// `save_annotated` and `return_annotated` text fields.
pub async fn detect(
    State(st): State<HttpState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<DetectionResponse>, ApiError> {
    let form = read_form(multipart?).await?;
    let req = form.into_request(&st.defaults)?;

    let bytes = req.image.len();
    let resp = st
        .pool
        .submit(req.image, req.confidence_threshold, req.annotation)
        .await?;

    info!(
        bytes,
        threshold = req.confidence_threshold,
        detections = resp.detections.len(),
        "detect request served"
    );
    Ok(Json(resp))
}

async fn read_form(mut multipart: Multipart) -> Result<DetectForm, ApiError> {
    let mut form = DetectForm::default();

    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("image") => form.image = Some(field.bytes().await?.to_vec()),
            Some("confidence_threshold") => form.confidence_threshold = Some(field.text().await?),
            Some("save_annotated") => form.save_annotated = Some(field.text().await?),
            Some("return_annotated") => form.return_annotated = Some(field.text().await?),
            _ => {}
        }
    }
    Ok(form)
}
