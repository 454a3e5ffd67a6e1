use serde::Serialize;

use crate::application::services::AnnotationOptions;
use crate::domain::errors::{DomainError, DomainResult};

/// Values used when a `/detect` form omits an optional field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RequestDefaults {
    pub confidence_threshold: f32,
    pub save_annotated: bool,
    pub return_annotated: bool,
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.25,
            save_annotated: true,
            return_annotated: false,
        }
    }
}

/// A fully parsed `POST /detect` form.
#[derive(Debug, Clone)]
pub struct DetectRequest {
    pub image: Vec<u8>,
    pub confidence_threshold: f32,
    pub annotation: AnnotationOptions,
}

/// Raw multipart fields, collected before validation.
#[derive(Debug, Default)]
pub struct DetectForm {
    pub image: Option<Vec<u8>>,
    pub confidence_threshold: Option<String>,
    pub save_annotated: Option<String>,
    pub return_annotated: Option<String>,
}

impl DetectForm {
    pub fn into_request(self, defaults: &RequestDefaults) -> DomainResult<DetectRequest> {
        let image = self
            .image
            .ok_or_else(|| DomainError::InvalidInput("field required: image".into()))?;

        let confidence_threshold = match self.confidence_threshold {
            Some(raw) => parse_threshold(&raw)?,
            None => defaults.confidence_threshold,
        };
        let persist = match self.save_annotated {
            Some(raw) => parse_flag("save_annotated", &raw)?,
            None => defaults.save_annotated,
        };
        let embed = match self.return_annotated {
            Some(raw) => parse_flag("return_annotated", &raw)?,
            None => defaults.return_annotated,
        };

        Ok(DetectRequest {
            image,
            confidence_threshold,
            annotation: AnnotationOptions { embed, persist },
        })
    }
}

/// Accepts a float in `[0, 1]`.
pub fn parse_threshold(raw: &str) -> DomainResult<f32> {
    let value: f32 = raw.trim().parse().map_err(|_| {
        DomainError::InvalidInput(format!("confidence_threshold is not a number: {raw:?}"))
    })?;
    if !(0.0..=1.0).contains(&value) {
        return Err(DomainError::InvalidInput(format!(
            "confidence_threshold must be within [0, 1], got {value}"
        )));
    }
    Ok(value)
}

/// Form-style booleans: true/false, 1/0, yes/no, on/off.
pub fn parse_flag(field: &str, raw: &str) -> DomainResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(DomainError::InvalidInput(format!("{field} is not a boolean: {raw:?}"))),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self { status: "ok".into() }
    }
}
