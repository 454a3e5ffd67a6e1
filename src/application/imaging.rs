use base64::{prelude::BASE64_STANDARD, Engine};
use image::{codecs::jpeg::JpegEncoder, ExtendedColorType, RgbImage};

use crate::application::ports::{ChannelOrder, RenderedFrame};
use crate::domain::errors::{DomainError, DomainResult};

pub const JPEG_QUALITY: u8 = 85;

/// Decodes an uploaded file (any format the `image` crate knows) to RGB8.
pub fn decode_upload(bytes: &[u8]) -> DomainResult<RgbImage> {
    let img = image::load_from_memory(bytes).map_err(|e| DomainError::Decode(e.to_string()))?;
    Ok(img.to_rgb8())
}

/// Returns the frame in RGB order, swapping channels if it came in as BGR.
pub fn to_display_order(frame: RenderedFrame) -> RgbImage {
    match frame.order {
        ChannelOrder::Rgb => frame.pixels,
        ChannelOrder::Bgr => {
            let mut pixels = frame.pixels;
            for px in pixels.pixels_mut() {
                px.0.swap(0, 2);
            }
            pixels
        }
    }
}

pub fn encode_jpeg(rgb: &RgbImage, quality: u8) -> DomainResult<Vec<u8>> {
    let mut jpeg = Vec::new();
    let mut enc = JpegEncoder::new_with_quality(&mut jpeg, quality);
    enc.encode(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
        .map_err(|e| DomainError::OperationFailed(format!("jpeg encode: {e}")))?;
    Ok(jpeg)
}

pub fn to_base64(bytes: &[u8]) -> String {
    BASE64_STANDARD.encode(bytes)
}
