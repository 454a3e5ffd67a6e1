use ab_glyph::{FontVec, PxScale};
use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use std::path::Path;

use crate::domain::model::{ClassNames, RawDetections};

const LABEL_FONT_SIZE: f32 = 18.0;
const LABEL_TEXT_HEIGHT: i32 = 22;
const LABEL_CHAR_WIDTH: f32 = 10.0; // rough average glyph width
const LABEL_TEXT_VERTICAL_PADDING: i32 = 2;
const BOX_THICKNESS: i32 = 2;

const PALETTE: [[u8; 3]; 10] = [
    [255, 56, 56], [255, 157, 151], [255, 112, 31], [255, 178, 29], [207, 210, 49],
    [72, 249, 10], [26, 147, 52], [0, 212, 187], [44, 153, 168], [0, 194, 255],
];

/// Draws boxes and `label score` tags on a copy of the input.
///
/// Without a font only the boxes and the tag backgrounds are drawn.
pub struct Annotator {
    font: Option<FontVec>,
}

impl Annotator {
    pub fn new() -> Self {
        Self { font: None }
    }

    pub fn with_font_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path).with_context(|| format!("reading font {}", path.display()))?;
        let font = FontVec::try_from_vec(data)
            .map_err(|e| anyhow::anyhow!("invalid font {}: {e}", path.display()))?;
        Ok(Self { font: Some(font) })
    }

    pub fn class_color(class_id: usize) -> Rgb<u8> {
        Rgb(PALETTE[class_id % PALETTE.len()])
    }

    pub fn draw(&self, image: &RgbImage, raw: &RawDetections, names: &ClassNames) -> RgbImage {
        let mut canvas = image.clone();
        let (w, h) = (canvas.width() as i32, canvas.height() as i32);
        if w == 0 || h == 0 {
            return canvas;
        }

        for inst in &raw.instances {
            let color = Self::class_color(inst.class_id);
            let x1 = (inst.xyxy[0] as i32).clamp(0, w - 1);
            let y1 = (inst.xyxy[1] as i32).clamp(0, h - 1);
            let x2 = (inst.xyxy[2] as i32).clamp(0, w - 1);
            let y2 = (inst.xyxy[3] as i32).clamp(0, h - 1);
            if x1 >= x2 || y1 >= y2 {
                continue;
            }

            for t in 0..BOX_THICKNESS {
                let bw = x2 - x1 - 2 * t;
                let bh = y2 - y1 - 2 * t;
                if bw <= 0 || bh <= 0 {
                    break;
                }
                let rect = Rect::at(x1 + t, y1 + t).of_size(bw as u32, bh as u32);
                draw_hollow_rect_mut(&mut canvas, rect, color);
            }

            let label = format!(
                "{} {:.2}",
                names.get(inst.class_id).unwrap_or("?"),
                inst.confidence
            );
            self.draw_tag(&mut canvas, x1, y1, &label, color);
        }
        canvas
    }

    fn draw_tag(&self, canvas: &mut RgbImage, x: i32, y: i32, label: &str, color: Rgb<u8>) {
        let w = canvas.width() as i32;
        let tag_y = (y - LABEL_TEXT_HEIGHT).max(0);
        let tag_w = ((label.len() as f32 * LABEL_CHAR_WIDTH) as i32).min(w - x);
        if tag_w <= 0 {
            return;
        }

        let rect = Rect::at(x, tag_y).of_size(tag_w as u32, LABEL_TEXT_HEIGHT as u32);
        draw_filled_rect_mut(canvas, rect, color);

        if let Some(font) = &self.font {
            draw_text_mut(
                canvas,
                Rgb([255, 255, 255]),
                x,
                tag_y + LABEL_TEXT_VERTICAL_PADDING,
                PxScale::from(LABEL_FONT_SIZE),
                font,
                label,
            );
        }
    }
}

impl Default for Annotator {
    fn default() -> Self {
        Self::new()
    }
}
