use crate::detection::{BoundingBox, Detection, RgbImage};
use crate::prelude::{PipelineError, PipelineResult};
use image::{ImageFormat, Rgb};
use std::io::Cursor;

const TARGET_COLOUR: Rgb<u8> = Rgb([255, 48, 0]);
const OTHER_COLOUR: Rgb<u8> = Rgb([0, 160, 255]);
const STROKE: u32 = 2;

/// Copy of `frame` with every boxed detection outlined; the monitored class
/// gets its own colour.
pub fn annotate(frame: &RgbImage, detections: &[Detection], target_class: u32) -> RgbImage {
    let mut canvas = frame.clone();
    for detection in detections {
        if let Some(bbox) = detection.bbox {
            let colour = if detection.class_id == target_class {
                TARGET_COLOUR
            } else {
                OTHER_COLOUR
            };
            draw_box(&mut canvas, bbox, colour);
        }
    }
    canvas
}

pub fn encode_jpeg(image: &RgbImage) -> PipelineResult<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Jpeg)
        .map_err(|err| PipelineError::AnnotationFailed(err.to_string()))?;
    Ok(buffer.into_inner())
}

fn draw_box(canvas: &mut RgbImage, bbox: BoundingBox, colour: Rgb<u8>) {
    let (width, height) = canvas.dimensions();
    if width == 0 || height == 0 {
        return;
    }
    let clamp = |value: f32, limit: u32| (value.max(0.0) as u32).min(limit - 1);
    let x1 = clamp(bbox.x1.min(bbox.x2), width);
    let x2 = clamp(bbox.x1.max(bbox.x2), width);
    let y1 = clamp(bbox.y1.min(bbox.y2), height);
    let y2 = clamp(bbox.y1.max(bbox.y2), height);

    for offset in 0..STROKE {
        let top = (y1 + offset).min(y2);
        let bottom = y2.saturating_sub(offset).max(y1);
        for x in x1..=x2 {
            canvas.put_pixel(x, top, colour);
            canvas.put_pixel(x, bottom, colour);
        }
        let left = (x1 + offset).min(x2);
        let right = x2.saturating_sub(offset).max(x1);
        for y in y1..=y2 {
            canvas.put_pixel(left, y, colour);
            canvas.put_pixel(right, y, colour);
        }
    }
}
