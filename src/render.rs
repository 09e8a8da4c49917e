use image::{Rgb, RgbImage, Rgba, RgbaImage};
use imageproc::drawing::{Canvas, draw_hollow_rect_mut};
use imageproc::rect::Rect;

use crate::models::BoundingBox;

pub const CONFIRMED_RGBA: Rgba<u8> = Rgba([0, 255, 0, 255]);
pub const IN_PROGRESS_RGBA: Rgba<u8> = Rgba([255, 0, 0, 255]);
pub const DETECTION_RGB: Rgb<u8> = Rgb([0, 255, 0]);

/// Outline `bbox` with a 2px border, clipped by the canvas.
pub fn draw_box<C: Canvas>(canvas: &mut C, bbox: &BoundingBox, color: C::Pixel)
where
    C::Pixel: Copy,
{
    if bbox.is_empty() {
        return;
    }
    draw_hollow_rect_mut(
        canvas,
        Rect::at(bbox.x as i32, bbox.y as i32).of_size(bbox.width, bbox.height),
        color,
    );
    if bbox.width > 2 && bbox.height > 2 {
        draw_hollow_rect_mut(
            canvas,
            Rect::at(bbox.x as i32 + 1, bbox.y as i32 + 1).of_size(bbox.width - 2, bbox.height - 2),
            color,
        );
    }
}

pub fn draw_boxes<C: Canvas>(canvas: &mut C, boxes: &[BoundingBox], color: C::Pixel)
where
    C::Pixel: Copy,
{
    for bbox in boxes {
        draw_box(canvas, bbox, color);
    }
}

/// Copy of `image` with the detections outlined.
pub fn annotate_detections(image: &RgbImage, boxes: &[BoundingBox]) -> RgbImage {
    let mut out = image.clone();
    draw_boxes(&mut out, boxes, DETECTION_RGB);
    out
}

/// Working canvas for the annotator: confirmed boxes in green plus the box
/// being dragged in red.
pub fn annotation_canvas(
    original: &RgbaImage,
    boxes: &[BoundingBox],
    in_progress: Option<BoundingBox>,
) -> RgbaImage {
    let mut canvas = original.clone();
    draw_boxes(&mut canvas, boxes, CONFIRMED_RGBA);
    if let Some(bbox) = in_progress {
        draw_box(&mut canvas, &bbox, IN_PROGRESS_RGBA);
    }
    canvas
}
