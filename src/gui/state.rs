use iced::Point;

use crate::annotation::PointerPos;

/// Last pointer position over the image, in image pixels.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointerTracker {
    pos: Option<PointerPos>,
}

impl PointerTracker {
    /// Record a widget-local position, clamped to `[0, width] x [0, height]`.
    pub fn update(&mut self, point: Point, width: u32, height: u32) -> PointerPos {
        let x = (point.x.max(0.0).round() as u32).min(width);
        let y = (point.y.max(0.0).round() as u32).min(height);
        let pos = PointerPos::new(x, y);
        self.pos = Some(pos);
        pos
    }

    pub fn current(&self) -> Option<PointerPos> {
        self.pos
    }

    pub fn reset(&mut self) {
        self.pos = None;
    }
}
