use image::{DynamicImage, GenericImageView, RgbaImage};
use tracing::{info, warn};

use crate::error::PipelineError;
use crate::models::{Annotation, BoundingBox};
use crate::render;

/// Pointer position in image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerPos {
    pub x: u32,
    pub y: u32,
}

impl PointerPos {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// Press-drag-release gesture state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragState {
    Idle,
    Dragging { origin: PointerPos, cursor: PointerPos },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Editing,
    Confirmed,
    Skipped,
}

/// How a session over one image ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Operator confirmed; `annotation` is `None` when every box was dropped.
    Confirmed {
        annotation: Option<Annotation>,
        dropped: Vec<BoundingBox>,
    },
    Skipped { image_path: String },
}

/// Everything the annotator knows about the image being edited.
pub struct AnnotationSession {
    image_path: String,
    original: RgbaImage,
    canvas: RgbaImage,
    width: u32,
    height: u32,
    boxes: Vec<BoundingBox>,
    drag: DragState,
    state: SessionState,
}

impl std::fmt::Debug for AnnotationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnnotationSession")
            .field("image_path", &self.image_path)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("boxes", &self.boxes)
            .field("drag", &self.drag)
            .field("state", &self.state)
            .finish()
    }
}

impl AnnotationSession {
    pub fn new(image_path: impl Into<String>, image: &DynamicImage) -> Self {
        let (width, height) = image.dimensions();
        let original = image.to_rgba8();
        Self {
            image_path: image_path.into(),
            canvas: original.clone(),
            original,
            width,
            height,
            boxes: Vec::new(),
            drag: DragState::Idle,
            state: SessionState::Editing,
        }
    }

    pub fn image_path(&self) -> &str {
        &self.image_path
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn boxes(&self) -> &[BoundingBox] {
        &self.boxes
    }

    pub fn drag(&self) -> DragState {
        self.drag
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_editing(&self) -> bool {
        self.state == SessionState::Editing
    }

    /// Original image with the current boxes drawn on top.
    pub fn canvas(&self) -> &RgbaImage {
        &self.canvas
    }

    /// Rectangle currently being dragged, if it has any area yet.
    pub fn pending_box(&self) -> Option<BoundingBox> {
        match self.drag {
            DragState::Dragging { origin, cursor } => {
                BoundingBox::from_corners((origin.x, origin.y), (cursor.x, cursor.y))
            }
            DragState::Idle => None,
        }
    }

    pub fn pointer_pressed(&mut self, pos: PointerPos) {
        if !self.is_editing() {
            return;
        }
        self.drag = DragState::Dragging {
            origin: pos,
            cursor: pos,
        };
    }

    pub fn pointer_moved(&mut self, pos: PointerPos) {
        if !self.is_editing() {
            return;
        }
        if let DragState::Dragging { origin, .. } = self.drag {
            self.drag = DragState::Dragging {
                origin,
                cursor: pos,
            };
            self.redraw();
        }
    }

    /// Finish the gesture. Returns the new box when it has positive area.
    pub fn pointer_released(&mut self, pos: PointerPos) -> Option<BoundingBox> {
        if !self.is_editing() {
            return None;
        }
        let DragState::Dragging { origin, .. } = self.drag else {
            return None;
        };
        self.drag = DragState::Idle;

        let added = BoundingBox::from_corners((origin.x, origin.y), (pos.x, pos.y));
        if let Some(bbox) = added {
            self.boxes.push(bbox);
        }
        self.redraw();
        added
    }

    /// Remove the most recently added box.
    pub fn undo(&mut self) -> Option<BoundingBox> {
        if !self.is_editing() {
            return None;
        }
        let removed = self.boxes.pop();
        if let Some(bbox) = &removed {
            info!("Removed box {}", bbox);
            self.redraw();
        }
        removed
    }

    /// End the session keeping the boxes that fit inside the image.
    ///
    /// Ignored (returns `None`) while no box has been drawn.
    pub fn confirm(&mut self) -> Option<SessionOutcome> {
        if !self.is_editing() || self.boxes.is_empty() {
            return None;
        }
        self.drag = DragState::Idle;
        self.state = SessionState::Confirmed;

        let (kept, dropped): (Vec<BoundingBox>, Vec<BoundingBox>) = self
            .boxes
            .iter()
            .copied()
            .partition(|b| b.fits_within(self.width, self.height));

        for bbox in &dropped {
            let reason = PipelineError::OutOfBoundsBox {
                bbox: *bbox,
                width: self.width,
                height: self.height,
            };
            warn!("Dropping box on {}: {}", self.image_path, reason);
        }

        let annotation = if kept.is_empty() {
            None
        } else {
            info!("{} object(s) annotated in {}", kept.len(), self.image_path);
            Some(Annotation::new(self.image_path.clone(), kept))
        };

        Some(SessionOutcome::Confirmed {
            annotation,
            dropped,
        })
    }

    /// End the session without writing anything.
    pub fn skip(&mut self) -> Option<SessionOutcome> {
        if !self.is_editing() {
            return None;
        }
        self.drag = DragState::Idle;
        self.state = SessionState::Skipped;
        info!("Skipped {}", self.image_path);
        Some(SessionOutcome::Skipped {
            image_path: self.image_path.clone(),
        })
    }

    fn redraw(&mut self) {
        self.canvas = render::annotation_canvas(&self.original, &self.boxes, self.pending_box());
    }
}
