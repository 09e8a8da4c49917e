use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Axis-aligned box in pixel units, `(x, y)` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Build a box from two opposite corners, in either drag direction.
    /// Returns `None` for degenerate (zero width or height) rectangles.
    pub fn from_corners(a: (u32, u32), b: (u32, u32)) -> Option<Self> {
        let x = a.0.min(b.0);
        let y = a.1.min(b.1);
        let width = a.0.abs_diff(b.0);
        let height = a.1.abs_diff(b.1);
        if width == 0 || height == 0 {
            return None;
        }
        Some(Self { x, y, width, height })
    }

    pub fn right(&self) -> u64 {
        self.x as u64 + self.width as u64
    }

    pub fn bottom(&self) -> u64 {
        self.y as u64 + self.height as u64
    }

    /// Get center coordinates
    pub fn center(&self) -> (i64, i64) {
        (
            self.x as i64 + (self.width / 2) as i64,
            self.y as i64 + (self.height / 2) as i64,
        )
    }

    /// True when the box lies inside a `width` x `height` image.
    /// Touching the right or bottom edge is allowed.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.right() <= width as u64 && self.bottom() <= height as u64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}, {})", self.x, self.y, self.width, self.height)
    }
}

/// Boxes recorded for one positive image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub image_path: String,
    pub boxes: Vec<BoundingBox>,
}

impl Annotation {
    pub fn new(image_path: impl Into<String>, boxes: Vec<BoundingBox>) -> Self {
        Self {
            image_path: image_path.into(),
            boxes,
        }
    }

    /// Serialize as `<path> <count> <x> <y> <w> <h> ...`
    pub fn to_line(&self) -> String {
        let mut line = format!("{} {}", self.image_path, self.boxes.len());
        for b in &self.boxes {
            line.push_str(&format!(" {} {} {} {}", b.x, b.y, b.width, b.height));
        }
        line
    }

    /// Parse one line of the annotation file.
    ///
    /// The error string describes what is wrong with the line; callers wrap it
    /// with the line number.
    pub fn parse_line(line: &str) -> Result<Self, String> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < 6 || (tokens.len() - 2) % 4 != 0 {
            return Err(format!(
                "expected `<path> <count>` followed by groups of 4 integers, got {} tokens",
                tokens.len()
            ));
        }

        let count: usize = tokens[1]
            .parse()
            .map_err(|_| format!("invalid box count `{}`", tokens[1]))?;

        let mut values = Vec::with_capacity(tokens.len() - 2);
        for token in &tokens[2..] {
            let value: u32 = token
                .parse()
                .map_err(|_| format!("invalid coordinate `{}`", token))?;
            values.push(value);
        }

        let boxes: Vec<BoundingBox> = values
            .chunks_exact(4)
            .map(|c| BoundingBox::new(c[0], c[1], c[2], c[3]))
            .collect();

        if boxes.len() != count {
            return Err(format!(
                "declared {} box(es) but line holds {}",
                count,
                boxes.len()
            ));
        }
        if let Some(empty) = boxes.iter().find(|b| b.is_empty()) {
            return Err(format!("box {} has zero width or height", empty));
        }

        Ok(Self {
            image_path: tokens[0].to_string(),
            boxes,
        })
    }
}

/// One block of the detection report.
#[derive(Debug, Clone)]
pub struct ReportEntry {
    pub image_id: String,
    pub timestamp: Option<OffsetDateTime>,
    pub boxes: Vec<BoundingBox>,
}

impl ReportEntry {
    pub fn new(image_id: impl Into<String>, boxes: Vec<BoundingBox>) -> Self {
        Self {
            image_id: image_id.into(),
            timestamp: None,
            boxes,
        }
    }

    pub fn with_timestamp(mut self, timestamp: OffsetDateTime) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}
