use crate::models::BoundingBox;

/// Remembers where objects were already seen during a stream session.
///
/// A detection is novel when its center is more than `threshold` pixels away
/// from every recorded center along at least one axis.
#[derive(Debug, Clone)]
pub struct NoveltyFilter {
    threshold: u32,
    centers: Vec<(i64, i64)>,
}

impl NoveltyFilter {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            centers: Vec::new(),
        }
    }

    pub fn is_novel(&self, bbox: &BoundingBox) -> bool {
        let (cx, cy) = bbox.center();
        let t = self.threshold as i64;
        self.centers
            .iter()
            .all(|&(x, y)| (cx - x).abs() > t || (cy - y).abs() > t)
    }

    /// Record `bbox` if it is novel. Returns whether it was.
    pub fn observe(&mut self, bbox: &BoundingBox) -> bool {
        if self.is_novel(bbox) {
            self.centers.push(bbox.center());
            true
        } else {
            false
        }
    }

    /// Number of distinct objects recorded so far.
    pub fn len(&self) -> usize {
        self.centers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centers.is_empty()
    }
}
