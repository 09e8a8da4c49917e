use std::path::PathBuf;

use tracing::{info, warn};

use crate::annotation::AnnotationSession;
use crate::dataset::{self, open_image};

/// Positive images still waiting to be annotated, in order.
#[derive(Debug, Clone)]
pub struct AnnotationQueue {
    images: Vec<PathBuf>,
    next: usize,
}

impl AnnotationQueue {
    pub fn new(images: Vec<PathBuf>) -> Self {
        Self { images, next: 0 }
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// 1-based position of the image most recently handed out.
    pub fn position(&self) -> usize {
        self.next
    }

    /// Open a session on the next readable image.
    ///
    /// Images that cannot be read are logged and skipped.
    pub fn next_session(&mut self) -> Option<AnnotationSession> {
        while self.next < self.images.len() {
            let path = self.images[self.next].clone();
            self.next += 1;

            let image = match open_image(&path) {
                Ok(image) => image,
                Err(e) => {
                    warn!("{:#}", e);
                    continue;
                }
            };
            let image_path = match dataset::absolute_slash_path(&path) {
                Ok(p) => p,
                Err(e) => {
                    warn!("Skipping {}: {:#}", path.display(), e);
                    continue;
                }
            };

            info!(
                "Mark the objects in {} ({}/{})",
                dataset::display_name(&path),
                self.next,
                self.images.len()
            );
            return Some(AnnotationSession::new(image_path, &image));
        }
        None
    }
}
