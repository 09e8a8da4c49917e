use std::path::{Path, PathBuf};

use anyhow::Context;
use image::{DynamicImage, ImageReader};

use crate::error::PipelineError;

/// Extensions accepted as images, compared case-insensitively.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// List the image files directly inside `dir` (no recursion), ordered by
/// lower-cased file name so repeated scans agree.
pub fn list_images(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory {:?}", dir))?;

    let mut images = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("Failed to read entry in {:?}", dir))?;
        let path = entry.path();
        if path.is_file() && is_image_file(&path) {
            images.push(path);
        }
    }

    images.sort_by_key(|p| sort_key(p));
    Ok(images)
}

fn sort_key(path: &Path) -> (String, String) {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    (name.to_lowercase(), name)
}

/// Absolute form of `path` without resolving symlinks, using `/` separators.
pub fn absolute_slash_path(path: &Path) -> anyhow::Result<String> {
    let abs = std::path::absolute(path)
        .with_context(|| format!("Failed to make {:?} absolute", path))?;
    Ok(to_forward_slashes(&abs))
}

pub fn to_forward_slashes(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// File name used to label an image in logs and reports.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

/// Decode an image, sniffing the format from its contents.
pub fn open_image(path: &Path) -> anyhow::Result<DynamicImage> {
    let invalid = |reason: String| PipelineError::InvalidImage {
        path: path.to_path_buf(),
        reason,
    };
    let image = ImageReader::open(path)
        .map_err(|e| invalid(e.to_string()))?
        .with_guessed_format()
        .map_err(|e| invalid(e.to_string()))?
        .decode()
        .map_err(|e| invalid(e.to_string()))?;
    Ok(image)
}
