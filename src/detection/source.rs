use std::io::Write;
use std::path::{Path, PathBuf};

use image::DynamicImage;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::dataset::{self, open_image};
use crate::error::PipelineError;

/// Where a single image to test comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageInput {
    Path(PathBuf),
    Url(String),
}

impl ImageInput {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let lower = raw.to_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            ImageInput::Url(raw.to_string())
        } else {
            ImageInput::Path(PathBuf::from(raw))
        }
    }

    /// Name used in reports and output file names.
    pub fn name(&self) -> String {
        match self {
            ImageInput::Path(path) => dataset::display_name(path),
            ImageInput::Url(url) => url_file_name(url),
        }
    }

    /// Load the image, downloading it first for URLs.
    ///
    /// A downloaded image lives in a temporary file owned by the returned
    /// value; it is removed when that value is dropped, whatever happens.
    pub fn load(&self) -> anyhow::Result<LoadedImage> {
        match self {
            ImageInput::Path(path) => Ok(LoadedImage {
                name: self.name(),
                image: open_image(path)?,
                download: None,
            }),
            ImageInput::Url(url) => {
                let download = fetch_to_temp(url)?;
                let image = open_image(download.path())?;
                Ok(LoadedImage {
                    name: self.name(),
                    image,
                    download: Some(download),
                })
            }
        }
    }
}

pub struct LoadedImage {
    pub name: String,
    pub image: DynamicImage,
    download: Option<NamedTempFile>,
}

impl LoadedImage {
    /// Temporary copy of a downloaded image; gone once this value is dropped.
    pub fn download_path(&self) -> Option<&Path> {
        self.download.as_ref().map(|f| f.path())
    }
}

fn url_file_name(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    without_query
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty() && !s.contains(':'))
        .unwrap_or("remote")
        .to_string()
}

fn url_suffix(url: &str) -> String {
    let name = url_file_name(url);
    match Path::new(&name).extension().and_then(|e| e.to_str()) {
        Some(ext) => format!(".{}", ext),
        None => ".img".to_string(),
    }
}

/// Download `url` into a temporary file.
pub fn fetch_to_temp(url: &str) -> anyhow::Result<NamedTempFile> {
    let failed = |reason: String| PipelineError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    debug!("Downloading {}", url);
    let response = ureq::get(url).call().map_err(|e| failed(e.to_string()))?;

    let mut file = tempfile::Builder::new()
        .prefix("cascadelab-")
        .suffix(&url_suffix(url))
        .tempfile()
        .map_err(|e| failed(e.to_string()))?;
    let mut reader = response.into_reader();
    std::io::copy(&mut reader, &mut file).map_err(|e| failed(e.to_string()))?;
    file.flush().map_err(|e| failed(e.to_string()))?;

    debug!("Downloaded {} to {}", url, file.path().display());
    Ok(file)
}
