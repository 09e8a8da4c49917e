use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::info;

use crate::dataset;

/// Background image paths handed to the cascade trainer via `-bg`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NegativeManifest {
    pub paths: Vec<String>,
}

impl NegativeManifest {
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Write one path per line, replacing any previous manifest.
    pub fn write(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create negative manifest {:?}", path))?;
        let mut out = std::io::BufWriter::new(file);
        for p in &self.paths {
            writeln!(out, "{}", p)?;
        }
        out.flush()?;
        Ok(())
    }
}

/// Scans a directory of background images.
pub struct NegativeListBuilder {
    dir: PathBuf,
}

impl NegativeListBuilder {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn build(&self) -> anyhow::Result<NegativeManifest> {
        let images = dataset::list_images(&self.dir)?;
        let paths = images
            .iter()
            .map(|p| dataset::absolute_slash_path(p))
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(NegativeManifest { paths })
    }

    /// Build the manifest and write it to `out`.
    pub fn build_into(&self, out: &Path) -> anyhow::Result<NegativeManifest> {
        let manifest = self.build()?;
        manifest.write(out)?;
        info!(
            "Wrote {} negative image path(s) to {}",
            manifest.len(),
            out.display()
        );
        Ok(manifest)
    }
}
