use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::error::PipelineError;
use crate::models::Annotation;

/// The positives file: one annotated image per line.
#[derive(Debug, Clone)]
pub struct AnnotationStore {
    path: PathBuf,
}

impl AnnotationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory holding the file; relative image paths resolve against it.
    pub fn dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    /// Truncate the file and return a writer for a fresh annotation run.
    pub fn create(&self) -> anyhow::Result<AnnotationWriter> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(&self.path)
            .with_context(|| format!("Failed to create annotation file {:?}", self.path))?;
        Ok(AnnotationWriter {
            out: BufWriter::new(file),
            written: 0,
        })
    }

    /// Replace the file contents with `annotations`, in order.
    pub fn write_all(&self, annotations: &[Annotation]) -> anyhow::Result<usize> {
        let mut writer = self.create()?;
        for annotation in annotations {
            writer.append(annotation)?;
        }
        Ok(writer.written())
    }

    pub fn load(&self) -> anyhow::Result<Vec<Annotation>> {
        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open annotation file {:?}", self.path))?;

        let mut annotations = Vec::new();
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let annotation = Annotation::parse_line(&line).map_err(|reason| {
                PipelineError::MalformedAnnotationLine {
                    line: idx + 1,
                    reason,
                }
            })?;
            annotations.push(annotation);
        }
        Ok(annotations)
    }

    /// Number of non-blank lines, i.e. annotated images.
    pub fn count_samples(&self) -> anyhow::Result<usize> {
        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open annotation file {:?}", self.path))?;
        let mut count = 0;
        for line in BufReader::new(file).lines() {
            if !line?.trim().is_empty() {
                count += 1;
            }
        }
        Ok(count)
    }
}

/// Line writer over a freshly truncated store.
pub struct AnnotationWriter {
    out: BufWriter<File>,
    written: usize,
}

impl AnnotationWriter {
    /// Write one annotation and flush so a crash keeps completed lines.
    pub fn append(&mut self, annotation: &Annotation) -> anyhow::Result<()> {
        writeln!(self.out, "{}", annotation.to_line())?;
        self.out.flush()?;
        self.written += 1;
        Ok(())
    }

    pub fn written(&self) -> usize {
        self.written
    }
}
