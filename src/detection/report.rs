use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use time::OffsetDateTime;
use time::macros::format_description;

use crate::models::ReportEntry;

/// Append-only text log of detections.
pub struct DetectionReport {
    path: PathBuf,
    out: BufWriter<File>,
}

impl std::fmt::Debug for DetectionReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectionReport")
            .field("path", &self.path)
            .finish()
    }
}

impl DetectionReport {
    /// Open `path` for appending, creating it and its parent directory.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open report {:?}", path))?;
        Ok(Self {
            path: path.to_path_buf(),
            out: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&mut self, entry: &ReportEntry) -> anyhow::Result<()> {
        self.out.write_all(format_entry(entry)?.as_bytes())?;
        self.out.flush()?;
        Ok(())
    }
}

pub fn format_timestamp(ts: &OffsetDateTime) -> anyhow::Result<String> {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    Ok(ts.format(format)?)
}

/// Render one report block, including the trailing blank line.
pub fn format_entry(entry: &ReportEntry) -> anyhow::Result<String> {
    let mut block = format!("Imagem: {}\n", entry.image_id);
    if let Some(ts) = &entry.timestamp {
        block.push_str(&format!("Horário: {}\n", format_timestamp(ts)?));
    }
    block.push_str(&format!("Total detectado(s): {}\n", entry.boxes.len()));
    for (i, b) in entry.boxes.iter().enumerate() {
        block.push_str(&format!(
            "  [{}] x={} y={} w={} h={}\n",
            i + 1,
            b.x,
            b.y,
            b.width,
            b.height
        ));
    }
    block.push('\n');
    Ok(block)
}

/// Local time when the offset is known, UTC otherwise.
pub fn now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}
