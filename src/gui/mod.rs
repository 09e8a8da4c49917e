mod app;
mod message;
mod state;

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;

use tracing::info;

pub use app::AnnotatorApp;
pub use message::Message;
pub use state::PointerTracker;

use crate::annotation::{AnnotationQueue, AnnotationStore, AnnotationSummary, write_outcomes};
use crate::dataset;

/// Ask the operator for the positives folder.
pub fn pick_positives_dir() -> Option<PathBuf> {
    rfd::FileDialog::new()
        .set_title("Select the folder with positive images")
        .pick_folder()
}

/// Annotate every image in `positives_dir`, truncating `store` and writing
/// each confirmed annotation as soon as the operator confirms it.
pub fn annotate_directory(
    positives_dir: &Path,
    store: &AnnotationStore,
) -> anyhow::Result<AnnotationSummary> {
    let images = dataset::list_images(positives_dir)?;
    if images.is_empty() {
        anyhow::bail!("No images found in {}", positives_dir.display());
    }
    info!("{} image(s) to annotate", images.len());

    let queue = AnnotationQueue::new(images);
    let mut writer = store.create()?;
    let (sender, receiver) = mpsc::channel();
    let recorder = thread::spawn(move || {
        let summary = write_outcomes(receiver, &mut writer);
        (summary, writer.written())
    });

    let window = iced::application(
        move || AnnotatorApp::new(queue.clone(), sender.clone()),
        AnnotatorApp::update,
        AnnotatorApp::view,
    )
    .title(AnnotatorApp::title)
    .run();

    // The window owned every sender, so the recorder sees the channel close here
    let (summary, written) = recorder
        .join()
        .map_err(|_| anyhow::anyhow!("Annotation writer thread panicked"))?;
    window.map_err(|e| anyhow::anyhow!("Annotator window failed: {}", e))?;
    let summary = summary?;
    info!(
        "{} annotation(s) saved to {}",
        written,
        store.path().display()
    );
    Ok(summary)
}
