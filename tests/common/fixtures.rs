#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use cascadelab::annotation::AnnotationStore;
use cascadelab::config::PipelineConfig;
use cascadelab::detection::{FrameSource, ObjectDetector, Preview, PreviewControl, PreviewWait};
use cascadelab::error::PipelineError;
use cascadelab::models::{Annotation, BoundingBox};
use cascadelab::training::{CascadeTrainer, PackRequest, TrainRequest};
use image::{DynamicImage, ImageBuffer, Rgb, RgbImage};

/// Writes a solid gray `width` x `height` image to `dir/name`.
/// The format follows the extension.
pub fn write_image(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let img: RgbImage = ImageBuffer::from_fn(width, height, |_, _| Rgb([128u8, 128u8, 128u8]));
    let path = dir.join(name);
    img.save(&path).expect("Failed to save test image");
    path
}

/// Writes a file that has an image extension but is not an image.
pub fn write_garbage(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"not an image").expect("Failed to write garbage file");
    path
}

/// PNG-encoded bytes of a solid `width` x `height` image.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut out = std::io::Cursor::new(Vec::new());
    solid_frame(width, height)
        .write_to(&mut out, image::ImageFormat::Png)
        .expect("Failed to encode PNG");
    out.into_inner()
}

/// Serves `body` to exactly one HTTP request on a local port.
/// Returns the base URL, e.g. `http://127.0.0.1:PORT`.
pub fn serve_once(body: Vec<u8>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind test server");
    let addr = listener.local_addr().expect("Failed to read local address");
    std::thread::spawn(move || {
        let Ok((mut stream, _)) = listener.accept() else {
            return;
        };
        // Read the request head before answering
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            match stream.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => request.extend_from_slice(&buf[..n]),
            }
        }
        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/octet-stream\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );
        let _ = stream.write_all(head.as_bytes());
        let _ = stream.write_all(&body);
        let _ = stream.flush();
    });
    format!("http://{}", addr)
}

/// Leftover download files in the system temp dir whose name ends in `suffix`.
pub fn leftover_downloads(suffix: &str) -> Vec<PathBuf> {
    std::fs::read_dir(std::env::temp_dir())
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| {
                    let name = p.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
                    name.starts_with("cascadelab-") && name.ends_with(suffix)
                })
                .collect()
        })
        .unwrap_or_default()
}

pub fn solid_frame(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(ImageBuffer::from_fn(width, height, |_, _| {
        Rgb([10u8, 20u8, 30u8])
    }))
}

/// Project rooted in a fresh temporary directory.
/// Returns the config and the temp directory (which must be kept alive).
pub fn create_test_project() -> (PipelineConfig, tempfile::TempDir) {
    let dir = tempfile::TempDir::new().expect("Failed to create temp directory");
    let config = PipelineConfig::new().with_root(dir.path());
    std::fs::create_dir_all(config.layout.positives_dir()).expect("Failed to create positives dir");
    std::fs::create_dir_all(config.layout.negatives_dir()).expect("Failed to create negatives dir");
    (config, dir)
}

/// Writes `count` positive images plus one annotation line each into the
/// project's store.
pub fn seed_annotations(config: &PipelineConfig, count: usize) -> AnnotationStore {
    let positives = config.layout.positives_dir();
    let annotations: Vec<Annotation> = (0..count)
        .map(|i| {
            let path = write_image(&positives, &format!("pos_{:02}.png", i), 40, 30);
            let path = cascadelab::dataset::absolute_slash_path(&path).expect("absolute path");
            Annotation::new(path, vec![BoundingBox::new(2, 3, 20, 15)])
        })
        .collect();
    let store = AnnotationStore::new(config.layout.positives_file());
    store.write_all(&annotations).expect("Failed to write annotations");
    store
}

/// Requests seen by a `FakeTrainer`.
#[derive(Debug, Default)]
pub struct TrainerCalls {
    pub packs: Vec<PackRequest>,
    pub trains: Vec<TrainRequest>,
}

/// In-memory trainer. Clones share the same call log.
#[derive(Clone, Default)]
pub struct FakeTrainer {
    pub calls: Rc<RefCell<TrainerCalls>>,
    pub fail_pack: bool,
    pub fail_train: bool,
}

impl FakeTrainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_pack() -> Self {
        Self {
            fail_pack: true,
            ..Self::default()
        }
    }

    pub fn failing_train() -> Self {
        Self {
            fail_train: true,
            ..Self::default()
        }
    }

    pub fn pack_count(&self) -> usize {
        self.calls.borrow().packs.len()
    }

    pub fn train_count(&self) -> usize {
        self.calls.borrow().trains.len()
    }
}

impl CascadeTrainer for FakeTrainer {
    fn pack(&self, request: &PackRequest) -> anyhow::Result<()> {
        self.calls.borrow_mut().packs.push(request.clone());
        if self.fail_pack {
            return Err(PipelineError::PackingFailed { status: None }.into());
        }
        std::fs::write(&request.vec_path, b"vec")?;
        Ok(())
    }

    fn train(&self, request: &TrainRequest) -> anyhow::Result<PathBuf> {
        self.calls.borrow_mut().trains.push(request.clone());
        if self.fail_train {
            return Err(PipelineError::TrainingFailed { status: None }.into());
        }
        let cascade = request.data_dir.join("cascade.xml");
        std::fs::write(&cascade, b"<opencv_storage/>")?;
        Ok(cascade)
    }
}

/// Detector that hands out scripted results, one per call, then nothing.
#[derive(Default)]
pub struct FakeDetector {
    pub results: VecDeque<Vec<BoundingBox>>,
    pub calls: usize,
}

impl FakeDetector {
    pub fn scripted(results: Vec<Vec<BoundingBox>>) -> Self {
        Self {
            results: results.into(),
            calls: 0,
        }
    }
}

impl ObjectDetector for FakeDetector {
    fn detect(&mut self, _image: &DynamicImage) -> anyhow::Result<Vec<BoundingBox>> {
        self.calls += 1;
        Ok(self.results.pop_front().unwrap_or_default())
    }
}

/// Yields `remaining` identical frames, then ends.
pub struct FakeFrameSource {
    pub remaining: usize,
}

impl FrameSource for FakeFrameSource {
    fn read_frame(&mut self) -> anyhow::Result<Option<DynamicImage>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        Ok(Some(solid_frame(320, 240)))
    }
}

/// Records what was shown; answers `Quit` on the `quit_on`-th frame (1-based).
#[derive(Default)]
pub struct FakePreview {
    pub shown: Vec<PreviewWait>,
    pub quit_on: Option<usize>,
}

impl Preview for FakePreview {
    fn show(&mut self, _frame: &RgbImage, wait: PreviewWait) -> anyhow::Result<PreviewControl> {
        self.shown.push(wait);
        if self.quit_on == Some(self.shown.len()) {
            Ok(PreviewControl::Quit)
        } else {
            Ok(PreviewControl::Continue)
        }
    }
}
