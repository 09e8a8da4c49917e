use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{Level, info};

use cascadelab::annotation::{self, AnnotationStore};
use cascadelab::menu::{self, MenuChoice};
use cascadelab::{NegativeListBuilder, OpenCvTools, Pipeline, PipelineConfig, PipelineContext};

#[derive(Parser)]
#[command(name = "cascadelab")]
#[command(about = "Annotate samples, train a Haar cascade and test it")]
struct Cli {
    /// Project directory holding dataset/, annotations/, cascade/ ...
    #[arg(long, global = true, value_name = "DIR")]
    root: Option<PathBuf>,

    /// JSON file overriding the default parameters
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Mark objects on the positive images
    Annotate {
        /// Folder of positive images (asks with a dialog when omitted)
        #[arg(long, value_name = "DIR")]
        positives: Option<PathBuf>,
    },
    /// Write the negative image list
    Negatives,
    /// Check the annotation file against its images
    Validate,
    /// Annotate, then build negatives, validate, pack and train
    Train {
        /// Reuse the existing annotation file
        #[arg(long)]
        skip_annotate: bool,
    },
    /// Test the trained cascade on an image, the camera or a folder
    Detect,
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::new(),
    };
    if let Some(root) = &args.root {
        config = config.with_root(root);
    }

    match args.command {
        Command::Annotate { positives } => annotate(&config, positives),
        Command::Negatives => {
            let layout = &config.layout;
            let manifest = NegativeListBuilder::new(layout.negatives_dir())
                .build_into(&layout.negatives_file())?;
            println!("{} negative image(s) listed", manifest.len());
            Ok(())
        }
        Command::Validate => {
            let store = AnnotationStore::new(config.layout.positives_file());
            let result = annotation::validate(&store)?;
            for issue in &result.errors {
                println!("Line {}: {}", issue.line, issue.reason);
            }
            result.into_result()?;
            println!("Annotation file OK");
            Ok(())
        }
        Command::Train { skip_annotate } => train(config, skip_annotate, args.verbose),
        Command::Detect => detect(&config, args.verbose),
    }
}

#[cfg(feature = "gui")]
fn annotate(config: &PipelineConfig, positives: Option<PathBuf>) -> anyhow::Result<()> {
    let dir = match positives {
        Some(dir) => dir,
        None => cascadelab::gui::pick_positives_dir()
            .unwrap_or_else(|| config.layout.positives_dir()),
    };
    let store = AnnotationStore::new(config.layout.positives_file());
    let summary = cascadelab::gui::annotate_directory(&dir, &store)?;
    println!(
        "{} image(s) annotated, {} skipped, {} box(es) dropped",
        summary.annotated, summary.skipped, summary.dropped_boxes
    );
    Ok(())
}

#[cfg(not(feature = "gui"))]
fn annotate(_config: &PipelineConfig, _positives: Option<PathBuf>) -> anyhow::Result<()> {
    anyhow::bail!("Annotation needs the `gui` feature")
}

fn train(config: PipelineConfig, skip_annotate: bool, verbose: bool) -> anyhow::Result<()> {
    let trainer = Box::new(OpenCvTools::new(&config.tools));
    let mut pipeline = Pipeline::training().with_verbose(verbose);
    if !skip_annotate {
        pipeline = with_annotation(pipeline);
    }

    let mut context = PipelineContext::new(config, trainer);
    pipeline.run(&mut context)?;

    if let Some(cascade) = &context.cascade_path {
        println!("Classifier ready: {}", cascade.display());
    }
    Ok(())
}

#[cfg(feature = "gui")]
fn with_annotation(pipeline: Pipeline) -> Pipeline {
    pipeline.prepend_stage_boxed(Box::new(cascadelab::pipeline::AnnotateStage {
        positives_dir: None,
    }))
}

#[cfg(not(feature = "gui"))]
fn with_annotation(pipeline: Pipeline) -> Pipeline {
    tracing::warn!("Built without `gui`; using the existing annotation file");
    pipeline
}

fn detect(config: &PipelineConfig, verbose: bool) -> anyhow::Result<()> {
    let cascade = config.layout.cascade_file();
    if !cascade.exists() {
        anyhow::bail!(
            "Trained classifier not found at {}. Run `cascadelab train` first.",
            cascade.display()
        );
    }

    let stdin = std::io::stdin();
    let Some(choice) = menu::prompt(&mut stdin.lock(), &mut std::io::stdout())? else {
        return Ok(());
    };
    info!("Using classifier {}", cascade.display());
    run_choice(config, choice, verbose)
}

#[cfg(feature = "opencv")]
fn run_choice(config: &PipelineConfig, choice: MenuChoice, verbose: bool) -> anyhow::Result<()> {
    use cascadelab::detection::opencv::{Camera, CascadeDetector, HighguiPreview};
    use cascadelab::detection::{DetectionReport, DetectorRunner, ImageInput};

    let layout = &config.layout;
    let detector = CascadeDetector::load(&layout.cascade_file(), config.detection.clone())?;
    let mut runner = DetectorRunner::new(detector)
        .with_verbose(verbose)
        .with_output_dir(layout.results_dir())
        .with_report(DetectionReport::open(&layout.report_file())?)
        .with_dedup_threshold(config.detection.dedup_threshold);
    let mut preview = HighguiPreview::new("Detection")?;

    match choice {
        MenuChoice::Image(raw) => {
            let boxes = runner.detect_image_with(&ImageInput::parse(&raw), &mut preview)?;
            println!("{} object(s) detected", boxes.len());
        }
        MenuChoice::Directory(raw) => {
            let results = runner.detect_directory_with(&PathBuf::from(raw), &mut preview)?;
            for (name, boxes) in &results {
                println!("{}: {} object(s)", name, boxes.len());
            }
        }
        MenuChoice::Camera => {
            let camera = Camera::open(config.detection.camera_index)?;
            println!("Press 'q' in the preview window to quit.");
            let summary = runner.run_stream(camera, &mut preview)?;
            println!(
                "{} frame(s), {} distinct object(s), {} frame(s) saved",
                summary.frames,
                summary.novel,
                summary.saved_frames.len()
            );
        }
    }
    Ok(())
}

#[cfg(not(feature = "opencv"))]
fn run_choice(_config: &PipelineConfig, choice: MenuChoice, _verbose: bool) -> anyhow::Result<()> {
    tracing::warn!("Cannot run {:?}", choice);
    anyhow::bail!("Detection needs the `opencv` feature")
}
