//! Interactive video viewer with face landmark and emotion annotations.

use anyhow::{Context, Result};
use clap::Parser;
use emotion_viewer::{
    annotation::FaceMeshAnnotator,
    config::{Config, EXAMPLE_CONFIG},
    display::{HighGuiDisplay, VideoFile},
    emotion::EmotionClassifier,
    face_detection::FaceDetector,
    landmarks::{FaceMesh, LandmarkDetector},
    tables::{EmotionTranslationTable, MessageTable},
    viewer::{ExitReason, Viewer, ViewerConfig},
};
use log::info;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Video file to play
    #[arg(short, long, required_unless_present = "print_config")]
    video: Option<String>,

    /// Display width; the height follows the aspect ratio
    #[arg(short = 'W', long)]
    width: Option<i32>,

    /// Display height, used when no width is given
    #[arg(short = 'H', long)]
    height: Option<i32>,

    /// Message table shown by the help menu (JSON)
    #[arg(short, long)]
    messages: Option<PathBuf>,

    /// Emotion label translations (JSON)
    #[arg(short, long)]
    translations: Option<PathBuf>,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,

    /// Print an example configuration file and exit
    #[arg(long)]
    print_config: bool,
}

impl Args {
    /// Apply command-line overrides on top of file configuration
    fn apply_to(&self, config: &mut Config) {
        if self.width.is_some() {
            config.display.width = self.width;
        }
        if self.height.is_some() {
            config.display.height = self.height;
        }
        if let Some(messages) = &self.messages {
            config.tables.messages.clone_from(messages);
        }
        if let Some(translations) = &self.translations {
            config.tables.emotion_translations.clone_from(translations);
        }
    }
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    if args.print_config {
        print!("{EXAMPLE_CONFIG}");
        return Ok(());
    }

    // Initialize logger
    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    info!("Emotion Viewer");

    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            Config::from_file(path).with_context(|| format!("Failed to load config {}", path.display()))?
        }
        None => Config::default(),
    };
    args.apply_to(&mut config);
    config.validate().context("Invalid configuration")?;

    let video = args.video.as_deref().context("--video is required")?;
    let source = VideoFile::open(video)?;

    let messages = MessageTable::from_file(&config.tables.messages).context("Failed to load message table")?;
    let translations = EmotionTranslationTable::from_file(&config.tables.emotion_translations)
        .context("Failed to load emotion translations")?;

    let detector = FaceDetector::new(
        &config.models.face_detector,
        config.detection.confidence_threshold,
        config.detection.iou_threshold,
    )?;
    let landmarks = LandmarkDetector::new(&config.models.face_landmarks)?;
    let classifier = EmotionClassifier::new(&config.models.emotion_classifier)?;
    let annotator = FaceMeshAnnotator::new(
        FaceMesh::new(detector, landmarks, config.detection.max_faces),
        classifier,
        translations,
    );

    let viewer = Viewer::new(
        source,
        HighGuiDisplay,
        annotator,
        messages,
        ViewerConfig::from(&config.display),
    );
    let summary = viewer.run()?;

    match summary.exit {
        ExitReason::EndOfStream => info!("Finished: {} frame(s) shown", summary.frames_read),
        ExitReason::QuitRequested => info!("Stopped by user after {} frame(s)", summary.frames_read),
    }

    Ok(())
}
