//! Interactive video viewer with facial landmark and emotion annotations.
//!
//! Frames are read from a video file, resized to the display size, annotated with
//! face landmarks and emotion labels, overlaid with a help menu and shown in a
//! window. Keyboard keys toggle pause, keypoints, emotions and the help menu.
//!
//! The per-frame pipeline consists of:
//! 1. Resizing the raw frame to the display dimensions
//! 2. Face detection and 68-point landmark detection (ONNX Runtime)
//! 3. Optional keypoint drawing and emotion classification per face
//! 4. Emotion labels above each face and the message overlay
//!
//! # Examples
//!
//! ## Running the viewer
//!
//! ```no_run
//! use emotion_viewer::{
//!     annotation::FaceMeshAnnotator,
//!     display::{HighGuiDisplay, VideoFile},
//!     emotion::EmotionClassifier,
//!     face_detection::FaceDetector,
//!     landmarks::{FaceMesh, LandmarkDetector},
//!     tables::{EmotionTranslationTable, MessageTable},
//!     viewer::{Viewer, ViewerConfig},
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mesh = FaceMesh::new(
//!     FaceDetector::new("assets/face_detector.onnx", 0.2, 0.5)?,
//!     LandmarkDetector::new("assets/face_landmarks.onnx")?,
//!     100,
//! );
//! let annotator = FaceMeshAnnotator::new(
//!     mesh,
//!     EmotionClassifier::new("assets/emotion_classifier.onnx")?,
//!     EmotionTranslationTable::from_file("config/emotion_translation.json")?,
//! );
//!
//! let viewer = Viewer::new(
//!     VideoFile::open("video.mp4")?,
//!     HighGuiDisplay,
//!     annotator,
//!     MessageTable::from_file("config/messages.json")?,
//!     ViewerConfig {
//!         display_width: Some(960),
//!         ..ViewerConfig::default()
//!     },
//! );
//! let summary = viewer.run()?;
//! println!("Presented {} frames", summary.frames_presented);
//! # Ok(())
//! # }
//! ```
//!
//! ## Driving the toggle state machine
//!
//! ```
//! use emotion_viewer::controller::{next_state, Action, ToggleState};
//!
//! let (action, state) = next_state(Some(i32::from(b'p')), ToggleState::default());
//! assert_eq!(action, Action::Continue);
//! assert!(state.pause);
//! ```

/// Geometry and drawing primitives
pub mod utils;

/// Error types and result handling
pub mod error;

/// Constants used throughout the application
pub mod constants;

/// Configuration management
pub mod config;

/// JSON key/value tables for messages and emotion translations
pub mod tables;

/// SCRFD face detection
pub mod face_detection;

/// Facial landmark detection and keypoint drawing
pub mod landmarks;

/// Emotion classification from face crops
pub mod emotion;

/// Per-face annotation contract and the landmark-based annotator
pub mod annotation;

/// Resize and annotate one frame
pub mod pipeline;

/// Help menu and hint bar overlay
pub mod overlay;

/// Keyboard toggle state machine
pub mod controller;

/// Video source and display surface
pub mod display;

/// Interactive viewer loop
pub mod viewer;

pub use error::{Error, Result};
