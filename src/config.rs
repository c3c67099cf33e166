//! Configuration management for the emotion viewer

use crate::{
    constants::{DEFAULT_KEY_WAIT_MS, WINDOW_NAME},
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Model configuration
    pub models: ModelConfig,

    /// Key/value table files
    pub tables: TableConfig,

    /// Display configuration
    pub display: DisplayConfig,

    /// Face detection parameters
    pub detection: DetectionConfig,
}

/// Model file paths configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path to face detection ONNX model
    pub face_detector: PathBuf,

    /// Path to facial landmarks ONNX model
    pub face_landmarks: PathBuf,

    /// Path to emotion classification ONNX model
    pub emotion_classifier: PathBuf,
}

/// Table file paths
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Ordered help/status messages (JSON object)
    pub messages: PathBuf,

    /// Canonical emotion label to display label (JSON object)
    pub emotion_translations: PathBuf,
}

/// Display configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Display width; when set the height follows the aspect ratio
    pub width: Option<i32>,

    /// Display height, used only when no width is set
    pub height: Option<i32>,

    /// Title of the display window
    pub window_name: String,

    /// Key poll timeout per iteration in milliseconds
    pub key_wait_ms: i32,
}

/// Face detection parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Confidence threshold for face detection (0.0-1.0)
    pub confidence_threshold: f32,

    /// IOU threshold for non-maximum suppression (0.0-1.0)
    pub iou_threshold: f32,

    /// Maximum number of faces to annotate per frame
    pub max_faces: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            face_detector: PathBuf::from("assets/face_detector.onnx"),
            face_landmarks: PathBuf::from("assets/face_landmarks.onnx"),
            emotion_classifier: PathBuf::from("assets/emotion_classifier.onnx"),
        }
    }
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            messages: PathBuf::from("config/messages.json"),
            emotion_translations: PathBuf::from("config/emotion_translation.json"),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: None,
            height: None,
            window_name: WINDOW_NAME.to_string(),
            key_wait_ms: DEFAULT_KEY_WAIT_MS,
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.2,
            iou_threshold: 0.5,
            max_faces: 100,
        }
    }
}

fn ensure_exists(kind: &str, path: &Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(Error::ConfigError(format!("{kind} not found: {}", path.display())))
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid configuration.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        serde_yaml::from_str(&content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Validate values without touching the filesystem
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] describing the first invalid value.
    pub fn validate_values(&self) -> Result<()> {
        // Validate thresholds
        if !(0.0..=1.0).contains(&self.detection.confidence_threshold) {
            return Err(Error::ConfigError(
                "Confidence threshold must be between 0.0 and 1.0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.detection.iou_threshold) {
            return Err(Error::ConfigError("IOU threshold must be between 0.0 and 1.0".to_string()));
        }
        if self.detection.max_faces == 0 {
            return Err(Error::ConfigError("Maximum faces must be greater than 0".to_string()));
        }

        // Validate display settings
        for (name, value) in [("width", self.display.width), ("height", self.display.height)] {
            if let Some(v) = value {
                if v <= 0 {
                    return Err(Error::ConfigError(format!("Display {name} must be positive, got {v}")));
                }
            }
        }
        if self.display.key_wait_ms < 1 {
            return Err(Error::ConfigError("Key wait must be at least 1 ms".to_string()));
        }
        if self.display.window_name.is_empty() {
            return Err(Error::ConfigError("Window name must not be empty".to_string()));
        }

        Ok(())
    }

    /// Validate configuration, including that every model and table file exists
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        self.validate_values()?;

        ensure_exists("Face detector model", &self.models.face_detector)?;
        ensure_exists("Face landmarks model", &self.models.face_landmarks)?;
        ensure_exists("Emotion classifier model", &self.models.emotion_classifier)?;
        ensure_exists("Message table", &self.tables.messages)?;
        ensure_exists("Emotion translation table", &self.tables.emotion_translations)?;

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Emotion Viewer Configuration

# Model paths
models:
  face_detector: "assets/face_detector.onnx"
  face_landmarks: "assets/face_landmarks.onnx"
  emotion_classifier: "assets/emotion_classifier.onnx"

# Key/value tables (flat JSON objects)
tables:
  messages: "config/messages.json"
  emotion_translations: "config/emotion_translation.json"

# Display settings; width wins when both are set
display:
  width: 960
  height: null
  window_name: "Player"
  key_wait_ms: 1

# Face detection parameters
detection:
  confidence_threshold: 0.2
  iou_threshold: 0.5
  max_faces: 100
"#;
