//! Constants used throughout the application

/// Name of the display window
pub const WINDOW_NAME: &str = "Player";

/// Key poll timeout per loop iteration, in milliseconds
pub const DEFAULT_KEY_WAIT_MS: i32 = 1;

/// Key codes understood by the input controller
pub const KEY_QUIT: i32 = b'q' as i32;
pub const KEY_PAUSE: i32 = b'p' as i32;
pub const KEY_KEYPOINTS: i32 = b'k' as i32;
pub const KEY_EMOTIONS: i32 = b'e' as i32;
pub const KEY_HELP: i32 = b'h' as i32;

/// Emotion label drawn when classification failed or the label is unknown
pub const NO_EMOTION_LABEL: &str = "None";

/// Vertical offset of an emotion label above the face box
pub const EMOTION_LABEL_OFFSET: i32 = 10;

/// Label box margin around its text
pub const LABEL_MARGIN: i32 = 5;

/// Label font settings
pub const LABEL_FONT_SCALE: f64 = 1.0;
pub const LABEL_THICKNESS: i32 = 2;

/// Help panel geometry
pub const HELP_PANEL_WIDTH: i32 = 270;
pub const HELP_LINE_HEIGHT: i32 = 30;
pub const HELP_TEXT_INSET: i32 = 250;

/// Hint bar geometry and text
pub const HINT_TEXT: &str = "Press [H] to display the menu";
pub const HINT_BAR_X: i32 = 5;
pub const HINT_BAR_WIDTH: i32 = 295;
pub const HINT_BAR_HEIGHT: i32 = 25;
pub const HINT_TEXT_X: i32 = 15;
pub const HINT_TEXT_Y: i32 = 15;

/// Message font settings
pub const MESSAGE_FONT_SCALE: f64 = 0.5;
pub const MESSAGE_THICKNESS: i32 = 2;

/// Panel background opacity
pub const OVERLAY_ALPHA: f64 = 0.5;

/// Number of facial landmarks produced by the landmark model
pub const NUM_FACIAL_LANDMARKS: usize = 68;

/// Image normalization constants for face detection
pub const IMAGE_NORMALIZATION_OFFSET: f32 = 127.5;
pub const IMAGE_NORMALIZATION_SCALE: f32 = 128.0;

/// Face box expansion before landmark detection
pub const LANDMARK_BOX_SHIFT: f32 = 0.2;

/// Canonical emotion labels in classifier output order
pub const EMOTION_LABELS: [&str; 7] = ["angry", "disgust", "fear", "happy", "sad", "surprise", "neutral"];
