//! Video source and display surface seams, with `OpenCV` implementations.

use crate::{Error, Result};
use log::{debug, info};
use opencv::{
    core::Mat,
    highgui,
    prelude::*,
    videoio::{self, VideoCapture, CAP_PROP_FPS},
};

/// Frame producer owned by the viewer loop
pub trait VideoSource {
    /// Next frame, or `None` once the source is exhausted
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails while decoding.
    fn read(&mut self) -> Result<Option<Mat>>;

    /// Nominal frame rate
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot report it.
    fn fps(&self) -> Result<f64>;

    /// Release the underlying handle
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to close.
    fn release(&mut self) -> Result<()>;
}

/// Window system the viewer presents frames to and polls keys from
pub trait DisplaySurface {
    /// Show `frame` in the window called `window`
    ///
    /// # Errors
    ///
    /// Returns an error if the frame cannot be shown.
    fn present(&mut self, window: &str, frame: &Mat) -> Result<()>;

    /// Wait up to `timeout_ms` for a key press, returning its low byte
    ///
    /// # Errors
    ///
    /// Returns an error if the window system fails.
    fn poll_key(&mut self, timeout_ms: i32) -> Result<Option<i32>>;

    /// Close every window
    ///
    /// # Errors
    ///
    /// Returns an error if the window system fails.
    fn destroy_all_windows(&mut self) -> Result<()>;
}

/// Normalize a raw key code: no key is `None`, modifiers are masked off
#[must_use]
pub fn mask_key(raw: i32) -> Option<i32> {
    if raw < 0 {
        None
    } else {
        Some(raw & 0xFF)
    }
}

/// Video file decoded through `videoio`
pub struct VideoFile {
    capture: VideoCapture,
}

impl VideoFile {
    /// Open a video file
    ///
    /// # Errors
    ///
    /// Returns [`Error::SourceOpen`] if the backend cannot open the path.
    pub fn open(path: &str) -> Result<Self> {
        info!("Opening video file: {}", path);
        let capture = VideoCapture::from_file(path, videoio::CAP_ANY).map_err(|e| Error::SourceOpen {
            path: path.to_string(),
            reason: e.to_string(),
        })?;

        if !capture.is_opened()? {
            return Err(Error::SourceOpen {
                path: path.to_string(),
                reason: "capture is not opened (missing file or unsupported codec)".to_string(),
            });
        }

        Ok(Self { capture })
    }
}

impl VideoSource for VideoFile {
    fn read(&mut self) -> Result<Option<Mat>> {
        let mut frame = Mat::default();
        if !self.capture.read(&mut frame)? || frame.empty() {
            return Ok(None);
        }
        Ok(Some(frame))
    }

    fn fps(&self) -> Result<f64> {
        Ok(self.capture.get(CAP_PROP_FPS)?)
    }

    fn release(&mut self) -> Result<()> {
        debug!("Releasing video capture");
        self.capture.release()?;
        Ok(())
    }
}

/// `highgui` windows
#[derive(Debug, Default)]
pub struct HighGuiDisplay;

impl DisplaySurface for HighGuiDisplay {
    fn present(&mut self, window: &str, frame: &Mat) -> Result<()> {
        highgui::imshow(window, frame)?;
        Ok(())
    }

    fn poll_key(&mut self, timeout_ms: i32) -> Result<Option<i32>> {
        Ok(mask_key(highgui::wait_key(timeout_ms)?))
    }

    fn destroy_all_windows(&mut self) -> Result<()> {
        highgui::destroy_all_windows()?;
        Ok(())
    }
}
