//! Interactive viewer loop.
//!
//! Each iteration reads a frame (unless paused), runs the frame pipeline, composes
//! the message overlay, presents the result and polls exactly one key. The video
//! source and the display are torn down exactly once on every exit path.

use crate::{
    annotation::FaceAnnotator,
    config::DisplayConfig,
    constants::{DEFAULT_KEY_WAIT_MS, WINDOW_NAME},
    controller::{next_state, Action, ToggleState},
    display::{DisplaySurface, VideoSource},
    overlay::compose_overlay,
    pipeline::process_frame,
    tables::MessageTable,
    Result,
};
use log::{debug, error, info, warn};
use opencv::{core::Mat, prelude::*};

/// Settings fixed for the lifetime of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerConfig {
    pub window_name: String,
    pub display_width: Option<i32>,
    pub display_height: Option<i32>,
    pub key_wait_ms: i32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            window_name: WINDOW_NAME.to_string(),
            display_width: None,
            display_height: None,
            key_wait_ms: DEFAULT_KEY_WAIT_MS,
        }
    }
}

impl From<&DisplayConfig> for ViewerConfig {
    fn from(display: &DisplayConfig) -> Self {
        Self {
            window_name: display.window_name.clone(),
            display_width: display.width,
            display_height: display.height,
            key_wait_ms: display.key_wait_ms,
        }
    }
}

/// Loop state derived from the toggles and the last action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerState {
    Running,
    Paused,
    Terminated,
}

impl ViewerState {
    #[must_use]
    pub fn derive(toggles: ToggleState, action: Action) -> Self {
        match (action, toggles.pause) {
            (Action::Terminate, _) => Self::Terminated,
            (Action::Continue, true) => Self::Paused,
            (Action::Continue, false) => Self::Running,
        }
    }
}

/// Why the loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    EndOfStream,
    QuitRequested,
}

/// Counters reported after a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub frames_read: usize,
    pub frames_presented: usize,
    pub exit: ExitReason,
}

/// Owns the source and display for one run and tears them down exactly once
struct Teardown<S: VideoSource, D: DisplaySurface> {
    source: S,
    display: D,
    done: bool,
}

impl<S: VideoSource, D: DisplaySurface> Teardown<S, D> {
    fn new(source: S, display: D) -> Self {
        Self {
            source,
            display,
            done: false,
        }
    }

    fn finish(&mut self) -> Result<()> {
        if self.done {
            return Ok(());
        }
        self.done = true;
        info!("Releasing video source and closing windows");

        let released = self.source.release();
        let destroyed = self.display.destroy_all_windows();
        released.and(destroyed)
    }
}

impl<S: VideoSource, D: DisplaySurface> Drop for Teardown<S, D> {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            error!("Teardown failed: {}", e);
        }
    }
}

/// Video viewer driving the pipeline, overlay and controller
pub struct Viewer<S: VideoSource, D: DisplaySurface, A: FaceAnnotator> {
    source: S,
    display: D,
    annotator: A,
    messages: MessageTable,
    config: ViewerConfig,
}

impl<S: VideoSource, D: DisplaySurface, A: FaceAnnotator> Viewer<S, D, A> {
    #[must_use]
    pub fn new(source: S, display: D, annotator: A, messages: MessageTable, config: ViewerConfig) -> Self {
        Self {
            source,
            display,
            annotator,
            messages,
            config,
        }
    }

    /// Run until the source is exhausted or quit is pressed
    ///
    /// # Errors
    ///
    /// Returns the first pipeline, display or source error. Teardown still runs.
    pub fn run(self) -> Result<RunSummary> {
        let Self {
            source,
            display,
            mut annotator,
            messages,
            config,
        } = self;
        let mut io = Teardown::new(source, display);

        match io.source.fps() {
            Ok(fps) => info!("fps: {:.0}", fps),
            Err(e) => warn!("Could not read source fps: {}", e),
        }

        let mut toggles = ToggleState::default();
        let mut state = ViewerState::Running;
        // Last annotated frame, before the overlay
        let mut last_frame: Option<Mat> = None;
        let mut frames_read = 0;
        let mut frames_presented = 0;

        info!("Entering viewer loop");
        let exit = loop {
            if state == ViewerState::Running {
                let Some(raw) = io.source.read()? else {
                    info!("End of video stream after {} frame(s)", frames_read);
                    break ExitReason::EndOfStream;
                };
                frames_read += 1;
                debug!("Processing frame {}", frames_read);

                let (faces, display_frame) = process_frame(
                    &raw,
                    &mut annotator,
                    config.display_width,
                    config.display_height,
                    toggles.show_keypoints,
                    toggles.show_emotions,
                )?;
                debug!("Frame {} has {} face(s)", frames_read, faces.len());
                last_frame = Some(display_frame);
            }

            if let Some(frame) = &last_frame {
                let mut shown = frame.try_clone()?;
                let display_width = shown.cols();
                compose_overlay(&mut shown, &messages, display_width, toggles.show_help)?;
                io.display.present(&config.window_name, &shown)?;
                frames_presented += 1;
            }

            let key = io.display.poll_key(config.key_wait_ms)?;
            let (action, next) = next_state(key, toggles);
            if next != toggles {
                info!("Toggles changed: {}", next);
            }
            toggles = next;

            let derived = ViewerState::derive(toggles, action);
            match (state, derived) {
                (ViewerState::Running, ViewerState::Paused) => info!("Paused"),
                (ViewerState::Paused, ViewerState::Running) => info!("Resumed"),
                _ => {}
            }
            state = derived;

            if state == ViewerState::Terminated {
                info!("Quit requested");
                break ExitReason::QuitRequested;
            }
        };

        io.finish()?;

        Ok(RunSummary {
            frames_read,
            frames_presented,
            exit,
        })
    }
}
