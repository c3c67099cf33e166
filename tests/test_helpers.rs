//! Helper functions and in-memory collaborators for tests

#![allow(dead_code)]

use emotion_viewer::{
    annotation::{FaceAnnotator, FaceResult},
    display::{DisplaySurface, VideoSource},
    tables::MessageTable,
    Error, Result,
};
use opencv::{
    core::{Mat, Scalar, CV_8UC3},
    prelude::*,
};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Create a test image with specified dimensions and type
pub fn create_test_image(height: i32, width: i32, cv_type: i32) -> Result<Mat> {
    Mat::zeros(height, width, cv_type)?.to_mat().map_err(Into::into)
}

/// Three-channel frame filled with one grey value
pub fn solid_frame(height: i32, width: i32, value: f64) -> Mat {
    Mat::new_rows_cols_with_default(height, width, CV_8UC3, Scalar::all(value)).unwrap()
}

/// Two-entry message table in help-menu order
pub fn sample_messages() -> MessageTable {
    MessageTable::new(vec![
        ("quit".to_string(), "[Q] Quit".to_string()),
        ("pause".to_string(), "[P] Pause".to_string()),
    ])
}

/// Everything the collaborators were asked to do during a run
#[derive(Default)]
pub struct Calls {
    pub reads: usize,
    pub analyses: usize,
    /// `(show_keypoints, show_emotions)` passed to each analysis
    pub flags: Vec<(bool, bool)>,
    pub polls: usize,
    pub releases: usize,
    pub destroys: usize,
    pub presented: Vec<Mat>,
}

pub type SharedCalls = Rc<RefCell<Calls>>;

pub fn shared_calls() -> SharedCalls {
    Rc::new(RefCell::new(Calls::default()))
}

/// Yields a fixed list of frames, then reports exhaustion
pub struct ScriptedSource {
    frames: VecDeque<Mat>,
    calls: SharedCalls,
}

impl ScriptedSource {
    /// `count` frames, the i-th filled with `10 * (i + 1)`
    pub fn with_frames(count: usize, calls: &SharedCalls) -> Self {
        let frames = (0..count).map(|i| solid_frame(120, 400, 10.0 * (i as f64 + 1.0))).collect();
        Self {
            frames,
            calls: Rc::clone(calls),
        }
    }

    pub fn from_frames(frames: Vec<Mat>, calls: &SharedCalls) -> Self {
        Self {
            frames: frames.into(),
            calls: Rc::clone(calls),
        }
    }
}

impl VideoSource for ScriptedSource {
    fn read(&mut self) -> Result<Option<Mat>> {
        self.calls.borrow_mut().reads += 1;
        Ok(self.frames.pop_front())
    }

    fn fps(&self) -> Result<f64> {
        Ok(25.0)
    }

    fn release(&mut self) -> Result<()> {
        self.calls.borrow_mut().releases += 1;
        Ok(())
    }
}

/// Records presented frames and replays a key script; no key once the script ends
pub struct ScriptedDisplay {
    keys: VecDeque<Option<i32>>,
    calls: SharedCalls,
}

impl ScriptedDisplay {
    pub fn new(keys: &[Option<u8>], calls: &SharedCalls) -> Self {
        Self {
            keys: keys.iter().map(|k| k.map(i32::from)).collect(),
            calls: Rc::clone(calls),
        }
    }
}

impl DisplaySurface for ScriptedDisplay {
    fn present(&mut self, _window: &str, frame: &Mat) -> Result<()> {
        let copy = frame.try_clone()?;
        self.calls.borrow_mut().presented.push(copy);
        Ok(())
    }

    fn poll_key(&mut self, _timeout_ms: i32) -> Result<Option<i32>> {
        self.calls.borrow_mut().polls += 1;
        Ok(self.keys.pop_front().flatten())
    }

    fn destroy_all_windows(&mut self) -> Result<()> {
        self.calls.borrow_mut().destroys += 1;
        Ok(())
    }
}

/// Annotator that never finds a face and records the toggles it was given
pub struct NoFaces {
    calls: SharedCalls,
}

impl NoFaces {
    pub fn new(calls: &SharedCalls) -> Self {
        Self {
            calls: Rc::clone(calls),
        }
    }
}

impl FaceAnnotator for NoFaces {
    fn analyze(&mut self, _frame: &mut Mat, show_keypoints: bool, show_emotions: bool) -> Result<Vec<FaceResult>> {
        let mut calls = self.calls.borrow_mut();
        calls.analyses += 1;
        calls.flags.push((show_keypoints, show_emotions));
        Ok(Vec::new())
    }
}

/// Annotator whose model always fails
pub struct BrokenModel;

impl FaceAnnotator for BrokenModel {
    fn analyze(&mut self, _frame: &mut Mat, _show_keypoints: bool, _show_emotions: bool) -> Result<Vec<FaceResult>> {
        Err(Error::ModelError("session crashed".to_string()))
    }
}
