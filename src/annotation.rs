//! Per-face analysis: bounding boxes, keypoint drawing, emotion labels and crops.
//!
//! [`FaceAnnotator`] is the seam between the frame pipeline and the models. The
//! concrete [`FaceMeshAnnotator`] combines a [`LandmarkSource`] with an
//! [`EmotionModel`] and a translation table captured at construction.

use crate::{
    constants::NO_EMOTION_LABEL,
    landmarks::draw_keypoints,
    tables::EmotionTranslationTable,
    utils::safe_cast::f32_to_i32_clamp,
    Error, Result,
};
use log::{debug, warn};
use opencv::core::{Mat, Point2f, Rect};
use opencv::prelude::*;
use std::fmt;

/// Face box in frame pixel coordinates, clipped to the frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoundingBox {
    pub x_min: i32,
    pub y_min: i32,
    pub x_max: i32,
    pub y_max: i32,
}

impl BoundingBox {
    /// Tightest box around a set of landmarks, clipped to `[0, width)` x `[0, height)`
    ///
    /// Returns `None` for an empty landmark set or an empty frame.
    #[must_use]
    pub fn from_landmarks(landmarks: &[Point2f], width: i32, height: i32) -> Option<Self> {
        if landmarks.is_empty() || width <= 0 || height <= 0 {
            return None;
        }

        let (mut x_min, mut y_min) = (width - 1, height - 1);
        let (mut x_max, mut y_max) = (0, 0);
        for point in landmarks {
            let x = f32_to_i32_clamp(point.x, 0, width - 1);
            let y = f32_to_i32_clamp(point.y, 0, height - 1);
            x_min = x_min.min(x);
            y_min = y_min.min(y);
            x_max = x_max.max(x);
            y_max = y_max.max(y);
        }

        Some(Self {
            x_min,
            y_min,
            x_max,
            y_max,
        })
    }

    #[must_use]
    pub fn width(&self) -> i32 {
        self.x_max - self.x_min
    }

    #[must_use]
    pub fn height(&self) -> i32 {
        self.y_max - self.y_min
    }

    /// Whether the box covers no pixels
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }

    /// Crop rectangle with exclusive max edges
    #[must_use]
    pub fn to_rect(&self) -> Rect {
        Rect::new(self.x_min, self.y_min, self.width(), self.height())
    }
}

/// One detected face in one frame
///
/// The annotated frame the face belongs to is the display frame returned
/// alongside the results by [`crate::pipeline::process_frame`].
pub struct FaceResult {
    pub bounding_box: BoundingBox,
    /// Display label, `Some("None")` when classification failed, `None` when not requested
    pub dominant_emotion: Option<String>,
    /// Face region of the frame after keypoints were drawn
    pub crop_with_keypoints: Mat,
    /// Face region of the untouched frame
    pub crop_without_keypoints: Mat,
}

impl fmt::Debug for FaceResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaceResult")
            .field("bounding_box", &self.bounding_box)
            .field("dominant_emotion", &self.dominant_emotion)
            .finish_non_exhaustive()
    }
}

/// Detects faces in a frame and optionally burns keypoints into it
pub trait FaceAnnotator {
    /// Analyze every face in `frame`
    ///
    /// Keypoints are drawn into `frame` only when `show_keypoints` is set and
    /// emotions are classified only when `show_emotions` is set. Zero faces yield
    /// an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error if face localization or drawing fails. Per-face emotion
    /// failures are not errors.
    fn analyze(&mut self, frame: &mut Mat, show_keypoints: bool, show_emotions: bool) -> Result<Vec<FaceResult>>;
}

/// Produces one landmark set per face, in frame coordinates
pub trait LandmarkSource {
    /// # Errors
    ///
    /// Returns an error if detection fails.
    fn locate(&mut self, frame: &Mat) -> Result<Vec<Vec<Point2f>>>;
}

/// Classifies a face crop into a canonical emotion label
pub trait EmotionModel {
    /// # Errors
    ///
    /// Returns an error if the crop cannot be classified.
    fn classify(&mut self, face: &Mat) -> Result<String>;
}

/// Region of `image` as an owned matrix; empty boxes give an empty matrix
fn crop(image: &Mat, bbox: &BoundingBox) -> Result<Mat> {
    if bbox.is_empty() {
        return Ok(Mat::default());
    }
    Ok(Mat::roi(image, bbox.to_rect())?.try_clone()?)
}

/// Landmark-based annotator with emotion classification
pub struct FaceMeshAnnotator<L, E> {
    locator: L,
    classifier: E,
    translations: EmotionTranslationTable,
}

impl<L: LandmarkSource, E: EmotionModel> FaceMeshAnnotator<L, E> {
    #[must_use]
    pub fn new(locator: L, classifier: E, translations: EmotionTranslationTable) -> Self {
        Self {
            locator,
            classifier,
            translations,
        }
    }

    /// Classify one face crop and translate the label
    ///
    /// # Errors
    ///
    /// Every failure, including a zero-area crop, is reported as [`Error::Analysis`].
    pub fn analyze_emotion(&mut self, face: &Mat) -> Result<String> {
        if face.empty() {
            return Err(Error::Analysis("face crop has zero area".to_string()));
        }

        match self.classifier.classify(face) {
            Ok(label) => Ok(self.translations.translate(&label)),
            Err(err) if err.is_recoverable() => Err(err),
            Err(other) => Err(Error::Analysis(other.to_string())),
        }
    }
}

impl<L: LandmarkSource, E: EmotionModel> FaceAnnotator for FaceMeshAnnotator<L, E> {
    fn analyze(&mut self, frame: &mut Mat, show_keypoints: bool, show_emotions: bool) -> Result<Vec<FaceResult>> {
        let pristine = frame.try_clone()?;
        let faces = self.locator.locate(&pristine)?;
        let (width, height) = (frame.cols(), frame.rows());

        let boxes: Vec<BoundingBox> = faces
            .iter()
            .filter_map(|landmarks| BoundingBox::from_landmarks(landmarks, width, height))
            .collect();

        if show_keypoints {
            for landmarks in &faces {
                draw_keypoints(frame, landmarks)?;
            }
        }

        let mut results = Vec::with_capacity(boxes.len());
        for bounding_box in boxes {
            let crop_without_keypoints = crop(&pristine, &bounding_box)?;
            let crop_with_keypoints = crop(frame, &bounding_box)?;

            let dominant_emotion = if show_emotions {
                match self.analyze_emotion(&crop_without_keypoints) {
                    Ok(label) => Some(label),
                    Err(err) if err.is_recoverable() => {
                        warn!("{err}; labelling face at {bounding_box:?} as {NO_EMOTION_LABEL}");
                        Some(NO_EMOTION_LABEL.to_string())
                    }
                    Err(err) => return Err(err),
                }
            } else {
                None
            };

            results.push(FaceResult {
                bounding_box,
                dominant_emotion,
                crop_with_keypoints,
                crop_without_keypoints,
            });
        }

        debug!("Annotated {} face(s)", results.len());
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::{Scalar, Size, Vec3b, CV_8UC3};

    struct FixedFaces(Vec<Vec<Point2f>>);

    impl LandmarkSource for FixedFaces {
        fn locate(&mut self, _frame: &Mat) -> Result<Vec<Vec<Point2f>>> {
            Ok(self.0.clone())
        }
    }

    struct CountingModel {
        calls: usize,
        outcome: std::result::Result<&'static str, &'static str>,
    }

    impl EmotionModel for CountingModel {
        fn classify(&mut self, _face: &Mat) -> Result<String> {
            self.calls += 1;
            match self.outcome {
                Ok(label) => Ok(label.to_string()),
                Err(reason) => Err(Error::ModelOutputError(reason.to_string())),
            }
        }
    }

    fn square(x: f32, y: f32, side: f32) -> Vec<Point2f> {
        vec![
            Point2f::new(x, y),
            Point2f::new(x + side, y),
            Point2f::new(x, y + side),
            Point2f::new(x + side, y + side),
        ]
    }

    fn annotator(
        faces: Vec<Vec<Point2f>>,
        outcome: std::result::Result<&'static str, &'static str>,
    ) -> FaceMeshAnnotator<FixedFaces, CountingModel> {
        let translations = EmotionTranslationTable::new(vec![("happy".to_string(), "feliz".to_string())]);
        FaceMeshAnnotator::new(FixedFaces(faces), CountingModel { calls: 0, outcome }, translations)
    }

    fn black_frame() -> Mat {
        Mat::new_rows_cols_with_default(120, 160, CV_8UC3, Scalar::all(0.0)).unwrap()
    }

    #[test]
    fn test_bounding_box_from_landmarks() {
        let bbox = BoundingBox::from_landmarks(&square(10.0, 20.0, 30.0), 160, 120).unwrap();
        assert_eq!(
            bbox,
            BoundingBox {
                x_min: 10,
                y_min: 20,
                x_max: 40,
                y_max: 50
            }
        );
        assert_eq!(bbox.to_rect(), Rect::new(10, 20, 30, 30));
    }

    #[test]
    fn test_bounding_box_is_clipped() {
        let bbox = BoundingBox::from_landmarks(&square(-15.0, 100.0, 80.0), 160, 120).unwrap();
        assert_eq!(bbox.x_min, 0);
        assert_eq!(bbox.y_max, 119);
        assert!(bbox.x_min <= bbox.x_max && bbox.y_min <= bbox.y_max);

        assert!(BoundingBox::from_landmarks(&[], 160, 120).is_none());
        assert!(BoundingBox::from_landmarks(&square(0.0, 0.0, 5.0), 0, 0).is_none());
    }

    #[test]
    fn test_zero_faces() {
        let mut ann = annotator(Vec::new(), Ok("happy"));
        let mut frame = black_frame();
        let results = ann.analyze(&mut frame, true, true).unwrap();
        assert!(results.is_empty());
        assert_eq!(ann.classifier.calls, 0);
    }

    #[test]
    fn test_emotions_translated_and_skipped_when_disabled() {
        let mut ann = annotator(vec![square(10.0, 10.0, 40.0), square(90.0, 30.0, 40.0)], Ok("happy"));
        let mut frame = black_frame();

        let results = ann.analyze(&mut frame, false, false).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.dominant_emotion.is_none()));
        assert_eq!(ann.classifier.calls, 0);

        let results = ann.analyze(&mut frame, false, true).unwrap();
        assert_eq!(ann.classifier.calls, 2);
        assert!(results.iter().all(|r| r.dominant_emotion.as_deref() == Some("Feliz")));
        assert_eq!(results[0].crop_without_keypoints.size().unwrap(), Size::new(40, 40));
    }

    #[test]
    fn test_classifier_failure_becomes_sentinel() {
        let mut ann = annotator(vec![square(10.0, 10.0, 40.0)], Err("bad tensor"));
        let mut frame = black_frame();
        let results = ann.analyze(&mut frame, false, true).unwrap();
        assert_eq!(results[0].dominant_emotion.as_deref(), Some(NO_EMOTION_LABEL));
    }

    #[test]
    fn test_classifier_errors_become_recoverable() {
        let mut ann = annotator(vec![square(10.0, 10.0, 40.0)], Err("bad tensor"));
        let face = Mat::new_rows_cols_with_default(10, 10, CV_8UC3, Scalar::all(0.0)).unwrap();
        let err = ann.analyze_emotion(&face).unwrap_err();
        assert!(matches!(err, Error::Analysis(ref reason) if reason.contains("bad tensor")));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_zero_area_crop_is_not_classified() {
        let mut ann = annotator(vec![vec![Point2f::new(30.0, 30.0)]], Ok("happy"));
        let mut frame = black_frame();
        let results = ann.analyze(&mut frame, false, true).unwrap();
        assert_eq!(results[0].dominant_emotion.as_deref(), Some(NO_EMOTION_LABEL));
        assert!(results[0].crop_without_keypoints.empty());
        assert_eq!(ann.classifier.calls, 0);

        assert!(matches!(ann.analyze_emotion(&Mat::default()), Err(Error::Analysis(_))));
    }

    #[test]
    fn test_unknown_label_translates_to_sentinel() {
        let mut ann = annotator(vec![square(10.0, 10.0, 40.0)], Ok("contempt"));
        let face = Mat::new_rows_cols_with_default(10, 10, CV_8UC3, Scalar::all(0.0)).unwrap();
        assert_eq!(ann.analyze_emotion(&face).unwrap(), NO_EMOTION_LABEL);
    }

    #[test]
    fn test_keypoints_only_in_annotated_crop() {
        let mut ann = annotator(vec![square(10.0, 10.0, 40.0)], Ok("happy"));
        let mut frame = black_frame();
        let results = ann.analyze(&mut frame, true, false).unwrap();

        let black = Vec3b::from([0, 0, 0]);
        assert_ne!(*frame.at_2d::<Vec3b>(10, 10).unwrap(), black);
        assert_ne!(*results[0].crop_with_keypoints.at_2d::<Vec3b>(0, 0).unwrap(), black);
        assert_eq!(*results[0].crop_without_keypoints.at_2d::<Vec3b>(0, 0).unwrap(), black);
    }
}
