//! 68-point facial landmark detection and keypoint drawing.

use crate::{
    annotation::LandmarkSource,
    constants::{LANDMARK_BOX_SHIFT, NUM_FACIAL_LANDMARKS},
    face_detection::FaceDetector,
    utils::safe_cast::{f32_to_i32_clamp, usize_to_i32},
    Error, Result,
};
use log::{debug, info};
use ndarray::{Array4, CowArray};
use opencv::core::{Mat, Point, Point2f, Rect, Scalar, Size, CV_32F};
use opencv::imgproc::{self, INTER_LINEAR, LINE_8, LINE_AA};
use opencv::prelude::*;
use ort::{Environment, GraphOptimizationLevel, LoggingLevel, Session, SessionBuilder, Value};
use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

/// Default landmark detector input size
const DEFAULT_LANDMARK_INPUT_SIZE: i32 = 128;

/// Open polylines of the 68-point layout: jaw, brows, nose bridge, lower nose
static OPEN_CONTOURS: [Range<usize>; 5] = [0..17, 17..22, 22..27, 27..31, 31..36];

/// Closed polylines: eyes and lips
static CLOSED_CONTOURS: [Range<usize>; 4] = [36..42, 42..48, 48..60, 60..68];

/// Facial landmark detector using `ONNX` Runtime
pub struct LandmarkDetector {
    session: Session,
    input_size: i32,
}

impl LandmarkDetector {
    /// Create a new landmark detector from an `ONNX` model file
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be loaded or has no inputs/outputs.
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        info!("Loading landmark detector from {}", model_path.as_ref().display());

        let environment = Arc::new(
            Environment::builder()
                .with_name("landmark_detector")
                .with_log_level(LoggingLevel::Warning)
                .build()?,
        );

        let session = SessionBuilder::new(&environment)?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_model_from_file(model_path)?;

        if session.inputs.is_empty() {
            return Err(Error::ModelInputError("Landmark model has no inputs".to_string()));
        }
        if session.outputs.is_empty() {
            return Err(Error::ModelOutputError("Landmark model has no outputs".to_string()));
        }

        Ok(Self {
            session,
            input_size: DEFAULT_LANDMARK_INPUT_SIZE,
        })
    }

    /// Detect landmarks in a face crop, in crop pixel coordinates
    ///
    /// # Errors
    ///
    /// Returns an error if preprocessing or inference fails.
    pub fn detect(&self, face_image: &Mat) -> Result<Vec<Point2f>> {
        let input = self.preprocess(face_image)?;

        let cow_array = CowArray::from(input.into_dyn());
        let input_tensor = Value::from_array(self.session.allocator(), &cow_array)?;
        let outputs = self.session.run(vec![input_tensor])?;

        let marks: Vec<f32> = outputs
            .first()
            .ok_or_else(|| Error::ModelOutputError("No output from landmark model".to_string()))?
            .try_extract::<f32>()?
            .view()
            .iter()
            .copied()
            .collect();

        if marks.len() < NUM_FACIAL_LANDMARKS * 2 {
            return Err(Error::ModelDataFormatError(format!(
                "Expected {} landmark values, got {}",
                NUM_FACIAL_LANDMARKS * 2,
                marks.len()
            )));
        }

        Ok(self.postprocess(&marks, face_image.size()?))
    }

    /// Resize to the model input and convert to normalized RGB NHWC
    #[allow(clippy::cast_sign_loss)]
    fn preprocess(&self, image: &Mat) -> Result<Array4<f32>> {
        let mut resized = Mat::default();
        imgproc::resize(
            image,
            &mut resized,
            Size::new(self.input_size, self.input_size),
            0.0,
            0.0,
            INTER_LINEAR,
        )?;

        let mut rgb_image = Mat::default();
        imgproc::cvt_color(&resized, &mut rgb_image, imgproc::COLOR_BGR2RGB, 0)?;

        let mut float_image = Mat::default();
        rgb_image.convert_to(&mut float_image, CV_32F, 1.0 / 255.0, 0.0)?;

        let size = self.input_size as usize;
        let mut array = Array4::<f32>::zeros((1, size, size, 3));
        for row in 0..size {
            for col in 0..size {
                let pixel = float_image.at_2d::<opencv::core::Vec3f>(usize_to_i32(row)?, usize_to_i32(col)?)?;
                for ch in 0..3 {
                    array[[0, row, col, ch]] = pixel[ch];
                }
            }
        }

        Ok(array)
    }

    /// Scale model-space marks to the crop size
    #[allow(clippy::cast_precision_loss)]
    fn postprocess(&self, marks: &[f32], crop: Size) -> Vec<Point2f> {
        let scale_x = crop.width as f32 / self.input_size as f32;
        let scale_y = crop.height as f32 / self.input_size as f32;

        marks
            .chunks_exact(2)
            .take(NUM_FACIAL_LANDMARKS)
            .map(|xy| Point2f::new(xy[0] * scale_x, xy[1] * scale_y))
            .collect()
    }
}

/// Expand a face box by `shift` of its size on every side and make it square,
/// keeping it inside the image
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn expand_to_square(bbox: Rect, max_width: i32, max_height: i32, shift: f32) -> Rect {
    let x_shift = f32_to_i32_clamp(bbox.width as f32 * shift, 0, max_width);
    let y_shift = f32_to_i32_clamp(bbox.height as f32 * shift, 0, max_height);

    let x = (bbox.x - x_shift).max(0);
    let y = (bbox.y - y_shift).max(0);
    let width = (bbox.width + 2 * x_shift).min(max_width - x);
    let height = (bbox.height + 2 * y_shift).min(max_height - y);

    let side = width.max(height).min(max_width).min(max_height);
    let x = x.min(max_width - side);
    let y = y.min(max_height - side);

    Rect::new(x, y, side, side)
}

/// Draw landmark points and the contour lines connecting them
///
/// Sets that are not 68 points long only get their points drawn.
///
/// # Errors
///
/// Returns an error if any `OpenCV` drawing call fails.
#[allow(clippy::cast_possible_truncation)]
pub fn draw_keypoints(frame: &mut Mat, landmarks: &[Point2f]) -> Result<()> {
    let to_point = |p: &Point2f| Point::new(p.x.round() as i32, p.y.round() as i32);
    let line_color = Scalar::new(192.0, 192.0, 192.0, 0.0);
    let point_color = Scalar::new(0.0, 0.0, 255.0, 0.0);

    if landmarks.len() == NUM_FACIAL_LANDMARKS {
        let segments = OPEN_CONTOURS
            .iter()
            .flat_map(|range| range.clone().zip(range.clone().skip(1)))
            .chain(
                CLOSED_CONTOURS
                    .iter()
                    .flat_map(|range| range.clone().zip(range.clone().skip(1).chain(std::iter::once(range.start)))),
            );
        for (a, b) in segments {
            imgproc::line(frame, to_point(&landmarks[a]), to_point(&landmarks[b]), line_color, 1, LINE_AA, 0)?;
        }
    }

    for landmark in landmarks {
        imgproc::circle(frame, to_point(landmark), 1, point_color, -1, LINE_8, 0)?;
    }

    Ok(())
}

/// Face detector plus landmark model, producing landmarks in frame coordinates
pub struct FaceMesh {
    detector: FaceDetector,
    landmarks: LandmarkDetector,
    max_faces: usize,
}

impl FaceMesh {
    /// Combine a detector and a landmark model
    #[must_use]
    pub fn new(detector: FaceDetector, landmarks: LandmarkDetector, max_faces: usize) -> Self {
        Self {
            detector,
            landmarks,
            max_faces,
        }
    }
}

impl LandmarkSource for FaceMesh {
    fn locate(&mut self, frame: &Mat) -> Result<Vec<Vec<Point2f>>> {
        let faces = self.detector.detect(frame)?;
        debug!("Detected {} face(s)", faces.len());

        let mut result = Vec::new();
        for face in faces.iter().take(self.max_faces) {
            let region = expand_to_square(face.bbox, frame.cols(), frame.rows(), LANDMARK_BOX_SHIFT);
            if region.width <= 0 || region.height <= 0 {
                continue;
            }

            let crop = Mat::roi(frame, region)?.try_clone()?;
            #[allow(clippy::cast_precision_loss)]
            let marks = self
                .landmarks
                .detect(&crop)?
                .into_iter()
                .map(|p| Point2f::new(p.x + region.x as f32, p.y + region.y as f32))
                .collect();
            result.push(marks);
        }

        Ok(result)
    }
}
