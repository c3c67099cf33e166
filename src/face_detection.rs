//! SCRFD face detector running on ONNX Runtime.

use crate::{
    constants::{IMAGE_NORMALIZATION_OFFSET, IMAGE_NORMALIZATION_SCALE},
    utils::safe_cast::{f64_to_i32, usize_to_i32},
    Error, Result,
};
use log::{debug, info};
use ndarray::{Array4, CowArray};
use opencv::core::{Mat, Rect, Scalar, Size, Vec3b, CV_8UC3};
use opencv::imgproc::{self, INTER_LINEAR};
use opencv::prelude::*;
use ort::{Environment, GraphOptimizationLevel, LoggingLevel, Session, SessionBuilder, Value};
use std::path::Path;
use std::sync::Arc;

/// Default SCRFD input resolution
const DEFAULT_INPUT_SIZE: i32 = 640;

/// Face detection result in source image coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceDetection {
    /// Bounding box of the detected face
    pub bbox: Rect,
    /// Confidence score of the detection
    pub score: f32,
}

/// How the model lays out its score/box outputs
#[derive(Debug, Clone, PartialEq, Eq)]
struct OutputLayout {
    strides: Vec<i32>,
    anchors_per_cell: usize,
    /// Distance between a stride's score output and its box output
    offset: usize,
}

impl OutputLayout {
    fn from_output_count(count: usize) -> Result<Self> {
        let (strides, anchors_per_cell) = match count {
            6 | 9 => (vec![8, 16, 32], 2),
            10 | 15 => (vec![8, 16, 32, 64, 128], 1),
            _ => {
                return Err(Error::ModelOutputError(format!(
                    "Unsupported SCRFD model with {count} outputs"
                )))
            }
        };
        let offset = strides.len();
        Ok(Self {
            strides,
            anchors_per_cell,
            offset,
        })
    }
}

/// Candidate box as `[x1, y1, x2, y2]` in model input coordinates
#[derive(Debug, Clone, Copy)]
struct Candidate {
    bbox: [f32; 4],
    score: f32,
}

/// SCRFD face detector using ONNX Runtime
pub struct FaceDetector {
    session: Session,
    input_size: (i32, i32),
    layout: OutputLayout,
    conf_threshold: f32,
    nms_threshold: f32,
}

impl FaceDetector {
    /// Create a new face detector from an ONNX model file
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be loaded or has an unknown output layout.
    pub fn new<P: AsRef<Path>>(model_path: P, conf_threshold: f32, nms_threshold: f32) -> Result<Self> {
        info!("Loading face detector from {}", model_path.as_ref().display());

        let environment = Arc::new(
            Environment::builder()
                .with_name("face_detector")
                .with_log_level(LoggingLevel::Warning)
                .build()?,
        );

        let session = SessionBuilder::new(&environment)?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_model_from_file(model_path)?;

        let input = session
            .inputs
            .first()
            .ok_or_else(|| Error::ModelInputError("Face detector has no inputs".to_string()))?;

        // [batch, channels, height, width]; dynamic axes fall back to the default size
        let dim = |idx: usize| {
            input
                .dimensions
                .get(idx)
                .copied()
                .flatten()
                .and_then(|d| i32::try_from(d).ok())
                .unwrap_or(DEFAULT_INPUT_SIZE)
        };
        let input_size = (dim(3), dim(2));

        let layout = OutputLayout::from_output_count(session.outputs.len())?;
        debug!("Face detector input {:?}, layout {:?}", input_size, layout);

        Ok(Self {
            session,
            input_size,
            layout,
            conf_threshold,
            nms_threshold,
        })
    }

    /// Detect faces in a BGR image, best score first
    ///
    /// # Errors
    ///
    /// Returns an error if preprocessing or inference fails.
    pub fn detect(&self, image: &Mat) -> Result<Vec<FaceDetection>> {
        if image.empty() {
            return Ok(Vec::new());
        }

        let (input_width, input_height) = self.input_size;
        let ratio_img = f64::from(image.rows()) / f64::from(image.cols());
        let ratio_model = f64::from(input_height) / f64::from(input_width);

        let (new_width, new_height) = if ratio_img > ratio_model {
            (f64_to_i32(f64::from(input_height) / ratio_img)?, input_height)
        } else {
            (input_width, f64_to_i32(f64::from(input_width) * ratio_img)?)
        };
        #[allow(clippy::cast_precision_loss)]
        let det_scale = new_height as f32 / image.rows() as f32;

        let mut resized = Mat::default();
        imgproc::resize(image, &mut resized, Size::new(new_width, new_height), 0.0, 0.0, INTER_LINEAR)?;

        // Letterbox into the model input, padding right/bottom with black
        let mut padded = Mat::new_rows_cols_with_default(input_height, input_width, CV_8UC3, Scalar::all(0.0))?;
        let mut roi = padded.roi_mut(Rect::new(0, 0, new_width, new_height))?;
        resized.copy_to(&mut roi)?;

        let blob = Self::preprocess(&padded)?;
        let candidates = self.forward(blob)?;

        Ok(self
            .suppress(candidates)
            .into_iter()
            .map(|c| to_detection(&c, det_scale))
            .collect())
    }

    /// BGR u8 image to normalized RGB NCHW tensor
    #[allow(clippy::cast_sign_loss)]
    fn preprocess(image: &Mat) -> Result<Array4<f32>> {
        let height = image.rows() as usize;
        let width = image.cols() as usize;
        let mut blob = Array4::<f32>::zeros((1, 3, height, width));

        for row in 0..height {
            for col in 0..width {
                let bgr = image.at_2d::<Vec3b>(usize_to_i32(row)?, usize_to_i32(col)?)?;
                for ch in 0..3 {
                    let value = f32::from(bgr[2 - ch]);
                    blob[[0, ch, row, col]] = (value - IMAGE_NORMALIZATION_OFFSET) / IMAGE_NORMALIZATION_SCALE;
                }
            }
        }

        Ok(blob)
    }

    /// Run the model and decode every anchor above the confidence threshold
    #[allow(clippy::cast_precision_loss)]
    fn forward(&self, blob: Array4<f32>) -> Result<Vec<Candidate>> {
        let (input_width, _) = self.input_size;
        let cow_array = CowArray::from(blob.into_dyn());
        let input_tensor = Value::from_array(self.session.allocator(), &cow_array)?;
        let outputs = self.session.run(vec![input_tensor])?;

        let mut candidates = Vec::new();
        for (idx, &stride) in self.layout.strides.iter().enumerate() {
            let scores: Vec<f32> = outputs
                .get(idx)
                .ok_or_else(|| Error::ModelOutputError(format!("Missing score output {idx}")))?
                .try_extract::<f32>()?
                .view()
                .iter()
                .copied()
                .collect();
            let distances: Vec<f32> = outputs
                .get(idx + self.layout.offset)
                .ok_or_else(|| Error::ModelOutputError(format!("Missing box output for stride {stride}")))?
                .try_extract::<f32>()?
                .view()
                .iter()
                .copied()
                .collect();

            if distances.len() < scores.len() * 4 {
                return Err(Error::ModelDataFormatError(format!(
                    "Stride {stride}: {} scores but {} box values",
                    scores.len(),
                    distances.len()
                )));
            }

            let cells_per_row = (input_width / stride) as usize;
            let stride_f = stride as f32;
            for (anchor, &score) in scores.iter().enumerate() {
                if score < self.conf_threshold {
                    continue;
                }
                let cell = anchor / self.layout.anchors_per_cell;
                let cx = (cell % cells_per_row) as f32 * stride_f;
                let cy = (cell / cells_per_row) as f32 * stride_f;
                let d = &distances[anchor * 4..anchor * 4 + 4];
                candidates.push(Candidate {
                    bbox: [
                        cx - d[0] * stride_f,
                        cy - d[1] * stride_f,
                        cx + d[2] * stride_f,
                        cy + d[3] * stride_f,
                    ],
                    score,
                });
            }
        }

        Ok(candidates)
    }

    /// Greedy non-maximum suppression, highest score first
    fn suppress(&self, mut candidates: Vec<Candidate>) -> Vec<Candidate> {
        candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

        let mut keep: Vec<Candidate> = Vec::new();
        for candidate in candidates {
            if keep.iter().all(|kept| iou(&kept.bbox, &candidate.bbox) <= self.nms_threshold) {
                keep.push(candidate);
            }
        }
        keep
    }
}

/// Intersection over union with inclusive pixel edges
fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let area = |r: &[f32; 4]| (r[2] - r[0] + 1.0) * (r[3] - r[1] + 1.0);
    let w = (a[2].min(b[2]) - a[0].max(b[0]) + 1.0).max(0.0);
    let h = (a[3].min(b[3]) - a[1].max(b[1]) + 1.0).max(0.0);
    let inter = w * h;
    inter / (area(a) + area(b) - inter)
}

#[allow(clippy::cast_possible_truncation)]
fn to_detection(candidate: &Candidate, det_scale: f32) -> FaceDetection {
    let [x1, y1, x2, y2] = candidate.bbox.map(|v| v / det_scale);
    FaceDetection {
        bbox: Rect::new(x1 as i32, y1 as i32, (x2 - x1) as i32, (y2 - y1) as i32),
        score: candidate.score,
    }
}
