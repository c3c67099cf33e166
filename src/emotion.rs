//! Facial expression classifier running on ONNX Runtime.

use crate::{
    annotation::EmotionModel,
    constants::EMOTION_LABELS,
    utils::safe_cast::usize_to_i32,
    Error, Result,
};
use log::{debug, info};
use ndarray::{Array4, CowArray};
use opencv::core::{Mat, Size, CV_32F};
use opencv::imgproc::{self, INTER_AREA};
use opencv::prelude::*;
use ort::{Environment, GraphOptimizationLevel, LoggingLevel, Session, SessionBuilder, Value};
use std::path::Path;
use std::sync::Arc;

/// Input resolution of the common 48x48 grayscale FER models
const DEFAULT_EMOTION_INPUT_SIZE: i32 = 48;

/// Tensor layout expected by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputLayout {
    /// Square input side in pixels
    pub size: i32,
    /// 1 for grayscale, 3 for RGB
    pub channels: i32,
    /// Channels-first (`NCHW`) instead of channels-last (`NHWC`)
    pub channels_first: bool,
}

impl Default for InputLayout {
    fn default() -> Self {
        Self {
            size: DEFAULT_EMOTION_INPUT_SIZE,
            channels: 1,
            channels_first: false,
        }
    }
}

impl InputLayout {
    /// Infer the layout from a 4-D model input shape; unknown axes use the defaults
    #[must_use]
    pub fn from_dimensions(dims: &[Option<i32>]) -> Self {
        let default = Self::default();
        if dims.len() != 4 {
            return default;
        }

        let is_channels = |d: Option<i32>| matches!(d, Some(1 | 3));
        if is_channels(dims[1]) && !is_channels(dims[3]) {
            Self {
                size: dims[2].unwrap_or(default.size),
                channels: dims[1].unwrap_or(default.channels),
                channels_first: true,
            }
        } else {
            Self {
                size: dims[1].unwrap_or(default.size),
                channels: dims[3].unwrap_or(default.channels),
                channels_first: false,
            }
        }
    }
}

/// Index and probability of the most likely class after a softmax
#[must_use]
pub fn dominant_class(logits: &[f32]) -> Option<(usize, f32)> {
    let max_logit = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if !max_logit.is_finite() {
        return None;
    }
    let exp_sum: f32 = logits.iter().map(|&x| (x - max_logit).exp()).sum();

    logits
        .iter()
        .map(|&x| (x - max_logit).exp() / exp_sum)
        .enumerate()
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
}

/// Seven-class facial expression classifier
pub struct EmotionClassifier {
    session: Session,
    layout: InputLayout,
}

impl EmotionClassifier {
    /// Load the classifier from an ONNX model file
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be loaded or has no inputs.
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        info!("Loading emotion classifier from {}", model_path.as_ref().display());

        let environment = Arc::new(
            Environment::builder()
                .with_name("emotion_classifier")
                .with_log_level(LoggingLevel::Warning)
                .build()?,
        );

        let session = SessionBuilder::new(&environment)?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_model_from_file(model_path)?;

        let input = session
            .inputs
            .first()
            .ok_or_else(|| Error::ModelInputError("Emotion model has no inputs".to_string()))?;
        let dims: Vec<Option<i32>> = input
            .dimensions
            .iter()
            .map(|d| d.and_then(|v| i32::try_from(v).ok()))
            .collect();
        let layout = InputLayout::from_dimensions(&dims);
        debug!("Emotion classifier input layout {:?}", layout);

        Ok(Self { session, layout })
    }

    /// Resize and normalize a BGR face crop into the model's input tensor
    #[allow(clippy::cast_sign_loss)]
    fn preprocess(&self, face: &Mat) -> Result<Array4<f32>> {
        let code = if self.layout.channels == 1 {
            imgproc::COLOR_BGR2GRAY
        } else {
            imgproc::COLOR_BGR2RGB
        };
        let mut converted = Mat::default();
        imgproc::cvt_color(face, &mut converted, code, 0)?;

        let mut resized = Mat::default();
        imgproc::resize(
            &converted,
            &mut resized,
            Size::new(self.layout.size, self.layout.size),
            0.0,
            0.0,
            INTER_AREA,
        )?;

        let mut float_image = Mat::default();
        resized.convert_to(&mut float_image, CV_32F, 1.0 / 255.0, 0.0)?;

        let size = self.layout.size as usize;
        let channels = self.layout.channels as usize;
        let shape = if self.layout.channels_first {
            (1, channels, size, size)
        } else {
            (1, size, size, channels)
        };
        let mut array = Array4::<f32>::zeros(shape);

        for row in 0..size {
            for col in 0..size {
                let (r, c) = (usize_to_i32(row)?, usize_to_i32(col)?);
                for ch in 0..channels {
                    let value = if channels == 1 {
                        *float_image.at_2d::<f32>(r, c)?
                    } else {
                        float_image.at_2d::<opencv::core::Vec3f>(r, c)?[ch]
                    };
                    if self.layout.channels_first {
                        array[[0, ch, row, col]] = value;
                    } else {
                        array[[0, row, col, ch]] = value;
                    }
                }
            }
        }

        Ok(array)
    }
}

impl EmotionModel for EmotionClassifier {
    fn classify(&mut self, face: &Mat) -> Result<String> {
        if face.empty() {
            return Err(Error::Analysis("face crop has zero area".to_string()));
        }

        let input = self.preprocess(face)?;
        let cow_array = CowArray::from(input.into_dyn());
        let input_tensor = Value::from_array(self.session.allocator(), &cow_array)?;
        let outputs = self.session.run(vec![input_tensor])?;

        let logits: Vec<f32> = outputs
            .first()
            .ok_or_else(|| Error::ModelOutputError("No output from emotion model".to_string()))?
            .try_extract::<f32>()?
            .view()
            .iter()
            .copied()
            .collect();

        if logits.len() != EMOTION_LABELS.len() {
            return Err(Error::ModelOutputError(format!(
                "Expected {} emotion scores, got {}",
                EMOTION_LABELS.len(),
                logits.len()
            )));
        }

        let (index, probability) =
            dominant_class(&logits).ok_or_else(|| Error::Analysis("classifier returned no finite scores".to_string()))?;
        debug!("Dominant emotion {} ({:.2})", EMOTION_LABELS[index], probability);

        Ok(EMOTION_LABELS[index].to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_defaults_for_dynamic_shapes() {
        assert_eq!(InputLayout::from_dimensions(&[]), InputLayout::default());
        assert_eq!(
            InputLayout::from_dimensions(&[None, None, None, None]),
            InputLayout::default()
        );
    }

    #[test]
    fn test_layout_channels_last() {
        let layout = InputLayout::from_dimensions(&[None, Some(48), Some(48), Some(1)]);
        assert_eq!(
            layout,
            InputLayout {
                size: 48,
                channels: 1,
                channels_first: false
            }
        );
    }

    #[test]
    fn test_layout_channels_first() {
        let layout = InputLayout::from_dimensions(&[Some(1), Some(3), Some(224), Some(224)]);
        assert_eq!(
            layout,
            InputLayout {
                size: 224,
                channels: 3,
                channels_first: true
            }
        );
    }

    #[test]
    fn test_dominant_class() {
        let (index, probability) = dominant_class(&[0.1, 2.0, 0.3, 5.0, 0.0, 0.0, 1.0]).unwrap();
        assert_eq!(index, 3);
        assert!(probability > 0.5 && probability <= 1.0);

        assert!(dominant_class(&[]).is_none());
        assert!(dominant_class(&[f32::NAN, f32::NAN]).is_none());
    }

    #[test]
    fn test_labels_match_fer_order() {
        assert_eq!(EMOTION_LABELS[0], "angry");
        assert_eq!(EMOTION_LABELS[3], "happy");
        assert_eq!(EMOTION_LABELS[6], "neutral");
    }
}
