//! Per-frame pipeline: resize to display size, analyze faces, label emotions.

use crate::{
    annotation::{FaceAnnotator, FaceResult},
    constants::{EMOTION_LABEL_OFFSET, LABEL_MARGIN},
    utils::{draw_label, resize_frame},
    Result,
};
use opencv::core::{Mat, Point};

/// Analyze `frame` in place and draw an emotion label above each face
///
/// Labels are drawn only with `show_emotions` and only for faces that have a
/// non-empty label. Results come back in the annotator's order.
///
/// # Errors
///
/// Returns an error if the annotator or label drawing fails.
pub fn annotate_faces<A: FaceAnnotator + ?Sized>(
    frame: &mut Mat,
    annotator: &mut A,
    show_keypoints: bool,
    show_emotions: bool,
) -> Result<Vec<FaceResult>> {
    let faces = annotator.analyze(frame, show_keypoints, show_emotions)?;

    if show_emotions {
        for face in &faces {
            let Some(label) = face.dominant_emotion.as_deref().filter(|l| !l.is_empty()) else {
                continue;
            };
            let anchor = Point::new(
                face.bounding_box.x_min,
                face.bounding_box.y_min - EMOTION_LABEL_OFFSET,
            );
            draw_label(frame, label, anchor, LABEL_MARGIN)?;
        }
    }

    Ok(faces)
}

/// Resize a raw frame to display dimensions and annotate it
///
/// `raw_frame` is never modified; all drawing happens on the resized copy, which
/// is returned as the display frame.
///
/// # Errors
///
/// Returns an error if resizing, analysis or drawing fails.
pub fn process_frame<A: FaceAnnotator + ?Sized>(
    raw_frame: &Mat,
    annotator: &mut A,
    target_width: Option<i32>,
    target_height: Option<i32>,
    show_keypoints: bool,
    show_emotions: bool,
) -> Result<(Vec<FaceResult>, Mat)> {
    let mut display_frame = resize_frame(raw_frame, target_width, target_height)?;
    let faces = annotate_faces(&mut display_frame, annotator, show_keypoints, show_emotions)?;
    Ok((faces, display_frame))
}
