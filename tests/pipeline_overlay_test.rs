//! Frame geometry, pipeline and overlay properties

mod test_helpers;

use emotion_viewer::{
    annotation::{BoundingBox, FaceAnnotator, FaceResult},
    overlay::{compose_overlay, help_panel_rect},
    pipeline::process_frame,
    tables::MessageTable,
    utils::{resize_frame, target_size},
    Result,
};
use opencv::{
    core::{self, Mat, Size, Vec3b, CV_8UC3},
    prelude::*,
};
use proptest::prelude::*;
use test_helpers::{create_test_image, sample_messages, solid_frame};

/// Returns the same faces for every frame, in a fixed order
struct FixedFaces {
    boxes: Vec<BoundingBox>,
}

impl FaceAnnotator for FixedFaces {
    fn analyze(&mut self, _frame: &mut Mat, _show_keypoints: bool, show_emotions: bool) -> Result<Vec<FaceResult>> {
        Ok(self
            .boxes
            .iter()
            .map(|&bounding_box| FaceResult {
                bounding_box,
                dominant_emotion: show_emotions.then(|| "Neutro".to_string()),
                crop_with_keypoints: Mat::default(),
                crop_without_keypoints: Mat::default(),
            })
            .collect())
    }
}

fn frames_equal(a: &Mat, b: &Mat) -> bool {
    let mut diff = Mat::default();
    core::absdiff(a, b, &mut diff).unwrap();
    let sum = core::sum_elems(&diff).unwrap();
    sum.0.iter().all(|&v| v == 0.0)
}

#[test]
fn test_resize_without_targets_is_identity() {
    let image = solid_frame(37, 91, 42.0);
    let resized = resize_frame(&image, None, None).unwrap();
    assert_eq!(resized.size().unwrap(), image.size().unwrap());
    assert!(frames_equal(&image, &resized));
}

#[test]
fn test_height_only_derives_width() {
    let image = create_test_image(240, 320, CV_8UC3).unwrap();
    let resized = resize_frame(&image, None, Some(120)).unwrap();
    assert_eq!(resized.size().unwrap(), Size::new(160, 120));
}

#[test]
fn test_width_wins_over_height() {
    let dim = target_size(Size::new(320, 240), Some(160), Some(1000)).unwrap();
    assert_eq!(dim, Some(Size::new(160, 120)));
}

#[test]
fn test_pipeline_preserves_count_and_order() {
    let boxes = vec![
        BoundingBox {
            x_min: 200,
            y_min: 100,
            x_max: 240,
            y_max: 140,
        },
        BoundingBox {
            x_min: 20,
            y_min: 60,
            x_max: 60,
            y_max: 100,
        },
    ];
    let mut annotator = FixedFaces { boxes: boxes.clone() };
    let raw = solid_frame(240, 320, 128.0);
    let pristine = raw.try_clone().unwrap();

    let (faces, display) = process_frame(&raw, &mut annotator, None, None, true, true).unwrap();

    let returned: Vec<BoundingBox> = faces.iter().map(|f| f.bounding_box).collect();
    assert_eq!(returned, boxes);
    assert!(faces.iter().all(|f| f.dominant_emotion.as_deref() == Some("Neutro")));
    assert!(frames_equal(&raw, &pristine));
    assert!(!frames_equal(&display, &pristine));
}

#[test]
fn test_label_near_top_edge_is_clipped() {
    let mut annotator = FixedFaces {
        boxes: vec![BoundingBox {
            x_min: 10,
            y_min: 2,
            x_max: 50,
            y_max: 42,
        }],
    };
    let raw = solid_frame(100, 100, 128.0);
    let (faces, display) = process_frame(&raw, &mut annotator, None, None, false, true).unwrap();
    assert_eq!(faces.len(), 1);
    assert_eq!(display.size().unwrap(), Size::new(100, 100));
}

#[test]
fn test_help_overlay_only_touches_panel() {
    let messages = sample_messages();
    let original = solid_frame(200, 640, 180.0);
    let mut frame = original.try_clone().unwrap();

    compose_overlay(&mut frame, &messages, 640, true).unwrap();

    let panel = help_panel_rect(640, messages.len()).unwrap();
    for (row, col) in [(150, 100), (10, 300), (panel.height + 5, 600)] {
        assert_eq!(
            *frame.at_2d::<Vec3b>(row, col).unwrap(),
            Vec3b::from([180, 180, 180]),
            "pixel ({row}, {col}) outside the panel changed"
        );
    }
    // Right edge of the panel, past the text, is half as bright
    assert_eq!(*frame.at_2d::<Vec3b>(panel.height - 5, 635).unwrap(), Vec3b::from([90, 90, 90]));
}

#[test]
fn test_help_overlay_draws_each_message() {
    let one = MessageTable::new(vec![("quit".to_string(), "[Q] Quit".to_string())]);
    let mut frame = solid_frame(200, 640, 0.0);
    compose_overlay(&mut frame, &one, 640, true).unwrap();

    // The second line's slot stays dark with a single message
    let mut lit = 0;
    for row in 45..65 {
        for col in 390..500 {
            if frame.at_2d::<Vec3b>(row, col).unwrap()[0] > 0 {
                lit += 1;
            }
        }
    }
    assert_eq!(lit, 0);

    let mut frame = solid_frame(200, 640, 0.0);
    compose_overlay(&mut frame, &sample_messages(), 640, true).unwrap();
    let drawn = (45..65).any(|row| (390..500).any(|col| frame.at_2d::<Vec3b>(row, col).unwrap()[0] > 0));
    assert!(drawn);
}

proptest! {
    #[test]
    fn prop_width_only_preserves_aspect_ratio(
        src_w in 16i32..1920,
        src_h in 16i32..1080,
        target_w in 16i32..1920,
    ) {
        let dim = target_size(Size::new(src_w, src_h), Some(target_w), None);
        if let Ok(Some(dim)) = dim {
            prop_assert_eq!(dim.width, target_w);
            let expected = f64::from(src_h) * f64::from(target_w) / f64::from(src_w);
            prop_assert!((f64::from(dim.height) - expected).abs() <= 1.0);
        }
    }

    #[test]
    fn prop_zero_faces_keep_resized_dimensions(
        src_w in 32i32..320,
        src_h in 32i32..240,
        target_w in 32i32..320,
    ) {
        let raw = solid_frame(src_h, src_w, 64.0);
        let mut annotator = FixedFaces { boxes: Vec::new() };
        let expected = resize_frame(&raw, Some(target_w), None).unwrap().size().unwrap();
        let (faces, display) = process_frame(&raw, &mut annotator, Some(target_w), None, true, true).unwrap();
        prop_assert!(faces.is_empty());
        prop_assert_eq!(display.size().unwrap(), expected);
    }
}
