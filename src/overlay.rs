//! Translucent message panel composed on top of the display frame.

use crate::{
    constants::{
        HELP_LINE_HEIGHT, HELP_PANEL_WIDTH, HELP_TEXT_INSET, HINT_BAR_HEIGHT, HINT_BAR_WIDTH, HINT_BAR_X,
        HINT_TEXT, HINT_TEXT_X, HINT_TEXT_Y, MESSAGE_FONT_SCALE, MESSAGE_THICKNESS, OVERLAY_ALPHA,
    },
    tables::MessageTable,
    utils::{clip_rect, safe_cast::usize_to_i32},
    Result,
};
use opencv::{
    core::{self, Mat, Point, Rect, Scalar},
    imgproc::{self, FONT_HERSHEY_SIMPLEX, LINE_8},
    prelude::*,
};

/// Area covered by the help menu, anchored to the top-right corner
///
/// # Errors
///
/// Returns an error if the message count does not fit a pixel coordinate.
pub fn help_panel_rect(display_width: i32, message_count: usize) -> Result<Rect> {
    let lines = usize_to_i32(message_count)?;
    Ok(Rect::new(
        display_width - HELP_PANEL_WIDTH,
        0,
        HELP_PANEL_WIDTH,
        HELP_LINE_HEIGHT + HELP_LINE_HEIGHT * lines,
    ))
}

/// Area covered by the hint bar near the top-left corner
#[must_use]
pub fn hint_bar_rect() -> Rect {
    Rect::new(HINT_BAR_X, 0, HINT_BAR_WIDTH, HINT_BAR_HEIGHT)
}

/// Darken `rect` by blending it with black at [`OVERLAY_ALPHA`]
///
/// Only pixels inside the (clipped) rectangle are written.
///
/// # Errors
///
/// Returns an error if any `OpenCV` operation fails.
pub fn blend_panel(frame: &mut Mat, rect: Rect, alpha: f64) -> Result<()> {
    let Some(rect) = clip_rect(rect, frame.cols(), frame.rows()) else {
        return Ok(());
    };

    let region = Mat::roi(frame, rect)?.try_clone()?;
    let background = Mat::new_rows_cols_with_default(rect.height, rect.width, region.typ(), Scalar::all(0.0))?;

    let mut blended = Mat::default();
    core::add_weighted(&region, 1.0 - alpha, &background, alpha, 0.0, &mut blended, -1)?;

    let mut target = frame.roi_mut(rect)?;
    blended.copy_to(&mut target)?;
    Ok(())
}

fn put_message(frame: &mut Mat, text: &str, origin: Point) -> Result<()> {
    imgproc::put_text(
        frame,
        text,
        origin,
        FONT_HERSHEY_SIMPLEX,
        MESSAGE_FONT_SCALE,
        Scalar::all(255.0),
        MESSAGE_THICKNESS,
        LINE_8,
        false,
    )?;
    Ok(())
}

/// Compose the help menu or the hint bar onto the frame
///
/// With `show_help` every message is drawn on its own line inside a translucent
/// panel at the top-right; otherwise a single hint line is drawn at the top-left.
/// Pixels outside the panel are left untouched.
///
/// # Errors
///
/// Returns an error if any `OpenCV` drawing call fails.
pub fn compose_overlay(frame: &mut Mat, messages: &MessageTable, display_width: i32, show_help: bool) -> Result<()> {
    if show_help {
        blend_panel(frame, help_panel_rect(display_width, messages.len())?, OVERLAY_ALPHA)?;

        let text_x = display_width - HELP_TEXT_INSET;
        for (idx, message) in messages.messages().enumerate() {
            let y = HELP_LINE_HEIGHT + HELP_LINE_HEIGHT * usize_to_i32(idx)?;
            put_message(frame, message, Point::new(text_x, y))?;
        }
    } else {
        blend_panel(frame, hint_bar_rect(), OVERLAY_ALPHA)?;
        put_message(frame, HINT_TEXT, Point::new(HINT_TEXT_X, HINT_TEXT_Y))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::{Vec3b, CV_8UC3};

    fn frame(rows: i32, cols: i32, value: f64) -> Mat {
        Mat::new_rows_cols_with_default(rows, cols, CV_8UC3, Scalar::all(value)).unwrap()
    }

    fn pixel(frame: &Mat, row: i32, col: i32) -> Vec3b {
        *frame.at_2d::<Vec3b>(row, col).unwrap()
    }

    #[test]
    fn test_help_panel_rect_grows_with_messages() {
        assert_eq!(help_panel_rect(640, 0).unwrap(), Rect::new(370, 0, 270, 30));
        assert_eq!(help_panel_rect(640, 5).unwrap(), Rect::new(370, 0, 270, 180));
    }

    #[test]
    fn test_blend_panel_halves_inside_only() {
        let mut image = frame(100, 100, 200.0);
        blend_panel(&mut image, Rect::new(10, 10, 20, 20), 0.5).unwrap();

        assert_eq!(pixel(&image, 15, 15), Vec3b::from([100, 100, 100]));
        assert_eq!(pixel(&image, 5, 5), Vec3b::from([200, 200, 200]));
        assert_eq!(pixel(&image, 30, 30), Vec3b::from([200, 200, 200]));
    }

    #[test]
    fn test_blend_panel_outside_frame_is_noop() {
        let mut image = frame(50, 50, 80.0);
        blend_panel(&mut image, Rect::new(60, 0, 20, 20), 0.5).unwrap();
        assert_eq!(pixel(&image, 0, 49), Vec3b::from([80, 80, 80]));
    }

    #[test]
    fn test_hint_bar_leaves_rest_of_frame() {
        let mut image = frame(240, 320, 200.0);
        let messages = MessageTable::default();
        compose_overlay(&mut image, &messages, 320, false).unwrap();

        // Left edge of the bar, before the hint text starts, is blended
        assert_eq!(pixel(&image, 22, 6), Vec3b::from([100, 100, 100]));
        // Left of the bar and below it the frame is untouched
        assert_eq!(pixel(&image, 10, 2), Vec3b::from([200, 200, 200]));
        assert_eq!(pixel(&image, 120, 160), Vec3b::from([200, 200, 200]));
    }
}
