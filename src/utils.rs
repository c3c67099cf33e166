//! Geometry and drawing primitives shared by the pipeline and overlays.

pub mod safe_cast;

use crate::{
    constants::{LABEL_FONT_SCALE, LABEL_THICKNESS},
    Error, Result,
};
use opencv::{
    core::{Mat, Point, Rect, Scalar, Size},
    imgproc::{self, FONT_HERSHEY_SIMPLEX, INTER_AREA, INTER_LINEAR, LINE_8, LINE_AA},
    prelude::*,
};
use safe_cast::f64_to_i32;

/// Compute the output size for a resize that preserves aspect ratio
///
/// Returns `None` when neither dimension is requested. When only the height is
/// given the width follows the source aspect ratio; otherwise the width wins and
/// the height is derived from it.
///
/// # Errors
///
/// Returns an error if the source or requested dimensions are not positive, or the
/// derived dimension collapses to zero.
pub fn target_size(src: Size, width: Option<i32>, height: Option<i32>) -> Result<Option<Size>> {
    if width.is_none() && height.is_none() {
        return Ok(None);
    }
    if src.width <= 0 || src.height <= 0 {
        return Err(Error::InvalidInput(format!(
            "Cannot resize an empty frame ({}x{})",
            src.width, src.height
        )));
    }

    let size = if let Some(w) = width {
        if w <= 0 {
            return Err(Error::InvalidInput(format!("Target width must be positive, got {w}")));
        }
        let ratio = f64::from(w) / f64::from(src.width);
        Size::new(w, f64_to_i32(f64::from(src.height) * ratio)?)
    } else {
        let h = height.unwrap_or(src.height);
        if h <= 0 {
            return Err(Error::InvalidInput(format!("Target height must be positive, got {h}")));
        }
        let ratio = f64::from(h) / f64::from(src.height);
        Size::new(f64_to_i32(f64::from(src.width) * ratio)?, h)
    };

    if size.width == 0 || size.height == 0 {
        return Err(Error::InvalidInput(format!(
            "Resizing {}x{} to {:?}x{:?} collapses the frame",
            src.width, src.height, width, height
        )));
    }

    Ok(Some(size))
}

/// Resize a frame to the requested display dimensions, preserving aspect ratio
///
/// The input is never modified. With no target dimensions a copy of the input is
/// returned. Shrinking uses area interpolation; enlarging uses bilinear.
///
/// # Errors
///
/// Returns an error if the target size is invalid or `OpenCV` fails to resize.
pub fn resize_frame(image: &Mat, width: Option<i32>, height: Option<i32>) -> Result<Mat> {
    let Some(dim) = target_size(image.size()?, width, height)? else {
        return Ok(image.try_clone()?);
    };

    let interpolation = if dim.width < image.cols() { INTER_AREA } else { INTER_LINEAR };

    let mut resized = Mat::default();
    imgproc::resize(image, &mut resized, dim, 0.0, 0.0, interpolation)?;
    Ok(resized)
}

/// Intersect a rectangle with the frame area
#[must_use]
pub fn clip_rect(rect: Rect, width: i32, height: i32) -> Option<Rect> {
    let x1 = rect.x.max(0);
    let y1 = rect.y.max(0);
    let x2 = (rect.x + rect.width).min(width);
    let y2 = (rect.y + rect.height).min(height);

    if x2 > x1 && y2 > y1 {
        Some(Rect::new(x1, y1, x2 - x1, y2 - y1))
    } else {
        None
    }
}

/// Draw an opaque label box with text whose bottom-left corner sits at `anchor`
///
/// The box is the text extent plus `margin` on every side. Parts falling outside the
/// frame are clipped by `OpenCV`.
///
/// # Errors
///
/// Returns an error if any `OpenCV` drawing call fails.
pub fn draw_label(frame: &mut Mat, text: &str, anchor: Point, margin: i32) -> Result<()> {
    let mut baseline = 0;
    let text_size = imgproc::get_text_size(text, FONT_HERSHEY_SIMPLEX, LABEL_FONT_SCALE, LABEL_THICKNESS, &mut baseline)?;
    let box_width = text_size.width + 2 * margin;
    let box_height = text_size.height + 2 * margin;

    imgproc::rectangle(
        frame,
        Rect::new(anchor.x, anchor.y - box_height, box_width, box_height),
        Scalar::all(0.0),
        -1,
        LINE_8,
        0,
    )?;
    imgproc::put_text(
        frame,
        text,
        Point::new(anchor.x + margin, anchor.y - margin),
        FONT_HERSHEY_SIMPLEX,
        LABEL_FONT_SCALE,
        Scalar::all(255.0),
        LABEL_THICKNESS,
        LINE_AA,
        false,
    )?;

    Ok(())
}
