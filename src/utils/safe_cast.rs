//! Checked conversions between index, pixel and floating point types

use crate::{Error, Result};

/// Convert a length or index to an `OpenCV` coordinate
///
/// # Errors
///
/// Returns an error if the value exceeds `i32::MAX`
pub fn usize_to_i32(value: usize) -> Result<i32> {
    i32::try_from(value).map_err(|_| Error::InvalidInput(format!("Value {value} too large for a pixel coordinate")))
}

/// Convert a computed dimension to an `OpenCV` coordinate
///
/// # Errors
///
/// Returns an error if the value is not finite or outside the `i32` range
#[allow(clippy::cast_possible_truncation)] // Truncation after bounds check is intended
pub fn f64_to_i32(value: f64) -> Result<i32> {
    if value.is_finite() && value >= f64::from(i32::MIN) && value <= f64::from(i32::MAX) {
        Ok(value as i32)
    } else {
        Err(Error::InvalidInput(format!("Value {value} is not a valid pixel coordinate")))
    }
}

/// Clamp a normalized landmark coordinate into a pixel range
#[must_use]
#[allow(clippy::cast_precision_loss)]
#[allow(clippy::cast_possible_truncation)]
pub fn f32_to_i32_clamp(value: f32, min: i32, max: i32) -> i32 {
    let (min, max) = if min <= max { (min, max) } else { (max, min) };

    if !value.is_finite() {
        return min;
    }

    (value.clamp(min as f32, max as f32) as i32).clamp(min, max)
}
