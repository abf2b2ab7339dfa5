//! Edge bitmap: Canny edges drawn as ink.
//!
//! [`imageproc::edges::canny`] marks edges white on black. Tracers outline
//! dark regions, so the edges are repainted as [`INK`] on [`PAPER`] in the
//! same pass.

use image::GrayImage;

use crate::bitmap::{INK, PAPER};

/// Smallest Canny threshold a config may carry. Zero turns every nonzero
/// gradient into an edge candidate.
pub const MIN_THRESHOLD: f32 = 1.0;

/// Largest Canny threshold a config may carry.
pub const MAX_THRESHOLD: f32 = 1000.0;

/// Detect edges in `image` and return them as a traceable bitmap.
///
/// `low` is capped at `high` and both are raised to [`MIN_THRESHOLD`]; a
/// validated config is passed through unchanged.
#[must_use = "returns the edge bitmap"]
pub fn edge_bitmap(image: &GrayImage, low: f32, high: f32) -> GrayImage {
    let high = high.max(MIN_THRESHOLD);
    let low = low.clamp(MIN_THRESHOLD, high);

    let mut bitmap = imageproc::edges::canny(image, low, high);
    for px in bitmap.pixels_mut() {
        px.0[0] = if px.0[0] == 0 { PAPER } else { INK };
    }
    bitmap
}
