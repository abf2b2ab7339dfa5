//! Raw raster to binary bitmap.
//!
//! A bitmap here is a [`GrayImage`] holding only `INK` (0) and `PAPER`
//! (255) pixels. Ink is what gets traced, matching the black-on-white
//! convention of bitmap tracers. Exactly one of two strategies runs:
//!
//! - [`PreprocessMode::Edges`]: blur, Canny, then edges become ink.
//! - [`PreprocessMode::Threshold`]: pixels at or below the threshold
//!   luminance become ink.

use std::io::Cursor;

use image::GrayImage;

use crate::types::{PipelineConfig, PipelineError, PreprocessMode};

/// Pixel value of traced foreground.
pub const INK: u8 = 0;
/// Pixel value of background.
pub const PAPER: u8 = 255;

/// Decode any supported raster (PNG, JPEG, BMP, WebP) to 8-bit luminance.
///
/// # Errors
///
/// [`PipelineError::EmptyInput`] for zero bytes and
/// [`PipelineError::ImageDecode`] for anything the decoders reject.
pub fn decode_gray(bytes: &[u8]) -> Result<GrayImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }
    Ok(image::load_from_memory(bytes)?.to_luma8())
}

/// Binarize by luminance: values strictly above `percent` of full scale
/// become paper, everything else ink.
#[must_use = "returns the binary bitmap"]
pub fn threshold(gray: &GrayImage, percent: u8) -> GrayImage {
    let cutoff = u16::from(percent.min(100)) * 255 / 100;
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let v = u16::from(gray.get_pixel(x, y).0[0]);
        image::Luma([if v > cutoff { PAPER } else { INK }])
    })
}

/// Run the configured preprocessing strategy.
#[must_use = "returns the binary bitmap"]
pub fn preprocess(gray: &GrayImage, config: &PipelineConfig) -> GrayImage {
    match config.mode {
        PreprocessMode::Edges => {
            let blurred = crate::blur::gaussian_blur(gray, config.blur_kernel);
            crate::edge::edge_bitmap(&blurred, config.canny_low, config.canny_high)
        }
        PreprocessMode::Threshold => threshold(gray, config.threshold_percent),
    }
}

/// Number of ink pixels in a bitmap.
#[must_use]
pub fn ink_pixels(bitmap: &GrayImage) -> u64 {
    bitmap.pixels().map(|p| u64::from(p.0[0] == INK)).sum()
}

/// Encode a bitmap as an 8-bit BMP, a format every supported tracer reads.
///
/// # Errors
///
/// Returns [`PipelineError::ImageDecode`] if encoding fails.
pub fn encode_bmp(bitmap: &GrayImage) -> Result<Vec<u8>, PipelineError> {
    let mut buf = Cursor::new(Vec::new());
    bitmap.write_to(&mut buf, image::ImageFormat::Bmp)?;
    Ok(buf.into_inner())
}
