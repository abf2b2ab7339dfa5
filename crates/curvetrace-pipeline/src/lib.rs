//! curvetrace-pipeline: pure curve extraction core (sans-IO).
//!
//! Converts raster images into cubic Bezier control sets through:
//! grayscale -> bitmap (edges or threshold) -> traced SVG paths ->
//! normalized cubic control sets. Also plans which frames of a video to
//! sample.
//!
//! This crate has **no I/O dependencies**: it operates on in-memory
//! images, byte buffers, and strings. Running external tools, touching the
//! filesystem, and encoding video live in the `curvetrace` crate.

pub mod bitmap;
pub mod blur;
pub mod contour;
pub mod edge;
pub mod path_data;
pub mod sampler;
pub mod segment;
pub mod types;

pub use path_data::parse_svg_paths;
pub use sampler::FramePlan;
pub use segment::{CubicControlSet, PathSegment, TracedPath, normalize_paths, normalize_segment};
pub use types::{
    AxisConvention, Dimensions, GrayImage, PipelineConfig, PipelineError, Point, PreprocessMode,
    TracerKind,
};

/// Decode an image and produce its binary bitmap.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `image_bytes` is empty and
/// [`PipelineError::ImageDecode`] if the format is unrecognized.
pub fn bitmap_from_bytes(
    image_bytes: &[u8],
    config: &PipelineConfig,
) -> Result<GrayImage, PipelineError> {
    let gray = bitmap::decode_gray(image_bytes)?;
    Ok(bitmap::preprocess(&gray, config))
}

/// Decode a traced SVG document straight to normalized control sets.
///
/// # Errors
///
/// Returns [`PipelineError::PathData`] if the document is malformed.
pub fn curves_from_svg(svg: &str) -> Result<Vec<CubicControlSet>, PipelineError> {
    let paths = parse_svg_paths(svg)?;
    Ok(normalize_paths(&paths))
}
