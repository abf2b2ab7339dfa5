//! Shared types for the curvetrace extraction pipeline.

use serde::{Deserialize, Serialize};

/// Re-export `GrayImage` so downstream crates can reference
/// intermediate raster data without depending on `image` directly.
pub use image::GrayImage;

/// A 2D point.
///
/// Traced coordinates are in source pixel space (x to the right, y down)
/// until an [`AxisConvention`] is applied for output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position.
    pub x: f64,
    /// Vertical position.
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Point a fraction `t` of the way from `self` to `other`.
    #[must_use]
    pub fn lerp(self, other: Self, t: f64) -> Self {
        Self {
            x: (other.x - self.x).mul_add(t, self.x),
            y: (other.y - self.y).mul_add(t, self.y),
        }
    }

    /// Squared Euclidean distance to another point.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Vertical axis convention applied to every output coordinate of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AxisConvention {
    /// Keep image coordinates: y grows downward.
    ImageDown,
    /// Negate y so the output reads upright in a math plotter.
    #[default]
    MathUp,
}

impl AxisConvention {
    /// Map a pixel-space point into this convention.
    #[must_use]
    pub fn apply(self, p: Point) -> Point {
        match self {
            Self::ImageDown => p,
            Self::MathUp => Point::new(p.x, -p.y),
        }
    }
}

/// How the raw raster is turned into a binary bitmap before tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PreprocessMode {
    /// Gaussian blur followed by Canny edge detection.
    #[default]
    Edges,
    /// Flat luminance threshold at `threshold_percent`.
    Threshold,
}

/// Which bitmap tracer produces the vector paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TracerKind {
    /// The external `potrace` executable (smooth cubic outlines).
    #[default]
    Potrace,
    /// Built-in border following (straight line segments only).
    Contour,
}

/// Configuration for a curvetrace run.
///
/// Validated once by [`validate`](Self::validate) before any work starts
/// and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Bitmap preprocessing strategy.
    pub mode: PreprocessMode,

    /// Canny low threshold. Must be in
    /// [`MIN_THRESHOLD`](crate::edge::MIN_THRESHOLD)..=[`MAX_THRESHOLD`](crate::edge::MAX_THRESHOLD)
    /// and at most `canny_high`.
    pub canny_low: f32,

    /// Canny high threshold.
    pub canny_high: f32,

    /// Gaussian blur kernel size in pixels (odd, 1 disables blurring).
    pub blur_kernel: u32,

    /// Binarization threshold as a percentage of full scale (0-100).
    /// Only used by [`PreprocessMode::Threshold`].
    pub threshold_percent: u8,

    /// Bitmap tracer selection.
    pub tracer: TracerKind,

    /// Vertical axis convention for equations and plots.
    pub axis: AxisConvention,

    /// Draw a light grid behind rendered plots.
    pub show_grid: bool,

    /// Plot canvas width in pixels (even, so frames are encodable).
    pub plot_width: u32,

    /// Plot canvas height in pixels (even).
    pub plot_height: u32,

    /// Maximum number of video frames to process.
    pub max_frames: Option<u32>,

    /// Target output frame rate for video mode.
    pub target_fps: Option<f64>,

    /// Worker threads for per-frame processing; 0 uses all cores.
    pub jobs: usize,

    /// Keep intermediate bitmap, vector, and frame files after the run.
    pub keep_temp: bool,
}

impl PipelineConfig {
    /// Default Canny low threshold.
    pub const DEFAULT_CANNY_LOW: f32 = 50.0;
    /// Default Canny high threshold.
    pub const DEFAULT_CANNY_HIGH: f32 = 150.0;
    /// Default blur kernel size.
    pub const DEFAULT_BLUR_KERNEL: u32 = 5;
    /// Largest accepted blur kernel size.
    pub const MAX_BLUR_KERNEL: u32 = 31;
    /// Default binarization threshold percentage.
    pub const DEFAULT_THRESHOLD_PERCENT: u8 = 50;
    /// Default plot canvas edge length.
    pub const DEFAULT_PLOT_SIZE: u32 = 1000;
    /// Smallest accepted plot canvas edge.
    pub const MIN_PLOT_SIZE: u32 = 16;
    /// Largest accepted plot canvas edge.
    pub const MAX_PLOT_SIZE: u32 = 8192;
    /// Largest accepted target frame rate.
    pub const MAX_TARGET_FPS: f64 = 240.0;
    /// Largest accepted worker count.
    pub const MAX_JOBS: usize = 256;

    /// Check every field against its declared range.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] naming the first field
    /// that is out of range.
    pub fn validate(&self) -> Result<(), PipelineError> {
        use crate::edge::{MAX_THRESHOLD, MIN_THRESHOLD};

        for (name, value) in [("canny_low", self.canny_low), ("canny_high", self.canny_high)] {
            if !(MIN_THRESHOLD..=MAX_THRESHOLD).contains(&value) {
                return Err(PipelineError::InvalidConfig(format!(
                    "{name} must be between {MIN_THRESHOLD} and {MAX_THRESHOLD}, got {value}"
                )));
            }
        }
        if self.canny_low > self.canny_high {
            return Err(PipelineError::InvalidConfig(format!(
                "canny_low ({}) must not exceed canny_high ({})",
                self.canny_low, self.canny_high
            )));
        }
        if self.blur_kernel == 0
            || self.blur_kernel > Self::MAX_BLUR_KERNEL
            || self.blur_kernel % 2 == 0
        {
            return Err(PipelineError::InvalidConfig(format!(
                "blur_kernel must be an odd number between 1 and {}, got {}",
                Self::MAX_BLUR_KERNEL,
                self.blur_kernel
            )));
        }
        if self.threshold_percent > 100 {
            return Err(PipelineError::InvalidConfig(format!(
                "threshold must be between 0 and 100, got {}",
                self.threshold_percent
            )));
        }
        for (name, value) in [
            ("plot_width", self.plot_width),
            ("plot_height", self.plot_height),
        ] {
            if !(Self::MIN_PLOT_SIZE..=Self::MAX_PLOT_SIZE).contains(&value) || value % 2 != 0 {
                return Err(PipelineError::InvalidConfig(format!(
                    "{name} must be an even number between {} and {}, got {value}",
                    Self::MIN_PLOT_SIZE,
                    Self::MAX_PLOT_SIZE
                )));
            }
        }
        if self.max_frames == Some(0) {
            return Err(PipelineError::InvalidConfig(
                "max_frames must be positive".to_string(),
            ));
        }
        if let Some(fps) = self.target_fps
            && !(fps.is_finite() && fps > 0.0 && fps <= Self::MAX_TARGET_FPS)
        {
            return Err(PipelineError::InvalidConfig(format!(
                "target_fps must be in (0, {}], got {fps}",
                Self::MAX_TARGET_FPS
            )));
        }
        if self.jobs > Self::MAX_JOBS {
            return Err(PipelineError::InvalidConfig(format!(
                "jobs must be at most {}, got {}",
                Self::MAX_JOBS,
                self.jobs
            )));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mode: PreprocessMode::default(),
            canny_low: Self::DEFAULT_CANNY_LOW,
            canny_high: Self::DEFAULT_CANNY_HIGH,
            blur_kernel: Self::DEFAULT_BLUR_KERNEL,
            threshold_percent: Self::DEFAULT_THRESHOLD_PERCENT,
            tracer: TracerKind::default(),
            axis: AxisConvention::default(),
            show_grid: true,
            plot_width: Self::DEFAULT_PLOT_SIZE,
            plot_height: Self::DEFAULT_PLOT_SIZE,
            max_frames: None,
            target_fps: None,
            jobs: 0,
            keep_temp: false,
        }
    }
}

/// Errors that can occur in the pure pipeline stages.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode or encode a raster image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// Pipeline configuration is invalid.
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),

    /// Traced vector output could not be parsed.
    #[error("malformed vector path data: {0}")]
    PathData(String),
}
