//! Image curve extractor: one raster file to cubic curves and their
//! outputs.
//!
//! The extractor is a linear chain of consuming stages, each one writing
//! its artifact into the run's working directory:
//!
//! ```rust,no_run
//! # use curvetrace::extract::{ExtractContext, Raw};
//! # use curvetrace::tools::ContourTracer;
//! # use curvetrace_pipeline::PipelineConfig;
//! # fn run(dir: &std::path::Path) -> Result<(), curvetrace::RunError> {
//! let config = PipelineConfig::default();
//! let ctx = ExtractContext { config: &config, tracer: &ContourTracer, work_dir: dir };
//! let curves = Raw::new("cat.jpg", "cat", ctx)
//!     .binarize()?  // cat.bmp
//!     .trace()?     // cat.svg
//!     .normalize()?;
//! let png = curves.plot_png()?;
//! # Ok(())
//! # }
//! ```
//!
//! Stage files are named from the stem given to [`Raw::new`], so frames
//! processed in parallel never share a file.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use curvetrace_export::{PlotOptions, render_plot, write_equations};
use curvetrace_pipeline::{
    CubicControlSet, Dimensions, PipelineConfig, bitmap, curves_from_svg,
};

use crate::error::RunError;
use crate::tools::BitmapTracer;

/// What every stage needs besides its own artifact.
#[derive(Clone, Copy)]
pub struct ExtractContext<'a> {
    /// Validated run configuration.
    pub config: &'a PipelineConfig,
    /// Tracer turning bitmaps into SVG.
    pub tracer: &'a dyn BitmapTracer,
    /// Directory for the stage files.
    pub work_dir: &'a Path,
}

impl ExtractContext<'_> {
    fn stage_file(&self, stem: &str, extension: &str) -> PathBuf {
        self.work_dir.join(format!("{stem}.{extension}"))
    }
}

// ─────────────────────────────── Raw ───────────────────────────────

/// A raster input that has not been read yet.
#[must_use = "extractor stages are consumed by advancing; call .binarize() to continue"]
pub struct Raw<'a> {
    ctx: ExtractContext<'a>,
    input: PathBuf,
    stem: String,
}

impl<'a> Raw<'a> {
    /// Start extraction of `input`, naming stage files after `stem`.
    pub fn new(input: impl Into<PathBuf>, stem: impl Into<String>, ctx: ExtractContext<'a>) -> Self {
        Self {
            ctx,
            input: input.into(),
            stem: stem.into(),
        }
    }

    /// Decode, grayscale and binarize, writing the bitmap as BMP.
    ///
    /// # Errors
    ///
    /// [`RunError::MissingInput`] if the input is absent,
    /// [`RunError::DecodeFailure`] if it is not a decodable raster, and
    /// [`RunError::Io`] if the bitmap cannot be written.
    pub fn binarize(self) -> Result<Bitmap<'a>, RunError> {
        let bytes = match std::fs::read(&self.input) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(RunError::MissingInput(self.input));
            }
            Err(e) => return Err(RunError::io(&self.input, e)),
        };
        let gray = bitmap::decode_gray(&bytes)?;
        let dimensions = Dimensions {
            width: gray.width(),
            height: gray.height(),
        };
        let binary = bitmap::preprocess(&gray, self.ctx.config);

        let path = self.ctx.stage_file(&self.stem, "bmp");
        std::fs::write(&path, bitmap::encode_bmp(&binary)?).map_err(|e| RunError::io(&path, e))?;
        tracing::debug!(
            bitmap = %path.display(),
            ink = bitmap::ink_pixels(&binary),
            "binarized {}x{}",
            dimensions.width,
            dimensions.height
        );

        Ok(Bitmap {
            ctx: self.ctx,
            stem: self.stem,
            dimensions,
            path,
        })
    }
}

// ────────────────────────────── Bitmap ─────────────────────────────

/// A binary bitmap on disk.
#[must_use = "extractor stages are consumed by advancing; call .trace() to continue"]
pub struct Bitmap<'a> {
    ctx: ExtractContext<'a>,
    stem: String,
    dimensions: Dimensions,
    path: PathBuf,
}

impl<'a> Bitmap<'a> {
    /// The bitmap file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run the tracer over the bitmap.
    ///
    /// # Errors
    ///
    /// [`RunError::ToolFailure`] if the tracer fails.
    pub fn trace(self) -> Result<VectorPath<'a>, RunError> {
        let svg = self.ctx.stage_file(&self.stem, "svg");
        self.ctx.tracer.trace(&self.path, &svg)?;
        tracing::debug!(tracer = self.ctx.tracer.name(), svg = %svg.display(), "traced");
        Ok(VectorPath {
            ctx: self.ctx,
            dimensions: self.dimensions,
            path: svg,
        })
    }
}

// ──────────────────────────── VectorPath ───────────────────────────

/// Traced SVG on disk.
#[must_use = "extractor stages are consumed by advancing; call .normalize() to continue"]
pub struct VectorPath<'a> {
    ctx: ExtractContext<'a>,
    dimensions: Dimensions,
    path: PathBuf,
}

impl VectorPath<'_> {
    /// The SVG file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Decode every path segment and normalize it to a cubic.
    ///
    /// # Errors
    ///
    /// [`RunError::DecodeFailure`] if the SVG is malformed and
    /// [`RunError::Io`] if it cannot be read.
    pub fn normalize(self) -> Result<Curves, RunError> {
        let content =
            std::fs::read_to_string(&self.path).map_err(|e| RunError::io(&self.path, e))?;
        let curves = curves_from_svg(&content)?;
        Ok(Curves {
            curves,
            dimensions: self.dimensions,
            plot: PlotOptions {
                width: self.ctx.config.plot_width,
                height: self.ctx.config.plot_height,
                show_grid: self.ctx.config.show_grid,
                axis: self.ctx.config.axis,
            },
        })
    }
}

// ────────────────────────────── Curves ─────────────────────────────

/// Normalized curves, ready for output.
#[derive(Debug, Clone)]
pub struct Curves {
    curves: Vec<CubicControlSet>,
    dimensions: Dimensions,
    plot: PlotOptions,
}

impl Curves {
    /// The control sets in trace order.
    #[must_use]
    pub fn curves(&self) -> &[CubicControlSet] {
        &self.curves
    }

    /// Number of curves.
    #[must_use]
    pub fn len(&self) -> usize {
        self.curves.len()
    }

    /// Whether nothing was traced.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }

    /// Size of the source raster.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Render the plot as PNG bytes.
    ///
    /// # Errors
    ///
    /// [`RunError::Render`] if rendering fails.
    pub fn plot_png(&self) -> Result<Vec<u8>, RunError> {
        Ok(render_plot(&self.curves, self.dimensions, &self.plot)?)
    }

    /// Write one equation line per curve to `sink`.
    ///
    /// # Errors
    ///
    /// Propagates the sink's I/O error.
    pub fn write_equations<W: Write>(&self, sink: &mut W) -> io::Result<usize> {
        write_equations(sink, &self.curves, self.plot.axis)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::tools::ContourTracer;
    use curvetrace_pipeline::{PreprocessMode, TracerKind};

    fn config() -> PipelineConfig {
        PipelineConfig {
            mode: PreprocessMode::Threshold,
            tracer: TracerKind::Contour,
            plot_width: 64,
            plot_height: 64,
            ..PipelineConfig::default()
        }
    }

    fn write_disc(path: &Path) {
        let img = image::GrayImage::from_fn(32, 24, |x, y| {
            let (dx, dy) = (f64::from(x) - 16.0, f64::from(y) - 12.0);
            image::Luma([if dx.hypot(dy) < 8.0 { 0 } else { 255 }])
        });
        img.save(path).unwrap();
    }

    #[test]
    fn stages_leave_their_files_behind() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("disc.png");
        write_disc(&input);
        let config = config();
        let ctx = ExtractContext {
            config: &config,
            tracer: &ContourTracer,
            work_dir: dir.path(),
        };

        let bitmap = Raw::new(&input, "disc", ctx).binarize().unwrap();
        assert!(bitmap.path().ends_with("disc.bmp") && bitmap.path().is_file());
        let vector = bitmap.trace().unwrap();
        assert!(vector.path().ends_with("disc.svg") && vector.path().is_file());
        let curves = vector.normalize().unwrap();

        assert!(!curves.is_empty());
        assert_eq!(
            curves.dimensions(),
            Dimensions {
                width: 32,
                height: 24
            }
        );
        let png = curves.plot_png().unwrap();
        assert_eq!(image::load_from_memory(&png).unwrap().width(), 64);

        let mut text = Vec::new();
        let n = curves.write_equations(&mut text).unwrap();
        assert_eq!(n, curves.len());
        assert_eq!(String::from_utf8(text).unwrap().lines().count(), n);
    }

    #[test]
    fn absent_input_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let config = config();
        let ctx = ExtractContext {
            config: &config,
            tracer: &ContourTracer,
            work_dir: dir.path(),
        };
        let err = Raw::new(dir.path().join("nope.png"), "nope", ctx)
            .binarize()
            .err()
            .unwrap();
        assert!(matches!(err, RunError::MissingInput(_)));
    }

    #[test]
    fn non_image_is_a_decode_failure() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("notes.png");
        std::fs::write(&input, b"definitely not a png").unwrap();
        let config = config();
        let ctx = ExtractContext {
            config: &config,
            tracer: &ContourTracer,
            work_dir: dir.path(),
        };
        let err = Raw::new(&input, "notes", ctx).binarize().err().unwrap();
        assert!(matches!(err, RunError::DecodeFailure(_)));
    }

    #[test]
    fn malformed_svg_is_a_decode_failure() {
        struct Scribbler;
        impl BitmapTracer for Scribbler {
            fn name(&self) -> &'static str {
                "scribbler"
            }
            fn trace(&self, _: &Path, svg_out: &Path) -> Result<(), crate::tools::ToolError> {
                std::fs::write(svg_out, r#"<svg><path d="M0 0 C1 1 2 2"/></svg>"#).unwrap();
                Ok(())
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("disc.png");
        write_disc(&input);
        let config = config();
        let ctx = ExtractContext {
            config: &config,
            tracer: &Scribbler,
            work_dir: dir.path(),
        };
        let err = Raw::new(&input, "disc", ctx)
            .binarize()
            .unwrap()
            .trace()
            .unwrap()
            .normalize()
            .unwrap_err();
        assert!(matches!(err, RunError::DecodeFailure(_)));
    }
}
