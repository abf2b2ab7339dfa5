use std::path::Path;
use std::process::Command;

use curvetrace_pipeline::TracerKind;
use curvetrace_pipeline::contour::trace_to_svg;

use super::{ToolError, run_tool};

/// Converts a binary bitmap file into an SVG document of outline paths.
///
/// Implementations are shared across the frame worker pool, so they must
/// be `Send + Sync` and must only touch the two paths they are given.
pub trait BitmapTracer: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Trace `bitmap` (BMP, dark pixels are foreground) and write SVG to
    /// `svg_out`.
    ///
    /// # Errors
    ///
    /// Returns a [`ToolError`] if tracing fails or either file cannot be
    /// accessed.
    fn trace(&self, bitmap: &Path, svg_out: &Path) -> Result<(), ToolError>;
}

/// The external `potrace` executable.
#[derive(Debug, Clone, Default)]
pub struct PotraceTracer;

impl BitmapTracer for PotraceTracer {
    fn name(&self) -> &'static str {
        "potrace"
    }

    fn trace(&self, bitmap: &Path, svg_out: &Path) -> Result<(), ToolError> {
        run_tool(
            Command::new("potrace")
                .arg(bitmap)
                .arg("-s")
                .arg("-o")
                .arg(svg_out),
        )?;
        Ok(())
    }
}

/// In-process border following; needs no external tool.
#[derive(Debug, Clone, Default)]
pub struct ContourTracer;

impl BitmapTracer for ContourTracer {
    fn name(&self) -> &'static str {
        "contour"
    }

    fn trace(&self, bitmap: &Path, svg_out: &Path) -> Result<(), ToolError> {
        let decoded = image::open(bitmap).map_err(|e| ToolError::Output {
            program: self.name().to_owned(),
            message: format!("cannot read bitmap {}: {e}", bitmap.display()),
        })?;
        let svg = trace_to_svg(&decoded.to_luma8());
        std::fs::write(svg_out, svg).map_err(|source| ToolError::Io {
            path: svg_out.to_path_buf(),
            source,
        })
    }
}

/// Build the tracer selected in the configuration.
#[must_use]
pub fn tracer_for(kind: TracerKind) -> Box<dyn BitmapTracer> {
    match kind {
        TracerKind::Potrace => Box::new(PotraceTracer),
        TracerKind::Contour => Box::new(ContourTracer),
    }
}
