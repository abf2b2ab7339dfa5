//! Top-level error type of a curvetrace run.

use std::path::PathBuf;

use curvetrace_export::PlotError;
use curvetrace_pipeline::PipelineError;

use crate::assemble::AssemblyError;
use crate::tools::ToolError;

/// Why a run stopped.
///
/// Everything that reaches the orchestrator is one of these; the binary
/// prints it as a single `error: ...` line and exits with status 1.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// The input file does not exist.
    #[error("input not found: {}", .0.display())]
    MissingInput(PathBuf),

    /// An external step could not run or exited unsuccessfully.
    #[error(transparent)]
    ToolFailure(#[from] ToolError),

    /// The input raster or the traced vector output could not be decoded.
    #[error("{0}")]
    DecodeFailure(String),

    /// Configuration rejected before any work started.
    #[error("{0}")]
    ValidationFailure(String),

    /// Every animation assembly strategy failed.
    #[error(transparent)]
    AssemblyFailure(#[from] AssemblyError),

    /// The video could not be probed or yielded no frames.
    #[error("cannot read video {}: {reason}", path.display())]
    SourceUnreadable {
        /// The video file.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// A file could not be written or read.
    #[error("{}: {source}", path.display())]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// A plot could not be rendered.
    #[error(transparent)]
    Render(#[from] PlotError),

    /// The frame worker pool could not be started.
    #[error("failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    /// The run was interrupted.
    #[error("cancelled")]
    Cancelled,
}

impl RunError {
    /// Wrap an I/O error with the path it concerns.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<PipelineError> for RunError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::InvalidConfig(_) => Self::ValidationFailure(e.to_string()),
            PipelineError::ImageDecode(_) | PipelineError::EmptyInput | PipelineError::PathData(_) => {
                Self::DecodeFailure(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_become_validation_failures() {
        let err = RunError::from(PipelineError::InvalidConfig("blur_kernel must be odd".into()));
        assert!(matches!(err, RunError::ValidationFailure(_)));
        assert_eq!(
            err.to_string(),
            "invalid pipeline configuration: blur_kernel must be odd"
        );
    }

    #[test]
    fn path_data_errors_become_decode_failures() {
        let err = RunError::from(PipelineError::PathData("bad number".into()));
        assert!(matches!(err, RunError::DecodeFailure(_)));
    }

    #[test]
    fn missing_input_names_the_path() {
        let err = RunError::MissingInput(PathBuf::from("cat.png"));
        assert_eq!(err.to_string(), "input not found: cat.png");
    }
}
