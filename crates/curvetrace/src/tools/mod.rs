//! Adapters for the collaborators that live outside the process: the
//! bitmap tracer and the video decoder/encoder.
//!
//! Every adapter sits behind a trait so the runner and assembler can be
//! driven by in-memory fakes in tests.

mod tracer;
mod video;

use std::ffi::OsStr;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

pub use tracer::{BitmapTracer, ContourTracer, PotraceTracer, tracer_for};
pub use video::{FfmpegDecoder, FfmpegEncoder, VideoDecoder, VideoEncoder, VideoProbe};

/// Failure of one external step.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// The program could not be started at all.
    #[error("failed to run {program} (is it installed and on PATH?): {source}")]
    Spawn {
        /// Executable name.
        program: String,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// The program ran and exited unsuccessfully.
    #[error("{program} exited with {status}: {stderr}")]
    Status {
        /// Executable name.
        program: String,
        /// Exit status description.
        status: String,
        /// Trimmed standard error output.
        stderr: String,
    },

    /// A file the step reads or writes could not be accessed.
    #[error("{}: {source}", path.display())]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The step produced output that could not be understood.
    #[error("{program}: {message}")]
    Output {
        /// Step name.
        program: String,
        /// What was wrong.
        message: String,
    },
}

/// Run a prepared command to completion, capturing stderr for
/// diagnostics.
///
/// # Errors
///
/// [`ToolError::Spawn`] if the program cannot be started and
/// [`ToolError::Status`] if it exits non-zero.
pub fn run_tool(cmd: &mut Command) -> Result<Output, ToolError> {
    let program = program_name(cmd.get_program());
    tracing::debug!(command = ?cmd, "running {program}");

    let out = cmd
        .stdin(Stdio::null())
        .output()
        .map_err(|source| ToolError::Spawn {
            program: program.clone(),
            source,
        })?;

    if !out.status.success() {
        return Err(ToolError::Status {
            program,
            status: out.status.to_string(),
            stderr: String::from_utf8_lossy(&out.stderr).trim().to_owned(),
        });
    }
    Ok(out)
}

/// Return `true` when `program version_arg` runs successfully from `PATH`.
#[must_use]
pub fn is_on_path(program: &str, version_arg: &str) -> bool {
    Command::new(program)
        .arg(version_arg)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|s| s.success())
}

fn program_name(program: &OsStr) -> String {
    program.to_string_lossy().into_owned()
}
