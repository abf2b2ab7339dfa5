//! Animation assembler: ordered frame images to one video file.
//!
//! Three strategies are tried strictly in order; the first success wins
//! and every failure is kept for the final diagnostic:
//!
//! 1. [`Strategy::GlobWithAudio`]: encode the frames in place through a
//!    glob pattern, muxing the source's first audio track.
//! 2. [`Strategy::Reindexed`]: copy frames to `000000.png`, `000001.png`,
//!    ... in a throwaway directory and encode that sequence.
//! 3. [`Strategy::ConcatList`]: write a concat demuxer list with a fixed
//!    duration per frame and encode from it.
//!
//! A failed attempt never leaves a partial output file behind.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::RunError;
use crate::scratch::CancelToken;
use crate::tools::{ToolError, VideoEncoder};

/// One way of feeding frames to the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Glob pattern over the frame files, with audio passthrough.
    GlobWithAudio,
    /// Copy into a zero-padded numeric sequence (no audio).
    Reindexed,
    /// Concat demuxer list (no audio).
    ConcatList,
}

impl Strategy {
    /// Every strategy in the order it is attempted.
    pub const ORDER: [Self; 3] = [Self::GlobWithAudio, Self::Reindexed, Self::ConcatList];
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::GlobWithAudio => "glob",
            Self::Reindexed => "re-indexed sequence",
            Self::ConcatList => "concat list",
        })
    }
}

/// Why one strategy failed.
#[derive(Debug, thiserror::Error)]
pub enum AttemptError {
    /// The frames cannot be expressed this way (checked before encoding).
    #[error("not applicable: {0}")]
    NotApplicable(String),

    /// Preparing the encoder input failed.
    #[error("{}: {source}", path.display())]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The encoder itself failed.
    #[error(transparent)]
    Encoder(#[from] ToolError),
}

/// Every strategy failed.
#[derive(Debug, thiserror::Error)]
#[error("{}", describe(.attempts))]
pub struct AssemblyError {
    /// Each attempt in order; the last one is the decisive failure.
    pub attempts: Vec<(Strategy, AttemptError)>,
}

fn describe(attempts: &[(Strategy, AttemptError)]) -> String {
    let Some(((last_strategy, last_error), earlier)) = attempts.split_last() else {
        return "animation assembly failed".to_owned();
    };
    let mut message = format!("animation assembly failed ({last_strategy}): {last_error}");
    for (strategy, error) in earlier {
        message.push_str(&format!("; {strategy}: {error}"));
    }
    message
}

/// What to assemble.
#[derive(Debug, Clone, Copy)]
pub struct AssemblyRequest<'a> {
    /// Frame images in index order, complete and gap-free.
    pub frames: &'a [PathBuf],
    /// Playback rate of the output.
    pub fps: f64,
    /// Video whose first audio track is carried over, if any.
    pub audio_source: Option<&'a Path>,
    /// Destination video file.
    pub output: &'a Path,
    /// Directory for throwaway sequence copies and list files.
    pub scratch_dir: &'a Path,
}

/// Try each strategy in order until one produces `request.output`.
///
/// Returns the strategy that succeeded.
///
/// # Errors
///
/// [`RunError::Cancelled`] if cancellation is observed between
/// strategies and [`RunError::AssemblyFailure`] when all of them fail.
pub fn assemble(
    request: &AssemblyRequest<'_>,
    encoder: &dyn VideoEncoder,
    cancel: &CancelToken,
) -> Result<Strategy, RunError> {
    let mut attempts = Vec::new();

    for strategy in Strategy::ORDER {
        cancel.check()?;
        let result = match strategy {
            Strategy::GlobWithAudio => assemble_glob(request, encoder),
            Strategy::Reindexed => assemble_reindexed(request, encoder),
            Strategy::ConcatList => assemble_concat(request, encoder),
        };
        match result {
            Ok(()) => {
                tracing::info!(
                    "assembled {} frames into {} ({strategy})",
                    request.frames.len(),
                    request.output.display()
                );
                return Ok(strategy);
            }
            Err(e) => {
                remove_partial(request.output);
                tracing::warn!("{strategy} assembly failed, trying next strategy: {e}");
                attempts.push((strategy, e));
            }
        }
    }

    Err(AssemblyError { attempts }.into())
}

fn remove_partial(output: &Path) {
    if output.exists()
        && let Err(e) = std::fs::remove_file(output)
    {
        tracing::warn!("failed to remove partial output {}: {e}", output.display());
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> AttemptError + '_ {
    move |source| AttemptError::Io {
        path: path.to_path_buf(),
        source,
    }
}

// ─────────────────────────── strategy 1 ───────────────────────────

/// Split `frame_000012.png` into (`frame_`, `.png`) around its trailing
/// digits.
fn numbered_name(name: &str) -> Option<(&str, &str)> {
    let (stem, ext) = name.rsplit_once('.')?;
    let prefix = stem.trim_end_matches(|c: char| c.is_ascii_digit());
    if ext.is_empty() || prefix.len() == stem.len() {
        return None;
    }
    Some((prefix, &name[stem.len()..]))
}

/// Build a glob that matches exactly `frames`, in their given order.
fn glob_pattern(frames: &[PathBuf]) -> Result<PathBuf, AttemptError> {
    let not_applicable = |why: &str| AttemptError::NotApplicable(why.to_owned());

    let first = frames.first().ok_or_else(|| not_applicable("no frames"))?;
    let dir = first.parent().unwrap_or_else(|| Path::new("."));
    if dir.to_string_lossy().contains(['*', '?', '[']) {
        return Err(not_applicable("frame directory contains glob characters"));
    }

    let first_name = first.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    let (prefix, suffix) =
        numbered_name(first_name).ok_or_else(|| not_applicable("frame names are not numbered"))?;

    let mut names = Vec::with_capacity(frames.len());
    for frame in frames {
        let name = frame.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if frame.parent().unwrap_or_else(|| Path::new(".")) != dir
            || numbered_name(name) != Some((prefix, suffix))
        {
            return Err(not_applicable("frames do not share one numbered name pattern"));
        }
        names.push(name);
    }
    if !names.is_sorted_by(|a, b| a < b) {
        return Err(not_applicable("frame names do not sort in index order"));
    }

    // Count what `prefix*suffix` itself matches, numbered or not.
    let matching = std::fs::read_dir(dir)
        .map_err(io_error(dir))?
        .filter_map(Result::ok)
        .filter(|e| {
            e.file_name().to_str().is_some_and(|n| {
                n.len() >= prefix.len() + suffix.len()
                    && n.starts_with(prefix)
                    && n.ends_with(suffix)
            })
        })
        .count();
    if matching != frames.len() {
        return Err(not_applicable("directory holds other files matching the pattern"));
    }

    Ok(dir.join(format!("{prefix}*{suffix}")))
}

fn assemble_glob(request: &AssemblyRequest<'_>, encoder: &dyn VideoEncoder) -> Result<(), AttemptError> {
    let pattern = glob_pattern(request.frames)?;
    encoder.encode_glob(&pattern, request.fps, request.audio_source, request.output)?;
    Ok(())
}

// ─────────────────────────── strategy 2 ───────────────────────────

fn assemble_reindexed(
    request: &AssemblyRequest<'_>,
    encoder: &dyn VideoEncoder,
) -> Result<(), AttemptError> {
    // Removed on drop, whether encoding succeeds or not.
    let seq = tempfile::Builder::new()
        .prefix("reindexed-")
        .tempdir_in(request.scratch_dir)
        .map_err(io_error(request.scratch_dir))?;

    for (index, frame) in request.frames.iter().enumerate() {
        let target = seq.path().join(format!("{index:06}.png"));
        std::fs::copy(frame, &target).map_err(io_error(frame))?;
    }

    encoder.encode_sequence(&seq.path().join("%06d.png"), request.fps, request.output)?;
    Ok(())
}

// ─────────────────────────── strategy 3 ───────────────────────────

/// Quote a path for the concat demuxer: single quotes, with embedded
/// quotes closed, escaped and reopened.
fn concat_quote(path: &Path) -> String {
    format!("'{}'", path.to_string_lossy().replace('\'', r"'\''"))
}

/// Concat demuxer script: each frame held for `1 / fps` seconds, the last
/// file repeated so its duration is honoured.
fn concat_script(frames: &[PathBuf], fps: f64) -> String {
    let duration = 1.0 / fps;
    let mut script = String::from("ffconcat version 1.0\n");
    for frame in frames {
        script.push_str(&format!("file {}\nduration {duration}\n", concat_quote(frame)));
    }
    if let Some(last) = frames.last() {
        script.push_str(&format!("file {}\n", concat_quote(last)));
    }
    script
}

fn assemble_concat(request: &AssemblyRequest<'_>, encoder: &dyn VideoEncoder) -> Result<(), AttemptError> {
    if request.frames.is_empty() {
        return Err(AttemptError::NotApplicable("no frames".to_owned()));
    }
    let frames = request
        .frames
        .iter()
        .map(|f| std::path::absolute(f).map_err(io_error(f)))
        .collect::<Result<Vec<_>, _>>()?;

    // Removed on drop, whether encoding succeeds or not.
    let mut list = tempfile::Builder::new()
        .prefix("frames-")
        .suffix(".ffconcat")
        .tempfile_in(request.scratch_dir)
        .map_err(io_error(request.scratch_dir))?;
    let list_path = list.path().to_path_buf();
    list.write_all(concat_script(&frames, request.fps).as_bytes())
        .and_then(|()| list.flush())
        .map_err(io_error(&list_path))?;

    encoder.encode_concat(list.path(), request.fps, request.output)?;
    Ok(())
}
