//! Pipeline orchestrator: validates, owns the scratch scope, and
//! sequences extraction (image mode) or sampling, per-frame processing
//! and assembly (video mode).

use std::io::Write;
use std::path::{Path, PathBuf};

use curvetrace_pipeline::{FramePlan, PipelineConfig, TracerKind};
use serde::{Deserialize, Serialize};

use crate::assemble::{AssemblyRequest, Strategy, assemble};
use crate::error::RunError;
use crate::extract::{ExtractContext, Raw};
use crate::frames::{FrameRunner, RasterFrame};
use crate::scratch::{CancelToken, ScratchScope};
use crate::tools::{
    BitmapTracer, FfmpegDecoder, FfmpegEncoder, VideoDecoder, VideoEncoder, tracer_for,
};

/// Which artifacts an image run writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputMode {
    /// Rendered PNG plot.
    #[default]
    Plot,
    /// Desmos equation listing.
    Desmos,
    /// Both of the above.
    Both,
}

/// Everything one invocation asks for.
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Image or video file.
    pub input: PathBuf,
    /// Explicit output name, if any.
    pub output: Option<PathBuf>,
    /// Artifacts for image mode.
    pub mode: OutputMode,
    /// Treat `input` as a video.
    pub video: bool,
    /// Run configuration.
    pub config: PipelineConfig,
}

/// External collaborators of a run.
pub struct Toolchain {
    /// Bitmap to SVG.
    pub tracer: Box<dyn BitmapTracer>,
    /// Video probe and frame extraction.
    pub decoder: Box<dyn VideoDecoder>,
    /// Frame sequence to video.
    pub encoder: Box<dyn VideoEncoder>,
}

impl Toolchain {
    /// The configured tracer plus `ffprobe`/`ffmpeg`.
    #[must_use]
    pub fn system(config: &PipelineConfig) -> Self {
        Self {
            tracer: tracer_for(config.tracer),
            decoder: Box::new(FfmpegDecoder),
            encoder: Box::new(FfmpegEncoder),
        }
    }
}

/// External programs a system run invokes, each with the argument that
/// makes it print its version.
#[must_use]
pub fn required_programs(config: &PipelineConfig, video: bool) -> Vec<(&'static str, &'static str)> {
    let mut programs = Vec::new();
    if config.tracer == TracerKind::Potrace {
        programs.push(("potrace", "--version"));
    }
    if video {
        programs.push(("ffprobe", "-version"));
        programs.push(("ffmpeg", "-version"));
    }
    programs
}

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunSummary {
    /// Image mode.
    Image {
        /// Plot file, when requested.
        plot: Option<PathBuf>,
        /// Equation listing, when requested.
        equations: Option<PathBuf>,
        /// Number of curves extracted.
        curve_count: usize,
    },
    /// Video mode.
    Video {
        /// Assembled animation.
        output: PathBuf,
        /// Frames in the animation.
        frames: usize,
        /// Frames that fell back to a placeholder.
        placeholders: usize,
        /// Strategy that produced the file.
        strategy: Strategy,
    },
}

/// Output paths of an image run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageOutputs {
    /// Plot path, when the mode renders one.
    pub plot: Option<PathBuf>,
    /// Equations path, when the mode writes them.
    pub equations: Option<PathBuf>,
}

/// File stem of the input, or `output` when it has none.
fn input_stem(input: &Path) -> String {
    input
        .file_stem()
        .map_or_else(|| "output".to_owned(), |s| s.to_string_lossy().into_owned())
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

/// Decide where image-mode outputs go.
///
/// Defaults are `<stem>_plot.png` and `<stem>_equations.txt` in the
/// working directory. With `both`, an explicit `.png` names the plot, an
/// explicit `.txt` names the listing, and any other name is a base that
/// gets both extensions.
#[must_use]
pub fn image_outputs(input: &Path, output: Option<&Path>, mode: OutputMode) -> ImageOutputs {
    let stem = input_stem(input);
    let default_plot = PathBuf::from(format!("{stem}_plot.png"));
    let default_equations = PathBuf::from(format!("{stem}_equations.txt"));

    match mode {
        OutputMode::Plot => ImageOutputs {
            plot: Some(output.map_or(default_plot, Path::to_path_buf)),
            equations: None,
        },
        OutputMode::Desmos => ImageOutputs {
            plot: None,
            equations: Some(output.map_or(default_equations, Path::to_path_buf)),
        },
        OutputMode::Both => {
            let (plot, equations) = match output {
                None => (default_plot, default_equations),
                Some(out) if has_extension(out, "png") => (out.to_path_buf(), default_equations),
                Some(out) if has_extension(out, "txt") => (default_plot, out.to_path_buf()),
                Some(base) => (base.with_extension("png"), base.with_extension("txt")),
            };
            ImageOutputs {
                plot: Some(plot),
                equations: Some(equations),
            }
        }
    }
}

/// Where the animation goes: the explicit name or `<stem>_curves.mp4`.
#[must_use]
pub fn video_output(input: &Path, output: Option<&Path>) -> PathBuf {
    output.map_or_else(
        || PathBuf::from(format!("{}_curves.mp4", input_stem(input))),
        Path::to_path_buf,
    )
}

/// `<stem>_curvetrace_tmp` next to the primary output.
#[must_use]
pub fn scratch_dir(input: &Path, primary_output: &Path) -> PathBuf {
    let parent = primary_output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    parent.join(format!("{}_curvetrace_tmp", input_stem(input)))
}

/// Write a file through a sibling temporary so a failure never leaves a
/// truncated output.
fn write_output(
    path: &Path,
    write: impl FnOnce(&mut tempfile::NamedTempFile) -> std::io::Result<()>,
) -> Result<(), RunError> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(|e| RunError::io(dir, e))?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| RunError::io(dir, e))?;
    write(&mut tmp)
        .and_then(|()| tmp.flush())
        .map_err(|e| RunError::io(path, e))?;
    tmp.persist(path).map_err(|e| RunError::io(path, e.error))?;
    Ok(())
}

/// Execute one run.
///
/// Configuration is validated and the input checked before anything is
/// created on disk. The scratch scope is removed on every exit path
/// unless `config.keep_temp` is set.
///
/// # Errors
///
/// Any [`RunError`]; per-frame failures in video mode are contained and
/// only counted in the summary.
pub fn run(
    request: &RunRequest,
    tools: &Toolchain,
    cancel: &CancelToken,
) -> Result<RunSummary, RunError> {
    request.config.validate()?;
    if !request.input.is_file() {
        return Err(RunError::MissingInput(request.input.clone()));
    }

    if request.video {
        run_video(request, tools, cancel)
    } else {
        run_image(request, tools, cancel)
    }
}

fn run_image(
    request: &RunRequest,
    tools: &Toolchain,
    cancel: &CancelToken,
) -> Result<RunSummary, RunError> {
    let outputs = image_outputs(&request.input, request.output.as_deref(), request.mode);
    let primary = outputs
        .plot
        .as_deref()
        .or(outputs.equations.as_deref())
        .unwrap_or_else(|| Path::new("."));
    let scratch = ScratchScope::create(
        scratch_dir(&request.input, primary),
        request.config.keep_temp,
    )?;

    let ctx = ExtractContext {
        config: &request.config,
        tracer: tools.tracer.as_ref(),
        work_dir: scratch.path(),
    };
    tracing::info!(
        input = %request.input.display(),
        tracer = tools.tracer.name(),
        "extracting curves"
    );
    let curves = Raw::new(&request.input, input_stem(&request.input), ctx)
        .binarize()?
        .trace()?
        .normalize()?;
    cancel.check()?;

    if let Some(plot) = &outputs.plot {
        let png = curves.plot_png()?;
        write_output(plot, |f| f.write_all(&png))?;
        tracing::info!("plot saved: {} ({} curves)", plot.display(), curves.len());
    }
    if let Some(equations) = &outputs.equations {
        if let Err(e) = write_output(equations, |f| curves.write_equations(f).map(drop)) {
            // Don't leave half of a `both` run behind.
            if let Some(plot) = &outputs.plot {
                let _ = std::fs::remove_file(plot);
            }
            return Err(e);
        }
        tracing::info!(
            "equations saved: {} ({} curves)",
            equations.display(),
            curves.len()
        );
    }

    Ok(RunSummary::Image {
        plot: outputs.plot,
        equations: outputs.equations,
        curve_count: curves.len(),
    })
}

fn run_video(
    request: &RunRequest,
    tools: &Toolchain,
    cancel: &CancelToken,
) -> Result<RunSummary, RunError> {
    if request.mode != OutputMode::Plot {
        tracing::warn!("video mode renders plots only; ignoring --mode {:?}", request.mode);
    }
    let output = video_output(&request.input, request.output.as_deref());
    let scratch = ScratchScope::create(
        scratch_dir(&request.input, &output),
        request.config.keep_temp,
    )?;
    let source_dir = scratch.subdir("source")?;
    let frame_dir = scratch.subdir("frames")?;

    let unreadable = |reason: String| RunError::SourceUnreadable {
        path: request.input.clone(),
        reason,
    };

    let probe = tools
        .decoder
        .probe(&request.input)
        .map_err(|e| unreadable(e.to_string()))?;
    if probe.frame_count == 0 {
        return Err(unreadable("no video frames".to_owned()));
    }
    if probe.dimensions.width == 0 || probe.dimensions.height == 0 {
        return Err(unreadable("video stream has no picture size".to_owned()));
    }

    let mut plan = FramePlan::new(
        probe.frame_count,
        probe.fps,
        request.config.max_frames,
        request.config.target_fps,
    );
    tracing::info!(
        total = probe.frame_count,
        width = probe.dimensions.width,
        height = probe.dimensions.height,
        native_fps = probe.fps,
        stride = plan.stride,
        sampled = plan.len(),
        output_fps = plan.output_fps,
        "sampling video"
    );
    cancel.check()?;

    let files = tools
        .decoder
        .extract(&request.input, &plan, &source_dir)
        .map_err(|e| unreadable(e.to_string()))?;
    if files.is_empty() {
        return Err(unreadable("no frames could be extracted".to_owned()));
    }
    if files.len() < plan.len() {
        tracing::warn!(
            "source yielded {} of {} planned frames",
            files.len(),
            plan.len()
        );
        plan.truncate(files.len());
    }
    let frames = RasterFrame::from_plan(&plan, files);

    let runner = FrameRunner {
        config: &request.config,
        tracer: tools.tracer.as_ref(),
        work_dir: &frame_dir,
        cancel,
    };
    let results = runner.run(&frames)?;
    let placeholders = results.iter().filter(|r| r.outcome.is_placeholder()).count();
    if placeholders > 0 {
        tracing::warn!("{placeholders} of {} frames failed", results.len());
    }
    cancel.check()?;

    let images: Vec<PathBuf> = results
        .iter()
        .map(|r| r.outcome.path().to_path_buf())
        .collect();
    let strategy = assemble(
        &AssemblyRequest {
            frames: &images,
            fps: plan.output_fps,
            audio_source: probe.has_audio.then_some(request.input.as_path()),
            output: &output,
            scratch_dir: scratch.path(),
        },
        tools.encoder.as_ref(),
        cancel,
    )?;

    Ok(RunSummary::Video {
        output,
        frames: images.len(),
        placeholders,
        strategy,
    })
}
