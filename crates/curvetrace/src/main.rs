//! curvetrace: convert an image or video into cubic Bezier curves.
//!
//! ```text
//! curvetrace cat.jpg --mode both
//! curvetrace cat.jpg --mode plot --output result.png --threshold-mode --threshold 30
//! curvetrace dance.mp4 --video --frames 120 --fps 12
//! ```

#![allow(clippy::print_stderr)]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, ValueEnum};
use curvetrace::tools::is_on_path;
use curvetrace::{CancelToken, OutputMode, RunRequest, RunSummary, Toolchain, required_programs};
use curvetrace_pipeline::{PipelineConfig, PreprocessMode, TracerKind};
use tracing::Level;

/// Convert images (or video frames) to parametric cubic Bezier curves,
/// rendered as a plot, written as Desmos equations, or reassembled into
/// an animation.
#[derive(Parser)]
#[command(name = "curvetrace", version)]
#[allow(clippy::struct_excessive_bools)]
struct Cli {
    /// Input image (PNG, JPEG, BMP, WebP) or, with --video, a video file.
    input: PathBuf,

    /// What to produce for an image.
    #[arg(short, long, value_enum, default_value_t = Mode::Plot)]
    mode: Mode,

    /// Treat the input as a video and assemble a curve animation.
    #[arg(long)]
    video: bool,

    /// Output file name (for --mode both, see the docs on naming).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Binarize by flat threshold instead of edge detection.
    #[arg(long)]
    threshold_mode: bool,

    /// Black/white threshold in percent (0-100), used with --threshold-mode.
    #[arg(short, long, default_value_t = PipelineConfig::DEFAULT_THRESHOLD_PERCENT)]
    threshold: u8,

    /// Canny low threshold.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_CANNY_LOW)]
    canny_low: f32,

    /// Canny high threshold.
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_CANNY_HIGH)]
    canny_high: f32,

    /// Gaussian blur kernel size (odd; 1 disables blurring).
    #[arg(long, default_value_t = PipelineConfig::DEFAULT_BLUR_KERNEL)]
    blur_kernel: u32,

    /// Bitmap tracer.
    #[arg(long, value_enum, default_value_t = Tracer::Potrace)]
    tracer: Tracer,

    /// Disable the grid in plots.
    #[arg(long)]
    no_grid: bool,

    /// Keep intermediate bitmap, SVG and frame files.
    #[arg(long)]
    keep_temp: bool,

    /// Maximum number of video frames to process.
    #[arg(long = "frames", value_name = "M")]
    max_frames: Option<u32>,

    /// Output frame rate of the animation.
    #[arg(long = "fps", value_name = "T")]
    target_fps: Option<f64>,

    /// Worker threads for video frames (0 = all cores).
    #[arg(short, long, default_value_t = 0)]
    jobs: usize,

    /// Full pipeline config as a JSON string.
    ///
    /// When provided, all other pipeline parameter flags are ignored.
    /// The JSON must be a valid `PipelineConfig` serialization; missing
    /// fields take their defaults.
    #[arg(long)]
    config_json: Option<String>,

    /// More log output (repeat for trace level).
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    /// Only log errors.
    #[arg(short, long)]
    quiet: bool,
}

/// Output mode selection.
#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    /// Rendered PNG plot.
    Plot,
    /// Desmos equation listing.
    Desmos,
    /// Plot and equations.
    Both,
}

/// Bitmap tracer selection.
#[derive(Clone, Copy, ValueEnum)]
enum Tracer {
    /// External `potrace` (smooth cubic outlines).
    Potrace,
    /// Built-in border following (no external tool).
    Contour,
}

/// Build a [`PipelineConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<PipelineConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("invalid --config-json: {e}"));
    }

    Ok(PipelineConfig {
        mode: if cli.threshold_mode {
            PreprocessMode::Threshold
        } else {
            PreprocessMode::Edges
        },
        canny_low: cli.canny_low,
        canny_high: cli.canny_high,
        blur_kernel: cli.blur_kernel,
        threshold_percent: cli.threshold,
        tracer: match cli.tracer {
            Tracer::Potrace => TracerKind::Potrace,
            Tracer::Contour => TracerKind::Contour,
        },
        show_grid: !cli.no_grid,
        max_frames: cli.max_frames,
        target_fps: cli.target_fps,
        jobs: cli.jobs,
        keep_temp: cli.keep_temp,
        ..PipelineConfig::default()
    })
}

const fn log_level(verbose: u8, quiet: bool) -> Level {
    if quiet {
        return Level::ERROR;
    }
    match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(log_level(cli.verbose, cli.quiet))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("error: {msg}");
            return ExitCode::FAILURE;
        }
    };

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || handler_token.cancel()) {
        tracing::warn!("Ctrl-C handler unavailable: {e}");
    }

    let request = RunRequest {
        input: cli.input,
        output: cli.output,
        mode: match cli.mode {
            Mode::Plot => OutputMode::Plot,
            Mode::Desmos => OutputMode::Desmos,
            Mode::Both => OutputMode::Both,
        },
        video: cli.video,
        config,
    };
    for (program, version_arg) in required_programs(&request.config, request.video) {
        if !is_on_path(program, version_arg) {
            eprintln!("error: {program} not found on PATH");
            if program == "potrace" {
                eprintln!("hint: install potrace or pass --tracer contour");
            }
            return ExitCode::FAILURE;
        }
    }
    let tools = Toolchain::system(&request.config);

    match curvetrace::run(&request, &tools, &cancel) {
        Ok(RunSummary::Image { curve_count, .. }) => {
            tracing::info!("conversion completed ({curve_count} curves)");
            ExitCode::SUCCESS
        }
        Ok(RunSummary::Video {
            output,
            frames,
            placeholders,
            strategy,
        }) => {
            tracing::info!(
                "animation saved: {} ({frames} frames, {placeholders} placeholders, {strategy})",
                output.display()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_map_onto_config() {
        let cli = Cli::parse_from([
            "curvetrace",
            "in.png",
            "--threshold-mode",
            "--threshold",
            "30",
            "--tracer",
            "contour",
            "--no-grid",
            "--frames",
            "12",
        ]);
        let config = config_from_cli(&cli).unwrap();
        assert_eq!(config.mode, PreprocessMode::Threshold);
        assert_eq!(config.threshold_percent, 30);
        assert_eq!(config.tracer, TracerKind::Contour);
        assert!(!config.show_grid);
        assert_eq!(config.max_frames, Some(12));
    }

    #[test]
    fn config_json_overrides_flags() {
        let cli = Cli::parse_from([
            "curvetrace",
            "in.png",
            "--threshold",
            "30",
            "--config-json",
            r#"{"threshold_percent": 70, "tracer": "contour"}"#,
        ]);
        let config = config_from_cli(&cli).unwrap();
        assert_eq!(config.threshold_percent, 70);
        assert_eq!(config.tracer, TracerKind::Contour);
        assert_eq!(config.blur_kernel, PipelineConfig::DEFAULT_BLUR_KERNEL);
    }

    #[test]
    fn verbosity_selects_level() {
        assert_eq!(log_level(0, false), Level::INFO);
        assert_eq!(log_level(2, false), Level::TRACE);
        assert_eq!(log_level(3, true), Level::ERROR);
    }
}
