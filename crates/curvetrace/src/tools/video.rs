use std::path::{Path, PathBuf};
use std::process::Command;

use curvetrace_pipeline::{Dimensions, FramePlan};
use serde::Deserialize;

use super::{ToolError, run_tool};

/// Metadata the frame sampler needs from a video source.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoProbe {
    /// Total number of video frames (reported or estimated from duration).
    pub frame_count: u64,
    /// Native frame rate.
    pub fps: f64,
    /// Whether the container has at least one audio stream.
    pub has_audio: bool,
    /// Frame size.
    pub dimensions: Dimensions,
}

/// Reads metadata and frames out of a video file.
pub trait VideoDecoder: Send + Sync {
    /// Probe frame count, rate, audio presence and size.
    ///
    /// # Errors
    ///
    /// Returns a [`ToolError`] if the source cannot be opened or has no
    /// usable video stream.
    fn probe(&self, source: &Path) -> Result<VideoProbe, ToolError>;

    /// Extract the frames named by `plan` into `out_dir` as image files.
    ///
    /// Returns their paths in plan order. The list may be shorter than
    /// the plan when the source ends early.
    ///
    /// # Errors
    ///
    /// Returns a [`ToolError`] if decoding fails.
    fn extract(
        &self,
        source: &Path,
        plan: &FramePlan,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, ToolError>;
}

/// Turns an ordered image sequence into a video file.
///
/// Each method is one way of feeding frames to the encoder; the
/// assembler tries them in turn.
pub trait VideoEncoder: Send + Sync {
    /// Encode every file matching a shell glob, in name order, optionally
    /// muxing the first audio track of `audio_source`.
    ///
    /// # Errors
    ///
    /// Returns a [`ToolError`] if encoding fails.
    fn encode_glob(
        &self,
        pattern: &Path,
        fps: f64,
        audio_source: Option<&Path>,
        output: &Path,
    ) -> Result<(), ToolError>;

    /// Encode a zero-based numeric sequence given as a `printf` pattern
    /// such as `dir/%06d.png`.
    ///
    /// # Errors
    ///
    /// Returns a [`ToolError`] if encoding fails.
    fn encode_sequence(&self, pattern: &Path, fps: f64, output: &Path) -> Result<(), ToolError>;

    /// Encode from a concat demuxer list file.
    ///
    /// # Errors
    ///
    /// Returns a [`ToolError`] if encoding fails.
    fn encode_concat(&self, list: &Path, fps: f64, output: &Path) -> Result<(), ToolError>;
}

// ───────────────────────────── ffprobe ─────────────────────────────

#[derive(Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    nb_frames: Option<String>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    duration: Option<String>,
}

#[derive(Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

#[derive(Deserialize)]
struct ProbeOut {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

/// Parse an ffprobe rate such as `30000/1001` or `25`.
fn parse_rate(rate: &str) -> Option<f64> {
    let value = match rate.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => rate.trim().parse().ok()?,
    };
    (value.is_finite() && value > 0.0).then_some(value)
}

/// Interpret `ffprobe -print_format json -show_streams -show_format`
/// output.
fn parse_probe(json: &[u8]) -> Result<VideoProbe, String> {
    let parsed: ProbeOut =
        serde_json::from_slice(json).map_err(|e| format!("ffprobe json parse failed: {e}"))?;

    let video = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or("no video stream found")?;
    let width = video.width.ok_or("missing video width")?;
    let height = video.height.ok_or("missing video height")?;
    let fps = video
        .r_frame_rate
        .as_deref()
        .and_then(parse_rate)
        .or_else(|| video.avg_frame_rate.as_deref().and_then(parse_rate))
        .ok_or("missing or zero video frame rate")?;

    let reported = video
        .nb_frames
        .as_deref()
        .and_then(|n| n.trim().parse::<u64>().ok())
        .filter(|&n| n > 0);
    let frame_count = match reported {
        Some(n) => n,
        None => {
            let duration = video
                .duration
                .as_deref()
                .or_else(|| parsed.format.as_ref()?.duration.as_deref())
                .and_then(|d| d.trim().parse::<f64>().ok())
                .filter(|d| d.is_finite() && *d > 0.0)
                .ok_or("frame count unavailable: no nb_frames and no duration")?;
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let estimated = (duration * fps).round() as u64;
            estimated
        }
    };

    let has_audio = parsed
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    Ok(VideoProbe {
        frame_count,
        fps,
        has_audio,
        dimensions: Dimensions { width, height },
    })
}

/// ffmpeg `select` filter keeping every `stride`-th decoded frame.
fn select_filter(stride: u64) -> String {
    format!("select=not(mod(n\\,{stride}))")
}

/// Prefix of the files [`FfmpegDecoder::extract`] writes.
const EXTRACT_PREFIX: &str = "source_";

/// `ffprobe`/`ffmpeg` backed decoder.
#[derive(Debug, Clone, Default)]
pub struct FfmpegDecoder;

impl VideoDecoder for FfmpegDecoder {
    fn probe(&self, source: &Path) -> Result<VideoProbe, ToolError> {
        let out = run_tool(
            Command::new("ffprobe")
                .args([
                    "-v",
                    "error",
                    "-print_format",
                    "json",
                    "-show_streams",
                    "-show_format",
                ])
                .arg(source),
        )?;
        parse_probe(&out.stdout).map_err(|message| ToolError::Output {
            program: "ffprobe".to_owned(),
            message,
        })
    }

    fn extract(
        &self,
        source: &Path,
        plan: &FramePlan,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, ToolError> {
        if plan.is_empty() {
            return Ok(Vec::new());
        }
        run_tool(
            Command::new("ffmpeg")
                .args(["-v", "error", "-y", "-i"])
                .arg(source)
                .args([
                    "-vf",
                    &select_filter(plan.stride),
                    "-vsync",
                    "vfr",
                    "-frames:v",
                    &plan.len().to_string(),
                ])
                .arg(out_dir.join(format!("{EXTRACT_PREFIX}%06d.png"))),
        )?;

        let entries = std::fs::read_dir(out_dir).map_err(|source| ToolError::Io {
            path: out_dir.to_path_buf(),
            source,
        })?;
        let mut frames: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(EXTRACT_PREFIX) && n.ends_with(".png"))
            })
            .collect();
        frames.sort();
        frames.truncate(plan.len());
        Ok(frames)
    }
}

// ───────────────────────────── encoder ─────────────────────────────

/// `ffmpeg` backed encoder producing H.264 MP4.
#[derive(Debug, Clone, Default)]
pub struct FfmpegEncoder;

impl FfmpegEncoder {
    fn base() -> Command {
        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-v", "error", "-y"]);
        cmd
    }

    /// H.264 + yuv420p for broad compatibility; yuv420p needs even sizes.
    fn video_output_args(cmd: &mut Command) {
        cmd.args([
            "-vf",
            "scale=trunc(iw/2)*2:trunc(ih/2)*2",
            "-c:v",
            "libx264",
            "-pix_fmt",
            "yuv420p",
            "-movflags",
            "+faststart",
        ]);
    }
}

impl VideoEncoder for FfmpegEncoder {
    fn encode_glob(
        &self,
        pattern: &Path,
        fps: f64,
        audio_source: Option<&Path>,
        output: &Path,
    ) -> Result<(), ToolError> {
        let mut cmd = Self::base();
        cmd.args(["-framerate", &fps.to_string(), "-pattern_type", "glob", "-i"])
            .arg(pattern);
        if let Some(audio) = audio_source {
            cmd.arg("-i")
                .arg(audio)
                .args(["-map", "0:v:0", "-map", "1:a:0?", "-c:a", "aac", "-shortest"]);
        } else {
            cmd.arg("-an");
        }
        Self::video_output_args(&mut cmd);
        run_tool(cmd.arg(output))?;
        Ok(())
    }

    fn encode_sequence(&self, pattern: &Path, fps: f64, output: &Path) -> Result<(), ToolError> {
        let mut cmd = Self::base();
        cmd.args(["-framerate", &fps.to_string(), "-start_number", "0", "-i"])
            .arg(pattern)
            .arg("-an");
        Self::video_output_args(&mut cmd);
        run_tool(cmd.arg(output))?;
        Ok(())
    }

    fn encode_concat(&self, list: &Path, fps: f64, output: &Path) -> Result<(), ToolError> {
        let mut cmd = Self::base();
        cmd.args(["-f", "concat", "-safe", "0", "-i"])
            .arg(list)
            .args(["-r", &fps.to_string(), "-an"]);
        Self::video_output_args(&mut cmd);
        run_tool(cmd.arg(output))?;
        Ok(())
    }
}
