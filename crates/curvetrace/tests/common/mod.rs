#![allow(dead_code, clippy::unwrap_used)]

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use curvetrace::tools::{
    BitmapTracer, ContourTracer, FfmpegDecoder, ToolError, VideoDecoder, VideoEncoder, VideoProbe,
};
use curvetrace::{RunRequest, Toolchain};
use curvetrace_pipeline::{Dimensions, FramePlan, PipelineConfig, PreprocessMode, TracerKind};

/// Config that needs no external tools and renders small plots.
pub fn test_config() -> PipelineConfig {
    PipelineConfig {
        mode: PreprocessMode::Threshold,
        tracer: TracerKind::Contour,
        plot_width: 64,
        plot_height: 48,
        jobs: 2,
        ..PipelineConfig::default()
    }
}

/// A dark disc on white, shifted by `offset` pixels.
pub fn write_disc(path: &Path, offset: u32) {
    let img = image::GrayImage::from_fn(40, 30, |x, y| {
        let dx = f64::from(x) - f64::from(12 + offset);
        let dy = f64::from(y) - 15.0;
        image::Luma([if dx.hypot(dy) < 7.0 { 0 } else { 255 }])
    });
    img.save(path).unwrap();
}

pub fn request(input: PathBuf, output: Option<PathBuf>) -> RunRequest {
    RunRequest {
        input,
        output,
        mode: curvetrace::OutputMode::Plot,
        video: false,
        config: test_config(),
    }
}

pub fn toolchain(
    tracer: Box<dyn BitmapTracer>,
    decoder: Box<dyn VideoDecoder>,
    encoder: Box<dyn VideoEncoder>,
) -> Toolchain {
    Toolchain {
        tracer,
        decoder,
        encoder,
    }
}

pub fn image_toolchain() -> Toolchain {
    toolchain(
        Box::new(ContourTracer),
        Box::new(FfmpegDecoder),
        Box::new(MockEncoder::succeeding_on(&[])),
    )
}

/// Contour tracer that fails for bitmaps whose name contains `poison`.
pub struct FailingTracer {
    pub poison: String,
}

impl BitmapTracer for FailingTracer {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn trace(&self, bitmap: &Path, svg_out: &Path) -> Result<(), ToolError> {
        let name = bitmap.file_name().unwrap().to_string_lossy();
        if name.contains(&self.poison) {
            return Err(ToolError::Status {
                program: "potrace".into(),
                status: "exit status: 2".into(),
                stderr: "forced failure".into(),
            });
        }
        ContourTracer.trace(bitmap, svg_out)
    }
}

/// Which encoder entry point was called.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Glob,
    Sequence,
    Concat,
}

/// Encoder that succeeds only for the listed entry points. Failing calls
/// leave a partial output behind to check that it gets cleaned up.
pub struct MockEncoder {
    pub succeed: Vec<Call>,
    pub calls: Mutex<Vec<Call>>,
    pub audio: Mutex<Option<PathBuf>>,
    pub concat_script: Mutex<Option<String>>,
    pub sequence_files: Mutex<Vec<String>>,
}

impl MockEncoder {
    pub fn succeeding_on(calls: &[Call]) -> Self {
        Self {
            succeed: calls.to_vec(),
            calls: Mutex::new(Vec::new()),
            audio: Mutex::new(None),
            concat_script: Mutex::new(None),
            sequence_files: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn finish(&self, call: Call, output: &Path) -> Result<(), ToolError> {
        self.calls.lock().unwrap().push(call);
        std::fs::write(output, b"fake mp4").unwrap();
        if self.succeed.contains(&call) {
            Ok(())
        } else {
            Err(ToolError::Status {
                program: "ffmpeg".into(),
                status: "exit status: 1".into(),
                stderr: format!("{call:?} refused"),
            })
        }
    }
}

impl VideoEncoder for MockEncoder {
    fn encode_glob(
        &self,
        _pattern: &Path,
        _fps: f64,
        audio_source: Option<&Path>,
        output: &Path,
    ) -> Result<(), ToolError> {
        *self.audio.lock().unwrap() = audio_source.map(Path::to_path_buf);
        self.finish(Call::Glob, output)
    }

    fn encode_sequence(&self, pattern: &Path, _fps: f64, output: &Path) -> Result<(), ToolError> {
        let dir = pattern.parent().unwrap();
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        *self.sequence_files.lock().unwrap() = names;
        self.finish(Call::Sequence, output)
    }

    fn encode_concat(&self, list: &Path, _fps: f64, output: &Path) -> Result<(), ToolError> {
        *self.concat_script.lock().unwrap() = Some(std::fs::read_to_string(list).unwrap());
        self.finish(Call::Concat, output)
    }
}

/// Decoder serving synthetic frames.
pub struct MockDecoder {
    pub probe: Option<VideoProbe>,
}

impl MockDecoder {
    pub fn with_frames(frame_count: u64, fps: f64, has_audio: bool) -> Self {
        Self {
            probe: Some(VideoProbe {
                frame_count,
                fps,
                has_audio,
                dimensions: Dimensions {
                    width: 40,
                    height: 30,
                },
            }),
        }
    }
}

impl VideoDecoder for MockDecoder {
    fn probe(&self, _source: &Path) -> Result<VideoProbe, ToolError> {
        self.probe.clone().ok_or_else(|| ToolError::Output {
            program: "ffprobe".into(),
            message: "no video stream found".into(),
        })
    }

    fn extract(
        &self,
        _source: &Path,
        plan: &FramePlan,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, ToolError> {
        let mut files = Vec::new();
        for (i, &source_index) in plan.indices.iter().enumerate() {
            let path = out_dir.join(format!("source_{:06}.png", i + 1));
            write_disc(&path, u32::try_from(source_index % 10).unwrap());
            files.push(path);
        }
        Ok(files)
    }
}

/// Entries directly inside `dir`, sorted.
pub fn list_dir(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
