//! Frame pipeline runner.
//!
//! Runs the extractor on every sampled frame over a bounded rayon pool.
//! A frame that fails is not fatal: a placeholder image is written under
//! the frame's own name so the sequence handed to the assembler stays
//! complete and gap-free.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use curvetrace_export::render_placeholder;
use curvetrace_pipeline::{FramePlan, PipelineConfig};
use rayon::prelude::*;

use crate::error::RunError;
use crate::extract::{ExtractContext, Raw};
use crate::scratch::CancelToken;
use crate::tools::BitmapTracer;

/// Progress is logged every this many completed frames.
const PROGRESS_EVERY: usize = 10;

/// One extracted video frame.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterFrame {
    /// Position in the sampled sequence (0-based, gap-free).
    pub index: usize,
    /// Frame index in the source video.
    pub source_index: u64,
    /// Source timestamp in seconds.
    pub timestamp: f64,
    /// The extracted image file.
    pub path: PathBuf,
}

impl RasterFrame {
    /// Pair a plan with the files the decoder produced for it.
    ///
    /// Extra plan entries (the source ended early) are dropped.
    #[must_use]
    pub fn from_plan(plan: &FramePlan, files: Vec<PathBuf>) -> Vec<Self> {
        plan.indices
            .iter()
            .zip(files)
            .enumerate()
            .map(|(index, (&source_index, path))| Self {
                index,
                source_index,
                timestamp: plan.timestamp(source_index),
                path,
            })
            .collect()
    }

    /// Stem shared by every working file of this frame.
    #[must_use]
    pub fn stem(&self) -> String {
        frame_stem(self.index)
    }
}

/// `frame_000003` for index 3.
#[must_use]
pub fn frame_stem(index: usize) -> String {
    format!("frame_{index:06}")
}

/// What happened to one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Curves were extracted and plotted.
    Rendered {
        /// The plot image.
        path: PathBuf,
        /// Number of curves drawn.
        curve_count: usize,
    },
    /// Extraction failed; an error marker stands in for the plot.
    Placeholder {
        /// The placeholder image.
        path: PathBuf,
        /// Why the frame failed.
        reason: String,
    },
}

impl FrameOutcome {
    /// The image to feed to the assembler.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Rendered { path, .. } | Self::Placeholder { path, .. } => path,
        }
    }

    /// Whether the frame fell back to a placeholder.
    #[must_use]
    pub const fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder { .. })
    }
}

/// Result for one frame, aligned with its [`RasterFrame::index`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameResult {
    /// Position in the sampled sequence.
    pub index: usize,
    /// What happened.
    pub outcome: FrameOutcome,
}

/// Shared settings of a batch.
pub struct FrameRunner<'a> {
    /// Validated configuration (plot size, tracer options, worker count).
    pub config: &'a PipelineConfig,
    /// Tracer used for every frame.
    pub tracer: &'a dyn BitmapTracer,
    /// Directory receiving `frame_NNNNNN.{bmp,svg,png}`.
    pub work_dir: &'a Path,
    /// Checked before each frame starts.
    pub cancel: &'a CancelToken,
}

impl FrameRunner<'_> {
    /// Process every frame and return results ordered by index.
    ///
    /// # Errors
    ///
    /// [`RunError::Cancelled`] if cancellation is observed,
    /// [`RunError::WorkerPool`] if the pool cannot start, and
    /// [`RunError::Io`] or [`RunError::Render`] if even the placeholder
    /// for a failed frame cannot be written.
    pub fn run(&self, frames: &[RasterFrame]) -> Result<Vec<FrameResult>, RunError> {
        let total = frames.len();
        let done = AtomicUsize::new(0);

        let mut builder = rayon::ThreadPoolBuilder::new();
        if self.config.jobs > 0 {
            builder = builder.num_threads(self.config.jobs);
        }
        let pool = builder.build()?;

        let mut results = pool.install(|| {
            frames
                .par_iter()
                .map(|frame| {
                    self.cancel.check()?;
                    let result = self.run_one(frame)?;
                    let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
                    if finished % PROGRESS_EVERY == 0 || finished == total {
                        tracing::info!("processed {finished}/{total} frames");
                    }
                    Ok(result)
                })
                .collect::<Result<Vec<_>, RunError>>()
        })?;

        results.sort_by_key(|r| r.index);
        Ok(results)
    }

    fn run_one(&self, frame: &RasterFrame) -> Result<FrameResult, RunError> {
        let stem = frame.stem();
        let plot_path = self.work_dir.join(format!("{stem}.png"));

        let outcome = match self.extract(frame, &stem, &plot_path) {
            Ok(curve_count) => FrameOutcome::Rendered {
                path: plot_path,
                curve_count,
            },
            Err(e) => {
                let reason = e.to_string();
                tracing::warn!(
                    frame = frame.index,
                    source_index = frame.source_index,
                    "frame failed, using placeholder: {reason}"
                );
                let png = render_placeholder(
                    self.config.plot_width,
                    self.config.plot_height,
                    frame.index,
                )?;
                std::fs::write(&plot_path, png).map_err(|e| RunError::io(&plot_path, e))?;
                FrameOutcome::Placeholder {
                    path: plot_path,
                    reason,
                }
            }
        };

        Ok(FrameResult {
            index: frame.index,
            outcome,
        })
    }

    fn extract(&self, frame: &RasterFrame, stem: &str, plot_path: &Path) -> Result<usize, RunError> {
        let ctx = ExtractContext {
            config: self.config,
            tracer: self.tracer,
            work_dir: self.work_dir,
        };
        let curves = Raw::new(&frame.path, stem, ctx)
            .binarize()?
            .trace()?
            .normalize()?;
        let png = curves.plot_png()?;
        std::fs::write(plot_path, png).map_err(|e| RunError::io(plot_path, e))?;
        tracing::debug!(
            frame = frame.index,
            timestamp = frame.timestamp,
            curves = curves.len(),
            "frame rendered"
        );
        Ok(curves.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_pair_plan_indices_with_files() {
        let plan = FramePlan::new(100, 25.0, Some(4), None);
        let files = vec![PathBuf::from("a.png"), PathBuf::from("b.png")];
        let frames = RasterFrame::from_plan(&plan, files);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].index, 1);
        assert_eq!(frames[1].source_index, 25);
        assert!((frames[1].timestamp - 1.0).abs() < 1e-12);
        assert_eq!(frames[1].stem(), "frame_000001");
    }

    #[test]
    fn outcome_exposes_its_image() {
        let outcome = FrameOutcome::Placeholder {
            path: PathBuf::from("frame_000003.png"),
            reason: "tracer failed".into(),
        };
        assert!(outcome.is_placeholder());
        assert_eq!(outcome.path(), Path::new("frame_000003.png"));
    }
}
