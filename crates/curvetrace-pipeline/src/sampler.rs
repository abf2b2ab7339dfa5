//! Frame subsampling plan for video input.
//!
//! Given a source's frame count and native rate, decides which frame
//! indices to process so the output honours an optional frame cap and an
//! optional target rate. The plan is pure arithmetic; extracting the
//! frames it names is the video decoder's job.

use serde::{Deserialize, Serialize};

/// Which source frames to process, and at what rate to play them back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FramePlan {
    /// Interval between sampled source indices (at least 1).
    pub stride: u64,
    /// Sampled zero-based source indices, strictly increasing.
    pub indices: Vec<u64>,
    /// Native rate of the source in frames per second.
    pub native_fps: f64,
    /// Playback rate for the assembled animation.
    pub output_fps: f64,
}

impl FramePlan {
    /// Compute the sampling plan.
    ///
    /// - `stride_rate = max(1, floor(native / target))` when a target
    ///   below the native rate is given, otherwise 1.
    /// - With a cap `M`: `stride = max(stride_rate, floor(total / M))`.
    /// - Every multiple of `stride` below `total` is taken in ascending
    ///   order, stopping once `M` indices were emitted.
    ///
    /// The playback rate is the target when given, otherwise
    /// `native / stride` so the animation keeps the source's duration.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn new(
        total_frames: u64,
        native_fps: f64,
        max_frames: Option<u32>,
        target_fps: Option<f64>,
    ) -> Self {
        let stride_rate = match target_fps {
            Some(target) if target > 0.0 && target < native_fps => {
                ((native_fps / target).floor() as u64).max(1)
            }
            _ => 1,
        };
        let stride = match max_frames {
            Some(cap) if cap > 0 => stride_rate.max(total_frames / u64::from(cap)),
            _ => stride_rate,
        };
        let limit = max_frames.map_or(usize::MAX, |m| m as usize);
        let indices: Vec<u64> = (0..total_frames)
            .step_by(usize::try_from(stride).unwrap_or(usize::MAX))
            .take(limit)
            .collect();
        let output_fps = target_fps.unwrap_or(native_fps / stride as f64);

        Self {
            stride,
            indices,
            native_fps,
            output_fps,
        }
    }

    /// Number of frames the plan samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Returns `true` if nothing is sampled (empty source).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Source timestamp in seconds of a sampled index.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn timestamp(&self, source_index: u64) -> f64 {
        if self.native_fps > 0.0 {
            source_index as f64 / self.native_fps
        } else {
            0.0
        }
    }

    /// Keep only the first `available` samples, for sources that ran out
    /// of frames before their reported count.
    pub fn truncate(&mut self, available: usize) {
        self.indices.truncate(available);
    }
}
