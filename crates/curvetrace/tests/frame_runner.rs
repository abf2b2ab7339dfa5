//! Integration test: per-frame failures are contained as placeholders.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod common;

use std::path::PathBuf;

use common::{FailingTracer, test_config, write_disc};
use curvetrace::frames::{FrameOutcome, FrameRunner, RasterFrame};
use curvetrace::{CancelToken, RunError};

fn five_frames(dir: &std::path::Path) -> Vec<RasterFrame> {
    (0..5)
        .map(|i| {
            let path = dir.join(format!("source_{:06}.png", i + 1));
            write_disc(&path, u32::try_from(i).unwrap() * 2);
            RasterFrame {
                index: i,
                source_index: i as u64 * 3,
                timestamp: i as f64 * 0.1,
                path,
            }
        })
        .collect()
}

#[test]
fn failing_frame_becomes_placeholder() {
    let src = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    let frames = five_frames(src.path());
    let config = test_config();
    let tracer = FailingTracer {
        poison: "frame_000003".into(),
    };
    let cancel = CancelToken::new();

    let runner = FrameRunner {
        config: &config,
        tracer: &tracer,
        work_dir: work.path(),
        cancel: &cancel,
    };
    let results = runner.run(&frames).unwrap();

    assert_eq!(results.len(), 5);
    for (i, result) in results.iter().enumerate() {
        assert_eq!(result.index, i);
        let expected: PathBuf = work.path().join(format!("frame_{i:06}.png"));
        assert_eq!(result.outcome.path(), expected);
        let img = image::open(&expected).unwrap();
        assert_eq!((img.width(), img.height()), (64, 48));

        match (&result.outcome, i) {
            (FrameOutcome::Placeholder { reason, .. }, 3) => {
                assert!(reason.contains("forced failure"), "{reason}");
            }
            (FrameOutcome::Rendered { curve_count, .. }, 0 | 1 | 2 | 4) => {
                assert!(*curve_count > 0);
            }
            (outcome, i) => panic!("unexpected outcome for frame {i}: {outcome:?}"),
        }
    }
}

#[test]
fn cancelled_batch_stops() {
    let src = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    let frames = five_frames(src.path());
    let config = test_config();
    let tracer = FailingTracer {
        poison: "never".into(),
    };
    let cancel = CancelToken::new();
    cancel.cancel();

    let runner = FrameRunner {
        config: &config,
        tracer: &tracer,
        work_dir: work.path(),
        cancel: &cancel,
    };
    assert!(matches!(runner.run(&frames), Err(RunError::Cancelled)));
}

#[test]
fn empty_batch_is_empty() {
    let work = tempfile::tempdir().unwrap();
    let config = test_config();
    let tracer = FailingTracer {
        poison: "never".into(),
    };
    let cancel = CancelToken::new();
    let runner = FrameRunner {
        config: &config,
        tracer: &tracer,
        work_dir: work.path(),
        cancel: &cancel,
    };
    assert!(runner.run(&[]).unwrap().is_empty());
}
