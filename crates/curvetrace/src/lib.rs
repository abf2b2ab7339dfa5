//! curvetrace: turn images and videos into cubic Bezier curves.
//!
//! This crate is the I/O layer around the pure
//! [`curvetrace_pipeline`] and [`curvetrace_export`] crates:
//!
//! - [`tools`]: tracer, video decoder and encoder adapters.
//! - [`extract`]: the per-image stage chain.
//! - [`frames`]: parallel per-frame processing with contained failures.
//! - [`assemble`]: frame images to video with strategy fallback.
//! - [`run`]: the orchestrator the binary calls.

pub mod assemble;
pub mod error;
pub mod extract;
pub mod frames;
pub mod run;
pub mod scratch;
pub mod tools;

pub use error::RunError;
pub use run::{OutputMode, RunRequest, RunSummary, Toolchain, required_programs, run};
pub use scratch::{CancelToken, ScratchScope};
