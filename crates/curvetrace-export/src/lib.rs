//! curvetrace-export: output serializers for curve sets (sans-IO).
//!
//! - [`equation`] writes one parametric equation per curve.
//! - [`plot`] renders curves (or a failure placeholder) to PNG bytes.
//!
//! Callers own the files; this crate only formats.

pub mod equation;
pub mod plot;

pub use equation::{CurveEquation, write_equations};
pub use plot::{
    PLACEHOLDER_INDEX_BITS, PLOT_SAMPLES, PlotError, PlotOptions, render_placeholder, render_plot,
};
