//! Parametric equation emitter.
//!
//! Turns each [`CubicControlSet`] into the Bernstein-form pair
//! `(x(t), y(t))`, `t in [0, 1]`, written in the syntax Desmos accepts for
//! parametric curves:
//!
//! ```text
//! ((1-t)^3*x0+3*(1-t)^2*t*x1+3*(1-t)*t^2*x2+t^3*x3,(1-t)^3*y0+...+t^3*y3)
//! ```

use std::fmt;
use std::io::{self, Write};

use curvetrace_pipeline::{AxisConvention, CubicControlSet};

/// One parametric curve: Bernstein coefficients for each axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveEquation {
    /// `x0..x3`.
    pub x: [f64; 4],
    /// `y0..y3`.
    pub y: [f64; 4],
}

impl CurveEquation {
    /// Build the equation for a control set under an axis convention.
    #[must_use]
    pub fn new(controls: &CubicControlSet, axis: AxisConvention) -> Self {
        let c = controls.oriented(axis);
        Self {
            x: [c.p0.x, c.p1.x, c.p2.x, c.p3.x],
            y: [c.p0.y, c.p1.y, c.p2.y, c.p3.y],
        }
    }

    /// Evaluate `(x(t), y(t))`.
    #[must_use]
    pub fn eval(&self, t: f64) -> (f64, f64) {
        (bernstein(&self.x, t), bernstein(&self.y, t))
    }
}

fn bernstein(k: &[f64; 4], t: f64) -> f64 {
    let mt = 1.0 - t;
    (t * t * t).mul_add(
        k[3],
        (3.0 * mt * t * t).mul_add(k[2], (3.0 * mt * mt * t).mul_add(k[1], mt * mt * mt * k[0])),
    )
}

/// Format a coefficient, folding negative zero into zero so flipped
/// axes never print `-0`.
struct Coeff(f64);

impl fmt::Display for Coeff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0 + 0.0)
    }
}

fn write_axis(f: &mut fmt::Formatter<'_>, k: &[f64; 4]) -> fmt::Result {
    write!(
        f,
        "(1-t)^3*{}+3*(1-t)^2*t*{}+3*(1-t)*t^2*{}+t^3*{}",
        Coeff(k[0]),
        Coeff(k[1]),
        Coeff(k[2]),
        Coeff(k[3]),
    )
}

impl fmt::Display for CurveEquation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        write_axis(f, &self.x)?;
        f.write_str(",")?;
        write_axis(f, &self.y)?;
        f.write_str(")")
    }
}

/// Write one equation line per control set, in order.
///
/// Returns the number of lines written. Nothing is reordered or
/// de-duplicated.
///
/// # Errors
///
/// Propagates any I/O error from `sink`.
pub fn write_equations<W: Write>(
    sink: &mut W,
    curves: &[CubicControlSet],
    axis: AxisConvention,
) -> io::Result<usize> {
    for controls in curves {
        writeln!(sink, "{}", CurveEquation::new(controls, axis))?;
    }
    sink.flush()?;
    Ok(curves.len())
}
