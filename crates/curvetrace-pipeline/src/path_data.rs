//! Decode traced SVG documents into [`PathSegment`]s.
//!
//! Every `<path>` element is read with the [`svg`] crate's parser. Each
//! subpath (started by a move command) becomes one [`TracedPath`]. Line,
//! horizontal, vertical, cubic and close commands map onto exact
//! segments; every other command keeps only its endpoints and becomes
//! [`PathSegment::Other`].
//!
//! `translate`, `scale` and `matrix` transforms on enclosing groups and
//! on the path itself are applied, so coordinates come out in the source
//! bitmap's pixel space regardless of how the tracer laid out its
//! document.

use svg::node::element::path::{Command, Data, Position};
use svg::node::element::tag::Type;
use svg::parser::Event;

use crate::segment::{PathSegment, TracedPath};
use crate::types::{PipelineError, Point};

/// A 2D affine map `x' = a*x + c*y + e`, `y' = b*x + d*y + f`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Affine([f64; 6]);

impl Affine {
    const IDENTITY: Self = Self([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    fn apply(self, p: Point) -> Point {
        let [a, b, c, d, e, f] = self.0;
        Point::new(
            a.mul_add(p.x, c.mul_add(p.y, e)),
            b.mul_add(p.x, d.mul_add(p.y, f)),
        )
    }

    /// `self` after `inner`: maps through `inner` first.
    fn then(self, inner: Self) -> Self {
        let [a1, b1, c1, d1, e1, f1] = self.0;
        let [a2, b2, c2, d2, e2, f2] = inner.0;
        Self([
            a1.mul_add(a2, c1 * b2),
            b1.mul_add(a2, d1 * b2),
            a1.mul_add(c2, c1 * d2),
            b1.mul_add(c2, d1 * d2),
            a1.mul_add(e2, c1.mul_add(f2, e1)),
            b1.mul_add(e2, d1.mul_add(f2, f1)),
        ])
    }
}

/// Parse an SVG `transform` attribute.
fn parse_transform(value: &str) -> Result<Affine, PipelineError> {
    let mut result = Affine::IDENTITY;
    let mut rest = value.trim();
    while !rest.is_empty() {
        let (name, after) = rest
            .split_once('(')
            .ok_or_else(|| PipelineError::PathData(format!("bad transform: {value}")))?;
        let (args, tail) = after
            .split_once(')')
            .ok_or_else(|| PipelineError::PathData(format!("unclosed transform: {value}")))?;
        let nums = args
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .map(str::parse::<f64>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| PipelineError::PathData(format!("bad transform number in {value}: {e}")))?;
        let step = match (name.trim(), nums.as_slice()) {
            ("translate", [tx]) => Affine([1.0, 0.0, 0.0, 1.0, *tx, 0.0]),
            ("translate", [tx, ty]) => Affine([1.0, 0.0, 0.0, 1.0, *tx, *ty]),
            ("scale", [s]) => Affine([*s, 0.0, 0.0, *s, 0.0, 0.0]),
            ("scale", [sx, sy]) => Affine([*sx, 0.0, 0.0, *sy, 0.0, 0.0]),
            ("matrix", [a, b, c, d, e, f]) => Affine([*a, *b, *c, *d, *e, *f]),
            (other, _) => {
                return Err(PipelineError::PathData(format!(
                    "unsupported transform `{other}` in {value}"
                )));
            }
        };
        result = result.then(step);
        rest = tail.trim_start_matches(|c: char| c == ',' || c.is_whitespace());
    }
    Ok(result)
}

/// Number of parameters one repetition of a command consumes.
const fn arity(command: &Command) -> usize {
    match command {
        Command::Move(..) | Command::Line(..) | Command::SmoothQuadraticCurve(..) => 2,
        Command::HorizontalLine(..) | Command::VerticalLine(..) => 1,
        Command::QuadraticCurve(..) | Command::SmoothCubicCurve(..) => 4,
        Command::CubicCurve(..) => 6,
        Command::EllipticalArc(..) => 7,
        Command::Close => 0,
    }
}

/// Walks path commands, tracking the pen and emitting segments.
struct PathBuilder {
    transform: Affine,
    current: Point,
    subpath_start: Point,
    subpath: TracedPath,
    paths: Vec<TracedPath>,
}

impl PathBuilder {
    fn new(transform: Affine) -> Self {
        Self {
            transform,
            current: Point::new(0.0, 0.0),
            subpath_start: Point::new(0.0, 0.0),
            subpath: Vec::new(),
            paths: Vec::new(),
        }
    }

    fn resolve(&self, position: Position, x: f64, y: f64) -> Point {
        match position {
            Position::Absolute => Point::new(x, y),
            Position::Relative => Point::new(self.current.x + x, self.current.y + y),
        }
    }

    fn finish_subpath(&mut self) {
        if !self.subpath.is_empty() {
            self.paths.push(std::mem::take(&mut self.subpath));
        }
    }

    fn push_line(&mut self, end: Point) {
        self.subpath.push(PathSegment::Line {
            start: self.transform.apply(self.current),
            end: self.transform.apply(end),
        });
        self.current = end;
    }

    fn push_other(&mut self, end: Point) {
        self.subpath.push(PathSegment::Other {
            start: self.transform.apply(self.current),
            end: self.transform.apply(end),
        });
        self.current = end;
    }

    fn command(&mut self, command: &Command) -> Result<(), PipelineError> {
        let (position, params): (Position, &[f32]) = match command {
            Command::Close => {
                if self.current != self.subpath_start {
                    self.push_line(self.subpath_start);
                }
                self.current = self.subpath_start;
                self.finish_subpath();
                return Ok(());
            }
            Command::Move(p, params)
            | Command::Line(p, params)
            | Command::HorizontalLine(p, params)
            | Command::VerticalLine(p, params)
            | Command::QuadraticCurve(p, params)
            | Command::SmoothQuadraticCurve(p, params)
            | Command::CubicCurve(p, params)
            | Command::SmoothCubicCurve(p, params)
            | Command::EllipticalArc(p, params) => (*p, &params[..]),
        };

        let n = arity(command);
        if params.is_empty() || params.len() % n != 0 {
            return Err(PipelineError::PathData(format!(
                "{command:?} expects a multiple of {n} parameters, got {}",
                params.len()
            )));
        }

        for (i, chunk) in params.chunks_exact(n).enumerate() {
            let v: Vec<f64> = chunk.iter().map(|&x| f64::from(x)).collect();
            match command {
                Command::Move(..) if i == 0 => {
                    self.finish_subpath();
                    self.current = self.resolve(position, v[0], v[1]);
                    self.subpath_start = self.current;
                }
                // Extra coordinate pairs after a move are implicit line-tos.
                Command::Move(..) | Command::Line(..) => {
                    let end = self.resolve(position, v[0], v[1]);
                    self.push_line(end);
                }
                Command::HorizontalLine(..) => {
                    let x = match position {
                        Position::Absolute => v[0],
                        Position::Relative => self.current.x + v[0],
                    };
                    self.push_line(Point::new(x, self.current.y));
                }
                Command::VerticalLine(..) => {
                    let y = match position {
                        Position::Absolute => v[0],
                        Position::Relative => self.current.y + v[0],
                    };
                    self.push_line(Point::new(self.current.x, y));
                }
                Command::CubicCurve(..) => {
                    let control1 = self.resolve(position, v[0], v[1]);
                    let control2 = self.resolve(position, v[2], v[3]);
                    let end = self.resolve(position, v[4], v[5]);
                    self.subpath.push(PathSegment::CubicCurve {
                        start: self.transform.apply(self.current),
                        control1: self.transform.apply(control1),
                        control2: self.transform.apply(control2),
                        end: self.transform.apply(end),
                    });
                    self.current = end;
                }
                Command::SmoothQuadraticCurve(..)
                | Command::QuadraticCurve(..)
                | Command::SmoothCubicCurve(..)
                | Command::EllipticalArc(..) => {
                    let end = self.resolve(position, v[n - 2], v[n - 1]);
                    self.push_other(end);
                }
                Command::Close => {}
            }
        }
        Ok(())
    }
}

/// Decode one path `d` attribute under the given transform.
fn decode_path_data(d: &str, transform: Affine) -> Result<Vec<TracedPath>, PipelineError> {
    let data = Data::parse(d).map_err(|e| PipelineError::PathData(e.to_string()))?;
    let mut builder = PathBuilder::new(transform);
    for command in data.iter() {
        builder.command(command)?;
    }
    builder.finish_subpath();
    Ok(builder.paths)
}

/// Decode every `<path>` of an SVG document, in document order.
///
/// # Errors
///
/// Returns [`PipelineError::PathData`] when the document, a transform,
/// or a path's `d` attribute cannot be parsed.
pub fn parse_svg_paths(content: &str) -> Result<Vec<TracedPath>, PipelineError> {
    let parser = svg::read(content).map_err(|e| PipelineError::PathData(e.to_string()))?;
    let mut transforms = vec![Affine::IDENTITY];
    let mut paths = Vec::new();
    let mut saw_root = false;

    for event in parser {
        let current = transforms.last().copied().unwrap_or(Affine::IDENTITY);
        match event {
            Event::Error(e) => return Err(PipelineError::PathData(e.to_string())),
            Event::Tag("svg", Type::Start | Type::Empty, _) => saw_root = true,
            Event::Tag("g", Type::Start, attributes) => {
                let own = match attributes.get("transform") {
                    Some(value) => parse_transform(value)?,
                    None => Affine::IDENTITY,
                };
                transforms.push(current.then(own));
            }
            Event::Tag("g", Type::End, _) => {
                if transforms.len() > 1 {
                    transforms.pop();
                }
            }
            Event::Tag("path", _, attributes) => {
                let transform = match attributes.get("transform") {
                    Some(value) => current.then(parse_transform(value)?),
                    None => current,
                };
                if let Some(d) = attributes.get("d") {
                    paths.extend(decode_path_data(d, transform)?);
                }
            }
            _ => {}
        }
    }

    if !saw_root {
        return Err(PipelineError::PathData(
            "document has no <svg> root element".to_string(),
        ));
    }
    Ok(paths)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn wrap(body: &str) -> String {
        format!(r#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10">{body}</svg>"#)
    }

    #[test]
    fn absolute_lines_and_close() {
        let paths = parse_svg_paths(&wrap(r#"<path d="M0 0 L10 0 L10 10 Z"/>"#)).unwrap();
        assert_eq!(paths.len(), 1);
        let segs = &paths[0];
        assert_eq!(segs.len(), 3, "close adds the return segment");
        assert!(matches!(segs[2], PathSegment::Line { end, .. } if end == Point::new(0.0, 0.0)));
    }

    #[test]
    fn close_on_start_adds_nothing() {
        let paths = parse_svg_paths(&wrap(r#"<path d="M0 0 L4 0 L0 0 z"/>"#)).unwrap();
        assert_eq!(paths[0].len(), 2);
    }

    #[test]
    fn relative_cubic_is_resolved_from_current_point() {
        let paths = parse_svg_paths(&wrap(r#"<path d="M10 10 c1 2 3 4 5 6"/>"#)).unwrap();
        let PathSegment::CubicCurve {
            start,
            control1,
            control2,
            end,
        } = paths[0][0]
        else {
            unreachable!("expected a cubic segment");
        };
        assert_eq!(start, Point::new(10.0, 10.0));
        assert_eq!(control1, Point::new(11.0, 12.0));
        assert_eq!(control2, Point::new(13.0, 14.0));
        assert_eq!(end, Point::new(15.0, 16.0));
    }

    #[test]
    fn repeated_parameters_chain_segments() {
        let paths =
            parse_svg_paths(&wrap(r#"<path d="M0 0 l1 0 1 0 c0 1 0 1 1 1 0 1 0 1 1 1"/>"#))
                .unwrap();
        assert_eq!(paths[0].len(), 4);
        assert_eq!(paths[0][3].end(), Point::new(4.0, 2.0));
    }

    #[test]
    fn move_with_extra_pairs_draws_lines() {
        let paths = parse_svg_paths(&wrap(r#"<path d="M0 0 5 0 5 5"/>"#)).unwrap();
        assert_eq!(paths[0].len(), 2);
    }

    #[test]
    fn horizontal_vertical_and_quadratic() {
        let paths = parse_svg_paths(&wrap(r#"<path d="M1 1 H5 v3 Q0 0 2 2"/>"#)).unwrap();
        let segs = &paths[0];
        assert_eq!(segs[0].end(), Point::new(5.0, 1.0));
        assert_eq!(segs[1].end(), Point::new(5.0, 4.0));
        assert!(matches!(segs[2], PathSegment::Other { end, .. } if end == Point::new(2.0, 2.0)));
    }

    #[test]
    fn subpaths_split_on_move() {
        let paths =
            parse_svg_paths(&wrap(r#"<path d="M0 0 L1 0 Z M5 5 L6 5 Z"/><path d="M9 9 L8 8"/>"#))
                .unwrap();
        assert_eq!(paths.len(), 3);
        assert_eq!(paths[1][0].start(), Point::new(5.0, 5.0));
        assert_eq!(paths[2][0].start(), Point::new(9.0, 9.0));
    }

    #[test]
    fn potrace_style_group_transform_is_applied() {
        let doc = wrap(
            r##"<g transform="translate(0.000000,10.000000) scale(0.100000,-0.100000)" fill="#000000" stroke="none"><path d="M0 0 l50 0"/></g><path d="M1 1 L2 2"/>"##,
        );
        let paths = parse_svg_paths(&doc).unwrap();
        let seg = paths[0][0];
        assert!((seg.start().x - 0.0).abs() < 1e-9 && (seg.start().y - 10.0).abs() < 1e-9);
        assert!((seg.end().x - 5.0).abs() < 1e-9 && (seg.end().y - 10.0).abs() < 1e-9);
        // Outside the group the identity applies again.
        assert_eq!(paths[1][0].start(), Point::new(1.0, 1.0));
    }

    #[test]
    fn transform_composition_order() {
        let t = parse_transform("translate(10, 0) scale(2)").unwrap();
        assert_eq!(t.apply(Point::new(1.0, 1.0)), Point::new(12.0, 2.0));
        let m = parse_transform("matrix(1 0 0 1 3 4)").unwrap();
        assert_eq!(m.apply(Point::new(0.0, 0.0)), Point::new(3.0, 4.0));
    }

    #[test]
    fn unsupported_transform_is_rejected() {
        let doc = wrap(r#"<g transform="rotate(45)"><path d="M0 0 L1 1"/></g>"#);
        assert!(matches!(
            parse_svg_paths(&doc),
            Err(PipelineError::PathData(_))
        ));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(
            parse_svg_paths("this is not svg"),
            Err(PipelineError::PathData(_))
        ));
    }

    #[test]
    fn bad_arity_is_rejected() {
        assert!(matches!(
            parse_svg_paths(&wrap(r#"<path d="M0 0 C1 1 2 2"/>"#)),
            Err(PipelineError::PathData(_))
        ));
    }

    #[test]
    fn builtin_tracer_output_round_trips() {
        let mut img = image::GrayImage::from_pixel(12, 12, image::Luma([crate::bitmap::PAPER]));
        for y in 3..9 {
            for x in 3..9 {
                img.put_pixel(x, y, image::Luma([crate::bitmap::INK]));
            }
        }
        let paths = parse_svg_paths(&crate::contour::trace_to_svg(&img)).unwrap();
        assert!(!paths.is_empty());
        assert!(
            paths
                .iter()
                .flatten()
                .all(|s| matches!(s, PathSegment::Line { .. }))
        );
    }
}
