//! Raster plot of cubic curves.
//!
//! Every curve is sampled at [`PLOT_SAMPLES`] + 1 evenly spaced parameter
//! values and stroked as a polyline. The visible region is the source
//! image rectangle, aspect-fit into the canvas, so consecutive video frames
//! share one viewport and do not jitter.

use curvetrace_pipeline::{AxisConvention, CubicControlSet, Dimensions, Point};
use tiny_skia::{Color, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Rect, Stroke, Transform};

/// Sampling intervals per curve.
pub const PLOT_SAMPLES: usize = 100;

/// Fraction of the canvas kept free on each side.
const MARGIN_FRACTION: f64 = 0.04;

/// Grid line opacity (0.3).
const GRID_ALPHA: u8 = 77;

/// Low bits of the frame index stamped on a placeholder.
pub const PLACEHOLDER_INDEX_BITS: u32 = 20;

/// Canvas settings for [`render_plot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlotOptions {
    /// Canvas width in pixels.
    pub width: u32,
    /// Canvas height in pixels.
    pub height: u32,
    /// Draw light reference grid lines behind the curves.
    pub show_grid: bool,
    /// Axis convention the curves are drawn under.
    pub axis: AxisConvention,
}

/// Errors from plot rendering.
#[derive(Debug, thiserror::Error)]
pub enum PlotError {
    /// The canvas could not be allocated.
    #[error("invalid canvas size {width}x{height}")]
    Canvas {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },

    /// PNG encoding failed.
    #[error("PNG encoding failed: {0}")]
    Encode(String),
}

/// Maps oriented data coordinates onto the canvas.
struct Viewport {
    min_x: f64,
    max_x: f64,
    min_y: f64,
    max_y: f64,
    scale: f64,
    origin_x: f64,
    origin_y: f64,
    y_up: bool,
}

impl Viewport {
    fn new(source: Dimensions, options: &PlotOptions) -> Self {
        let w = f64::from(source.width.max(1));
        let h = f64::from(source.height.max(1));
        let a = options.axis.apply(Point::new(0.0, 0.0));
        let b = options.axis.apply(Point::new(w, h));

        let canvas_w = f64::from(options.width);
        let canvas_h = f64::from(options.height);
        let margin = canvas_w.min(canvas_h) * MARGIN_FRACTION;
        let scale = ((canvas_w - 2.0 * margin) / w).min((canvas_h - 2.0 * margin) / h);

        Self {
            min_x: a.x.min(b.x),
            max_x: a.x.max(b.x),
            min_y: a.y.min(b.y),
            max_y: a.y.max(b.y),
            scale,
            origin_x: w.mul_add(-scale, canvas_w) / 2.0,
            origin_y: h.mul_add(-scale, canvas_h) / 2.0,
            y_up: options.axis == AxisConvention::MathUp,
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn project(&self, p: Point) -> (f32, f32) {
        let sx = (p.x - self.min_x).mul_add(self.scale, self.origin_x);
        let dy = if self.y_up {
            self.max_y - p.y
        } else {
            p.y - self.min_y
        };
        let sy = dy.mul_add(self.scale, self.origin_y);
        (sx as f32, sy as f32)
    }
}

/// Round a raw step up to 1, 2 or 5 times a power of ten.
fn nice_step(raw: f64) -> f64 {
    if raw <= 0.0 || !raw.is_finite() {
        return 1.0;
    }
    let magnitude = 10f64.powf(raw.log10().floor());
    let norm = raw / magnitude;
    let nice = if norm <= 1.0 {
        1.0
    } else if norm <= 2.0 {
        2.0
    } else if norm <= 5.0 {
        5.0
    } else {
        10.0
    };
    nice * magnitude
}

fn grid_path(view: &Viewport) -> Option<tiny_skia::Path> {
    let step = nice_step((view.max_x - view.min_x).max(view.max_y - view.min_y) / 10.0);
    let mut pb = PathBuilder::new();

    let mut x = (view.min_x / step).ceil() * step;
    while x <= view.max_x {
        let (x0, y0) = view.project(Point::new(x, view.min_y));
        let (x1, y1) = view.project(Point::new(x, view.max_y));
        pb.move_to(x0, y0);
        pb.line_to(x1, y1);
        x += step;
    }
    let mut y = (view.min_y / step).ceil() * step;
    while y <= view.max_y {
        let (x0, y0) = view.project(Point::new(view.min_x, y));
        let (x1, y1) = view.project(Point::new(view.max_x, y));
        pb.move_to(x0, y0);
        pb.line_to(x1, y1);
        y += step;
    }
    pb.finish()
}

fn new_canvas(width: u32, height: u32) -> Result<Pixmap, PlotError> {
    let mut pixmap = Pixmap::new(width, height).ok_or(PlotError::Canvas { width, height })?;
    pixmap.fill(Color::WHITE);
    Ok(pixmap)
}

fn encode(pixmap: &Pixmap) -> Result<Vec<u8>, PlotError> {
    pixmap
        .encode_png()
        .map_err(|e| PlotError::Encode(e.to_string()))
}

/// Render curves over the source image rectangle and encode as PNG.
///
/// An empty curve list yields a valid blank plot.
///
/// # Errors
///
/// Returns [`PlotError::Canvas`] for a zero-sized canvas and
/// [`PlotError::Encode`] if PNG encoding fails.
pub fn render_plot(
    curves: &[CubicControlSet],
    source: Dimensions,
    options: &PlotOptions,
) -> Result<Vec<u8>, PlotError> {
    let mut pixmap = new_canvas(options.width, options.height)?;
    let view = Viewport::new(source, options);

    #[allow(clippy::cast_possible_truncation)]
    let line_width = (f64::from(options.width.min(options.height)) / 400.0).max(2.0) as f32;

    if options.show_grid
        && let Some(grid) = grid_path(&view)
    {
        let mut paint = Paint::default();
        paint.set_color_rgba8(128, 128, 128, GRID_ALPHA);
        let stroke = Stroke {
            width: 1.0,
            ..Stroke::default()
        };
        pixmap.stroke_path(&grid, &paint, &stroke, Transform::identity(), None);
    }

    let mut pb = PathBuilder::new();
    for controls in curves {
        let points = controls.oriented(options.axis).sample(PLOT_SAMPLES);
        let mut iter = points.into_iter().map(|p| view.project(p));
        if let Some((x, y)) = iter.next() {
            pb.move_to(x, y);
            for (x, y) in iter {
                pb.line_to(x, y);
            }
        }
    }

    if let Some(path) = pb.finish() {
        let stroke = Stroke {
            width: line_width,
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            ..Stroke::default()
        };
        let mut paint = Paint::default();
        paint.set_color_rgba8(0, 0, 0, 255);
        paint.anti_alias = true;
        pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    }

    encode(&pixmap)
}

/// Render the stand-in image for a frame that failed: a red cross on
/// white, sized like a regular plot.
///
/// The low [`PLACEHOLDER_INDEX_BITS`] bits of `index` are stamped along the
/// bottom edge, least significant first, one square cell per bit; a set
/// bit is a black cell. The marker stays identifiable once frames are
/// muxed into a video and their file names are gone.
///
/// # Errors
///
/// Same as [`render_plot`].
#[allow(clippy::cast_precision_loss)]
pub fn render_placeholder(width: u32, height: u32, index: usize) -> Result<Vec<u8>, PlotError> {
    let mut pixmap = new_canvas(width, height)?;
    let (w, h) = (width as f32, height as f32);
    let inset = w.min(h) * 0.1;

    let mut pb = PathBuilder::new();
    pb.move_to(inset, inset);
    pb.line_to(w - inset, h - inset);
    pb.move_to(w - inset, inset);
    pb.line_to(inset, h - inset);

    if let Some(path) = pb.finish() {
        let stroke = Stroke {
            width: (w.min(h) / 20.0).max(4.0),
            line_cap: LineCap::Round,
            ..Stroke::default()
        };
        let mut paint = Paint::default();
        paint.set_color_rgba8(220, 30, 30, 255);
        paint.anti_alias = true;
        pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    }

    let mut ink = Paint::default();
    ink.set_color_rgba8(0, 0, 0, 255);
    for bit in 0..PLACEHOLDER_INDEX_BITS {
        if (index >> bit) & 1 == 0 {
            continue;
        }
        if let Some(cell) = index_cell(w, h, bit) {
            pixmap.fill_rect(cell, &ink, Transform::identity(), None);
        }
    }

    encode(&pixmap)
}

/// Square cell for `bit` of the placeholder index stamp.
#[allow(clippy::cast_precision_loss)]
fn index_cell(w: f32, h: f32, bit: u32) -> Option<Rect> {
    let size = (w / (PLACEHOLDER_INDEX_BITS as f32 + 2.0))
        .min(h / 8.0)
        .floor()
        .max(1.0);
    Rect::from_xywh(size * (1.0 + bit as f32), h - 2.0 * size, size, size)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use curvetrace_pipeline::{PathSegment, normalize_segment};

    fn options(show_grid: bool) -> PlotOptions {
        PlotOptions {
            width: 200,
            height: 200,
            show_grid,
            axis: AxisConvention::MathUp,
        }
    }

    fn square() -> Dimensions {
        Dimensions {
            width: 100,
            height: 100,
        }
    }

    fn horizontal_through_middle() -> CubicControlSet {
        normalize_segment(&PathSegment::Line {
            start: Point::new(0.0, 50.0),
            end: Point::new(100.0, 50.0),
        })
    }

    fn decode(png: &[u8]) -> image::RgbaImage {
        image::load_from_memory(png).unwrap().to_rgba8()
    }

    #[test]
    fn canvas_has_requested_size() {
        let png = render_plot(&[horizontal_through_middle()], square(), &options(true)).unwrap();
        let img = decode(&png);
        assert_eq!(img.dimensions(), (200, 200));
    }

    #[test]
    fn curve_is_drawn_through_the_center() {
        let png = render_plot(&[horizontal_through_middle()], square(), &options(false)).unwrap();
        let img = decode(&png);
        let inked = (97..=103).any(|y| img.get_pixel(100, y)[0] < 128);
        assert!(inked, "expected curve pixels near the canvas center");
        // Corners stay background.
        assert_eq!(img.get_pixel(0, 0).0, [255, 255, 255, 255]);
    }

    #[test]
    fn no_curves_gives_blank_plot() {
        let png = render_plot(&[], square(), &options(false)).unwrap();
        let img = decode(&png);
        assert!(img.pixels().all(|p| p.0 == [255, 255, 255, 255]));
    }

    #[test]
    fn grid_marks_the_background() {
        let with = decode(&render_plot(&[], square(), &options(true)).unwrap());
        assert!(with.pixels().any(|p| p.0 != [255, 255, 255, 255]));
    }

    #[test]
    fn viewport_is_fixed_by_source_dimensions() {
        // The same curve in two frames lands in the same place even when
        // the curve sets differ.
        let extra = normalize_segment(&PathSegment::Line {
            start: Point::new(0.0, 0.0),
            end: Point::new(10.0, 10.0),
        });
        let a = decode(&render_plot(&[horizontal_through_middle()], square(), &options(false)).unwrap());
        let b = decode(
            &render_plot(&[horizontal_through_middle(), extra], square(), &options(false)).unwrap(),
        );
        for y in 90..110 {
            assert_eq!(a.get_pixel(150, y), b.get_pixel(150, y));
        }
    }

    #[test]
    fn zero_canvas_is_rejected() {
        let opts = PlotOptions {
            width: 0,
            ..options(false)
        };
        assert!(matches!(
            render_plot(&[], square(), &opts),
            Err(PlotError::Canvas { width: 0, .. })
        ));
    }

    #[test]
    fn placeholder_draws_a_red_cross() {
        let img = decode(&render_placeholder(120, 80, 0).unwrap());
        assert_eq!(img.dimensions(), (120, 80));
        let center = img.get_pixel(60, 40);
        assert!(center[0] > 150 && center[1] < 100, "{center:?}");
    }

    #[test]
    fn placeholder_stamps_the_frame_index() {
        // 5 = 0b101: cells 0 and 2 inked, every other cell left unmarked.
        let img = decode(&render_placeholder(120, 80, 5).unwrap());
        let is_black = |bit: u32| {
            let cell = index_cell(120.0, 80.0, bit).unwrap();
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let (x, y) = (
                (cell.x() + cell.width() / 2.0) as u32,
                (cell.y() + cell.height() / 2.0) as u32,
            );
            img.get_pixel(x, y).0 == [0, 0, 0, 255]
        };
        assert!(is_black(0));
        assert!(!is_black(1));
        assert!(is_black(2));
        assert!((3..PLACEHOLDER_INDEX_BITS).all(|bit| !is_black(bit)));

        let other = decode(&render_placeholder(120, 80, 6).unwrap());
        assert_ne!(img, other);
    }

    #[test]
    fn nice_steps() {
        assert!((nice_step(10.0) - 10.0).abs() < 1e-9);
        assert!((nice_step(13.0) - 20.0).abs() < 1e-9);
        assert!((nice_step(0.3) - 0.5).abs() < 1e-9);
        assert!((nice_step(0.0) - 1.0).abs() < 1e-9);
    }
}
