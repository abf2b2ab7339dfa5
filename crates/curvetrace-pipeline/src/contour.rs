//! Built-in bitmap tracer: border following straight into SVG.
//!
//! Produces the same kind of document an external tracer writes (one
//! `<path>` per outline) so the rest of the pipeline cannot tell the two
//! apart. Outlines are made of straight `L` segments only; the external
//! tracer is preferred when smooth cubic output matters.

use image::GrayImage;
use svg::Document;
use svg::node::element::Path;
use svg::node::element::path::Data;

use crate::bitmap::INK;
use crate::types::Point;

/// Trace ink regions of a bitmap into closed point loops.
///
/// Uses Suzuki-Abe border following via
/// [`imageproc::contours::find_contours`]. Loops with fewer than two
/// points cannot form a segment and are dropped.
#[must_use]
pub fn trace_outlines(bitmap: &GrayImage) -> Vec<Vec<Point>> {
    // find_contours follows non-zero pixels, so ink must become non-zero.
    let foreground = GrayImage::from_fn(bitmap.width(), bitmap.height(), |x, y| {
        image::Luma([if bitmap.get_pixel(x, y).0[0] == INK { 255 } else { 0 }])
    });
    let contours: Vec<imageproc::contours::Contour<u32>> =
        imageproc::contours::find_contours(&foreground);

    contours
        .into_iter()
        .filter(|c| c.points.len() >= 2)
        .map(|c| {
            c.points
                .into_iter()
                .map(|p| Point::new(f64::from(p.x), f64::from(p.y)))
                .collect()
        })
        .collect()
}

/// Trace a bitmap and serialize the outlines as an SVG document.
#[must_use]
pub fn trace_to_svg(bitmap: &GrayImage) -> String {
    let (width, height) = bitmap.dimensions();
    let mut document = Document::new()
        .set("width", width)
        .set("height", height)
        .set("viewBox", (0, 0, width, height));

    for outline in trace_outlines(bitmap) {
        let Some((first, rest)) = outline.split_first() else {
            continue;
        };
        let mut data = Data::new().move_to((first.x, first.y));
        for p in rest {
            data = data.line_to((p.x, p.y));
        }
        document = document.add(Path::new().set("d", data.close()));
    }

    document.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::PAPER;

    fn blank() -> GrayImage {
        GrayImage::from_pixel(20, 20, image::Luma([PAPER]))
    }

    #[test]
    fn blank_bitmap_has_no_outlines() {
        assert!(trace_outlines(&blank()).is_empty());
        assert!(!trace_to_svg(&blank()).contains("<path"));
    }

    #[test]
    fn square_produces_closed_outline() {
        let mut img = blank();
        for y in 5..15 {
            for x in 5..15 {
                img.put_pixel(x, y, image::Luma([INK]));
            }
        }
        let outlines = trace_outlines(&img);
        assert!(!outlines.is_empty());
        assert!(outlines.iter().all(|o| o.len() >= 4));

        let svg = trace_to_svg(&img);
        assert!(svg.contains("<path"));
        assert!(svg.contains("viewBox=\"0 0 20 20\""));
    }
}
