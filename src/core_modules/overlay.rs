// THEORY:
// The `overlay` module is the visual end of the lane core. It never touches the source frame:
// everything is drawn onto a separate black layer of the same size, and that layer is then added
// onto a copy of the frame.
//
// Drawing order on the layer:
// 1.  **Strokes**: each present projected line becomes a thick stroke with rounded caps.
// 2.  **Fill**: only when both tracked boundaries are known, the quadrilateral between them
//     (left-top, right-top, right-bottom, left-bottom) is filled. It is drawn last, so inside the
//     quad the fill color replaces the stroke color.
//
// Nearly flat lines project far outside the frame. Every polygon is clipped to a window a few
// frame sizes around the frame before it is rasterized, so the cost of drawing stays
// proportional to the frame and not to the projected length of the line.
//
// Compositing is a plain saturating per-channel sum, `frame + layer`, not an alpha blend. Bright
// road pixels under the overlay clip to 255; that washed-out look is the intended appearance.

use crate::core_modules::segment::{PixelPoint, ProjectedLine};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut, draw_polygon_mut};
use imageproc::point::Point;

/// Colors and stroke width of the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayStyle {
    pub stroke: Rgb<u8>,
    pub fill: Rgb<u8>,
    pub thickness: u32,
}

/// The lane area between the two projected boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaneQuad {
    /// Left-top, right-top, right-bottom, left-bottom.
    pub corners: [PixelPoint; 4],
}

impl LaneQuad {
    pub fn between(left: &ProjectedLine, right: &ProjectedLine) -> Self {
        Self {
            corners: [left.top, right.top, right.bottom, left.bottom],
        }
    }
}

/// Draws projected lane lines and the lane fill, and composites them onto frames.
#[derive(Debug, Clone)]
pub struct OverlayRenderer {
    style: OverlayStyle,
}

impl OverlayRenderer {
    pub fn new(style: OverlayStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> &OverlayStyle {
        &self.style
    }

    /// Renders the overlay for one frame and returns the composited result.
    pub fn render(
        &self,
        frame: &RgbImage,
        lines: [Option<ProjectedLine>; 2],
        fill: Option<LaneQuad>,
    ) -> RgbImage {
        let layer = self.draw_layer(frame.width(), frame.height(), lines, fill);
        composite(frame, &layer)
    }

    /// Draws strokes and fill onto a fresh black layer of the given size.
    pub fn draw_layer(
        &self,
        width: u32,
        height: u32,
        lines: [Option<ProjectedLine>; 2],
        fill: Option<LaneQuad>,
    ) -> RgbImage {
        let mut layer = RgbImage::new(width, height);

        for line in lines.iter().flatten() {
            self.draw_stroke(&mut layer, line);
        }

        if let Some(quad) = fill {
            let corners = quad.corners.map(|c| (c.x as f64, c.y as f64));
            fill_polygon(&mut layer, &corners, self.style.fill);
        }

        layer
    }

    fn draw_stroke(&self, layer: &mut RgbImage, line: &ProjectedLine) {
        let color = self.style.stroke;
        let half = self.style.thickness as f64 / 2.0;
        let (ax, ay) = (line.top.x as f64, line.top.y as f64);
        let (bx, by) = (line.bottom.x as f64, line.bottom.y as f64);
        let (dx, dy) = (bx - ax, by - ay);
        let len = (dx * dx + dy * dy).sqrt();

        if len > 0.0 {
            // Offset perpendicular to the line on both sides.
            let (nx, ny) = (-dy / len * half, dx / len * half);
            let body = [
                (ax + nx, ay + ny),
                (bx + nx, by + ny),
                (bx - nx, by - ny),
                (ax - nx, ay - ny),
            ];
            fill_polygon(layer, &body, color);
        }

        let radius = (half.round() as i32).max(0);
        for end in [line.top, line.bottom] {
            draw_filled_circle_mut(layer, (end.x, end.y), radius, color);
        }
    }
}

/// Adds the layer onto a copy of the frame, clipping each channel at 255.
pub fn composite(frame: &RgbImage, layer: &RgbImage) -> RgbImage {
    let mut out = frame.clone();
    for (dst, src) in out.pixels_mut().zip(layer.pixels()) {
        for c in 0..3 {
            dst.0[c] = dst.0[c].saturating_add(src.0[c]);
        }
    }
    out
}

/// How far past the frame, in frame sizes, geometry is kept before rasterizing.
const CLIP_MARGIN_FRAMES: f64 = 4.0;

/// Sutherland-Hodgman clip of a closed polygon against the rectangle that extends
/// `CLIP_MARGIN_FRAMES` frame sizes beyond each edge of a `width` x `height` frame.
fn clip_to_window(points: &[(f64, f64)], width: u32, height: u32) -> Vec<(f64, f64)> {
    let margin = CLIP_MARGIN_FRAMES * width.max(height) as f64;
    // (axis, bound, sign): a point is inside when `sign * (coord - bound) >= 0`.
    let planes: [(usize, f64, f64); 4] = [
        (0, -margin, 1.0),
        (0, width as f64 + margin, -1.0),
        (1, -margin, 1.0),
        (1, height as f64 + margin, -1.0),
    ];

    let mut poly = points.to_vec();
    for (axis, bound, sign) in planes {
        let dist = |p: (f64, f64)| sign * ([p.0, p.1][axis] - bound);
        let input = std::mem::take(&mut poly);
        let Some(&last) = input.last() else {
            break;
        };

        let mut prev = last;
        for &cur in &input {
            let (dp, dc) = (dist(prev), dist(cur));
            if (dp >= 0.0) != (dc >= 0.0) {
                let t = dp / (dp - dc);
                poly.push((prev.0 + t * (cur.0 - prev.0), prev.1 + t * (cur.1 - prev.1)));
            }
            if dc >= 0.0 {
                poly.push(cur);
            }
            prev = cur;
        }
    }
    poly
}

/// Fills a closed polygon, tolerating repeated vertices and collapsed shapes.
fn fill_polygon(layer: &mut RgbImage, corners: &[(f64, f64)], color: Rgb<u8>) {
    let clipped = clip_to_window(corners, layer.width(), layer.height());
    let mut poly: Vec<Point<i32>> = Vec::with_capacity(clipped.len());
    for (x, y) in clipped {
        let p = Point::new(x.round() as i32, y.round() as i32);
        if poly.last() != Some(&p) {
            poly.push(p);
        }
    }
    // The polygon is closed implicitly; a repeated closing vertex is rejected by imageproc.
    while poly.len() > 1 && poly.first() == poly.last() {
        poly.pop();
    }

    match poly.len() {
        0 => {}
        1 | 2 => {
            let a = poly[0];
            let b = poly[poly.len() - 1];
            draw_line_segment_mut(layer, (a.x as f32, a.y as f32), (b.x as f32, b.y as f32), color);
        }
        _ => draw_polygon_mut(layer, &poly, color),
    }
}
