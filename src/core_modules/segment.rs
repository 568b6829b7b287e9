// THEORY:
// The `segment` module holds the "dumb" geometric data containers of the lane system. None of
// these types have memory of previous frames:
//
// 1.  **LineSegment**: a finite fragment exactly as the external detector reports it, two integer
//     endpoints in image space. It lives for one frame.
// 2.  **LaneLine**: an unbounded straight line `y = slope * x + intercept`. Its constructor refuses
//     a zero or non-finite slope, so every `LaneLine` that exists can be inverted for `x` at any
//     height. This is the only place the "no zero slope" rule is enforced.
// 3.  **PixelPoint / ProjectedLine**: concrete drawable geometry derived from a `LaneLine`.

use serde::{Deserialize, Serialize};

/// A raw line fragment reported by the segment detector for the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineSegment {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl LineSegment {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// True when both endpoints share an x-coordinate and the slope is undefined.
    pub fn is_vertical(&self) -> bool {
        self.x1 == self.x2
    }

    /// Euclidean distance between the two endpoints.
    pub fn length(&self) -> f64 {
        let dx = self.x2 as f64 - self.x1 as f64;
        let dy = self.y2 as f64 - self.y1 as f64;
        (dx * dx + dy * dy).sqrt()
    }
}

impl From<[i32; 4]> for LineSegment {
    fn from(v: [i32; 4]) -> Self {
        LineSegment::new(v[0], v[1], v[2], v[3])
    }
}

/// An unbounded lane boundary in image space, `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaneLine {
    slope: f64,
    intercept: f64,
}

impl LaneLine {
    /// Returns `None` for a zero or non-finite slope, or a non-finite intercept.
    pub fn new(slope: f64, intercept: f64) -> Option<Self> {
        if slope == 0.0 || !slope.is_finite() || !intercept.is_finite() {
            return None;
        }
        Some(Self { slope, intercept })
    }

    /// Fits the line through two points. `None` if the points are vertically or horizontally aligned.
    pub fn through(a: (f64, f64), b: (f64, f64)) -> Option<Self> {
        if a.0 == b.0 {
            return None;
        }
        let slope = (b.1 - a.1) / (b.0 - a.0);
        LaneLine::new(slope, a.1 - slope * a.0)
    }

    pub fn slope(&self) -> f64 {
        self.slope
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// The x-coordinate where the line crosses the horizontal `y`.
    pub fn x_at(&self, y: f64) -> f64 {
        (y - self.intercept) / self.slope
    }
}

/// A single integer pixel location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelPoint {
    pub x: i32,
    pub y: i32,
}

impl PixelPoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A lane line clipped to the band between the top and bottom reference levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectedLine {
    pub top: PixelPoint,
    pub bottom: PixelPoint,
}

impl ProjectedLine {
    /// Re-fits an unbounded line through the two projected endpoints.
    pub fn fit_line(&self) -> Option<LaneLine> {
        LaneLine::through(
            (self.top.x as f64, self.top.y as f64),
            (self.bottom.x as f64, self.bottom.y as f64),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_length_is_euclidean() {
        let segment = LineSegment::new(0, 0, 3, 4);
        assert_eq!(segment.length(), 5.0);
        assert!(!segment.is_vertical());
        assert!(LineSegment::new(7, 1, 7, 9).is_vertical());
    }

    #[test]
    fn length_of_extreme_segments_does_not_overflow() {
        let segment = LineSegment::new(i32::MIN, 0, i32::MAX, 0);
        assert!((segment.length() - u32::MAX as f64).abs() < 1.0);
    }

    #[test]
    fn lane_line_rejects_zero_and_non_finite_slopes() {
        assert!(LaneLine::new(0.0, 10.0).is_none());
        assert!(LaneLine::new(-0.0, 10.0).is_none());
        assert!(LaneLine::new(f64::NAN, 10.0).is_none());
        assert!(LaneLine::new(f64::INFINITY, 10.0).is_none());
        assert!(LaneLine::new(1.0, f64::NAN).is_none());
        assert!(LaneLine::new(-0.5, 10.0).is_some());
    }

    #[test]
    fn x_at_inverts_the_line() {
        let line = LaneLine::new(-1.0, 600.0).unwrap();
        assert_eq!(line.x_at(500.0), 100.0);
        assert_eq!(line.x_at(400.0), 200.0);
    }

    #[test]
    fn through_rejects_degenerate_pairs() {
        assert!(LaneLine::through((1.0, 2.0), (1.0, 9.0)).is_none());
        assert!(LaneLine::through((1.0, 2.0), (5.0, 2.0)).is_none());
        let line = LaneLine::through((0.0, 1.0), (2.0, 5.0)).unwrap();
        assert_eq!(line.slope(), 2.0);
        assert_eq!(line.intercept(), 1.0);
    }
}
