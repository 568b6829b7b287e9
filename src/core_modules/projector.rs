// THEORY:
// The `projector` turns an abstract lane line into something drawable. The overlay only covers
// the road band between two horizontal reference levels: the bottom edge of the frame and a
// profile-specific fraction of the frame height above it. For each level the line is solved for
// `x` and both coordinates are rounded to the nearest pixel.
//
// Because `LaneLine` cannot hold a zero slope, the division in `x_at` is always defined and
// projection never fails: an absent line simply projects to an absent `ProjectedLine`.

use crate::core_modules::segment::{LaneLine, PixelPoint, ProjectedLine};

/// The two horizontal levels a lane line is clipped to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionLevels {
    pub y_top: f64,
    pub y_bottom: f64,
}

impl ProjectionLevels {
    pub fn new(y_top: f64, y_bottom: f64) -> Self {
        Self { y_top, y_bottom }
    }

    /// Bottom at the frame's last row boundary, top at `height * y_top_ratio`.
    pub fn for_frame(height: u32, y_top_ratio: f64) -> Self {
        let y_bottom = height as f64;
        Self {
            y_top: y_bottom * y_top_ratio,
            y_bottom,
        }
    }

    pub fn project(&self, line: Option<LaneLine>) -> Option<ProjectedLine> {
        let line = line?;
        Some(ProjectedLine {
            top: Self::point(&line, self.y_top),
            bottom: Self::point(&line, self.y_bottom),
        })
    }

    fn point(line: &LaneLine, y: f64) -> PixelPoint {
        PixelPoint::new(round_px(line.x_at(y)), round_px(y))
    }
}

/// Near-horizontal lines can land absurdly far outside the frame; keep them where raster math
/// on `i32`/`f32` stays exact.
const MAX_PIXEL_COORD: f64 = (1 << 24) as f64;

fn round_px(v: f64) -> i32 {
    v.round().clamp(-MAX_PIXEL_COORD, MAX_PIXEL_COORD) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_line_projects_to_nothing() {
        assert_eq!(ProjectionLevels::new(400.0, 500.0).project(None), None);
    }

    #[test]
    fn projects_to_both_levels() {
        let levels = ProjectionLevels::new(400.0, 500.0);
        let projected = levels.project(LaneLine::new(-1.0, 600.0)).unwrap();
        assert_eq!(projected.top, PixelPoint::new(200, 400));
        assert_eq!(projected.bottom, PixelPoint::new(100, 500));

        let projected = levels.project(LaneLine::new(1.0, 200.0)).unwrap();
        assert_eq!(projected.top, PixelPoint::new(200, 400));
        assert_eq!(projected.bottom, PixelPoint::new(300, 500));
    }

    #[test]
    fn levels_follow_frame_height_and_ratio() {
        let levels = ProjectionLevels::for_frame(720, 0.68);
        assert_eq!(levels.y_bottom, 720.0);
        assert!((levels.y_top - 489.6).abs() < 1e-9);

        let night = ProjectionLevels::for_frame(720, 0.58);
        assert!((night.y_top - 417.6).abs() < 1e-9);
    }

    #[test]
    fn coordinates_round_to_nearest_pixel() {
        let levels = ProjectionLevels::new(489.6, 720.0);
        let projected = levels.project(LaneLine::new(-0.7, 900.0)).unwrap();
        assert_eq!(projected.top.y, 490);
        // (489.6 - 900) / -0.7 = 586.2857...
        assert_eq!(projected.top.x, 586);
        // (720 - 900) / -0.7 = 257.1428...
        assert_eq!(projected.bottom.x, 257);
    }

    #[test]
    fn near_horizontal_lines_are_clamped() {
        let levels = ProjectionLevels::new(400.0, 500.0);
        let projected = levels.project(LaneLine::new(1e-12, 0.0)).unwrap();
        assert_eq!(projected.top.x, 1 << 24);
        assert_eq!(projected.bottom.x, 1 << 24);
    }

    #[test]
    fn projection_and_refit_round_trip() {
        let levels = ProjectionLevels::new(400.0, 800.0);
        for (slope, intercept) in [(-0.5, 900.0), (0.8, -40.0), (-2.0, 1600.0), (1.25, 100.0)] {
            let line = LaneLine::new(slope, intercept).unwrap();
            let refit = levels.project(Some(line)).unwrap().fit_line().unwrap();
            // Endpoints are rounded to whole pixels, so allow one pixel of slack at each end.
            let tolerance_slope = slope.abs() * slope.abs() * 2.0 / 400.0 + 1e-9;
            assert!((refit.slope() - slope).abs() <= tolerance_slope, "{slope} vs {}", refit.slope());
            assert!((refit.x_at(800.0) - line.x_at(800.0)).abs() <= 0.5 + 1e-9);
        }
    }

    #[test]
    fn exact_round_trip_on_integer_endpoints() {
        let levels = ProjectionLevels::new(400.0, 500.0);
        let line = LaneLine::new(-1.0, 600.0).unwrap();
        let refit = levels.project(Some(line)).unwrap().fit_line().unwrap();
        assert_eq!(refit, line);
    }
}
