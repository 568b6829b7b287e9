// THEORY:
// A deployment profile is everything that differs between a daytime and a nighttime run: where
// the top of the overlay band sits, the overlay colors, and the tuning of the upstream segment
// detector. The tracking core itself is the same for both; it only reads the first group.
//
// Profiles are plain serde data so they can live in YAML next to the video they are meant for.
// `day()` and `night()` reproduce the two profiles the system ships with.

use crate::core_modules::overlay::OverlayStyle;
use crate::error::{LaneError, Result};
use image::Rgb;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentProfile {
    pub name: String,
    /// Top of the overlay band as a fraction of frame height, in (0, 1).
    pub y_top_ratio: f64,
    pub stroke_color: [u8; 3],
    pub fill_color: [u8; 3],
    pub thickness: u32,
    /// Clear a side after this many consecutive frames without a detection.
    /// `None` carries the last line forward indefinitely.
    #[serde(default)]
    pub max_fallback_frames: Option<u32>,
    pub detector: DetectorSettings,
}

/// Tuning for the upstream grayscale/blur/threshold/Canny/Hough segment detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorSettings {
    /// Odd Gaussian kernel size.
    pub blur_kernel: u32,
    /// Binary threshold applied to the blurred grayscale frame.
    pub white_threshold: u8,
    /// Region of interest, four (x, y) vertices as fractions of frame width and height.
    pub roi: [[f64; 2]; 4],
    pub canny_low: f64,
    pub canny_high: f64,
    pub hough_rho: f64,
    /// Angular resolution in radians.
    pub hough_theta: f64,
    pub hough_threshold: i32,
    pub min_line_length: f64,
    pub max_line_gap: f64,
}

impl DetectorSettings {
    fn common(white_threshold: u8, roi: [[f64; 2]; 4]) -> Self {
        Self {
            blur_kernel: 5,
            white_threshold,
            roi,
            canny_low: 50.0,
            canny_high: 150.0,
            hough_rho: 1.0,
            hough_theta: std::f64::consts::PI / 180.0,
            hough_threshold: 40,
            min_line_length: 20.0,
            max_line_gap: 200.0,
        }
    }

    /// Region of interest in pixels for a frame of the given size.
    pub fn roi_pixels(&self, width: u32, height: u32) -> [(i32, i32); 4] {
        self.roi
            .map(|[fx, fy]| ((width as f64 * fx) as i32, (height as f64 * fy) as i32))
    }
}

impl DeploymentProfile {
    /// High-contrast daytime footage: red strokes over a gray lane fill.
    pub fn day() -> Self {
        Self {
            name: "day".to_string(),
            y_top_ratio: 0.68,
            stroke_color: [255, 0, 0],
            fill_color: [128, 128, 128],
            thickness: 12,
            max_fallback_frames: None,
            detector: DetectorSettings::common(
                150,
                [[0.28, 0.87], [0.48, 0.68], [0.515, 0.68], [0.69, 0.87]],
            ),
        }
    }

    /// Low-light nighttime footage: blue strokes over a green lane fill.
    pub fn night() -> Self {
        Self {
            name: "night".to_string(),
            y_top_ratio: 0.58,
            stroke_color: [0, 0, 255],
            fill_color: [0, 255, 0],
            thickness: 12,
            max_fallback_frames: None,
            detector: DetectorSettings::common(
                240,
                [[0.05, 1.0], [0.48, 0.4], [0.355, 0.4], [0.9, 1.0]],
            ),
        }
    }

    /// Resolves `day`, `night`, or a path to a YAML profile.
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "day" => Ok(Self::day()),
            "night" => Ok(Self::night()),
            path => Self::load(path),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let profile = Self::from_yaml(&contents)?;
        info!(profile = %profile.name, path = %path.display(), "loaded deployment profile");
        Ok(profile)
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        let profile: DeploymentProfile = serde_yaml::from_str(contents)?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.y_top_ratio > 0.0 && self.y_top_ratio < 1.0) {
            return Err(LaneError::InvalidProfile(format!(
                "y_top_ratio must be in (0, 1), got {}",
                self.y_top_ratio
            )));
        }
        if self.thickness == 0 {
            return Err(LaneError::InvalidProfile("thickness must be positive".into()));
        }
        if self.max_fallback_frames == Some(0) {
            return Err(LaneError::InvalidProfile(
                "max_fallback_frames must be positive when set".into(),
            ));
        }

        let d = &self.detector;
        if d.blur_kernel == 0 || d.blur_kernel % 2 == 0 {
            return Err(LaneError::InvalidProfile(format!(
                "blur_kernel must be odd, got {}",
                d.blur_kernel
            )));
        }
        if d.canny_low > d.canny_high {
            return Err(LaneError::InvalidProfile(
                "canny_low must not exceed canny_high".into(),
            ));
        }
        if d.hough_rho <= 0.0 || d.hough_theta <= 0.0 || d.hough_threshold <= 0 {
            return Err(LaneError::InvalidProfile(
                "hough resolution and threshold must be positive".into(),
            ));
        }
        if d.roi.iter().flatten().any(|v| !(0.0..=1.0).contains(v)) {
            return Err(LaneError::InvalidProfile(
                "roi vertices must be fractions in [0, 1]".into(),
            ));
        }
        Ok(())
    }

    pub fn overlay_style(&self) -> OverlayStyle {
        OverlayStyle {
            stroke: Rgb(self.stroke_color),
            fill: Rgb(self.fill_color),
            thickness: self.thickness,
        }
    }
}

impl Default for DeploymentProfile {
    fn default() -> Self {
        Self::day()
    }
}
