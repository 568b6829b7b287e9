// THEORY:
// The `pipeline` module is the top-level API of the lane engine. It wires the stages together
// into a single per-frame call and owns the one piece of state a stream has: its `LaneTracker`.
//
//   detector → classify → estimate → track → project → render
//
// One `LanePipeline` serves exactly one video stream. Frames must be fed in order; the pipeline
// counts them, and the sequenced entry point refuses a frame that is not the next one.

use crate::config::DeploymentProfile;
use crate::core_modules::detector::SegmentDetector;
use crate::core_modules::lane_estimator;
use crate::core_modules::overlay::{LaneQuad, OverlayRenderer};
use crate::core_modules::projector::ProjectionLevels;
use crate::core_modules::segment_classifier::segment_classifier;
use crate::core_modules::tracker::LaneTracker;
use crate::error::{LaneError, Result};
use image::RgbImage;
use tracing::{debug, info};

// Re-export key data structures for the public API.
pub use crate::core_modules::segment::{LaneLine, LineSegment, PixelPoint, ProjectedLine};
pub use crate::core_modules::tracker::{LaneSource, TrackedLanes, TrackerState};

/// Everything the pipeline decided about one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct LaneReport {
    /// Zero-based position of the frame in its stream.
    pub frame_id: u64,
    pub left_candidates: usize,
    pub right_candidates: usize,
    /// This frame's own estimates, before tracking.
    pub left_estimate: Option<LaneLine>,
    pub right_estimate: Option<LaneLine>,
    pub tracked: TrackedLanes,
    pub levels: ProjectionLevels,
    pub left_projected: Option<ProjectedLine>,
    pub right_projected: Option<ProjectedLine>,
    /// Present only when both tracked lines are.
    pub fill: Option<LaneQuad>,
}

impl LaneReport {
    pub fn has_overlay(&self) -> bool {
        self.left_projected.is_some() || self.right_projected.is_some()
    }
}

/// The lane engine for a single video stream.
pub struct LanePipeline<D> {
    detector: D,
    tracker: LaneTracker,
    renderer: OverlayRenderer,
    profile: DeploymentProfile,
    next_frame: u64,
}

impl<D: SegmentDetector> LanePipeline<D> {
    pub fn new(profile: DeploymentProfile, detector: D) -> Result<Self> {
        profile.validate()?;
        info!(
            profile = %profile.name,
            y_top_ratio = profile.y_top_ratio,
            max_fallback_frames = ?profile.max_fallback_frames,
            "lane pipeline ready"
        );
        Ok(Self {
            detector,
            tracker: LaneTracker::with_decay(profile.max_fallback_frames),
            renderer: OverlayRenderer::new(profile.overlay_style()),
            profile,
            next_frame: 0,
        })
    }

    /// Runs the whole pipeline on the next frame of the stream and returns the composited frame.
    pub fn process_frame(&mut self, frame: &RgbImage) -> RgbImage {
        self.process_frame_with_report(frame).0
    }

    pub fn process_frame_with_report(&mut self, frame: &RgbImage) -> (RgbImage, LaneReport) {
        let report = self.analyze(frame);
        let rendered = self.render(frame, &report);
        (rendered, report)
    }

    /// Like `process_frame_with_report`, but fails if `frame_id` is not the next frame.
    pub fn process_sequenced(
        &mut self,
        frame_id: u64,
        frame: &RgbImage,
    ) -> Result<(RgbImage, LaneReport)> {
        if frame_id != self.next_frame {
            return Err(LaneError::OutOfOrderFrame {
                expected: self.next_frame,
                got: frame_id,
            });
        }
        Ok(self.process_frame_with_report(frame))
    }

    /// Detects, estimates, tracks and projects, without rendering.
    pub fn analyze(&mut self, frame: &RgbImage) -> LaneReport {
        let segments = self.detector.detect(frame);
        self.track_segments(segments.as_deref(), frame.height())
    }

    /// Advances the stream with segments that were detected elsewhere.
    pub fn track_segments(
        &mut self,
        segments: Option<&[LineSegment]>,
        frame_height: u32,
    ) -> LaneReport {
        let frame_id = self.next_frame;
        self.next_frame += 1;

        // Stage 1: Classification
        let classified = segment_classifier::classify(segments);

        // Stage 2: Weighted Estimation
        let left_estimate = lane_estimator::estimate(&classified.left);
        let right_estimate = lane_estimator::estimate(&classified.right);

        // Stage 3: Tracking
        let tracked = self.tracker.update(left_estimate, right_estimate);

        // Stage 4: Projection
        let levels = ProjectionLevels::for_frame(frame_height, self.profile.y_top_ratio);
        let left_projected = levels.project(tracked.left);
        let right_projected = levels.project(tracked.right);
        let fill = match (&left_projected, &right_projected) {
            (Some(l), Some(r)) if tracked.both_present() => Some(LaneQuad::between(l, r)),
            _ => None,
        };

        debug!(
            frame_id,
            left_candidates = classified.left.len(),
            right_candidates = classified.right.len(),
            left = ?tracked.left_source,
            right = ?tracked.right_source,
            "frame tracked"
        );

        LaneReport {
            frame_id,
            left_candidates: classified.left.len(),
            right_candidates: classified.right.len(),
            left_estimate,
            right_estimate,
            tracked,
            levels,
            left_projected,
            right_projected,
            fill,
        }
    }

    /// Stage 5: draws a report's geometry onto a copy of `frame`.
    pub fn render(&self, frame: &RgbImage, report: &LaneReport) -> RgbImage {
        self.renderer.render(
            frame,
            [report.left_projected, report.right_projected],
            report.fill,
        )
    }

    /// Starts the stream over: forgets tracked lines and the frame count.
    pub fn reset(&mut self) {
        self.tracker.reset();
        self.next_frame = 0;
    }

    pub fn tracker_state(&self) -> &TrackerState {
        self.tracker.state()
    }

    pub fn frames_processed(&self) -> u64 {
        self.next_frame
    }

    pub fn profile(&self) -> &DeploymentProfile {
        &self.profile
    }

    pub fn detector_mut(&mut self) -> &mut D {
        &mut self.detector
    }
}
