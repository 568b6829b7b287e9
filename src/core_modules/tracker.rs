// THEORY:
// The `tracker` module is the memory of the lane system. Detection is noisy: a worn stretch of
// paint, a passing car or a patch of glare can leave a frame with no usable segments for one or
// both sides. Without memory the overlay would flicker every time that happens.
//
// Key architectural principles:
// 1.  **Explicit State**: The last known lines live in a `TrackerState` value owned by exactly
//     one `LaneTracker`, which is owned by exactly one stream's pipeline. There is no global.
// 2.  **Per-Side Fallback**: Each side is handled independently. A fresh estimate is adopted and
//     remembered; a missing estimate is replaced by the remembered line, which may itself be
//     absent at the start of a stream.
// 3.  **No Decay By Default**: A remembered line persists for as long as detection keeps failing.
//     A stream that wants stale lines to disappear sets `max_fallback_frames`; after that many
//     consecutive carried frames the side is cleared.
// 4.  **Single Writer**: `update` takes `&mut self`, so a tracker cannot be advanced from two
//     places at once. Frame ordering is enforced one level up, by the pipeline.

use crate::core_modules::segment::LaneLine;
use tracing::{debug, warn};

/// The two last-known lane lines of a stream.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrackerState {
    pub last_left: Option<LaneLine>,
    pub last_right: Option<LaneLine>,
}

/// Where a side's tracked line came from on the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneSource {
    /// A fresh estimate was available this frame.
    Detected,
    /// No estimate this frame; the last known line was carried forward.
    Carried,
    /// Neither an estimate nor a remembered line exists.
    Absent,
}

/// The tracker's output for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackedLanes {
    pub left: Option<LaneLine>,
    pub right: Option<LaneLine>,
    pub left_source: LaneSource,
    pub right_source: LaneSource,
}

impl TrackedLanes {
    pub fn pair(&self) -> (Option<LaneLine>, Option<LaneLine>) {
        (self.left, self.right)
    }

    /// Both boundaries are known, so the lane area between them can be filled.
    pub fn both_present(&self) -> bool {
        self.left.is_some() && self.right.is_some()
    }
}

/// Carries the last known left/right lane lines across frames.
#[derive(Debug, Clone, Default)]
pub struct LaneTracker {
    state: TrackerState,
    /// Consecutive carried frames for the left and right side.
    fallback_frames: [u32; 2],
    max_fallback_frames: Option<u32>,
}

impl LaneTracker {
    /// A tracker that carries lines forward indefinitely.
    pub fn new() -> Self {
        Self::default()
    }

    /// A tracker that clears a side after `max_fallback_frames` consecutive carried frames.
    pub fn with_decay(max_fallback_frames: Option<u32>) -> Self {
        Self {
            max_fallback_frames,
            ..Self::default()
        }
    }

    pub fn state(&self) -> &TrackerState {
        &self.state
    }

    /// Advances the tracker by one frame with this frame's estimates.
    pub fn update(&mut self, left: Option<LaneLine>, right: Option<LaneLine>) -> TrackedLanes {
        let (left, left_source) = Self::resolve(
            "left",
            left,
            &mut self.state.last_left,
            &mut self.fallback_frames[0],
            self.max_fallback_frames,
        );
        let (right, right_source) = Self::resolve(
            "right",
            right,
            &mut self.state.last_right,
            &mut self.fallback_frames[1],
            self.max_fallback_frames,
        );

        TrackedLanes {
            left,
            right,
            left_source,
            right_source,
        }
    }

    /// Forgets both lines, as at the start of a new stream.
    pub fn reset(&mut self) {
        self.state = TrackerState::default();
        self.fallback_frames = [0, 0];
    }

    fn resolve(
        side: &'static str,
        estimate: Option<LaneLine>,
        last: &mut Option<LaneLine>,
        misses: &mut u32,
        max_misses: Option<u32>,
    ) -> (Option<LaneLine>, LaneSource) {
        if let Some(line) = estimate {
            *last = Some(line);
            *misses = 0;
            return (Some(line), LaneSource::Detected);
        }

        let Some(carried) = *last else {
            return (None, LaneSource::Absent);
        };

        *misses += 1;
        if let Some(limit) = max_misses {
            if *misses > limit {
                warn!(side, frames = *misses - 1, "lane line went stale, dropping it");
                *last = None;
                *misses = 0;
                return (None, LaneSource::Absent);
            }
        }

        debug!(side, frames = *misses, "no estimate, carrying last known line");
        (Some(carried), LaneSource::Carried)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(slope: f64, intercept: f64) -> Option<LaneLine> {
        LaneLine::new(slope, intercept)
    }

    #[test]
    fn first_empty_frame_stays_absent() {
        let mut tracker = LaneTracker::new();
        let tracked = tracker.update(None, None);
        assert_eq!(tracked.pair(), (None, None));
        assert_eq!(tracked.left_source, LaneSource::Absent);
        assert_eq!(tracker.state(), &TrackerState::default());
    }

    #[test]
    fn last_known_line_persists_across_a_missed_frame() {
        let mut tracker = LaneTracker::new();
        let left = line(-1.0, 600.0);
        tracker.update(left, None);

        let tracked = tracker.update(None, None);
        assert_eq!(tracked.left, left);
        assert_eq!(tracked.right, None);
        assert_eq!(tracked.left_source, LaneSource::Carried);
        assert_eq!(tracked.right_source, LaneSource::Absent);
    }

    #[test]
    fn sides_are_tracked_independently() {
        let mut tracker = LaneTracker::new();
        let right = line(1.0, 200.0);
        tracker.update(line(-1.0, 600.0), right);

        let new_left = line(-0.8, 580.0);
        let tracked = tracker.update(new_left, None);
        assert_eq!(tracked.left, new_left);
        assert_eq!(tracked.right, right);
        assert_eq!(tracker.state().last_left, new_left);
        assert_eq!(tracker.state().last_right, right);
    }

    #[test]
    fn without_decay_lines_persist_indefinitely() {
        let mut tracker = LaneTracker::new();
        let left = line(-2.0, 900.0);
        tracker.update(left, None);
        for _ in 0..10_000 {
            assert_eq!(tracker.update(None, None).left, left);
        }
    }

    #[test]
    fn opt_in_decay_clears_a_stale_side() {
        let mut tracker = LaneTracker::with_decay(Some(2));
        let left = line(-1.0, 600.0);
        tracker.update(left, None);

        assert_eq!(tracker.update(None, None).left, left);
        assert_eq!(tracker.update(None, None).left, left);
        let tracked = tracker.update(None, None);
        assert_eq!(tracked.left, None);
        assert_eq!(tracked.left_source, LaneSource::Absent);
        assert_eq!(tracker.state().last_left, None);
    }

    #[test]
    fn fresh_detection_resets_the_decay_counter() {
        let mut tracker = LaneTracker::with_decay(Some(1));
        let left = line(-1.0, 600.0);
        tracker.update(left, None);
        tracker.update(None, None);
        tracker.update(left, None);
        assert_eq!(tracker.update(None, None).left, left);
    }

    #[test]
    fn reset_forgets_everything() {
        let mut tracker = LaneTracker::new();
        tracker.update(line(-1.0, 600.0), line(1.0, 0.0));
        tracker.reset();
        assert_eq!(tracker.update(None, None).pair(), (None, None));
    }
}
