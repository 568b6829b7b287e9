// THEORY:
// Edge and line-segment detection is not part of the lane core. Whatever produces raw segments
// (an opencv Hough pipeline in `visual_tester`, a recorded list of segments, a test fixture)
// plugs in behind the `SegmentDetector` trait. The pipeline only asks one question per frame:
// "which segments do you see?", and "none" is a perfectly good answer.

use crate::core_modules::segment::LineSegment;
use image::RgbImage;
use std::collections::VecDeque;

pub trait SegmentDetector {
    /// Raw segments found in `frame`, or `None` when the detector found nothing at all.
    fn detect(&mut self, frame: &RgbImage) -> Option<Vec<LineSegment>>;
}

impl<F> SegmentDetector for F
where
    F: FnMut(&RgbImage) -> Option<Vec<LineSegment>>,
{
    fn detect(&mut self, frame: &RgbImage) -> Option<Vec<LineSegment>> {
        self(frame)
    }
}

/// Replays a fixed sequence of per-frame detections, then reports nothing.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDetector {
    frames: VecDeque<Option<Vec<LineSegment>>>,
}

impl ScriptedDetector {
    pub fn new(frames: impl IntoIterator<Item = Option<Vec<LineSegment>>>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }

    /// Queues the detections for one more frame.
    pub fn push(&mut self, segments: Option<Vec<LineSegment>>) {
        self.frames.push_back(segments);
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl SegmentDetector for ScriptedDetector {
    fn detect(&mut self, _frame: &RgbImage) -> Option<Vec<LineSegment>> {
        self.frames.pop_front().flatten()
    }
}
