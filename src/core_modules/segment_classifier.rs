// THEORY:
// The `SegmentClassifier` is the first stage of the lane core. It turns the detector's unordered
// bag of segments into two candidate sets, one per lane boundary, using nothing but the sign of
// each segment's slope. In image coordinates (y grows downward) the left boundary of the driving
// lane rises toward the vanishing point from left to right, so its slope is negative; the right
// boundary's slope is positive.
//
// Key rules:
// 1.  **Vertical segments are discarded**: `x1 == x2` has no slope and no intercept.
// 2.  **Partition**: every remaining segment lands in exactly one side.
// 3.  **Tie-break**: a slope of exactly zero is assigned to the right side.
// 4.  **Stateless Utility**: `classify` has no memory of previous frames and never fails.
//     "No segments" and "empty segments" both yield two empty sets.

use crate::core_modules::segment::LineSegment;

/// One classified segment, reduced to the quantities the estimator needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub slope: f64,
    pub intercept: f64,
    /// Segment length, used as the averaging weight.
    pub length: f64,
}

/// The two candidate sets for a single frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassifiedSegments {
    pub left: Vec<Candidate>,
    pub right: Vec<Candidate>,
}

impl ClassifiedSegments {
    pub fn is_empty(&self) -> bool {
        self.left.is_empty() && self.right.is_empty()
    }
}

pub mod segment_classifier {
    use super::*;
    use tracing::trace;

    /// Computes the slope, intercept and length of a non-vertical segment.
    pub fn candidate(segment: &LineSegment) -> Option<Candidate> {
        if segment.is_vertical() {
            return None;
        }
        let slope = (segment.y2 as f64 - segment.y1 as f64)
            / (segment.x2 as f64 - segment.x1 as f64);
        let intercept = segment.y1 as f64 - slope * segment.x1 as f64;
        Some(Candidate {
            slope,
            intercept,
            length: segment.length(),
        })
    }

    /// Partitions the frame's segments into left (negative slope) and right (non-negative slope).
    pub fn classify(segments: Option<&[LineSegment]>) -> ClassifiedSegments {
        let mut classified = ClassifiedSegments::default();
        let Some(segments) = segments else {
            return classified;
        };

        let mut vertical = 0usize;
        for segment in segments {
            match candidate(segment) {
                Some(c) if c.slope < 0.0 => classified.left.push(c),
                Some(c) => classified.right.push(c),
                None => vertical += 1,
            }
        }

        trace!(
            left = classified.left.len(),
            right = classified.right.len(),
            vertical,
            "classified segments"
        );
        classified
    }
}

#[cfg(test)]
mod tests {
    use super::segment_classifier::*;
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn absent_and_empty_input_yield_empty_sets() {
        assert!(classify(None).is_empty());
        assert!(classify(Some(&[])).is_empty());
    }

    #[test]
    fn geometry_matches_standard_line_formulas() {
        let c = candidate(&LineSegment::new(100, 500, 200, 400)).unwrap();
        assert!(close(c.slope, -1.0));
        assert!(close(c.intercept, 600.0));
        assert!(close(c.length, (2.0f64 * 100.0 * 100.0).sqrt()));

        let c = candidate(&LineSegment::new(10, 20, 30, 70)).unwrap();
        assert!(close(c.slope, 2.5));
        assert!(close(c.intercept, -5.0));
    }

    #[test]
    fn extreme_endpoints_do_not_overflow() {
        let c = candidate(&LineSegment::new(i32::MIN, i32::MIN, i32::MAX, i32::MAX)).unwrap();
        assert!(close(c.slope, 1.0));
        assert!(close(c.intercept, 0.0));
        assert!(c.length.is_finite());

        let classified = classify(Some(&[LineSegment::new(i32::MIN, i32::MAX, i32::MAX, i32::MIN)]));
        assert_eq!(classified.left.len(), 1);
        assert!(close(classified.left[0].slope, -1.0));
    }

    #[test]
    fn vertical_segments_are_excluded_from_both_sides() {
        let segments = [
            LineSegment::new(50, 0, 50, 100),
            LineSegment::new(3, 3, 3, 3),
        ];
        let classified = classify(Some(&segments));
        assert!(classified.left.is_empty());
        assert!(classified.right.is_empty());
    }

    #[test]
    fn classification_is_a_partition() {
        let segments = [
            LineSegment::new(100, 500, 200, 400),
            LineSegment::new(300, 500, 400, 600),
            LineSegment::new(0, 10, 40, 0),
            LineSegment::new(60, 60, 60, 90),
            LineSegment::new(5, 5, 25, 45),
        ];
        let classified = classify(Some(&segments));
        assert_eq!(classified.left.len() + classified.right.len(), 4);
        assert!(classified.left.iter().all(|c| c.slope < 0.0));
        assert!(classified.right.iter().all(|c| c.slope >= 0.0));
    }

    #[test]
    fn zero_slope_goes_right() {
        let classified = classify(Some(&[LineSegment::new(0, 200, 80, 200)]));
        assert!(classified.left.is_empty());
        assert_eq!(classified.right.len(), 1);
        assert_eq!(classified.right[0].slope, 0.0);
    }

    #[test]
    fn endpoint_order_does_not_change_the_line() {
        let a = candidate(&LineSegment::new(100, 500, 200, 400)).unwrap();
        let b = candidate(&LineSegment::new(200, 400, 100, 500)).unwrap();
        assert!(close(a.slope, b.slope));
        assert!(close(a.intercept, b.intercept));
        assert!(close(a.length, b.length));
    }
}
