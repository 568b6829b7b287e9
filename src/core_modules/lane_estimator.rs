// THEORY:
// The `lane_estimator` reduces one side's candidate set to a single `LaneLine`. Each candidate
// votes for its (slope, intercept) with a weight equal to its length, so long, confidently
// detected paint marks dominate short speckles from the edge detector.
//
// Degenerate outcomes are not errors here. An empty set, a set whose weights sum to zero, and an
// average whose slope is zero (only reachable on the right side, from purely horizontal segments)
// all produce `None`, which the tracker then treats exactly like a missed detection.

use crate::core_modules::segment::LaneLine;
use crate::core_modules::segment_classifier::Candidate;
use tracing::debug;

/// Length-weighted average of the candidates' slopes and intercepts.
pub fn estimate(candidates: &[Candidate]) -> Option<LaneLine> {
    if candidates.is_empty() {
        return None;
    }

    let (weight, slope_sum, intercept_sum) = candidates.iter().fold(
        (0.0f64, 0.0f64, 0.0f64),
        |(w, s, i), c| (w + c.length, s + c.length * c.slope, i + c.length * c.intercept),
    );

    if weight <= 0.0 || !weight.is_finite() {
        debug!(candidates = candidates.len(), "weights sum to zero, no estimate");
        return None;
    }

    let slope = slope_sum / weight;
    let intercept = intercept_sum / weight;
    let line = LaneLine::new(slope, intercept);
    if line.is_none() {
        debug!(slope, intercept, "degenerate weighted estimate, no estimate");
    }
    line
}
