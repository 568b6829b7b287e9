pub mod detector;
pub mod lane_estimator;
pub mod overlay;
pub mod projector;
pub mod segment;
pub mod segment_classifier;
pub mod tracker;
pub mod utils;
