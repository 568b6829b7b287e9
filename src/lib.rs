// THEORY:
// This file is the main entry point for the `lane_vision` library crate. It follows the standard
// Rust convention of using `lib.rs` to define the public API exposed to whatever drives the video
// loop (the opencv `visual_tester`, a camera service, or a test harness).
//
// The primary goal is to export `LanePipeline` and its associated data structures
// (`DeploymentProfile`, `LaneReport`, `SegmentDetector`, etc.) as the high-level interface of the
// lane engine, with `StreamPool` for running several independent streams side by side. The
// per-stage modules live under `core_modules`.

pub mod config;
pub mod core_modules;
pub mod error;
pub mod parallel_pipeline;
pub mod pipeline;

pub use config::{DeploymentProfile, DetectorSettings};
pub use core_modules::detector::{ScriptedDetector, SegmentDetector};
pub use error::{LaneError, Result};
pub use parallel_pipeline::{StreamFrame, StreamHandle, StreamPool, StreamSummary};
pub use pipeline::{LanePipeline, LaneReport};
