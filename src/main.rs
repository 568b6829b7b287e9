// Example runner: renders the lane overlay for a single still frame whose segments were detected
// elsewhere and saved as YAML, e.g.
//
//   - { x1: 100, y1: 500, x2: 200, y2: 400 }
//   - { x1: 300, y1: 500, x2: 400, y2: 600 }
//
// Usage: lane_vision <frame.png> <segments.yaml> <output.png> [day|night|profile.yaml]

use anyhow::{Context, Result, bail};
use lane_vision::core_modules::utils::image_helper::image_helper;
use lane_vision::pipeline::LineSegment;
use lane_vision::{DeploymentProfile, LanePipeline, ScriptedDetector};
use std::env;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lane_vision=info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 4 {
        bail!("Usage: lane_vision <frame.png> <segments.yaml> <output.png> [day|night|profile.yaml]");
    }
    let (frame_path, segments_path, output_path) = (&args[1], &args[2], &args[3]);
    let profile_name = args.get(4).map(String::as_str).unwrap_or("day");

    let profile = DeploymentProfile::from_name(profile_name)
        .with_context(|| format!("loading profile {profile_name}"))?;
    let frame = image_helper::load(frame_path).with_context(|| format!("reading {frame_path}"))?;
    let segments: Vec<LineSegment> = serde_yaml::from_str(
        &std::fs::read_to_string(segments_path)
            .with_context(|| format!("reading {segments_path}"))?,
    )
    .with_context(|| format!("parsing {segments_path}"))?;

    let mut pipeline = LanePipeline::new(profile, ScriptedDetector::new([Some(segments)]))?;
    let (rendered, report) = pipeline.process_frame_with_report(&frame);

    info!(
        left_candidates = report.left_candidates,
        right_candidates = report.right_candidates,
        left = ?report.left_projected,
        right = ?report.right_projected,
        filled = report.fill.is_some(),
        "frame rendered"
    );

    image_helper::save(output_path, &rendered).with_context(|| format!("writing {output_path}"))?;
    println!("Overlay saved to {}", output_path);
    Ok(())
}
