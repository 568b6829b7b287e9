use anyhow::{Context, Result, bail};
use image::RgbImage;
use lane_vision::pipeline::LineSegment;
use lane_vision::{DeploymentProfile, DetectorSettings, LanePipeline, SegmentDetector};
use opencv::{
    core::{self, Mat, Point, Scalar, Size, Vec4i, Vector},
    highgui, imgproc,
    prelude::*,
    videoio::{self, VideoCapture, VideoWriter},
};
use std::env;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const WINDOW_NAME: &str = "Lane Detection";
const OUTPUT_FPS: f64 = 20.0;

/// Grayscale → blur → threshold → region of interest → Canny → probabilistic Hough.
struct HoughSegmentDetector {
    settings: DetectorSettings,
}

impl HoughSegmentDetector {
    fn new(settings: DetectorSettings) -> Self {
        Self { settings }
    }

    fn detect_lines(&self, rgb: &Mat) -> opencv::Result<Vector<Vec4i>> {
        let s = &self.settings;
        let size = rgb.size()?;

        let mut gray = Mat::default();
        imgproc::cvt_color(rgb, &mut gray, imgproc::COLOR_RGB2GRAY, 0)?;

        let k = s.blur_kernel as i32;
        let mut blurred = Mat::default();
        imgproc::gaussian_blur(&gray, &mut blurred, Size::new(k, k), 0.0, 0.0, core::BORDER_DEFAULT)?;

        let mut white = Mat::default();
        imgproc::threshold(&blurred, &mut white, s.white_threshold as f64, 255.0, imgproc::THRESH_BINARY)?;

        // --- Region of interest ---
        let mut roi_mask = Mat::new_size_with_default(size, core::CV_8UC1, Scalar::all(0.0))?;
        let vertices: Vector<Point> = s
            .roi_pixels(size.width as u32, size.height as u32)
            .iter()
            .map(|&(x, y)| Point::new(x, y))
            .collect();
        let polygons: Vector<Vector<Point>> = Vector::from_iter([vertices]);
        imgproc::fill_poly(&mut roi_mask, &polygons, Scalar::all(255.0), imgproc::LINE_8, 0, Point::default())?;

        let mut masked = Mat::default();
        core::bitwise_and(&white, &roi_mask, &mut masked, &Mat::default())?;

        let mut edges = Mat::default();
        imgproc::canny(&masked, &mut edges, s.canny_low, s.canny_high, 3, false)?;

        let mut lines = Vector::<Vec4i>::new();
        imgproc::hough_lines_p(
            &edges,
            &mut lines,
            s.hough_rho,
            s.hough_theta,
            s.hough_threshold,
            s.min_line_length,
            s.max_line_gap,
        )?;
        Ok(lines)
    }
}

impl SegmentDetector for HoughSegmentDetector {
    fn detect(&mut self, frame: &RgbImage) -> Option<Vec<LineSegment>> {
        let lines = match rgb_to_mat(frame).and_then(|mat| self.detect_lines(&mat)) {
            Ok(lines) => lines,
            Err(e) => {
                warn!(error = %e, "segment detection failed");
                return None;
            }
        };
        if lines.is_empty() {
            return None;
        }
        Some(
            lines
                .iter()
                .map(|l| LineSegment::new(l[0], l[1], l[2], l[3]))
                .collect(),
        )
    }
}

/// Copies an RGB image into a continuous 8-bit, 3-channel Mat (RGB order).
fn rgb_to_mat(image: &RgbImage) -> opencv::Result<Mat> {
    let mut mat = Mat::new_rows_cols_with_default(
        image.height() as i32,
        image.width() as i32,
        core::CV_8UC3,
        Scalar::all(0.0),
    )?;
    mat.data_bytes_mut()?.copy_from_slice(image.as_raw());
    Ok(mat)
}

fn bgr_to_rgb_image(frame: &Mat) -> Result<RgbImage> {
    let mut rgb = Mat::default();
    imgproc::cvt_color(frame, &mut rgb, imgproc::COLOR_BGR2RGB, 0)?;
    let size = rgb.size()?;
    RgbImage::from_raw(size.width as u32, size.height as u32, rgb.data_bytes()?.to_vec())
        .context("frame buffer does not match its dimensions")
}

fn rgb_image_to_bgr(image: &RgbImage) -> Result<Mat> {
    let rgb = rgb_to_mat(image)?;
    let mut bgr = Mat::default();
    imgproc::cvt_color(&rgb, &mut bgr, imgproc::COLOR_RGB2BGR, 0)?;
    Ok(bgr)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("visual_tester=info,lane_vision=info")),
        )
        .init();

    // --- 1. Argument Parsing & Setup ---
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        bail!("Usage: visual_tester <input_video_path> <output_video_path> [day|night|profile.yaml] [--show]");
    }
    let input_path = &args[1];
    let output_path = &args[2];
    let profile_name = args
        .get(3)
        .filter(|a| !a.starts_with("--"))
        .map(String::as_str)
        .unwrap_or("day");
    let show = args.iter().any(|a| a == "--show");

    let profile = DeploymentProfile::from_name(profile_name)?;

    // --- 2. Video I/O Initialization ---
    let mut cap = VideoCapture::from_file(input_path, videoio::CAP_ANY)?;
    if !cap.is_opened()? {
        bail!("Could not open video {input_path}");
    }

    let frame_width = cap.get(videoio::CAP_PROP_FRAME_WIDTH)? as i32;
    let frame_height = cap.get(videoio::CAP_PROP_FRAME_HEIGHT)? as i32;

    let fourcc = VideoWriter::fourcc('X', 'V', 'I', 'D')?;
    let mut writer = VideoWriter::new(
        output_path,
        fourcc,
        OUTPUT_FPS,
        Size::new(frame_width, frame_height),
        true,
    )?;

    // --- 3. Lane Pipeline Initialization ---
    let detector = HoughSegmentDetector::new(profile.detector.clone());
    let mut pipeline = LanePipeline::new(profile, detector)?;
    info!(input = %input_path, frame_width, frame_height, "processing video");

    // --- 4. Main Processing Loop ---
    let mut frame = Mat::default();
    loop {
        if !cap.read(&mut frame)? || frame.empty() {
            break;
        }

        let rgb = bgr_to_rgb_image(&frame)?;
        let rendered = pipeline.process_frame(&rgb);
        let output_frame = rgb_image_to_bgr(&rendered)?;
        writer.write(&output_frame)?;

        if show {
            highgui::imshow(WINDOW_NAME, &output_frame)?;
            if highgui::wait_key(1)? & 0xFF == 'q' as i32 {
                break;
            }
        }
    }

    cap.release()?;
    writer.release()?;
    if show {
        highgui::destroy_all_windows()?;
    }

    info!(frames = pipeline.frames_processed(), output = %output_path, "processing complete");
    Ok(())
}
