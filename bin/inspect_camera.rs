//! Camera Inspection Binary
//!
//! Loads an intrinsic calibration file and reports its state: variant,
//! image size, free parameters, and a project→unproject consistency sweep
//! over a pixel grid.
//!
//! # Usage
//! ```bash
//! cargo run --bin inspect_camera -- path/to/camera.json
//!
//! # Denser consistency grid:
//! cargo run --bin inspect_camera -- camera.json -g 32
//! ```

use aperture_camera_models::{CameraIntrinsic, init_logger, load_intrinsic};
use clap::Parser;
use nalgebra::Vector2;
use std::error::Error;
use std::path::PathBuf;
use tracing::{info, warn};

/// Inspect a camera intrinsic calibration file
#[derive(Parser)]
#[command(name = "inspect_camera")]
#[command(about = "Inspect a camera intrinsic calibration file")]
struct Args {
    /// Calibration file path (required, positional)
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Consistency grid resolution (samples per axis)
    #[arg(short, long, default_value_t = 16)]
    grid: usize,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    init_logger();

    if !args.file.exists() {
        return Err(format!("File not found: {}", args.file.display()).into());
    }

    info!("Loading intrinsic: {}", args.file.display());
    let camera = load_intrinsic(&args.file)?;

    info!("Camera model:");
    info!("  Variant: {}", camera.kind().name());
    info!("  Image size: {}x{}", camera.width(), camera.height());
    info!("  Parameters: {:?}", camera.params().as_slice());
    info!(
        "  1px reprojection threshold on the camera plane: {:.3e}",
        camera.image_to_camera_error(1.0)
    );

    let (max_err, mean_err) = ray_consistency_sweep(camera.as_ref(), args.grid);
    info!("Ray consistency over a {}x{} grid:", args.grid, args.grid);
    info!("  Max pixel error: {:.3e}", max_err);
    info!("  Mean pixel error: {:.3e}", mean_err);

    if !max_err.is_finite() || max_err > 1e-6 {
        warn!("Calibration looks degenerate (unproject/project mismatch)");
    }

    Ok(())
}

/// Unprojects a grid of pixels to bearings, pushes them to a fixed depth,
/// reprojects, and measures the pixel discrepancy.
fn ray_consistency_sweep(camera: &dyn CameraIntrinsic, grid: usize) -> (f64, f64) {
    let mut max_err = 0.0f64;
    let mut sum_err = 0.0f64;
    let mut count = 0usize;

    for gy in 0..grid {
        for gx in 0..grid {
            let pixel = Vector2::new(
                (gx as f64 + 0.5) / grid as f64 * camera.width() as f64,
                (gy as f64 + 0.5) / grid as f64 * camera.height() as f64,
            );

            let ray = camera.unproject(&pixel);
            // Push the bearing out to 2m depth before reprojecting.
            let point = ray * (2.0 / ray.z);
            let err = (camera.project(&point) - pixel).norm();

            max_err = max_err.max(err);
            sum_err += err;
            count += 1;
        }
    }

    (max_err, sum_err / count as f64)
}
