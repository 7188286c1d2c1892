//! Integration test for the pinhole intrinsic model in a multi-view setup
//!
//! Simulates the way a reconstruction pipeline consumes the model:
//! - 200 calibration points on a planar wall
//! - 5 cameras on a horizontal arc viewing the target
//! - projective-matrix equivalence against direct projection
//! - bearing-based ray casting for triangulation
//! - a solver-style perturb/update/restore loop over the parameter vector

use aperture_camera_models::{CameraIntrinsic, PinholeIntrinsic};
use nalgebra::{Vector2, Vector4};
use std::sync::Arc;

use camera_test_utils::*;

type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Mean reprojection error of the wall observations under `camera`.
fn mean_reprojection_error(
    camera: &dyn CameraIntrinsic,
    observations: &[(nalgebra::Vector3<f64>, Vector2<f64>)],
) -> f64 {
    let total: f64 = observations
        .iter()
        .map(|(p_cam, uv)| (camera.project(p_cam) - uv).norm())
        .sum();
    total / observations.len() as f64
}

#[test]
fn test_multi_camera_reprojection_consistency() -> TestResult {
    // ============================================================================
    // 1. Ground Truth Setup - 600x400 Pinhole Camera
    // ============================================================================

    let camera = PinholeIntrinsic::new(600, 400, 200.0, 300.0, 200.0);

    // ============================================================================
    // 2. Generate Calibration Target (200 Points on Wall at Z=3m)
    // ============================================================================

    let landmarks = generate_wall_points(20, 10, 0.1, 3.0);
    assert_eq!(landmarks.len(), 200);

    // ============================================================================
    // 3. Project Through 5 Poses and Verify All Points Visible
    // ============================================================================

    let poses = generate_arc_poses(5, 0.8);

    for (cam_idx, pose) in poses.iter().enumerate() {
        let p_matrix = camera.projection_matrix(pose);

        for (lm_idx, landmark) in landmarks.iter().enumerate() {
            let p_cam = pose.transform_point(&(*landmark).into()).coords;
            assert!(
                p_cam.z > 0.0,
                "Camera {} has landmark {} behind it",
                cam_idx,
                lm_idx
            );

            let uv = camera.project(&p_cam);
            assert!(
                camera.contains(&uv),
                "Camera {} landmark {} projects outside image: uv = ({:.1}, {:.1})",
                cam_idx,
                lm_idx,
                uv.x,
                uv.y
            );

            // The projective matrix must agree with the two-step projection.
            let h = p_matrix * Vector4::new(landmark.x, landmark.y, landmark.z, 1.0);
            let uv_matrix = Vector2::new(h.x / h.z, h.y / h.z);
            assert!(
                (uv - uv_matrix).norm() < 1e-9,
                "Projective matrix disagrees with project() for camera {}",
                cam_idx
            );

            // Casting the pixel back must recover the viewing ray.
            let bearing = camera.unproject(&uv);
            assert!(
                (bearing - p_cam.normalize()).norm() < 1e-12,
                "Bearing mismatch for camera {} landmark {}",
                cam_idx,
                lm_idx
            );
        }
    }

    Ok(())
}

#[test]
fn test_solver_style_parameter_loop() -> TestResult {
    // ============================================================================
    // 1. Ground Truth Observations from the True Calibration
    // ============================================================================

    let true_camera = PinholeIntrinsic::new(600, 400, 200.0, 300.0, 200.0);
    let pose = generate_arc_poses(1, 0.0)[0];

    let observations: Vec<_> = generate_wall_points(20, 10, 0.1, 3.0)
        .iter()
        .map(|lm| {
            let p_cam = pose.transform_point(&(*lm).into()).coords;
            (p_cam, true_camera.project(&p_cam))
        })
        .collect();

    // ============================================================================
    // 2. Perturb -> Update -> Error Grows; Restore -> Error Vanishes
    // ============================================================================

    let mut camera = true_camera.clone();
    let true_params = camera.params();

    assert!(mean_reprojection_error(&camera, &observations) < 1e-12);

    let noisy = perturb_params(true_params.as_slice(), 0.02, 7);
    camera.update_from_params(&noisy)?;

    let perturbed_error = mean_reprojection_error(&camera, &observations);
    assert!(
        perturbed_error > 0.1,
        "Perturbed intrinsics should produce visible reprojection error, got {perturbed_error}"
    );

    camera.update_from_params(true_params.as_slice())?;
    assert!(mean_reprojection_error(&camera, &observations) < 1e-12);
    assert_eq!(camera.k(), true_camera.k());

    // ============================================================================
    // 3. Malformed Vectors Never Apply
    // ============================================================================

    let before = camera.clone();
    assert!(camera.update_from_params(&noisy[..2]).is_err());
    assert_eq!(camera, before);

    Ok(())
}

#[test]
fn test_shared_instance_parallel_reads() -> TestResult {
    // One physical camera shared by several views: concurrent projection of
    // disjoint observation sets must agree with serial evaluation.
    let camera: Arc<dyn CameraIntrinsic> =
        Arc::new(PinholeIntrinsic::new(600, 400, 200.0, 300.0, 200.0));
    let landmarks = generate_wall_points(20, 10, 0.1, 3.0);

    let serial: Vec<_> = landmarks.iter().map(|p| camera.project(p)).collect();

    let mut handles = Vec::new();
    for chunk_idx in 0..4 {
        let camera = Arc::clone(&camera);
        let chunk: Vec<_> = landmarks
            .iter()
            .skip(chunk_idx * 50)
            .take(50)
            .cloned()
            .collect();
        handles.push(std::thread::spawn(move || {
            chunk.iter().map(|p| camera.project(p)).collect::<Vec<_>>()
        }));
    }

    for (chunk_idx, handle) in handles.into_iter().enumerate() {
        let projected = handle.join().expect("projection thread panicked");
        for (i, uv) in projected.iter().enumerate() {
            assert_eq!(*uv, serial[chunk_idx * 50 + i]);
        }
    }

    Ok(())
}
