//! Pinhole camera intrinsic model.
//!
//! The simplest perspective model: one focal length for both axes, zero skew,
//! no lens distortion. It doubles as the reference semantics every other
//! variant has to satisfy once its distortion is removed.
//!
//! # Mathematical Model
//!
//! The calibration matrix and its cached inverse are
//!
//! ```text
//! K = [ f  0  px ]        Kinv = [ 1/f   0   -px/f ]
//!     [ 0  f  py ]               [  0   1/f  -py/f ]
//!     [ 0  0   1 ]               [  0    0     1   ]
//! ```
//!
//! Projection of a camera-frame point p = (x, y, z):
//!
//! ```text
//! u = f · (x/z) + px
//! v = f · (y/z) + py
//! ```
//!
//! Unprojection of a pixel (u, v):
//!
//! ```text
//! ray = normalize(Kinv · [u, v, 1])
//! ```
//!
//! Focal length and principal point are *derived* from `K` rather than stored
//! next to it, and every parameter update replaces the whole value, so `K`
//! and `Kinv` cannot go stale against each other.

use nalgebra::{DVector, Isometry3, Matrix2xX, Matrix3, Matrix3x4, SMatrix, Vector2, Vector3};

use crate::{CameraIntrinsic, CameraModelError, IntrinsicConfig, IntrinsicKind};

/// Pinhole intrinsic model with 3 free parameters: `[focal, ppx, ppy]`.
#[derive(Debug, Clone, PartialEq)]
pub struct PinholeIntrinsic {
    width: u32,
    height: u32,
    /// Calibration matrix. Focal length and principal point are embedded here.
    k: Matrix3<f64>,
    /// Inverse of the calibration matrix, recomputed at every construction.
    k_inv: Matrix3<f64>,
}

impl PinholeIntrinsic {
    /// Creates a pinhole model for a `width × height` pixel grid.
    ///
    /// # Arguments
    ///
    /// * `focal_length` - Focal length in pixels (shared by both axes)
    /// * `ppx`, `ppy` - Principal point in pixels
    ///
    /// A zero focal length produces a singular `K`; `Kinv` is then NaN and
    /// NaN propagates through [`unproject`](CameraIntrinsic::unproject).
    /// Detecting that misconfiguration is the caller's responsibility, it is
    /// not checked on the projection hot path.
    pub fn new(width: u32, height: u32, focal_length: f64, ppx: f64, ppy: f64) -> Self {
        let k = Matrix3::new(
            focal_length,
            0.0,
            ppx,
            0.0,
            focal_length,
            ppy,
            0.0,
            0.0,
            1.0,
        );
        let k_inv = k
            .try_inverse()
            .unwrap_or_else(|| Matrix3::from_element(f64::NAN));
        Self {
            width,
            height,
            k,
            k_inv,
        }
    }

    /// The 3×3 calibration matrix `K`.
    pub fn k(&self) -> &Matrix3<f64> {
        &self.k
    }

    /// The inverse of the calibration matrix.
    pub fn k_inv(&self) -> &Matrix3<f64> {
        &self.k_inv
    }

    /// Focal length in pixels, read from `K`.
    pub fn focal(&self) -> f64 {
        self.k[(0, 0)]
    }

    /// Principal point in pixels, read from `K`.
    pub fn principal_point(&self) -> Vector2<f64> {
        Vector2::new(self.k[(0, 2)], self.k[(1, 2)])
    }
}

impl CameraIntrinsic for PinholeIntrinsic {
    fn kind(&self) -> IntrinsicKind {
        IntrinsicKind::Pinhole
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn unproject(&self, pixel: &Vector2<f64>) -> Vector3<f64> {
        let p3 = Vector3::new(pixel.x, pixel.y, 1.0);
        (self.k_inv * p3).normalize()
    }

    fn cam_to_image(&self, p: &Vector2<f64>) -> Vector2<f64> {
        p * self.focal() + self.principal_point()
    }

    fn image_to_cam(&self, p: &Vector2<f64>) -> Vector2<f64> {
        (p - self.principal_point()) / self.focal()
    }

    fn has_distortion(&self) -> bool {
        false
    }

    fn add_distortion(&self, p: &Vector2<f64>) -> Vector2<f64> {
        *p
    }

    fn remove_distortion(&self, p: &Vector2<f64>) -> Vector2<f64> {
        *p
    }

    fn undistorted_pixel(&self, p: &Vector2<f64>) -> Vector2<f64> {
        *p
    }

    fn distorted_pixel(&self, p: &Vector2<f64>) -> Vector2<f64> {
        *p
    }

    fn image_to_camera_error(&self, value: f64) -> f64 {
        value / self.focal()
    }

    fn projection_matrix(&self, pose: &Isometry3<f64>) -> Matrix3x4<f64> {
        let kr = self.k * pose.rotation.to_rotation_matrix().into_inner();
        let kt = self.k * pose.translation.vector;
        let mut p = Matrix3x4::zeros();
        p.fixed_view_mut::<3, 3>(0, 0).copy_from(&kr);
        p.set_column(3, &kt);
        p
    }

    /// Returns `[focal, ppx, ppy]`; the order is part of the contract.
    fn params(&self) -> DVector<f64> {
        DVector::from_vec(vec![self.k[(0, 0)], self.k[(0, 2)], self.k[(1, 2)]])
    }

    fn param_count(&self) -> usize {
        3
    }

    fn update_from_params(&mut self, params: &[f64]) -> Result<(), CameraModelError> {
        if params.len() != 3 {
            return Err(CameraModelError::ParamCountMismatch {
                expected: 3,
                received: params.len(),
            });
        }
        // Wholesale replacement keeps the K/Kinv invariant atomic.
        *self = Self::new(self.width, self.height, params[0], params[1], params[2]);
        Ok(())
    }

    fn jacobian_point(&self, p_cam: &Vector3<f64>) -> SMatrix<f64, 2, 3> {
        let f = self.focal();
        let inv_z = 1.0 / p_cam.z;
        let x_norm = p_cam.x * inv_z;
        let y_norm = p_cam.y * inv_z;

        // Jacobian ∂(u,v)/∂(x,y,z) for u = f·x/z + px, v = f·y/z + py
        SMatrix::<f64, 2, 3>::new(
            f * inv_z,
            0.0,
            -f * x_norm * inv_z,
            0.0,
            f * inv_z,
            -f * y_norm * inv_z,
        )
    }

    fn jacobian_params(&self, p_cam: &Vector3<f64>) -> Matrix2xX<f64> {
        let inv_z = 1.0 / p_cam.z;
        let x_norm = p_cam.x * inv_z;
        let y_norm = p_cam.y * inv_z;

        // Jacobian ∂(u,v)/∂(f, px, py)
        Matrix2xX::from_columns(&[
            Vector2::new(x_norm, y_norm),
            Vector2::new(1.0, 0.0),
            Vector2::new(0.0, 1.0),
        ])
    }

    fn config(&self) -> IntrinsicConfig {
        IntrinsicConfig::Pinhole {
            width: self.width,
            height: self.height,
            focal_length: self.focal(),
            principal_point: [self.k[(0, 2)], self.k[(1, 2)]],
        }
    }
}
