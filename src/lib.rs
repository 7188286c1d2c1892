//! Camera intrinsic models for multi-view geometry.
//!
//! This crate defines the contract a camera intrinsic model must satisfy to
//! participate in a structure-from-motion pipeline:
//!
//! - **Ray casting**: map a pixel to a unit bearing direction in camera space
//! - **Projection**: map a 3D camera-space point to a pixel
//! - **Optimization bridge**: expose the free calibration parameters as a
//!   vector a non-linear least-squares solver can perturb and write back
//! - **Persistence**: save and reload calibration state under a stable,
//!   variant-tagged schema
//!
//! # Key Components
//!
//! - **`CameraIntrinsic` trait**: the polymorphic capability set
//! - **`PinholeIntrinsic`**: the reference variant (single focal length,
//!   zero skew, no distortion)
//! - **`IntrinsicConfig`**: serializable parameter records for on-disk
//!   calibration files
//!
//! # Coordinate conventions
//!
//! 3D points handed to `project` are already expressed in the camera frame
//! (Z forward). Pixel coordinates follow the usual image convention (origin
//! at the top-left corner, u right, v down). Camera poses are
//! `nalgebra::Isometry3<f64>` mapping world points into the camera frame.

use nalgebra::{DVector, Isometry3, Matrix2xX, Matrix3x4, Matrix3xX, SMatrix, Vector2, Vector3};

/// Epsilon for numerical differentiation in Jacobian cross-checks.
pub const NUMERICAL_DERIVATIVE_EPS: f64 = 1e-7;

/// Maximum allowed difference between analytical and numerical Jacobians.
pub const JACOBIAN_TEST_TOLERANCE: f64 = 1e-5;

/// Maximum allowed pixel error in projection test assertions.
pub const PROJECTION_TEST_TOLERANCE: f64 = 1e-10;

/// Camera model errors.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CameraModelError {
    #[error("Focal length must be non-zero and finite")]
    InvalidFocalLength,
    #[error("Principal point must be finite")]
    PrincipalPointMustBeFinite,
    #[error("Expected {expected} intrinsic parameters, received {received}")]
    ParamCountMismatch { expected: usize, received: usize },
}

/// Discriminant tag identifying a concrete camera model variant.
///
/// Used for dispatch during deserialization and for branching logic in the
/// surrounding pipeline (e.g. whether observed features need undistortion
/// before triangulation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntrinsicKind {
    /// Single-focal pinhole without distortion.
    Pinhole,
}

impl IntrinsicKind {
    /// Stable name of the variant, identical to the on-disk discriminant.
    pub fn name(&self) -> &'static str {
        match self {
            IntrinsicKind::Pinhole => "pinhole",
        }
    }
}

pub mod config;
pub mod logger;
pub mod pinhole;

pub use config::{ConfigError, IntrinsicConfig, load_intrinsic, save_intrinsic};
pub use logger::{init_logger, init_logger_with_level};
pub use pinhole::PinholeIntrinsic;

/// Trait for camera intrinsic models.
///
/// Every variant maps between 3D rays in camera space and 2D pixel
/// coordinates, and exposes its free calibration parameters for non-linear
/// optimization. The trait is dyn-compatible: a reconstruction pipeline holds
/// one `Arc<dyn CameraIntrinsic>` per view, and views sharing a physical
/// camera share the same instance.
///
/// Concurrent reads of a shared instance are safe (`Send + Sync`); any call
/// to [`update_from_params`](CameraIntrinsic::update_from_params) takes
/// `&mut self` and therefore has to be serialized against readers by the
/// caller, which is exactly the single-writer discipline parallel
/// reprojection-error evaluation needs.
///
/// Projection and unprojection perform no defensive checks: a degenerate
/// calibration (zero focal length) propagates NaN and is a configuration
/// error of the caller, not a recoverable runtime condition.
pub trait CameraIntrinsic: Send + Sync + std::fmt::Debug {
    /// Discriminant tag of the concrete variant.
    fn kind(&self) -> IntrinsicKind;

    /// Width of the pixel grid this model projects onto.
    fn width(&self) -> u32;

    /// Height of the pixel grid this model projects onto.
    fn height(&self) -> u32;

    /// Projects a 3D camera-space point to 2D pixel coordinates.
    ///
    /// Total function: homogeneous division by depth, the variant's forward
    /// distortion (identity when [`has_distortion`](Self::has_distortion) is
    /// false), then the affine transform to pixel space.
    fn project(&self, p_cam: &Vector3<f64>) -> Vector2<f64> {
        let n = Vector2::new(p_cam.x / p_cam.z, p_cam.y / p_cam.z);
        if self.has_distortion() {
            self.cam_to_image(&self.add_distortion(&n))
        } else {
            self.cam_to_image(&n)
        }
    }

    /// Unprojects a pixel to a unit-length bearing direction in camera space.
    fn unproject(&self, pixel: &Vector2<f64>) -> Vector3<f64>;

    /// Transforms a camera-plane point (focal plane, already de-homogenized)
    /// to pixel space.
    fn cam_to_image(&self, p: &Vector2<f64>) -> Vector2<f64>;

    /// Transforms a pixel-space point to the camera plane.
    fn image_to_cam(&self, p: &Vector2<f64>) -> Vector2<f64>;

    /// Whether this variant models lens distortion.
    fn has_distortion(&self) -> bool;

    /// Applies the variant's forward distortion to a camera-plane point.
    ///
    /// Paired with [`remove_distortion`](Self::remove_distortion): the two
    /// are mutual inverses for a given variant, which is a consistency
    /// guarantee of that variant, not a closed-form mathematical identity.
    fn add_distortion(&self, p: &Vector2<f64>) -> Vector2<f64>;

    /// Removes the variant's distortion from a camera-plane point.
    fn remove_distortion(&self, p: &Vector2<f64>) -> Vector2<f64>;

    /// Pixel with the variant's distortion removed (image-space analogue of
    /// [`remove_distortion`](Self::remove_distortion)).
    fn undistorted_pixel(&self, p: &Vector2<f64>) -> Vector2<f64>;

    /// Pixel with the variant's distortion applied.
    fn distorted_pixel(&self, p: &Vector2<f64>) -> Vector2<f64>;

    /// Converts a pixel-space error magnitude into camera-plane units.
    ///
    /// Keeps robust-estimation thresholds comparable across cameras with
    /// different focal lengths.
    fn image_to_camera_error(&self, value: f64) -> f64;

    /// Projective matrix `K * [R | t]` for the given world-to-camera pose.
    ///
    /// Maps homogeneous 3D world points directly to homogeneous pixels.
    fn projection_matrix(&self, pose: &Isometry3<f64>) -> Matrix3x4<f64>;

    /// Free calibration parameters exposed to a non-linear solver.
    ///
    /// The ordering is part of the contract and must match
    /// [`update_from_params`](Self::update_from_params).
    fn params(&self) -> DVector<f64>;

    /// Number of free calibration parameters of this variant.
    fn param_count(&self) -> usize;

    /// Rebuilds the model wholesale from a solver-produced parameter vector.
    ///
    /// # Errors
    ///
    /// [`CameraModelError::ParamCountMismatch`] when the vector length does
    /// not match [`param_count`](Self::param_count); the prior state is left
    /// untouched. An `Err` means "parameter vector malformed", never
    /// "convergence failure".
    fn update_from_params(&mut self, params: &[f64]) -> Result<(), CameraModelError>;

    /// Jacobian of projection w.r.t. the 3D point: ∂(u,v)/∂(x,y,z).
    fn jacobian_point(&self, p_cam: &Vector3<f64>) -> SMatrix<f64, 2, 3>;

    /// Jacobian of projection w.r.t. the free calibration parameters,
    /// 2 × [`param_count`](Self::param_count), column order matching
    /// [`params`](Self::params).
    fn jacobian_params(&self, p_cam: &Vector3<f64>) -> Matrix2xX<f64>;

    /// Serializable parameter record for this model (see [`IntrinsicConfig`]).
    fn config(&self) -> IntrinsicConfig;

    /// Whether a pixel falls inside the `width × height` grid.
    ///
    /// The grid does not participate in projection math; this is a
    /// convenience predicate for visibility filtering.
    fn contains(&self, pixel: &Vector2<f64>) -> bool {
        pixel.x >= 0.0
            && pixel.x < self.width() as f64
            && pixel.y >= 0.0
            && pixel.y < self.height() as f64
    }

    /// Batch projection of multiple 3D points, column-wise.
    fn project_batch(&self, points_cam: &Matrix3xX<f64>) -> Matrix2xX<f64> {
        let n = points_cam.ncols();
        let mut result = Matrix2xX::zeros(n);
        for i in 0..n {
            let p = Vector3::new(points_cam[(0, i)], points_cam[(1, i)], points_cam[(2, i)]);
            result.set_column(i, &self.project(&p));
        }
        result
    }
}
