//! Serializable camera intrinsic parameters.
//!
//! Calibration state is persisted as a small JSON document with an explicit
//! schema: a `type` discriminant naming the variant plus that variant's named
//! fields. The discriminant string and the field names are part of the
//! on-disk format — existing archives must stay readable, so neither may
//! change.
//!
//! ## Format
//!
//! ```json
//! {
//!   "type": "pinhole",
//!   "width": 1920,
//!   "height": 1080,
//!   "focal_length": 1500.5,
//!   "principal_point": [960.0, 540.0]
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::{CameraIntrinsic, CameraModelError, PinholeIntrinsic};

/// Errors that can occur while saving or loading calibration files.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] serde_json::Error),

    #[error("Invalid camera parameters: {0}")]
    Model(#[from] CameraModelError),
}

/// Serializable parameter record, one variant per camera model kind.
///
/// Deserializing dispatches on the `type` tag, so a polymorphic loader can
/// reconstruct the right variant without out-of-band information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IntrinsicConfig {
    /// Single-focal pinhole without distortion.
    Pinhole {
        width: u32,
        height: u32,
        focal_length: f64,
        principal_point: [f64; 2],
    },
}

impl IntrinsicConfig {
    /// Reconstructs the concrete camera model described by this record.
    ///
    /// Validation happens here rather than in the model constructors: a load
    /// either yields a fully usable model or fails, it never produces a
    /// partially-initialized one.
    ///
    /// # Errors
    ///
    /// [`CameraModelError::InvalidFocalLength`] for a zero or non-finite
    /// focal length, [`CameraModelError::PrincipalPointMustBeFinite`] for a
    /// non-finite principal point.
    pub fn build(&self) -> Result<Box<dyn CameraIntrinsic>, CameraModelError> {
        match *self {
            IntrinsicConfig::Pinhole {
                width,
                height,
                focal_length,
                principal_point,
            } => {
                if focal_length == 0.0 || !focal_length.is_finite() {
                    return Err(CameraModelError::InvalidFocalLength);
                }
                if !principal_point[0].is_finite() || !principal_point[1].is_finite() {
                    return Err(CameraModelError::PrincipalPointMustBeFinite);
                }
                Ok(Box::new(PinholeIntrinsic::new(
                    width,
                    height,
                    focal_length,
                    principal_point[0],
                    principal_point[1],
                )))
            }
        }
    }
}

/// Saves a camera model's calibration state as a JSON file.
pub fn save_intrinsic(path: impl AsRef<Path>, model: &dyn CameraIntrinsic) -> Result<(), ConfigError> {
    let json = serde_json::to_string_pretty(&model.config())?;
    fs::write(path.as_ref(), json)?;
    debug!(
        "Saved {} intrinsic to {}",
        model.kind().name(),
        path.as_ref().display()
    );
    Ok(())
}

/// Loads a camera model from a JSON calibration file.
///
/// # Errors
///
/// Missing or malformed fields, an unknown `type` discriminant, and invalid
/// parameter values all propagate as [`ConfigError`]; the failure is local to
/// this one record.
pub fn load_intrinsic(path: impl AsRef<Path>) -> Result<Box<dyn CameraIntrinsic>, ConfigError> {
    let contents = fs::read_to_string(path.as_ref())?;
    let config: IntrinsicConfig = serde_json::from_str(&contents)?;
    let model = config.build()?;
    debug!(
        "Loaded {} intrinsic from {}",
        model.kind().name(),
        path.as_ref().display()
    );
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IntrinsicKind;

    #[test]
    fn test_config_serializes_with_stable_schema() {
        let cam = PinholeIntrinsic::new(1920, 1080, 1500.5, 960.0, 540.0);
        let json = serde_json::to_value(cam.config()).unwrap();

        assert_eq!(json["type"], "pinhole");
        assert_eq!(json["width"], 1920);
        assert_eq!(json["height"], 1080);
        assert_eq!(json["focal_length"], 1500.5);
        assert_eq!(json["principal_point"][0], 960.0);
        assert_eq!(json["principal_point"][1], 540.0);
    }

    #[test]
    fn test_build_reconstructs_pinhole() {
        let config: IntrinsicConfig = serde_json::from_str(
            r#"{
                "type": "pinhole",
                "width": 800,
                "height": 600,
                "focal_length": 1000.0,
                "principal_point": [400.0, 300.0]
            }"#,
        )
        .unwrap();

        let model = config.build().unwrap();
        assert_eq!(model.kind(), IntrinsicKind::Pinhole);
        assert_eq!(model.width(), 800);
        assert_eq!(model.height(), 600);
        assert_eq!(
            model.params(),
            nalgebra::DVector::from_vec(vec![1000.0, 400.0, 300.0])
        );
    }

    #[test]
    fn test_unknown_discriminant_is_rejected() {
        let result: Result<IntrinsicConfig, _> = serde_json::from_str(
            r#"{"type": "spherical", "width": 10, "height": 10}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_field_is_rejected() {
        let result: Result<IntrinsicConfig, _> = serde_json::from_str(
            r#"{"type": "pinhole", "width": 800, "height": 600, "focal_length": 1000.0}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_focal_length_fails_to_build() {
        let config = IntrinsicConfig::Pinhole {
            width: 800,
            height: 600,
            focal_length: 0.0,
            principal_point: [400.0, 300.0],
        };
        assert_eq!(
            config.build().unwrap_err(),
            CameraModelError::InvalidFocalLength
        );
    }

    #[test]
    fn test_non_finite_principal_point_fails_to_build() {
        let config = IntrinsicConfig::Pinhole {
            width: 800,
            height: 600,
            focal_length: 1000.0,
            principal_point: [f64::NAN, 300.0],
        };
        assert_eq!(
            config.build().unwrap_err(),
            CameraModelError::PrincipalPointMustBeFinite
        );
    }
}
