use crate::utils;

/// A position + orientation sample for a tracked object, with velocities.
///
/// Units are meters and radians, right-handed, relative to the tracking
/// origin. The orientation quaternion is stored (x, y, z, w) and kept
/// normalized. Velocities are the zero vector when the sensor cannot provide
/// them.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-serialization", derive(serde::Deserialize, serde::Serialize))]
pub struct Pose {
    pub position: [f32; 3],
    pub orientation: [f32; 4],
    pub linear_velocity: [f32; 3],
    pub angular_velocity: [f32; 3],
}

impl Default for Pose {
    fn default() -> Pose {
        Pose {
            position: [0.0; 3],
            orientation: [0.0, 0.0, 0.0, 1.0],
            linear_velocity: [0.0; 3],
            angular_velocity: [0.0; 3],
        }
    }
}

impl Pose {
    /// Extracts position and orientation from a column-major rigid transform.
    /// Velocities are left at zero.
    pub fn from_matrix(m: &[f32; 16]) -> Pose {
        Pose {
            position: [m[12], m[13], m[14]],
            orientation: utils::quat_from_matrix(m),
            ..Pose::default()
        }
    }

    /// The orientation as (angle, axis). Near-identity orientations return a
    /// zero angle with a fixed axis rather than NaN.
    pub fn angle_axis(&self) -> (f32, [f32; 3]) {
        utils::quat_to_angle_axis(&self.orientation)
    }

    /// The pose as a column-major rigid transform.
    pub fn to_matrix(&self) -> [f32; 16] {
        utils::mat4_from_pose(&self.position, &self.orientation)
    }
}
