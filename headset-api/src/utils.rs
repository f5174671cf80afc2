//! Matrix and quaternion helpers shared by the drivers.
//!
//! Matrices are column-major `[f32; 16]` (element (row, col) at `m[col * 4 +
//! row]`), right-handed. Quaternions are `[x, y, z, w]`. Vendor-native
//! layouts (row-major 3x4 and 4x4) are converted here, at the driver
//! boundary, and nowhere else.

pub const MAT4_IDENTITY: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

pub const QUAT_IDENTITY: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

pub fn mat4_multiply(a: &[f32; 16], b: &[f32; 16]) -> [f32; 16] {
    let mut out = [0.0; 16];
    for col in 0..4 {
        for row in 0..4 {
            let mut sum = 0.0;
            for k in 0..4 {
                sum += a[k * 4 + row] * b[col * 4 + k];
            }
            out[col * 4 + row] = sum;
        }
    }
    out
}

pub fn mat4_translation(x: f32, y: f32, z: f32) -> [f32; 16] {
    let mut out = MAT4_IDENTITY;
    out[12] = x;
    out[13] = y;
    out[14] = z;
    out
}

/// Builds a rigid transform from a position and a unit quaternion.
pub fn mat4_from_pose(position: &[f32; 3], orientation: &[f32; 4]) -> [f32; 16] {
    let [x, y, z, w] = *orientation;
    [
        1.0 - 2.0 * (y * y + z * z),
        2.0 * (x * y + z * w),
        2.0 * (x * z - y * w),
        0.0,
        2.0 * (x * y - z * w),
        1.0 - 2.0 * (x * x + z * z),
        2.0 * (y * z + x * w),
        0.0,
        2.0 * (x * z + y * w),
        2.0 * (y * z - x * w),
        1.0 - 2.0 * (x * x + y * y),
        0.0,
        position[0],
        position[1],
        position[2],
        1.0,
    ]
}

/// Converts a vendor row-major 3x4 transform (rows of [R | t]) to engine
/// layout.
pub fn mat4_from_rm34(v: &[[f32; 4]; 3]) -> [f32; 16] {
    [
        v[0][0], v[1][0], v[2][0], 0.0, //
        v[0][1], v[1][1], v[2][1], 0.0, //
        v[0][2], v[1][2], v[2][2], 0.0, //
        v[0][3], v[1][3], v[2][3], 1.0,
    ]
}

/// Converts a vendor row-major 4x4 matrix to engine layout.
pub fn mat4_from_rm44(v: &[[f32; 4]; 4]) -> [f32; 16] {
    let mut out = [0.0; 16];
    for row in 0..4 {
        for col in 0..4 {
            out[col * 4 + row] = v[row][col];
        }
    }
    out
}

/// Inverts a rigid transform (rotation + translation only).
pub fn mat4_invert_pose(m: &[f32; 16]) -> [f32; 16] {
    let t = [m[12], m[13], m[14]];
    [
        m[0],
        m[4],
        m[8],
        0.0,
        m[1],
        m[5],
        m[9],
        0.0,
        m[2],
        m[6],
        m[10],
        0.0,
        -(m[0] * t[0] + m[1] * t[1] + m[2] * t[2]),
        -(m[4] * t[0] + m[5] * t[1] + m[6] * t[2]),
        -(m[8] * t[0] + m[9] * t[1] + m[10] * t[2]),
        1.0,
    ]
}

pub fn mat4_transform_point(m: &[f32; 16], p: &[f32; 3]) -> [f32; 3] {
    [
        m[0] * p[0] + m[4] * p[1] + m[8] * p[2] + m[12],
        m[1] * p[0] + m[5] * p[1] + m[9] * p[2] + m[13],
        m[2] * p[0] + m[6] * p[1] + m[10] * p[2] + m[14],
    ]
}

/// Rotates a direction vector (no translation).
pub fn mat4_transform_direction(m: &[f32; 16], v: &[f32; 3]) -> [f32; 3] {
    [
        m[0] * v[0] + m[4] * v[1] + m[8] * v[2],
        m[1] * v[0] + m[5] * v[1] + m[9] * v[2],
        m[2] * v[0] + m[6] * v[1] + m[10] * v[2],
    ]
}

/// Symmetric perspective projection (vertical fov in radians).
pub fn mat4_perspective(near: f32, far: f32, fovy: f32, aspect: f32) -> [f32; 16] {
    let f = 1.0 / (fovy / 2.0).tan();
    let nf = 1.0 / (near - far);
    let mut out = [0.0; 16];
    out[0] = f / aspect;
    out[5] = f;
    out[10] = (far + near) * nf;
    out[11] = -1.0;
    out[14] = 2.0 * far * near * nf;
    out
}

/// Asymmetric projection from per-side half-angle tangents, as reported by VR
/// runtimes. All four tangents are positive.
pub fn mat4_fov_projection(
    tan_up: f32,
    tan_down: f32,
    tan_left: f32,
    tan_right: f32,
    near: f32,
    far: f32,
) -> [f32; 16] {
    let width = tan_left + tan_right;
    let height = tan_up + tan_down;
    let mut out = [0.0; 16];
    out[0] = 2.0 / width;
    out[5] = 2.0 / height;
    out[8] = (tan_right - tan_left) / width;
    out[9] = (tan_up - tan_down) / height;
    out[10] = -(far + near) / (far - near);
    out[11] = -1.0;
    out[14] = -(2.0 * far * near) / (far - near);
    out
}

pub fn quat_normalize(q: &[f32; 4]) -> [f32; 4] {
    let len = (q[0] * q[0] + q[1] * q[1] + q[2] * q[2] + q[3] * q[3]).sqrt();
    if len < 1e-9 {
        return QUAT_IDENTITY;
    }
    [q[0] / len, q[1] / len, q[2] / len, q[3] / len]
}

pub fn quat_multiply(a: &[f32; 4], b: &[f32; 4]) -> [f32; 4] {
    [
        a[3] * b[0] + a[0] * b[3] + a[1] * b[2] - a[2] * b[1],
        a[3] * b[1] - a[0] * b[2] + a[1] * b[3] + a[2] * b[0],
        a[3] * b[2] + a[0] * b[1] - a[1] * b[0] + a[2] * b[3],
        a[3] * b[3] - a[0] * b[0] - a[1] * b[1] - a[2] * b[2],
    ]
}

pub fn quat_from_angle_axis(angle: f32, axis: &[f32; 3]) -> [f32; 4] {
    let len = (axis[0] * axis[0] + axis[1] * axis[1] + axis[2] * axis[2]).sqrt();
    if len < 1e-9 {
        return QUAT_IDENTITY;
    }
    let s = (angle / 2.0).sin() / len;
    [axis[0] * s, axis[1] * s, axis[2] * s, (angle / 2.0).cos()]
}

/// Extracts (angle, axis) from a quaternion. The near-identity case returns a
/// zero angle with the forward axis instead of dividing by ~0.
pub fn quat_to_angle_axis(q: &[f32; 4]) -> (f32, [f32; 3]) {
    let mut q = quat_normalize(q);
    if q[3] < 0.0 {
        // Canonicalize so the angle lands in [0, pi].
        for c in q.iter_mut() {
            *c = -*c;
        }
    }
    let s = (q[0] * q[0] + q[1] * q[1] + q[2] * q[2]).sqrt();
    if s < 1e-6 {
        return (0.0, [0.0, 0.0, -1.0]);
    }
    let angle = 2.0 * s.atan2(q[3]);
    (angle, [q[0] / s, q[1] / s, q[2] / s])
}

/// Extracts the rotation of a column-major rigid transform as a quaternion.
pub fn quat_from_matrix(m: &[f32; 16]) -> [f32; 4] {
    let w = (0.0f32.max(1.0 + m[0] + m[5] + m[10])).sqrt() / 2.0;
    let x = (0.0f32.max(1.0 + m[0] - m[5] - m[10])).sqrt() / 2.0;
    let y = (0.0f32.max(1.0 - m[0] + m[5] - m[10])).sqrt() / 2.0;
    let z = (0.0f32.max(1.0 - m[0] - m[5] + m[10])).sqrt() / 2.0;
    quat_normalize(&[
        copysign(x, m[6] - m[9]),
        copysign(y, m[8] - m[2]),
        copysign(z, m[1] - m[4]),
        w,
    ])
}

fn copysign(a: f32, b: f32) -> f32 {
    if b == 0.0 {
        0.0
    } else {
        a.abs() * b.signum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_near(a: f32, b: f32, tolerance: f32) {
        assert!((a - b).abs() <= tolerance, "{} !~ {}", a, b);
    }

    fn assert_quat_near(a: &[f32; 4], b: &[f32; 4]) {
        // q and -q are the same rotation; compare against the closer sign.
        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let flip = if dot < 0.0 { -1.0 } else { 1.0 };
        for i in 0..4 {
            assert_near(a[i], flip * b[i], 1e-5);
        }
    }

    #[test]
    fn angle_axis_round_trip() {
        let cases: [[f32; 4]; 5] = [
            QUAT_IDENTITY,
            quat_from_angle_axis(std::f32::consts::PI, &[0.0, 1.0, 0.0]),
            quat_from_angle_axis(0.3, &[1.0, 0.0, 0.0]),
            quat_from_angle_axis(2.9, &[0.5, -0.5, 0.7]),
            quat_normalize(&[-0.2, 0.4, 0.1, -0.8]),
        ];
        for q in &cases {
            let (angle, axis) = quat_to_angle_axis(q);
            let back = quat_from_angle_axis(angle, &axis);
            assert_quat_near(q, &back);
        }
    }

    #[test]
    fn angle_axis_identity_is_degenerate_but_finite() {
        let (angle, axis) = quat_to_angle_axis(&QUAT_IDENTITY);
        assert_eq!(angle, 0.0);
        assert!(axis.iter().all(|c| c.is_finite()));
    }

    #[test]
    fn matrix_quat_round_trip() {
        let q = quat_normalize(&[0.3, -0.1, 0.6, 0.72]);
        let m = mat4_from_pose(&[1.0, 2.0, 3.0], &q);
        assert_quat_near(&q, &quat_from_matrix(&m));
        assert_eq!([m[12], m[13], m[14]], [1.0, 2.0, 3.0]);
    }

    #[test]
    fn invert_pose_is_the_inverse() {
        let q = quat_from_angle_axis(1.2, &[0.0, 1.0, 0.0]);
        let m = mat4_from_pose(&[0.5, 1.7, -2.0], &q);
        let product = mat4_multiply(&m, &mat4_invert_pose(&m));
        for (i, value) in product.iter().enumerate() {
            assert_near(*value, MAT4_IDENTITY[i], 1e-5);
        }
    }

    #[test]
    fn rm34_conversion_keeps_rotation_and_translation() {
        // 90 degrees around y plus a translation, in vendor row-major rows.
        let vendor = [
            [0.0, 0.0, 1.0, 4.0],
            [0.0, 1.0, 0.0, 5.0],
            [-1.0, 0.0, 0.0, 6.0],
        ];
        let m = mat4_from_rm34(&vendor);
        assert_eq!([m[12], m[13], m[14]], [4.0, 5.0, 6.0]);
        let p = mat4_transform_point(&m, &[1.0, 0.0, 0.0]);
        assert_near(p[0], 4.0, 1e-6);
        assert_near(p[1], 5.0, 1e-6);
        assert_near(p[2], 5.0, 1e-6);
    }

    #[test]
    fn fov_projection_matches_symmetric_perspective() {
        let fovy = 67.0f32.to_radians();
        let aspect = 1.5;
        let tan_v = (fovy / 2.0).tan();
        let tan_h = tan_v * aspect;
        let symmetric = mat4_perspective(0.1, 100.0, fovy, aspect);
        let fov = mat4_fov_projection(tan_v, tan_v, tan_h, tan_h, 0.1, 100.0);
        for i in 0..16 {
            assert_near(symmetric[i], fov[i], 1e-5);
        }
    }

    #[test]
    fn transform_direction_ignores_translation() {
        let m = mat4_translation(10.0, 20.0, 30.0);
        assert_eq!(mat4_transform_direction(&m, &[0.0, 0.0, -1.0]), [0.0, 0.0, -1.0]);
    }
}
