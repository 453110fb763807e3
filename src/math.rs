//! Matrix helpers for renderers consuming located views.

use glam::{Mat4, Quat, Vec3};

use crate::types::{Fovf, Posef, Quaternionf, Vector3f};

/// Convert a runtime vector to glam
pub fn to_vec3(v: &Vector3f) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

/// Convert a runtime quaternion to glam
pub fn to_quat(q: &Quaternionf) -> Quat {
    Quat::from_xyzw(q.x, q.y, q.z, q.w)
}

/// OpenGL-convention projection (clip z in [-1, 1]) from the four FOV
/// half-angles. Symmetric angles give the usual perspective matrix.
pub fn projection_from_fov(fov: &Fovf, near: f32, far: f32) -> Mat4 {
    let tan_left = fov.angle_left.tan();
    let tan_right = fov.angle_right.tan();
    let tan_up = fov.angle_up.tan();
    let tan_down = fov.angle_down.tan();

    let width = tan_right - tan_left;
    let height = tan_up - tan_down;
    let depth = far - near;

    Mat4::from_cols_array(&[
        2.0 / width,
        0.0,
        0.0,
        0.0,
        0.0,
        2.0 / height,
        0.0,
        0.0,
        (tan_right + tan_left) / width,
        (tan_up + tan_down) / height,
        -(far + near) / depth,
        -1.0,
        0.0,
        0.0,
        -(2.0 * far * near) / depth,
        0.0,
    ])
}

/// View matrix for an eye: the inverse of the eye pose applied on top of the
/// caller's base transform.
pub fn eye_modelview(pose: &Posef, base: Mat4) -> Mat4 {
    let eye = Mat4::from_rotation_translation(to_quat(&pose.orientation), to_vec3(&pose.position));
    (eye * base).inverse()
}

/// Left-handed orthographic projection centred on the origin, used to blit a
/// `width` x `height` quad onto a surface of the same size.
pub fn blit_projection(width: f32, height: f32) -> Mat4 {
    Mat4::orthographic_lh(
        -width / 2.0,
        width / 2.0,
        -height / 2.0,
        height / 2.0,
        -1.0,
        1.0,
    )
}
