//! View, projection and model transforms on top of `glam`.
//!
//! All matrices are right-handed with a `[0, 1]` clip depth range, matching
//! wgpu. Member-style composition follows the usual convention of
//! post-multiplying: `floor_model_view(view)` is `view * rotate_x(-90°)`.

use std::f32::consts::FRAC_PI_2;

use glam::{Mat4, Vec3, Vec4};

use crate::config::Camera;

pub fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
    Mat4::look_at_rh(eye, target, up)
}

pub fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    Mat4::perspective_rh(fov_y, aspect, near, far)
}

pub fn camera_view(camera: &Camera) -> Mat4 {
    look_at(camera.eye, camera.target, camera.up)
}

pub fn camera_projection(camera: &Camera, aspect: f32) -> Mat4 {
    perspective(camera.fov_y, aspect, camera.near, camera.far)
}

/// View of the scene reflected in the `y = 0` plane. The negative scale flips
/// triangle winding, so anything drawn with it must cull front faces.
pub fn mirror_view(view: Mat4) -> Mat4 {
    view * Mat4::from_scale(Vec3::new(1.0, -1.0, 1.0))
}

/// Orients the XY floor quad into the ground plane, facing +Y.
pub fn floor_model_view(view: Mat4) -> Mat4 {
    view * Mat4::from_rotation_x(-FRAC_PI_2)
}

/// Spin about the vertical axis applied after lifting the object to its orbit.
pub fn instance_model(angle: f32, height: f32, radius: f32) -> Mat4 {
    Mat4::from_rotation_y(angle) * Mat4::from_translation(Vec3::new(0.0, height, radius))
}

/// Homogeneous transform without perspective divide.
pub fn project(matrix: Mat4, point: Vec4) -> Vec4 {
    matrix * point
}

/// Eye-space plane for the mirror view whose positive side holds the images of
/// points at or above the floor. `dot(plane, p)` equals the world height of
/// the point reflected to `p`.
pub fn mirror_clip_plane(mirror_view: Mat4) -> Vec4 {
    mirror_view.inverse().transpose() * Vec4::Y
}

/// Plane that keeps every point with `w > 0`.
pub const PASS_THROUGH_PLANE: Vec4 = Vec4::W;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SceneConfig;

    const EPS: f32 = 1e-4;

    fn default_view() -> Mat4 {
        camera_view(&SceneConfig::default().camera)
    }

    #[test]
    fn mirror_view_reflects_heights() {
        let view = default_view();
        let mirrored = mirror_view(view);
        let above = Vec4::new(0.3, 0.7, 1.5, 1.0);
        let below = Vec4::new(0.3, -0.7, 1.5, 1.0);
        let a = project(mirrored, above);
        let b = project(view, below);
        assert!((a - b).abs().max_element() < EPS);
    }

    #[test]
    fn mirror_view_flips_handedness() {
        let view = default_view();
        assert!(view.determinant() > 0.0);
        assert!(mirror_view(view).determinant() < 0.0);
    }

    #[test]
    fn floor_quad_faces_up() {
        let rotation = Mat4::from_rotation_x(-FRAC_PI_2);
        let normal = rotation * Vec4::Z;
        assert!((normal - Vec4::Y).abs().max_element() < EPS);
        let corner = rotation * Vec4::new(2.0, 2.0, 0.0, 1.0);
        assert!(corner.y.abs() < EPS);
        assert!((corner.z + 2.0).abs() < EPS);
    }

    #[test]
    fn instance_model_orbits_vertical_axis() {
        let model = instance_model(FRAC_PI_2, 0.5, 1.5);
        let origin = model * Vec4::W;
        assert!((origin - Vec4::new(1.5, 0.5, 0.0, 1.0)).abs().max_element() < EPS);
    }

    #[test]
    fn clip_plane_measures_reflected_height() {
        let mirrored = mirror_view(default_view());
        let plane = mirror_clip_plane(mirrored);
        for height in [-0.75_f32, 0.0, 0.25, 1.0] {
            let eye = project(mirrored, Vec4::new(0.4, height, -1.2, 1.0));
            assert!((plane.dot(eye) - height).abs() < EPS);
        }
        assert_eq!(PASS_THROUGH_PLANE.dot(Vec4::new(3.0, -2.0, 9.0, 1.0)), 1.0);
    }

    #[test]
    fn projection_tracks_aspect() {
        let camera = SceneConfig::default().camera;
        let wide = camera_projection(&camera, 2.0);
        let square = camera_projection(&camera, 1.0);
        assert!((wide.x_axis.x * 2.0 - square.x_axis.x).abs() < EPS);
        assert_eq!(wide.y_axis, square.y_axis);
    }
}
