//! Camera utilities

use glam::{Mat3, Mat4, Vec3};

pub const NEAR_PLANE: f32 = 0.1;
pub const FAR_PLANE: f32 = 100.0;

/// Camera state consumed by the renderer. Never mutated by it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// World to view transform
    pub view: Mat4,
    /// Vertical field of view in degrees
    pub fov_y_degrees: f32,
    /// Camera position in world space
    pub position: Vec3,
}

impl Camera {
    pub fn new(view: Mat4, fov_y_degrees: f32, position: Vec3) -> Self {
        Self {
            view,
            fov_y_degrees,
            position,
        }
    }

    /// Camera at `position` looking at `target`
    pub fn look_at(position: Vec3, target: Vec3, fov_y_degrees: f32) -> Self {
        Self::new(Mat4::look_at_rh(position, target, Vec3::Y), fov_y_degrees, position)
    }

    pub fn projection(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov_y_degrees.to_radians(), aspect, NEAR_PLANE, FAR_PLANE)
    }

    /// View transform with its translation removed, for the skybox
    pub fn view_rotation(&self) -> Mat4 {
        Mat4::from_mat3(Mat3::from_mat4(self.view))
    }
}

/// Camera block shared by every pass (group 0, binding 0)
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view: Mat4,
    pub projection: Mat4,
    pub inv_view: Mat4,
    pub view_rotation: Mat4,
    pub model: Mat4,
    /// Inverse transpose of `view * model`, for view-space normals
    pub normal_matrix: Mat4,
    pub position: [f32; 4],
    /// width, height, 1/width, 1/height
    pub viewport: [f32; 4],
}

impl CameraUniform {
    pub fn new(camera: &Camera, model: Mat4, width: u32, height: u32) -> Self {
        let (w, h) = (width as f32, height as f32);
        let model_view = camera.view * model;
        let normal_matrix = Mat4::from_mat3(Mat3::from_mat4(model_view).inverse().transpose());
        Self {
            view: camera.view,
            projection: camera.projection(w / h),
            inv_view: camera.view.inverse(),
            view_rotation: camera.view_rotation(),
            model,
            normal_matrix,
            position: camera.position.extend(1.0).to_array(),
            viewport: [w, h, 1.0 / w, 1.0 / h],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_rotation_strips_translation() {
        let camera = Camera::look_at(Vec3::new(3.0, 2.0, 10.0), Vec3::ZERO, 45.0);
        let rot = camera.view_rotation();
        assert_eq!(rot.w_axis, glam::Vec4::W);
        let p = rot.transform_point3(Vec3::ZERO);
        assert!(p.length() < 1e-6);
    }

    #[test]
    fn uniform_layout_is_packed() {
        assert_eq!(std::mem::size_of::<CameraUniform>(), 6 * 64 + 32);
    }
}
