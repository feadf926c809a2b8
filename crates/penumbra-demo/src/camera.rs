//! Fly camera driven by keyboard, mouse and scroll input

use glam::{Mat4, Quat, Vec3};
use penumbra::Camera;

const MIN_FOV: f32 = 1.0;
const MAX_FOV: f32 = 90.0;
const PITCH_LIMIT: f32 = 89.0_f32 * std::f32::consts::PI / 180.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Movement {
    Forward,
    Backward,
    Left,
    Right,
    Up,
    Down,
}

/// First-person camera; yaw about world Y, pitch about local X
#[derive(Debug, Clone)]
pub struct FlyCamera {
    pub position: Vec3,
    /// Radians, 0 looks down -Z
    pub yaw: f32,
    /// Radians, clamped to +-89 degrees
    pub pitch: f32,
    pub fov_y_degrees: f32,
    /// World units per second
    pub speed: f32,
    /// Radians per pixel of mouse motion
    pub sensitivity: f32,
}

impl Default for FlyCamera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 10.0),
            yaw: 0.0,
            pitch: 0.0,
            fov_y_degrees: 45.0,
            speed: 2.5,
            sensitivity: 0.002,
        }
    }
}

impl FlyCamera {
    pub fn orientation(&self) -> Quat {
        Quat::from_rotation_y(self.yaw) * Quat::from_rotation_x(self.pitch)
    }

    pub fn forward(&self) -> Vec3 {
        self.orientation() * Vec3::NEG_Z
    }

    pub fn right(&self) -> Vec3 {
        self.orientation() * Vec3::X
    }

    /// Move for `dt` seconds; `fast` doubles the speed
    pub fn process_movement(&mut self, movement: Movement, dt: f32, fast: bool) {
        let step = self.speed * dt * if fast { 2.0 } else { 1.0 };
        let dir = match movement {
            Movement::Forward => self.forward(),
            Movement::Backward => -self.forward(),
            Movement::Left => -self.right(),
            Movement::Right => self.right(),
            Movement::Up => Vec3::Y,
            Movement::Down => Vec3::NEG_Y,
        };
        self.position += dir * step;
    }

    pub fn process_mouse(&mut self, dx: f32, dy: f32) {
        self.yaw -= dx * self.sensitivity;
        self.pitch = (self.pitch - dy * self.sensitivity).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    /// Scrolling up narrows the field of view
    pub fn process_scroll(&mut self, dy: f32) {
        self.fov_y_degrees = (self.fov_y_degrees - dy).clamp(MIN_FOV, MAX_FOV);
    }

    pub fn camera(&self) -> Camera {
        let view = Mat4::look_to_rh(self.position, self.forward(), Vec3::Y);
        Camera::new(view, self.fov_y_degrees, self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_behind_origin_looking_at_it() {
        let cam = FlyCamera::default();
        assert!((cam.forward() - Vec3::NEG_Z).length() < 1e-6);
        let origin = cam.camera().view.transform_point3(Vec3::ZERO);
        assert!((origin - Vec3::new(0.0, 0.0, -10.0)).length() < 1e-5);
    }

    #[test]
    fn shift_doubles_the_step() {
        let mut slow = FlyCamera::default();
        let mut fast = FlyCamera::default();
        slow.process_movement(Movement::Forward, 1.0, false);
        fast.process_movement(Movement::Forward, 1.0, true);
        let start = FlyCamera::default().position;
        assert!(((fast.position - start).length() - 2.0 * (slow.position - start).length()).abs() < 1e-5);
    }

    #[test]
    fn up_and_down_follow_world_y() {
        let mut cam = FlyCamera::default();
        cam.process_mouse(300.0, -200.0);
        let start = cam.position;
        cam.process_movement(Movement::Up, 1.0, false);
        assert!((cam.position - start - Vec3::Y * cam.speed).length() < 1e-5);
        cam.process_movement(Movement::Down, 1.0, false);
        assert!((cam.position - start).length() < 1e-5);
    }

    #[test]
    fn pitch_is_clamped() {
        let mut cam = FlyCamera::default();
        cam.process_mouse(0.0, -1.0e6);
        assert!((cam.pitch - PITCH_LIMIT).abs() < 1e-6);
        cam.process_mouse(0.0, 1.0e6);
        assert!((cam.pitch + PITCH_LIMIT).abs() < 1e-6);
    }

    #[test]
    fn scroll_zoom_is_clamped() {
        let mut cam = FlyCamera::default();
        cam.process_scroll(100.0);
        assert_eq!(cam.fov_y_degrees, MIN_FOV);
        cam.process_scroll(-500.0);
        assert_eq!(cam.fov_y_degrees, MAX_FOV);
    }

    #[test]
    fn mouse_right_turns_right() {
        let mut cam = FlyCamera::default();
        cam.process_mouse(100.0, 0.0);
        assert!(cam.forward().x > 0.0);
    }
}
