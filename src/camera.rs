//! The orthographic scene camera and its mouse controls.

use glam::{Mat4, Vec3};
use winit::event::MouseButton;

use crate::input::Input;

/// Depth range of the orthographic projection, in view units.
pub const NEAR: f32 = -300.0;
pub const FAR: f32 = 300.0;

pub const MIN_ZOOM: f32 = 0.1;

/// The single scene camera.
///
/// `rotation` holds pitch (X), yaw (Y) and roll (Z) in radians. `zoom` is the
/// half height of the visible area; the half width is `zoom * aspect`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub rotation: Vec3,
    pub zoom: f32,
    pub view: Mat4,
    pub projection: Mat4,
}

impl Default for Camera {
    fn default() -> Self {
        let mut camera = Self {
            position: Vec3::ZERO,
            rotation: Vec3::new((-45f32).to_radians(), 0.0, (-90f32).to_radians()),
            zoom: 3.0,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
        };
        camera.update_matrices(1.0);
        camera
    }
}

impl Camera {
    /// Rotates by roll, then pitch, then yaw, then translates.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_translation(self.position)
            * Mat4::from_rotation_y(self.rotation.y)
            * Mat4::from_rotation_x(self.rotation.x)
            * Mat4::from_rotation_z(self.rotation.z)
    }

    /// Orthographic box `zoom` high, `zoom * aspect` wide and 600 deep.
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        let half_width = self.zoom * aspect;
        Mat4::orthographic_rh(-half_width, half_width, -self.zoom, self.zoom, NEAR, FAR)
    }

    /// Refreshes the cached view and projection. Call after moving the
    /// camera or when the aspect ratio changes.
    pub fn update_matrices(&mut self, aspect: f32) {
        self.view = self.view_matrix();
        self.projection = self.projection_matrix(aspect);
    }

    /// `projection * view` from the cached matrices.
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }
}

/// Wheel zooms, left drag pans, right drag rotates.
#[derive(Debug, Default)]
pub struct CameraController;

impl CameraController {
    pub fn new() -> Self {
        Self
    }

    /// Applies this frame's wheel and drag input, then refreshes the camera's
    /// matrices.
    pub fn update(&mut self, camera: &mut Camera, input: &Input, aspect: f32) {
        let wheel = input.wheel();
        if wheel != 0.0 {
            camera.zoom = (camera.zoom - 0.1 * wheel).max(MIN_ZOOM);
        }

        let delta = input.mouse_delta();
        if input.mouse_down(MouseButton::Left) {
            camera.position += Vec3::new(delta.x / 100.0 / aspect, -delta.y / 100.0 / aspect, 0.0);
        }
        if input.mouse_down(MouseButton::Right) {
            camera.rotation += Vec3::new(-delta.y / 1000.0, 0.0, -delta.x / 1000.0);
        }

        camera.update_matrices(aspect);
    }
}
