//! The main directional light and its keyboard controls.

use glam::{Mat3, Vec3};
use winit::keyboard::KeyCode;

use crate::input::Input;

/// Degrees per second the light turns while a rotation key is held.
pub const TURN_RATE_DEGREES: f32 = 20.0;
/// Intensity change per second while Q or E is held.
pub const INTENSITY_RATE: f32 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DirectionalLight {
    /// Direction towards the light; need not be normalised.
    pub direction: Vec3,
    pub intensity: f32,
    pub color: Vec3,
    pub ambient_threshold: f32,
    pub ambient_color: Vec3,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            direction: Vec3::new(0.5, 1.0, 1.0),
            intensity: 1.0,
            color: Vec3::ONE,
            ambient_threshold: 0.1,
            ambient_color: Vec3::new(0.9, 0.9, 1.0),
        }
    }
}

/// A/D turn the light about Z, W/S about Y, Q/E dim and brighten, R resets.
#[derive(Debug, Default)]
pub struct LightController;

impl LightController {
    pub fn new() -> Self {
        Self
    }

    /// Turns and dims `light` from held keys, scaled by `dt` seconds. R
    /// restores the defaults.
    pub fn update(&mut self, light: &mut DirectionalLight, input: &Input, dt: f32) {
        let axis = |negative: KeyCode, positive: KeyCode| -> f32 {
            input.key_down(positive) as i32 as f32 - input.key_down(negative) as i32 as f32
        };
        let around_z = axis(KeyCode::KeyA, KeyCode::KeyD);
        let around_y = axis(KeyCode::KeyW, KeyCode::KeyS);
        let brighten = axis(KeyCode::KeyQ, KeyCode::KeyE);

        let step = (TURN_RATE_DEGREES * dt).to_radians();
        let turn = Mat3::from_rotation_y(step * around_y) * Mat3::from_rotation_z(step * around_z);
        light.direction = turn * light.direction;
        light.intensity = (light.intensity + INTENSITY_RATE * dt * brighten).clamp(0.0, 1.0);

        if input.key_pressed(KeyCode::KeyR) {
            *light = DirectionalLight::default();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn holding_d_turns_about_z() {
        let mut light = DirectionalLight {
            direction: Vec3::X,
            ..DirectionalLight::default()
        };
        let mut input = Input::new();
        input.press_key(KeyCode::KeyD);

        // 4.5 s at 20 deg/s is a quarter turn
        LightController::new().update(&mut light, &input, 4.5);

        assert_abs_diff_eq!(light.direction, Vec3::Y, epsilon = 1e-5);
    }

    #[test]
    fn opposite_keys_cancel() {
        let mut light = DirectionalLight::default();
        let mut input = Input::new();
        input.press_key(KeyCode::KeyW);
        input.press_key(KeyCode::KeyS);

        LightController::new().update(&mut light, &input, 1.0);

        assert_eq!(light.direction, DirectionalLight::default().direction);
    }

    #[test]
    fn intensity_is_clamped() {
        let mut light = DirectionalLight::default();
        let mut input = Input::new();
        input.press_key(KeyCode::KeyE);
        LightController::new().update(&mut light, &input, 1.0);
        assert_eq!(light.intensity, 1.0);

        input.release_key(KeyCode::KeyE);
        input.press_key(KeyCode::KeyQ);
        LightController::new().update(&mut light, &input, 0.5);
        assert_abs_diff_eq!(light.intensity, 0.75, epsilon = 1e-6);
        LightController::new().update(&mut light, &input, 10.0);
        assert_eq!(light.intensity, 0.0);
    }

    #[test]
    fn r_restores_defaults() {
        let mut light = DirectionalLight {
            direction: Vec3::NEG_Z,
            intensity: 0.2,
            color: Vec3::X,
            ambient_threshold: 0.5,
            ambient_color: Vec3::ZERO,
        };
        let mut input = Input::new();
        input.press_key(KeyCode::KeyR);

        LightController::new().update(&mut light, &input, 0.016);

        assert_eq!(light, DirectionalLight::default());
    }
}
