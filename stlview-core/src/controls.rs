//! Orbit-style camera interaction with damping.
//!
//! Input events accumulate rotation, pan and zoom deltas. Each call to
//! [`OrbitControls::update`] applies a `damping_factor` share of the pending
//! motion to the camera and decays the remainder, so motion eases out over
//! several frames.

use nalgebra::{Point3, Vector3};
use std::f32::consts::PI;

pub const DEFAULT_DAMPING: f32 = 0.25;
/// Multiplicative zoom step per wheel notch
const ZOOM_STEP: f32 = 0.95;
/// Smallest pending motion still considered moving
const EPSILON: f32 = 1e-6;
/// Polar angle margin keeping the camera off the poles
const POLE_MARGIN: f32 = 1e-4;

/// Pointer or key input, in surface pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlInput {
    Rotate { dx: f32, dy: f32 },
    Pan { dx: f32, dy: f32 },
    /// Positive values zoom out, negative zoom in
    Zoom { delta: f32 },
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct SphericalDelta {
    theta: f32,
    phi: f32,
}

#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub target: Point3<f32>,
    pub enabled: bool,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub enable_zoom: bool,
    pub enable_rotate: bool,
    pub enable_pan: bool,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pending: SphericalDelta,
    scale: f32,
    pan_offset: Vector3<f32>,
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self {
            target: Point3::origin(),
            enabled: true,
            enable_damping: true,
            damping_factor: DEFAULT_DAMPING,
            enable_zoom: true,
            enable_rotate: true,
            enable_pan: true,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            pending: SphericalDelta::default(),
            scale: 1.0,
            pan_offset: Vector3::zeros(),
        }
    }
}

impl OrbitControls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an input event.
    ///
    /// `camera` supplies the orientation and fov for panning, and
    /// `viewport_height` converts pixels to angles.
    pub fn handle_input(&mut self, input: ControlInput, camera: &crate::Camera, viewport_height: f32) {
        if !self.enabled {
            return;
        }
        let height = viewport_height.max(1.0);

        match input {
            ControlInput::Rotate { dx, dy } if self.enable_rotate => {
                self.pending.theta -= 2.0 * PI * dx / height * self.rotate_speed;
                self.pending.phi -= 2.0 * PI * dy / height * self.rotate_speed;
            }
            ControlInput::Pan { dx, dy } if self.enable_pan => {
                self.pan(dx, dy, camera, height);
            }
            ControlInput::Zoom { delta } if self.enable_zoom && delta != 0.0 => {
                let step = ZOOM_STEP.powf(self.zoom_speed);
                if delta > 0.0 {
                    self.scale /= step;
                } else {
                    self.scale *= step;
                }
            }
            _ => {}
        }
    }

    fn pan(&mut self, dx: f32, dy: f32, camera: &crate::Camera, height: f32) {
        let offset = camera.position - self.target;
        // Half-height of the view at the target distance
        let target_distance = offset.norm() * (camera.fov_radians() / 2.0).tan();

        let forward = -offset.normalize();
        let right = forward.cross(&camera.up).try_normalize(EPSILON);
        let Some(right) = right else {
            return;
        };
        let up = right.cross(&forward);

        let scale = 2.0 * target_distance / height * self.pan_speed;
        self.pan_offset += -right * dx * scale + up * dy * scale;
    }

    /// Advance one frame. Returns true when the camera moved.
    pub fn update(&mut self, camera: &mut crate::Camera) -> bool {
        let offset = camera.position - self.target;
        let mut radius = offset.norm();
        let (mut theta, mut phi) = if radius > EPSILON {
            (offset.x.atan2(offset.z), (offset.y / radius).clamp(-1.0, 1.0).acos())
        } else {
            (0.0, PI / 2.0)
        };

        let share = if self.enable_damping {
            self.damping_factor
        } else {
            1.0
        };

        theta += self.pending.theta * share;
        phi += self.pending.phi * share;
        phi = phi.clamp(POLE_MARGIN, PI - POLE_MARGIN);

        radius = (radius * self.scale).clamp(self.min_distance, self.max_distance);
        self.target += self.pan_offset * share;

        let sin_phi = phi.sin();
        let new_offset = Vector3::new(
            radius * sin_phi * theta.sin(),
            radius * phi.cos(),
            radius * sin_phi * theta.cos(),
        );

        let old_position = camera.position;
        camera.position = self.target + new_offset;
        camera.target = self.target;

        if self.enable_damping {
            let decay = 1.0 - self.damping_factor;
            self.pending.theta *= decay;
            self.pending.phi *= decay;
            self.pan_offset *= decay;
        } else {
            self.pending = SphericalDelta::default();
            self.pan_offset = Vector3::zeros();
        }
        self.scale = 1.0;

        (camera.position - old_position).norm_squared() > EPSILON * EPSILON
    }

    /// True while damped motion is still being applied
    pub fn is_moving(&self) -> bool {
        self.pending.theta.abs() > EPSILON
            || self.pending.phi.abs() > EPSILON
            || self.pan_offset.norm() > EPSILON
    }

    /// Stop reacting to input and drop any pending motion.
    pub fn dispose(&mut self) {
        self.enabled = false;
        self.pending = SphericalDelta::default();
        self.pan_offset = Vector3::zeros();
        self.scale = 1.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Camera;

    #[test]
    fn test_rest_keeps_camera_in_place() {
        let mut camera = Camera::new(400, 400);
        let mut controls = OrbitControls::new();
        let moved = controls.update(&mut camera);
        assert!(!moved);
        assert!((camera.position - Point3::new(0.0, 0.0, 5.0)).norm() < 1e-5);
    }

    #[test]
    fn test_rotation_is_damped() {
        let mut camera = Camera::new(400, 400);
        let mut controls = OrbitControls::new();
        controls.handle_input(ControlInput::Rotate { dx: -100.0, dy: 0.0 }, &camera, 400.0);

        // Full rotation would be 2*PI*100/400 = PI/2; first frame applies a quarter
        controls.update(&mut camera);
        let theta = camera.position.x.atan2(camera.position.z);
        assert!((theta - PI / 8.0).abs() < 1e-4);
        assert!(controls.is_moving());

        for _ in 0..200 {
            controls.update(&mut camera);
        }
        let theta = camera.position.x.atan2(camera.position.z);
        assert!((theta - PI / 2.0).abs() < 1e-3);
        assert!(!controls.is_moving());
        assert!(((camera.position - Point3::origin()).norm() - 5.0).abs() < 1e-4);
    }

    #[test]
    fn test_zoom_changes_distance() {
        let mut camera = Camera::new(400, 400);
        let mut controls = OrbitControls::new();
        controls.handle_input(ControlInput::Zoom { delta: -1.0 }, &camera, 400.0);
        controls.update(&mut camera);
        assert!((camera.position.z - 5.0 * 0.95).abs() < 1e-4);

        controls.handle_input(ControlInput::Zoom { delta: 1.0 }, &camera, 400.0);
        controls.update(&mut camera);
        assert!((camera.position.z - 5.0).abs() < 1e-4);
    }

    #[test]
    fn test_polar_angle_is_clamped() {
        let mut camera = Camera::new(400, 400);
        let mut controls = OrbitControls::new();
        controls.enable_damping = false;
        controls.handle_input(ControlInput::Rotate { dx: 0.0, dy: 10_000.0 }, &camera, 400.0);
        controls.update(&mut camera);
        assert!(camera.position.y > 4.99);
        assert!(camera.position.y.is_finite());
    }

    #[test]
    fn test_pan_moves_target_sideways() {
        let mut camera = Camera::new(400, 400);
        let mut controls = OrbitControls::new();
        controls.enable_damping = false;
        controls.handle_input(ControlInput::Pan { dx: 100.0, dy: 0.0 }, &camera, 400.0);
        controls.update(&mut camera);
        assert!(controls.target.x < 0.0);
        assert!(controls.target.y.abs() < 1e-5);
        assert!((camera.position.x - controls.target.x).abs() < 1e-5);
    }

    #[test]
    fn test_disposed_controls_ignore_input() {
        let mut camera = Camera::new(400, 400);
        let mut controls = OrbitControls::new();
        controls.handle_input(ControlInput::Rotate { dx: 50.0, dy: 0.0 }, &camera, 400.0);
        controls.dispose();
        controls.handle_input(ControlInput::Zoom { delta: 1.0 }, &camera, 400.0);
        assert!(!controls.is_moving());
        assert!(!controls.update(&mut camera));
    }
}
