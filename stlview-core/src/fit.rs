//! Auto-framing of a loaded model.
//!
//! The camera is pulled back along +Z until a sphere of radius `maxDim / 2`
//! fills the vertical field of view, then by a further margin. Clipping
//! planes scale with the model so small parts are not clipped by the near
//! plane and large ones keep depth precision.

use crate::geometry::BoundingBox;
use crate::projection::Camera;

/// Extra distance beyond an exact fit
pub const FIT_MARGIN: f32 = 1.5;
/// Near plane as a fraction of the model's largest dimension
pub const NEAR_SCALE: f32 = 0.01;
pub const MIN_NEAR: f32 = 0.1;
/// Far plane multiplier over the camera-to-far-side distance
pub const FAR_MARGIN: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraFit {
    pub camera_z: f32,
    pub near: f32,
    pub far: f32,
}

impl CameraFit {
    /// Framing for a model whose largest extent is `max_dim`.
    pub fn for_dimension(max_dim: f32, fov_degrees: f32) -> Self {
        let half_fov = fov_degrees.to_radians() / 2.0;
        let radius = max_dim / 2.0;
        let camera_z = radius / half_fov.sin() * FIT_MARGIN;

        let near = (max_dim * NEAR_SCALE).max(MIN_NEAR);
        // Tiny models sit inside the minimum near distance; keep the
        // frustum non-empty regardless.
        let far = ((camera_z + radius) * FAR_MARGIN).max(near * FAR_MARGIN);

        Self { camera_z, near, far }
    }

    pub fn for_bounds(bounds: &BoundingBox, fov_degrees: f32) -> Self {
        Self::for_dimension(bounds.max_dimension(), fov_degrees)
    }

    /// Move the camera back to `camera_z` and apply the clipping planes.
    pub fn apply(&self, camera: &mut Camera) {
        camera.position.z = self.camera_z;
        camera.near = self.near;
        camera.far = self.far;
        camera.update_projection_matrix();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Mesh;
    use proptest::prelude::*;

    #[test]
    fn test_cube_fit() {
        let bounds = Mesh::cube(2.0).bounding_box().unwrap();
        let fit = CameraFit::for_bounds(&bounds, 75.0);

        let expected_z = 1.0 / 37.5f32.to_radians().sin() * 1.5;
        assert!((fit.camera_z - expected_z).abs() < 1e-5);
        assert!((fit.camera_z - 2.464).abs() < 1e-3);
        assert_eq!(fit.near, 0.1);
        assert!((fit.far - (expected_z + 1.0) * 2.0).abs() < 1e-5);
        assert!((fit.far - 6.928).abs() < 1e-3);
    }

    #[test]
    fn test_large_model_scales_near_plane() {
        let fit = CameraFit::for_dimension(500.0, 75.0);
        assert!((fit.near - 5.0).abs() < 1e-5);
        assert!(fit.far > fit.camera_z + 250.0);
    }

    #[test]
    fn test_apply_updates_camera() {
        let mut camera = Camera::new(400, 400);
        camera.position.x = 0.5;
        let fit = CameraFit::for_dimension(10.0, camera.fov);
        fit.apply(&mut camera);

        assert_eq!(camera.position.z, fit.camera_z);
        assert_eq!(camera.position.x, 0.5);
        assert_eq!((camera.near, camera.far), (fit.near, fit.far));
    }

    proptest! {
        #[test]
        fn near_plane_rule_and_ordering(max_dim in 1e-4f32..1e5) {
            let fit = CameraFit::for_dimension(max_dim, 75.0);
            prop_assert_eq!(fit.near, (max_dim * 0.01).max(0.1));
            prop_assert!(fit.near < fit.far);
            prop_assert!(fit.camera_z > 0.0);
        }
    }
}
