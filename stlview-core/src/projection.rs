/// Perspective camera used by the viewer
use nalgebra::{Matrix4, Point3, Vector3, Vector4};

/// Vertical field of view of the viewer camera, in degrees
pub const DEFAULT_FOV: f32 = 75.0;
pub const DEFAULT_NEAR: f32 = 0.1;
pub const DEFAULT_FAR: f32 = 1000.0;
/// Distance along +Z before a model has been framed
pub const INITIAL_DISTANCE: f32 = 5.0;

/// A point after projection into a surface of known size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
    /// Normalized device depth, -1 at the near plane and 1 at the far plane
    pub depth: f32,
}

#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    /// Vertical field of view in degrees
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    projection: Matrix4<f32>,
}

impl Camera {
    pub fn perspective(fov: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut camera = Self {
            position: Point3::origin(),
            target: Point3::origin(),
            up: Vector3::y(),
            fov,
            aspect,
            near,
            far,
            projection: Matrix4::identity(),
        };
        camera.update_projection_matrix();
        camera
    }

    /// Camera for a `width`×`height` viewport, five units back along +Z.
    pub fn new(width: u32, height: u32) -> Self {
        let aspect = width as f32 / height.max(1) as f32;
        let mut camera = Self::perspective(DEFAULT_FOV, aspect, DEFAULT_NEAR, DEFAULT_FAR);
        camera.position.z = INITIAL_DISTANCE;
        camera
    }

    pub fn fov_radians(&self) -> f32 {
        self.fov.to_radians()
    }

    /// Recompute the cached projection after changing fov, aspect or planes.
    pub fn update_projection_matrix(&mut self) {
        self.projection = Matrix4::new_perspective(self.aspect, self.fov_radians(), self.near, self.far);
    }

    pub fn projection_matrix(&self) -> &Matrix4<f32> {
        &self.projection
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(&self.position, &self.target, &self.up)
    }

    pub fn view_projection(&self) -> Matrix4<f32> {
        self.projection * self.view_matrix()
    }

    /// Project a world-space point through `view_projection` into pixel space.
    ///
    /// Returns `None` for points at or behind the camera plane.
    pub fn project(
        view_projection: &Matrix4<f32>,
        point: &Point3<f32>,
        width: u32,
        height: u32,
    ) -> Option<ScreenPoint> {
        let clip: Vector4<f32> = view_projection * point.to_homogeneous();

        // Prevent division by near-zero depth values
        if clip.w < 1e-6 {
            return None;
        }

        let ndc_x = clip.x / clip.w;
        let ndc_y = clip.y / clip.w;

        Some(ScreenPoint {
            x: (ndc_x + 1.0) * 0.5 * width as f32,
            y: (1.0 - ndc_y) * 0.5 * height as f32,
            depth: clip.z / clip.w,
        })
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_WIDTH, crate::config::DEFAULT_HEIGHT)
    }
}
