//! Single-mesh scene: background, lights and at most one displayed model.

use crate::color::Color;
use crate::geometry::{BoundingBox, Mesh};
use crate::lighting::{Light, PhongMaterial};

/// A model placed in the scene, already centered on the origin
#[derive(Debug, Clone)]
pub struct SceneMesh {
    pub mesh: Mesh,
    pub material: PhongMaterial,
    pub bounds: BoundingBox,
}

#[derive(Debug, Clone)]
pub struct Scene {
    pub background: Color,
    pub lights: Vec<Light>,
    mesh: Option<SceneMesh>,
}

impl Scene {
    pub fn new(background: Color) -> Self {
        Self {
            background,
            lights: Vec::new(),
            mesh: None,
        }
    }

    pub fn add_light(&mut self, light: Light) {
        self.lights.push(light);
    }

    pub fn set_mesh(&mut self, mesh: SceneMesh) {
        self.mesh = Some(mesh);
    }

    pub fn mesh(&self) -> Option<&SceneMesh> {
        self.mesh.as_ref()
    }

    pub fn has_mesh(&self) -> bool {
        self.mesh.is_some()
    }

    /// Remove every light and the mesh.
    pub fn clear(&mut self) {
        self.lights.clear();
        self.mesh = None;
    }

    pub fn is_empty(&self) -> bool {
        self.lights.is_empty() && self.mesh.is_none()
    }
}
