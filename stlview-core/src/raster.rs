/// Software rasterizer shared by the terminal and browser surfaces
use nalgebra::{Matrix4, Vector3};

use crate::color::Color;
use crate::geometry::Triangle;
use crate::lighting::PhongMaterial;
use crate::projection::{Camera, ScreenPoint};
use crate::scene::Scene;

/// Color and depth buffers in device pixels
#[derive(Debug, Clone)]
pub struct Framebuffer {
    width: u32,
    height: u32,
    color: Vec<Color>,
    depth: Vec<f32>,
}

impl Framebuffer {
    pub fn new(width: u32, height: u32) -> Self {
        let size = width as usize * height as usize;
        Self {
            width,
            height,
            color: vec![Color::BLACK; size],
            depth: vec![f32::INFINITY; size],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn clear(&mut self, background: Color) {
        self.color.fill(background);
        self.depth.fill(f32::INFINITY);
    }

    pub fn pixel(&self, x: u32, y: u32) -> Color {
        self.color[self.index(x, y)]
    }

    /// True when a mesh fragment was written at this pixel
    pub fn is_covered(&self, x: u32, y: u32) -> bool {
        self.depth[self.index(x, y)].is_finite()
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Row-major RGBA bytes, alpha always opaque.
    pub fn write_rgba8(&self, out: &mut Vec<u8>) {
        out.clear();
        out.reserve(self.color.len() * 4);
        for c in &self.color {
            let [r, g, b] = c.to_rgb8();
            out.extend_from_slice(&[r, g, b, 255]);
        }
    }
}

/// Draw `scene` as seen by `camera` into `framebuffer`.
pub fn render(framebuffer: &mut Framebuffer, scene: &Scene, camera: &Camera) {
    framebuffer.clear(scene.background);

    let Some(model) = scene.mesh() else {
        return;
    };

    let view_projection = camera.view_projection();
    for triangle in &model.mesh.triangles {
        render_triangle(
            framebuffer,
            triangle,
            &view_projection,
            camera,
            &model.material,
            scene,
        );
    }
}

fn render_triangle(
    framebuffer: &mut Framebuffer,
    triangle: &Triangle,
    view_projection: &Matrix4<f32>,
    camera: &Camera,
    material: &PhongMaterial,
    scene: &Scene,
) {
    let (width, height) = (framebuffer.width, framebuffer.height);
    let mut screen = [ScreenPoint {
        x: 0.0,
        y: 0.0,
        depth: 0.0,
    }; 3];
    for (slot, vertex) in screen.iter_mut().zip(&triangle.vertices) {
        match Camera::project(view_projection, &vertex.position, width, height) {
            Some(point) => *slot = point,
            None => return, // Triangle crosses the camera plane
        }
    }

    let mut normal = triangle.calculate_normal();
    if normal == Vector3::zeros() {
        normal = triangle.vertices[0]
            .normal
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(Vector3::zeros);
    }
    let Some(view_dir) = (camera.position - triangle.centroid()).try_normalize(f32::EPSILON) else {
        return;
    };
    // Shade both sides; STL winding is unreliable
    if normal.dot(&view_dir) < 0.0 {
        normal = -normal;
    }

    let shade = material.shade(&scene.lights, &normal, &view_dir);
    rasterize_triangle(framebuffer, &screen, shade);
}

fn rasterize_triangle(framebuffer: &mut Framebuffer, coords: &[ScreenPoint; 3], color: Color) {
    let [v0, v1, v2] = *coords;

    // Bounding box
    let min_x = v0.x.min(v1.x).min(v2.x).floor() as i64;
    let max_x = v0.x.max(v1.x).max(v2.x).ceil() as i64;
    let min_y = v0.y.min(v1.y).min(v2.y).floor() as i64;
    let max_y = v0.y.max(v1.y).max(v2.y).ceil() as i64;

    // Clip to screen bounds
    let min_x = min_x.max(0);
    let max_x = max_x.min(framebuffer.width as i64 - 1);
    let min_y = min_y.max(0);
    let max_y = max_y.min(framebuffer.height as i64 - 1);

    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let px = x as f32 + 0.5;
            let py = y as f32 + 0.5;

            let Some((w0, w1, w2)) = barycentric((v0.x, v0.y), (v1.x, v1.y), (v2.x, v2.y), (px, py))
            else {
                continue;
            };
            if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                continue;
            }

            let depth = w0 * v0.depth + w1 * v1.depth + w2 * v2.depth;
            if !(-1.0..=1.0).contains(&depth) {
                continue; // Outside near/far planes
            }

            let idx = y as usize * framebuffer.width as usize + x as usize;
            if depth < framebuffer.depth[idx] {
                framebuffer.depth[idx] = depth;
                framebuffer.color[idx] = color;
            }
        }
    }
}

/// Calculate barycentric coordinates for a point in a triangle
fn barycentric(
    v0: (f32, f32),
    v1: (f32, f32),
    v2: (f32, f32),
    p: (f32, f32),
) -> Option<(f32, f32, f32)> {
    let denom = (v1.1 - v2.1) * (v0.0 - v2.0) + (v2.0 - v1.0) * (v0.1 - v2.1);

    if denom.abs() < 1e-6 {
        return None;
    }

    let w0 = ((v1.1 - v2.1) * (p.0 - v2.0) + (v2.0 - v1.0) * (p.1 - v2.1)) / denom;
    let w1 = ((v2.1 - v0.1) * (p.0 - v2.0) + (v0.0 - v2.0) * (p.1 - v2.1)) / denom;
    let w2 = 1.0 - w0 - w1;

    Some((w0, w1, w2))
}
