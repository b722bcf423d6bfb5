/// Geometry primitives for mesh display
use nalgebra::{Point3, Vector3};

/// A mesh vertex with position and the normal of its facet
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Point3<f32>,
    pub normal: Vector3<f32>,
}

impl Vertex {
    pub fn new(position: Point3<f32>, normal: Vector3<f32>) -> Self {
        Self { position, normal }
    }
}

/// A triangle facet defined by three vertices
#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    pub vertices: [Vertex; 3],
}

impl Triangle {
    pub fn new(v0: Vertex, v1: Vertex, v2: Vertex) -> Self {
        Self {
            vertices: [v0, v1, v2],
        }
    }

    /// Build a facet from a stored normal and three corner positions.
    pub fn from_facet(normal: Vector3<f32>, corners: [Point3<f32>; 3]) -> Self {
        Self {
            vertices: corners.map(|p| Vertex::new(p, normal)),
        }
    }

    /// Face normal from the winding order. Zero for degenerate facets.
    pub fn calculate_normal(&self) -> Vector3<f32> {
        let v0 = self.vertices[0].position;
        let v1 = self.vertices[1].position;
        let v2 = self.vertices[2].position;

        let n = (v1 - v0).cross(&(v2 - v0));
        n.try_normalize(f32::EPSILON).unwrap_or_else(Vector3::zeros)
    }

    pub fn centroid(&self) -> Point3<f32> {
        let [a, b, c] = &self.vertices;
        Point3::from((a.position.coords + b.position.coords + c.position.coords) / 3.0)
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl BoundingBox {
    /// Smallest box containing every point; `None` when there are none.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Point3<f32>>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bounds = Self {
            min: first,
            max: first,
        };
        for p in iter {
            bounds.min = bounds.min.inf(&p);
            bounds.max = bounds.max.sup(&p);
        }
        Some(bounds)
    }

    pub fn center(&self) -> Point3<f32> {
        nalgebra::center(&self.min, &self.max)
    }

    pub fn size(&self) -> Vector3<f32> {
        self.max - self.min
    }

    /// Largest extent along any axis
    pub fn max_dimension(&self) -> f32 {
        self.size().max()
    }
}

/// A triangle soup as read from an STL file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub triangles: Vec<Triangle>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            triangles: Vec::with_capacity(capacity),
        }
    }

    pub fn add_triangle(&mut self, triangle: Triangle) {
        self.triangles.push(triangle);
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> {
        self.triangles.iter().flat_map(|t| t.vertices.iter())
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.vertices().map(|v| v.position))
    }

    pub fn translate(&mut self, offset: Vector3<f32>) {
        for triangle in &mut self.triangles {
            for vertex in &mut triangle.vertices {
                vertex.position += offset;
            }
        }
    }

    /// Move the mesh so its bounding-box center sits at the origin.
    ///
    /// Returns the translation that was applied (zero for an empty mesh).
    pub fn center(&mut self) -> Vector3<f32> {
        let offset = match self.bounding_box() {
            Some(bounds) => -bounds.center().coords,
            None => return Vector3::zeros(),
        };
        self.translate(offset);
        offset
    }

    /// Axis-aligned cube centered on the origin, wound counter-clockwise
    pub fn cube(size: f32) -> Self {
        let h = size / 2.0;
        // (normal, four corners in CCW order seen from outside)
        let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
            ([0.0, 0.0, 1.0], [[-h, -h, h], [h, -h, h], [h, h, h], [-h, h, h]]),
            ([0.0, 0.0, -1.0], [[h, -h, -h], [-h, -h, -h], [-h, h, -h], [h, h, -h]]),
            ([0.0, 1.0, 0.0], [[-h, h, h], [h, h, h], [h, h, -h], [-h, h, -h]]),
            ([0.0, -1.0, 0.0], [[-h, -h, -h], [h, -h, -h], [h, -h, h], [-h, -h, h]]),
            ([1.0, 0.0, 0.0], [[h, -h, h], [h, -h, -h], [h, h, -h], [h, h, h]]),
            ([-1.0, 0.0, 0.0], [[-h, -h, -h], [-h, -h, h], [-h, h, h], [-h, h, -h]]),
        ];

        let mut mesh = Self::with_capacity(12);
        for (n, quad) in faces {
            let normal = Vector3::from(n);
            let [a, b, c, d] = quad.map(Point3::from);
            mesh.add_triangle(Triangle::from_facet(normal, [a, b, c]));
            mesh.add_triangle(Triangle::from_facet(normal, [a, c, d]));
        }
        mesh
    }
}
