//! Load requests handed to hosts, and decoding of fetched bytes.

use tracing::debug;

use crate::error::LoadError;
use crate::geometry::Mesh;
use crate::stl;

/// Identifies the initialization cycle a load belongs to.
///
/// A completion carrying a ticket from an earlier cycle is stale and is
/// dropped by the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadTicket {
    pub(crate) generation: u64,
}

impl LoadTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// What a host must fetch for the viewer
#[derive(Debug, Clone, PartialEq)]
pub struct LoadRequest {
    pub ticket: LoadTicket,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadProgress {
    pub loaded: u64,
    /// Total size when the host knows it
    pub total: Option<u64>,
}

impl LoadProgress {
    pub fn fraction(&self) -> Option<f32> {
        match self.total {
            Some(0) | None => None,
            Some(total) => Some((self.loaded as f32 / total as f32).min(1.0)),
        }
    }
}

/// Decode STL bytes into a mesh the viewer can frame.
pub fn decode_mesh(bytes: &[u8]) -> Result<Mesh, LoadError> {
    let mesh = stl::parse_stl(bytes)?;
    if mesh.is_empty() {
        return Err(LoadError::EmptyMesh);
    }

    let extent = mesh
        .bounding_box()
        .map(|b| b.max_dimension())
        .unwrap_or(0.0);
    if !extent.is_finite() || extent <= 0.0 {
        return Err(LoadError::Degenerate);
    }

    debug!(bytes = bytes.len(), triangles = mesh.triangles.len(), "decoded STL");
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StlError;

    #[test]
    fn test_decode_ascii_cube_face() {
        let text = "solid face\nfacet normal 0 0 1\nouter loop\nvertex 0 0 0\nvertex 4 0 0\nvertex 0 2 0\nendloop\nendfacet\nendsolid face\n";
        let mesh = decode_mesh(text.as_bytes()).unwrap();
        assert_eq!(mesh.triangles.len(), 1);
    }

    #[test]
    fn test_empty_solid_is_rejected() {
        assert_eq!(decode_mesh(b"solid empty\nendsolid empty\n"), Err(LoadError::EmptyMesh));
    }

    #[test]
    fn test_single_point_is_degenerate() {
        let text = "solid p\nfacet normal 0 0 1\nouter loop\nvertex 1 1 1\nvertex 1 1 1\nvertex 1 1 1\nendloop\nendfacet\nendsolid p\n";
        assert_eq!(decode_mesh(text.as_bytes()), Err(LoadError::Degenerate));
    }

    #[test]
    fn test_parse_failure_maps_to_load_error() {
        assert_eq!(
            decode_mesh(b"garbage"),
            Err(LoadError::Parse(StlError::TooShort { len: 7 }))
        );
    }

    #[test]
    fn test_progress_fraction() {
        let half = LoadProgress {
            loaded: 50,
            total: Some(100),
        };
        assert_eq!(half.fraction(), Some(0.5));
        let unknown = LoadProgress {
            loaded: 50,
            total: None,
        };
        assert_eq!(unknown.fraction(), None);
    }
}
