/// stlview core library - mesh loading, camera framing and viewer lifecycle
///
/// This library provides the host-independent parts of the STL viewer:
/// STL decoding, bounding-box camera fitting, orbit controls, a software
/// rasterizer, and the `Viewer` lifecycle that hosts drive through `Mount`.

pub mod color;
pub mod config;
pub mod controls;
pub mod error;
pub mod fit;
pub mod geometry;
pub mod lighting;
pub mod loader;
pub mod projection;
pub mod raster;
pub mod scene;
pub mod stl;
pub mod viewer;

// Re-export commonly used types
pub use color::Color;
pub use config::ViewerConfig;
pub use controls::{ControlInput, OrbitControls};
pub use error::{ColorError, ConfigError, LoadError, StlError, ViewerError};
pub use fit::CameraFit;
pub use geometry::{BoundingBox, Mesh, Triangle, Vertex};
pub use lighting::{Light, PhongMaterial};
pub use loader::{decode_mesh, LoadProgress, LoadRequest, LoadTicket};
pub use projection::Camera;
pub use raster::Framebuffer;
pub use scene::{Scene, SceneMesh};
pub use viewer::{FrameHandle, LoadState, Mount, RenderSurface, Viewer, LOADING_MESSAGE};
