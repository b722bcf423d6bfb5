//! Error types for the viewer.
//!
//! Loading failures are never fatal: a [`LoadError`] is converted to a
//! user-facing message at the load boundary and shown as an overlay.
//! [`ViewerError`] covers host failures while building a surface.

use thiserror::Error;

/// STL decoding errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StlError {
    /// Input is shorter than the fixed binary header
    #[error("file too small to be a valid STL ({len} bytes)")]
    TooShort {
        /// Actual input length in bytes.
        len: usize,
    },

    /// Binary triangle count does not match the payload
    #[error("binary STL truncated: {triangles} triangles need {expected} bytes, found {actual}")]
    Truncated {
        /// Triangle count declared in the header.
        triangles: u32,
        /// Bytes required for that many triangles.
        expected: u64,
        /// Bytes actually present.
        actual: usize,
    },

    /// ASCII grammar violation
    #[error("malformed ASCII STL near `{context}`")]
    Ascii {
        /// Up to the first 32 characters of unparsed input.
        context: String,
    },

    /// ASCII input is not valid UTF-8
    #[error("ASCII STL is not valid UTF-8")]
    Utf8,
}

/// Failure to obtain a displayable mesh
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    /// Network or filesystem failure
    #[error("could not fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// Server answered with a non-success status
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// Bytes were fetched but are not an STL file
    #[error(transparent)]
    Parse(#[from] StlError),

    /// The file parsed but holds no triangles
    #[error("model contains no triangles")]
    EmptyMesh,

    /// All vertices coincide or are not finite
    #[error("model has no measurable extent")]
    Degenerate,
}

impl LoadError {
    /// Text shown in the viewer overlay.
    pub fn user_message(&self) -> String {
        format!("Failed to load model: {}", self)
    }
}

/// Host failures while initializing or running a viewer
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ViewerError {
    #[error("invalid viewer configuration: {0}")]
    InvalidConfig(String),

    #[error("rendering surface unavailable: {0}")]
    Surface(String),

    #[error("frame scheduling failed: {0}")]
    Scheduler(String),
}

/// Color string could not be parsed
#[derive(Error, Debug, Clone, PartialEq)]
#[error("invalid color `{0}`: expected #rgb, #rrggbb or a basic color name")]
pub struct ColorError(pub String);

/// Configuration document could not be read
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Invalid(#[from] ViewerError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_prefix() {
        let err = LoadError::Status {
            url: "models/part.stl".to_string(),
            status: 404,
        };
        assert_eq!(
            err.user_message(),
            "Failed to load model: models/part.stl returned HTTP 404"
        );
    }

    #[test]
    fn test_parse_error_is_transparent() {
        let err = LoadError::from(StlError::TooShort { len: 3 });
        assert_eq!(err.to_string(), "file too small to be a valid STL (3 bytes)");
    }
}
