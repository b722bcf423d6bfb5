//! Viewer configuration
//!
//! A [`ViewerConfig`] is immutable for one render cycle. Hosts compare a new
//! config against the live one and re-initialize the viewer on any change.

use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::error::{ConfigError, ViewerError};

pub const DEFAULT_WIDTH: u32 = 400;
pub const DEFAULT_HEIGHT: u32 = 400;
pub const DEFAULT_BACKGROUND: u32 = 0xf5f5f5;
pub const DEFAULT_MODEL_COLOR: u32 = 0x00bcd4;
/// Largest accepted side, matching the common browser canvas limit
pub const MAX_DIMENSION: u32 = 16384;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerConfig {
    /// Location of the STL asset (URL in the browser, path in the terminal)
    pub source_url: String,
    /// Surface width in CSS pixels or terminal cells
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_background")]
    pub background_color: Color,
    #[serde(default = "default_model_color")]
    pub model_color: Color,
}

fn default_width() -> u32 {
    DEFAULT_WIDTH
}

fn default_height() -> u32 {
    DEFAULT_HEIGHT
}

fn default_background() -> Color {
    Color::from_hex(DEFAULT_BACKGROUND)
}

fn default_model_color() -> Color {
    Color::from_hex(DEFAULT_MODEL_COLOR)
}

impl ViewerConfig {
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            background_color: default_background(),
            model_color: default_model_color(),
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_colors(mut self, background: Color, model: Color) -> Self {
        self.background_color = background;
        self.model_color = model;
        self
    }

    /// Parse and validate a camelCase JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ViewerError> {
        if self.source_url.trim().is_empty() {
            return Err(ViewerError::InvalidConfig("sourceUrl is empty".to_string()));
        }
        if self.width == 0 || self.height == 0 {
            return Err(ViewerError::InvalidConfig(format!(
                "surface size {}x{} has a zero dimension",
                self.width, self.height
            )));
        }
        if self.width > MAX_DIMENSION || self.height > MAX_DIMENSION {
            return Err(ViewerError::InvalidConfig(format!(
                "surface size {}x{} exceeds {} pixels per side",
                self.width, self.height, MAX_DIMENSION
            )));
        }
        Ok(())
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}
