/// Renderer configuration parameters
/// Loaded from TOML or taken from `Default`.
use crate::error::{RenderError, Result};
use serde::Deserialize;
use std::path::Path;

/// Which near-plane clipping arithmetic to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClipStrategy {
    /// 16.16 fixed-point intersection
    Integer,
    /// f32 intersection
    Float,
}

/// How textured spans recover perspective-correct coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureStrategy {
    /// Divide out 1/z at every pixel.
    PerPixel,
    /// Divide at 8-pixel block corners and interpolate linearly inside the block.
    Lerp8,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Draw radius in tiles around the camera tile
    pub draw_radius: i32,
    /// Highest level drawn; tiles above are marked done without drawing
    pub max_level: u8,
    /// Camera-space depth of the near plane
    pub near_plane_z: i32,
    /// Projection scale: screen = p * focal_length / z
    pub focal_length: i32,
    pub clip_strategy: ClipStrategy,
    pub texture_strategy: TextureStrategy,
    /// Gamma applied when building the HSL palette
    pub brightness: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            draw_radius: 25,
            max_level: 4,
            near_plane_z: 50,
            focal_length: 512,
            clip_strategy: ClipStrategy::Integer,
            texture_strategy: TextureStrategy::Lerp8,
            brightness: 0.8,
        }
    }
}

impl RenderConfig {
    /// Parse a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: RenderConfig =
            toml::from_str(text).map_err(|e| RenderError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| RenderError::Config(format!("{}: {}", path.display(), e)))?;
        log::debug!("loading render config from {}", path.display());
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.draw_radius <= 0 {
            return Err(RenderError::Config(format!(
                "draw_radius must be positive, got {}",
                self.draw_radius
            )));
        }
        if self.near_plane_z <= 0 {
            return Err(RenderError::Config(format!(
                "near_plane_z must be positive, got {}",
                self.near_plane_z
            )));
        }
        if self.focal_length <= 0 {
            return Err(RenderError::Config(format!(
                "focal_length must be positive, got {}",
                self.focal_length
            )));
        }
        if !(self.brightness > 0.0) {
            return Err(RenderError::Config(format!(
                "brightness must be positive, got {}",
                self.brightness
            )));
        }
        Ok(())
    }
}
