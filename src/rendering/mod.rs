/// Software scanline rasterization
/// Integer edge walking, palette colors and near-plane clipping
pub mod clip;
pub mod edge;
pub mod framebuffer;
pub mod rasterizer;
pub mod shading;
pub mod texture;
pub mod textured;

pub use clip::{ClipVertex, ClippedPolygon, FloatClipper, IntegerClipper, NearClipper};
pub use framebuffer::{PixelBuffer, PixelTarget, PixelView};
pub use rasterizer::{RasterStats, Rasterizer};
pub use shading::{alpha_blend, shade_texel, Palette};
pub use texture::{Texture, TextureProvider, TextureStore, TextureWrap};

use edge::PERSP_BITS;
use glam::I64Vec3;

/// Projected vertex handed to the fill routines.
///
/// `x`/`y` are pixel coordinates, `z` is camera-space depth, `color` is an
/// HSL16 index (or a texture lightness), `u`/`v` are texel coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScreenVertex {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub color: i32,
    pub u: f32,
    pub v: f32,
}

impl ScreenVertex {
    #[inline]
    pub fn new(x: i32, y: i32, color: i32) -> Self {
        Self {
            x,
            y,
            color,
            ..Default::default()
        }
    }

    #[inline]
    pub fn textured(x: i32, y: i32, z: i32, u: f32, v: f32, shade: i32) -> Self {
        Self { x, y, z, color: shade, u, v }
    }

    /// (1/z, u/z, v/z) with `PERSP_BITS` fraction bits; zero for vertices
    /// without a usable depth
    #[inline]
    pub fn perspective_terms(&self) -> I64Vec3 {
        if self.z <= 0 {
            return I64Vec3::ZERO;
        }
        let z = self.z as i64;
        let fixed = |t: f32| (t as f64 * (1i64 << PERSP_BITS) as f64).round() as i64;
        I64Vec3::new((1i64 << PERSP_BITS) / z, fixed(self.u) / z, fixed(self.v) / z)
    }
}
