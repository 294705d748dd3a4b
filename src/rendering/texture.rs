/// Square power-of-two textures and their lookup by id.
use crate::error::{RenderError, Result};
use std::collections::HashMap;

/// How samples outside `0..size` are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureWrap {
    /// Mask coordinates into range (tiling)
    #[default]
    Repeat,
    /// Clamp to the edge texel
    Clamp,
    /// Skip the pixel and count it
    Reject,
}

#[derive(Debug, Clone)]
pub struct Texture {
    size: usize,
    mask: i32,
    shift: u32,
    texels: Box<[u32]>,
    /// Transparent textures treat texel value 0 as a hole
    pub opaque: bool,
    pub wrap: TextureWrap,
}

impl Texture {
    pub fn new(size: usize, texels: Vec<u32>, opaque: bool, wrap: TextureWrap) -> Result<Self> {
        if size != 64 && size != 128 {
            return Err(RenderError::InvalidTexture(format!(
                "size {} is not 64 or 128",
                size
            )));
        }
        if texels.len() != size * size {
            return Err(RenderError::InvalidTexture(format!(
                "{} texels for a {}x{} texture",
                texels.len(),
                size,
                size
            )));
        }
        Ok(Self {
            size,
            mask: size as i32 - 1,
            shift: size.trailing_zeros(),
            texels: texels.into_boxed_slice(),
            opaque,
            wrap,
        })
    }

    /// Two-color checkerboard with `cell`-texel squares
    pub fn checkerboard(size: usize, a: u32, b: u32, cell: usize) -> Result<Self> {
        let cell = cell.max(1);
        let texels = (0..size * size)
            .map(|i| {
                let (x, y) = (i % size, i / size);
                if ((x / cell) + (y / cell)) % 2 == 0 {
                    a
                } else {
                    b
                }
            })
            .collect();
        Self::new(size, texels, true, TextureWrap::Repeat)
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Texel at integer coordinates, or `None` when the wrap mode rejects them.
    #[inline(always)]
    pub fn sample(&self, u: i32, v: i32) -> Option<u32> {
        let (u, v) = match self.wrap {
            TextureWrap::Repeat => (u & self.mask, v & self.mask),
            TextureWrap::Clamp => (u.clamp(0, self.mask), v.clamp(0, self.mask)),
            TextureWrap::Reject => {
                if (u | v) as u32 > self.mask as u32 {
                    return None;
                }
                (u, v)
            }
        };
        Some(self.texels[((v as usize) << self.shift) | u as usize])
    }
}

/// Texture lookup by id
pub trait TextureProvider {
    fn texture(&self, id: u16) -> Option<&Texture>;
}

#[derive(Debug, Default)]
pub struct TextureStore {
    textures: HashMap<u16, Texture>,
}

impl TextureStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: u16, texture: Texture) -> Option<Texture> {
        self.textures.insert(id, texture)
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }
}

impl TextureProvider for TextureStore {
    #[inline]
    fn texture(&self, id: u16) -> Option<&Texture> {
        self.textures.get(&id)
    }
}
