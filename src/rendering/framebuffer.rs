/// Destination pixel storage
/// Row-major 0xRRGGBB pixels, no depth plane: draw order decides visibility.
use crate::count_call;
use crate::perf::FUNCTION_COUNTERS;

/// Anything the rasterizer can fill: a width x height grid of row-major pixels.
pub trait PixelTarget {
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    /// One full row. Callers guarantee `y < height()`.
    fn row_mut(&mut self, y: usize) -> &mut [u32];
}

/// Owned pixel buffer
#[derive(Debug, Clone)]
pub struct PixelBuffer {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u32>,
}

impl PixelBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width * height],
        }
    }

    pub fn clear(&mut self, clear_color: u32) {
        count_call!(FUNCTION_COUNTERS.pixel_buffer_clear_calls);
        self.pixels.fill(clear_color);
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.pixels.resize(width * height, 0);
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> Option<u32> {
        if x < self.width && y < self.height {
            Some(self.pixels[y * self.width + x])
        } else {
            None
        }
    }

    #[inline]
    pub fn set_pixel(&mut self, x: usize, y: usize, color: u32) {
        if x < self.width && y < self.height {
            self.pixels[y * self.width + x] = color;
        }
    }

    /// Borrow as a target view
    pub fn as_view(&mut self) -> PixelView<'_> {
        PixelView {
            width: self.width,
            height: self.height,
            pixels: &mut self.pixels,
        }
    }
}

impl PixelTarget for PixelBuffer {
    #[inline]
    fn width(&self) -> usize {
        self.width
    }

    #[inline]
    fn height(&self) -> usize {
        self.height
    }

    #[inline]
    fn row_mut(&mut self, y: usize) -> &mut [u32] {
        let start = y * self.width;
        &mut self.pixels[start..start + self.width]
    }
}

/// Target over a caller-owned backbuffer
pub struct PixelView<'a> {
    width: usize,
    height: usize,
    pixels: &'a mut [u32],
}

impl<'a> PixelView<'a> {
    /// `None` when the slice is shorter than `width * height`.
    pub fn new(pixels: &'a mut [u32], width: usize, height: usize) -> Option<Self> {
        if pixels.len() < width.checked_mul(height)? {
            return None;
        }
        Some(Self { width, height, pixels })
    }
}

impl<'a> PixelTarget for PixelView<'a> {
    #[inline]
    fn width(&self) -> usize {
        self.width
    }

    #[inline]
    fn height(&self) -> usize {
        self.height
    }

    #[inline]
    fn row_mut(&mut self, y: usize) -> &mut [u32] {
        let start = y * self.width;
        &mut self.pixels[start..start + self.width]
    }
}

/// Convert RGB to a packed 0xRRGGBB pixel
#[inline]
pub const fn rgb_to_u32(r: u8, g: u8, b: u8) -> u32 {
    ((r as u32) << 16) | ((g as u32) << 8) | (b as u32)
}
