/// Software rasterizer using the scanline algorithm
/// Spans are filled four pixels per step with a scalar tail.
use super::edge::{ceil_x16, round_color15, Edge, TriangleSetup};
use super::framebuffer::PixelTarget;
use super::shading::{alpha_blend, Palette};
use super::texture::Texture;
use super::textured::{self, TexturedSpan};
use super::ScreenVertex;
use crate::config::TextureStrategy;
use crate::perf::FUNCTION_COUNTERS;
use crate::{count_add, count_call};

pub const OPAQUE: u8 = 255;

/// Work done by one rasterizer since its last reset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RasterStats {
    pub triangles: u64,
    pub degenerate: u64,
    pub spans: u64,
    pub pixels: u64,
    pub texels_rejected: u64,
}

impl RasterStats {
    pub fn merge(&mut self, other: &RasterStats) {
        self.triangles += other.triangles;
        self.degenerate += other.degenerate;
        self.spans += other.spans;
        self.pixels += other.pixels;
        self.texels_rejected += other.texels_rejected;
    }
}

/// Clipped span of one row: the pixel range and where it starts relative to the left edge
#[derive(Debug, Clone, Copy)]
struct RowSpan {
    x_start: i64,
    x_end: i64,
    /// 16.16 distance from the left edge to the first pixel
    offset16: i64,
    /// 16.16 distance between the edges
    width16: i64,
}

#[inline(always)]
fn row_span(left: &Edge, right: &Edge, width: i64) -> Option<RowSpan> {
    let x_start = ceil_x16(left.x16()).max(0);
    let x_end = ceil_x16(right.x16()).min(width);
    if x_start >= x_end {
        return None;
    }
    Some(RowSpan {
        x_start,
        x_end,
        offset16: (x_start << 16) - left.x16(),
        width16: right.x16() - left.x16(),
    })
}

/// Per-pixel color step and starting color of a span, both 15-bit fixed point
#[inline(always)]
fn color_slope(left: &Edge, right: &Edge, span: &RowSpan) -> (i64, i64) {
    let slope = ((right.color15() - left.color15()) << 16) / span.width16;
    (left.color15() + ((slope * span.offset16) >> 16), slope)
}

pub struct Rasterizer {
    pub texture_strategy: TextureStrategy,
    stats: RasterStats,
}

impl Default for Rasterizer {
    fn default() -> Self {
        Self::new(TextureStrategy::Lerp8)
    }
}

impl Rasterizer {
    pub fn new(texture_strategy: TextureStrategy) -> Self {
        Self {
            texture_strategy,
            stats: RasterStats::default(),
        }
    }

    #[inline]
    pub fn stats(&self) -> &RasterStats {
        &self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = RasterStats::default();
    }

    fn setup(&mut self, tri: &[ScreenVertex; 3]) -> Option<TriangleSetup> {
        match TriangleSetup::new(tri) {
            Some(setup) => {
                self.stats.triangles += 1;
                count_call!(FUNCTION_COUNTERS.triangles_rasterized);
                Some(setup)
            }
            None => {
                self.stats.degenerate += 1;
                count_call!(FUNCTION_COUNTERS.triangles_degenerate);
                None
            }
        }
    }

    fn record_spans(&mut self, spans: u64, pixels: u64) {
        self.stats.spans += spans;
        self.stats.pixels += pixels;
        count_add!(FUNCTION_COUNTERS.spans_filled, spans);
        count_add!(FUNCTION_COUNTERS.pixels_written, pixels);
    }

    /// Fill with one packed RGB color. Returns false for degenerate triangles.
    pub fn fill_flat<T: PixelTarget + ?Sized>(
        &mut self,
        target: &mut T,
        tri: &[ScreenVertex; 3],
        rgb: u32,
        alpha: u8,
    ) -> bool {
        let Some(setup) = self.setup(tri) else {
            return false;
        };
        if alpha == 0 {
            return true;
        }

        let width = target.width() as i64;
        let height = target.height() as i32;
        let (mut spans, mut pixels) = (0u64, 0u64);

        setup.walk(height, |y, left, right| {
            let Some(span) = row_span(left, right, width) else {
                return;
            };
            let row = &mut target.row_mut(y as usize)[span.x_start as usize..span.x_end as usize];
            if alpha == OPAQUE {
                flat_span(row, rgb);
            } else {
                flat_span_alpha(row, rgb, alpha as u32);
            }
            spans += 1;
            pixels += row.len() as u64;
        });

        self.record_spans(spans, pixels);
        true
    }

    /// Interpolate the vertices' HSL16 colors and map each pixel through `palette`.
    pub fn fill_gouraud<T: PixelTarget + ?Sized>(
        &mut self,
        target: &mut T,
        tri: &[ScreenVertex; 3],
        palette: &Palette,
        alpha: u8,
    ) -> bool {
        let Some(setup) = self.setup(tri) else {
            return false;
        };
        if alpha == 0 {
            return true;
        }

        let width = target.width() as i64;
        let height = target.height() as i32;
        let (mut spans, mut pixels) = (0u64, 0u64);

        setup.walk(height, |y, left, right| {
            let Some(span) = row_span(left, right, width) else {
                return;
            };
            let (color15, slope) = color_slope(left, right, &span);
            let row = &mut target.row_mut(y as usize)[span.x_start as usize..span.x_end as usize];
            if alpha == OPAQUE {
                gouraud_span(row, color15, slope, palette);
            } else {
                gouraud_span_alpha(row, color15, slope, palette, alpha as u32);
            }
            spans += 1;
            pixels += row.len() as u64;
        });

        self.record_spans(spans, pixels);
        true
    }

    /// Perspective-correct texture fill. Vertex colors are lightness values
    /// interpolated across the face and applied to every texel.
    pub fn fill_textured<T: PixelTarget + ?Sized>(
        &mut self,
        target: &mut T,
        tri: &[ScreenVertex; 3],
        texture: &Texture,
        alpha: u8,
    ) -> bool {
        let Some(setup) = self.setup(tri) else {
            return false;
        };
        if alpha == 0 {
            return true;
        }

        let width = target.width() as i64;
        let height = target.height() as i32;
        let strategy = self.texture_strategy;
        let (mut spans, mut pixels, mut rejected) = (0u64, 0u64, 0u64);

        setup.walk(height, |y, left, right| {
            let Some(span) = row_span(left, right, width) else {
                return;
            };
            let (shade15, shade_slope) = color_slope(left, right, &span);
            let persp_step = (right.persp() - left.persp()) * 65536 / span.width16;
            let persp = left.persp() + persp_step * span.offset16 / 65536;

            let row = &mut target.row_mut(y as usize)[span.x_start as usize..span.x_end as usize];
            let textured_span = TexturedSpan {
                persp,
                persp_step,
                shade15,
                shade_slope,
                alpha: alpha as u32,
            };
            rejected += match strategy {
                TextureStrategy::PerPixel => textured::span_per_pixel(row, &textured_span, texture),
                TextureStrategy::Lerp8 => textured::span_lerp8(row, &textured_span, texture),
            };
            spans += 1;
            pixels += row.len() as u64;
        });

        if rejected > 0 {
            log::trace!("{} texels outside the texture were skipped", rejected);
            self.stats.texels_rejected += rejected;
            count_add!(FUNCTION_COUNTERS.texels_rejected, rejected);
        }
        self.record_spans(spans, pixels);
        true
    }
}

#[inline(always)]
fn flat_span(row: &mut [u32], rgb: u32) {
    let mut chunks = row.chunks_exact_mut(4);
    for chunk in &mut chunks {
        chunk[0] = rgb;
        chunk[1] = rgb;
        chunk[2] = rgb;
        chunk[3] = rgb;
    }
    for px in chunks.into_remainder() {
        *px = rgb;
    }
}

#[inline(always)]
fn flat_span_alpha(row: &mut [u32], rgb: u32, alpha: u32) {
    let mut chunks = row.chunks_exact_mut(4);
    for chunk in &mut chunks {
        chunk[0] = alpha_blend(alpha, chunk[0], rgb);
        chunk[1] = alpha_blend(alpha, chunk[1], rgb);
        chunk[2] = alpha_blend(alpha, chunk[2], rgb);
        chunk[3] = alpha_blend(alpha, chunk[3], rgb);
    }
    for px in chunks.into_remainder() {
        *px = alpha_blend(alpha, *px, rgb);
    }
}

#[inline(always)]
fn gouraud_span(row: &mut [u32], mut color15: i64, slope: i64, palette: &Palette) {
    let mut chunks = row.chunks_exact_mut(4);
    for chunk in &mut chunks {
        for px in chunk.iter_mut() {
            *px = palette.rgb(round_color15(color15));
            color15 += slope;
        }
    }
    for px in chunks.into_remainder() {
        *px = palette.rgb(round_color15(color15));
        color15 += slope;
    }
}

#[inline(always)]
fn gouraud_span_alpha(row: &mut [u32], mut color15: i64, slope: i64, palette: &Palette, alpha: u32) {
    let mut chunks = row.chunks_exact_mut(4);
    for chunk in &mut chunks {
        for px in chunk.iter_mut() {
            *px = alpha_blend(alpha, *px, palette.rgb(round_color15(color15)));
            color15 += slope;
        }
    }
    for px in chunks.into_remainder() {
        *px = alpha_blend(alpha, *px, palette.rgb(round_color15(color15)));
        color15 += slope;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::PixelBuffer;

    fn filled(buffer: &PixelBuffer) -> usize {
        buffer.pixels.iter().filter(|&&p| p != 0).count()
    }

    #[test]
    fn axis_aligned_right_triangle_covers_half_open_area() {
        let mut buffer = PixelBuffer::new(16, 16);
        let mut raster = Rasterizer::default();
        let tri = [
            ScreenVertex::new(0, 0, 0),
            ScreenVertex::new(8, 0, 0),
            ScreenVertex::new(0, 8, 0),
        ];
        assert!(raster.fill_flat(&mut buffer, &tri, 0xFFFFFF, OPAQUE));
        // row y covers x in [0, 8 - y)
        assert_eq!(filled(&buffer), (1..=8).sum::<usize>());
        assert_eq!(buffer.pixel(7, 0), Some(0xFFFFFF));
        assert_eq!(buffer.pixel(8, 0), Some(0));
        assert_eq!(buffer.pixel(0, 8), Some(0));
    }

    #[test]
    fn winding_does_not_change_coverage() {
        let mut cw = PixelBuffer::new(32, 32);
        let mut ccw = PixelBuffer::new(32, 32);
        let mut raster = Rasterizer::default();
        let a = ScreenVertex::new(3, 2, 0);
        let b = ScreenVertex::new(29, 11, 0);
        let c = ScreenVertex::new(9, 27, 0);
        raster.fill_flat(&mut cw, &[a, b, c], 1, OPAQUE);
        raster.fill_flat(&mut ccw, &[a, c, b], 1, OPAQUE);
        assert_eq!(cw.pixels, ccw.pixels);
    }

    #[test]
    fn degenerate_triangle_touches_nothing() {
        let mut buffer = PixelBuffer::new(8, 8);
        let mut raster = Rasterizer::default();
        let tri = [
            ScreenVertex::new(1, 1, 0),
            ScreenVertex::new(4, 4, 0),
            ScreenVertex::new(7, 7, 0),
        ];
        assert!(!raster.fill_flat(&mut buffer, &tri, 5, OPAQUE));
        assert_eq!(filled(&buffer), 0);
        assert_eq!(raster.stats().degenerate, 1);
    }

    #[test]
    fn offscreen_parts_are_clipped_to_the_target() {
        let mut buffer = PixelBuffer::new(10, 10);
        let mut raster = Rasterizer::default();
        let tri = [
            ScreenVertex::new(-20, -20, 0),
            ScreenVertex::new(40, -20, 0),
            ScreenVertex::new(-20, 40, 0),
        ];
        raster.fill_flat(&mut buffer, &tri, 9, OPAQUE);
        assert_eq!(filled(&buffer), 100, "covers the whole target");
        assert_eq!(raster.stats().pixels, 100);
    }

    #[test]
    fn gouraud_constant_color_matches_flat() {
        let mut flat = PixelBuffer::new(24, 24);
        let mut smooth = PixelBuffer::new(24, 24);
        let mut raster = Rasterizer::default();
        let palette = Palette::identity();
        let tri = [
            ScreenVertex::new(2, 1, 0x1234),
            ScreenVertex::new(22, 9, 0x1234),
            ScreenVertex::new(5, 20, 0x1234),
        ];
        raster.fill_flat(&mut flat, &tri, 0x1234, OPAQUE);
        raster.fill_gouraud(&mut smooth, &tri, &palette, OPAQUE);
        assert_eq!(flat.pixels, smooth.pixels);
    }

    #[test]
    fn alpha_blends_against_existing_pixels() {
        let mut buffer = PixelBuffer::new(8, 8);
        buffer.clear(0x000000);
        let mut raster = Rasterizer::default();
        let tri = [
            ScreenVertex::new(0, 0, 0),
            ScreenVertex::new(8, 0, 0),
            ScreenVertex::new(0, 8, 0),
        ];
        raster.fill_flat(&mut buffer, &tri, 0xFEFEFE, 128);
        assert_eq!(buffer.pixel(0, 0), Some(0x7F7F7F));
    }

    #[test]
    fn zero_alpha_draws_nothing() {
        let mut buffer = PixelBuffer::new(8, 8);
        let mut raster = Rasterizer::default();
        let tri = [
            ScreenVertex::new(0, 0, 0),
            ScreenVertex::new(8, 0, 0),
            ScreenVertex::new(0, 8, 0),
        ];
        raster.fill_flat(&mut buffer, &tri, 0xFFFFFF, 0);
        assert_eq!(filled(&buffer), 0);
    }
}
