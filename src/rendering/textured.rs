/// Perspective-correct textured spans
///
/// Both strategies receive (1/z, u/z, v/z) at the first pixel and its
/// per-pixel step, all in `PERSP_BITS` fixed point. `span_per_pixel` divides
/// at every pixel; `span_lerp8` divides at 8-pixel block corners and walks
/// 16.16 u/v linearly in between.
use super::edge::round_color15;
use super::shading::{alpha_blend, shade_texel};
use super::texture::Texture;
use glam::I64Vec3;

pub const BLOCK: usize = 8;

/// Interpolants of one textured row, already advanced to its first pixel.
#[derive(Debug, Clone, Copy)]
pub struct TexturedSpan {
    pub persp: I64Vec3,
    pub persp_step: I64Vec3,
    /// Lightness in 15-bit fixed point
    pub shade15: i64,
    pub shade_slope: i64,
    pub alpha: u32,
}

impl TexturedSpan {
    #[inline(always)]
    fn persp_at(&self, i: usize) -> I64Vec3 {
        self.persp + self.persp_step * i as i64
    }

    #[inline(always)]
    fn shade_at(&self, i: usize) -> i32 {
        round_color15(self.shade15 + self.shade_slope * i as i64)
    }
}

/// 16.16 texel coordinates for perspective terms, `None` when 1/z is not positive.
#[inline(always)]
fn texel_coords(p: I64Vec3) -> Option<(i64, i64)> {
    if p.x <= 0 {
        return None;
    }
    Some(((p.y << 16).div_euclid(p.x), (p.z << 16).div_euclid(p.x)))
}

/// Write one texel into `px`. Returns true when the sample was rejected.
#[inline(always)]
fn write_texel(px: &mut u32, sample: Option<u32>, texture: &Texture, shade: i32, alpha: u32) -> bool {
    let Some(texel) = sample else {
        return true;
    };
    if !texture.opaque && texel == 0 {
        return false;
    }
    let color = shade_texel(texel, shade);
    *px = if alpha >= 255 {
        color
    } else {
        alpha_blend(alpha, *px, color)
    };
    false
}

/// Returns the number of rejected samples.
pub fn span_per_pixel(row: &mut [u32], span: &TexturedSpan, texture: &Texture) -> u64 {
    let mut rejected = 0;
    for (i, px) in row.iter_mut().enumerate() {
        let Some((u, v)) = texel_coords(span.persp_at(i)) else {
            continue;
        };
        let sample = texture.sample((u >> 16) as i32, (v >> 16) as i32);
        if write_texel(px, sample, texture, span.shade_at(i), span.alpha) {
            rejected += 1;
        }
    }
    rejected
}

/// Returns the number of rejected samples.
pub fn span_lerp8(row: &mut [u32], span: &TexturedSpan, texture: &Texture) -> u64 {
    let mut rejected = 0;
    let mut start = 0usize;

    for block in row.chunks_mut(BLOCK) {
        let n = block.len();
        let corners = (
            texel_coords(span.persp_at(start)),
            texel_coords(span.persp_at(start + n)),
        );
        // A corner past the horizon takes the other corner's coordinates
        let ((u0, v0), (u1, v1)) = match corners {
            (Some(a), Some(b)) => (a, b),
            (Some(a), None) => (a, a),
            (None, Some(b)) => (b, b),
            (None, None) => {
                start += n;
                continue;
            }
        };

        let (mut u16, mut v16) = (u0, v0);
        let du16 = (u1 - u0) / n as i64;
        let dv16 = (v1 - v0) / n as i64;

        for (j, px) in block.iter_mut().enumerate() {
            let sample = texture.sample((u16 >> 16) as i32, (v16 >> 16) as i32);
            if write_texel(px, sample, texture, span.shade_at(start + j), span.alpha) {
                rejected += 1;
            }
            u16 += du16;
            v16 += dv16;
        }
        start += n;
    }
    rejected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::edge::PERSP_BITS;
    use crate::rendering::shading::FULL_SHADE;
    use crate::rendering::ScreenVertex;
    use crate::rendering::texture::TextureWrap;

    fn column_texture(wrap: TextureWrap) -> Texture {
        // texel value encodes its u coordinate
        let texels = (0..64 * 64).map(|i| (i % 64) as u32 + 1).collect();
        Texture::new(64, texels, true, wrap).unwrap()
    }

    /// Constant depth: u advances exactly one texel per pixel.
    fn flat_span(u_start: f32, v: f32) -> TexturedSpan {
        let inv_z = (1i64 << PERSP_BITS) / 64;
        TexturedSpan {
            persp: I64Vec3::new(inv_z, (u_start * inv_z as f32) as i64, (v * inv_z as f32) as i64),
            persp_step: I64Vec3::new(0, inv_z, 0),
            shade15: (FULL_SHADE as i64) << 15,
            shade_slope: 0,
            alpha: 255,
        }
    }

    #[test]
    fn constant_depth_span_reads_consecutive_texels() {
        let texture = column_texture(TextureWrap::Repeat);
        let span = flat_span(3.5, 2.0);
        let mut per_pixel = vec![0u32; 20];
        let mut lerp = vec![0u32; 20];
        assert_eq!(span_per_pixel(&mut per_pixel, &span, &texture), 0);
        assert_eq!(span_lerp8(&mut lerp, &span, &texture), 0);
        let expected: Vec<u32> = (0..20).map(|i| (3 + i) as u32 + 1).collect();
        assert_eq!(per_pixel, expected);
        for (i, (&a, &b)) in per_pixel.iter().zip(&lerp).enumerate() {
            assert!(a.abs_diff(b) <= 1, "pixel {}: {} vs {}", i, a, b);
        }
    }

    #[test]
    fn rejected_samples_are_counted_and_left_untouched() {
        let texture = column_texture(TextureWrap::Reject);
        let span = flat_span(60.0, 1.0);
        let mut row = vec![0xABCDEFu32; 8];
        let rejected = span_per_pixel(&mut row, &span, &texture);
        assert_eq!(rejected, 4);
        assert_eq!(row[3], 64);
        assert_eq!(row[4], 0xABCDEF);
    }

    #[test]
    fn transparent_texels_leave_holes() {
        let mut texels = vec![0x00FF00u32; 64 * 64];
        texels[0] = 0;
        let texture = Texture::new(64, texels, false, TextureWrap::Repeat).unwrap();
        let span = flat_span(0.0, 0.0);
        let mut row = vec![0x112233u32; 2];
        span_per_pixel(&mut row, &span, &texture);
        assert_eq!(row, vec![0x112233, 0x00FF00]);
    }

    #[test]
    fn horizon_pixels_are_skipped() {
        let texture = column_texture(TextureWrap::Repeat);
        let span = TexturedSpan {
            persp: I64Vec3::ZERO,
            persp_step: I64Vec3::ZERO,
            shade15: 0,
            shade_slope: 0,
            alpha: 255,
        };
        let mut row = vec![7u32; 10];
        assert_eq!(span_lerp8(&mut row, &span, &texture), 0);
        assert_eq!(row, vec![7u32; 10]);
    }

    /// Span from depth 100 at u = 0 to depth 400 at u = 63.
    fn receding_span(pixels: usize) -> TexturedSpan {
        let near = ScreenVertex::textured(0, 0, 100, 0.0, 5.0, FULL_SHADE);
        let far = ScreenVertex::textured(0, 0, 400, 63.0, 5.0, FULL_SHADE);
        let (start, end) = (near.perspective_terms(), far.perspective_terms());
        TexturedSpan {
            persp: start,
            persp_step: (end - start) / pixels as i64,
            shade15: (FULL_SHADE as i64) << 15,
            shade_slope: 0,
            alpha: 255,
        }
    }

    #[test]
    fn receding_span_recovers_true_perspective_texels() {
        let texture = column_texture(TextureWrap::Clamp);
        let span = receding_span(64);
        let mut row = vec![0u32; 64];
        assert_eq!(span_per_pixel(&mut row, &span, &texture), 0);

        for (i, &texel) in row.iter().enumerate() {
            // exact u where 1/z has moved i/64 of the way from 1/100 to 1/400
            let t = i as f64 / 64.0;
            let inv_z = (1.0 - t) / 100.0 + t / 400.0;
            let u = (t * 63.0 / 400.0) / inv_z;
            let got = texel as f64 - 1.0;
            assert!((got - u.floor()).abs() <= 1.0, "pixel {}: texel {} for u {:.3}", i, got, u);
        }
        // perspective bunches texels toward the far end
        assert!(row[32] - 1 < 32);
    }

    #[test]
    fn strategies_agree_on_a_receding_span() {
        let texture = column_texture(TextureWrap::Clamp);
        let span = receding_span(61);
        let mut per_pixel = vec![0u32; 61];
        let mut lerp = vec![0u32; 61];
        span_per_pixel(&mut per_pixel, &span, &texture);
        span_lerp8(&mut lerp, &span, &texture);
        for (i, (&a, &b)) in per_pixel.iter().zip(&lerp).enumerate() {
            // linear steps inside a block trail the curve by a few texels at most
            assert!(a.abs_diff(b) <= 4, "pixel {}: {} vs {}", i, a, b);
        }
    }

    #[test]
    fn perspective_terms_are_fixed_point() {
        let vertex = ScreenVertex::textured(0, 0, 64, 32.0, -16.0, 0);
        let one = 1i64 << PERSP_BITS;
        assert_eq!(vertex.perspective_terms(), I64Vec3::new(one / 64, one / 2, -one / 4));
        let behind = ScreenVertex::textured(0, 0, 0, 32.0, 16.0, 0);
        assert_eq!(behind.perspective_terms(), I64Vec3::ZERO);
    }
}
