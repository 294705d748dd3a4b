/// Color utilities shared by every fill mode.
/// Kept separate from the rasterizer so palettes and blend rules
/// can evolve independently of edge walking.

/// Entries in a 16-bit HSL palette: 512 hue/saturation rows of 128 lightness steps
pub const PALETTE_SIZE: usize = 512 * 128;
/// Lightness value that leaves texels unchanged
pub const FULL_SHADE: i32 = 128;

/// Maps 16-bit HSL color indices to packed RGB.
#[derive(Clone)]
pub struct Palette {
    table: Box<[u32]>,
}

impl std::fmt::Debug for Palette {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Palette").field("entries", &self.table.len()).finish()
    }
}

impl Palette {
    /// Build the HSL palette with gamma `brightness` applied to every channel.
    pub fn hsl16(brightness: f64) -> Self {
        let mut table = Vec::with_capacity(PALETTE_SIZE);
        for row in 0..512 {
            let hue = (row / 8) as f64 / 64.0 + 0.0078125;
            let saturation = (row & 7) as f64 / 8.0 + 0.0625;
            for column in 0..128 {
                let lightness = column as f64 / 128.0;
                let (r, g, b) = hsl_to_rgb(hue, saturation, lightness);
                table.push(
                    (gamma_channel(r, brightness) << 16)
                        | (gamma_channel(g, brightness) << 8)
                        | gamma_channel(b, brightness),
                );
            }
        }
        log::debug!("built hsl16 palette with brightness {}", brightness);
        Self {
            table: table.into_boxed_slice(),
        }
    }

    /// Index maps to itself; lets tests read interpolated colors straight from pixels.
    pub fn identity() -> Self {
        Self {
            table: (0..PALETTE_SIZE as u32).collect(),
        }
    }

    #[inline(always)]
    pub fn rgb(&self, hsl: i32) -> u32 {
        self.table[(hsl as usize) & (PALETTE_SIZE - 1)]
    }
}

fn hsl_to_rgb(hue: f64, saturation: f64, lightness: f64) -> (f64, f64, f64) {
    if saturation == 0.0 {
        return (lightness, lightness, lightness);
    }
    let q = if lightness < 0.5 {
        lightness * (saturation + 1.0)
    } else {
        lightness + saturation - lightness * saturation
    };
    let p = lightness * 2.0 - q;

    let mut t_r = hue + 1.0 / 3.0;
    if t_r > 1.0 {
        t_r -= 1.0;
    }
    let mut t_b = hue - 1.0 / 3.0;
    if t_b < 0.0 {
        t_b += 1.0;
    }

    let channel = |t: f64| {
        if t * 6.0 < 1.0 {
            p + (q - p) * 6.0 * t
        } else if t * 2.0 < 1.0 {
            q
        } else if t * 3.0 < 2.0 {
            p + (q - p) * (2.0 / 3.0 - t) * 6.0
        } else {
            p
        }
    };
    (channel(t_r), channel(hue), channel(t_b))
}

#[inline]
fn gamma_channel(value: f64, brightness: f64) -> u32 {
    let linear = ((value * 256.0) as i32).clamp(0, 255) as f64 / 256.0;
    ((linear.powf(brightness) * 256.0) as u32).min(255)
}

/// Blend `src` over `dst` with opacity `alpha` (255 = src only).
#[inline(always)]
pub fn alpha_blend(alpha: u32, dst: u32, src: u32) -> u32 {
    let inv = 0xFF - alpha;
    ((((dst & 0xFF00FF) * inv) >> 8) & 0xFF00FF)
        + ((((src & 0xFF00FF) * alpha) >> 8) & 0xFF00FF)
        + ((((src & 0xFF00) * alpha) >> 8) & 0xFF00)
        + ((((dst & 0xFF00) * inv) >> 8) & 0xFF00)
}

/// Scale a texel by a lightness value, `FULL_SHADE` leaves it unchanged.
/// 8.8 fixed point multiply per channel.
#[inline(always)]
pub fn shade_texel(texel: u32, shade: i32) -> u32 {
    let light_fp = (shade.clamp(0, FULL_SHADE) as u32) << 1;
    let r = (((texel >> 16) & 0xFF) * light_fp) >> 8;
    let g = (((texel >> 8) & 0xFF) * light_fp) >> 8;
    let b = ((texel & 0xFF) * light_fp) >> 8;
    (r.min(255) << 16) | (g.min(255) << 8) | b.min(255)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alpha_extremes_select_one_side() {
        let dst = 0x102030;
        let src = 0xF0E0D0;
        // 255 keeps a sliver of dst through the >> 8; channels land within one unit
        let opaque = alpha_blend(255, dst, src);
        for shift in [0, 8, 16] {
            let got = (opaque >> shift) & 0xFF;
            let want = (src >> shift) & 0xFF;
            assert!(got.abs_diff(want) <= 1, "channel {} got {:x}", shift, got);
        }
        let clear = alpha_blend(0, dst, src);
        for shift in [0, 8, 16] {
            let got = (clear >> shift) & 0xFF;
            let want = (dst >> shift) & 0xFF;
            assert!(got.abs_diff(want) <= 1);
        }
    }

    #[test]
    fn half_alpha_averages_channels() {
        let blended = alpha_blend(128, 0x000000, 0xFEFEFE);
        assert_eq!(blended, 0x7F7F7F);
    }

    #[test]
    fn full_shade_is_identity() {
        assert_eq!(shade_texel(0x336699, FULL_SHADE), 0x336699);
        assert_eq!(shade_texel(0x336699, 0), 0);
        assert_eq!(shade_texel(0x808080, 64), 0x404040);
    }

    #[test]
    fn palette_lightness_columns_ramp_up() {
        let palette = Palette::hsl16(0.8);
        // column 0 is black for every hue row
        assert_eq!(palette.rgb(0), 0);
        let dark = palette.rgb(40 * 128 + 10);
        let light = palette.rgb(40 * 128 + 100);
        let luma = |c: u32| ((c >> 16) & 0xFF) + ((c >> 8) & 0xFF) + (c & 0xFF);
        assert!(luma(light) > luma(dark));
        assert_eq!(Palette::identity().rgb(0x3F), 0x3F);
    }
}
