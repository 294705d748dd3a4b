/// Triangle edge walking
///
/// Horizontal positions step in 16.16 fixed point with an exact remainder, so
/// after any number of rows `x16` equals `floor(x * 65536)` of the true edge.
/// Colors step in 15-bit fixed point, texture terms in `PERSP_BITS` fixed point.
use super::ScreenVertex;
use glam::I64Vec3;

pub const SUBPIXEL_BITS: u32 = 16;
pub const COLOR_BITS: u32 = 15;
/// Fraction bits of the (1/z, u/z, v/z) interpolants
pub const PERSP_BITS: u32 = 28;

/// Smallest integer pixel column at or right of a 16.16 position
#[inline(always)]
pub fn ceil_x16(x16: i64) -> i64 {
    (x16 + (1 << SUBPIXEL_BITS) - 1) >> SUBPIXEL_BITS
}

/// Round a 15-bit fixed-point color to its integer value
#[inline(always)]
pub fn round_color15(c15: i64) -> i32 {
    ((c15 + (1 << (COLOR_BITS - 1))) >> COLOR_BITS) as i32
}

#[derive(Debug, Clone, Copy)]
pub struct Edge {
    x16: i64,
    rem: i64,
    step: i64,
    step_rem: i64,
    dy: i64,
    color15: i64,
    color_step: i64,
    /// (1/z, u/z, v/z)
    persp: I64Vec3,
    persp_step: I64Vec3,
}

impl Edge {
    /// Edge from `top` down to `bottom` (`bottom.y > top.y`), positioned at row `y`.
    pub fn new(top: &ScreenVertex, bottom: &ScreenVertex, y: i32) -> Self {
        debug_assert!(bottom.y > top.y);
        let dy = (bottom.y - top.y) as i64;
        let rows = (y - top.y) as i64;

        let dx16 = ((bottom.x - top.x) as i64) << SUBPIXEL_BITS;
        let numerator = ((top.x as i64) << SUBPIXEL_BITS) * dy + dx16 * rows;

        let dc15 = ((bottom.color - top.color) as i64) << COLOR_BITS;
        let color_step = dc15 / dy;

        let top_persp = top.perspective_terms();
        let persp_step = (bottom.perspective_terms() - top_persp) / dy;

        Self {
            x16: numerator.div_euclid(dy),
            rem: numerator.rem_euclid(dy),
            step: dx16.div_euclid(dy),
            step_rem: dx16.rem_euclid(dy),
            dy,
            color15: ((top.color as i64) << COLOR_BITS) + color_step * rows,
            color_step,
            persp: top_persp + persp_step * rows,
            persp_step,
        }
    }

    #[inline(always)]
    pub fn x16(&self) -> i64 {
        self.x16
    }

    #[inline(always)]
    pub fn color15(&self) -> i64 {
        self.color15
    }

    #[inline(always)]
    pub fn persp(&self) -> I64Vec3 {
        self.persp
    }

    /// Step one row down
    #[inline(always)]
    pub fn advance(&mut self) {
        self.x16 += self.step;
        self.rem += self.step_rem;
        if self.rem >= self.dy {
            self.x16 += 1;
            self.rem -= self.dy;
        }
        self.color15 += self.color_step;
        self.persp += self.persp_step;
    }
}

/// Triangle vertices sorted top to bottom with the side the middle vertex lies on.
pub struct TriangleSetup {
    pub a: ScreenVertex,
    pub b: ScreenVertex,
    pub c: ScreenVertex,
    /// Middle vertex lies left of the long edge A->C
    pub middle_left: bool,
}

impl TriangleSetup {
    /// `None` for zero-area triangles
    pub fn new(tri: &[ScreenVertex; 3]) -> Option<Self> {
        let mut v = *tri;
        if v[1].y < v[0].y {
            v.swap(0, 1);
        }
        if v[2].y < v[1].y {
            v.swap(1, 2);
        }
        if v[1].y < v[0].y {
            v.swap(0, 1);
        }
        let [a, b, c] = v;

        let cross = (b.x - a.x) as i64 * (c.y - a.y) as i64
            - (b.y - a.y) as i64 * (c.x - a.x) as i64;
        if cross == 0 {
            return None;
        }
        Some(Self {
            a,
            b,
            c,
            middle_left: cross < 0,
        })
    }

    /// Visit every row in `[top, bottom)` clipped to `[0, height)` with its
    /// (left, right) edges.
    pub fn walk<F>(&self, height: i32, mut row: F)
    where
        F: FnMut(i32, &Edge, &Edge),
    {
        let (a, b, c) = (&self.a, &self.b, &self.c);
        let y_top = a.y.max(0);
        let y_mid = b.y.clamp(y_top, height.max(y_top));
        let y_bottom = c.y.min(height);
        if y_top >= y_bottom {
            return;
        }

        let mut long = Edge::new(a, c, y_top);

        if y_top < y_mid {
            let mut short = Edge::new(a, b, y_top);
            for y in y_top..y_mid {
                if self.middle_left {
                    row(y, &short, &long);
                } else {
                    row(y, &long, &short);
                }
                short.advance();
                long.advance();
            }
        }

        let y_start = y_mid.max(y_top);
        if y_start < y_bottom {
            let mut short = Edge::new(b, c, y_start);
            for y in y_start..y_bottom {
                if self.middle_left {
                    row(y, &short, &long);
                } else {
                    row(y, &long, &short);
                }
                short.advance();
                long.advance();
            }
        }
    }
}
