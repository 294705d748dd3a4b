/// Near-plane clipping in camera space
///
/// Faces crossing `z = near` are cut with Sutherland-Hodgman against that
/// single plane, so the result is empty, a triangle or a quad. Intersections
/// are parameterized from the inside vertex and projected straight onto the
/// near plane; inside vertices project exactly as unclipped ones do.
use super::ScreenVertex;
use crate::camera::project_at;
use glam::{IVec2, IVec3};

/// Camera-space vertex with its interpolated attributes
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClipVertex {
    pub camera: IVec3,
    pub color: i32,
    pub u: f32,
    pub v: f32,
}

impl ClipVertex {
    pub fn new(camera: IVec3, color: i32) -> Self {
        Self {
            camera,
            color,
            ..Default::default()
        }
    }

    pub fn with_uv(mut self, u: f32, v: f32) -> Self {
        self.u = u;
        self.v = v;
        self
    }

    #[inline]
    fn project(&self, focal: i32, center: IVec2) -> ScreenVertex {
        let p = project_at(self.camera.x, self.camera.y, self.camera.z, focal, center);
        ScreenVertex::textured(p.x, p.y, self.camera.z, self.u, self.v, self.color)
    }
}

/// Output of clipping one face: 0, 3 or 4 vertices in boundary order.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClippedPolygon {
    pub vertices: [ScreenVertex; 4],
    pub len: usize,
}

impl ClippedPolygon {
    #[inline]
    fn push(&mut self, vertex: ScreenVertex) {
        self.vertices[self.len] = vertex;
        self.len += 1;
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len < 3
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.len.saturating_sub(2)
    }

    /// Fan triangulation: (0, 1, 2) and, for quads, (0, 2, 3)
    pub fn triangles(&self) -> impl Iterator<Item = [ScreenVertex; 3]> + '_ {
        (0..self.triangle_count())
            .map(move |i| [self.vertices[0], self.vertices[i + 1], self.vertices[i + 2]])
    }
}

pub trait NearClipper: Send + Sync {
    /// Screen vertex where the edge from `inside` to `outside` crosses `z = near`.
    fn intersect(
        &self,
        inside: &ClipVertex,
        outside: &ClipVertex,
        near: i32,
        focal: i32,
        center: IVec2,
    ) -> ScreenVertex;

    fn name(&self) -> &'static str;

    /// Clip a face against `z = near` and project what remains.
    fn clip(&self, face: &[ClipVertex; 3], near: i32, focal: i32, center: IVec2) -> ClippedPolygon {
        let mut output = ClippedPolygon::default();

        let mut prev = &face[2];
        let mut prev_inside = prev.camera.z >= near;

        for curr in face.iter() {
            let curr_inside = curr.camera.z >= near;

            match (prev_inside, curr_inside) {
                (true, true) => output.push(curr.project(focal, center)),
                (true, false) => output.push(self.intersect(prev, curr, near, focal, center)),
                (false, true) => {
                    output.push(self.intersect(curr, prev, near, focal, center));
                    output.push(curr.project(focal, center));
                }
                (false, false) => {}
            }

            prev = curr;
            prev_inside = curr_inside;
        }

        output
    }
}

/// 16.16 fixed-point intersection
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegerClipper;

impl NearClipper for IntegerClipper {
    #[inline]
    fn intersect(
        &self,
        inside: &ClipVertex,
        outside: &ClipVertex,
        near: i32,
        focal: i32,
        center: IVec2,
    ) -> ScreenVertex {
        let (a, b) = (inside.camera.as_i64vec3(), outside.camera.as_i64vec3());
        let near64 = near as i64;
        let t16 = ((a.z - near64) << 16) / (a.z - b.z);

        let scale = near64 << 16;
        let axis = |from: i64, to: i64| ((from << 16) + (to - from) * t16) * focal as i64;
        let x = center.x + axis(a.x, b.x).div_euclid(scale) as i32;
        let y = center.y + axis(a.y, b.y).div_euclid(scale) as i32;

        let color = inside.color + (((outside.color - inside.color) as i64 * t16) >> 16) as i32;
        let t = t16 as f32 / 65536.0;
        ScreenVertex::textured(
            x,
            y,
            near,
            inside.u + (outside.u - inside.u) * t,
            inside.v + (outside.v - inside.v) * t,
            color,
        )
    }

    fn name(&self) -> &'static str {
        "integer"
    }
}

/// f32 intersection
#[derive(Debug, Clone, Copy, Default)]
pub struct FloatClipper;

impl NearClipper for FloatClipper {
    #[inline]
    fn intersect(
        &self,
        inside: &ClipVertex,
        outside: &ClipVertex,
        near: i32,
        focal: i32,
        center: IVec2,
    ) -> ScreenVertex {
        let (a, b) = (inside.camera.as_vec3(), outside.camera.as_vec3());
        let t = (a.z - near as f32) / (a.z - b.z);
        let p = a + (b - a) * t;
        let scale = focal as f32 / near as f32;

        ScreenVertex::textured(
            center.x + (p.x * scale).floor() as i32,
            center.y + (p.y * scale).floor() as i32,
            near,
            inside.u + (outside.u - inside.u) * t,
            inside.v + (outside.v - inside.v) * t,
            (inside.color as f32 + (outside.color - inside.color) as f32 * t).floor() as i32,
        )
    }

    fn name(&self) -> &'static str {
        "float"
    }
}
