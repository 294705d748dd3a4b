/// Multi-face mesh as stored in the scene
use crate::error::{RenderError, Result};
use once_cell::sync::OnceCell;

/// Per-face color source.
///
/// Untextured faces carry 16-bit HSL palette indices. Textured faces carry
/// lightness values (0..=127) that scale the sampled texels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceShade {
    Flat(i32),
    Gouraud([i32; 3]),
    Hidden,
}

impl FaceShade {
    /// Decode the packed triple used by mesh data: `c == -1` marks a flat face,
    /// `c == -2` a hidden one.
    pub fn from_raw(a: i32, b: i32, c: i32) -> Self {
        match c {
            -2 => FaceShade::Hidden,
            -1 => FaceShade::Flat(a),
            _ => FaceShade::Gouraud([a, b, c]),
        }
    }

    /// Per-vertex values, flat faces repeat their single value.
    #[inline]
    pub fn corners(self) -> Option<[i32; 3]> {
        match self {
            FaceShade::Flat(c) => Some([c, c, c]),
            FaceShade::Gouraud(c) => Some(c),
            FaceShade::Hidden => None,
        }
    }
}

/// Rotation-invariant extent of a model around its vertical axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BoundsCylinder {
    pub radius: i32,
    pub min_y: i32,
    pub max_y: i32,
    /// Largest distance any vertex can have from the origin under any yaw
    pub min_depth_any_rotation: i32,
}

impl BoundsCylinder {
    pub fn compute(xs: &[i32], ys: &[i32], zs: &[i32]) -> Self {
        let mut max_radius_sq: i64 = 0;
        let mut min_y = 0;
        let mut max_y = 0;
        for i in 0..xs.len().min(ys.len()).min(zs.len()) {
            let (x, y, z) = (xs[i] as i64, ys[i], zs[i] as i64);
            max_radius_sq = max_radius_sq.max(x * x + z * z);
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }

        let radius = (max_radius_sq as f64).sqrt().ceil() as i32;
        let r_sq = radius as f64 * radius as f64;
        let low = (r_sq + min_y as f64 * min_y as f64).sqrt() as i32;
        let high = (r_sq + max_y as f64 * max_y as f64).sqrt() as i32;

        Self {
            radius,
            min_y,
            max_y,
            min_depth_any_rotation: low.max(high) + 1,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Model {
    pub vertices_x: Vec<i32>,
    pub vertices_y: Vec<i32>,
    pub vertices_z: Vec<i32>,
    pub faces: Vec<[u16; 3]>,
    pub face_shades: Vec<FaceShade>,
    /// Opacity per face, 255 = opaque
    pub face_alphas: Option<Vec<u8>>,
    /// Layering class per face, 0..=11
    pub face_priorities: Option<Vec<u8>>,
    pub face_textures: Option<Vec<Option<u16>>>,
    /// Index into `texture_pmn`; `None` maps the face's own vertices
    pub face_texture_coords: Option<Vec<Option<u16>>>,
    /// Texture space triples (origin P, u axis M, v axis N) as vertex indices
    pub texture_pmn: Vec<[u16; 3]>,
    bounds: OnceCell<BoundsCylinder>,
}

impl Model {
    pub fn new(
        vertices_x: Vec<i32>,
        vertices_y: Vec<i32>,
        vertices_z: Vec<i32>,
        faces: Vec<[u16; 3]>,
        face_shades: Vec<FaceShade>,
    ) -> Self {
        Self {
            vertices_x,
            vertices_y,
            vertices_z,
            faces,
            face_shades,
            ..Default::default()
        }
    }

    pub fn with_alphas(mut self, alphas: Vec<u8>) -> Self {
        self.face_alphas = Some(alphas);
        self
    }

    pub fn with_priorities(mut self, priorities: Vec<u8>) -> Self {
        self.face_priorities = Some(priorities);
        self
    }

    pub fn with_textures(
        mut self,
        textures: Vec<Option<u16>>,
        coords: Option<Vec<Option<u16>>>,
        pmn: Vec<[u16; 3]>,
    ) -> Self {
        self.face_textures = Some(textures);
        self.face_texture_coords = coords;
        self.texture_pmn = pmn;
        self
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices_x.len()
    }

    #[inline]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Computed on first use, then cached
    pub fn bounds(&self) -> &BoundsCylinder {
        self.bounds
            .get_or_init(|| BoundsCylinder::compute(&self.vertices_x, &self.vertices_y, &self.vertices_z))
    }

    #[inline]
    pub fn face_alpha(&self, face: usize) -> u8 {
        self.face_alphas
            .as_ref()
            .and_then(|a| a.get(face).copied())
            .unwrap_or(255)
    }

    #[inline]
    pub fn face_texture(&self, face: usize) -> Option<u16> {
        self.face_textures
            .as_ref()
            .and_then(|t| t.get(face).copied())
            .flatten()
    }

    /// Vertex indices spanning the texture space of a textured face
    pub fn texture_space(&self, face: usize) -> [u16; 3] {
        let mapped = self
            .face_texture_coords
            .as_ref()
            .and_then(|c| c.get(face).copied())
            .flatten()
            .and_then(|i| self.texture_pmn.get(i as usize).copied());
        mapped.unwrap_or(self.faces[face])
    }

    /// Every face references existing vertices and attribute arrays match the face count
    pub fn validate(&self) -> Result<()> {
        let vertices = self.vertex_count();
        let faces = self.face_count();
        let malformed = |reason: String| Err(RenderError::MalformedModel(reason));

        if self.vertices_y.len() != vertices || self.vertices_z.len() != vertices {
            return malformed(format!(
                "vertex arrays have lengths {}/{}/{}",
                vertices,
                self.vertices_y.len(),
                self.vertices_z.len()
            ));
        }
        if self.face_shades.len() != faces {
            return malformed(format!("{} shades for {} faces", self.face_shades.len(), faces));
        }
        let attributes = [
            ("alphas", self.face_alphas.as_ref().map(Vec::len)),
            ("priorities", self.face_priorities.as_ref().map(Vec::len)),
            ("textures", self.face_textures.as_ref().map(Vec::len)),
            ("texture coords", self.face_texture_coords.as_ref().map(Vec::len)),
        ];
        for (name, len) in attributes {
            if let Some(len) = len.filter(|&len| len != faces) {
                return malformed(format!("{} {} for {} faces", len, name, faces));
            }
        }
        let out_of_range = self
            .faces
            .iter()
            .chain(self.texture_pmn.iter())
            .find(|f| f.iter().any(|&v| v as usize >= vertices));
        if let Some(face) = out_of_range {
            return malformed(format!("face {:?} indexes past {} vertices", face, vertices));
        }
        Ok(())
    }

    pub fn is_well_formed(&self) -> bool {
        self.validate().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_color_sentinels_decode() {
        assert_eq!(FaceShade::from_raw(5, 0, -2), FaceShade::Hidden);
        assert_eq!(FaceShade::from_raw(5, 0, -1), FaceShade::Flat(5));
        assert_eq!(FaceShade::from_raw(1, 2, 3), FaceShade::Gouraud([1, 2, 3]));
        assert_eq!(FaceShade::Flat(9).corners(), Some([9, 9, 9]));
    }

    #[test]
    fn bounds_cylinder_covers_every_vertex() {
        let model = Model::new(
            vec![30, -40, 0],
            vec![-10, 20, 5],
            vec![40, 30, 0],
            vec![[0, 1, 2]],
            vec![FaceShade::Flat(0)],
        );
        let bounds = model.bounds();
        assert_eq!(bounds.radius, 50);
        assert_eq!(bounds.min_y, -10);
        assert_eq!(bounds.max_y, 20);
        // sqrt(50^2 + 20^2) = 53.85
        assert_eq!(bounds.min_depth_any_rotation, 54);
    }

    #[test]
    fn texture_space_falls_back_to_face_vertices() {
        let model = Model::new(
            vec![0, 1, 2, 3],
            vec![0; 4],
            vec![0; 4],
            vec![[0, 1, 2], [1, 2, 3]],
            vec![FaceShade::Flat(0); 2],
        )
        .with_textures(vec![Some(1), Some(1)], Some(vec![Some(0), None]), vec![[3, 2, 1]]);

        assert_eq!(model.texture_space(0), [3, 2, 1]);
        assert_eq!(model.texture_space(1), [1, 2, 3]);
        assert!(model.is_well_formed());
    }

    #[test]
    fn malformed_models_are_rejected() {
        let triangle = || {
            Model::new(
                vec![0, 10, 0],
                vec![0; 3],
                vec![0, 0, 10],
                vec![[0, 1, 2]],
                vec![FaceShade::Flat(0)],
            )
        };
        assert_eq!(triangle().validate(), Ok(()));

        let dangling = Model::new(vec![0], vec![0], vec![0], vec![[0, 1, 2]], vec![FaceShade::Flat(0)]);
        assert!(matches!(dangling.validate(), Err(RenderError::MalformedModel(_))));

        let short_shades = Model::new(vec![0; 3], vec![0; 3], vec![0; 3], vec![[0, 1, 2]], Vec::new());
        assert!(matches!(short_shades.validate(), Err(RenderError::MalformedModel(_))));

        let ragged = Model::new(vec![0; 3], vec![0; 2], vec![0; 3], vec![[0, 1, 2]], vec![FaceShade::Flat(0)]);
        assert!(!ragged.is_well_formed());

        assert!(!triangle().with_priorities(vec![0, 1]).is_well_formed());
        assert!(!triangle().with_textures(vec![Some(1)], None, vec![[0, 1, 7]]).is_well_formed());
    }
}
