/// Fixed-point camera and projection
/// Positions are world units (128 per tile), angles are 0..2048 per turn.
use crate::config::RenderConfig;
use crate::error::{RenderError, Result};
use crate::scene::{Placement, TILE_SIZE};
use glam::{IVec2, IVec3};
use once_cell::sync::Lazy;

/// Angle units per full turn
pub const ANGLE_UNITS: i32 = 2048;
/// Fixed-point scale of the trig tables
pub const TRIG_SCALE: i32 = 1 << 16;

/// Sine and cosine tables scaled by 65536, one entry per angle unit
pub struct TrigTables {
    pub sin: Box<[i32]>,
    pub cos: Box<[i32]>,
}

impl TrigTables {
    fn build() -> Self {
        let step = std::f64::consts::TAU / ANGLE_UNITS as f64;
        let sin = (0..ANGLE_UNITS)
            .map(|i| ((i as f64 * step).sin() * TRIG_SCALE as f64) as i32)
            .collect();
        let cos = (0..ANGLE_UNITS)
            .map(|i| ((i as f64 * step).cos() * TRIG_SCALE as f64) as i32)
            .collect();
        Self { sin, cos }
    }
}

pub static TRIG: Lazy<TrigTables> = Lazy::new(TrigTables::build);

/// Sine/cosine pair for one angle, looked up once per mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rotation {
    sin: i64,
    cos: i64,
}

impl Rotation {
    #[inline]
    pub fn new(angle: i32) -> Self {
        let index = angle.rem_euclid(ANGLE_UNITS) as usize;
        Self {
            sin: TRIG.sin[index] as i64,
            cos: TRIG.cos[index] as i64,
        }
    }

    /// Rotate the pair (a, b) in the plane they span
    #[inline(always)]
    fn apply(self, a: i32, b: i32) -> (i32, i32) {
        let (a, b) = (a as i64, b as i64);
        (
            ((a * self.cos + b * self.sin) >> 16) as i32,
            ((b * self.cos - a * self.sin) >> 16) as i32,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Camera {
    pub position: IVec3,
    pub pitch: i32,
    pub yaw: i32,
    pub roll: i32,
    pub near_plane_z: i32,
    pub focal_length: i32,
}

impl Camera {
    pub fn new(position: IVec3, pitch: i32, yaw: i32) -> Self {
        let defaults = RenderConfig::default();
        Self {
            position,
            pitch,
            yaw,
            roll: 0,
            near_plane_z: defaults.near_plane_z,
            focal_length: defaults.focal_length,
        }
    }

    /// Take near plane and focal length from the config
    pub fn with_config(mut self, config: &RenderConfig) -> Self {
        self.near_plane_z = config.near_plane_z;
        self.focal_length = config.focal_length;
        self
    }

    pub fn validate(&self) -> Result<()> {
        for (name, angle) in [("pitch", self.pitch), ("yaw", self.yaw), ("roll", self.roll)] {
            if !(0..ANGLE_UNITS).contains(&angle) {
                return Err(RenderError::InvalidCamera(format!(
                    "{} {} is outside 0..{}",
                    name, angle, ANGLE_UNITS
                )));
            }
        }
        if self.near_plane_z <= 0 {
            return Err(RenderError::InvalidCamera(format!(
                "near plane {} must be positive",
                self.near_plane_z
            )));
        }
        if self.focal_length <= 0 {
            return Err(RenderError::InvalidCamera(format!(
                "focal length {} must be positive",
                self.focal_length
            )));
        }
        Ok(())
    }

    /// Tile column and row the camera stands over
    #[inline]
    pub fn tile(&self) -> IVec2 {
        IVec2::new(
            self.position.x.div_euclid(TILE_SIZE),
            self.position.z.div_euclid(TILE_SIZE),
        )
    }

    pub fn view(&self) -> ViewTransform {
        ViewTransform {
            origin: self.position,
            yaw: Rotation::new(self.yaw),
            pitch: Rotation::new(self.pitch),
            roll: Rotation::new(self.roll),
            near_plane_z: self.near_plane_z,
            focal_length: self.focal_length,
        }
    }
}

/// Camera rotations resolved for one frame
#[derive(Debug, Clone, Copy)]
pub struct ViewTransform {
    origin: IVec3,
    yaw: Rotation,
    pitch: Rotation,
    roll: Rotation,
    pub near_plane_z: i32,
    pub focal_length: i32,
}

impl ViewTransform {
    /// Model-local vertex to camera space: model yaw, translate, camera yaw, pitch, roll.
    #[inline]
    pub fn to_camera_space(&self, local: IVec3, model_yaw: Rotation, placement: &Placement) -> IVec3 {
        let (x, z) = model_yaw.apply(local.x, local.z);
        let rel = IVec3::new(x, local.y, z) + (placement.position - self.origin);

        let (x, z) = self.yaw.apply(rel.x, rel.z);
        let (y, z) = self.pitch.apply_vertical(rel.y, z);
        let (x, y) = self.roll.apply(x, y);
        IVec3::new(x, y, z)
    }

    /// Perspective divide around `center`; `None` behind the near plane.
    #[inline]
    pub fn project(&self, p: IVec3, center: IVec2) -> Option<IVec2> {
        if p.z < self.near_plane_z {
            return None;
        }
        Some(project_at(p.x, p.y, p.z, self.focal_length, center))
    }
}

impl Rotation {
    /// Pitch rotates (y, z) with the opposite handedness of yaw
    #[inline(always)]
    fn apply_vertical(self, y: i32, z: i32) -> (i32, i32) {
        let (y, z) = (y as i64, z as i64);
        (
            ((y * self.cos - z * self.sin) >> 16) as i32,
            ((y * self.sin + z * self.cos) >> 16) as i32,
        )
    }
}

/// One mesh vertex after the view transform
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectedVertex {
    pub camera: IVec3,
    /// Pixel position; meaningful only when `visible`
    pub screen: IVec2,
    /// Camera depth relative to the mesh origin
    pub depth: i32,
    /// In front of the near plane
    pub visible: bool,
}

/// `center + p * focal / z`, rounding toward negative infinity
#[inline(always)]
pub fn project_at(x: i32, y: i32, z: i32, focal: i32, center: IVec2) -> IVec2 {
    let z = z as i64;
    let focal = focal as i64;
    IVec2::new(
        center.x + (x as i64 * focal).div_euclid(z) as i32,
        center.y + (y as i64 * focal).div_euclid(z) as i32,
    )
}
