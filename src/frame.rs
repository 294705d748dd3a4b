/// Per-frame scratch
/// Everything a frame allocates lives here and is cleared in place,
/// so steady-state frames do not touch the allocator.
use crate::camera::ProjectedVertex;
use crate::scheduler::{DrawOperation, VisibilityScheduler};
use crate::sorter::FaceSorter;
use glam::IVec2;

/// Inclusive pixel bounds of a projected mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenRect {
    pub min: IVec2,
    pub max: IVec2,
}

impl ScreenRect {
    pub fn full(width: usize, height: usize) -> Self {
        Self {
            min: IVec2::ZERO,
            max: IVec2::new(width as i32 - 1, height as i32 - 1),
        }
    }

    /// Bounds of the vertices in front of the near plane. A mesh reaching
    /// behind the plane can clip to any part of the screen and gets `full`.
    pub fn of_mesh(vertices: &[ProjectedVertex], width: usize, height: usize) -> Option<Self> {
        let mut rect: Option<Self> = None;
        let mut behind = false;
        for v in vertices {
            if !v.visible {
                behind = true;
                continue;
            }
            rect = Some(match rect {
                None => Self { min: v.screen, max: v.screen },
                Some(r) => Self {
                    min: r.min.min(v.screen),
                    max: r.max.max(v.screen),
                },
            });
        }
        match rect {
            Some(_) if behind => Some(Self::full(width, height)),
            other => other,
        }
    }

    pub fn intersects_target(&self, width: usize, height: usize) -> bool {
        self.max.x >= 0 && self.max.y >= 0 && self.min.x < width as i32 && self.min.y < height as i32
    }

    #[inline]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.min.x && x <= self.max.x && y >= self.min.y && y <= self.max.y
    }
}

/// Screen bounds of one drawn operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshRect {
    pub operation: DrawOperation,
    pub rect: ScreenRect,
}

#[derive(Default)]
pub struct FrameArena {
    pub scheduler: VisibilityScheduler,
    pub sorter: FaceSorter,
    pub vertices: Vec<ProjectedVertex>,
    pub order: Vec<u32>,
    pub mesh_rects: Vec<MeshRect>,
}

impl FrameArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.vertices.clear();
        self.order.clear();
        self.mesh_rects.clear();
    }

    /// Draw list of the last frame
    pub fn operations(&self) -> &[DrawOperation] {
        self.scheduler.operations()
    }

    /// Nearest drawn operation whose screen bounds contain the pixel
    pub fn pick(&self, x: i32, y: i32) -> Option<DrawOperation> {
        self.mesh_rects
            .iter()
            .rev()
            .find(|m| m.rect.contains(x, y))
            .map(|m| m.operation)
    }
}
