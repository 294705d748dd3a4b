/// Painter's-order visibility scheduling
///
/// Sweeps the tiles around the camera from the four corners of the draw
/// rectangle toward the camera tile. A tile only draws once every farther
/// neighbor is done, so emitting elements in sweep order lets nearer geometry
/// overwrite farther geometry without a depth buffer. Locs that cover several
/// tiles hold their tiles until all covered cells have drawn their ground.
pub mod operation;
pub mod queue;

pub use operation::DrawOperation;
pub use queue::{PaintQueue, QueueEntry};

use crate::config::RenderConfig;
use crate::error::{RenderError, Result};
use crate::perf::FUNCTION_COUNTERS;
use crate::scene::{
    ElementId, ElementKind, GroundObjectSlot, SceneGrid, SpanFlags, Tile, TileCoord, WallSide,
    WallSlot, MAX_SCENERY_PER_TILE,
};
use crate::{count_add, count_call};
use glam::IVec2;
use smallvec::SmallVec;

/// Progress of one tile through the sweep. Ordered: a tile at or before
/// `Ground` has not drawn its terrain yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum TileStep {
    /// Waiting for the tile below and the farther neighbors
    #[default]
    Pending,
    Ground,
    WaitingOnNeighbors,
    Locs,
    Notify,
    NearWall,
    Done,
}

/// Tile rectangle `[min_x, max_x) x [min_z, max_z)` drawn this frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawRect {
    pub min_x: i32,
    pub max_x: i32,
    pub min_z: i32,
    pub max_z: i32,
}

impl DrawRect {
    /// Square of `radius` tiles around the camera clamped to the grid, `None` when empty.
    pub fn around(camera: IVec2, radius: i32, width: i32, height: i32) -> Option<Self> {
        let rect = Self {
            min_x: (camera.x - radius).clamp(0, width),
            max_x: (camera.x + radius).clamp(0, width),
            min_z: (camera.y - radius).clamp(0, height),
            max_z: (camera.y + radius).clamp(0, height),
        };
        (rect.min_x < rect.max_x && rect.min_z < rect.max_z).then_some(rect)
    }

    #[inline]
    pub fn contains(&self, x: i32, z: i32) -> bool {
        x >= self.min_x && x < self.max_x && z >= self.min_z && z < self.max_z
    }

    /// Sweep start points: the four corners
    pub fn seeds(&self) -> [(i32, i32); 4] {
        [
            (self.min_x, self.min_z),
            (self.min_x, self.max_z - 1),
            (self.max_x - 1, self.min_z),
            (self.max_x - 1, self.max_z - 1),
        ]
    }

    /// Loc footprint `[x0, x1] x [z0, z1]` clamped to the rectangle
    #[inline]
    fn clamp_footprint(&self, anchor: TileCoord, size_x: u8, size_z: u8) -> (i32, i32, i32, i32) {
        (
            anchor.x.max(self.min_x),
            (anchor.x + size_x as i32 - 1).min(self.max_x - 1),
            anchor.z.max(self.min_z),
            (anchor.z + size_z as i32 - 1).min(self.max_z - 1),
        )
    }
}

/// Wall sides facing the camera. `camera` is the camera tile (x, z).
pub fn near_wall_flags(camera: IVec2, coord: TileCoord) -> WallSide {
    let mut flags = if coord.z < camera.y {
        WallSide::NORTH | WallSide::NORTHWEST | WallSide::NORTHEAST
    } else {
        WallSide::SOUTH | WallSide::SOUTHEAST | WallSide::SOUTHWEST
    };
    flags |= if coord.x < camera.x {
        WallSide::EAST | WallSide::NORTHEAST | WallSide::SOUTHEAST
    } else {
        WallSide::WEST | WallSide::NORTHWEST | WallSide::SOUTHWEST
    };
    flags
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduleStats {
    /// Queue pops that reached the state machine
    pub tiles_visited: u64,
    /// Pops that found a farther neighbor unfinished
    pub tiles_deferred: u64,
    pub operations: u64,
    /// Tiles in range left unfinished; nonzero only on the error path
    pub tiles_remaining: u64,
}

/// Fixed inputs of one sweep
struct Sweep<'a> {
    scene: &'a SceneGrid,
    camera: IVec2,
    rect: DrawRect,
    max_level: i32,
}

/// Which of the two through-wall decoration models faces the camera.
/// `far_pass` selects the comparison used while drawing the far side.
fn through_wall_uses_a(camera: IVec2, anchor: TileCoord, side: WallSide, far_pass: bool) -> bool {
    let x_diff = anchor.x - camera.x;
    let z_diff = anchor.z - camera.y;
    let x_near = if side == WallSide::NORTHEAST || side == WallSide::SOUTHEAST {
        -x_diff
    } else {
        x_diff
    };
    let z_near = if side == WallSide::SOUTHEAST || side == WallSide::SOUTHWEST {
        -z_diff
    } else {
        z_diff
    };
    if far_pass {
        z_near < x_near
    } else {
        z_near >= x_near
    }
}

/// Scratch and output of the painter's sweep, reused across frames.
#[derive(Debug, Default)]
pub struct VisibilityScheduler {
    steps: Vec<TileStep>,
    queue_counts: Vec<u32>,
    loc_drawn: Vec<bool>,
    queue: PaintQueue,
    ready: SmallVec<[ElementId; MAX_SCENERY_PER_TILE]>,
    operations: Vec<DrawOperation>,
    stats: ScheduleStats,
}

impl VisibilityScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn operations(&self) -> &[DrawOperation] {
        &self.operations
    }

    #[inline]
    pub fn stats(&self) -> &ScheduleStats {
        &self.stats
    }

    /// Step a tile reached in the last sweep
    pub fn tile_step(&self, scene: &SceneGrid, coord: TileCoord) -> Option<TileStep> {
        scene.index_of(coord).and_then(|i| self.steps.get(i).copied())
    }

    fn reset(&mut self, scene: &SceneGrid) {
        self.steps.clear();
        self.steps.resize(scene.tile_count(), TileStep::Pending);
        self.queue_counts.clear();
        self.queue_counts.resize(scene.tile_count(), 0);
        self.loc_drawn.clear();
        self.loc_drawn.resize(scene.element_count(), false);
        self.queue.clear();
        self.ready.clear();
        self.operations.clear();
        self.stats = ScheduleStats::default();
    }

    /// Build the draw list for a camera standing over `camera_tile` (x, z).
    ///
    /// Every in-range tile up to `config.max_level` ends the sweep done, or
    /// the sweep fails with `SchedulerDeadlock`.
    pub fn schedule(
        &mut self,
        scene: &SceneGrid,
        camera_tile: IVec2,
        config: &RenderConfig,
    ) -> Result<&[DrawOperation]> {
        count_call!(FUNCTION_COUNTERS.schedule_calls);
        self.reset(scene);

        let rect = match DrawRect::around(camera_tile, config.draw_radius, scene.width(), scene.height()) {
            Some(rect) if scene.levels() > 0 => rect,
            _ => {
                log::debug!("camera tile {:?} has no tiles in range", camera_tile);
                return Ok(&self.operations);
            }
        };

        let sweep = Sweep {
            scene,
            camera: camera_tile,
            rect,
            max_level: config.max_level as i32,
        };

        for (x, z) in rect.seeds() {
            if let Some(index) = scene.index_of(TileCoord::new(x, z, 0)) {
                self.enqueue(index, 0);
            }
            while let Some(entry) = self.queue.pop() {
                self.visit(&sweep, entry);
            }
        }

        self.stats.operations = self.operations.len() as u64;
        count_add!(FUNCTION_COUNTERS.tiles_visited, self.stats.tiles_visited);
        count_add!(FUNCTION_COUNTERS.tiles_deferred, self.stats.tiles_deferred);
        count_add!(FUNCTION_COUNTERS.draw_ops_emitted, self.stats.operations);

        self.check_coverage(&sweep)?;

        log::debug!(
            "scheduled {} operations over {}x{} tiles ({} visits, {} deferred)",
            self.operations.len(),
            rect.max_x - rect.min_x,
            rect.max_z - rect.min_z,
            self.stats.tiles_visited,
            self.stats.tiles_deferred
        );
        Ok(&self.operations)
    }

    /// Fail when an in-range tile at a drawn level never finished.
    ///
    /// Span flags always pair a tile with a neighbour that accepts it while
    /// waiting, so no scene built through `SceneGrid` is known to stall here.
    fn check_coverage(&mut self, sweep: &Sweep) -> Result<()> {
        let top = sweep.max_level.min(sweep.scene.levels() - 1);
        let mut unfinished = 0usize;
        let mut first = None;
        for level in 0..=top {
            for z in sweep.rect.min_z..sweep.rect.max_z {
                for x in sweep.rect.min_x..sweep.rect.max_x {
                    let coord = TileCoord::new(x, z, level);
                    let Some(index) = sweep.scene.index_of(coord) else {
                        continue;
                    };
                    if self.steps[index] != TileStep::Done {
                        unfinished += 1;
                        first.get_or_insert(coord);
                    }
                }
            }
        }
        self.stats.tiles_remaining = unfinished as u64;
        match first {
            Some(first) => {
                log::warn!("sweep stalled with {} unfinished tiles, first {:?}", unfinished, first);
                Err(RenderError::SchedulerDeadlock { unfinished, first })
            }
            None => Ok(()),
        }
    }

    #[inline]
    fn enqueue(&mut self, index: usize, priority: u8) {
        self.queue_counts[index] += 1;
        self.queue.push(index, priority);
    }

    /// Queue a same-level neighbor unless it is outside the rectangle or done.
    #[inline]
    fn enqueue_neighbor(&mut self, sweep: &Sweep, coord: TileCoord, priority: u8) {
        if !sweep.rect.contains(coord.x, coord.z) {
            return;
        }
        if let Some(index) = sweep.scene.index_of(coord) {
            if self.steps[index] != TileStep::Done {
                self.enqueue(index, priority);
            }
        }
    }

    /// Neighbors one step closer to the camera, with the span bit toward each
    fn camera_ward(sweep: &Sweep, coord: TileCoord) -> SmallVec<[(TileCoord, SpanFlags); 2]> {
        let mut out = SmallVec::new();
        if coord.x < sweep.camera.x {
            out.push((coord.offset(1, 0), SpanFlags::EAST));
        }
        if coord.x > sweep.camera.x {
            out.push((coord.offset(-1, 0), SpanFlags::WEST));
        }
        if coord.z < sweep.camera.y {
            out.push((coord.offset(0, 1), SpanFlags::NORTH));
        }
        if coord.z > sweep.camera.y {
            out.push((coord.offset(0, -1), SpanFlags::SOUTH));
        }
        out
    }

    fn visit(&mut self, sweep: &Sweep, entry: QueueEntry) {
        let index = entry.tile;
        self.queue_counts[index] -= 1;
        // Only the last outstanding enqueue of a tile is acted on
        if self.queue_counts[index] > 0 {
            return;
        }

        let scene = sweep.scene;
        let tile = scene.tile_at_index(index);
        let coord = scene.coord_of(index);

        if self.steps[index] == TileStep::Done {
            return;
        }
        if coord.level > sweep.max_level {
            self.steps[index] = TileStep::Done;
            return;
        }
        if tile.is_bridge {
            // Drawn by the tile above; only release the tiles waiting on it
            self.steps[index] = TileStep::Done;
            self.notify(sweep, coord, entry.priority);
            return;
        }
        self.stats.tiles_visited += 1;

        if self.steps[index] == TileStep::Pending {
            if !self.farther_tiles_done(sweep, tile, coord) {
                self.stats.tiles_deferred += 1;
                log::trace!("tile {:?} deferred", coord);
                return;
            }
            self.steps[index] = TileStep::Ground;
        }

        if self.steps[index] == TileStep::Ground {
            self.steps[index] = TileStep::WaitingOnNeighbors;
            self.emit_far_side(sweep, tile, coord);
            for (neighbor, span) in Self::camera_ward(sweep, coord) {
                if tile.spans.contains(span) {
                    self.enqueue_neighbor(sweep, neighbor, entry.priority);
                }
            }
        }

        let mut waiting = false;
        self.ready.clear();
        if self.steps[index] == TileStep::WaitingOnNeighbors {
            self.steps[index] = TileStep::Locs;
            for &loc in &tile.locs {
                if self.loc_drawn[loc.index()] {
                    continue;
                }
                if self.loc_blocked(sweep, loc, coord.level) {
                    waiting = true;
                } else {
                    self.ready.push(loc);
                }
            }
        }

        if self.steps[index] == TileStep::Locs {
            let ready = std::mem::take(&mut self.ready);
            for &loc in &ready {
                self.draw_loc(sweep, loc, coord);
            }
            self.ready = ready;
            self.steps[index] = if waiting {
                TileStep::WaitingOnNeighbors
            } else {
                TileStep::Notify
            };
        }

        if self.steps[index] == TileStep::Notify {
            self.notify(sweep, coord, entry.priority);
            self.steps[index] = TileStep::NearWall;
        }

        if self.steps[index] == TileStep::NearWall {
            self.emit_near_side(sweep, tile, coord);
            self.steps[index] = TileStep::Done;
        }
    }

    /// Queue the tile above and the camera-ward neighbors
    fn notify(&mut self, sweep: &Sweep, coord: TileCoord, priority: u8) {
        let scene = sweep.scene;
        if coord.level < scene.levels() - 1 {
            if let Some(above) = scene.index_of(coord.above()) {
                if self.steps[above] != TileStep::Done {
                    self.enqueue(above, priority);
                }
            }
        }
        for (neighbor, _) in Self::camera_ward(sweep, coord) {
            self.enqueue_neighbor(sweep, neighbor, priority);
        }
    }

    /// The tile below and each farther neighbor must be done; a neighbor this
    /// tile spans toward may instead be waiting on its locs.
    fn farther_tiles_done(&self, sweep: &Sweep, tile: &Tile, coord: TileCoord) -> bool {
        let scene = sweep.scene;
        if coord.level > 0 {
            match scene.index_of(coord.below()) {
                Some(below) if self.steps[below] == TileStep::Done => {}
                _ => return false,
            }
        }

        let (camera, rect) = (sweep.camera, sweep.rect);
        let mut farther: SmallVec<[(TileCoord, SpanFlags); 4]> = SmallVec::new();
        if coord.x >= camera.x && coord.x + 1 < rect.max_x {
            farther.push((coord.offset(1, 0), SpanFlags::EAST));
        }
        if coord.x <= camera.x && coord.x > rect.min_x {
            farther.push((coord.offset(-1, 0), SpanFlags::WEST));
        }
        if coord.z >= camera.y && coord.z + 1 < rect.max_z {
            farther.push((coord.offset(0, 1), SpanFlags::NORTH));
        }
        if coord.z <= camera.y && coord.z > rect.min_z {
            farther.push((coord.offset(0, -1), SpanFlags::SOUTH));
        }

        farther.into_iter().all(|(neighbor, span)| {
            let Some(other) = scene.index_of(neighbor) else {
                return true;
            };
            match self.steps[other] {
                TileStep::Done => true,
                TileStep::WaitingOnNeighbors => tile.spans.contains(span),
                _ => false,
            }
        })
    }

    /// A loc waits while any cell it covers has not drawn its ground.
    fn loc_blocked(&self, sweep: &Sweep, loc: ElementId, level: i32) -> bool {
        let element = sweep.scene.element(loc);
        let ElementKind::Loc { size_x, size_z } = element.kind else {
            return false;
        };
        let (x0, x1, z0, z1) = sweep.rect.clamp_footprint(element.anchor, size_x, size_z);
        for x in x0..=x1 {
            for z in z0..=z1 {
                if let Some(index) = sweep.scene.index_of(TileCoord::new(x, z, level)) {
                    if self.steps[index] <= TileStep::Ground {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Emit a loc once and release the rest of its footprint, camera side last.
    fn draw_loc(&mut self, sweep: &Sweep, loc: ElementId, coord: TileCoord) {
        if self.loc_drawn[loc.index()] {
            return;
        }
        self.loc_drawn[loc.index()] = true;
        self.operations.push(DrawOperation::Loc { coord, element: loc });

        let element = sweep.scene.element(loc);
        let ElementKind::Loc { size_x, size_z } = element.kind else {
            return;
        };
        let priority = if size_x > 1 || size_z > 1 {
            size_x.max(size_z)
        } else {
            0
        };

        let (x0, x1, z0, z1) = sweep.rect.clamp_footprint(element.anchor, size_x, size_z);
        let xs: SmallVec<[i32; 16]> = if element.anchor.x <= sweep.camera.x {
            (x0..=x1).collect()
        } else {
            (x0..=x1).rev().collect()
        };
        let zs: SmallVec<[i32; 16]> = if element.anchor.z <= sweep.camera.y {
            (z0..=z1).collect()
        } else {
            (z0..=z1).rev().collect()
        };

        for &x in &xs {
            for &z in &zs {
                if x == coord.x && z == coord.z {
                    continue;
                }
                if let Some(index) = sweep.scene.index_of(TileCoord::new(x, z, coord.level)) {
                    self.enqueue(index, priority);
                }
            }
        }
    }

    /// Wall decoration A (or its through-wall partner B) for one side of the tile
    fn push_wall_decor(&mut self, sweep: &Sweep, tile: &Tile, coord: TileCoord, sides: WallSide, far_pass: bool) {
        let Some(decor_a) = tile.wall_decor(WallSlot::A) else {
            return;
        };
        let ElementKind::WallDecor { side, through_wall, .. } = sweep.scene.element(decor_a).kind else {
            return;
        };
        if through_wall {
            let anchor = sweep.scene.element(decor_a).anchor;
            if through_wall_uses_a(sweep.camera, anchor, side, far_pass) {
                self.operations.push(DrawOperation::WallDecor {
                    coord,
                    element: decor_a,
                    slot: WallSlot::A,
                });
            } else if let Some(decor_b) = tile.wall_decor(WallSlot::B) {
                self.operations.push(DrawOperation::WallDecor {
                    coord,
                    element: decor_b,
                    slot: WallSlot::B,
                });
            }
        } else if side.intersects(sides) {
            self.operations.push(DrawOperation::WallDecor {
                coord,
                element: decor_a,
                slot: WallSlot::A,
            });
        }
    }

    /// Ground pass: underpass, terrain, far walls, ground clutter, far decoration.
    fn emit_far_side(&mut self, sweep: &Sweep, tile: &Tile, coord: TileCoord) {
        let scene = sweep.scene;
        let far = near_wall_flags(sweep.camera, coord).complement();

        if let Some(under_coord) = tile.bridge_underpass {
            if let Some(under) = scene.tile(under_coord) {
                if under.ground.is_some() {
                    self.operations.push(DrawOperation::Ground(under_coord));
                }
                if let Some(element) = under.wall(WallSlot::A) {
                    self.operations.push(DrawOperation::Wall {
                        coord: under_coord,
                        element,
                        slot: WallSlot::A,
                    });
                }
                for &loc in &under.locs {
                    if !self.loc_drawn[loc.index()] {
                        self.loc_drawn[loc.index()] = true;
                        self.operations.push(DrawOperation::Loc {
                            coord: under_coord,
                            element: loc,
                        });
                    }
                }
            }
        }

        if tile.ground.is_some() {
            self.operations.push(DrawOperation::Ground(coord));
        }

        for slot in [WallSlot::A, WallSlot::B] {
            self.push_wall_side(scene, tile, coord, slot, far);
        }

        if let Some(element) = tile.ground_decor {
            self.operations.push(DrawOperation::GroundDecor { coord, element });
        }

        for slot in GroundObjectSlot::ALL {
            if let Some(element) = tile.ground_object(slot) {
                self.operations.push(DrawOperation::GroundObject { coord, element, slot });
            }
        }

        self.push_wall_decor(sweep, tile, coord, far, true);
    }

    /// Near pass: decoration then walls facing the camera.
    fn emit_near_side(&mut self, sweep: &Sweep, tile: &Tile, coord: TileCoord) {
        let near = near_wall_flags(sweep.camera, coord);
        self.push_wall_decor(sweep, tile, coord, near, false);
        for slot in [WallSlot::A, WallSlot::B] {
            self.push_wall_side(sweep.scene, tile, coord, slot, near);
        }
    }

    fn push_wall_side(&mut self, scene: &SceneGrid, tile: &Tile, coord: TileCoord, slot: WallSlot, sides: WallSide) {
        let Some(element) = tile.wall(slot) else {
            return;
        };
        if let ElementKind::Wall { side, .. } = scene.element(element).kind {
            if side.intersects(sides) {
                self.operations.push(DrawOperation::Wall { coord, element, slot });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{ModelId, Placement};

    fn config(radius: i32) -> RenderConfig {
        RenderConfig {
            draw_radius: radius,
            ..Default::default()
        }
    }

    fn flat_scene(size: i32, levels: i32) -> SceneGrid {
        let mut scene = SceneGrid::new(size, size, levels);
        for x in 0..size {
            for z in 0..size {
                scene
                    .set_ground(TileCoord::new(x, z, 0), ModelId(0), Placement::default())
                    .unwrap();
            }
        }
        scene
    }

    #[test]
    fn near_wall_flags_face_the_camera() {
        let camera = IVec2::new(5, 5);
        let sw_of_camera = near_wall_flags(camera, TileCoord::new(2, 2, 0));
        assert_eq!(
            sw_of_camera,
            WallSide::NORTH
                | WallSide::NORTHWEST
                | WallSide::NORTHEAST
                | WallSide::EAST
                | WallSide::SOUTHEAST
        );
        let at_camera = near_wall_flags(camera, TileCoord::new(5, 5, 0));
        assert!(at_camera.contains(WallSide::SOUTH | WallSide::WEST));
    }

    #[test]
    fn draw_rect_is_clamped_to_grid() {
        let rect = DrawRect::around(IVec2::new(1, 9), 3, 10, 10).unwrap();
        assert_eq!(rect, DrawRect { min_x: 0, max_x: 4, min_z: 6, max_z: 10 });
        assert!(DrawRect::around(IVec2::new(-20, 0), 3, 10, 10).is_none());
    }

    #[test]
    fn every_ground_tile_is_drawn_once() {
        let scene = flat_scene(12, 1);
        let mut scheduler = VisibilityScheduler::new();
        let ops = scheduler.schedule(&scene, IVec2::new(6, 4), &config(25)).unwrap();
        assert_eq!(ops.len(), 144);
        let mut seen: Vec<TileCoord> = ops.iter().map(|op| op.coord()).collect();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 144);
        assert_eq!(scheduler.stats().tiles_remaining, 0);
    }

    #[test]
    fn empty_rectangle_schedules_nothing() {
        let scene = flat_scene(4, 1);
        let mut scheduler = VisibilityScheduler::new();
        let ops = scheduler.schedule(&scene, IVec2::new(100, 100), &config(5)).unwrap();
        assert!(ops.is_empty());
    }

    #[test]
    fn through_wall_decor_picks_quadrant() {
        let camera = IVec2::new(0, 0);
        let anchor = TileCoord::new(3, 1, 0);
        // x_near = 3, z_near = 1
        assert!(through_wall_uses_a(camera, anchor, WallSide::NORTHWEST, true));
        assert!(!through_wall_uses_a(camera, anchor, WallSide::NORTHWEST, false));
        // NE flips x: x_near = -3
        assert!(!through_wall_uses_a(camera, anchor, WallSide::NORTHEAST, true));
        assert!(through_wall_uses_a(camera, anchor, WallSide::NORTHEAST, false));
    }

    #[test]
    fn unfinished_tiles_are_reported() {
        let scene = flat_scene(3, 1);
        let mut scheduler = VisibilityScheduler::new();
        scheduler.reset(&scene);
        let sweep = Sweep {
            scene: &scene,
            camera: IVec2::new(1, 1),
            rect: DrawRect::around(IVec2::new(1, 1), 5, 3, 3).unwrap(),
            max_level: 4,
        };
        let err = scheduler.check_coverage(&sweep).unwrap_err();
        assert_eq!(
            err,
            RenderError::SchedulerDeadlock {
                unfinished: 9,
                first: TileCoord::new(0, 0, 0)
            }
        );
        assert_eq!(scheduler.stats().tiles_remaining, 9);
    }
}
