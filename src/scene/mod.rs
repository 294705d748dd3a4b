/// Tiled scene store
/// Tiles, the elements placed on them and the meshes they reference.
/// Read-only while a frame is being scheduled and drawn.
pub mod model;
pub mod shapes;

pub use model::{BoundsCylinder, FaceShade, Model};

use crate::error::{RenderError, Result};
use bitflags::bitflags;
use glam::IVec3;
use smallvec::SmallVec;

/// World units per tile edge
pub const TILE_SIZE: i32 = 128;
/// Located objects a single tile can reference
pub const MAX_SCENERY_PER_TILE: usize = 10;
/// Largest loc footprint edge, in tiles
pub const MAX_LOC_SIZE: u8 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    pub x: i32,
    pub z: i32,
    pub level: i32,
}

impl TileCoord {
    #[inline]
    pub const fn new(x: i32, z: i32, level: i32) -> Self {
        Self { x, z, level }
    }

    #[inline]
    pub fn offset(self, dx: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.z + dz, self.level)
    }

    #[inline]
    pub fn above(self) -> Self {
        Self::new(self.x, self.z, self.level + 1)
    }

    #[inline]
    pub fn below(self) -> Self {
        Self::new(self.x, self.z, self.level - 1)
    }
}

bitflags! {
    /// Neighbor directions a tile visually extends into.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SpanFlags: u8 {
        const WEST = 1;
        const NORTH = 2;
        const EAST = 4;
        const SOUTH = 8;
    }
}

bitflags! {
    /// Sides and corners of a tile that a wall segment occludes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct WallSide: u8 {
        const WEST = 1;
        const NORTH = 2;
        const EAST = 4;
        const SOUTH = 8;
        const NORTHWEST = 16;
        const NORTHEAST = 32;
        const SOUTHEAST = 64;
        const SOUTHWEST = 128;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModelId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u32);

impl ElementId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Wall and wall-decoration slot on a tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WallSlot {
    A,
    B,
}

impl WallSlot {
    #[inline]
    fn index(self) -> usize {
        match self {
            WallSlot::A => 0,
            WallSlot::B => 1,
        }
    }
}

/// Stacked ground object slot on a tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroundObjectSlot {
    Bottom,
    Middle,
    Top,
}

impl GroundObjectSlot {
    pub const ALL: [GroundObjectSlot; 3] = [
        GroundObjectSlot::Bottom,
        GroundObjectSlot::Middle,
        GroundObjectSlot::Top,
    ];

    #[inline]
    fn index(self) -> usize {
        match self {
            GroundObjectSlot::Bottom => 0,
            GroundObjectSlot::Middle => 1,
            GroundObjectSlot::Top => 2,
        }
    }
}

/// World position and heading of a placed model.
/// Position is in world units (128 per tile), yaw in 0..2048.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Placement {
    pub position: IVec3,
    pub yaw: i32,
}

impl Placement {
    pub fn new(position: IVec3, yaw: i32) -> Self {
        Self { position, yaw }
    }

    /// Centre of a tile at the given height
    pub fn tile_center(coord: TileCoord, height: i32) -> Self {
        Self {
            position: IVec3::new(
                coord.x * TILE_SIZE + TILE_SIZE / 2,
                height,
                coord.z * TILE_SIZE + TILE_SIZE / 2,
            ),
            yaw: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Loc { size_x: u8, size_z: u8 },
    Wall { slot: WallSlot, side: WallSide },
    WallDecor { slot: WallSlot, side: WallSide, through_wall: bool },
    GroundDecor,
    GroundObject { slot: GroundObjectSlot },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneElement {
    pub anchor: TileCoord,
    pub model: ModelId,
    pub placement: Placement,
    pub kind: ElementKind,
}

/// Terrain mesh drawn for a tile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ground {
    pub model: ModelId,
    pub placement: Placement,
}

#[derive(Debug, Clone, Default)]
pub struct Tile {
    pub ground: Option<Ground>,
    pub walls: [Option<ElementId>; 2],
    pub wall_decors: [Option<ElementId>; 2],
    pub ground_decor: Option<ElementId>,
    pub ground_objects: [Option<ElementId>; 3],
    pub locs: SmallVec<[ElementId; MAX_SCENERY_PER_TILE]>,
    pub spans: SpanFlags,
    /// Tile drawn underneath this one before its own ground
    pub bridge_underpass: Option<TileCoord>,
    /// Underpass tiles are drawn through the tile above and skipped by the sweep
    pub is_bridge: bool,
}

impl Tile {
    #[inline]
    pub fn wall(&self, slot: WallSlot) -> Option<ElementId> {
        self.walls[slot.index()]
    }

    #[inline]
    pub fn wall_decor(&self, slot: WallSlot) -> Option<ElementId> {
        self.wall_decors[slot.index()]
    }

    #[inline]
    pub fn ground_object(&self, slot: GroundObjectSlot) -> Option<ElementId> {
        self.ground_objects[slot.index()]
    }
}

/// Tile grid of `width * height * levels` cells plus the element and model stores.
pub struct SceneGrid {
    width: i32,
    height: i32,
    levels: i32,
    tiles: Vec<Tile>,
    elements: Vec<SceneElement>,
    models: Vec<Model>,
}

impl SceneGrid {
    pub fn new(width: i32, height: i32, levels: i32) -> Self {
        let width = width.max(0);
        let height = height.max(0);
        let levels = levels.max(0);
        let tile_count = (width * height * levels) as usize;
        Self {
            width,
            height,
            levels,
            tiles: vec![Tile::default(); tile_count],
            elements: Vec::new(),
            models: Vec::new(),
        }
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.height
    }

    #[inline]
    pub fn levels(&self) -> i32 {
        self.levels
    }

    #[inline]
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    #[inline]
    pub fn contains(&self, coord: TileCoord) -> bool {
        coord.x >= 0
            && coord.z >= 0
            && coord.level >= 0
            && coord.x < self.width
            && coord.z < self.height
            && coord.level < self.levels
    }

    /// Flat index of a tile: x fastest, then z, then level
    #[inline]
    pub fn index_of(&self, coord: TileCoord) -> Option<usize> {
        if !self.contains(coord) {
            return None;
        }
        Some((coord.x + coord.z * self.width + coord.level * self.width * self.height) as usize)
    }

    #[inline]
    pub fn coord_of(&self, index: usize) -> TileCoord {
        let index = index as i32;
        let plane = self.width * self.height;
        TileCoord::new(index % self.width, (index % plane) / self.width, index / plane)
    }

    #[inline]
    pub fn tile(&self, coord: TileCoord) -> Option<&Tile> {
        self.index_of(coord).map(|i| &self.tiles[i])
    }

    #[inline]
    pub fn tile_at_index(&self, index: usize) -> &Tile {
        &self.tiles[index]
    }

    fn tile_mut(&mut self, coord: TileCoord) -> Result<&mut Tile> {
        match self.index_of(coord) {
            Some(i) => Ok(&mut self.tiles[i]),
            None => Err(out_of_bounds(coord)),
        }
    }

    #[inline]
    pub fn element(&self, id: ElementId) -> &SceneElement {
        &self.elements[id.index()]
    }

    #[inline]
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Store a mesh after checking its faces and attributes line up.
    pub fn add_model(&mut self, model: Model) -> Result<ModelId> {
        model.validate()?;
        let id = ModelId(self.models.len() as u32);
        self.models.push(model);
        Ok(id)
    }

    pub fn model(&self, id: ModelId) -> Result<&Model> {
        self.models
            .get(id.0 as usize)
            .ok_or(RenderError::UnknownModel(id.0))
    }

    fn push_element(&mut self, element: SceneElement) -> ElementId {
        let id = ElementId(self.elements.len() as u32);
        self.elements.push(element);
        id
    }

    pub fn set_ground(&mut self, coord: TileCoord, model: ModelId, placement: Placement) -> Result<()> {
        self.tile_mut(coord)?.ground = Some(Ground { model, placement });
        Ok(())
    }

    /// Route `underpass` through `over`: it is drawn first in `over`'s ground pass
    /// and the sweep itself skips it.
    pub fn set_bridge(&mut self, over: TileCoord, underpass: TileCoord) -> Result<()> {
        if !self.contains(underpass) {
            return Err(out_of_bounds(underpass));
        }
        self.tile_mut(over)?.bridge_underpass = Some(underpass);
        self.tile_mut(underpass)?.is_bridge = true;
        Ok(())
    }

    /// Place a located object with a `size_x * size_z` footprint anchored at `coord`.
    ///
    /// Every footprint cell inside the grid records the loc and gains span flags
    /// toward the other footprint cells.
    pub fn add_loc(
        &mut self,
        coord: TileCoord,
        model: ModelId,
        placement: Placement,
        size_x: u8,
        size_z: u8,
    ) -> Result<ElementId> {
        if !(1..=MAX_LOC_SIZE).contains(&size_x) || !(1..=MAX_LOC_SIZE).contains(&size_z) {
            return Err(RenderError::InvalidLocSize { size_x, size_z });
        }
        if !self.contains(coord) {
            return Err(out_of_bounds(coord));
        }

        let max_x = (coord.x + size_x as i32 - 1).min(self.width - 1);
        let max_z = (coord.z + size_z as i32 - 1).min(self.height - 1);

        // Check every cell first so a failed add leaves the grid untouched.
        for x in coord.x..=max_x {
            for z in coord.z..=max_z {
                let cell = TileCoord::new(x, z, coord.level);
                if let Some(tile) = self.tile(cell) {
                    if tile.locs.len() >= MAX_SCENERY_PER_TILE {
                        return Err(RenderError::TooManyLocs {
                            coord: cell,
                            capacity: MAX_SCENERY_PER_TILE,
                        });
                    }
                }
            }
        }

        let id = self.push_element(SceneElement {
            anchor: coord,
            model,
            placement,
            kind: ElementKind::Loc { size_x, size_z },
        });

        for x in coord.x..=max_x {
            for z in coord.z..=max_z {
                let mut spans = SpanFlags::empty();
                if x > coord.x {
                    spans |= SpanFlags::WEST;
                }
                if x < max_x {
                    spans |= SpanFlags::EAST;
                }
                if z > coord.z {
                    spans |= SpanFlags::SOUTH;
                }
                if z < max_z {
                    spans |= SpanFlags::NORTH;
                }
                let tile = self.tile_mut(TileCoord::new(x, z, coord.level))?;
                tile.spans |= spans;
                tile.locs.push(id);
            }
        }

        log::trace!(
            "loc {:?} {}x{} at {:?} spans to ({}, {})",
            id,
            size_x,
            size_z,
            coord,
            max_x,
            max_z
        );
        Ok(id)
    }

    pub fn add_wall(
        &mut self,
        coord: TileCoord,
        model: ModelId,
        placement: Placement,
        slot: WallSlot,
        side: WallSide,
    ) -> Result<ElementId> {
        if self.tile_mut(coord)?.walls[slot.index()].is_some() {
            return Err(RenderError::SlotOccupied { coord, slot: wall_slot_name(slot) });
        }
        let id = self.push_element(SceneElement {
            anchor: coord,
            model,
            placement,
            kind: ElementKind::Wall { slot, side },
        });
        self.tile_mut(coord)?.walls[slot.index()] = Some(id);
        Ok(id)
    }

    /// Through-wall decorations use slot A for the first quadrant model and
    /// slot B for the opposite one.
    pub fn add_wall_decor(
        &mut self,
        coord: TileCoord,
        model: ModelId,
        placement: Placement,
        slot: WallSlot,
        side: WallSide,
        through_wall: bool,
    ) -> Result<ElementId> {
        if self.tile_mut(coord)?.wall_decors[slot.index()].is_some() {
            return Err(RenderError::SlotOccupied { coord, slot: decor_slot_name(slot) });
        }
        let id = self.push_element(SceneElement {
            anchor: coord,
            model,
            placement,
            kind: ElementKind::WallDecor { slot, side, through_wall },
        });
        self.tile_mut(coord)?.wall_decors[slot.index()] = Some(id);
        Ok(id)
    }

    pub fn add_ground_decor(
        &mut self,
        coord: TileCoord,
        model: ModelId,
        placement: Placement,
    ) -> Result<ElementId> {
        if self.tile_mut(coord)?.ground_decor.is_some() {
            return Err(RenderError::SlotOccupied { coord, slot: "ground_decor" });
        }
        let id = self.push_element(SceneElement {
            anchor: coord,
            model,
            placement,
            kind: ElementKind::GroundDecor,
        });
        self.tile_mut(coord)?.ground_decor = Some(id);
        Ok(id)
    }

    pub fn add_ground_object(
        &mut self,
        coord: TileCoord,
        model: ModelId,
        placement: Placement,
        slot: GroundObjectSlot,
    ) -> Result<ElementId> {
        if self.tile_mut(coord)?.ground_objects[slot.index()].is_some() {
            return Err(RenderError::SlotOccupied {
                coord,
                slot: ground_object_slot_name(slot),
            });
        }
        let id = self.push_element(SceneElement {
            anchor: coord,
            model,
            placement,
            kind: ElementKind::GroundObject { slot },
        });
        self.tile_mut(coord)?.ground_objects[slot.index()] = Some(id);
        Ok(id)
    }
}

fn out_of_bounds(coord: TileCoord) -> RenderError {
    RenderError::TileOutOfBounds {
        x: coord.x,
        z: coord.z,
        level: coord.level,
    }
}

fn wall_slot_name(slot: WallSlot) -> &'static str {
    match slot {
        WallSlot::A => "wall_a",
        WallSlot::B => "wall_b",
    }
}

fn decor_slot_name(slot: WallSlot) -> &'static str {
    match slot {
        WallSlot::A => "wall_decor_a",
        WallSlot::B => "wall_decor_b",
    }
}

fn ground_object_slot_name(slot: GroundObjectSlot) -> &'static str {
    match slot {
        GroundObjectSlot::Bottom => "ground_object_bottom",
        GroundObjectSlot::Middle => "ground_object_middle",
        GroundObjectSlot::Top => "ground_object_top",
    }
}
