use crate::scene::{ElementId, GroundObjectSlot, TileCoord, WallSlot};

/// One entry of the painter's-order draw list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawOperation {
    Ground(TileCoord),
    Wall {
        coord: TileCoord,
        element: ElementId,
        slot: WallSlot,
    },
    WallDecor {
        coord: TileCoord,
        element: ElementId,
        slot: WallSlot,
    },
    GroundDecor {
        coord: TileCoord,
        element: ElementId,
    },
    GroundObject {
        coord: TileCoord,
        element: ElementId,
        slot: GroundObjectSlot,
    },
    Loc {
        coord: TileCoord,
        element: ElementId,
    },
}

impl DrawOperation {
    /// Tile the drawn element or terrain belongs to
    pub fn coord(&self) -> TileCoord {
        match *self {
            DrawOperation::Ground(coord) => coord,
            DrawOperation::Wall { coord, .. }
            | DrawOperation::WallDecor { coord, .. }
            | DrawOperation::GroundDecor { coord, .. }
            | DrawOperation::GroundObject { coord, .. }
            | DrawOperation::Loc { coord, .. } => coord,
        }
    }

    /// Scene element drawn, `None` for terrain
    pub fn element(&self) -> Option<ElementId> {
        match *self {
            DrawOperation::Ground(_) => None,
            DrawOperation::Wall { element, .. }
            | DrawOperation::WallDecor { element, .. }
            | DrawOperation::GroundDecor { element, .. }
            | DrawOperation::GroundObject { element, .. }
            | DrawOperation::Loc { element, .. } => Some(element),
        }
    }
}
