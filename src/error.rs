/// Error type shared by every stage of the frame pipeline.
///
/// Sizing and scheduling faults abort the frame; degenerate geometry never
/// reaches this type and is skipped where it is found.
use crate::scene::TileCoord;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("depth bucket {depth} exceeded its capacity of {capacity} faces")]
    DepthBucketOverflow { depth: usize, capacity: usize },

    #[error("priority class {priority} exceeded its capacity of {capacity} faces")]
    PriorityBucketOverflow { priority: u8, capacity: usize },

    #[error("face {face} has priority {priority}, expected 0..=11")]
    InvalidPriority { face: usize, priority: u8 },

    #[error("scheduler stalled with {unfinished} unfinished tiles (first at {first:?})")]
    SchedulerDeadlock { unfinished: usize, first: TileCoord },

    #[error("tile ({x}, {z}, level {level}) is outside the scene grid")]
    TileOutOfBounds { x: i32, z: i32, level: i32 },

    #[error("tile {coord:?} already holds an element in slot {slot}")]
    SlotOccupied { coord: TileCoord, slot: &'static str },

    #[error("tile {coord:?} already holds {capacity} locs")]
    TooManyLocs { coord: TileCoord, capacity: usize },

    #[error("loc footprint {size_x}x{size_z} is outside 1..=15")]
    InvalidLocSize { size_x: u8, size_z: u8 },

    #[error("texture {0} is not loaded")]
    MissingTexture(u16),

    #[error("invalid texture: {0}")]
    InvalidTexture(String),

    #[error("malformed model: {0}")]
    MalformedModel(String),

    #[error("unknown model id {0}")]
    UnknownModel(u32),

    #[error("invalid camera: {0}")]
    InvalidCamera(String),

    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, RenderError>;
