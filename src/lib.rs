/// Tile Painter - software renderer for tiled 3D scenes
/// Painter's-order tile scheduling, per-mesh face sorting and fixed-point
/// scanline rasterization, each stage usable and benchmarkable on its own.
pub mod camera;
pub mod config;
pub mod error;
pub mod frame;
pub mod perf;
pub mod renderer;
pub mod rendering;
pub mod scene;
pub mod scheduler;
pub mod sorter;

pub use camera::{Camera, ProjectedVertex, ViewTransform};
pub use config::{ClipStrategy, RenderConfig, TextureStrategy};
pub use error::{RenderError, Result};
pub use frame::{FrameArena, MeshRect, ScreenRect};
pub use perf::{CounterSnapshot, FunctionCounters, PerfStats, FUNCTION_COUNTERS};
pub use renderer::{FrameStats, Renderer};
pub use rendering::{
    Palette, PixelBuffer, PixelTarget, PixelView, Rasterizer, ScreenVertex, Texture, TextureStore,
    TextureWrap,
};
pub use scene::{
    ElementId, FaceShade, GroundObjectSlot, Model, ModelId, Placement, SceneGrid, TileCoord,
    WallSide, WallSlot,
};
pub use scheduler::{DrawOperation, ScheduleStats, TileStep, VisibilityScheduler};
pub use sorter::{FaceSorter, SortStats};
