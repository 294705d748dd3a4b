/// Instrumentation for the frame pipeline
/// Function call counting, compiled in with the `profiling` feature
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for every pipeline stage
pub struct FunctionCounters {
    // Scheduler counters
    pub schedule_calls: AtomicU64,
    pub tiles_visited: AtomicU64,
    pub tiles_deferred: AtomicU64,
    pub draw_ops_emitted: AtomicU64,

    // Sorter counters
    pub sort_mesh_calls: AtomicU64,
    pub faces_culled: AtomicU64,
    pub faces_out_of_range: AtomicU64,
    pub faces_sorted: AtomicU64,

    // Rasterization counters
    pub raster_face_calls: AtomicU64,
    pub faces_clipped: AtomicU64,
    pub triangles_rasterized: AtomicU64,
    pub triangles_degenerate: AtomicU64,
    pub spans_filled: AtomicU64,
    pub pixels_written: AtomicU64,
    pub texels_rejected: AtomicU64,

    // Frame counters
    pub pixel_buffer_clear_calls: AtomicU64,
    pub meshes_offscreen: AtomicU64,
}

impl FunctionCounters {
    pub const fn new() -> Self {
        Self {
            schedule_calls: AtomicU64::new(0),
            tiles_visited: AtomicU64::new(0),
            tiles_deferred: AtomicU64::new(0),
            draw_ops_emitted: AtomicU64::new(0),
            sort_mesh_calls: AtomicU64::new(0),
            faces_culled: AtomicU64::new(0),
            faces_out_of_range: AtomicU64::new(0),
            faces_sorted: AtomicU64::new(0),
            raster_face_calls: AtomicU64::new(0),
            faces_clipped: AtomicU64::new(0),
            triangles_rasterized: AtomicU64::new(0),
            triangles_degenerate: AtomicU64::new(0),
            spans_filled: AtomicU64::new(0),
            pixels_written: AtomicU64::new(0),
            texels_rejected: AtomicU64::new(0),
            pixel_buffer_clear_calls: AtomicU64::new(0),
            meshes_offscreen: AtomicU64::new(0),
        }
    }

    fn all(&self) -> [&AtomicU64; 17] {
        [
            &self.schedule_calls,
            &self.tiles_visited,
            &self.tiles_deferred,
            &self.draw_ops_emitted,
            &self.sort_mesh_calls,
            &self.faces_culled,
            &self.faces_out_of_range,
            &self.faces_sorted,
            &self.raster_face_calls,
            &self.faces_clipped,
            &self.triangles_rasterized,
            &self.triangles_degenerate,
            &self.spans_filled,
            &self.pixels_written,
            &self.texels_rejected,
            &self.pixel_buffer_clear_calls,
            &self.meshes_offscreen,
        ]
    }

    /// Reset all counters to zero
    pub fn reset(&self) {
        for counter in self.all() {
            counter.store(0, Ordering::Relaxed);
        }
    }

    /// Get snapshot of all counters
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            schedule_calls: self.schedule_calls.load(Ordering::Relaxed),
            tiles_visited: self.tiles_visited.load(Ordering::Relaxed),
            tiles_deferred: self.tiles_deferred.load(Ordering::Relaxed),
            draw_ops_emitted: self.draw_ops_emitted.load(Ordering::Relaxed),
            sort_mesh_calls: self.sort_mesh_calls.load(Ordering::Relaxed),
            faces_culled: self.faces_culled.load(Ordering::Relaxed),
            faces_out_of_range: self.faces_out_of_range.load(Ordering::Relaxed),
            faces_sorted: self.faces_sorted.load(Ordering::Relaxed),
            raster_face_calls: self.raster_face_calls.load(Ordering::Relaxed),
            faces_clipped: self.faces_clipped.load(Ordering::Relaxed),
            triangles_rasterized: self.triangles_rasterized.load(Ordering::Relaxed),
            triangles_degenerate: self.triangles_degenerate.load(Ordering::Relaxed),
            spans_filled: self.spans_filled.load(Ordering::Relaxed),
            pixels_written: self.pixels_written.load(Ordering::Relaxed),
            texels_rejected: self.texels_rejected.load(Ordering::Relaxed),
            pixel_buffer_clear_calls: self.pixel_buffer_clear_calls.load(Ordering::Relaxed),
            meshes_offscreen: self.meshes_offscreen.load(Ordering::Relaxed),
        }
    }
}

impl Default for FunctionCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of counter values at a point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub schedule_calls: u64,
    pub tiles_visited: u64,
    pub tiles_deferred: u64,
    pub draw_ops_emitted: u64,
    pub sort_mesh_calls: u64,
    pub faces_culled: u64,
    pub faces_out_of_range: u64,
    pub faces_sorted: u64,
    pub raster_face_calls: u64,
    pub faces_clipped: u64,
    pub triangles_rasterized: u64,
    pub triangles_degenerate: u64,
    pub spans_filled: u64,
    pub pixels_written: u64,
    pub texels_rejected: u64,
    pub pixel_buffer_clear_calls: u64,
    pub meshes_offscreen: u64,
}

impl CounterSnapshot {
    /// Log a formatted report at info level
    pub fn log_report(&self) {
        log::info!("=== Pipeline Counters ===");
        log::info!(
            "scheduler: calls={} tiles={} deferred={} ops={}",
            self.schedule_calls,
            self.tiles_visited,
            self.tiles_deferred,
            self.draw_ops_emitted
        );
        log::info!(
            "sorter: meshes={} culled={} out_of_range={} sorted={}",
            self.sort_mesh_calls,
            self.faces_culled,
            self.faces_out_of_range,
            self.faces_sorted
        );
        log::info!(
            "raster: faces={} clipped={} triangles={} degenerate={}",
            self.raster_face_calls,
            self.faces_clipped,
            self.triangles_rasterized,
            self.triangles_degenerate
        );
        if self.spans_filled > 0 {
            let avg = self.pixels_written as f64 / self.spans_filled as f64;
            log::info!(
                "pixels: spans={} written={} ({:.1}/span) texels_rejected={}",
                self.spans_filled,
                self.pixels_written,
                avg,
                self.texels_rejected
            );
        }
        log::info!(
            "frame: clears={} meshes_offscreen={}",
            self.pixel_buffer_clear_calls,
            self.meshes_offscreen
        );
    }
}

/// Global function counters instance
pub static FUNCTION_COUNTERS: FunctionCounters = FunctionCounters::new();

/// Macro for incrementing a counter (only when profiling feature is enabled)
#[macro_export]
macro_rules! count_call {
    ($counter:expr) => {
        #[cfg(feature = "profiling")]
        {
            $counter.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }
    };
}

/// Macro for adding to a counter (only when profiling feature is enabled)
#[macro_export]
macro_rules! count_add {
    ($counter:expr, $value:expr) => {
        #[cfg(feature = "profiling")]
        {
            $counter.fetch_add($value as u64, std::sync::atomic::Ordering::Relaxed);
        }
    };
}
