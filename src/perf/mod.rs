/// Performance measurement utilities
/// Each pipeline stage is timed and logged for optimization analysis
pub mod profiling;

pub use profiling::{CounterSnapshot, FunctionCounters, FUNCTION_COUNTERS};

use std::time::{Duration, Instant};

pub struct PerfTimer {
    name: &'static str,
    start: Instant,
}

impl PerfTimer {
    #[inline]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            start: Instant::now(),
        }
    }

    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for PerfTimer {
    fn drop(&mut self) {
        log::debug!("[PERF] {}: {}μs", self.name, self.elapsed().as_micros());
    }
}

/// Per-frame stage timings, accumulated by the renderer
#[derive(Debug, Clone, Copy, Default)]
pub struct PerfStats {
    pub schedule_us: f64,
    pub projection_us: f64,
    pub sort_us: f64,
    pub raster_us: f64,
    pub total_us: f64,
}

impl PerfStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log_summary(&self) {
        let pct = |part: f64| {
            if self.total_us > 0.0 {
                part / self.total_us * 100.0
            } else {
                0.0
            }
        };
        log::info!("schedule:   {:8.2}μs ({:5.1}%)", self.schedule_us, pct(self.schedule_us));
        log::info!("projection: {:8.2}μs ({:5.1}%)", self.projection_us, pct(self.projection_us));
        log::info!("sort:       {:8.2}μs ({:5.1}%)", self.sort_us, pct(self.sort_us));
        log::info!("raster:     {:8.2}μs ({:5.1}%)", self.raster_us, pct(self.raster_us));
        log::info!("total:      {:8.2}μs", self.total_us);
    }
}

/// Macro for easy performance measurement
#[macro_export]
macro_rules! perf_scope {
    ($name:expr) => {
        let _timer = $crate::perf::PerfTimer::new($name);
    };
}
