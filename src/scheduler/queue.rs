/// FIFO work queues for the tile sweep
use std::collections::VecDeque;

/// Tile index plus the catch-up priority it was queued with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueEntry {
    pub tile: usize,
    pub priority: u8,
}

/// Main queue plus a catch-up queue that is always drained first.
///
/// Large locs push their footprint cells with a priority; those cells, and
/// the cells they in turn release, jump ahead of the main sweep until the
/// priority runs out.
#[derive(Debug, Default)]
pub struct PaintQueue {
    main: VecDeque<QueueEntry>,
    catchup: VecDeque<QueueEntry>,
}

impl PaintQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Priority 0 goes to the main queue, anything higher to catch-up with one less.
    #[inline]
    pub fn push(&mut self, tile: usize, priority: u8) {
        if priority == 0 {
            self.main.push_back(QueueEntry { tile, priority: 0 });
        } else {
            self.catchup.push_back(QueueEntry {
                tile,
                priority: priority - 1,
            });
        }
    }

    #[inline]
    pub fn pop(&mut self) -> Option<QueueEntry> {
        self.catchup.pop_front().or_else(|| self.main.pop_front())
    }

    pub fn len(&self) -> usize {
        self.main.len() + self.catchup.len()
    }

    pub fn is_empty(&self) -> bool {
        self.main.is_empty() && self.catchup.is_empty()
    }

    pub fn clear(&mut self) {
        self.main.clear();
        self.catchup.clear();
    }
}
