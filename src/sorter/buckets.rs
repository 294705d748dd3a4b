/// Fixed-capacity face buckets reused for every mesh
use crate::error::{RenderError, Result};

/// Distinct face depths; faces outside `0..DEPTH_RANGE` are not drawn
pub const DEPTH_RANGE: usize = 1500;
pub const DEPTH_BUCKET_CAPACITY: usize = 512;
pub const PRIORITY_CLASSES: usize = 12;
pub const PRIORITY_BUCKET_CAPACITY: usize = 2000;

/// Faces grouped by average depth, insertion order kept within a depth.
pub struct DepthBuckets {
    counts: Box<[u16]>,
    faces: Box<[u32]>,
    min: usize,
    max: usize,
}

impl Default for DepthBuckets {
    fn default() -> Self {
        Self::new()
    }
}

impl DepthBuckets {
    pub fn new() -> Self {
        Self {
            counts: vec![0; DEPTH_RANGE].into_boxed_slice(),
            faces: vec![0; DEPTH_RANGE * DEPTH_BUCKET_CAPACITY].into_boxed_slice(),
            min: DEPTH_RANGE,
            max: 0,
        }
    }

    /// Reset only the depths touched since the last clear
    pub fn clear(&mut self) {
        if self.min <= self.max {
            self.counts[self.min..=self.max].fill(0);
        }
        self.min = DEPTH_RANGE;
        self.max = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }

    /// `depth` must be inside `0..DEPTH_RANGE`
    pub fn insert(&mut self, depth: usize, face: u32) -> Result<()> {
        debug_assert!(depth < DEPTH_RANGE);
        let count = self.counts[depth] as usize;
        if count >= DEPTH_BUCKET_CAPACITY {
            return Err(RenderError::DepthBucketOverflow {
                depth,
                capacity: DEPTH_BUCKET_CAPACITY,
            });
        }
        self.faces[depth * DEPTH_BUCKET_CAPACITY + count] = face;
        self.counts[depth] += 1;
        self.min = self.min.min(depth);
        self.max = self.max.max(depth);
        Ok(())
    }

    #[inline]
    pub fn bucket(&self, depth: usize) -> &[u32] {
        let start = depth * DEPTH_BUCKET_CAPACITY;
        &self.faces[start..start + self.counts[depth] as usize]
    }

    /// `(depth, face)` from the deepest bucket to the shallowest
    pub fn far_to_near(&self) -> impl Iterator<Item = (usize, u32)> + '_ {
        let range = if self.is_empty() { 0..0 } else { self.min..self.max + 1 };
        range
            .rev()
            .flat_map(move |depth| self.bucket(depth).iter().map(move |&face| (depth, face)))
    }
}

/// Faces grouped by authoring priority, each class in far-to-near order.
pub struct PriorityBuckets {
    counts: [usize; PRIORITY_CLASSES],
    depth_sums: [i64; PRIORITY_CLASSES],
    faces: Box<[u32]>,
    depths: Box<[u16]>,
}

impl Default for PriorityBuckets {
    fn default() -> Self {
        Self::new()
    }
}

impl PriorityBuckets {
    pub fn new() -> Self {
        Self {
            counts: [0; PRIORITY_CLASSES],
            depth_sums: [0; PRIORITY_CLASSES],
            faces: vec![0; PRIORITY_CLASSES * PRIORITY_BUCKET_CAPACITY].into_boxed_slice(),
            depths: vec![0; PRIORITY_CLASSES * PRIORITY_BUCKET_CAPACITY].into_boxed_slice(),
        }
    }

    pub fn clear(&mut self) {
        self.counts = [0; PRIORITY_CLASSES];
        self.depth_sums = [0; PRIORITY_CLASSES];
    }

    /// `priority` must be below `PRIORITY_CLASSES`
    pub fn push(&mut self, priority: u8, face: u32, depth: usize) -> Result<()> {
        let class = priority as usize;
        let count = self.counts[class];
        if count >= PRIORITY_BUCKET_CAPACITY {
            return Err(RenderError::PriorityBucketOverflow {
                priority,
                capacity: PRIORITY_BUCKET_CAPACITY,
            });
        }
        let slot = class * PRIORITY_BUCKET_CAPACITY + count;
        self.faces[slot] = face;
        self.depths[slot] = depth as u16;
        self.counts[class] += 1;
        self.depth_sums[class] += depth as i64;
        Ok(())
    }

    #[inline]
    pub fn class(&self, priority: usize) -> &[u32] {
        let start = priority * PRIORITY_BUCKET_CAPACITY;
        &self.faces[start..start + self.counts[priority]]
    }

    #[inline]
    pub fn class_depths(&self, priority: usize) -> &[u16] {
        let start = priority * PRIORITY_BUCKET_CAPACITY;
        &self.depths[start..start + self.counts[priority]]
    }

    /// Mean depth over two classes, 0 when both are empty
    pub fn average_depth(&self, a: usize, b: usize) -> i32 {
        let count = self.counts[a] + self.counts[b];
        if count == 0 {
            return 0;
        }
        ((self.depth_sums[a] + self.depth_sums[b]) / count as i64) as i32
    }

    /// Classes 10 then 11 as `(face, depth)`
    pub fn flexible(&self) -> impl Iterator<Item = (u32, i32)> + '_ {
        [10, 11].into_iter().flat_map(move |class| {
            self.class(class)
                .iter()
                .zip(self.class_depths(class))
                .map(|(&face, &depth)| (face, depth as i32))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_buckets_iterate_far_to_near_in_insertion_order() {
        let mut buckets = DepthBuckets::new();
        buckets.insert(10, 0).unwrap();
        buckets.insert(900, 1).unwrap();
        buckets.insert(10, 2).unwrap();
        buckets.insert(0, 3).unwrap();
        buckets.insert(1499, 4).unwrap();
        let order: Vec<_> = buckets.far_to_near().collect();
        assert_eq!(order, vec![(1499, 4), (900, 1), (10, 0), (10, 2), (0, 3)]);

        buckets.clear();
        assert!(buckets.is_empty());
        assert_eq!(buckets.far_to_near().count(), 0);
        assert!(buckets.bucket(10).is_empty());
    }

    #[test]
    fn full_depth_bucket_overflows() {
        let mut buckets = DepthBuckets::new();
        for face in 0..DEPTH_BUCKET_CAPACITY as u32 {
            buckets.insert(7, face).unwrap();
        }
        assert_eq!(
            buckets.insert(7, 9999).unwrap_err(),
            RenderError::DepthBucketOverflow { depth: 7, capacity: DEPTH_BUCKET_CAPACITY }
        );
    }

    #[test]
    fn full_priority_class_overflows() {
        let mut buckets = PriorityBuckets::new();
        for face in 0..PRIORITY_BUCKET_CAPACITY as u32 {
            buckets.push(3, face, 5).unwrap();
        }
        assert!(matches!(
            buckets.push(3, 0, 5),
            Err(RenderError::PriorityBucketOverflow { priority: 3, .. })
        ));
        assert!(buckets.push(4, 0, 5).is_ok());
    }

    #[test]
    fn averages_ignore_empty_classes() {
        let mut buckets = PriorityBuckets::new();
        assert_eq!(buckets.average_depth(1, 2), 0);
        buckets.push(1, 0, 100).unwrap();
        buckets.push(2, 1, 51).unwrap();
        buckets.push(2, 2, 50).unwrap();
        assert_eq!(buckets.average_depth(1, 2), 67);
    }
}
