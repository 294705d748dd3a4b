/// Per-mesh face ordering
///
/// Faces are culled, bucketed by average depth and emitted far to near.
/// Meshes with authoring priorities are regrouped by class; the flexible
/// classes 10 and 11 are slotted between the fixed classes by comparing
/// their depth with the mean depth of the classes they sit between.
pub mod buckets;

pub use buckets::{
    DepthBuckets, PriorityBuckets, DEPTH_BUCKET_CAPACITY, DEPTH_RANGE, PRIORITY_BUCKET_CAPACITY,
    PRIORITY_CLASSES,
};

use crate::camera::ProjectedVertex;
use crate::error::{RenderError, Result};
use crate::perf::FUNCTION_COUNTERS;
use crate::scene::Model;
use crate::{count_add, count_call};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortStats {
    pub faces_culled: u32,
    pub faces_out_of_range: u32,
    pub faces_sorted: u32,
}

impl SortStats {
    pub fn merge(&mut self, other: &SortStats) {
        self.faces_culled += other.faces_culled;
        self.faces_out_of_range += other.faces_out_of_range;
        self.faces_sorted += other.faces_sorted;
    }
}

/// Front-facing test. Uses the projected winding when every vertex is in
/// front of the near plane, the camera-space winding otherwise.
#[inline]
pub fn is_front_facing(a: &ProjectedVertex, b: &ProjectedVertex, c: &ProjectedVertex) -> bool {
    if a.visible && b.visible && c.visible {
        let (xa, ya) = (a.screen.x as i64, a.screen.y as i64);
        let (xb, yb) = (b.screen.x as i64, b.screen.y as i64);
        let (xc, yc) = (c.screen.x as i64, c.screen.y as i64);
        return (xa - xb) * (yc - yb) - (ya - yb) * (xc - xb) > 0;
    }
    let (pa, pb, pc) = (a.camera.as_i64vec3(), b.camera.as_i64vec3(), c.camera.as_i64vec3());
    let normal = (pb - pa).cross(pc - pa);
    normal.dot(pa) < 0
}

/// Bucket storage reused for every mesh of every frame.
#[derive(Default)]
pub struct FaceSorter {
    depth: DepthBuckets,
    priority: PriorityBuckets,
}

impl FaceSorter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write the draw order of `model`'s faces into `order`.
    ///
    /// `vertices` holds the projected mesh, with depths relative to the mesh
    /// origin; `depth_offset` lifts them into the bucket range.
    pub fn sort(
        &mut self,
        model: &Model,
        vertices: &[ProjectedVertex],
        depth_offset: i32,
        order: &mut Vec<u32>,
    ) -> Result<SortStats> {
        count_call!(FUNCTION_COUNTERS.sort_mesh_calls);
        order.clear();
        self.depth.clear();

        let mut stats = SortStats::default();
        for (face, &[a, b, c]) in model.faces.iter().enumerate() {
            let (a, b, c) = (&vertices[a as usize], &vertices[b as usize], &vertices[c as usize]);
            if !is_front_facing(a, b, c) {
                stats.faces_culled += 1;
                continue;
            }
            let depth = (a.depth + b.depth + c.depth) / 3 + depth_offset;
            if !(0..DEPTH_RANGE as i32).contains(&depth) {
                stats.faces_out_of_range += 1;
                continue;
            }
            self.depth.insert(depth as usize, face as u32)?;
        }

        match &model.face_priorities {
            None => order.extend(self.depth.far_to_near().map(|(_, face)| face)),
            Some(priorities) => self.interleave_priorities(priorities, order)?,
        }

        stats.faces_sorted = order.len() as u32;
        count_add!(FUNCTION_COUNTERS.faces_culled, stats.faces_culled as u64);
        count_add!(FUNCTION_COUNTERS.faces_out_of_range, stats.faces_out_of_range as u64);
        count_add!(FUNCTION_COUNTERS.faces_sorted, stats.faces_sorted as u64);
        if stats.faces_out_of_range > 0 {
            log::trace!("{} faces outside the depth range", stats.faces_out_of_range);
        }
        Ok(stats)
    }

    fn interleave_priorities(&mut self, priorities: &[u8], order: &mut Vec<u32>) -> Result<()> {
        self.priority.clear();
        for (depth, face) in self.depth.far_to_near() {
            let priority = priorities.get(face as usize).copied().unwrap_or(0);
            if priority as usize >= PRIORITY_CLASSES {
                return Err(RenderError::InvalidPriority {
                    face: face as usize,
                    priority,
                });
            }
            self.priority.push(priority, face, depth)?;
        }

        let buckets = &self.priority;
        let avg_1_2 = buckets.average_depth(1, 2);
        let avg_3_4 = buckets.average_depth(3, 4);
        let avg_6_8 = buckets.average_depth(6, 8);

        let mut flexible = buckets.flexible().peekable();
        let mut drain_farther_than = |order: &mut Vec<u32>, threshold: i32| {
            while let Some(&(face, _)) = flexible.peek().filter(|&&(_, depth)| depth > threshold) {
                order.push(face);
                flexible.next();
            }
        };

        drain_farther_than(order, avg_1_2);
        for class in 0..3 {
            order.extend_from_slice(buckets.class(class));
        }
        drain_farther_than(order, avg_3_4);
        for class in 3..5 {
            order.extend_from_slice(buckets.class(class));
        }
        drain_farther_than(order, avg_6_8);
        for class in 5..10 {
            order.extend_from_slice(buckets.class(class));
        }
        drain_farther_than(order, i32::MIN);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::FaceShade;
    use glam::{IVec2, IVec3};

    /// One front-facing triangle per entry of `depths`, each at its own relative depth.
    fn stacked(depths: &[i32]) -> (Model, Vec<ProjectedVertex>) {
        let mut vertices = Vec::new();
        let mut faces = Vec::new();
        for &depth in depths {
            let base = vertices.len() as u16;
            for (x, y) in [(0, 0), (0, 10), (10, 0)] {
                vertices.push(ProjectedVertex {
                    camera: IVec3::new(x, y, 500 + depth),
                    screen: IVec2::new(x, y),
                    depth,
                    visible: true,
                });
            }
            faces.push([base, base + 1, base + 2]);
        }
        let n = vertices.len();
        let model = Model::new(
            vec![0; n],
            vec![0; n],
            vec![0; n],
            faces,
            vec![FaceShade::Flat(0); depths.len()],
        );
        (model, vertices)
    }

    #[test]
    fn winding_decides_front_faces() {
        let (_, v) = stacked(&[0]);
        assert!(is_front_facing(&v[0], &v[1], &v[2]));
        assert!(!is_front_facing(&v[0], &v[2], &v[1]));
    }

    #[test]
    fn camera_space_test_agrees_with_screen_test() {
        let make = |x: i32, y: i32, z: i32, visible| {
            let camera = IVec3::new(x, y, z);
            ProjectedVertex {
                camera,
                screen: IVec2::new(x * 512 / z, y * 512 / z),
                depth: 0,
                visible,
            }
        };
        let a = make(-100, -50, 400, true);
        let b = make(-80, 120, 300, true);
        let c = make(150, 10, 500, true);
        let screen = is_front_facing(&a, &b, &c);
        let hidden = |v: ProjectedVertex| ProjectedVertex { visible: false, ..v };
        assert_eq!(is_front_facing(&hidden(a), &b, &c), screen);
        assert_eq!(is_front_facing(&hidden(a), &c, &b), !screen);
    }

    #[test]
    fn faces_come_out_far_to_near() {
        let (model, vertices) = stacked(&[10, 300, 20, 300]);
        let mut sorter = FaceSorter::new();
        let mut order = Vec::new();
        let stats = sorter.sort(&model, &vertices, 0, &mut order).unwrap();
        assert_eq!(order, vec![1, 3, 2, 0]);
        assert_eq!(stats.faces_sorted, 4);
    }

    #[test]
    fn out_of_range_depths_are_dropped() {
        let (model, vertices) = stacked(&[-5, 0, 1499, 1500]);
        let mut sorter = FaceSorter::new();
        let mut order = Vec::new();
        let stats = sorter.sort(&model, &vertices, 0, &mut order).unwrap();
        assert_eq!(order, vec![2, 1]);
        assert_eq!(stats.faces_out_of_range, 2);
    }

    #[test]
    fn flexible_faces_slot_between_fixed_classes() {
        // class 1 at depth 100, class 3 at 50, class 6 at 20
        // flex faces at 120 (before class 0), 60 (before 3), 30 (before 5), 5 (last)
        let (model, vertices) = stacked(&[100, 50, 20, 120, 60, 30, 5]);
        let model = model.with_priorities(vec![1, 3, 6, 10, 10, 11, 11]);
        let mut sorter = FaceSorter::new();
        let mut order = Vec::new();
        sorter.sort(&model, &vertices, 0, &mut order).unwrap();
        assert_eq!(order, vec![3, 0, 4, 1, 5, 2, 6]);
    }

    #[test]
    fn equal_depth_flexible_face_waits() {
        let (model, vertices) = stacked(&[100, 100]);
        let model = model.with_priorities(vec![1, 10]);
        let mut sorter = FaceSorter::new();
        let mut order = Vec::new();
        sorter.sort(&model, &vertices, 0, &mut order).unwrap();
        assert_eq!(order, vec![0, 1]);
    }

    #[test]
    fn priority_above_eleven_is_rejected() {
        let (model, vertices) = stacked(&[100]);
        let model = model.with_priorities(vec![12]);
        let mut sorter = FaceSorter::new();
        let err = sorter.sort(&model, &vertices, 0, &mut Vec::new()).unwrap_err();
        assert_eq!(err, RenderError::InvalidPriority { face: 0, priority: 12 });
    }
}
