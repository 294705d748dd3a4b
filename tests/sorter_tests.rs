// Face culling and depth/priority ordering.
use glam::{IVec2, IVec3};
use proptest::prelude::*;
use tile_painter::renderer::project_mesh;
use tile_painter::scene::shapes::solid_box;
use tile_painter::scene::{FaceShade, Model, Placement};
use tile_painter::sorter::{is_front_facing, DEPTH_RANGE};
use tile_painter::{Camera, FaceSorter, ProjectedVertex};

/// One triangle per face at the given relative depth, wound toward or away from the viewer.
fn faces(specs: &[(i32, bool)]) -> (Model, Vec<ProjectedVertex>) {
    let mut vertices = Vec::new();
    let mut tris = Vec::new();
    for &(depth, front) in specs {
        let base = vertices.len() as u16;
        let corners = if front {
            [(0, 0), (0, 10), (10, 0)]
        } else {
            [(0, 0), (10, 0), (0, 10)]
        };
        for (x, y) in corners {
            vertices.push(ProjectedVertex {
                camera: IVec3::new(x, y, 500),
                screen: IVec2::new(x, y),
                depth,
                visible: true,
            });
        }
        tris.push([base, base + 1, base + 2]);
    }
    let n = vertices.len();
    let model = Model::new(
        vec![0; n],
        vec![0; n],
        vec![0; n],
        tris,
        vec![FaceShade::Flat(0); specs.len()],
    );
    (model, vertices)
}

#[test]
fn box_seen_from_above_front_shows_two_sides() {
    let model = solid_box(-50, 50, -50, 50, 100, 64);
    let camera = Camera::new(IVec3::new(0, -300, -600), 128, 0);
    let mut vertices = Vec::new();
    project_mesh(&model, &camera.view(), &Placement::default(), IVec2::new(160, 120), &mut vertices);

    let mut sorter = FaceSorter::new();
    let mut order = Vec::new();
    let stats = sorter
        .sort(&model, &vertices, model.bounds().min_depth_any_rotation, &mut order)
        .unwrap();

    assert_eq!(stats.faces_culled, 8);
    assert_eq!(stats.faces_out_of_range, 0);
    let mut shown = order.clone();
    shown.sort_unstable();
    // top is faces 0 and 1, the -z side faces 4 and 5
    assert_eq!(shown, vec![0, 1, 4, 5]);

    let depth = |face: u32| {
        let [a, b, c] = model.faces[face as usize];
        vertices[a as usize].depth + vertices[b as usize].depth + vertices[c as usize].depth
    };
    assert!(order.windows(2).all(|w| depth(w[0]) / 3 >= depth(w[1]) / 3));
}

#[test]
fn sorter_is_reusable_across_meshes() {
    let mut sorter = FaceSorter::new();
    let mut order = Vec::new();

    let (big, big_vertices) = faces(&[(900, true), (20, true), (400, true)]);
    sorter.sort(&big, &big_vertices, 0, &mut order).unwrap();
    assert_eq!(order, vec![0, 2, 1]);

    let (small, small_vertices) = faces(&[(5, true), (6, false)]);
    sorter.sort(&small, &small_vertices, 0, &mut order).unwrap();
    assert_eq!(order, vec![0]);
}

#[test]
fn depth_offset_lifts_negative_depths_into_range() {
    let (model, vertices) = faces(&[(-40, true), (-10, true)]);
    let mut sorter = FaceSorter::new();
    let mut order = Vec::new();

    let stats = sorter.sort(&model, &vertices, 0, &mut order).unwrap();
    assert!(order.is_empty());
    assert_eq!(stats.faces_out_of_range, 2);

    sorter.sort(&model, &vertices, 50, &mut order).unwrap();
    assert_eq!(order, vec![1, 0]);
}

#[test]
fn fixed_classes_draw_in_class_order_regardless_of_depth() {
    let (model, vertices) = faces(&[(10, true), (800, true), (400, true)]);
    let model = model.with_priorities(vec![0, 9, 4]);
    let mut sorter = FaceSorter::new();
    let mut order = Vec::new();
    sorter.sort(&model, &vertices, 0, &mut order).unwrap();
    assert_eq!(order, vec![0, 2, 1]);
}

proptest! {
    #[test]
    fn output_is_the_accepted_faces_far_to_near(
        specs in prop::collection::vec((-200i32..1700, any::<bool>()), 0..64)
    ) {
        let (model, vertices) = faces(&specs);
        let mut sorter = FaceSorter::new();
        let mut order = Vec::new();
        let stats = sorter.sort(&model, &vertices, 0, &mut order).unwrap();

        let mut expected: Vec<u32> = specs
            .iter()
            .enumerate()
            .filter(|&(_, &(depth, front))| front && (0..DEPTH_RANGE as i32).contains(&depth))
            .map(|(i, _)| i as u32)
            .collect();
        let mut got = order.clone();
        got.sort_unstable();
        expected.sort_unstable();
        prop_assert_eq!(got, expected);
        prop_assert_eq!(stats.faces_sorted as usize, order.len());

        for pair in order.windows(2) {
            let (a, b) = (specs[pair[0] as usize].0, specs[pair[1] as usize].0);
            prop_assert!(a > b || (a == b && pair[0] < pair[1]));
        }
    }

    #[test]
    fn fixed_priorities_stay_grouped_by_class(
        specs in prop::collection::vec((0i32..1500, 0u8..12), 1..48)
    ) {
        let (model, vertices) = faces(&specs.iter().map(|&(d, _)| (d, true)).collect::<Vec<_>>());
        let priorities: Vec<u8> = specs.iter().map(|&(_, p)| p).collect();
        let model = model.with_priorities(priorities.clone());
        let mut sorter = FaceSorter::new();
        let mut order = Vec::new();
        sorter.sort(&model, &vertices, 0, &mut order).unwrap();

        let mut got = order.clone();
        got.sort_unstable();
        prop_assert_eq!(got, (0..specs.len() as u32).collect::<Vec<_>>());

        let fixed: Vec<u32> = order
            .iter()
            .copied()
            .filter(|&f| priorities[f as usize] < 10)
            .collect();
        for pair in fixed.windows(2) {
            let (pa, pb) = (priorities[pair[0] as usize], priorities[pair[1] as usize]);
            prop_assert!(pa <= pb);
            if pa == pb {
                prop_assert!(specs[pair[0] as usize].0 >= specs[pair[1] as usize].0);
            }
        }
    }

    #[test]
    fn all_zero_priorities_match_the_depth_only_order(
        specs in prop::collection::vec((-50i32..1600, any::<bool>()), 0..96)
    ) {
        let (plain, vertices) = faces(&specs);
        let (classed, _) = faces(&specs);
        let classed = classed.with_priorities(vec![0; specs.len()]);
        let mut sorter = FaceSorter::new();

        let mut depth_only = Vec::new();
        let plain_stats = sorter.sort(&plain, &vertices, 0, &mut depth_only).unwrap();
        let mut by_class = Vec::new();
        let classed_stats = sorter.sort(&classed, &vertices, 0, &mut by_class).unwrap();

        prop_assert_eq!(depth_only, by_class);
        prop_assert_eq!(plain_stats.faces_culled, classed_stats.faces_culled);
        prop_assert_eq!(plain_stats.faces_out_of_range, classed_stats.faces_out_of_range);
    }

    #[test]
    fn culling_follows_winding(x in -500i32..500, y in -500i32..500, w in 1i32..200, h in 1i32..200) {
        let v = |dx: i32, dy: i32| ProjectedVertex {
            camera: IVec3::new(x + dx, y + dy, 400),
            screen: IVec2::new(x + dx, y + dy),
            depth: 0,
            visible: true,
        };
        let (a, b, c) = (v(0, 0), v(0, h), v(w, 0));
        prop_assert!(is_front_facing(&a, &b, &c));
        prop_assert!(!is_front_facing(&a, &c, &b));
    }
}
