/// Mesh builders for terrain quads and boxes, plus a small sample scene
/// used by the demo binary, the benches and the end-to-end tests.
///
/// Vertical axis points down: heights above the ground are negative.
/// Faces wind so that `(b - a) x (c - a)` points out of the solid.
use super::{FaceShade, GroundObjectSlot, Model, Placement, SceneGrid, TileCoord, WallSide, WallSlot, TILE_SIZE};
use crate::error::Result;
use crate::rendering::{Texture, TextureStore, TextureWrap};
use glam::IVec3;

/// Pack hue (0..64), saturation (0..8) and lightness (0..128) into an HSL16 index
#[inline]
pub const fn hsl(hue: i32, saturation: i32, lightness: i32) -> i32 {
    ((hue & 63) << 10) | ((saturation & 7) << 7) | (lightness & 127)
}

/// Corner order of every box face: x bit 0, y bit 1, z bit 2
const BOX_QUADS: [[u16; 4]; 6] = [
    [0, 1, 5, 4], // top
    [2, 6, 7, 3], // bottom
    [2, 3, 1, 0], // -z
    [6, 4, 5, 7], // +z
    [2, 0, 4, 6], // -x
    [3, 7, 5, 1], // +x
];

fn split_quad([a, b, c, d]: [u16; 4]) -> [[u16; 3]; 2] {
    [[a, b, c], [a, c, d]]
}

/// One tile of flat terrain centred on its placement, lit per corner
/// (south-west, south-east, north-east, north-west).
pub fn ground_quad(corners: [i32; 4]) -> Model {
    let h = TILE_SIZE / 2;
    let [sw, se, ne, nw] = corners;
    Model::new(
        vec![-h, h, h, -h],
        vec![0; 4],
        vec![-h, -h, h, h],
        vec![[0, 1, 2], [0, 2, 3]],
        vec![FaceShade::Gouraud([sw, se, ne]), FaceShade::Gouraud([sw, ne, nw])],
    )
}

/// Box with its base centred on the placement, spanning
/// `min.x..max.x` and `min.z..max.z`, rising `height` units.
fn box_vertices(min: IVec3, max: IVec3) -> (Vec<i32>, Vec<i32>, Vec<i32>) {
    let mut xs = Vec::with_capacity(8);
    let mut ys = Vec::with_capacity(8);
    let mut zs = Vec::with_capacity(8);
    for i in 0..8 {
        xs.push(if i & 1 == 0 { min.x } else { max.x });
        ys.push(if i & 2 == 0 { min.y } else { max.y });
        zs.push(if i & 4 == 0 { min.z } else { max.z });
    }
    (xs, ys, zs)
}

/// Flat-coloured box; the top is lit brightest, the sides by facing.
pub fn solid_box(min_x: i32, max_x: i32, min_z: i32, max_z: i32, height: i32, color: i32) -> Model {
    let (xs, ys, zs) = box_vertices(IVec3::new(min_x, -height, min_z), IVec3::new(max_x, 0, max_z));
    let light = color & 127;
    let base = color & !127;
    let mut faces = Vec::with_capacity(12);
    let mut shades = Vec::with_capacity(12);
    for (side, quad) in BOX_QUADS.iter().enumerate() {
        let lightness = (light - side as i32 * 8).clamp(0, 127);
        for tri in split_quad(*quad) {
            faces.push(tri);
            shades.push(FaceShade::Flat(base | lightness));
        }
    }
    Model::new(xs, ys, zs, faces, shades)
}

/// Box whose every side carries `texture`, one texture repeat per side.
pub fn textured_box(half_x: i32, half_z: i32, height: i32, texture: u16, shade: i32) -> Model {
    let (xs, ys, zs) = box_vertices(IVec3::new(-half_x, -height, -half_z), IVec3::new(half_x, 0, half_z));
    let mut faces = Vec::with_capacity(12);
    let mut coords = Vec::with_capacity(12);
    let mut pmn = Vec::with_capacity(6);
    for (side, quad) in BOX_QUADS.iter().enumerate() {
        pmn.push([quad[0], quad[1], quad[3]]);
        for tri in split_quad(*quad) {
            faces.push(tri);
            coords.push(Some(side as u16));
        }
    }
    let count = faces.len();
    Model::new(xs, ys, zs, faces, vec![FaceShade::Flat(shade); count]).with_textures(
        vec![Some(texture); count],
        Some(coords),
        pmn,
    )
}

/// Thin box along one edge of a tile
pub fn wall_panel(side: WallSide, height: i32, color: i32) -> Model {
    let h = TILE_SIZE / 2;
    let t = 6;
    if side.contains(WallSide::WEST) {
        solid_box(-h, -h + t, -h, h, height, color)
    } else if side.contains(WallSide::EAST) {
        solid_box(h - t, h, -h, h, height, color)
    } else if side.contains(WallSide::NORTH) {
        solid_box(-h, h, h - t, h, height, color)
    } else {
        solid_box(-h, h, -h, -h + t, height, color)
    }
}

/// Deterministic per-tile variation in 0..16
fn tile_noise(x: i32, z: i32) -> i32 {
    let mut n = (x as u32).wrapping_mul(0x9E37_79B9) ^ (z as u32).wrapping_mul(0x85EB_CA6B);
    n ^= n >> 15;
    n = n.wrapping_mul(0x2C1B_3C6D);
    (n >> 28) as i32
}

pub const CHECKER_TEXTURE: u16 = 1;
pub const LATTICE_TEXTURE: u16 = 2;

/// Textures referenced by `sample_scene`
pub fn sample_textures() -> Result<TextureStore> {
    let mut store = TextureStore::new();
    store.insert(
        CHECKER_TEXTURE,
        Texture::checkerboard(64, 0x00C0_9050, 0x0060_3020, 8)?,
    );
    let lattice = (0..128 * 128)
        .map(|i| {
            let (x, y) = (i % 128, i / 128);
            if x % 32 < 4 || y % 32 < 4 {
                0x0050_5860
            } else {
                0
            }
        })
        .collect();
    store.insert(LATTICE_TEXTURE, Texture::new(128, lattice, false, TextureWrap::Repeat)?);
    Ok(store)
}

/// Two-level `size` x `size` scene with terrain on every ground tile, a wall
/// run with decorations, 1x1 and 2x2 locs, ground clutter and a bridge.
pub fn sample_scene(size: i32) -> Result<SceneGrid> {
    let size = size.max(8);
    let mut scene = SceneGrid::new(size, size, 2);

    for z in 0..size {
        for x in 0..size {
            let n = tile_noise(x, z);
            let hue = if (x + z) % 2 == 0 { 10 } else { 12 };
            let corners = [0, 1, 2, 3].map(|i| hsl(hue, 4, 60 + n + i * 3));
            let model = scene.add_model(ground_quad(corners))?;
            let coord = TileCoord::new(x, z, 0);
            scene.set_ground(coord, model, Placement::tile_center(coord, 0))?;
        }
    }

    let wall = scene.add_model(wall_panel(WallSide::SOUTH, 180, hsl(4, 2, 90)))?;
    let decor = scene.add_model(solid_box(-20, 20, -58, -54, 40, hsl(40, 6, 70)))?;
    let wall_z = size / 2 + 2;
    for x in 2..size - 2 {
        let coord = TileCoord::new(x, wall_z, 0);
        let placement = Placement::tile_center(coord, 0);
        scene.add_wall(coord, wall, placement, WallSlot::A, WallSide::SOUTH)?;
        if x % 3 == 0 {
            scene.add_wall_decor(coord, decor, placement, WallSlot::A, WallSide::SOUTH, false)?;
        }
    }

    let tree = scene.add_model(solid_box(-30, 30, -30, 30, 220, hsl(22, 5, 50)))?;
    for (x, z) in [(2, 3), (size - 3, 4), (3, size - 3), (size - 4, size - 2)] {
        let coord = TileCoord::new(x, z, 0);
        scene.add_loc(coord, tree, Placement::tile_center(coord, 0), 1, 1)?;
    }

    let crate_model = scene.add_model(textured_box(TILE_SIZE - 8, TILE_SIZE - 8, 200, CHECKER_TEXTURE, 100))?;
    let anchor = TileCoord::new(size / 2 - 3, size / 2 - 1, 0);
    let center = IVec3::new((anchor.x + 1) * TILE_SIZE, 0, (anchor.z + 1) * TILE_SIZE);
    scene.add_loc(anchor, crate_model, Placement::new(center, 0), 2, 2)?;

    let lattice = scene.add_model(textured_box(48, 48, 96, LATTICE_TEXTURE, 110).with_alphas(vec![200; 12]))?;
    let coord = TileCoord::new(size / 2 + 3, size / 2 - 2, 0);
    scene.add_loc(coord, lattice, Placement::tile_center(coord, 0), 1, 1)?;

    let pebble = scene.add_model(solid_box(-10, 10, -10, 10, 8, hsl(0, 0, 40)))?;
    let stack = [
        (GroundObjectSlot::Bottom, 0),
        (GroundObjectSlot::Middle, -8),
        (GroundObjectSlot::Top, -16),
    ];
    for x in (1..size - 1).step_by(5) {
        let coord = TileCoord::new(x, 1, 0);
        scene.add_ground_decor(coord, pebble, Placement::tile_center(coord, 0))?;
        let pile = coord.offset(0, 1);
        for (slot, height) in stack {
            scene.add_ground_object(pile, pebble, Placement::tile_center(pile, height), slot)?;
        }
    }

    let deck = scene.add_model(ground_quad([hsl(6, 3, 80); 4]))?;
    let over = TileCoord::new(size / 2, size - 3, 1);
    scene.set_ground(over, deck, Placement::tile_center(over, -160))?;
    scene.set_bridge(over, TileCoord::new(over.x, over.z, 0))?;

    log::debug!(
        "sample scene: {}x{} tiles, {} elements",
        size,
        size,
        scene.element_count()
    );
    Ok(scene)
}
