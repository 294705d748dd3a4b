/// Frame driver: draw list -> projection -> face order -> rasterization
use crate::camera::{project_at, Camera, ProjectedVertex, Rotation, ViewTransform};
use crate::config::{ClipStrategy, RenderConfig};
use crate::error::{RenderError, Result};
use crate::frame::{FrameArena, MeshRect, ScreenRect};
use crate::perf::{PerfStats, FUNCTION_COUNTERS};
use crate::perf_scope;
use crate::rendering::{
    ClipVertex, FloatClipper, IntegerClipper, NearClipper, Palette, PixelTarget, RasterStats,
    Rasterizer, ScreenVertex, Texture, TextureProvider,
};
use crate::scene::{FaceShade, Model, Placement, SceneGrid};
use crate::scheduler::{DrawOperation, ScheduleStats};
use crate::sorter::SortStats;
use crate::count_call;
use glam::{IVec2, IVec3, Vec3};
use std::time::Instant;

/// Meshes with at least this many vertices are projected in parallel
#[cfg(feature = "parallel")]
const PARALLEL_VERTEX_THRESHOLD: usize = 4096;

#[derive(Debug, Clone, Copy, Default)]
pub struct FrameStats {
    pub schedule: ScheduleStats,
    pub sort: SortStats,
    pub raster: RasterStats,
    pub meshes_drawn: u32,
    pub meshes_offscreen: u32,
    pub faces_hidden: u32,
    pub faces_clipped: u32,
    pub perf: PerfStats,
}

pub struct Renderer {
    config: RenderConfig,
    palette: Palette,
    clipper: Box<dyn NearClipper>,
    rasterizer: Rasterizer,
}

fn clipper_for(strategy: ClipStrategy) -> Box<dyn NearClipper> {
    match strategy {
        ClipStrategy::Integer => Box::new(IntegerClipper),
        ClipStrategy::Float => Box::new(FloatClipper),
    }
}

impl Renderer {
    pub fn new(config: RenderConfig) -> Result<Self> {
        config.validate()?;
        let palette = Palette::hsl16(config.brightness);
        let clipper = clipper_for(config.clip_strategy);
        log::info!(
            "renderer: radius {} tiles, {} clipping, {:?} textures",
            config.draw_radius,
            clipper.name(),
            config.texture_strategy
        );
        Ok(Self {
            rasterizer: Rasterizer::new(config.texture_strategy),
            config,
            palette,
            clipper,
        })
    }

    /// Swap in a palette, e.g. the identity palette for inspecting raw colors
    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = palette;
        self
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Draw one frame of `scene` seen from `camera` into `target`.
    pub fn render_frame<T: PixelTarget + ?Sized>(
        &mut self,
        scene: &SceneGrid,
        textures: &dyn TextureProvider,
        camera: &Camera,
        arena: &mut FrameArena,
        target: &mut T,
    ) -> Result<FrameStats> {
        perf_scope!("render_frame");
        camera.validate()?;
        let frame_start = Instant::now();
        let mut stats = FrameStats::default();
        self.rasterizer.reset_stats();
        arena.reset();

        let (width, height) = (target.width(), target.height());
        let center = IVec2::new(width as i32 / 2, height as i32 / 2);
        let view = camera.view();

        let FrameArena {
            scheduler,
            sorter,
            vertices,
            order,
            mesh_rects,
        } = arena;

        let stage = Instant::now();
        scheduler.schedule(scene, camera.tile(), &self.config)?;
        stats.schedule = *scheduler.stats();
        stats.perf.schedule_us = stage.elapsed().as_secs_f64() * 1e6;

        for operation in scheduler.operations() {
            let Some((model, placement)) = resolve(scene, operation)? else {
                continue;
            };

            let stage = Instant::now();
            project_mesh(model, &view, &placement, center, vertices);
            stats.perf.projection_us += stage.elapsed().as_secs_f64() * 1e6;

            let rect = match ScreenRect::of_mesh(vertices, width, height) {
                Some(rect) if rect.intersects_target(width, height) => rect,
                _ => {
                    stats.meshes_offscreen += 1;
                    count_call!(FUNCTION_COUNTERS.meshes_offscreen);
                    continue;
                }
            };
            mesh_rects.push(MeshRect {
                operation: *operation,
                rect,
            });

            let stage = Instant::now();
            let sort = sorter.sort(model, vertices, model.bounds().min_depth_any_rotation, order)?;
            stats.sort.merge(&sort);
            stats.perf.sort_us += stage.elapsed().as_secs_f64() * 1e6;

            let stage = Instant::now();
            for &face in order.iter() {
                self.draw_face(model, face as usize, vertices, textures, &view, center, target, &mut stats)?;
            }
            stats.perf.raster_us += stage.elapsed().as_secs_f64() * 1e6;
            stats.meshes_drawn += 1;
        }

        stats.raster = *self.rasterizer.stats();
        stats.perf.total_us = frame_start.elapsed().as_secs_f64() * 1e6;
        log::debug!(
            "frame: {} operations, {} meshes drawn, {} offscreen, {} faces, {} pixels",
            stats.schedule.operations,
            stats.meshes_drawn,
            stats.meshes_offscreen,
            stats.sort.faces_sorted,
            stats.raster.pixels
        );
        Ok(stats)
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_face<T: PixelTarget + ?Sized>(
        &mut self,
        model: &Model,
        face: usize,
        vertices: &[ProjectedVertex],
        textures: &dyn TextureProvider,
        view: &ViewTransform,
        center: IVec2,
        target: &mut T,
        stats: &mut FrameStats,
    ) -> Result<()> {
        count_call!(FUNCTION_COUNTERS.raster_face_calls);
        let shade = model.face_shades[face];
        let Some(colors) = shade.corners() else {
            stats.faces_hidden += 1;
            return Ok(());
        };
        let alpha = model.face_alpha(face);
        let texture = match model.face_texture(face) {
            Some(id) => Some(textures.texture(id).ok_or(RenderError::MissingTexture(id))?),
            None => None,
        };
        let uvs = match texture {
            Some(texture) => texture_coords(model, face, texture.size() as f32),
            None => [(0.0, 0.0); 3],
        };

        let indices = model.faces[face];
        let corners = [
            vertices[indices[0] as usize],
            vertices[indices[1] as usize],
            vertices[indices[2] as usize],
        ];

        if corners.iter().all(|v| v.visible) {
            let tri = [0, 1, 2].map(|i| {
                let v = &corners[i];
                ScreenVertex::textured(v.screen.x, v.screen.y, v.camera.z, uvs[i].0, uvs[i].1, colors[i])
            });
            self.fill(target, &tri, shade, texture, alpha);
            return Ok(());
        }

        stats.faces_clipped += 1;
        count_call!(FUNCTION_COUNTERS.faces_clipped);
        let clip_face = [0, 1, 2].map(|i| ClipVertex::new(corners[i].camera, colors[i]).with_uv(uvs[i].0, uvs[i].1));
        let polygon = self
            .clipper
            .clip(&clip_face, view.near_plane_z, view.focal_length, center);
        for tri in polygon.triangles() {
            self.fill(target, &tri, shade, texture, alpha);
        }
        Ok(())
    }

    fn fill<T: PixelTarget + ?Sized>(
        &mut self,
        target: &mut T,
        tri: &[ScreenVertex; 3],
        shade: FaceShade,
        texture: Option<&Texture>,
        alpha: u8,
    ) {
        match (texture, shade) {
            (Some(texture), _) => {
                self.rasterizer.fill_textured(target, tri, texture, alpha);
            }
            (None, FaceShade::Flat(color)) => {
                let rgb = self.palette.rgb(color);
                self.rasterizer.fill_flat(target, tri, rgb, alpha);
            }
            (None, FaceShade::Gouraud(_)) => {
                self.rasterizer.fill_gouraud(target, tri, &self.palette, alpha);
            }
            (None, FaceShade::Hidden) => {}
        }
    }
}

/// Model and placement an operation draws; `None` for tiles without terrain
fn resolve<'a>(scene: &'a SceneGrid, operation: &DrawOperation) -> Result<Option<(&'a Model, Placement)>> {
    match operation {
        DrawOperation::Ground(coord) => match scene.tile(*coord).and_then(|t| t.ground) {
            Some(ground) => Ok(Some((scene.model(ground.model)?, ground.placement))),
            None => Ok(None),
        },
        other => match other.element() {
            Some(id) => {
                let element = scene.element(id);
                Ok(Some((scene.model(element.model)?, element.placement)))
            }
            None => Ok(None),
        },
    }
}

/// Transform every vertex of `model` into `out`. Depths are stored relative
/// to the model origin's camera depth.
pub fn project_mesh(
    model: &Model,
    view: &ViewTransform,
    placement: &Placement,
    center: IVec2,
    out: &mut Vec<ProjectedVertex>,
) {
    let yaw = Rotation::new(placement.yaw);
    let origin_z = view.to_camera_space(IVec3::ZERO, yaw, placement).z;
    let project = |i: usize| {
        let local = IVec3::new(model.vertices_x[i], model.vertices_y[i], model.vertices_z[i]);
        let camera = view.to_camera_space(local, yaw, placement);
        let visible = camera.z >= view.near_plane_z;
        ProjectedVertex {
            camera,
            screen: if visible {
                project_at(camera.x, camera.y, camera.z, view.focal_length, center)
            } else {
                IVec2::ZERO
            },
            depth: camera.z - origin_z,
            visible,
        }
    };

    let count = model.vertex_count();
    out.clear();

    #[cfg(feature = "parallel")]
    if count >= PARALLEL_VERTEX_THRESHOLD {
        use rayon::prelude::*;
        out.resize(count, ProjectedVertex::default());
        out.par_iter_mut().enumerate().for_each(|(i, v)| *v = project(i));
        return;
    }

    out.extend((0..count).map(project));
}

/// Texel coordinates of a face's corners in the plane spanned by its P, M, N vertices
pub fn texture_coords(model: &Model, face: usize, size: f32) -> [(f32, f32); 3] {
    let position = |i: u16| {
        let i = i as usize;
        Vec3::new(
            model.vertices_x[i] as f32,
            model.vertices_y[i] as f32,
            model.vertices_z[i] as f32,
        )
    };
    let [p, m, n] = model.texture_space(face).map(position);
    let (pm, pn) = (m - p, n - p);
    let scale = |axis: Vec3| {
        let len_sq = axis.length_squared();
        if len_sq > 0.0 {
            size / len_sq
        } else {
            0.0
        }
    };
    let (su, sv) = (scale(pm), scale(pn));
    model.faces[face].map(|i| {
        let d = position(i) - p;
        (d.dot(pm) * su, d.dot(pn) * sv)
    })
}
