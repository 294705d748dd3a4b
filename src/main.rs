/// Headless demo: renders the sample scene from a turning camera and logs
/// per-frame statistics. Optionally writes the last frame as a PPM image.
use anyhow::Context;
use clap::Parser;
use glam::IVec3;
use mimalloc::MiMalloc;
use std::io::Write;
use std::path::{Path, PathBuf};
use tile_painter::scene::shapes::{sample_scene, sample_textures};
use tile_painter::scene::TILE_SIZE;
use tile_painter::*;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const WIDTH: usize = 640;
const HEIGHT: usize = 360;
const SCENE_SIZE: i32 = 32;
const SKY: u32 = 0x0087_CEEB;

#[derive(clap::Parser, Debug)]
#[command(name = "tile_painter", version, about = "Render the sample scene headlessly", long_about = None)]
struct Args {
    /// Render config in TOML; defaults apply when omitted
    config: Option<PathBuf>,

    /// Number of frames to render while the camera turns
    #[arg(long, default_value_t = 8)]
    frames: u32,

    /// Write the last frame as a binary PPM
    #[arg(long)]
    out: Option<PathBuf>,
}

fn write_ppm(path: &Path, buffer: &PixelBuffer) -> std::io::Result<()> {
    let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
    write!(file, "P6\n{} {}\n255\n", buffer.width, buffer.height)?;
    for &pixel in &buffer.pixels {
        file.write_all(&[(pixel >> 16) as u8, (pixel >> 8) as u8, pixel as u8])?;
    }
    file.flush()
}

fn run(args: Args) -> anyhow::Result<()> {
    let config = match &args.config {
        Some(path) => RenderConfig::load(path)?,
        None => RenderConfig::default(),
    };

    let scene = sample_scene(SCENE_SIZE)?;
    let textures = sample_textures()?;
    let mut renderer = Renderer::new(config.clone())?;
    let mut arena = FrameArena::new();
    let mut buffer = PixelBuffer::new(WIDTH, HEIGHT);

    let mid = SCENE_SIZE / 2 * TILE_SIZE + TILE_SIZE / 2;
    let mut totals = PerfStats::new();
    FUNCTION_COUNTERS.reset();

    for frame in 0..args.frames {
        let yaw = (frame as i32 * 2048 / args.frames.max(1) as i32) % 2048;
        let camera = Camera::new(IVec3::new(mid, -720, mid), 180, yaw).with_config(&config);

        buffer.clear(SKY);
        let stats = renderer.render_frame(&scene, &textures, &camera, &mut arena, &mut buffer)?;

        log::info!(
            "frame {} yaw {}: {} tiles, {} ops, {} meshes ({} offscreen), {} faces, {} clipped, {} px in {:.2}ms",
            frame,
            yaw,
            stats.schedule.tiles_visited,
            stats.schedule.operations,
            stats.meshes_drawn,
            stats.meshes_offscreen,
            stats.sort.faces_sorted,
            stats.faces_clipped,
            stats.raster.pixels,
            stats.perf.total_us / 1000.0
        );
        totals.schedule_us += stats.perf.schedule_us;
        totals.projection_us += stats.perf.projection_us;
        totals.sort_us += stats.perf.sort_us;
        totals.raster_us += stats.perf.raster_us;
        totals.total_us += stats.perf.total_us;
    }

    log::info!("=== Totals over {} frames ===", args.frames);
    totals.log_summary();
    if cfg!(feature = "profiling") {
        FUNCTION_COUNTERS.snapshot().log_report();
    }

    if let Some(path) = &args.out {
        write_ppm(path, &buffer).with_context(|| format!("writing {}", path.display()))?;
        log::info!("wrote {}", path.display());
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run(Args::parse()) {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arguments_parse_with_defaults() {
        let args = Args::try_parse_from(["tile_painter"]).unwrap();
        assert_eq!(args.frames, 8);
        assert!(args.config.is_none() && args.out.is_none());

        let args = Args::try_parse_from(["tile_painter", "view.toml", "--frames", "3", "--out", "f.ppm"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("view.toml")));
        assert_eq!(args.frames, 3);
        assert_eq!(args.out, Some(PathBuf::from("f.ppm")));

        assert!(Args::try_parse_from(["tile_painter", "--frames", "many"]).is_err());
    }

    #[test]
    fn ppm_header_and_pixels() {
        let path = std::env::temp_dir().join(format!("tile_painter_{}.ppm", std::process::id()));
        let mut buffer = PixelBuffer::new(2, 1);
        buffer.set_pixel(0, 0, 0x0011_2233);
        buffer.set_pixel(1, 0, 0x00AA_BBCC);
        write_ppm(&path, &buffer).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(bytes, b"P6\n2 1\n255\n\x11\x22\x33\xAA\xBB\xCC");
    }

    #[test]
    fn unwritable_output_is_an_io_error() {
        let out = std::env::temp_dir()
            .join(format!("tile_painter_missing_{}", std::process::id()))
            .join("frame.ppm");
        let err = run(Args {
            config: None,
            frames: 1,
            out: Some(out),
        })
        .unwrap_err();
        assert!(err.to_string().starts_with("writing "));
        assert!(err.downcast_ref::<RenderError>().is_none());
        assert!(err.root_cause().downcast_ref::<std::io::Error>().is_some());
    }
}
