/// Benchmark suite for the scanline fills and the whole frame pipeline.
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::IVec3;
use tile_painter::rendering::rasterizer::OPAQUE;
use tile_painter::rendering::shading::FULL_SHADE;
use tile_painter::scene::shapes::{sample_scene, sample_textures};
use tile_painter::scene::TILE_SIZE;
use tile_painter::{
    Camera, FrameArena, Palette, PixelBuffer, Rasterizer, RenderConfig, Renderer, ScreenVertex,
    Texture, TextureStrategy, TextureWrap,
};

const SKY: u32 = 0x0087_CEEB;

fn large_triangle() -> [ScreenVertex; 3] {
    [
        ScreenVertex::textured(40, 20, 120, 0.0, 0.0, FULL_SHADE),
        ScreenVertex::textured(600, 90, 400, 63.0, 0.0, FULL_SHADE),
        ScreenVertex::textured(180, 340, 200, 0.0, 63.0, FULL_SHADE),
    ]
}

fn bench_fill_flat(c: &mut Criterion) {
    c.bench_function("fill_flat", |b| {
        let mut buffer = PixelBuffer::new(640, 360);
        let mut raster = Rasterizer::default();
        let tri = large_triangle();

        b.iter(|| {
            raster.fill_flat(&mut buffer, black_box(&tri), 0x00AA_5533, OPAQUE);
        });
    });
}

fn bench_fill_gouraud(c: &mut Criterion) {
    let palette = Palette::hsl16(0.8);
    let mut group = c.benchmark_group("fill_gouraud");
    for (name, alpha) in [("opaque", OPAQUE), ("blended", 128)] {
        group.bench_function(name, |b| {
            let mut buffer = PixelBuffer::new(640, 360);
            let mut raster = Rasterizer::default();
            let tri = [
                ScreenVertex::new(40, 20, 0x2840),
                ScreenVertex::new(600, 90, 0x2870),
                ScreenVertex::new(180, 340, 0x2810),
            ];

            b.iter(|| {
                raster.fill_gouraud(&mut buffer, black_box(&tri), &palette, alpha);
            });
        });
    }
    group.finish();
}

fn bench_fill_textured(c: &mut Criterion) {
    let mut group = c.benchmark_group("fill_textured");
    let texture = Texture::checkerboard(64, 0x00C0_9050, 0x0060_3020, 8).unwrap();
    let clamped = Texture::new(64, vec![0x0011_2233; 64 * 64], true, TextureWrap::Clamp).unwrap();

    for strategy in [TextureStrategy::PerPixel, TextureStrategy::Lerp8] {
        for (name, texture) in [("repeat", &texture), ("clamp", &clamped)] {
            let id = BenchmarkId::new(format!("{:?}", strategy), name);
            group.bench_function(id, |b| {
                let mut buffer = PixelBuffer::new(640, 360);
                let mut raster = Rasterizer::new(strategy);
                let tri = large_triangle();

                b.iter(|| {
                    raster.fill_textured(&mut buffer, black_box(&tri), texture, OPAQUE);
                });
            });
        }
    }
    group.finish();
}

fn bench_render_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_frame");
    group.sample_size(20);

    for size in [16, 32, 64] {
        let scene = sample_scene(size).unwrap();
        let textures = sample_textures().unwrap();
        let mid = size / 2 * TILE_SIZE + TILE_SIZE / 2;
        let camera = Camera::new(IVec3::new(mid, -720, mid), 180, 300);

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            let mut renderer = Renderer::new(RenderConfig::default()).unwrap();
            let mut arena = FrameArena::new();
            let mut buffer = PixelBuffer::new(640, 360);

            b.iter(|| {
                buffer.clear(SKY);
                renderer
                    .render_frame(black_box(&scene), &textures, &camera, &mut arena, &mut buffer)
                    .unwrap()
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_fill_flat,
    bench_fill_gouraud,
    bench_fill_textured,
    bench_render_frame,
);
criterion_main!(benches);
