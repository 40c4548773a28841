// Headless demo: paints a small procedural map into a tile layer, animates
// it for a few frames and renders each frame into an offscreen target.
//
//     tilebatch [TILESET_DIR] [CONFIG_JSON]
//
// Without a folder, nine generated tilesets are used.
use std::path::Path;

use image::{Rgba, RgbaImage};

use tilebatch::bitmap::{self, Bitmap};
use tilebatch::camera::CameraUniform;
use tilebatch::{FlushOutcome, PresetWater, RectParams, ShadowSwitch, TileConfig, TileError, TileLayer, WaterUniforms};

const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

const TILE: f32 = 32.0;
const MAP_W: u32 = 24;
const MAP_H: u32 = 16;
const FRAMES: u32 = 8;

// Animation signatures the demo's classifier recognises.
const WATER_ANIM: (f32, f32) = (1.0, 0.0);
const WATERFALL_ANIM: (f32, f32) = (0.0, 1.0);
const TORCH_ANIM: (f32, f32) = (2.0, 0.0);

fn init_logging() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .try_init();
}

fn main() -> Result<(), TileError> {
    init_logging();
    let mut args = std::env::args().skip(1);
    let folder = args.next();
    let cfg = match args.next() {
        Some(path) => TileConfig::from_file(Path::new(&path))?,
        None => TileConfig::default(),
    };
    pollster::block_on(run(folder.as_deref().map(Path::new), cfg))
}

/// Nine flat-coloured tilesets with a grid, so every layer is visibly distinct.
fn generated_tilesets(count: u32) -> Vec<Bitmap> {
    (0..count)
        .map(|i| {
            let hue = i as f32 / count as f32;
            let base = [
                (96.0 + 159.0 * hue) as u8,
                (200.0 - 120.0 * hue) as u8,
                (64.0 + 64.0 * (1.0 - hue)) as u8,
                255,
            ];
            let img = RgbaImage::from_fn(256, 256, |x, y| {
                if x % 32 == 0 || y % 32 == 0 {
                    Rgba([base[0] / 2, base[1] / 2, base[2] / 2, 255])
                } else {
                    Rgba(base)
                }
            });
            Bitmap::from_image(img)
        })
        .collect()
}

fn demo_water() -> PresetWater {
    PresetWater::new()
        .with_water(WATER_ANIM.0, WATER_ANIM.1)
        .with_waterfall(WATERFALL_ANIM.0, WATERFALL_ANIM.1)
        .with_preset(
            1,
            WaterUniforms { tint: [0.7, 0.8, 1.0, 0.9], amplitude: 0.004, ..WaterUniforms::default() },
        )
}

/// Paint ground, a river, a waterfall, a few torches and their shadows.
fn paint_map(layer: &mut TileLayer, sets: i32) {
    layer.clear();
    for y in 0..MAP_H {
        for x in 0..MAP_W {
            let (px, py) = (x as f32 * TILE, y as f32 * TILE);
            let set = ((x / 4 + y / 4) as i32) % sets.max(1);

            layer.set_draw_z(0);
            layer.add_rect(set, 0.0, 0.0, px, py, TILE, TILE);

            if x == MAP_W / 2 {
                let anim = if y < 4 { WATERFALL_ANIM } else { WATER_ANIM };
                let params = RectParams::new(TILE, 0.0, px, py, TILE, TILE).anim(anim.0, anim.1).kind(1);
                layer.add_rect_with(0, params);
            } else if (x * 7 + y * 3) % 23 == 0 {
                layer.set_draw_z(1);
                layer.add_rect(tilebatch::SHADOW_SET, 0.0, 0.0, px + 6.0, py + 6.0, TILE, TILE);
                layer.set_draw_z(2);
                let params = RectParams::new(2.0 * TILE, 0.0, px, py, TILE, TILE).anim(TORCH_ANIM.0, TORCH_ANIM.1);
                layer.add_rect_with(set, params);
            }
        }
    }
}

async fn run(folder: Option<&Path>, cfg: TileConfig) -> Result<(), TileError> {
    let instance = wgpu::Instance::default();
    let adapter = instance.request_adapter(&wgpu::RequestAdapterOptions::default()).await?;
    let (device, queue) = adapter.request_device(&wgpu::DeviceDescriptor::default()).await?;
    log::info!("adapter: {}", adapter.get_info().name);

    let tilesets = match folder {
        Some(dir) => bitmap::load_folder(dir, cfg.layer_count as usize)?,
        None => generated_tilesets(cfg.layer_count),
    };

    let (width, height) = (MAP_W * TILE as u32, MAP_H * TILE as u32);
    let shadows = ShadowSwitch::global();
    shadows.set_active(true);

    let mut layer = TileLayer::new(&device, &queue, COLOR_FORMAT, DEPTH_FORMAT, cfg, Box::new(demo_water()), shadows);
    layer.update_camera(&queue, &CameraUniform::overlay(width as f32, height as f32));
    layer.set_bitmaps(&tilesets);
    paint_map(&mut layer, tilesets.len() as i32);

    let target = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("demo_target"),
        size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: COLOR_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let depth = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("demo_depth"),
        size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let target_view = target.create_view(&wgpu::TextureViewDescriptor::default());
    let depth_view = depth.create_view(&wgpu::TextureViewDescriptor::default());

    let mut patched = 0;
    for frame in 0..FRAMES {
        // Torches step one tile column per frame; water runs on the clock.
        layer.set_animation_offset((frame % 4) as f32, 0.0);
        layer.update_time(&queue, frame as f32 / 60.0);
        if layer.flush(&device, &queue) == FlushOutcome::UvPatched {
            patched += 1;
        }

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("demo_frame") });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("demo_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target_view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            layer.draw(&mut pass);
        }
        queue.submit(std::iter::once(encoder.finish()));
    }

    let batcher = layer.batcher();
    let classes = batcher.classification();
    log::info!(
        "{} rects: {} unified, {} water in {} group(s), {} shadow; {} layer copies; {} uv-only frames",
        batcher.rects().rect_count(),
        classes.unified.len(),
        classes.water_rect_count(),
        classes.water_group_count(),
        classes.shadow_rects,
        batcher.layers().copy_count(),
        patched,
    );

    layer.destroy();
    target.destroy();
    depth.destroy();
    tilebatch::renderer::placeholder::teardown();
    Ok(())
}
