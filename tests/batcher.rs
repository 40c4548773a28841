use image::RgbaImage;

use tilebatch::classify::{UnifiedRect, WaterKey};
use tilebatch::mesh::Attribute;
use tilebatch::{
    Bitmap, FlushOutcome, LayerState, MaterialVariant, NoWater, PresetWater, RectParams, RenderMode, ShadowSwitch,
    TileBatcher, TileConfig, SHADOW_SET,
};

fn small_config() -> TileConfig {
    TileConfig { layer_size: 64, initial_capacity: 2, ..TileConfig::default() }
}

fn batcher() -> TileBatcher {
    TileBatcher::new(small_config(), Box::new(NoWater), ShadowSwitch::new(false))
}

fn water_batcher(shadows: ShadowSwitch) -> TileBatcher {
    let water = PresetWater::new().with_water(1.0, 0.0).with_waterfall(0.0, 1.0);
    TileBatcher::new(small_config(), Box::new(water), shadows)
}

/// Group of set 0 water rects painted without an explicit kind.
fn water_key(waterfall: bool) -> WaterKey {
    WaterKey { set_number: 0, waterfall, kind: -1 }
}

fn bits<T: Copy + bytemuck::Pod>(attr: &Attribute<T>) -> Vec<u32> {
    bytemuck::cast_slice::<T, u32>(attr.as_slice()).to_vec()
}

#[test]
fn test_single_rect_geometry() {
    let mut b = TileBatcher::new(TileConfig::default(), Box::new(NoWater), ShadowSwitch::new(false));
    b.add_rect(0, 0.0, 0.0, 32.0, 32.0, 32.0, 32.0);
    assert_eq!(b.flush(), FlushOutcome::Rebuilt);

    let rec = b.unified().unwrap();
    assert!(rec.visible);
    let g = &rec.geometry;
    assert_eq!(g.vertex_count(), 6);

    // TL, TR, BL, TR, BR, BL
    assert_eq!(g.positions.as_slice()[0], [32.0, 32.0, 0.0]);
    assert_eq!(g.positions.as_slice()[4], [64.0, 64.0, 0.0]);
    assert_eq!(g.uvs.as_slice()[0], [0.0, 0.0]);
    assert_eq!(g.uvs.as_slice()[4], [32.0 / 768.0, 32.0 / 768.0]);
    assert!(g.layers.as_slice().iter().all(|&l| l == 0));
    assert!(g.normals.as_slice().iter().all(|&n| n == [0.0, 0.0, 1.0]));
    assert!(b.shadow().is_none());
    assert_eq!(b.water_meshes().count(), 0);
}

#[test]
fn test_layer_attribute_follows_set_number() {
    let mut b = batcher();
    b.add_rect(3, 0.0, 0.0, 0.0, 0.0, 16.0, 16.0);
    b.add_rect(7, 0.0, 0.0, 16.0, 0.0, 16.0, 16.0);
    b.flush();

    let layers = b.unified().unwrap().geometry.layers.as_slice().to_vec();
    assert_eq!(&layers[..6], &[3; 6]);
    assert_eq!(&layers[6..], &[7; 6]);
}

#[test]
fn test_rects_partition_into_unified_water_and_shadow() {
    let mut b = water_batcher(ShadowSwitch::new(false));
    b.set_bitmaps(&[Bitmap::from_image(RgbaImage::new(64, 64))]);

    b.add_rect(0, 0.0, 0.0, 0.0, 0.0, 16.0, 16.0);
    b.add_rect_with(0, RectParams::new(16.0, 0.0, 16.0, 0.0, 16.0, 16.0).anim(1.0, 0.0));
    b.add_rect_with(0, RectParams::new(32.0, 0.0, 32.0, 0.0, 16.0, 16.0).anim(0.0, 1.0));
    b.add_rect(SHADOW_SET, 0.0, 0.0, 4.0, 4.0, 16.0, 16.0);
    b.add_rect(SHADOW_SET, 0.0, 0.0, 20.0, 4.0, 16.0, 16.0);
    b.flush();

    let c = b.classification();
    assert_eq!(c.unified.len(), 1);
    assert_eq!(c.water_rect_count(), 2);
    assert_eq!(c.shadow_rects, 2);
    let total = c.unified.len() + c.water_rect_count() + c.shadow_rects;
    assert_eq!(total, b.rects().rect_count());

    let water = water_key(false);
    let fall = water_key(true);
    assert_eq!(c.water[&water], vec![1]);
    assert_eq!(c.water[&fall], vec![2]);

    assert_eq!(b.water_mesh(&water).unwrap().geometry.uniforms.flow, 0.0);
    assert_eq!(b.water_mesh(&fall).unwrap().geometry.uniforms.flow, 1.0);
    assert_eq!(b.shadow().unwrap().geometry.vertex_count(), 12);
    assert_eq!(b.unified().unwrap().geometry.vertex_count(), 6);
}

#[test]
fn test_sort_by_draw_z_is_stable() {
    let mut b = batcher();
    b.set_draw_z(2);
    b.add_rect(0, 0.0, 0.0, 0.0, 0.0, 8.0, 8.0);
    b.set_draw_z(1);
    b.add_rect(0, 0.0, 0.0, 8.0, 0.0, 8.0, 8.0);
    b.add_rect(0, 0.0, 0.0, 16.0, 0.0, 8.0, 8.0);
    b.flush();

    let order: Vec<UnifiedRect> = b.classification().unified.clone();
    let indices: Vec<usize> = order.iter().map(|r| r.index).collect();
    let zs: Vec<u8> = order.iter().map(|r| r.draw_z).collect();
    assert_eq!(indices, vec![1, 2, 0]);
    assert_eq!(zs, vec![1, 1, 2]);

    // Geometry follows the sorted order.
    let xs: Vec<f32> = b.unified().unwrap().geometry.positions.as_slice().iter().step_by(6).map(|p| p[0]).collect();
    assert_eq!(xs, vec![8.0, 16.0, 0.0]);
    assert_eq!(b.unified().unwrap().geometry.max_draw_z, 2);
}

#[test]
fn test_growth_keeps_every_rect() {
    let mut b = batcher();
    for i in 0..100 {
        b.add_rect(1, 0.0, 0.0, i as f32, 0.0, 1.0, 1.0);
    }
    b.flush();

    let set = b.rects().set(1).unwrap();
    assert_eq!(set.len(), 100);
    assert!(set.capacity() >= 100);
    let positions = b.unified().unwrap().geometry.positions.as_slice().to_vec();
    assert_eq!(positions.len(), 600);
    for i in 0..100 {
        assert_eq!(positions[i * 6][0], i as f32);
    }
}

#[test]
fn test_animation_only_change_patches_uvs() {
    let mut b = batcher();
    b.add_rect_with(0, RectParams::new(0.0, 0.0, 0.0, 0.0, 16.0, 16.0).anim(16.0, 0.0));
    assert_eq!(b.flush(), FlushOutcome::Rebuilt);

    let rec = b.unified().unwrap();
    let generation = rec.material_generation();
    let positions = bits(&rec.geometry.positions);

    b.set_animation_offset(1.0, 0.0);
    assert_eq!(b.flush(), FlushOutcome::UvPatched);
    let rec = b.unified().unwrap();
    assert!(rec.geometry.uvs.is_dirty());
    assert_eq!(bits(&rec.geometry.positions), positions);
    assert_eq!(rec.geometry.uvs.as_slice()[0], [16.0 / 64.0, 0.0]);
    assert_eq!(rec.material_generation(), generation);
}

#[test]
fn test_uv_patch_matches_full_rebuild() {
    let image = || Bitmap::from_image(RgbaImage::new(64, 32));
    let paint = |b: &mut TileBatcher| {
        b.add_rect_with(0, RectParams::new(0.0, 0.0, 0.0, 0.0, 16.0, 16.0).anim(16.0, 16.0));
        b.add_rect_with(2, RectParams::new(8.0, 8.0, 16.0, 0.0, 8.0, 8.0).anim(3.0, 0.5));
        b.add_rect_with(0, RectParams::new(16.0, 0.0, 32.0, 0.0, 16.0, 16.0).anim(1.0, 0.0));
    };

    let mut patched = water_batcher(ShadowSwitch::new(false));
    patched.set_bitmaps(&[image(), image(), image()]);
    paint(&mut patched);
    patched.flush();
    patched.set_animation_offset(0.37, 1.25);
    assert_eq!(patched.flush(), FlushOutcome::UvPatched);

    let mut rebuilt = water_batcher(ShadowSwitch::new(false));
    rebuilt.set_bitmaps(&[image(), image(), image()]);
    paint(&mut rebuilt);
    rebuilt.set_animation_offset(0.37, 1.25);
    assert_eq!(rebuilt.flush(), FlushOutcome::Rebuilt);

    let (a, b) = (&patched.unified().unwrap().geometry, &rebuilt.unified().unwrap().geometry);
    assert_eq!(bits(&a.uvs), bits(&b.uvs));

    let key = water_key(false);
    let (a, b) = (&patched.water_mesh(&key).unwrap().geometry, &rebuilt.water_mesh(&key).unwrap().geometry);
    assert_eq!(bits(&a.uvs), bits(&b.uvs));
    assert_eq!(bits(&a.bounds), bits(&b.bounds));
}

#[test]
fn test_water_uvs_flip_and_inset_half_texel() {
    let mut b = water_batcher(ShadowSwitch::new(false));
    b.set_bitmaps(&[Bitmap::from_image(RgbaImage::new(64, 32))]);
    b.add_rect_with(0, RectParams::new(16.0, 8.0, 0.0, 0.0, 16.0, 8.0).anim(1.0, 0.0));
    b.flush();

    let key = water_key(false);
    let g = &b.water_mesh(&key).unwrap().geometry;
    assert_eq!(g.texture_size, (64, 32));

    // Top-left vertex: v flipped to a bottom-left origin.
    assert_eq!(g.uvs.as_slice()[0], [16.0 / 64.0, 1.0 - 8.0 / 32.0]);

    let [min_u, min_v, max_u, max_v] = g.bounds.as_slice()[0];
    let eps = 1e-6;
    assert!((min_u - (16.0 / 64.0 + 0.5 / 64.0)).abs() < eps);
    assert!((max_u - (32.0 / 64.0 - 0.5 / 64.0)).abs() < eps);
    assert!((min_v - (1.0 - 16.0 / 32.0 + 0.5 / 32.0)).abs() < eps);
    assert!((max_v - (1.0 - 8.0 / 32.0 - 0.5 / 32.0)).abs() < eps);
    assert!(g.bounds.as_slice().iter().all(|bd| *bd == g.bounds.as_slice()[0]));
}

#[test]
fn test_shadow_only_layer() {
    let mut b = batcher();
    b.add_rect(SHADOW_SET, 0.0, 0.0, 10.0, 10.0, 20.0, 20.0);
    b.flush();

    assert!(b.unified().is_none());
    let shadow = b.shadow().unwrap();
    assert!(shadow.visible);
    assert_eq!(shadow.geometry.vertex_count(), 6);
    assert_eq!(shadow.material().unwrap().variant, MaterialVariant::Unlit);

    b.clear();
    b.flush();
    assert!(!b.shadow().unwrap().visible);
}

#[test]
fn test_empty_stream_hides_but_keeps_mesh() {
    let mut b = batcher();
    b.add_rect(0, 0.0, 0.0, 0.0, 0.0, 8.0, 8.0);
    b.flush();
    b.clear();
    b.flush();
    let rec = b.unified().unwrap();
    assert!(!rec.visible);
}

#[test]
fn test_flush_without_changes_is_a_no_op() {
    let mut b = batcher();
    b.add_rect(0, 0.0, 0.0, 0.0, 0.0, 8.0, 8.0);
    assert_eq!(b.flush(), FlushOutcome::Rebuilt);
    assert_eq!(b.state(), LayerState::Idle);
    let generation = b.unified().unwrap().material_generation();
    assert_eq!(b.flush(), FlushOutcome::Unchanged);
    assert_eq!(b.flush(), FlushOutcome::Unchanged);
    assert_eq!(b.unified().unwrap().material_generation(), generation);
}

#[test]
fn test_shadow_switch_swaps_material_variant() {
    let shadows = ShadowSwitch::new(false);
    let mut b = TileBatcher::new(small_config(), Box::new(NoWater), shadows.clone());
    b.set_draw_z(1);
    b.add_rect(0, 0.0, 0.0, 0.0, 0.0, 8.0, 8.0);
    b.flush();

    let rec = b.unified().unwrap();
    let before = rec.material_generation();
    assert_eq!(rec.material().unwrap().variant, MaterialVariant::Unlit);

    shadows.set_active(true);
    assert_eq!(b.flush(), FlushOutcome::Unchanged);
    let rec = b.unified().unwrap();
    let material = rec.material().unwrap();
    assert_eq!(material.variant, MaterialVariant::Lit);
    assert!(material.cast_shadows);
    assert!(material.receive_shadows);
    assert_eq!(rec.material_generation(), before + 1);

    // Flipping again without any other change still swaps.
    shadows.set_active(false);
    b.flush();
    assert_eq!(b.unified().unwrap().material_generation(), before + 2);
}

#[test]
fn test_water_group_waits_for_its_texture() {
    let pending = Bitmap::pending();
    let mut b = water_batcher(ShadowSwitch::new(false));
    b.set_bitmaps(&[pending.clone()]);
    b.add_rect_with(0, RectParams::new(0.0, 0.0, 0.0, 0.0, 16.0, 16.0).anim(1.0, 0.0));
    b.add_rect(0, 0.0, 0.0, 16.0, 0.0, 16.0, 16.0);
    b.flush();

    let key = water_key(false);
    assert!(b.water_mesh(&key).is_none());
    assert!(b.unified().unwrap().visible);
    assert_eq!(b.flush(), FlushOutcome::Unchanged);

    pending.load(RgbaImage::new(32, 32));
    assert_eq!(b.flush(), FlushOutcome::Rebuilt);
    let rec = b.water_mesh(&key).unwrap();
    assert!(rec.visible);
    assert_eq!(rec.geometry.vertex_count(), 6);
    assert_eq!(rec.geometry.texture_size, (32, 32));

    // A new image for a visible group rebuilds it against the new size.
    pending.load(RgbaImage::new(64, 64));
    assert_eq!(b.flush(), FlushOutcome::Rebuilt);
    assert_eq!(b.water_mesh(&key).unwrap().geometry.texture_size, (64, 64));
}

#[test]
fn test_rebinding_a_water_tileset_rebuilds_against_the_new_bitmap() {
    let first = Bitmap::from_image(RgbaImage::new(32, 32));
    let mut b = water_batcher(ShadowSwitch::new(false));
    b.set_bitmaps(&[first.clone()]);
    b.add_rect_with(0, RectParams::new(0.0, 0.0, 0.0, 0.0, 16.0, 16.0).anim(1.0, 0.0));
    b.flush();
    let key = water_key(false);
    assert_eq!(b.water_mesh(&key).unwrap().geometry.texture_revision, first.revision());

    // A different bitmap that has been loaded the same number of times.
    let second = Bitmap::from_image(RgbaImage::new(64, 16));
    assert_eq!(first.version(), second.version());
    b.set_bitmaps(&[second.clone()]);
    assert_eq!(b.flush(), FlushOutcome::Rebuilt);

    let g = &b.water_mesh(&key).unwrap().geometry;
    assert_eq!(g.texture_revision, second.revision());
    assert_ne!(g.texture_revision, first.revision());
    assert_eq!(g.texture_size, (64, 16));
    assert_eq!(b.flush(), FlushOutcome::Unchanged);
}

#[test]
fn test_set_bitmaps_restages_every_layer() {
    let mut b = batcher();
    b.set_bitmaps(&[Bitmap::from_image(RgbaImage::new(8, 8)), Bitmap::from_image(RgbaImage::new(8, 8))]);
    b.add_rect(0, 0.0, 0.0, 0.0, 0.0, 8.0, 8.0);
    b.add_rect(1, 0.0, 0.0, 8.0, 0.0, 8.0, 8.0);
    assert_eq!(b.flush(), FlushOutcome::Rebuilt);
    assert_eq!(b.flush(), FlushOutcome::Unchanged);
    assert_eq!(b.layers().copy_count(), 2);

    b.set_bitmaps(&[Bitmap::from_image(RgbaImage::new(8, 8)), Bitmap::from_image(RgbaImage::new(8, 8))]);
    assert_eq!(b.state(), LayerState::Dirty);
    assert!(!b.layers().is_loaded(0));
    assert!(!b.layers().is_loaded(1));

    assert_eq!(b.flush(), FlushOutcome::Rebuilt);
    assert_eq!(b.layers().copy_count(), 4);
    assert!(b.layers().is_loaded(0));
    assert!(b.layers().is_loaded(1));
    assert!(b.layers().needs_update());
    assert!(b.layers().clear_pending());
    assert_eq!(b.state(), LayerState::Idle);
}

#[test]
fn test_explicit_kinds_split_water_groups() {
    let mut b = water_batcher(ShadowSwitch::new(false));
    b.set_bitmaps(&[Bitmap::from_image(RgbaImage::new(32, 32))]);
    b.add_rect_with(0, RectParams::new(0.0, 0.0, 0.0, 0.0, 16.0, 16.0).anim(1.0, 0.0).kind(2));
    b.add_rect_with(0, RectParams::new(0.0, 0.0, 16.0, 0.0, 16.0, 16.0).anim(1.0, 0.0));
    b.flush();

    let with_kind = WaterKey { set_number: 0, waterfall: false, kind: 2 };
    assert_eq!(b.water_mesh(&with_kind).unwrap().geometry.vertex_count(), 6);
    assert_eq!(b.water_mesh(&water_key(false)).unwrap().geometry.vertex_count(), 6);
    assert_eq!(b.classification().water_group_count(), 2);
}

#[test]
fn test_perspective_top_layer_gets_depth_bias() {
    let mut b = batcher();
    b.add_rect(0, 0.0, 0.0, 0.0, 0.0, 8.0, 8.0);
    b.flush();
    assert!(!b.unified().unwrap().material().unwrap().depth_test);

    b.set_render_mode(RenderMode::Perspective);
    assert_eq!(b.state(), LayerState::Dirty);
    assert_eq!(b.flush(), FlushOutcome::Rebuilt);
    let material = *b.unified().unwrap().material().unwrap();
    assert!(material.depth_test && material.depth_write);
    assert_eq!(material.depth_bias, -2);
    assert_eq!(material.alpha_cutoff, Some(0.5));
}

#[test]
fn test_elevation_offsets_z_by_draw_layer() {
    let mut b = batcher();
    b.set_elevation(true);
    b.set_draw_z(3);
    b.add_rect(0, 0.0, 0.0, 0.0, 0.0, 8.0, 8.0);
    b.flush();
    let z = b.unified().unwrap().geometry.positions.as_slice()[0][2];
    assert_eq!(z, -3.0);
}

#[test]
fn test_update_time_marks_water_uniforms() {
    let mut b = water_batcher(ShadowSwitch::new(false));
    b.set_bitmaps(&[Bitmap::from_image(RgbaImage::new(16, 16))]);
    b.add_rect_with(0, RectParams::new(0.0, 0.0, 0.0, 0.0, 16.0, 16.0).anim(1.0, 0.0));
    b.flush();

    b.update_time(2.5);
    let key = water_key(false);
    let g = &b.water_mesh(&key).unwrap().geometry;
    assert_eq!(g.uniforms.time, 2.5);
    assert!(g.uniforms_dirty);

    // A rebuild keeps the running clock.
    b.add_rect(0, 0.0, 0.0, 16.0, 0.0, 16.0, 16.0);
    b.flush();
    assert_eq!(b.water_mesh(&key).unwrap().geometry.uniforms.time, 2.5);
}
