// ── Shader templates ──────────────────────────────────────────────────────────
//
// Every tile material shares one WGSL skeleton:
//
//   prelude          camera / light / material-parameter bindings
//   sampler stage    vertex I/O, vs_main and `base_color(in)`
//   lighting         `shade(color, normal)`, lit or unlit
//   fragment entry   alpha cutout + shade
//
// A variant is assembled once from these pieces and cached by `ShaderKey`.

use std::collections::HashMap;

use crate::material::MaterialVariant;

/// Which texture path feeds `base_color`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SamplerStage {
    /// `texture_2d_array` sampled at `(uv, layer)`.
    ArrayLayer,
    /// Full-resolution tileset texture behind the water distortion stage.
    WaterDistortion,
    /// Flat colour from the material parameters (shadow batch).
    FlatColor,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ShaderKey {
    pub stage: SamplerStage,
    pub variant: MaterialVariant,
}

const PRELUDE: &str = r#"
struct Camera {
    view_proj: mat4x4<f32>,
};

struct Light {
    ambient: vec4<f32>,
    direction: vec4<f32>,
    color: vec4<f32>,
    // x = shadow strength
    shadow: vec4<f32>,
};

struct MaterialParams {
    color: vec4<f32>,
    alpha_cutoff: f32,
    receive_shadows: f32,
    _p0: f32,
    _p1: f32,
};

@group(0) @binding(0) var<uniform> camera: Camera;
@group(0) @binding(1) var<uniform> light: Light;
@group(1) @binding(3) var<uniform> params: MaterialParams;
"#;

const ARRAY_LAYER_STAGE: &str = r#"
@group(1) @binding(0) var tile_array: texture_2d_array<f32>;
@group(1) @binding(1) var tile_smp: sampler;
// Bound to the shared placeholder; never sampled.
@group(1) @binding(2) var base_map: texture_2d<f32>;

struct VertexIn {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
    @location(3) layer: u32,
};

struct VertexOut {
    @builtin(position) clip: vec4<f32>,
    @location(0) normal: vec3<f32>,
    @location(1) uv: vec2<f32>,
    @location(2) @interpolate(flat) layer: u32,
};

@vertex
fn vs_main(in: VertexIn) -> VertexOut {
    var out: VertexOut;
    out.clip = camera.view_proj * vec4<f32>(in.position, 1.0);
    out.normal = in.normal;
    out.uv = in.uv;
    out.layer = in.layer;
    return out;
}

fn base_color(in: VertexOut) -> vec4<f32> {
    return textureSample(tile_array, tile_smp, in.uv, in.layer);
}
"#;

const WATER_STAGE: &str = r#"
struct WaterParams {
    tint: vec4<f32>,
    amplitude: f32,
    frequency: f32,
    speed: f32,
    time: f32,
    flow: f32,
    _p0: f32,
    _p1: f32,
    _p2: f32,
};

@group(1) @binding(0) var water_tex: texture_2d<f32>;
@group(1) @binding(1) var water_smp: sampler;
@group(1) @binding(2) var base_map: texture_2d<f32>;
@group(1) @binding(4) var<uniform> water: WaterParams;

struct VertexIn {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
    @location(3) bounds: vec4<f32>,
};

struct VertexOut {
    @builtin(position) clip: vec4<f32>,
    @location(0) normal: vec3<f32>,
    @location(1) uv: vec2<f32>,
    @location(2) bounds: vec4<f32>,
};

@vertex
fn vs_main(in: VertexIn) -> VertexOut {
    var out: VertexOut;
    out.clip = camera.view_proj * vec4<f32>(in.position, 1.0);
    out.normal = in.normal;
    // Texture rows run top-down; the mesh stores bottom-up UVs.
    out.uv = vec2<f32>(in.uv.x, 1.0 - in.uv.y);
    out.bounds = vec4<f32>(in.bounds.x, 1.0 - in.bounds.w, in.bounds.z, 1.0 - in.bounds.y);
    return out;
}

fn base_color(in: VertexOut) -> vec4<f32> {
    return water_sample(in.uv, in.bounds);
}
"#;

const FLAT_COLOR_STAGE: &str = r#"
struct VertexIn {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
};

struct VertexOut {
    @builtin(position) clip: vec4<f32>,
    @location(0) normal: vec3<f32>,
};

@vertex
fn vs_main(in: VertexIn) -> VertexOut {
    var out: VertexOut;
    out.clip = camera.view_proj * vec4<f32>(in.position, 1.0);
    out.normal = in.normal;
    return out;
}

fn base_color(in: VertexOut) -> vec4<f32> {
    return params.color;
}
"#;

const UNLIT: &str = r#"
fn shade(color: vec4<f32>, normal: vec3<f32>) -> vec4<f32> {
    return color;
}
"#;

const LIT: &str = r#"
fn shade(color: vec4<f32>, normal: vec3<f32>) -> vec4<f32> {
    let n = normalize(normal);
    let ndl = max(dot(n, -normalize(light.direction.xyz)), 0.0);
    let shadow = 1.0 - light.shadow.x * params.receive_shadows;
    let lit = light.ambient.rgb + light.color.rgb * ndl * shadow;
    return vec4<f32>(color.rgb * lit, color.a);
}
"#;

const FRAGMENT_ENTRY: &str = r#"
@fragment
fn fs_main(in: VertexOut) -> @location(0) vec4<f32> {
    let color = base_color(in);
    if (color.a < params.alpha_cutoff) {
        discard;
    }
    return shade(color, in.normal);
}
"#;

/// Assemble the WGSL source for `key`.  `water_stage` supplies
/// `water_sample` and is only used by [`SamplerStage::WaterDistortion`].
pub fn compose(key: ShaderKey, water_stage: &str) -> String {
    let (stage, extra) = match key.stage {
        SamplerStage::ArrayLayer => (ARRAY_LAYER_STAGE, ""),
        SamplerStage::WaterDistortion => (WATER_STAGE, water_stage),
        SamplerStage::FlatColor => (FLAT_COLOR_STAGE, ""),
    };
    let lighting = match key.variant {
        MaterialVariant::Lit => LIT,
        MaterialVariant::Unlit => UNLIT,
    };
    [PRELUDE, stage, extra, lighting, FRAGMENT_ENTRY].concat()
}

// ── ShaderLibrary ─────────────────────────────────────────────────────────────

/// Composed sources, built on first request per key.
#[derive(Debug, Default)]
pub struct ShaderLibrary {
    sources: HashMap<ShaderKey, String>,
}

impl ShaderLibrary {
    pub fn source(&mut self, key: ShaderKey, water_stage: impl FnOnce() -> String) -> &str {
        self.sources.entry(key).or_insert_with(|| {
            log::debug!("composing shader {key:?}");
            let stage = if key.stage == SamplerStage::WaterDistortion { water_stage() } else { String::new() };
            compose(key, &stage)
        })
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
