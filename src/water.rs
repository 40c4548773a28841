// ── Water collaborator ────────────────────────────────────────────────────────
//
// The tile core does not know what water looks like.  It asks a
// `WaterClassifier` whether a rect's animation signature marks it as water
// or waterfall, which kinds are enabled, which uniform preset a kind uses and
// which fragment stage distorts it.  The numeric meaning of the signature
// belongs entirely to the classifier.

use std::collections::{HashMap, HashSet};

use serde::Deserialize;

use crate::error::TileError;
use crate::material::MaterialVariant;

// ── WaterUniforms ─────────────────────────────────────────────────────────────

/// Per-kind distortion parameters uploaded to the water material.
///
/// Layout matches the WGSL `WaterParams` struct (std140-compatible, 48 bytes).
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable, Deserialize)]
#[serde(default)]
pub struct WaterUniforms {
    pub tint: [f32; 4],
    /// Wave displacement in UV units.
    pub amplitude: f32,
    /// Waves per UV unit.
    pub frequency: f32,
    /// Phase advance per second.
    pub speed: f32,
    /// Seconds, advanced by [`WaterClassifier::advance_time`].
    pub time: f32,
    /// 1.0 for waterfall groups (vertical flow), 0.0 otherwise.
    pub flow: f32,
    pub _pad: [f32; 3],
}

impl Default for WaterUniforms {
    fn default() -> Self {
        Self {
            tint: [1.0, 1.0, 1.0, 1.0],
            amplitude: 0.002,
            frequency: 40.0,
            speed: 1.5,
            time: 0.0,
            flow: 0.0,
            _pad: [0.0; 3],
        }
    }
}

// ── WaterClassifier ───────────────────────────────────────────────────────────

pub trait WaterClassifier {
    fn is_water_rect(&self, anim_x: f32, anim_y: f32) -> bool;

    fn is_waterfall_rect(&self, anim_x: f32, anim_y: f32) -> bool;

    fn is_kind_enabled(&self, kind: i32) -> bool;

    fn uniforms_for_kind(&self, kind: i32) -> WaterUniforms;

    /// WGSL body of `fn water_sample(uv: vec2<f32>, bounds: vec4<f32>) -> vec4<f32>`.
    ///
    /// The stage may read `water_tex`, `water_smp` and `water` (a
    /// `WaterParams`) and must clamp its distorted coordinate to `bounds`
    /// (`min_u, min_v, max_u, max_v`).
    fn fragment_stage(&self, variant: MaterialVariant) -> String {
        let _ = variant;
        DEFAULT_DISTORTION_STAGE.to_string()
    }

    /// Per-frame uniform update.
    fn advance_time(&self, uniforms: &mut WaterUniforms, seconds: f32) {
        uniforms.time = seconds;
    }
}

/// Sine-wave distortion used when a classifier brings no stage of its own.
pub const DEFAULT_DISTORTION_STAGE: &str = r#"
fn water_sample(uv: vec2<f32>, bounds: vec4<f32>) -> vec4<f32> {
    let phase = water.time * water.speed;
    let wave = vec2<f32>(
        sin(uv.y * water.frequency + phase),
        cos(uv.x * water.frequency + phase),
    ) * water.amplitude;
    let flow = vec2<f32>(0.0, water.flow * fract(phase * 0.1) * (bounds.w - bounds.y));
    let p = clamp(uv + wave - flow, bounds.xy, bounds.zw);
    return textureSample(water_tex, water_smp, p) * water.tint;
}
"#;

/// Classifier that treats nothing as water.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoWater;

impl WaterClassifier for NoWater {
    fn is_water_rect(&self, _: f32, _: f32) -> bool {
        false
    }

    fn is_waterfall_rect(&self, _: f32, _: f32) -> bool {
        false
    }

    fn is_kind_enabled(&self, _: i32) -> bool {
        false
    }

    fn uniforms_for_kind(&self, _: i32) -> WaterUniforms {
        WaterUniforms::default()
    }
}

// ── PresetWater ───────────────────────────────────────────────────────────────

/// Table-driven classifier: water is whatever animation signature the
/// table lists.  No thresholds are derived from the values.
///
/// ```json
/// {
///   "water": [[-2.0, 0.0]],
///   "waterfall": [[0.0, -4.0]],
///   "disabled_kinds": [3],
///   "presets": { "1": { "amplitude": 0.004, "tint": [0.8, 0.9, 1.0, 1.0] } }
/// }
/// ```
#[derive(Clone, Debug, Default)]
pub struct PresetWater {
    water: HashSet<(u32, u32)>,
    waterfall: HashSet<(u32, u32)>,
    disabled_kinds: HashSet<i32>,
    presets: HashMap<i32, WaterUniforms>,
    fallback: WaterUniforms,
}

#[derive(Deserialize)]
struct PresetWaterFile {
    #[serde(default)]
    water: Vec<[f32; 2]>,
    #[serde(default)]
    waterfall: Vec<[f32; 2]>,
    #[serde(default)]
    disabled_kinds: Vec<i32>,
    #[serde(default)]
    presets: HashMap<i32, WaterUniforms>,
    #[serde(default)]
    fallback: WaterUniforms,
}

fn signature(anim_x: f32, anim_y: f32) -> (u32, u32) {
    // Normalise -0.0 so it matches 0.0.
    ((anim_x + 0.0).to_bits(), (anim_y + 0.0).to_bits())
}

impl PresetWater {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, TileError> {
        let file: PresetWaterFile = serde_json::from_str(json)?;
        let mut preset = Self { fallback: file.fallback, presets: file.presets, ..Self::default() };
        for [x, y] in file.water {
            preset = preset.with_water(x, y);
        }
        for [x, y] in file.waterfall {
            preset = preset.with_waterfall(x, y);
        }
        preset.disabled_kinds.extend(file.disabled_kinds);
        Ok(preset)
    }

    pub fn with_water(mut self, anim_x: f32, anim_y: f32) -> Self {
        self.water.insert(signature(anim_x, anim_y));
        self
    }

    pub fn with_waterfall(mut self, anim_x: f32, anim_y: f32) -> Self {
        self.waterfall.insert(signature(anim_x, anim_y));
        self
    }

    pub fn with_preset(mut self, kind: i32, uniforms: WaterUniforms) -> Self {
        self.presets.insert(kind, uniforms);
        self
    }

    pub fn disable_kind(mut self, kind: i32) -> Self {
        self.disabled_kinds.insert(kind);
        self
    }
}

impl WaterClassifier for PresetWater {
    fn is_water_rect(&self, anim_x: f32, anim_y: f32) -> bool {
        self.water.contains(&signature(anim_x, anim_y))
    }

    fn is_waterfall_rect(&self, anim_x: f32, anim_y: f32) -> bool {
        self.waterfall.contains(&signature(anim_x, anim_y))
    }

    fn is_kind_enabled(&self, kind: i32) -> bool {
        !self.disabled_kinds.contains(&kind)
    }

    fn uniforms_for_kind(&self, kind: i32) -> WaterUniforms {
        self.presets.get(&kind).copied().unwrap_or(self.fallback)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniforms_are_48_bytes() {
        assert_eq!(std::mem::size_of::<WaterUniforms>(), 48);
    }

    #[test]
    fn preset_water_matches_exact_signatures_only() {
        let w = PresetWater::new().with_water(-2.0, 0.0);
        assert!(w.is_water_rect(-2.0, 0.0));
        assert!(w.is_water_rect(-2.0, -0.0));
        assert!(!w.is_water_rect(-2.5, 0.0));
        assert!(!w.is_waterfall_rect(-2.0, 0.0));
    }

    #[test]
    fn preset_water_parses_json() {
        let w = PresetWater::from_json(
            r#"{ "water": [[-2.0, 0.0]], "waterfall": [[0.0, -4.0]],
                 "disabled_kinds": [3],
                 "presets": { "1": { "amplitude": 0.01 } } }"#,
        )
        .unwrap();
        assert!(w.is_water_rect(-2.0, 0.0));
        assert!(w.is_waterfall_rect(0.0, -4.0));
        assert!(!w.is_kind_enabled(3));
        assert!(w.is_kind_enabled(1));
        assert_eq!(w.uniforms_for_kind(1).amplitude, 0.01);
        assert_eq!(w.uniforms_for_kind(7), WaterUniforms::default());
    }

    #[test]
    fn default_time_update_sets_time() {
        let mut u = WaterUniforms::default();
        NoWater.advance_time(&mut u, 2.5);
        assert_eq!(u.time, 2.5);
    }
}
