use std::path::Path;

use serde::Deserialize;

use crate::error::TileError;

// ── RenderMode ────────────────────────────────────────────────────────────────

/// How the tile layer is composited into the frame.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    /// Flat 2D compositing: no depth test or write, alpha blended, tiles are
    /// drawn in submission order and always on top of earlier geometry.
    #[default]
    Overlay,
    /// 3D compositing: depth test and write with alpha cutout.
    Perspective,
}

// ── TileConfig ────────────────────────────────────────────────────────────────

/// Static configuration of a tile layer.
///
/// Every field has a default, so a JSON document only needs to name the
/// values it overrides:
/// ```json
/// { "layer_size": 1024, "mode": "perspective", "elevation": true }
/// ```
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct TileConfig {
    /// Width and height in pixels of every array-texture layer.
    pub layer_size: u32,
    /// Number of array-texture layers (tileset slots).
    pub layer_count: u32,
    /// Rects reserved per RectSet when it is first created.
    pub initial_capacity: usize,
    /// Offset tiles along Z by their draw layer (overlay mode only).
    pub elevation: bool,
    /// World units between two consecutive draw layers when `elevation` is on.
    pub elevation_step: f32,
    pub mode: RenderMode,
    /// Constant depth bias applied to the topmost draw layer in perspective
    /// mode when elevation is off.  Negative pulls toward the camera.
    pub top_layer_depth_bias: i32,
    /// Fragments with alpha below this are discarded in perspective mode.
    pub alpha_cutoff: f32,
    /// Initial RGBA of the flat shadow batch.
    pub shadow_color: [f32; 4],
}

impl Default for TileConfig {
    fn default() -> Self {
        Self {
            layer_size:           768,
            layer_count:          9,
            initial_capacity:     64,
            elevation:            false,
            elevation_step:       1.0,
            mode:                 RenderMode::Overlay,
            top_layer_depth_bias: -2,
            alpha_cutoff:         0.5,
            shadow_color:         [0.0, 0.0, 0.0, 0.5],
        }
    }
}

impl TileConfig {
    /// Parse a JSON configuration; missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, TileError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON configuration file.
    pub fn from_file(path: &Path) -> Result<Self, TileError> {
        let json = std::fs::read_to_string(path)
            .map_err(|source| TileError::Io { path: path.to_path_buf(), source })?;
        Self::from_json(&json)
    }

    /// Z offset for a rect painted on `draw_z`.
    ///
    /// Only overlay mode with elevation enabled offsets tiles; perspective
    /// mode relies on depth bias instead.
    pub fn elevation_z(&self, draw_z: u8) -> f32 {
        if self.elevation && self.mode == RenderMode::Overlay {
            -(draw_z as f32) * self.elevation_step
        } else {
            0.0
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_yields_defaults() {
        let cfg = TileConfig::from_json("{}").unwrap();
        assert_eq!(cfg, TileConfig::default());
    }

    #[test]
    fn partial_json_overrides_only_named_fields() {
        let cfg = TileConfig::from_json(r#"{ "layer_size": 1024, "mode": "perspective" }"#).unwrap();
        assert_eq!(cfg.layer_size, 1024);
        assert_eq!(cfg.mode, RenderMode::Perspective);
        assert_eq!(cfg.layer_count, 9);
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = TileConfig::from_json("{ layer_size: }").unwrap_err();
        assert!(matches!(err, TileError::Config(_)));
    }

    #[test]
    fn unreadable_config_file_is_an_io_error() {
        let path = std::env::temp_dir().join("tilebatch_config_that_does_not_exist.json");
        let err = TileConfig::from_file(&path).unwrap_err();
        match err {
            TileError::Io { path: p, source } => {
                assert_eq!(p, path);
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("expected Io, got {other:?}"),
        }
    }

    #[test]
    fn config_file_is_parsed() {
        let path = std::env::temp_dir().join(format!("tilebatch_config_{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "initial_capacity": 32 }"#).unwrap();
        let cfg = TileConfig::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(cfg.initial_capacity, 32);
    }

    #[test]
    fn elevation_only_applies_in_overlay_mode() {
        let mut cfg = TileConfig { elevation: true, elevation_step: 2.0, ..TileConfig::default() };
        assert_eq!(cfg.elevation_z(3), -6.0);
        cfg.mode = RenderMode::Perspective;
        assert_eq!(cfg.elevation_z(3), 0.0);
        cfg.mode = RenderMode::Overlay;
        cfg.elevation = false;
        assert_eq!(cfg.elevation_z(3), 0.0);
    }
}
