use crate::config::{RenderMode, TileConfig};

// ── MaterialVariant ───────────────────────────────────────────────────────────

/// Lighting flavour of a tile or water material.
///
/// A mesh never mutates its material between variants: switching releases
/// the old material and builds a new one from a fresh [`MaterialSpec`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MaterialVariant {
    /// Shaded by the scene light; used while shadow casting is active.
    Lit,
    Unlit,
}

impl MaterialVariant {
    pub fn select(shadows_active: bool) -> Self {
        if shadows_active { Self::Lit } else { Self::Unlit }
    }
}

// ── RenderContext ─────────────────────────────────────────────────────────────

/// Where this tile layer sits in the caller's layer stack.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RenderContext {
    pub layer_index: u32,
    /// The topmost layer gets a depth bias in perspective mode so it wins
    /// against coplanar tiles of the layers below.
    pub is_top_layer: bool,
}

impl Default for RenderContext {
    fn default() -> Self {
        Self { layer_index: 0, is_top_layer: true }
    }
}

// ── MaterialSpec ──────────────────────────────────────────────────────────────

/// Complete fixed-function and shading description of one mesh material.
/// Two equal specs produce identical pipelines.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MaterialSpec {
    pub variant: MaterialVariant,
    pub depth_test: bool,
    pub depth_write: bool,
    pub blend: bool,
    /// Discard threshold, perspective mode only.
    pub alpha_cutoff: Option<f32>,
    pub depth_bias: i32,
    pub cast_shadows: bool,
    pub receive_shadows: bool,
}

impl MaterialSpec {
    /// Material of the unified tile batch.
    pub fn tiles(cfg: &TileConfig, ctx: RenderContext, variant: MaterialVariant, max_draw_z: u8) -> Self {
        let lit = variant == MaterialVariant::Lit;
        match cfg.mode {
            RenderMode::Overlay => Self {
                variant,
                depth_test: false,
                depth_write: false,
                blend: true,
                alpha_cutoff: None,
                depth_bias: 0,
                cast_shadows: lit && max_draw_z > 0,
                receive_shadows: lit,
            },
            RenderMode::Perspective => Self {
                variant,
                depth_test: true,
                depth_write: true,
                blend: true,
                alpha_cutoff: Some(cfg.alpha_cutoff),
                depth_bias: if ctx.is_top_layer && !cfg.elevation { cfg.top_layer_depth_bias } else { 0 },
                cast_shadows: lit && max_draw_z > 0,
                receive_shadows: lit,
            },
        }
    }

    /// Material of one water group.  Water never receives shadows.
    pub fn water(cfg: &TileConfig, variant: MaterialVariant) -> Self {
        let perspective = cfg.mode == RenderMode::Perspective;
        Self {
            variant,
            depth_test: perspective,
            depth_write: false,
            blend: true,
            alpha_cutoff: None,
            depth_bias: 0,
            cast_shadows: false,
            receive_shadows: false,
        }
    }

    /// Material of the flat shadow batch.
    pub fn shadow(cfg: &TileConfig) -> Self {
        Self {
            variant: MaterialVariant::Unlit,
            depth_test: cfg.mode == RenderMode::Perspective,
            depth_write: false,
            blend: true,
            alpha_cutoff: None,
            depth_bias: 0,
            cast_shadows: false,
            receive_shadows: false,
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
