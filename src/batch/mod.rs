pub mod rect_set;

use std::collections::BTreeMap;

pub use rect_set::{RectMeta, RectSet, FLOATS_PER_RECT, VERTS_PER_RECT};

/// Set number reserved for flat shadow rects.
pub const SHADOW_SET: i32 = -1;
/// Highest paint-order layer accepted by the z-cursor.
pub const MAX_DRAW_Z: u8 = 3;

// ── RectParams ────────────────────────────────────────────────────────────────

/// One tile draw command.  `anim_x`, `anim_y` and `kind` default to the
/// "static, unclassified" values.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RectParams {
    pub u: f32,
    pub v: f32,
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    pub anim_x: f32,
    pub anim_y: f32,
    pub kind: i32,
}

impl RectParams {
    pub fn new(u: f32, v: f32, x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { u, v, x, y, w, h, anim_x: 0.0, anim_y: 0.0, kind: -1 }
    }

    /// Per-rect multipliers for the global animation phase.
    pub fn anim(mut self, anim_x: f32, anim_y: f32) -> Self {
        self.anim_x = anim_x;
        self.anim_y = anim_y;
        self
    }

    pub fn kind(mut self, kind: i32) -> Self {
        self.kind = kind;
        self
    }
}

// ── RectAccumulator ───────────────────────────────────────────────────────────

/// All rects painted since the last `clear`, bucketed by set number.
///
/// Buckets are created on first use and only ever reset, never dropped, so
/// their buffers survive across frames.  Iteration order is ascending set
/// number, which puts the shadow set first.
#[derive(Debug)]
pub struct RectAccumulator {
    sets: BTreeMap<i32, RectSet>,
    initial_capacity: usize,
    draw_z: u8,
}

impl RectAccumulator {
    pub fn new(initial_capacity: usize) -> Self {
        Self { sets: BTreeMap::new(), initial_capacity, draw_z: 0 }
    }

    /// Tag every following `add` with paint layer `z` (clamped to 0..=3).
    pub fn set_draw_z(&mut self, z: u8) {
        if z > MAX_DRAW_Z {
            log::warn!("draw z {z} out of range; clamped to {MAX_DRAW_Z}");
        }
        self.draw_z = z.min(MAX_DRAW_Z);
    }

    pub fn draw_z(&self) -> u8 {
        self.draw_z
    }

    /// Append one quad to the bucket for `set_number`.  The set number is not
    /// range-checked.
    pub fn add(&mut self, set_number: i32, p: RectParams) {
        let capacity = self.initial_capacity;
        let meta = RectMeta { anim_x: p.anim_x, anim_y: p.anim_y, kind: p.kind, draw_z: self.draw_z };
        self.sets
            .entry(set_number)
            .or_insert_with(|| RectSet::with_capacity(capacity))
            .push(p.u, p.v, p.x, p.y, p.w, p.h, meta);
    }

    /// Reset every bucket without freeing it.  The z-cursor is kept.
    pub fn clear(&mut self) {
        for set in self.sets.values_mut() {
            set.clear();
        }
    }

    pub fn set(&self, set_number: i32) -> Option<&RectSet> {
        self.sets.get(&set_number)
    }

    /// Non-empty buckets in ascending set-number order.
    pub fn iter(&self) -> impl Iterator<Item = (i32, &RectSet)> {
        self.sets.iter().filter(|(_, s)| !s.is_empty()).map(|(&n, s)| (n, s))
    }

    /// Total rects across every bucket.
    pub fn rect_count(&self) -> usize {
        self.sets.values().map(RectSet::len).sum()
    }
}
