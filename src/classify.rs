// ── Classification ────────────────────────────────────────────────────────────
//
// Splits the accumulated rects into three streams:
// - the shadow set (set number -1) goes to the flat shadow batch,
// - rects the water classifier claims are grouped per (set, waterfall, kind),
// - everything else joins the unified list, stable-sorted by draw z.

use std::collections::BTreeMap;

use crate::batch::{RectAccumulator, SHADOW_SET};
use crate::water::WaterClassifier;

/// One rect routed to the unified batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnifiedRect {
    pub set_number: i32,
    pub index: usize,
    pub draw_z: u8,
}

/// Identity of one water mesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WaterKey {
    pub set_number: i32,
    pub waterfall: bool,
    pub kind: i32,
}

#[derive(Debug, Default)]
pub struct Classification {
    /// Sorted ascending by `draw_z`; ties keep insertion order.
    pub unified: Vec<UnifiedRect>,
    /// Rect indices per water group, in insertion order.  Groups seen by
    /// earlier frames stay in the map with their storage; an empty list
    /// means the group has no rects this frame.
    pub water: BTreeMap<WaterKey, Vec<usize>>,
    /// Number of rects in the shadow set.
    pub shadow_rects: usize,
}

impl Classification {
    pub fn clear(&mut self) {
        self.unified.clear();
        for indices in self.water.values_mut() {
            indices.clear();
        }
        self.shadow_rects = 0;
    }

    /// Water groups with at least one rect this frame.
    pub fn water_groups(&self) -> impl Iterator<Item = (&WaterKey, &[usize])> {
        self.water
            .iter()
            .filter(|(_, indices)| !indices.is_empty())
            .map(|(key, indices)| (key, indices.as_slice()))
    }

    pub fn water_group_count(&self) -> usize {
        self.water_groups().count()
    }

    pub fn water_rect_count(&self) -> usize {
        self.water.values().map(Vec::len).sum()
    }
}

/// Decide whether rect metadata marks a water tile, and if so whether it is
/// a waterfall.
pub fn water_kind_of(
    water: &dyn WaterClassifier,
    anim_x: f32,
    anim_y: f32,
    kind: i32,
) -> Option<bool> {
    if !water.is_kind_enabled(kind) {
        return None;
    }
    let waterfall = water.is_waterfall_rect(anim_x, anim_y);
    if waterfall || water.is_water_rect(anim_x, anim_y) {
        Some(waterfall)
    } else {
        None
    }
}

/// Rebuild `out` from the current contents of `rects`.
pub fn classify(rects: &RectAccumulator, water: &dyn WaterClassifier, out: &mut Classification) {
    out.clear();

    for (set_number, set) in rects.iter() {
        if set_number == SHADOW_SET {
            out.shadow_rects = set.len();
            continue;
        }
        for index in 0..set.len() {
            let meta = set.meta(index);
            match water_kind_of(water, meta.anim_x, meta.anim_y, meta.kind) {
                Some(waterfall) => {
                    let key = WaterKey { set_number, waterfall, kind: meta.kind };
                    out.water.entry(key).or_default().push(index);
                }
                None => out.unified.push(UnifiedRect { set_number, index, draw_z: meta.draw_z }),
            }
        }
    }

    // `sort_by_key` is stable: equal draw z keeps paint order.
    out.unified.sort_by_key(|r| r.draw_z);
}

// ── Tests ──────────────────────────────────────────────────────────────────────
