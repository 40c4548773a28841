// ── RectSet ───────────────────────────────────────────────────────────────────
//
// Growable per-tileset quad storage.  Positions and UVs are kept as flat
// `f32` arrays (6 vertices × 2 components per rect) sized to `capacity`,
// so a frame with the same rect count as the previous one reuses every
// buffer without touching the allocator.

/// Floats per rect in the position and UV arrays (6 vertices × xy).
pub const FLOATS_PER_RECT: usize = 12;
/// Vertices per rect (two triangles).
pub const VERTS_PER_RECT: usize = 6;

/// Per-rect metadata parallel to the geometry arrays.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RectMeta {
    pub anim_x: f32,
    pub anim_y: f32,
    /// Opaque sub-classification; `-1` means none.
    pub kind: i32,
    /// Paint-order / elevation layer (0..=3).
    pub draw_z: u8,
}

/// Geometry and metadata for every rect added to one set number this frame.
#[derive(Clone, Debug)]
pub struct RectSet {
    positions: Vec<f32>,
    uvs: Vec<f32>,
    anim_x: Vec<f32>,
    anim_y: Vec<f32>,
    kind: Vec<i32>,
    draw_z: Vec<u8>,
    count: usize,
    capacity: usize,
}

impl RectSet {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            positions: vec![0.0; capacity * FLOATS_PER_RECT],
            uvs: vec![0.0; capacity * FLOATS_PER_RECT],
            anim_x: Vec::with_capacity(capacity),
            anim_y: Vec::with_capacity(capacity),
            kind: Vec::with_capacity(capacity),
            draw_z: Vec::with_capacity(capacity),
            count: 0,
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append one quad.  `(u, v)` is the source pixel origin, `(x, y)` the
    /// destination pixel origin; both rects share the `w × h` extent.
    ///
    /// Vertex order is TL, TR, BL / TR, BR, BL.
    #[allow(clippy::too_many_arguments)]
    pub fn push(&mut self, u: f32, v: f32, x: f32, y: f32, w: f32, h: f32, meta: RectMeta) {
        if self.count == self.capacity {
            self.grow();
        }
        let base = self.count * FLOATS_PER_RECT;
        write_quad(&mut self.positions[base..base + FLOATS_PER_RECT], x, y, w, h);
        write_quad(&mut self.uvs[base..base + FLOATS_PER_RECT], u, v, w, h);

        self.anim_x.push(meta.anim_x);
        self.anim_y.push(meta.anim_y);
        self.kind.push(meta.kind);
        self.draw_z.push(meta.draw_z);
        self.count += 1;
    }

    /// Forget every rect but keep the allocations for the next frame.
    pub fn clear(&mut self) {
        self.count = 0;
        self.anim_x.clear();
        self.anim_y.clear();
        self.kind.clear();
        self.draw_z.clear();
    }

    /// Double the capacity, carrying existing rects over unchanged.
    fn grow(&mut self) {
        let new_capacity = self.capacity * 2;
        let mut positions = vec![0.0; new_capacity * FLOATS_PER_RECT];
        let mut uvs = vec![0.0; new_capacity * FLOATS_PER_RECT];
        let used = self.count * FLOATS_PER_RECT;
        positions[..used].copy_from_slice(&self.positions[..used]);
        uvs[..used].copy_from_slice(&self.uvs[..used]);
        self.positions = positions;
        self.uvs = uvs;
        self.capacity = new_capacity;
        log::trace!("rect set grew to {new_capacity} rects");
    }

    /// The 12 position floats of rect `index`.
    pub fn quad_positions(&self, index: usize) -> &[f32] {
        let base = index * FLOATS_PER_RECT;
        &self.positions[base..base + FLOATS_PER_RECT]
    }

    /// The 12 pixel-space UV floats of rect `index`.
    pub fn quad_uvs(&self, index: usize) -> &[f32] {
        let base = index * FLOATS_PER_RECT;
        &self.uvs[base..base + FLOATS_PER_RECT]
    }

    pub fn meta(&self, index: usize) -> RectMeta {
        RectMeta {
            anim_x: self.anim_x[index],
            anim_y: self.anim_y[index],
            kind: self.kind[index],
            draw_z: self.draw_z[index],
        }
    }

    /// Active positions (`len() * 12` floats).
    pub fn positions(&self) -> &[f32] {
        &self.positions[..self.count * FLOATS_PER_RECT]
    }

    /// Active pixel-space UVs (`len() * 12` floats).
    pub fn uvs(&self) -> &[f32] {
        &self.uvs[..self.count * FLOATS_PER_RECT]
    }

    pub fn draw_z(&self) -> &[u8] {
        &self.draw_z
    }

    pub fn kinds(&self) -> &[i32] {
        &self.kind
    }
}

fn write_quad(out: &mut [f32], x: f32, y: f32, w: f32, h: f32) {
    let (x2, y2) = (x + w, y + h);
    out.copy_from_slice(&[
        x, y, x2, y, x, y2, // TL, TR, BL
        x2, y, x2, y2, x, y2, // TR, BR, BL
    ]);
}

// ── Tests ──────────────────────────────────────────────────────────────────────
