use glam::{Mat4, Vec3};

/// Camera uniform uploaded to the GPU: the combined view-projection matrix.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    /// Column-major 4×4 view-projection matrix (WGSL `mat4x4<f32>`).
    pub view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    /// Pixel-space orthographic projection for overlay mode.
    /// Maps `[0..w] × [0..h]` (y down) to clip space; tile Z in
    /// `[-depth..depth]` maps into the unit depth range.
    pub fn overlay(width: f32, height: f32) -> Self {
        let depth = 16.0;
        let proj = Mat4::orthographic_rh(0.0, width, height, 0.0, -depth, depth);
        Self { view_proj: proj.to_cols_array_2d() }
    }

    /// Perspective view of the pixel-space tile plane.
    ///
    /// `eye` and `target` are in the same pixel units as the rect positions;
    /// the tile plane is z = 0 with +y pointing down the map.
    pub fn perspective(eye: Vec3, target: Vec3, fov_y_radians: f32, aspect: f32) -> Self {
        let view = Mat4::look_at_rh(eye, target, Vec3::NEG_Y);
        let proj = Mat4::perspective_rh(fov_y_radians, aspect.max(1e-3), 1.0, 100_000.0);
        Self { view_proj: (proj * view).to_cols_array_2d() }
    }
}

/// Scene light consumed by the lit material variant.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    pub ambient: [f32; 4],
    /// Direction the light travels (xyz); w unused.
    pub direction: [f32; 4],
    pub color: [f32; 4],
    /// x = shadow strength applied to receiving materials.
    pub shadow: [f32; 4],
}

impl Default for LightUniform {
    fn default() -> Self {
        Self {
            ambient: [0.55, 0.55, 0.6, 1.0],
            direction: [0.3, 0.5, -1.0, 0.0],
            color: [0.5, 0.5, 0.45, 1.0],
            shadow: [0.35, 0.0, 0.0, 0.0],
        }
    }
}
