use crate::material::MaterialSpec;
use crate::shader::{SamplerStage, ShaderKey};

// ── Vertex attributes ─────────────────────────────────────────────────────────
//
// Every attribute lives in its own vertex buffer so the UV-only patch can
// re-upload a single stream.

const POSITION: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];
const NORMAL: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![1 => Float32x3];
const UV: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![2 => Float32x2];
const LAYER: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![3 => Uint32];
const BOUNDS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![3 => Float32x4];

fn stream(stride: usize, attributes: &'static [wgpu::VertexAttribute]) -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: stride as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes,
    }
}

/// Vertex buffer layouts in slot order for a sampler stage.
pub fn vertex_layouts(stage: SamplerStage) -> Vec<wgpu::VertexBufferLayout<'static>> {
    let f = std::mem::size_of::<f32>();
    let mut layouts = vec![stream(3 * f, &POSITION), stream(3 * f, &NORMAL)];
    match stage {
        SamplerStage::ArrayLayer => {
            layouts.push(stream(2 * f, &UV));
            layouts.push(stream(std::mem::size_of::<u32>(), &LAYER));
        }
        SamplerStage::WaterDistortion => {
            layouts.push(stream(2 * f, &UV));
            layouts.push(stream(4 * f, &BOUNDS));
        }
        SamplerStage::FlatColor => {}
    }
    layouts
}

// ── Uniforms ──────────────────────────────────────────────────────────────────

/// Per-material parameters (WGSL `MaterialParams`).
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialParams {
    pub color: [f32; 4],
    pub alpha_cutoff: f32,
    pub receive_shadows: f32,
    pub _pad: [f32; 2],
}

impl MaterialParams {
    pub fn new(spec: &MaterialSpec, color: [f32; 4]) -> Self {
        Self {
            color,
            alpha_cutoff: spec.alpha_cutoff.unwrap_or(0.0),
            receive_shadows: if spec.receive_shadows { 1.0 } else { 0.0 },
            _pad: [0.0; 2],
        }
    }
}

// ── Bind group layouts ────────────────────────────────────────────────────────

pub struct BindLayouts {
    /// group 0: camera + light uniforms.
    pub frame: wgpu::BindGroupLayout,
    /// group 1 of the unified batch: array texture, sampler, base map, params.
    pub tiles: wgpu::BindGroupLayout,
    /// group 1 of a water group: source texture, sampler, base map, params, water params.
    pub water: wgpu::BindGroupLayout,
    /// group 1 of the shadow batch: params only.
    pub flat: wgpu::BindGroupLayout,
}

impl BindLayouts {
    pub fn for_stage(&self, stage: SamplerStage) -> &wgpu::BindGroupLayout {
        match stage {
            SamplerStage::ArrayLayer => &self.tiles,
            SamplerStage::WaterDistortion => &self.water,
            SamplerStage::FlatColor => &self.flat,
        }
    }
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn texture_entry(binding: u32, view_dimension: wgpu::TextureViewDimension) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

pub fn create_bind_layouts(device: &wgpu::Device) -> BindLayouts {
    let vs_fs = wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT;

    let frame = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("tile_frame_bgl"),
        entries: &[uniform_entry(0, vs_fs), uniform_entry(1, wgpu::ShaderStages::FRAGMENT)],
    });

    let tiles = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("tile_array_bgl"),
        entries: &[
            texture_entry(0, wgpu::TextureViewDimension::D2Array),
            sampler_entry(1),
            texture_entry(2, wgpu::TextureViewDimension::D2),
            uniform_entry(3, wgpu::ShaderStages::FRAGMENT),
        ],
    });

    let water = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("tile_water_bgl"),
        entries: &[
            texture_entry(0, wgpu::TextureViewDimension::D2),
            sampler_entry(1),
            texture_entry(2, wgpu::TextureViewDimension::D2),
            uniform_entry(3, wgpu::ShaderStages::FRAGMENT),
            uniform_entry(4, wgpu::ShaderStages::FRAGMENT),
        ],
    });

    let flat = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("tile_flat_bgl"),
        entries: &[uniform_entry(3, wgpu::ShaderStages::FRAGMENT)],
    });

    BindLayouts { frame, tiles, water, flat }
}

// ── Pipeline ──────────────────────────────────────────────────────────────────

/// Build the render pipeline for one material.
///
/// Every pipeline carries a depth-stencil state, so the render pass that
/// draws the layer must have a `depth_format` attachment; overlay materials
/// simply never test or write it.
pub fn create_material_pipeline(
    device: &wgpu::Device,
    layouts: &BindLayouts,
    shader: &wgpu::ShaderModule,
    key: ShaderKey,
    spec: &MaterialSpec,
    color_format: wgpu::TextureFormat,
    depth_format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("tile_material_layout"),
        bind_group_layouts: &[&layouts.frame, layouts.for_stage(key.stage)],
        ..Default::default()
    });

    let buffers = vertex_layouts(key.stage);

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(&format!("tile_material_{:?}_{:?}", key.stage, key.variant)),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &buffers,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend: spec.blend.then_some(wgpu::BlendState::ALPHA_BLENDING),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: depth_format,
            depth_write_enabled: spec.depth_write,
            depth_compare: if spec.depth_test {
                wgpu::CompareFunction::LessEqual
            } else {
                wgpu::CompareFunction::Always
            },
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState {
                constant: spec.depth_bias,
                slope_scale: if spec.depth_bias != 0 { -1.0 } else { 0.0 },
                clamp: 0.0,
            },
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}
