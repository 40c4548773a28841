use std::collections::HashMap;
use std::sync::Arc;

use wgpu::util::DeviceExt;

use super::gpu_mesh::GpuMaterial;
use super::pipeline::{create_bind_layouts, create_material_pipeline, BindLayouts, MaterialParams};
use super::placeholder::Placeholder;
use crate::bitmap::Revision;
use crate::material::MaterialSpec;
use crate::shader::{SamplerStage, ShaderKey, ShaderLibrary};
use crate::water::{WaterClassifier, WaterUniforms};

/// Textures a material binds in group 1.
pub enum MaterialTextures<'a> {
    /// The tile array and its sampler.
    Array { view: &'a wgpu::TextureView, sampler: &'a wgpu::Sampler },
    /// A tileset's full-resolution texture plus the group's water uniforms.
    Water { view: &'a wgpu::TextureView, revision: Revision, uniforms: &'a WaterUniforms },
    Flat,
}

impl MaterialTextures<'_> {
    fn stage(&self) -> SamplerStage {
        match self {
            Self::Array { .. } => SamplerStage::ArrayLayer,
            Self::Water { .. } => SamplerStage::WaterDistortion,
            Self::Flat => SamplerStage::FlatColor,
        }
    }
}

/// Builds GPU materials: layouts, composed shaders, compiled modules and
/// the samplers they share.
pub struct MaterialFactory {
    layouts: BindLayouts,
    shaders: ShaderLibrary,
    modules: HashMap<ShaderKey, wgpu::ShaderModule>,
    placeholder: Arc<Placeholder>,
    water_sampler: wgpu::Sampler,
    color_format: wgpu::TextureFormat,
    depth_format: wgpu::TextureFormat,
}

impl MaterialFactory {
    pub fn new(
        device: &wgpu::Device,
        placeholder: Arc<Placeholder>,
        color_format: wgpu::TextureFormat,
        depth_format: wgpu::TextureFormat,
    ) -> Self {
        let water_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("tile_water_sampler"),
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        Self {
            layouts: create_bind_layouts(device),
            shaders: ShaderLibrary::default(),
            modules: HashMap::new(),
            placeholder,
            water_sampler,
            color_format,
            depth_format,
        }
    }

    /// Bind group layout of group 0 (camera + light).
    pub fn frame_layout(&self) -> &wgpu::BindGroupLayout {
        &self.layouts.frame
    }

    fn shader_module(
        &mut self,
        device: &wgpu::Device,
        water: &dyn WaterClassifier,
        key: ShaderKey,
    ) -> &wgpu::ShaderModule {
        let source = self.shaders.source(key, || water.fragment_stage(key.variant));
        self.modules.entry(key).or_insert_with(|| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("tile_shader"),
                source: wgpu::ShaderSource::Wgsl(source.to_owned().into()),
            })
        })
    }

    /// Pipeline, bind group and uniform buffers for one mesh material.
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        &mut self,
        device: &wgpu::Device,
        water: &dyn WaterClassifier,
        spec: &MaterialSpec,
        color: [f32; 4],
        textures: MaterialTextures<'_>,
        generation: u64,
    ) -> GpuMaterial {
        let key = ShaderKey { stage: textures.stage(), variant: spec.variant };
        let module = self.shader_module(device, water, key).clone();
        let pipeline = create_material_pipeline(
            device,
            &self.layouts,
            &module,
            key,
            spec,
            self.color_format,
            self.depth_format,
        );

        let params = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("tile_material_params"),
            contents: bytemuck::bytes_of(&MaterialParams::new(spec, color)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let (bind_group, water_buffer, texture_revision) = match textures {
            MaterialTextures::Array { view, sampler } => {
                let bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("tile_array_bg"),
                    layout: &self.layouts.tiles,
                    entries: &[
                        wgpu::BindGroupEntry { binding: 0, resource: wgpu::BindingResource::TextureView(view) },
                        wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::Sampler(sampler) },
                        wgpu::BindGroupEntry {
                            binding: 2,
                            resource: wgpu::BindingResource::TextureView(&self.placeholder.view),
                        },
                        wgpu::BindGroupEntry { binding: 3, resource: params.as_entire_binding() },
                    ],
                });
                (bg, None, None)
            }
            MaterialTextures::Water { view, revision, uniforms } => {
                let buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("tile_water_params"),
                    contents: bytemuck::bytes_of(uniforms),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                });
                let bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("tile_water_bg"),
                    layout: &self.layouts.water,
                    entries: &[
                        wgpu::BindGroupEntry { binding: 0, resource: wgpu::BindingResource::TextureView(view) },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::Sampler(&self.water_sampler),
                        },
                        wgpu::BindGroupEntry {
                            binding: 2,
                            resource: wgpu::BindingResource::TextureView(&self.placeholder.view),
                        },
                        wgpu::BindGroupEntry { binding: 3, resource: params.as_entire_binding() },
                        wgpu::BindGroupEntry { binding: 4, resource: buf.as_entire_binding() },
                    ],
                });
                (bg, Some(buf), Some(revision))
            }
            MaterialTextures::Flat => {
                let bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("tile_flat_bg"),
                    layout: &self.layouts.flat,
                    entries: &[wgpu::BindGroupEntry { binding: 3, resource: params.as_entire_binding() }],
                });
                (bg, None, None)
            }
        };

        log::info!("material built: {key:?} bias={} depth_test={}", spec.depth_bias, spec.depth_test);
        GpuMaterial { pipeline, bind_group, params, water: water_buffer, generation, texture_revision }
    }
}
