use std::sync::Arc;

use anyhow::{Context, Result};
use glam::Mat4;

use crate::core::{AssetConfig, ProgramVariant};
use crate::device::DeviceContext;
use crate::geometry::{ColorVertex, TexturedVertex, Vertex};
use crate::texture::TextureResource;

use super::uniform::TransformUniform;
use super::{CompiledShader, ShaderCache, ShaderKey};

/// A compiled shader plus everything it binds: pipeline, transform constant
/// buffer and, for the textured variant, a sampler and texture.
///
/// Bindings in group 0: `0` transforms (vertex), `1` texture and `2` sampler
/// (fragment, textured only).
pub struct ShaderProgram {
    variant: ProgramVariant,

    shader: Option<Arc<CompiledShader>>,
    bind_group_layout: Option<wgpu::BindGroupLayout>,
    pipeline: Option<wgpu::RenderPipeline>,
    constant_buffer: Option<wgpu::Buffer>,
    sampler: Option<wgpu::Sampler>,
    texture: Option<TextureResource>,
    bind_group: Option<wgpu::BindGroup>,
}

impl ShaderProgram {
    /// Builds the program for `assets.variant`, drawing `topology` primitives.
    ///
    /// A missing shader or texture fails the whole program; nothing partially
    /// built is returned.
    pub fn initialize(
        ctx: &DeviceContext<'_>,
        cache: &ShaderCache,
        assets: &AssetConfig,
        topology: wgpu::PrimitiveTopology,
    ) -> Result<Self> {
        let device = ctx.device()?;
        let variant = assets.variant;

        let key = ShaderKey::new(assets.shader_path(), variant.name());
        let shader = cache
            .get(device, &key)
            .with_context(|| format!("failed to compile shader {key}"))?;

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("prism program bgl"),
            entries: &layout_entries(variant),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("prism program pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let vertex_layout = match variant {
            ProgramVariant::Color => ColorVertex::layout(),
            ProgramVariant::Textured => TexturedVertex::layout(),
        };

        let primitive = wgpu::PrimitiveState {
            topology,
            strip_index_format: topology.is_strip().then_some(wgpu::IndexFormat::Uint32),
            ..*ctx.rasterizer_state()?
        };

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(variant.name()),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: shader.module(),
                entry_point: Some(shader.vertex_entry()),
                compilation_options: Default::default(),
                buffers: &[vertex_layout],
            },
            fragment: Some(wgpu::FragmentState {
                module: shader.module(),
                entry_point: Some(shader.fragment_entry()),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: ctx.target_format()?,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive,
            depth_stencil: Some(ctx.depth_stencil_state()?.clone()),
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        let constant_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("prism transform ubo"),
            size: TransformUniform::SIZE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let (sampler, texture) = match variant {
            ProgramVariant::Color => (None, None),
            ProgramVariant::Textured => {
                let sampler = create_sampler(device);
                let texture = TextureResource::initialize(device, ctx.queue()?, &assets.texture_path)
                    .context("failed to load program texture")?;
                (Some(sampler), Some(texture))
            }
        };

        let bind_group = {
            let mut entries = vec![wgpu::BindGroupEntry {
                binding: 0,
                resource: constant_buffer.as_entire_binding(),
            }];
            if let (Some(sampler), Some(texture)) = (&sampler, &texture) {
                entries.push(wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(texture.view()?),
                });
                entries.push(wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(sampler),
                });
            }
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("prism program bind group"),
                layout: &bind_group_layout,
                entries: &entries,
            })
        };

        log::info!("shader program `{}` ready ({topology:?})", variant.name());

        Ok(Self {
            variant,
            shader: Some(shader),
            bind_group_layout: Some(bind_group_layout),
            pipeline: Some(pipeline),
            constant_buffer: Some(constant_buffer),
            sampler,
            texture,
            bind_group: Some(bind_group),
        })
    }

    /// Uploads the three transforms, binds the program and draws
    /// `index_count` indices from the currently bound geometry.
    pub fn render(
        &self,
        queue: &wgpu::Queue,
        pass: &mut wgpu::RenderPass<'_>,
        index_count: u32,
        world: Mat4,
        view: Mat4,
        projection: Mat4,
    ) -> Result<()> {
        let pipeline = self.pipeline.as_ref().context("shader program has been released")?;
        let bind_group = self
            .bind_group
            .as_ref()
            .context("shader program bindings have been released")?;
        let constant_buffer = self
            .constant_buffer
            .as_ref()
            .context("transform buffer has been released")?;

        // Whole-buffer overwrite; the previous contents are never read back.
        let transforms = TransformUniform::new(world, view, projection);
        queue.write_buffer(constant_buffer, 0, bytemuck::bytes_of(&transforms));

        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.draw_indexed(0..index_count, 0, 0..1);
        Ok(())
    }

    pub fn variant(&self) -> ProgramVariant {
        self.variant
    }

    pub fn shader(&self) -> Option<&Arc<CompiledShader>> {
        self.shader.as_ref()
    }

    pub fn is_released(&self) -> bool {
        self.shader.is_none()
            && self.bind_group_layout.is_none()
            && self.pipeline.is_none()
            && self.constant_buffer.is_none()
            && self.sampler.is_none()
            && self.texture.is_none()
            && self.bind_group.is_none()
    }

    /// Releases in reverse order of creation. Safe to call more than once.
    pub fn shutdown(&mut self) {
        if self.is_released() {
            return;
        }

        self.bind_group = None;
        if let Some(mut texture) = self.texture.take() {
            texture.shutdown();
        }
        self.sampler = None;
        if let Some(buffer) = self.constant_buffer.take() {
            buffer.destroy();
        }
        self.pipeline = None;
        self.bind_group_layout = None;
        self.shader = None;

        log::debug!("shader program `{}` released", self.variant.name());
    }
}

impl Drop for ShaderProgram {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn layout_entries(variant: ProgramVariant) -> Vec<wgpu::BindGroupLayoutEntry> {
    let mut entries = vec![wgpu::BindGroupLayoutEntry {
        binding: 0,
        visibility: wgpu::ShaderStages::VERTEX,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: TransformUniform::min_binding_size(),
        },
        count: None,
    }];

    if variant == ProgramVariant::Textured {
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: 1,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        });
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: 2,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        });
    }

    entries
}

/// Linear min/mag/mip filtering, wrapping on every axis.
fn sampler_descriptor() -> wgpu::SamplerDescriptor<'static> {
    wgpu::SamplerDescriptor {
        label: Some("prism program sampler"),
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        address_mode_w: wgpu::AddressMode::Repeat,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::MipmapFilterMode::Linear,
        lod_min_clamp: 0.0,
        lod_max_clamp: 32.0,
        compare: None,
        anisotropy_clamp: 1,
        border_color: None,
    }
}

fn create_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&sampler_descriptor())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::testing::headless_context;

    #[test]
    fn color_variant_binds_transforms_only() {
        let entries = layout_entries(ProgramVariant::Color);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].binding, 0);
        assert_eq!(entries[0].visibility, wgpu::ShaderStages::VERTEX);
    }

    #[test]
    fn textured_variant_adds_texture_and_sampler() {
        let entries = layout_entries(ProgramVariant::Textured);
        let bindings: Vec<u32> = entries.iter().map(|e| e.binding).collect();
        assert_eq!(bindings, [0, 1, 2]);
        assert!(matches!(entries[1].ty, wgpu::BindingType::Texture { .. }));
        assert!(matches!(
            entries[2].ty,
            wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering)
        ));
    }

    #[test]
    fn sampler_wraps_and_filters_linearly() {
        let d = sampler_descriptor();
        for mode in [d.address_mode_u, d.address_mode_v, d.address_mode_w] {
            assert_eq!(mode, wgpu::AddressMode::Repeat);
        }
        assert_eq!(d.min_filter, wgpu::FilterMode::Linear);
        assert_eq!(d.mag_filter, wgpu::FilterMode::Linear);
        assert_eq!(d.mipmap_filter, wgpu::MipmapFilterMode::Linear);
        assert!(d.compare.is_none());
    }

    // ── lifecycle ─────────────────────────────────────────────────────────

    fn build_then_shutdown_twice(variant: ProgramVariant) {
        let Some(ctx) = headless_context() else { return };
        let cache: ShaderCache = ShaderCache::new();
        let assets = AssetConfig::default().with_variant(variant);

        let mut program = ShaderProgram::initialize(
            &ctx,
            &cache,
            &assets,
            wgpu::PrimitiveTopology::TriangleList,
        )
        .unwrap();
        assert_eq!(program.variant(), variant);
        assert!(program.shader().is_some());
        assert!(!program.is_released());
        assert_eq!(program.texture.is_some(), variant == ProgramVariant::Textured);
        assert_eq!(program.sampler.is_some(), variant == ProgramVariant::Textured);

        program.shutdown();
        assert!(program.is_released());
        assert!(program.shader().is_none());

        program.shutdown();
        assert!(program.is_released());

        // The cache keeps its own handle to the compiled shader.
        let key = ShaderKey::new(assets.shader_path(), variant.name());
        assert!(cache.contains(&key));
    }

    #[test]
    fn color_program_releases_everything() {
        build_then_shutdown_twice(ProgramVariant::Color);
    }

    #[test]
    fn textured_program_releases_everything() {
        build_then_shutdown_twice(ProgramVariant::Textured);
    }
}
