//! The wgpu implementation of [`GraphicsDevice`] and [`RenderBackend`].
//!
//! # Bind groups
//!
//! Every pipeline built by this device shares one layout:
//! - **Group 0**: the per-draw [`DrawUniforms`] block, bound with a dynamic
//!   offset into a buffer holding one 256-byte slot per draw of the frame.
//!   A frame with more draws than slots moves to a buffer twice the size;
//!   draws already recorded keep reading the old one.
//! - **Group 1**: the material texture and sampler, built once per
//!   texture/sampler pair and cached
//!
//! # Frame flow
//!
//! `acquire_frame` grabs the surface texture and opens a command encoder.
//! The scene pass renders into the offscreen [`FrameTargets`]. `blit_to_surface`
//! copies the colour target onto the surface texel for texel, and `submit`
//! hands the encoder to the queue and presents.

use std::collections::HashMap;
use std::sync::Arc;

use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::assets::{
    AddressMode, BlendMode, CullMode, DepthCompare, FilterMode, PipelineMetadata, SamplerMetadata,
};
use crate::device::{
    BufferUsage, ClearValues, DrawIndexed, DrawUniforms, GraphicsDevice, RenderBackend, ShaderStage,
};
use crate::error::{DeviceError, EngineError};
use crate::gpu::GpuContext;
use crate::model::Vertex3d;
use crate::render_target::{DEPTH_FORMAT, FrameTargets};
use crate::texture::{GpuTexture, ImageData};

/// Slots in the first per-draw uniform buffer.
pub const INITIAL_DRAW_CAPACITY: u32 = 4096;

const BLIT_SHADER: &str = r#"
@group(0) @binding(0) var source: texture_2d<f32>;

@vertex
fn vs(@builtin(vertex_index) vi: u32) -> @builtin(position) vec4f {
    // Fullscreen triangle
    let x = f32(i32(vi & 1u) * 4 - 1);
    let y = f32(i32(vi >> 1u) * 4 - 1);
    return vec4f(x, y, 0.0, 1.0);
}

@fragment
fn fs(@builtin(position) pos: vec4f) -> @location(0) vec4f {
    // Nearest: one source texel per surface pixel
    return textureLoad(source, vec2i(pos.xy), 0);
}
"#;

/// A compiled shader module plus the entry point it was registered for.
pub struct WgpuShader {
    pub module: wgpu::ShaderModule,
    pub entry_point: String,
    pub stage: ShaderStage,
}

/// A sampler plus the device-assigned key used for bind group caching.
pub struct WgpuSampler {
    pub sampler: wgpu::Sampler,
    id: u32,
}

/// Hands out 256-byte uniform slots for the draws of one frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct DrawSlots {
    capacity: u32,
    next: u32,
}

impl DrawSlots {
    fn new(capacity: u32) -> Self {
        Self { capacity, next: 0 }
    }

    /// Returns the byte offset of the next slot, and whether the buffer has
    /// to be replaced by one of the new `capacity` before writing to it.
    fn claim(&mut self) -> (u64, bool) {
        let grow = self.next >= self.capacity;
        if grow {
            self.capacity *= 2;
            self.next = 0;
        }
        let offset = u64::from(self.next) * DrawUniforms::SIZE;
        self.next += 1;
        (offset, grow)
    }

    fn reset(&mut self) {
        self.next = 0;
    }
}

/// The per-draw uniform buffer and the bind group over it.
struct DrawRing {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl DrawRing {
    fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, capacity: u32) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Draw Uniforms"),
            size: DrawUniforms::SIZE * u64::from(capacity),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Draw Uniforms Bind Group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(DrawUniforms::SIZE),
                }),
            }],
        });

        Self { buffer, bind_group }
    }
}

struct ActiveFrame {
    surface_texture: wgpu::SurfaceTexture,
    encoder: wgpu::CommandEncoder,
    pass: Option<wgpu::RenderPass<'static>>,
}

pub struct WgpuDevice {
    gpu: GpuContext,
    targets: FrameTargets,
    draw_layout: wgpu::BindGroupLayout,
    material_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    draw_ring: DrawRing,
    slots: DrawSlots,
    /// Material bind groups keyed by (texture id, sampler id).
    materials: HashMap<(u32, u32), wgpu::BindGroup>,
    next_texture_id: u32,
    next_sampler_id: u32,
    blit_pipeline: wgpu::RenderPipeline,
    blit_layout: wgpu::BindGroupLayout,
    frame: Option<ActiveFrame>,
}

impl WgpuDevice {
    pub fn new(window: Arc<Window>) -> Result<Self, EngineError> {
        let gpu = GpuContext::new(window)?;
        let device = &gpu.device;

        let draw_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Draw Uniforms Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(DrawUniforms::SIZE),
                },
                count: None,
            }],
        });

        let material_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Material Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Mesh Pipeline Layout"),
            bind_group_layouts: &[&draw_layout, &material_layout],
            push_constant_ranges: &[],
        });

        let draw_ring = DrawRing::new(device, &draw_layout, INITIAL_DRAW_CAPACITY);

        let blit_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Blit Shader"),
            source: wgpu::ShaderSource::Wgsl(BLIT_SHADER.into()),
        });

        let blit_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Blit Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: false },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            }],
        });

        let blit_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Blit Pipeline Layout"),
            bind_group_layouts: &[&blit_layout],
            push_constant_ranges: &[],
        });

        let blit_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Blit Pipeline"),
            layout: Some(&blit_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &blit_shader,
                entry_point: Some("vs"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &blit_shader,
                entry_point: Some("fs"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: gpu.config.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let targets = FrameTargets::new(&gpu);

        Ok(Self {
            gpu,
            targets,
            draw_layout,
            material_layout,
            pipeline_layout,
            draw_ring,
            slots: DrawSlots::new(INITIAL_DRAW_CAPACITY),
            materials: HashMap::new(),
            next_texture_id: 0,
            next_sampler_id: 0,
            blit_pipeline,
            blit_layout,
            frame: None,
        })
    }

    pub fn gpu(&self) -> &GpuContext {
        &self.gpu
    }

    /// Runs `create` inside a validation error scope.
    fn validated<T>(&self, create: impl FnOnce(&wgpu::Device) -> T) -> Result<T, DeviceError> {
        self.gpu.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = create(&self.gpu.device);
        match pollster::block_on(self.gpu.device.pop_error_scope()) {
            Some(err) => Err(DeviceError(err.to_string())),
            None => Ok(value),
        }
    }
}

fn cull_mode(mode: CullMode) -> Option<wgpu::Face> {
    match mode {
        CullMode::None => None,
        CullMode::Front => Some(wgpu::Face::Front),
        CullMode::Back => Some(wgpu::Face::Back),
    }
}

fn compare(function: DepthCompare) -> wgpu::CompareFunction {
    match function {
        DepthCompare::Less => wgpu::CompareFunction::Less,
        DepthCompare::LessEqual => wgpu::CompareFunction::LessEqual,
        DepthCompare::Always => wgpu::CompareFunction::Always,
    }
}

fn blend(mode: BlendMode) -> wgpu::BlendState {
    match mode {
        BlendMode::Opaque => wgpu::BlendState::REPLACE,
        BlendMode::AlphaBlend => wgpu::BlendState::ALPHA_BLENDING,
    }
}

fn filter(mode: FilterMode) -> wgpu::FilterMode {
    match mode {
        FilterMode::Nearest => wgpu::FilterMode::Nearest,
        FilterMode::Linear => wgpu::FilterMode::Linear,
    }
}

fn address(mode: AddressMode) -> wgpu::AddressMode {
    match mode {
        AddressMode::Repeat => wgpu::AddressMode::Repeat,
        AddressMode::MirrorRepeat => wgpu::AddressMode::MirrorRepeat,
        AddressMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
    }
}

impl GraphicsDevice for WgpuDevice {
    type Texture = GpuTexture;
    type Shader = WgpuShader;
    type Pipeline = wgpu::RenderPipeline;
    type Sampler = WgpuSampler;
    type Buffer = wgpu::Buffer;

    fn create_texture(&mut self, label: &str, image: &ImageData) -> Result<GpuTexture, DeviceError> {
        let id = self.next_texture_id;
        let queue = &self.gpu.queue;
        let texture = self.validated(|device| GpuTexture::upload(device, queue, id, label, image))?;
        self.next_texture_id += 1;
        Ok(texture)
    }

    fn create_shader(
        &mut self,
        label: &str,
        source: &str,
        entry_point: &str,
        stage: ShaderStage,
    ) -> Result<WgpuShader, DeviceError> {
        let module = self.validated(|device| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            })
        })?;
        Ok(WgpuShader {
            module,
            entry_point: entry_point.to_string(),
            stage,
        })
    }

    fn create_pipeline(
        &mut self,
        metadata: &PipelineMetadata,
        vertex: &WgpuShader,
        fragment: &WgpuShader,
    ) -> Result<wgpu::RenderPipeline, DeviceError> {
        let description = metadata.description;
        let format = self.gpu.config.format;
        let layout = &self.pipeline_layout;

        self.validated(|device| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(metadata.name.as_str()),
                layout: Some(layout),
                vertex: wgpu::VertexState {
                    module: &vertex.module,
                    entry_point: Some(vertex.entry_point.as_str()),
                    buffers: &[Vertex3d::LAYOUT],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &fragment.module,
                    entry_point: Some(fragment.entry_point.as_str()),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: Some(blend(description.blend)),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    cull_mode: cull_mode(description.cull_mode),
                    front_face: wgpu::FrontFace::Ccw,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: description.depth_write,
                    depth_compare: compare(description.depth_compare),
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        })
    }

    fn create_sampler(&mut self, metadata: &SamplerMetadata) -> WgpuSampler {
        let desc = metadata.description;
        let id = self.next_sampler_id;
        self.next_sampler_id += 1;
        let sampler = self.gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(metadata.name.as_str()),
            address_mode_u: address(desc.address_mode),
            address_mode_v: address(desc.address_mode),
            address_mode_w: address(desc.address_mode),
            mag_filter: filter(desc.filter),
            min_filter: filter(desc.filter),
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        WgpuSampler { sampler, id }
    }

    fn create_buffer(&mut self, label: &str, contents: &[u8], usage: BufferUsage) -> wgpu::Buffer {
        let usage = match usage {
            BufferUsage::Vertex => wgpu::BufferUsages::VERTEX,
            BufferUsage::Index => wgpu::BufferUsages::INDEX,
        };
        self.gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage,
            })
    }

    fn destroy_texture(&mut self, texture: GpuTexture) {
        self.materials.retain(|&(id, _), _| id != texture.id);
        texture.texture.destroy();
    }

    fn destroy_sampler(&mut self, sampler: WgpuSampler) {
        self.materials.retain(|&(_, id), _| id != sampler.id);
    }

    fn destroy_buffer(&mut self, buffer: wgpu::Buffer) {
        buffer.destroy();
    }
}

impl RenderBackend for WgpuDevice {
    fn acquire_frame(&mut self) -> bool {
        if self.frame.is_some() {
            log::warn!("previous frame was never submitted; dropping it");
            self.frame = None;
        }

        let surface_texture = match self.gpu.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("surface lost or outdated, reconfiguring and skipping frame");
                self.gpu.surface.configure(&self.gpu.device, &self.gpu.config);
                return false;
            }
            Err(err) => {
                log::warn!("no swapchain texture this frame: {err}");
                return false;
            }
        };

        self.targets.ensure_size(&self.gpu);

        let encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        self.slots.reset();
        self.frame = Some(ActiveFrame {
            surface_texture,
            encoder,
            pass: None,
        });
        true
    }

    fn begin_pass(&mut self, clear: ClearValues) {
        let Some(frame) = self.frame.as_mut() else {
            return;
        };
        let [r, g, b, a] = clear.color;
        let pass = frame
            .encoder
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.targets.color.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.targets.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear.depth),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            })
            .forget_lifetime();
        frame.pass = Some(pass);
    }

    fn draw_indexed(&mut self, draw: DrawIndexed<'_, Self>) {
        let Some(frame) = self.frame.as_mut() else {
            return;
        };
        let Some(pass) = frame.pass.as_mut() else {
            return;
        };
        let (offset, grow) = self.slots.claim();
        if grow {
            log::debug!("growing draw uniforms to {} slots", self.slots.capacity);
            self.draw_ring = DrawRing::new(&self.gpu.device, &self.draw_layout, self.slots.capacity);
        }
        self.gpu
            .queue
            .write_buffer(&self.draw_ring.buffer, offset, bytemuck::bytes_of(&draw.uniforms));

        let device = &self.gpu.device;
        let layout = &self.material_layout;
        let material: &wgpu::BindGroup = self
            .materials
            .entry((draw.texture.id, draw.sampler.id))
            .or_insert_with(|| {
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("Material Bind Group"),
                    layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::TextureView(&draw.texture.view),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::Sampler(&draw.sampler.sampler),
                        },
                    ],
                })
            });

        pass.set_pipeline(draw.pipeline);
        pass.set_bind_group(0, &self.draw_ring.bind_group, &[offset as u32]);
        pass.set_bind_group(1, material, &[]);
        pass.set_vertex_buffer(0, draw.vertex_buffer.slice(..));
        pass.set_index_buffer(draw.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..draw.index_count, 0, 0..1);
    }

    fn end_pass(&mut self) {
        if let Some(frame) = self.frame.as_mut() {
            frame.pass = None;
        }
    }

    fn blit_to_surface(&mut self) {
        let Some(frame) = self.frame.as_mut() else {
            return;
        };
        let surface_view = frame
            .surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let bind_group = self.gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Blit Bind Group"),
            layout: &self.blit_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&self.targets.color.view),
            }],
        });

        let mut pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Blit Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &surface_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&self.blit_pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.draw(0..3, 0..1);
    }

    fn submit(&mut self) {
        let Some(frame) = self.frame.take() else {
            return;
        };
        drop(frame.pass);
        self.gpu.queue.submit(std::iter::once(frame.encoder.finish()));
        frame.surface_texture.present();
    }

    fn resize(&mut self, width: u32, height: u32) {
        if self.gpu.resize(width, height) {
            log::info!("resizing to {width}x{height}");
            self.targets.ensure_size(&self.gpu);
        }
    }

    fn size(&self) -> (u32, u32) {
        (self.gpu.width(), self.gpu.height())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_advance_one_uniform_block_at_a_time() {
        let mut slots = DrawSlots::new(4);

        let offsets: Vec<_> = (0..4).map(|_| slots.claim()).collect();

        assert_eq!(offsets, vec![(0, false), (256, false), (512, false), (768, false)]);
        assert_eq!(slots.capacity, 4);
    }

    #[test]
    fn overflowing_the_buffer_doubles_it_instead_of_dropping_draws() {
        let mut slots = DrawSlots::new(2);

        let claims: Vec<_> = (0..5).map(|_| slots.claim()).collect();

        assert_eq!(
            claims,
            vec![(0, false), (256, false), (0, true), (256, false), (512, false)]
        );
        assert_eq!(slots.capacity, 4);
    }

    #[test]
    fn a_new_frame_reuses_the_grown_buffer_from_the_start() {
        let mut slots = DrawSlots::new(1);
        slots.claim();
        slots.claim();
        assert_eq!(slots.capacity, 2);

        slots.reset();

        assert_eq!(slots.claim(), (0, false));
        assert_eq!(slots.claim(), (256, false));
        assert_eq!(slots.claim(), (0, true));
        assert_eq!(slots.capacity, 4);
    }
}
