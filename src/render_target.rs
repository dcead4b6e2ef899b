//! Offscreen colour and depth targets the scene is drawn into before being
//! blitted onto the window surface.

use crate::gpu::GpuContext;

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

pub struct RenderTarget {
    pub view: wgpu::TextureView,
    width: u32,
    height: u32,
}

impl RenderTarget {
    pub fn new(
        gpu: &GpuContext,
        label: &str,
        format: wgpu::TextureFormat,
        usage: wgpu::TextureUsages,
    ) -> Self {
        let (width, height) = (gpu.width().max(1), gpu.height().max(1));
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            view,
            width,
            height,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// The colour/depth pair, always the same size as the surface.
pub struct FrameTargets {
    pub color: RenderTarget,
    pub depth: RenderTarget,
}

impl FrameTargets {
    pub fn new(gpu: &GpuContext) -> Self {
        log::info!("creating render targets {}x{}", gpu.width(), gpu.height());
        Self {
            color: RenderTarget::new(
                gpu,
                "Scene Color",
                gpu.config.format,
                wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            ),
            depth: RenderTarget::new(
                gpu,
                "Scene Depth",
                DEPTH_FORMAT,
                wgpu::TextureUsages::RENDER_ATTACHMENT,
            ),
        }
    }

    /// Replaces both targets when the surface size changed. The old pair is
    /// dropped only after the new pair exists.
    pub fn ensure_size(&mut self, gpu: &GpuContext) -> bool {
        if self.color.size() == (gpu.width(), gpu.height()) {
            return false;
        }
        *self = Self::new(gpu);
        true
    }
}
