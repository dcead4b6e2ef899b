//! Test doubles: a device that records every call instead of touching a GPU,
//! and storage fixtures holding valid bytes for every registered path.

use std::collections::HashSet;

use crate::assets::{PipelineMetadata, SamplerMetadata};
use crate::device::{
    BufferUsage, ClearValues, DrawIndexed, DrawUniforms, GraphicsDevice, RenderBackend, ShaderStage,
};
use crate::error::DeviceError;
use crate::storage::MemoryStorage;
use crate::texture::ImageData;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Texture,
    Shader,
    Pipeline,
    Sampler,
    Buffer,
}

#[derive(Clone, Debug, PartialEq)]
pub enum DeviceCall {
    Create(ResourceKind, usize),
    Destroy(ResourceKind, usize),
    AcquireFrame(bool),
    BeginPass(ClearValues),
    Draw(RecordedDraw),
    EndPass,
    Blit,
    Submit,
    Resize(u32, u32),
}

impl DeviceCall {
    pub fn created(&self) -> Option<ResourceKind> {
        match self {
            DeviceCall::Create(kind, _) => Some(*kind),
            _ => None,
        }
    }

    pub fn destroyed(&self) -> Option<ResourceKind> {
        match self {
            DeviceCall::Destroy(kind, _) => Some(*kind),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RecordedDraw {
    pub uniforms: DrawUniforms,
    pub vertex_buffer: usize,
    pub index_buffer: usize,
    pub index_count: u32,
    pub pipeline: usize,
    pub texture: usize,
    pub sampler: usize,
}

#[derive(Debug)]
pub struct RecordedTexture {
    pub serial: usize,
    pub label: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug)]
pub struct RecordedShader {
    pub serial: usize,
    pub label: String,
    pub entry_point: String,
    pub stage: ShaderStage,
}

#[derive(Debug)]
pub struct RecordedPipeline {
    pub serial: usize,
    pub name: String,
    pub vertex_shader: usize,
    pub fragment_shader: usize,
}

#[derive(Debug)]
pub struct RecordedSampler {
    pub serial: usize,
    pub name: String,
}

#[derive(Debug)]
pub struct RecordedBuffer {
    pub serial: usize,
    pub label: String,
    pub len: usize,
    pub usage: BufferUsage,
}

/// A [`RenderBackend`] that only records what it was asked to do.
#[derive(Debug)]
pub struct RecordingDevice {
    calls: Vec<DeviceCall>,
    live: HashSet<usize>,
    next_serial: usize,
    failing_shaders: HashSet<String>,
    pub frame_available: bool,
    pub size: (u32, u32),
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            live: HashSet::new(),
            next_serial: 0,
            failing_shaders: HashSet::new(),
            frame_available: true,
            size: (800, 600),
        }
    }

    /// Makes shader creation fail for the given `path::entry_point` label.
    pub fn fail_shader(&mut self, label: &str) {
        self.failing_shaders.insert(label.to_string());
    }

    pub fn calls(&self) -> &[DeviceCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Objects created and not yet destroyed.
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn draws(&self) -> Vec<&RecordedDraw> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                DeviceCall::Draw(draw) => Some(draw),
                _ => None,
            })
            .collect()
    }

    fn create(&mut self, kind: ResourceKind) -> usize {
        let serial = self.next_serial;
        self.next_serial += 1;
        self.live.insert(serial);
        self.calls.push(DeviceCall::Create(kind, serial));
        serial
    }

    fn destroy(&mut self, kind: ResourceKind, serial: usize) {
        assert!(self.live.remove(&serial), "{kind:?} #{serial} destroyed twice");
        self.calls.push(DeviceCall::Destroy(kind, serial));
    }
}

impl GraphicsDevice for RecordingDevice {
    type Texture = RecordedTexture;
    type Shader = RecordedShader;
    type Pipeline = RecordedPipeline;
    type Sampler = RecordedSampler;
    type Buffer = RecordedBuffer;

    fn create_texture(&mut self, label: &str, image: &ImageData) -> Result<RecordedTexture, DeviceError> {
        Ok(RecordedTexture {
            serial: self.create(ResourceKind::Texture),
            label: label.to_string(),
            width: image.width,
            height: image.height,
        })
    }

    fn create_shader(
        &mut self,
        label: &str,
        _source: &str,
        entry_point: &str,
        stage: ShaderStage,
    ) -> Result<RecordedShader, DeviceError> {
        if self.failing_shaders.contains(label) {
            return Err(DeviceError(format!("{label}: unknown identifier")));
        }
        Ok(RecordedShader {
            serial: self.create(ResourceKind::Shader),
            label: label.to_string(),
            entry_point: entry_point.to_string(),
            stage,
        })
    }

    fn create_pipeline(
        &mut self,
        metadata: &PipelineMetadata,
        vertex: &RecordedShader,
        fragment: &RecordedShader,
    ) -> Result<RecordedPipeline, DeviceError> {
        Ok(RecordedPipeline {
            serial: self.create(ResourceKind::Pipeline),
            name: metadata.name.clone(),
            vertex_shader: vertex.serial,
            fragment_shader: fragment.serial,
        })
    }

    fn create_sampler(&mut self, metadata: &SamplerMetadata) -> RecordedSampler {
        RecordedSampler {
            serial: self.create(ResourceKind::Sampler),
            name: metadata.name.clone(),
        }
    }

    fn create_buffer(&mut self, label: &str, contents: &[u8], usage: BufferUsage) -> RecordedBuffer {
        RecordedBuffer {
            serial: self.create(ResourceKind::Buffer),
            label: label.to_string(),
            len: contents.len(),
            usage,
        }
    }

    fn destroy_texture(&mut self, texture: RecordedTexture) {
        self.destroy(ResourceKind::Texture, texture.serial);
    }

    fn destroy_shader(&mut self, shader: RecordedShader) {
        self.destroy(ResourceKind::Shader, shader.serial);
    }

    fn destroy_pipeline(&mut self, pipeline: RecordedPipeline) {
        self.destroy(ResourceKind::Pipeline, pipeline.serial);
    }

    fn destroy_sampler(&mut self, sampler: RecordedSampler) {
        self.destroy(ResourceKind::Sampler, sampler.serial);
    }

    fn destroy_buffer(&mut self, buffer: RecordedBuffer) {
        self.destroy(ResourceKind::Buffer, buffer.serial);
    }
}

impl RenderBackend for RecordingDevice {
    fn acquire_frame(&mut self) -> bool {
        self.calls.push(DeviceCall::AcquireFrame(self.frame_available));
        self.frame_available
    }

    fn begin_pass(&mut self, clear: ClearValues) {
        self.calls.push(DeviceCall::BeginPass(clear));
    }

    fn draw_indexed(&mut self, draw: DrawIndexed<'_, Self>) {
        self.calls.push(DeviceCall::Draw(RecordedDraw {
            uniforms: draw.uniforms,
            vertex_buffer: draw.vertex_buffer.serial,
            index_buffer: draw.index_buffer.serial,
            index_count: draw.index_count,
            pipeline: draw.pipeline.serial,
            texture: draw.texture.serial,
            sampler: draw.sampler.serial,
        }));
    }

    fn end_pass(&mut self) {
        self.calls.push(DeviceCall::EndPass);
    }

    fn blit_to_surface(&mut self) {
        self.calls.push(DeviceCall::Blit);
    }

    fn submit(&mut self) {
        self.calls.push(DeviceCall::Submit);
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
        self.calls.push(DeviceCall::Resize(width, height));
    }

    fn size(&self) -> (u32, u32) {
        self.size
    }
}

/// A unit quad in the XY plane, two triangles.
pub const QUAD_OBJ: &str = "\
o Quad
v -0.5 -0.5 0
v 0.5 -0.5 0
v 0.5 0.5 0
v -0.5 0.5 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 1
f 1/1/1 2/2/1 3/3/1 4/4/1
";

pub const SHADER_WGSL: &str = "// compiled by the recording device, never parsed\n";

/// Encodes `image` as PNG.
pub fn png_bytes(image: &ImageData) -> Vec<u8> {
    let buffer = image::RgbaImage::from_raw(image.width, image.height, image.rgba.clone())
        .expect("pixel buffer matches dimensions");
    let mut out = std::io::Cursor::new(Vec::new());
    buffer
        .write_to(&mut out, image::ImageFormat::Png)
        .expect("PNG encoding into memory");
    out.into_inner()
}

/// Storage holding plausible contents for each path, chosen by extension.
pub fn fixture_storage(paths: &[&str]) -> MemoryStorage {
    let mut storage = MemoryStorage::new();
    for path in paths {
        let bytes = if path.ends_with(".png") {
            png_bytes(&ImageData::solid(2, 2, [180, 90, 60, 255]))
        } else if path.ends_with(".obj") {
            QUAD_OBJ.as_bytes().to_vec()
        } else {
            SHADER_WGSL.as_bytes().to_vec()
        };
        storage.insert(*path, bytes);
    }
    storage
}
