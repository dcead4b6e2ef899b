//! The host GPU device boundary.
//!
//! The core never talks to wgpu directly. Everything it needs from the GPU is
//! expressed by two traits:
//!
//! - [`GraphicsDevice`]: create and destroy each resource kind the
//!   [`AssetRegistry`](crate::AssetRegistry) owns.
//! - [`RenderBackend`]: acquire a frame, begin/end a render pass with clear
//!   values, issue indexed draws, blit the offscreen target and submit.
//!
//! [`WgpuDevice`](crate::WgpuDevice) is the real implementation. Tests use a
//! recording implementation so registry and renderer behaviour can be checked
//! without a GPU.
//!
//! # Uniform layout
//!
//! Every draw pushes one [`DrawUniforms`] block, exactly 256 bytes so that
//! consecutive draws can live at 256-byte dynamic offsets in a single buffer:
//!
//! | Block    | Field                 | Bytes |
//! |----------|-----------------------|-------|
//! | vertex   | world_view_projection | 64    |
//! | vertex   | world                 | 64    |
//! | vertex   | normal                | 64    |
//! | fragment | light + camera        | 64    |

use glam::{Mat4, Vec3};

use crate::assets::{PipelineMetadata, SamplerMetadata};
use crate::error::DeviceError;
use crate::lighting::DirectionalLight;
use crate::texture::ImageData;

/// Pipeline stage a shader entry point is compiled for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

/// What a GPU buffer is bound as.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferUsage {
    Vertex,
    Index,
}

/// Clear values applied when a render pass begins.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClearValues {
    /// RGBA clear colour.
    pub color: [f64; 4],
    /// Depth clear value.
    pub depth: f32,
}

impl ClearValues {
    /// Transparent black colour, depth cleared to the far plane.
    pub const TRANSPARENT_FAR: Self = Self {
        color: [0.0, 0.0, 0.0, 0.0],
        depth: 1.0,
    };
}

/// Per-draw vertex stage uniforms.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct VertexUniforms {
    /// `projection * view * world`.
    pub world_view_projection: [[f32; 4]; 4],
    /// Object to world space.
    pub world: [[f32; 4]; 4],
    /// Inverse transpose of `world`, for normals under non-uniform scale.
    pub normal: [[f32; 4]; 4],
}

/// Per-draw fragment stage uniforms: the main light and the eye position.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FragmentUniforms {
    pub light_direction: [f32; 3],
    pub light_intensity: f32,
    pub light_color: [f32; 3],
    pub ambient_threshold: f32,
    pub ambient_color: [f32; 3],
    pub _pad0: f32,
    pub camera_position: [f32; 3],
    pub _pad1: f32,
}

/// The uniform block pushed before every indexed draw.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DrawUniforms {
    pub vertex: VertexUniforms,
    pub fragment: FragmentUniforms,
}

impl DrawUniforms {
    /// Size of one block; also the dynamic offset stride.
    pub const SIZE: u64 = std::mem::size_of::<DrawUniforms>() as u64;

    /// Builds the block for an object placed at `world`.
    pub fn new(
        view_projection: Mat4,
        world: Mat4,
        light: &DirectionalLight,
        camera_position: Vec3,
    ) -> Self {
        let normal = world.inverse().transpose();

        Self {
            vertex: VertexUniforms {
                world_view_projection: (view_projection * world).to_cols_array_2d(),
                world: world.to_cols_array_2d(),
                normal: normal.to_cols_array_2d(),
            },
            fragment: FragmentUniforms {
                light_direction: light.direction.to_array(),
                light_intensity: light.intensity,
                light_color: light.color.to_array(),
                ambient_threshold: light.ambient_threshold,
                ambient_color: light.ambient_color.to_array(),
                _pad0: 0.0,
                camera_position: camera_position.to_array(),
                _pad1: 0.0,
            },
        }
    }
}

/// One fully resolved indexed draw.
///
/// All resource references point into the asset registry and only live for
/// the duration of the frame that records them.
pub struct DrawIndexed<'a, D: GraphicsDevice + ?Sized> {
    pub uniforms: DrawUniforms,
    pub vertex_buffer: &'a D::Buffer,
    pub index_buffer: &'a D::Buffer,
    pub index_count: u32,
    pub pipeline: &'a D::Pipeline,
    pub texture: &'a D::Texture,
    pub sampler: &'a D::Sampler,
}

/// Resource creation and disposal for every asset kind.
pub trait GraphicsDevice {
    type Texture;
    type Shader;
    type Pipeline;
    type Sampler;
    type Buffer;

    /// Uploads decoded RGBA pixels as a sampled 2D texture.
    fn create_texture(&mut self, label: &str, image: &ImageData)
    -> Result<Self::Texture, DeviceError>;

    /// Compiles one entry point of a WGSL source.
    fn create_shader(
        &mut self,
        label: &str,
        source: &str,
        entry_point: &str,
        stage: ShaderStage,
    ) -> Result<Self::Shader, DeviceError>;

    /// Builds a render pipeline from two already compiled shaders.
    fn create_pipeline(
        &mut self,
        metadata: &PipelineMetadata,
        vertex: &Self::Shader,
        fragment: &Self::Shader,
    ) -> Result<Self::Pipeline, DeviceError>;

    fn create_sampler(&mut self, metadata: &SamplerMetadata) -> Self::Sampler;

    fn create_buffer(&mut self, label: &str, contents: &[u8], usage: BufferUsage) -> Self::Buffer;

    fn destroy_texture(&mut self, texture: Self::Texture) {
        drop(texture);
    }

    fn destroy_shader(&mut self, shader: Self::Shader) {
        drop(shader);
    }

    fn destroy_pipeline(&mut self, pipeline: Self::Pipeline) {
        drop(pipeline);
    }

    fn destroy_sampler(&mut self, sampler: Self::Sampler) {
        drop(sampler);
    }

    fn destroy_buffer(&mut self, buffer: Self::Buffer) {
        drop(buffer);
    }
}

/// Per-frame command recording on top of a [`GraphicsDevice`].
///
/// A frame is always `acquire_frame → begin_pass → draw_indexed* → end_pass →
/// blit_to_surface → submit`. When `acquire_frame` returns `false` nothing else
/// is called for that frame.
pub trait RenderBackend: GraphicsDevice {
    /// Acquires the presentable surface image. `false` means skip this frame.
    fn acquire_frame(&mut self) -> bool;

    /// Starts the offscreen pass, clearing colour and depth.
    fn begin_pass(&mut self, clear: ClearValues);

    /// Pushes the draw's uniforms, binds its resources and draws every index.
    fn draw_indexed(&mut self, draw: DrawIndexed<'_, Self>);

    fn end_pass(&mut self);

    /// Copies the offscreen colour target onto the surface with nearest filtering.
    fn blit_to_surface(&mut self);

    /// Submits the recorded commands and presents.
    fn submit(&mut self);

    /// Replaces the offscreen colour and depth targets for a new surface size.
    fn resize(&mut self, width: u32, height: u32);

    /// Current surface size in pixels.
    fn size(&self) -> (u32, u32);

    /// Width over height; `1.0` while the surface is zero-sized.
    fn aspect(&self) -> f32 {
        let (width, height) = self.size();
        if width == 0 || height == 0 {
            1.0
        } else {
            width as f32 / height as f32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn draw_uniforms_fill_one_dynamic_offset_slot() {
        assert_eq!(DrawUniforms::SIZE, 256);
        assert_eq!(std::mem::size_of::<VertexUniforms>(), 192);
        assert_eq!(std::mem::size_of::<FragmentUniforms>(), 64);
    }

    #[test]
    fn normal_matrix_undoes_non_uniform_scale() {
        let world = Mat4::from_scale(Vec3::new(2.0, 1.0, 4.0));
        let uniforms = DrawUniforms::new(
            Mat4::IDENTITY,
            world,
            &DirectionalLight::default(),
            Vec3::ZERO,
        );

        let normal = Mat4::from_cols_array_2d(&uniforms.vertex.normal);
        let expected = Mat4::from_scale(Vec3::new(0.5, 1.0, 0.25));
        assert_abs_diff_eq!(normal, expected, epsilon = 1e-6);
    }

    #[test]
    fn world_view_projection_applies_world_first() {
        let view_projection = Mat4::from_scale(Vec3::splat(2.0));
        let world = Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0));
        let uniforms = DrawUniforms::new(
            view_projection,
            world,
            &DirectionalLight::default(),
            Vec3::new(0.0, 0.0, 5.0),
        );

        let wvp = Mat4::from_cols_array_2d(&uniforms.vertex.world_view_projection);
        let origin = wvp.transform_point3(Vec3::ZERO);
        assert_abs_diff_eq!(origin, Vec3::new(2.0, 0.0, 0.0), epsilon = 1e-6);
        assert_eq!(uniforms.fragment.camera_position, [0.0, 0.0, 5.0]);
    }
}
