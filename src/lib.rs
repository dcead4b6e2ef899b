//! # Atrium
//!
//! Scene management and rendering core for a small real-time 3D room viewer.
//!
//! A frame runs in a fixed order:
//!
//! 1. [`SceneController`] respawns the room when asked,
//! 2. [`LightController`] and [`CameraController`] apply input to the two
//!    singletons,
//! 3. [`propagate_transforms`] turns placement into world matrices,
//! 4. [`render_frame`] draws every entity with a mesh and a material.
//!
//! [`Engine`] wires these together over any [`RenderBackend`]; [`run`] hosts
//! it in a window with the wgpu backend.
//!
//! ```no_run
//! use atrium::{AppConfig, run};
//!
//! fn main() -> Result<(), atrium::EngineError> {
//!     run(AppConfig::new().asset_root("assets"))
//! }
//! ```

mod app;
mod assets;
mod camera;
mod components;
mod device;
mod engine;
mod error;
mod factory;
mod gpu;
mod hierarchy;
mod input;
mod lighting;
mod model;
mod render_target;
mod renderer;
mod resources;
mod scene;
mod storage;
mod texture;
mod transform;
mod wgpu_device;
mod world;

#[cfg(test)]
mod testing;

pub use app::{AppConfig, run};
pub use assets::{
    AddressMode, AssetRegistry, BlendMode, CullMode, DepthCompare, FilterMode, ModelId,
    ModelMetadata, PipelineDescription, PipelineId, PipelineMetadata, SamplerDescription,
    SamplerId, SamplerMetadata, ShaderId, ShaderMetadata, TextureId, TextureMetadata,
};
pub use camera::{Camera, CameraController};
pub use components::{
    GlobalTransform, LocalTransform, Material, MeshRef, Position, Rotation, Scale, Spawned, Tag,
    TransformDirty,
};
pub use device::{
    BufferUsage, ClearValues, DrawIndexed, DrawUniforms, FragmentUniforms, GraphicsDevice,
    RenderBackend, ShaderStage, VertexUniforms,
};
pub use engine::Engine;
pub use error::{AssetError, AssetKind, DeviceError, EngineError, HierarchyError};
pub use factory::EntityFactory;
pub use gpu::GpuContext;
pub use hierarchy::Hierarchy;
pub use input::Input;
pub use lighting::{DirectionalLight, LightController};
pub use model::{MeshData, Model, ParsedObj, Vertex3d, parse_obj};
pub use renderer::{FrameOutcome, render_frame};
pub use resources::{Prop, PropAssets, SceneResources};
pub use scene::SceneController;
pub use storage::{DirectoryStorage, MemoryStorage, TitleStorage};
pub use texture::{GpuTexture, ImageData};
pub use transform::{PropagationStats, local_matrix, propagate_transforms};
pub use wgpu_device::{WgpuDevice, WgpuSampler, WgpuShader};
pub use world::World;

// Re-export glam math types for convenience
pub use glam::{Mat4, Vec2, Vec3};

// Re-export commonly used winit types for convenience
pub use winit::event::MouseButton;
pub use winit::keyboard::KeyCode;

pub use hecs::Entity;
