//! Error types for asset loading, device work and engine startup.
//!
//! Fatal conditions surface as `Err` values and are propagated with `?` up to
//! the binary, which logs them and exits. Recoverable mesh-file oddities never
//! become errors; they are logged as warnings where they are found. A missing
//! swapchain image is not an error at all (see
//! [`FrameOutcome::Skipped`](crate::FrameOutcome::Skipped)).

use thiserror::Error;

use crate::device::ShaderStage;

/// Errors raised by the [`AssetRegistry`](crate::AssetRegistry).
#[derive(Error, Debug)]
pub enum AssetError {
    #[error("asset file not found: {path}")]
    MissingFile { path: String },

    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode image '{path}': {source}")]
    Image {
        path: String,
        #[source]
        source: image::ImageError,
    },

    #[error("texture '{path}' could not be uploaded: {message}")]
    TextureUpload { path: String, message: String },

    #[error("shader '{path}' failed to compile: {message}")]
    ShaderCompilation { path: String, message: String },

    #[error("pipeline '{pipeline}' references shader #{shader}, which was never registered")]
    UnregisteredShader { pipeline: String, shader: u32 },

    #[error("pipeline '{pipeline}' expects a {expected:?} shader in slot #{shader}")]
    ShaderStageMismatch {
        pipeline: String,
        shader: u32,
        expected: ShaderStage,
    },

    #[error("pipeline '{name}' could not be created: {message}")]
    PipelineCreation { name: String, message: String },

    #[error("malformed model '{path}' at line {line}: {reason}")]
    MalformedModel {
        path: String,
        line: usize,
        reason: String,
    },

    #[error("{kind} #{index} is not loaded ({loaded} live {kind} objects)")]
    NotLoaded {
        kind: AssetKind,
        index: u32,
        loaded: usize,
    },

    #[error("asset registry was already loaded; reloading is not supported")]
    AlreadyLoaded,
}

/// The five asset kinds the registry manages, in load order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Texture,
    Shader,
    Pipeline,
    Sampler,
    Model,
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AssetKind::Texture => "texture",
            AssetKind::Shader => "shader",
            AssetKind::Pipeline => "pipeline",
            AssetKind::Sampler => "sampler",
            AssetKind::Model => "model",
        };
        f.write_str(name)
    }
}

/// A resource-creation failure reported by a [`GraphicsDevice`](crate::GraphicsDevice).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct DeviceError(pub String);

/// Errors that stop the engine from starting or from drawing.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error("scene construction failed: {0}")]
    Scene(#[from] HierarchyError),

    #[error("no suitable GPU adapter: {0}")]
    Adapter(String),

    #[error("failed to create GPU device: {0}")]
    Device(String),

    #[error("failed to create window surface: {0}")]
    Surface(String),

    #[error("window system error: {0}")]
    Window(String),
}

/// Rejected edits to the child-of relation.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HierarchyError {
    #[error("entity {0:?} cannot be its own parent")]
    SelfParent(hecs::Entity),

    #[error("entity {child:?} already has parent {parent:?}")]
    AlreadyParented {
        child: hecs::Entity,
        parent: hecs::Entity,
    },

    #[error("entity {0:?} does not exist")]
    NoSuchEntity(hecs::Entity),
}
