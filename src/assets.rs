//! The asset registry: declared metadata, stable IDs and the live GPU objects
//! behind them.
//!
//! Assets go through three stages:
//!
//! 1. **Register.** At startup each asset is declared with a metadata record
//!    and receives an ID equal to the number of assets of that kind declared
//!    before it. Nothing touches the GPU yet.
//! 2. **Load.** A single pass creates every object in a fixed order: textures,
//!    shaders, pipelines, samplers, models. Any failure aborts the pass and
//!    destroys whatever was already created.
//! 3. **Destroy.** At shutdown every live object is released, kind by kind in
//!    the same order.
//!
//! Resolving an ID is an index into a `Vec`. IDs are never reused.
//!
//! ```ignore
//! let mut registry = AssetRegistry::new();
//! let brick = registry.register_texture(TextureMetadata::new("textures/brick.png"));
//! let vs = registry.register_shader(ShaderMetadata::vertex("shaders/mesh.wgsl", "vs_main"));
//! let fs = registry.register_shader(ShaderMetadata::fragment("shaders/mesh.wgsl", "fs_main"));
//! let mesh = registry.register_pipeline(PipelineMetadata::new("mesh", vs, fs));
//!
//! registry.load(&mut device, &storage)?;
//! let pipeline = registry.pipeline(mesh)?;
//! ```

use crate::device::{GraphicsDevice, ShaderStage};
use crate::error::{AssetError, AssetKind};
use crate::model::{Model, parse_obj};
use crate::storage::TitleStorage;
use crate::texture::ImageData;

macro_rules! asset_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub(crate) u32);

        impl $name {
            /// Zero-based position among assets of the same kind.
            pub fn index(self) -> u32 {
                self.0
            }
        }
    };
}

asset_id!(
    /// Handle to a registered texture.
    TextureId
);
asset_id!(
    /// Handle to a registered shader entry point.
    ShaderId
);
asset_id!(
    /// Handle to a registered render pipeline.
    PipelineId
);
asset_id!(
    /// Handle to a registered sampler.
    SamplerId
);
asset_id!(
    /// Handle to a registered model.
    ModelId
);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextureMetadata {
    pub path: String,
}

impl TextureMetadata {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShaderMetadata {
    pub path: String,
    pub entry_point: String,
    pub stage: ShaderStage,
}

impl ShaderMetadata {
    pub fn vertex(path: impl Into<String>, entry_point: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            entry_point: entry_point.into(),
            stage: ShaderStage::Vertex,
        }
    }

    pub fn fragment(path: impl Into<String>, entry_point: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            entry_point: entry_point.into(),
            stage: ShaderStage::Fragment,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CullMode {
    None,
    Front,
    Back,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DepthCompare {
    Less,
    LessEqual,
    Always,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlendMode {
    Opaque,
    AlphaBlend,
}

/// Fixed-function state of a pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PipelineDescription {
    pub cull_mode: CullMode,
    pub depth_write: bool,
    pub depth_compare: DepthCompare,
    pub blend: BlendMode,
}

impl PipelineDescription {
    /// Back-face culled, depth tested and written, no blending.
    pub const OPAQUE: Self = Self {
        cull_mode: CullMode::Back,
        depth_write: true,
        depth_compare: DepthCompare::Less,
        blend: BlendMode::Opaque,
    };
}

impl Default for PipelineDescription {
    fn default() -> Self {
        Self::OPAQUE
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineMetadata {
    pub name: String,
    pub vertex_shader: ShaderId,
    pub fragment_shader: ShaderId,
    pub description: PipelineDescription,
}

impl PipelineMetadata {
    pub fn new(name: impl Into<String>, vertex_shader: ShaderId, fragment_shader: ShaderId) -> Self {
        Self {
            name: name.into(),
            vertex_shader,
            fragment_shader,
            description: PipelineDescription::default(),
        }
    }

    pub fn with_description(mut self, description: PipelineDescription) -> Self {
        self.description = description;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FilterMode {
    Nearest,
    Linear,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AddressMode {
    Repeat,
    MirrorRepeat,
    ClampToEdge,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SamplerDescription {
    pub filter: FilterMode,
    pub address_mode: AddressMode,
}

impl SamplerDescription {
    /// Nearest filtering, repeating in every direction.
    pub const POINT_WRAP: Self = Self {
        filter: FilterMode::Nearest,
        address_mode: AddressMode::Repeat,
    };

    pub const LINEAR_CLAMP: Self = Self {
        filter: FilterMode::Linear,
        address_mode: AddressMode::ClampToEdge,
    };
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SamplerMetadata {
    pub name: String,
    pub description: SamplerDescription,
}

impl SamplerMetadata {
    pub fn new(name: impl Into<String>, description: SamplerDescription) -> Self {
        Self {
            name: name.into(),
            description,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelMetadata {
    pub name: String,
    pub path: String,
}

impl ModelMetadata {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// A pipeline declaration plus how many shaders existed when it was made.
/// A pipeline may only use shaders registered before it.
#[derive(Clone, Debug)]
struct PipelineEntry {
    metadata: PipelineMetadata,
    shaders_at_registration: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Stage {
    Registering,
    Loaded,
    Destroyed,
}

/// Owns every live texture, shader, pipeline, sampler and model.
pub struct AssetRegistry<D: GraphicsDevice> {
    texture_metadata: Vec<TextureMetadata>,
    shader_metadata: Vec<ShaderMetadata>,
    pipeline_entries: Vec<PipelineEntry>,
    sampler_metadata: Vec<SamplerMetadata>,
    model_metadata: Vec<ModelMetadata>,

    textures: Vec<D::Texture>,
    shaders: Vec<D::Shader>,
    pipelines: Vec<D::Pipeline>,
    samplers: Vec<D::Sampler>,
    models: Vec<Model<D::Buffer>>,

    stage: Stage,
}

impl<D: GraphicsDevice> AssetRegistry<D> {
    pub fn new() -> Self {
        Self {
            texture_metadata: Vec::new(),
            shader_metadata: Vec::new(),
            pipeline_entries: Vec::new(),
            sampler_metadata: Vec::new(),
            model_metadata: Vec::new(),
            textures: Vec::new(),
            shaders: Vec::new(),
            pipelines: Vec::new(),
            samplers: Vec::new(),
            models: Vec::new(),
            stage: Stage::Registering,
        }
    }

    /// Records a texture to load and returns its ID. IDs of each kind are
    /// handed out densely from zero in registration order.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let brick = registry.register_texture(TextureMetadata::new("textures/brick.png"));
    /// registry.load(&mut device, &storage)?;
    /// let texture = registry.texture(brick)?;
    /// ```
    pub fn register_texture(&mut self, metadata: TextureMetadata) -> TextureId {
        let id = TextureId(self.texture_metadata.len() as u32);
        self.texture_metadata.push(metadata);
        id
    }

    /// Records one shader entry point. A file holding both stages is
    /// registered twice, once per entry point.
    pub fn register_shader(&mut self, metadata: ShaderMetadata) -> ShaderId {
        let id = ShaderId(self.shader_metadata.len() as u32);
        self.shader_metadata.push(metadata);
        id
    }

    /// Registers a pipeline. Both of its shaders must already be registered,
    /// otherwise [`load`](Self::load) fails with
    /// [`AssetError::UnregisteredShader`].
    pub fn register_pipeline(&mut self, metadata: PipelineMetadata) -> PipelineId {
        let id = PipelineId(self.pipeline_entries.len() as u32);
        let shaders_at_registration = self.shader_metadata.len() as u32;
        for shader in [metadata.vertex_shader, metadata.fragment_shader] {
            if shader.0 >= shaders_at_registration {
                log::warn!(
                    "pipeline '{}' registered before shader #{}",
                    metadata.name,
                    shader.0
                );
            }
        }
        self.pipeline_entries.push(PipelineEntry {
            metadata,
            shaders_at_registration,
        });
        id
    }

    /// Records a sampler description.
    pub fn register_sampler(&mut self, metadata: SamplerMetadata) -> SamplerId {
        let id = SamplerId(self.sampler_metadata.len() as u32);
        self.sampler_metadata.push(metadata);
        id
    }

    /// Records an OBJ model to parse and upload.
    pub fn register_model(&mut self, metadata: ModelMetadata) -> ModelId {
        let id = ModelId(self.model_metadata.len() as u32);
        self.model_metadata.push(metadata);
        id
    }

    pub fn texture_count(&self) -> usize {
        self.texture_metadata.len()
    }

    pub fn shader_count(&self) -> usize {
        self.shader_metadata.len()
    }

    pub fn pipeline_count(&self) -> usize {
        self.pipeline_entries.len()
    }

    pub fn sampler_count(&self) -> usize {
        self.sampler_metadata.len()
    }

    pub fn model_count(&self) -> usize {
        self.model_metadata.len()
    }

    /// `true` between a successful [`load`](Self::load) and [`destroy`](Self::destroy).
    pub fn is_loaded(&self) -> bool {
        self.stage == Stage::Loaded
    }

    /// Every file the load pass reads, in the order it reads them.
    pub fn registered_paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = Vec::new();
        paths.extend(self.texture_metadata.iter().map(|m| m.path.as_str()));
        for shader in &self.shader_metadata {
            if !paths.contains(&shader.path.as_str()) {
                paths.push(&shader.path);
            }
        }
        paths.extend(self.model_metadata.iter().map(|m| m.path.as_str()));
        paths
    }

    /// Creates every registered object on `device`, reading files from
    /// `storage`. Runs once; on error nothing stays alive.
    pub fn load(&mut self, device: &mut D, storage: &dyn TitleStorage) -> Result<(), AssetError> {
        if self.stage != Stage::Registering {
            return Err(AssetError::AlreadyLoaded);
        }

        match self.load_all(device, storage) {
            Ok(()) => {
                self.stage = Stage::Loaded;
                log::info!(
                    "assets loaded: {} textures, {} shaders, {} pipelines, {} samplers, {} models",
                    self.textures.len(),
                    self.shaders.len(),
                    self.pipelines.len(),
                    self.samplers.len(),
                    self.models.len()
                );
                Ok(())
            }
            Err(err) => {
                log::error!("asset load failed: {err}");
                self.release(device);
                self.stage = Stage::Destroyed;
                Err(err)
            }
        }
    }

    fn load_all(&mut self, device: &mut D, storage: &dyn TitleStorage) -> Result<(), AssetError> {
        log::info!("loading {} textures", self.texture_metadata.len());
        for meta in &self.texture_metadata {
            log::info!("  texture {}", meta.path);
            let bytes = read(storage, &meta.path)?;
            let image = ImageData::decode(&meta.path, &bytes)?;
            let texture = device
                .create_texture(&meta.path, &image)
                .map_err(|err| AssetError::TextureUpload {
                    path: meta.path.clone(),
                    message: err.0,
                })?;
            self.textures.push(texture);
        }

        log::info!("loading {} shaders", self.shader_metadata.len());
        for meta in &self.shader_metadata {
            log::info!("  shader {}::{}", meta.path, meta.entry_point);
            let source = read_text(storage, &meta.path)?;
            let label = format!("{}::{}", meta.path, meta.entry_point);
            let shader = device
                .create_shader(&label, &source, &meta.entry_point, meta.stage)
                .map_err(|err| AssetError::ShaderCompilation {
                    path: meta.path.clone(),
                    message: err.0,
                })?;
            self.shaders.push(shader);
        }

        log::info!("building {} pipelines", self.pipeline_entries.len());
        for entry in &self.pipeline_entries {
            let meta = &entry.metadata;
            log::info!("  pipeline {}", meta.name);
            let vertex = self.resolve_stage(entry, meta.vertex_shader, ShaderStage::Vertex)?;
            let fragment = self.resolve_stage(entry, meta.fragment_shader, ShaderStage::Fragment)?;
            let pipeline = device
                .create_pipeline(meta, &self.shaders[vertex], &self.shaders[fragment])
                .map_err(|err| AssetError::PipelineCreation {
                    name: meta.name.clone(),
                    message: err.0,
                })?;
            self.pipelines.push(pipeline);
        }

        log::info!("creating {} samplers", self.sampler_metadata.len());
        for meta in &self.sampler_metadata {
            log::info!("  sampler {}", meta.name);
            self.samplers.push(device.create_sampler(meta));
        }

        log::info!("loading {} models", self.model_metadata.len());
        for meta in &self.model_metadata {
            log::info!("  model {} ({})", meta.name, meta.path);
            let text = read_text(storage, &meta.path)?;
            let parsed = parse_obj(&meta.path, &text)?;
            self.models.push(Model::upload(device, &meta.name, &parsed.mesh));
        }

        Ok(())
    }

    /// Checks that a pipeline's shader slot names a shader registered before
    /// the pipeline and compiled for the expected stage.
    fn resolve_stage(
        &self,
        entry: &PipelineEntry,
        shader: ShaderId,
        expected: ShaderStage,
    ) -> Result<usize, AssetError> {
        let index = shader.0 as usize;
        let registered = shader.0 < entry.shaders_at_registration;
        match self.shader_metadata.get(index) {
            Some(meta) if registered && index < self.shaders.len() => {
                if meta.stage == expected {
                    Ok(index)
                } else {
                    Err(AssetError::ShaderStageMismatch {
                        pipeline: entry.metadata.name.clone(),
                        shader: shader.0,
                        expected,
                    })
                }
            }
            _ => Err(AssetError::UnregisteredShader {
                pipeline: entry.metadata.name.clone(),
                shader: shader.0,
            }),
        }
    }

    /// The live texture behind `id`. Fails with [`AssetError::NotLoaded`]
    /// before a successful load, after destroy, or for an ID never registered.
    pub fn texture(&self, id: TextureId) -> Result<&D::Texture, AssetError> {
        lookup(&self.textures, AssetKind::Texture, id.0)
    }

    /// The compiled shader behind `id`.
    pub fn shader(&self, id: ShaderId) -> Result<&D::Shader, AssetError> {
        lookup(&self.shaders, AssetKind::Shader, id.0)
    }

    /// The pipeline behind `id`.
    pub fn pipeline(&self, id: PipelineId) -> Result<&D::Pipeline, AssetError> {
        lookup(&self.pipelines, AssetKind::Pipeline, id.0)
    }

    /// The sampler behind `id`.
    pub fn sampler(&self, id: SamplerId) -> Result<&D::Sampler, AssetError> {
        lookup(&self.samplers, AssetKind::Sampler, id.0)
    }

    /// The uploaded vertex and index buffers behind `id`.
    pub fn model(&self, id: ModelId) -> Result<&Model<D::Buffer>, AssetError> {
        lookup(&self.models, AssetKind::Model, id.0)
    }

    /// Releases every live object. Metadata is kept for diagnostics, but the
    /// registry cannot be loaded again.
    pub fn destroy(&mut self, device: &mut D) {
        if self.stage == Stage::Destroyed {
            return;
        }
        log::info!("destroying assets");
        self.release(device);
        self.stage = Stage::Destroyed;
    }

    fn release(&mut self, device: &mut D) {
        for texture in self.textures.drain(..) {
            device.destroy_texture(texture);
        }
        for shader in self.shaders.drain(..) {
            device.destroy_shader(shader);
        }
        for pipeline in self.pipelines.drain(..) {
            device.destroy_pipeline(pipeline);
        }
        for sampler in self.samplers.drain(..) {
            device.destroy_sampler(sampler);
        }
        for model in self.models.drain(..) {
            model.destroy(device);
        }
    }
}

impl<D: GraphicsDevice> Default for AssetRegistry<D> {
    fn default() -> Self {
        Self::new()
    }
}

fn read(storage: &dyn TitleStorage, path: &str) -> Result<Vec<u8>, AssetError> {
    check_size(storage, path)?;
    storage.read(path)
}

/// Reads a text asset. Bytes that are not UTF-8 fail the load.
fn read_text(storage: &dyn TitleStorage, path: &str) -> Result<String, AssetError> {
    check_size(storage, path)?;
    storage.read_to_string(path)
}

fn check_size(storage: &dyn TitleStorage, path: &str) -> Result<(), AssetError> {
    let size = storage.size(path).ok_or_else(|| AssetError::MissingFile {
        path: path.to_string(),
    })?;
    log::debug!("    {path}: {size} bytes");
    Ok(())
}

fn lookup<T>(items: &[T], kind: AssetKind, index: u32) -> Result<&T, AssetError> {
    items.get(index as usize).ok_or(AssetError::NotLoaded {
        kind,
        index,
        loaded: items.len(),
    })
}
