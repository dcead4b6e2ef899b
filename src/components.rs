//! Component types stored on entities in the [`World`](crate::World).
//!
//! Placement is authored through [`Position`], [`Rotation`] and [`Scale`].
//! [`LocalTransform`] and [`GlobalTransform`] are derived from them by
//! [`propagate_transforms`](crate::propagate_transforms) and should never be
//! written anywhere else.
//!
//! An entity is drawn when it carries a [`GlobalTransform`], a [`MeshRef`] and
//! a [`Material`]:
//!
//! ```ignore
//! let sofa = world.spawn_child(world.root(), (
//!     Position(Vec3::new(2.0, -1.0, 0.0)),
//!     Rotation(Vec3::new(0.0, 0.0, -45.0)),
//!     Scale(Vec3::ONE),
//!     LocalTransform::default(),
//!     GlobalTransform::default(),
//!     TransformDirty,
//!     MeshRef(resources.prop(Prop::Sofa).model),
//!     Material::new(resources.default_mesh_pipeline, resources.prop(Prop::Sofa).texture),
//! ));
//! ```

use glam::{Mat4, Vec3};

use crate::assets::{ModelId, PipelineId, TextureId};

/// Local translation.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Position(pub Vec3);

/// Local rotation as Euler angles in degrees, applied X then Y then Z.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rotation(pub Vec3);

/// Local non-uniform scale.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Scale(pub Vec3);

impl Default for Scale {
    fn default() -> Self {
        Self(Vec3::ONE)
    }
}

/// Matrix derived from the entity's own placement.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LocalTransform(pub Mat4);

impl Default for LocalTransform {
    fn default() -> Self {
        Self(Mat4::IDENTITY)
    }
}

/// Matrix placing the entity in world space: its local transform composed
/// with every ancestor's.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlobalTransform(pub Mat4);

impl Default for GlobalTransform {
    fn default() -> Self {
        Self(Mat4::IDENTITY)
    }
}

/// Marks an entity whose local transform must be recomputed and pushed down
/// the hierarchy on the next propagation pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransformDirty;

/// Marks an entity created by the scene population pass, so a respawn can
/// remove exactly those entities.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Spawned;

/// Human-readable identity of an entity, e.g. `"Sofa"`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Tag(pub String);

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The model an entity draws with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeshRef(pub ModelId);

/// How an entity's mesh is shaded: a pipeline and the texture it samples.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Material {
    pub pipeline: PipelineId,
    pub texture: TextureId,
}

impl Material {
    pub fn new(pipeline: PipelineId, texture: TextureId) -> Self {
        Self { pipeline, texture }
    }
}
