//! Builds entities: the bare 3D archetype, the furnished props layered on top
//! of it, and the whole room.

use glam::Vec3;
use hecs::Entity;

use crate::assets::TextureId;
use crate::components::{
    GlobalTransform, LocalTransform, Material, MeshRef, Position, Rotation, Scale, Spawned, Tag,
    TransformDirty,
};
use crate::error::HierarchyError;
use crate::resources::{Prop, SceneResources};
use crate::world::World;

/// Half-extent of the floor grid, in tiles.
pub const ROOM_HALF_EXTENT: i32 = 3;

pub struct EntityFactory<'a> {
    resources: &'a SceneResources,
}

impl<'a> EntityFactory<'a> {
    /// Builds a factory over registered scene resources. The IDs it hands to
    /// new entities resolve once the registry has loaded.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let factory = EntityFactory::new(&resources);
    /// let cup = factory.spawn_prop(&mut world, Prop::Cup, Vec3::new(0.0, 0.0, 1.5), Vec3::ZERO)?;
    /// ```
    pub fn new(resources: &'a SceneResources) -> Self {
        Self { resources }
    }

    /// Spawns a placed entity under the root. It carries identity transforms
    /// and a dirty marker, so the next propagation pass positions it.
    pub fn create_3d_entity(
        &self,
        world: &mut World,
        position: Vec3,
        rotation: Vec3,
        scale: Vec3,
        tag: &str,
    ) -> Result<Entity, HierarchyError> {
        let root = world.root();
        world.spawn_child(
            root,
            (
                Tag::new(tag),
                Position(position),
                Rotation(rotation),
                Scale(scale),
                LocalTransform::default(),
                GlobalTransform::default(),
                TransformDirty,
                Spawned,
            ),
        )
    }

    /// Spawns a prop with its archetype's mesh, texture and default scale.
    pub fn spawn_prop(
        &self,
        world: &mut World,
        prop: Prop,
        position: Vec3,
        rotation: Vec3,
    ) -> Result<Entity, HierarchyError> {
        let assets = self.resources.prop(prop);
        self.spawn_renderable(world, prop, position, rotation, assets.texture)
    }

    /// Spawns a unit cube wearing an arbitrary texture.
    pub fn spawn_cube(
        &self,
        world: &mut World,
        position: Vec3,
        texture: TextureId,
    ) -> Result<Entity, HierarchyError> {
        self.spawn_renderable(world, Prop::Cube, position, Vec3::ZERO, texture)
    }

    fn spawn_renderable(
        &self,
        world: &mut World,
        prop: Prop,
        position: Vec3,
        rotation: Vec3,
        texture: TextureId,
    ) -> Result<Entity, HierarchyError> {
        let scale = Vec3::from_array(prop.default_scale());
        let entity = self.create_3d_entity(world, position, rotation, scale, prop.tag())?;
        let mesh = MeshRef(self.resources.prop(prop).model);
        let material = Material::new(self.resources.default_mesh_pipeline, texture);
        world
            .insert(entity, mesh)
            .and_then(|()| world.insert(entity, material))
            .map_err(|_| HierarchyError::NoSuchEntity(entity))?;
        Ok(entity)
    }

    /// Lays out the room: the floor grid with walls along its two back edges,
    /// then the furniture. The order never varies, so repeated calls produce
    /// the same scene.
    pub fn spawn_room(&self, world: &mut World) -> Result<Vec<Entity>, HierarchyError> {
        let mut spawned = Vec::new();
        let n = ROOM_HALF_EXTENT;

        for i in -n..=n {
            for j in -n..=n {
                let (x, y) = (i as f32, j as f32);
                spawned.push(self.spawn_prop(
                    world,
                    Prop::DarkWoodenFloorTile,
                    Vec3::new(x, y, 0.0),
                    Vec3::ZERO,
                )?);

                if i == -n {
                    spawned.push(self.spawn_prop(
                        world,
                        Prop::PlasterWall,
                        Vec3::new(x - 0.5, y, 0.0),
                        Vec3::new(0.0, 0.0, -90.0),
                    )?);
                }
                if j == -n {
                    spawned.push(self.spawn_prop(
                        world,
                        Prop::PlasterWall,
                        Vec3::new(x, y - 0.5, 0.0),
                        Vec3::ZERO,
                    )?);
                }
            }
        }

        let furniture = [
            (Prop::FlowerPot, Vec3::new(-2.5, -2.25, 0.0), Vec3::ZERO),
            (Prop::Carpet, Vec3::new(0.0, 0.0, 0.01), Vec3::ZERO),
            (Prop::Sofa, Vec3::new(2.0, -1.0, 0.0), Vec3::new(0.0, 0.0, -45.0)),
            (Prop::Sofa, Vec3::new(-2.0, -1.0, 0.0), Vec3::new(0.0, 0.0, -135.0)),
            (Prop::TableRound, Vec3::ZERO, Vec3::ZERO),
            (Prop::Painting, Vec3::new(-3.49, 0.0, 1.5), Vec3::new(0.0, 90.0, 180.0)),
            (Prop::Cup, Vec3::new(0.39, -0.25, 0.535), Vec3::new(0.0, 0.0, 30.0)),
            (Prop::Cup, Vec3::new(-0.39, -0.25, 0.535), Vec3::new(0.0, 0.0, -30.0)),
        ];
        for (prop, position, rotation) in furniture {
            spawned.push(self.spawn_prop(world, prop, position, rotation)?);
        }

        log::info!("spawned room with {} entities", spawned.len());
        Ok(spawned)
    }
}
