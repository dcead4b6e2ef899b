//! The component store: every entity, its components, the scene tree and the
//! two singletons (camera and main light).
//!
//! `World` is created once at startup and handed by reference to every system
//! that needs it. There is no global access. Entities are stored in a
//! [`hecs::World`], whose archetypes double as the component-presence sets the
//! queries filter on.

use glam::Vec3;
use hecs::{Component, DynamicBundle, Entity, NoSuchEntity, Query, QueryBorrow, QueryMut};

use crate::camera::Camera;
use crate::components::{
    GlobalTransform, LocalTransform, Position, Rotation, Scale, Tag, TransformDirty,
};
use crate::error::HierarchyError;
use crate::hierarchy::Hierarchy;
use crate::lighting::DirectionalLight;

pub struct World {
    entities: hecs::World,
    hierarchy: Hierarchy,
    root: Entity,
    camera: Camera,
    light: DirectionalLight,
}

impl World {
    /// Creates the store with its root entity, whose local and world
    /// transforms are fixed at identity.
    pub fn new() -> Self {
        let mut entities = hecs::World::new();
        let root = entities.spawn((
            Tag::new("Root"),
            LocalTransform::default(),
            GlobalTransform::default(),
        ));
        Self {
            entities,
            hierarchy: Hierarchy::new(),
            root,
            camera: Camera::default(),
            light: DirectionalLight::default(),
        }
    }

    /// The designated root. Every entity the factory creates hangs below it.
    pub fn root(&self) -> Entity {
        self.root
    }

    /// Read access to the child-of edges.
    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    /// Number of live entities, the root included.
    pub fn len(&self) -> usize {
        self.entities.len() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.entities.len() == 0
    }

    /// Whether `entity` is alive.
    pub fn contains(&self, entity: Entity) -> bool {
        self.entities.contains(entity)
    }

    /// Spawns an entity outside the scene tree.
    pub fn spawn(&mut self, components: impl DynamicBundle) -> Entity {
        self.entities.spawn(components)
    }

    /// Spawns an entity as a child of `parent`.
    pub fn spawn_child(
        &mut self,
        parent: Entity,
        components: impl DynamicBundle,
    ) -> Result<Entity, HierarchyError> {
        if !self.entities.contains(parent) {
            return Err(HierarchyError::NoSuchEntity(parent));
        }
        let child = self.entities.spawn(components);
        self.hierarchy.relate(child, parent)?;
        Ok(child)
    }

    /// Borrows one component of `entity`, or `None` when the entity is dead
    /// or does not carry `T`.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let tag = world.get::<Tag>(sofa).unwrap();
    /// assert_eq!(tag.as_str(), "Sofa");
    /// ```
    pub fn get<T: Component>(&self, entity: Entity) -> Option<hecs::Ref<'_, T>> {
        self.entities.get::<&T>(entity).ok()
    }

    /// Mutably borrows one component of `entity`.
    ///
    /// Writing `Position`, `Rotation` or `Scale` through this does not mark
    /// the entity dirty; prefer [`set_position`](Self::set_position) and friends.
    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> Option<hecs::RefMut<'_, T>> {
        self.entities.get::<&mut T>(entity).ok()
    }

    /// Whether `entity` is alive and carries `T`.
    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        self.entities
            .entity(entity)
            .map(|e| e.has::<T>())
            .unwrap_or(false)
    }

    /// Adds or replaces a component.
    pub fn insert<T: Component>(&mut self, entity: Entity, component: T) -> Result<(), NoSuchEntity> {
        self.entities.insert_one(entity, component)
    }

    /// Takes `T` off `entity`, returning it if it was there.
    pub fn remove<T: Component>(&mut self, entity: Entity) -> Option<T> {
        self.entities.remove_one::<T>(entity).ok()
    }

    /// Iterates every entity matching `Q`.
    ///
    /// # Example
    ///
    /// ```ignore
    /// for (entity, (global, mesh)) in world.query::<(&GlobalTransform, &MeshRef)>().iter() {
    ///     // ...
    /// }
    /// ```
    pub fn query<Q: Query>(&self) -> QueryBorrow<'_, Q> {
        self.entities.query::<Q>()
    }

    /// Like [`query`](Self::query) with exclusive access, so no runtime
    /// borrow checks.
    pub fn query_mut<Q: Query>(&mut self) -> QueryMut<'_, Q> {
        self.entities.query_mut::<Q>()
    }

    /// Moves `entity` and marks it dirty.
    pub fn set_position(&mut self, entity: Entity, position: Vec3) -> Result<(), NoSuchEntity> {
        self.entities
            .insert(entity, (Position(position), TransformDirty))
    }

    /// Sets the rotation in Euler degrees.
    pub fn set_rotation(&mut self, entity: Entity, degrees: Vec3) -> Result<(), NoSuchEntity> {
        self.entities
            .insert(entity, (Rotation(degrees), TransformDirty))
    }

    /// Rescales `entity` and marks it dirty.
    pub fn set_scale(&mut self, entity: Entity, scale: Vec3) -> Result<(), NoSuchEntity> {
        self.entities.insert(entity, (Scale(scale), TransformDirty))
    }

    /// Forces a local transform recompute on the next propagation pass.
    pub fn mark_dirty(&mut self, entity: Entity) -> Result<(), NoSuchEntity> {
        self.entities.insert_one(entity, TransformDirty)
    }

    /// Destroys `entity` and its whole subtree. Returns how many entities were
    /// removed. The root cannot be despawned this way; use [`World::teardown`].
    pub fn despawn(&mut self, entity: Entity) -> usize {
        if entity == self.root {
            log::warn!("refusing to despawn the scene root");
            return 0;
        }
        if !self.entities.contains(entity) {
            return 0;
        }

        let mut doomed = self.hierarchy.descendants(entity);
        doomed.insert(0, entity);

        let mut removed = 0;
        for e in doomed {
            self.hierarchy.detach(e);
            if self.entities.despawn(e).is_ok() {
                removed += 1;
            }
        }
        removed
    }

    /// Destroys every entity carrying `T`, along with their subtrees.
    pub fn despawn_all_with<T: Component>(&mut self) -> usize {
        let marked: Vec<Entity> = self
            .entities
            .query::<&T>()
            .iter()
            .map(|(entity, _)| entity)
            .collect();

        marked.into_iter().map(|entity| self.despawn(entity)).sum()
    }

    /// The camera singleton.
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// The main light singleton.
    pub fn light(&self) -> &DirectionalLight {
        &self.light
    }

    pub fn light_mut(&mut self) -> &mut DirectionalLight {
        &mut self.light
    }

    /// Destroys every entity, the root included, and drops all edges.
    pub fn teardown(&mut self) {
        self.entities.clear();
        self.hierarchy.clear();
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Spawned;

    #[test]
    fn root_starts_with_identity_transforms() {
        let world = World::new();
        let root = world.root();

        assert_eq!(world.len(), 1);
        assert_eq!(*world.get::<LocalTransform>(root).unwrap(), LocalTransform::default());
        assert_eq!(*world.get::<GlobalTransform>(root).unwrap(), GlobalTransform::default());
        assert!(world.hierarchy().parent_of(root).is_none());
    }

    #[test]
    fn spawn_child_records_the_edge() {
        let mut world = World::new();
        let root = world.root();
        let child = world.spawn_child(root, (Tag::new("a"),)).unwrap();

        assert_eq!(world.hierarchy().parent_of(child), Some(root));
        assert_eq!(world.hierarchy().children_of(root), &[child]);
    }

    #[test]
    fn spawn_child_of_missing_parent_fails() {
        let mut world = World::new();
        let gone = world.spawn(());
        world.despawn(gone);

        assert_eq!(
            world.spawn_child(gone, (Tag::new("orphan"),)),
            Err(HierarchyError::NoSuchEntity(gone))
        );
        assert_eq!(world.len(), 1);
    }

    #[test]
    fn placement_setters_mark_dirty() {
        let mut world = World::new();
        let e = world.spawn((Position::default(), Rotation::default(), Scale::default()));
        assert!(!world.has::<TransformDirty>(e));

        world.set_position(e, Vec3::X).unwrap();
        assert!(world.has::<TransformDirty>(e));
        assert_eq!(world.get::<Position>(e).unwrap().0, Vec3::X);

        world.remove::<TransformDirty>(e);
        world.set_rotation(e, Vec3::new(0.0, 0.0, 90.0)).unwrap();
        assert!(world.has::<TransformDirty>(e));

        world.remove::<TransformDirty>(e);
        world.set_scale(e, Vec3::splat(2.0)).unwrap();
        assert!(world.has::<TransformDirty>(e));
        assert_eq!(world.get::<Scale>(e).unwrap().0, Vec3::splat(2.0));
    }

    #[test]
    fn despawn_removes_the_subtree() {
        let mut world = World::new();
        let root = world.root();
        let a = world.spawn_child(root, (Tag::new("a"),)).unwrap();
        let b = world.spawn_child(a, (Tag::new("b"),)).unwrap();
        let c = world.spawn_child(b, (Tag::new("c"),)).unwrap();
        let d = world.spawn_child(root, (Tag::new("d"),)).unwrap();

        assert_eq!(world.despawn(a), 3);
        assert!(!world.contains(a) && !world.contains(b) && !world.contains(c));
        assert!(world.contains(d));
        assert_eq!(world.hierarchy().children_of(root), &[d]);
        assert_eq!(world.hierarchy().len(), 1);
    }

    #[test]
    fn root_survives_despawn() {
        let mut world = World::new();
        let root = world.root();
        assert_eq!(world.despawn(root), 0);
        assert!(world.contains(root));
    }

    #[test]
    fn despawn_all_with_counts_marked_entities() {
        let mut world = World::new();
        let root = world.root();
        for i in 0..5 {
            world.spawn_child(root, (Tag::new(format!("s{i}")), Spawned)).unwrap();
        }
        let keep = world.spawn_child(root, (Tag::new("keep"),)).unwrap();

        assert_eq!(world.despawn_all_with::<Spawned>(), 5);
        assert_eq!(world.len(), 2);
        assert!(world.contains(keep));
        assert_eq!(world.despawn_all_with::<Spawned>(), 0);
    }

    #[test]
    fn singletons_are_read_modify_write() {
        let mut world = World::new();
        world.camera_mut().zoom = 3.0;
        world.light_mut().intensity = 0.25;

        assert_eq!(world.camera().zoom, 3.0);
        assert_eq!(world.light().intensity, 0.25);
    }

    #[test]
    fn teardown_empties_everything() {
        let mut world = World::new();
        let root = world.root();
        world.spawn_child(root, (Tag::new("a"),)).unwrap();

        world.teardown();
        assert!(world.is_empty());
        assert!(world.hierarchy().is_empty());
    }
}
