//! Hierarchical transform propagation.
//!
//! Runs once per frame after every placement change for that frame:
//!
//! 1. **Local recompute.** Each entity carrying [`TransformDirty`] and a full
//!    placement gets its [`LocalTransform`] rebuilt from scale, rotation and
//!    translation.
//! 2. **Propagation.** A breadth-first walk from the root rebuilds the
//!    [`GlobalTransform`] of every dirty entity and of every entity whose parent
//!    was rebuilt in this walk. Subtrees with no moved ancestor keep their
//!    cached world transform.
//!
//! Afterwards no entity carries `TransformDirty`, including entities that are
//! not attached to the tree.

use std::collections::VecDeque;

use glam::{Mat4, Quat};
use hecs::Entity;

use crate::components::{
    GlobalTransform, LocalTransform, Position, Rotation, Scale, TransformDirty,
};
use crate::world::World;

/// Counters reported by [`propagate_transforms`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PropagationStats {
    pub locals_recomputed: usize,
    pub worlds_recomputed: usize,
    /// Entities reached by the walk, the root excluded.
    pub visited: usize,
}

/// Builds the local matrix: scale, then rotate about X, Y and Z in that order
/// (angles in degrees), then translate.
pub fn local_matrix(position: &Position, rotation: &Rotation, scale: &Scale) -> Mat4 {
    let radians = rotation.0 * std::f32::consts::PI / 180.0;
    let orientation = Quat::from_rotation_z(radians.z)
        * Quat::from_rotation_y(radians.y)
        * Quat::from_rotation_x(radians.x);
    Mat4::from_scale_rotation_translation(scale.0, orientation, position.0)
}

pub fn propagate_transforms(world: &mut World) -> PropagationStats {
    let mut stats = PropagationStats::default();

    for (_, (position, rotation, scale, local, _)) in world.query_mut::<(
        &Position,
        &Rotation,
        &Scale,
        &mut LocalTransform,
        &TransformDirty,
    )>() {
        local.0 = local_matrix(position, rotation, scale);
        stats.locals_recomputed += 1;
    }

    let root = world.root();
    if let Some(mut global) = world.get_mut::<GlobalTransform>(root) {
        global.0 = Mat4::IDENTITY;
    }

    let mut queue: VecDeque<(Entity, Mat4, bool)> = VecDeque::new();
    queue.push_back((root, Mat4::IDENTITY, false));

    while let Some((parent, parent_world, parent_changed)) = queue.pop_front() {
        let children = world.hierarchy().children_of(parent).to_vec();
        for child in children {
            stats.visited += 1;

            let cached = world.get::<GlobalTransform>(child).map(|g| g.0);
            let recompute = parent_changed || world.has::<TransformDirty>(child) || cached.is_none();

            let child_world = match cached {
                Some(matrix) if !recompute => matrix,
                _ => {
                    let local = world
                        .get::<LocalTransform>(child)
                        .map_or(Mat4::IDENTITY, |l| l.0);
                    let matrix = parent_world * local;
                    write_global(world, child, matrix);
                    world.remove::<TransformDirty>(child);
                    stats.worlds_recomputed += 1;
                    matrix
                }
            };

            queue.push_back((child, child_world, recompute));
        }
    }

    let stranded: Vec<Entity> = world
        .query::<&TransformDirty>()
        .iter()
        .map(|(entity, _)| entity)
        .collect();
    for entity in stranded {
        world.remove::<TransformDirty>(entity);
    }

    stats
}

fn write_global(world: &mut World, entity: Entity, matrix: Mat4) {
    if let Some(mut global) = world.get_mut::<GlobalTransform>(entity) {
        global.0 = matrix;
        return;
    }
    if world.insert(entity, GlobalTransform(matrix)).is_err() {
        log::warn!("entity {entity:?} vanished during transform propagation");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use glam::Vec3;

    fn placed(world: &mut World, parent: Entity, position: Vec3, rotation: Vec3, scale: Vec3) -> Entity {
        world
            .spawn_child(
                parent,
                (
                    Position(position),
                    Rotation(rotation),
                    Scale(scale),
                    LocalTransform::default(),
                    GlobalTransform::default(),
                    TransformDirty,
                ),
            )
            .unwrap()
    }

    fn global(world: &World, entity: Entity) -> Mat4 {
        world.get::<GlobalTransform>(entity).unwrap().0
    }

    #[test]
    fn local_matrix_scales_then_rotates_then_translates() {
        let m = local_matrix(
            &Position(Vec3::new(10.0, 0.0, 0.0)),
            &Rotation(Vec3::new(0.0, 0.0, 90.0)),
            &Scale(Vec3::new(2.0, 1.0, 1.0)),
        );
        // (1,0,0) scaled to (2,0,0), turned to (0,2,0), moved to (10,2,0)
        assert_abs_diff_eq!(m.transform_point3(Vec3::X), Vec3::new(10.0, 2.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn local_matrix_applies_x_before_y_before_z() {
        let rotation = Vec3::new(90.0, 90.0, 90.0);
        let m = local_matrix(&Position::default(), &Rotation(rotation), &Scale::default());

        let r = rotation * std::f32::consts::PI / 180.0;
        let expected = Mat4::from_rotation_z(r.z) * Mat4::from_rotation_y(r.y) * Mat4::from_rotation_x(r.x);
        assert_abs_diff_eq!(m, expected, epsilon = 1e-5);
    }

    #[test]
    fn child_of_identity_root_is_a_pure_translation() {
        let mut world = World::new();
        let root = world.root();
        let t = Vec3::new(1.0, -2.0, 3.5);
        let child = placed(&mut world, root, t, Vec3::ZERO, Vec3::ONE);

        propagate_transforms(&mut world);

        assert_abs_diff_eq!(global(&world, child), Mat4::from_translation(t), epsilon = 1e-6);
    }

    #[test]
    fn grandchild_composes_every_ancestor() {
        let mut world = World::new();
        let root = world.root();
        let parent = placed(
            &mut world,
            root,
            Vec3::new(0.0, 5.0, 0.0),
            Vec3::new(0.0, 0.0, 90.0),
            Vec3::splat(2.0),
        );
        let grandchild = placed(
            &mut world,
            parent,
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(30.0, 0.0, 0.0),
            Vec3::ONE,
        );

        propagate_transforms(&mut world);

        let parent_local = Mat4::from_translation(Vec3::new(0.0, 5.0, 0.0))
            * Mat4::from_rotation_z(90f32.to_radians())
            * Mat4::from_scale(Vec3::splat(2.0));
        let child_local = Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0))
            * Mat4::from_rotation_x(30f32.to_radians());
        let expected = Mat4::IDENTITY * parent_local * child_local;

        assert_abs_diff_eq!(global(&world, grandchild), expected, epsilon = 1e-5);
        assert_abs_diff_eq!(
            global(&world, grandchild).transform_point3(Vec3::ZERO),
            Vec3::new(0.0, 7.0, 0.0),
            epsilon = 1e-5
        );
    }

    #[test]
    fn scattered_mutations_converge_in_one_pass() {
        let mut world = World::new();
        let root = world.root();
        let mut nodes = vec![root];
        for i in 0..20 {
            let parent = nodes[i / 3];
            let e = placed(&mut world, parent, Vec3::new(i as f32, 0.0, 0.0), Vec3::ZERO, Vec3::ONE);
            nodes.push(e);
        }
        propagate_transforms(&mut world);

        let moved = [nodes[2], nodes[7], nodes[13], nodes[20]];
        for (k, &e) in moved.iter().enumerate() {
            world.set_position(e, Vec3::new(0.0, k as f32 + 1.0, 0.0)).unwrap();
            world.set_rotation(e, Vec3::new(0.0, 0.0, 45.0)).unwrap();
        }
        propagate_transforms(&mut world);

        assert_eq!(world.query::<&TransformDirty>().iter().count(), 0);
        for &e in &moved {
            let mut expected = Mat4::IDENTITY;
            let mut chain = vec![e];
            while let Some(p) = world.hierarchy().parent_of(*chain.last().unwrap()) {
                if p == root {
                    break;
                }
                chain.push(p);
            }
            for &link in chain.iter().rev() {
                expected *= world.get::<LocalTransform>(link).unwrap().0;
            }
            assert_abs_diff_eq!(global(&world, e), expected, epsilon = 1e-4);
        }
    }

    #[test]
    fn moving_a_parent_updates_clean_children() {
        let mut world = World::new();
        let root = world.root();
        let parent = placed(&mut world, root, Vec3::ZERO, Vec3::ZERO, Vec3::ONE);
        let child = placed(&mut world, parent, Vec3::X, Vec3::ZERO, Vec3::ONE);
        propagate_transforms(&mut world);

        world.set_position(parent, Vec3::new(0.0, 0.0, 4.0)).unwrap();
        let stats = propagate_transforms(&mut world);

        assert_eq!(stats.locals_recomputed, 1);
        assert_eq!(stats.worlds_recomputed, 2);
        assert_abs_diff_eq!(
            global(&world, child),
            Mat4::from_translation(Vec3::new(1.0, 0.0, 4.0)),
            epsilon = 1e-6
        );
    }

    #[test]
    fn second_pass_without_changes_is_a_no_op() {
        let mut world = World::new();
        let root = world.root();
        let a = placed(&mut world, root, Vec3::new(0.3, 0.1, 0.7), Vec3::new(12.0, 34.0, 56.0), Vec3::splat(1.7));
        let b = placed(&mut world, a, Vec3::new(-1.1, 2.2, 0.4), Vec3::new(-5.0, 0.0, 90.0), Vec3::ONE);

        propagate_transforms(&mut world);
        let first = (global(&world, a), global(&world, b));

        let stats = propagate_transforms(&mut world);
        assert_eq!(stats.locals_recomputed, 0);
        assert_eq!(stats.worlds_recomputed, 0);
        assert_eq!(stats.visited, 2);
        assert_eq!((global(&world, a), global(&world, b)), first);
    }

    #[test]
    fn detached_entities_lose_their_marker() {
        let mut world = World::new();
        let loose = world.spawn((
            Position(Vec3::Y),
            Rotation::default(),
            Scale::default(),
            LocalTransform::default(),
            TransformDirty,
        ));

        let stats = propagate_transforms(&mut world);

        assert_eq!(stats.locals_recomputed, 1);
        assert_eq!(stats.visited, 0);
        assert!(!world.has::<TransformDirty>(loose));
        assert_eq!(world.get::<LocalTransform>(loose).unwrap().0, Mat4::from_translation(Vec3::Y));
    }
}
