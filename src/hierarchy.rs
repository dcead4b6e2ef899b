//! The child-of relation that shapes the scene tree.
//!
//! Edges are only ever added when a child is created, pointing at an entity
//! that already exists, so the relation stays acyclic. Children are kept in
//! insertion order which makes every traversal deterministic.

use std::collections::{HashMap, VecDeque};

use hecs::Entity;

use crate::error::HierarchyError;

#[derive(Debug, Default)]
pub struct Hierarchy {
    parent: HashMap<Entity, Entity>,
    children: HashMap<Entity, Vec<Entity>>,
}

impl Hierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `child` as a child of `parent`.
    pub fn relate(&mut self, child: Entity, parent: Entity) -> Result<(), HierarchyError> {
        if child == parent {
            return Err(HierarchyError::SelfParent(child));
        }
        if let Some(&existing) = self.parent.get(&child) {
            return Err(HierarchyError::AlreadyParented {
                child,
                parent: existing,
            });
        }
        self.parent.insert(child, parent);
        self.children.entry(parent).or_default().push(child);
        Ok(())
    }

    pub fn parent_of(&self, entity: Entity) -> Option<Entity> {
        self.parent.get(&entity).copied()
    }

    /// Direct children in creation order.
    pub fn children_of(&self, entity: Entity) -> &[Entity] {
        self.children.get(&entity).map_or(&[], Vec::as_slice)
    }

    /// Every entity below `entity`, breadth first. `entity` itself is excluded.
    pub fn descendants(&self, entity: Entity) -> Vec<Entity> {
        let mut out = Vec::new();
        let mut queue: VecDeque<Entity> = self.children_of(entity).iter().copied().collect();
        while let Some(next) = queue.pop_front() {
            out.push(next);
            queue.extend(self.children_of(next).iter().copied());
        }
        out
    }

    /// Removes every edge touching `entity`. Its children become parentless.
    pub fn detach(&mut self, entity: Entity) {
        if let Some(parent) = self.parent.remove(&entity) {
            if let Some(siblings) = self.children.get_mut(&parent) {
                siblings.retain(|&sibling| sibling != entity);
                if siblings.is_empty() {
                    self.children.remove(&parent);
                }
            }
        }
        if let Some(children) = self.children.remove(&entity) {
            for child in children {
                self.parent.remove(&child);
            }
        }
    }

    pub fn clear(&mut self) {
        self.parent.clear();
        self.children.clear();
    }

    /// Number of child-of edges.
    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }
}
