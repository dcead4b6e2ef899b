//! Tears the room down and rebuilds it on demand.

use winit::keyboard::KeyCode;

use crate::components::Spawned;
use crate::error::HierarchyError;
use crate::factory::EntityFactory;
use crate::input::Input;
use crate::world::World;

pub const RESPAWN_KEY: KeyCode = KeyCode::KeyR;

#[derive(Debug, Default)]
pub struct SceneController;

impl SceneController {
    pub fn new() -> Self {
        Self
    }

    /// Destroys every spawned entity and repopulates the room.
    pub fn respawn(
        &mut self,
        world: &mut World,
        factory: &EntityFactory<'_>,
    ) -> Result<usize, HierarchyError> {
        let removed = world.despawn_all_with::<Spawned>();
        let spawned = factory.spawn_room(world)?;
        log::debug!("respawned scene: removed {removed}, spawned {}", spawned.len());
        Ok(spawned.len())
    }

    /// Respawns when R was pressed this frame. Returns the new entity count
    /// if it did.
    pub fn update(
        &mut self,
        world: &mut World,
        factory: &EntityFactory<'_>,
        input: &Input,
    ) -> Result<Option<usize>, HierarchyError> {
        if !input.key_pressed(RESPAWN_KEY) {
            return Ok(None);
        }
        self.respawn(world, factory).map(Some)
    }
}
