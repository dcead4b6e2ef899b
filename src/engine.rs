//! Owns the scene, its assets and the backend, and runs the per-frame passes
//! in their fixed order.

use crate::assets::AssetRegistry;
use crate::camera::CameraController;
use crate::device::RenderBackend;
use crate::error::EngineError;
use crate::factory::EntityFactory;
use crate::input::Input;
use crate::lighting::LightController;
use crate::renderer::{FrameOutcome, render_frame};
use crate::resources::SceneResources;
use crate::scene::SceneController;
use crate::storage::TitleStorage;
use crate::transform::{PropagationStats, propagate_transforms};
use crate::world::World;

pub struct Engine<B: RenderBackend> {
    backend: B,
    world: World,
    assets: AssetRegistry<B>,
    resources: SceneResources,
    scene: SceneController,
    light_controller: LightController,
    camera_controller: CameraController,
    shut_down: bool,
}

impl<B: RenderBackend> Engine<B> {
    /// Registers and loads every asset, then spawns the room. Any load
    /// failure aborts startup.
    pub fn new(mut backend: B, storage: &dyn TitleStorage) -> Result<Self, EngineError> {
        let mut assets = AssetRegistry::new();
        let resources = SceneResources::register(&mut assets);
        assets.load(&mut backend, storage)?;

        let mut world = World::new();
        world.camera_mut().update_matrices(backend.aspect());

        let mut engine = Self {
            backend,
            world,
            assets,
            resources,
            scene: SceneController::new(),
            light_controller: LightController::new(),
            camera_controller: CameraController::new(),
            shut_down: false,
        };
        EntityFactory::new(&engine.resources).spawn_room(&mut engine.world)?;
        Ok(engine)
    }

    /// Scene control, then the light, then the camera, then transform
    /// propagation.
    pub fn update(&mut self, dt: f32, input: &Input) -> Result<PropagationStats, EngineError> {
        let factory = EntityFactory::new(&self.resources);
        self.scene.update(&mut self.world, &factory, input)?;
        self.light_controller
            .update(self.world.light_mut(), input, dt);
        let aspect = self.backend.aspect();
        self.camera_controller
            .update(self.world.camera_mut(), input, aspect);
        Ok(propagate_transforms(&mut self.world))
    }

    /// Renders the world as it stands after the last [`update`](Self::update).
    pub fn draw(&mut self) -> Result<FrameOutcome, EngineError> {
        let outcome = render_frame(
            &mut self.backend,
            &self.world,
            &self.assets,
            self.resources.point_wrap_sampler,
        )?;
        Ok(outcome)
    }

    /// Resizes the surface and offscreen targets and refits the projection.
    /// Zero-sized requests, as sent for minimised windows, are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.backend.resize(width, height);
        let aspect = self.backend.aspect();
        self.world.camera_mut().update_matrices(aspect);
    }

    /// Releases every GPU object and clears the world. Runs at most once.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        self.assets.destroy(&mut self.backend);
        self.world.teardown();
        log::info!("engine shut down");
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// The loaded asset registry.
    pub fn assets(&self) -> &AssetRegistry<B> {
        &self.assets
    }

    pub fn resources(&self) -> &SceneResources {
        &self.resources
    }

    /// The device the engine renders with.
    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: RenderBackend> Drop for Engine<B> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
