//! Records one frame: every renderable entity becomes one indexed draw into
//! the offscreen target, which is then blitted to the surface.

use crate::assets::{AssetRegistry, SamplerId};
use crate::components::{GlobalTransform, Material, MeshRef};
use crate::device::{ClearValues, DrawIndexed, DrawUniforms, RenderBackend};
use crate::error::AssetError;
use crate::world::World;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    /// No surface image was available; nothing was recorded.
    Skipped,
    Presented { draws: usize },
}

/// Draws every entity carrying a [`GlobalTransform`], [`MeshRef`] and
/// [`Material`], all sampled through `sampler`.
///
/// Every mesh and material is resolved before the pass opens. An ID the
/// registry has not loaded fails the frame before anything is recorded.
pub fn render_frame<B: RenderBackend>(
    backend: &mut B,
    world: &World,
    assets: &AssetRegistry<B>,
    sampler: SamplerId,
) -> Result<FrameOutcome, AssetError> {
    let camera = world.camera();
    let view_projection = camera.view_projection();
    let light = world.light();
    let sampler = assets.sampler(sampler)?;

    let mut query = world.query::<(&GlobalTransform, &MeshRef, &Material)>();
    let draws = query
        .iter()
        .map(|(_, (global, mesh, material))| -> Result<DrawIndexed<'_, B>, AssetError> {
            let model = assets.model(mesh.0)?;
            Ok(DrawIndexed {
                uniforms: DrawUniforms::new(view_projection, global.0, light, camera.position),
                vertex_buffer: &model.vertex_buffer,
                index_buffer: &model.index_buffer,
                index_count: model.index_count,
                pipeline: assets.pipeline(material.pipeline)?,
                texture: assets.texture(material.texture)?,
                sampler,
            })
        })
        .collect::<Result<Vec<_>, AssetError>>()?;

    if !backend.acquire_frame() {
        log::trace!("no surface image, skipping frame");
        return Ok(FrameOutcome::Skipped);
    }

    let count = draws.len();
    backend.begin_pass(ClearValues::TRANSPARENT_FAR);
    for draw in draws {
        backend.draw_indexed(draw);
    }
    backend.end_pass();
    backend.blit_to_surface();
    backend.submit();

    Ok(FrameOutcome::Presented { draws: count })
}
