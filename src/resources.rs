//! The asset set the room scene is built from.
//!
//! Every prop archetype owns one model and one diffuse texture. All props
//! share the mesh pipeline and the point/wrap sampler.

use crate::assets::{
    AssetRegistry, ModelId, ModelMetadata, PipelineId, PipelineMetadata, SamplerDescription,
    SamplerId, SamplerMetadata, ShaderId, ShaderMetadata, TextureId, TextureMetadata,
};
use crate::device::GraphicsDevice;

pub const MESH_SHADER_PATH: &str = "shaders/mesh.wgsl";

/// The kinds of object the room is furnished with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Prop {
    Cube,
    FlowerPot,
    FluffyRug,
    Sofa,
    Table,
    TableRound,
    Carpet,
    DarkWoodenFloorTile,
    PlasterWall,
    Painting,
    Cup,
}

impl Prop {
    pub const ALL: [Prop; 11] = [
        Prop::Cube,
        Prop::FlowerPot,
        Prop::FluffyRug,
        Prop::Sofa,
        Prop::Table,
        Prop::TableRound,
        Prop::Carpet,
        Prop::DarkWoodenFloorTile,
        Prop::PlasterWall,
        Prop::Painting,
        Prop::Cup,
    ];

    /// Tag given to entities of this archetype.
    pub fn tag(self) -> &'static str {
        match self {
            Prop::Cube => "Cube",
            Prop::FlowerPot => "FlowerPot",
            Prop::FluffyRug => "FluffyRug",
            Prop::Sofa => "Sofa",
            Prop::Table => "Table",
            Prop::TableRound => "TableRound",
            Prop::Carpet => "Carpet",
            Prop::DarkWoodenFloorTile => "DarkWoodenFloorTile",
            Prop::PlasterWall => "PlasterWall",
            Prop::Painting => "Painting",
            Prop::Cup => "Cup",
        }
    }

    pub fn default_scale(self) -> [f32; 3] {
        match self {
            Prop::Table => [1.5, 1.5, 1.5],
            Prop::TableRound => [2.0, 2.0, 1.5],
            Prop::Carpet => [2.0, 2.0, 1.0],
            Prop::Painting => [0.5, 0.5, 0.5],
            Prop::Cup => [1.35, 1.35, 1.0],
            _ => [1.0, 1.0, 1.0],
        }
    }

    fn model_path(self) -> &'static str {
        match self {
            Prop::Cube => "models/cube.obj",
            Prop::FlowerPot => "models/flower_pot.obj",
            Prop::FluffyRug => "models/fluffy_rug.obj",
            Prop::Sofa => "models/sofa.obj",
            Prop::Table => "models/table.obj",
            Prop::TableRound => "models/table_round.obj",
            Prop::Carpet => "models/carpet.obj",
            Prop::DarkWoodenFloorTile => "models/plane.obj",
            Prop::PlasterWall => "models/wall.obj",
            Prop::Painting => "models/painting.obj",
            Prop::Cup => "models/cup.obj",
        }
    }

    fn texture_path(self) -> &'static str {
        match self {
            Prop::Cube => "textures/crate.png",
            Prop::FlowerPot => "textures/flower_pot.png",
            Prop::FluffyRug => "textures/fluffy_rug.png",
            Prop::Sofa => "textures/sofa.png",
            Prop::Table => "textures/table.png",
            Prop::TableRound => "textures/table_round.png",
            Prop::Carpet => "textures/carpet.png",
            Prop::DarkWoodenFloorTile => "textures/dark_wooden_floor.png",
            Prop::PlasterWall => "textures/plaster_wall.png",
            Prop::Painting => "textures/painting.png",
            Prop::Cup => "textures/cup.png",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PropAssets {
    pub model: ModelId,
    pub texture: TextureId,
}

/// IDs of everything the scene uses, valid once the registry is loaded.
#[derive(Clone, Debug)]
pub struct SceneResources {
    pub mesh_vertex_shader: ShaderId,
    pub mesh_fragment_shader: ShaderId,
    pub default_mesh_pipeline: PipelineId,
    pub point_wrap_sampler: SamplerId,
    props: Vec<PropAssets>,
}

impl SceneResources {
    /// Declares the scene's assets. Textures come first, then the shader
    /// pair, the pipeline built from it, the sampler and finally the models.
    pub fn register<D: GraphicsDevice>(assets: &mut AssetRegistry<D>) -> Self {
        let textures: Vec<TextureId> = Prop::ALL
            .iter()
            .map(|prop| assets.register_texture(TextureMetadata::new(prop.texture_path())))
            .collect();

        let mesh_vertex_shader =
            assets.register_shader(ShaderMetadata::vertex(MESH_SHADER_PATH, "vs_main"));
        let mesh_fragment_shader =
            assets.register_shader(ShaderMetadata::fragment(MESH_SHADER_PATH, "fs_main"));
        let default_mesh_pipeline = assets.register_pipeline(PipelineMetadata::new(
            "mesh",
            mesh_vertex_shader,
            mesh_fragment_shader,
        ));
        let point_wrap_sampler = assets.register_sampler(SamplerMetadata::new(
            "point_wrap",
            SamplerDescription::POINT_WRAP,
        ));

        let props = Prop::ALL
            .iter()
            .zip(textures)
            .map(|(prop, texture)| PropAssets {
                model: assets.register_model(ModelMetadata::new(prop.tag(), prop.model_path())),
                texture,
            })
            .collect();

        log::debug!(
            "registered scene resources: {} textures, {} models",
            assets.texture_count(),
            assets.model_count()
        );

        Self {
            mesh_vertex_shader,
            mesh_fragment_shader,
            default_mesh_pipeline,
            point_wrap_sampler,
            props,
        }
    }

    pub fn prop(&self, prop: Prop) -> PropAssets {
        self.props[prop.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingDevice;

    #[test]
    fn every_prop_gets_its_own_model_and_texture() {
        let mut assets = AssetRegistry::<RecordingDevice>::new();
        let resources = SceneResources::register(&mut assets);

        assert_eq!(assets.texture_count(), Prop::ALL.len());
        assert_eq!(assets.model_count(), Prop::ALL.len());
        assert_eq!(assets.shader_count(), 2);
        assert_eq!(assets.pipeline_count(), 1);
        assert_eq!(assets.sampler_count(), 1);

        for (i, prop) in Prop::ALL.iter().enumerate() {
            let ids = resources.prop(*prop);
            assert_eq!(ids.model.index(), i as u32);
            assert_eq!(ids.texture.index(), i as u32);
        }
    }

    #[test]
    fn the_shader_file_is_listed_once() {
        let mut assets = AssetRegistry::<RecordingDevice>::new();
        SceneResources::register(&mut assets);

        let paths = assets.registered_paths();
        assert_eq!(paths.iter().filter(|p| **p == MESH_SHADER_PATH).count(), 1);
        assert_eq!(paths.len(), 2 * Prop::ALL.len() + 1);
    }

    #[test]
    fn prop_order_matches_enum_discriminants() {
        for (i, prop) in Prop::ALL.iter().enumerate() {
            assert_eq!(prop.index(), i);
        }
    }
}
