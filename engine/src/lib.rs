use std::{path::Path, sync::Arc};

use crate::{
    assets::MeshingResources,
    config::{
        config_manager::{Config, ConfigManager},
        engine_config::EngineConfig,
    },
    render::IChunkRenderContext,
    world::World,
};

pub mod assets;
pub mod config;
pub mod limits;
pub mod math;
pub mod mesher;
pub mod render;
pub mod voxels;
pub mod world;
pub mod world_stats;

pub struct EngineContext<R: IChunkRenderContext = ()> {
    pub config: ConfigManager<EngineConfig>,
    pub world: World<R>,
    pub resources: Arc<MeshingResources>,
}

pub fn init_engine<R: IChunkRenderContext>(render_context: R) -> anyhow::Result<EngineContext<R>> {
    let config = EngineConfig::create_manager()?;
    let resources = Arc::new(MeshingResources::load_or_default(Path::new("assets"))?);
    let world = World::new(&config.snapshot(), render_context, resources.clone())?;

    Ok(EngineContext {
        config,
        world,
        resources,
    })
}
