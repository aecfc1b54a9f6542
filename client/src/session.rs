use std::time::{Duration, Instant};

use bytesize::ByteSize;
use engine::{
    EngineContext,
    config::config_manager::ConfigManager,
    voxels::{
        block::{Block, block_types},
        chunk::{CHUNK_DEPTH, CHUNK_HEIGHT, CHUNK_WIDTH, ChunkState},
        coord::{ChunkPos, WorldPos},
    },
    world::BlockUpdate,
};

use crate::{
    config::ClientConfig, fps_counter::FpsCounter, headless_renderer::HeadlessRenderer,
    terrain::TerrainGenerator,
};

const STATISTICS_INTERVAL: u32 = 60;
const SETTLE_TIMEOUT: Duration = Duration::from_secs(10);

const PLACEABLE: [Block; 4] = [Block::GLASS, Block::LOG, Block::LEAVES, Block::STONE];

/// Drives the world the way a connected client would: chunks arrive, blocks change,
/// and meshes are scheduled and uploaded once per frame.
pub struct Session {
    engine_context: EngineContext<HeadlessRenderer>,
    client_config: ConfigManager<ClientConfig>,
    generator: TerrainGenerator,
    fps_counter: FpsCounter,
    rng: fastrand::Rng,
}

impl Session {
    pub fn new(
        engine_context: EngineContext<HeadlessRenderer>,
        client_config: ConfigManager<ClientConfig>,
    ) -> Self {
        let seed = client_config.snapshot().seed;
        Session {
            engine_context,
            client_config,
            generator: TerrainGenerator::new(seed),
            fps_counter: FpsCounter::new(),
            rng: fastrand::Rng::with_seed(seed as u64),
        }
    }

    pub fn run(&mut self) -> anyhow::Result<()> {
        let config = self.client_config.snapshot();
        self.load_area(config.world_radius);

        let frame_duration = Duration::from_millis(config.frame_ms);
        for frame in 0..config.frames {
            let frame_start = Instant::now();

            self.update(&config)?;
            self.fps_counter.tick();

            if frame % STATISTICS_INTERVAL == 0 {
                self.log_statistics();
            }

            if let Some(remaining) = frame_duration.checked_sub(frame_start.elapsed()) {
                std::thread::sleep(remaining);
            }
            profiling::finish_frame!();
        }

        self.settle()?;
        self.log_statistics();

        // Shrink the loaded area by one ring, like a player walking away would
        let distance = config.world_radius.max(1) as u32 - 1;
        let removed = self
            .engine_context
            .world
            .unload_chunks_outside_distance(ChunkPos::new(0, 0, 0), distance);
        log::info!("Unloaded {} chunks", removed.len());
        self.settle()?;
        self.log_statistics();

        Ok(())
    }

    pub fn shutdown(&mut self) {
        self.engine_context.world.shutdown();
        log::info!("Frame times: {}", self.fps_counter.summary());
    }

    fn load_area(&mut self, radius: i32) {
        let started = Instant::now();
        let chunks = self.generator.generate_area(radius);
        let count = chunks.len();

        for (pos, payload) in chunks {
            self.engine_context.world.add_chunk(pos, payload);
        }

        log::info!(
            "Generated {} chunks in {:.2} s",
            count,
            started.elapsed().as_secs_f64()
        );
    }

    #[profiling::function]
    fn update(&mut self, config: &ClientConfig) -> anyhow::Result<()> {
        for _ in 0..config.edits_per_frame {
            if let Some(update) = self.random_edit(config.world_radius) {
                self.engine_context.world.apply_update(update);
            }
        }

        let world = &mut self.engine_context.world;
        world.schedule_meshing();
        world.poll_results()?;
        Ok(())
    }

    /// Digs out the topmost block of a random column, or builds on top of it.
    fn random_edit(&mut self, radius: i32) -> Option<BlockUpdate> {
        let min_x = -radius * CHUNK_WIDTH as i32;
        let max_x = (radius + 1) * CHUNK_WIDTH as i32;
        let min_z = -radius * CHUNK_DEPTH as i32;
        let max_z = (radius + 1) * CHUNK_DEPTH as i32;
        let x = self.rng.i32(min_x..max_x);
        let z = self.rng.i32(min_z..max_z);

        let world = &self.engine_context.world;
        let top = (0..CHUNK_HEIGHT as i32)
            .rev()
            .map(|y| WorldPos::new(x, y, z))
            .find(|pos| !world.get_block_safe(*pos).is_air())?;

        let update = if self.rng.bool() {
            BlockUpdate {
                pos: top,
                block: Block::AIR,
            }
        } else if top.0.y + 1 < CHUNK_HEIGHT as i32 {
            let mut block = PLACEABLE[self.rng.usize(..PLACEABLE.len())];
            if block.block_type() == block_types::LOG {
                // Upright, east-west or north-south
                block = Block::from_type_metadata(block_types::LOG, 4 * self.rng.u8(0..3));
            }
            BlockUpdate {
                pos: WorldPos::new(x, top.0.y + 1, z),
                block,
            }
        } else {
            return None;
        };
        Some(update)
    }

    /// Keeps pumping the pipeline until every chunk has a current mesh.
    fn settle(&mut self) -> anyhow::Result<()> {
        let started = Instant::now();
        let world = &mut self.engine_context.world;

        loop {
            world.schedule_meshing();
            world.poll_results()?;
            world.update_statistics();

            let statistics = world.statistics();
            if statistics.chunks_by_state.get(ChunkState::Clean) == statistics.total_loaded_chunks {
                return Ok(());
            }
            if started.elapsed() > SETTLE_TIMEOUT {
                log::warn!("Gave up waiting for the mesher after {:?}", SETTLE_TIMEOUT);
                return Ok(());
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    fn log_statistics(&mut self) {
        let world = &mut self.engine_context.world;
        world.update_statistics();
        let statistics = world.statistics();
        let renderer = world.render_context();

        log::info!(
            "{} chunks loaded ({} meshed, {}), {} resident in {} meshes, {}",
            statistics.total_loaded_chunks,
            statistics.meshed_chunks,
            ByteSize(statistics.approximate_memory_usage_bytes as u64),
            ByteSize(renderer.resident_bytes as u64),
            renderer.resident_meshes,
            self.fps_counter.summary()
        );

        let states = statistics
            .chunks_by_state
            .iter()
            .map(|(state, count)| format!("{:?}: {}", state, count))
            .collect::<Vec<_>>()
            .join(", ");
        log::debug!("Chunk states: {}", states);

        let pipeline = statistics.pipeline;
        log::debug!(
            "Pipeline: {} queued, {} dropped, {} built, {} uploaded, {} discarded, {} vertex data, {} scratch",
            pipeline.jobs_queued,
            pipeline.pushes_dropped,
            pipeline.meshes_built,
            pipeline.meshes_uploaded,
            pipeline.results_discarded,
            ByteSize(pipeline.vertex_bytes_uploaded),
            ByteSize(pipeline.scratch_bytes_reserved)
        );
    }
}
