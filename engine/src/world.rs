use std::{collections::HashMap, sync::Arc};

use thiserror::Error;

use crate::{
    assets::MeshingResources,
    config::engine_config::EngineConfig,
    mesher::{
        TessellationError,
        job_queue::MeshJob,
        worker::{MesherPool, WorkerEvent},
    },
    render::{IChunkRenderContext, MeshUpload},
    voxels::{
        block::Block,
        chunk::{CHUNK_HEIGHT, Chunk, ChunkHandle, ChunkPayload},
        chunk_map::ChunkMap,
        coord::{ChunkPos, WorldPos},
        face::Face,
    },
    world_stats::{PipelineCounters, WorldStatistics},
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorldError {
    #[error("Chunk {0:?} is not loaded")]
    ChunkNotLoaded(ChunkPos),
}

/// A single block change from the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockUpdate {
    pub pos: WorldPos,
    pub block: Block,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PollSummary {
    pub uploaded: usize,
    /// Meshes of chunks that were unloaded or replaced while they were being built
    pub discarded: usize,
}

/// Owns the loaded chunks and drives the meshing pipeline from the main thread.
pub struct World<R: IChunkRenderContext = ()> {
    chunks: Arc<ChunkMap>,
    // Only touched by the main thread, workers never see meshes
    meshes: HashMap<ChunkPos, R::Mesh>,
    render_context: R,
    mesher_pool: MesherPool,
    counters: Arc<PipelineCounters>,
    last_statistics: WorldStatistics,
}

impl<R: IChunkRenderContext> World<R> {
    pub fn new(
        config: &EngineConfig,
        render_context: R,
        resources: Arc<MeshingResources>,
    ) -> anyhow::Result<Self> {
        let chunks = Arc::new(ChunkMap::new());
        let counters = Arc::new(PipelineCounters::default());
        let mesher_pool = MesherPool::start(config, chunks.clone(), resources, counters.clone())?;

        Ok(World {
            chunks,
            meshes: HashMap::new(),
            render_context,
            mesher_pool,
            counters,
            last_statistics: WorldStatistics::new(),
        })
    }

    pub fn chunks(&self) -> &Arc<ChunkMap> {
        &self.chunks
    }

    pub fn render_context(&self) -> &R {
        &self.render_context
    }

    pub fn mesh(&self, pos: ChunkPos) -> Option<&R::Mesh> {
        self.meshes.get(&pos)
    }

    /// Inserts a chunk received from the server, replacing any chunk already at `pos`.
    ///
    /// # Panics
    /// If the payload does not have exactly one chunk's worth of blocks and biomes.
    pub fn add_chunk(&mut self, pos: ChunkPos, payload: ChunkPayload) -> ChunkHandle {
        let chunk = Chunk::from_payload(pos, payload);

        // Replacing: the insertion below dirties the neighbours, the eviction doesn't
        if let Some(previous) = self.chunks.remove(pos) {
            log::debug!("Replacing chunk {:?}", previous.position);
            self.release_mesh(pos);
        }

        let (handle, _) = self.chunks.insert(pos, chunk);
        for neighbor in pos.neighbors() {
            self.mark_dirty(neighbor);
        }

        log::debug!("Loaded chunk {:?}", pos);
        handle
    }

    pub fn get_chunk(&self, pos: ChunkPos) -> Option<ChunkHandle> {
        self.chunks.get(pos)
    }

    pub fn remove_chunk(&mut self, pos: ChunkPos) -> Result<(), WorldError> {
        if !self.chunks.contains(pos) {
            return Err(WorldError::ChunkNotLoaded(pos));
        }

        self.release_mesh(pos);
        self.chunks.remove(pos);
        for neighbor in pos.neighbors() {
            self.mark_dirty(neighbor);
        }

        log::debug!("Unloaded chunk {:?}", pos);
        Ok(())
    }

    /// Evicts every chunk further than `distance` chunks from `center`. Returns the evicted positions.
    pub fn unload_chunks_outside_distance(
        &mut self,
        center: ChunkPos,
        distance: u32,
    ) -> Vec<ChunkPos> {
        let removed = self
            .chunks
            .drain_outside_distance(center, distance)
            .iter()
            .map(|chunk| chunk.position)
            .collect::<Vec<_>>();

        for pos in &removed {
            self.release_mesh(*pos);
        }
        for pos in &removed {
            for neighbor in pos.neighbors() {
                self.mark_dirty(neighbor);
            }
        }

        if !removed.is_empty() {
            log::debug!(
                "Unloaded {} chunks outside distance {} of {:?}",
                removed.len(),
                distance,
                center
            );
        }
        removed
    }

    /// # Panics
    /// If `pos` is outside the world height.
    pub fn get_block(&self, pos: WorldPos) -> Result<Block, WorldError> {
        assert_within_height(pos);
        let chunk_pos = pos.to_chunk_pos();
        let chunk = self
            .chunks
            .get(chunk_pos)
            .ok_or(WorldError::ChunkNotLoaded(chunk_pos))?;
        Ok(chunk.get_block(pos.to_local_pos()))
    }

    /// Like `get_block`, but anything that isn't loaded or is outside the world height reads as air.
    pub fn get_block_safe(&self, pos: WorldPos) -> Block {
        self.chunks.get_block_safe(pos)
    }

    /// Changes one block and dirties every chunk whose mesh can see the change:
    /// the owner, plus the neighbour across each chunk face the block touches.
    ///
    /// # Panics
    /// If `pos` is outside the world height.
    pub fn set_block(&self, pos: WorldPos, block: Block) -> Result<(), WorldError> {
        assert_within_height(pos);
        let chunk_pos = pos.to_chunk_pos();
        let chunk = self
            .chunks
            .get(chunk_pos)
            .ok_or(WorldError::ChunkNotLoaded(chunk_pos))?;

        let local_pos = pos.to_local_pos();
        if !chunk.set_block(local_pos, block) {
            return Ok(());
        }

        chunk.mark_dirty();
        // Top and bottom faces never border another chunk
        for face in local_pos
            .boundary_faces()
            .filter(|face| !matches!(face, Face::Top | Face::Bottom))
        {
            self.mark_dirty(chunk_pos.get_neighbor(face));
        }
        Ok(())
    }

    /// Entry point for server block updates. Updates to chunks we don't have are dropped.
    pub fn apply_update(&self, update: BlockUpdate) {
        if let Err(e) = self.set_block(update.pos, update.block) {
            log::warn!("Ignoring block update at {:?}: {}", update.pos, e);
        }
    }

    fn mark_dirty(&self, pos: ChunkPos) {
        if let Some(chunk) = self.chunks.get(pos) {
            chunk.mark_dirty();
        }
    }

    fn release_mesh(&mut self, pos: ChunkPos) {
        if let Some(mesh) = self.meshes.remove(&pos) {
            self.render_context.release_mesh(pos, mesh);
        }
    }

    /// Queues a mesh job for `chunk` if it is dirty and not already owned by a job.
    /// A full queue leaves the chunk dirty so it is retried on the next pass.
    pub fn check_chunk(&self, chunk: &ChunkHandle, pos: ChunkPos) -> bool {
        if !self.mesher_pool.is_running() || !chunk.try_enqueue() {
            return false;
        }

        let job = MeshJob {
            chunk: chunk.clone(),
            pos,
        };
        match self.mesher_pool.queue().push(job) {
            Ok(()) => {
                PipelineCounters::increment(&self.counters.jobs_queued);
                true
            }
            Err(full) => {
                full.job.chunk.cancel_enqueue();
                PipelineCounters::increment(&self.counters.pushes_dropped);
                log::trace!("Dropped mesh job for chunk {:?}: {}", pos, full);
                false
            }
        }
    }

    /// Queues every dirty chunk that fits in the job queue. Call once per frame.
    #[profiling::function]
    pub fn schedule_meshing(&self) -> usize {
        if !self.mesher_pool.is_running() {
            return 0;
        }

        let mut queued = 0;
        for chunk in self.chunks.handles() {
            if self.mesher_pool.queue().is_full() {
                break;
            }
            if self.check_chunk(&chunk, chunk.position) {
                queued += 1;
            }
        }
        queued
    }

    /// Uploads every mesh the workers have finished since the last call. Never blocks.
    /// A worker failure is reported once everything else in the channel has been handled.
    #[profiling::function]
    pub fn poll_results(&mut self) -> Result<PollSummary, TessellationError> {
        let mut summary = PollSummary::default();
        let mut failure = None;

        while let Some(event) = self.mesher_pool.try_recv_event() {
            let mut result = match event {
                WorkerEvent::Meshed(result) => result,
                // The rest of the results are still uploaded, only the first failure is reported
                WorkerEvent::Failed { worker, error } => {
                    failure.get_or_insert((worker, error));
                    continue;
                }
            };

            let is_current = self
                .chunks
                .get(result.pos)
                .is_some_and(|current| ChunkHandle::ptr_eq(&current, &result.chunk));

            if is_current {
                let upload = MeshUpload {
                    terrain: result.terrain(),
                    light: result.light(),
                    vertex_count: result.vertex_count(),
                };
                let mesh = self.render_context.upload_mesh(result.pos, upload);
                if let Some(previous) = self.meshes.insert(result.pos, mesh) {
                    self.render_context.release_mesh(result.pos, previous);
                }
                result.chunk.finish_upload();

                PipelineCounters::increment(&self.counters.meshes_uploaded);
                PipelineCounters::add(
                    &self.counters.vertex_bytes_uploaded,
                    result.vertex_bytes as u64,
                );
                summary.uploaded += 1;
            } else {
                log::warn!(
                    "Discarding mesh for chunk {:?}, it was unloaded or replaced while meshing",
                    result.pos
                );
                result.chunk.cancel_upload();
                PipelineCounters::increment(&self.counters.results_discarded);
                summary.discarded += 1;
            }

            // Strictly after the upload call returned
            result.buffer.release();
            self.mesher_pool.return_buffer(result.buffer);
        }

        match failure {
            Some((worker, source)) => Err(TessellationError::WorkerFailed {
                worker,
                summary,
                source,
            }),
            None => Ok(summary),
        }
    }

    pub fn update_statistics(&mut self) {
        let mut statistics = WorldStatistics::new();

        for chunk in self.chunks.handles() {
            statistics.total_loaded_chunks += 1;
            statistics.approximate_memory_usage_bytes += chunk.approximate_size();
            statistics.chunks_by_state.increment(chunk.state());
            if chunk.is_meshed() {
                statistics.meshed_chunks += 1;
            }
        }
        statistics.pipeline = self.counters.snapshot();

        self.last_statistics = statistics;
    }

    pub fn statistics(&self) -> &WorldStatistics {
        &self.last_statistics
    }

    /// Stops the mesher workers. Meshes already uploaded stay valid until the world is dropped.
    pub fn shutdown(&mut self) {
        self.mesher_pool.shutdown();
    }
}

fn assert_within_height(pos: WorldPos) {
    assert!(
        pos.is_within_height(),
        "Block position {:?} is outside the world height 0..{}",
        pos,
        CHUNK_HEIGHT
    );
}

impl<R: IChunkRenderContext> Drop for World<R> {
    fn drop(&mut self) {
        self.mesher_pool.shutdown();
        for (pos, mesh) in self.meshes.drain() {
            self.render_context.release_mesh(pos, mesh);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::{
        mesher::MeshError,
        voxels::{
            chunk::{CHUNK_AREA, CHUNK_VOLUME, ChunkState},
            coord::LocalPos,
        },
    };

    #[derive(Default)]
    struct RecordingRenderer {
        next_id: u32,
        uploads: Vec<(ChunkPos, u32)>,
        released: Vec<u32>,
    }

    impl IChunkRenderContext for RecordingRenderer {
        type Mesh = u32;

        fn upload_mesh(&mut self, pos: ChunkPos, upload: MeshUpload<'_>) -> u32 {
            assert_eq!(upload.light.len(), upload.vertex_count as usize);
            self.next_id += 1;
            self.uploads.push((pos, upload.vertex_count));
            self.next_id
        }

        fn release_mesh(&mut self, _pos: ChunkPos, mesh: u32) {
            self.released.push(mesh);
        }
    }

    fn test_world() -> World<RecordingRenderer> {
        let config = EngineConfig {
            mesher_workers: 2,
            job_queue_capacity: 64,
            initial_terrain_capacity: 4096,
            initial_light_capacity: 256,
            idle_wait_ms: 1,
            scratch_limit_bytes: None,
        };
        World::new(
            &config,
            RecordingRenderer::default(),
            Arc::new(MeshingResources::vanilla()),
        )
        .unwrap()
    }

    fn ground() -> ChunkPayload {
        // YZX order: whole layers are contiguous
        let mut blocks = vec![Block::AIR; CHUNK_VOLUME];
        blocks[..4 * CHUNK_AREA].fill(Block::STONE);
        blocks[4 * CHUNK_AREA..5 * CHUNK_AREA].fill(Block::GRASS);
        ChunkPayload {
            blocks,
            biomes: vec![1; CHUNK_AREA],
        }
    }

    /// Runs the pipeline until no chunk needs a mesh.
    fn settle(world: &mut World<RecordingRenderer>) -> PollSummary {
        let deadline = Instant::now() + Duration::from_secs(20);
        let mut total = PollSummary::default();
        loop {
            world.schedule_meshing();
            let summary = world.poll_results().unwrap();
            total.uploaded += summary.uploaded;
            total.discarded += summary.discarded;

            let done = world
                .chunks()
                .handles()
                .iter()
                .all(|chunk| chunk.state() == ChunkState::Clean);
            if done {
                return total;
            }
            assert!(Instant::now() < deadline, "pipeline did not settle");
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    fn dirty_chunks(world: &World<RecordingRenderer>) -> Vec<ChunkPos> {
        let mut dirty = world
            .chunks()
            .handles()
            .iter()
            .filter(|chunk| chunk.is_dirty())
            .map(|chunk| chunk.position)
            .collect::<Vec<_>>();
        dirty.sort_by_key(|pos| (pos.x(), pos.y(), pos.z()));
        dirty
    }

    fn load_grid(world: &mut World<RecordingRenderer>, radius: i32) {
        for x in -radius..=radius {
            for z in -radius..=radius {
                world.add_chunk(ChunkPos::new(x, 0, z), ground());
            }
        }
    }

    #[test]
    fn test_get_chunk_returns_added_handle() {
        let mut world = test_world();
        let pos = ChunkPos::new(3, 0, -2);
        let handle = world.add_chunk(pos, ground());
        let fetched = world.get_chunk(pos).unwrap();
        assert!(ChunkHandle::ptr_eq(&handle, &fetched));
        assert_eq!(fetched.aabb.min, glam::Vec3::new(48.0, 0.0, -32.0));
        assert!(world.get_chunk(ChunkPos::new(0, 0, 0)).is_none());
    }

    #[test]
    fn test_block_round_trip_with_negative_coordinates() {
        let mut world = test_world();
        world.add_chunk(ChunkPos::new(-1, 0, -1), ChunkPayload::empty());

        let pos = WorldPos::new(-1, 70, -16);
        world.set_block(pos, Block::LOG).unwrap();
        assert_eq!(world.get_block(pos), Ok(Block::LOG));
        assert_eq!(world.get_block_safe(pos), Block::LOG);
        assert_eq!(
            world.get_chunk(ChunkPos::new(-1, 0, -1)).unwrap().get_block(LocalPos::new(15, 70, 0)),
            Block::LOG
        );

        let missing = WorldPos::new(0, 70, 0);
        assert_eq!(
            world.get_block(missing),
            Err(WorldError::ChunkNotLoaded(ChunkPos::new(0, 0, 0)))
        );
        assert_eq!(
            world.set_block(missing, Block::STONE),
            Err(WorldError::ChunkNotLoaded(ChunkPos::new(0, 0, 0)))
        );
        assert_eq!(world.get_block_safe(missing), Block::AIR);
    }

    #[test]
    fn test_setting_same_block_dirties_nothing() {
        let mut world = test_world();
        load_grid(&mut world, 1);
        settle(&mut world);

        world.set_block(WorldPos::new(0, 4, 0), Block::GRASS).unwrap();
        world.set_block(WorldPos::new(15, 100, 15), Block::AIR).unwrap();
        assert!(dirty_chunks(&world).is_empty());
    }

    #[test]
    fn test_edit_dirties_only_touching_neighbors() {
        let mut world = test_world();
        load_grid(&mut world, 1);
        settle(&mut world);

        // Interior
        world.set_block(WorldPos::new(7, 2, 7), Block::AIR).unwrap();
        assert_eq!(dirty_chunks(&world), vec![ChunkPos::new(0, 0, 0)]);
        settle(&mut world);

        // +X face
        world.set_block(WorldPos::new(15, 2, 7), Block::AIR).unwrap();
        assert_eq!(
            dirty_chunks(&world),
            vec![ChunkPos::new(0, 0, 0), ChunkPos::new(1, 0, 0)]
        );
        settle(&mut world);

        // -X/-Z corner
        world.set_block(WorldPos::new(0, 2, 0), Block::AIR).unwrap();
        assert_eq!(
            dirty_chunks(&world),
            vec![
                ChunkPos::new(-1, 0, 0),
                ChunkPos::new(0, 0, -1),
                ChunkPos::new(0, 0, 0)
            ]
        );
    }

    #[test]
    fn test_edit_on_shared_face_dirties_east_neighbor() {
        let mut world = test_world();
        world.add_chunk(ChunkPos::new(0, 0, 0), ground());
        world.add_chunk(ChunkPos::new(1, 0, 0), ground());
        settle(&mut world);

        let east = world.get_chunk(ChunkPos::new(1, 0, 0)).unwrap();
        assert!(!east.is_dirty());
        world.set_block(WorldPos::new(15, 20, 3), Block::STONE).unwrap();
        assert!(east.is_dirty());
        assert!(world.get_chunk(ChunkPos::new(0, 0, 0)).unwrap().is_dirty());
    }

    #[test]
    fn test_pipeline_uploads_every_chunk() {
        let mut world = test_world();
        load_grid(&mut world, 1);
        let summary = settle(&mut world);

        assert_eq!(summary.uploaded, world.render_context().uploads.len());
        assert!(summary.uploaded >= 9);
        for chunk in world.chunks().handles() {
            assert!(chunk.is_meshed());
            assert!(world.mesh(chunk.position).is_some());
        }

        // The center chunk only exposes its grass top and, with nothing loaded below, its bottom
        let center_vertices = world
            .render_context()
            .uploads
            .iter()
            .rev()
            .find(|(pos, _)| *pos == ChunkPos::new(0, 0, 0))
            .map(|(_, count)| *count)
            .unwrap();
        assert_eq!(center_vertices as usize, CHUNK_AREA * 2 * 6);

        world.update_statistics();
        let statistics = world.statistics();
        assert_eq!(statistics.total_loaded_chunks, 9);
        assert_eq!(statistics.meshed_chunks, 9);
        assert_eq!(statistics.chunks_by_state.get(ChunkState::Clean), 9);
        assert_eq!(
            statistics.pipeline.meshes_uploaded,
            summary.uploaded as u64
        );
    }

    #[test]
    fn test_remesh_replaces_previous_mesh() {
        let mut world = test_world();
        world.add_chunk(ChunkPos::new(0, 0, 0), ground());
        settle(&mut world);
        let first = *world.mesh(ChunkPos::new(0, 0, 0)).unwrap();

        world.set_block(WorldPos::new(3, 5, 3), Block::LOG).unwrap();
        settle(&mut world);

        let second = *world.mesh(ChunkPos::new(0, 0, 0)).unwrap();
        assert_ne!(first, second);
        assert_eq!(world.render_context().released, vec![first]);
    }

    #[test]
    fn test_remove_chunk() {
        let mut world = test_world();
        load_grid(&mut world, 1);
        settle(&mut world);
        let mesh = *world.mesh(ChunkPos::new(1, 0, 0)).unwrap();

        assert_eq!(
            world.remove_chunk(ChunkPos::new(5, 0, 5)),
            Err(WorldError::ChunkNotLoaded(ChunkPos::new(5, 0, 5)))
        );

        world.remove_chunk(ChunkPos::new(1, 0, 0)).unwrap();
        assert!(world.get_chunk(ChunkPos::new(1, 0, 0)).is_none());
        assert!(world.render_context().released.contains(&mesh));
        assert_eq!(
            dirty_chunks(&world),
            vec![
                ChunkPos::new(0, 0, 0),
                ChunkPos::new(1, 0, -1),
                ChunkPos::new(1, 0, 1)
            ]
        );
    }

    #[test]
    fn test_replacing_chunk_releases_mesh_and_discards_stale_result() {
        let mut world = test_world();
        let pos = ChunkPos::new(0, 0, 0);
        world.add_chunk(pos, ground());
        settle(&mut world);
        let first_mesh = *world.mesh(pos).unwrap();

        // Queue a job for the old chunk, then replace it before the result is polled
        world.set_block(WorldPos::new(1, 2, 1), Block::AIR).unwrap();
        assert_eq!(world.schedule_meshing(), 1);
        let old = world.get_chunk(pos).unwrap();
        let new = world.add_chunk(pos, ChunkPayload::filled(Block::DIRT, 2));
        assert!(!ChunkHandle::ptr_eq(&old, &new));
        assert!(world.render_context().released.contains(&first_mesh));
        assert!(world.mesh(pos).is_none());

        settle(&mut world);
        let deadline = Instant::now() + Duration::from_secs(10);
        while world.counters.snapshot().results_discarded == 0 {
            world.poll_results().unwrap();
            assert!(Instant::now() < deadline, "stale result never arrived");
            std::thread::sleep(Duration::from_millis(1));
        }
        assert!(world.mesh(pos).is_some());
        assert_eq!(world.get_block(WorldPos::new(1, 10, 1)), Ok(Block::DIRT));
    }

    #[test]
    fn test_unload_outside_distance() {
        let mut world = test_world();
        load_grid(&mut world, 2);
        settle(&mut world);
        let released_before = world.render_context().released.len();

        let mut removed = world.unload_chunks_outside_distance(ChunkPos::new(0, 0, 0), 1);
        removed.sort_by_key(|pos| (pos.x(), pos.z()));
        assert_eq!(removed.len(), 16);
        assert_eq!(world.chunks().len(), 9);
        assert_eq!(world.render_context().released.len() - released_before, 16);
        // The ring that lost its outer neighbours has to rebuild its border faces
        assert_eq!(dirty_chunks(&world).len(), 8);
    }

    #[test]
    fn test_update_for_missing_chunk_is_ignored() {
        let world = test_world();
        world.apply_update(BlockUpdate {
            pos: WorldPos::new(100, 64, 100),
            block: Block::STONE,
        });
        assert_eq!(world.chunks().len(), 0);
    }

    #[test]
    #[should_panic(expected = "outside the world height")]
    fn test_set_block_above_world_height_panics() {
        let mut world = test_world();
        world.add_chunk(ChunkPos::new(0, 0, 0), ground());
        world.add_chunk(ChunkPos::new(0, 1, 0), ground());
        let _ = world.set_block(WorldPos::new(1, 300, 1), Block::STONE);
    }

    #[test]
    #[should_panic(expected = "outside the world height")]
    fn test_get_block_below_world_height_panics() {
        let mut world = test_world();
        world.add_chunk(ChunkPos::new(0, 0, 0), ground());
        let _ = world.get_block(WorldPos::new(1, -5, 1));
    }

    #[test]
    fn test_safe_lookup_outside_world_height_is_air() {
        let mut world = test_world();
        world.add_chunk(ChunkPos::new(0, 1, 0), ChunkPayload::filled(Block::STONE, 1));
        assert_eq!(world.get_block_safe(WorldPos::new(1, 300, 1)), Block::AIR);
        assert_eq!(world.get_block_safe(WorldPos::new(1, -5, 1)), Block::AIR);
    }

    #[test]
    fn test_edit_on_top_layer_dirties_only_owner() {
        let mut world = test_world();
        load_grid(&mut world, 1);
        world.add_chunk(ChunkPos::new(0, 1, 0), ChunkPayload::empty());
        settle(&mut world);

        world.set_block(WorldPos::new(7, 255, 7), Block::STONE).unwrap();
        assert_eq!(dirty_chunks(&world), vec![ChunkPos::new(0, 0, 0)]);
    }

    #[test]
    fn test_worker_failure_is_reported_after_other_results() {
        let config = EngineConfig {
            mesher_workers: 2,
            job_queue_capacity: 8,
            initial_terrain_capacity: 0,
            initial_light_capacity: 0,
            idle_wait_ms: 1,
            // Fits one isolated block, not a whole layer of grass
            scratch_limit_bytes: Some(4096),
        };
        let mut world = World::new(
            &config,
            RecordingRenderer::default(),
            Arc::new(MeshingResources::vanilla()),
        )
        .unwrap();

        let small_pos = ChunkPos::new(0, 0, 0);
        let mut small_payload = ChunkPayload::empty();
        small_payload.set_block(LocalPos::new(4, 4, 4), Block::STONE);
        let small = world.add_chunk(small_pos, small_payload);
        let large = world.add_chunk(ChunkPos::new(5, 0, 5), ground());
        assert_eq!(world.schedule_meshing(), 2);

        let deadline = Instant::now() + Duration::from_secs(10);
        while small.state() != ChunkState::AwaitingUpload || large.state() != ChunkState::Dirty {
            assert!(Instant::now() < deadline, "workers never finished");
            std::thread::sleep(Duration::from_millis(1));
        }
        // The failed worker marks the chunk before it reports the error
        std::thread::sleep(Duration::from_millis(50));

        let error = world.poll_results().unwrap_err();
        assert!(matches!(
            error,
            TessellationError::WorkerFailed {
                summary: PollSummary {
                    uploaded: 1,
                    discarded: 0
                },
                source: MeshError::LimitExceeded { limit: 4096, .. },
                ..
            }
        ));
        assert_eq!(small.state(), ChunkState::Clean);
        assert!(world.mesh(small_pos).is_some());
        assert_eq!(large.state(), ChunkState::Dirty);
        assert!(large.is_dirty());
    }

    #[test]
    fn test_full_queue_leaves_chunks_dirty() {
        let config = EngineConfig {
            mesher_workers: 1,
            job_queue_capacity: 2,
            initial_terrain_capacity: 0,
            initial_light_capacity: 0,
            idle_wait_ms: 1,
            scratch_limit_bytes: None,
        };
        let world = {
            let mut world =
                World::new(&config, (), Arc::new(MeshingResources::vanilla())).unwrap();
            for x in 0..6 {
                world.add_chunk(ChunkPos::new(x, 0, 0), ground());
            }
            world
        };

        // Never polling: the only worker parks with its first result, then the queue fills up
        let count = |state| {
            world
                .chunks()
                .handles()
                .iter()
                .filter(|chunk| chunk.state() == state)
                .count()
        };
        let deadline = Instant::now() + Duration::from_secs(10);
        while count(ChunkState::AwaitingUpload) != 1 || !world.mesher_pool.queue().is_full() {
            world.schedule_meshing();
            assert!(Instant::now() < deadline, "queue never filled up");
            std::thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(count(ChunkState::Queued), 2);
        assert_eq!(count(ChunkState::Dirty), 3);

        let chunk = world
            .chunks()
            .handles()
            .into_iter()
            .find(|chunk| chunk.state() == ChunkState::Dirty)
            .unwrap();
        assert!(!world.check_chunk(&chunk, chunk.position));
        assert_eq!(chunk.state(), ChunkState::Dirty);
        assert_eq!(world.counters.snapshot().pushes_dropped, 1);
    }

    #[test]
    fn test_shutdown_under_edit_stress() {
        let mut world = test_world();
        load_grid(&mut world, 2);

        let mut rng_state = 12345u32;
        for _ in 0..50 {
            for _ in 0..20 {
                rng_state = rng_state.wrapping_mul(1664525).wrapping_add(1013904223);
                let x = (rng_state >> 8) as i32 % 80 - 40;
                let z = (rng_state >> 16) as i32 % 80 - 40;
                let y = (rng_state >> 24) as i32 % 8;
                let block = if rng_state & 1 == 0 { Block::AIR } else { Block::STONE };
                world.apply_update(BlockUpdate {
                    pos: WorldPos::new(x, y, z),
                    block,
                });
            }
            world.schedule_meshing();
            world.poll_results().unwrap();
        }

        world.shutdown();
        let uploads = world.render_context().uploads.len();

        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(world.schedule_meshing(), 0);
        assert_eq!(world.poll_results().unwrap(), PollSummary::default());
        assert_eq!(world.render_context().uploads.len(), uploads);
        for chunk in world.chunks().handles() {
            assert!(!chunk.state().is_in_flight());
        }
    }
}
