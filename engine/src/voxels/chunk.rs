use std::sync::{
    Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
    atomic::{AtomicBool, AtomicU8, Ordering},
};

use glam::IVec3;

use crate::{
    math::aabb::AABB,
    voxels::{block::Block, coord::ChunkPos, coord::LocalPos},
};

pub const CHUNK_WIDTH: usize = 16;
pub const CHUNK_HEIGHT: usize = 256;
pub const CHUNK_DEPTH: usize = 16;
pub const CHUNK_DIMENSIONS: IVec3 =
    IVec3::new(CHUNK_WIDTH as i32, CHUNK_HEIGHT as i32, CHUNK_DEPTH as i32);

pub const CHUNK_AREA: usize = CHUNK_WIDTH * CHUNK_DEPTH;
pub const CHUNK_VOLUME: usize = CHUNK_AREA * CHUNK_HEIGHT;

// Horizontal slabs tracked by the occupancy mask
pub const SLAB_HEIGHT: usize = 16;
pub const SLAB_COUNT: usize = CHUNK_HEIGHT / SLAB_HEIGHT;
pub const SLAB_VOLUME: usize = CHUNK_AREA * SLAB_HEIGHT;

const _: () = assert!(SLAB_COUNT <= u16::BITS as usize);

/// Decoded chunk data as delivered by the network session.
#[derive(Clone)]
pub struct ChunkPayload {
    /// `CHUNK_VOLUME` blocks in YZX order
    pub blocks: Vec<Block>,
    /// `CHUNK_AREA` biome ids in ZX order
    pub biomes: Vec<u8>,
}

impl ChunkPayload {
    pub fn filled(block: Block, biome: u8) -> Self {
        ChunkPayload {
            blocks: vec![block; CHUNK_VOLUME],
            biomes: vec![biome; CHUNK_AREA],
        }
    }

    pub fn empty() -> Self {
        Self::filled(Block::AIR, 0)
    }

    pub fn set_block(&mut self, pos: LocalPos, block: Block) {
        self.blocks[pos.to_chunk_data_index()] = block;
    }
}

pub struct ChunkData {
    blocks: Box<[Block]>,
    biomes: Box<[u8]>,
    // Bit N is set if slab N contains at least one non-air block
    occupancy: u16,
}

impl ChunkData {
    pub fn from_payload(payload: ChunkPayload) -> Self {
        let ChunkPayload { blocks, biomes } = payload;
        assert!(
            blocks.len() == CHUNK_VOLUME,
            "Chunk payload must have exactly {} blocks, got {}",
            CHUNK_VOLUME,
            blocks.len()
        );
        assert!(
            biomes.len() == CHUNK_AREA,
            "Chunk payload must have exactly {} biome ids, got {}",
            CHUNK_AREA,
            biomes.len()
        );

        let mut data = ChunkData {
            blocks: blocks.into_boxed_slice(),
            biomes: biomes.into_boxed_slice(),
            occupancy: 0,
        };
        for slab in 0..SLAB_COUNT {
            data.update_slab_occupancy(slab);
        }
        data
    }

    pub fn get_block(&self, pos: LocalPos) -> Block {
        self.blocks[pos.to_chunk_data_index()]
    }

    /// Returns false if the block already had this value.
    pub fn set_block(&mut self, pos: LocalPos, block: Block) -> bool {
        let index = pos.to_chunk_data_index();
        if self.blocks[index] == block {
            return false;
        }
        self.blocks[index] = block;

        let slab = pos.y() as usize / SLAB_HEIGHT;
        if block.is_air() {
            self.update_slab_occupancy(slab);
        } else {
            self.occupancy |= 1 << slab;
        }
        true
    }

    fn update_slab_occupancy(&mut self, slab: usize) {
        let start = slab * SLAB_VOLUME;
        let occupied = self.blocks[start..start + SLAB_VOLUME]
            .iter()
            .any(|block| !block.is_air());
        if occupied {
            self.occupancy |= 1 << slab;
        } else {
            self.occupancy &= !(1 << slab);
        }
    }

    pub fn biome_at(&self, pos: LocalPos) -> u8 {
        self.biomes[pos.column_index()]
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn biomes(&self) -> &[u8] {
        &self.biomes
    }

    pub fn occupancy(&self) -> u16 {
        self.occupancy
    }

    pub fn is_empty(&self) -> bool {
        self.occupancy == 0
    }

    pub fn approximate_size(&self) -> usize {
        std::mem::size_of::<Self>()
            + std::mem::size_of_val(&*self.blocks)
            + std::mem::size_of_val(&*self.biomes)
    }
}

/// Where a chunk is in the meshing pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ChunkState {
    /// Current mesh (if any) matches the block data
    Clean = 0,
    /// Needs a mesh, not owned by any job
    Dirty,
    /// A job for this chunk sits in the job queue
    Queued,
    /// A mesher worker is building the mesh
    Meshing,
    /// The mesh is built and waits for the main thread to upload it
    AwaitingUpload,
}

impl ChunkState {
    pub const TOTAL_STATES: usize = 5;

    pub const fn all() -> [ChunkState; Self::TOTAL_STATES] {
        [
            ChunkState::Clean,
            ChunkState::Dirty,
            ChunkState::Queued,
            ChunkState::Meshing,
            ChunkState::AwaitingUpload,
        ]
    }

    /// True while a job owns the chunk.
    pub const fn is_in_flight(self) -> bool {
        matches!(
            self,
            ChunkState::Queued | ChunkState::Meshing | ChunkState::AwaitingUpload
        )
    }

    fn from_u8(value: u8) -> ChunkState {
        match value {
            0 => ChunkState::Clean,
            1 => ChunkState::Dirty,
            2 => ChunkState::Queued,
            3 => ChunkState::Meshing,
            4 => ChunkState::AwaitingUpload,
            _ => unreachable!("Invalid chunk state {}", value),
        }
    }
}

#[derive(Debug)]
pub struct AtomicChunkState(AtomicU8);

impl AtomicChunkState {
    pub fn new(state: ChunkState) -> Self {
        AtomicChunkState(AtomicU8::new(state as u8))
    }

    pub fn load(&self) -> ChunkState {
        ChunkState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn store(&self, state: ChunkState) {
        self.0.store(state as u8, Ordering::Release);
    }

    pub fn transition(&self, from: ChunkState, to: ChunkState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

pub type ChunkHandle = Arc<Chunk>;

pub struct Chunk {
    pub position: ChunkPos,
    pub aabb: AABB,
    state: AtomicChunkState,
    // An edit landed while a job owned the chunk
    remesh_requested: AtomicBool,
    has_mesh: AtomicBool,
    data: RwLock<ChunkData>,
}

impl std::fmt::Debug for Chunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chunk")
            .field("position", &self.position)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Chunk {
    /// New chunks start out dirty so that they get their first mesh.
    pub fn new(position: ChunkPos, data: ChunkData) -> Self {
        Chunk {
            position,
            aabb: AABB::from_chunk_pos(position),
            state: AtomicChunkState::new(ChunkState::Dirty),
            remesh_requested: AtomicBool::new(false),
            has_mesh: AtomicBool::new(false),
            data: RwLock::new(data),
        }
    }

    pub fn from_payload(position: ChunkPos, payload: ChunkPayload) -> Self {
        Self::new(position, ChunkData::from_payload(payload))
    }

    // Readers tolerate a writer that panicked mid-edit: the worst case is a stale mesh
    pub fn read(&self) -> RwLockReadGuard<'_, ChunkData> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ChunkData> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get_block(&self, pos: LocalPos) -> Block {
        self.read().get_block(pos)
    }

    /// Returns false if the block already had this value. Does not touch the
    /// pipeline state, the world decides what to mark dirty.
    pub fn set_block(&self, pos: LocalPos, block: Block) -> bool {
        self.write().set_block(pos, block)
    }

    pub fn state(&self) -> ChunkState {
        self.state.load()
    }

    pub fn is_dirty(&self) -> bool {
        self.state() == ChunkState::Dirty || self.remesh_requested.load(Ordering::SeqCst)
    }

    /// True once a mesh has been uploaded and no job currently owns the chunk.
    pub fn is_meshed(&self) -> bool {
        self.has_mesh.load(Ordering::Acquire) && !self.state().is_in_flight()
    }

    pub fn mark_dirty(&self) {
        loop {
            match self.state() {
                ChunkState::Dirty => return,
                ChunkState::Clean => {
                    if self.state.transition(ChunkState::Clean, ChunkState::Dirty) {
                        return;
                    }
                }
                ChunkState::Queued | ChunkState::Meshing | ChunkState::AwaitingUpload => {
                    self.remesh_requested.store(true, Ordering::SeqCst);
                    return;
                }
            }
        }
    }

    /// Dirty -> Queued. Fails if the chunk is clean or already owned by a job.
    pub fn try_enqueue(&self) -> bool {
        self.state.transition(ChunkState::Dirty, ChunkState::Queued)
    }

    /// Queued -> Dirty, used when the job could not be pushed after all.
    pub fn cancel_enqueue(&self) {
        self.state.transition(ChunkState::Queued, ChunkState::Dirty);
    }

    /// Queued -> Meshing. The remesh request is cleared before the worker
    /// snapshots the blocks, so any edit after this point triggers another pass.
    pub fn begin_meshing(&self) -> bool {
        if !self.state.transition(ChunkState::Queued, ChunkState::Meshing) {
            return false;
        }
        self.remesh_requested.store(false, Ordering::SeqCst);
        true
    }

    pub fn finish_meshing(&self) {
        let ok = self
            .state
            .transition(ChunkState::Meshing, ChunkState::AwaitingUpload);
        debug_assert!(ok, "finish_meshing on chunk {:?} in state {:?}", self.position, self.state());
    }

    /// Meshing -> Dirty, when the pass could not complete.
    pub fn abort_meshing(&self) {
        self.state.transition(ChunkState::Meshing, ChunkState::Dirty);
    }

    /// AwaitingUpload -> Dirty, when a finished mesh is thrown away instead of uploaded.
    pub fn cancel_upload(&self) {
        if self
            .state
            .transition(ChunkState::AwaitingUpload, ChunkState::Dirty)
        {
            self.remesh_requested.store(false, Ordering::SeqCst);
        }
    }

    /// AwaitingUpload -> Clean, or -> Dirty if an edit arrived in the meantime.
    pub fn finish_upload(&self) {
        self.has_mesh.store(true, Ordering::Release);
        let next = if self.remesh_requested.swap(false, Ordering::SeqCst) {
            ChunkState::Dirty
        } else {
            ChunkState::Clean
        };
        let ok = self.state.transition(ChunkState::AwaitingUpload, next);
        debug_assert!(ok, "finish_upload on chunk {:?} in state {:?}", self.position, self.state());
    }

    pub fn approximate_size(&self) -> usize {
        std::mem::size_of::<Self>() + self.read().approximate_size()
    }
}
