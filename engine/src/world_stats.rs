use std::sync::atomic::{AtomicU64, Ordering};

use crate::voxels::chunk::ChunkState;

/// Running totals of the meshing pipeline, shared between the main thread and the workers.
#[derive(Debug, Default)]
pub struct PipelineCounters {
    pub jobs_queued: AtomicU64,
    pub pushes_dropped: AtomicU64,
    pub meshes_built: AtomicU64,
    pub meshes_uploaded: AtomicU64,
    pub results_discarded: AtomicU64,
    pub vertex_bytes_uploaded: AtomicU64,
    /// Capacity of all worker scratch buffers. Only grows, buffers never shrink.
    pub scratch_bytes_reserved: AtomicU64,
}

impl PipelineCounters {
    pub fn increment(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(counter: &AtomicU64, amount: u64) {
        counter.fetch_add(amount, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PipelineSnapshot {
        PipelineSnapshot {
            jobs_queued: self.jobs_queued.load(Ordering::Relaxed),
            pushes_dropped: self.pushes_dropped.load(Ordering::Relaxed),
            meshes_built: self.meshes_built.load(Ordering::Relaxed),
            meshes_uploaded: self.meshes_uploaded.load(Ordering::Relaxed),
            results_discarded: self.results_discarded.load(Ordering::Relaxed),
            vertex_bytes_uploaded: self.vertex_bytes_uploaded.load(Ordering::Relaxed),
            scratch_bytes_reserved: self.scratch_bytes_reserved.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSnapshot {
    pub jobs_queued: u64,
    pub pushes_dropped: u64,
    pub meshes_built: u64,
    pub meshes_uploaded: u64,
    pub results_discarded: u64,
    pub vertex_bytes_uploaded: u64,
    pub scratch_bytes_reserved: u64,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ChunksByState([usize; ChunkState::TOTAL_STATES]);

impl ChunksByState {
    pub fn increment(&mut self, state: ChunkState) {
        self.0[state as usize] += 1;
    }

    pub fn get(&self, state: ChunkState) -> usize {
        self.0[state as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = (ChunkState, usize)> + '_ {
        ChunkState::all()
            .into_iter()
            .map(|state| (state, self.get(state)))
    }
}

#[derive(Debug, Default, Clone)]
pub struct WorldStatistics {
    pub total_loaded_chunks: usize,
    pub meshed_chunks: usize,
    pub approximate_memory_usage_bytes: usize,
    pub chunks_by_state: ChunksByState,
    pub pipeline: PipelineSnapshot,
}

impl WorldStatistics {
    pub fn new() -> Self {
        Self::default()
    }
}
