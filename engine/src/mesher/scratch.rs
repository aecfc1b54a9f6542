use crate::{
    mesher::{MeshError, vertex::{TerrainVertex, VERTICES_PER_FACE}},
    voxels::chunk::SLAB_VOLUME,
};

// Worst case for a single slab: every block shows all 6 faces
const WORST_CASE_SLAB_VERTICES: usize = SLAB_VOLUME * 6 * VERTICES_PER_FACE;

pub const fn estimate_terrain_capacity() -> usize {
    WORST_CASE_SLAB_VERTICES * TerrainVertex::SIZE
}

pub const fn estimate_light_capacity() -> usize {
    WORST_CASE_SLAB_VERTICES
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BufferState {
    #[default]
    Available,
    /// A worker is writing a mesh into the buffer
    Busy,
    /// The mesh is done and travels to the main thread for upload
    ResultPending,
}

/// A growable byte region. Grows geometrically and reports allocation failure
/// instead of aborting.
pub struct ScratchRegion {
    name: &'static str,
    data: Vec<u8>,
    // Writes past this many bytes fail
    limit: Option<usize>,
}

impl ScratchRegion {
    pub fn with_capacity(name: &'static str, capacity: usize) -> Self {
        ScratchRegion {
            name,
            data: Vec::with_capacity(capacity),
            limit: None,
        }
    }

    pub fn set_limit(&mut self, limit: Option<usize>) {
        self.limit = limit;
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn reserve(&mut self, additional: usize) -> Result<(), MeshError> {
        let required = self.data.len().saturating_add(additional);
        if let Some(limit) = self.limit
            && required > limit
        {
            return Err(MeshError::LimitExceeded {
                region: self.name,
                requested: required,
                limit,
            });
        }

        if required <= self.data.capacity() {
            return Ok(());
        }

        let mut target = required.max(self.data.capacity() * 2);
        if let Some(limit) = self.limit {
            target = target.min(limit);
        }
        self.data
            .try_reserve_exact(target - self.data.len())
            .map_err(|source| MeshError::Allocation {
                region: self.name,
                requested: target,
                source,
            })?;

        log::debug!(
            "Grew {} scratch region to {} bytes",
            self.name,
            self.data.capacity()
        );
        Ok(())
    }

    pub fn extend_from_slice(&mut self, bytes: &[u8]) -> Result<(), MeshError> {
        self.reserve(bytes.len())?;
        self.data.extend_from_slice(bytes);
        Ok(())
    }
}

/// Per-worker memory for assembling one mesh at a time.
///
/// Exactly one party holds a buffer at any time: its worker while it is
/// `Available` or `Busy`, the main thread while it is `ResultPending`.
/// Ownership moves with the value, so the regions need no locking.
pub struct ScratchBuffer {
    worker: usize,
    state: BufferState,
    pub terrain: ScratchRegion,
    pub light: ScratchRegion,
}

impl ScratchBuffer {
    pub fn new(worker: usize, terrain_capacity: usize, light_capacity: usize) -> Self {
        ScratchBuffer {
            worker,
            state: BufferState::Available,
            terrain: ScratchRegion::with_capacity("terrain", terrain_capacity),
            light: ScratchRegion::with_capacity("light", light_capacity),
        }
    }

    /// Caps how many bytes each region may hold. `None` leaves it bounded only by the allocator.
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.terrain.set_limit(limit);
        self.light.set_limit(limit);
        self
    }

    pub fn worker(&self) -> usize {
        self.worker
    }

    pub fn state(&self) -> BufferState {
        self.state
    }

    /// Available -> Busy. Clears both regions for the next mesh.
    pub fn claim(&mut self) {
        debug_assert_eq!(self.state, BufferState::Available, "claim on a buffer in use");
        self.state = BufferState::Busy;
        self.terrain.clear();
        self.light.clear();
    }

    /// Busy -> ResultPending.
    pub fn publish(&mut self) {
        debug_assert_eq!(self.state, BufferState::Busy, "publish on a buffer that is not being written");
        self.state = BufferState::ResultPending;
    }

    /// ResultPending -> Available. Only call after the contents have been uploaded.
    pub fn release(&mut self) {
        debug_assert_eq!(
            self.state,
            BufferState::ResultPending,
            "release on a buffer without a pending result"
        );
        self.state = BufferState::Available;
    }

    /// Busy -> Available, after a failed meshing pass.
    pub fn abandon(&mut self) {
        debug_assert_eq!(self.state, BufferState::Busy, "abandon on a buffer that is not being written");
        self.state = BufferState::Available;
        self.terrain.clear();
        self.light.clear();
    }

    pub fn approximate_size(&self) -> usize {
        self.terrain.capacity() + self.light.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_grows_geometrically() {
        let mut region = ScratchRegion::with_capacity("terrain", 4);
        region.extend_from_slice(&[1, 2, 3]).unwrap();
        assert!(region.capacity() >= 4);

        region.extend_from_slice(&[4, 5]).unwrap();
        assert!(region.capacity() >= 8);
        assert_eq!(region.as_slice(), &[1, 2, 3, 4, 5]);

        region.extend_from_slice(&[0; 100]).unwrap();
        assert!(region.capacity() >= 105);
        assert_eq!(region.len(), 105);
    }

    #[test]
    fn test_allocation_failure_is_reported() {
        let mut region = ScratchRegion::with_capacity("light", 0);
        let error = region.reserve(usize::MAX).unwrap_err();
        assert!(matches!(error, MeshError::Allocation { region: "light", .. }));
    }

    #[test]
    fn test_growth_stops_at_limit() {
        let mut region = ScratchRegion::with_capacity("terrain", 4);
        region.set_limit(Some(10));

        // Doubling would overshoot, so growth is clamped to the limit
        region.extend_from_slice(&[1; 6]).unwrap();
        assert!(region.capacity() >= 6);
        region.extend_from_slice(&[2; 4]).unwrap();
        assert_eq!(region.len(), 10);

        let error = region.extend_from_slice(&[3]).unwrap_err();
        assert!(matches!(
            error,
            MeshError::LimitExceeded {
                region: "terrain",
                requested: 11,
                limit: 10
            }
        ));
        assert_eq!(region.len(), 10);
    }

    #[test]
    fn test_approximate_size_tracks_growth() {
        let mut buffer = ScratchBuffer::new(0, 8, 8).with_limit(Some(1024));
        assert!(buffer.approximate_size() >= 16);

        buffer.claim();
        buffer.terrain.extend_from_slice(&[0; 100]).unwrap();
        assert!(buffer.approximate_size() >= 108);
        buffer.abandon();
    }

    #[test]
    fn test_buffer_lifecycle() {
        let mut buffer = ScratchBuffer::new(3, 16, 16);
        assert_eq!(buffer.state(), BufferState::Available);
        assert_eq!(buffer.worker(), 3);

        buffer.claim();
        assert_eq!(buffer.state(), BufferState::Busy);
        buffer.terrain.extend_from_slice(&[1; 64]).unwrap();
        buffer.publish();
        assert_eq!(buffer.state(), BufferState::ResultPending);
        assert_eq!(buffer.terrain.len(), 64);

        buffer.release();
        assert_eq!(buffer.state(), BufferState::Available);

        // Contents survive until the next claim, capacity survives forever
        buffer.claim();
        assert!(buffer.terrain.is_empty());
        assert!(buffer.terrain.capacity() >= 64);
        buffer.abandon();
        assert_eq!(buffer.state(), BufferState::Available);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "buffer in use")]
    fn test_double_claim_panics() {
        let mut buffer = ScratchBuffer::new(0, 0, 0);
        buffer.claim();
        buffer.claim();
    }

    #[test]
    fn test_capacity_estimate() {
        assert_eq!(estimate_light_capacity(), 4096 * 36);
        assert_eq!(estimate_terrain_capacity(), 4096 * 36 * 48);
    }
}
