use ahash::RandomState;
use dashmap::DashMap;

use crate::voxels::{
    block::Block,
    chunk::{Chunk, ChunkHandle},
    coord::{ChunkPos, WorldPos},
};

/// Read-only block access for the mesher. Missing chunks read as air.
pub trait BlockSource: Send + Sync {
    fn block_safe(&self, pos: WorldPos) -> Block;
}

/// Coordinate to chunk map shared between the main thread and the mesher workers.
/// Only the main thread inserts and removes.
#[derive(Default)]
pub struct ChunkMap {
    chunks: DashMap<ChunkPos, ChunkHandle, RandomState>,
}

impl ChunkMap {
    pub fn new() -> Self {
        ChunkMap {
            chunks: DashMap::with_hasher(RandomState::new()),
        }
    }

    // The shard guard is dropped before returning, so callers may lock the chunk freely
    pub fn get(&self, pos: ChunkPos) -> Option<ChunkHandle> {
        self.chunks.get(&pos).map(|entry| entry.value().clone())
    }

    pub fn insert(&self, pos: ChunkPos, chunk: Chunk) -> (ChunkHandle, Option<ChunkHandle>) {
        let handle = ChunkHandle::new(chunk);
        let previous = self.chunks.insert(pos, handle.clone());
        (handle, previous)
    }

    pub fn remove(&self, pos: ChunkPos) -> Option<ChunkHandle> {
        self.chunks.remove(&pos).map(|(_, chunk)| chunk)
    }

    pub fn contains(&self, pos: ChunkPos) -> bool {
        self.chunks.contains_key(&pos)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn handles(&self) -> Vec<ChunkHandle> {
        self.chunks.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Removes every chunk further than `distance` chunks from `center` and returns them.
    pub fn drain_outside_distance(&self, center: ChunkPos, distance: u32) -> Vec<ChunkHandle> {
        let mut removed = Vec::new();
        self.chunks.retain(|pos, chunk| {
            let keep = pos.chebyshev_distance(center) <= distance;
            if !keep {
                removed.push(chunk.clone());
            }
            keep
        });
        removed
    }

    /// Block at `pos`, or air when it is outside the world height, or the owning chunk
    /// is not loaded or has no blocks.
    pub fn get_block_safe(&self, pos: WorldPos) -> Block {
        if !pos.is_within_height() {
            return Block::AIR;
        }
        let Some(chunk) = self.get(pos.to_chunk_pos()) else {
            return Block::AIR;
        };
        let data = chunk.read();
        if data.is_empty() {
            return Block::AIR;
        }
        data.get_block(pos.to_local_pos())
    }
}

impl BlockSource for ChunkMap {
    fn block_safe(&self, pos: WorldPos) -> Block {
        self.get_block_safe(pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voxels::{chunk::ChunkPayload, coord::LocalPos};

    #[test]
    fn test_missing_chunk_reads_air() {
        let map = ChunkMap::new();
        assert_eq!(map.get_block_safe(WorldPos::new(5, 5, 5)), Block::AIR);
        assert_eq!(map.get_block_safe(WorldPos::new(-100, 300, 7)), Block::AIR);
    }

    #[test]
    fn test_outside_world_height_reads_air() {
        let map = ChunkMap::new();
        let above = ChunkPos::new(0, 1, 0);
        map.insert(above, Chunk::from_payload(above, ChunkPayload::filled(Block::STONE, 1)));

        assert_eq!(map.get_block_safe(WorldPos::new(1, 256, 1)), Block::AIR);
        assert_eq!(map.get_block_safe(WorldPos::new(1, 300, 1)), Block::AIR);
    }

    #[test]
    fn test_lookup_crosses_into_negative_chunks() {
        let map = ChunkMap::new();
        let mut payload = ChunkPayload::empty();
        payload.set_block(LocalPos::new(15, 64, 15), Block::STONE);
        map.insert(
            ChunkPos::new(-1, 0, -1),
            Chunk::from_payload(ChunkPos::new(-1, 0, -1), payload),
        );

        assert_eq!(map.get_block_safe(WorldPos::new(-1, 64, -1)), Block::STONE);
        assert_eq!(map.get_block_safe(WorldPos::new(-1, 65, -1)), Block::AIR);
    }

    #[test]
    fn test_insert_returns_previous() {
        let map = ChunkMap::new();
        let pos = ChunkPos::new(0, 0, 0);
        let (first, previous) = map.insert(pos, Chunk::from_payload(pos, ChunkPayload::empty()));
        assert!(previous.is_none());
        let (_, previous) = map.insert(pos, Chunk::from_payload(pos, ChunkPayload::empty()));
        assert!(ChunkHandle::ptr_eq(&first, &previous.unwrap()));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_drain_outside_distance() {
        let map = ChunkMap::new();
        for x in -3..=3 {
            let pos = ChunkPos::new(x, 0, 0);
            map.insert(pos, Chunk::from_payload(pos, ChunkPayload::empty()));
        }
        let removed = map.drain_outside_distance(ChunkPos::new(0, 0, 0), 2);
        assert_eq!(removed.len(), 2);
        assert_eq!(map.len(), 5);
        assert!(!map.contains(ChunkPos::new(3, 0, 0)));
    }
}
