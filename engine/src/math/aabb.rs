use glam::Vec3;

use crate::voxels::{chunk::CHUNK_DIMENSIONS, coord::ChunkPos};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AABB {
    pub min: Vec3,
    pub max: Vec3,
}

impl AABB {
    pub fn new(point1: Vec3, point2: Vec3) -> AABB {
        let min = point1.min(point2);
        let max = point1.max(point2);
        AABB { min, max }
    }

    /// World-space volume covered by the chunk at `pos`.
    pub fn from_chunk_pos(pos: ChunkPos) -> AABB {
        let min = pos.origin().0.as_vec3();
        AABB::new(min, min + CHUNK_DIMENSIONS.as_vec3())
    }
}
