use std::ops::Add;

use glam::{IVec3, U8Vec3};

use crate::voxels::{
    chunk::{CHUNK_DEPTH, CHUNK_DIMENSIONS, CHUNK_HEIGHT, CHUNK_WIDTH},
    face::Face,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// A position of a block within a chunk
pub struct LocalPos(pub U8Vec3);

impl LocalPos {
    pub fn new(x: u8, y: u8, z: u8) -> Self {
        if x as usize >= CHUNK_WIDTH || y as usize >= CHUNK_HEIGHT || z as usize >= CHUNK_DEPTH {
            panic!("LocalPos out of bounds: ({}, {}, {})", x, y, z);
        }
        LocalPos(U8Vec3 { x, y, z })
    }

    /// For loops that already iterate within the chunk dimensions.
    pub(crate) const fn new_unchecked(x: u8, y: u8, z: u8) -> Self {
        LocalPos(U8Vec3 { x, y, z })
    }

    /// The neighbouring position in `face` direction, if it is still inside the chunk.
    pub fn offset(&self, face: Face) -> Option<LocalPos> {
        let new_pos = self.0.as_ivec3() + face.to_ivec3();

        if new_pos.cmplt(IVec3::ZERO).any() || new_pos.cmpge(CHUNK_DIMENSIONS).any() {
            None
        } else {
            Some(LocalPos(new_pos.as_u8vec3()))
        }
    }

    /// Faces of the chunk this position touches. Empty for interior positions.
    pub fn boundary_faces(self) -> impl Iterator<Item = Face> {
        Face::all()
            .into_iter()
            .filter(move |face| self.offset(*face).is_none())
    }

    /// Index into the flat block array, in YZX order.
    pub fn to_chunk_data_index(&self) -> usize {
        let LocalPos(U8Vec3 { x, y, z }) = *self;
        (y as usize * CHUNK_DEPTH + z as usize) * CHUNK_WIDTH + x as usize
    }

    /// Index of this position's column in per-column data such as biomes (ZX order).
    pub fn column_index(&self) -> usize {
        self.z() as usize * CHUNK_WIDTH + self.x() as usize
    }

    pub fn x(&self) -> u8 {
        self.0.x
    }

    pub fn y(&self) -> u8 {
        self.0.y
    }

    pub fn z(&self) -> u8 {
        self.0.z
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Coordinates identifying a chunk in chunk space (world coordinates divided by chunk dimensions and floored)
pub struct ChunkPos(pub IVec3);

impl ChunkPos {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        ChunkPos(IVec3 { x, y, z })
    }

    pub fn x(&self) -> i32 {
        self.0.x
    }

    pub fn y(&self) -> i32 {
        self.0.y
    }

    pub fn z(&self) -> i32 {
        self.0.z
    }

    pub fn origin(&self) -> WorldPos {
        WorldPos(self.0 * CHUNK_DIMENSIONS)
    }

    pub fn get_neighbor(&self, face: Face) -> ChunkPos {
        ChunkPos(self.0 + face.to_ivec3())
    }

    pub fn neighbors(self) -> impl Iterator<Item = ChunkPos> {
        Face::all()
            .into_iter()
            .map(move |face| self.get_neighbor(face))
    }

    pub fn chebyshev_distance(&self, other: ChunkPos) -> u32 {
        self.0.chebyshev_distance(other.0)
    }
}

/// A position of a block in world space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorldPos(pub IVec3);

impl WorldPos {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        WorldPos(IVec3 { x, y, z })
    }

    // Floored division, so that -1 lands in chunk -1 rather than chunk 0
    pub fn to_chunk_pos(&self) -> ChunkPos {
        ChunkPos(self.0.div_euclid(CHUNK_DIMENSIONS))
    }

    pub fn to_local_pos(&self) -> LocalPos {
        let converted_pos = self.0.rem_euclid(CHUNK_DIMENSIONS);
        LocalPos(converted_pos.as_u8vec3())
    }

    pub fn from_chunk_and_local(chunk_pos: ChunkPos, local_pos: LocalPos) -> Self {
        chunk_pos.origin() + local_pos
    }

    pub fn offset(&self, face: Face) -> WorldPos {
        WorldPos(self.0 + face.to_ivec3())
    }

    /// Chunks span the full world height, so anything outside it can never hold a block.
    pub fn is_within_height(&self) -> bool {
        (0..CHUNK_HEIGHT as i32).contains(&self.0.y)
    }
}

impl Add<LocalPos> for WorldPos {
    type Output = WorldPos;

    fn add(self, other: LocalPos) -> WorldPos {
        WorldPos(self.0 + other.0.as_ivec3())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_positions_floor() {
        let pos = WorldPos::new(-1, 0, -17);
        assert_eq!(pos.to_chunk_pos(), ChunkPos::new(-1, 0, -2));
        assert_eq!(pos.to_local_pos(), LocalPos::new(15, 0, 15));

        let pos = WorldPos::new(-16, 255, 16);
        assert_eq!(pos.to_chunk_pos(), ChunkPos::new(-1, 0, 1));
        assert_eq!(pos.to_local_pos(), LocalPos::new(0, 255, 0));

        let pos = WorldPos::new(3, -1, 3);
        assert_eq!(pos.to_chunk_pos(), ChunkPos::new(0, -1, 0));
        assert_eq!(pos.to_local_pos(), LocalPos::new(3, 255, 3));
    }

    #[test]
    fn test_world_pos_round_trip() {
        for pos in [
            WorldPos::new(0, 0, 0),
            WorldPos::new(-33, 70, 47),
            WorldPos::new(15, 255, -16),
            WorldPos::new(-1, -1, -1),
        ] {
            let rebuilt = WorldPos::from_chunk_and_local(pos.to_chunk_pos(), pos.to_local_pos());
            assert_eq!(rebuilt, pos);
        }
    }

    #[test]
    fn test_chunk_data_index_yzx() {
        assert_eq!(LocalPos::new(0, 0, 0).to_chunk_data_index(), 0);
        assert_eq!(LocalPos::new(15, 0, 0).to_chunk_data_index(), 15);
        assert_eq!(LocalPos::new(0, 0, 1).to_chunk_data_index(), 16);
        assert_eq!(LocalPos::new(0, 1, 0).to_chunk_data_index(), 256);
        assert_eq!(LocalPos::new(15, 255, 15).to_chunk_data_index(), 65535);
    }

    #[test]
    fn test_boundary_faces() {
        let interior = LocalPos::new(5, 100, 5);
        assert_eq!(interior.boundary_faces().count(), 0);

        let edge: Vec<_> = LocalPos::new(15, 100, 5).boundary_faces().collect();
        assert_eq!(edge, vec![Face::Right]);

        let corner: Vec<_> = LocalPos::new(0, 0, 0).boundary_faces().collect();
        assert_eq!(corner, vec![Face::Bottom, Face::Left, Face::Front]);

        let top: Vec<_> = LocalPos::new(7, 255, 7).boundary_faces().collect();
        assert_eq!(top, vec![Face::Top]);
    }

    #[test]
    fn test_world_height_bounds() {
        assert!(WorldPos::new(-40, 0, 3).is_within_height());
        assert!(WorldPos::new(0, 255, 0).is_within_height());
        assert!(!WorldPos::new(0, 256, 0).is_within_height());
        assert!(!WorldPos::new(0, -1, 0).is_within_height());
    }

    #[test]
    fn test_unchecked_matches_checked() {
        assert_eq!(LocalPos::new_unchecked(15, 255, 15), LocalPos::new(15, 255, 15));
    }

    #[test]
    #[should_panic]
    fn test_local_pos_out_of_bounds() {
        LocalPos::new(16, 0, 0);
    }
}
