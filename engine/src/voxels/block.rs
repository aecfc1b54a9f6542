use bitfield_struct::bitfield;

use crate::voxels::face::Face;

/// A single voxel: 12 bits of block type and 4 bits of auxiliary sub-state
/// (wool colour, log orientation, water level...).
#[bitfield(u16, hash = true)]
pub struct Block {
    #[bits(12)]
    pub block_type: u16,
    #[bits(4)]
    pub metadata: u8,
}

/// Which colormap a block face is tinted with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BiomeTint {
    Grass,
    Foliage,
}

pub mod block_types {
    pub const AIR: u16 = 0;
    pub const STONE: u16 = 1;
    pub const GRASS: u16 = 2;
    pub const DIRT: u16 = 3;
    pub const COBBLESTONE: u16 = 4;
    pub const PLANKS: u16 = 5;
    pub const BEDROCK: u16 = 7;
    pub const FLOWING_WATER: u16 = 8;
    pub const WATER: u16 = 9;
    pub const SAND: u16 = 12;
    pub const GRAVEL: u16 = 13;
    pub const LOG: u16 = 17;
    pub const LEAVES: u16 = 18;
    pub const GLASS: u16 = 20;
    pub const ICE: u16 = 79;
}

impl Block {
    pub const fn from_type(block_type: u16) -> Self {
        let mut block = Block::new();
        block.set_block_type(block_type);
        block
    }

    pub const fn from_type_metadata(block_type: u16, metadata: u8) -> Self {
        let mut block = Block::new();
        block.set_block_type(block_type);
        block.set_metadata(metadata);
        block
    }

    pub const AIR: Block = Block::new();
    pub const STONE: Block = Block::from_type(block_types::STONE);
    pub const GRASS: Block = Block::from_type(block_types::GRASS);
    pub const DIRT: Block = Block::from_type(block_types::DIRT);
    pub const SAND: Block = Block::from_type(block_types::SAND);
    pub const WATER: Block = Block::from_type(block_types::WATER);
    pub const LOG: Block = Block::from_type(block_types::LOG);
    pub const LEAVES: Block = Block::from_type(block_types::LEAVES);
    pub const GLASS: Block = Block::from_type(block_types::GLASS);

    pub const fn is_air(&self) -> bool {
        self.block_type() == block_types::AIR
    }

    /// Transparent blocks never cull the faces of their neighbours.
    pub const fn is_transparent(&self) -> bool {
        matches!(
            self.block_type(),
            block_types::AIR
                | block_types::FLOWING_WATER
                | block_types::WATER
                | block_types::LEAVES
                | block_types::GLASS
                | block_types::ICE
        )
    }

    /// True if a face pressed against this block is fully hidden.
    pub const fn occludes(&self) -> bool {
        !self.is_transparent()
    }

    pub const fn biome_tint(&self, face: Face) -> Option<BiomeTint> {
        match (self.block_type(), face) {
            (block_types::GRASS, Face::Top) => Some(BiomeTint::Grass),
            (block_types::LEAVES, _) => Some(BiomeTint::Foliage),
            _ => None,
        }
    }
}

impl PartialEq for Block {
    fn eq(&self, other: &Self) -> bool {
        self.into_bits() == other.into_bits()
    }
}

impl Eq for Block {}
