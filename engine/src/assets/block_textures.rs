use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::voxels::{block::block_types, face::Face};

/// The terrain atlas is a square grid of this many tiles per side.
pub const ATLAS_TILES_PER_ROW: u16 = 16;
pub const ATLAS_TILE_COUNT: u16 = ATLAS_TILES_PER_ROW * ATLAS_TILES_PER_ROW;
// Magenta checkerboard in the atlas
pub const MISSING_TEXTURE: u16 = ATLAS_TILE_COUNT - 1;

const BLOCK_TYPE_COUNT: usize = 1 << 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureIndices {
    pub top: u16,
    pub bottom: u16,
    pub side: u16,
}

impl TextureIndices {
    pub const fn new_single(index: u16) -> Self {
        TextureIndices {
            top: index,
            bottom: index,
            side: index,
        }
    }

    pub const fn per_face(top: u16, bottom: u16, side: u16) -> Self {
        TextureIndices { top, bottom, side }
    }

    pub fn get_face_index(&self, face: Face) -> u16 {
        match face {
            Face::Top => self.top,
            Face::Bottom => self.bottom,
            _ => self.side,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub enum BlockTextureDefinition {
    Invisible,
    Single(u16),
    PerFace { top: u16, bottom: u16, side: u16 },
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockDefinition {
    pub id: u16,
    pub name: String,
    pub textures: BlockTextureDefinition,
}

/// Corner UVs of a quad, in the same order as `Face::corners`.
pub type QuadUvs = [[f32; 2]; 4];

/// Block type id -> atlas UVs for each face, expanded once up front so the
/// mesher only does a table lookup per face.
pub struct BlockTextureTable {
    uvs: Box<[[QuadUvs; 6]]>,
}

impl BlockTextureTable {
    /// A table where every block uses the missing texture.
    pub fn new() -> Self {
        let missing = Self::expand(TextureIndices::new_single(MISSING_TEXTURE));
        BlockTextureTable {
            uvs: vec![missing; BLOCK_TYPE_COUNT].into_boxed_slice(),
        }
    }

    /// The classic terrain atlas layout.
    pub fn vanilla() -> Self {
        let mut table = Self::new();
        for (block_type, indices) in [
            (block_types::STONE, TextureIndices::new_single(1)),
            (block_types::GRASS, TextureIndices::per_face(0, 2, 3)),
            (block_types::DIRT, TextureIndices::new_single(2)),
            (block_types::COBBLESTONE, TextureIndices::new_single(16)),
            (block_types::PLANKS, TextureIndices::new_single(4)),
            (block_types::BEDROCK, TextureIndices::new_single(17)),
            (block_types::FLOWING_WATER, TextureIndices::new_single(205)),
            (block_types::WATER, TextureIndices::new_single(205)),
            (block_types::SAND, TextureIndices::new_single(18)),
            (block_types::GRAVEL, TextureIndices::new_single(19)),
            (block_types::LOG, TextureIndices::per_face(21, 21, 20)),
            (block_types::LEAVES, TextureIndices::new_single(52)),
            (block_types::GLASS, TextureIndices::new_single(49)),
            (block_types::ICE, TextureIndices::new_single(67)),
        ] {
            table.set(block_type, indices);
        }
        table
    }

    pub fn from_definitions(defs: Vec<BlockDefinition>) -> anyhow::Result<Self> {
        let mut table = Self::new();
        let count = defs.len();
        for def in defs {
            if def.id as usize >= BLOCK_TYPE_COUNT {
                anyhow::bail!("Block '{}' has out of range id {}", def.name, def.id);
            }
            let indices = match def.textures {
                // Never meshed, but keep it out of the missing texture
                BlockTextureDefinition::Invisible => TextureIndices::new_single(0),
                BlockTextureDefinition::Single(index) => TextureIndices::new_single(index),
                BlockTextureDefinition::PerFace { top, bottom, side } => {
                    TextureIndices::per_face(top, bottom, side)
                }
            };
            for index in [indices.top, indices.bottom, indices.side] {
                if index >= ATLAS_TILE_COUNT {
                    anyhow::bail!(
                        "Block '{}' refers to atlas tile {}, the atlas only has {}",
                        def.name,
                        index,
                        ATLAS_TILE_COUNT
                    );
                }
            }
            table.set(def.id, indices);
        }
        log::info!("Loaded {} block definitions", count);
        Ok(table)
    }

    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let defs_data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read block defs file {}", path.display()))?;
        let defs: Vec<BlockDefinition> = ron::from_str(&defs_data)
            .with_context(|| format!("Failed to parse block defs file {}", path.display()))?;
        Self::from_definitions(defs)
    }

    pub fn set(&mut self, block_type: u16, indices: TextureIndices) {
        self.uvs[block_type as usize] = Self::expand(indices);
    }

    pub fn face_uvs(&self, block_type: u16, face: Face) -> &QuadUvs {
        &self.uvs[block_type as usize % BLOCK_TYPE_COUNT][face as usize]
    }

    fn expand(indices: TextureIndices) -> [QuadUvs; 6] {
        Face::all().map(|face| {
            let tile = indices.get_face_index(face);
            let origin = tile_origin(tile);
            face.corner_uvs().map(|[u, v]| {
                [
                    origin[0] + u as f32 * TILE_SIZE,
                    origin[1] + v as f32 * TILE_SIZE,
                ]
            })
        })
    }
}

impl Default for BlockTextureTable {
    fn default() -> Self {
        Self::vanilla()
    }
}

const TILE_SIZE: f32 = 1.0 / ATLAS_TILES_PER_ROW as f32;

fn tile_origin(tile: u16) -> [f32; 2] {
    let column = tile % ATLAS_TILES_PER_ROW;
    let row = tile / ATLAS_TILES_PER_ROW;
    [column as f32 * TILE_SIZE, row as f32 * TILE_SIZE]
}
