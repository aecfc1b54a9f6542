use engine::{
    assets::biomes::PLAINS,
    voxels::{
        block::{Block, block_types},
        chunk::{CHUNK_DEPTH, CHUNK_HEIGHT, CHUNK_WIDTH, ChunkPayload},
        coord::{ChunkPos, LocalPos},
    },
};
use glam::{DVec2, Vec3Swizzles};
use noise::{NoiseFn, SuperSimplex};
use rayon::prelude::*;

pub const SEA_LEVEL: i32 = 62;

const BEDROCK: Block = Block::from_type(block_types::BEDROCK);

const OCEAN: u8 = 0;
const DESERT: u8 = 2;
const FOREST: u8 = 4;
const BEACH: u8 = 16;

/// Stands in for the server, producing chunk payloads from noise.
pub struct TerrainGenerator {
    height_noise: SuperSimplex,
    climate_noise: SuperSimplex,
}

impl TerrainGenerator {
    pub fn new(seed: u32) -> Self {
        Self {
            height_noise: SuperSimplex::new(seed),
            climate_noise: SuperSimplex::new(seed.wrapping_add(1)),
        }
    }

    fn height_at(&self, pos: DVec2) -> i32 {
        let base = self.height_noise.get((pos * 0.01).to_array()) * 24.0;
        let detail = self.height_noise.get((pos * 0.05).to_array()) * 4.0;
        SEA_LEVEL + (base + detail) as i32
    }

    fn biome_at(&self, pos: DVec2, height: i32) -> u8 {
        if height < SEA_LEVEL - 1 {
            return OCEAN;
        }
        if height <= SEA_LEVEL + 1 {
            return BEACH;
        }

        let climate = self.climate_noise.get((pos * 0.004).to_array());
        if climate > 0.4 {
            DESERT
        } else if climate < -0.3 {
            FOREST
        } else {
            PLAINS
        }
    }

    pub fn generate_chunk(&self, chunk_pos: ChunkPos) -> ChunkPayload {
        let mut payload = ChunkPayload::empty();
        let origin_2d = chunk_pos.origin().0.xz().as_dvec2();

        for x in 0..CHUNK_WIDTH {
            for z in 0..CHUNK_DEPTH {
                let pos = origin_2d + DVec2::new(x as f64, z as f64);
                let height = self.height_at(pos).clamp(1, CHUNK_HEIGHT as i32 - 1);
                let biome = self.biome_at(pos, height);
                payload.biomes[z * CHUNK_WIDTH + x] = biome;

                let (surface, filler) = match biome {
                    DESERT | BEACH => (Block::SAND, Block::SAND),
                    OCEAN => (Block::DIRT, Block::DIRT),
                    _ => (Block::GRASS, Block::DIRT),
                };

                for y in 0..CHUNK_HEIGHT as i32 {
                    let block = if y == 0 {
                        BEDROCK
                    } else if y < height - 3 {
                        Block::STONE
                    } else if y < height {
                        filler
                    } else if y == height {
                        surface
                    } else if y <= SEA_LEVEL {
                        Block::WATER
                    } else {
                        break;
                    };

                    payload.set_block(LocalPos::new(x as u8, y as u8, z as u8), block);
                }
            }
        }

        payload
    }

    /// Generates every chunk column within `radius` of the origin, in parallel.
    pub fn generate_area(&self, radius: i32) -> Vec<(ChunkPos, ChunkPayload)> {
        let width = radius * 2 + 1;

        (0..(width * width))
            .into_par_iter()
            .map(|i| {
                let pos = ChunkPos::new(i / width - radius, 0, i % width - radius);
                (pos, self.generate_chunk(pos))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use engine::voxels::chunk::CHUNK_AREA;

    use super::*;

    #[test]
    fn test_generates_requested_area() {
        let generator = TerrainGenerator::new(1);
        let chunks = generator.generate_area(1);
        assert_eq!(chunks.len(), 9);
        assert!(chunks.iter().any(|(pos, _)| *pos == ChunkPos::new(-1, 0, 1)));
    }

    #[test]
    fn test_columns_have_bedrock_and_air_on_top() {
        let generator = TerrainGenerator::new(7);
        let payload = generator.generate_chunk(ChunkPos::new(0, 0, 0));

        assert_eq!(payload.biomes.len(), CHUNK_AREA);
        for x in 0..CHUNK_WIDTH as u8 {
            for z in 0..CHUNK_DEPTH as u8 {
                let bottom = LocalPos::new(x, 0, z).to_chunk_data_index();
                let top = LocalPos::new(x, (CHUNK_HEIGHT - 1) as u8, z).to_chunk_data_index();
                assert_eq!(payload.blocks[bottom], BEDROCK);
                assert!(payload.blocks[top].is_air());
            }
        }
    }

    #[test]
    fn test_same_seed_is_deterministic() {
        let a = TerrainGenerator::new(42).generate_chunk(ChunkPos::new(3, 0, -2));
        let b = TerrainGenerator::new(42).generate_chunk(ChunkPos::new(3, 0, -2));
        assert_eq!(a.blocks, b.blocks);
        assert_eq!(a.biomes, b.biomes);
    }
}
