use std::sync::Arc;

use glam::Vec3;

use crate::{
    assets::MeshingResources,
    mesher::{
        MeshError,
        scratch::ScratchBuffer,
        vertex::{TerrainVertex, VERTICES_PER_FACE},
    },
    voxels::{
        block::Block,
        chunk::{CHUNK_AREA, CHUNK_DEPTH, CHUNK_VOLUME, CHUNK_WIDTH, Chunk, SLAB_COUNT, SLAB_HEIGHT},
        chunk_map::BlockSource,
        coord::{LocalPos, WorldPos},
        face::{Face, TRIANGLE_CORNERS},
    },
};

const WHITE: [u8; 4] = [255, 255, 255, 255];

/// Turns chunk blocks into a flat triangle list with per-face culling.
/// One per mesher worker; keeps its snapshot memory between chunks.
pub struct Tessellator {
    resources: Arc<MeshingResources>,
    blocks: Vec<Block>,
    biomes: Vec<u8>,
}

impl Tessellator {
    pub fn new(resources: Arc<MeshingResources>) -> Self {
        Tessellator {
            resources,
            blocks: Vec::with_capacity(CHUNK_VOLUME),
            biomes: Vec::with_capacity(CHUNK_AREA),
        }
    }

    /// Writes the mesh of `chunk` into `buffer`, which must be claimed.
    /// Blocks outside the chunk are read from `world`. Returns the number of vertex bytes.
    #[profiling::function]
    pub fn tessellate(
        &mut self,
        chunk: &Chunk,
        world: &impl BlockSource,
        buffer: &mut ScratchBuffer,
    ) -> Result<usize, MeshError> {
        let occupancy = {
            let data = chunk.read();
            self.blocks.clear();
            self.blocks.extend_from_slice(data.blocks());
            self.biomes.clear();
            self.biomes.extend_from_slice(data.biomes());
            data.occupancy()
        };

        let chunk_pos = chunk.position;

        for slab in 0..SLAB_COUNT {
            if occupancy & (1 << slab) == 0 {
                continue;
            }

            for y in slab * SLAB_HEIGHT..(slab + 1) * SLAB_HEIGHT {
                for z in 0..CHUNK_DEPTH {
                    for x in 0..CHUNK_WIDTH {
                        let pos = LocalPos::new_unchecked(x as u8, y as u8, z as u8);
                        let block = self.blocks[pos.to_chunk_data_index()];
                        if block.is_air() {
                            continue;
                        }

                        let world_pos = WorldPos::from_chunk_and_local(chunk_pos, pos);
                        for face in Face::all() {
                            let neighbor = match pos.offset(face) {
                                Some(neighbor_pos) => self.blocks[neighbor_pos.to_chunk_data_index()],
                                // Chunks span the whole world height: nothing above or below
                                None if matches!(face, Face::Top | Face::Bottom) => Block::AIR,
                                None => world.block_safe(world_pos.offset(face)),
                            };

                            if neighbor.occludes() {
                                continue;
                            }

                            self.emit_face(buffer, world_pos, pos, block, face)?;
                        }
                    }
                }
            }
        }

        Ok(buffer.terrain.len())
    }

    fn emit_face(
        &self,
        buffer: &mut ScratchBuffer,
        world_pos: WorldPos,
        pos: LocalPos,
        block: Block,
        face: Face,
    ) -> Result<(), MeshError> {
        let (color, mask_uv) = match block.biome_tint(face) {
            Some(tint) => {
                let biome = self.biomes[pos.column_index()];
                let biome_color = self.resources.biomes.color(biome, tint);
                (biome_color.rgba, biome_color.mask_uv)
            }
            None => (WHITE, [0.0, 0.0]),
        };

        let origin = world_pos.0.as_vec3();
        let corners = face.corners();
        let uvs = self.resources.textures.face_uvs(block.block_type(), face);
        let [nx, ny, nz] = face.normal();
        let normal = [nx, ny, nz, face as i8];

        let vertices: [TerrainVertex; VERTICES_PER_FACE] = TRIANGLE_CORNERS.map(|corner| {
            let [cx, cy, cz] = corners[corner];
            let position = origin + Vec3::new(cx as f32, cy as f32, cz as f32);
            TerrainVertex {
                position: position.to_array(),
                normal,
                uv: uvs[corner],
                mask_uv,
                color,
                _padding: [0; 3],
            }
        });

        buffer
            .terrain
            .extend_from_slice(bytemuck::bytes_of(&vertices))?;
        buffer
            .light
            .extend_from_slice(&[face.shade(); VERTICES_PER_FACE])?;
        Ok(())
    }
}
