use bytemuck::{Pod, Zeroable};

/// Two triangles per face, no index buffer.
pub const VERTICES_PER_FACE: usize = 6;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Zeroable, Pod)]
pub struct TerrainVertex {
    // World space
    pub position: [f32; 3],
    // x, y, z, face id
    pub normal: [i8; 4],
    // Terrain atlas coordinate
    pub uv: [f32; 2],
    // Colormap coordinate for biome tinted faces, zero otherwise
    pub mask_uv: [f32; 2],
    pub color: [u8; 4],
    pub _padding: [u32; 3],
}

const _: () = assert!(size_of::<TerrainVertex>() == 48);

impl TerrainVertex {
    pub const SIZE: usize = size_of::<TerrainVertex>();
}
