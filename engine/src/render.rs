use crate::voxels::coord::ChunkPos;

/// A finished mesh as handed to the renderer. The slices are only valid for
/// the duration of the upload call.
#[derive(Debug, Clone, Copy)]
pub struct MeshUpload<'a> {
    /// `vertex_count` tightly packed `TerrainVertex` records
    pub terrain: &'a [u8],
    /// One light byte per vertex
    pub light: &'a [u8],
    pub vertex_count: u32,
}

/// The renderer's side of the pipeline. Only ever called from the main thread.
pub trait IChunkRenderContext {
    /// Renderer-owned GPU resources for one chunk. Opaque to the engine.
    type Mesh;

    fn upload_mesh(&mut self, pos: ChunkPos, upload: MeshUpload<'_>) -> Self::Mesh;
    fn release_mesh(&mut self, pos: ChunkPos, mesh: Self::Mesh);
}

// No-op renderer, for tools and tests which only care about the block data
impl IChunkRenderContext for () {
    type Mesh = ();

    fn upload_mesh(&mut self, _pos: ChunkPos, _upload: MeshUpload<'_>) -> Self::Mesh {}

    fn release_mesh(&mut self, _pos: ChunkPos, _mesh: Self::Mesh) {}
}
