use engine::{
    mesher::vertex::TerrainVertex,
    render::{IChunkRenderContext, MeshUpload},
    voxels::coord::ChunkPos,
};

/// Stand-in for a GPU buffer pair.
#[derive(Debug)]
pub struct HeadlessMesh {
    pub id: u64,
    pub vertex_count: u32,
    pub size_bytes: usize,
}

/// A renderer with no GPU behind it. Keeps track of what would be resident in video memory.
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    next_id: u64,
    pub uploads: u64,
    pub releases: u64,
    pub resident_meshes: usize,
    pub resident_bytes: usize,
    pub resident_vertices: u64,
}

impl IChunkRenderContext for HeadlessRenderer {
    type Mesh = HeadlessMesh;

    fn upload_mesh(&mut self, pos: ChunkPos, upload: MeshUpload<'_>) -> HeadlessMesh {
        debug_assert_eq!(
            upload.terrain.len(),
            upload.vertex_count as usize * TerrainVertex::SIZE
        );
        debug_assert_eq!(upload.light.len(), upload.vertex_count as usize);

        let size_bytes = upload.terrain.len() + upload.light.len();
        self.next_id += 1;
        self.uploads += 1;
        self.resident_meshes += 1;
        self.resident_bytes += size_bytes;
        self.resident_vertices += upload.vertex_count as u64;

        log::trace!(
            "Uploaded mesh {} for chunk {:?} ({} vertices)",
            self.next_id,
            pos,
            upload.vertex_count
        );

        HeadlessMesh {
            id: self.next_id,
            vertex_count: upload.vertex_count,
            size_bytes,
        }
    }

    fn release_mesh(&mut self, pos: ChunkPos, mesh: HeadlessMesh) {
        self.releases += 1;
        self.resident_meshes -= 1;
        self.resident_bytes -= mesh.size_bytes;
        self.resident_vertices -= mesh.vertex_count as u64;
        log::trace!("Released mesh {} for chunk {:?}", mesh.id, pos);
    }
}
