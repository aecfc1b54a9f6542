use std::path::Path;

use anyhow::Context;

use crate::assets::{biomes::BiomeTable, block_textures::BlockTextureTable};

pub mod biomes;
pub mod block_textures;

/// Lookup tables the mesher workers need, shared between them through an `Arc`.
pub struct MeshingResources {
    pub textures: BlockTextureTable,
    pub biomes: BiomeTable,
}

impl MeshingResources {
    pub fn vanilla() -> Self {
        MeshingResources {
            textures: BlockTextureTable::vanilla(),
            biomes: BiomeTable::vanilla(),
        }
    }

    /// Loads overrides from `assets_root` where present, and falls back to the
    /// built-in tables for everything else.
    pub fn load_or_default(assets_root: &Path) -> anyhow::Result<Self> {
        if !assets_root.exists() {
            log::warn!(
                "Assets root path '{}' does not exist, using built-in block and biome tables",
                assets_root.display()
            );
            return Ok(Self::vanilla());
        }

        let blocks_path = assets_root.join("defs/blocks.ron");
        let textures = if blocks_path.exists() {
            BlockTextureTable::load_from_file(&blocks_path)?
        } else {
            BlockTextureTable::vanilla()
        };

        let grass_path = assets_root.join("textures/colormap/grass.png");
        let foliage_path = assets_root.join("textures/colormap/foliage.png");
        let biomes = if grass_path.exists() && foliage_path.exists() {
            BiomeTable::with_colormaps(&grass_path, &foliage_path)
                .context("Failed to load biome colormaps")?
        } else {
            log::info!("No colormaps found, using built-in biome gradients");
            BiomeTable::vanilla()
        };

        Ok(MeshingResources { textures, biomes })
    }
}

impl Default for MeshingResources {
    fn default() -> Self {
        Self::vanilla()
    }
}
