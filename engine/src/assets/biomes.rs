use std::path::Path;

use anyhow::Context;
use image::RgbaImage;

use crate::voxels::block::BiomeTint;

pub const COLORMAP_SIZE: u32 = 256;
pub const PLAINS: u8 = 1;

#[derive(Debug, Clone, PartialEq)]
pub struct Biome {
    pub id: u8,
    pub name: &'static str,
    pub temperature: f32,
    pub rainfall: f32,
}

impl Biome {
    const fn new(id: u8, name: &'static str, temperature: f32, rainfall: f32) -> Self {
        Biome {
            id,
            name,
            temperature,
            rainfall,
        }
    }

    /// Position of this biome in the grass and foliage colormaps.
    /// Rainfall is scaled by temperature, so only the lower left triangle is used.
    pub fn colormap_uv(&self) -> [f32; 2] {
        let temperature = self.temperature.clamp(0.0, 1.0);
        let rainfall = self.rainfall.clamp(0.0, 1.0) * temperature;
        [1.0 - temperature, 1.0 - rainfall]
    }
}

pub const VANILLA_BIOMES: [Biome; 23] = [
    Biome::new(0, "Ocean", 0.5, 0.5),
    Biome::new(1, "Plains", 0.8, 0.4),
    Biome::new(2, "Desert", 2.0, 0.0),
    Biome::new(3, "Extreme Hills", 0.2, 0.3),
    Biome::new(4, "Forest", 0.7, 0.8),
    Biome::new(5, "Taiga", 0.25, 0.8),
    Biome::new(6, "Swampland", 0.8, 0.9),
    Biome::new(7, "River", 0.5, 0.5),
    Biome::new(8, "Hell", 2.0, 0.0),
    Biome::new(9, "Sky", 0.5, 0.5),
    Biome::new(10, "Frozen Ocean", 0.0, 0.5),
    Biome::new(11, "Frozen River", 0.0, 0.5),
    Biome::new(12, "Ice Plains", 0.0, 0.5),
    Biome::new(13, "Ice Mountains", 0.0, 0.5),
    Biome::new(14, "Mushroom Island", 0.9, 1.0),
    Biome::new(15, "Mushroom Island Shore", 0.9, 1.0),
    Biome::new(16, "Beach", 0.8, 0.4),
    Biome::new(17, "Desert Hills", 2.0, 0.0),
    Biome::new(18, "Forest Hills", 0.7, 0.8),
    Biome::new(19, "Taiga Hills", 0.25, 0.8),
    Biome::new(20, "Extreme Hills Edge", 0.2, 0.3),
    Biome::new(21, "Jungle", 0.95, 0.9),
    Biome::new(22, "Jungle Hills", 0.95, 0.9),
];

/// A square climate colormap, indexed by `Biome::colormap_uv`.
pub struct Colormap {
    size: u32,
    pixels: Vec<[u8; 4]>,
}

impl Colormap {
    pub fn from_image(image: &RgbaImage) -> anyhow::Result<Self> {
        if image.width() != image.height() || image.width() == 0 {
            anyhow::bail!(
                "Colormap must be square, got {}x{}",
                image.width(),
                image.height()
            );
        }
        Ok(Colormap {
            size: image.width(),
            pixels: image.pixels().map(|pixel| pixel.0).collect(),
        })
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let image = image::open(path)
            .with_context(|| format!("Failed to open colormap at {}", path.display()))?;
        Self::from_image(&image.to_rgba8())
            .with_context(|| format!("Invalid colormap at {}", path.display()))
    }

    /// Built-in colormap blending three anchor colours across the climate triangle.
    pub fn gradient(hot_wet: [u8; 3], hot_dry: [u8; 3], cold: [u8; 3]) -> Self {
        let size = COLORMAP_SIZE;
        let mut pixels = Vec::with_capacity((size * size) as usize);
        let max = (size - 1) as f32;

        for y in 0..size {
            for x in 0..size {
                let temperature = 1.0 - x as f32 / max;
                let scaled_rainfall = 1.0 - y as f32 / max;
                let rainfall = if temperature > 0.0 {
                    (scaled_rainfall / temperature).min(1.0)
                } else {
                    0.0
                };

                let mut rgba = [0, 0, 0, 255];
                for channel in 0..3 {
                    let warm = lerp(hot_dry[channel], hot_wet[channel], rainfall);
                    let value = lerp_f32(cold[channel] as f32, warm, temperature);
                    rgba[channel] = value.round().clamp(0.0, 255.0) as u8;
                }
                pixels.push(rgba);
            }
        }

        Colormap { size, pixels }
    }

    pub fn vanilla_grass() -> Self {
        Self::gradient([71, 205, 51], [191, 183, 85], [128, 180, 151])
    }

    pub fn vanilla_foliage() -> Self {
        Self::gradient([26, 191, 0], [174, 164, 42], [96, 161, 123])
    }

    pub fn sample(&self, uv: [f32; 2]) -> [u8; 4] {
        let max = (self.size - 1) as f32;
        let x = (uv[0].clamp(0.0, 1.0) * max).round() as u32;
        let y = (uv[1].clamp(0.0, 1.0) * max).round() as u32;
        self.pixels[(y * self.size + x) as usize]
    }
}

fn lerp(a: u8, b: u8, t: f32) -> f32 {
    lerp_f32(a as f32, b as f32, t)
}

fn lerp_f32(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiomeColor {
    pub rgba: [u8; 4],
    /// Colormap coordinate, used by the shader to re-sample a resource pack colormap
    pub mask_uv: [f32; 2],
}

/// Biome id -> grass and foliage tint.
pub struct BiomeTable {
    // Indexed by biome id, then by tint
    colors: Box<[[BiomeColor; 2]; 256]>,
}

impl BiomeTable {
    pub fn new(biomes: &[Biome], grass: &Colormap, foliage: &Colormap) -> Self {
        let plains = biomes
            .iter()
            .find(|biome| biome.id == PLAINS)
            .cloned()
            .unwrap_or(VANILLA_BIOMES[PLAINS as usize].clone());

        let resolve = |biome: &Biome| {
            let mask_uv = biome.colormap_uv();
            [
                BiomeColor {
                    rgba: grass.sample(mask_uv),
                    mask_uv,
                },
                BiomeColor {
                    rgba: foliage.sample(mask_uv),
                    mask_uv,
                },
            ]
        };

        let fallback = resolve(&plains);
        let mut colors = Box::new([fallback; 256]);
        for biome in biomes {
            colors[biome.id as usize] = resolve(biome);
        }

        BiomeTable { colors }
    }

    pub fn vanilla() -> Self {
        Self::new(
            &VANILLA_BIOMES,
            &Colormap::vanilla_grass(),
            &Colormap::vanilla_foliage(),
        )
    }

    pub fn with_colormaps(grass_path: &Path, foliage_path: &Path) -> anyhow::Result<Self> {
        let grass = Colormap::load(grass_path)?;
        let foliage = Colormap::load(foliage_path)?;
        Ok(Self::new(&VANILLA_BIOMES, &grass, &foliage))
    }

    /// Unknown ids get the plains colour.
    pub fn color(&self, id: u8, tint: BiomeTint) -> BiomeColor {
        let index = match tint {
            BiomeTint::Grass => 0,
            BiomeTint::Foliage => 1,
        };
        self.colors[id as usize][index]
    }
}

impl Default for BiomeTable {
    fn default() -> Self {
        Self::vanilla()
    }
}
