use crate::util::is_power_of_two_plus_one;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

slotmap::new_key_type! { pub struct TreePrototypeRef; }

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "path")]
pub enum HeightmapSource {
    Flat,
    Image(PathBuf),
    HillGenerator,
    NoiseGenerator,
}

impl HeightmapSource {
    pub fn label(&self) -> &'static str {
        match self {
            HeightmapSource::Flat => "Flat",
            HeightmapSource::Image(_) => "Heightmap image",
            HeightmapSource::HillGenerator => "Hill generator",
            HeightmapSource::NoiseGenerator => "Noise generator",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainSettings {
    pub total_size: u32,
    pub patch_size: u32,
    pub height_scale: f32,
    pub source: HeightmapSource,
    pub textures: TerrainTextureSettings,
}

impl TerrainSettings {
    pub const MIN_SIZE: u32 = 33;
    pub const MAX_SIZE: u32 = 4097;

    pub fn validate(&self) -> Result<(), String> {
        if !is_power_of_two_plus_one(self.total_size)
            || !(Self::MIN_SIZE..=Self::MAX_SIZE).contains(&self.total_size)
        {
            return Err(format!(
                "Total size must be 2^n+1 between {} and {}, got {}",
                Self::MIN_SIZE,
                Self::MAX_SIZE,
                self.total_size
            ));
        }
        if !is_power_of_two_plus_one(self.patch_size) || self.patch_size < 3 {
            return Err(format!(
                "Patch size must be 2^n+1, got {}",
                self.patch_size
            ));
        }
        if self.patch_size > self.total_size {
            return Err(format!(
                "Patch size {} is larger than total size {}",
                self.patch_size, self.total_size
            ));
        }
        if !(self.height_scale.is_finite() && self.height_scale > 0.0) {
            return Err("Height scale must be positive".into());
        }
        Ok(())
    }
}

impl Default for TerrainSettings {
    fn default() -> Self {
        Self {
            total_size: 513,
            patch_size: 65,
            height_scale: 100.0,
            source: HeightmapSource::HillGenerator,
            textures: TerrainTextureSettings::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextureLayer {
    pub texture: Option<PathBuf>,
    pub uv_scale: f32,
}

impl Default for TextureLayer {
    fn default() -> Self {
        Self {
            texture: None,
            uv_scale: 32.0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainTextureSettings {
    pub layers: Vec<TextureLayer>,
    pub alpha_map: Option<PathBuf>,
    /// Bumped whenever layers are added or removed, so an index taken earlier
    /// can be checked before it is used.
    #[serde(skip)]
    generation: u64,
}

impl TerrainTextureSettings {
    pub const MAX_LAYERS: usize = 12;

    pub fn can_add_layer(&self) -> bool {
        self.layers.len() < Self::MAX_LAYERS
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn add_layer(&mut self) -> bool {
        if !self.can_add_layer() {
            return false;
        }
        self.layers.push(TextureLayer::default());
        self.generation += 1;
        true
    }

    pub fn remove_layer(&mut self, index: usize) -> Option<TextureLayer> {
        if index >= self.layers.len() {
            return None;
        }
        self.generation += 1;
        Some(self.layers.remove(index))
    }

    /// The layer at `index`, unless the layer list changed since `generation`.
    pub fn layer_mut(&mut self, index: usize, generation: u64) -> Option<&mut TextureLayer> {
        if generation != self.generation {
            return None;
        }
        self.layers.get_mut(index)
    }
}

impl PartialEq for TerrainTextureSettings {
    fn eq(&self, other: &Self) -> bool {
        self.layers == other.layers && self.alpha_map == other.alpha_map
    }
}

impl Default for TerrainTextureSettings {
    fn default() -> Self {
        Self {
            layers: vec![TextureLayer::default(); 3],
            alpha_map: None,
            generation: 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TreePrototype {
    pub name: String,
    pub model: Option<PathBuf>,
    pub base_scale: f32,
}

impl TreePrototype {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: None,
            base_scale: 1.0,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VegetationKind {
    Tree,
    Grass,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VegetationLayer {
    pub kind: VegetationKind,
    pub prototype: Option<TreePrototypeRef>,
    /// Instances per 1000 terrain cells
    pub density: f32,
    /// Normalized height band, `0.0..=1.0`
    pub min_height: f32,
    pub max_height: f32,
    /// Maximum slope as rise over run
    pub max_slope: f32,
    pub scale_variation: f32,
}

impl Default for VegetationLayer {
    fn default() -> Self {
        Self {
            kind: VegetationKind::Tree,
            prototype: None,
            density: 2.0,
            min_height: 0.1,
            max_height: 0.7,
            max_slope: 0.8,
            scale_variation: 0.25,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VegetationSettings {
    pub seed: u64,
    pub layers: Vec<VegetationLayer>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplatMapSettings {
    pub size: u32,
    /// Normalized heights where the low/mid/high bands are centered
    pub band_heights: [f32; 3],
    pub steep_slope: f32,
    pub blend_width: f32,
}

impl Default for SplatMapSettings {
    fn default() -> Self {
        Self {
            size: 512,
            band_heights: [0.15, 0.45, 0.8],
            steep_slope: 1.0,
            blend_width: 0.1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseSettings {
    pub size: u32,
    pub seed: u64,
    pub frequency: f32,
    pub octaves: u32,
    pub lacunarity: f32,
    pub gain: f32,
}

impl Default for NoiseSettings {
    fn default() -> Self {
        Self {
            size: 513,
            seed: 1337,
            frequency: 4.0,
            octaves: 5,
            lacunarity: 2.0,
            gain: 0.5,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HillSettings {
    pub size: u32,
    pub seed: u64,
    pub iterations: u32,
    pub min_radius: f32,
    pub max_radius: f32,
    pub flattening: u8,
}

impl Default for HillSettings {
    fn default() -> Self {
        Self {
            size: 513,
            seed: 42,
            iterations: 1000,
            min_radius: 10.0,
            max_radius: 60.0,
            flattening: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_terrain_settings_are_valid() {
        assert_eq!(TerrainSettings::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_sizes_that_are_not_power_of_two_plus_one() {
        let settings = TerrainSettings {
            total_size: 512,
            ..Default::default()
        };
        assert!(settings.validate().unwrap_err().contains("Total size"));
    }

    #[test]
    fn rejects_patch_larger_than_terrain() {
        let settings = TerrainSettings {
            total_size: 65,
            patch_size: 129,
            ..Default::default()
        };
        assert!(settings.validate().unwrap_err().contains("larger"));
    }

    #[test]
    fn texture_layers_are_capped() {
        let mut textures = TerrainTextureSettings::default();
        while textures.add_layer() {}
        assert_eq!(textures.layers.len(), TerrainTextureSettings::MAX_LAYERS);
        assert!(!textures.can_add_layer());
    }

    #[test]
    fn layer_indices_go_stale_when_layers_change() {
        let mut textures = TerrainTextureSettings::default();
        let generation = textures.generation();
        assert!(textures.layer_mut(2, generation).is_some());

        assert!(textures.remove_layer(0).is_some());
        assert!(textures.layer_mut(1, generation).is_none());
        assert!(textures.layer_mut(1, textures.generation()).is_some());

        assert!(textures.remove_layer(7).is_none());
        let generation = textures.generation();
        textures.add_layer();
        assert!(textures.layer_mut(0, generation).is_none());
    }
}
