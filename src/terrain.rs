use crate::settings::{
    HeightmapSource, HillSettings, NoiseSettings, SplatMapSettings, TerrainSettings,
    TreePrototype, TreePrototypeRef, VegetationKind, VegetationSettings,
};
use crate::util::{SplitMix64, hash_2d};
use anyhow::{Context, bail};
use image::{ImageBuffer, Luma, Rgba};
use serde::Serialize;
use slotmap::SlotMap;
use std::path::Path;
use tracing::{debug, warn};

const MAX_GENERATED_SIZE: u32 = 4097;

/// Square grid of terrain heights, stored row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct Heightmap {
    size: usize,
    samples: Vec<f32>,
}

impl Heightmap {
    pub fn flat(size: usize) -> Self {
        Self {
            size,
            samples: vec![0.0; size * size],
        }
    }

    pub fn from_samples(size: usize, samples: Vec<f32>) -> anyhow::Result<Self> {
        if samples.len() != size * size {
            bail!(
                "Heightmap of size {size} needs {} samples, got {}",
                size * size,
                samples.len()
            );
        }
        Ok(Self { size, samples })
    }

    pub fn load_image(path: &Path) -> anyhow::Result<Self> {
        let image = image::open(path)
            .with_context(|| format!("Failed to load heightmap image {}", path.display()))?
            .into_luma16();
        let (width, height) = image.dimensions();
        let size = width.max(height) as usize;
        if size < 2 {
            bail!("Heightmap image {} is too small", path.display());
        }

        // Non-square images are stretched onto the square grid
        let mut samples = Vec::with_capacity(size * size);
        for y in 0..size {
            for x in 0..size {
                let src_x = (x * (width as usize - 1)) / (size - 1);
                let src_y = (y * (height as usize - 1)) / (size - 1);
                let Luma([v]) = image.get_pixel(src_x as u32, src_y as u32);
                samples.push(f32::from(*v) / f32::from(u16::MAX));
            }
        }
        Ok(Self { size, samples })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.samples[y * self.size + x]
    }

    pub fn min_max(&self) -> (f32, f32) {
        self.samples
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            })
    }

    /// Rescales the heights into `0.0..=1.0`. A flat map becomes all zero.
    pub fn normalized(mut self) -> Self {
        let (lo, hi) = self.min_max();
        let range = hi - lo;
        for v in &mut self.samples {
            *v = if range > f32::EPSILON {
                (*v - lo) / range
            } else {
                0.0
            };
        }
        self
    }

    pub fn scaled(mut self, factor: f32) -> Self {
        for v in &mut self.samples {
            *v *= factor;
        }
        self
    }

    /// Bilinear lookup with `u`, `v` in `0.0..=1.0`.
    pub fn sample(&self, u: f32, v: f32) -> f32 {
        let max = (self.size - 1) as f32;
        let fx = (u.clamp(0.0, 1.0) * max).min(max);
        let fy = (v.clamp(0.0, 1.0) * max).min(max);
        let (x0, y0) = (fx.floor() as usize, fy.floor() as usize);
        let (x1, y1) = ((x0 + 1).min(self.size - 1), (y0 + 1).min(self.size - 1));
        let (tx, ty) = (fx - x0 as f32, fy - y0 as f32);

        let top = self.get(x0, y0) * (1.0 - tx) + self.get(x1, y0) * tx;
        let bottom = self.get(x0, y1) * (1.0 - tx) + self.get(x1, y1) * tx;
        top * (1.0 - ty) + bottom * ty
    }

    pub fn resampled(self, size: usize) -> Self {
        if size == self.size {
            return self;
        }
        let max = (size - 1).max(1) as f32;
        let mut samples = Vec::with_capacity(size * size);
        for y in 0..size {
            for x in 0..size {
                samples.push(self.sample(x as f32 / max, y as f32 / max));
            }
        }
        Self { size, samples }
    }

    /// Steepness at a grid point as rise over run, one cell being one unit.
    pub fn slope(&self, x: usize, y: usize) -> f32 {
        let last = self.size - 1;
        let (xl, xr) = (x.saturating_sub(1), (x + 1).min(last));
        let (yu, yd) = (y.saturating_sub(1), (y + 1).min(last));
        let dx = (self.get(xr, y) - self.get(xl, y)) / (xr - xl).max(1) as f32;
        let dy = (self.get(x, yd) - self.get(x, yu)) / (yd - yu).max(1) as f32;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn to_luma16(&self) -> ImageBuffer<Luma<u16>, Vec<u16>> {
        let (lo, hi) = self.min_max();
        let range = hi - lo;
        let size = self.size as u32;
        ImageBuffer::from_fn(size, size, |x, y| {
            let v = self.get(x as usize, y as usize);
            let n = if range > f32::EPSILON {
                (v - lo) / range
            } else {
                0.0
            };
            Luma([(n * f32::from(u16::MAX)).round() as u16])
        })
    }
}

/// RGBA weight map; R/G/B are the low/mid/high height bands, A is steep ground.
#[derive(Clone, Debug, PartialEq)]
pub struct SplatMap {
    size: usize,
    pixels: Vec<[u8; 4]>,
}

impl SplatMap {
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn pixels(&self) -> &[[u8; 4]] {
        &self.pixels
    }

    pub fn to_rgba8(&self) -> ImageBuffer<Rgba<u8>, Vec<u8>> {
        let size = self.size as u32;
        ImageBuffer::from_fn(size, size, |x, y| {
            Rgba(self.pixels[y as usize * self.size + x as usize])
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Placement {
    pub layer: usize,
    pub kind: VegetationKind,
    #[serde(skip)]
    pub prototype: TreePrototypeRef,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub scale: f32,
}

fn check_generated_size(size: u32) -> anyhow::Result<usize> {
    if !(2..=MAX_GENERATED_SIZE).contains(&size) {
        bail!("Generated size must be between 2 and {MAX_GENERATED_SIZE}, got {size}");
    }
    Ok(size as usize)
}

/// Accumulates random paraboloid hills, then normalizes and flattens.
pub fn generate_hills(settings: &HillSettings) -> anyhow::Result<Heightmap> {
    let size = check_generated_size(settings.size)?;
    if !(settings.min_radius > 0.0 && settings.min_radius <= settings.max_radius) {
        bail!(
            "Hill radii must satisfy 0 < min <= max, got {}..{}",
            settings.min_radius,
            settings.max_radius
        );
    }

    let mut rng = SplitMix64::new(settings.seed);
    let mut heights = Heightmap::flat(size);
    let extent = size as f32;
    for _ in 0..settings.iterations {
        let radius = rng.range_f32(settings.min_radius, settings.max_radius);
        let cx = rng.range_f32(-radius, extent + radius);
        let cy = rng.range_f32(-radius, extent + radius);
        let r2 = radius * radius;

        let x_range = (cx - radius).max(0.0) as usize..((cx + radius).ceil().max(0.0) as usize).min(size);
        let y_range = (cy - radius).max(0.0) as usize..((cy + radius).ceil().max(0.0) as usize).min(size);
        for y in y_range {
            for x in x_range.clone() {
                let d2 = (x as f32 - cx).powi(2) + (y as f32 - cy).powi(2);
                if d2 < r2 {
                    heights.samples[y * size + x] += r2 - d2;
                }
            }
        }
    }

    let mut heights = heights.normalized();
    if settings.flattening > 1 {
        for v in &mut heights.samples {
            *v = v.powi(i32::from(settings.flattening));
        }
    }
    debug!(size, iterations = settings.iterations, "Generated hill heightmap");
    Ok(heights)
}

fn smooth(t: f32) -> f32 {
    t * t * (3.0 - 2.0 * t)
}

fn value_noise(seed: u64, x: f32, y: f32) -> f32 {
    let (x0, y0) = (x.floor() as i32, y.floor() as i32);
    let (tx, ty) = (smooth(x - x0 as f32), smooth(y - y0 as f32));
    let a = hash_2d(seed, x0, y0);
    let b = hash_2d(seed, x0 + 1, y0);
    let c = hash_2d(seed, x0, y0 + 1);
    let d = hash_2d(seed, x0 + 1, y0 + 1);
    let top = a + (b - a) * tx;
    let bottom = c + (d - c) * tx;
    top + (bottom - top) * ty
}

/// Fractal value noise, normalized to `0.0..=1.0`.
pub fn generate_noise(settings: &NoiseSettings) -> anyhow::Result<Heightmap> {
    let size = check_generated_size(settings.size)?;
    if settings.octaves == 0 || settings.octaves > 12 {
        bail!("Octaves must be between 1 and 12, got {}", settings.octaves);
    }
    if !(settings.frequency > 0.0) {
        bail!("Frequency must be positive");
    }

    let max = (size - 1) as f32;
    let mut samples = Vec::with_capacity(size * size);
    for y in 0..size {
        for x in 0..size {
            let (u, v) = (x as f32 / max, y as f32 / max);
            let mut frequency = settings.frequency;
            let mut amplitude = 1.0;
            let mut total = 0.0;
            for octave in 0..settings.octaves {
                let octave_seed = settings.seed.wrapping_add(u64::from(octave));
                total += amplitude * value_noise(octave_seed, u * frequency, v * frequency);
                frequency *= settings.lacunarity;
                amplitude *= settings.gain;
            }
            samples.push(total);
        }
    }
    debug!(size, octaves = settings.octaves, "Generated noise heightmap");
    Ok(Heightmap::from_samples(size, samples)?.normalized())
}

/// Rebuilds the terrain heights described by `settings`, in world units.
pub fn build_terrain(
    settings: &TerrainSettings,
    hills: &HillSettings,
    noise: &NoiseSettings,
) -> anyhow::Result<Heightmap> {
    settings.validate().map_err(anyhow::Error::msg)?;
    let normalized = match &settings.source {
        HeightmapSource::Flat => Heightmap::flat(settings.total_size as usize),
        HeightmapSource::Image(path) => Heightmap::load_image(path)?.normalized(),
        HeightmapSource::HillGenerator => generate_hills(hills)?,
        HeightmapSource::NoiseGenerator => generate_noise(noise)?,
    };
    Ok(normalized
        .resampled(settings.total_size as usize)
        .scaled(settings.height_scale))
}

fn band_weights(h: f32, centers: [f32; 3]) -> [f32; 3] {
    let [c0, c1, c2] = centers;
    if h <= c0 {
        [1.0, 0.0, 0.0]
    } else if h < c1 {
        let t = (h - c0) / (c1 - c0).max(f32::EPSILON);
        [1.0 - t, t, 0.0]
    } else if h < c2 {
        let t = (h - c1) / (c2 - c1).max(f32::EPSILON);
        [0.0, 1.0 - t, t]
    } else {
        [0.0, 0.0, 1.0]
    }
}

pub fn generate_splat_map(
    terrain: &Heightmap,
    settings: &SplatMapSettings,
) -> anyhow::Result<SplatMap> {
    let size = check_generated_size(settings.size)?;
    let [c0, c1, c2] = settings.band_heights;
    if !(c0 <= c1 && c1 <= c2) {
        bail!("Band heights must be ascending");
    }

    let (lo, hi) = terrain.min_max();
    let range = (hi - lo).max(f32::EPSILON);
    let max = (size - 1) as f32;
    let terrain_max = (terrain.size() - 1) as f32;
    let blend = settings.blend_width.max(f32::EPSILON);

    let mut pixels = Vec::with_capacity(size * size);
    for y in 0..size {
        for x in 0..size {
            let (u, v) = (x as f32 / max, y as f32 / max);
            let h = (terrain.sample(u, v) - lo) / range;
            let slope = terrain.slope(
                (u * terrain_max).round() as usize,
                (v * terrain_max).round() as usize,
            );
            let steep = smooth(
                ((slope - settings.steep_slope + blend) / (2.0 * blend)).clamp(0.0, 1.0),
            );
            let [r, g, b] = band_weights(h, settings.band_heights).map(|w| w * (1.0 - steep));
            pixels.push([r, g, b, steep].map(|w| (w * 255.0).round() as u8));
        }
    }
    Ok(SplatMap { size, pixels })
}

pub fn populate_vegetation(
    terrain: &Heightmap,
    settings: &VegetationSettings,
    prototypes: &SlotMap<TreePrototypeRef, TreePrototype>,
) -> Vec<Placement> {
    let (lo, hi) = terrain.min_max();
    let range = (hi - lo).max(f32::EPSILON);
    let cells = ((terrain.size() - 1) * (terrain.size() - 1)) as f32;
    let extent = (terrain.size() - 1) as f32;

    let mut placements = Vec::new();
    for (index, layer) in settings.layers.iter().enumerate() {
        let Some((prototype_ref, prototype)) = layer
            .prototype
            .and_then(|r| prototypes.get(r).map(|p| (r, p)))
        else {
            warn!(layer = index, "Vegetation layer has no valid prototype, skipping");
            continue;
        };

        let mut rng = SplitMix64::new(settings.seed.wrapping_add(index as u64));
        let wanted = (layer.density.max(0.0) * cells / 1000.0).round() as usize;
        let mut placed = 0;
        for _ in 0..wanted * 4 {
            if placed == wanted {
                break;
            }
            let (x, z) = (rng.range_f32(0.0, extent), rng.range_f32(0.0, extent));
            let y = terrain.sample(x / extent, z / extent);
            let h = (y - lo) / range;
            if h < layer.min_height || h > layer.max_height {
                continue;
            }
            if terrain.slope(x.round() as usize, z.round() as usize) > layer.max_slope {
                continue;
            }
            let variation = layer.scale_variation * (rng.next_f32() * 2.0 - 1.0);
            placements.push(Placement {
                layer: index,
                kind: layer.kind,
                prototype: prototype_ref,
                x,
                y,
                z,
                scale: prototype.base_scale * (1.0 + variation),
            });
            placed += 1;
        }
        debug!(layer = index, placed, wanted, "Populated vegetation layer");
    }
    placements
}
