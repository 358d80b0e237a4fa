use crate::terrain::{Heightmap, SplatMap};
use egui::cache::CacheTrait;
use egui::{Color32, ColorImage, Context, Id, TextureFilter, TextureHandle, TextureOptions};
use std::any::Any;
use std::collections::HashMap;

pub mod alerts;
pub mod file_actions;
pub mod promise;
pub mod registry;
pub mod views;

const MAX_PREVIEW_SIZE: usize = 512;

#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
pub struct PreviewKey {
    /// Owner of the preview, e.g. a dialog's stable id
    pub source: Id,
    pub revision: u64,
}

#[derive(Default)]
pub struct PreviewTextureCache {
    /// Incremented every eviction pass
    update_counter: u32,
    /// Tuple contains the value of `update_counter` on last use.
    entries: HashMap<PreviewKey, (u32, TextureHandle)>,
}

impl PreviewTextureCache {
    fn for_context<T>(ctx: &Context, operation: impl FnOnce(&mut Self) -> T) -> T {
        ctx.memory_mut(|mem| operation(mem.caches.cache::<Self>()))
    }

    fn get(&mut self, key: &PreviewKey) -> Option<&TextureHandle> {
        let (last_use, value) = self.entries.get_mut(key)?;
        *last_use = self.update_counter;
        Some(value)
    }

    fn insert(&mut self, key: PreviewKey, value: TextureHandle) -> &TextureHandle {
        let (_, value) = self
            .entries
            .entry(key)
            .and_modify(|(last_use, _)| *last_use = self.update_counter)
            .or_insert((self.update_counter, value));
        value
    }

    pub fn get_or_insert_with(
        ctx: &Context,
        key: PreviewKey,
        f: impl FnOnce() -> ColorImage,
    ) -> TextureHandle {
        if let Some(cached) = Self::for_context(ctx, |cache| cache.get(&key).cloned()) {
            return cached;
        }
        let texture = ctx.load_texture(
            format!("preview[{:?}]-rev[{}]", key.source, key.revision),
            f(),
            TextureOptions {
                magnification: TextureFilter::Nearest,
                ..TextureOptions::LINEAR
            },
        );
        Self::for_context(ctx, |cache| cache.insert(key, texture).clone())
    }
}

impl CacheTrait for PreviewTextureCache {
    fn update(&mut self) {
        const MAX_AGE: u32 = 30;

        self.entries
            .retain(|_, (last_use, _)| self.update_counter.wrapping_sub(*last_use) < MAX_AGE);
        self.update_counter = self.update_counter.wrapping_add(1);
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

fn preview_dimension(size: usize) -> usize {
    size.clamp(1, MAX_PREVIEW_SIZE)
}

pub fn heightmap_to_image(heightmap: &Heightmap) -> ColorImage {
    let dim = preview_dimension(heightmap.size());
    let (lo, hi) = heightmap.min_max();
    let range = hi - lo;
    let max = (dim - 1).max(1) as f32;

    let mut pixels = Vec::with_capacity(dim * dim);
    for y in 0..dim {
        for x in 0..dim {
            let v = heightmap.sample(x as f32 / max, y as f32 / max);
            let n = if range > f32::EPSILON {
                (v - lo) / range
            } else {
                0.0
            };
            pixels.push(Color32::from_gray((n * 255.0).round() as u8));
        }
    }
    ColorImage::new([dim, dim], pixels)
}

pub fn splat_map_to_image(splat_map: &SplatMap) -> ColorImage {
    const BAND_COLORS: [[f32; 3]; 4] = [
        [194.0, 178.0, 128.0],
        [86.0, 125.0, 70.0],
        [230.0, 230.0, 235.0],
        [110.0, 100.0, 95.0],
    ];

    let size = splat_map.size();
    let pixels = splat_map
        .pixels()
        .iter()
        .map(|weights| {
            let mut rgb = [0.0f32; 3];
            for (&w, color) in weights.iter().zip(&BAND_COLORS) {
                for (c, &band) in rgb.iter_mut().zip(color) {
                    *c += f32::from(w) / 255.0 * band;
                }
            }
            let [r, g, b] = rgb.map(|c| c.round().clamp(0.0, 255.0) as u8);
            Color32::from_rgb(r, g, b)
        })
        .collect();
    ColorImage::new([size, size], pixels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heightmap_preview_is_grayscale_and_capped() {
        let samples = (0..9).map(|i| i as f32).collect();
        let small = Heightmap::from_samples(3, samples).unwrap();
        let image = heightmap_to_image(&small);
        assert_eq!(image.size, [3, 3]);
        assert_eq!(image.pixels[0], Color32::from_gray(0));
        assert_eq!(image.pixels[8], Color32::from_gray(255));

        let big = Heightmap::flat(1025);
        assert_eq!(heightmap_to_image(&big).size, [MAX_PREVIEW_SIZE; 2]);
    }
}
