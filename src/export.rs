use crate::project::Project;
use crate::settings::VegetationKind;
use crate::terrain::{Heightmap, SplatMap};
use anyhow::Context;
use serde::Serialize;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

#[derive(Serialize)]
struct SceneTerrain<'a> {
    size: usize,
    height_scale: f32,
    heights: &'a [f32],
}

#[derive(Serialize)]
struct ScenePlacement<'a> {
    layer: usize,
    kind: VegetationKind,
    prototype: &'a str,
    x: f32,
    y: f32,
    z: f32,
    scale: f32,
}

#[derive(Serialize)]
struct SceneDocument<'a> {
    terrain: Option<SceneTerrain<'a>>,
    vegetation: Vec<ScenePlacement<'a>>,
}

fn scene_document(project: &Project) -> SceneDocument<'_> {
    let terrain = project.scene.terrain.as_deref().map(|t| SceneTerrain {
        size: t.size(),
        height_scale: project.terrain.height_scale,
        heights: t.samples(),
    });
    let vegetation = project
        .scene
        .vegetation
        .iter()
        .map(|p| ScenePlacement {
            layer: p.layer,
            kind: p.kind,
            prototype: project
                .tree_prototypes
                .get(p.prototype)
                .map_or("", |proto| proto.name.as_str()),
            x: p.x,
            y: p.y,
            z: p.z,
            scale: p.scale,
        })
        .collect();
    SceneDocument {
        terrain,
        vegetation,
    }
}

pub fn write_scene_json(project: &Project, path: &Path) -> anyhow::Result<()> {
    let file = fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, &scene_document(project))
        .with_context(|| format!("Failed to write scene {}", path.display()))?;
    writer.flush()?;
    info!(path = %path.display(), "Exported scene");
    Ok(())
}

pub fn write_heightmap_png(terrain: &Heightmap, path: &Path) -> anyhow::Result<()> {
    terrain
        .to_luma16()
        .save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("Failed to write heightmap {}", path.display()))?;
    info!(path = %path.display(), size = terrain.size(), "Exported heightmap");
    Ok(())
}

pub fn write_splat_map_png(splat_map: &SplatMap, path: &Path) -> anyhow::Result<()> {
    splat_map
        .to_rgba8()
        .save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("Failed to write splat map {}", path.display()))?;
    info!(path = %path.display(), size = splat_map.size(), "Exported splat map");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{SplatMapSettings, TreePrototype};
    use crate::terrain::{Placement, generate_splat_map};

    #[test]
    fn heightmap_png_spans_full_range() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("height.png");
        let terrain = Heightmap::from_samples(2, vec![10.0, 20.0, 30.0, 40.0]).unwrap();

        write_heightmap_png(&terrain, &path).unwrap();

        let image = image::open(&path).unwrap().into_luma16();
        assert_eq!(image.dimensions(), (2, 2));
        assert_eq!(image.get_pixel(0, 0).0[0], 0);
        assert_eq!(image.get_pixel(1, 1).0[0], u16::MAX);

        let reloaded = Heightmap::load_image(&path).unwrap();
        assert_eq!(reloaded.get(1, 1), 1.0);
    }

    #[test]
    fn splat_png_has_rgba_weights() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("splat.png");
        let terrain = Heightmap::from_samples(2, vec![0.0, 0.5, 0.5, 1.0]).unwrap();
        let splat = generate_splat_map(
            &terrain,
            &SplatMapSettings {
                size: 4,
                ..Default::default()
            },
        )
        .unwrap();

        write_splat_map_png(&splat, &path).unwrap();

        let image = image::open(&path).unwrap().into_rgba8();
        assert_eq!(image.dimensions(), (4, 4));
        assert_eq!(image.get_pixel(0, 0).0, splat.pixels()[0]);
    }

    #[test]
    fn scene_json_names_prototypes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.json");
        let mut project = Project::default();
        let pine = project.tree_prototypes.insert(TreePrototype::named("Pine"));
        project.scene.set_terrain(Heightmap::flat(2));
        project.scene.set_vegetation(vec![Placement {
            layer: 0,
            kind: VegetationKind::Tree,
            prototype: pine,
            x: 0.5,
            y: 0.0,
            z: 0.5,
            scale: 1.0,
        }]);

        write_scene_json(&project, &path).unwrap();

        let doc: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(doc["terrain"]["size"], 2);
        assert_eq!(doc["vegetation"][0]["prototype"], "Pine");
        assert_eq!(doc["vegetation"][0]["kind"], "Tree");
    }
}
