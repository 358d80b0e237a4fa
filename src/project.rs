use crate::export;
use crate::settings::{
    HillSettings, NoiseSettings, SplatMapSettings, TerrainSettings, TreePrototype,
    TreePrototypeRef, VegetationSettings,
};
use crate::terrain::{Heightmap, Placement, SplatMap};
use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub const PROJECT_FORMAT_VERSION: u32 = 1;

/// Generated content. Rebuilt from the settings, never written to the project file.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    pub terrain: Option<Arc<Heightmap>>,
    pub vegetation: Arc<Vec<Placement>>,
    /// Bumped on every change so previews know when to refresh
    pub revision: u64,
}

impl Scene {
    pub fn set_terrain(&mut self, terrain: Heightmap) {
        self.terrain = Some(Arc::new(terrain));
        self.vegetation = Arc::default();
        self.revision += 1;
    }

    pub fn set_vegetation(&mut self, vegetation: Vec<Placement>) {
        self.vegetation = Arc::new(vegetation);
        self.revision += 1;
    }

    pub fn require_terrain(&self) -> anyhow::Result<Arc<Heightmap>> {
        self.terrain
            .clone()
            .context("No terrain has been generated yet")
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Project {
    pub terrain: TerrainSettings,
    pub tree_prototypes: SlotMap<TreePrototypeRef, TreePrototype>,
    pub vegetation: VegetationSettings,
    pub splat_generator: SplatMapSettings,
    pub noise_generator: NoiseSettings,
    pub hill_generator: HillSettings,
    #[serde(skip)]
    pub scene: Scene,
}

#[derive(Serialize)]
struct ProjectFileRef<'p> {
    format_version: u32,
    #[serde(flatten)]
    project: &'p Project,
}

#[derive(Deserialize)]
struct ProjectFile {
    format_version: u32,
    #[serde(flatten)]
    project: Project,
}

pub fn validate_project_path(path: &Path) -> Result<(), String> {
    if !path.is_file() {
        return Err("Not a file".into());
    }
    if path.extension().is_none_or(|ext| !ext.eq_ignore_ascii_case("json")) {
        return Err("Project files must have a .json extension".into());
    }
    Ok(())
}

pub fn load_project(path: &Path) -> anyhow::Result<Project> {
    validate_project_path(path)
        .map_err(|e| anyhow::anyhow!("{}: {e}", path.display()))?;
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read project {}", path.display()))?;
    let file: ProjectFile = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse project {}", path.display()))?;
    if file.format_version > PROJECT_FORMAT_VERSION {
        bail!(
            "Project {} uses format version {}, newest supported is {PROJECT_FORMAT_VERSION}",
            path.display(),
            file.format_version
        );
    }
    info!(path = %path.display(), "Loaded project");
    Ok(file.project)
}

pub fn save_project(path: &Path, project: &Project) -> anyhow::Result<()> {
    let file = fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(
        &mut writer,
        &ProjectFileRef {
            format_version: PROJECT_FORMAT_VERSION,
            project,
        },
    )
    .with_context(|| format!("Failed to write project {}", path.display()))?;
    writer.flush()?;
    info!(path = %path.display(), "Saved project");
    Ok(())
}

/// Everything that touches the disk on behalf of the menu actions.
pub trait Persistence: Send + Sync {
    fn load_project(&self, path: &Path) -> anyhow::Result<Project>;
    fn save_project(&self, path: &Path, project: &Project) -> anyhow::Result<()>;
    fn export_scene(&self, project: &Project, path: &Path) -> anyhow::Result<()>;
    fn export_heightmap(&self, terrain: &Heightmap, path: &Path) -> anyhow::Result<()>;
    fn export_splat_map(&self, splat_map: &SplatMap, path: &Path) -> anyhow::Result<()>;
}

pub struct DiskPersistence;

impl Persistence for DiskPersistence {
    fn load_project(&self, path: &Path) -> anyhow::Result<Project> {
        load_project(path)
    }

    fn save_project(&self, path: &Path, project: &Project) -> anyhow::Result<()> {
        save_project(path, project)
    }

    fn export_scene(&self, project: &Project, path: &Path) -> anyhow::Result<()> {
        export::write_scene_json(project, path)
    }

    fn export_heightmap(&self, terrain: &Heightmap, path: &Path) -> anyhow::Result<()> {
        export::write_heightmap_png(terrain, path)
    }

    fn export_splat_map(&self, splat_map: &SplatMap, path: &Path) -> anyhow::Result<()> {
        export::write_splat_map_png(splat_map, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{HeightmapSource, VegetationLayer};

    fn sample_project() -> Project {
        let mut project = Project::default();
        project.terrain.height_scale = 250.0;
        project.terrain.source = HeightmapSource::Image("hills.png".into());
        project.terrain.textures.layers[1].texture = Some("grass.png".into());
        let oak = project.tree_prototypes.insert(TreePrototype::named("Oak"));
        project.vegetation.layers.push(VegetationLayer {
            prototype: Some(oak),
            ..Default::default()
        });
        project.scene.set_terrain(Heightmap::flat(3));
        project
    }

    #[test]
    fn save_then_load_keeps_settings_but_not_scene() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("project.json");
        let project = sample_project();

        save_project(&path, &project).unwrap();
        let loaded = load_project(&path).unwrap();

        assert_eq!(loaded.terrain, project.terrain);
        assert_eq!(loaded.vegetation, project.vegetation);
        assert_eq!(loaded.tree_prototypes.len(), 1);
        let (oak_ref, oak) = loaded.tree_prototypes.iter().next().unwrap();
        assert_eq!(oak.name, "Oak");
        assert_eq!(loaded.vegetation.layers[0].prototype, Some(oak_ref));
        assert!(loaded.scene.terrain.is_none());
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.json");
        fs::write(&path, r#"{ "format_version": 1, "terrain": { "height_scale": 12.0 } }"#)
            .unwrap();

        let loaded = load_project(&path).unwrap();
        assert_eq!(loaded.terrain.height_scale, 12.0);
        assert_eq!(loaded.terrain.total_size, TerrainSettings::default().total_size);
        assert_eq!(loaded.noise_generator, NoiseSettings::default());
    }

    #[test]
    fn rejects_newer_format_versions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("future.json");
        fs::write(&path, r#"{ "format_version": 99 }"#).unwrap();

        let err = load_project(&path).unwrap_err();
        assert!(err.to_string().contains("format version 99"));
    }

    #[test]
    fn rejects_non_json_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("project.txt");
        fs::write(&path, "{}").unwrap();

        assert!(validate_project_path(&path).is_err());
        assert!(validate_project_path(dir.path()).is_err());
        assert!(load_project(&path).is_err());
    }

    #[test]
    fn new_terrain_clears_vegetation_and_bumps_revision() {
        let mut scene = Scene::default();
        scene.set_vegetation(Vec::new());
        let before = scene.revision;
        scene.set_terrain(Heightmap::flat(2));
        assert!(scene.revision > before);
        assert!(scene.vegetation.is_empty());
        assert!(scene.require_terrain().is_ok());
    }
}
