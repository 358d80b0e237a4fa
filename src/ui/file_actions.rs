//! Menu actions that prompt for a path and hand it to the persistence layer.

use crate::project::{Persistence, Project};
use crate::settings::TreePrototypeRef;
use crate::terrain::{Heightmap, SplatMap};
use crate::ui::promise::{LocalBoxFuture, Promise};
use blocking::{Task, unblock};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::task::Waker;
use tracing::{debug, info};

const TEXTURE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "tga", "dds", "hdr", "pfm", "bmp",
];
const MODEL_EXTENSIONS: &[&str] = &[
    "gltf", "glb", "j3o", "fbx", "xbuf", "obj", "xml", "meshxml",
];
const HEIGHTMAP_IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tga", "gif"];
const ALL_FILES: &[&str] = &["*"];
const JSON: &[&str] = &["json"];
const PNG: &[&str] = &["png"];

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FileCategory {
    Texture,
    Model,
    HeightmapImage,
    ProjectJson,
    SceneJson,
    PngImage,
}

impl FileCategory {
    pub fn filters(self) -> Vec<(&'static str, &'static [&'static str])> {
        match self {
            FileCategory::Texture => {
                vec![("Texture Files", TEXTURE_EXTENSIONS), ("All Files", ALL_FILES)]
            }
            FileCategory::Model => vec![("Model Files", MODEL_EXTENSIONS), ("All Files", ALL_FILES)],
            FileCategory::HeightmapImage => vec![("Heightmap Image", HEIGHTMAP_IMAGE_EXTENSIONS)],
            FileCategory::ProjectJson => vec![("JSON File", JSON)],
            FileCategory::SceneJson => vec![("Scene JSON", JSON)],
            FileCategory::PngImage => vec![("PNG File", PNG)],
        }
    }

    /// Whether the prompt should start in the asset directory.
    pub fn is_asset(self) -> bool {
        matches!(
            self,
            FileCategory::Texture | FileCategory::Model | FileCategory::HeightmapImage
        )
    }

    pub fn accepts(self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        self.filters()
            .iter()
            .flat_map(|(_, exts)| exts.iter())
            .any(|&allowed| allowed != "*" && allowed.eq_ignore_ascii_case(ext))
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TextureSlot {
    /// A layer position, valid only while the layer list is at `generation`
    Layer { index: usize, generation: u64 },
    AlphaMap,
}

#[derive(Clone, Debug, PartialEq)]
pub enum FileAction {
    OpenProject,
    SaveProject,
    ExportScene,
    ExportHeightmap,
    SaveGeneratedHeightmap(Arc<Heightmap>),
    SaveSplatMap(Arc<SplatMap>),
    PickHeightmapImage,
    PickTexture(TextureSlot),
    PickModel(TreePrototypeRef),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PromptKind {
    Open,
    Save,
}

impl FileAction {
    pub fn title(&self) -> &'static str {
        match self {
            FileAction::OpenProject => "Open Project",
            FileAction::SaveProject => "Save Project",
            FileAction::ExportScene => "Export Scene",
            FileAction::ExportHeightmap => "Export Terrain to Heightmap",
            FileAction::SaveGeneratedHeightmap(_) => "Save Heightmap",
            FileAction::SaveSplatMap(_) => "Save Splat Map",
            FileAction::PickHeightmapImage => "Import Heightmap",
            FileAction::PickTexture(_) => "Import Texture",
            FileAction::PickModel(_) => "Import Model",
        }
    }

    pub fn category(&self) -> FileCategory {
        match self {
            FileAction::OpenProject | FileAction::SaveProject => FileCategory::ProjectJson,
            FileAction::ExportScene => FileCategory::SceneJson,
            FileAction::ExportHeightmap
            | FileAction::SaveGeneratedHeightmap(_)
            | FileAction::SaveSplatMap(_) => FileCategory::PngImage,
            FileAction::PickHeightmapImage => FileCategory::HeightmapImage,
            FileAction::PickTexture(_) => FileCategory::Texture,
            FileAction::PickModel(_) => FileCategory::Model,
        }
    }

    pub fn prompt_kind(&self) -> PromptKind {
        match self {
            FileAction::OpenProject
            | FileAction::PickHeightmapImage
            | FileAction::PickTexture(_)
            | FileAction::PickModel(_) => PromptKind::Open,
            _ => PromptKind::Save,
        }
    }

    fn default_file_name(&self) -> Option<&'static str> {
        match self {
            FileAction::SaveProject => Some("terrain_project.json"),
            FileAction::ExportScene => Some("scene.json"),
            FileAction::ExportHeightmap | FileAction::SaveGeneratedHeightmap(_) => {
                Some("heightmap.png")
            }
            FileAction::SaveSplatMap(_) => Some("splatmap.png"),
            _ => None,
        }
    }

    /// Picks only record the chosen path and never touch the disk.
    pub fn is_pick(&self) -> bool {
        matches!(
            self,
            FileAction::PickHeightmapImage | FileAction::PickTexture(_) | FileAction::PickModel(_)
        )
    }

    pub fn prompt(&self, parent: &eframe::Frame, asset_dir: &Path) -> LocalBoxFuture<Option<PathBuf>> {
        let category = self.category();
        let mut dialog = rfd::AsyncFileDialog::new()
            .set_title(self.title())
            .set_parent(parent);
        for (name, extensions) in category.filters() {
            dialog = dialog.add_filter(name, extensions);
        }
        if category.is_asset() {
            dialog = dialog.set_directory(asset_dir);
        }
        if let Some(name) = self.default_file_name() {
            dialog = dialog.set_file_name(name);
        }

        match self.prompt_kind() {
            PromptKind::Open => Box::pin(async move {
                dialog.pick_file().await.map(|h| h.path().to_path_buf())
            }),
            PromptKind::Save => Box::pin(async move {
                dialog.save_file().await.map(|h| h.path().to_path_buf())
            }),
        }
    }
}

pub enum ActionOutcome {
    ProjectLoaded(Box<Project>),
    ProjectSaved(PathBuf),
    Exported(PathBuf),
    HeightmapImagePicked(PathBuf),
    TexturePicked(TextureSlot, PathBuf),
    ModelPicked(TreePrototypeRef, PathBuf),
}

/// Forwards a chosen path to the collaborator. Runs off the UI thread.
pub fn perform(
    action: &FileAction,
    path: PathBuf,
    snapshot: &Project,
    persistence: &dyn Persistence,
) -> anyhow::Result<ActionOutcome> {
    match action {
        FileAction::OpenProject => {
            let project = persistence.load_project(&path)?;
            Ok(ActionOutcome::ProjectLoaded(Box::new(project)))
        }
        FileAction::SaveProject => {
            persistence.save_project(&path, snapshot)?;
            Ok(ActionOutcome::ProjectSaved(path))
        }
        FileAction::ExportScene => {
            persistence.export_scene(snapshot, &path)?;
            Ok(ActionOutcome::Exported(path))
        }
        FileAction::ExportHeightmap => {
            let terrain = snapshot.scene.require_terrain()?;
            persistence.export_heightmap(&terrain, &path)?;
            Ok(ActionOutcome::Exported(path))
        }
        FileAction::SaveGeneratedHeightmap(heightmap) => {
            persistence.export_heightmap(heightmap, &path)?;
            Ok(ActionOutcome::Exported(path))
        }
        FileAction::SaveSplatMap(splat_map) => {
            persistence.export_splat_map(splat_map, &path)?;
            Ok(ActionOutcome::Exported(path))
        }
        FileAction::PickHeightmapImage => Ok(ActionOutcome::HeightmapImagePicked(path)),
        FileAction::PickTexture(slot) => Ok(ActionOutcome::TexturePicked(*slot, path)),
        FileAction::PickModel(prototype) => Ok(ActionOutcome::ModelPicked(*prototype, path)),
    }
}

/// One prompt-then-I/O action at a time; further requests are dropped until it settles.
pub struct FileActions {
    persistence: Arc<dyn Persistence>,
    current: Option<FileAction>,
    prompt: Promise<LocalBoxFuture<Option<PathBuf>>>,
    work: Promise<Task<anyhow::Result<ActionOutcome>>>,
}

impl FileActions {
    pub fn new(waker: Waker, persistence: Arc<dyn Persistence>) -> Self {
        Self {
            persistence,
            current: None,
            prompt: Promise::new(waker.clone()),
            work: Promise::new(waker),
        }
    }

    pub fn current(&self) -> Option<&FileAction> {
        self.current.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        self.current.is_some()
    }

    /// Whether the prompt is closed and the I/O is running.
    pub fn is_working(&self) -> bool {
        self.work.is_pending()
    }

    pub fn request(&mut self, action: FileAction, prompt: LocalBoxFuture<Option<PathBuf>>) -> bool {
        if let Some(current) = &self.current {
            debug!(requested = action.title(), busy = current.title(), "File action coalesced");
            return false;
        }
        self.current = Some(action);
        self.prompt.launch(prompt);
        true
    }

    /// Advances the current action. `project` is snapshotted when a path is chosen.
    pub fn poll(&mut self, project: &Project) -> Option<anyhow::Result<ActionOutcome>> {
        if let Some(choice) = self.prompt.take_response()
            && let Some(action) = self.current.clone()
        {
            let Some(path) = choice else {
                debug!(action = action.title(), "File prompt cancelled");
                self.current = None;
                return None;
            };
            if action.is_pick() {
                self.current = None;
                return Some(perform(&action, path, project, self.persistence.as_ref()));
            }

            info!(action = action.title(), path = %path.display(), "Starting file action");
            let snapshot = project.clone();
            let persistence = self.persistence.clone();
            self.work.launch(unblock(move || {
                perform(&action, path, &snapshot, persistence.as_ref())
            }));
        }

        let result = self.work.take_response()?;
        self.current = None;
        Some(result)
    }
}
