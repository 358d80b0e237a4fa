mod generators;
mod terrain_manager;
mod texture_manager;
mod tree_manager;
mod tree_prototype_manager;
mod workspace;

use crate::project::Project;
use crate::ui::file_actions::FileAction;
use egui::{Context, Id, Ui, Vec2};

pub use workspace::Workspace;

/// One registry key per editor surface.
#[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
pub enum DialogKey {
    TerrainSettings,
    TerrainTextureSettings,
    TreePrototypeManager,
    TreeManager,
    SplatMapGenerator,
    NoiseHeightmapGenerator,
    HillHeightmapGenerator,
}

impl DialogKey {
    pub const ALL: [DialogKey; 7] = [
        DialogKey::TerrainSettings,
        DialogKey::TerrainTextureSettings,
        DialogKey::TreePrototypeManager,
        DialogKey::TreeManager,
        DialogKey::SplatMapGenerator,
        DialogKey::NoiseHeightmapGenerator,
        DialogKey::HillHeightmapGenerator,
    ];
}

/// What a dialog asks the workspace to do on its behalf.
#[derive(Debug)]
pub enum Request {
    File(FileAction),
    RebuildTerrain,
    PopulateVegetation,
    Error(String),
}

trait EditorWindow {
    fn title(&self, project: &Project) -> String;
    fn stable_id(&self) -> Id;
    fn default_size(&self) -> Vec2;
    fn show_contents(&mut self, project: &mut Project, requests: &mut Vec<Request>, ui: &mut Ui);

    /// Returns `false` once the user closed the window.
    fn show_window(
        &mut self,
        project: &mut Project,
        requests: &mut Vec<Request>,
        ctx: &Context,
    ) -> bool {
        let mut stay_open = true;
        egui::Window::new(self.title(project))
            .id(self.stable_id())
            .default_size(self.default_size())
            .open(&mut stay_open)
            .vscroll(true)
            .show(ctx, |ui| self.show_contents(project, requests, ui));
        stay_open
    }
}
