use crate::config::EditorConfig;
use crate::project::{Persistence, Project};
use crate::settings::HeightmapSource;
use crate::terrain::{Heightmap, Placement, build_terrain, populate_vegetation};
use crate::ui::alerts::Alerts;
use crate::ui::file_actions::{ActionOutcome, FileAction, FileActions, TextureSlot};
use crate::ui::promise::{EguiWaker, Promise};
use crate::ui::registry::{DialogRegistry, OpenOutcome};
use crate::ui::views::generators::{HeightmapGeneratorDialog, Hills, Noise, SplatMapGenerator};
use crate::ui::views::terrain_manager::TerrainManager;
use crate::ui::views::texture_manager::TextureManager;
use crate::ui::views::tree_manager::TreeManager;
use crate::ui::views::tree_prototype_manager::TreePrototypeManager;
use crate::ui::views::{DialogKey, EditorWindow, Request};
use crate::ui::{PreviewKey, PreviewTextureCache, heightmap_to_image};
use blocking::{Task, unblock};
use egui::{Button, Color32, Context, Id, Key, LayerId, Order, Rect, Sense, Ui, Vec2, pos2};
use std::future;
use std::mem;
use std::sync::Arc;
use std::task::Waker;
use tracing::{debug, info, warn};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum MenuCommand {
    OpenProject,
    SaveProject,
    ExportScene,
    ExportHeightmap,
    Quit,
    Help,
    ResetView,
    OpenDialog(DialogKey),
}

fn boxed(dialog: impl EditorWindow + 'static) -> Box<dyn EditorWindow> {
    Box::new(dialog)
}

fn dialog_title(key: DialogKey) -> &'static str {
    match key {
        DialogKey::TerrainSettings => "Terrain Manager",
        DialogKey::TerrainTextureSettings => "Terrain Texture Manager",
        DialogKey::TreePrototypeManager => "Tree Prototype Manager",
        DialogKey::TreeManager => "Tree & Grass Manager",
        DialogKey::SplatMapGenerator => "Splat Map Generator",
        DialogKey::NoiseHeightmapGenerator => "Noise Heightmap Generator",
        DialogKey::HillHeightmapGenerator => "Hill Height Map Generator",
    }
}

fn menu_item(ui: &mut Ui, label: &str, command: MenuCommand, commands: &mut Vec<MenuCommand>) {
    if ui.button(label).clicked() {
        commands.push(command);
        ui.close();
    }
}

fn placeholder_item(ui: &mut Ui, label: &str) {
    ui.add_enabled(false, Button::new(label))
        .on_disabled_hover_text("Not available yet");
}

#[derive(Copy, Clone)]
struct PreviewView {
    zoom: f32,
    offset: Vec2,
}

impl Default for PreviewView {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            offset: Vec2::ZERO,
        }
    }
}

pub struct Workspace {
    config: EditorConfig,
    project: Project,
    dialogs: DialogRegistry<DialogKey, Box<dyn EditorWindow>>,
    file_actions: FileActions,
    terrain_job: Promise<Task<anyhow::Result<Heightmap>>>,
    vegetation_job: Promise<Task<Vec<Placement>>>,
    /// Populate requested while the terrain was being rebuilt
    populate_queued: bool,
    alerts: Alerts,
    waker: Waker,
    preview: PreviewView,
}

impl Workspace {
    pub fn new(ctx: &Context, config: EditorConfig, persistence: Arc<dyn Persistence>) -> Self {
        let waker = EguiWaker::for_context(ctx);
        let mut workspace = Self {
            alerts: Alerts::new(config.asset_dir.clone()),
            project: Project::default(),
            dialogs: DialogRegistry::new(),
            file_actions: FileActions::new(waker.clone(), persistence),
            terrain_job: Promise::new(waker.clone()),
            vegetation_job: Promise::new(waker.clone()),
            populate_queued: false,
            waker,
            preview: PreviewView::default(),
            config,
        };

        if let Some(path) = workspace.config.initial_project.clone() {
            info!(path = %path.display(), "Opening project from command line");
            workspace
                .file_actions
                .request(FileAction::OpenProject, Box::pin(future::ready(Some(path))));
        } else {
            workspace.rebuild_terrain();
        }
        workspace
    }

    pub fn show(&mut self, ctx: &Context, frame: &eframe::Frame) {
        for command in self.show_menu_bar(ctx) {
            self.run_command(ctx, frame, command);
        }
        if !self.alerts.is_blocking() && ctx.input(|i| i.key_pressed(Key::Escape)) {
            self.hide_top_dialog(ctx);
        }

        for (key, e) in self.dialogs.poll_loading() {
            self.alerts
                .error(format!("Could not open {}: {e:#}", dialog_title(key)));
        }
        self.show_loading_dialogs(ctx);

        let mut requests = Vec::new();
        let project = &mut self.project;
        self.dialogs
            .show_visible(|_, dialog| dialog.show_window(project, &mut requests, ctx));
        for request in requests {
            self.handle_request(frame, request);
        }

        self.poll_file_actions();
        self.poll_scene_jobs();

        egui::CentralPanel::default().show(ctx, |ui| self.show_preview(ui));

        if self.file_actions.is_working()
            && let Some(action) = self.file_actions.current()
        {
            let title = action.title();
            egui::Modal::new(Id::new("file_action_spinner")).show(ctx, |ui| {
                ui.vertical_centered(|ui| {
                    ui.spinner();
                    ui.label(format!("{title}..."));
                });
            });
        }

        self.alerts.show(ctx);
    }

    fn show_menu_bar(&self, ctx: &Context) -> Vec<MenuCommand> {
        let mut commands = Vec::new();
        let has_terrain = self.project.scene.terrain.is_some();

        egui::TopBottomPanel::top("main_menu_bar").show(ctx, |ui| {
            egui::MenuBar::new().ui(ui, |ui| {
                ui.menu_button("File", |ui| {
                    menu_item(ui, "Open Project...", MenuCommand::OpenProject, &mut commands);
                    menu_item(ui, "Save Project...", MenuCommand::SaveProject, &mut commands);
                    ui.separator();
                    ui.menu_button("Export", |ui| {
                        menu_item(ui, "Scene to JSON...", MenuCommand::ExportScene, &mut commands);
                        if ui
                            .add_enabled(has_terrain, Button::new("Terrain to Heightmap..."))
                            .clicked()
                        {
                            commands.push(MenuCommand::ExportHeightmap);
                            ui.close();
                        }
                        ui.separator();
                        placeholder_item(ui, "Terrain Node to j3o");
                        placeholder_item(ui, "Trees Node to j3o");
                        placeholder_item(ui, "Grass Node to j3o");
                        placeholder_item(ui, "Model Node to j3o");
                        placeholder_item(ui, "All to JSON");
                    });
                    ui.separator();
                    menu_item(ui, "Quit", MenuCommand::Quit, &mut commands);
                });

                ui.menu_button("View", |ui| {
                    for key in [
                        DialogKey::TerrainSettings,
                        DialogKey::TerrainTextureSettings,
                        DialogKey::TreePrototypeManager,
                        DialogKey::TreeManager,
                    ] {
                        menu_item(ui, dialog_title(key), MenuCommand::OpenDialog(key), &mut commands);
                    }
                    placeholder_item(ui, "Object Manager");
                });

                ui.menu_button("Tools", |ui| {
                    placeholder_item(ui, "Terrain Mixer");
                    ui.menu_button("Terrain Generators", |ui| {
                        let key = DialogKey::HillHeightmapGenerator;
                        menu_item(ui, dialog_title(key), MenuCommand::OpenDialog(key), &mut commands);
                    });
                    ui.menu_button("Texture Generators", |ui| {
                        for key in [DialogKey::SplatMapGenerator, DialogKey::NoiseHeightmapGenerator] {
                            menu_item(ui, dialog_title(key), MenuCommand::OpenDialog(key), &mut commands);
                        }
                    });
                });

                ui.menu_button("Help", |ui| {
                    menu_item(ui, "View Help", MenuCommand::Help, &mut commands);
                    menu_item(ui, "Reset View", MenuCommand::ResetView, &mut commands);
                });
            });
        });
        commands
    }

    fn run_command(&mut self, ctx: &Context, frame: &eframe::Frame, command: MenuCommand) {
        match command {
            MenuCommand::OpenProject => self.start_file_action(frame, FileAction::OpenProject),
            MenuCommand::SaveProject => self.start_file_action(frame, FileAction::SaveProject),
            MenuCommand::ExportScene => self.start_file_action(frame, FileAction::ExportScene),
            MenuCommand::ExportHeightmap => {
                self.start_file_action(frame, FileAction::ExportHeightmap)
            }
            MenuCommand::Quit => self.alerts.request_quit(),
            MenuCommand::Help => self.alerts.open_help(),
            MenuCommand::ResetView => self.reset_view(),
            MenuCommand::OpenDialog(key) => {
                self.open_dialog(ctx, key);
            }
        }
    }

    fn reset_view(&mut self) {
        self.preview = PreviewView::default();
    }

    /// Hides the visible dialog whose window is on top, as if it had been closed.
    fn hide_top_dialog(&mut self, ctx: &Context) -> Option<DialogKey> {
        let top = ctx.top_layer_id()?;
        let key = DialogKey::ALL.into_iter().find(|&key| {
            self.dialogs.is_visible(key)
                && self
                    .dialogs
                    .get_mut(key)
                    .is_some_and(|dialog| dialog.stable_id() == top.id)
        })?;
        self.dialogs.hide(key);
        debug!(?key, "Dialog hidden from keyboard");
        Some(key)
    }

    fn open_dialog(&mut self, ctx: &Context, key: DialogKey) -> OpenOutcome {
        let outcome = match key {
            DialogKey::TerrainSettings => {
                self.dialogs.open_or_focus(key, || boxed(TerrainManager::new()))
            }
            DialogKey::TerrainTextureSettings => {
                self.dialogs.open_or_focus(key, || boxed(TextureManager))
            }
            DialogKey::TreeManager => self.dialogs.open_or_focus(key, || boxed(TreeManager)),
            DialogKey::SplatMapGenerator => self
                .dialogs
                .open_or_focus(key, || boxed(SplatMapGenerator::new(ctx))),
            DialogKey::NoiseHeightmapGenerator => self
                .dialogs
                .open_or_focus(key, || boxed(HeightmapGeneratorDialog::<Noise>::new(ctx))),
            DialogKey::HillHeightmapGenerator => self
                .dialogs
                .open_or_focus(key, || boxed(HeightmapGeneratorDialog::<Hills>::new(ctx))),
            DialogKey::TreePrototypeManager => {
                let asset_dir = self.config.asset_dir.clone();
                self.dialogs.open_or_focus_deferred(key, &self.waker, || {
                    TreePrototypeManager::load(ctx, asset_dir)
                })
            }
        };

        if outcome == OpenOutcome::AlreadyVisible
            && let Some(dialog) = self.dialogs.get_mut(key)
        {
            ctx.move_to_top(LayerId::new(Order::Middle, dialog.stable_id()));
        }
        info!(?key, ?outcome, open = self.dialogs.len(), "Opened dialog");
        outcome
    }

    fn show_loading_dialogs(&mut self, ctx: &Context) {
        let key = DialogKey::TreePrototypeManager;
        if !self.dialogs.is_loading(key) {
            return;
        }
        let mut cancel = false;
        egui::Window::new(dialog_title(key))
            .id(Id::new("loading_tree_prototype_manager"))
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("Scanning asset directory...");
                });
                cancel = ui.button("Cancel").clicked();
            });
        if cancel && self.dialogs.cancel_loading(key) {
            info!(?key, "Dialog construction cancelled");
        }
    }

    fn start_file_action(&mut self, frame: &eframe::Frame, action: FileAction) {
        if self.file_actions.is_busy() {
            debug!(action = action.title(), "Another file action is in progress");
            return;
        }
        let prompt = action.prompt(frame, &self.config.asset_dir);
        self.file_actions.request(action, prompt);
    }

    fn handle_request(&mut self, frame: &eframe::Frame, request: Request) {
        match request {
            Request::File(action) => self.start_file_action(frame, action),
            Request::RebuildTerrain => self.rebuild_terrain(),
            Request::PopulateVegetation => self.populate_vegetation(),
            Request::Error(message) => self.alerts.error(message),
        }
    }

    fn poll_file_actions(&mut self) {
        let title = self.file_actions.current().map(FileAction::title);
        match self.file_actions.poll(&self.project) {
            None => {}
            Some(Ok(outcome)) => self.apply_outcome(outcome),
            Some(Err(e)) => {
                let title = title.unwrap_or("File action");
                self.alerts.error(format!("{title} failed: {e:#}"));
            }
        }
    }

    fn apply_outcome(&mut self, outcome: ActionOutcome) {
        match outcome {
            ActionOutcome::ProjectLoaded(project) => {
                info!(prototypes = project.tree_prototypes.len(), "Project loaded");
                self.project = *project;
                self.rebuild_terrain();
            }
            ActionOutcome::ProjectSaved(path) => {
                info!(path = %path.display(), "Project saved");
            }
            ActionOutcome::Exported(path) => {
                info!(path = %path.display(), "Export written");
            }
            ActionOutcome::HeightmapImagePicked(path) => {
                debug!(path = %path.display(), "Heightmap image selected");
                self.project.terrain.source = HeightmapSource::Image(path);
            }
            ActionOutcome::TexturePicked(slot, path) => {
                let textures = &mut self.project.terrain.textures;
                match slot {
                    TextureSlot::AlphaMap => textures.alpha_map = Some(path),
                    TextureSlot::Layer { index, generation } => {
                        match textures.layer_mut(index, generation) {
                            Some(layer) => layer.texture = Some(path),
                            None => {
                                warn!(index, "Texture layers changed before the pick finished");
                                self.alerts.error(format!(
                                    "Texture layers were changed while choosing a file, {} was not assigned",
                                    path.display()
                                ));
                            }
                        }
                    }
                }
            }
            ActionOutcome::ModelPicked(prototype, path) => {
                match self.project.tree_prototypes.get_mut(prototype) {
                    Some(prototype) => prototype.model = Some(path),
                    None => warn!("Tree prototype was removed before the pick finished"),
                }
            }
        }
    }

    fn rebuild_terrain(&mut self) {
        let settings = self.project.terrain.clone();
        let hills = self.project.hill_generator.clone();
        let noise = self.project.noise_generator.clone();
        debug!(size = settings.total_size, source = settings.source.label(), "Rebuilding terrain");
        if self.vegetation_job.is_pending() {
            // The new terrain clears vegetation, so place it again once heights are in
            debug!("Restarting vegetation populate after the rebuild");
            self.vegetation_job = Promise::new(self.waker.clone());
            self.populate_queued = true;
        }
        self.terrain_job
            .launch(unblock(move || build_terrain(&settings, &hills, &noise)));
    }

    fn populate_vegetation(&mut self) {
        if self.terrain_job.is_pending() {
            debug!("Terrain rebuild in progress, populate queued");
            self.populate_queued = true;
            return;
        }
        let terrain = match self.project.scene.require_terrain() {
            Ok(terrain) => terrain,
            Err(e) => {
                self.alerts.error(format!("{e:#}"));
                return;
            }
        };
        let settings = self.project.vegetation.clone();
        let prototypes = self.project.tree_prototypes.clone();
        self.vegetation_job.launch(unblock(move || {
            populate_vegetation(&terrain, &settings, &prototypes)
        }));
    }

    fn is_generating(&self) -> bool {
        self.terrain_job.is_pending() || self.vegetation_job.is_pending() || self.populate_queued
    }

    fn poll_scene_jobs(&mut self) {
        if let Some(result) = self.terrain_job.take_response() {
            match result {
                Ok(terrain) => {
                    info!(size = terrain.size(), "Terrain rebuilt");
                    self.project.scene.set_terrain(terrain);
                    self.preview = PreviewView::default();
                }
                Err(e) => self.alerts.error(format!("Terrain generation failed: {e:#}")),
            }
            if mem::take(&mut self.populate_queued) {
                self.populate_vegetation();
            }
        }

        if let Some(placements) = self.vegetation_job.take_response() {
            info!(count = placements.len(), "Vegetation populated");
            self.project.scene.set_vegetation(placements);
        }
    }

    fn show_preview(&mut self, ui: &mut Ui) {
        let generating = self.is_generating();
        let scene = &self.project.scene;
        let Some(terrain) = &scene.terrain else {
            ui.centered_and_justified(|ui| {
                if generating {
                    ui.spinner();
                } else {
                    ui.label("No terrain. Configure one in View > Terrain Manager.");
                }
            });
            return;
        };

        let (lo, hi) = terrain.min_max();
        ui.horizontal(|ui| {
            ui.label(format!(
                "Terrain {0}×{0}, heights {lo:.1} to {hi:.1}, {1} vegetation instances",
                terrain.size(),
                scene.vegetation.len()
            ));
            if generating {
                ui.spinner();
            }
        });
        ui.separator();

        let key = PreviewKey {
            source: Id::new("terrain_preview"),
            revision: scene.revision,
        };
        let texture = PreviewTextureCache::get_or_insert_with(ui.ctx(), key, || {
            heightmap_to_image(terrain)
        });

        let (response, painter) = ui.allocate_painter(ui.available_size(), Sense::drag());
        self.preview.offset += response.drag_delta();
        if response.hovered() {
            let scroll = ui.input(|i| i.smooth_scroll_delta.y);
            if scroll != 0.0 {
                self.preview.zoom = (self.preview.zoom * (scroll / 200.0).exp()).clamp(0.1, 16.0);
            }
        }

        let area = response.rect;
        let side = area.width().min(area.height()) * self.preview.zoom;
        let rect = Rect::from_center_size(area.center() + self.preview.offset, Vec2::splat(side));
        painter.rect_filled(area, 0.0, ui.visuals().extreme_bg_color);
        painter.image(
            texture.id(),
            rect,
            Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0)),
            Color32::WHITE,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::{DiskPersistence, save_project};
    use crate::settings::{TerrainSettings, TreePrototype, VegetationLayer};
    use std::path::{Path, PathBuf};
    use std::thread;
    use std::time::{Duration, Instant};

    fn workspace(ctx: &Context, initial_project: Option<PathBuf>) -> Workspace {
        let config = EditorConfig {
            asset_dir: PathBuf::from("."),
            initial_project,
        };
        Workspace::new(ctx, config, Arc::new(DiskPersistence))
    }

    /// Polls background work until the workspace has nothing left in flight.
    fn settle(workspace: &mut Workspace) {
        let deadline = Instant::now() + Duration::from_secs(30);
        loop {
            workspace.poll_file_actions();
            workspace.poll_scene_jobs();
            if !workspace.is_generating() && !workspace.file_actions.is_busy() {
                return;
            }
            assert!(Instant::now() < deadline, "background work never finished");
            thread::sleep(Duration::from_millis(1));
        }
    }

    fn dialog_ptr(workspace: &mut Workspace, key: DialogKey) -> Option<*const ()> {
        workspace
            .dialogs
            .get_mut(key)
            .map(|dialog| &**dialog as *const dyn EditorWindow as *const ())
    }

    fn small_flat_terrain() -> TerrainSettings {
        TerrainSettings {
            total_size: 33,
            patch_size: 17,
            source: HeightmapSource::Flat,
            ..TerrainSettings::default()
        }
    }

    fn add_oak_layer(project: &mut Project) {
        let oak = project.tree_prototypes.insert(TreePrototype::named("oak"));
        project.vegetation.layers.push(VegetationLayer {
            prototype: Some(oak),
            density: 50.0,
            min_height: 0.0,
            max_height: 1.0,
            max_slope: 10.0,
            ..VegetationLayer::default()
        });
    }

    #[test]
    fn terrain_manager_reopens_the_same_instance() {
        let ctx = Context::default();
        let mut workspace = workspace(&ctx, None);
        let key = DialogKey::TerrainSettings;

        assert_eq!(workspace.open_dialog(&ctx, key), OpenOutcome::Created);
        let first = dialog_ptr(&mut workspace, key);
        assert_eq!(workspace.open_dialog(&ctx, key), OpenOutcome::AlreadyVisible);

        workspace.dialogs.hide(key);
        assert!(!workspace.dialogs.is_visible(key));
        assert_eq!(workspace.open_dialog(&ctx, key), OpenOutcome::Shown);

        assert!(workspace.dialogs.is_visible(key));
        assert_eq!(workspace.dialogs.len(), 1);
        assert_eq!(dialog_ptr(&mut workspace, key), first);
    }

    #[test]
    fn tree_prototype_manager_loads_once() {
        let ctx = Context::default();
        let assets = tempfile::tempdir().unwrap();
        let mut workspace = workspace(&ctx, None);
        workspace.config.asset_dir = assets.path().to_path_buf();
        let key = DialogKey::TreePrototypeManager;

        assert_eq!(workspace.open_dialog(&ctx, key), OpenOutcome::Deferred);
        assert_eq!(workspace.open_dialog(&ctx, key), OpenOutcome::Coalesced);

        let deadline = Instant::now() + Duration::from_secs(30);
        while !workspace.dialogs.is_visible(key) {
            assert!(workspace.dialogs.poll_loading().is_empty());
            assert!(Instant::now() < deadline, "asset scan never finished");
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(workspace.open_dialog(&ctx, key), OpenOutcome::AlreadyVisible);
        assert_eq!(workspace.dialogs.len(), 1);
    }

    fn render_dialogs(ctx: &Context, workspace: &mut Workspace) {
        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            let mut requests = Vec::new();
            let project = &mut workspace.project;
            workspace
                .dialogs
                .show_visible(|_, dialog| dialog.show_window(project, &mut requests, ctx));
        });
    }

    #[test]
    fn escape_target_is_the_top_dialog() {
        let ctx = Context::default();
        let mut workspace = workspace(&ctx, None);
        workspace.open_dialog(&ctx, DialogKey::TerrainSettings);
        workspace.open_dialog(&ctx, DialogKey::TreeManager);
        render_dialogs(&ctx, &mut workspace);
        render_dialogs(&ctx, &mut workspace);

        // Reopening a visible dialog raises it
        assert_eq!(
            workspace.open_dialog(&ctx, DialogKey::TerrainSettings),
            OpenOutcome::AlreadyVisible
        );
        render_dialogs(&ctx, &mut workspace);

        assert_eq!(workspace.hide_top_dialog(&ctx), Some(DialogKey::TerrainSettings));
        assert!(!workspace.dialogs.is_visible(DialogKey::TerrainSettings));
        assert!(workspace.dialogs.is_visible(DialogKey::TreeManager));
        assert_eq!(workspace.open_dialog(&ctx, DialogKey::TerrainSettings), OpenOutcome::Shown);
    }

    #[test]
    fn picks_land_on_the_chosen_target() {
        let ctx = Context::default();
        let mut workspace = workspace(&ctx, None);

        workspace.apply_outcome(ActionOutcome::HeightmapImagePicked("hills.png".into()));
        assert_eq!(
            workspace.project.terrain.source,
            HeightmapSource::Image("hills.png".into())
        );

        workspace.apply_outcome(ActionOutcome::TexturePicked(
            TextureSlot::AlphaMap,
            "alpha.png".into(),
        ));
        assert_eq!(
            workspace.project.terrain.textures.alpha_map,
            Some(PathBuf::from("alpha.png"))
        );

        let generation = workspace.project.terrain.textures.generation();
        workspace.apply_outcome(ActionOutcome::TexturePicked(
            TextureSlot::Layer { index: 1, generation },
            "rock.png".into(),
        ));
        assert_eq!(
            workspace.project.terrain.textures.layers[1].texture,
            Some(PathBuf::from("rock.png"))
        );

        let oak = workspace.project.tree_prototypes.insert(TreePrototype::named("oak"));
        workspace.apply_outcome(ActionOutcome::ModelPicked(oak, "oak.obj".into()));
        assert_eq!(
            workspace.project.tree_prototypes[oak].model,
            Some(PathBuf::from("oak.obj"))
        );
        assert_eq!(workspace.alerts.current_error(), None);
    }

    #[test]
    fn picks_for_removed_targets_are_dropped() {
        let ctx = Context::default();
        let mut workspace = workspace(&ctx, None);
        let textures = &mut workspace.project.terrain.textures;
        let generation = textures.generation();
        let before = textures.layers[1].clone();
        textures.remove_layer(0);

        workspace.apply_outcome(ActionOutcome::TexturePicked(
            TextureSlot::Layer { index: 1, generation },
            "rock.png".into(),
        ));
        let layers = &workspace.project.terrain.textures.layers;
        assert_eq!(layers[0], before);
        assert!(layers.iter().all(|layer| layer.texture.as_deref() != Some(Path::new("rock.png"))));
        assert!(workspace.alerts.current_error().is_some());

        let oak = workspace.project.tree_prototypes.insert(TreePrototype::named("oak"));
        workspace.project.tree_prototypes.remove(oak);
        workspace.apply_outcome(ActionOutcome::ModelPicked(oak, "oak.obj".into()));
        assert!(workspace.project.tree_prototypes.is_empty());
    }

    #[test]
    fn loading_a_project_rebuilds_its_terrain() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("project.json");
        let mut project = Project::default();
        project.terrain = small_flat_terrain();
        save_project(&path, &project).unwrap();

        let ctx = Context::default();
        let mut workspace = workspace(&ctx, Some(path));
        settle(&mut workspace);

        assert_eq!(workspace.alerts.current_error(), None);
        assert_eq!(workspace.project.terrain, small_flat_terrain());
        let terrain = workspace.project.scene.require_terrain().unwrap();
        assert_eq!(terrain.size(), 33);
    }

    #[test]
    fn populate_waits_for_a_pending_rebuild() {
        let ctx = Context::default();
        let mut workspace = workspace(&ctx, None);
        settle(&mut workspace);

        workspace.project.terrain = small_flat_terrain();
        add_oak_layer(&mut workspace.project);
        workspace.rebuild_terrain();
        workspace.populate_vegetation();
        assert!(workspace.terrain_job.is_pending());
        settle(&mut workspace);

        assert_eq!(workspace.alerts.current_error(), None);
        let scene = &workspace.project.scene;
        assert_eq!(scene.terrain.as_ref().map(|t| t.size()), Some(33));
        assert!(!scene.vegetation.is_empty());
        assert!(scene.vegetation.iter().all(|p| p.x <= 32.0 && p.z <= 32.0));
    }

    #[test]
    fn rebuild_restarts_a_running_populate() {
        let ctx = Context::default();
        let mut workspace = workspace(&ctx, None);
        settle(&mut workspace);

        add_oak_layer(&mut workspace.project);
        workspace.populate_vegetation();
        workspace.project.terrain = small_flat_terrain();
        workspace.rebuild_terrain();
        settle(&mut workspace);

        let scene = &workspace.project.scene;
        assert_eq!(scene.terrain.as_ref().map(|t| t.size()), Some(33));
        assert!(!scene.vegetation.is_empty());
        assert!(scene.vegetation.iter().all(|p| p.x <= 32.0 && p.z <= 32.0));
    }

    #[test]
    fn populate_without_terrain_reports_an_error() {
        let ctx = Context::default();
        let mut workspace = workspace(&ctx, None);
        workspace.terrain_job = Promise::new(workspace.waker.clone());

        workspace.populate_vegetation();
        assert!(!workspace.is_generating());
        assert!(workspace.alerts.current_error().is_some());
    }

    #[test]
    fn reset_view_restores_pan_and_zoom() {
        let ctx = Context::default();
        let mut workspace = workspace(&ctx, None);
        workspace.preview.zoom = 4.0;
        workspace.preview.offset = Vec2::new(120.0, -40.0);

        workspace.reset_view();
        assert_eq!(workspace.preview.zoom, 1.0);
        assert_eq!(workspace.preview.offset, Vec2::ZERO);
    }
}
