use crate::project::Project;
use crate::settings::{HeightmapSource, TerrainSettings};
use crate::ui::file_actions::FileAction;
use crate::ui::views::{EditorWindow, Request};
use egui::{ComboBox, DragValue, Grid, Id, Ui, Vec2, vec2};

const TERRAIN_SIZES: &[u32] = &[33, 65, 129, 257, 513, 1025, 2049, 4097];

pub struct TerrainManager {
    validation_error: Option<String>,
}

impl TerrainManager {
    pub fn new() -> Self {
        Self {
            validation_error: None,
        }
    }

    fn size_combo(ui: &mut Ui, id: &str, value: &mut u32, max: u32) -> bool {
        let mut changed = false;
        ComboBox::from_id_salt(id)
            .selected_text(value.to_string())
            .show_ui(ui, |ui| {
                for &size in TERRAIN_SIZES.iter().filter(|&&s| s <= max) {
                    changed |= ui.selectable_value(value, size, size.to_string()).changed();
                }
            });
        changed
    }

    fn source_editor(ui: &mut Ui, source: &mut HeightmapSource, requests: &mut Vec<Request>) {
        ComboBox::from_id_salt("heightmap_source")
            .selected_text(source.label())
            .show_ui(ui, |ui| {
                for option in [
                    HeightmapSource::Flat,
                    HeightmapSource::HillGenerator,
                    HeightmapSource::NoiseGenerator,
                ] {
                    let label = option.label();
                    ui.selectable_value(source, option, label);
                }
                let is_image = matches!(source, HeightmapSource::Image(_));
                if ui.selectable_label(is_image, "Heightmap image").clicked() && !is_image {
                    requests.push(Request::File(FileAction::PickHeightmapImage));
                }
            });

        if let HeightmapSource::Image(path) = source {
            ui.end_row();
            ui.label("Image:");
            ui.horizontal(|ui| {
                ui.label(path.display().to_string());
                if ui.button("Browse").clicked() {
                    requests.push(Request::File(FileAction::PickHeightmapImage));
                }
            });
        }
    }

    fn settings_grid(settings: &mut TerrainSettings, requests: &mut Vec<Request>, ui: &mut Ui) {
        Grid::new("terrain_settings")
            .num_columns(2)
            .striped(true)
            .show(ui, |ui| {
                ui.label("Total size:");
                Self::size_combo(ui, "total_size", &mut settings.total_size, TerrainSettings::MAX_SIZE);
                ui.end_row();

                ui.label("Patch size:");
                Self::size_combo(ui, "patch_size", &mut settings.patch_size, settings.total_size);
                ui.end_row();

                ui.label("Height scale:");
                ui.add(
                    DragValue::new(&mut settings.height_scale)
                        .range(1.0..=5000.0)
                        .speed(1.0),
                );
                ui.end_row();

                ui.label("Heightmap:");
                Self::source_editor(ui, &mut settings.source, requests);
                ui.end_row();
            });
    }
}

impl EditorWindow for TerrainManager {
    fn title(&self, _project: &Project) -> String {
        "Terrain Manager".into()
    }

    fn stable_id(&self) -> Id {
        Id::new(concat!(module_path!(), "::TerrainManager"))
    }

    fn default_size(&self) -> Vec2 {
        vec2(310.0, 770.0)
    }

    fn show_contents(&mut self, project: &mut Project, requests: &mut Vec<Request>, ui: &mut Ui) {
        Self::settings_grid(&mut project.terrain, requests, ui);
        ui.separator();

        if let Some(terrain) = &project.scene.terrain {
            let (lo, hi) = terrain.min_max();
            ui.label(format!(
                "Current terrain: {0}×{0}, heights {lo:.1} to {hi:.1}",
                terrain.size()
            ));
        } else {
            ui.label("No terrain generated yet");
        }

        if let Some(error) = &self.validation_error {
            ui.colored_label(ui.visuals().error_fg_color, error);
        }

        if ui.button("Apply").clicked() {
            self.validation_error = project.terrain.validate().err();
            if self.validation_error.is_none() {
                requests.push(Request::RebuildTerrain);
            }
        }
    }
}
