use crate::project::Project;
use crate::settings::{TerrainTextureSettings, TextureLayer};
use crate::ui::file_actions::{FileAction, TextureSlot};
use crate::ui::views::{EditorWindow, Request};
use egui::{Button, DragValue, Id, Ui, Vec2, vec2};
use std::path::Path;

pub struct TextureManager;

fn path_label(path: Option<&Path>) -> String {
    path.and_then(Path::file_name)
        .map_or("<none>".into(), |name| name.to_string_lossy().into_owned())
}

impl TextureManager {
    fn layer_row(
        ui: &mut Ui,
        index: usize,
        generation: u64,
        layer: &mut TextureLayer,
        requests: &mut Vec<Request>,
    ) -> bool {
        let mut remove = false;
        ui.group(|ui| {
            ui.horizontal(|ui| {
                ui.strong(format!("Layer {}", index + 1));
                remove = ui.small_button("Remove").clicked();
            });
            ui.horizontal(|ui| {
                ui.label("Texture:");
                ui.label(path_label(layer.texture.as_deref()))
                    .on_hover_text(layer.texture.as_deref().map_or(String::new(), |p| {
                        p.display().to_string()
                    }));
                if ui.button("Browse").clicked() {
                    let slot = TextureSlot::Layer { index, generation };
                    requests.push(Request::File(FileAction::PickTexture(slot)));
                }
            });
            ui.horizontal(|ui| {
                ui.label("UV scale:");
                ui.add(DragValue::new(&mut layer.uv_scale).range(0.1..=1024.0).speed(0.5));
            });
        });
        remove
    }
}

impl EditorWindow for TextureManager {
    fn title(&self, _project: &Project) -> String {
        "Terrain Texture Manager".into()
    }

    fn stable_id(&self) -> Id {
        Id::new(concat!(module_path!(), "::TextureManager"))
    }

    fn default_size(&self) -> Vec2 {
        vec2(260.0, 770.0)
    }

    fn show_contents(&mut self, project: &mut Project, requests: &mut Vec<Request>, ui: &mut Ui) {
        let textures = &mut project.terrain.textures;

        ui.horizontal(|ui| {
            ui.label("Alpha map:");
            ui.label(path_label(textures.alpha_map.as_deref()));
            if ui.button("Browse").clicked() {
                requests.push(Request::File(FileAction::PickTexture(TextureSlot::AlphaMap)));
            }
        });
        ui.separator();

        let generation = textures.generation();
        let mut removed = None;
        for (index, layer) in textures.layers.iter_mut().enumerate() {
            if Self::layer_row(ui, index, generation, layer, requests) {
                removed = Some(index);
            }
        }
        if let Some(index) = removed {
            textures.remove_layer(index);
        }

        let can_add = textures.can_add_layer();
        if ui
            .add_enabled(can_add, Button::new("Add Layer"))
            .on_disabled_hover_text(format!(
                "At most {} layers are supported",
                TerrainTextureSettings::MAX_LAYERS
            ))
            .clicked()
        {
            textures.add_layer();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_label_shows_file_name() {
        assert_eq!(path_label(Some(Path::new("/assets/rock/diffuse.png"))), "diffuse.png");
        assert_eq!(path_label(None), "<none>");
    }
}
