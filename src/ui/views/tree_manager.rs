use crate::project::Project;
use crate::settings::{TreePrototype, TreePrototypeRef, VegetationKind, VegetationLayer};
use crate::ui::views::{EditorWindow, Request};
use egui::{Button, ComboBox, DragValue, Grid, Id, Slider, Ui, Vec2, vec2};
use slotmap::SlotMap;

pub struct TreeManager;

fn prototype_name(
    prototypes: &SlotMap<TreePrototypeRef, TreePrototype>,
    prototype: Option<TreePrototypeRef>,
) -> String {
    match prototype {
        None => "<none>".into(),
        Some(r) => prototypes
            .get(r)
            .map_or("<deleted>".into(), |p| p.name.clone()),
    }
}

impl TreeManager {
    fn layer_editor(
        ui: &mut Ui,
        index: usize,
        layer: &mut VegetationLayer,
        prototypes: &SlotMap<TreePrototypeRef, TreePrototype>,
    ) -> bool {
        let mut remove = false;
        ui.group(|ui| {
            ui.horizontal(|ui| {
                ui.strong(format!("Layer {}", index + 1));
                remove = ui.small_button("Remove").clicked();
            });
            Grid::new(("vegetation_layer", index))
                .num_columns(2)
                .show(ui, |ui| {
                    ui.label("Kind:");
                    ui.horizontal(|ui| {
                        ui.radio_value(&mut layer.kind, VegetationKind::Tree, "Tree");
                        ui.radio_value(&mut layer.kind, VegetationKind::Grass, "Grass");
                    });
                    ui.end_row();

                    ui.label("Prototype:");
                    ComboBox::from_id_salt(("vegetation_prototype", index))
                        .selected_text(prototype_name(prototypes, layer.prototype))
                        .show_ui(ui, |ui| {
                            ui.selectable_value(&mut layer.prototype, None, "<none>");
                            for (r, p) in prototypes {
                                ui.selectable_value(&mut layer.prototype, Some(r), p.name.as_str());
                            }
                        });
                    ui.end_row();

                    ui.label("Density:");
                    ui.add(
                        DragValue::new(&mut layer.density)
                            .range(0.0..=1000.0)
                            .speed(0.1)
                            .suffix(" / 1000 cells"),
                    );
                    ui.end_row();

                    ui.label("Min height:");
                    ui.add(Slider::new(&mut layer.min_height, 0.0..=1.0));
                    ui.end_row();

                    ui.label("Max height:");
                    ui.add(Slider::new(&mut layer.max_height, 0.0..=1.0));
                    ui.end_row();

                    ui.label("Max slope:");
                    ui.add(DragValue::new(&mut layer.max_slope).range(0.0..=10.0).speed(0.01));
                    ui.end_row();

                    ui.label("Scale variation:");
                    ui.add(Slider::new(&mut layer.scale_variation, 0.0..=0.9));
                    ui.end_row();
                });
            if layer.min_height > layer.max_height {
                layer.max_height = layer.min_height;
            }
        });
        remove
    }
}

impl EditorWindow for TreeManager {
    fn title(&self, _project: &Project) -> String {
        "Tree & Grass Manager".into()
    }

    fn stable_id(&self) -> Id {
        Id::new(concat!(module_path!(), "::TreeManager"))
    }

    fn default_size(&self) -> Vec2 {
        vec2(510.0, 700.0)
    }

    fn show_contents(&mut self, project: &mut Project, requests: &mut Vec<Request>, ui: &mut Ui) {
        let Project {
            vegetation,
            tree_prototypes,
            scene,
            ..
        } = project;

        ui.horizontal(|ui| {
            ui.label("Seed:");
            ui.add(DragValue::new(&mut vegetation.seed));
        });

        let mut removed = None;
        for (index, layer) in vegetation.layers.iter_mut().enumerate() {
            if Self::layer_editor(ui, index, layer, tree_prototypes) {
                removed = Some(index);
            }
        }
        if let Some(index) = removed {
            vegetation.layers.remove(index);
        }
        if ui.button("Add Layer").clicked() {
            vegetation.layers.push(VegetationLayer::default());
        }
        ui.separator();

        ui.label(format!("Placed instances: {}", scene.vegetation.len()));
        if ui
            .add_enabled(scene.terrain.is_some(), Button::new("Populate"))
            .on_disabled_hover_text("Generate a terrain first")
            .clicked()
        {
            requests.push(Request::PopulateVegetation);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prototype_names_cover_missing_references() {
        let mut prototypes = SlotMap::with_key();
        let oak = prototypes.insert(TreePrototype::named("Oak"));
        assert_eq!(prototype_name(&prototypes, Some(oak)), "Oak");
        assert_eq!(prototype_name(&prototypes, None), "<none>");

        prototypes.remove(oak);
        assert_eq!(prototype_name(&prototypes, Some(oak)), "<deleted>");
    }
}
