use crate::project::Project;
use crate::settings::{TreePrototype, TreePrototypeRef};
use crate::ui::file_actions::{FileAction, FileCategory};
use crate::ui::promise::{EguiWaker, Promise};
use crate::ui::views::{EditorWindow, Request};
use anyhow::Context as _;
use blocking::{Task, unblock};
use egui::{Button, ComboBox, Context, DragValue, Id, TextEdit, Ui, Vec2, vec2};
use egui_extras::{Column, TableBuilder};
use std::fs;
use std::path::{Path, PathBuf};
use std::task::Waker;
use tracing::{debug, warn};

const SCAN_DEPTH: usize = 3;
const SCAN_LIMIT: usize = 500;

fn scan_dir(dir: &Path, depth: usize, found: &mut Vec<PathBuf>) -> anyhow::Result<()> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))?;
    for entry in entries {
        if found.len() >= SCAN_LIMIT {
            break;
        }
        let Ok(entry) = entry else { continue };
        let path = entry.path();
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() && !hidden && depth > 0 {
            // Unreadable subdirectories are skipped, only the root must be readable
            if let Err(e) = scan_dir(&path, depth - 1, found) {
                debug!("Skipping during model scan: {e:#}");
            }
        } else if file_type.is_file() && FileCategory::Model.accepts(&path) {
            found.push(path);
        }
    }
    Ok(())
}

/// Lists model files under `root`, at most [`SCAN_DEPTH`] directories deep.
pub fn scan_models(root: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    scan_dir(root, SCAN_DEPTH, &mut found)?;
    found.sort();
    debug!(root = %root.display(), count = found.len(), "Scanned for models");
    Ok(found)
}

fn model_label(asset_dir: &Path, path: &Path) -> String {
    path.strip_prefix(asset_dir)
        .unwrap_or(path)
        .display()
        .to_string()
}

pub struct TreePrototypeManager {
    asset_dir: PathBuf,
    models: Vec<PathBuf>,
    rescan: Promise<Task<anyhow::Result<Vec<PathBuf>>>>,
    model_choice: Option<usize>,
}

impl TreePrototypeManager {
    fn new(waker: Waker, asset_dir: PathBuf, models: Vec<PathBuf>) -> Self {
        Self {
            asset_dir,
            models,
            rescan: Promise::new(waker),
            model_choice: None,
        }
    }

    /// Scans the asset directory off the UI thread, then builds the dialog.
    pub(in crate::ui::views) fn load(
        ctx: &Context,
        asset_dir: PathBuf,
    ) -> impl Future<Output = anyhow::Result<Box<dyn EditorWindow>>> + 'static {
        let waker = EguiWaker::for_context(ctx);
        let scan_root = asset_dir.clone();
        let scan = unblock(move || scan_models(&scan_root));
        async move {
            let models = scan.await?;
            anyhow::Ok(Box::new(Self::new(waker, asset_dir, models)) as Box<dyn EditorWindow>)
        }
    }

    fn add_prototype(&self, project: &mut Project) -> TreePrototypeRef {
        let model = self.model_choice.and_then(|i| self.models.get(i)).cloned();
        let name = model
            .as_deref()
            .and_then(Path::file_stem)
            .map_or_else(
                || format!("Prototype {}", project.tree_prototypes.len() + 1),
                |stem| stem.to_string_lossy().into_owned(),
            );
        project.tree_prototypes.insert(TreePrototype {
            model,
            ..TreePrototype::named(name)
        })
    }

    fn prototype_table(project: &mut Project, requests: &mut Vec<Request>, ui: &mut Ui) {
        let mut removed = None;
        TableBuilder::new(ui)
            .striped(true)
            .column(Column::initial(140.0).resizable(true))
            .column(Column::remainder())
            .column(Column::auto())
            .column(Column::auto())
            .header(20.0, |mut header| {
                header.col(|ui| {
                    ui.strong("Name");
                });
                header.col(|ui| {
                    ui.strong("Model");
                });
                header.col(|ui| {
                    ui.strong("Scale");
                });
                header.col(|_| {});
            })
            .body(|mut body| {
                for (prototype_ref, prototype) in &mut project.tree_prototypes {
                    body.row(22.0, |mut row| {
                        row.col(|ui| {
                            ui.add(TextEdit::singleline(&mut prototype.name));
                        });
                        row.col(|ui| {
                            let label = prototype.model.as_deref().map_or("<none>".into(), |p| {
                                p.file_name().unwrap_or_default().to_string_lossy().into_owned()
                            });
                            ui.label(label);
                            if ui.small_button("Browse").clicked() {
                                requests.push(Request::File(FileAction::PickModel(prototype_ref)));
                            }
                        });
                        row.col(|ui| {
                            ui.add(
                                DragValue::new(&mut prototype.base_scale)
                                    .range(0.01..=100.0)
                                    .speed(0.01),
                            );
                        });
                        row.col(|ui| {
                            if ui.small_button("Remove").clicked() {
                                removed = Some(prototype_ref);
                            }
                        });
                    });
                }
            });

        if let Some(prototype_ref) = removed {
            project.tree_prototypes.remove(prototype_ref);
        }
    }
}

impl EditorWindow for TreePrototypeManager {
    fn title(&self, project: &Project) -> String {
        format!("Tree Prototype Manager ({})", project.tree_prototypes.len())
    }

    fn stable_id(&self) -> Id {
        Id::new(concat!(module_path!(), "::TreePrototypeManager"))
    }

    fn default_size(&self) -> Vec2 {
        vec2(510.0, 590.0)
    }

    fn show_contents(&mut self, project: &mut Project, requests: &mut Vec<Request>, ui: &mut Ui) {
        if let Some(result) = self.rescan.take_response() {
            match result {
                Ok(models) => {
                    self.models = models;
                    self.model_choice = None;
                }
                Err(e) => {
                    warn!("Model rescan failed: {e:#}");
                    requests.push(Request::Error(format!("Model scan failed: {e:#}")));
                }
            }
        }

        let scanning = self.rescan.is_pending();
        let (mut add, mut rescan) = (false, false);
        ui.horizontal(|ui| {
            let (asset_dir, models) = (&self.asset_dir, &self.models);
            let selected = self
                .model_choice
                .and_then(|i| models.get(i))
                .map_or("<no model>".into(), |p| model_label(asset_dir, p));
            ComboBox::from_id_salt("asset_models")
                .selected_text(selected)
                .width(260.0)
                .show_ui(ui, |ui| {
                    ui.selectable_value(&mut self.model_choice, None, "<no model>");
                    for (i, model) in models.iter().enumerate() {
                        ui.selectable_value(
                            &mut self.model_choice,
                            Some(i),
                            model_label(asset_dir, model),
                        );
                    }
                });
            add = ui.button("Add Prototype").clicked();
            rescan = ui.add_enabled(!scanning, Button::new("Rescan")).clicked();
            if scanning {
                ui.spinner();
            }
        });
        if add {
            self.add_prototype(project);
        }
        if rescan {
            let root = self.asset_dir.clone();
            self.rescan.launch(unblock(move || scan_models(&root)));
        }
        ui.label(format!(
            "{} model files found in {}",
            self.models.len(),
            self.asset_dir.display()
        ));
        ui.separator();

        Self::prototype_table(project, requests, ui);
    }
}
