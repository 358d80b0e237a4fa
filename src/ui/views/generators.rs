use crate::project::Project;
use crate::settings::{HeightmapSource, HillSettings, NoiseSettings, SplatMapSettings};
use crate::terrain::{Heightmap, SplatMap, generate_hills, generate_noise, generate_splat_map};
use crate::ui::file_actions::FileAction;
use crate::ui::promise::{EguiWaker, Promise};
use crate::ui::views::{EditorWindow, Request};
use crate::ui::{PreviewKey, PreviewTextureCache, heightmap_to_image, splat_map_to_image};
use blocking::{Task, unblock};
use egui::load::SizedTexture;
use egui::{Button, ColorImage, Context, DragValue, Grid, Id, Slider, Ui, Vec2, vec2};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

const PREVIEW_SIZE: f32 = 256.0;

fn show_preview(ui: &mut Ui, key: PreviewKey, image: impl FnOnce() -> ColorImage) {
    let texture = PreviewTextureCache::get_or_insert_with(ui.ctx(), key, image);
    ui.add(
        egui::Image::new(SizedTexture::from_handle(&texture))
            .fit_to_exact_size(Vec2::splat(PREVIEW_SIZE)),
    );
}

/// Generators that produce a normalized heightmap from a settings record in the project.
pub trait HeightmapGenerator: 'static {
    type Settings: Clone + Send + 'static;

    fn title() -> &'static str;
    fn source() -> HeightmapSource;
    fn default_size() -> Vec2;
    fn settings(project: &mut Project) -> &mut Self::Settings;
    fn edit(settings: &mut Self::Settings, ui: &mut Ui);
    fn generate(settings: &Self::Settings) -> anyhow::Result<Heightmap>;
}

pub struct Hills;

impl HeightmapGenerator for Hills {
    type Settings = HillSettings;

    fn title() -> &'static str {
        "Hill Height Map Generator"
    }

    fn source() -> HeightmapSource {
        HeightmapSource::HillGenerator
    }

    fn default_size() -> Vec2 {
        vec2(480.0, 380.0)
    }

    fn settings(project: &mut Project) -> &mut HillSettings {
        &mut project.hill_generator
    }

    fn edit(settings: &mut HillSettings, ui: &mut Ui) {
        Grid::new("hill_settings").num_columns(2).show(ui, |ui| {
            ui.label("Size:");
            ui.add(DragValue::new(&mut settings.size).range(2..=4097));
            ui.end_row();
            ui.label("Seed:");
            ui.add(DragValue::new(&mut settings.seed));
            ui.end_row();
            ui.label("Iterations:");
            ui.add(DragValue::new(&mut settings.iterations).range(1..=20000));
            ui.end_row();
            ui.label("Min radius:");
            ui.add(DragValue::new(&mut settings.min_radius).range(1.0..=500.0));
            ui.end_row();
            ui.label("Max radius:");
            ui.add(DragValue::new(&mut settings.max_radius).range(1.0..=500.0));
            ui.end_row();
            ui.label("Flattening:");
            ui.add(Slider::new(&mut settings.flattening, 1..=8));
            ui.end_row();
        });
        settings.max_radius = settings.max_radius.max(settings.min_radius);
    }

    fn generate(settings: &HillSettings) -> anyhow::Result<Heightmap> {
        generate_hills(settings)
    }
}

pub struct Noise;

impl HeightmapGenerator for Noise {
    type Settings = NoiseSettings;

    fn title() -> &'static str {
        "Noise Heightmap Generator"
    }

    fn source() -> HeightmapSource {
        HeightmapSource::NoiseGenerator
    }

    fn default_size() -> Vec2 {
        vec2(480.0, 650.0)
    }

    fn settings(project: &mut Project) -> &mut NoiseSettings {
        &mut project.noise_generator
    }

    fn edit(settings: &mut NoiseSettings, ui: &mut Ui) {
        Grid::new("noise_settings").num_columns(2).show(ui, |ui| {
            ui.label("Size:");
            ui.add(DragValue::new(&mut settings.size).range(2..=4097));
            ui.end_row();
            ui.label("Seed:");
            ui.add(DragValue::new(&mut settings.seed));
            ui.end_row();
            ui.label("Frequency:");
            ui.add(DragValue::new(&mut settings.frequency).range(0.01..=256.0).speed(0.05));
            ui.end_row();
            ui.label("Octaves:");
            ui.add(Slider::new(&mut settings.octaves, 1..=12));
            ui.end_row();
            ui.label("Lacunarity:");
            ui.add(Slider::new(&mut settings.lacunarity, 1.0..=4.0));
            ui.end_row();
            ui.label("Gain:");
            ui.add(Slider::new(&mut settings.gain, 0.05..=1.0));
            ui.end_row();
        });
    }

    fn generate(settings: &NoiseSettings) -> anyhow::Result<Heightmap> {
        generate_noise(settings)
    }
}

pub struct HeightmapGeneratorDialog<G> {
    job: Promise<Task<anyhow::Result<Heightmap>>>,
    result: Option<Arc<Heightmap>>,
    revision: u64,
    _generator: PhantomData<G>,
}

impl<G: HeightmapGenerator> HeightmapGeneratorDialog<G> {
    pub fn new(ctx: &Context) -> Self {
        Self {
            job: Promise::new(EguiWaker::for_context(ctx)),
            result: None,
            revision: 0,
            _generator: PhantomData,
        }
    }
}

impl<G: HeightmapGenerator> EditorWindow for HeightmapGeneratorDialog<G> {
    fn title(&self, _project: &Project) -> String {
        G::title().into()
    }

    fn stable_id(&self) -> Id {
        Id::new(concat!(module_path!(), "::HeightmapGenerator")).with(G::title())
    }

    fn default_size(&self) -> Vec2 {
        G::default_size()
    }

    fn show_contents(&mut self, project: &mut Project, requests: &mut Vec<Request>, ui: &mut Ui) {
        if let Some(result) = self.job.take_response() {
            match result {
                Ok(heightmap) => {
                    self.result = Some(Arc::new(heightmap));
                    self.revision += 1;
                }
                Err(e) => requests.push(Request::Error(format!("{} failed: {e:#}", G::title()))),
            }
        }

        let settings = G::settings(project);
        G::edit(settings, ui);
        ui.separator();

        ui.horizontal(|ui| {
            if ui
                .add_enabled(!self.job.is_pending(), Button::new("Generate"))
                .clicked()
            {
                let settings = settings.clone();
                debug!(generator = G::title(), "Generating preview");
                self.job.launch(unblock(move || G::generate(&settings)));
            }
            if self.job.is_pending() {
                ui.spinner();
            }
        });

        if let Some(heightmap) = &self.result {
            let key = PreviewKey {
                source: self.stable_id(),
                revision: self.revision,
            };
            show_preview(ui, key, || heightmap_to_image(heightmap));
        }

        ui.horizontal(|ui| {
            let has_result = self.result.is_some();
            if ui
                .add_enabled(has_result, Button::new("Save As…"))
                .clicked()
                && let Some(heightmap) = &self.result
            {
                requests.push(Request::File(FileAction::SaveGeneratedHeightmap(
                    heightmap.clone(),
                )));
            }
            if ui.button("Use as Terrain").clicked() {
                project.terrain.source = G::source();
                requests.push(Request::RebuildTerrain);
            }
        });
    }
}

pub struct SplatMapGenerator {
    job: Promise<Task<anyhow::Result<SplatMap>>>,
    result: Option<Arc<SplatMap>>,
    revision: u64,
}

impl SplatMapGenerator {
    pub fn new(ctx: &Context) -> Self {
        Self {
            job: Promise::new(EguiWaker::for_context(ctx)),
            result: None,
            revision: 0,
        }
    }

    fn edit(settings: &mut SplatMapSettings, ui: &mut Ui) {
        Grid::new("splat_settings").num_columns(2).show(ui, |ui| {
            ui.label("Size:");
            ui.add(DragValue::new(&mut settings.size).range(2..=4096));
            ui.end_row();
            for (label, height) in ["Low band:", "Mid band:", "High band:"]
                .into_iter()
                .zip(&mut settings.band_heights)
            {
                ui.label(label);
                ui.add(Slider::new(height, 0.0..=1.0));
                ui.end_row();
            }
            ui.label("Steep slope:");
            ui.add(DragValue::new(&mut settings.steep_slope).range(0.0..=10.0).speed(0.01));
            ui.end_row();
            ui.label("Blend width:");
            ui.add(Slider::new(&mut settings.blend_width, 0.01..=1.0));
            ui.end_row();
        });
        let [low, mid, high] = &mut settings.band_heights;
        *mid = mid.max(*low);
        *high = high.max(*mid);
    }
}

impl EditorWindow for SplatMapGenerator {
    fn title(&self, _project: &Project) -> String {
        "Splat Map Generator".into()
    }

    fn stable_id(&self) -> Id {
        Id::new(concat!(module_path!(), "::SplatMapGenerator"))
    }

    fn default_size(&self) -> Vec2 {
        vec2(480.0, 650.0)
    }

    fn show_contents(&mut self, project: &mut Project, requests: &mut Vec<Request>, ui: &mut Ui) {
        if let Some(result) = self.job.take_response() {
            match result {
                Ok(splat_map) => {
                    self.result = Some(Arc::new(splat_map));
                    self.revision += 1;
                }
                Err(e) => requests.push(Request::Error(format!("Splat map generation failed: {e:#}"))),
            }
        }

        Self::edit(&mut project.splat_generator, ui);
        ui.separator();

        ui.horizontal(|ui| {
            if ui
                .add_enabled(!self.job.is_pending(), Button::new("Generate"))
                .clicked()
            {
                match project.scene.require_terrain() {
                    Ok(terrain) => {
                        let settings = project.splat_generator.clone();
                        self.job
                            .launch(unblock(move || generate_splat_map(&terrain, &settings)));
                    }
                    Err(e) => requests.push(Request::Error(format!("{e:#}"))),
                }
            }
            if self.job.is_pending() {
                ui.spinner();
            }
        });

        if let Some(splat_map) = &self.result {
            let key = PreviewKey {
                source: self.stable_id(),
                revision: self.revision,
            };
            show_preview(ui, key, || splat_map_to_image(splat_map));
            if ui.button("Save As…").clicked() {
                requests.push(Request::File(FileAction::SaveSplatMap(splat_map.clone())));
            }
        }
    }
}
