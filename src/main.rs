mod config;
mod export;
mod project;
mod settings;
mod terrain;
mod ui;
mod util;

use crate::config::EditorConfig;
use crate::project::DiskPersistence;
use crate::ui::views::Workspace;
use eframe::egui;
use egui::{Context, ViewportBuilder, Visuals};
use std::sync::Arc;

const APP_ID: &str = "Terranova";
const INITIAL_WINDOW_SIZE: [f32; 2] = [1600.0, 960.0];

fn configure_tracing() {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::filter::LevelFilter;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();
}

fn main() -> eframe::Result {
    configure_tracing();

    let native_options = eframe::NativeOptions {
        viewport: ViewportBuilder::default()
            .with_title(APP_ID)
            .with_inner_size(INITIAL_WINDOW_SIZE),
        ..Default::default()
    };
    eframe::run_native(
        APP_ID,
        native_options,
        Box::new(|cc| Ok(Box::new(Application::new(cc)))),
    )
}

struct Application {
    workspace: Workspace,
}

impl Application {
    fn new(cc: &eframe::CreationContext) -> Self {
        let config = EditorConfig::from_env();
        tracing::info!(asset_dir = %config.asset_dir.display(), "Starting editor");
        Application {
            workspace: Workspace::new(&cc.egui_ctx, config, Arc::new(DiskPersistence)),
        }
    }
}

impl eframe::App for Application {
    fn update(&mut self, ctx: &Context, frame: &mut eframe::Frame) {
        self.workspace.show(ctx, frame);
    }

    fn clear_color(&self, visuals: &Visuals) -> [f32; 4] {
        visuals
            .window_fill
            .gamma_multiply(0.5)
            .to_normalized_gamma_f32()
    }
}
