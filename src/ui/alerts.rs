use egui::{Align, Context, Frame, Id, Layout, RichText, ScrollArea, ViewportCommand};
use std::collections::VecDeque;
use std::path::PathBuf;
use tracing::{error, info};

/// Session-owned notifications: errors, quit confirmation and the help window.
pub struct Alerts {
    errors: VecDeque<String>,
    confirm_quit: bool,
    help_open: bool,
    asset_dir: PathBuf,
}

impl Alerts {
    pub fn new(asset_dir: PathBuf) -> Self {
        Self {
            errors: VecDeque::new(),
            confirm_quit: false,
            help_open: false,
            asset_dir,
        }
    }

    pub fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        error!("{message}");
        self.errors.push_back(message);
    }

    pub fn current_error(&self) -> Option<&str> {
        self.errors.front().map(String::as_str)
    }

    pub fn dismiss_error(&mut self) {
        self.errors.pop_front();
    }

    pub fn request_quit(&mut self) {
        self.confirm_quit = true;
    }

    pub fn open_help(&mut self) {
        self.help_open = true;
    }

    pub fn is_blocking(&self) -> bool {
        !self.errors.is_empty() || self.confirm_quit
    }

    pub fn show(&mut self, ctx: &Context) {
        self.show_help(ctx);

        if let Some(message) = self.current_error() {
            let mut dismissed = false;
            egui::Modal::new(Id::new("error_alert"))
                .frame(Frame::window(&ctx.style()))
                .show(ctx, |ui| {
                    ui.set_max_width(420.0);
                    ui.heading("Error");
                    ui.separator();
                    ui.colored_label(ui.visuals().error_fg_color, message);
                    ui.separator();
                    ui.with_layout(Layout::right_to_left(Align::Min), |ui| {
                        dismissed = ui.button("OK").clicked();
                    });
                });
            if dismissed {
                self.dismiss_error();
            }
            return;
        }

        if self.confirm_quit {
            let modal = egui::Modal::new(Id::new("quit_confirmation"))
                .frame(Frame::window(&ctx.style()))
                .show(ctx, |ui| {
                    ui.heading("Quit Confirmation");
                    ui.label("Are you sure you want to quit?");
                    ui.separator();
                    ui.with_layout(Layout::right_to_left(Align::Min), |ui| {
                        let cancel = ui.button("Cancel").clicked();
                        let ok = ui.button("OK").clicked();
                        (ok, cancel)
                    })
                    .inner
                });
            let (ok, cancel) = modal.inner;
            if ok {
                info!("Quit confirmed");
                ctx.send_viewport_cmd(ViewportCommand::Close);
            }
            if ok || cancel || modal.should_close() {
                self.confirm_quit = false;
            }
        }
    }

    fn show_help(&mut self, ctx: &Context) {
        let heading = |text: &str| RichText::new(text).strong();
        egui::Window::new("Terranova Help")
            .id(Id::new("help_window"))
            .open(&mut self.help_open)
            .default_size([430.0, 300.0])
            .show(ctx, |ui| {
                ScrollArea::vertical().show(ui, |ui| {
                    ui.label(heading("Usage"));
                    ui.label("Drag the terrain preview to pan it, scroll to zoom.");
                    ui.label("Each editor in the View and Tools menus opens once; reopening it brings the same window back with your edits intact.");
                    ui.separator();

                    ui.label(heading("Assets"));
                    ui.label(format!(
                        "Textures and models are picked from {}. Set {} to use another directory.",
                        self.asset_dir.display(),
                        crate::config::ASSET_DIR_VAR,
                    ));

                    ui.label(heading("Generated Assets"));
                    ui.label("Generated heightmaps and splat maps are saved as PNG assets and then imported into the terrain settings. A generator can also be applied to the terrain directly with \"Use as Terrain\".");

                    ui.label(heading("Export Settings"));
                    ui.label("Saving and loading projects only stores settings. Generated terrain and vegetation are rebuilt after loading, so export the scene as a backup.");
                    ui.label("Terrain to Heightmap writes a 16-bit PNG from the current terrain heights, normalized to their range. It will differ from a source heightmap image if the terrain was resized or scaled.");
                });
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_are_shown_in_order() {
        let mut alerts = Alerts::new(PathBuf::from("/assets"));
        assert!(!alerts.is_blocking());

        alerts.error("first");
        alerts.error("second");
        assert!(alerts.is_blocking());
        assert_eq!(alerts.current_error(), Some("first"));

        alerts.dismiss_error();
        assert_eq!(alerts.current_error(), Some("second"));
        alerts.dismiss_error();
        assert_eq!(alerts.current_error(), None);
        assert!(!alerts.is_blocking());
    }

    #[test]
    fn quit_request_blocks_until_answered() {
        let mut alerts = Alerts::new(PathBuf::new());
        alerts.request_quit();
        assert!(alerts.is_blocking());
    }
}
