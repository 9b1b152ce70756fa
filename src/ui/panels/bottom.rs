use eframe::egui;
use eframe::epaint::Color32;
use log::Level;
use std::sync::{Arc, Mutex};

use crate::ui::GuiState;

/// Render the bottom log panel with the scrollback and the clear control.
pub fn show(ctx: &egui::Context, state: &Arc<Mutex<GuiState>>) {
    egui::TopBottomPanel::bottom("log_panel")
        .resizable(true)
        .default_height(150.0)
        .show(ctx, |ui| {
            ui.add_space(4.0);
            ui.horizontal(|ui| {
                ui.label(egui::RichText::new("LOG").strong());
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("Clear Log").clicked() {
                        // The display buffer always empties; truncating the
                        // file on disk needs an explicit confirmation.
                        let mut s = state.lock().unwrap();
                        s.log_lines.clear();
                        s.confirm_clear_file = true;
                    }
                });
            });

            let lines = {
                let s = state.lock().unwrap();
                s.log_lines.clone()
            };
            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .stick_to_bottom(true)
                .show(ui, |ui| {
                    ui.set_width(ui.available_width());
                    for line in &lines {
                        ui.label(
                            egui::RichText::new(&line.text)
                                .monospace()
                                .size(11.0)
                                .color(level_color(line.level)),
                        );
                    }
                });
        });

    show_clear_confirmation(ctx, state);
}

fn level_color(level: Level) -> Color32 {
    match level {
        Level::Error => Color32::from_rgb(200, 50, 50),
        Level::Warn => Color32::from_rgb(190, 120, 0),
        Level::Info => Color32::from_rgb(40, 40, 40),
        Level::Debug | Level::Trace => Color32::from_rgb(130, 130, 130),
    }
}

fn show_clear_confirmation(ctx: &egui::Context, state: &Arc<Mutex<GuiState>>) {
    let open = { state.lock().unwrap().confirm_clear_file };
    if !open {
        return;
    }

    egui::Window::new("Clear log file?")
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
        .show(ctx, |ui| {
            let log_path = { state.lock().unwrap().logger.path() };
            ui.label(format!(
                "The log display was cleared. Also truncate {}?",
                log_path.display()
            ));
            ui.add_space(6.0);
            ui.horizontal(|ui| {
                if ui.button("Truncate File").clicked() {
                    let result = { state.lock().unwrap().logger.clear_file() };
                    match result {
                        Ok(()) => log::info!("log file cleared"),
                        Err(e) => log::error!("could not clear log file: {e}"),
                    }
                    state.lock().unwrap().confirm_clear_file = false;
                }
                if ui.button("Keep File").clicked() {
                    state.lock().unwrap().confirm_clear_file = false;
                }
            });
        });
}
