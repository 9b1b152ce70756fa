use eframe::egui;
use std::sync::{Arc, Mutex};

use crate::ui::GuiState;

/// Render the top header panel.
pub fn show(ctx: &egui::Context, state: &Arc<Mutex<GuiState>>) {
    let scale = ctx.pixels_per_point();
    let has_credential = {
        let s = state.lock().unwrap();
        s.credential.is_some()
    };
    egui::TopBottomPanel::top("top").show(ctx, |ui| {
        ui.add_space(8.0 * scale);
        ui.horizontal(|ui| {
            ui.heading(format!("🔄 Dock App Updater v{}", env!("CARGO_PKG_VERSION")));
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if has_credential {
                    ui.label("🔐 credentials set");
                } else {
                    ui.colored_label(egui::Color32::from_rgb(200, 70, 70), "no credentials");
                }
            });
        });
        ui.add_space(6.0 * scale);
    });
}
