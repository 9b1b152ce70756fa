use eframe::egui;
use std::sync::{Arc, Mutex};

use crate::types::TaskKind;
use crate::ui::GuiState;

/// Render the central panel: the app table with selection checkboxes plus
/// the progress and status line.
pub fn show(ctx: &egui::Context, state: &Arc<Mutex<GuiState>>) {
    egui::CentralPanel::default().show(ctx, |ui| {
        let (apps_snapshot, task_running, current_task, status) = {
            let s = state.lock().unwrap();
            (
                s.apps.clone(),
                s.task_running,
                s.current_task.clone(),
                s.status.clone(),
            )
        };

        ui.horizontal(|ui| {
            ui.label(
                egui::RichText::new("Detected Apps")
                    .strong()
                    .size(16.0),
            );
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let all_selected = !apps_snapshot.is_empty()
                    && apps_snapshot.iter().all(|a| a.selected);
                let label = if all_selected { "Select None" } else { "Select All" };
                if !apps_snapshot.is_empty() && ui.button(label).clicked() {
                    let mut s = state.lock().unwrap();
                    for app in &mut s.apps {
                        app.selected = !all_selected;
                    }
                }
            });
        });
        ui.separator();

        if apps_snapshot.is_empty() {
            ui.centered_and_justified(|ui| {
                ui.label("No non-native apps found in the Dock. Try Refresh Apps.");
            });
            return;
        }

        egui::ScrollArea::vertical()
            .auto_shrink([false, true])
            .max_height(ui.available_height() - 60.0)
            .show(ui, |ui| {
                egui::Grid::new("app_table")
                    .num_columns(3)
                    .striped(true)
                    .min_col_width(120.0)
                    .show(ui, |ui| {
                        ui.label(egui::RichText::new("App Name").strong());
                        ui.label(egui::RichText::new("Version").strong());
                        ui.label(egui::RichText::new("Status").strong());
                        ui.end_row();

                        for (i, app) in apps_snapshot.iter().enumerate() {
                            let mut checked = app.selected;
                            if ui.checkbox(&mut checked, &app.name).changed() {
                                let mut s = state.lock().unwrap();
                                if let Some(entry) = s.apps.get_mut(i) {
                                    entry.selected = checked;
                                }
                            }
                            ui.label(&app.version);
                            let status_text = if task_running
                                && current_task == TaskKind::UpdateRun
                                && app.selected
                            {
                                "Updating..."
                            } else {
                                "Ready for update"
                            };
                            ui.label(status_text);
                            ui.end_row();
                        }
                    });
            });

        ui.add_space(8.0);
        ui.separator();
        ui.horizontal(|ui| {
            if task_running {
                ui.add(egui::Spinner::new());
            }
            ui.label(status);
        });
    });
}
