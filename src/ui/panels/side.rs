use eframe::egui;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::credentials;
use crate::ui::{GuiState, tasks};

/// Render the left sidebar with update controls, credential entry, and
/// settings.
pub fn show(ctx: &egui::Context, state: &Arc<Mutex<GuiState>>) {
    egui::SidePanel::left("sidebar")
        .resizable(false)
        .exact_width(260.0)
        .show(ctx, |ui| {
            ui.add_space(4.0);
            ui.label(egui::RichText::new("UPDATES").strong().size(16.0));
            ui.separator();

            let (task_running, run_active, selected, total) = {
                let s = state.lock().unwrap();
                (
                    s.task_running,
                    s.cancel.is_some(),
                    s.apps.iter().filter(|a| a.selected).count(),
                    s.apps.len(),
                )
            };

            if ui
                .add_enabled(!task_running, egui::Button::new("Refresh Apps"))
                .clicked()
            {
                tasks::spawn_refresh_apps(state.clone());
            }

            let update_label = format!("Update Selected ({selected})");
            if ui
                .add_enabled(!task_running && selected > 0, egui::Button::new(update_label))
                .clicked()
            {
                let names = {
                    let s = state.lock().unwrap();
                    s.apps
                        .iter()
                        .filter(|a| a.selected)
                        .map(|a| a.name.clone())
                        .collect()
                };
                tasks::spawn_update_run(state.clone(), names);
            }

            if ui
                .add_enabled(!task_running && total > 0, egui::Button::new("Update All"))
                .clicked()
            {
                let names = {
                    let s = state.lock().unwrap();
                    s.apps.iter().map(|a| a.name.clone()).collect()
                };
                tasks::spawn_update_run(state.clone(), names);
            }

            if ui
                .add_enabled(
                    run_active,
                    egui::Button::new(
                        egui::RichText::new("⏹ Force Stop").color(egui::Color32::WHITE),
                    )
                    .fill(egui::Color32::from_rgb(220, 68, 68)),
                )
                .clicked()
            {
                tasks::force_stop(state);
            }

            ui.add_space(10.0);
            ui.label(egui::RichText::new("SUDO CREDENTIALS").strong().size(16.0));
            ui.separator();
            show_credentials(ui, state);

            ui.add_space(10.0);
            ui.label(egui::RichText::new("SETTINGS").strong().size(16.0));
            ui.separator();
            show_settings(ui, state);
        });
}

fn show_credentials(ui: &mut egui::Ui, state: &Arc<Mutex<GuiState>>) {
    let mut input = {
        let s = state.lock().unwrap();
        s.credential_input.clone()
    };
    let edited = ui
        .add(
            egui::TextEdit::singleline(&mut input)
                .password(true)
                .hint_text("sudo password"),
        )
        .changed();
    if edited {
        state.lock().unwrap().credential_input = input.clone();
    }

    if ui
        .add_enabled(!input.is_empty(), egui::Button::new("Save to Keychain"))
        .clicked()
    {
        // The password is tested against sudo before it is persisted.
        if !credentials::verify_sudo(&input) {
            log::error!("sudo rejected the supplied password");
            state.lock().unwrap().status = "Invalid sudo password".into();
            return;
        }
        match credentials::store(&input) {
            Ok(()) => {
                log::info!("sudo credentials saved to keychain");
                let mut s = state.lock().unwrap();
                s.credential = Some(input);
                s.credential_input.clear();
                s.status = "Sudo credentials saved successfully".into();
            }
            Err(e) => {
                log::error!("{e}");
                state.lock().unwrap().status = format!("Failed to save credentials: {e}");
            }
        }
    }
}

fn show_settings(ui: &mut egui::Ui, state: &Arc<Mutex<GuiState>>) {
    let (mut auto_close, mut level, mut log_path_input) = {
        let s = state.lock().unwrap();
        (
            s.config.auto_close_after_update,
            s.config.log_level.clone(),
            s.log_path_input.clone(),
        )
    };

    if ui
        .checkbox(&mut auto_close, "Close after successful update")
        .changed()
    {
        let mut s = state.lock().unwrap();
        s.config.auto_close_after_update = auto_close;
        save_config(&mut s);
    }

    let mut level_changed = false;
    egui::ComboBox::from_label("Log level")
        .selected_text(level.clone())
        .show_ui(ui, |ui| {
            for option in ["debug", "info", "warning", "error"] {
                if ui
                    .selectable_value(&mut level, option.to_string(), option)
                    .clicked()
                {
                    level_changed = true;
                }
            }
        });
    if level_changed {
        let mut s = state.lock().unwrap();
        s.config.log_level = level;
        let filter = s.config.level_filter();
        s.logger.set_level(filter);
        save_config(&mut s);
    }

    ui.label("Log file:");
    if ui
        .add(egui::TextEdit::singleline(&mut log_path_input).desired_width(f32::INFINITY))
        .changed()
    {
        state.lock().unwrap().log_path_input = log_path_input.clone();
    }
    if ui.button("Apply Log Path").clicked() {
        let path = PathBuf::from(log_path_input.trim());
        let mut s = state.lock().unwrap();
        s.logger.set_path(path.clone());
        s.config.log_path = Some(path.clone());
        save_config(&mut s);
        drop(s);
        log::info!("log file moved to {}", path.display());
    }
}

fn save_config(s: &mut GuiState) {
    if let Err(e) = s.config.save() {
        log::warn!("could not save config: {e:#}");
    }
}
