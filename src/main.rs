mod config;
mod credentials;
mod dock;
mod errors;
mod logger;
mod managers;
mod orchestrator;
#[cfg(target_os = "macos")]
mod osx;
mod style;
mod types;
mod ui;

use std::sync::mpsc;

use eframe::egui;

fn main() -> eframe::Result<()> {
    // On macOS, proactively set the Dock icon from our bundle/dev resources
    #[cfg(target_os = "macos")]
    {
        osx::try_set_dock_icon_from_icns();
    }

    let cfg = config::Config::load();
    let (log_tx, log_rx) = mpsc::channel();
    let log_path = cfg
        .log_path
        .clone()
        .unwrap_or_else(logger::default_log_path);
    let logger = logger::init(log_path, cfg.level_filter(), log_tx);
    log::info!("Dock App Updater v{} starting", env!("CARGO_PKG_VERSION"));

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([820.0, 600.0])
            .with_min_inner_size([720.0, 520.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Dock App Updater",
        native_options,
        Box::new(move |_cc| Ok(Box::new(ui::DockUpdaterApp::new(cfg, logger, log_rx)))),
    )
}
