use ble_scanner::domain::settings::SettingsService;
use ble_scanner::infrastructure::logging;
use ble_scanner::presentation::app::BleScannerApp;
use eframe::egui;

fn main() -> anyhow::Result<()> {
    let settings = SettingsService::new()?;

    let _logging_guard = logging::init_logger(&settings.get().log_settings)
        .map_err(|e| eprintln!("Failed to initialize logging: {}", e))
        .ok();

    tracing::info!("Starting BLE Scanner");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([480.0, 720.0])
            .with_title("BLE Scanner"),
        ..Default::default()
    };

    eframe::run_native(
        "BLE Scanner",
        options,
        Box::new(|cc| Ok(Box::new(BleScannerApp::new(cc, settings)))),
    )
    .map_err(|e| anyhow::anyhow!("GUI error: {}", e))
}
