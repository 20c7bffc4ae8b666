use crate::domain::models::{AppEvent, ScanCommand};
use crate::domain::settings::SettingsService;
use crate::presentation::view::ScanView;
use eframe::egui;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, warn};

pub struct BleScannerApp {
    pub(crate) settings: SettingsService,

    // Scan worker
    pub(crate) scan_tx: Option<mpsc::UnboundedSender<ScanCommand>>,
    pub(crate) event_rx: mpsc::UnboundedReceiver<AppEvent>,

    pub(crate) view: ScanView,
    pub(crate) is_dark_mode: bool,
}

impl BleScannerApp {
    pub fn new(cc: &eframe::CreationContext<'_>, settings: SettingsService) -> Self {
        let is_dark_mode = settings.get().dark_mode;
        crate::presentation::theme::apply_theme(&cc.egui_ctx, is_dark_mode);

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let scan_tx = match crate::infrastructure::bluetooth::service::spawn(settings.get(), event_tx)
        {
            Ok(tx) => Some(tx),
            Err(e) => {
                error!("Failed to start scan worker: {}", e);
                None
            }
        };

        Self {
            settings,
            scan_tx,
            event_rx,
            view: ScanView::default(),
            is_dark_mode,
        }
    }

    pub(crate) fn send(&self, cmd: ScanCommand) {
        match &self.scan_tx {
            Some(tx) => {
                if tx.send(cmd).is_err() {
                    warn!("Scan worker is gone, dropping {:?}", cmd);
                }
            }
            None => warn!("No scan worker, dropping {:?}", cmd),
        }
    }

    fn toggle_theme(&mut self, ctx: &egui::Context) {
        self.is_dark_mode = !self.is_dark_mode;
        crate::presentation::theme::apply_theme(ctx, self.is_dark_mode);
        if let Err(e) = self.settings.set_dark_mode(self.is_dark_mode) {
            warn!("Failed to save settings: {}", e);
        }
    }
}

impl eframe::App for BleScannerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        while let Ok(event) = self.event_rx.try_recv() {
            self.view.apply(event);
        }

        // Worker events do not wake the UI on their own
        ctx.request_repaint_after(Duration::from_millis(100));

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.heading("BLE Scanner");
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let switch_label = if self.is_dark_mode { "Light" } else { "Dark" };
                    if ui.button(switch_label).clicked() {
                        self.toggle_theme(ctx);
                    }
                });
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            crate::presentation::screen::render(self, ui);
        });

        crate::presentation::screen::permission_prompt(self, ctx);
    }
}

impl Drop for BleScannerApp {
    fn drop(&mut self) {
        self.send(ScanCommand::Shutdown);
    }
}
