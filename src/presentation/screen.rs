use crate::domain::models::{MessageSeverity, ScanCommand};
use crate::domain::permissions::GateState;
use crate::presentation::app::BleScannerApp;
use crate::presentation::components::Components;
use crate::presentation::theme::Palette;
use eframe::egui;

pub fn render(app: &mut BleScannerApp, ui: &mut egui::Ui) {
    let palette = Palette::new(app.is_dark_mode);

    ui_permission_banner(app, ui, &palette);
    ui_scan_controls(app, ui, &palette);
    ui_status(app, ui, &palette);
    ui.separator();
    ui_device_list(app, ui);
}

fn ui_permission_banner(app: &mut BleScannerApp, ui: &mut egui::Ui, palette: &Palette) {
    if app.view.permissions != GateState::Denied {
        return;
    }
    Components::card(ui, |ui| {
        Components::status_line(
            ui,
            "Bluetooth permissions were denied. Scanning is disabled.",
            palette.error,
        );
        if ui.button("Request permissions").clicked() {
            app.send(ScanCommand::RequestPermissions);
        }
    });
    ui.add_space(8.0);
}

fn ui_scan_controls(app: &mut BleScannerApp, ui: &mut egui::Ui, palette: &Palette) {
    ui.horizontal(|ui| {
        let button = egui::Button::new(app.view.toggle_label());
        if ui.add_enabled(app.view.scanning_enabled(), button).clicked() {
            app.send(ScanCommand::ToggleScan);
        }
        if app.view.is_scanning {
            ui.spinner();
            ui.colored_label(palette.scanning, "Scanning...");
        }

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            ui.label(egui::RichText::new(app.view.device_count_label()).strong());
        });
    });
}

fn ui_status(app: &BleScannerApp, ui: &mut egui::Ui, palette: &Palette) {
    if let Some(msg) = &app.view.status {
        let color = match msg.severity {
            MessageSeverity::Info => palette.fg,
            MessageSeverity::Success => palette.scanning,
            MessageSeverity::Warning => egui::Color32::from_rgb(200, 150, 0),
            MessageSeverity::Error => palette.error,
        };
        Components::status_line(ui, &msg.message, color);
    }
}

fn ui_device_list(app: &BleScannerApp, ui: &mut egui::Ui) {
    egui::ScrollArea::vertical()
        .id_salt("device_list")
        .auto_shrink([false, false])
        .show(ui, |ui| {
            for device in &app.view.devices {
                Components::device_card(ui, device);
                ui.add_space(4.0);
            }
        });
}

/// Modal asking the user to allow the requested capabilities
pub fn permission_prompt(app: &mut BleScannerApp, ctx: &egui::Context) {
    let Some(prompt) = &app.view.prompt else {
        return;
    };
    let capabilities: Vec<String> = prompt.capabilities.iter().map(|c| c.to_string()).collect();

    let mut answer = None;
    egui::Window::new("Bluetooth permissions")
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
        .show(ctx, |ui| {
            ui.label("BLE Scanner needs the following permissions to discover nearby devices:");
            for name in &capabilities {
                ui.label(format!("• {}", name));
            }
            ui.add_space(8.0);
            ui.horizontal(|ui| {
                if ui.button("Allow").clicked() {
                    answer = Some(true);
                }
                if ui.button("Deny").clicked() {
                    answer = Some(false);
                }
            });
        });

    if let Some(allow) = answer {
        app.view.answer_prompt(allow);
    }
}
