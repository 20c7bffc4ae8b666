use crate::domain::session::{BondState, DiscoveredDevice};
use crate::infrastructure::bluetooth::protocol;
use eframe::egui;

pub struct Components;

impl Components {
    pub fn card<R>(ui: &mut egui::Ui, add_contents: impl FnOnce(&mut egui::Ui) -> R) -> R {
        let stroke = ui.style().visuals.widgets.noninteractive.bg_stroke;
        let bg = ui.style().visuals.widgets.noninteractive.bg_fill;

        egui::Frame::none()
            .inner_margin(egui::Margin::same(12.0))
            .rounding(egui::Rounding::same(4.0))
            .stroke(stroke)
            .fill(bg)
            .show(ui, |ui| {
                ui.set_width(ui.available_width());
                add_contents(ui)
            })
            .inner
    }

    pub fn status_line(ui: &mut egui::Ui, text: &str, color: egui::Color32) {
        ui.label(egui::RichText::new(text).color(color).strong());
    }

    /// One entry of the device list
    pub fn device_card(ui: &mut egui::Ui, device: &DiscoveredDevice) {
        Self::card(ui, |ui| {
            ui.label(format!("Name: {}", device.display_name().unwrap_or("N/A")));
            ui.label(format!("Address: {}", device.address));
            ui.horizontal(|ui| {
                ui.label(format!("RSSI: {} dBm", device.rssi));
                ui.separator();
                ui.label(format!("Type: {}", device.kind.label()));
                if device.bond_state == BondState::Bonded {
                    ui.separator();
                    ui.label("Bonded");
                }
            });
            if let Some(services) = &device.service_uuids {
                ui.label(format!("Services: {}", services.join(", ")));
            }
            if let Some(flags) = device.advertise_flags {
                let names = protocol::flag_names(flags);
                if !names.is_empty() {
                    ui.small(names.join(" | "));
                }
            }
        });
    }
}
