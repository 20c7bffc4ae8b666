//! Screen state mirrored from worker events

use crate::domain::models::{AppEvent, StatusMessage};
use crate::domain::permissions::{GateState, PermissionPrompt};
use crate::domain::session::DiscoveredDevice;

#[derive(Debug, Default)]
pub struct ScanView {
    pub is_scanning: bool,
    pub devices: Vec<DiscoveredDevice>,
    pub permissions: GateState,
    pub status: Option<StatusMessage>,
    pub prompt: Option<PermissionPrompt>,
}

impl ScanView {
    pub fn apply(&mut self, event: AppEvent) {
        match event {
            AppEvent::ScanState(snapshot) => {
                self.is_scanning = snapshot.is_scanning();
                self.devices = snapshot.devices;
            }
            // Only sent for addresses new to the running session
            AppEvent::DeviceDiscovered(device) => self.devices.push(device),
            AppEvent::Permissions(state) => {
                self.permissions = state;
                if state == GateState::Granted {
                    self.prompt = None;
                }
            }
            AppEvent::PermissionPrompt(prompt) => {
                // A newer prompt replaces an unanswered one, which reads as a denial
                self.prompt = Some(prompt);
            }
            AppEvent::LogMessage(msg) => self.status = Some(msg),
        }
    }

    /// Answer the pending permission prompt, if any
    pub fn answer_prompt(&mut self, allow: bool) {
        if let Some(prompt) = self.prompt.take() {
            prompt.respond(allow);
        }
    }

    pub fn toggle_label(&self) -> &'static str {
        if self.is_scanning {
            "STOP SCANNING"
        } else {
            "START SCANNING"
        }
    }

    pub fn device_count_label(&self) -> String {
        format!("Listing {} devices", self.devices.len())
    }

    pub fn scanning_enabled(&self) -> bool {
        self.permissions != GateState::Denied
    }
}
