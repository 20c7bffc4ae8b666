use crate::domain::permissions::{GateState, PermissionPrompt};
use crate::domain::session::{DiscoveredDevice, ScanSnapshot};

/// Events flowing from the scan worker to the presentation layer
#[derive(Debug)]
pub enum AppEvent {
    /// Scan phase changed; carries the full session snapshot
    ScanState(ScanSnapshot),
    /// A new address was appended to the current session
    DeviceDiscovered(DiscoveredDevice),
    /// Permission gate changed state
    Permissions(GateState),
    /// The host is waiting for the user to answer a permission prompt
    PermissionPrompt(PermissionPrompt),
    LogMessage(StatusMessage),
}

/// Commands sent from the presentation layer to the scan worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanCommand {
    /// Start when idle, stop when scanning
    ToggleScan,
    StartScan,
    StopScan,
    /// Re-invoke the permission gate after a denial
    RequestPermissions,
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub message: String,
    pub severity: MessageSeverity,
}

impl StatusMessage {
    pub fn new(message: impl Into<String>, severity: MessageSeverity) -> Self {
        Self {
            message: message.into(),
            severity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSeverity {
    Info,
    Success,
    Warning,
    Error,
}
