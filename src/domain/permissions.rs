//! Permission Gate
//!
//! Checks the capabilities a scan needs and asks the host for the missing
//! ones. Scanning stays disabled after a denial until the gate is invoked
//! again explicitly.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tokio::sync::oneshot;
use tracing::{info, warn};

/// Runtime capabilities a BLE scan may depend on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    RadioAccess,
    RadioAdmin,
    RadioConnect,
    RadioScan,
    RadioAdvertise,
    CoarseLocation,
    FineLocation,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::RadioAccess => "Bluetooth access",
            Self::RadioAdmin => "Bluetooth administration",
            Self::RadioConnect => "Bluetooth connect",
            Self::RadioScan => "Bluetooth scan",
            Self::RadioAdvertise => "Bluetooth advertise",
            Self::CoarseLocation => "Approximate location",
            Self::FineLocation => "Precise location",
        };
        f.write_str(label)
    }
}

/// Which capability set the host platform expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformProfile {
    /// Split scan/connect/advertise capabilities
    #[default]
    Modern,
    /// Older hosts that only know access, admin and location
    Legacy,
}

impl PlatformProfile {
    pub fn required_capabilities(&self) -> &'static [Capability] {
        match self {
            Self::Modern => &[
                Capability::RadioAccess,
                Capability::RadioAdmin,
                Capability::RadioConnect,
                Capability::RadioScan,
                Capability::RadioAdvertise,
                Capability::FineLocation,
            ],
            Self::Legacy => &[
                Capability::RadioAccess,
                Capability::RadioAdmin,
                Capability::FineLocation,
            ],
        }
    }
}

pub type PermissionResults = HashMap<Capability, bool>;

/// Host-side permission API
pub trait PermissionHost: Send {
    fn check(&self, capability: Capability) -> bool;

    /// Ask for `capabilities`. Dropping the reply sender counts as a denial.
    fn request(&mut self, capabilities: &[Capability]) -> oneshot::Receiver<PermissionResults>;
}

/// A pending question to the user, answered from the UI
#[derive(Debug)]
pub struct PermissionPrompt {
    pub capabilities: Vec<Capability>,
    reply: oneshot::Sender<bool>,
}

impl PermissionPrompt {
    pub fn new(capabilities: Vec<Capability>) -> (Self, oneshot::Receiver<bool>) {
        let (reply, answer) = oneshot::channel();
        (
            Self {
                capabilities,
                reply,
            },
            answer,
        )
    }

    pub fn respond(self, allow: bool) {
        // The requester may already be gone
        let _ = self.reply.send(allow);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GateState {
    /// Never asked
    #[default]
    Unknown,
    Granted,
    Denied,
}

pub struct PermissionGate<H: PermissionHost> {
    host: H,
    profile: PlatformProfile,
    state: GateState,
}

impl<H: PermissionHost> PermissionGate<H> {
    pub fn new(host: H, profile: PlatformProfile) -> Self {
        Self {
            host,
            profile,
            state: GateState::Unknown,
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    /// Check the profile's capabilities and request the missing ones.
    ///
    /// Suspends until the host answers. No retry on denial.
    pub async fn check_and_request(&mut self) -> bool {
        let missing: Vec<Capability> = self
            .profile
            .required_capabilities()
            .iter()
            .copied()
            .filter(|c| !self.host.check(*c))
            .collect();

        if missing.is_empty() {
            self.state = GateState::Granted;
            return true;
        }

        info!("Requesting permissions: {:?}", missing);
        let results = self.host.request(&missing).await.unwrap_or_default();
        let denied: Vec<Capability> = missing
            .iter()
            .copied()
            .filter(|c| !results.get(c).copied().unwrap_or(false))
            .collect();

        if denied.is_empty() {
            info!("All permissions granted");
            self.state = GateState::Granted;
            true
        } else {
            warn!("Permissions denied: {:?}", denied);
            self.state = GateState::Denied;
            false
        }
    }
}
