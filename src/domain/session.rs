//! Scan Session Model
//!
//! Discovered device records and the first-seen-wins device list that a
//! single scan session accumulates.

use crate::domain::radio::Advertisement;
use std::collections::HashSet;

/// Radio technology reported for a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceKind {
    #[default]
    Unknown,
    Classic,
    Le,
    Dual,
}

impl DeviceKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Classic => "Classic",
            Self::Le => "LE",
            Self::Dual => "Dual",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BondState {
    #[default]
    None,
    Bonding,
    Bonded,
}

/// Immutable record of the first advertisement seen for an address
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredDevice {
    pub address: String,
    pub name: Option<String>,
    pub alias: Option<String>,
    pub kind: DeviceKind,
    pub bond_state: BondState,
    pub service_uuids: Option<Vec<String>>,
    pub rssi: i16,
    pub advertise_flags: Option<u8>,
}

impl DiscoveredDevice {
    /// Name shown in the device list, falling back to the alias
    pub fn display_name(&self) -> Option<&str> {
        let non_empty = |n: &&str| !n.is_empty();
        self.name
            .as_deref()
            .filter(non_empty)
            .or_else(|| self.alias.as_deref().filter(non_empty))
    }
}

impl From<Advertisement> for DiscoveredDevice {
    fn from(adv: Advertisement) -> Self {
        Self {
            address: normalize_address(&adv.address),
            name: adv.name.filter(|n| !n.is_empty()),
            alias: adv.alias.filter(|n| !n.is_empty()),
            kind: adv.kind,
            bond_state: adv.bond_state,
            service_uuids: adv.service_uuids,
            rssi: adv.rssi,
            advertise_flags: adv.advertise_flags,
        }
    }
}

/// Addresses are keyed case-insensitively
pub fn normalize_address(address: &str) -> String {
    address.trim().to_ascii_uppercase()
}

/// Insertion-ordered device collection with at most one entry per address
#[derive(Debug, Clone, Default)]
pub struct DeviceList {
    devices: Vec<DiscoveredDevice>,
    seen: HashSet<String>,
}

impl DeviceList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the advertisement unless its address is already listed.
    ///
    /// Returns the stored record for a new address, `None` for a repeat
    /// sighting. Repeat sightings never update the stored record.
    pub fn insert(&mut self, adv: Advertisement) -> Option<&DiscoveredDevice> {
        let key = normalize_address(&adv.address);
        if !self.seen.insert(key) {
            return None;
        }
        self.devices.push(DiscoveredDevice::from(adv));
        self.devices.last()
    }

    pub fn clear(&mut self) {
        self.devices.clear();
        self.seen.clear();
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn as_slice(&self) -> &[DiscoveredDevice] {
        &self.devices
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanPhase {
    #[default]
    Idle,
    Scanning,
}

/// Why a session left the `Scanning` phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Manual,
    TimerExpired,
    Shutdown,
    /// The radio closed the advertisement channel mid-session
    RadioLost,
}

/// Read-only view of a session handed to observers
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScanSnapshot {
    pub phase: ScanPhase,
    pub devices: Vec<DiscoveredDevice>,
}

impl ScanSnapshot {
    pub fn is_scanning(&self) -> bool {
        self.phase == ScanPhase::Scanning
    }
}

/// One bounded scanning attempt: its phase and the devices it has seen
#[derive(Debug, Clone, Default)]
pub struct ScanSession {
    phase: ScanPhase,
    devices: DeviceList,
}

impl ScanSession {
    pub fn phase(&self) -> ScanPhase {
        self.phase
    }

    pub fn is_scanning(&self) -> bool {
        self.phase == ScanPhase::Scanning
    }

    pub fn devices(&self) -> &DeviceList {
        &self.devices
    }

    /// Replace the previous session's results and enter `Scanning`
    pub(crate) fn begin(&mut self) {
        self.devices.clear();
        self.phase = ScanPhase::Scanning;
    }

    /// Returns false when the session was already idle
    pub(crate) fn end(&mut self) -> bool {
        if self.phase == ScanPhase::Idle {
            return false;
        }
        self.phase = ScanPhase::Idle;
        true
    }

    /// Record an advertisement; ignored unless scanning
    pub(crate) fn record(&mut self, adv: Advertisement) -> Option<&DiscoveredDevice> {
        if self.phase != ScanPhase::Scanning {
            return None;
        }
        self.devices.insert(adv)
    }

    pub fn snapshot(&self) -> ScanSnapshot {
        ScanSnapshot {
            phase: self.phase,
            devices: self.devices.as_slice().to_vec(),
        }
    }
}
