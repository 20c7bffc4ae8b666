//! Radio abstraction
//!
//! The scan controller only sees this trait. Backends push advertisements
//! into the sink they are handed on `start_discovery` and must stop pushing
//! once `stop_discovery` returns.

use crate::domain::session::{BondState, DeviceKind};
use thiserror::Error;
use tokio::sync::mpsc;

/// One advertisement as reported by the platform radio
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Advertisement {
    pub address: String,
    pub name: Option<String>,
    pub alias: Option<String>,
    pub kind: DeviceKind,
    pub bond_state: BondState,
    pub service_uuids: Option<Vec<String>>,
    pub rssi: i16,
    pub advertise_flags: Option<u8>,
}

pub type AdvertisementSink = mpsc::UnboundedSender<Advertisement>;

#[derive(Debug, Error)]
pub enum RadioError {
    #[error("no Bluetooth LE radio is available on this platform")]
    Unsupported,
    #[error("Bluetooth radio is turned off or missing")]
    PoweredOff,
    #[error("discovery is already registered")]
    AlreadyRegistered,
    #[error("platform error: {0}")]
    Platform(String),
}

/// Platform discovery API
pub trait Radio: Send {
    /// Whether the radio can currently be used for discovery
    fn is_available(&self) -> bool;

    /// Register for discovery; every advertisement goes to `sink`
    fn start_discovery(&mut self, sink: AdvertisementSink) -> Result<(), RadioError>;

    /// Unregister; must be safe to call when not registered
    fn stop_discovery(&mut self) -> Result<(), RadioError>;
}
