//! BLE Scanner
//!
//! Timed Bluetooth LE discovery with a first-seen-wins device list.
//!
//! - [`domain`] - session model, scan controller, permission gate, settings
//! - [`infrastructure`] - radio backends, scan worker, logging
//! - [`presentation`] - egui screen

pub mod domain;
pub mod infrastructure;
pub mod presentation;
