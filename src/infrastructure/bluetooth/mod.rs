//! Bluetooth Module
//!
//! Radio backends and the worker that drives a scan session.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                      ScanService                         │
//! │   (worker task: permission gate + scan controller)       │
//! └─────────────────────┬───────────────────────────────────┘
//!                       │ RadioFactory::open
//!         ┌─────────────┴─────────────┐
//!         ▼                           ▼
//! ┌───────────────┐          ┌────────────────┐
//! │  BleScanner   │          │ SimulatedRadio │
//! │ (WinRT watch) │          │ (script replay)│
//! └───────────────┘          └────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`protocol`] - Address, UUID and advertisement flag formatting
//! - [`radio`] - Backend selection from settings
//! - `scanner` - WinRT advertisement watcher (Windows only)
//! - [`simulated`] - Scripted advertisements for demos and tests
//! - [`service`] - Scan worker

pub mod protocol;
pub mod radio;
#[cfg(windows)]
pub mod scanner;
pub mod service;
pub mod simulated;

pub use service::ScanService;
