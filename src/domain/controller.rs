//! Scan Session Controller
//!
//! Owns the `Idle -> Scanning -> Idle` state machine. The discovery
//! registration and the auto-stop deadline live together in [`ActiveScan`]
//! and are dropped together on every exit from `Scanning`.

use crate::domain::models::{AppEvent, MessageSeverity, StatusMessage};
use crate::domain::radio::{Advertisement, Radio, RadioError};
use crate::domain::session::{ScanPhase, ScanSession, ScanSnapshot, StopReason};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

pub const DEFAULT_SCAN_DURATION: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("required permissions have not been granted")]
    PermissionDenied,
    #[error("Bluetooth radio is unavailable")]
    RadioUnavailable,
    #[error("failed to register for discovery: {0}")]
    Radio(#[from] RadioError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    /// A session is already running; nothing changed
    AlreadyScanning,
}

/// Resources scoped to the `Scanning` phase
struct ActiveScan {
    advertisements: mpsc::UnboundedReceiver<Advertisement>,
    deadline: Instant,
}

pub struct ScanController<R: Radio> {
    radio: Option<R>,
    session: ScanSession,
    active: Option<ActiveScan>,
    scan_duration: Duration,
    event_sender: mpsc::UnboundedSender<AppEvent>,
}

impl<R: Radio> ScanController<R> {
    pub fn new(scan_duration: Duration, event_sender: mpsc::UnboundedSender<AppEvent>) -> Self {
        Self {
            radio: None,
            session: ScanSession::default(),
            active: None,
            scan_duration,
            event_sender,
        }
    }

    /// Hand over the radio once the permission gate has passed
    pub fn attach_radio(&mut self, radio: R) {
        self.radio = Some(radio);
    }

    pub fn has_radio(&self) -> bool {
        self.radio.is_some()
    }

    pub fn phase(&self) -> ScanPhase {
        self.session.phase()
    }

    pub fn session(&self) -> &ScanSession {
        &self.session
    }

    pub fn snapshot(&self) -> ScanSnapshot {
        self.session.snapshot()
    }

    /// When the running session stops on its own, if one is running
    pub fn deadline(&self) -> Option<Instant> {
        self.active.as_ref().map(|a| a.deadline)
    }

    /// Start a new session.
    ///
    /// A no-op while scanning. Rejected without any state change when there
    /// is no radio (permissions not granted) or the radio refuses to register.
    pub fn start(&mut self) -> Result<StartOutcome, ScanError> {
        if self.session.is_scanning() {
            debug!("Start ignored, scan already running");
            return Ok(StartOutcome::AlreadyScanning);
        }

        let radio = self.radio.as_mut().ok_or(ScanError::PermissionDenied)?;
        if !radio.is_available() {
            return Err(ScanError::RadioUnavailable);
        }

        let (sink, advertisements) = mpsc::unbounded_channel();
        radio.start_discovery(sink).map_err(|e| match e {
            RadioError::PoweredOff | RadioError::Unsupported => ScanError::RadioUnavailable,
            other => ScanError::Radio(other),
        })?;

        self.session.begin();
        self.active = Some(ActiveScan {
            advertisements,
            deadline: Instant::now() + self.scan_duration,
        });

        info!("BLE scan started for {:?}", self.scan_duration);
        self.notify_state();
        self.send_log("Scanning for BLE devices...", MessageSeverity::Info);
        Ok(StartOutcome::Started)
    }

    /// End the running session. Returns false (and notifies nobody) when idle.
    pub fn stop(&mut self, reason: StopReason) -> bool {
        if !self.session.is_scanning() {
            return false;
        }
        self.release();
        self.session.end();

        let count = self.session.devices().len();
        info!("BLE scan stopped ({:?}), {} devices", reason, count);
        self.notify_state();
        match reason {
            StopReason::TimerExpired => self.send_log(
                format!("Scan finished: {} devices found", count),
                MessageSeverity::Success,
            ),
            StopReason::Manual | StopReason::Shutdown => self.send_log(
                format!("Scan stopped: {} devices found", count),
                MessageSeverity::Success,
            ),
            StopReason::RadioLost => self.send_log(
                format!("Bluetooth radio stopped the scan: {} devices found", count),
                MessageSeverity::Warning,
            ),
        }
        true
    }

    /// Apply first-seen-wins deduplication to one advertisement
    pub fn on_device_discovered(&mut self, adv: Advertisement) -> bool {
        let Some(device) = self.session.record(adv) else {
            return false;
        };
        debug!("Discovered {} ({} dBm)", device.address, device.rssi);
        let _ = self
            .event_sender
            .send(AppEvent::DeviceDiscovered(device.clone()));
        true
    }

    /// Fire the auto-stop if the deadline has passed
    pub fn on_timer(&mut self) -> bool {
        match self.deadline() {
            Some(deadline) if Instant::now() >= deadline => self.stop(StopReason::TimerExpired),
            _ => false,
        }
    }

    /// End the session after the radio dropped its sink
    pub fn on_radio_lost(&mut self) -> bool {
        if self.session.is_scanning() {
            warn!("Advertisement channel closed while scanning");
        }
        self.stop(StopReason::RadioLost)
    }

    /// Wait for the next advertisement of the running session.
    ///
    /// Pending forever while idle; `None` when the radio dropped its sink.
    pub async fn next_advertisement(&mut self) -> Option<Advertisement> {
        match self.active.as_mut() {
            Some(active) => active.advertisements.recv().await,
            None => std::future::pending().await,
        }
    }

    /// Drop the registration and the deadline together
    fn release(&mut self) {
        self.active = None;
        if let Some(radio) = self.radio.as_mut() {
            if let Err(e) = radio.stop_discovery() {
                warn!("Failed to unregister discovery: {}", e);
            }
        }
    }

    fn notify_state(&self) {
        let _ = self
            .event_sender
            .send(AppEvent::ScanState(self.session.snapshot()));
    }

    fn send_log(&self, message: impl Into<String>, severity: MessageSeverity) {
        let _ = self
            .event_sender
            .send(AppEvent::LogMessage(StatusMessage::new(message, severity)));
    }
}

impl<R: Radio> Drop for ScanController<R> {
    fn drop(&mut self) {
        if self.session.is_scanning() {
            self.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::radio::testing::RecordingRadio;

    fn controller() -> (
        ScanController<RecordingRadio>,
        RecordingRadio,
        mpsc::UnboundedReceiver<AppEvent>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let radio = RecordingRadio::new();
        let mut controller = ScanController::new(DEFAULT_SCAN_DURATION, tx);
        controller.attach_radio(radio.clone());
        (controller, radio, rx)
    }

    fn state_events(rx: &mut mpsc::UnboundedReceiver<AppEvent>) -> Vec<ScanPhase> {
        let mut phases = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let AppEvent::ScanState(snapshot) = event {
                phases.push(snapshot.phase);
            }
        }
        phases
    }

    fn addresses(controller: &ScanController<RecordingRadio>) -> Vec<String> {
        controller
            .snapshot()
            .devices
            .into_iter()
            .map(|d| d.address)
            .collect()
    }

    fn adv(address: &str) -> Advertisement {
        Advertisement {
            address: address.to_string(),
            rssi: -60,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_duplicate_sighting_scenario() {
        let (mut controller, radio, _rx) = controller();
        controller.start().unwrap();

        assert!(radio.emit("AA:BB", -40));
        assert!(radio.emit("CC:DD", -50));
        assert!(radio.emit("AA:BB", -70));
        for _ in 0..3 {
            let adv = controller.next_advertisement().await.unwrap();
            controller.on_device_discovered(adv);
        }

        assert_eq!(addresses(&controller), vec!["AA:BB", "CC:DD"]);
        assert_eq!(controller.snapshot().devices[0].rssi, -40);
    }

    #[tokio::test]
    async fn test_start_while_scanning_changes_nothing() {
        let (mut controller, radio, mut rx) = controller();
        controller.start().unwrap();
        controller.on_device_discovered(adv("AA:BB"));
        let deadline = controller.deadline();
        state_events(&mut rx);

        assert_eq!(controller.start().unwrap(), StartOutcome::AlreadyScanning);
        assert_eq!(controller.phase(), ScanPhase::Scanning);
        assert_eq!(addresses(&controller), vec!["AA:BB"]);
        assert_eq!(controller.deadline(), deadline);
        assert_eq!(radio.starts(), 1);
        assert!(state_events(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_stop_while_idle_is_silent() {
        let (mut controller, radio, mut rx) = controller();
        assert!(!controller.stop(StopReason::Manual));
        assert_eq!(controller.phase(), ScanPhase::Idle);
        assert_eq!(radio.stops(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_immediate_stop_leaves_empty_idle_session() {
        let (mut controller, radio, mut rx) = controller();
        controller.start().unwrap();
        assert!(controller.stop(StopReason::Manual));

        assert_eq!(controller.phase(), ScanPhase::Idle);
        assert!(controller.snapshot().devices.is_empty());
        assert_eq!(controller.deadline(), None);
        assert_eq!(radio.stops(), 1);
        assert_eq!(
            state_events(&mut rx),
            vec![ScanPhase::Scanning, ScanPhase::Idle]
        );
    }

    #[tokio::test]
    async fn test_no_radio_rejects_start() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut controller: ScanController<RecordingRadio> =
            ScanController::new(DEFAULT_SCAN_DURATION, tx);
        assert!(matches!(controller.start(), Err(ScanError::PermissionDenied)));
        assert_eq!(controller.phase(), ScanPhase::Idle);
    }

    #[tokio::test]
    async fn test_unavailable_radio_rejects_start_without_clearing() {
        let (mut controller, mut radio, _rx) = controller();
        controller.start().unwrap();
        controller.on_device_discovered(adv("AA:BB"));
        controller.stop(StopReason::Manual);

        radio.available = false;
        controller.attach_radio(radio.clone());
        assert!(matches!(controller.start(), Err(ScanError::RadioUnavailable)));
        assert_eq!(controller.phase(), ScanPhase::Idle);
        assert_eq!(addresses(&controller), vec!["AA:BB"]);
    }

    #[tokio::test]
    async fn test_registration_failure_keeps_idle() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut radio = RecordingRadio::new();
        radio.fail_start = true;
        let mut controller = ScanController::new(DEFAULT_SCAN_DURATION, tx);
        controller.attach_radio(radio);

        assert!(matches!(controller.start(), Err(ScanError::Radio(_))));
        assert_eq!(controller.phase(), ScanPhase::Idle);
        assert_eq!(controller.deadline(), None);
    }

    #[tokio::test]
    async fn test_late_advertisement_is_ignored() {
        let (mut controller, radio, _rx) = controller();
        controller.start().unwrap();
        controller.stop(StopReason::Manual);

        assert!(!radio.emit("AA:BB", -40));
        assert!(!controller.on_device_discovered(adv("CC:DD")));
        assert!(controller.snapshot().devices.is_empty());
    }

    #[tokio::test]
    async fn test_new_session_starts_empty() {
        let (mut controller, _radio, _rx) = controller();
        controller.start().unwrap();
        controller.on_device_discovered(adv("AA:BB"));
        controller.stop(StopReason::Manual);
        assert_eq!(addresses(&controller), vec!["AA:BB"]);

        controller.start().unwrap();
        assert!(controller.snapshot().devices.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_stops_at_deadline() {
        let (mut controller, radio, _rx) = controller();
        controller.start().unwrap();

        tokio::time::advance(DEFAULT_SCAN_DURATION - Duration::from_millis(1)).await;
        assert!(!controller.on_timer());
        assert_eq!(controller.phase(), ScanPhase::Scanning);

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(controller.on_timer());
        assert_eq!(controller.phase(), ScanPhase::Idle);
        assert_eq!(radio.stops(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_old_deadline_does_not_stop_restarted_session() {
        let (mut controller, radio, _rx) = controller();
        controller.start().unwrap();

        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(controller.stop(StopReason::Manual));
        tokio::time::advance(Duration::from_secs(1)).await;
        controller.start().unwrap();

        // First session's deadline has passed, the second one runs until 16 s
        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(!controller.on_timer());
        assert_eq!(controller.phase(), ScanPhase::Scanning);

        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(controller.on_timer());
        assert_eq!(controller.phase(), ScanPhase::Idle);
        assert_eq!(radio.starts(), 2);
    }

    #[tokio::test]
    async fn test_closed_sink_ends_session() {
        let (mut controller, radio, mut rx) = controller();
        controller.start().unwrap();
        controller.on_device_discovered(adv("AA:BB"));
        radio.disconnect();

        assert!(controller.next_advertisement().await.is_none());
        assert!(controller.on_radio_lost());
        assert_eq!(controller.phase(), ScanPhase::Idle);
        assert_eq!(addresses(&controller), vec!["AA:BB"]);
        assert_eq!(state_events(&mut rx), vec![ScanPhase::Scanning, ScanPhase::Idle]);
        assert!(!controller.on_radio_lost());
    }

    #[tokio::test]
    async fn test_drop_mid_scan_unregisters() {
        let (mut controller, radio, _rx) = controller();
        controller.start().unwrap();
        drop(controller);
        assert_eq!(radio.stops(), 1);
    }
}
