//! Scan Worker
//!
//! Runs the permission gate and the scan controller on one task. Commands,
//! advertisements and the auto-stop timer are multiplexed with `select!`, so
//! every change to the session happens in this single context.

use crate::domain::controller::{ScanController, ScanError};
use crate::domain::models::{AppEvent, MessageSeverity, ScanCommand, StatusMessage};
use crate::domain::permissions::{GateState, PermissionGate, PermissionHost};
use crate::domain::radio::Advertisement;
use crate::domain::session::StopReason;
use crate::domain::settings::Settings;
use crate::infrastructure::bluetooth::radio::{PlatformRadioFactory, RadioFactory};
use crate::infrastructure::permissions::PromptPermissionHost;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{error, info, warn};

enum Step {
    Command(ScanCommand),
    Advertisement(Advertisement),
    RadioLost,
    TimerExpired,
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

pub struct ScanService<H: PermissionHost, F: RadioFactory> {
    gate: PermissionGate<H>,
    factory: F,
    controller: ScanController<F::Radio>,
    event_sender: mpsc::UnboundedSender<AppEvent>,
}

impl<H: PermissionHost, F: RadioFactory> ScanService<H, F> {
    pub fn new(
        gate: PermissionGate<H>,
        factory: F,
        scan_duration: Duration,
        event_sender: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            gate,
            factory,
            controller: ScanController::new(scan_duration, event_sender.clone()),
            event_sender,
        }
    }

    /// Process commands until `Shutdown` or until every sender is dropped
    pub async fn run(mut self, mut commands: mpsc::UnboundedReceiver<ScanCommand>) {
        info!("Scan worker started");
        self.request_permissions().await;

        loop {
            let deadline = self.controller.deadline();
            let step = tokio::select! {
                cmd = commands.recv() => Step::Command(cmd.unwrap_or(ScanCommand::Shutdown)),
                adv = self.controller.next_advertisement() => match adv {
                    Some(adv) => Step::Advertisement(adv),
                    None => Step::RadioLost,
                },
                _ = sleep_until(deadline) => Step::TimerExpired,
            };

            match step {
                Step::Command(ScanCommand::Shutdown) => {
                    self.controller.stop(StopReason::Shutdown);
                    break;
                }
                Step::Command(cmd) => self.handle_command(cmd).await,
                Step::Advertisement(adv) => {
                    self.controller.on_device_discovered(adv);
                }
                Step::RadioLost => {
                    self.controller.on_radio_lost();
                }
                Step::TimerExpired => {
                    self.controller.on_timer();
                }
            }
        }
        info!("Scan worker stopped");
    }

    async fn handle_command(&mut self, cmd: ScanCommand) {
        match cmd {
            ScanCommand::ToggleScan => {
                if self.controller.session().is_scanning() {
                    self.controller.stop(StopReason::Manual);
                } else {
                    self.start_scan().await;
                }
            }
            ScanCommand::StartScan => self.start_scan().await,
            ScanCommand::StopScan => {
                self.controller.stop(StopReason::Manual);
            }
            ScanCommand::RequestPermissions => {
                self.request_permissions().await;
            }
            ScanCommand::Shutdown => {}
        }
    }

    /// Invoke the gate and open the radio once everything is granted
    async fn request_permissions(&mut self) -> bool {
        let granted = self.gate.check_and_request().await;
        let _ = self
            .event_sender
            .send(AppEvent::Permissions(self.gate.state()));

        if !granted {
            self.send_log(
                "Bluetooth permissions denied. Scanning is disabled.",
                MessageSeverity::Warning,
            );
            return false;
        }
        self.ensure_radio()
    }

    fn ensure_radio(&mut self) -> bool {
        if self.controller.has_radio() {
            return true;
        }
        match self.factory.open() {
            Ok(radio) => {
                self.controller.attach_radio(radio);
                true
            }
            Err(e) => {
                error!("Failed to open radio: {}", e);
                self.send_log(format!("Bluetooth unavailable: {}", e), MessageSeverity::Error);
                false
            }
        }
    }

    async fn start_scan(&mut self) {
        if self.controller.session().is_scanning() {
            return;
        }

        // Pass-through once granted; a denial is only lifted by RequestPermissions
        match self.gate.state() {
            GateState::Unknown => {
                if !self.request_permissions().await {
                    return;
                }
            }
            GateState::Denied => {
                self.report(ScanError::PermissionDenied);
                return;
            }
            GateState::Granted => {
                if !self.ensure_radio() {
                    return;
                }
            }
        }

        if let Err(e) = self.controller.start() {
            self.report(e);
        }
    }

    fn report(&self, e: ScanError) {
        warn!("Scan rejected: {}", e);
        self.send_log(format!("Cannot scan: {}", e), MessageSeverity::Error);
    }

    fn send_log(&self, message: impl Into<String>, severity: MessageSeverity) {
        let _ = self
            .event_sender
            .send(AppEvent::LogMessage(StatusMessage::new(message, severity)));
    }
}

/// Start the scan worker on its own thread with a current-thread runtime
pub fn spawn(
    settings: &Settings,
    event_sender: mpsc::UnboundedSender<AppEvent>,
) -> anyhow::Result<mpsc::UnboundedSender<ScanCommand>> {
    let host = PromptPermissionHost::new(settings.auto_grant_permissions, event_sender.clone());
    let gate = PermissionGate::new(host, settings.platform_profile);
    let factory = PlatformRadioFactory::new(settings.radio_backend, settings.simulation.clone());
    let service = ScanService::new(gate, factory, settings.scan_duration(), event_sender);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let (command_tx, command_rx) = mpsc::unbounded_channel();

    std::thread::Builder::new()
        .name("ble-scan".to_string())
        .spawn(move || runtime.block_on(service.run(command_rx)))?;

    Ok(command_tx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::controller::DEFAULT_SCAN_DURATION;
    use crate::domain::permissions::testing::ScriptedHost;
    use crate::domain::permissions::PlatformProfile;
    use crate::domain::radio::testing::RecordingRadio;
    use crate::domain::radio::RadioError;
    use crate::domain::session::{ScanPhase, ScanSnapshot};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct RecordingFactory {
        radio: RecordingRadio,
        opened: Arc<AtomicUsize>,
    }

    impl RadioFactory for RecordingFactory {
        type Radio = RecordingRadio;

        fn open(&mut self) -> Result<RecordingRadio, RadioError> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(self.radio.clone())
        }
    }

    struct Harness {
        commands: mpsc::UnboundedSender<ScanCommand>,
        events: mpsc::UnboundedReceiver<AppEvent>,
        radio: RecordingRadio,
        opened: Arc<AtomicUsize>,
        worker: tokio::task::JoinHandle<()>,
    }

    fn harness(host: ScriptedHost) -> Harness {
        let (event_tx, events) = mpsc::unbounded_channel();
        let (commands, command_rx) = mpsc::unbounded_channel();
        let radio = RecordingRadio::new();
        let opened = Arc::new(AtomicUsize::new(0));
        let factory = RecordingFactory {
            radio: radio.clone(),
            opened: opened.clone(),
        };
        let gate = PermissionGate::new(host, PlatformProfile::Modern);
        let service = ScanService::new(gate, factory, DEFAULT_SCAN_DURATION, event_tx);
        let worker = tokio::spawn(service.run(command_rx));
        Harness {
            commands,
            events,
            radio,
            opened,
            worker,
        }
    }

    impl Harness {
        fn send(&self, cmd: ScanCommand) {
            self.commands.send(cmd).unwrap();
        }

        async fn next_state(&mut self) -> ScanSnapshot {
            loop {
                match self.events.recv().await.expect("worker ended") {
                    AppEvent::ScanState(snapshot) => return snapshot,
                    _ => continue,
                }
            }
        }

        async fn next_permissions(&mut self) -> GateState {
            loop {
                match self.events.recv().await.expect("worker ended") {
                    AppEvent::Permissions(state) => return state,
                    _ => continue,
                }
            }
        }

        async fn next_device(&mut self) -> String {
            loop {
                match self.events.recv().await.expect("worker ended") {
                    AppEvent::DeviceDiscovered(device) => return device.address,
                    _ => continue,
                }
            }
        }

        async fn next_error(&mut self) -> String {
            loop {
                match self.events.recv().await.expect("worker ended") {
                    AppEvent::LogMessage(msg) if msg.severity == MessageSeverity::Error => {
                        return msg.message
                    }
                    _ => continue,
                }
            }
        }

        async fn shutdown(self) {
            self.send(ScanCommand::Shutdown);
            self.worker.await.unwrap();
        }
    }

    fn addresses(snapshot: &ScanSnapshot) -> Vec<&str> {
        snapshot
            .devices
            .iter()
            .map(|d| d.address.as_str())
            .collect()
    }

    #[tokio::test]
    async fn test_duplicate_sighting_session() {
        let mut h = harness(ScriptedHost::granting_all());
        h.send(ScanCommand::StartScan);
        assert!(h.next_state().await.is_scanning());

        h.radio.emit("AA:BB", -40);
        h.radio.emit("CC:DD", -52);
        h.radio.emit("AA:BB", -35);
        assert_eq!(h.next_device().await, "AA:BB");
        assert_eq!(h.next_device().await, "CC:DD");
        h.send(ScanCommand::StopScan);

        let snapshot = h.next_state().await;
        assert_eq!(snapshot.phase, ScanPhase::Idle);
        assert_eq!(addresses(&snapshot), vec!["AA:BB", "CC:DD"]);
        assert_eq!(snapshot.devices[0].rssi, -40);
        h.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_stop_after_scan_duration() {
        let mut h = harness(ScriptedHost::granting_all());
        let started = Instant::now();
        h.send(ScanCommand::StartScan);
        assert!(h.next_state().await.is_scanning());

        let snapshot = h.next_state().await;
        assert_eq!(snapshot.phase, ScanPhase::Idle);
        assert_eq!(started.elapsed(), DEFAULT_SCAN_DURATION);
        assert_eq!(h.radio.stops(), 1);
        h.shutdown().await;
    }

    #[tokio::test]
    async fn test_immediate_stop_yields_empty_idle() {
        let mut h = harness(ScriptedHost::granting_all());
        h.send(ScanCommand::StartScan);
        h.send(ScanCommand::StopScan);

        assert!(h.next_state().await.is_scanning());
        let snapshot = h.next_state().await;
        assert_eq!(snapshot.phase, ScanPhase::Idle);
        assert!(snapshot.devices.is_empty());
        h.shutdown().await;
    }

    #[tokio::test]
    async fn test_denied_permissions_never_register() {
        let mut h = harness(ScriptedHost::answering(false));
        assert_eq!(h.next_permissions().await, GateState::Denied);

        h.send(ScanCommand::StartScan);
        let message = h.next_error().await;
        assert!(message.contains("permissions"));

        h.send(ScanCommand::ToggleScan);
        h.next_error().await;

        assert_eq!(h.opened.load(Ordering::SeqCst), 0);
        assert_eq!(h.radio.starts(), 0);
        h.shutdown().await;
    }

    #[tokio::test]
    async fn test_permissions_can_be_requested_again() {
        let mut host = ScriptedHost::default();
        host.queued.extend([false, true]);
        let mut h = harness(host);
        assert_eq!(h.next_permissions().await, GateState::Denied);

        h.send(ScanCommand::StartScan);
        h.next_error().await;
        assert_eq!(h.opened.load(Ordering::SeqCst), 0);

        h.send(ScanCommand::RequestPermissions);
        assert_eq!(h.next_permissions().await, GateState::Granted);
        h.send(ScanCommand::StartScan);
        assert!(h.next_state().await.is_scanning());
        assert_eq!(h.opened.load(Ordering::SeqCst), 1);
        assert_eq!(h.radio.starts(), 1);
        h.shutdown().await;
    }

    #[tokio::test]
    async fn test_first_start_invokes_gate_when_never_asked() {
        let (event_tx, mut events) = mpsc::unbounded_channel();
        let radio = RecordingRadio::new();
        let factory = RecordingFactory {
            radio: radio.clone(),
            opened: Arc::new(AtomicUsize::new(0)),
        };
        let gate = PermissionGate::new(ScriptedHost::answering(true), PlatformProfile::Legacy);
        let mut service = ScanService::new(gate, factory, DEFAULT_SCAN_DURATION, event_tx);

        service.handle_command(ScanCommand::StartScan).await;
        assert_eq!(service.gate.state(), GateState::Granted);
        assert!(service.controller.session().is_scanning());
        assert!(matches!(
            events.try_recv(),
            Ok(AppEvent::Permissions(GateState::Granted))
        ));
    }

    #[tokio::test]
    async fn test_toggle_starts_and_stops() {
        let mut h = harness(ScriptedHost::answering(true));
        assert_eq!(h.next_permissions().await, GateState::Granted);

        h.send(ScanCommand::ToggleScan);
        assert!(h.next_state().await.is_scanning());
        h.send(ScanCommand::ToggleScan);
        assert!(!h.next_state().await.is_scanning());
        assert_eq!(h.opened.load(Ordering::SeqCst), 1);
        h.shutdown().await;
    }

    #[tokio::test]
    async fn test_start_while_scanning_emits_nothing() {
        let mut h = harness(ScriptedHost::granting_all());
        h.send(ScanCommand::StartScan);
        assert!(h.next_state().await.is_scanning());
        h.radio.emit("AA:BB", -40);
        assert_eq!(h.next_device().await, "AA:BB");
        h.send(ScanCommand::StartScan);
        h.send(ScanCommand::StopScan);

        let snapshot = h.next_state().await;
        assert_eq!(snapshot.phase, ScanPhase::Idle);
        assert_eq!(addresses(&snapshot), vec!["AA:BB"]);
        assert_eq!(h.radio.starts(), 1);
        h.shutdown().await;
    }

    #[tokio::test]
    async fn test_radio_dropping_sink_ends_session() {
        let mut h = harness(ScriptedHost::granting_all());
        h.send(ScanCommand::StartScan);
        assert!(h.next_state().await.is_scanning());

        h.radio.emit("AA:BB", -50);
        assert_eq!(h.next_device().await, "AA:BB");
        h.radio.disconnect();

        let snapshot = h.next_state().await;
        assert_eq!(snapshot.phase, ScanPhase::Idle);
        assert_eq!(snapshot.devices.len(), 1);
        assert_eq!(h.radio.stops(), 1);

        // The radio can be registered again afterwards
        h.send(ScanCommand::StartScan);
        assert!(h.next_state().await.is_scanning());
        assert_eq!(h.radio.starts(), 2);
        h.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_mid_scan_unregisters() {
        let mut h = harness(ScriptedHost::granting_all());
        h.send(ScanCommand::StartScan);
        assert!(h.next_state().await.is_scanning());

        let radio = h.radio.clone();
        h.shutdown().await;
        assert_eq!(radio.stops(), 1);
    }

    #[tokio::test]
    async fn test_dropping_commands_ends_worker() {
        let h = harness(ScriptedHost::granting_all());
        drop(h.commands);
        h.worker.await.unwrap();
    }
}
