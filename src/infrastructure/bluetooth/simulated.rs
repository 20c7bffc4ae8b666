//! Simulated radio
//!
//! Replays a fixed advertisement script in a loop, so every device is seen
//! many times per scan with a drifting signal strength.

use crate::domain::radio::{Advertisement, AdvertisementSink, Radio, RadioError};
use crate::domain::session::{BondState, DeviceKind};
use crate::infrastructure::bluetooth::protocol::{self, flags};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

pub struct SimulatedRadio {
    script: Vec<Advertisement>,
    interval: Duration,
    task: Option<JoinHandle<()>>,
}

impl SimulatedRadio {
    pub fn new(interval: Duration) -> Self {
        Self::with_script(default_script(), interval)
    }

    pub fn with_script(script: Vec<Advertisement>, interval: Duration) -> Self {
        Self {
            script,
            interval,
            task: None,
        }
    }
}

fn device(
    address: u64,
    name: Option<&str>,
    kind: DeviceKind,
    bond_state: BondState,
    services: &[&str],
    rssi: i16,
    advertise_flags: Option<u8>,
) -> Advertisement {
    Advertisement {
        address: protocol::format_address(address),
        name: name.map(str::to_string),
        alias: None,
        kind,
        bond_state,
        service_uuids: if services.is_empty() {
            None
        } else {
            Some(services.iter().map(|s| s.to_string()).collect())
        },
        rssi,
        advertise_flags,
    }
}

/// A handful of typical neighbours, including one anonymous beacon
pub fn default_script() -> Vec<Advertisement> {
    let general = flags::LE_GENERAL_DISCOVERABLE | flags::BR_EDR_NOT_SUPPORTED;
    vec![
        device(
            0xA4C1_3800_1F2E,
            Some("Thermo Sensor"),
            DeviceKind::Le,
            BondState::None,
            &["0000181a-0000-1000-8000-00805f9b34fb"],
            -58,
            Some(general),
        ),
        device(
            0xD0_3E_7A_11_22_33,
            Some("Heart Rate Strap"),
            DeviceKind::Le,
            BondState::Bonded,
            &["0000180d-0000-1000-8000-00805f9b34fb"],
            -71,
            Some(general),
        ),
        device(
            0x5C_F3_70_9A_0B_44,
            None,
            DeviceKind::Le,
            BondState::None,
            &[],
            -88,
            Some(flags::BR_EDR_NOT_SUPPORTED),
        ),
        device(
            0x00_1A_7D_DA_71_13,
            Some("Headphones"),
            DeviceKind::Dual,
            BondState::Bonded,
            &[],
            -64,
            Some(flags::LE_GENERAL_DISCOVERABLE | flags::SIMULTANEOUS_CONTROLLER),
        ),
        device(
            0xF8_1D_78_60_3C_05,
            Some("Smart Bulb"),
            DeviceKind::Le,
            BondState::None,
            &["0000fe0f-0000-1000-8000-00805f9b34fb"],
            -79,
            None,
        ),
    ]
}

impl Radio for SimulatedRadio {
    fn is_available(&self) -> bool {
        tokio::runtime::Handle::try_current().is_ok()
    }

    fn start_discovery(&mut self, sink: AdvertisementSink) -> Result<(), RadioError> {
        if self.task.is_some() {
            return Err(RadioError::AlreadyRegistered);
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| RadioError::Platform(e.to_string()))?;

        let script = self.script.clone();
        let interval = self.interval;
        info!(
            "Simulated discovery started ({} devices every {:?})",
            script.len(),
            interval
        );

        self.task = Some(runtime.spawn(async move {
            let mut round: u32 = 0;
            loop {
                for adv in &script {
                    tokio::time::sleep(interval).await;
                    let mut adv = adv.clone();
                    adv.rssi -= (round % 4) as i16 * 3;
                    if sink.send(adv).is_err() {
                        debug!("Simulated discovery receiver closed");
                        return;
                    }
                }
                round = round.wrapping_add(1);
            }
        }));
        Ok(())
    }

    fn stop_discovery(&mut self) -> Result<(), RadioError> {
        if let Some(task) = self.task.take() {
            task.abort();
            info!("Simulated discovery stopped");
        }
        Ok(())
    }
}

impl Drop for SimulatedRadio {
    fn drop(&mut self) {
        let _ = self.stop_discovery();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test(start_paused = true)]
    async fn test_script_repeats_with_drifting_rssi() {
        let script = default_script();
        let mut radio = SimulatedRadio::new(Duration::from_millis(100));
        let (tx, mut rx) = mpsc::unbounded_channel();
        radio.start_discovery(tx).unwrap();

        let mut received = Vec::new();
        for _ in 0..script.len() * 2 {
            received.push(rx.recv().await.unwrap());
        }

        assert_eq!(received[0].address, "A4:C1:38:00:1F:2E");
        assert_eq!(received[script.len()].address, received[0].address);
        assert_eq!(received[script.len()].rssi, received[0].rssi - 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_ends_delivery() {
        let mut radio = SimulatedRadio::new(Duration::from_millis(100));
        let (tx, mut rx) = mpsc::unbounded_channel();
        radio.start_discovery(tx).unwrap();
        rx.recv().await.unwrap();

        radio.stop_discovery().unwrap();
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_double_registration_is_rejected() {
        let mut radio = SimulatedRadio::new(Duration::from_millis(100));
        let (tx, _rx) = mpsc::unbounded_channel();
        radio.start_discovery(tx.clone()).unwrap();
        assert!(matches!(
            radio.start_discovery(tx),
            Err(RadioError::AlreadyRegistered)
        ));
    }

    #[test]
    fn test_unavailable_outside_runtime() {
        let radio = SimulatedRadio::new(Duration::from_millis(100));
        assert!(!radio.is_available());
    }
}
