//! WinRT BLE Scanner
//!
//! Native radio backend built on `BluetoothLEAdvertisementWatcher`. The
//! default adapter's radio is checked before every session, and a watcher
//! that stops on its own drops the sink so the session sees a closed channel.

use crate::domain::radio::{Advertisement, AdvertisementSink, Radio, RadioError};
use crate::domain::session::{BondState, DeviceKind};
use crate::infrastructure::bluetooth::protocol;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};
use windows::Devices::Bluetooth::Advertisement::{
    BluetoothLEAdvertisement, BluetoothLEAdvertisementReceivedEventArgs,
    BluetoothLEAdvertisementWatcher, BluetoothLEAdvertisementWatcherStatus,
    BluetoothLEAdvertisementWatcherStoppedEventArgs, BluetoothLEScanningMode,
};
use windows::Devices::Bluetooth::{BluetoothAdapter, BluetoothError};
use windows::Devices::Radios::RadioState;
use windows::Foundation::TypedEventHandler;

fn platform_error(e: windows::core::Error) -> RadioError {
    RadioError::Platform(e.to_string())
}

/// Sink shared by the watcher callbacks; `None` once the watcher stopped
type SharedSink = Arc<Mutex<Option<AdvertisementSink>>>;

/// Radio backed by the Windows advertisement watcher
#[derive(Default)]
pub struct BleScanner {
    watcher: Option<BluetoothLEAdvertisementWatcher>,
}

impl BleScanner {
    pub fn open() -> Result<Self, RadioError> {
        default_adapter()?;
        Ok(Self::default())
    }
}

/// The system's default adapter, if it can do LE
fn default_adapter() -> Result<BluetoothAdapter, RadioError> {
    // A machine without an adapter completes with a null result, surfaced as an error
    let adapter = BluetoothAdapter::GetDefaultAsync()
        .and_then(|op| op.join())
        .map_err(|e| {
            debug!("No default Bluetooth adapter: {}", e);
            RadioError::Unsupported
        })?;
    if !adapter.IsLowEnergySupported().map_err(platform_error)? {
        return Err(RadioError::Unsupported);
    }
    Ok(adapter)
}

/// Fails with `PoweredOff` unless the adapter's radio is switched on
fn ensure_radio_on() -> Result<(), RadioError> {
    let radio = default_adapter()?
        .GetRadioAsync()
        .and_then(|op| op.join())
        .map_err(platform_error)?;
    match radio.State().map_err(platform_error)? {
        RadioState::On => Ok(()),
        state => {
            debug!("Bluetooth radio state is {:?}", state);
            Err(RadioError::PoweredOff)
        }
    }
}

fn service_uuids(adv: &BluetoothLEAdvertisement) -> windows::core::Result<Option<Vec<String>>> {
    let uuids = adv.ServiceUuids()?;
    let count = uuids.Size()?;
    if count == 0 {
        return Ok(None);
    }
    let mut out = Vec::with_capacity(count as usize);
    for i in 0..count {
        let guid = uuids.GetAt(i)?;
        out.push(protocol::format_uuid(
            guid.data1, guid.data2, guid.data3, guid.data4,
        ));
    }
    Ok(Some(out))
}

fn to_advertisement(
    args: &BluetoothLEAdvertisementReceivedEventArgs,
) -> windows::core::Result<Advertisement> {
    let adv = args.Advertisement()?;
    let name = adv.LocalName()?.to_string();
    let advertise_flags = adv
        .Flags()
        .ok()
        .and_then(|f| f.Value().ok())
        .map(|f| (f.0 & 0xFF) as u8);

    Ok(Advertisement {
        address: protocol::format_address(args.BluetoothAddress()?),
        name: if name.is_empty() { None } else { Some(name) },
        alias: None,
        kind: DeviceKind::Le,
        // Bonding is not reported in advertisements
        bond_state: BondState::None,
        service_uuids: service_uuids(&adv)?,
        rssi: args.RawSignalStrengthInDBm()?,
        advertise_flags,
    })
}

impl Radio for BleScanner {
    fn is_available(&self) -> bool {
        match ensure_radio_on() {
            Ok(()) => true,
            Err(e) => {
                info!("Bluetooth not ready: {}", e);
                false
            }
        }
    }

    fn start_discovery(&mut self, sink: AdvertisementSink) -> Result<(), RadioError> {
        if self.watcher.is_some() {
            return Err(RadioError::AlreadyRegistered);
        }
        ensure_radio_on()?;

        let watcher = BluetoothLEAdvertisementWatcher::new().map_err(platform_error)?;
        watcher
            .SetScanningMode(BluetoothLEScanningMode::Active)
            .map_err(platform_error)?;

        let shared: SharedSink = Arc::new(Mutex::new(Some(sink)));

        let received_sink = shared.clone();
        let received = TypedEventHandler::new(
            move |_: windows::core::Ref<BluetoothLEAdvertisementWatcher>,
                  args: windows::core::Ref<BluetoothLEAdvertisementReceivedEventArgs>| {
                let Some(args) = args.as_ref() else {
                    return Ok(());
                };
                match to_advertisement(args) {
                    Ok(adv) => {
                        if let Ok(guard) = received_sink.lock() {
                            if let Some(sink) = guard.as_ref() {
                                // Receiver is gone once the session ends
                                let _ = sink.send(adv);
                            }
                        }
                    }
                    Err(e) => warn!("Skipping unreadable advertisement: {}", e),
                }
                Ok(())
            },
        );

        let stopped_sink = shared.clone();
        let stopped = TypedEventHandler::new(
            move |_: windows::core::Ref<BluetoothLEAdvertisementWatcher>,
                  args: windows::core::Ref<BluetoothLEAdvertisementWatcherStoppedEventArgs>| {
                let error = args
                    .as_ref()
                    .and_then(|a| a.Error().ok())
                    .unwrap_or(BluetoothError::Success);
                if error != BluetoothError::Success {
                    warn!("Advertisement watcher aborted: {:?}", error);
                }
                if let Ok(mut guard) = stopped_sink.lock() {
                    guard.take();
                }
                Ok(())
            },
        );

        watcher.Received(&received).map_err(platform_error)?;
        watcher.Stopped(&stopped).map_err(platform_error)?;
        watcher.Start().map_err(platform_error)?;

        // Only catches an immediate abort; later ones arrive through `Stopped`
        if watcher.Status().map_err(platform_error)? == BluetoothLEAdvertisementWatcherStatus::Aborted
        {
            return Err(RadioError::PoweredOff);
        }

        info!("Advertisement watcher started");
        self.watcher = Some(watcher);
        Ok(())
    }

    fn stop_discovery(&mut self) -> Result<(), RadioError> {
        if let Some(watcher) = self.watcher.take() {
            info!("Stopping advertisement watcher");
            watcher.Stop().map_err(platform_error)?;
        }
        Ok(())
    }
}

impl Drop for BleScanner {
    fn drop(&mut self) {
        let _ = self.stop_discovery();
    }
}
