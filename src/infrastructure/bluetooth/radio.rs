//! Backend selection for the configured radio

use crate::domain::radio::{AdvertisementSink, Radio, RadioError};
use crate::domain::settings::{RadioBackend, SimulationSettings};
use crate::infrastructure::bluetooth::simulated::SimulatedRadio;
use tracing::info;

#[cfg(windows)]
use crate::infrastructure::bluetooth::scanner::BleScanner;

/// Creates the radio handle once permissions are granted
pub trait RadioFactory: Send {
    type Radio: Radio;

    fn open(&mut self) -> Result<Self::Radio, RadioError>;
}

pub enum PlatformRadio {
    #[cfg(windows)]
    Native(BleScanner),
    Simulated(SimulatedRadio),
}

impl Radio for PlatformRadio {
    fn is_available(&self) -> bool {
        match self {
            #[cfg(windows)]
            Self::Native(r) => r.is_available(),
            Self::Simulated(r) => r.is_available(),
        }
    }

    fn start_discovery(&mut self, sink: AdvertisementSink) -> Result<(), RadioError> {
        match self {
            #[cfg(windows)]
            Self::Native(r) => r.start_discovery(sink),
            Self::Simulated(r) => r.start_discovery(sink),
        }
    }

    fn stop_discovery(&mut self) -> Result<(), RadioError> {
        match self {
            #[cfg(windows)]
            Self::Native(r) => r.stop_discovery(),
            Self::Simulated(r) => r.stop_discovery(),
        }
    }
}

pub struct PlatformRadioFactory {
    backend: RadioBackend,
    simulation: SimulationSettings,
}

impl PlatformRadioFactory {
    pub fn new(backend: RadioBackend, simulation: SimulationSettings) -> Self {
        Self {
            backend,
            simulation,
        }
    }
}

impl RadioFactory for PlatformRadioFactory {
    type Radio = PlatformRadio;

    fn open(&mut self) -> Result<PlatformRadio, RadioError> {
        info!("Opening {:?} radio", self.backend);
        match self.backend {
            #[cfg(windows)]
            RadioBackend::Native => Ok(PlatformRadio::Native(BleScanner::open()?)),
            #[cfg(not(windows))]
            RadioBackend::Native => Err(RadioError::Unsupported),
            RadioBackend::Simulated => Ok(PlatformRadio::Simulated(SimulatedRadio::new(
                self.simulation.advertisement_interval(),
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulated_backend_opens_everywhere() {
        let mut factory =
            PlatformRadioFactory::new(RadioBackend::Simulated, SimulationSettings::default());
        assert!(matches!(factory.open(), Ok(PlatformRadio::Simulated(_))));
    }

    #[cfg(not(windows))]
    #[test]
    fn test_native_backend_unsupported_off_windows() {
        let mut factory =
            PlatformRadioFactory::new(RadioBackend::Native, SimulationSettings::default());
        assert!(matches!(factory.open(), Err(RadioError::Unsupported)));
    }
}
