use std::time::Duration;

use tracing::info;

use crate::config::{ExportMode, InitialDevice, SimulationConfig};
use crate::core::device::{DeviceSignal, DeviceState};
use crate::core::dispatcher::Dispatcher;
use crate::core::events::Event;
use crate::core::export::{ExportBackend, ExportOperation, ExportOutcome};
use crate::core::hardware::{DeviceAccess, Passphrase};

/// Device-access service that invents its answers.
///
/// The initial probe and, when a passphrase is configured, unlock outcomes
/// are posted on timers. Anything else is left to the operator.
pub struct SimulatedDevice {
    initial: InitialDevice,
    probe_delay: Duration,
    unlock_delay: Duration,
    passphrase: Option<String>,
    unlock_requests: usize,
}

impl SimulatedDevice {
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            initial: config.initial_device,
            probe_delay: Duration::from_millis(config.probe_delay_ms),
            unlock_delay: Duration::from_millis(config.unlock_delay_ms),
            passphrase: config.passphrase.clone(),
            unlock_requests: 0,
        }
    }

    /// No probe and no automatic outcomes.
    pub fn manual() -> Self {
        Self {
            initial: InitialDevice::None,
            probe_delay: Duration::ZERO,
            unlock_delay: Duration::ZERO,
            passphrase: None,
            unlock_requests: 0,
        }
    }

    pub fn unlock_requests(&self) -> usize {
        self.unlock_requests
    }
}

impl DeviceAccess for SimulatedDevice {
    fn start(&mut self, dispatcher: &mut Dispatcher) {
        let signal = match self.initial {
            InitialDevice::None => return,
            InitialDevice::Missing => DeviceSignal::NotFound,
            InitialDevice::Locked => DeviceSignal::FoundLocked,
            InitialDevice::Unlocked => DeviceSignal::FoundUnlocked,
        };
        info!(?signal, delay_ms = self.probe_delay.as_millis() as u64, "(Simulator) Probing for device");
        dispatcher.post_after(self.probe_delay, Event::Device(signal));
    }

    fn request_unlock(&mut self, passphrase: &Passphrase, dispatcher: &mut Dispatcher) {
        self.unlock_requests += 1;

        let Some(expected) = &self.passphrase else {
            info!("(Simulator) Unlock requested, waiting for the operator to resolve it");
            return;
        };

        let signal = if passphrase.expose() == expected {
            DeviceSignal::UnlockSucceeded
        } else {
            DeviceSignal::UnlockFailed
        };
        dispatcher.post_after(self.unlock_delay, Event::Device(signal));
    }
}

/// Export backend that reports a fixed outcome after a delay, or nothing.
pub struct SimulatedExport {
    mode: ExportMode,
    delay: Duration,
}

impl SimulatedExport {
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            mode: config.export_outcome,
            delay: Duration::from_millis(config.export_delay_ms),
        }
    }

    pub fn manual() -> Self {
        Self {
            mode: ExportMode::Manual,
            delay: Duration::ZERO,
        }
    }
}

impl ExportBackend for SimulatedExport {
    fn begin(&mut self, operation: &ExportOperation, dispatcher: &mut Dispatcher) {
        let outcome = match self.mode {
            ExportMode::Succeed => ExportOutcome::Succeeded,
            ExportMode::Fail => ExportOutcome::Failed,
            ExportMode::Manual => {
                info!("(Simulator) Export started, waiting for the operator to resolve it");
                return;
            }
        };
        let Some(export_id) = operation.id() else {
            return;
        };

        dispatcher.post_after(self.delay, Event::ExportReport { export_id, outcome });
    }
}

/// Operator actions on the simulated device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulatorAction {
    InsertLocked,
    InsertUnlocked,
    Unlock,
    FailUnlock,
    Lock,
    Remove,
}

impl SimulatorAction {
    /// Actions that make sense for a device in `state`.
    pub fn available(state: DeviceState) -> &'static [SimulatorAction] {
        use SimulatorAction::*;

        match state {
            DeviceState::Unknown => &[],
            DeviceState::Missing | DeviceState::Removed => &[InsertLocked, InsertUnlocked],
            DeviceState::Locked => &[Remove],
            DeviceState::Unlocking => &[Unlock, FailUnlock, Remove],
            DeviceState::Unlocked => &[Lock, Remove],
        }
    }

    pub fn signal(self) -> DeviceSignal {
        match self {
            SimulatorAction::InsertLocked => DeviceSignal::FoundLocked,
            SimulatorAction::InsertUnlocked => DeviceSignal::FoundUnlocked,
            SimulatorAction::Unlock => DeviceSignal::UnlockSucceeded,
            SimulatorAction::FailUnlock => DeviceSignal::UnlockFailed,
            SimulatorAction::Lock => DeviceSignal::Relock,
            SimulatorAction::Remove => DeviceSignal::NotFound,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SimulatorAction::InsertLocked => "insert locked USB drive",
            SimulatorAction::InsertUnlocked => "insert unlocked USB drive",
            SimulatorAction::Unlock => "unlock USB drive",
            SimulatorAction::FailUnlock => "simulate unlocking failure",
            SimulatorAction::Lock => "lock USB drive",
            SimulatorAction::Remove => "remove USB drive",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::device::Device;

    #[test]
    fn available_actions_are_accepted_by_the_device() {
        for state in DeviceState::ALL {
            for action in SimulatorAction::available(state) {
                assert!(
                    Device::transition(state, action.signal()).is_some(),
                    "{:?} offered while {} but the device would ignore it",
                    action,
                    state
                );
            }
        }
    }

    #[test]
    fn unknown_device_offers_nothing() {
        assert!(SimulatorAction::available(DeviceState::Unknown).is_empty());
    }
}
