//! Lifecycle of the removable encrypted storage device.
//!
//! The device is only ever mutated by discrete signals coming from the
//! device-access service (or the view layer, for `UnlockingStarted`). Signals
//! that do not apply to the current state are ignored.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceState {
    /// Nothing has been observed yet. Only ever the initial state.
    Unknown,
    /// Never seen during this session.
    Missing,
    /// Was present, has since gone away.
    Removed,
    Locked,
    /// A passphrase was submitted and the outcome is pending.
    Unlocking,
    Unlocked,
}

impl DeviceState {
    pub const ALL: [DeviceState; 6] = [
        DeviceState::Unknown,
        DeviceState::Missing,
        DeviceState::Removed,
        DeviceState::Locked,
        DeviceState::Unlocking,
        DeviceState::Unlocked,
    ];

    /// Whether a device is physically present in this state.
    pub fn is_present(self) -> bool {
        matches!(
            self,
            DeviceState::Locked | DeviceState::Unlocking | DeviceState::Unlocked
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeviceState::Unknown => "unknown",
            DeviceState::Missing => "missing",
            DeviceState::Removed => "removed",
            DeviceState::Locked => "locked",
            DeviceState::Unlocking => "unlocking",
            DeviceState::Unlocked => "unlocked",
        }
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// External signals accepted by [`Device`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceSignal {
    FoundLocked,
    FoundUnlocked,
    NotFound,
    UnlockingStarted,
    UnlockSucceeded,
    UnlockFailed,
    Relock,
}

impl DeviceSignal {
    pub const ALL: [DeviceSignal; 7] = [
        DeviceSignal::FoundLocked,
        DeviceSignal::FoundUnlocked,
        DeviceSignal::NotFound,
        DeviceSignal::UnlockingStarted,
        DeviceSignal::UnlockSucceeded,
        DeviceSignal::UnlockFailed,
        DeviceSignal::Relock,
    ];
}

/// The device state machine.
#[derive(Debug)]
pub struct Device {
    state: DeviceState,
}

impl Default for Device {
    fn default() -> Self {
        Self::new()
    }
}

impl Device {
    pub fn new() -> Self {
        Self {
            state: DeviceState::Unknown,
        }
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    /// Target state for `signal` from `from`, or `None` when the signal does
    /// not apply.
    pub fn transition(from: DeviceState, signal: DeviceSignal) -> Option<DeviceState> {
        use DeviceSignal as S;
        use DeviceState::*;

        match (from, signal) {
            (Unknown | Missing | Removed, S::FoundLocked) => Some(Locked),
            (Unknown | Missing | Removed, S::FoundUnlocked) => Some(Unlocked),
            (Unknown, S::NotFound) => Some(Missing),
            (Locked | Unlocked | Unlocking, S::NotFound) => Some(Removed),
            (Locked, S::UnlockingStarted) => Some(Unlocking),
            (Unlocking, S::UnlockSucceeded) => Some(Unlocked),
            (Unlocking, S::UnlockFailed) => Some(Locked),
            (Unlocked, S::Relock) => Some(Locked),
            _ => None,
        }
    }

    /// Apply a signal. Returns the new state when the transition was accepted.
    pub fn apply(&mut self, signal: DeviceSignal) -> Option<DeviceState> {
        match Self::transition(self.state, signal) {
            Some(next) => {
                info!(from = %self.state, to = %next, ?signal, "Device state changed");
                self.state = next;
                Some(next)
            }
            None => {
                debug!(state = %self.state, ?signal, "Ignoring device signal");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(signals: &[DeviceSignal]) -> Device {
        let mut device = Device::new();
        for signal in signals {
            device.apply(*signal);
        }
        device
    }

    #[test]
    fn starts_unknown() {
        assert_eq!(Device::new().state(), DeviceState::Unknown);
    }

    #[test]
    fn not_found_distinguishes_missing_from_removed() {
        let device = run(&[DeviceSignal::NotFound]);
        assert_eq!(device.state(), DeviceState::Missing);

        let device = run(&[DeviceSignal::FoundLocked, DeviceSignal::NotFound]);
        assert_eq!(device.state(), DeviceState::Removed);
    }

    #[test]
    fn not_found_while_missing_is_ignored() {
        let mut device = run(&[DeviceSignal::NotFound]);
        assert_eq!(device.apply(DeviceSignal::NotFound), None);
        assert_eq!(device.state(), DeviceState::Missing);
    }

    #[test]
    fn unlock_failure_returns_to_locked() {
        let mut device = run(&[DeviceSignal::FoundLocked, DeviceSignal::UnlockingStarted]);
        assert_eq!(device.state(), DeviceState::Unlocking);
        assert_eq!(
            device.apply(DeviceSignal::UnlockFailed),
            Some(DeviceState::Locked)
        );
    }

    #[test]
    fn unlock_success_then_relock() {
        let mut device = run(&[
            DeviceSignal::FoundLocked,
            DeviceSignal::UnlockingStarted,
            DeviceSignal::UnlockSucceeded,
        ]);
        assert_eq!(device.state(), DeviceState::Unlocked);
        assert_eq!(device.apply(DeviceSignal::Relock), Some(DeviceState::Locked));
    }

    #[test]
    fn removal_during_unlocking() {
        let device = run(&[
            DeviceSignal::FoundLocked,
            DeviceSignal::UnlockingStarted,
            DeviceSignal::NotFound,
        ]);
        assert_eq!(device.state(), DeviceState::Removed);
    }

    #[test]
    fn found_while_present_is_ignored() {
        let mut device = run(&[DeviceSignal::FoundUnlocked]);
        assert_eq!(device.apply(DeviceSignal::FoundLocked), None);
        assert_eq!(device.state(), DeviceState::Unlocked);
    }

    #[test]
    fn unlocking_requires_locked() {
        let mut device = run(&[DeviceSignal::FoundUnlocked]);
        assert_eq!(device.apply(DeviceSignal::UnlockingStarted), None);

        let mut device = Device::new();
        assert_eq!(device.apply(DeviceSignal::UnlockSucceeded), None);
        assert_eq!(device.state(), DeviceState::Unknown);
    }

    #[test]
    fn reinsertion_after_removal() {
        let device = run(&[
            DeviceSignal::FoundUnlocked,
            DeviceSignal::NotFound,
            DeviceSignal::FoundLocked,
        ]);
        assert_eq!(device.state(), DeviceState::Locked);
    }
}
