//! Page-flow controller for the export wizard.
//!
//! The controller owns the current step and decides, from the device and
//! export states, whether each step is satisfied. When an upstream
//! precondition regresses it jumps straight back to the step that needs
//! attention, skipping the pages in between.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::device::DeviceState;
use super::export::ExportStatus;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    Start,
    InsertDevice,
    UnlockDevice,
    ReviewData,
    Export,
}

impl WizardStep {
    pub const ALL: [WizardStep; 5] = [
        WizardStep::Start,
        WizardStep::InsertDevice,
        WizardStep::UnlockDevice,
        WizardStep::ReviewData,
        WizardStep::Export,
    ];

    pub fn rank(self) -> usize {
        self as usize
    }

    pub fn from_rank(rank: usize) -> Option<Self> {
        Self::ALL.get(rank).copied()
    }

    pub fn next(self) -> Option<Self> {
        Self::from_rank(self.rank() + 1)
    }

    pub fn previous(self) -> Option<Self> {
        self.rank().checked_sub(1).and_then(Self::from_rank)
    }

    pub fn title(self) -> &'static str {
        match self {
            WizardStep::Start => "Disclaimer",
            WizardStep::InsertDevice => "Insert USB device",
            WizardStep::UnlockDevice => "Unlock USB device",
            WizardStep::ReviewData => "Review file list",
            WizardStep::Export => "Done!",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WizardStep::Start => "start",
            WizardStep::InsertDevice => "insert_device",
            WizardStep::UnlockDevice => "unlock_device",
            WizardStep::ReviewData => "review_data",
            WizardStep::Export => "export",
        }
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// External state the step predicates are evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preconditions {
    pub device: DeviceState,
    pub export: ExportStatus,
}

impl Preconditions {
    pub fn new(device: DeviceState, export: ExportStatus) -> Self {
        Self { device, export }
    }
}

/// Completion predicate for a step.
pub fn is_step_satisfied(step: WizardStep, pre: &Preconditions) -> bool {
    match step {
        WizardStep::Start => true,
        WizardStep::InsertDevice => pre.device.is_present(),
        WizardStep::UnlockDevice => pre.device == DeviceState::Unlocked,
        WizardStep::ReviewData => true,
        WizardStep::Export => pre.export == ExportStatus::Succeeded,
    }
}

#[derive(Debug)]
pub struct WizardFlow {
    current: WizardStep,
}

impl Default for WizardFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl WizardFlow {
    pub fn new() -> Self {
        Self {
            current: WizardStep::Start,
        }
    }

    pub fn current(&self) -> WizardStep {
        self.current
    }

    /// Once the flow reaches the export step it is committed and device
    /// regressions no longer pull it back.
    pub fn is_committed(&self) -> bool {
        self.current >= WizardStep::Export
    }

    pub fn can_advance(&self, pre: &Preconditions) -> bool {
        self.current.next().is_some() && is_step_satisfied(self.current, pre)
    }

    pub fn can_retreat(&self) -> bool {
        self.current.previous().is_some()
    }

    pub fn advance(&mut self, pre: &Preconditions) -> Result<WizardStep> {
        let Some(next) = self.current.next() else {
            return Err(Error::invalid("advance", "on the last step"));
        };
        if !is_step_satisfied(self.current, pre) {
            return Err(Error::StepNotReady(self.current));
        }

        info!(from = %self.current, to = %next, "Wizard advanced");
        self.current = next;
        Ok(next)
    }

    /// User-initiated back navigation, always allowed except from the first step.
    pub fn retreat(&mut self) -> Result<WizardStep> {
        let Some(previous) = self.current.previous() else {
            return Err(Error::invalid("go back", "on the first step"));
        };

        info!(from = %self.current, to = %previous, "Wizard went back");
        self.current = previous;
        Ok(previous)
    }

    /// Corrective navigation after a device or export change.
    ///
    /// Jumps in one move to the earliest step whose precondition no longer
    /// holds, if that step lies behind the current one. Returns the new step
    /// when it moved. Calling it again without new information never moves.
    pub fn on_external_state_change(&mut self, pre: &Preconditions) -> Option<WizardStep> {
        if self.is_committed() {
            return None;
        }

        let target = [WizardStep::InsertDevice, WizardStep::UnlockDevice]
            .into_iter()
            .find(|step| !is_step_satisfied(*step, pre))
            .filter(|step| *step < self.current)?;

        info!(from = %self.current, to = %target, device = %pre.device, "Wizard forced back");
        self.current = target;
        Some(target)
    }

    /// Back to the first step. Returns the new step when it moved.
    pub fn restart(&mut self) -> Option<WizardStep> {
        if self.current == WizardStep::Start {
            return None;
        }

        info!(from = %self.current, "Wizard restarted");
        self.current = WizardStep::Start;
        Some(WizardStep::Start)
    }

    /// Completion flags for every step, in rank order.
    pub fn completion(pre: &Preconditions) -> [(WizardStep, bool); 5] {
        WizardStep::ALL.map(|step| (step, is_step_satisfied(step, pre)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pre(device: DeviceState) -> Preconditions {
        Preconditions::new(device, ExportStatus::Idle)
    }

    fn flow_at(step: WizardStep) -> WizardFlow {
        WizardFlow { current: step }
    }

    #[test]
    fn ranks_are_ordered() {
        for pair in WizardStep::ALL.windows(2) {
            assert!(pair[0].rank() < pair[1].rank());
            assert_eq!(pair[0].next(), Some(pair[1]));
            assert_eq!(pair[1].previous(), Some(pair[0]));
        }
        assert_eq!(WizardStep::Start.previous(), None);
        assert_eq!(WizardStep::Export.next(), None);
    }

    #[test]
    fn predicates() {
        assert!(!is_step_satisfied(WizardStep::InsertDevice, &pre(DeviceState::Missing)));
        assert!(!is_step_satisfied(WizardStep::InsertDevice, &pre(DeviceState::Removed)));
        assert!(is_step_satisfied(WizardStep::InsertDevice, &pre(DeviceState::Unlocking)));
        assert!(!is_step_satisfied(WizardStep::UnlockDevice, &pre(DeviceState::Unlocking)));
        assert!(is_step_satisfied(WizardStep::UnlockDevice, &pre(DeviceState::Unlocked)));
        assert!(is_step_satisfied(WizardStep::ReviewData, &pre(DeviceState::Unknown)));
        assert!(!is_step_satisfied(WizardStep::Export, &pre(DeviceState::Unlocked)));
        assert!(is_step_satisfied(
            WizardStep::Export,
            &Preconditions::new(DeviceState::Unlocked, ExportStatus::Succeeded)
        ));
    }

    #[test]
    fn advance_requires_satisfied_step() {
        let mut flow = flow_at(WizardStep::InsertDevice);
        assert_eq!(
            flow.advance(&pre(DeviceState::Missing)),
            Err(Error::StepNotReady(WizardStep::InsertDevice))
        );
        assert_eq!(flow.current(), WizardStep::InsertDevice);

        assert_eq!(
            flow.advance(&pre(DeviceState::Locked)),
            Ok(WizardStep::UnlockDevice)
        );
    }

    #[test]
    fn advance_from_last_step_is_rejected() {
        let mut flow = flow_at(WizardStep::Export);
        let done = Preconditions::new(DeviceState::Unlocked, ExportStatus::Succeeded);
        assert!(!flow.can_advance(&done));
        assert!(matches!(
            flow.advance(&done),
            Err(Error::InvalidOperation { .. })
        ));
    }

    #[test]
    fn retreat_is_unconditional_except_at_start() {
        let mut flow = flow_at(WizardStep::ReviewData);
        assert_eq!(flow.retreat(), Ok(WizardStep::UnlockDevice));

        let mut flow = WizardFlow::new();
        assert!(!flow.can_retreat());
        assert!(flow.retreat().is_err());
        assert_eq!(flow.current(), WizardStep::Start);
    }

    #[test]
    fn removal_jumps_to_insert_device() {
        let mut flow = flow_at(WizardStep::ReviewData);
        assert_eq!(
            flow.on_external_state_change(&pre(DeviceState::Removed)),
            Some(WizardStep::InsertDevice)
        );
        assert_eq!(flow.on_external_state_change(&pre(DeviceState::Removed)), None);
    }

    #[test]
    fn relock_jumps_to_unlock_device() {
        let mut flow = flow_at(WizardStep::ReviewData);
        assert_eq!(
            flow.on_external_state_change(&pre(DeviceState::Locked)),
            Some(WizardStep::UnlockDevice)
        );
        assert_eq!(flow.current(), WizardStep::UnlockDevice);
    }

    #[test]
    fn never_moves_forward() {
        let mut flow = WizardFlow::new();
        assert_eq!(flow.on_external_state_change(&pre(DeviceState::Missing)), None);
        assert_eq!(flow.current(), WizardStep::Start);

        let mut flow = flow_at(WizardStep::UnlockDevice);
        assert_eq!(flow.on_external_state_change(&pre(DeviceState::Locked)), None);
        assert_eq!(flow.current(), WizardStep::UnlockDevice);
    }

    #[test]
    fn committed_flow_ignores_regressions() {
        let mut flow = flow_at(WizardStep::Export);
        assert_eq!(flow.on_external_state_change(&pre(DeviceState::Removed)), None);
        assert_eq!(flow.current(), WizardStep::Export);
    }

    #[test]
    fn restart_goes_to_start() {
        let mut flow = flow_at(WizardStep::Export);
        assert_eq!(flow.restart(), Some(WizardStep::Start));
        assert_eq!(flow.restart(), None);
    }
}
