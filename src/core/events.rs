//! Inbound events, outbound notifications and the subscriber interface.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde::Serialize;
use uuid::Uuid;

use super::device::{DeviceSignal, DeviceState};
use super::export::{ExportOutcome, ExportStatus};
use super::hardware::Passphrase;
use super::wizard::WizardStep;

/// Everything that can change session state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum Event {
    /// Signal from the device-access service.
    Device(DeviceSignal),
    /// Passphrase submitted from the view layer.
    AttemptUnlock(Passphrase),
    Advance,
    Retreat,
    Restart,
    StartExport,
    ExportSucceeded,
    ExportFailed,
    /// Outcome reported by the export backend for a specific attempt.
    ExportReport {
        export_id: Uuid,
        outcome: ExportOutcome,
    },
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Device(signal) => write!(f, "device {:?}", signal),
            Event::AttemptUnlock(_) => f.write_str("attempt unlock"),
            Event::Advance => f.write_str("advance"),
            Event::Retreat => f.write_str("retreat"),
            Event::Restart => f.write_str("restart"),
            Event::StartExport => f.write_str("start export"),
            Event::ExportSucceeded => f.write_str("export succeeded"),
            Event::ExportFailed => f.write_str("export failed"),
            Event::ExportReport { export_id, outcome } => {
                write!(f, "export {} reported {:?}", export_id, outcome)
            }
        }
    }
}

/// State changes published to subscribers, in the order they happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "notification", rename_all = "snake_case")]
pub enum Notification {
    DeviceStateChanged {
        state: DeviceState,
    },
    /// The last unlock attempt was refused.
    UnlockFailed,
    ExportStatusChanged {
        status: ExportStatus,
        export_id: Option<Uuid>,
    },
    ExportFinished {
        export_id: Option<Uuid>,
        outcome: ExportOutcome,
    },
    WizardStepChanged {
        from: WizardStep,
        to: WizardStep,
        /// Set when the move was corrective rather than user-initiated.
        forced: bool,
    },
    StepCompletionChanged {
        step: WizardStep,
        satisfied: bool,
    },
    /// A queued event failed. The error of a directly handled event goes
    /// back to its caller instead.
    Rejected {
        event: Event,
        reason: String,
    },
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notification::DeviceStateChanged { state } => write!(f, "device is {}", state),
            Notification::UnlockFailed => f.write_str("unlocking failed"),
            Notification::ExportStatusChanged { status, .. } => write!(f, "export is {}", status),
            Notification::ExportFinished { outcome, .. } => {
                write!(f, "export finished ({:?})", outcome)
            }
            Notification::WizardStepChanged { to, forced, .. } => {
                let how = if *forced { " (forced)" } else { "" };
                write!(f, "wizard step is {}{}", to, how)
            }
            Notification::StepCompletionChanged { step, satisfied } => {
                let mark = if *satisfied { "complete" } else { "incomplete" };
                write!(f, "step {} is {}", step, mark)
            }
            Notification::Rejected { event, reason } => write!(f, "{} rejected: {}", event, reason),
        }
    }
}

/// Events a subscriber wants processed after the current one completes.
#[derive(Debug, Default)]
pub struct Outbox {
    events: Vec<Event>,
}

impl Outbox {
    pub fn post(&mut self, event: Event) {
        self.events.push(event);
    }

    pub(crate) fn take(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }
}

pub trait Subscriber {
    fn on_notification(&mut self, notification: &Notification, outbox: &mut Outbox);
}

impl<F> Subscriber for F
where
    F: FnMut(&Notification, &mut Outbox),
{
    fn on_notification(&mut self, notification: &Notification, outbox: &mut Outbox) {
        self(notification, outbox)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

/// Subscriber that keeps every notification it sees. Clones share the log.
#[derive(Debug, Clone, Default)]
pub struct NotificationLog {
    entries: Rc<RefCell<Vec<Notification>>>,
}

impl NotificationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return everything recorded so far.
    pub fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.entries.borrow_mut())
    }

    pub fn entries(&self) -> Vec<Notification> {
        self.entries.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl Subscriber for NotificationLog {
    fn on_notification(&mut self, notification: &Notification, _outbox: &mut Outbox) {
        self.entries.borrow_mut().push(notification.clone());
    }
}
