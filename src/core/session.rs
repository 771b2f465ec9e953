//! The application session.
//!
//! Owns the device, the export operation and the wizard flow, and is the
//! only place where they are mutated. Every change goes through the
//! dispatcher queue and is routed in a fixed order: device, then export
//! policy, then wizard correction, then step completion. Subscribers see the
//! resulting notifications in that order and can only queue follow-up
//! events, which run after the current one.

use std::time::Duration;

use tracing::{debug, warn};

use super::device::{Device, DeviceSignal, DeviceState};
use super::dispatcher::{Clock, Dispatcher};
use super::events::{Event, Notification, Outbox, Subscriber, SubscriptionId};
use super::export::{
    ExportBackend, ExportNotice, ExportOperation, ExportOutcome, ExportStatus,
};
use super::hardware::{DeviceAccess, Passphrase};
use super::models::{ExportSnapshot, SessionSnapshot, StepView};
use super::wizard::{Preconditions, WizardFlow, WizardStep, is_step_satisfied};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    /// Start the export as soon as the export step is entered.
    pub auto_start_export: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            auto_start_export: true,
        }
    }
}

pub struct Session {
    device: Device,
    export: ExportOperation,
    wizard: WizardFlow,
    dispatcher: Dispatcher,
    device_access: Box<dyn DeviceAccess>,
    export_backend: Box<dyn ExportBackend>,
    subscribers: Vec<(SubscriptionId, Box<dyn Subscriber>)>,
    next_subscription: u64,
    completion: [(WizardStep, bool); 5],
    unlock_failed: bool,
    options: SessionOptions,
    started: bool,
}

impl Session {
    pub fn new(
        clock: Box<dyn Clock>,
        device_access: Box<dyn DeviceAccess>,
        export_backend: Box<dyn ExportBackend>,
        options: SessionOptions,
    ) -> Self {
        let device = Device::new();
        let export = ExportOperation::new();
        let completion =
            WizardFlow::completion(&Preconditions::new(device.state(), export.status()));

        Self {
            device,
            export,
            wizard: WizardFlow::new(),
            dispatcher: Dispatcher::new(clock),
            device_access,
            export_backend,
            subscribers: Vec::new(),
            next_subscription: 0,
            completion,
            unlock_failed: false,
            options,
            started: false,
        }
    }

    /// Let the device-access service post its first probe. Only the first
    /// call has any effect.
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        self.device_access.start(&mut self.dispatcher);
        self.drain();
    }

    pub fn subscribe(&mut self, subscriber: impl Subscriber + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(subscriber)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub_id, _)| *sub_id != id);
        self.subscribers.len() != before
    }

    /// Process `event` now, then everything it caused to be queued. Only the
    /// error of `event` itself is returned.
    pub fn handle(&mut self, event: Event) -> Result<()> {
        let result = self.process(event);
        self.drain();
        result
    }

    /// Queue an event for the next [`Session::pump`].
    pub fn post(&mut self, event: Event) {
        self.dispatcher.post(event);
    }

    /// Release due timers and process the queue. Returns how many events ran.
    pub fn pump(&mut self) -> usize {
        self.dispatcher.release_due();
        self.drain()
    }

    pub fn until_next_timer(&self) -> Option<Duration> {
        self.dispatcher.until_next_timer()
    }

    /// Feed a device-access signal. `UnlockingStarted` is refused here; an
    /// unlock only begins through [`Session::attempt_unlock`], which also
    /// asks the device-access service for an outcome.
    pub fn signal(&mut self, signal: DeviceSignal) -> Result<()> {
        self.handle(Event::Device(signal))
    }

    pub fn attempt_unlock(&mut self, passphrase: Passphrase) -> Result<()> {
        self.handle(Event::AttemptUnlock(passphrase))
    }

    pub fn advance(&mut self) -> Result<()> {
        self.handle(Event::Advance)
    }

    pub fn retreat(&mut self) -> Result<()> {
        self.handle(Event::Retreat)
    }

    pub fn restart(&mut self) -> Result<()> {
        self.handle(Event::Restart)
    }

    pub fn start_export(&mut self) -> Result<()> {
        self.handle(Event::StartExport)
    }

    pub fn succeed_export(&mut self) -> Result<()> {
        self.handle(Event::ExportSucceeded)
    }

    pub fn fail_export(&mut self) -> Result<()> {
        self.handle(Event::ExportFailed)
    }

    /// Re-run corrective navigation against the current device and export
    /// state. Returns the new step when the wizard moved.
    pub fn on_external_state_change(&mut self) -> Option<WizardStep> {
        let mut notes = Vec::new();
        let moved = self.reconcile(&mut notes);
        self.update_completion(&mut notes);
        self.publish(notes);
        self.drain();
        moved
    }

    pub fn device_state(&self) -> DeviceState {
        self.device.state()
    }

    pub fn export(&self) -> &ExportOperation {
        &self.export
    }

    pub fn export_status(&self) -> ExportStatus {
        self.export.status()
    }

    pub fn current_step(&self) -> WizardStep {
        self.wizard.current()
    }

    pub fn preconditions(&self) -> Preconditions {
        Preconditions::new(self.device.state(), self.export.status())
    }

    pub fn is_step_satisfied(&self, step: WizardStep) -> bool {
        is_step_satisfied(step, &self.preconditions())
    }

    pub fn can_advance(&self) -> bool {
        self.wizard.can_advance(&self.preconditions())
    }

    pub fn can_retreat(&self) -> bool {
        self.wizard.can_retreat()
    }

    /// Whether the last unlock attempt failed and nothing has happened since
    /// that would make the failure stale.
    pub fn unlock_failed(&self) -> bool {
        self.unlock_failed
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let current = self.wizard.current();
        SessionSnapshot {
            device: self.device.state(),
            export: ExportSnapshot {
                status: self.export.status(),
                id: self.export.id(),
                started_at: self.export.started_at(),
                finished_at: self.export.finished_at(),
            },
            current_step: current,
            steps: self
                .completion
                .iter()
                .map(|(step, satisfied)| StepView {
                    step: *step,
                    title: step.title(),
                    satisfied: *satisfied,
                    current: *step == current,
                })
                .collect(),
            unlock_failed: self.unlock_failed,
            can_advance: self.can_advance(),
            can_retreat: self.can_retreat(),
        }
    }

    fn drain(&mut self) -> usize {
        let mut processed = 0;
        while let Some(event) = self.dispatcher.pop() {
            processed += 1;
            if let Err(err) = self.process(event.clone()) {
                warn!(%event, error = %err, "Queued event rejected");
                self.publish(vec![Notification::Rejected {
                    event,
                    reason: err.to_string(),
                }]);
            }
        }
        processed
    }

    fn process(&mut self, event: Event) -> Result<()> {
        debug!(%event, "Handling event");
        let mut notes = Vec::new();
        let result = self.apply(event, &mut notes);
        self.publish(notes);
        result
    }

    fn apply(&mut self, event: Event, notes: &mut Vec<Notification>) -> Result<()> {
        match event {
            Event::Device(DeviceSignal::UnlockingStarted) => {
                return Err(Error::invalid(
                    "report unlocking started",
                    "no unlock was requested through attempt_unlock",
                ));
            }
            Event::Device(signal) => {
                self.on_device_signal(signal, notes);
            }
            Event::AttemptUnlock(passphrase) => {
                if self.on_device_signal(DeviceSignal::UnlockingStarted, notes) {
                    self.device_access
                        .request_unlock(&passphrase, &mut self.dispatcher);
                }
            }
            Event::Advance => {
                let pre = self.preconditions();
                let from = self.wizard.current();
                let to = self.wizard.advance(&pre)?;
                self.step_changed(from, to, false, notes);
                if to == WizardStep::Export {
                    self.enter_export(notes);
                }
            }
            Event::Retreat => {
                let from = self.wizard.current();
                let to = self.wizard.retreat()?;
                self.step_changed(from, to, false, notes);
                // Leaving the export step uncommits the flow.
                self.reconcile(notes);
            }
            Event::Restart => {
                let from = self.wizard.current();
                if let Some(to) = self.wizard.restart() {
                    self.step_changed(from, to, false, notes);
                }
                self.reset_export(notes);
                self.unlock_failed = false;
            }
            Event::StartExport => self.begin_export(notes)?,
            Event::ExportSucceeded => {
                let notices = self.export.succeed()?;
                self.push_export_notices(&notices, notes);
                self.reconcile(notes);
            }
            Event::ExportFailed => {
                let notices = self.export.fail()?;
                self.push_export_notices(&notices, notes);
                self.reconcile(notes);
            }
            Event::ExportReport { export_id, outcome } => {
                let current = self.export.id() == Some(export_id)
                    && self.export.status() == ExportStatus::Started;
                if !current {
                    debug!(%export_id, ?outcome, "Ignoring stale export report");
                    return Ok(());
                }
                let notices = match outcome {
                    ExportOutcome::Succeeded => self.export.succeed()?,
                    ExportOutcome::Failed => self.export.fail()?,
                };
                self.push_export_notices(&notices, notes);
                self.reconcile(notes);
            }
        }

        self.update_completion(notes);
        Ok(())
    }

    /// Returns whether the device accepted the signal.
    fn on_device_signal(&mut self, signal: DeviceSignal, notes: &mut Vec<Notification>) -> bool {
        let Some(state) = self.device.apply(signal) else {
            return false;
        };
        notes.push(Notification::DeviceStateChanged { state });

        match signal {
            DeviceSignal::UnlockFailed => {
                self.unlock_failed = true;
                notes.push(Notification::UnlockFailed);
            }
            DeviceSignal::UnlockingStarted => self.unlock_failed = false,
            _ => {}
        }

        let notices = self.export.on_device_state_changed(state);
        self.push_export_notices(&notices, notes);
        self.reconcile(notes);
        true
    }

    fn reconcile(&mut self, notes: &mut Vec<Notification>) -> Option<WizardStep> {
        let pre = self.preconditions();
        let from = self.wizard.current();
        let to = self.wizard.on_external_state_change(&pre)?;
        self.step_changed(from, to, true, notes);
        Some(to)
    }

    fn step_changed(
        &mut self,
        from: WizardStep,
        to: WizardStep,
        forced: bool,
        notes: &mut Vec<Notification>,
    ) {
        self.unlock_failed = false;
        notes.push(Notification::WizardStepChanged { from, to, forced });
    }

    /// Entering the export step creates a fresh operation unless one is
    /// already running.
    fn enter_export(&mut self, notes: &mut Vec<Notification>) {
        if self.export.status() != ExportStatus::Started {
            self.reset_export(notes);
        }

        if self.options.auto_start_export && self.export.status() == ExportStatus::Idle {
            if let Err(err) = self.begin_export(notes) {
                warn!(error = %err, "Could not start export on entering the export step");
                notes.push(Notification::Rejected {
                    event: Event::StartExport,
                    reason: err.to_string(),
                });
            }
        }
    }

    fn begin_export(&mut self, notes: &mut Vec<Notification>) -> Result<()> {
        let device = self.device.state();
        if device != DeviceState::Unlocked {
            return Err(Error::invalid("start an export", format!("device is {}", device)));
        }

        let notices = self.export.start()?;
        self.push_export_notices(&notices, notes);
        self.export_backend.begin(&self.export, &mut self.dispatcher);
        self.reconcile(notes);
        Ok(())
    }

    fn reset_export(&mut self, notes: &mut Vec<Notification>) {
        if self.export.status() == ExportStatus::Idle {
            return;
        }
        self.export.reset();
        notes.push(Notification::ExportStatusChanged {
            status: ExportStatus::Idle,
            export_id: None,
        });
    }

    fn push_export_notices(&self, notices: &[ExportNotice], notes: &mut Vec<Notification>) {
        let export_id = self.export.id();
        for notice in notices {
            let note = match notice {
                ExportNotice::Started => Notification::ExportStatusChanged {
                    status: ExportStatus::Started,
                    export_id,
                },
                ExportNotice::Succeeded => Notification::ExportStatusChanged {
                    status: ExportStatus::Succeeded,
                    export_id,
                },
                ExportNotice::Failed => Notification::ExportStatusChanged {
                    status: ExportStatus::Failed,
                    export_id,
                },
                ExportNotice::Finished => match self.export.outcome() {
                    Some(outcome) => Notification::ExportFinished { export_id, outcome },
                    None => continue,
                },
            };
            notes.push(note);
        }
    }

    fn update_completion(&mut self, notes: &mut Vec<Notification>) {
        let latest = WizardFlow::completion(&self.preconditions());
        for ((step, before), (_, now)) in self.completion.iter().zip(latest.iter()) {
            if before != now {
                notes.push(Notification::StepCompletionChanged {
                    step: *step,
                    satisfied: *now,
                });
            }
        }
        self.completion = latest;
    }

    fn publish(&mut self, notes: Vec<Notification>) {
        if notes.is_empty() {
            return;
        }

        let mut outbox = Outbox::default();
        for note in &notes {
            for (_, subscriber) in self.subscribers.iter_mut() {
                subscriber.on_notification(note, &mut outbox);
            }
        }
        for event in outbox.take() {
            self.dispatcher.post(event);
        }
    }
}
