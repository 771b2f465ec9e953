//! Lifecycle of a single export attempt.
//!
//! Finished is reported as a notice after success or failure rather than as
//! a status of its own, so the outcome stays observable until the next
//! `start`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::device::DeviceState;
use super::dispatcher::Dispatcher;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportStatus {
    Idle,
    Started,
    Succeeded,
    Failed,
}

impl ExportStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ExportStatus::Idle => "idle",
            ExportStatus::Started => "started",
            ExportStatus::Succeeded => "succeeded",
            ExportStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ExportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportOutcome {
    Succeeded,
    Failed,
}

/// Notices emitted by the export state machine, in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportNotice {
    Started,
    Succeeded,
    Failed,
    Finished,
}

/// Performs the actual data transfer for an export operation.
///
/// The outcome must be reported later by posting
/// [`Event::ExportReport`](super::events::Event::ExportReport) carrying the
/// operation's id, so reports for an earlier attempt can be told apart.
pub trait ExportBackend {
    fn begin(&mut self, operation: &ExportOperation, dispatcher: &mut Dispatcher);
}

/// The export state machine.
#[derive(Debug, Clone)]
pub struct ExportOperation {
    id: Option<Uuid>,
    status: ExportStatus,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

impl Default for ExportOperation {
    fn default() -> Self {
        Self::new()
    }
}

impl ExportOperation {
    pub fn new() -> Self {
        Self {
            id: None,
            status: ExportStatus::Idle,
            started_at: None,
            finished_at: None,
        }
    }

    pub fn status(&self) -> ExportStatus {
        self.status
    }

    /// Identifier of the current (or last) attempt. `None` while idle.
    pub fn id(&self) -> Option<Uuid> {
        self.id
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.status, ExportStatus::Succeeded | ExportStatus::Failed)
    }

    pub fn outcome(&self) -> Option<ExportOutcome> {
        match self.status {
            ExportStatus::Succeeded => Some(ExportOutcome::Succeeded),
            ExportStatus::Failed => Some(ExportOutcome::Failed),
            _ => None,
        }
    }

    /// Begin a new attempt. Starting over a finished attempt replaces it.
    pub fn start(&mut self) -> Result<Vec<ExportNotice>> {
        if self.status == ExportStatus::Started {
            return Err(Error::invalid(
                "start an export",
                "an export is already in progress",
            ));
        }

        let id = Uuid::now_v7();
        self.id = Some(id);
        self.status = ExportStatus::Started;
        self.started_at = Some(Utc::now());
        self.finished_at = None;

        info!(export_id = %id, "Export started");
        Ok(vec![ExportNotice::Started])
    }

    pub fn succeed(&mut self) -> Result<Vec<ExportNotice>> {
        self.require_started("complete an export")?;
        Ok(self.finish(ExportOutcome::Succeeded))
    }

    pub fn fail(&mut self) -> Result<Vec<ExportNotice>> {
        self.require_started("fail an export")?;
        Ok(self.finish(ExportOutcome::Failed))
    }

    /// Abort policy: any device change that leaves the device anything other
    /// than unlocked fails an attempt in progress. Ignored otherwise.
    pub fn on_device_state_changed(&mut self, state: DeviceState) -> Vec<ExportNotice> {
        if self.status != ExportStatus::Started || state == DeviceState::Unlocked {
            return Vec::new();
        }

        warn!(export_id = ?self.id, device = %state, "Device changed during export, failing it");
        self.finish(ExportOutcome::Failed)
    }

    /// Discard the current attempt.
    pub fn reset(&mut self) {
        if self.status == ExportStatus::Started {
            warn!(export_id = ?self.id, "Discarding export in progress");
        }
        *self = Self::new();
    }

    fn require_started(&self, operation: &'static str) -> Result<()> {
        if self.status == ExportStatus::Started {
            Ok(())
        } else {
            Err(Error::invalid(operation, format!("export is {}", self.status)))
        }
    }

    fn finish(&mut self, outcome: ExportOutcome) -> Vec<ExportNotice> {
        self.finished_at = Some(Utc::now());
        let notice = match outcome {
            ExportOutcome::Succeeded => {
                self.status = ExportStatus::Succeeded;
                ExportNotice::Succeeded
            }
            ExportOutcome::Failed => {
                self.status = ExportStatus::Failed;
                ExportNotice::Failed
            }
        };

        info!(export_id = ?self.id, ?outcome, "Export finished");
        vec![notice, ExportNotice::Finished]
    }
}
