use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::device::DeviceState;
use super::export::ExportStatus;
use super::wizard::WizardStep;

/// Read-only view of a session for rendering.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub device: DeviceState,
    pub export: ExportSnapshot,
    pub current_step: WizardStep,
    pub steps: Vec<StepView>,
    pub unlock_failed: bool,
    pub can_advance: bool,
    pub can_retreat: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportSnapshot {
    pub status: ExportStatus,
    pub id: Option<Uuid>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepView {
    pub step: WizardStep,
    pub title: &'static str,
    pub satisfied: bool,
    pub current: bool,
}

impl SessionSnapshot {
    pub fn step(&self, step: WizardStep) -> Option<&StepView> {
        self.steps.iter().find(|view| view.step == step)
    }
}
