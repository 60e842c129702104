//! Crash-recovery reconciliation report types.
//!
//! When a persisted snapshot is too old to trust, the engine cancels every
//! persisted schedule and regenerates from active templates for windows
//! still due today. The report records what happened for diagnostics.

use serde::{Deserialize, Serialize};

use crate::window::TimeWindow;

/// Outcome of reconciling a single persisted schedule or window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RecoveryAction {
    /// A stale scheduled notification was cancelled at the OS.
    Cancelled { notification_id: u32 },
    /// A fresh schedule was derived for a window due today.
    Regenerated {
        window: TimeWindow,
        notification_id: u32,
    },
    /// A window was left unscheduled.
    Skipped { window: TimeWindow, reason: String },
}

/// Summary of a recovery pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecoveryReport {
    pub examined: usize,
    pub cancelled: usize,
    pub regenerated: usize,
    pub actions: Vec<RecoveryAction>,
}

impl RecoveryReport {
    pub fn new(examined: usize) -> Self {
        Self {
            examined,
            ..Self::default()
        }
    }

    pub fn note(&mut self, action: RecoveryAction) {
        match &action {
            RecoveryAction::Cancelled { .. } => self.cancelled += 1,
            RecoveryAction::Regenerated { .. } => self.regenerated += 1,
            RecoveryAction::Skipped { .. } => {}
        }
        self.actions.push(action);
    }
}
