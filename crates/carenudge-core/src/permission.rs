//! Notification permission boundary.

use serde::{Deserialize, Serialize};

/// OS-level notification permission state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PermissionStatus {
    Granted,
    Denied,
    PermanentlyDenied,
}

impl PermissionStatus {
    pub fn is_granted(self) -> bool {
        self == PermissionStatus::Granted
    }
}

/// Queries and requests OS notification permission. Consulted before any
/// scheduling or display operation.
pub trait PermissionGate: Send + Sync {
    fn status(&self) -> PermissionStatus;

    /// Prompt the user. Returns the status after the prompt resolves.
    fn request(&self) -> PermissionStatus;

    /// Open the OS notification settings screen for this app.
    fn open_settings(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }
}
